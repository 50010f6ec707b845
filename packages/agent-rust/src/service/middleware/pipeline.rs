//! Pipeline composition: wraps the router in every middleware layer.

use tower::ServiceBuilder;

use super::admission::AdmissionLayer;
use super::budget::BudgetLayer;
use super::trace::TraceLayer;
use crate::config::AgentConfig;
use crate::service::operation::{OperationError, ToolFuture, ToolRequest, ToolResponse};
use crate::service::router::ToolRouter;

/// Builds the tool pipeline around `router`.
///
/// Layer order (outermost to innermost):
/// 1. `AdmissionLayer` refuses calls beyond `max_concurrent_operations`
/// 2. `BudgetLayer` applies `default_deadline_ms` to calls without one
/// 3. `TraceLayer` opens the `tool_call` span closest to the handler
#[must_use]
pub fn build_tool_pipeline(
    router: ToolRouter,
    config: &AgentConfig,
) -> impl tower::Service<ToolRequest, Response = ToolResponse, Error = OperationError, Future = ToolFuture>
       + Send
       + 'static {
    ServiceBuilder::new()
        .layer(AdmissionLayer::new(config.max_concurrent_operations))
        .layer(BudgetLayer::new(config.default_deadline_ms))
        .layer(TraceLayer)
        .service(router)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tower::ServiceExt;

    use super::*;
    use crate::service::operation::domain_names;
    use crate::service::router::tests::{make_request, StubService};

    #[tokio::test]
    async fn pipeline_routes_through_all_layers() {
        let mut router = ToolRouter::new();
        router.register(domain_names::TOPIC, StubService { name: "topic" });

        let config = AgentConfig {
            max_concurrent_operations: 4,
            ..AgentConfig::default()
        };
        let svc = build_tool_pipeline(router, &config);
        let resp = svc.oneshot(make_request(42, domain_names::TOPIC)).await.unwrap();
        assert_eq!(resp.call_id, 42);
        assert!(!resp.report.is_success());
    }

    #[tokio::test]
    async fn pipeline_surfaces_unknown_domain() {
        let svc = build_tool_pipeline(ToolRouter::new(), &AgentConfig::default());
        let err = svc.oneshot(make_request(1, domain_names::TOPIC)).await.unwrap_err();
        assert!(matches!(err, OperationError::UnknownDomain { .. }));
    }
}
