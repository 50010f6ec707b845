//! Domain services.
//!
//! Each service owns the agent context for one domain. Per request it
//! creates a fresh builder, stages the classified action and executes it,
//! so concurrent calls never share a stage.

use std::task::{Context, Poll};

use tower::Service;

use crate::builders::{
    AccountBuilder, ContractBuilder, FileBuilder, ScheduleBuilder, StageBuilder, TokenBuilder,
    TopicBuilder,
};
use crate::context::AgentContext;
use crate::outcome::ExecutionReport;
use crate::service::operation::{
    defaulted_notes, domain_names, OperationError, ToolAction, ToolFuture, ToolRequest,
    ToolResponse,
};

// ---------------------------------------------------------------------------
// Macro for the per-domain services
// ---------------------------------------------------------------------------

/// Generates a domain service that runs `$variant` actions on `$builder`.
macro_rules! domain_service {
    (
        $(#[$meta:meta])*
        $name:ident, $domain:expr, $builder:ident, $variant:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            ctx: AgentContext,
        }

        impl $name {
            pub const DOMAIN: &'static str = $domain;

            #[must_use]
            pub fn new(ctx: AgentContext) -> Self {
                Self { ctx }
            }
        }

        impl Service<ToolRequest> for $name {
            type Response = ToolResponse;
            type Error = OperationError;
            type Future = ToolFuture;

            fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
                Poll::Ready(Ok(()))
            }

            fn call(&mut self, req: ToolRequest) -> Self::Future {
                let ToolRequest {
                    ctx,
                    action,
                    meta,
                    defaulted,
                } = req;
                let ToolAction::$variant(action) = action else {
                    return Box::pin(async { Err(OperationError::WrongService) });
                };
                let mut builder = $builder::new(self.ctx.clone()).with_deadline(ctx.deadline_ms);
                Box::pin(async move {
                    let mut notes = defaulted_notes(&defaulted);
                    let report = match action.stage_into(&mut builder) {
                        Ok(()) => builder.execute(&meta).await,
                        Err(err) => {
                            tracing::warn!(tool = %ctx.tool, error = %err, "could not stage tool call");
                            ExecutionReport::failure(err, Vec::new())
                        }
                    };
                    notes.extend(report.notes);
                    Ok(ToolResponse {
                        call_id: ctx.call_id,
                        report: ExecutionReport {
                            outcome: report.outcome,
                            notes,
                        },
                    })
                })
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Domain services
// ---------------------------------------------------------------------------

domain_service!(
    /// Account creation, HBAR transfers, updates, deletion and allowances.
    AccountService, domain_names::ACCOUNT, AccountBuilder, Account
);

domain_service!(
    /// Token lifecycle and supply operations.
    TokenService, domain_names::TOKEN, TokenBuilder, Token
);

domain_service!(
    /// Consensus topic operations.
    TopicService, domain_names::TOPIC, TopicBuilder, Topic
);

domain_service!(
    /// File service operations.
    FileService, domain_names::FILE, FileBuilder, File
);

domain_service!(
    /// Smart-contract operations.
    ContractService, domain_names::CONTRACT, ContractBuilder, Contract
);

domain_service!(
    /// Signing and deleting existing schedules.
    ScheduleService, domain_names::SCHEDULE, ScheduleBuilder, Schedule
);

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::builders::testing::context;
    use crate::service::classify::ToolClassifier;
    use crate::service::operation::ToolCall;

    fn request(tool: &str, params: serde_json::Value, defaulted: &[&str]) -> ToolRequest {
        ToolClassifier::new()
            .classify(ToolCall {
                tool: tool.to_string(),
                params,
                defaulted: defaulted.iter().map(|d| (*d).to_string()).collect(),
                ..ToolCall::default()
            })
            .unwrap()
    }

    #[tokio::test]
    async fn executes_classified_action() {
        let (ledger, ctx) = context();
        let svc = TopicService::new(ctx);
        let resp = svc
            .oneshot(request("create_topic", json!({ "isSubmitKey": true }), &[]))
            .await
            .unwrap();
        assert!(resp.report.is_success());
        assert_eq!(ledger.submissions().len(), 1);
    }

    #[tokio::test]
    async fn defaulted_notes_come_before_builder_notes() {
        let (_, ctx) = context();
        let svc = TopicService::new(ctx);
        let resp = svc
            .oneshot(request("create_topic", json!({}), &["topicMemo"]))
            .await
            .unwrap();
        let notes = resp.report.notes;
        assert_eq!(notes.len(), 2);
        assert!(notes[0].contains("topicMemo"));
        assert!(notes[1].contains("immutable"));
    }

    #[tokio::test]
    async fn staging_failure_is_a_failed_report() {
        let (ledger, ctx) = context();
        let svc = TokenService::new(ctx);
        let resp = svc
            .oneshot(request(
                "create_fungible_token",
                json!({ "tokenName": "A", "tokenSymbol": "A", "supplyType": "finite" }),
                &["decimals"],
            ))
            .await
            .unwrap();
        let record = resp.report.into_record();
        assert!(!record.success);
        assert!(record.error.unwrap().contains("maxSupply"));
        assert_eq!(record.notes.len(), 1);
        assert!(ledger.submissions().is_empty());
    }

    #[tokio::test]
    async fn wrong_domain_is_rejected() {
        let (_, ctx) = context();
        let svc = FileService::new(ctx);
        let err = svc
            .oneshot(request("delete_topic", json!({ "topicId": "0.0.7" }), &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, OperationError::WrongService));
    }
}
