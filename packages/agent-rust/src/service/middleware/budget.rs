//! Default time budget.
//!
//! Calls without their own `deadline_ms` get the configured default. The
//! budget is enforced inside execution, around each collaborator await, so
//! this layer only stamps the request.

use std::task::{Context, Poll};

use tower::{Layer, Service};

use crate::service::operation::ToolRequest;

#[derive(Debug, Clone, Copy)]
pub struct BudgetLayer {
    default_ms: Option<u64>,
}

impl BudgetLayer {
    #[must_use]
    pub fn new(default_ms: Option<u64>) -> Self {
        Self { default_ms }
    }
}

impl<S> Layer<S> for BudgetLayer {
    type Service = Budget<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Budget {
            inner,
            default_ms: self.default_ms,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Budget<S> {
    inner: S,
    default_ms: Option<u64>,
}

impl<S> Service<ToolRequest> for Budget<S>
where
    S: Service<ToolRequest>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: ToolRequest) -> Self::Future {
        if req.ctx.deadline_ms.is_none() {
            req.ctx.deadline_ms = self.default_ms;
        }
        self.inner.call(req)
    }
}

#[cfg(test)]
mod tests {
    use tower::ServiceExt;

    use super::*;
    use crate::service::operation::domain_names;
    use crate::service::router::tests::make_request;

    /// Echoes the deadline it was handed.
    #[derive(Clone)]
    struct Echo;

    impl Service<ToolRequest> for Echo {
        type Response = Option<u64>;
        type Error = std::convert::Infallible;
        type Future = std::future::Ready<Result<Option<u64>, Self::Error>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: ToolRequest) -> Self::Future {
            std::future::ready(Ok(req.ctx.deadline_ms))
        }
    }

    fn request(deadline_ms: Option<u64>) -> ToolRequest {
        let mut req = make_request(1, domain_names::TOPIC);
        req.ctx.deadline_ms = deadline_ms;
        req
    }

    #[tokio::test]
    async fn default_fills_missing_deadline() {
        let svc = BudgetLayer::new(Some(2_000)).layer(Echo);
        assert_eq!(svc.oneshot(request(None)).await.unwrap(), Some(2_000));
    }

    #[tokio::test]
    async fn own_deadline_wins() {
        let svc = BudgetLayer::new(Some(2_000)).layer(Echo);
        assert_eq!(svc.oneshot(request(Some(50))).await.unwrap(), Some(50));
    }

    #[tokio::test]
    async fn no_default_leaves_call_unbounded() {
        let svc = BudgetLayer::new(None).layer(Echo);
        assert_eq!(svc.oneshot(request(None)).await.unwrap(), None);
    }
}
