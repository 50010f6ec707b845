//! Request routing: dispatches `ToolRequest` to domain services by domain.

use std::collections::HashMap;
use std::task::{Context, Poll};

use tower::Service;

use super::operation::{OperationError, ToolFuture, ToolRequest, ToolResponse};

/// A boxed Tower service that handles requests for a single domain.
type BoxedService =
    Box<dyn Service<ToolRequest, Response = ToolResponse, Error = OperationError, Future = ToolFuture> + Send>;

// ---------------------------------------------------------------------------
// ToolRouter
// ---------------------------------------------------------------------------

/// Routes `ToolRequest` values to the domain service registered under
/// `ctx.domain`. Unregistered domains yield `OperationError::UnknownDomain`.
pub struct ToolRouter {
    services: HashMap<&'static str, BoxedService>,
}

impl ToolRouter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Registers the service for `domain`, replacing any previous one.
    pub fn register<S>(&mut self, domain: &'static str, service: S)
    where
        S: Service<ToolRequest, Response = ToolResponse, Error = OperationError> + Send + 'static,
        S::Future: Send + 'static,
    {
        self.services.insert(domain, Box::new(ServiceWrapper(service)));
    }

    #[must_use]
    pub fn domains(&self) -> Vec<&'static str> {
        let mut domains: Vec<_> = self.services.keys().copied().collect();
        domains.sort_unstable();
        domains
    }
}

impl Default for ToolRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<ToolRequest> for ToolRouter {
    type Response = ToolResponse;
    type Error = OperationError;
    type Future = ToolFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        for svc in self.services.values_mut() {
            match svc.poll_ready(cx) {
                Poll::Ready(Ok(())) => {}
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Pending => return Poll::Pending,
            }
        }
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ToolRequest) -> Self::Future {
        let domain = req.ctx.domain;
        match self.services.get_mut(domain) {
            Some(svc) => svc.call(req),
            None => Box::pin(async move {
                Err(OperationError::UnknownDomain {
                    name: domain.to_string(),
                })
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// ServiceWrapper
// ---------------------------------------------------------------------------

/// Type-erases a concrete `Service<ToolRequest>` into a `BoxedService`.
struct ServiceWrapper<S>(S);

impl<S> Service<ToolRequest> for ServiceWrapper<S>
where
    S: Service<ToolRequest, Response = ToolResponse, Error = OperationError> + Send,
    S::Future: Send + 'static,
{
    type Response = ToolResponse;
    type Error = OperationError;
    type Future = ToolFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.0.poll_ready(cx)
    }

    fn call(&mut self, req: ToolRequest) -> Self::Future {
        Box::pin(self.0.call(req))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
