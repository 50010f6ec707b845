//! Admission control.
//!
//! At most `capacity` tool calls run at once. A call that arrives while the
//! agent is full is answered on the spot with a failed report; it keeps the
//! caller's defaulted-parameter notes and is never queued.

use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::Semaphore;
use tower::{Layer, Service};

use crate::outcome::ExecutionReport;
use crate::service::operation::{
    defaulted_notes, OperationError, ToolFuture, ToolRequest, ToolResponse,
};

/// Why a call was refused admission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("the agent is already running {capacity} tool calls; retry `{tool}` once one completes")]
pub struct AtCapacity {
    pub capacity: u32,
    pub tool: String,
}

#[derive(Debug, Clone)]
pub struct AdmissionLayer {
    slots: Arc<Semaphore>,
    capacity: u32,
}

impl AdmissionLayer {
    #[must_use]
    pub fn new(capacity: u32) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(capacity as usize)),
            capacity,
        }
    }
}

impl<S> Layer<S> for AdmissionLayer {
    type Service = Admission<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Admission {
            inner,
            slots: Arc::clone(&self.slots),
            capacity: self.capacity,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Admission<S> {
    inner: S,
    slots: Arc<Semaphore>,
    capacity: u32,
}

impl<S> Admission<S> {
    fn refuse(&self, req: &ToolRequest) -> ToolResponse {
        let refusal = AtCapacity {
            capacity: self.capacity,
            tool: req.ctx.tool.clone(),
        };
        tracing::warn!(
            call_id = req.ctx.call_id,
            tool = %req.ctx.tool,
            capacity = self.capacity,
            "tool call refused at capacity"
        );
        ToolResponse {
            call_id: req.ctx.call_id,
            report: ExecutionReport::failure(refusal, defaulted_notes(&req.defaulted)),
        }
    }
}

impl<S> Service<ToolRequest> for Admission<S>
where
    S: Service<ToolRequest, Response = ToolResponse, Error = OperationError> + Send,
    S::Future: Send + 'static,
{
    type Response = ToolResponse;
    type Error = OperationError;
    type Future = ToolFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: ToolRequest) -> Self::Future {
        match Arc::clone(&self.slots).try_acquire_owned() {
            Ok(slot) => {
                let fut = self.inner.call(req);
                Box::pin(async move {
                    let _slot = slot;
                    fut.await
                })
            }
            Err(_) => {
                let response = self.refuse(&req);
                Box::pin(async move { Ok(response) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::Notify;
    use tower::ServiceExt;

    use super::*;
    use crate::outcome::ExecutionOutcome;
    use crate::service::operation::domain_names;
    use crate::service::router::tests::make_request;

    /// Holds every call until `release` is notified.
    struct Gated {
        release: Arc<Notify>,
    }

    impl Service<ToolRequest> for Gated {
        type Response = ToolResponse;
        type Error = OperationError;
        type Future = ToolFuture;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: ToolRequest) -> Self::Future {
            let release = Arc::clone(&self.release);
            Box::pin(async move {
                release.notified().await;
                Ok(ToolResponse {
                    call_id: req.ctx.call_id,
                    report: ExecutionReport {
                        outcome: ExecutionOutcome::BytesReturned {
                            transaction_bytes: String::new(),
                            transaction_id: None,
                        },
                        notes: Vec::new(),
                    },
                })
            })
        }
    }

    #[tokio::test]
    async fn full_agent_answers_with_failed_report_keeping_defaulted_notes() {
        let release = Arc::new(Notify::new());
        let mut svc = AdmissionLayer::new(1).layer(Gated {
            release: Arc::clone(&release),
        });

        let first = ServiceExt::ready(&mut svc)
            .await
            .unwrap()
            .call(make_request(1, domain_names::TOPIC));

        let mut second = make_request(2, domain_names::TOPIC);
        second.defaulted = vec!["topicMemo".to_string()];
        let refused = ServiceExt::ready(&mut svc).await.unwrap().call(second).await.unwrap();

        assert_eq!(refused.call_id, 2);
        let record = refused.report.into_record();
        assert!(!record.success);
        assert!(record.error.unwrap().contains("already running 1 tool calls"));
        assert_eq!(record.notes, defaulted_notes(&["topicMemo".to_string()]));

        release.notify_one();
        assert!(first.await.unwrap().report.is_success());
    }

    #[tokio::test]
    async fn finished_call_frees_its_slot() {
        let release = Arc::new(Notify::new());
        let mut svc = AdmissionLayer::new(1).layer(Gated {
            release: Arc::clone(&release),
        });

        release.notify_one();
        let done = ServiceExt::ready(&mut svc)
            .await
            .unwrap()
            .call(make_request(1, domain_names::TOPIC))
            .await
            .unwrap();
        assert!(done.report.is_success());

        release.notify_one();
        let next = svc.oneshot(make_request(2, domain_names::TOPIC)).await.unwrap();
        assert!(next.report.is_success());
    }
}
