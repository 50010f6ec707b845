//! Call tracing.
//!
//! Each call runs inside one `tool_call` span. When it finishes the span
//! records how the call was delivered, how long it took, how many notes it
//! carried and whether it needs autonomous mode.

use std::task::{Context, Poll};
use std::time::Instant;

use tower::{Layer, Service};
use tracing::{field, info_span, Instrument, Span};

use crate::outcome::ExecutionOutcome;
use crate::service::operation::{OperationError, ToolFuture, ToolRequest, ToolResponse};

/// Delivery label of a finished call.
#[must_use]
pub fn delivery(result: &Result<ToolResponse, OperationError>) -> &'static str {
    let Ok(response) = result else {
        return "pipeline_error";
    };
    match response.report.outcome {
        ExecutionOutcome::Executed { .. } => "executed",
        ExecutionOutcome::BytesReturned { .. } => "bytes_returned",
        ExecutionOutcome::ScheduleCreated { .. } => "schedule_created",
        ExecutionOutcome::Failed { .. } => "failed",
    }
}

fn record_finish(span: &Span, result: &Result<ToolResponse, OperationError>, started: Instant) {
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let delivered = delivery(result);
    span.record("delivery", delivered);
    span.record("duration_ms", elapsed_ms);

    match result {
        Ok(response) => {
            let notes = u64::try_from(response.report.notes.len()).unwrap_or(u64::MAX);
            span.record("notes", notes);
            if let ExecutionOutcome::Failed {
                error,
                requires_autonomous,
                ..
            } = &response.report.outcome
            {
                span.record("requires_autonomous", *requires_autonomous);
                tracing::warn!(error = %error, elapsed_ms, "tool call failed");
            } else {
                tracing::info!(delivery = delivered, elapsed_ms, "tool call delivered");
            }
        }
        Err(err) => tracing::warn!(error = %err, elapsed_ms, "tool call did not reach a domain"),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TraceLayer;

impl<S> Layer<S> for TraceLayer {
    type Service = Traced<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Traced { inner }
    }
}

#[derive(Debug, Clone)]
pub struct Traced<S> {
    inner: S,
}

impl<S> Service<ToolRequest> for Traced<S>
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
        let span = info_span!(
            "tool_call",
            call_id = req.ctx.call_id,
            domain = req.ctx.domain,
            tool = %req.ctx.tool,
            deadline_ms = req.ctx.deadline_ms,
            delivery = field::Empty,
            duration_ms = field::Empty,
            notes = field::Empty,
            requires_autonomous = field::Empty,
        );
        let fut = self.inner.call(req);
        let started = Instant::now();
        Box::pin(
            async move {
                let result = fut.await;
                record_finish(&Span::current(), &result, started);
                result
            }
            .instrument(span),
        )
    }
}
