//! The agent facade: one entry point for tool calls and builder access.

use tokio::sync::Mutex;
use tower::util::BoxService;
use tower::{Service, ServiceExt};

use crate::builders::{
    AccountBuilder, ContractBuilder, FileBuilder, ScheduleBuilder, TokenBuilder, TopicBuilder,
};
use crate::context::AgentContext;
use crate::outcome::{ExecutionReport, OutcomeRecord};
use crate::service::domain::{
    AccountService, ContractService, FileService, ScheduleService, TokenService, TopicService,
};
use crate::service::middleware::build_tool_pipeline;
use crate::service::{
    defaulted_notes, OperationError, ToolCall, ToolClassifier, ToolRequest, ToolResponse,
    ToolRouter,
};

type Pipeline = BoxService<ToolRequest, ToolResponse, OperationError>;

/// Classifies tool calls and runs them through the middleware pipeline.
///
/// Every call yields a well-formed [`OutcomeRecord`]; classification and
/// pipeline errors become failure records.
pub struct Agent {
    ctx: AgentContext,
    classifier: ToolClassifier,
    pipeline: Mutex<Pipeline>,
}

impl Agent {
    #[must_use]
    pub fn new(ctx: AgentContext) -> Self {
        let mut router = ToolRouter::new();
        router.register(AccountService::DOMAIN, AccountService::new(ctx.clone()));
        router.register(TokenService::DOMAIN, TokenService::new(ctx.clone()));
        router.register(TopicService::DOMAIN, TopicService::new(ctx.clone()));
        router.register(FileService::DOMAIN, FileService::new(ctx.clone()));
        router.register(ContractService::DOMAIN, ContractService::new(ctx.clone()));
        router.register(ScheduleService::DOMAIN, ScheduleService::new(ctx.clone()));

        let pipeline = BoxService::new(build_tool_pipeline(router, &ctx.config));
        tracing::debug!(mode = ?ctx.config.mode, network = ?ctx.config.network, "agent ready");
        Self {
            ctx,
            classifier: ToolClassifier::new(),
            pipeline: Mutex::new(pipeline),
        }
    }

    #[must_use]
    pub fn context(&self) -> &AgentContext {
        &self.ctx
    }

    /// Runs one tool call to completion.
    pub async fn call(&self, call: ToolCall) -> OutcomeRecord {
        self.call_report(call).await.into_record()
    }

    /// Like [`Self::call`], keeping the structured outcome.
    pub async fn call_report(&self, call: ToolCall) -> ExecutionReport {
        let fallback_notes = defaulted_notes(&call.defaulted);
        let tool = call.tool.clone();
        let request = match self.classifier.classify(call) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(tool = %tool, error = %err, "rejected tool call");
                return ExecutionReport::failure(err, fallback_notes);
            }
        };
        match self.dispatch(request).await {
            Ok(response) => response.report,
            Err(err) => {
                tracing::warn!(tool = %tool, error = %err, "tool call failed in the pipeline");
                ExecutionReport::failure(err, fallback_notes)
            }
        }
    }

    async fn dispatch(&self, request: ToolRequest) -> Result<ToolResponse, OperationError> {
        // The lock covers readiness and dispatch only; the call runs unlocked.
        let fut = {
            let mut pipeline = self.pipeline.lock().await;
            pipeline.ready().await?.call(request)
        };
        fut.await
    }

    #[must_use]
    pub fn accounts(&self) -> AccountBuilder {
        AccountBuilder::new(self.ctx.clone())
    }

    #[must_use]
    pub fn tokens(&self) -> TokenBuilder {
        TokenBuilder::new(self.ctx.clone())
    }

    #[must_use]
    pub fn topics(&self) -> TopicBuilder {
        TopicBuilder::new(self.ctx.clone())
    }

    #[must_use]
    pub fn files(&self) -> FileBuilder {
        FileBuilder::new(self.ctx.clone())
    }

    #[must_use]
    pub fn contracts(&self) -> ContractBuilder {
        ContractBuilder::new(self.ctx.clone())
    }

    #[must_use]
    pub fn schedules(&self) -> ScheduleBuilder {
        ScheduleBuilder::new(self.ctx.clone())
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}
