//! Request, response and error types of the tool-call pipeline.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::builders::{
    AccountAction, ContractAction, FileAction, ScheduleAction, TokenAction, TopicAction,
};
use crate::meta::MetaOptions;
use crate::outcome::ExecutionReport;

/// Domain names used as routing keys.
pub mod domain_names {
    pub const ACCOUNT: &str = "account";
    pub const TOKEN: &str = "token";
    pub const TOPIC: &str = "topic";
    pub const FILE: &str = "file";
    pub const CONTRACT: &str = "contract";
    pub const SCHEDULE: &str = "schedule";

    pub const ALL: &[&str] = &[ACCOUNT, TOKEN, TOPIC, FILE, CONTRACT, SCHEDULE];
}

/// One tool invocation as received from a caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub meta: MetaOptions,
    /// Parameters the caller filled with defaults before calling.
    #[serde(default)]
    pub defaulted: Vec<String>,
    /// Upper bound on the call's duration; unbounded when absent.
    pub deadline_ms: Option<u64>,
}

/// Turns the caller's `defaulted` list into notes.
#[must_use]
pub fn defaulted_notes(defaulted: &[String]) -> Vec<String> {
    defaulted
        .iter()
        .map(|param| format!("No value was given for `{param}`, so a default was used."))
        .collect()
}

/// Context carried with every request through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolContext {
    pub call_id: u64,
    pub domain: &'static str,
    pub tool: String,
    pub deadline_ms: Option<u64>,
}

/// A classified tool action, one variant per domain.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolAction {
    Account(AccountAction),
    Token(TokenAction),
    Topic(TopicAction),
    File(FileAction),
    Contract(ContractAction),
    Schedule(ScheduleAction),
}

impl ToolAction {
    #[must_use]
    pub fn domain(&self) -> &'static str {
        match self {
            Self::Account(_) => domain_names::ACCOUNT,
            Self::Token(_) => domain_names::TOKEN,
            Self::Topic(_) => domain_names::TOPIC,
            Self::File(_) => domain_names::FILE,
            Self::Contract(_) => domain_names::CONTRACT,
            Self::Schedule(_) => domain_names::SCHEDULE,
        }
    }
}

/// A classified call ready for routing.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolRequest {
    pub ctx: ToolContext,
    pub action: ToolAction,
    pub meta: MetaOptions,
    pub defaulted: Vec<String>,
}

/// Result of a routed call. Ledger failures live inside `report`; the
/// pipeline's own failures are `OperationError`s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResponse {
    pub call_id: u64,
    pub report: ExecutionReport,
}

/// Errors raised by the pipeline itself.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("unknown domain: {name}")]
    UnknownDomain { name: String },
    #[error("request routed to the wrong domain service")]
    WrongService,
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Errors from classifying a `ToolCall`.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("unknown tool `{tool}`")]
    UnknownTool { tool: String },
    #[error("invalid parameters for `{tool}`: {source}")]
    InvalidParams {
        tool: String,
        source: serde_json::Error,
    },
}

/// Boxed future every pipeline service returns.
pub type ToolFuture = Pin<Box<dyn Future<Output = Result<ToolResponse, OperationError>> + Send>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_call_deserializes_with_defaults() {
        let call: ToolCall = serde_json::from_str(r#"{"tool":"delete_topic"}"#).unwrap();
        assert_eq!(call.tool, "delete_topic");
        assert!(call.params.is_null());
        assert_eq!(call.meta, MetaOptions::default());
        assert!(call.defaulted.is_empty());
        assert_eq!(call.deadline_ms, None);
    }

    #[test]
    fn defaulted_params_become_notes() {
        let notes = defaulted_notes(&["decimals".to_string()]);
        assert_eq!(notes, vec!["No value was given for `decimals`, so a default was used."]);
    }
}
