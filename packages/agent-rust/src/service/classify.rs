//! Tool-call classification: maps a tool name to its domain and parses the
//! parameters into a typed action.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::builders::{
    AccountAction, ContractAction, FileAction, ScheduleAction, TokenAction, TopicAction,
};

use super::operation::{ClassifyError, ToolAction, ToolCall, ToolContext, ToolRequest};

// ---------------------------------------------------------------------------
// ToolClassifier
// ---------------------------------------------------------------------------

/// Classifies incoming `ToolCall` values into routed `ToolRequest`s.
///
/// Each classified call receives a unique, monotonically increasing call id.
#[derive(Debug)]
pub struct ToolClassifier {
    call_id_counter: AtomicU64,
}

impl ToolClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self {
            call_id_counter: AtomicU64::new(1),
        }
    }

    fn next_call_id(&self) -> u64 {
        self.call_id_counter.fetch_add(1, Ordering::Relaxed)
    }

    /// Every tool name the classifier recognizes.
    pub fn tools() -> impl Iterator<Item = &'static str> {
        [
            AccountAction::TOOLS,
            TokenAction::TOOLS,
            TopicAction::TOOLS,
            FileAction::TOOLS,
            ContractAction::TOOLS,
            ScheduleAction::TOOLS,
        ]
        .into_iter()
        .flatten()
        .copied()
    }

    /// Classifies `call`.
    ///
    /// # Errors
    ///
    /// - `ClassifyError::UnknownTool` when no domain owns the tool name
    /// - `ClassifyError::InvalidParams` when the parameters do not match the
    ///   tool's shape
    pub fn classify(&self, call: ToolCall) -> Result<ToolRequest, ClassifyError> {
        let ToolCall {
            tool,
            params,
            meta,
            defaulted,
            deadline_ms,
        } = call;

        let parsed = parse_action(&tool, params).ok_or_else(|| ClassifyError::UnknownTool {
            tool: tool.clone(),
        })?;
        let action = parsed.map_err(|source| ClassifyError::InvalidParams {
            tool: tool.clone(),
            source,
        })?;

        Ok(ToolRequest {
            ctx: ToolContext {
                call_id: self.next_call_id(),
                domain: action.domain(),
                tool,
                deadline_ms,
            },
            action,
            meta,
            defaulted,
        })
    }
}

impl Default for ToolClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_action(
    tool: &str,
    params: serde_json::Value,
) -> Option<Result<ToolAction, serde_json::Error>> {
    // Tool names are unique across domains, so membership picks the parser.
    let parsed = if AccountAction::TOOLS.contains(&tool) {
        AccountAction::parse(tool, params)?.map(ToolAction::Account)
    } else if TokenAction::TOOLS.contains(&tool) {
        TokenAction::parse(tool, params)?.map(ToolAction::Token)
    } else if TopicAction::TOOLS.contains(&tool) {
        TopicAction::parse(tool, params)?.map(ToolAction::Topic)
    } else if FileAction::TOOLS.contains(&tool) {
        FileAction::parse(tool, params)?.map(ToolAction::File)
    } else if ContractAction::TOOLS.contains(&tool) {
        ContractAction::parse(tool, params)?.map(ToolAction::Contract)
    } else if ScheduleAction::TOOLS.contains(&tool) {
        ScheduleAction::parse(tool, params)?.map(ToolAction::Schedule)
    } else {
        return None;
    };
    Some(parsed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
