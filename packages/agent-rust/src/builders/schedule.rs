//! Operations on existing schedules. Neither can itself be scheduled.

use ledgerkit_core::operation::ScheduleTarget;
use ledgerkit_core::{OperationBody, ScheduleId};
use serde::Deserialize;

use super::BuildError;
use crate::stage::Staged;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleParams {
    pub schedule_id: ScheduleId,
}

fn target(params: &ScheduleParams) -> ScheduleTarget {
    ScheduleTarget {
        schedule_id: params.schedule_id,
    }
}

domain_builder!(
    /// Stages signatures and deletions of existing schedules.
    ScheduleBuilder
);

impl ScheduleBuilder {
    /// Adds the executing signer's signature to a pending schedule.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the other stage methods.
    pub fn sign_schedule(&mut self, params: &ScheduleParams) -> Result<&mut Self, BuildError> {
        self.restage(|_| Ok(Staged::new(OperationBody::ScheduleSign(target(params)))))
    }

    /// # Errors
    ///
    /// Never fails; the signature matches the other stage methods.
    pub fn delete_schedule(&mut self, params: &ScheduleParams) -> Result<&mut Self, BuildError> {
        self.restage(|_| Ok(Staged::new(OperationBody::ScheduleDelete(target(params)))))
    }
}

/// A classified schedule tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleAction {
    SignSchedule(ScheduleParams),
    DeleteSchedule(ScheduleParams),
}

impl ScheduleAction {
    pub const TOOLS: &'static [&'static str] = &["sign_schedule", "delete_schedule"];

    /// Parses `params` for `tool`; `None` when the tool is not a schedule tool.
    #[must_use]
    pub fn parse(tool: &str, params: serde_json::Value) -> Option<Result<Self, serde_json::Error>> {
        use serde_json::from_value;
        let action = match tool {
            "sign_schedule" => from_value(params).map(Self::SignSchedule),
            "delete_schedule" => from_value(params).map(Self::DeleteSchedule),
            _ => return None,
        };
        Some(action)
    }

    /// Stages this action on `builder`.
    ///
    /// # Errors
    ///
    /// Propagates the stage function's `BuildError`.
    pub fn stage_into(&self, builder: &mut ScheduleBuilder) -> Result<(), BuildError> {
        let staged = match self {
            Self::SignSchedule(p) => builder.sign_schedule(p),
            Self::DeleteSchedule(p) => builder.delete_schedule(p),
        };
        staged.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use ledgerkit_core::EntityId;

    use super::*;
    use crate::builders::testing::context_with;
    use crate::builders::StageBuilder;
    use crate::config::{AgentConfig, OperatingMode};
    use crate::meta::MetaOptions;

    #[tokio::test]
    async fn sign_is_returned_as_bytes_even_when_scheduling_by_default() {
        let (ledger, ctx) = context_with(AgentConfig {
            mode: OperatingMode::ReturnBytes,
            schedule_by_default: true,
            ..AgentConfig::default()
        });
        let mut builder = ScheduleBuilder::new(ctx);
        builder
            .sign_schedule(&ScheduleParams {
                schedule_id: EntityId::num(77),
            })
            .unwrap();
        let record = builder.execute(&MetaOptions::schedule(true)).await.into_record();
        assert!(record.success);
        assert!(record.transaction_bytes.is_some());
        assert!(record.schedule_id.is_none());
        assert!(ledger.submissions().is_empty());
    }

    #[tokio::test]
    async fn delete_executes_autonomously() {
        let (ledger, ctx) = context_with(AgentConfig::default());
        let mut builder = ScheduleBuilder::new(ctx);
        builder
            .delete_schedule(&ScheduleParams {
                schedule_id: EntityId::num(77),
            })
            .unwrap();
        let report = builder.execute(&MetaOptions::default()).await;
        assert!(report.is_success());
        assert_eq!(ledger.submissions()[0].kind().label(), "schedule deletion");
    }

    #[test]
    fn execution_consumes_the_stage() {
        let (_, ctx) = context_with(AgentConfig {
            mode: OperatingMode::ReturnBytes,
            ..AgentConfig::default()
        });
        let mut builder = ScheduleBuilder::new(ctx);
        builder
            .sign_schedule(&ScheduleParams {
                schedule_id: EntityId::num(77),
            })
            .unwrap();
        builder.get_bytes(&MetaOptions::default()).unwrap();
        assert!(builder.current_operation().is_err());
        assert!(builder.get_bytes(&MetaOptions::default()).is_err());
    }
}
