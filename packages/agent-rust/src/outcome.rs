//! Execution outcomes and the flat record surfaced to callers.

use ledgerkit_core::{Receipt, ScheduleId, TransactionId};
use serde::{Deserialize, Serialize};

/// Terminal state of one execution attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Submitted and confirmed.
    Executed {
        receipt: Receipt,
        transaction_id: TransactionId,
    },
    /// Serialized for an external signer; nothing was sent.
    BytesReturned {
        /// Standard base64 of the encoded operation.
        transaction_bytes: String,
        transaction_id: Option<TransactionId>,
    },
    /// A schedule wrapping the operation was created; the operation itself
    /// has not run yet.
    ScheduleCreated {
        schedule_id: ScheduleId,
        transaction_id: TransactionId,
        description: String,
    },
    Failed {
        error: String,
        transaction_id: Option<TransactionId>,
        /// Set when the operation can only run in autonomous mode.
        requires_autonomous: bool,
    },
}

impl ExecutionOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    #[must_use]
    pub fn transaction_id(&self) -> Option<TransactionId> {
        match self {
            Self::Executed { transaction_id, .. } | Self::ScheduleCreated { transaction_id, .. } => {
                Some(*transaction_id)
            }
            Self::BytesReturned { transaction_id, .. } | Self::Failed { transaction_id, .. } => {
                *transaction_id
            }
        }
    }
}

/// An outcome plus every note accumulated on the way to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub outcome: ExecutionOutcome,
    pub notes: Vec<String>,
}

impl ExecutionReport {
    /// A failed report for errors raised before a strategy ran.
    #[must_use]
    pub fn failure(error: impl std::fmt::Display, notes: Vec<String>) -> Self {
        Self {
            outcome: ExecutionOutcome::Failed {
                error: error.to_string(),
                transaction_id: None,
                requires_autonomous: false,
            },
            notes,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Flattens the report into the caller-facing record.
    #[must_use]
    pub fn into_record(self) -> OutcomeRecord {
        let mut record = OutcomeRecord {
            success: self.outcome.is_success(),
            transaction_id: self.outcome.transaction_id(),
            notes: self.notes,
            ..OutcomeRecord::default()
        };
        match self.outcome {
            ExecutionOutcome::Executed { receipt, .. } => record.receipt = Some(receipt),
            ExecutionOutcome::BytesReturned {
                transaction_bytes, ..
            } => record.transaction_bytes = Some(transaction_bytes),
            ExecutionOutcome::ScheduleCreated {
                schedule_id,
                description,
                ..
            } => {
                record.schedule_id = Some(schedule_id);
                record.description = Some(description);
            }
            ExecutionOutcome::Failed {
                error,
                requires_autonomous,
                ..
            } => {
                record.error = Some(error);
                record.requires_autonomous = requires_autonomous.then_some(true);
            }
        }
        record
    }
}

/// The flat result shape every call returns, success or failure.
///
/// `notes` is always present, possibly empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeRecord {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub receipt: Option<Receipt>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub schedule_id: Option<ScheduleId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub transaction_bytes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub transaction_id: Option<TransactionId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub requires_autonomous: Option<bool>,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl OutcomeRecord {
    /// A failure record for errors raised before execution began.
    #[must_use]
    pub fn failure(error: impl std::fmt::Display, notes: Vec<String>) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            notes,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use ledgerkit_core::EntityId;

    use super::*;

    #[test]
    fn failure_record_keeps_notes_and_flag() {
        let report = ExecutionReport {
            outcome: ExecutionOutcome::Failed {
                error: "needs several operations".into(),
                transaction_id: None,
                requires_autonomous: true,
            },
            notes: vec!["defaulted gas".into()],
        };
        let json = serde_json::to_value(report.into_record()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": false,
                "error": "needs several operations",
                "requiresAutonomous": true,
                "notes": ["defaulted gas"]
            })
        );
    }

    #[test]
    fn schedule_record_carries_id_and_description() {
        let tx: TransactionId = "0.0.2@1.000000000".parse().unwrap();
        let record = ExecutionReport {
            outcome: ExecutionOutcome::ScheduleCreated {
                schedule_id: EntityId::num(9000),
                transaction_id: tx,
                description: "scheduled".into(),
            },
            notes: Vec::new(),
        }
        .into_record();

        assert!(record.success);
        assert_eq!(record.schedule_id, Some(EntityId::num(9000)));
        assert_eq!(record.transaction_id, Some(tx));
        assert!(record.requires_autonomous.is_none());
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["scheduleId"], "0.0.9000");
        assert_eq!(json["notes"], serde_json::json!([]));
    }

    #[test]
    fn failure_constructor() {
        let record = OutcomeRecord::failure("unknown tool `x`", vec!["n".into()]);
        assert!(!record.success);
        assert_eq!(record.error.as_deref(), Some("unknown tool `x`"));
        assert_eq!(record.notes, vec!["n".to_string()]);
    }
}
