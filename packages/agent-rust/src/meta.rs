//! Cross-cutting meta options and their application to a staged operation.

use ledgerkit_core::{KeyError, KeyInput, KeyResolver, KeyValue, NodeId, StagedOperation, TransactionId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Caller-supplied adjustments applicable to any staged operation.
///
/// Every field is optional; absence leaves the builder's choice in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetaOptions {
    pub memo: Option<String>,
    /// Transaction id to use instead of a generated one.
    #[serde(alias = "transactionId")]
    pub explicit_id: Option<String>,
    /// Node account ids to restrict submission to.
    #[serde(alias = "nodeIds")]
    pub target_nodes: Vec<String>,
    /// Overrides the agent's scheduling default in return-bytes mode.
    pub schedule: Option<bool>,
    pub schedule_memo: Option<String>,
    pub schedule_payer: Option<String>,
    pub schedule_admin_key: Option<KeyInput>,
    pub wait_for_expiry: Option<bool>,
}

impl MetaOptions {
    /// Options that request (or refuse) scheduling and nothing else.
    #[must_use]
    pub fn schedule(schedule: bool) -> Self {
        Self {
            schedule: Some(schedule),
            ..Self::default()
        }
    }
}

/// Applies [`MetaOptions`] to a staged operation.
#[derive(Debug, Clone)]
pub struct MetaOptionsApplier {
    resolver: KeyResolver,
}

impl MetaOptionsApplier {
    #[must_use]
    pub fn new(resolver: KeyResolver) -> Self {
        Self { resolver }
    }

    /// Applies, in order: operator-key substitution on every key slot still
    /// holding the sentinel, the explicit id, target nodes, and the memo.
    ///
    /// Malformed ids or node lists are logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::SignerUnavailable` when a slot holds the sentinel
    /// and no operator key is available. Nothing is modified in that case.
    pub fn apply(&self, op: &mut StagedOperation, meta: &MetaOptions) -> Result<(), KeyError> {
        self.substitute_operator_keys(op)?;

        if let Some(raw) = meta.explicit_id.as_deref() {
            match raw.parse::<TransactionId>() {
                Ok(id) => op.transaction_id = Some(id),
                Err(err) => warn!(explicit_id = raw, error = %err, "ignoring malformed explicit id"),
            }
        }

        if !meta.target_nodes.is_empty() {
            let parsed: Result<Vec<NodeId>, _> =
                meta.target_nodes.iter().map(|n| n.parse::<NodeId>()).collect();
            match parsed {
                Ok(nodes) => op.node_account_ids = nodes,
                Err(err) => warn!(
                    target_nodes = ?meta.target_nodes,
                    error = %err,
                    "ignoring target node list with a malformed entry"
                ),
            }
        }

        if let Some(memo) = &meta.memo {
            op.memo = Some(memo.clone());
        }
        Ok(())
    }

    /// Replaces every [`KeyValue::OperatorKey`] slot with the operator's key.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::SignerUnavailable` when a substitution is needed
    /// but no operator key exists.
    pub fn substitute_operator_keys(&self, op: &mut StagedOperation) -> Result<(), KeyError> {
        let kind = op.kind();
        let mut slots = op.body.key_slots_mut();
        slots.retain(|(_, slot)| matches!(slot, KeyValue::OperatorKey));
        if slots.is_empty() {
            return Ok(());
        }
        let operator = self.resolver.operator_key()?;
        for (role, slot) in slots {
            info!(kind = kind.label(), role = %role, "substituting operator public key");
            *slot = KeyValue::from(operator.clone());
        }
        Ok(())
    }
}
