//! Receipts returned by the ledger once an operation reaches consensus.

use serde::{Deserialize, Serialize};

use crate::ids::{
    AccountId, ContractId, FileId, ScheduleId, TokenId, TopicId, TransactionId,
};

/// Status string of a successful receipt.
pub const STATUS_SUCCESS: &str = "SUCCESS";

/// Outcome record of one submitted operation.
///
/// Only the fields relevant to the operation kind are populated: an account
/// creation fills `account_id`, a schedule creation fills `schedule_id`, and
/// so on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub account_id: Option<AccountId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub token_id: Option<TokenId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub topic_id: Option<TopicId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub file_id: Option<FileId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub contract_id: Option<ContractId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub schedule_id: Option<ScheduleId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub scheduled_transaction_id: Option<TransactionId>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub serial_numbers: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub topic_sequence_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub total_supply: Option<i64>,
}

impl Receipt {
    /// A bare successful receipt.
    #[must_use]
    pub fn success() -> Self {
        Self {
            status: STATUS_SUCCESS.to_string(),
            ..Self::default()
        }
    }

    /// Returns `true` when the status is `SUCCESS`.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::EntityId;

    #[test]
    fn success_receipt_serializes_sparse() {
        let receipt = Receipt {
            token_id: Some(EntityId::num(12)),
            ..Receipt::success()
        };
        assert!(receipt.is_success());
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "SUCCESS", "tokenId": "0.0.12" }));
    }
}
