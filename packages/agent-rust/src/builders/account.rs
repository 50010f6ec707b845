//! Account operations: create, HBAR transfer, update, delete, allowance.

use ledgerkit_core::operation::{
    AccountCreate, AccountDelete, AccountUpdate, HbarAllowance, HbarTransfer, Transfer,
};
use ledgerkit_core::{to_base_units, AccountId, AmountInput, KeyInput, KeyValue, OperationBody, HBAR_DECIMALS};
use serde::Deserialize;

use super::{staged_with_notes, BuildContext, BuildError};
use crate::stage::Staged;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountParams {
    pub public_key: Option<KeyInput>,
    /// Starting balance in HBAR.
    pub initial_balance: Option<AmountInput>,
    pub max_automatic_token_associations: Option<i32>,
    pub account_memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HbarTransferParam {
    pub account_id: AccountId,
    /// HBAR credited to `account_id`.
    pub amount: AmountInput,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferHbarParams {
    pub transfers: Vec<HbarTransferParam>,
    pub source_account_id: Option<AccountId>,
    pub transaction_memo: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountParams {
    pub account_id: Option<AccountId>,
    pub public_key: Option<KeyInput>,
    pub account_memo: Option<String>,
    pub max_automatic_token_associations: Option<i32>,
    pub decline_staking_reward: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAccountParams {
    pub account_id: AccountId,
    pub transfer_account_id: Option<AccountId>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveHbarAllowanceParams {
    pub owner_account_id: Option<AccountId>,
    pub spender_account_id: AccountId,
    /// Allowance in HBAR.
    pub amount: AmountInput,
}

// ---------------------------------------------------------------------------
// Stage functions
// ---------------------------------------------------------------------------

/// # Errors
///
/// Fails on an invalid key or a malformed initial balance.
pub fn create_account(ctx: &BuildContext, params: &CreateAccountParams) -> Result<Staged, BuildError> {
    let mut notes = Vec::new();
    let key = match &params.public_key {
        Some(input) => ctx.key(input)?,
        None => {
            notes.push("No public key was given, so the new account is controlled by the operator key.".to_string());
            KeyValue::OperatorKey
        }
    };
    let initial_balance = params
        .initial_balance
        .as_ref()
        .map(|a| to_base_units(a, HBAR_DECIMALS))
        .transpose()?
        .unwrap_or(0);
    if initial_balance < 0 {
        return Err(BuildError::invalid("initialBalance", "must not be negative"));
    }
    let body = OperationBody::AccountCreate(AccountCreate {
        key: Some(key),
        initial_balance,
        max_automatic_token_associations: params.max_automatic_token_associations,
        account_memo: params.account_memo.clone(),
    });
    Ok(staged_with_notes(body, notes))
}

/// Builds a balanced transfer: every listed credit plus one debit of the
/// total from the source account.
///
/// # Errors
///
/// Fails on an empty transfer list, a non-positive amount, or when no source
/// account can be determined.
pub fn transfer_hbar(ctx: &BuildContext, params: &TransferHbarParams) -> Result<Staged, BuildError> {
    if params.transfers.is_empty() {
        return Err(BuildError::invalid("transfers", "at least one recipient is required"));
    }
    let mut notes = Vec::new();
    let source = ctx.account_or_default("sourceAccountId", params.source_account_id, &mut notes, |a| {
        format!("No source account was given, so the HBAR is sent from {a}.")
    })?;

    let mut hbar_transfers = Vec::with_capacity(params.transfers.len() + 1);
    let mut total: i64 = 0;
    for leg in &params.transfers {
        let amount = to_base_units(&leg.amount, HBAR_DECIMALS)?;
        if amount <= 0 {
            return Err(BuildError::invalid("transfers.amount", "must be positive"));
        }
        total = total
            .checked_add(amount)
            .ok_or_else(|| BuildError::invalid("transfers.amount", "total overflows"))?;
        hbar_transfers.push(HbarTransfer {
            account_id: leg.account_id,
            amount,
        });
    }
    hbar_transfers.push(HbarTransfer {
        account_id: source,
        amount: -total,
    });

    let mut staged = staged_with_notes(
        OperationBody::Transfer(Transfer {
            hbar_transfers,
            ..Transfer::default()
        }),
        notes,
    );
    staged.operation.memo.clone_from(&params.transaction_memo);
    Ok(staged)
}

/// # Errors
///
/// Fails when no account can be determined or the new key is invalid.
pub fn update_account(ctx: &BuildContext, params: &UpdateAccountParams) -> Result<Staged, BuildError> {
    let mut notes = Vec::new();
    let account_id = ctx.account_or_default("accountId", params.account_id, &mut notes, |a| {
        format!("No account was given, so account {a} is updated.")
    })?;
    let key = params.public_key.as_ref().map(|k| ctx.key(k)).transpose()?;
    let body = OperationBody::AccountUpdate(AccountUpdate {
        account_id,
        key,
        account_memo: params.account_memo.clone(),
        max_automatic_token_associations: params.max_automatic_token_associations,
        decline_staking_reward: params.decline_staking_reward,
    });
    Ok(staged_with_notes(body, notes))
}

/// # Errors
///
/// Fails when no transfer account is given and no operator is configured.
pub fn delete_account(ctx: &BuildContext, params: &DeleteAccountParams) -> Result<Staged, BuildError> {
    let mut notes = Vec::new();
    let transfer_account_id =
        ctx.account_or_operator("transferAccountId", params.transfer_account_id, &mut notes, |a| {
            format!("No transfer account was given, so the remaining balance goes to the operator account {a}.")
        })?;
    if transfer_account_id == params.account_id {
        return Err(BuildError::invalid(
            "transferAccountId",
            "must differ from the account being deleted",
        ));
    }
    let body = OperationBody::AccountDelete(AccountDelete {
        account_id: params.account_id,
        transfer_account_id,
    });
    Ok(staged_with_notes(body, notes))
}

/// # Errors
///
/// Fails on a malformed or negative amount or a missing owner.
pub fn approve_hbar_allowance(
    ctx: &BuildContext,
    params: &ApproveHbarAllowanceParams,
) -> Result<Staged, BuildError> {
    let mut notes = Vec::new();
    let owner_account_id =
        ctx.account_or_default("ownerAccountId", params.owner_account_id, &mut notes, |a| {
            format!("No owner account was given, so the allowance is granted from {a}.")
        })?;
    let amount = to_base_units(&params.amount, HBAR_DECIMALS)?;
    if amount < 0 {
        return Err(BuildError::invalid("amount", "must not be negative"));
    }
    let body = OperationBody::HbarAllowance(HbarAllowance {
        owner_account_id,
        spender_account_id: params.spender_account_id,
        amount,
    });
    Ok(staged_with_notes(body, notes))
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

domain_builder!(
    /// Stages account operations.
    AccountBuilder
);

impl AccountBuilder {
    /// # Errors
    ///
    /// See [`create_account`].
    pub fn create_account(&mut self, params: &CreateAccountParams) -> Result<&mut Self, BuildError> {
        self.restage(|ctx| create_account(ctx, params))
    }

    /// # Errors
    ///
    /// See [`transfer_hbar`].
    pub fn transfer_hbar(&mut self, params: &TransferHbarParams) -> Result<&mut Self, BuildError> {
        self.restage(|ctx| transfer_hbar(ctx, params))
    }

    /// # Errors
    ///
    /// See [`update_account`].
    pub fn update_account(&mut self, params: &UpdateAccountParams) -> Result<&mut Self, BuildError> {
        self.restage(|ctx| update_account(ctx, params))
    }

    /// # Errors
    ///
    /// See [`delete_account`].
    pub fn delete_account(&mut self, params: &DeleteAccountParams) -> Result<&mut Self, BuildError> {
        self.restage(|ctx| delete_account(ctx, params))
    }

    /// # Errors
    ///
    /// See [`approve_hbar_allowance`].
    pub fn approve_hbar_allowance(
        &mut self,
        params: &ApproveHbarAllowanceParams,
    ) -> Result<&mut Self, BuildError> {
        self.restage(|ctx| approve_hbar_allowance(ctx, params))
    }
}

// ---------------------------------------------------------------------------
// Tool actions
// ---------------------------------------------------------------------------

/// A classified account tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum AccountAction {
    CreateAccount(CreateAccountParams),
    TransferHbar(TransferHbarParams),
    UpdateAccount(UpdateAccountParams),
    DeleteAccount(DeleteAccountParams),
    ApproveHbarAllowance(ApproveHbarAllowanceParams),
}

impl AccountAction {
    pub const TOOLS: &'static [&'static str] = &[
        "create_account",
        "transfer_hbar",
        "update_account",
        "delete_account",
        "approve_hbar_allowance",
    ];

    /// Parses `params` for `tool`; `None` when the tool is not an account tool.
    #[must_use]
    pub fn parse(tool: &str, params: serde_json::Value) -> Option<Result<Self, serde_json::Error>> {
        let action = match tool {
            "create_account" => serde_json::from_value(params).map(Self::CreateAccount),
            "transfer_hbar" => serde_json::from_value(params).map(Self::TransferHbar),
            "update_account" => serde_json::from_value(params).map(Self::UpdateAccount),
            "delete_account" => serde_json::from_value(params).map(Self::DeleteAccount),
            "approve_hbar_allowance" => serde_json::from_value(params).map(Self::ApproveHbarAllowance),
            _ => return None,
        };
        Some(action)
    }

    /// Stages this action on `builder`.
    ///
    /// # Errors
    ///
    /// Propagates the stage function's `BuildError`.
    pub fn stage_into(&self, builder: &mut AccountBuilder) -> Result<(), BuildError> {
        let staged = match self {
            Self::CreateAccount(p) => builder.create_account(p),
            Self::TransferHbar(p) => builder.transfer_hbar(p),
            Self::UpdateAccount(p) => builder.update_account(p),
            Self::DeleteAccount(p) => builder.delete_account(p),
            Self::ApproveHbarAllowance(p) => builder.approve_hbar_allowance(p),
        };
        staged.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use ledgerkit_core::{EntityId, Key};

    use super::*;
    use crate::builders::testing::{context, key, OPERATOR};
    use crate::builders::StageBuilder;
    use crate::meta::MetaOptions;
    use crate::outcome::ExecutionOutcome;

    fn body(builder: &AccountBuilder) -> OperationBody {
        builder.current_operation().unwrap().body.clone()
    }

    #[test]
    fn create_account_defaults_key_to_operator() {
        let (_, ctx) = context();
        let mut builder = AccountBuilder::new(ctx);
        builder
            .create_account(&CreateAccountParams {
                initial_balance: Some(AmountInput::from("1.5")),
                ..CreateAccountParams::default()
            })
            .unwrap();

        let OperationBody::AccountCreate(create) = body(&builder) else {
            panic!("expected account create");
        };
        assert_eq!(create.key, Some(KeyValue::OperatorKey));
        assert_eq!(create.initial_balance, 150_000_000);
        assert_eq!(builder.notes().len(), 1);
    }

    #[test]
    fn transfer_adds_balancing_debit_from_operator() {
        let (_, ctx) = context();
        let mut builder = AccountBuilder::new(ctx);
        builder
            .transfer_hbar(&TransferHbarParams {
                transfers: vec![
                    HbarTransferParam {
                        account_id: EntityId::num(800),
                        amount: AmountInput::Int(2),
                    },
                    HbarTransferParam {
                        account_id: EntityId::num(801),
                        amount: AmountInput::from("0.5"),
                    },
                ],
                transaction_memo: Some("rent".into()),
                ..TransferHbarParams::default()
            })
            .unwrap();

        let op = builder.current_operation().unwrap();
        assert_eq!(op.memo.as_deref(), Some("rent"));
        let OperationBody::Transfer(transfer) = &op.body else {
            panic!("expected transfer");
        };
        let sum: i64 = transfer.hbar_transfers.iter().map(|t| t.amount).sum();
        assert_eq!(sum, 0);
        let debit = transfer.hbar_transfers.last().unwrap();
        assert_eq!(debit.account_id, EntityId::num(OPERATOR));
        assert_eq!(debit.amount, -250_000_000);
        assert!(builder.notes()[0].contains("sent from 0.0.2"));
    }

    #[test]
    fn transfer_rejects_non_positive_amounts_and_leaves_stage_empty() {
        let (_, ctx) = context();
        let mut builder = AccountBuilder::new(ctx);
        builder.create_account(&CreateAccountParams::default()).unwrap();

        let err = builder
            .transfer_hbar(&TransferHbarParams {
                transfers: vec![HbarTransferParam {
                    account_id: EntityId::num(800),
                    amount: AmountInput::Int(0),
                }],
                ..TransferHbarParams::default()
            })
            .unwrap_err();
        assert!(matches!(err, BuildError::Invalid { .. }));
        assert!(builder.current_operation().is_err());
        assert!(builder.notes().is_empty());
    }

    #[test]
    fn restaging_discards_first_call_notes() {
        let (_, ctx) = context();
        let mut builder = AccountBuilder::new(ctx);
        builder.create_account(&CreateAccountParams::default()).unwrap();
        assert_eq!(builder.notes().len(), 1);

        builder
            .create_account(&CreateAccountParams {
                public_key: Some(KeyInput::from(key(4).to_raw_hex().as_str())),
                ..CreateAccountParams::default()
            })
            .unwrap();
        assert!(builder.notes().is_empty());
        let OperationBody::AccountCreate(create) = body(&builder) else {
            panic!("expected account create");
        };
        assert_eq!(create.key, Some(KeyValue::Key(Key::Single(key(4)))));
    }

    #[test]
    fn delete_defaults_transfer_account_and_rejects_self_transfer() {
        let (_, ctx) = context();
        let mut builder = AccountBuilder::new(ctx);
        builder
            .delete_account(&DeleteAccountParams {
                account_id: EntityId::num(900),
                transfer_account_id: None,
            })
            .unwrap();
        assert!(builder.notes()[0].contains("operator account 0.0.2"));

        let err = builder
            .delete_account(&DeleteAccountParams {
                account_id: EntityId::num(OPERATOR),
                transfer_account_id: None,
            })
            .unwrap_err();
        assert!(matches!(err, BuildError::Invalid { field: "transferAccountId", .. }));
    }

    #[tokio::test]
    async fn execute_creates_account_with_substituted_key() {
        let (ledger, ctx) = context();
        let mut builder = AccountBuilder::new(ctx);
        builder.create_account(&CreateAccountParams::default()).unwrap();

        let report = builder.execute(&MetaOptions::default()).await;
        let ExecutionOutcome::Executed { receipt, .. } = &report.outcome else {
            panic!("expected execution, got {:?}", report.outcome);
        };
        assert!(receipt.account_id.is_some());
        assert_eq!(report.notes.len(), 1);

        let OperationBody::AccountCreate(create) = &ledger.submissions()[0].body else {
            panic!("expected account create");
        };
        assert_eq!(create.key, Some(KeyValue::from(key(1))));
        assert!(builder.current_operation().is_err());
    }

    #[tokio::test]
    async fn execute_on_fresh_builder_reports_nothing_staged() {
        let (ledger, ctx) = context();
        let mut builder = AccountBuilder::new(ctx);
        let record = builder.execute(&MetaOptions::default()).await.into_record();
        assert!(!record.success);
        assert!(record.error.unwrap().contains("no operation is staged"));
        assert!(ledger.submissions().is_empty());
    }

    #[test]
    fn action_parses_by_tool_name() {
        let action = AccountAction::parse(
            "transfer_hbar",
            serde_json::json!({ "transfers": [{ "accountId": "0.0.800", "amount": 1 }] }),
        )
        .unwrap()
        .unwrap();
        assert!(matches!(action, AccountAction::TransferHbar(_)));
        assert!(AccountAction::parse("create_topic", serde_json::json!({})).is_none());
        assert!(AccountAction::parse("delete_account", serde_json::json!({}))
            .unwrap()
            .is_err());
    }
}
