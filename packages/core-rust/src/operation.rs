//! Operation model: typed bodies for every supported ledger action, their
//! kinds and scheduling policy, and the staged (not yet submitted) operation.
//!
//! Bodies serialize with `#[serde(rename_all = "camelCase")]`; byte payloads go
//! through `serde_bytes` so the `MsgPack` encoding stays compact.

use serde::{Deserialize, Serialize};

use crate::ids::{
    AccountId, ContractId, EntityId, FileId, NodeId, ScheduleId, TokenId, TopicId, TransactionId,
};
use crate::key::{KeyRole, KeyValue};

/// Largest payload a single file transaction may carry.
pub const DEFAULT_FILE_CHUNK_SIZE: usize = 4096;

// ---------------------------------------------------------------------------
// Shared payload pieces
// ---------------------------------------------------------------------------

/// One HBAR leg of a transfer (negative debits, positive credits).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HbarTransfer {
    pub account_id: AccountId,
    pub amount: i64,
}

/// One fungible-token leg of a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransfer {
    pub token_id: TokenId,
    pub account_id: AccountId,
    pub amount: i64,
}

/// A single NFT moving between accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftTransfer {
    pub token_id: TokenId,
    pub serial: i64,
    pub sender: AccountId,
    pub receiver: AccountId,
}

/// Fungible or non-fungible token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenType {
    FungibleCommon,
    NonFungibleUnique,
}

/// Whether total supply is capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SupplyType {
    #[default]
    Infinite,
    Finite,
}

// ---------------------------------------------------------------------------
// Account bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCreate {
    pub key: Option<KeyValue>,
    pub initial_balance: i64,
    pub max_automatic_token_associations: Option<i32>,
    pub account_memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub hbar_transfers: Vec<HbarTransfer>,
    pub token_transfers: Vec<TokenTransfer>,
    pub nft_transfers: Vec<NftTransfer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountUpdate {
    pub account_id: AccountId,
    pub key: Option<KeyValue>,
    pub account_memo: Option<String>,
    pub max_automatic_token_associations: Option<i32>,
    pub decline_staking_reward: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDelete {
    pub account_id: AccountId,
    pub transfer_account_id: AccountId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HbarAllowance {
    pub owner_account_id: AccountId,
    pub spender_account_id: AccountId,
    pub amount: i64,
}

// ---------------------------------------------------------------------------
// Token bodies
// ---------------------------------------------------------------------------

/// The seven administrative keys a token can carry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenKeys {
    pub admin_key: Option<KeyValue>,
    pub kyc_key: Option<KeyValue>,
    pub freeze_key: Option<KeyValue>,
    pub wipe_key: Option<KeyValue>,
    pub supply_key: Option<KeyValue>,
    pub fee_schedule_key: Option<KeyValue>,
    pub pause_key: Option<KeyValue>,
}

impl TokenKeys {
    fn slots(&self) -> Vec<(KeyRole, &KeyValue)> {
        [
            (KeyRole::Admin, &self.admin_key),
            (KeyRole::Kyc, &self.kyc_key),
            (KeyRole::Freeze, &self.freeze_key),
            (KeyRole::Wipe, &self.wipe_key),
            (KeyRole::Supply, &self.supply_key),
            (KeyRole::FeeSchedule, &self.fee_schedule_key),
            (KeyRole::Pause, &self.pause_key),
        ]
        .into_iter()
        .filter_map(|(role, slot)| slot.as_ref().map(|key| (role, key)))
        .collect()
    }

    fn slots_mut(&mut self) -> Vec<(KeyRole, &mut KeyValue)> {
        [
            (KeyRole::Admin, &mut self.admin_key),
            (KeyRole::Kyc, &mut self.kyc_key),
            (KeyRole::Freeze, &mut self.freeze_key),
            (KeyRole::Wipe, &mut self.wipe_key),
            (KeyRole::Supply, &mut self.supply_key),
            (KeyRole::FeeSchedule, &mut self.fee_schedule_key),
            (KeyRole::Pause, &mut self.pause_key),
        ]
        .into_iter()
        .filter_map(|(role, slot)| slot.as_mut().map(|key| (role, key)))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenCreate {
    pub name: String,
    pub symbol: String,
    pub token_type: TokenType,
    pub decimals: u32,
    pub initial_supply: i64,
    pub supply_type: SupplyType,
    pub max_supply: Option<i64>,
    pub treasury_account_id: AccountId,
    pub keys: TokenKeys,
    pub freeze_default: bool,
    pub token_memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMint {
    pub token_id: TokenId,
    pub amount: i64,
    #[serde(with = "serde_bytes_vec")]
    pub metadata: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBurn {
    pub token_id: TokenId,
    pub amount: i64,
    pub serials: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAssociation {
    pub account_id: AccountId,
    pub token_ids: Vec<TokenId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUpdate {
    pub token_id: TokenId,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub treasury_account_id: Option<AccountId>,
    pub keys: TokenKeys,
    pub token_memo: Option<String>,
}

/// A token-level action with no further payload (pause, unpause, delete).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTarget {
    pub token_id: TokenId,
}

/// A token action aimed at one account (freeze, unfreeze, KYC grant/revoke).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAccountTarget {
    pub token_id: TokenId,
    pub account_id: AccountId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenWipe {
    pub token_id: TokenId,
    pub account_id: AccountId,
    pub amount: i64,
    pub serials: Vec<i64>,
}

// ---------------------------------------------------------------------------
// Topic bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicCreate {
    pub admin_key: Option<KeyValue>,
    pub submit_key: Option<KeyValue>,
    pub topic_memo: Option<String>,
    pub auto_renew_account_id: Option<AccountId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicMessageSubmit {
    pub topic_id: TopicId,
    #[serde(with = "serde_bytes")]
    pub message: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicUpdate {
    pub topic_id: TopicId,
    pub admin_key: Option<KeyValue>,
    pub submit_key: Option<KeyValue>,
    pub topic_memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicDelete {
    pub topic_id: TopicId,
}

// ---------------------------------------------------------------------------
// File bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileCreate {
    pub keys: Vec<KeyValue>,
    #[serde(with = "serde_bytes")]
    pub contents: Vec<u8>,
    pub file_memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAppend {
    pub file_id: FileId,
    #[serde(with = "serde_bytes")]
    pub contents: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileUpdate {
    pub file_id: FileId,
    pub keys: Option<Vec<KeyValue>>,
    #[serde(with = "serde_bytes")]
    pub contents: Option<Vec<u8>>,
    pub file_memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDelete {
    pub file_id: FileId,
}

// ---------------------------------------------------------------------------
// Contract bodies
// ---------------------------------------------------------------------------

/// Where contract bytecode comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Bytecode {
    File(FileId),
    Inline(#[serde(with = "serde_bytes")] Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractCreate {
    pub bytecode: Bytecode,
    pub gas: u64,
    pub admin_key: Option<KeyValue>,
    pub initial_balance: i64,
    #[serde(with = "serde_bytes")]
    pub constructor_parameters: Vec<u8>,
    pub contract_memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractExecute {
    pub contract_id: ContractId,
    pub gas: u64,
    pub payable_amount: i64,
    #[serde(with = "serde_bytes")]
    pub function_parameters: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractUpdate {
    pub contract_id: ContractId,
    pub admin_key: Option<KeyValue>,
    pub contract_memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDelete {
    pub contract_id: ContractId,
    pub transfer_account_id: AccountId,
}

// ---------------------------------------------------------------------------
// Schedule bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleCreate {
    /// The operation that runs once enough signatures are collected.
    pub scheduled: Box<OperationBody>,
    /// Transaction id the inner operation will execute under, if pinned.
    pub scheduled_transaction_id: Option<TransactionId>,
    /// Memo of the inner operation.
    pub scheduled_memo: Option<String>,
    pub schedule_memo: Option<String>,
    pub payer_account_id: AccountId,
    pub admin_key: Option<KeyValue>,
    pub wait_for_expiry: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTarget {
    pub schedule_id: ScheduleId,
}

// ---------------------------------------------------------------------------
// OperationBody
// ---------------------------------------------------------------------------

/// Typed payload of a single ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "camelCase")]
pub enum OperationBody {
    AccountCreate(AccountCreate),
    Transfer(Transfer),
    AccountUpdate(AccountUpdate),
    AccountDelete(AccountDelete),
    HbarAllowance(HbarAllowance),
    TokenCreate(TokenCreate),
    TokenMint(TokenMint),
    TokenBurn(TokenBurn),
    TokenAssociate(TokenAssociation),
    TokenDissociate(TokenAssociation),
    TokenAirdrop(Transfer),
    TokenUpdate(TokenUpdate),
    TokenPause(TokenTarget),
    TokenUnpause(TokenTarget),
    TokenFreeze(TokenAccountTarget),
    TokenUnfreeze(TokenAccountTarget),
    TokenGrantKyc(TokenAccountTarget),
    TokenRevokeKyc(TokenAccountTarget),
    TokenWipe(TokenWipe),
    TokenDelete(TokenTarget),
    TopicCreate(TopicCreate),
    TopicMessageSubmit(TopicMessageSubmit),
    TopicUpdate(TopicUpdate),
    TopicDelete(TopicDelete),
    FileCreate(FileCreate),
    FileAppend(FileAppend),
    FileUpdate(FileUpdate),
    FileDelete(FileDelete),
    ContractCreate(ContractCreate),
    ContractExecute(ContractExecute),
    ContractUpdate(ContractUpdate),
    ContractDelete(ContractDelete),
    ScheduleCreate(ScheduleCreate),
    ScheduleSign(ScheduleTarget),
    ScheduleDelete(ScheduleTarget),
}

/// Discriminant of [`OperationBody`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    AccountCreate,
    Transfer,
    AccountUpdate,
    AccountDelete,
    HbarAllowance,
    TokenCreate,
    TokenMint,
    TokenBurn,
    TokenAssociate,
    TokenDissociate,
    TokenAirdrop,
    TokenUpdate,
    TokenPause,
    TokenUnpause,
    TokenFreeze,
    TokenUnfreeze,
    TokenGrantKyc,
    TokenRevokeKyc,
    TokenWipe,
    TokenDelete,
    TopicCreate,
    TopicMessageSubmit,
    TopicUpdate,
    TopicDelete,
    FileCreate,
    FileAppend,
    FileUpdate,
    FileDelete,
    ContractCreate,
    ContractExecute,
    ContractUpdate,
    ContractDelete,
    ScheduleCreate,
    ScheduleSign,
    ScheduleDelete,
}

impl OperationKind {
    /// Human-readable label used in notes and descriptions.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::AccountCreate => "account creation",
            Self::Transfer => "transfer",
            Self::AccountUpdate => "account update",
            Self::AccountDelete => "account deletion",
            Self::HbarAllowance => "HBAR allowance approval",
            Self::TokenCreate => "token creation",
            Self::TokenMint => "token mint",
            Self::TokenBurn => "token burn",
            Self::TokenAssociate => "token association",
            Self::TokenDissociate => "token dissociation",
            Self::TokenAirdrop => "token airdrop",
            Self::TokenUpdate => "token update",
            Self::TokenPause => "token pause",
            Self::TokenUnpause => "token unpause",
            Self::TokenFreeze => "token freeze",
            Self::TokenUnfreeze => "token unfreeze",
            Self::TokenGrantKyc => "KYC grant",
            Self::TokenRevokeKyc => "KYC revocation",
            Self::TokenWipe => "token wipe",
            Self::TokenDelete => "token deletion",
            Self::TopicCreate => "topic creation",
            Self::TopicMessageSubmit => "topic message submission",
            Self::TopicUpdate => "topic update",
            Self::TopicDelete => "topic deletion",
            Self::FileCreate => "file creation",
            Self::FileAppend => "file append",
            Self::FileUpdate => "file update",
            Self::FileDelete => "file deletion",
            Self::ContractCreate => "contract creation",
            Self::ContractExecute => "contract call",
            Self::ContractUpdate => "contract update",
            Self::ContractDelete => "contract deletion",
            Self::ScheduleCreate => "schedule creation",
            Self::ScheduleSign => "schedule signature",
            Self::ScheduleDelete => "schedule deletion",
        }
    }

    /// Kinds that must never be wrapped in a schedule.
    #[must_use]
    pub fn never_schedule(self) -> bool {
        matches!(
            self,
            Self::ScheduleCreate | Self::ScheduleSign | Self::ScheduleDelete
        )
    }
}

/// Per-operation flags consulted by the execution resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationPolicy {
    /// This operation must never be wrapped in a schedule.
    pub never_schedule: bool,
    /// This operation cannot be expressed as one returned-bytes artifact.
    pub requires_multiple_operations: bool,
}

impl OperationBody {
    /// Discriminant of this body.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::AccountCreate(_) => OperationKind::AccountCreate,
            Self::Transfer(_) => OperationKind::Transfer,
            Self::AccountUpdate(_) => OperationKind::AccountUpdate,
            Self::AccountDelete(_) => OperationKind::AccountDelete,
            Self::HbarAllowance(_) => OperationKind::HbarAllowance,
            Self::TokenCreate(_) => OperationKind::TokenCreate,
            Self::TokenMint(_) => OperationKind::TokenMint,
            Self::TokenBurn(_) => OperationKind::TokenBurn,
            Self::TokenAssociate(_) => OperationKind::TokenAssociate,
            Self::TokenDissociate(_) => OperationKind::TokenDissociate,
            Self::TokenAirdrop(_) => OperationKind::TokenAirdrop,
            Self::TokenUpdate(_) => OperationKind::TokenUpdate,
            Self::TokenPause(_) => OperationKind::TokenPause,
            Self::TokenUnpause(_) => OperationKind::TokenUnpause,
            Self::TokenFreeze(_) => OperationKind::TokenFreeze,
            Self::TokenUnfreeze(_) => OperationKind::TokenUnfreeze,
            Self::TokenGrantKyc(_) => OperationKind::TokenGrantKyc,
            Self::TokenRevokeKyc(_) => OperationKind::TokenRevokeKyc,
            Self::TokenWipe(_) => OperationKind::TokenWipe,
            Self::TokenDelete(_) => OperationKind::TokenDelete,
            Self::TopicCreate(_) => OperationKind::TopicCreate,
            Self::TopicMessageSubmit(_) => OperationKind::TopicMessageSubmit,
            Self::TopicUpdate(_) => OperationKind::TopicUpdate,
            Self::TopicDelete(_) => OperationKind::TopicDelete,
            Self::FileCreate(_) => OperationKind::FileCreate,
            Self::FileAppend(_) => OperationKind::FileAppend,
            Self::FileUpdate(_) => OperationKind::FileUpdate,
            Self::FileDelete(_) => OperationKind::FileDelete,
            Self::ContractCreate(_) => OperationKind::ContractCreate,
            Self::ContractExecute(_) => OperationKind::ContractExecute,
            Self::ContractUpdate(_) => OperationKind::ContractUpdate,
            Self::ContractDelete(_) => OperationKind::ContractDelete,
            Self::ScheduleCreate(_) => OperationKind::ScheduleCreate,
            Self::ScheduleSign(_) => OperationKind::ScheduleSign,
            Self::ScheduleDelete(_) => OperationKind::ScheduleDelete,
        }
    }

    /// Scheduling and multi-step policy of this body.
    ///
    /// File payloads and inline contract bytecode larger than `chunk_size`
    /// need a create followed by appends, so they cannot travel as one
    /// returned-bytes artifact.
    #[must_use]
    pub fn policy(&self, chunk_size: usize) -> OperationPolicy {
        let requires_multiple_operations = match self {
            Self::FileCreate(b) => b.contents.len() > chunk_size,
            Self::FileAppend(b) => b.contents.len() > chunk_size,
            Self::FileUpdate(b) => b.contents.as_ref().is_some_and(|c| c.len() > chunk_size),
            Self::ContractCreate(b) => {
                matches!(&b.bytecode, Bytecode::Inline(code) if code.len() > chunk_size)
            }
            _ => false,
        };
        OperationPolicy {
            never_schedule: self.kind().never_schedule(),
            requires_multiple_operations,
        }
    }

    /// Every key-valued field of this body together with its role.
    ///
    /// A schedule create reports its own admin key and the slots of the
    /// operation it wraps.
    #[must_use]
    pub fn key_slots(&self) -> Vec<(KeyRole, &KeyValue)> {
        fn opt(role: KeyRole, slot: &Option<KeyValue>) -> Vec<(KeyRole, &KeyValue)> {
            slot.as_ref().map(|k| vec![(role, k)]).unwrap_or_default()
        }
        match self {
            Self::AccountCreate(b) => opt(KeyRole::Account, &b.key),
            Self::AccountUpdate(b) => opt(KeyRole::Account, &b.key),
            Self::TokenCreate(b) => b.keys.slots(),
            Self::TokenUpdate(b) => b.keys.slots(),
            Self::TopicCreate(b) => {
                let mut slots = opt(KeyRole::Admin, &b.admin_key);
                slots.extend(opt(KeyRole::Submit, &b.submit_key));
                slots
            }
            Self::TopicUpdate(b) => {
                let mut slots = opt(KeyRole::Admin, &b.admin_key);
                slots.extend(opt(KeyRole::Submit, &b.submit_key));
                slots
            }
            Self::FileCreate(b) => b.keys.iter().map(|k| (KeyRole::File, k)).collect(),
            Self::FileUpdate(b) => b
                .keys
                .iter()
                .flatten()
                .map(|k| (KeyRole::File, k))
                .collect(),
            Self::ContractCreate(b) => opt(KeyRole::Admin, &b.admin_key),
            Self::ContractUpdate(b) => opt(KeyRole::Admin, &b.admin_key),
            Self::ScheduleCreate(b) => {
                let mut slots = opt(KeyRole::Admin, &b.admin_key);
                slots.extend(b.scheduled.key_slots());
                slots
            }
            _ => Vec::new(),
        }
    }

    /// Mutable counterpart of [`Self::key_slots`], in the same order.
    pub fn key_slots_mut(&mut self) -> Vec<(KeyRole, &mut KeyValue)> {
        fn opt(role: KeyRole, slot: &mut Option<KeyValue>) -> Vec<(KeyRole, &mut KeyValue)> {
            slot.as_mut().map(|k| vec![(role, k)]).unwrap_or_default()
        }
        match self {
            Self::AccountCreate(b) => opt(KeyRole::Account, &mut b.key),
            Self::AccountUpdate(b) => opt(KeyRole::Account, &mut b.key),
            Self::TokenCreate(b) => b.keys.slots_mut(),
            Self::TokenUpdate(b) => b.keys.slots_mut(),
            Self::TopicCreate(b) => {
                let mut slots = opt(KeyRole::Admin, &mut b.admin_key);
                slots.extend(opt(KeyRole::Submit, &mut b.submit_key));
                slots
            }
            Self::TopicUpdate(b) => {
                let mut slots = opt(KeyRole::Admin, &mut b.admin_key);
                slots.extend(opt(KeyRole::Submit, &mut b.submit_key));
                slots
            }
            Self::FileCreate(b) => b.keys.iter_mut().map(|k| (KeyRole::File, k)).collect(),
            Self::FileUpdate(b) => b
                .keys
                .iter_mut()
                .flatten()
                .map(|k| (KeyRole::File, k))
                .collect(),
            Self::ContractCreate(b) => opt(KeyRole::Admin, &mut b.admin_key),
            Self::ContractUpdate(b) => opt(KeyRole::Admin, &mut b.admin_key),
            Self::ScheduleCreate(b) => {
                let mut slots = opt(KeyRole::Admin, &mut b.admin_key);
                slots.extend(b.scheduled.key_slots_mut());
                slots
            }
            _ => Vec::new(),
        }
    }

    /// Roles whose key is still the deferred operator sentinel.
    #[must_use]
    pub fn pending_key_roles(&self) -> Vec<KeyRole> {
        self.key_slots()
            .into_iter()
            .filter(|(_, k)| matches!(k, KeyValue::OperatorKey))
            .map(|(role, _)| role)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// StagedOperation
// ---------------------------------------------------------------------------

/// A constructed but not yet submitted operation, plus the cross-cutting
/// transaction fields that meta options adjust.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedOperation {
    pub body: OperationBody,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub transaction_id: Option<TransactionId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub memo: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub node_account_ids: Vec<NodeId>,
}

impl StagedOperation {
    /// Wraps a body with no id, memo or node restriction.
    #[must_use]
    pub fn new(body: OperationBody) -> Self {
        Self {
            body,
            transaction_id: None,
            memo: None,
            node_account_ids: Vec::new(),
        }
    }

    /// Discriminant of the body.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.body.kind()
    }
}

impl From<OperationBody> for StagedOperation {
    fn from(body: OperationBody) -> Self {
        Self::new(body)
    }
}

/// Entity referenced by an operation, used for log fields.
#[must_use]
pub fn primary_target(body: &OperationBody) -> Option<EntityId> {
    match body {
        OperationBody::AccountUpdate(b) => Some(b.account_id),
        OperationBody::AccountDelete(b) => Some(b.account_id),
        OperationBody::TokenMint(b) => Some(b.token_id),
        OperationBody::TokenBurn(b) => Some(b.token_id),
        OperationBody::TokenUpdate(b) => Some(b.token_id),
        OperationBody::TokenPause(b)
        | OperationBody::TokenUnpause(b)
        | OperationBody::TokenDelete(b) => Some(b.token_id),
        OperationBody::TokenFreeze(b)
        | OperationBody::TokenUnfreeze(b)
        | OperationBody::TokenGrantKyc(b)
        | OperationBody::TokenRevokeKyc(b) => Some(b.token_id),
        OperationBody::TokenWipe(b) => Some(b.token_id),
        OperationBody::TopicMessageSubmit(b) => Some(b.topic_id),
        OperationBody::TopicUpdate(b) => Some(b.topic_id),
        OperationBody::TopicDelete(b) => Some(b.topic_id),
        OperationBody::FileAppend(b) => Some(b.file_id),
        OperationBody::FileUpdate(b) => Some(b.file_id),
        OperationBody::FileDelete(b) => Some(b.file_id),
        OperationBody::ContractExecute(b) => Some(b.contract_id),
        OperationBody::ContractUpdate(b) => Some(b.contract_id),
        OperationBody::ContractDelete(b) => Some(b.contract_id),
        OperationBody::ScheduleSign(b) | OperationBody::ScheduleDelete(b) => Some(b.schedule_id),
        _ => None,
    }
}

/// `serde_bytes` for `Vec<Vec<u8>>` (NFT metadata lists).
mod serde_bytes_vec {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S: Serializer>(value: &Vec<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        let wrapped: Vec<&serde_bytes::Bytes> =
            value.iter().map(|v| serde_bytes::Bytes::new(v)).collect();
        wrapped.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Vec<u8>>, D::Error> {
        let wrapped: Vec<serde_bytes::ByteBuf> = Vec::deserialize(deserializer)?;
        Ok(wrapped.into_iter().map(serde_bytes::ByteBuf::into_vec).collect())
    }
}
