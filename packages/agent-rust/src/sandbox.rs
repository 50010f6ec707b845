//! In-memory collaborators.
//!
//! [`SandboxLedger`] behaves like a ledger that accepts everything it is
//! given: it assigns entity numbers, tracks token supply and topic sequence
//! numbers, and records every submitted operation. Together with
//! [`StaticSigner`], [`StaticDirectory`] and [`Keyring`] it backs the CLI and
//! the test suites, and suits integrators who want a dry run.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use ledgerkit_core::operation::OperationBody;
use ledgerkit_core::{
    codec, AccountId, ClockSource, DirectoryService, EntityId, KeyCodec, LedgerClient,
    LedgerError, NodeId, PublicKey, Receipt, Signer, StagedOperation, TokenId, TopicId,
    TransactionId,
};
use parking_lot::Mutex;
use tracing::debug;

/// First entity number handed out by a fresh sandbox.
const FIRST_ENTITY_NUM: u64 = 1000;

// ---------------------------------------------------------------------------
// SandboxLedger
// ---------------------------------------------------------------------------

/// In-memory [`LedgerClient`].
pub struct SandboxLedger {
    clock: Arc<dyn ClockSource>,
    default_nodes: Vec<NodeId>,
    next_entity: AtomicU64,
    token_supply: DashMap<TokenId, i64>,
    next_serial: DashMap<TokenId, i64>,
    topic_sequence: DashMap<TopicId, u64>,
    submitted: Mutex<Vec<StagedOperation>>,
    fail_next: Mutex<Option<LedgerError>>,
    withhold_schedule_ids: AtomicBool,
}

impl SandboxLedger {
    /// Creates a ledger that submits to node `0.0.3` unless told otherwise.
    #[must_use]
    pub fn new(clock: Arc<dyn ClockSource>) -> Self {
        Self {
            clock,
            default_nodes: vec![EntityId::num(3)],
            next_entity: AtomicU64::new(FIRST_ENTITY_NUM),
            token_supply: DashMap::new(),
            next_serial: DashMap::new(),
            topic_sequence: DashMap::new(),
            submitted: Mutex::new(Vec::new()),
            fail_next: Mutex::new(None),
            withhold_schedule_ids: AtomicBool::new(false),
        }
    }

    /// Makes the next submission fail with `err`.
    pub fn fail_next(&self, err: LedgerError) {
        *self.fail_next.lock() = Some(err);
    }

    /// Leaves `schedule_id` out of schedule-create receipts.
    pub fn withhold_schedule_ids(&self, withhold: bool) {
        self.withhold_schedule_ids.store(withhold, Ordering::SeqCst);
    }

    /// Every successfully submitted operation, oldest first.
    #[must_use]
    pub fn submissions(&self) -> Vec<StagedOperation> {
        self.submitted.lock().clone()
    }

    /// Decodes serialized bytes and submits the result.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Codec` for undecodable bytes, otherwise whatever
    /// [`LedgerClient::submit`] returns.
    pub async fn submit_bytes(&self, bytes: &[u8], signer: &dyn Signer) -> Result<Receipt, LedgerError> {
        let op = codec::decode(bytes)?;
        self.submit(&op, signer).await
    }

    fn allocate(&self) -> EntityId {
        EntityId::num(self.next_entity.fetch_add(1, Ordering::SeqCst))
    }

    fn receipt_for(&self, op: &StagedOperation) -> Receipt {
        let mut receipt = Receipt::success();
        match &op.body {
            OperationBody::AccountCreate(_) => receipt.account_id = Some(self.allocate()),
            OperationBody::TokenCreate(body) => {
                let token_id = self.allocate();
                self.token_supply.insert(token_id, body.initial_supply);
                receipt.token_id = Some(token_id);
                receipt.total_supply = Some(body.initial_supply);
            }
            OperationBody::TokenMint(body) => {
                let minted = if body.metadata.is_empty() {
                    body.amount
                } else {
                    let mut next = self.next_serial.entry(body.token_id).or_insert(1);
                    let first = *next;
                    let count = i64::try_from(body.metadata.len()).unwrap_or(i64::MAX);
                    *next = first.saturating_add(count);
                    receipt.serial_numbers = (first..first.saturating_add(count)).collect();
                    count
                };
                let mut supply = self.token_supply.entry(body.token_id).or_insert(0);
                *supply = supply.saturating_add(minted);
                receipt.total_supply = Some(*supply);
            }
            OperationBody::TokenBurn(body) => {
                let burned = if body.serials.is_empty() {
                    body.amount
                } else {
                    i64::try_from(body.serials.len()).unwrap_or(i64::MAX)
                };
                let mut supply = self.token_supply.entry(body.token_id).or_insert(0);
                *supply = supply.saturating_sub(burned);
                receipt.total_supply = Some(*supply);
            }
            OperationBody::TopicCreate(_) => receipt.topic_id = Some(self.allocate()),
            OperationBody::TopicMessageSubmit(body) => {
                let mut seq = self.topic_sequence.entry(body.topic_id).or_insert(0);
                *seq += 1;
                receipt.topic_sequence_number = Some(*seq);
            }
            OperationBody::FileCreate(_) => receipt.file_id = Some(self.allocate()),
            OperationBody::ContractCreate(_) => receipt.contract_id = Some(self.allocate()),
            OperationBody::ScheduleCreate(body) => {
                if !self.withhold_schedule_ids.load(Ordering::SeqCst) {
                    receipt.schedule_id = Some(self.allocate());
                }
                receipt.scheduled_transaction_id = body
                    .scheduled_transaction_id
                    .or(op.transaction_id)
                    .map(|id| TransactionId {
                        scheduled: true,
                        ..id
                    });
            }
            _ => {}
        }
        receipt
    }
}

#[async_trait]
impl LedgerClient for SandboxLedger {
    fn freeze(&self, op: &mut StagedOperation, payer: AccountId) -> Result<TransactionId, LedgerError> {
        let id = *op
            .transaction_id
            .get_or_insert_with(|| TransactionId::generate(payer, self.clock.as_ref()));
        if op.node_account_ids.is_empty() {
            op.node_account_ids.clone_from(&self.default_nodes);
        }
        Ok(id)
    }

    async fn submit(&self, op: &StagedOperation, signer: &dyn Signer) -> Result<Receipt, LedgerError> {
        if let Some(err) = self.fail_next.lock().take() {
            return Err(err);
        }
        if op.transaction_id.is_none() {
            return Err(LedgerError::Precheck {
                status: "INVALID_TRANSACTION_ID".to_string(),
            });
        }
        if !op.body.pending_key_roles().is_empty() {
            return Err(LedgerError::Precheck {
                status: "KEY_REQUIRED".to_string(),
            });
        }
        let receipt = self.receipt_for(op);
        debug!(
            kind = op.kind().label(),
            signer = %signer.account_id(),
            "sandbox accepted operation"
        );
        self.submitted.lock().push(op.clone());
        Ok(receipt)
    }
}

// ---------------------------------------------------------------------------
// StaticSigner
// ---------------------------------------------------------------------------

/// A signer with a fixed account and, optionally, a known public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticSigner {
    account_id: AccountId,
    public_key: Option<PublicKey>,
}

impl StaticSigner {
    #[must_use]
    pub fn new(account_id: AccountId, public_key: Option<PublicKey>) -> Self {
        Self {
            account_id,
            public_key,
        }
    }
}

impl Signer for StaticSigner {
    fn account_id(&self) -> AccountId {
        self.account_id
    }

    fn public_key(&self) -> Option<PublicKey> {
        self.public_key.clone()
    }
}

// ---------------------------------------------------------------------------
// StaticDirectory
// ---------------------------------------------------------------------------

/// A directory backed by a fixed account → key table.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    keys: DashMap<AccountId, PublicKey>,
}

impl StaticDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, account_id: AccountId, key: PublicKey) {
        self.keys.insert(account_id, key);
    }
}

#[async_trait]
impl DirectoryService for StaticDirectory {
    async fn lookup_public_key(&self, account_id: &AccountId) -> anyhow::Result<PublicKey> {
        self.keys
            .get(account_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| anyhow::anyhow!("account {account_id} not found in directory"))
    }
}

// ---------------------------------------------------------------------------
// Keyring
// ---------------------------------------------------------------------------

/// A [`KeyCodec`] that knows a registered set of private keys.
#[derive(Debug, Default)]
pub struct Keyring {
    keys: DashMap<String, PublicKey>,
}

impl Keyring {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `public` as the key derived from `private`.
    pub fn insert(&self, private: impl Into<String>, public: PublicKey) {
        self.keys.insert(normalize_private(&private.into()), public);
    }
}

fn normalize_private(private: &str) -> String {
    let trimmed = private.trim();
    trimmed
        .strip_prefix("0x")
        .unwrap_or(trimmed)
        .to_ascii_lowercase()
}

impl KeyCodec for Keyring {
    fn derive_public_key(&self, private_key: &str) -> anyhow::Result<PublicKey> {
        self.keys
            .get(&normalize_private(private_key))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| anyhow::anyhow!("unknown private key"))
    }
}
