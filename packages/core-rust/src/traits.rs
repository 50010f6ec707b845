//! Collaborator contracts consumed by the staging and execution engine.
//!
//! Network submission, signing identities, directory lookups and private-key
//! derivation live outside this workspace; these traits are the seams. All
//! of them are shared as `Arc<dyn _>` across independent operations, so
//! implementations must be safe for concurrent use.

use async_trait::async_trait;

use crate::codec::{self, CodecError};
use crate::ids::{AccountId, TransactionId};
use crate::key::PublicKey;
use crate::operation::StagedOperation;
use crate::receipt::Receipt;

/// Failures reported by a [`LedgerClient`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("precheck failed with status {status}")]
    Precheck { status: String },
    #[error("transaction reached consensus with status {status}")]
    Rejected { status: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("codec error: {0}")]
    Codec(String),
}

impl From<CodecError> for LedgerError {
    fn from(err: CodecError) -> Self {
        Self::Codec(err.to_string())
    }
}

/// Network client that freezes, submits and serializes operations.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Prepares `op` for submission paid by `payer`: pins a transaction id when
    /// none is set and a node set when none is given. Returns the id in effect.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` when the operation cannot be frozen.
    fn freeze(
        &self,
        op: &mut StagedOperation,
        payer: AccountId,
    ) -> Result<TransactionId, LedgerError>;

    /// Signs with `signer`, submits, and waits for the receipt.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` on precheck rejection, non-success consensus status
    /// or transport failure. Retries, if any, happen inside the client.
    async fn submit(
        &self,
        op: &StagedOperation,
        signer: &dyn Signer,
    ) -> Result<Receipt, LedgerError>;

    /// Encodes `op` without submitting it.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Codec` if encoding fails.
    fn serialize(&self, op: &StagedOperation) -> Result<Vec<u8>, LedgerError> {
        Ok(codec::encode(op)?)
    }
}

/// A held signing identity.
pub trait Signer: Send + Sync {
    /// Account that signs and, by default, pays.
    fn account_id(&self) -> AccountId;

    /// Public key of the identity, when known.
    fn public_key(&self) -> Option<PublicKey>;
}

/// Read-only directory (mirror node) used to learn other accounts' keys.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Current public key of `account_id`.
    ///
    /// Callers treat any error as "unknown" and degrade gracefully.
    async fn lookup_public_key(&self, account_id: &AccountId) -> anyhow::Result<PublicKey>;
}

/// Private-key primitives.
pub trait KeyCodec: Send + Sync {
    /// Derives the public key that corresponds to an encoded private key.
    ///
    /// # Errors
    ///
    /// Returns an error when `private_key` is not a key this codec understands.
    fn derive_public_key(&self, private_key: &str) -> anyhow::Result<PublicKey>;
}
