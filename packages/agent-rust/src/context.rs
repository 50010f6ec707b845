//! Shared collaborators handed to every builder and resolver.

use std::sync::Arc;

use async_trait::async_trait;
use ledgerkit_core::{
    AccountId, ClockSource, DirectoryService, KeyCodec, KeyResolver, LedgerClient, PublicKey,
    Signer, SystemClock,
};

use crate::config::AgentConfig;

/// Configuration plus the collaborator capabilities one agent works with.
///
/// Cloning is cheap; every field is shared. The collaborators are used
/// concurrently by independent builders and must be `Send + Sync`.
#[derive(Clone)]
pub struct AgentContext {
    pub config: Arc<AgentConfig>,
    pub client: Arc<dyn LedgerClient>,
    pub signer: Option<Arc<dyn Signer>>,
    pub directory: Arc<dyn DirectoryService>,
    pub codec: Arc<dyn KeyCodec>,
    pub clock: Arc<dyn ClockSource>,
}

impl AgentContext {
    /// Creates a context with no signer, no directory and no private-key
    /// support.
    #[must_use]
    pub fn new(config: AgentConfig, client: Arc<dyn LedgerClient>) -> Self {
        Self {
            config: Arc::new(config),
            client,
            signer: None,
            directory: Arc::new(NoDirectory),
            codec: Arc::new(NoKeyCodec),
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.signer = Some(signer);
        self
    }

    #[must_use]
    pub fn with_directory(mut self, directory: Arc<dyn DirectoryService>) -> Self {
        self.directory = directory;
        self
    }

    #[must_use]
    pub fn with_codec(mut self, codec: Arc<dyn KeyCodec>) -> Self {
        self.codec = codec;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn ClockSource>) -> Self {
        self.clock = clock;
        self
    }

    /// Key resolver bound to this context's signer.
    #[must_use]
    pub fn key_resolver(&self) -> KeyResolver {
        KeyResolver::new(Arc::clone(&self.codec), self.signer.clone())
    }

    /// Account of the held signer, if any.
    #[must_use]
    pub fn operator_account(&self) -> Option<AccountId> {
        self.signer.as_ref().map(|s| s.account_id())
    }

    /// Public key of the held signer, if known.
    #[must_use]
    pub fn operator_public_key(&self) -> Option<PublicKey> {
        self.signer.as_ref().and_then(|s| s.public_key())
    }

    /// The configured end user the agent acts for.
    #[must_use]
    pub fn acting_account(&self) -> Option<AccountId> {
        self.config.acting_account
    }
}

impl std::fmt::Debug for AgentContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentContext")
            .field("config", &self.config)
            .field("operator", &self.operator_account())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Null collaborators
// ---------------------------------------------------------------------------

/// Directory that knows no accounts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDirectory;

#[async_trait]
impl DirectoryService for NoDirectory {
    async fn lookup_public_key(&self, account_id: &AccountId) -> anyhow::Result<PublicKey> {
        anyhow::bail!("no directory configured to look up {account_id}")
    }
}

/// Key codec that understands no private keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoKeyCodec;

impl KeyCodec for NoKeyCodec {
    fn derive_public_key(&self, _private_key: &str) -> anyhow::Result<PublicKey> {
        anyhow::bail!("private-key derivation is not configured")
    }
}
