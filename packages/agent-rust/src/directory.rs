//! Mirror-node backed [`DirectoryService`].

use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use ledgerkit_core::{AccountId, DirectoryService, KeyAlgorithm, PublicKey};
use reqwest::Client;
use serde::Deserialize;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Account payload of `GET /api/v1/accounts/{id}`; only the key is read.
#[derive(Debug, Deserialize)]
struct AccountInfo {
    key: Option<AccountKey>,
}

#[derive(Debug, Deserialize)]
struct AccountKey {
    #[serde(rename = "_type")]
    key_type: String,
    key: String,
}

/// Looks up account keys through a mirror node's REST API.
#[derive(Debug, Clone)]
pub struct MirrorNodeDirectory {
    client: Client,
    base_url: String,
}

impl MirrorNodeDirectory {
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building mirror node HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn account_url(&self, account_id: &AccountId) -> String {
        format!("{}/api/v1/accounts/{account_id}", self.base_url)
    }
}

#[async_trait]
impl DirectoryService for MirrorNodeDirectory {
    async fn lookup_public_key(&self, account_id: &AccountId) -> anyhow::Result<PublicKey> {
        let url = self.account_url(account_id);
        tracing::debug!(%url, "looking up account key");
        let body = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("requesting {url}"))?
            .error_for_status()?
            .text()
            .await?;
        parse_account_key(&body)
    }
}

/// Extracts the single public key from a mirror-node account payload.
///
/// # Errors
///
/// Fails on malformed JSON, accounts without a key, and complex keys (key
/// lists and threshold keys arrive protobuf-encoded).
pub fn parse_account_key(body: &str) -> anyhow::Result<PublicKey> {
    let info: AccountInfo = serde_json::from_str(body).context("decoding account payload")?;
    let Some(key) = info.key else {
        bail!("account has no key");
    };
    let algorithm = match key.key_type.as_str() {
        "ED25519" => KeyAlgorithm::Ed25519,
        "ECDSA_SECP256K1" => KeyAlgorithm::EcdsaSecp256k1,
        other => bail!("unsupported key type {other}"),
    };
    let parsed: PublicKey = key.key.parse()?;
    if parsed.algorithm != algorithm {
        bail!("key does not match its declared type {}", key.key_type);
    }
    Ok(parsed)
}
