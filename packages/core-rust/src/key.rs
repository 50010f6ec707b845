//! Public keys, key lists, key roles and the key-valued inputs callers pass.
//!
//! Public keys are carried as algorithm + raw bytes and display as DER hex,
//! the form ledger tooling prints. Parsing accepts both DER hex and raw hex
//! (32 bytes is Ed25519, 33 compressed bytes is ECDSA secp256k1).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Case-insensitive sentinel meaning "the operator's own public key".
pub const CURRENT_SIGNER: &str = "current_signer";

const ED25519_PUBLIC_DER_PREFIX: &str = "302a300506032b6570032100";
const ECDSA_PUBLIC_DER_PREFIX: &str = "302d300706052b8104000a032200";
const ED25519_PRIVATE_DER_PREFIX: &str = "302e020100300506032b657004220420";
const ECDSA_PRIVATE_DER_PREFIX: &str = "3030020100300706052b8104000a04220420";

/// Errors from resolving key inputs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),
    #[error("no signer available to resolve the operator key")]
    SignerUnavailable,
}

/// Signature algorithm of a public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyAlgorithm {
    Ed25519,
    EcdsaSecp256k1,
}

/// A single public key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PublicKey {
    pub algorithm: KeyAlgorithm,
    pub bytes: Vec<u8>,
}

impl PublicKey {
    /// DER-encoded hex form.
    #[must_use]
    pub fn to_der_hex(&self) -> String {
        let prefix = match self.algorithm {
            KeyAlgorithm::Ed25519 => ED25519_PUBLIC_DER_PREFIX,
            KeyAlgorithm::EcdsaSecp256k1 => ECDSA_PUBLIC_DER_PREFIX,
        };
        format!("{prefix}{}", hex::encode(&self.bytes))
    }

    /// Raw (prefix-free) hex form.
    #[must_use]
    pub fn to_raw_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

fn strip_hex_prefix(s: &str) -> String {
    let trimmed = s.trim();
    trimmed
        .strip_prefix("0x")
        .unwrap_or(trimmed)
        .to_ascii_lowercase()
}

impl FromStr for PublicKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = strip_hex_prefix(s);
        let invalid = || KeyError::InvalidKeyFormat(format!("`{s}` is not a public key"));
        let (algorithm, body) = if let Some(rest) = text.strip_prefix(ED25519_PUBLIC_DER_PREFIX) {
            (KeyAlgorithm::Ed25519, rest)
        } else if let Some(rest) = text.strip_prefix(ECDSA_PUBLIC_DER_PREFIX) {
            (KeyAlgorithm::EcdsaSecp256k1, rest)
        } else {
            match text.len() {
                64 => (KeyAlgorithm::Ed25519, text.as_str()),
                66 if text.starts_with("02") || text.starts_with("03") => {
                    (KeyAlgorithm::EcdsaSecp256k1, text.as_str())
                }
                _ => return Err(invalid()),
            }
        };
        let bytes = hex::decode(body).map_err(|_| invalid())?;
        let expected = match algorithm {
            KeyAlgorithm::Ed25519 => 32,
            KeyAlgorithm::EcdsaSecp256k1 => 33,
        };
        if bytes.len() != expected {
            return Err(invalid());
        }
        Ok(Self { algorithm, bytes })
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_der_hex())
    }
}

impl TryFrom<String> for PublicKey {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PublicKey> for String {
    fn from(key: PublicKey) -> Self {
        key.to_der_hex()
    }
}

/// Returns `true` when `s` carries a DER private-key prefix.
#[must_use]
pub fn looks_like_private_key(s: &str) -> bool {
    let text = strip_hex_prefix(s);
    text.starts_with(ED25519_PRIVATE_DER_PREFIX) || text.starts_with(ECDSA_PRIVATE_DER_PREFIX)
}

/// A threshold key set: any `threshold` of `keys` authorizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyList {
    pub threshold: u32,
    pub keys: Vec<Key>,
}

/// A structured key value: one public key or a threshold list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Key {
    Single(PublicKey),
    List(KeyList),
}

impl Key {
    /// Number of leaf public keys, counting through nested lists.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::List(list) => list.keys.iter().map(Key::leaf_count).sum(),
        }
    }
}

impl From<PublicKey> for Key {
    fn from(key: PublicKey) -> Self {
        Self::Single(key)
    }
}

/// What a caller passes for a key-valued parameter.
///
/// Deserializes untagged: a JSON string becomes `Text`, a structured key object
/// becomes `Key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyInput {
    Key(Key),
    Text(String),
}

impl KeyInput {
    /// Returns `true` for the case-insensitive [`CURRENT_SIGNER`] sentinel.
    #[must_use]
    pub fn is_current_signer(&self) -> bool {
        matches!(self, Self::Text(t) if t.trim().eq_ignore_ascii_case(CURRENT_SIGNER))
    }

    /// Shorthand for the sentinel input.
    #[must_use]
    pub fn current_signer() -> Self {
        Self::Text(CURRENT_SIGNER.to_string())
    }
}

impl From<&str> for KeyInput {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Key held by a staged operation.
///
/// `OperatorKey` is the deferred sentinel: the slot must be replaced by the
/// operator's public key before the operation is submitted or serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyValue {
    Key(Key),
    OperatorKey,
}

impl KeyValue {
    /// The resolved key, or `None` while the sentinel is still pending.
    #[must_use]
    pub fn as_key(&self) -> Option<&Key> {
        match self {
            Self::Key(key) => Some(key),
            Self::OperatorKey => None,
        }
    }
}

impl From<Key> for KeyValue {
    fn from(key: Key) -> Self {
        Self::Key(key)
    }
}

impl From<PublicKey> for KeyValue {
    fn from(key: PublicKey) -> Self {
        Self::Key(Key::Single(key))
    }
}

/// The role a key-valued field plays on an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyRole {
    Admin,
    Kyc,
    Freeze,
    Wipe,
    Supply,
    FeeSchedule,
    Pause,
    Submit,
    Account,
    File,
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Admin => "admin",
            Self::Kyc => "kyc",
            Self::Freeze => "freeze",
            Self::Wipe => "wipe",
            Self::Supply => "supply",
            Self::FeeSchedule => "fee schedule",
            Self::Pause => "pause",
            Self::Submit => "submit",
            Self::Account => "account",
            Self::File => "file",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::{KeyAlgorithm, PublicKey};

    /// Deterministic Ed25519 public key whose bytes are all `fill`.
    pub fn ed25519(fill: u8) -> PublicKey {
        PublicKey {
            algorithm: KeyAlgorithm::Ed25519,
            bytes: vec![fill; 32],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW_ED: &str = "1111111111111111111111111111111111111111111111111111111111111111";

    #[test]
    fn parses_raw_ed25519_hex() {
        let key: PublicKey = RAW_ED.parse().unwrap();
        assert_eq!(key.algorithm, KeyAlgorithm::Ed25519);
        assert_eq!(key.bytes, vec![0x11; 32]);
        assert_eq!(key.to_der_hex(), format!("{ED25519_PUBLIC_DER_PREFIX}{RAW_ED}"));
    }

    #[test]
    fn parses_der_and_0x_prefixed_forms() {
        let der = format!("{ED25519_PUBLIC_DER_PREFIX}{RAW_ED}");
        let from_der: PublicKey = der.parse().unwrap();
        let from_0x: PublicKey = format!("0x{RAW_ED}").parse().unwrap();
        assert_eq!(from_der, from_0x);

        let ecdsa_raw = format!("02{}", "ab".repeat(32));
        let ecdsa: PublicKey = format!("{ECDSA_PUBLIC_DER_PREFIX}{ecdsa_raw}").parse().unwrap();
        assert_eq!(ecdsa.algorithm, KeyAlgorithm::EcdsaSecp256k1);
        assert_eq!(ecdsa.to_raw_hex(), ecdsa_raw);
    }

    #[test]
    fn rejects_non_keys() {
        let not_hex = "zz".repeat(32);
        let bad_parity = format!("05{}", "ab".repeat(32));
        for bad in ["", "hello", "abcd", not_hex.as_str(), bad_parity.as_str()] {
            assert!(matches!(
                bad.parse::<PublicKey>(),
                Err(KeyError::InvalidKeyFormat(_))
            ));
        }
    }

    #[test]
    fn private_der_prefix_detection() {
        let private = format!("{ED25519_PRIVATE_DER_PREFIX}{RAW_ED}");
        assert!(looks_like_private_key(&private));
        assert!(looks_like_private_key(&format!("0x{ECDSA_PRIVATE_DER_PREFIX}{RAW_ED}")));
        assert!(!looks_like_private_key(RAW_ED));
        assert!(private.parse::<PublicKey>().is_err());
    }

    #[test]
    fn sentinel_is_case_insensitive() {
        assert!(KeyInput::from("CURRENT_SIGNER").is_current_signer());
        assert!(KeyInput::from(" current_signer ").is_current_signer());
        assert!(!KeyInput::from("current-signer").is_current_signer());
        assert!(!KeyInput::Key(Key::Single(fixtures::ed25519(1))).is_current_signer());
    }

    #[test]
    fn key_input_deserializes_untagged() {
        let text: KeyInput = serde_json::from_str("\"current_signer\"").unwrap();
        assert!(text.is_current_signer());

        let der = format!("\"{ED25519_PUBLIC_DER_PREFIX}{RAW_ED}\"");
        let structured: KeyInput =
            serde_json::from_str(&format!("{{\"single\":{der}}}")).unwrap();
        assert!(matches!(structured, KeyInput::Key(Key::Single(_))));
    }

    #[test]
    fn leaf_count_walks_nested_lists() {
        let key = Key::List(KeyList {
            threshold: 1,
            keys: vec![
                Key::Single(fixtures::ed25519(1)),
                Key::List(KeyList {
                    threshold: 2,
                    keys: vec![
                        Key::Single(fixtures::ed25519(2)),
                        Key::Single(fixtures::ed25519(3)),
                    ],
                }),
            ],
        });
        assert_eq!(key.leaf_count(), 3);
    }
}
