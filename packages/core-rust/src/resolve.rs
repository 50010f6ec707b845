//! Key resolution: turns caller key inputs into key values.
//!
//! Rules, in order:
//! 1. a structured key is returned as-is;
//! 2. the `current_signer` sentinel becomes the operator's public key;
//! 3. a public-key string is parsed;
//! 4. a private-key string is handed to the [`KeyCodec`] and its public key
//!    used (with a warning);
//! 5. anything else is `InvalidKeyFormat`.

use std::sync::Arc;

use tracing::warn;

use crate::key::{looks_like_private_key, Key, KeyError, KeyInput, KeyValue, PublicKey};
use crate::traits::{KeyCodec, Signer};

/// Resolves [`KeyInput`]s against an optional operator identity.
#[derive(Clone)]
pub struct KeyResolver {
    codec: Arc<dyn KeyCodec>,
    signer: Option<Arc<dyn Signer>>,
}

impl KeyResolver {
    #[must_use]
    pub fn new(codec: Arc<dyn KeyCodec>, signer: Option<Arc<dyn Signer>>) -> Self {
        Self { codec, signer }
    }

    /// Operator public key.
    ///
    /// # Errors
    ///
    /// Returns `KeyError::SignerUnavailable` when no signer is configured or
    /// the signer does not expose a public key.
    pub fn operator_key(&self) -> Result<PublicKey, KeyError> {
        self.signer
            .as_ref()
            .and_then(|s| s.public_key())
            .ok_or(KeyError::SignerUnavailable)
    }

    /// Fully resolves `input` to a key (rules 1-5).
    ///
    /// # Errors
    ///
    /// Returns `SignerUnavailable` for the sentinel without an operator key and
    /// `InvalidKeyFormat` for unparseable text.
    pub fn resolve(&self, input: &KeyInput) -> Result<Key, KeyError> {
        if input.is_current_signer() {
            return self.operator_key().map(Key::Single);
        }
        match input {
            KeyInput::Key(key) => Ok(key.clone()),
            KeyInput::Text(text) => self.parse_text(text).map(Key::Single),
        }
    }

    /// Resolves `input` for storage on a staged operation. The sentinel is
    /// kept as [`KeyValue::OperatorKey`] so it can be substituted once the
    /// operation is about to leave the process.
    ///
    /// # Errors
    ///
    /// Returns `InvalidKeyFormat` for unparseable text.
    pub fn resolve_deferred(&self, input: &KeyInput) -> Result<KeyValue, KeyError> {
        if input.is_current_signer() {
            return Ok(KeyValue::OperatorKey);
        }
        self.resolve(input).map(KeyValue::Key)
    }

    /// Resolves an optional input, skipping it with a warning when it does
    /// not resolve.
    #[must_use]
    pub fn resolve_optional(&self, field: &str, input: Option<&KeyInput>) -> Option<KeyValue> {
        let input = input?;
        match self.resolve_deferred(input) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(field, error = %err, "ignoring unresolvable optional key");
                None
            }
        }
    }

    fn parse_text(&self, text: &str) -> Result<PublicKey, KeyError> {
        if let Ok(key) = text.parse::<PublicKey>() {
            return Ok(key);
        }
        match self.codec.derive_public_key(text) {
            Ok(key) => {
                warn!(
                    private_prefix = looks_like_private_key(text),
                    "derived a public key from a private key input; pass public keys instead"
                );
                Ok(key)
            }
            Err(_) => Err(KeyError::InvalidKeyFormat(
                "expected a public key, a private key, or `current_signer`".to_string(),
            )),
        }
    }
}

impl std::fmt::Debug for KeyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyResolver")
            .field("has_signer", &self.signer.is_some())
            .finish_non_exhaustive()
    }
}
