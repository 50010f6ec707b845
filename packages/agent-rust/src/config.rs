//! Agent configuration.
//!
//! One explicit [`AgentConfig`] value is handed to the agent at construction.
//! Library code never reads the process environment; the binary maps flags
//! and environment variables onto this struct.

use ledgerkit_core::{AccountId, DEFAULT_FILE_CHUNK_SIZE};
use serde::{Deserialize, Serialize};

/// How staged operations reach the network by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum OperatingMode {
    /// The held identity signs and submits immediately.
    #[default]
    Autonomous,
    /// Operations come back as unsigned bytes for an external signer.
    ReturnBytes,
}

/// Ledger network the agent talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
    Previewnet,
    Local,
}

impl Network {
    /// Public mirror-node base URL of this network.
    #[must_use]
    pub fn default_mirror_node_url(self) -> &'static str {
        match self {
            Self::Mainnet => "https://mainnet-public.mirrornode.hedera.com",
            Self::Testnet => "https://testnet.mirrornode.hedera.com",
            Self::Previewnet => "https://previewnet.mirrornode.hedera.com",
            Self::Local => "http://localhost:5551",
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// When `false`, no subscriber is installed at all.
    pub enabled: bool,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
    /// `tracing_subscriber::EnvFilter` directive.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            json: false,
            filter: "info".to_string(),
        }
    }
}

/// Agent-wide configuration for staging and execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    /// Default delivery strategy.
    pub mode: OperatingMode,
    /// Whether operations are scheduled when a call does not say otherwise.
    /// Only consulted in `ReturnBytes` mode.
    pub schedule_by_default: bool,
    /// The end user the agent acts for. Pays for scheduled work and co-controls
    /// created schedules when set.
    pub acting_account: Option<AccountId>,
    pub network: Network,
    /// Overrides the network's default mirror-node URL.
    pub mirror_node_url: Option<String>,
    /// Maximum number of tool calls in flight before load shedding.
    pub max_concurrent_operations: u32,
    /// Time budget for calls that do not carry their own deadline.
    pub default_deadline_ms: Option<u64>,
    /// Largest file payload a single operation may carry.
    pub file_chunk_size: usize,
    pub logging: LoggingConfig,
}

impl AgentConfig {
    /// Effective mirror-node base URL.
    #[must_use]
    pub fn mirror_url(&self) -> &str {
        self.mirror_node_url
            .as_deref()
            .unwrap_or_else(|| self.network.default_mirror_node_url())
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            mode: OperatingMode::Autonomous,
            schedule_by_default: false,
            acting_account: None,
            network: Network::Testnet,
            mirror_node_url: None,
            max_concurrent_operations: 64,
            default_deadline_ms: None,
            file_chunk_size: DEFAULT_FILE_CHUNK_SIZE,
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_config_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.mode, OperatingMode::Autonomous);
        assert!(!config.schedule_by_default);
        assert!(config.acting_account.is_none());
        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.max_concurrent_operations, 64);
        assert_eq!(config.default_deadline_ms, None);
        assert_eq!(config.file_chunk_size, 4096);
        assert!(config.logging.enabled);
    }

    #[test]
    fn mirror_url_prefers_override() {
        let mut config = AgentConfig::default();
        assert_eq!(config.mirror_url(), "https://testnet.mirrornode.hedera.com");
        config.mirror_node_url = Some("http://mirror.internal:5551".to_string());
        assert_eq!(config.mirror_url(), "http://mirror.internal:5551");
    }

    #[test]
    fn config_deserializes_from_camel_case() {
        let config: AgentConfig = serde_json::from_value(serde_json::json!({
            "mode": "returnBytes",
            "scheduleByDefault": true,
            "actingAccount": "0.0.1234",
            "network": "mainnet",
            "mirrorNodeUrl": null,
            "maxConcurrentOperations": 8,
            "fileChunkSize": 1024,
            "logging": { "enabled": false, "json": true, "filter": "debug" }
        }))
        .unwrap();
        assert_eq!(config.mode, OperatingMode::ReturnBytes);
        assert_eq!(config.acting_account.map(|a| a.num), Some(1234));
        assert!(!config.logging.enabled);
    }
}
