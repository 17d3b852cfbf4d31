//! Configuration file management.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Network settings.
    #[serde(default)]
    pub network: NetworkConfig,
    /// Membership tree shape.
    #[serde(default)]
    pub tree: TreeConfig,
    /// Proof verification settings.
    #[serde(default)]
    pub proof: ProofConfig,
    /// Advanced settings.
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// TCP listen address for the JSON-RPC server.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

/// Membership tree configuration. Fixed at startup: changing the shape of
/// a live tree would invalidate every outstanding witness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    #[serde(default = "default_tree_depth")]
    pub depth: usize,
    #[serde(default = "default_tree_arity")]
    pub arity: usize,
}

/// Proof verification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofConfig {
    /// Path to the compressed Groth16 verifying key. Empty = `$data_dir/verifying_key.bin`.
    #[serde(default)]
    pub verifying_key_path: String,
    /// Verification budget per message in milliseconds.
    #[serde(default = "default_verify_timeout_ms")]
    pub verify_timeout_ms: u64,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_tree_depth() -> usize {
    rln_types::DEFAULT_TREE_DEPTH
}

fn default_tree_arity() -> usize {
    rln_types::DEFAULT_TREE_ARITY
}

fn default_verify_timeout_ms() -> u64 {
    rln_types::DEFAULT_PROOF_TIMEOUT_MS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            depth: default_tree_depth(),
            arity: default_tree_arity(),
        }
    }
}

impl Default for ProofConfig {
    fn default() -> Self {
        Self {
            verifying_key_path: String::new(),
            verify_timeout_ms: default_verify_timeout_ms(),
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if the file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: DaemonConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolved path of the verifying key file.
    pub fn verifying_key_path(&self) -> PathBuf {
        if self.proof.verifying_key_path.is_empty() {
            Self::data_dir().join("verifying_key.bin")
        } else {
            PathBuf::from(&self.proof.verifying_key_path)
        }
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        Self::data_dir().join("config.toml")
    }

    /// Data directory, overridable via `RLN_DATA_DIR`.
    pub fn data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("RLN_DATA_DIR") {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".rln"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/rln"))
    }
}
