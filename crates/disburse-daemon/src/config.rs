//! Configuration file management.

use std::path::PathBuf;

use disburse_types::{Address, Amount, Role};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Engine bootstrap parameters (used only when no state is stored yet).
    #[serde(default)]
    pub engine: EngineConfig,
    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Built-in asset ledger settings.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Advanced settings.
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Engine bootstrap configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Initial owner and operator.
    #[serde(default)]
    pub deployer: Address,
    /// Distributed asset identifier.
    #[serde(default)]
    pub asset: Address,
    /// Pre-approved account distributions are paid from.
    #[serde(default)]
    pub funding_source: Address,
    /// The engine's own custody account.
    #[serde(default)]
    pub custody: Address,
    /// Operator other than the deployer.
    #[serde(default)]
    pub operator: Option<Address>,
    /// Initial role bindings. Omitted roles stay unset.
    #[serde(default)]
    pub roles: RolesConfig,
}

/// Initial role addresses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RolesConfig {
    #[serde(default)]
    pub proxy: Option<Address>,
    #[serde(default)]
    pub a_role: Option<Address>,
    #[serde(default)]
    pub b_role: Option<Address>,
    #[serde(default)]
    pub c_role: Option<Address>,
    #[serde(default)]
    pub partner: Option<Address>,
    #[serde(default)]
    pub base_fee: Option<Address>,
    #[serde(default)]
    pub reserved: Option<Address>,
}

impl RolesConfig {
    /// Configured `(role, address)` pairs in registry order.
    pub fn bindings(&self) -> Vec<(Role, Address)> {
        [
            (Role::Proxy, self.proxy),
            (Role::ARole, self.a_role),
            (Role::BRole, self.b_role),
            (Role::CRole, self.c_role),
            (Role::Partner, self.partner),
            (Role::BaseFee, self.base_fee),
            (Role::Reserved, self.reserved),
        ]
        .into_iter()
        .filter_map(|(role, address)| address.map(|a| (role, a)))
        .collect()
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// Built-in asset ledger configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Balances credited once when the database is created.
    #[serde(default)]
    pub genesis: Vec<GenesisAllocation>,
}

/// One genesis credit.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisAllocation {
    pub account: Address,
    /// Defaults to the engine asset.
    #[serde(default)]
    pub asset: Option<Address>,
    /// Decimal string; TOML integers cannot hold every `u128`.
    #[serde_as(as = "DisplayFromStr")]
    pub amount: Amount,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Socket file name inside the data directory.
    #[serde(default = "default_socket_name")]
    pub socket_name: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_socket_name() -> String {
    "disburse.sock".to_string()
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            socket_name: default_socket_name(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
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

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    /// Get the RPC socket path.
    pub fn socket_path(&self) -> PathBuf {
        self.data_dir().join(&self.advanced.socket_name)
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("DISBURSE_CONFIG") {
            return PathBuf::from(path);
        }
        Self::default_data_dir().join("config.toml")
    }

    /// Platform-specific default data directory.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("DISBURSE_DATA_DIR") {
            return PathBuf::from(dir);
        }
        #[cfg(target_os = "macos")]
        {
            dirs_fallback("Library/Application Support/Disburse")
        }
        #[cfg(not(target_os = "macos"))]
        {
            dirs_fallback(".disburse")
        }
    }
}

/// Fallback home directory resolution.
fn dirs_fallback(subpath: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(subpath))
        .unwrap_or_else(|_| PathBuf::from("/tmp/disburse"))
}
