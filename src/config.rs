use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WalletDbConfig {
    /// PBKDF2 rounds used to turn a password into an AES-256 key
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,
    /// BIP32 path prefix; the child key index is appended as the last segment
    #[serde(default = "default_derivation_path")]
    pub derivation_path: String,
    /// Used by `WalletDb::open_configured`
    #[serde(default = "default_create_if_missing")]
    pub create_if_missing: bool,
    /// Fallback tracing filter when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_kdf_iterations() -> u32 {
    100_000
}

fn default_derivation_path() -> String {
    "m/44'/60'/0'/0".to_string()
}

fn default_create_if_missing() -> bool {
    true
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for WalletDbConfig {
    fn default() -> Self {
        Self {
            kdf_iterations: default_kdf_iterations(),
            derivation_path: default_derivation_path(),
            create_if_missing: default_create_if_missing(),
            log_filter: default_log_filter(),
        }
    }
}

impl WalletDbConfig {
    pub fn init_logging(&self) {
        crate::logging::init(&self.log_filter);
    }

    pub fn load_or_default(path: &str) -> Self {
        if std::path::Path::new(path).exists() {
            match std::fs::read_to_string(path) {
                Ok(s) => match toml::from_str(&s) {
                    Ok(c) => {
                        info!("Wallet config loaded from {}", path);
                        c
                    }
                    Err(e) => {
                        warn!("Error parsing wallet config: {}. Using defaults.", e);
                        Self::default()
                    }
                },
                Err(e) => {
                    warn!("Error reading wallet config: {}. Using defaults.", e);
                    Self::default()
                }
            }
        } else {
            info!("Wallet config not found at '{}'. Creating default.", path);
            let config = Self::default();
            if let Ok(s) = toml::to_string_pretty(&config) {
                let _ = std::fs::write(path, s);
            }
            config
        }
    }
}
