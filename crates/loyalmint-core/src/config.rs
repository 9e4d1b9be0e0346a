//! TOML-based application configuration.
//!
//! Stores:
//! - Program identity and the account derivation seed
//! - Mint fee and point award amounts
//! - Expiry lifetime and "expiring soon" horizon
//! - Submission policy and poll cadence
//!
//! Configuration is stored at `~/.config/loyalmint/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::ledger::{Commitment, LedgerAddress, SubmitOptions};

/// Upper bound for `expiry.lifetime_days` and `expiry.horizon_days`.
const MAX_WINDOW_DAYS: u32 = 36_500;

/// Program identity and point amounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramConfig {
    #[serde(default = "default_program_id")]
    pub program_id: String,
    #[serde(default = "default_account_seed")]
    pub account_seed: String,
    /// Native fee paid per mint (0.01 SOL).
    #[serde(default = "default_mint_fee_lamports")]
    pub mint_fee_lamports: u64,
    /// Points per mint before the tier multiplier.
    #[serde(default = "default_10")]
    pub base_mint_points: u64,
    #[serde(default = "default_10")]
    pub quick_redeem_points: u64,
}

/// Point lifetime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiryConfig {
    #[serde(default = "default_lifetime_days")]
    pub lifetime_days: u32,
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    /// Spend local blocks earliest-expiring first on redeem/transfer.
    #[serde(default)]
    pub fifo_consumption: bool,
}

/// Submission and polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default)]
    pub commitment: Commitment,
    #[serde(default = "default_max_retries")]
    pub max_retries: u8,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/loyalmint/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoyaltyConfig {
    #[serde(default)]
    pub program: ProgramConfig,
    #[serde(default)]
    pub expiry: ExpiryConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

fn default_program_id() -> String {
    "BwGW3VSbnjRyVKhoPKSjQm1igdEtamJvFxzZvSHatT2A".into()
}
fn default_account_seed() -> String {
    "loyalty".into()
}
fn default_mint_fee_lamports() -> u64 {
    10_000_000
}
fn default_10() -> u64 {
    10
}
fn default_lifetime_days() -> u32 {
    90
}
fn default_horizon_days() -> u32 {
    30
}
fn default_max_retries() -> u8 {
    5
}
fn default_poll_interval_ms() -> u64 {
    1000
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            program_id: default_program_id(),
            account_seed: default_account_seed(),
            mint_fee_lamports: default_mint_fee_lamports(),
            base_mint_points: 10,
            quick_redeem_points: 10,
        }
    }
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            lifetime_days: 90,
            horizon_days: 30,
            fifo_consumption: false,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            commitment: Commitment::Confirmed,
            max_retries: 5,
            poll_interval_ms: 1000,
        }
    }
}

/// Returns `~/.config/loyalmint[-dev]/` based on LOYALMINT_ENV.
///
/// Set LOYALMINT_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("LOYALMINT_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("loyalmint-dev")
    } else {
        base_dir.join("loyalmint")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DirectoryUnavailable(e.to_string()))?;
    Ok(dir)
}

impl LoyaltyConfig {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or write and return the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, creating it with defaults when missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: LoyaltyConfig =
                    toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(_) => None,
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without persisting.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// field; `self` is left unchanged in that case.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: LoyaltyConfig =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.program_address()?;
        if self.program.account_seed.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "program.account_seed".into(),
                message: "seed must not be empty".into(),
            });
        }
        if self.program.base_mint_points == 0 {
            return Err(ConfigError::InvalidValue {
                key: "program.base_mint_points".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.expiry.lifetime_days == 0 {
            return Err(ConfigError::InvalidValue {
                key: "expiry.lifetime_days".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.expiry.lifetime_days > MAX_WINDOW_DAYS {
            return Err(ConfigError::InvalidValue {
                key: "expiry.lifetime_days".into(),
                message: format!("must be at most {MAX_WINDOW_DAYS}"),
            });
        }
        if self.expiry.horizon_days > MAX_WINDOW_DAYS {
            return Err(ConfigError::InvalidValue {
                key: "expiry.horizon_days".into(),
                message: format!("must be at most {MAX_WINDOW_DAYS}"),
            });
        }
        if self.network.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "network.poll_interval_ms".into(),
                message: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    pub fn program_address(&self) -> Result<LedgerAddress, ConfigError> {
        self.program
            .program_id
            .parse()
            .map_err(|e: crate::error::PreconditionFailure| ConfigError::InvalidValue {
                key: "program.program_id".into(),
                message: e.to_string(),
            })
    }

    pub fn lifetime(&self) -> Duration {
        Duration::days(i64::from(self.expiry.lifetime_days))
    }

    pub fn horizon(&self) -> Duration {
        Duration::days(i64::from(self.expiry.horizon_days))
    }

    pub fn poll_interval(&self) -> StdDuration {
        StdDuration::from_millis(self.network.poll_interval_ms)
    }

    pub fn submit_options(&self) -> SubmitOptions {
        SubmitOptions {
            commitment: self.network.commitment,
            max_retries: self.network.max_retries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = LoyaltyConfig::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: LoyaltyConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.program.account_seed, "loyalty");
        assert_eq!(parsed.expiry.lifetime_days, 90);
        assert_eq!(parsed.network.commitment, Commitment::Confirmed);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: LoyaltyConfig = toml::from_str("[expiry]\nhorizon_days = 14\n").unwrap();
        assert_eq!(parsed.expiry.horizon_days, 14);
        assert_eq!(parsed.expiry.lifetime_days, 90);
        assert_eq!(parsed.program.mint_fee_lamports, 10_000_000);
    }

    #[test]
    fn default_program_id_is_a_valid_address() {
        assert!(LoyaltyConfig::default().validate().is_ok());
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = LoyaltyConfig::default();
        assert_eq!(cfg.get("expiry.fifo_consumption").as_deref(), Some("false"));
        assert_eq!(cfg.get("network.max_retries").as_deref(), Some("5"));
        assert_eq!(cfg.get("network.commitment").as_deref(), Some("confirmed"));
        assert!(cfg.get("expiry.missing_key").is_none());
        assert!(cfg.get("expiry").is_none());
    }

    #[test]
    fn set_updates_typed_values() {
        let mut cfg = LoyaltyConfig::default();
        cfg.set("expiry.fifo_consumption", "true").unwrap();
        cfg.set("program.base_mint_points", "25").unwrap();
        cfg.set("network.commitment", "finalized").unwrap();
        assert!(cfg.expiry.fifo_consumption);
        assert_eq!(cfg.program.base_mint_points, 25);
        assert_eq!(cfg.network.commitment, Commitment::Finalized);
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = LoyaltyConfig::default();
        assert!(matches!(
            cfg.set("expiry.nonexistent", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(cfg.set("", "1").is_err());
    }

    #[test]
    fn set_rejects_invalid_values_and_keeps_state() {
        let mut cfg = LoyaltyConfig::default();
        assert!(cfg.set("expiry.fifo_consumption", "maybe").is_err());
        assert!(cfg.set("network.max_retries", "lots").is_err());
        assert!(cfg.set("network.commitment", "eventually").is_err());
        assert!(cfg.set("program.program_id", "not-base58!").is_err());
        assert!(cfg.set("expiry.lifetime_days", "0").is_err());
        assert!(cfg.set("expiry.lifetime_days", "36501").is_err());
        assert!(cfg.set("expiry.horizon_days", "4000000000").is_err());
        assert_eq!(cfg.expiry.lifetime_days, 90);
        assert_eq!(cfg.expiry.horizon_days, 30);
        assert_eq!(cfg.network.max_retries, 5);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn load_from_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = LoyaltyConfig::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.program.quick_redeem_points, 10);
    }

    #[test]
    fn save_and_reload_preserves_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = LoyaltyConfig::default();
        cfg.set("expiry.horizon_days", "7").unwrap();
        cfg.save_to(&path).unwrap();

        let reloaded = LoyaltyConfig::load_from(&path).unwrap();
        assert_eq!(reloaded.expiry.horizon_days, 7);
        assert_eq!(reloaded.horizon(), Duration::days(7));
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[expiry\nlifetime_days = ").unwrap();
        assert!(matches!(
            LoyaltyConfig::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }
}
