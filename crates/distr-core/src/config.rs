use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use distr_math::{validate_denom, Dec};

use crate::address::Address;
use crate::types::Params;
use crate::{FEE_COLLECTOR_NAME, GOV_MODULE_NAME};

/// Static configuration of the distribution module.
/// Genesis params are written once by `Keeper::initialize`; after that
/// the on-chain params (changed through `MsgUpdateParams`) win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributionConfig {
    /// Hex address allowed to spend the community pool and update params.
    pub authority: String,
    /// Module account name that collects fees.
    pub fee_collector: String,
    pub bond_denom: String,
    /// Extra hex addresses that may not receive rewards.
    pub blocked_addresses: Vec<String>,
    pub params: Params,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            authority: Address::module(GOV_MODULE_NAME).to_hex(),
            fee_collector: FEE_COLLECTOR_NAME.to_string(),
            bond_denom: "stake".to_string(),
            blocked_addresses: Vec::new(),
            params: Params::default(),
        }
    }
}

impl DistributionConfig {
    /// Load config from TOML file
    pub fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        let config: DistributionConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config from environment variables, defaulting anything unset
    pub fn load_from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = DistributionConfig::default();

        if let Ok(authority) = std::env::var("DISTR_AUTHORITY") {
            config.authority = authority;
        }
        if let Ok(tax) = std::env::var("DISTR_COMMUNITY_TAX") {
            config.params.community_tax = tax.parse::<Dec>()?;
        }
        if let Ok(enabled) = std::env::var("DISTR_WITHDRAW_ADDR_ENABLED") {
            config.params.withdraw_addr_enabled = enabled.parse()?;
        }
        if let Ok(denom) = std::env::var("DISTR_BOND_DENOM") {
            config.bond_denom = denom;
        }

        Ok(config)
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        Address::from_hex(&self.authority).map_err(|e| format!("authority: {}", e))?;

        if self.fee_collector.is_empty() {
            return Err("fee_collector cannot be empty".to_string());
        }

        validate_denom(&self.bond_denom).map_err(|e| e.to_string())?;

        self.params.validate().map_err(|e| e.to_string())?;

        for addr in &self.blocked_addresses {
            Address::from_hex(addr).map_err(|e| format!("blocked address: {}", e))?;
        }

        Ok(())
    }

    pub fn authority_address(&self) -> Result<Address, String> {
        Address::from_hex(&self.authority).map_err(|e| e.to_string())
    }

    pub fn blocked_address_list(&self) -> Result<Vec<Address>, String> {
        self.blocked_addresses
            .iter()
            .map(|a| Address::from_hex(a).map_err(|e| e.to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = DistributionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.authority_address().unwrap(),
            Address::module(GOV_MODULE_NAME)
        );
    }

    #[test]
    fn test_config_validation() {
        let mut config = DistributionConfig::default();
        config.authority = "not-hex".to_string();
        assert!(config.validate().is_err());

        config = DistributionConfig::default();
        config.params.community_tax = Dec::from_u128(2);
        assert!(config.validate().is_err());

        config = DistributionConfig::default();
        config.bond_denom = "1x".to_string();
        assert!(config.validate().is_err());

        config = DistributionConfig::default();
        config.blocked_addresses = vec!["zz".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("distribution.toml");

        let mut config = DistributionConfig::default();
        config.params.community_tax = Dec::with_prec(5, 2);
        config.params.withdraw_addr_enabled = false;
        config.blocked_addresses = vec!["0102".to_string()];

        config.save_to_file(&config_path).unwrap();
        let loaded = DistributionConfig::load_from_file(&config_path).unwrap();

        assert_eq!(loaded, config);
        assert_eq!(loaded.blocked_address_list().unwrap().len(), 1);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("partial.toml");
        fs::write(&config_path, "bond_denom = \"uatom\"\n").unwrap();

        let loaded = DistributionConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded.bond_denom, "uatom");
        assert_eq!(loaded.fee_collector, FEE_COLLECTOR_NAME);
        assert_eq!(loaded.params, Params::default());
    }
}
