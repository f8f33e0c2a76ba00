//! Wallet configuration
//!
//! Per-chain policy for the native backend:
//! - account discovery (single account or sequential accounts)
//! - whether addresses and signing require a recognised path
//! - Binance address rendering
//! - which curves a loaded session may derive on

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::crypto::curves::CurveType;
use crate::error::{WalletError, WalletResult};
use crate::types::Chain;

/// How `next_account_path` walks accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountDiscovery {
    /// Only account 0 exists; there is never a next account
    SingleAccount,
    /// Accounts 0, 1, 2, ... up to the hardened index limit
    Sequential,
}

/// How Binance Chain addresses are rendered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum BinanceAddressMode {
    /// Derive at the Cosmos coin type and relabel the `cosmos` prefix as
    /// `binance` without recomputing the checksum. Matches addresses issued by
    /// earlier native wallets.
    LegacyCosmosRelabel,
    /// Plain bech32 at the requested path
    Bech32 { hrp: String },
}

impl Default for BinanceAddressMode {
    fn default() -> Self {
        BinanceAddressMode::LegacyCosmosRelabel
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainPolicy {
    pub discovery: AccountDiscovery,
    /// Reject paths that `describe_path` does not recognise
    pub strict_paths: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    pub vendor: String,
    pub model: String,
    pub label: String,
    pub chains: BTreeMap<Chain, ChainPolicy>,
    pub binance_address_mode: BinanceAddressMode,
    pub allowed_curves: Vec<CurveType>,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl WalletConfig {
    /// Defaults matching the native backend's historical behaviour
    pub fn standard() -> Self {
        let chains = Chain::ALL
            .iter()
            .map(|&chain| {
                let policy = match chain {
                    Chain::Bitcoin | Chain::Ethereum => ChainPolicy {
                        discovery: AccountDiscovery::Sequential,
                        strict_paths: false,
                    },
                    _ => ChainPolicy {
                        discovery: AccountDiscovery::SingleAccount,
                        strict_paths: true,
                    },
                };
                (chain, policy)
            })
            .collect();

        Self {
            vendor: "Native".to_string(),
            model: "Native".to_string(),
            label: "Native".to_string(),
            chains,
            binance_address_mode: BinanceAddressMode::default(),
            allowed_curves: vec![CurveType::Secp256k1, CurveType::Ed25519],
        }
    }

    /// Every chain sequential and strict
    pub fn multi_account() -> Self {
        let mut config = Self::standard();
        for policy in config.chains.values_mut() {
            policy.discovery = AccountDiscovery::Sequential;
            policy.strict_paths = true;
        }
        config
    }

    pub fn from_json(json: &str) -> WalletResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn policy(&self, chain: Chain) -> ChainPolicy {
        self.chains.get(&chain).copied().unwrap_or(ChainPolicy {
            discovery: AccountDiscovery::SingleAccount,
            strict_paths: true,
        })
    }

    pub fn discovery(&self, chain: Chain) -> AccountDiscovery {
        self.policy(chain).discovery
    }

    pub fn strict_paths(&self, chain: Chain) -> bool {
        self.policy(chain).strict_paths
    }

    /// Hard errors: a config that cannot be used
    pub fn validate(&self) -> WalletResult<()> {
        if self.allowed_curves.is_empty() {
            return Err(WalletError::invalid_input("allowed_curves must not be empty"));
        }
        if !self.allowed_curves.contains(&CurveType::Secp256k1) {
            return Err(WalletError::invalid_input(
                "secp256k1 must be allowed; every supported chain signs with it",
            ));
        }
        if let BinanceAddressMode::Bech32 { hrp } = &self.binance_address_mode {
            let ok = !hrp.is_empty()
                && hrp.len() <= 83
                && hrp.bytes().all(|b| (33..=126).contains(&b) && !b.is_ascii_uppercase());
            if !ok {
                return Err(WalletError::invalid_input(format!(
                    "Invalid bech32 prefix for Binance: '{}'",
                    hrp
                )));
            }
        }
        Ok(())
    }

    /// Soft findings worth logging
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for chain in Chain::ALL {
            if !self.chains.contains_key(&chain) {
                warnings.push(format!("No policy for {}; using single-account strict", chain));
            }
        }
        if let Some(p) = self.chains.get(&Chain::Binance) {
            if p.discovery == AccountDiscovery::Sequential
                && self.binance_address_mode == BinanceAddressMode::LegacyCosmosRelabel
            {
                warnings.push(
                    "Sequential Binance accounts share keys with the matching Cosmos accounts in legacy mode"
                        .to_string(),
                );
            }
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_policies() {
        let c = WalletConfig::standard();
        assert_eq!(c.discovery(Chain::Bitcoin), AccountDiscovery::Sequential);
        assert_eq!(c.discovery(Chain::Ethereum), AccountDiscovery::Sequential);
        for chain in [Chain::Cosmos, Chain::Binance, Chain::Thorchain, Chain::Ripple, Chain::Eos, Chain::Fio] {
            assert_eq!(c.discovery(chain), AccountDiscovery::SingleAccount);
            assert!(c.strict_paths(chain));
        }
        assert!(!c.strict_paths(Chain::Bitcoin));
        assert!(c.validate().is_ok());
        assert!(c.warnings().is_empty());
    }

    #[test]
    fn test_json_roundtrip_and_partial() {
        let c = WalletConfig::from_json(r#"{"label":"desk","binance_address_mode":{"mode":"bech32","hrp":"bnb"}}"#)
            .unwrap();
        assert_eq!(c.label, "desk");
        assert_eq!(c.binance_address_mode, BinanceAddressMode::Bech32 { hrp: "bnb".into() });
        assert_eq!(c.discovery(Chain::Bitcoin), AccountDiscovery::Sequential);
    }

    #[test]
    fn test_validate_rejects_bad_config() {
        let mut c = WalletConfig::standard();
        c.allowed_curves = vec![CurveType::Ed25519];
        assert!(c.validate().is_err());

        let mut c = WalletConfig::standard();
        c.binance_address_mode = BinanceAddressMode::Bech32 { hrp: "BNB".into() };
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_multi_account_warns_for_legacy_binance() {
        let c = WalletConfig::multi_account();
        assert_eq!(c.discovery(Chain::Ripple), AccountDiscovery::Sequential);
        assert_eq!(c.warnings().len(), 1);
    }
}
