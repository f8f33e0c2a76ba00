//! Shared types
//!
//! Data that crosses module boundaries: the chain set, Bitcoin script types,
//! and the path-related records produced by the path codec and enumerator.

use serde::{Deserialize, Serialize};

use crate::wallet::derivation_path::Bip32Path;

// =============================================================================
// Chain Types
// =============================================================================

/// Chains the native backend understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Chain {
    Bitcoin,
    Ethereum,
    Cosmos,
    Binance,
    Thorchain,
    Ripple,
    Eos,
    Fio,
}

impl Chain {
    pub const ALL: [Chain; 8] = [
        Chain::Bitcoin,
        Chain::Ethereum,
        Chain::Cosmos,
        Chain::Binance,
        Chain::Thorchain,
        Chain::Ripple,
        Chain::Eos,
        Chain::Fio,
    ];

    /// SLIP-44 registered coin type
    pub fn slip44(&self) -> u32 {
        match self {
            Chain::Bitcoin => 0,
            Chain::Ethereum => 60,
            Chain::Cosmos => 118,
            Chain::Ripple => 144,
            Chain::Eos => 194,
            Chain::Fio => 235,
            Chain::Binance => 714,
            Chain::Thorchain => 931,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Chain::Bitcoin => "BTC",
            Chain::Ethereum => "ETH",
            Chain::Cosmos => "ATOM",
            Chain::Binance => "BNB",
            Chain::Thorchain => "RUNE",
            Chain::Ripple => "XRP",
            Chain::Eos => "EOS",
            Chain::Fio => "FIO",
        }
    }

    /// Display name used in path descriptions
    pub fn name(&self) -> &'static str {
        match self {
            Chain::Bitcoin => "Bitcoin",
            Chain::Ethereum => "Ethereum",
            Chain::Cosmos => "Cosmos",
            Chain::Binance => "Binance",
            Chain::Thorchain => "THORChain",
            Chain::Ripple => "Ripple",
            Chain::Eos => "Eos",
            Chain::Fio => "Fio",
        }
    }

    pub fn is_utxo(&self) -> bool {
        matches!(self, Chain::Bitcoin)
    }

    /// Chains signed through the amino JSON sign doc
    pub fn is_cosmos_family(&self) -> bool {
        matches!(self, Chain::Cosmos | Chain::Binance | Chain::Thorchain)
    }

    pub fn is_antelope_family(&self) -> bool {
        matches!(self, Chain::Eos | Chain::Fio)
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bitcoin" | "btc" => Ok(Chain::Bitcoin),
            "ethereum" | "eth" => Ok(Chain::Ethereum),
            "cosmos" | "atom" => Ok(Chain::Cosmos),
            "binance" | "bnb" => Ok(Chain::Binance),
            "thorchain" | "rune" => Ok(Chain::Thorchain),
            "ripple" | "xrp" => Ok(Chain::Ripple),
            "eos" => Ok(Chain::Eos),
            "fio" => Ok(Chain::Fio),
            _ => Err(format!("Unknown chain: {}", s)),
        }
    }
}

// =============================================================================
// Bitcoin Script Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BtcScriptType {
    /// Legacy pay-to-pubkey-hash (purpose 44')
    P2pkh,
    /// Nested segwit (purpose 49')
    P2shP2wpkh,
    /// Native segwit (purpose 84')
    P2wpkh,
}

impl BtcScriptType {
    pub fn purpose(&self) -> u32 {
        match self {
            BtcScriptType::P2pkh => 44,
            BtcScriptType::P2shP2wpkh => 49,
            BtcScriptType::P2wpkh => 84,
        }
    }

    pub fn from_purpose(purpose: u32) -> Option<Self> {
        match purpose {
            44 => Some(BtcScriptType::P2pkh),
            49 => Some(BtcScriptType::P2shP2wpkh),
            84 => Some(BtcScriptType::P2wpkh),
            _ => None,
        }
    }

    pub fn is_segwit(&self) -> bool {
        !matches!(self, BtcScriptType::P2pkh)
    }

    pub fn label(&self) -> &'static str {
        match self {
            BtcScriptType::P2pkh => "Legacy",
            BtcScriptType::P2shP2wpkh => "Segwit",
            BtcScriptType::P2wpkh => "Segwit Native",
        }
    }
}

// =============================================================================
// Path Records
// =============================================================================

/// Read-only summary of what a derivation path means for a chain.
///
/// Only `verbose` and `coin` are meaningful when `is_known` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathDescription {
    pub verbose: String,
    pub coin: String,
    pub is_known: bool,
    pub account_idx: Option<u32>,
    pub address_idx: Option<u32>,
    pub is_change: Option<bool>,
    pub whole_account: Option<bool>,
    pub is_prefork: Option<bool>,
    pub script_type: Option<BtcScriptType>,
}

impl PathDescription {
    pub fn unknown(verbose: impl Into<String>, chain: Chain) -> Self {
        Self {
            verbose: verbose.into(),
            coin: chain.name().to_string(),
            is_known: false,
            account_idx: None,
            address_idx: None,
            is_change: None,
            whole_account: None,
            is_prefork: None,
            script_type: None,
        }
    }
}

/// One account for a chain, as produced by the account enumerator
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountPath {
    pub chain: Chain,
    pub address_n_list: Bip32Path,
    pub script_type: Option<BtcScriptType>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slip44_table() {
        let expected = [0, 60, 118, 714, 931, 144, 194, 235];
        for (chain, coin) in Chain::ALL.iter().zip(expected) {
            assert_eq!(chain.slip44(), coin, "{:?}", chain);
        }
    }

    #[test]
    fn test_chain_from_str() {
        assert_eq!("THORChain".parse::<Chain>().unwrap(), Chain::Thorchain);
        assert_eq!("xrp".parse::<Chain>().unwrap(), Chain::Ripple);
        assert!("dogecoin".parse::<Chain>().is_err());
    }

    #[test]
    fn test_script_type_purpose() {
        for st in [BtcScriptType::P2pkh, BtcScriptType::P2shP2wpkh, BtcScriptType::P2wpkh] {
            assert_eq!(BtcScriptType::from_purpose(st.purpose()), Some(st));
        }
        assert_eq!(BtcScriptType::from_purpose(86), None);
    }

    #[test]
    fn test_chain_serde_kebab_case() {
        assert_eq!(serde_json::to_string(&Chain::Thorchain).unwrap(), "\"thorchain\"");
    }
}
