//! Capability-typed wallet handles
//!
//! A wallet advertises, per chain, whether it can describe paths (info) and
//! whether it can derive and sign. The set is fixed when the wallet is built.
//! Callers check `supports`/`supports_info` before reaching for a chain
//! operation, and an info-only wallet never exposes signing at all.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::WalletResult;
use crate::native::{NativeHDWallet, NativeHDWalletInfo};
use crate::types::{AccountPath, Chain, PathDescription};
use crate::wallet::derivation_path::Bip32Path;

/// Per-chain info and signing flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    info: BTreeSet<Chain>,
    signing: BTreeSet<Chain>,
}

impl CapabilitySet {
    /// Signing implies info for the same chain
    pub fn new(info: impl IntoIterator<Item = Chain>, signing: impl IntoIterator<Item = Chain>) -> Self {
        let signing: BTreeSet<Chain> = signing.into_iter().collect();
        let mut info: BTreeSet<Chain> = info.into_iter().collect();
        info.extend(signing.iter().copied());
        Self { info, signing }
    }

    /// Every chain, info and signing
    pub fn native() -> Self {
        Self::new(Chain::ALL, Chain::ALL)
    }

    /// Every chain, info only
    pub fn info_only() -> Self {
        Self::new(Chain::ALL, [])
    }

    pub fn supports(&self, chain: Chain) -> bool {
        self.signing.contains(&chain)
    }

    pub fn supports_info(&self, chain: Chain) -> bool {
        self.info.contains(&chain)
    }

    pub fn signing_chains(&self) -> impl Iterator<Item = Chain> + '_ {
        self.signing.iter().copied()
    }

    pub fn info_chains(&self) -> impl Iterator<Item = Chain> + '_ {
        self.info.iter().copied()
    }
}

/// Describe-only surface every wallet offers
pub trait HdWalletInfo {
    fn capabilities(&self) -> &CapabilitySet;

    fn vendor(&self) -> &str;

    fn has_on_device_display(&self) -> bool;

    fn has_on_device_pin_entry(&self) -> bool;

    fn has_on_device_passphrase(&self) -> bool;

    fn has_on_device_recovery(&self) -> bool;

    /// Whether the wallet can execute a ShapeShift trade between two chains itself
    fn has_native_shapeshift(&self, src: Chain, dst: Chain) -> bool;

    fn describe_path(&self, path: &Bip32Path, chain: Chain) -> PathDescription;

    fn get_account_paths(&self, chain: Chain, account_idx: u32) -> WalletResult<Vec<AccountPath>>;

    fn next_account_path(&self, path: &AccountPath) -> Option<AccountPath>;
}

/// A wallet handle: full (signing-capable) or describe-only
#[derive(Debug)]
pub enum Wallet {
    Native(NativeHDWallet),
    InfoOnly(NativeHDWalletInfo),
}

impl Wallet {
    pub fn capabilities(&self) -> &CapabilitySet {
        self.info().capabilities()
    }

    pub fn supports(&self, chain: Chain) -> bool {
        match self {
            Wallet::Native(w) => w.info().capabilities().supports(chain),
            Wallet::InfoOnly(_) => false,
        }
    }

    pub fn supports_info(&self, chain: Chain) -> bool {
        self.capabilities().supports_info(chain)
    }

    pub fn is_info_only(&self) -> bool {
        matches!(self, Wallet::InfoOnly(_))
    }

    /// Every wallet is also a valid describe-only wallet
    pub fn info(&self) -> &NativeHDWalletInfo {
        match self {
            Wallet::Native(w) => w.info(),
            Wallet::InfoOnly(info) => info,
        }
    }

    pub fn as_native(&self) -> Option<&NativeHDWallet> {
        match self {
            Wallet::Native(w) => Some(w),
            Wallet::InfoOnly(_) => None,
        }
    }
}

impl From<NativeHDWallet> for Wallet {
    fn from(wallet: NativeHDWallet) -> Self {
        Wallet::Native(wallet)
    }
}

impl From<NativeHDWalletInfo> for Wallet {
    fn from(info: NativeHDWalletInfo) -> Self {
        Wallet::InfoOnly(info)
    }
}
