//! BIP32 path codec and per-chain path descriptions
//!
//! A path is an ordered list of `u32` indices, root to leaf. Indices at or above
//! `HARDENED` are hardened. The string form is `m/44'/118'/0'/0/0`; `h` and `H`
//! are accepted as hardened markers on input, `'` is always written.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{WalletError, WalletResult};
use crate::types::{BtcScriptType, Chain, PathDescription};

/// Hardened offset for BIP-32 derivation
pub const HARDENED: u32 = 0x8000_0000;

/// Largest unhardened index value
pub const MAX_INDEX: u32 = HARDENED - 1;

pub const fn hardened(index: u32) -> u32 {
    index | HARDENED
}

pub const fn is_hardened(index: u32) -> bool {
    index & HARDENED != 0
}

/// Ordered derivation path
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bip32Path(Vec<u32>);

impl Bip32Path {
    pub fn new(indices: Vec<u32>) -> Self {
        Self(indices)
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<u32> {
        self.0.get(i).copied()
    }

    /// New path with `index` appended
    pub fn child(&self, index: u32) -> Self {
        let mut v = self.0.clone();
        v.push(index);
        Self(v)
    }

    /// New path with segment `i` replaced
    pub fn with_segment(&self, i: usize, index: u32) -> Option<Self> {
        let mut v = self.0.clone();
        *v.get_mut(i)? = index;
        Some(Self(v))
    }

    /// True when every segment is hardened
    pub fn all_hardened(&self) -> bool {
        self.0.iter().all(|&i| is_hardened(i))
    }

    pub fn to_bitcoin(&self) -> bitcoin::bip32::DerivationPath {
        self.0
            .iter()
            .map(|&i| bitcoin::bip32::ChildNumber::from(i))
            .collect::<Vec<_>>()
            .into()
    }
}

impl From<Vec<u32>> for Bip32Path {
    fn from(v: Vec<u32>) -> Self {
        Self(v)
    }
}

impl From<&[u32]> for Bip32Path {
    fn from(v: &[u32]) -> Self {
        Self(v.to_vec())
    }
}

impl fmt::Display for Bip32Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for &index in &self.0 {
            if is_hardened(index) {
                write!(f, "/{}'", index & MAX_INDEX)?;
            } else {
                write!(f, "/{}", index)?;
            }
        }
        Ok(())
    }
}

impl FromStr for Bip32Path {
    type Err = WalletError;

    fn from_str(s: &str) -> WalletResult<Self> {
        let trimmed = s.trim();
        let rest = match trimmed {
            "m" | "M" => return Ok(Self::default()),
            t if t.starts_with("m/") || t.starts_with("M/") => &t[2..],
            _ => {
                return Err(WalletError::invalid_path("Derivation path must start with 'm/'")
                    .with_details(s.to_string()))
            }
        };

        rest.split('/')
            .map(parse_segment)
            .collect::<WalletResult<Vec<u32>>>()
            .map(Self)
            .map_err(|e| e.with_details(s.to_string()))
    }
}

fn parse_segment(segment: &str) -> WalletResult<u32> {
    if segment.is_empty() {
        return Err(WalletError::invalid_path("Empty path segment"));
    }
    let (digits, is_hard) = match segment.strip_suffix(['\'', 'h', 'H']) {
        Some(d) => (d, true),
        None => (segment, false),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(WalletError::invalid_path(format!(
            "Invalid path segment '{}'",
            segment
        )));
    }
    let index: u32 = digits
        .parse()
        .map_err(|_| WalletError::invalid_path(format!("Path segment '{}' overflows", segment)))?;
    if index > MAX_INDEX {
        return Err(WalletError::invalid_path(format!(
            "Path segment {} exceeds maximum value",
            index
        )));
    }
    Ok(if is_hard { hardened(index) } else { index })
}

// =============================================================================
// Path descriptions
// =============================================================================

/// Describe what `path` means for `chain`. Never fails: a path that does not
/// match the chain's template yields `is_known = false`.
pub fn describe_path(path: &Bip32Path, chain: Chain) -> PathDescription {
    match chain {
        Chain::Bitcoin => describe_utxo_path(path, chain),
        _ => describe_account_path(path, chain),
    }
}

/// Account-model template: `[44', coin', account', 0, 0]`
fn describe_account_path(path: &Bip32Path, chain: Chain) -> PathDescription {
    let p = path.as_slice();
    let unknown = || PathDescription::unknown(path.to_string(), chain);

    if p.len() != 5 {
        return unknown();
    }
    if p[0] != hardened(44) || p[1] != hardened(chain.slip44()) || !is_hardened(p[2]) {
        return unknown();
    }
    if p[3] != 0 || p[4] != 0 {
        return unknown();
    }

    let account = p[2] & MAX_INDEX;
    PathDescription {
        verbose: format!("{} Account #{}", chain.name(), account),
        coin: chain.name().to_string(),
        is_known: true,
        account_idx: Some(account),
        address_idx: None,
        is_change: None,
        whole_account: Some(true),
        is_prefork: Some(false),
        script_type: None,
    }
}

/// UTXO template: `[purpose', coin', account']` for a whole account or
/// `[purpose', coin', account', change, index]` for one address
fn describe_utxo_path(path: &Bip32Path, chain: Chain) -> PathDescription {
    let p = path.as_slice();
    let unknown = || PathDescription::unknown(path.to_string(), chain);

    if p.len() != 3 && p.len() != 5 {
        return unknown();
    }
    if !is_hardened(p[0]) || !is_hardened(p[1]) || !is_hardened(p[2]) {
        return unknown();
    }
    let script_type = match BtcScriptType::from_purpose(p[0] & MAX_INDEX) {
        Some(st) => st,
        None => return unknown(),
    };
    if p[1] != hardened(chain.slip44()) {
        return unknown();
    }

    let account = p[2] & MAX_INDEX;
    let mut desc = PathDescription {
        verbose: format!("{} Account #{}", chain.name(), account),
        coin: chain.name().to_string(),
        is_known: true,
        account_idx: Some(account),
        address_idx: None,
        is_change: None,
        whole_account: Some(true),
        is_prefork: Some(false),
        script_type: Some(script_type),
    };

    if p.len() == 5 {
        let (change, index) = (p[3], p[4]);
        if is_hardened(change) || is_hardened(index) || change > 1 {
            return unknown();
        }
        let kind = if change == 1 { "Change Address" } else { "Address" };
        desc.verbose = format!("{}, {} #{}", desc.verbose, kind, index);
        desc.is_change = Some(change == 1);
        desc.address_idx = Some(index);
        desc.whole_account = Some(false);
    }

    desc.verbose = format!("{} ({})", desc.verbose, script_type.label());
    desc
}
