//! Account path enumeration
//!
//! Produces the paths a wallet should scan for an account and walks to the
//! next account according to the chain's discovery policy.

use crate::error::{WalletError, WalletResult};
use crate::types::{AccountPath, BtcScriptType, Chain};
use crate::utils::wallet_config::{AccountDiscovery, WalletConfig};
use crate::wallet::derivation_path::{describe_path, hardened, Bip32Path, MAX_INDEX};

/// Bitcoin script types in order of preference
const BTC_PREFERENCE: [BtcScriptType; 3] = [
    BtcScriptType::P2wpkh,
    BtcScriptType::P2shP2wpkh,
    BtcScriptType::P2pkh,
];

/// Paths for account `account_idx` on `chain`, most preferred first
pub fn account_paths(chain: Chain, account_idx: u32) -> WalletResult<Vec<AccountPath>> {
    if account_idx > MAX_INDEX {
        return Err(WalletError::invalid_input(format!(
            "Account index {} exceeds the hardened range",
            account_idx
        )));
    }

    let coin = hardened(chain.slip44());
    let account = hardened(account_idx);

    let paths = match chain {
        Chain::Bitcoin => BTC_PREFERENCE
            .iter()
            .map(|&st| AccountPath {
                chain,
                address_n_list: Bip32Path::new(vec![hardened(st.purpose()), coin, account]),
                script_type: Some(st),
            })
            .collect(),
        _ => vec![AccountPath {
            chain,
            address_n_list: Bip32Path::new(vec![hardened(44), coin, account, 0, 0]),
            script_type: None,
        }],
    };
    Ok(paths)
}

/// The account after `current`, or `None` when the chain has a single account,
/// the path is not recognised, or the account index is exhausted.
pub fn next_account_path(current: &AccountPath, config: &WalletConfig) -> Option<AccountPath> {
    if config.discovery(current.chain) == AccountDiscovery::SingleAccount {
        return None;
    }

    let desc = describe_path(&current.address_n_list, current.chain);
    if !desc.is_known {
        return None;
    }
    let account = desc.account_idx?;
    if account >= MAX_INDEX {
        return None;
    }

    let next = current
        .address_n_list
        .with_segment(2, hardened(account + 1))?;
    Some(AccountPath {
        chain: current.chain,
        address_n_list: next,
        script_type: desc.script_type.or(current.script_type),
    })
}
