//! Wallet paths
//!
//! Path codec, per-chain path descriptions and account enumeration.

pub mod account_paths;
pub mod derivation_path;

pub use account_paths::{account_paths, next_account_path};
pub use derivation_path::{describe_path, hardened, is_hardened, Bip32Path, HARDENED, MAX_INDEX};
