//! Native HD wallet core
//!
//! A software hierarchical-deterministic wallet with the same call surface as
//! a hardware signer.
//!
//! # Architecture
//!
//! - **wallet**: BIP32 path codec, path descriptions, account enumeration
//! - **crypto**: curve derivation and the key isolation core
//! - **signing**: the `ChainAdapter` seam and the pre-image/sign/compile driver
//! - **\*_wallet**: per-chain adapters (Bitcoin, Ethereum, Cosmos family,
//!   Ripple, EOS/FIO)
//! - **capabilities** / **native**: wallet handles and the native backend
//! - **transport**: command seam for hardware backends
//!
//! # Security
//!
//! Seeds and derived scalars live only inside `crypto::isolation` and are
//! zeroized on drop. Callers hold `IsolatedKeyHandle`s, which sign but never
//! reveal the key, and stop working once the session is wiped or reloaded.
//!
//! # Example
//!
//! ```rust,ignore
//! use hdwallet_native::{LoadDevice, NativeHDWallet};
//!
//! let wallet = NativeHDWallet::new("device-1");
//! wallet.load_device(LoadDevice::mnemonic(phrase)).await?;
//! let address = wallet.cosmos_get_address(&"m/44'/118'/0'/0/0".parse()?, false).await?;
//! ```

pub mod error;
pub mod types;
pub mod utils;
pub mod crypto;
pub mod wallet;
pub mod signing;

pub mod bitcoin_wallet;
pub mod cosmos_wallet;
pub mod eos_wallet;
pub mod ethereum_wallet;
pub mod xrp_wallet;

pub mod capabilities;
pub mod native;
pub mod transport;

pub use error::{ErrorCode, WalletError, WalletResult};
pub use types::*;

pub use capabilities::{CapabilitySet, HdWalletInfo, Wallet};
pub use crypto::{CurveType, IsolatedKeyHandle, KeyIsolationCore, LoadOptions, MasterSecret};
pub use native::{GetPublicKey, LoadDevice, NativeHDWallet, NativeHDWalletInfo, Ping, Pong, PublicKey};
pub use signing::ChainAdapter;
pub use transport::{ExclusiveTransport, Transport};
pub use utils::wallet_config::{BinanceAddressMode, WalletConfig};
pub use wallet::{account_paths, describe_path, next_account_path, Bip32Path};
