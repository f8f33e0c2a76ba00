//! Utilities Module
//!
//! Hashing helpers, canonical JSON, structured logging and wallet
//! configuration shared by the chain adapters.

pub mod crypto;
pub mod json;
pub mod logging;
pub mod wallet_config;

pub use crypto::*;
pub use json::*;
pub use wallet_config::{AccountDiscovery, BinanceAddressMode, ChainPolicy, WalletConfig};
