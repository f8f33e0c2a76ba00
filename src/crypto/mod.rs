//! Cryptographic primitives
//!
//! - `curves`: per-curve derivation and signing
//! - `isolation`: the session that owns the seed and the key handles it issues

pub mod curves;
pub mod isolation;

pub use curves::{CurveError, CurveType, RawSignature, SignatureFormat};
pub use isolation::{IsolatedKeyHandle, KeyIsolationCore, LoadOptions, MasterSecret};
