//! Curve support for derived keys
//!
//! - `secp256k1`: BIP32 derivation, RFC6979 ECDSA (Bitcoin, Ethereum, Cosmos
//!   family, Ripple, EOS/FIO)
//! - `ed25519`: SLIP-10 derivation, hardened segments only
//!
//! Both implement `HdCurve`, which the isolation core drives without knowing
//! which curve it is talking to.

pub mod ed25519;
pub mod secp256k1;
pub mod traits;

pub use ed25519::Ed25519Curve;
pub use secp256k1::Secp256k1Curve;
pub use traits::*;

use serde::{Deserialize, Serialize};

// MARK: - Curve Type Enum

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveType {
    Secp256k1,
    Ed25519,
}

impl CurveType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Secp256k1 => "secp256k1",
            Self::Ed25519 => "ed25519",
        }
    }

    /// Public key size in bytes (compressed SEC1 for secp256k1)
    pub fn public_key_size(&self) -> usize {
        match self {
            Self::Secp256k1 => 33,
            Self::Ed25519 => 32,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "secp256k1" => Some(Self::Secp256k1),
            "ed25519" => Some(Self::Ed25519),
            _ => None,
        }
    }
}

impl std::fmt::Display for CurveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// MARK: - Curve Errors

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurveError {
    InvalidPrivateKey(String),
    InvalidPublicKey(String),
    InvalidSignature(String),
    InvalidSeed(String),
    InvalidDigest(usize),
    SigningFailed(String),
    UnsupportedCurve(String),
    DerivationFailed(String),
    NonHardenedSegment(u32),
}

impl std::fmt::Display for CurveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPrivateKey(s) => write!(f, "Invalid private key: {}", s),
            Self::InvalidPublicKey(s) => write!(f, "Invalid public key: {}", s),
            Self::InvalidSignature(s) => write!(f, "Invalid signature: {}", s),
            Self::InvalidSeed(s) => write!(f, "Invalid seed: {}", s),
            Self::InvalidDigest(n) => write!(f, "Digest must be 32 bytes, got {}", n),
            Self::SigningFailed(s) => write!(f, "Signing failed: {}", s),
            Self::UnsupportedCurve(s) => write!(f, "Unsupported curve: {}", s),
            Self::DerivationFailed(s) => write!(f, "Key derivation failed: {}", s),
            Self::NonHardenedSegment(i) => {
                write!(f, "Segment {} is not hardened; this curve derives hardened only", i)
            }
        }
    }
}

impl std::error::Error for CurveError {}

// MARK: - Dispatch

/// Derive the scalar at `path` for `curve`
pub fn derive_secret(
    curve: CurveType,
    seed: &[u8],
    path: &[u32],
) -> Result<DerivedSecret, CurveError> {
    match curve {
        CurveType::Secp256k1 => Secp256k1Curve::derive(seed, path),
        CurveType::Ed25519 => Ed25519Curve::derive(seed, path),
    }
}

pub fn public_key(curve: CurveType, secret: &DerivedSecret) -> Result<Vec<u8>, CurveError> {
    match curve {
        CurveType::Secp256k1 => Secp256k1Curve::public_key(secret),
        CurveType::Ed25519 => Ed25519Curve::public_key(secret),
    }
}

pub fn sign(
    curve: CurveType,
    secret: &DerivedSecret,
    payload: &[u8],
    format: SignatureFormat,
) -> Result<RawSignature, CurveError> {
    match curve {
        CurveType::Secp256k1 => Secp256k1Curve::sign(secret, payload, format),
        CurveType::Ed25519 => Ed25519Curve::sign(secret, payload, format),
    }
}
