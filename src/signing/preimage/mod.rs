//! Pre-image digests and the signatures that answer them
//!
//! An adapter turns a request into a list of `PreImage`s, one per signature it
//! needs. Each names the key (by index into the adapter's signing paths), the
//! 32-byte digest and the signature format. The signatures come back as
//! `ExternalSignature`s in the same order.

use serde::{Deserialize, Serialize};

use crate::crypto::curves::{RawSignature, SignatureFormat};

/// A digest waiting to be signed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreImage {
    /// Index into the adapter's signing paths
    pub key_index: usize,
    /// 32-byte digest (or raw message bytes for ed25519)
    pub digest: Vec<u8>,
    pub format: SignatureFormat,
    /// Which input this is for (UTXO chains)
    pub input_index: Option<usize>,
    pub description: String,
}

impl PreImage {
    pub fn new(key_index: usize, digest: impl Into<Vec<u8>>, format: SignatureFormat) -> Self {
        Self {
            key_index,
            digest: digest.into(),
            format,
            input_index: None,
            description: String::new(),
        }
    }

    pub fn with_input_index(mut self, index: usize) -> Self {
        self.input_index = Some(index);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn digest_hex(&self) -> String {
        hex::encode(&self.digest)
    }
}

/// Signature over a `PreImage`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalSignature {
    pub signature: Vec<u8>,
    pub recovery_id: Option<u8>,
    pub input_index: Option<usize>,
    pub public_key: Vec<u8>,
}

impl ExternalSignature {
    pub fn from_raw(raw: RawSignature, public_key: &[u8], input_index: Option<usize>) -> Self {
        Self {
            signature: raw.bytes,
            recovery_id: raw.recovery_id,
            input_index,
            public_key: public_key.to_vec(),
        }
    }

    /// `r || s` for compact signatures
    pub fn compact(&self) -> PreImageResult<[u8; 64]> {
        self.signature.as_slice().try_into().map_err(|_| {
            PreImageError::InvalidSignature(format!(
                "Expected 64-byte signature, got {}",
                self.signature.len()
            ))
        })
    }

    pub fn require_recovery_id(&self) -> PreImageResult<u8> {
        self.recovery_id
            .ok_or_else(|| PreImageError::InvalidSignature("Missing recovery id".into()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PreImageError {
    #[error("Invalid transaction format: {0}")]
    InvalidTransaction(String),

    #[error("Unsupported transaction type: {0}")]
    UnsupportedType(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid input index: {0}")]
    InvalidInputIndex(usize),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Public key mismatch")]
    PublicKeyMismatch,
}

pub type PreImageResult<T> = Result<T, PreImageError>;
