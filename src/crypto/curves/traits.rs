//! Curve traits and the values that cross them

use super::CurveError;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Private scalar and chain code at some derivation path.
///
/// Both halves are wiped on drop. `Debug` never prints them.
pub struct DerivedSecret {
    scalar: Zeroizing<[u8; 32]>,
    chain_code: Zeroizing<[u8; 32]>,
}

impl DerivedSecret {
    pub(crate) fn new(scalar: [u8; 32], chain_code: [u8; 32]) -> Self {
        Self {
            scalar: Zeroizing::new(scalar),
            chain_code: Zeroizing::new(chain_code),
        }
    }

    pub(crate) fn scalar(&self) -> &[u8; 32] {
        &self.scalar
    }

    pub(crate) fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }
}

impl std::fmt::Debug for DerivedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedSecret([REDACTED])")
    }
}

/// How a digest must be signed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureFormat {
    /// ECDSA `r || s`, 64 bytes
    Compact,
    /// ECDSA DER encoding
    Der,
    /// ECDSA `r || s` plus recovery id
    Recoverable,
    /// Recoverable, with `r` and `s` both free of the high bit and of
    /// redundant leading zeros (Antelope chains)
    CanonicalRecoverable,
    /// Ed25519 over the raw message bytes
    Ed25519,
}

/// Signature bytes as produced by a curve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSignature {
    pub format: SignatureFormat,
    pub bytes: Vec<u8>,
    pub recovery_id: Option<u8>,
}

impl RawSignature {
    /// `r || s` for the 64-byte formats
    pub fn compact(&self) -> Option<[u8; 64]> {
        self.bytes.as_slice().try_into().ok()
    }
}

/// A curve that can derive hierarchical keys from a seed and sign with them
pub trait HdCurve {
    /// Derive the secret at `path` from the master seed
    fn derive(seed: &[u8], path: &[u32]) -> Result<DerivedSecret, CurveError>;

    /// Public key bytes in the curve's canonical encoding
    fn public_key(secret: &DerivedSecret) -> Result<Vec<u8>, CurveError>;

    /// Sign `payload` (a digest, or the message itself for Ed25519)
    fn sign(
        secret: &DerivedSecret,
        payload: &[u8],
        format: SignatureFormat,
    ) -> Result<RawSignature, CurveError>;

    /// Verify a 64-byte signature against a public key
    fn verify(public_key: &[u8], payload: &[u8], signature: &[u8]) -> Result<bool, CurveError>;
}
