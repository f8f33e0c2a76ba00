//! Ed25519 curve implementation
//!
//! SLIP-0010 derivation. Every segment must be hardened; a normal segment is
//! rejected rather than silently hardened.

use super::{CurveError, DerivedSecret, HdCurve, RawSignature, SignatureFormat};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use hmac::{Hmac, Mac};

type HmacSha512 = Hmac<sha2::Sha512>;

const HARDENED: u32 = 0x8000_0000;

pub struct Ed25519Curve;

fn hmac_split(key: &[u8], parts: &[&[u8]]) -> Result<([u8; 32], [u8; 32]), CurveError> {
    let mut mac =
        HmacSha512::new_from_slice(key).map_err(|e| CurveError::DerivationFailed(e.to_string()))?;
    for part in parts {
        mac.update(part);
    }
    let out = mac.finalize().into_bytes();
    let mut il = [0u8; 32];
    let mut ir = [0u8; 32];
    il.copy_from_slice(&out[..32]);
    ir.copy_from_slice(&out[32..]);
    Ok((il, ir))
}

impl HdCurve for Ed25519Curve {
    fn derive(seed: &[u8], path: &[u32]) -> Result<DerivedSecret, CurveError> {
        if let Some(&bad) = path.iter().find(|&&i| i < HARDENED) {
            return Err(CurveError::NonHardenedSegment(bad));
        }
        let (key, chain) = hmac_split(b"ed25519 seed", &[seed])?;
        let mut current = DerivedSecret::new(key, chain);

        for &index in path {
            let (key, chain) = hmac_split(
                current.chain_code(),
                &[&[0x00u8][..], &current.scalar()[..], &index.to_be_bytes()[..]],
            )?;
            current = DerivedSecret::new(key, chain);
        }
        Ok(current)
    }

    fn public_key(secret: &DerivedSecret) -> Result<Vec<u8>, CurveError> {
        let signing = SigningKey::from_bytes(secret.scalar());
        Ok(signing.verifying_key().to_bytes().to_vec())
    }

    fn sign(
        secret: &DerivedSecret,
        payload: &[u8],
        format: SignatureFormat,
    ) -> Result<RawSignature, CurveError> {
        if format != SignatureFormat::Ed25519 {
            return Err(CurveError::UnsupportedCurve(format!(
                "ed25519 key cannot produce a {:?} signature",
                format
            )));
        }
        let signing = SigningKey::from_bytes(secret.scalar());
        Ok(RawSignature {
            format,
            bytes: signing.sign(payload).to_bytes().to_vec(),
            recovery_id: None,
        })
    }

    fn verify(public_key: &[u8], payload: &[u8], signature: &[u8]) -> Result<bool, CurveError> {
        let pk: [u8; 32] = public_key
            .try_into()
            .map_err(|_| CurveError::InvalidPublicKey("Public key must be 32 bytes".into()))?;
        let sig: [u8; 64] = signature
            .try_into()
            .map_err(|_| CurveError::InvalidSignature("Signature must be 64 bytes".into()))?;
        let key = VerifyingKey::from_bytes(&pk)
            .map_err(|e| CurveError::InvalidPublicKey(e.to_string()))?;
        Ok(key.verify(payload, &Signature::from_bytes(&sig)).is_ok())
    }
}
