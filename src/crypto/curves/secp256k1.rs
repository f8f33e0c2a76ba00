//! secp256k1 curve implementation
//!
//! Features:
//! - BIP32 private derivation (hardened and normal segments)
//! - RFC6979 deterministic ECDSA with low-S, in compact, DER and recoverable form
//! - Canonical recoverable signatures for Antelope chains
//! - Public key recovery

use super::{CurveError, DerivedSecret, HdCurve, RawSignature, SignatureFormat};
use hmac::{Hmac, Mac};
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId, Signature};
use secp256k1::{All, Message, PublicKey, Scalar, Secp256k1, SecretKey};
use std::sync::OnceLock;

type HmacSha512 = Hmac<sha2::Sha512>;

const HARDENED: u32 = 0x8000_0000;

/// Upper bound on nonce grinding for canonical signatures
const MAX_CANONICAL_ATTEMPTS: u32 = 1024;

pub struct Secp256k1Curve;

pub(crate) fn context() -> &'static Secp256k1<All> {
    static CTX: OnceLock<Secp256k1<All>> = OnceLock::new();
    CTX.get_or_init(Secp256k1::new)
}

fn secret_key(secret: &DerivedSecret) -> Result<SecretKey, CurveError> {
    SecretKey::from_slice(secret.scalar()).map_err(|e| CurveError::InvalidPrivateKey(e.to_string()))
}

fn message(digest: &[u8]) -> Result<Message, CurveError> {
    let arr: [u8; 32] = digest
        .try_into()
        .map_err(|_| CurveError::InvalidDigest(digest.len()))?;
    Ok(Message::from_digest(arr))
}

fn split_hmac(out: &[u8]) -> ([u8; 32], [u8; 32]) {
    let mut il = [0u8; 32];
    let mut ir = [0u8; 32];
    il.copy_from_slice(&out[..32]);
    ir.copy_from_slice(&out[32..]);
    (il, ir)
}

impl Secp256k1Curve {
    fn master(seed: &[u8]) -> Result<DerivedSecret, CurveError> {
        if seed.len() < 16 || seed.len() > 64 {
            return Err(CurveError::InvalidSeed(format!(
                "Seed must be 16 to 64 bytes, got {}",
                seed.len()
            )));
        }
        let mut mac = HmacSha512::new_from_slice(b"Bitcoin seed")
            .map_err(|e| CurveError::DerivationFailed(e.to_string()))?;
        mac.update(seed);
        let (key, chain_code) = split_hmac(&mac.finalize().into_bytes());
        SecretKey::from_slice(&key)
            .map_err(|e| CurveError::DerivationFailed(format!("Invalid master key: {}", e)))?;
        Ok(DerivedSecret::new(key, chain_code))
    }

    fn child(parent: &DerivedSecret, index: u32) -> Result<DerivedSecret, CurveError> {
        let parent_sk = secret_key(parent)?;
        let mut mac = HmacSha512::new_from_slice(parent.chain_code())
            .map_err(|e| CurveError::DerivationFailed(e.to_string()))?;

        if index >= HARDENED {
            mac.update(&[0x00]);
            mac.update(parent.scalar());
        } else {
            let parent_pk = PublicKey::from_secret_key(context(), &parent_sk);
            mac.update(&parent_pk.serialize());
        }
        mac.update(&index.to_be_bytes());

        let (il, chain_code) = split_hmac(&mac.finalize().into_bytes());
        let tweak = Scalar::from_be_bytes(il)
            .map_err(|_| CurveError::DerivationFailed(format!("Tweak out of range at {}", index)))?;
        let child = parent_sk
            .add_tweak(&tweak)
            .map_err(|e| CurveError::DerivationFailed(format!("Tweak failed: {}", e)))?;

        Ok(DerivedSecret::new(child.secret_bytes(), chain_code))
    }

    /// Recover the compressed public key that produced `signature` over `digest`
    pub fn recover(digest: &[u8], signature: &[u8; 64], recovery_id: u8) -> Result<[u8; 33], CurveError> {
        let rec_id = RecoveryId::from_i32(recovery_id as i32)
            .map_err(|e| CurveError::InvalidSignature(format!("Invalid recovery ID: {}", e)))?;
        let sig = RecoverableSignature::from_compact(signature, rec_id)
            .map_err(|e| CurveError::InvalidSignature(e.to_string()))?;
        let pk = context()
            .recover_ecdsa(&message(digest)?, &sig)
            .map_err(|e| CurveError::InvalidSignature(format!("Recovery failed: {}", e)))?;
        Ok(pk.serialize())
    }

    /// Expand a compressed key to the 65-byte uncompressed form
    pub fn uncompressed(public_key: &[u8]) -> Result<[u8; 65], CurveError> {
        let pk = PublicKey::from_slice(public_key)
            .map_err(|e| CurveError::InvalidPublicKey(e.to_string()))?;
        Ok(pk.serialize_uncompressed())
    }

    /// Find the recovery id that maps `compact` back to `expected`
    fn find_recovery_id(digest: &[u8], compact: &[u8; 64], expected: &[u8; 33]) -> Result<u8, CurveError> {
        (0u8..4)
            .find(|&i| matches!(Self::recover(digest, compact, i), Ok(pk) if &pk == expected))
            .ok_or_else(|| CurveError::SigningFailed("No recovery id matches the signing key".into()))
    }

    fn sign_canonical(sk: &SecretKey, msg: &Message, digest: &[u8]) -> Result<RawSignature, CurveError> {
        let expected = PublicKey::from_secret_key(context(), sk).serialize();
        for attempt in 0..MAX_CANONICAL_ATTEMPTS {
            let sig = if attempt == 0 {
                context().sign_ecdsa(msg, sk)
            } else {
                let mut extra = [0u8; 32];
                extra[28..].copy_from_slice(&attempt.to_be_bytes());
                context().sign_ecdsa_with_noncedata(msg, sk, &extra)
            };
            let compact = sig.serialize_compact();
            if !is_canonical(&compact) {
                continue;
            }
            let recovery_id = Self::find_recovery_id(digest, &compact, &expected)?;
            return Ok(RawSignature {
                format: SignatureFormat::CanonicalRecoverable,
                bytes: compact.to_vec(),
                recovery_id: Some(recovery_id),
            });
        }
        Err(CurveError::SigningFailed(
            "No canonical signature found within the attempt limit".into(),
        ))
    }
}

/// Both `r` and `s` must be positive without a redundant leading zero byte
pub fn is_canonical(compact: &[u8; 64]) -> bool {
    let (r, s) = compact.split_at(32);
    let ok = |x: &[u8]| x[0] & 0x80 == 0 && !(x[0] == 0 && x[1] & 0x80 == 0);
    ok(r) && ok(s)
}

impl HdCurve for Secp256k1Curve {
    fn derive(seed: &[u8], path: &[u32]) -> Result<DerivedSecret, CurveError> {
        let mut current = Self::master(seed)?;
        for &index in path {
            current = Self::child(&current, index)?;
        }
        Ok(current)
    }

    fn public_key(secret: &DerivedSecret) -> Result<Vec<u8>, CurveError> {
        let sk = secret_key(secret)?;
        Ok(PublicKey::from_secret_key(context(), &sk).serialize().to_vec())
    }

    fn sign(
        secret: &DerivedSecret,
        payload: &[u8],
        format: SignatureFormat,
    ) -> Result<RawSignature, CurveError> {
        let sk = secret_key(secret)?;
        let msg = message(payload)?;

        match format {
            SignatureFormat::Compact => Ok(RawSignature {
                format,
                bytes: context().sign_ecdsa(&msg, &sk).serialize_compact().to_vec(),
                recovery_id: None,
            }),
            SignatureFormat::Der => Ok(RawSignature {
                format,
                bytes: context().sign_ecdsa(&msg, &sk).serialize_der().to_vec(),
                recovery_id: None,
            }),
            SignatureFormat::Recoverable => {
                let (rec_id, compact) = context().sign_ecdsa_recoverable(&msg, &sk).serialize_compact();
                Ok(RawSignature {
                    format,
                    bytes: compact.to_vec(),
                    recovery_id: Some(rec_id.to_i32() as u8),
                })
            }
            SignatureFormat::CanonicalRecoverable => Self::sign_canonical(&sk, &msg, payload),
            SignatureFormat::Ed25519 => Err(CurveError::UnsupportedCurve(
                "secp256k1 key cannot produce an ed25519 signature".into(),
            )),
        }
    }

    fn verify(public_key: &[u8], payload: &[u8], signature: &[u8]) -> Result<bool, CurveError> {
        let pk = PublicKey::from_slice(public_key)
            .map_err(|e| CurveError::InvalidPublicKey(e.to_string()))?;
        let sig = Signature::from_compact(signature)
            .map_err(|e| CurveError::InvalidSignature(e.to_string()))?;
        Ok(context().verify_ecdsa(&message(payload)?, &sig, &pk).is_ok())
    }
}

// MARK: - Tests
