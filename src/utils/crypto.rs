//! Hashing and encoding helpers shared by the chain adapters

use bitcoin::hashes::{hash160, sha256, sha256d, Hash};
use sha2::{Digest, Sha512};
use tiny_keccak::{Hasher, Keccak};

/// Keccak256 hash (used for Ethereum addresses and transactions)
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

/// Convert raw address bytes to an EIP-55 checksummed address
pub fn to_checksum_address(address: &[u8]) -> String {
    let lower = hex::encode(address);
    let hash = keccak256(lower.as_bytes());

    let mut result = String::with_capacity(42);
    result.push_str("0x");
    for (i, ch) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if ch.is_ascii_alphabetic() && nibble >= 8 {
            result.push(ch.to_ascii_uppercase());
        } else {
            result.push(ch);
        }
    }
    result
}

pub fn sha256(data: &[u8]) -> [u8; 32] {
    sha256::Hash::hash(data).to_byte_array()
}

/// RIPEMD160(SHA256(data))
pub fn hash160(data: &[u8]) -> [u8; 20] {
    hash160::Hash::hash(data).to_byte_array()
}

/// First half of SHA-512, the XRP ledger signing hash
pub fn sha512_half(data: &[u8]) -> [u8; 32] {
    let full = Sha512::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&full[..32]);
    out
}

/// Base58 with a 4-byte double-SHA256 checksum over a custom alphabet
pub fn base58check_encode(payload: &[u8], alphabet: &bs58::Alphabet) -> String {
    let checksum = sha256d::Hash::hash(payload);
    let mut data = payload.to_vec();
    data.extend_from_slice(&checksum[..4]);
    bs58::encode(data).with_alphabet(alphabet).into_string()
}

/// Inverse of [`base58check_encode`]; `None` on a bad character or checksum
pub fn base58check_decode(encoded: &str, alphabet: &bs58::Alphabet) -> Option<Vec<u8>> {
    let data = bs58::decode(encoded).with_alphabet(alphabet).into_vec().ok()?;
    if data.len() < 4 {
        return None;
    }
    let (payload, checksum) = data.split_at(data.len() - 4);
    let expected = sha256d::Hash::hash(payload);
    if &expected[..4] != checksum {
        return None;
    }
    Some(payload.to_vec())
}
