//! Ethereum (EVM) adapter
//!
//! Addresses are EIP-55 checksummed. Transactions are signed as legacy
//! EIP-155 (`RLP[nonce, gasPrice, gas, to, value, data, chainId, 0, 0]`) or
//! EIP-1559 (`0x02 || RLP[chainId, nonce, tip, maxFee, gas, to, value, data, []]`),
//! chosen by whether `max_fee_per_gas` is present.
//!
//! Personal messages use EIP-191 (`"\x19Ethereum Signed Message:\n" || len || msg`).

use serde::{Deserialize, Serialize};

use crate::crypto::curves::{Secp256k1Curve, SignatureFormat};
use crate::crypto::isolation::IsolatedKeyHandle;
use crate::error::{WalletError, WalletResult};
use crate::signing::{ChainAdapter, ExternalSignature, PreImage, PreImageError, PreImageResult};
use crate::types::Chain;
use crate::utils::crypto::{keccak256, to_checksum_address};
use crate::utils::json::parse_hex_bytes;
use crate::wallet::derivation_path::Bip32Path;

const EIP1559_TX_TYPE: u8 = 0x02;
const PERSONAL_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";
/// Largest chain id whose EIP-155 `v` (`chain_id * 2 + 35 + recovery_id`, recovery id
/// at most 3) fits a u64
pub const MAX_LEGACY_CHAIN_ID: u64 = (u64::MAX - 38) / 2;

// MARK: - Envelope types

/// Quantities are `0x` hex or decimal strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthSignTx {
    pub address_n: Bip32Path,
    pub nonce: String,
    pub gas_limit: String,
    #[serde(default)]
    pub gas_price: Option<String>,
    #[serde(default)]
    pub max_fee_per_gas: Option<String>,
    #[serde(default)]
    pub max_priority_fee_per_gas: Option<String>,
    /// Empty for contract creation
    pub to: String,
    pub value: String,
    #[serde(default)]
    pub data: String,
    pub chain_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthSignedTx {
    pub v: u64,
    pub r: String,
    pub s: String,
    pub serialized: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthSignMessage {
    pub address_n: Bip32Path,
    /// Signed as UTF-8 bytes
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthSignedMessage {
    pub address: String,
    /// `0x` || r || s || v, v in {27, 28}
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthVerifyMessage {
    pub address: String,
    pub message: String,
    pub signature: String,
}

// MARK: - RLP

fn encode_length(len: usize) -> Vec<u8> {
    let bytes = len.to_be_bytes();
    let leading_zeros = bytes.iter().take_while(|&&b| b == 0).count();
    bytes[leading_zeros..].to_vec()
}

fn rlp_encode_bytes(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        return data.to_vec();
    }
    if data.len() < 56 {
        let mut result = vec![0x80 + data.len() as u8];
        result.extend_from_slice(data);
        result
    } else {
        let len_bytes = encode_length(data.len());
        let mut result = vec![0xb7 + len_bytes.len() as u8];
        result.extend_from_slice(&len_bytes);
        result.extend_from_slice(data);
        result
    }
}

/// Big-endian integer without leading zeros (zero is the empty string)
fn rlp_encode_uint(be: &[u8]) -> Vec<u8> {
    let leading_zeros = be.iter().take_while(|&&b| b == 0).count();
    rlp_encode_bytes(&be[leading_zeros..])
}

fn rlp_encode_u64(val: u64) -> Vec<u8> {
    rlp_encode_uint(&val.to_be_bytes())
}

fn rlp_encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload: Vec<u8> = items.concat();
    if payload.len() < 56 {
        let mut result = vec![0xc0 + payload.len() as u8];
        result.extend_from_slice(&payload);
        result
    } else {
        let len_bytes = encode_length(payload.len());
        let mut result = vec![0xf7 + len_bytes.len() as u8];
        result.extend_from_slice(&len_bytes);
        result.extend_from_slice(&payload);
        result
    }
}

// MARK: - Field parsing

/// `0x` hex or decimal, as minimal big-endian bytes (at most 32)
fn parse_quantity(field: &str, value: &str) -> PreImageResult<Vec<u8>> {
    let invalid = || PreImageError::InvalidTransaction(format!("Invalid {}: '{}'", field, value));
    let bytes = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex_digits) => {
            let padded = if hex_digits.len() % 2 == 1 {
                format!("0{}", hex_digits)
            } else {
                hex_digits.to_string()
            };
            hex::decode(padded).map_err(|_| invalid())?
        }
        None => value.parse::<u128>().map_err(|_| invalid())?.to_be_bytes().to_vec(),
    };
    let leading_zeros = bytes.iter().take_while(|&&b| b == 0).count();
    let trimmed = bytes[leading_zeros..].to_vec();
    if trimmed.len() > 32 {
        return Err(invalid());
    }
    Ok(trimmed)
}

/// 20-byte address. Mixed-case input must carry a valid EIP-55 checksum.
pub fn parse_address(address: &str) -> PreImageResult<[u8; 20]> {
    let invalid = || PreImageError::InvalidAddress(address.to_string());
    let digits = address.strip_prefix("0x").ok_or_else(invalid)?;
    let bytes: [u8; 20] = hex::decode(digits)
        .map_err(|_| invalid())?
        .try_into()
        .map_err(|_| invalid())?;

    let mixed_case = digits.chars().any(|c| c.is_ascii_uppercase())
        && digits.chars().any(|c| c.is_ascii_lowercase());
    if mixed_case && to_checksum_address(&bytes) != address {
        return Err(invalid());
    }
    Ok(bytes)
}

fn parse_to(to: &str) -> PreImageResult<Vec<u8>> {
    if to.is_empty() {
        return Ok(Vec::new());
    }
    Ok(parse_address(to)?.to_vec())
}

fn parse_data(data: &str) -> PreImageResult<Vec<u8>> {
    parse_hex_bytes(data).map_err(|e| PreImageError::EncodingError(e.message))
}

/// Normalized transaction fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EthTransaction {
    Legacy {
        chain_id: u64,
        nonce: Vec<u8>,
        gas_price: Vec<u8>,
        gas_limit: Vec<u8>,
        to: Vec<u8>,
        value: Vec<u8>,
        data: Vec<u8>,
    },
    Eip1559 {
        chain_id: u64,
        nonce: Vec<u8>,
        max_priority_fee_per_gas: Vec<u8>,
        max_fee_per_gas: Vec<u8>,
        gas_limit: Vec<u8>,
        to: Vec<u8>,
        value: Vec<u8>,
        data: Vec<u8>,
    },
}

impl EthTransaction {
    pub fn from_request(request: &EthSignTx) -> PreImageResult<Self> {
        let nonce = parse_quantity("nonce", &request.nonce)?;
        let gas_limit = parse_quantity("gas_limit", &request.gas_limit)?;
        let to = parse_to(&request.to)?;
        let value = parse_quantity("value", &request.value)?;
        let data = parse_data(&request.data)?;

        match &request.max_fee_per_gas {
            Some(max_fee) => {
                let tip = request
                    .max_priority_fee_per_gas
                    .as_deref()
                    .ok_or_else(|| PreImageError::MissingField("max_priority_fee_per_gas".into()))?;
                Ok(Self::Eip1559 {
                    chain_id: request.chain_id,
                    nonce,
                    max_priority_fee_per_gas: parse_quantity("max_priority_fee_per_gas", tip)?,
                    max_fee_per_gas: parse_quantity("max_fee_per_gas", max_fee)?,
                    gas_limit,
                    to,
                    value,
                    data,
                })
            }
            None => {
                if request.chain_id > MAX_LEGACY_CHAIN_ID {
                    return Err(PreImageError::InvalidTransaction(format!(
                        "chain_id {} is too large for an EIP-155 signature",
                        request.chain_id
                    )));
                }
                let gas_price = request
                    .gas_price
                    .as_deref()
                    .ok_or_else(|| PreImageError::MissingField("gas_price".into()))?;
                Ok(Self::Legacy {
                    chain_id: request.chain_id,
                    nonce,
                    gas_price: parse_quantity("gas_price", gas_price)?,
                    gas_limit,
                    to,
                    value,
                    data,
                })
            }
        }
    }

    fn fields(&self) -> Vec<Vec<u8>> {
        match self {
            Self::Legacy { nonce, gas_price, gas_limit, to, value, data, .. } => vec![
                rlp_encode_uint(nonce),
                rlp_encode_uint(gas_price),
                rlp_encode_uint(gas_limit),
                rlp_encode_bytes(to),
                rlp_encode_uint(value),
                rlp_encode_bytes(data),
            ],
            Self::Eip1559 {
                chain_id,
                nonce,
                max_priority_fee_per_gas,
                max_fee_per_gas,
                gas_limit,
                to,
                value,
                data,
            } => vec![
                rlp_encode_u64(*chain_id),
                rlp_encode_uint(nonce),
                rlp_encode_uint(max_priority_fee_per_gas),
                rlp_encode_uint(max_fee_per_gas),
                rlp_encode_uint(gas_limit),
                rlp_encode_bytes(to),
                rlp_encode_uint(value),
                rlp_encode_bytes(data),
                rlp_encode_list(&[]),
            ],
        }
    }

    /// Bytes whose keccak256 is signed
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut items = self.fields();
        match self {
            Self::Legacy { chain_id, .. } => {
                items.push(rlp_encode_u64(*chain_id));
                items.push(rlp_encode_u64(0));
                items.push(rlp_encode_u64(0));
                rlp_encode_list(&items)
            }
            Self::Eip1559 { .. } => {
                let mut out = vec![EIP1559_TX_TYPE];
                out.extend_from_slice(&rlp_encode_list(&items));
                out
            }
        }
    }

    /// `v` as it appears in the signed transaction
    pub fn v(&self, recovery_id: u8) -> u64 {
        match self {
            Self::Legacy { chain_id, .. } => u64::from(recovery_id) + chain_id * 2 + 35,
            Self::Eip1559 { .. } => u64::from(recovery_id),
        }
    }

    pub fn encode_signed(&self, recovery_id: u8, compact: &[u8; 64]) -> Vec<u8> {
        let mut items = self.fields();
        items.push(rlp_encode_u64(self.v(recovery_id)));
        items.push(rlp_encode_uint(&compact[..32]));
        items.push(rlp_encode_uint(&compact[32..]));
        match self {
            Self::Legacy { .. } => rlp_encode_list(&items),
            Self::Eip1559 { .. } => {
                let mut out = vec![EIP1559_TX_TYPE];
                out.extend_from_slice(&rlp_encode_list(&items));
                out
            }
        }
    }
}

// MARK: - Addresses and messages

/// EIP-55 address of a compressed or uncompressed secp256k1 key
pub fn encode_eth_address(public_key: &[u8]) -> WalletResult<String> {
    let uncompressed = Secp256k1Curve::uncompressed(public_key)?;
    let hash = keccak256(&uncompressed[1..]);
    Ok(to_checksum_address(&hash[12..]))
}

/// EIP-191 personal message hash
pub fn personal_message_digest(message: &[u8]) -> [u8; 32] {
    let mut data = format!("{}{}", PERSONAL_MESSAGE_PREFIX, message.len()).into_bytes();
    data.extend_from_slice(message);
    keccak256(&data)
}

/// `0x` || r || s || (27 + recovery id)
pub fn encode_message_signature(compact: &[u8; 64], recovery_id: u8) -> String {
    let mut sig = compact.to_vec();
    sig.push(27 + recovery_id);
    format!("0x{}", hex::encode(sig))
}

/// True when `signature` over `message` recovers to `address`
pub fn verify_message(request: &EthVerifyMessage) -> WalletResult<bool> {
    let bytes = parse_hex_bytes(&request.signature)?;
    if bytes.len() != 65 {
        return Err(WalletError::invalid_input(format!(
            "Expected 65-byte signature, got {}",
            bytes.len()
        )));
    }
    let expected = parse_address(&request.address).map_err(WalletError::from)?;

    let mut compact = [0u8; 64];
    compact.copy_from_slice(&bytes[..64]);
    let recovery_id = match bytes[64] {
        v @ 27..=28 => v - 27,
        v @ 0..=1 => v,
        _ => return Ok(false),
    };

    let digest = personal_message_digest(request.message.as_bytes());
    let Ok(public_key) = Secp256k1Curve::recover(&digest, &compact, recovery_id) else {
        return Ok(false);
    };
    let recovered = encode_eth_address(&public_key)?;
    Ok(recovered.eq_ignore_ascii_case(&to_checksum_address(&expected)))
}

// MARK: - Adapter

#[derive(Debug, Clone, Default)]
pub struct EthereumAdapter;

impl ChainAdapter for EthereumAdapter {
    type SignRequest = EthSignTx;
    type Signed = EthSignedTx;

    fn chain(&self) -> Chain {
        Chain::Ethereum
    }

    fn render_address(&self, public_key: &[u8], _path: &Bip32Path) -> WalletResult<String> {
        encode_eth_address(public_key)
    }

    fn signing_paths(&self, request: &EthSignTx) -> PreImageResult<Vec<Bip32Path>> {
        Ok(vec![request.address_n.clone()])
    }

    fn pre_image(
        &self,
        request: &EthSignTx,
        _keys: &[IsolatedKeyHandle],
    ) -> PreImageResult<Vec<PreImage>> {
        let tx = EthTransaction::from_request(request)?;
        let digest = keccak256(&tx.signing_payload());
        let kind = match tx {
            EthTransaction::Legacy { .. } => "legacy",
            EthTransaction::Eip1559 { .. } => "EIP-1559",
        };
        Ok(vec![PreImage::new(0, digest, SignatureFormat::Recoverable)
            .with_description(format!("Ethereum {} tx on chain {}", kind, request.chain_id))])
    }

    fn compile(
        &self,
        request: &EthSignTx,
        keys: &[IsolatedKeyHandle],
        signatures: &[ExternalSignature],
    ) -> PreImageResult<EthSignedTx> {
        let key = keys.first().ok_or_else(|| PreImageError::MissingField("signing key".into()))?;
        let sig = signatures
            .first()
            .ok_or_else(|| PreImageError::InvalidSignature("No signature produced".into()))?;
        if sig.public_key != key.public_key() {
            return Err(PreImageError::PublicKeyMismatch);
        }

        let tx = EthTransaction::from_request(request)?;
        let compact = sig.compact()?;
        let recovery_id = sig.require_recovery_id()?;
        Ok(EthSignedTx {
            v: tx.v(recovery_id),
            r: format!("0x{}", hex::encode(&compact[..32])),
            s: format!("0x{}", hex::encode(&compact[32..])),
            serialized: format!("0x{}", hex::encode(tx.encode_signed(recovery_id, &compact))),
        })
    }
}
