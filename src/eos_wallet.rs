//! Antelope family adapter (EOS, FIO)
//!
//! Public keys render as `EOS…`/`FIO…` (base58 of the compressed key plus a
//! RIPEMD160 checksum). Transactions are packed in the Antelope binary layout
//! and signed over `sha256(chain_id || packed_trx || 32 zero bytes)` with a
//! canonical recoverable signature rendered as `SIG_K1_…`.

use chrono::NaiveDateTime;
use ripemd::{Digest, Ripemd160};
use serde::{Deserialize, Serialize};

use crate::crypto::curves::SignatureFormat;
use crate::crypto::isolation::IsolatedKeyHandle;
use crate::error::{WalletError, WalletResult};
use crate::signing::{ChainAdapter, ExternalSignature, PreImage, PreImageError, PreImageResult};
use crate::types::Chain;
use crate::utils::crypto::sha256;
use crate::wallet::derivation_path::Bip32Path;

const SIGNATURE_PREFIX: &str = "SIG_K1_";
const KEY_TYPE_SUFFIX: &[u8] = b"K1";
/// 27 + 4 for a compressed key
const RECOVERY_HEADER_OFFSET: u8 = 31;
const MAX_NAME_LEN: usize = 13;
const MAX_SYMBOL_LEN: usize = 7;

// MARK: - Envelope types

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EosPermissionLevel {
    pub actor: String,
    pub permission: String,
}

/// `eosio.token::transfer` arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EosTokenTransfer {
    pub from: String,
    pub to: String,
    /// e.g. `"1.0000 EOS"`
    pub quantity: String,
    pub memo: String,
}

/// Action data: a typed transfer, or already-packed bytes as hex
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EosActionData {
    Transfer(EosTokenTransfer),
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EosAction {
    pub account: String,
    pub name: String,
    pub authorization: Vec<EosPermissionLevel>,
    pub data: EosActionData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EosTxHeader {
    /// UTC, `YYYY-MM-DDTHH:MM:SS`
    pub expiration: String,
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    #[serde(default)]
    pub max_net_usage_words: u32,
    #[serde(default)]
    pub max_cpu_usage_ms: u8,
    #[serde(default)]
    pub delay_sec: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EosSignTx {
    pub address_n: Bip32Path,
    /// 32-byte chain id, hex
    pub chain_id: String,
    pub header: EosTxHeader,
    pub actions: Vec<EosAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EosSignedTx {
    pub signatures: Vec<String>,
    /// Packed transaction, hex
    pub serialized_transaction: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FioSignedTx {
    pub serialized: String,
    pub signature: String,
}

impl From<EosSignedTx> for FioSignedTx {
    fn from(signed: EosSignedTx) -> Self {
        Self {
            serialized: signed.serialized_transaction,
            signature: signed.signatures.into_iter().next().unwrap_or_default(),
        }
    }
}

// MARK: - Key and signature text formats

fn ripemd160(data: &[u8]) -> [u8; 20] {
    let mut out = [0u8; 20];
    out.copy_from_slice(&Ripemd160::digest(data));
    out
}

/// `prefix || base58(pubkey || ripemd160(pubkey)[..4])`
pub fn encode_public_key(public_key: &[u8], prefix: &str) -> WalletResult<String> {
    if public_key.len() != 33 {
        return Err(WalletError::invalid_input(format!(
            "Expected 33-byte compressed public key, got {}",
            public_key.len()
        )));
    }
    let mut data = public_key.to_vec();
    data.extend_from_slice(&ripemd160(public_key)[..4]);
    Ok(format!("{}{}", prefix, bs58::encode(data).into_string()))
}

/// `SIG_K1_` text form of a canonical recoverable signature
pub fn encode_signature(compact: &[u8; 64], recovery_id: u8) -> String {
    let mut data = Vec::with_capacity(69);
    data.push(recovery_id + RECOVERY_HEADER_OFFSET);
    data.extend_from_slice(compact);

    let mut check_input = data.clone();
    check_input.extend_from_slice(KEY_TYPE_SUFFIX);
    data.extend_from_slice(&ripemd160(&check_input)[..4]);

    format!("{}{}", SIGNATURE_PREFIX, bs58::encode(data).into_string())
}

/// Inverse of [`encode_signature`]: `(compact, recovery_id)`
pub fn decode_signature(text: &str) -> PreImageResult<([u8; 64], u8)> {
    let bad = || PreImageError::InvalidSignature(text.to_string());
    let body = text.strip_prefix(SIGNATURE_PREFIX).ok_or_else(bad)?;
    let data = bs58::decode(body).into_vec().map_err(|_| bad())?;
    if data.len() != 69 {
        return Err(bad());
    }
    let (sig65, checksum) = data.split_at(65);
    let mut check_input = sig65.to_vec();
    check_input.extend_from_slice(KEY_TYPE_SUFFIX);
    if &ripemd160(&check_input)[..4] != checksum {
        return Err(bad());
    }
    let recovery_id = sig65[0].checked_sub(RECOVERY_HEADER_OFFSET).filter(|r| *r < 4).ok_or_else(bad)?;
    let mut compact = [0u8; 64];
    compact.copy_from_slice(&sig65[1..]);
    Ok((compact, recovery_id))
}

// MARK: - Binary packing

fn char_to_symbol(c: u8) -> Option<u64> {
    match c {
        b'a'..=b'z' => Some(u64::from(c - b'a') + 6),
        b'1'..=b'5' => Some(u64::from(c - b'1') + 1),
        b'.' => Some(0),
        _ => None,
    }
}

/// Account/action name as its 64-bit value
pub fn encode_name(name: &str) -> PreImageResult<u64> {
    let invalid = || PreImageError::InvalidTransaction(format!("Invalid name '{}'", name));
    if name.len() > MAX_NAME_LEN {
        return Err(invalid());
    }
    let mut value = 0u64;
    for (i, c) in name.bytes().enumerate() {
        let symbol = char_to_symbol(c).ok_or_else(invalid)?;
        if i < 12 {
            value |= symbol << (64 - 5 * (i + 1));
        } else {
            if symbol > 0x0f {
                return Err(invalid());
            }
            value |= symbol;
        }
    }
    Ok(value)
}

fn write_varuint32(mut value: u32, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn write_bytes(data: &[u8], out: &mut Vec<u8>) -> PreImageResult<()> {
    let len = u32::try_from(data.len())
        .map_err(|_| PreImageError::EncodingError("Field too long".into()))?;
    write_varuint32(len, out);
    out.extend_from_slice(data);
    Ok(())
}

fn write_name(name: &str, out: &mut Vec<u8>) -> PreImageResult<()> {
    out.extend_from_slice(&encode_name(name)?.to_le_bytes());
    Ok(())
}

/// `"1.0000 EOS"` as `(amount, precision || symbol)`
pub fn encode_asset(quantity: &str) -> PreImageResult<[u8; 16]> {
    let invalid = || PreImageError::InvalidTransaction(format!("Invalid asset '{}'", quantity));
    let (amount, symbol) = quantity.trim().split_once(' ').ok_or_else(invalid)?;

    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    if whole.is_empty() || !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let precision = u8::try_from(fraction.len()).map_err(|_| invalid())?;
    if precision > 18 {
        return Err(invalid());
    }
    let units: i64 = format!("{}{}", whole, fraction).parse().map_err(|_| invalid())?;

    if symbol.is_empty() || symbol.len() > MAX_SYMBOL_LEN || !symbol.bytes().all(|c| c.is_ascii_uppercase()) {
        return Err(invalid());
    }

    let mut out = [0u8; 16];
    out[..8].copy_from_slice(&units.to_le_bytes());
    out[8] = precision;
    out[9..9 + symbol.len()].copy_from_slice(symbol.as_bytes());
    Ok(out)
}

fn action_data(data: &EosActionData) -> PreImageResult<Vec<u8>> {
    match data {
        EosActionData::Raw(hex_data) => {
            hex::decode(hex_data).map_err(|e| PreImageError::EncodingError(e.to_string()))
        }
        EosActionData::Transfer(t) => {
            let mut out = Vec::with_capacity(64);
            write_name(&t.from, &mut out)?;
            write_name(&t.to, &mut out)?;
            out.extend_from_slice(&encode_asset(&t.quantity)?);
            write_bytes(t.memo.as_bytes(), &mut out)?;
            Ok(out)
        }
    }
}

fn expiration_seconds(expiration: &str) -> PreImageResult<u32> {
    let trimmed = expiration.trim_end_matches('Z');
    let parsed = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| PreImageError::InvalidTransaction(format!("Invalid expiration: {}", e)))?;
    u32::try_from(parsed.and_utc().timestamp())
        .map_err(|_| PreImageError::InvalidTransaction("Expiration out of range".into()))
}

/// Packed transaction bytes
pub fn pack_transaction(request: &EosSignTx) -> PreImageResult<Vec<u8>> {
    if request.actions.is_empty() {
        return Err(PreImageError::MissingField("actions".into()));
    }
    let header = &request.header;
    let mut out = Vec::with_capacity(128);

    out.extend_from_slice(&expiration_seconds(&header.expiration)?.to_le_bytes());
    out.extend_from_slice(&header.ref_block_num.to_le_bytes());
    out.extend_from_slice(&header.ref_block_prefix.to_le_bytes());
    write_varuint32(header.max_net_usage_words, &mut out);
    out.push(header.max_cpu_usage_ms);
    write_varuint32(header.delay_sec, &mut out);

    write_varuint32(0, &mut out); // context-free actions
    write_varuint32(request.actions.len() as u32, &mut out);
    for action in &request.actions {
        write_name(&action.account, &mut out)?;
        write_name(&action.name, &mut out)?;
        write_varuint32(action.authorization.len() as u32, &mut out);
        for auth in &action.authorization {
            write_name(&auth.actor, &mut out)?;
            write_name(&auth.permission, &mut out)?;
        }
        write_bytes(&action_data(&action.data)?, &mut out)?;
    }
    write_varuint32(0, &mut out); // extensions

    Ok(out)
}

fn chain_id_bytes(chain_id: &str) -> PreImageResult<[u8; 32]> {
    let bytes = hex::decode(chain_id).map_err(|e| PreImageError::EncodingError(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| PreImageError::InvalidTransaction("chain_id must be 32 bytes".into()))
}

/// `sha256(chain_id || packed || 32 zero bytes)`
pub fn signing_digest(chain_id: &[u8; 32], packed: &[u8]) -> [u8; 32] {
    let mut data = Vec::with_capacity(64 + packed.len());
    data.extend_from_slice(chain_id);
    data.extend_from_slice(packed);
    data.extend_from_slice(&[0u8; 32]);
    sha256(&data)
}

// MARK: - Adapter

#[derive(Debug, Clone)]
pub struct AntelopeAdapter {
    chain: Chain,
}

impl AntelopeAdapter {
    pub fn eos() -> Self {
        Self { chain: Chain::Eos }
    }

    pub fn fio() -> Self {
        Self { chain: Chain::Fio }
    }

    fn key_prefix(&self) -> &'static str {
        match self.chain {
            Chain::Fio => "FIO",
            _ => "EOS",
        }
    }
}

impl ChainAdapter for AntelopeAdapter {
    type SignRequest = EosSignTx;
    type Signed = EosSignedTx;

    fn chain(&self) -> Chain {
        self.chain
    }

    fn render_address(&self, public_key: &[u8], _path: &Bip32Path) -> WalletResult<String> {
        encode_public_key(public_key, self.key_prefix())
    }

    fn signing_paths(&self, request: &EosSignTx) -> PreImageResult<Vec<Bip32Path>> {
        Ok(vec![request.address_n.clone()])
    }

    fn pre_image(
        &self,
        request: &EosSignTx,
        _keys: &[IsolatedKeyHandle],
    ) -> PreImageResult<Vec<PreImage>> {
        let chain_id = chain_id_bytes(&request.chain_id)?;
        let packed = pack_transaction(request)?;
        Ok(vec![PreImage::new(
            0,
            signing_digest(&chain_id, &packed),
            SignatureFormat::CanonicalRecoverable,
        )
        .with_description(format!("{} transaction", self.chain))])
    }

    fn compile(
        &self,
        request: &EosSignTx,
        keys: &[IsolatedKeyHandle],
        signatures: &[ExternalSignature],
    ) -> PreImageResult<EosSignedTx> {
        let key = keys.first().ok_or_else(|| PreImageError::MissingField("signing key".into()))?;
        let sig = signatures
            .first()
            .ok_or_else(|| PreImageError::InvalidSignature("No signature produced".into()))?;
        if sig.public_key != key.public_key() {
            return Err(PreImageError::PublicKeyMismatch);
        }

        Ok(EosSignedTx {
            signatures: vec![encode_signature(&sig.compact()?, sig.require_recovery_id()?)],
            serialized_transaction: hex::encode(pack_transaction(request)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer_request() -> EosSignTx {
        EosSignTx {
            address_n: "m/44'/194'/0'/0/0".parse().unwrap(),
            chain_id: "aca376f206b8fc25a6ed44dbdc66547c36c6c33e3a119ffbeaef943642f0e906".into(),
            header: EosTxHeader {
                expiration: "2018-06-19T09:53:00".into(),
                ref_block_num: 0x1234,
                ref_block_prefix: 0xdeadbeef,
                max_net_usage_words: 0,
                max_cpu_usage_ms: 0,
                delay_sec: 0,
            },
            actions: vec![EosAction {
                account: "eosio.token".into(),
                name: "transfer".into(),
                authorization: vec![EosPermissionLevel {
                    actor: "alice".into(),
                    permission: "active".into(),
                }],
                data: EosActionData::Transfer(EosTokenTransfer {
                    from: "alice".into(),
                    to: "bob".into(),
                    quantity: "1.0000 EOS".into(),
                    memo: "hi".into(),
                }),
            }],
        }
    }

    #[test]
    fn test_public_key_vector() {
        // "abandon ... about" at m/44'/194'/0'/0/0
        let pk = hex::decode("0315c358024ce46767102578947584c4342a6982b922d454f63588effa34597197").unwrap();
        assert_eq!(
            encode_public_key(&pk, "EOS").unwrap(),
            "EOS6zpSNY1YoLxNt2VsvJjoDfBueU6xC1M1ERJw1UoekL1NHn8KNA"
        );
    }

    #[test]
    fn test_encode_name() {
        assert_eq!(encode_name("eosio").unwrap(), 0x5530_ea00_0000_0000);
        assert_eq!(encode_name("eosio.token").unwrap(), 0x5530_ea03_3482_a600);
        assert_eq!(encode_name("transfer").unwrap(), 0xcdcd_3c2d_5700_0000);
        assert_eq!(encode_name("").unwrap(), 0);
        assert!(encode_name("Alice").is_err());
        assert!(encode_name("toolongname1234").is_err());
    }

    #[test]
    fn test_encode_asset() {
        let asset = encode_asset("1.0000 EOS").unwrap();
        assert_eq!(&asset[..8], &10_000i64.to_le_bytes());
        assert_eq!(&asset[8..], &[4, b'E', b'O', b'S', 0, 0, 0, 0]);

        assert!(encode_asset("1.0000").is_err());
        assert!(encode_asset("-1.0 EOS").is_err());
        assert!(encode_asset("1.0 eos").is_err());
    }

    #[test]
    fn test_varuint32() {
        let mut out = Vec::new();
        write_varuint32(300, &mut out);
        assert_eq!(out, vec![0xac, 0x02]);
    }

    #[test]
    fn test_pack_transaction_layout() {
        let packed = pack_transaction(&transfer_request()).unwrap();
        // 2018-06-19T09:53:00Z
        assert_eq!(&packed[..4], &1_529_401_980u32.to_le_bytes());
        assert_eq!(&packed[4..6], &[0x34, 0x12]);
        assert_eq!(&packed[6..10], &[0xef, 0xbe, 0xad, 0xde]);
        // net, cpu, delay, no context-free actions, one action
        assert_eq!(&packed[10..15], &[0, 0, 0, 0, 1]);
        assert_eq!(&packed[15..23], &0x5530_ea03_3482_a600u64.to_le_bytes());
        assert_eq!(*packed.last().unwrap(), 0);
    }

    #[test]
    fn test_raw_action_data_deserializes() {
        let action: EosAction = serde_json::from_str(
            r#"{"account":"eosio","name":"buyram","authorization":[],"data":"0011"}"#,
        )
        .unwrap();
        assert_eq!(action.data, EosActionData::Raw("0011".into()));
    }

    #[test]
    fn test_signature_text_roundtrip() {
        let compact = [0x11u8; 64];
        let text = encode_signature(&compact, 1);
        assert!(text.starts_with("SIG_K1_"));
        assert_eq!(decode_signature(&text).unwrap(), (compact, 1));
        assert!(decode_signature("SIG_K1_abc").is_err());
    }

    #[test]
    fn test_bad_chain_id() {
        let mut req = transfer_request();
        req.chain_id = "abcd".into();
        assert!(AntelopeAdapter::eos().pre_image(&req, &[]).is_err());
    }

    #[test]
    fn test_fio_output_shape() {
        let eos = EosSignedTx {
            signatures: vec!["SIG_K1_x".into()],
            serialized_transaction: "00".into(),
        };
        let fio: FioSignedTx = eos.into();
        assert_eq!(fio.signature, "SIG_K1_x");
        assert_eq!(fio.serialized, "00");
    }
}
