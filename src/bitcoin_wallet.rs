//! Bitcoin adapter
//!
//! Address kinds follow the BIP44/49/84 purpose of the path (or an explicit
//! script type): p2pkh, p2sh-p2wpkh and p2wpkh on mainnet. Inputs are signed
//! with SIGHASH_ALL, legacy sighash for p2pkh and BIP143 for the segwit kinds.

use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode::{self, VarInt};
use bitcoin::hashes::{sha256d, Hash};
use bitcoin::key::CompressedPublicKey;
use bitcoin::script::PushBytesBuf;
use bitcoin::sighash::{EcdsaSighashType, SighashCache};
use bitcoin::transaction::Version;
use bitcoin::{
    Address, Amount, Network, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness,
};
use serde::{Deserialize, Serialize};

use crate::crypto::curves::SignatureFormat;
use crate::crypto::isolation::IsolatedKeyHandle;
use crate::error::{WalletError, WalletResult};
use crate::signing::{ChainAdapter, ExternalSignature, PreImage, PreImageError, PreImageResult};
use crate::types::{BtcScriptType, Chain};
use crate::utils::json::parse_decimal_u64;
use crate::wallet::derivation_path::{is_hardened, Bip32Path, HARDENED};

const NETWORK: Network = Network::Bitcoin;
const MESSAGE_MAGIC: &[u8] = b"Bitcoin Signed Message:\n";

// MARK: - Envelope types

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BtcSignTxInput {
    pub address_n: Bip32Path,
    /// Previous txid in display (big-endian) hex
    pub prev_hash: String,
    pub prev_index: u32,
    /// Satoshis, decimal string
    pub amount: String,
    pub script_type: BtcScriptType,
    #[serde(default)]
    pub sequence: Option<u32>,
}

/// A payment to `address`, or change back to the wallet at `address_n`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BtcSignTxOutput {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub address_n: Option<Bip32Path>,
    #[serde(default)]
    pub script_type: Option<BtcScriptType>,
    /// Satoshis, decimal string
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BtcSignTx {
    pub inputs: Vec<BtcSignTxInput>,
    pub outputs: Vec<BtcSignTxOutput>,
    #[serde(default = "default_version")]
    pub version: i32,
    #[serde(default)]
    pub lock_time: u32,
}

fn default_version() -> i32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BtcSignedTx {
    /// DER signature plus sighash byte, per input
    pub signatures: Vec<String>,
    pub serialized_tx: String,
    pub txid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BtcSignMessage {
    pub address_n: Bip32Path,
    #[serde(default)]
    pub script_type: Option<BtcScriptType>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BtcSignedMessage {
    pub address: String,
    /// BIP137 signature, base64
    pub signature: String,
}

// MARK: - Addresses

fn compressed_key(public_key: &[u8]) -> WalletResult<CompressedPublicKey> {
    CompressedPublicKey::from_slice(public_key)
        .map_err(|e| WalletError::invalid_input(format!("Invalid public key: {}", e)))
}

/// Script type implied by a BIP44/49/84 path, p2pkh otherwise
pub fn script_type_for_path(path: &Bip32Path) -> BtcScriptType {
    path.get(0)
        .filter(|p| is_hardened(*p))
        .and_then(|p| BtcScriptType::from_purpose(p - HARDENED))
        .unwrap_or(BtcScriptType::P2pkh)
}

pub fn encode_btc_address(public_key: &[u8], script_type: BtcScriptType) -> WalletResult<String> {
    let key = compressed_key(public_key)?;
    let address = match script_type {
        BtcScriptType::P2pkh => Address::p2pkh(key.pubkey_hash(), NETWORK),
        BtcScriptType::P2shP2wpkh => Address::p2shwpkh(&key, NETWORK),
        BtcScriptType::P2wpkh => Address::p2wpkh(&key, NETWORK),
    };
    Ok(address.to_string())
}

fn output_script(public_key: &[u8], script_type: BtcScriptType) -> PreImageResult<ScriptBuf> {
    let key = compressed_key(public_key).map_err(|e| PreImageError::InvalidTransaction(e.message))?;
    Ok(match script_type {
        BtcScriptType::P2pkh => ScriptBuf::new_p2pkh(&key.pubkey_hash()),
        BtcScriptType::P2shP2wpkh => ScriptBuf::new_p2sh(&ScriptBuf::new_p2wpkh(&key.wpubkey_hash()).script_hash()),
        BtcScriptType::P2wpkh => ScriptBuf::new_p2wpkh(&key.wpubkey_hash()),
    })
}

fn parse_address(address: &str) -> PreImageResult<ScriptBuf> {
    let parsed = Address::from_str(address)
        .map_err(|_| PreImageError::InvalidAddress(address.to_string()))?
        .require_network(NETWORK)
        .map_err(|_| PreImageError::InvalidAddress(address.to_string()))?;
    Ok(parsed.script_pubkey())
}

// MARK: - Transaction assembly

fn amount(field: &str, value: &str) -> PreImageResult<Amount> {
    parse_decimal_u64(field, value)
        .map(Amount::from_sat)
        .map_err(|e| PreImageError::InvalidTransaction(e.message))
}

fn change_paths(request: &BtcSignTx) -> impl Iterator<Item = &Bip32Path> {
    request.outputs.iter().filter_map(|o| o.address_n.as_ref())
}

/// Unsigned transaction. `keys` holds the input keys followed by the change keys.
fn unsigned_transaction(request: &BtcSignTx, keys: &[IsolatedKeyHandle]) -> PreImageResult<Transaction> {
    if request.inputs.is_empty() {
        return Err(PreImageError::MissingField("inputs".into()));
    }
    if request.outputs.is_empty() {
        return Err(PreImageError::MissingField("outputs".into()));
    }

    let input = request
        .inputs
        .iter()
        .map(|i| {
            let txid = Txid::from_str(&i.prev_hash)
                .map_err(|e| PreImageError::InvalidTransaction(format!("Invalid prev_hash: {}", e)))?;
            Ok(TxIn {
                previous_output: OutPoint::new(txid, i.prev_index),
                script_sig: ScriptBuf::new(),
                sequence: i.sequence.map(Sequence).unwrap_or(Sequence::MAX),
                witness: Witness::default(),
            })
        })
        .collect::<PreImageResult<Vec<_>>>()?;

    let mut change_keys = keys.iter().skip(request.inputs.len());
    let output = request
        .outputs
        .iter()
        .map(|o| {
            let script_pubkey = match (&o.address, &o.address_n) {
                (Some(address), None) => parse_address(address)?,
                (None, Some(path)) => {
                    let key = change_keys
                        .next()
                        .ok_or_else(|| PreImageError::MissingField("change key".into()))?;
                    let script_type = o.script_type.unwrap_or_else(|| script_type_for_path(path));
                    output_script(key.public_key(), script_type)?
                }
                _ => {
                    return Err(PreImageError::InvalidTransaction(
                        "Output needs exactly one of address or address_n".into(),
                    ))
                }
            };
            Ok(TxOut {
                value: amount("output amount", &o.amount)?,
                script_pubkey,
            })
        })
        .collect::<PreImageResult<Vec<_>>>()?;

    Ok(Transaction {
        version: Version(request.version),
        lock_time: LockTime::from_consensus(request.lock_time),
        input,
        output,
    })
}

fn input_key<'a>(keys: &'a [IsolatedKeyHandle], index: usize) -> PreImageResult<&'a IsolatedKeyHandle> {
    keys.get(index).ok_or(PreImageError::InvalidInputIndex(index))
}

/// BIP137 message hash: `sha256d(varint || magic || varint(len) || message)`
pub fn signed_message_digest(message: &str) -> [u8; 32] {
    let mut data = encode::serialize(&VarInt(MESSAGE_MAGIC.len() as u64));
    data.extend_from_slice(MESSAGE_MAGIC);
    data.extend_from_slice(&encode::serialize(&VarInt(message.len() as u64)));
    data.extend_from_slice(message.as_bytes());
    sha256d::Hash::hash(&data).to_byte_array()
}

/// BIP137 header byte || r || s, base64
pub fn encode_message_signature(compact: &[u8; 64], recovery_id: u8, script_type: BtcScriptType) -> String {
    let base = match script_type {
        BtcScriptType::P2pkh => 31,
        BtcScriptType::P2shP2wpkh => 35,
        BtcScriptType::P2wpkh => 39,
    };
    let mut sig = vec![base + recovery_id];
    sig.extend_from_slice(compact);
    BASE64.encode(sig)
}

// MARK: - Adapter

#[derive(Debug, Clone, Default)]
pub struct BitcoinAdapter {
    script_type: Option<BtcScriptType>,
}

impl BitcoinAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render addresses as `script_type` regardless of the path purpose
    pub fn with_script_type(script_type: Option<BtcScriptType>) -> Self {
        Self { script_type }
    }
}

impl ChainAdapter for BitcoinAdapter {
    type SignRequest = BtcSignTx;
    type Signed = BtcSignedTx;

    fn chain(&self) -> Chain {
        Chain::Bitcoin
    }

    fn render_address(&self, public_key: &[u8], path: &Bip32Path) -> WalletResult<String> {
        let script_type = self.script_type.unwrap_or_else(|| script_type_for_path(path));
        encode_btc_address(public_key, script_type)
    }

    fn signing_paths(&self, request: &BtcSignTx) -> PreImageResult<Vec<Bip32Path>> {
        Ok(request
            .inputs
            .iter()
            .map(|i| &i.address_n)
            .chain(change_paths(request))
            .cloned()
            .collect())
    }

    fn pre_image(
        &self,
        request: &BtcSignTx,
        keys: &[IsolatedKeyHandle],
    ) -> PreImageResult<Vec<PreImage>> {
        let tx = unsigned_transaction(request, keys)?;
        let mut cache = SighashCache::new(&tx);

        request
            .inputs
            .iter()
            .enumerate()
            .map(|(index, input)| {
                let key = compressed_key(input_key(keys, index)?.public_key())
                    .map_err(|e| PreImageError::InvalidTransaction(e.message))?;
                let digest = match input.script_type {
                    BtcScriptType::P2pkh => cache
                        .legacy_signature_hash(
                            index,
                            &ScriptBuf::new_p2pkh(&key.pubkey_hash()),
                            EcdsaSighashType::All.to_u32(),
                        )
                        .map_err(|e| PreImageError::EncodingError(e.to_string()))?
                        .to_byte_array(),
                    BtcScriptType::P2shP2wpkh | BtcScriptType::P2wpkh => cache
                        .p2wpkh_signature_hash(
                            index,
                            &ScriptBuf::new_p2wpkh(&key.wpubkey_hash()),
                            amount("input amount", &input.amount)?,
                            EcdsaSighashType::All,
                        )
                        .map_err(|e| PreImageError::EncodingError(e.to_string()))?
                        .to_byte_array(),
                };
                Ok(PreImage::new(index, digest, SignatureFormat::Der)
                    .with_input_index(index)
                    .with_description(format!("input {} ({})", index, input.script_type.label())))
            })
            .collect()
    }

    fn compile(
        &self,
        request: &BtcSignTx,
        keys: &[IsolatedKeyHandle],
        signatures: &[ExternalSignature],
    ) -> PreImageResult<BtcSignedTx> {
        if signatures.len() != request.inputs.len() {
            return Err(PreImageError::InvalidSignature(format!(
                "Expected {} signatures, got {}",
                request.inputs.len(),
                signatures.len()
            )));
        }

        let mut tx = unsigned_transaction(request, keys)?;
        let mut rendered = Vec::with_capacity(signatures.len());

        for (index, (input, sig)) in request.inputs.iter().zip(signatures).enumerate() {
            let key = input_key(keys, index)?;
            if sig.public_key != key.public_key() {
                return Err(PreImageError::PublicKeyMismatch);
            }
            let public_key = compressed_key(key.public_key())
                .map_err(|e| PreImageError::InvalidTransaction(e.message))?;

            let mut sig_bytes = sig.signature.clone();
            sig_bytes.push(EcdsaSighashType::All.to_u32() as u8);

            match input.script_type {
                BtcScriptType::P2pkh => {
                    let push_sig = PushBytesBuf::try_from(sig_bytes.clone())
                        .map_err(|e| PreImageError::EncodingError(e.to_string()))?;
                    tx.input[index].script_sig = ScriptBuf::builder()
                        .push_slice(push_sig)
                        .push_key(&bitcoin::PublicKey::new(public_key.0))
                        .into_script();
                }
                BtcScriptType::P2shP2wpkh => {
                    let redeem = ScriptBuf::new_p2wpkh(&public_key.wpubkey_hash());
                    let push_redeem = PushBytesBuf::try_from(redeem.into_bytes())
                        .map_err(|e| PreImageError::EncodingError(e.to_string()))?;
                    tx.input[index].script_sig = ScriptBuf::builder().push_slice(push_redeem).into_script();
                    tx.input[index].witness = Witness::from_slice(&[&sig_bytes[..], &public_key.to_bytes()[..]]);
                }
                BtcScriptType::P2wpkh => {
                    tx.input[index].witness = Witness::from_slice(&[&sig_bytes[..], &public_key.to_bytes()[..]]);
                }
            }
            rendered.push(hex::encode(&sig_bytes));
        }

        Ok(BtcSignedTx {
            signatures: rendered,
            serialized_tx: encode::serialize_hex(&tx),
            txid: tx.compute_txid().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // "abandon ... about", first receive address of account 0
    const BIP44_PK: &str = "03aaeb52dd7494c361049de67cc680e83ebcbbbdbeb13637d92cd845f70308af5e";
    const BIP49_PK: &str = "039b3b694b8fc5b5e07fb069c783cac754f5d38c3e08bed1960e31fdb1dda35c24";
    const BIP84_PK: &str = "0330d54fd0dd420a6e5f8d3624f5f3482cae350f79d5f0753bf5beef9c2d91af3c";

    #[test]
    fn test_address_vectors() {
        let pk = |h: &str| hex::decode(h).unwrap();
        assert_eq!(
            encode_btc_address(&pk(BIP44_PK), BtcScriptType::P2pkh).unwrap(),
            "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA"
        );
        assert_eq!(
            encode_btc_address(&pk(BIP49_PK), BtcScriptType::P2shP2wpkh).unwrap(),
            "37VucYSaXLCAsxYyAPfbSi9eh4iEcbShgf"
        );
        assert_eq!(
            encode_btc_address(&pk(BIP84_PK), BtcScriptType::P2wpkh).unwrap(),
            "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu"
        );
    }

    #[test]
    fn test_script_type_for_path() {
        let st = |p: &str| script_type_for_path(&p.parse().unwrap());
        assert_eq!(st("m/84'/0'/0'/0/0"), BtcScriptType::P2wpkh);
        assert_eq!(st("m/49'/0'/0'"), BtcScriptType::P2shP2wpkh);
        assert_eq!(st("m/44'/0'/0'/0/0"), BtcScriptType::P2pkh);
        assert_eq!(st("m/0/1"), BtcScriptType::P2pkh);
        assert_eq!(st("m/84/0"), BtcScriptType::P2pkh);
    }

    #[test]
    fn test_output_script_matches_address() {
        let pk = hex::decode(BIP84_PK).unwrap();
        let from_key = output_script(&pk, BtcScriptType::P2wpkh).unwrap();
        let from_address = parse_address("bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu").unwrap();
        assert_eq!(from_key, from_address);

        let pk49 = hex::decode(BIP49_PK).unwrap();
        assert_eq!(
            output_script(&pk49, BtcScriptType::P2shP2wpkh).unwrap(),
            parse_address("37VucYSaXLCAsxYyAPfbSi9eh4iEcbShgf").unwrap()
        );
    }

    #[test]
    fn test_rejects_testnet_address() {
        assert!(matches!(
            parse_address("tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx"),
            Err(PreImageError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_output_requires_one_destination() {
        let request = BtcSignTx {
            inputs: vec![BtcSignTxInput {
                address_n: "m/84'/0'/0'/0/0".parse().unwrap(),
                prev_hash: "00".repeat(32),
                prev_index: 0,
                amount: "1000".into(),
                script_type: BtcScriptType::P2wpkh,
                sequence: None,
            }],
            outputs: vec![BtcSignTxOutput {
                address: None,
                address_n: None,
                script_type: None,
                amount: "900".into(),
            }],
            version: 1,
            lock_time: 0,
        };
        assert!(matches!(
            unsigned_transaction(&request, &[]),
            Err(PreImageError::InvalidTransaction(_))
        ));
    }

    #[test]
    fn test_signing_paths_include_change() {
        let request: BtcSignTx = serde_json::from_value(serde_json::json!({
            "inputs": [{
                "address_n": [0x8000_0054u32, 0x8000_0000u32, 0x8000_0000u32, 0, 0],
                "prev_hash": "00".repeat(32),
                "prev_index": 1,
                "amount": "5000",
                "script_type": "p2wpkh"
            }],
            "outputs": [
                {"address": "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA", "amount": "3000"},
                {"address_n": [0x8000_0054u32, 0x8000_0000u32, 0x8000_0000u32, 1, 0], "amount": "1500"}
            ]
        }))
        .unwrap();
        assert_eq!(request.version, 1);
        let paths = BitcoinAdapter::new().signing_paths(&request).unwrap();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[1].to_string(), "m/84'/0'/0'/1/0");
    }

    #[test]
    fn test_message_signature_header() {
        let sig = encode_message_signature(&[0u8; 64], 1, BtcScriptType::P2wpkh);
        let raw = BASE64.decode(sig).unwrap();
        assert_eq!(raw[0], 40);
        assert_eq!(raw.len(), 65);
    }

    #[test]
    fn test_signed_message_digest_depends_on_message() {
        assert_ne!(signed_message_digest("a"), signed_message_digest("b"));
        assert_eq!(signed_message_digest("a"), signed_message_digest("a"));
    }
}
