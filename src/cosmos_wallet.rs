//! Cosmos-SDK family adapter (Cosmos, Binance Chain, THORChain)
//!
//! Amino JSON signing:
//! - sign doc `{account_number, chain_id, fee, memo, msgs, sequence}`
//! - canonical JSON, NFKD, one SHA-256 pass
//! - compact secp256k1 signature, base64
//!
//! The signed envelope is the unsigned one with a `{pub_key, signature}` entry
//! appended to `signatures`.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bech32::{ToBase32, Variant};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use unicode_normalization::UnicodeNormalization;

use crate::crypto::curves::SignatureFormat;
use crate::crypto::isolation::IsolatedKeyHandle;
use crate::error::{WalletError, WalletResult};
use crate::signing::{ChainAdapter, ExternalSignature, PreImage, PreImageError, PreImageResult};
use crate::types::Chain;
use crate::utils::crypto::{hash160, sha256};
use crate::utils::json::{canonical_json_bytes, parse_decimal_u64};
use crate::utils::wallet_config::BinanceAddressMode;
use crate::wallet::derivation_path::{hardened, Bip32Path};

pub const PUBKEY_TYPE_SECP256K1: &str = "tendermint/PubKeySecp256k1";

// MARK: - Envelope types

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub amount: String,
    pub denom: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdFee {
    pub amount: Vec<Coin>,
    pub gas: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdSignature {
    pub pub_key: PubKey,
    pub signature: String,
}

/// Amino `StdTx`. `msg` entries are kept as opaque JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StdTx {
    pub msg: Vec<Value>,
    pub fee: StdFee,
    pub signatures: Option<Vec<StdSignature>>,
    pub memo: String,
}

impl StdTx {
    /// Canonical JSON rendering (sorted keys, no whitespace)
    pub fn to_canonical_json(&self) -> WalletResult<String> {
        let value = serde_json::to_value(self)?;
        Ok(crate::utils::json::canonical_json_string(&value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CosmosSignTx {
    pub address_n: Bip32Path,
    pub tx: StdTx,
    pub chain_id: String,
    /// Decimal string
    pub account_number: String,
    /// Decimal string
    pub sequence: String,
}

// MARK: - Adapter

#[derive(Debug, Clone)]
pub struct CosmosAdapter {
    chain: Chain,
    binance_mode: BinanceAddressMode,
}

impl CosmosAdapter {
    pub fn cosmos() -> Self {
        Self { chain: Chain::Cosmos, binance_mode: BinanceAddressMode::default() }
    }

    pub fn thorchain() -> Self {
        Self { chain: Chain::Thorchain, binance_mode: BinanceAddressMode::default() }
    }

    pub fn binance(mode: BinanceAddressMode) -> Self {
        Self { chain: Chain::Binance, binance_mode: mode }
    }

    pub fn for_chain(chain: Chain, binance_mode: BinanceAddressMode) -> WalletResult<Self> {
        match chain {
            Chain::Cosmos => Ok(Self::cosmos()),
            Chain::Thorchain => Ok(Self::thorchain()),
            Chain::Binance => Ok(Self::binance(binance_mode)),
            other => Err(WalletError::invalid_input(format!("{} is not a Cosmos-SDK chain", other))),
        }
    }

    fn hrp(&self) -> &str {
        match (&self.chain, &self.binance_mode) {
            (Chain::Thorchain, _) => "thor",
            (Chain::Binance, BinanceAddressMode::Bech32 { hrp }) => hrp,
            _ => "cosmos",
        }
    }

    fn relabels(&self) -> bool {
        self.chain == Chain::Binance && self.binance_mode == BinanceAddressMode::LegacyCosmosRelabel
    }

    /// SHA-256 over the NFKD canonical sign doc
    pub fn sign_doc_digest(request: &CosmosSignTx) -> PreImageResult<[u8; 32]> {
        parse_decimal_u64("account_number", &request.account_number)
            .map_err(|e| PreImageError::InvalidTransaction(e.message))?;
        parse_decimal_u64("sequence", &request.sequence)
            .map_err(|e| PreImageError::InvalidTransaction(e.message))?;

        let fee = serde_json::to_value(&request.tx.fee)
            .map_err(|e| PreImageError::EncodingError(e.to_string()))?;
        let sign_doc = json!({
            "account_number": request.account_number,
            "chain_id": request.chain_id,
            "fee": fee,
            "memo": request.tx.memo,
            "msgs": request.tx.msg,
            "sequence": request.sequence,
        });

        let canonical = canonical_json_bytes(&sign_doc);
        let text = String::from_utf8(canonical)
            .map_err(|e| PreImageError::EncodingError(e.to_string()))?;
        let normalized: String = text.nfkd().collect();
        Ok(sha256(normalized.as_bytes()))
    }
}

/// Bech32 address of hash160(pubkey)
pub fn encode_cosmos_address(public_key: &[u8], hrp: &str) -> WalletResult<String> {
    if public_key.len() != 33 {
        return Err(WalletError::invalid_input(format!(
            "Expected 33-byte compressed public key, got {}",
            public_key.len()
        )));
    }
    let hash = hash160(public_key);
    Ok(bech32::encode(hrp, hash.to_base32(), Variant::Bech32)?)
}

impl ChainAdapter for CosmosAdapter {
    type SignRequest = CosmosSignTx;
    type Signed = StdTx;

    fn chain(&self) -> Chain {
        self.chain
    }

    /// Legacy Binance keys live at the Cosmos coin type
    fn key_path(&self, path: &Bip32Path) -> Bip32Path {
        if self.relabels() && path.get(1) == Some(hardened(Chain::Binance.slip44())) {
            if let Some(p) = path.with_segment(1, hardened(Chain::Cosmos.slip44())) {
                return p;
            }
        }
        path.clone()
    }

    fn render_address(&self, public_key: &[u8], _path: &Bip32Path) -> WalletResult<String> {
        let address = encode_cosmos_address(public_key, self.hrp())?;
        if self.relabels() {
            return Ok(address.replacen("cosmos", "binance", 1));
        }
        Ok(address)
    }

    fn signing_paths(&self, request: &CosmosSignTx) -> PreImageResult<Vec<Bip32Path>> {
        Ok(vec![request.address_n.clone()])
    }

    fn pre_image(
        &self,
        request: &CosmosSignTx,
        _keys: &[IsolatedKeyHandle],
    ) -> PreImageResult<Vec<PreImage>> {
        let digest = Self::sign_doc_digest(request)?;
        Ok(vec![PreImage::new(0, digest, SignatureFormat::Compact)
            .with_description(format!("{} amino sign doc", self.chain))])
    }

    fn compile(
        &self,
        request: &CosmosSignTx,
        keys: &[IsolatedKeyHandle],
        signatures: &[ExternalSignature],
    ) -> PreImageResult<StdTx> {
        let key = keys.first().ok_or_else(|| PreImageError::MissingField("signing key".into()))?;
        let sig = signatures
            .first()
            .ok_or_else(|| PreImageError::InvalidSignature("No signature produced".into()))?;
        if sig.public_key != key.public_key() {
            return Err(PreImageError::PublicKeyMismatch);
        }

        let mut signed = request.tx.clone();
        signed.signatures.get_or_insert_with(Vec::new).push(StdSignature {
            pub_key: PubKey {
                key_type: PUBKEY_TYPE_SECP256K1.to_string(),
                value: BASE64.encode(key.public_key()),
            },
            signature: BASE64.encode(sig.compact()?),
        });
        Ok(signed)
    }
}
