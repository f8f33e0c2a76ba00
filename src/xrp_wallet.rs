//! Ripple (XRP Ledger) adapter
//!
//! Classic addresses are base58check(0x00 || hash160(pubkey)) over the Ripple
//! alphabet. Payments are serialized as a binary STObject with fields in
//! canonical (type code, field code) order, hashed as SHA-512Half over
//! `STX\0 || fields` and signed with a DER ECDSA signature.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crypto::curves::SignatureFormat;
use crate::crypto::isolation::IsolatedKeyHandle;
use crate::error::{WalletError, WalletResult};
use crate::signing::{ChainAdapter, ExternalSignature, PreImage, PreImageError, PreImageResult};
use crate::types::Chain;
use crate::utils::crypto::{base58check_decode, base58check_encode, hash160, sha512_half};
use crate::utils::json::parse_decimal_u64;
use crate::wallet::derivation_path::Bip32Path;

const ACCOUNT_ID_VERSION: u8 = 0x00;
const SIGNING_PREFIX: [u8; 4] = *b"STX\0";
const TX_ID_PREFIX: [u8; 4] = *b"TXN\0";
const TT_PAYMENT: u16 = 0;
/// tfFullyCanonicalSig
pub const DEFAULT_FLAGS: u32 = 0x8000_0000;
const XRP_AMOUNT_POSITIVE: u64 = 0x4000_0000_0000_0000;
const MAX_DROPS: u64 = 100_000_000_000_000_000;

// MARK: - Envelope types

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RippleCoin {
    pub amount: String,
    pub denom: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RippleFee {
    pub amount: Vec<RippleCoin>,
    pub gas: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RippleSignature {
    pub serialized_tx: String,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RippleTxValue {
    pub fee: RippleFee,
    pub memo: String,
    pub msg: Vec<Value>,
    pub signatures: Option<Vec<RippleSignature>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RippleTx {
    #[serde(rename = "type")]
    pub tx_type: String,
    pub value: RippleTxValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RipplePayment {
    /// Drops, decimal string
    pub amount: String,
    pub destination: String,
    pub destination_tag: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RippleSignTx {
    pub address_n: Bip32Path,
    pub tx: RippleTx,
    pub flags: Option<String>,
    pub sequence: String,
    pub last_ledger_sequence: String,
    pub payment: RipplePayment,
}

// MARK: - Address codec

pub fn encode_ripple_address(public_key: &[u8]) -> WalletResult<String> {
    if public_key.len() != 33 {
        return Err(WalletError::invalid_input(format!(
            "Expected 33-byte compressed public key, got {}",
            public_key.len()
        )));
    }
    let mut payload = vec![ACCOUNT_ID_VERSION];
    payload.extend_from_slice(&hash160(public_key));
    Ok(base58check_encode(&payload, bs58::Alphabet::RIPPLE))
}

/// Account id (20 bytes) of a classic address
pub fn decode_ripple_address(address: &str) -> PreImageResult<[u8; 20]> {
    let payload = base58check_decode(address, bs58::Alphabet::RIPPLE)
        .ok_or_else(|| PreImageError::InvalidAddress(address.to_string()))?;
    match payload.split_first() {
        Some((&ACCOUNT_ID_VERSION, id)) if id.len() == 20 => {
            let mut out = [0u8; 20];
            out.copy_from_slice(id);
            Ok(out)
        }
        _ => Err(PreImageError::InvalidAddress(address.to_string())),
    }
}

// MARK: - Binary serialization

/// Normalized payment fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentFields {
    pub flags: u32,
    pub sequence: u32,
    pub destination_tag: Option<u32>,
    pub last_ledger_sequence: u32,
    pub amount: u64,
    pub fee: u64,
    pub account: [u8; 20],
    pub destination: [u8; 20],
}

fn field_header(type_code: u8, field_code: u8, out: &mut Vec<u8>) {
    match (type_code < 16, field_code < 16) {
        (true, true) => out.push((type_code << 4) | field_code),
        (true, false) => {
            out.push(type_code << 4);
            out.push(field_code);
        }
        (false, true) => {
            out.push(field_code);
            out.push(type_code);
        }
        (false, false) => {
            out.push(0);
            out.push(type_code);
            out.push(field_code);
        }
    }
}

fn vl_bytes(data: &[u8], out: &mut Vec<u8>) {
    // lengths here are at most 72 bytes, so one length byte suffices
    out.push(data.len() as u8);
    out.extend_from_slice(data);
}

fn xrp_amount(drops: u64) -> [u8; 8] {
    (drops | XRP_AMOUNT_POSITIVE).to_be_bytes()
}

impl PaymentFields {
    fn parse(request: &RippleSignTx, account: [u8; 20]) -> PreImageResult<Self> {
        let number = |field: &str, v: &str| {
            parse_decimal_u64(field, v).map_err(|e| PreImageError::InvalidTransaction(e.message))
        };
        let u32_field = |field: &str, v: &str| -> PreImageResult<u32> {
            u32::try_from(number(field, v)?)
                .map_err(|_| PreImageError::InvalidTransaction(format!("{} out of range", field)))
        };

        let fee_coin = request
            .tx
            .value
            .fee
            .amount
            .first()
            .ok_or_else(|| PreImageError::MissingField("fee.amount".into()))?;
        let amount = number("payment.amount", &request.payment.amount)?;
        let fee = number("fee", &fee_coin.amount)?;
        if amount == 0 || amount > MAX_DROPS || fee > MAX_DROPS {
            return Err(PreImageError::InvalidTransaction("XRP amount out of range".into()));
        }

        Ok(Self {
            flags: match &request.flags {
                Some(f) => u32_field("flags", f)?,
                None => DEFAULT_FLAGS,
            },
            sequence: u32_field("sequence", &request.sequence)?,
            destination_tag: request
                .payment
                .destination_tag
                .as_deref()
                .map(|t| u32_field("destination_tag", t))
                .transpose()?,
            last_ledger_sequence: u32_field("last_ledger_sequence", &request.last_ledger_sequence)?,
            amount,
            fee,
            account,
            destination: decode_ripple_address(&request.payment.destination)?,
        })
    }

    /// Canonical field order; `signature` is omitted for the signing form
    pub fn serialize(&self, signing_pub_key: &[u8], signature: Option<&[u8]>) -> Vec<u8> {
        let mut out = Vec::with_capacity(256);

        field_header(1, 2, &mut out); // TransactionType
        out.extend_from_slice(&TT_PAYMENT.to_be_bytes());
        field_header(2, 2, &mut out); // Flags
        out.extend_from_slice(&self.flags.to_be_bytes());
        field_header(2, 4, &mut out); // Sequence
        out.extend_from_slice(&self.sequence.to_be_bytes());
        if let Some(tag) = self.destination_tag {
            field_header(2, 14, &mut out); // DestinationTag
            out.extend_from_slice(&tag.to_be_bytes());
        }
        field_header(2, 27, &mut out); // LastLedgerSequence
        out.extend_from_slice(&self.last_ledger_sequence.to_be_bytes());
        field_header(6, 1, &mut out); // Amount
        out.extend_from_slice(&xrp_amount(self.amount));
        field_header(6, 8, &mut out); // Fee
        out.extend_from_slice(&xrp_amount(self.fee));
        field_header(7, 3, &mut out); // SigningPubKey
        vl_bytes(signing_pub_key, &mut out);
        if let Some(sig) = signature {
            field_header(7, 4, &mut out); // TxnSignature
            vl_bytes(sig, &mut out);
        }
        field_header(8, 1, &mut out); // Account
        vl_bytes(&self.account, &mut out);
        field_header(8, 3, &mut out); // Destination
        vl_bytes(&self.destination, &mut out);

        out
    }
}

/// Transaction hash of a signed blob
pub fn transaction_id(signed_blob: &[u8]) -> String {
    let mut data = TX_ID_PREFIX.to_vec();
    data.extend_from_slice(signed_blob);
    hex::encode_upper(sha512_half(&data))
}

// MARK: - Adapter

#[derive(Debug, Clone, Default)]
pub struct RippleAdapter;

impl RippleAdapter {
    fn fields(request: &RippleSignTx, keys: &[IsolatedKeyHandle]) -> PreImageResult<(PaymentFields, Vec<u8>)> {
        let key = keys.first().ok_or_else(|| PreImageError::MissingField("signing key".into()))?;
        let public_key = key.public_key().to_vec();
        let fields = PaymentFields::parse(request, hash160(&public_key))?;
        Ok((fields, public_key))
    }
}

impl ChainAdapter for RippleAdapter {
    type SignRequest = RippleSignTx;
    type Signed = RippleTx;

    fn chain(&self) -> Chain {
        Chain::Ripple
    }

    fn render_address(&self, public_key: &[u8], _path: &Bip32Path) -> WalletResult<String> {
        encode_ripple_address(public_key)
    }

    fn signing_paths(&self, request: &RippleSignTx) -> PreImageResult<Vec<Bip32Path>> {
        Ok(vec![request.address_n.clone()])
    }

    fn pre_image(
        &self,
        request: &RippleSignTx,
        keys: &[IsolatedKeyHandle],
    ) -> PreImageResult<Vec<PreImage>> {
        let (fields, public_key) = Self::fields(request, keys)?;
        let mut data = SIGNING_PREFIX.to_vec();
        data.extend_from_slice(&fields.serialize(&public_key, None));
        Ok(vec![PreImage::new(0, sha512_half(&data), SignatureFormat::Der)
            .with_description("XRP payment")])
    }

    fn compile(
        &self,
        request: &RippleSignTx,
        keys: &[IsolatedKeyHandle],
        signatures: &[ExternalSignature],
    ) -> PreImageResult<RippleTx> {
        let (fields, public_key) = Self::fields(request, keys)?;
        let sig = signatures
            .first()
            .ok_or_else(|| PreImageError::InvalidSignature("No signature produced".into()))?;
        if sig.public_key != public_key {
            return Err(PreImageError::PublicKeyMismatch);
        }

        let blob = fields.serialize(&public_key, Some(&sig.signature));
        let mut signed = request.tx.clone();
        signed.value.signatures.get_or_insert_with(Vec::new).push(RippleSignature {
            serialized_tx: hex::encode_upper(&blob),
            signature: hex::encode_upper(&sig.signature),
        });
        Ok(signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // "abandon ... about" at m/44'/144'/0'/0/0
    const PUBKEY: &str = "031d68bc1a142e6766b2bdfb006ccfe135ef2e0e2e94abb5cf5c9ab6104776fbae";
    const ADDRESS: &str = "rHsMGQEkVNJmpGWs8XUBoTBiAAbwxZN5v3";

    #[test]
    fn test_address_vector() {
        let pk = hex::decode(PUBKEY).unwrap();
        assert_eq!(encode_ripple_address(&pk).unwrap(), ADDRESS);
    }

    #[test]
    fn test_address_roundtrip() {
        let pk = hex::decode(PUBKEY).unwrap();
        assert_eq!(decode_ripple_address(ADDRESS).unwrap(), hash160(&pk));
        assert!(decode_ripple_address("rHsMGQEkVNJmpGWs8XUBoTBiAAbwxZN5v4").is_err());
        assert!(decode_ripple_address("1BoatSLRHtKNngkdXEeobR76b53LETtpyT").is_err());
    }

    #[test]
    fn test_field_headers() {
        let mut out = Vec::new();
        field_header(2, 27, &mut out);
        field_header(8, 3, &mut out);
        field_header(1, 2, &mut out);
        assert_eq!(out, vec![0x20, 0x1b, 0x83, 0x12]);
    }

    #[test]
    fn test_xrp_amount_encoding() {
        assert_eq!(hex::encode(xrp_amount(12)), "400000000000000c");
    }

    #[test]
    fn test_serialization_layout() {
        let fields = PaymentFields {
            flags: DEFAULT_FLAGS,
            sequence: 1,
            destination_tag: Some(7),
            last_ledger_sequence: 100,
            amount: 1_000_000,
            fee: 12,
            account: [0x11; 20],
            destination: [0x22; 20],
        };
        let pk = [0x02u8; 33];
        let unsigned = fields.serialize(&pk, None);
        let hexed = hex::encode(&unsigned);
        assert!(hexed.starts_with("120000228000000024000000012e00000007201b00000064"));
        assert!(hexed.contains("6140000000000f4240"));
        assert!(hexed.contains("68400000000000000c"));
        assert!(hexed.contains(&format!("7321{}", hex::encode(pk))));
        assert!(hexed.ends_with(&format!("8114{}8314{}", "11".repeat(20), "22".repeat(20))));

        let signed = fields.serialize(&pk, Some(&[0x30, 0x01, 0x00]));
        assert!(hex::encode(&signed).contains("7403300100"));
        assert_eq!(signed.len(), unsigned.len() + 5);
    }
}
