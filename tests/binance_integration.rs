//! Binance Chain signing against recorded envelopes

use hdwallet_native::cosmos_wallet::{CosmosSignTx, StdTx};
use hdwallet_native::{Bip32Path, ErrorCode, LoadDevice, NativeHDWallet};
use serde_json::Value;

const MNEMONIC: &str = "alcohol woman abuse must during monitor noble actual mixed trade anger aisle";
const ADDRESS: &str = "binance15cenya0tr7nm3tz2wn3h3zwkht2rxrq7q7h3dj";

const UNSIGNED: &str = include_str!("fixtures/binance/tx01.unsigned.json");
const SIGNED: &str = include_str!("fixtures/binance/tx01.signed.json");

fn path() -> Bip32Path {
    "m/44'/714'/0'/0/0".parse().unwrap()
}

async fn wallet() -> NativeHDWallet {
    let wallet = NativeHDWallet::new("binance-fixture");
    wallet
        .load_device(LoadDevice::mnemonic(MNEMONIC).skip_checksum(true))
        .await
        .unwrap();
    wallet
}

fn request() -> CosmosSignTx {
    CosmosSignTx {
        address_n: path(),
        tx: serde_json::from_str::<StdTx>(UNSIGNED).unwrap(),
        chain_id: "binancehub-2".into(),
        account_number: "1".into(),
        sequence: "0".into(),
    }
}

#[tokio::test]
async fn test_address_is_stable() {
    let wallet = wallet().await;
    for _ in 0..3 {
        assert_eq!(wallet.binance_get_address(&path(), false).await.unwrap(), ADDRESS);
    }
}

#[tokio::test]
async fn test_signs_fixture_exactly() {
    let wallet = wallet().await;
    let signed = wallet.binance_sign_tx(&request()).await.unwrap();

    let expected: Value = serde_json::from_str(SIGNED).unwrap();
    assert_eq!(serde_json::to_value(&signed).unwrap(), expected);
}

#[tokio::test]
async fn test_signature_is_deterministic() {
    let wallet = wallet().await;
    let a = wallet.binance_sign_tx(&request()).await.unwrap();
    let b = wallet.binance_sign_tx(&request()).await.unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_other_fields_change_signature() {
    let wallet = wallet().await;
    let base = wallet.binance_sign_tx(&request()).await.unwrap();

    let mut bumped = request();
    bumped.sequence = "1".into();
    let other = wallet.binance_sign_tx(&bumped).await.unwrap();
    assert_ne!(base.signatures, other.signatures);
}

#[tokio::test]
async fn test_rejects_non_decimal_account_number() {
    let wallet = wallet().await;
    let mut bad = request();
    bad.account_number = "one".into();
    let err = wallet.binance_sign_tx(&bad).await.unwrap_err();
    assert!(err.is(ErrorCode::InvalidTransaction));
}

#[tokio::test]
async fn test_rejects_unrecognised_path() {
    let wallet = wallet().await;
    let mut bad = request();
    bad.address_n = "m/44'/714'/0'".parse().unwrap();
    let err = wallet.binance_sign_tx(&bad).await.unwrap_err();
    assert!(err.is(ErrorCode::UnsupportedPath));
}
