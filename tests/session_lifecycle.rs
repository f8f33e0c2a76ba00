//! Load, wipe and reload behaviour of the key isolation session

use std::sync::Arc;

use hdwallet_native::cosmos_wallet::{CosmosSignTx, StdTx};
use hdwallet_native::crypto::SignatureFormat;
use hdwallet_native::{
    Bip32Path, CurveType, ErrorCode, KeyIsolationCore, LoadDevice, LoadOptions, MasterSecret, NativeHDWallet,
};

const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
const ALCOHOL: &str = "alcohol woman abuse must during monitor noble actual mixed trade anger aisle";
const UNSIGNED: &str = include_str!("fixtures/binance/tx01.unsigned.json");

fn cosmos_path() -> Bip32Path {
    "m/44'/118'/0'/0/0".parse().unwrap()
}

fn sign_request() -> CosmosSignTx {
    CosmosSignTx {
        address_n: "m/44'/714'/0'/0/0".parse().unwrap(),
        tx: serde_json::from_str::<StdTx>(UNSIGNED).unwrap(),
        chain_id: "binancehub-2".into(),
        account_number: "1".into(),
        sequence: "0".into(),
    }
}

#[tokio::test]
async fn test_unloaded_wallet_refuses_work() {
    let wallet = NativeHDWallet::new("fresh");
    let err = wallet.cosmos_get_address(&cosmos_path(), false).await.unwrap_err();
    assert!(err.is(ErrorCode::SessionNotLoaded));
}

#[tokio::test]
async fn test_wipe_then_reload() {
    let wallet = NativeHDWallet::new("lifecycle");
    wallet.load_device(LoadDevice::mnemonic(ABANDON)).await.unwrap();
    let first = wallet.cosmos_get_address(&cosmos_path(), false).await.unwrap();

    wallet.wipe().await.unwrap();
    let err = wallet.cosmos_get_address(&cosmos_path(), false).await.unwrap_err();
    assert!(err.is(ErrorCode::SessionNotLoaded));
    let err = wallet.binance_sign_tx(&sign_request()).await.unwrap_err();
    assert!(err.is(ErrorCode::SessionNotLoaded));

    wallet
        .load_device(LoadDevice::mnemonic(ALCOHOL).skip_checksum(true))
        .await
        .unwrap();
    let second = wallet.cosmos_get_address(&cosmos_path(), false).await.unwrap();
    assert_ne!(first, second);
    assert!(wallet.binance_sign_tx(&sign_request()).await.is_ok());
}

#[tokio::test]
async fn test_clear_session_keeps_label() {
    let wallet = NativeHDWallet::new("lifecycle");
    wallet
        .load_device(LoadDevice::mnemonic(ABANDON).with_label("kitchen"))
        .await
        .unwrap();
    wallet.clear_session().await.unwrap();
    assert!(!wallet.is_initialized().await);
    assert_eq!(wallet.get_label().await, "kitchen");
}

#[tokio::test]
async fn test_stale_handle_is_invalidated() {
    let core = KeyIsolationCore::new();
    core.load(MasterSecret::mnemonic(ABANDON), LoadOptions::default())
        .await
        .unwrap();
    let handle = core.derive(&cosmos_path(), CurveType::Secp256k1).await.unwrap();
    assert!(handle.sign(&[7u8; 32], SignatureFormat::Compact).await.is_ok());

    core.clear().await;
    let err = handle.sign(&[7u8; 32], SignatureFormat::Compact).await.unwrap_err();
    assert!(err.is(ErrorCode::SessionInvalidated));

    // Reloading the same secret does not revive an old handle
    core.load(MasterSecret::mnemonic(ABANDON), LoadOptions::default())
        .await
        .unwrap();
    let err = handle.sign(&[7u8; 32], SignatureFormat::Compact).await.unwrap_err();
    assert!(err.is(ErrorCode::SessionInvalidated));

    let fresh = core.derive(&cosmos_path(), CurveType::Secp256k1).await.unwrap();
    assert_eq!(fresh.public_key(), handle.public_key());
    assert!(fresh.sign(&[7u8; 32], SignatureFormat::Compact).await.is_ok());
}

#[tokio::test]
async fn test_bad_checksum_rejected_unless_skipped() {
    let wallet = NativeHDWallet::new("checksum");
    let phrase = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon";
    let err = wallet.load_device(LoadDevice::mnemonic(phrase)).await.unwrap_err();
    assert!(err.is(ErrorCode::InvalidSecret));
    assert!(!wallet.is_initialized().await);

    wallet
        .load_device(LoadDevice::mnemonic(phrase).skip_checksum(true))
        .await
        .unwrap();
    assert!(wallet.is_initialized().await);
}

#[tokio::test]
async fn test_passphrase_changes_keys() {
    let plain = NativeHDWallet::new("a");
    plain.load_device(LoadDevice::mnemonic(ABANDON)).await.unwrap();
    let salted = NativeHDWallet::new("b");
    salted
        .load_device(LoadDevice::mnemonic(ABANDON).with_passphrase("TREZOR"))
        .await
        .unwrap();

    let a = plain.cosmos_get_address(&cosmos_path(), false).await.unwrap();
    let b = salted.cosmos_get_address(&cosmos_path(), false).await.unwrap();
    assert_ne!(a, b);
}

async fn derive_and_sign(core: &KeyIsolationCore, path: &Bip32Path) -> (Vec<u8>, Vec<u8>) {
    let key = core.derive(path, CurveType::Secp256k1).await.unwrap();
    let sig = key.sign(&[5u8; 32], SignatureFormat::Compact).await.unwrap();
    (key.public_key().to_vec(), sig.bytes)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_signing_matches_sequential() {
    let core = KeyIsolationCore::new();
    core.load(MasterSecret::mnemonic(ABANDON), LoadOptions::default())
        .await
        .unwrap();
    let paths: Vec<Bip32Path> = (0..4)
        .map(|i| format!("m/44'/118'/{}'/0/0", i).parse().unwrap())
        .collect();

    let mut sequential = Vec::new();
    for path in &paths {
        sequential.push(derive_and_sign(&core, path).await);
    }

    let (a, b, c, d) = tokio::join!(
        derive_and_sign(&core, &paths[0]),
        derive_and_sign(&core, &paths[1]),
        derive_and_sign(&core, &paths[2]),
        derive_and_sign(&core, &paths[3]),
    );
    assert_eq!(vec![a, b, c, d], sequential);

    let core = Arc::new(core);
    let mut tasks = Vec::new();
    for path in paths.iter().cloned() {
        let core = Arc::clone(&core);
        tasks.push(tokio::spawn(async move { derive_and_sign(&core, &path).await }));
    }
    for (task, expected) in tasks.into_iter().zip(&sequential) {
        assert_eq!(&task.await.unwrap(), expected);
    }
}

#[tokio::test]
async fn test_sign_racing_wipe() {
    let reference = NativeHDWallet::new("reference");
    reference.load_device(LoadDevice::mnemonic(ABANDON)).await.unwrap();
    let expected = reference.binance_sign_tx(&sign_request()).await.unwrap();

    for _ in 0..8 {
        let wallet = NativeHDWallet::new("race");
        wallet.load_device(LoadDevice::mnemonic(ABANDON)).await.unwrap();
        let request = sign_request();
        let (signed, wiped) = tokio::join!(wallet.binance_sign_tx(&request), wallet.wipe());
        wiped.unwrap();
        match signed {
            Ok(tx) => assert_eq!(tx, expected),
            Err(e) => assert!(e.is(ErrorCode::SessionNotLoaded) || e.is(ErrorCode::SessionInvalidated)),
        }
        assert!(!wallet.is_initialized().await);
    }
}
