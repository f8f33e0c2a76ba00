//! Published address vectors and end-to-end signing per chain

use hdwallet_native::cosmos_wallet::{CosmosSignTx, StdTx};
use hdwallet_native::bitcoin_wallet::{BtcSignTx, BtcSignTxInput, BtcSignTxOutput};
use hdwallet_native::eos_wallet::{
    decode_signature, EosAction, EosActionData, EosPermissionLevel, EosSignTx, EosTokenTransfer, EosTxHeader,
};
use hdwallet_native::ethereum_wallet::{EthSignMessage, EthSignTx, EthVerifyMessage};
use hdwallet_native::xrp_wallet::{RippleCoin, RippleFee, RipplePayment, RippleSignTx, RippleTx, RippleTxValue};
use hdwallet_native::{
    BinanceAddressMode, Bip32Path, BtcScriptType, LoadDevice, NativeHDWallet, WalletConfig,
};

const ABANDON: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
const ALCOHOL: &str = "alcohol woman abuse must during monitor noble actual mixed trade anger aisle";
const EOS_CHAIN_ID: &str = "aca376f206b8fc25a6ed44dbdc66547c36c6c33e3a119ffbeaef943642f0e906";

fn path(s: &str) -> Bip32Path {
    s.parse().unwrap()
}

async fn wallet_with(config: WalletConfig, mnemonic: &str) -> NativeHDWallet {
    let wallet = NativeHDWallet::with_config("vectors", config);
    wallet
        .load_device(LoadDevice::mnemonic(mnemonic).skip_checksum(true))
        .await
        .unwrap();
    wallet
}

async fn abandon() -> NativeHDWallet {
    wallet_with(WalletConfig::standard(), ABANDON).await
}

fn is_canonical(sig: &[u8; 64]) -> bool {
    let half_ok = |b: &[u8]| b[0] & 0x80 == 0 && !(b[0] == 0 && b[1] & 0x80 == 0);
    half_ok(&sig[..32]) && half_ok(&sig[32..])
}

#[tokio::test]
async fn test_bitcoin_purpose_vectors() {
    let wallet = abandon().await;
    let cases = [
        ("m/44'/0'/0'/0/0", "1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA"),
        ("m/49'/0'/0'/0/0", "37VucYSaXLCAsxYyAPfbSi9eh4iEcbShgf"),
        ("m/84'/0'/0'/0/0", "bc1qcr8te4kr609gcawutmrza0j4xv80jy8z306fyu"),
    ];
    for (p, expected) in cases {
        assert_eq!(wallet.btc_get_address(&path(p), None, false).await.unwrap(), expected);
    }

    // An explicit script type wins over the purpose field
    let explicit = wallet
        .btc_get_address(&path("m/44'/0'/0'/0/0"), Some(BtcScriptType::P2wpkh), false)
        .await
        .unwrap();
    assert!(explicit.starts_with("bc1q"));
}

#[tokio::test]
async fn test_account_model_vectors() {
    let wallet = abandon().await;
    assert_eq!(
        wallet.eth_get_address(&path("m/44'/60'/0'/0/0"), false).await.unwrap(),
        "0x9858EfFD232B4033E47d90003D41EC34EcaEda94"
    );
    assert_eq!(
        wallet.ripple_get_address(&path("m/44'/144'/0'/0/0"), false).await.unwrap(),
        "rHsMGQEkVNJmpGWs8XUBoTBiAAbwxZN5v3"
    );
    assert_eq!(
        wallet.eos_get_public_key(&path("m/44'/194'/0'/0/0"), false).await.unwrap(),
        "EOS6zpSNY1YoLxNt2VsvJjoDfBueU6xC1M1ERJw1UoekL1NHn8KNA"
    );
    assert_eq!(
        wallet.fio_get_public_key(&path("m/44'/235'/0'/0/0"), false).await.unwrap(),
        "FIO87wawwaniQzqWPmNaCqGkiUNmCAhq9PiGUVNKKjRMTYgoBfKYa"
    );
}

#[tokio::test]
async fn test_thorchain_and_binance_modes() {
    let wallet = wallet_with(WalletConfig::standard(), ALCOHOL).await;
    assert_eq!(
        wallet.thorchain_get_address(&path("m/44'/931'/0'/0/0"), false).await.unwrap(),
        "thor1ls33ayg26kmltw7jjy55p32ghjna09zp74t4az"
    );

    let mut config = WalletConfig::standard();
    config.binance_address_mode = BinanceAddressMode::Bech32 { hrp: "bnb".into() };
    let bnb = wallet_with(config, ALCOHOL).await;
    assert_eq!(
        bnb.binance_get_address(&path("m/44'/714'/0'/0/0"), false).await.unwrap(),
        "bnb1afwh46v6nn30nkmugw5swdmsyjmlxslgjfugre"
    );
}

#[tokio::test]
async fn test_bitcoin_segwit_spend() {
    let wallet = abandon().await;
    let request = BtcSignTx {
        inputs: vec![BtcSignTxInput {
            address_n: path("m/84'/0'/0'/0/0"),
            prev_hash: "d5f65ee80147b4bcc70b75e4bbf2d7382021b871bd8867ef8fa525ef50864882".into(),
            prev_index: 0,
            amount: "100000".into(),
            script_type: BtcScriptType::P2wpkh,
            sequence: None,
        }],
        outputs: vec![
            BtcSignTxOutput {
                address: Some("1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA".into()),
                address_n: None,
                script_type: None,
                amount: "60000".into(),
            },
            BtcSignTxOutput {
                address: None,
                address_n: Some(path("m/84'/0'/0'/1/0")),
                script_type: Some(BtcScriptType::P2wpkh),
                amount: "39000".into(),
            },
        ],
        version: 2,
        lock_time: 0,
    };

    let signed = wallet.btc_sign_tx(&request).await.unwrap();
    assert_eq!(signed.signatures.len(), 1);
    assert!(signed.signatures[0].ends_with("01"));
    assert_eq!(signed.txid.len(), 64);
    // version 2, segwit marker and flag
    assert!(signed.serialized_tx.starts_with("020000000001"));

    let again = wallet.btc_sign_tx(&request).await.unwrap();
    assert_eq!(signed, again);
}

#[tokio::test]
async fn test_ethereum_signing() {
    let wallet = abandon().await;
    let signed = wallet
        .eth_sign_tx(&EthSignTx {
            address_n: path("m/44'/60'/0'/0/0"),
            nonce: "0x0".into(),
            gas_limit: "21000".into(),
            gas_price: Some("20000000000".into()),
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            to: "0x9858EfFD232B4033E47d90003D41EC34EcaEda94".into(),
            value: "1000000000000000000".into(),
            data: String::new(),
            chain_id: 1,
        })
        .await
        .unwrap();
    assert!(signed.v == 37 || signed.v == 38);
    assert!(signed.serialized.starts_with("0xf8"));

    let message = wallet
        .eth_sign_message(&EthSignMessage {
            address_n: path("m/44'/60'/0'/0/0"),
            message: "gm".into(),
        })
        .await
        .unwrap();
    let verify = EthVerifyMessage {
        address: message.address.clone(),
        message: "gm".into(),
        signature: message.signature.clone(),
    };
    assert!(wallet.eth_verify_message(&verify).unwrap());
}

#[tokio::test]
async fn test_ripple_signing() {
    let wallet = abandon().await;
    let request = RippleSignTx {
        address_n: path("m/44'/144'/0'/0/0"),
        tx: RippleTx {
            tx_type: "auth/StdTx".into(),
            value: RippleTxValue {
                fee: RippleFee {
                    amount: vec![RippleCoin { amount: "1000".into(), denom: "drop".into() }],
                    gas: "28000".into(),
                },
                memo: "".into(),
                msg: vec![],
                signatures: None,
            },
        },
        flags: None,
        sequence: "3".into(),
        last_ledger_sequence: "8820051".into(),
        payment: RipplePayment {
            amount: "47000".into(),
            destination: "rHsMGQEkVNJmpGWs8XUBoTBiAAbwxZN5v3".into(),
            destination_tag: Some("1234567890".into()),
        },
    };

    let signed = wallet.ripple_sign_tx(&request).await.unwrap();
    let sigs = signed.value.signatures.unwrap();
    assert_eq!(sigs.len(), 1);
    // Payment transaction type leads the blob
    assert!(sigs[0].serialized_tx.starts_with("120000"));
    assert!(sigs[0].serialized_tx.contains(&sigs[0].signature));
}

fn eos_request(p: &str, from: &str) -> EosSignTx {
    EosSignTx {
        address_n: path(p),
        chain_id: EOS_CHAIN_ID.into(),
        header: EosTxHeader {
            expiration: "2018-06-19T09:53:00".into(),
            ref_block_num: 56_451,
            ref_block_prefix: 1_102_349_203,
            max_net_usage_words: 0,
            max_cpu_usage_ms: 0,
            delay_sec: 0,
        },
        actions: vec![EosAction {
            account: "eosio.token".into(),
            name: "transfer".into(),
            authorization: vec![EosPermissionLevel {
                actor: from.into(),
                permission: "active".into(),
            }],
            data: EosActionData::Transfer(EosTokenTransfer {
                from: from.into(),
                to: "bob".into(),
                quantity: "1.0000 EOS".into(),
                memo: "test".into(),
            }),
        }],
    }
}

#[tokio::test]
async fn test_eos_signatures_are_canonical() {
    let wallet = abandon().await;
    for n in 0..4 {
        let mut request = eos_request("m/44'/194'/0'/0/0", "alice");
        request.header.ref_block_num = n;
        let signed = wallet.eos_sign_tx(&request).await.unwrap();
        assert_eq!(signed.signatures.len(), 1);
        assert!(signed.signatures[0].starts_with("SIG_K1_"));
        let (compact, _) = decode_signature(&signed.signatures[0]).unwrap();
        assert!(is_canonical(&compact));
    }
}

#[tokio::test]
async fn test_fio_envelope() {
    let wallet = abandon().await;
    let signed = wallet
        .fio_sign_tx(&eos_request("m/44'/235'/0'/0/0", "alice"))
        .await
        .unwrap();
    assert!(signed.signature.starts_with("SIG_K1_"));
    assert!(!signed.serialized.is_empty());
}

#[tokio::test]
async fn test_cosmos_envelope_keeps_field_order() {
    let msg = r#"{"type":"cosmos-sdk/MsgSend","value":{"to_address":"cosmos1b","from_address":"cosmos1a","amount":[{"denom":"uatom","amount":"1"}]}}"#;
    let tx: StdTx = serde_json::from_str(&format!(
        r#"{{"msg":[{}],"fee":{{"amount":[{{"amount":"100","denom":"uatom"}}],"gas":"200000"}},"signatures":null,"memo":"order"}}"#,
        msg
    ))
    .unwrap();

    let wallet = abandon().await;
    let signed = wallet
        .cosmos_sign_tx(&CosmosSignTx {
            address_n: path("m/44'/118'/0'/0/0"),
            tx: tx.clone(),
            chain_id: "cosmoshub-4".into(),
            account_number: "16359".into(),
            sequence: "2".into(),
        })
        .await
        .unwrap();

    assert_eq!(serde_json::to_string(&signed.msg[0]).unwrap(), msg);
    assert_eq!(signed.fee, tx.fee);
    assert_eq!(signed.memo, tx.memo);
    assert_eq!(signed.signatures.map(|s| s.len()), Some(1));
}
