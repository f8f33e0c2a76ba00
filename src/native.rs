//! Native (software) HD wallet
//!
//! `NativeHDWalletInfo` answers describe-only questions from configuration.
//! `NativeHDWallet` adds a `KeyIsolationCore` session and routes each chain
//! operation through its adapter. The session is in-memory only: nothing is
//! persisted, and `wipe` drops every secret.

use std::sync::Arc;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::bitcoin_wallet::{
    encode_message_signature as encode_btc_message_signature, script_type_for_path, signed_message_digest,
    BitcoinAdapter, BtcSignMessage, BtcSignTx, BtcSignedMessage, BtcSignedTx,
};
use crate::capabilities::{CapabilitySet, HdWalletInfo};
use crate::cosmos_wallet::{CosmosAdapter, CosmosSignTx, StdTx};
use crate::crypto::curves::{CurveType, SignatureFormat};
use crate::crypto::isolation::{KeyIsolationCore, LoadOptions, MasterSecret};
use crate::eos_wallet::{AntelopeAdapter, EosSignTx, EosSignedTx, FioSignedTx};
use crate::error::{WalletError, WalletResult};
use crate::ethereum_wallet::{
    encode_message_signature as encode_eth_message_signature, personal_message_digest, verify_message,
    EthSignMessage, EthSignTx, EthSignedMessage, EthSignedTx, EthVerifyMessage, EthereumAdapter,
};
use crate::signing::{self, ChainAdapter};
use crate::types::{AccountPath, BtcScriptType, Chain, PathDescription};
use crate::utils::wallet_config::WalletConfig;
use crate::wallet::account_paths::{account_paths, next_account_path};
use crate::wallet::derivation_path::{describe_path, Bip32Path};
use crate::xrp_wallet::{RippleAdapter, RippleSignTx, RippleTx};
use crate::{log_debug, log_info, log_warn};

const FIRMWARE_VERSION: &str = "Software";

// MARK: - Request types

/// Secret and options for `load_device`
#[derive(Debug)]
pub struct LoadDevice {
    pub secret: MasterSecret,
    pub label: Option<String>,
    pub passphrase: Option<SecretString>,
    pub skip_checksum: bool,
}

impl LoadDevice {
    pub fn mnemonic(phrase: impl Into<String>) -> Self {
        Self {
            secret: MasterSecret::mnemonic(phrase),
            label: None,
            passphrase: None,
            skip_checksum: false,
        }
    }

    pub fn seed(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: MasterSecret::seed(bytes),
            label: None,
            passphrase: None,
            skip_checksum: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(SecretString::from(passphrase.into()));
        self
    }

    pub fn skip_checksum(mut self, skip: bool) -> Self {
        self.skip_checksum = skip;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetPublicKey {
    pub address_n: Bip32Path,
    /// `"secp256k1"` or `"ed25519"`
    pub curve: String,
    #[serde(default)]
    pub show_display: bool,
    #[serde(default)]
    pub script_type: Option<BtcScriptType>,
    #[serde(default)]
    pub coin: Option<Chain>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    pub xpub: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ping {
    pub msg: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pong {
    pub msg: String,
}

// MARK: - Info

/// Describe-only native wallet
#[derive(Debug, Clone)]
pub struct NativeHDWalletInfo {
    config: Arc<WalletConfig>,
    capabilities: CapabilitySet,
}

impl Default for NativeHDWalletInfo {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeHDWalletInfo {
    pub fn new() -> Self {
        Self::with_config(WalletConfig::standard())
    }

    pub fn with_config(config: WalletConfig) -> Self {
        Self {
            config: Arc::new(config),
            capabilities: CapabilitySet::info_only(),
        }
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    fn require_info(&self, chain: Chain) -> WalletResult<()> {
        if !self.capabilities.supports_info(chain) {
            return Err(WalletError::not_implemented(format!("{} is not supported", chain)));
        }
        Ok(())
    }
}

impl HdWalletInfo for NativeHDWalletInfo {
    fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    fn vendor(&self) -> &str {
        &self.config.vendor
    }

    fn has_on_device_display(&self) -> bool {
        false
    }

    fn has_on_device_pin_entry(&self) -> bool {
        false
    }

    fn has_on_device_passphrase(&self) -> bool {
        false
    }

    fn has_on_device_recovery(&self) -> bool {
        false
    }

    fn has_native_shapeshift(&self, _src: Chain, _dst: Chain) -> bool {
        false
    }

    fn describe_path(&self, path: &Bip32Path, chain: Chain) -> PathDescription {
        describe_path(path, chain)
    }

    fn get_account_paths(&self, chain: Chain, account_idx: u32) -> WalletResult<Vec<AccountPath>> {
        self.require_info(chain)?;
        account_paths(chain, account_idx)
    }

    fn next_account_path(&self, path: &AccountPath) -> Option<AccountPath> {
        if !self.capabilities.supports_info(path.chain) {
            return None;
        }
        next_account_path(path, &self.config)
    }
}

// MARK: - Full wallet

#[derive(Debug)]
pub struct NativeHDWallet {
    device_id: String,
    info: NativeHDWalletInfo,
    core: KeyIsolationCore,
    label: RwLock<String>,
}

impl NativeHDWallet {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self::with_config(device_id, WalletConfig::standard())
    }

    pub fn with_config(device_id: impl Into<String>, config: WalletConfig) -> Self {
        for warning in config.warnings() {
            log_warn!("native", "Configuration warning", detail = warning);
        }
        let label = config.label.clone();
        Self {
            device_id: device_id.into(),
            info: NativeHDWalletInfo {
                config: Arc::new(config),
                capabilities: CapabilitySet::native(),
            },
            core: KeyIsolationCore::new(),
            label: RwLock::new(label),
        }
    }

    /// Describe-only view of this wallet
    pub fn info(&self) -> &NativeHDWalletInfo {
        &self.info
    }

    fn config(&self) -> &WalletConfig {
        &self.info.config
    }

    fn require(&self, chain: Chain) -> WalletResult<()> {
        if !self.info.capabilities.supports(chain) {
            return Err(WalletError::not_implemented(format!("{} signing is not supported", chain)));
        }
        Ok(())
    }

    fn strict(&self, chain: Chain) -> bool {
        self.config().strict_paths(chain)
    }

    async fn address<A: ChainAdapter>(&self, adapter: &A, path: &Bip32Path, show_display: bool) -> WalletResult<String> {
        let chain = adapter.chain();
        self.require(chain)?;
        let address = signing::get_address(adapter, &self.core, path, self.strict(chain)).await?;
        if show_display {
            log_debug!("native", "No display; address returned only", chain = chain);
        }
        log_debug!("native", "Address derived", chain = chain, path = path, address = address);
        Ok(address)
    }

    async fn sign<A: ChainAdapter>(&self, adapter: &A, request: &A::SignRequest) -> WalletResult<A::Signed> {
        let chain = adapter.chain();
        self.require(chain)?;
        match signing::sign_request(adapter, &self.core, request, self.strict(chain)).await {
            Ok(signed) => {
                log_info!("native", "Transaction signed", chain = chain);
                Ok(signed)
            }
            Err(e) => {
                log_warn!("native", "Signing failed", chain = chain, error = e);
                Err(e)
            }
        }
    }

    fn cosmos_family(&self, chain: Chain) -> WalletResult<CosmosAdapter> {
        CosmosAdapter::for_chain(chain, self.config().binance_address_mode.clone())
    }

    // MARK: Device surface

    pub fn get_device_id(&self) -> &str {
        &self.device_id
    }

    pub async fn get_label(&self) -> String {
        self.label.read().await.clone()
    }

    pub fn get_model(&self) -> &str {
        &self.config().model
    }

    pub fn get_firmware_version(&self) -> &str {
        FIRMWARE_VERSION
    }

    pub async fn get_features(&self) -> Value {
        json!({
            "vendor": self.info.vendor(),
            "model": self.get_model(),
            "label": self.get_label().await,
            "device_id": self.device_id,
            "firmware_version": FIRMWARE_VERSION,
            "initialized": self.is_initialized().await,
        })
    }

    pub async fn is_initialized(&self) -> bool {
        self.core.is_loaded().await
    }

    /// There is no PIN, so the wallet never locks
    pub async fn is_locked(&self) -> bool {
        false
    }

    pub async fn initialize(&self) -> WalletResult<()> {
        Ok(())
    }

    pub async fn load_device(&self, request: LoadDevice) -> WalletResult<()> {
        let mut options = LoadOptions::default()
            .skip_checksum(request.skip_checksum)
            .with_curves(self.config().allowed_curves.clone());
        options.passphrase = request.passphrase;
        self.core.load(request.secret, options).await?;
        if let Some(label) = request.label {
            *self.label.write().await = label;
        }
        log_info!("native", "Device loaded", device_id = self.device_id);
        Ok(())
    }

    /// Drop the loaded secret. Every outstanding key handle stops working.
    pub async fn clear_session(&self) -> WalletResult<()> {
        self.core.clear().await;
        Ok(())
    }

    /// Drop the secret and restore the configured label
    pub async fn wipe(&self) -> WalletResult<()> {
        self.core.clear().await;
        *self.label.write().await = self.config().label.clone();
        log_info!("native", "Device wiped", device_id = self.device_id);
        Ok(())
    }

    pub async fn disconnect(&self) -> WalletResult<()> {
        Ok(())
    }

    pub async fn ping(&self, msg: Ping) -> WalletResult<Pong> {
        Ok(Pong { msg: msg.msg })
    }

    /// Nothing waits on user input, so there is nothing to cancel
    pub async fn cancel(&self) -> WalletResult<()> {
        log_debug!("native", "Cancel requested");
        Ok(())
    }

    /// Extended public keys; `None` for curves without BIP32 xpubs
    pub async fn get_public_keys(&self, requests: &[GetPublicKey]) -> WalletResult<Vec<Option<PublicKey>>> {
        let mut out = Vec::with_capacity(requests.len());
        for request in requests {
            match CurveType::parse(&request.curve) {
                Some(CurveType::Secp256k1) => {
                    let xpub = self.core.xpub(&request.address_n).await?;
                    out.push(Some(PublicKey { xpub }));
                }
                Some(CurveType::Ed25519) => out.push(None),
                None => {
                    return Err(WalletError::unsupported_curve(format!(
                        "Unknown curve '{}'",
                        request.curve
                    )))
                }
            }
        }
        Ok(out)
    }

    pub async fn send_pin(&self, _pin: &str) -> WalletResult<()> {
        Err(WalletError::not_implemented("send_pin"))
    }

    pub async fn send_passphrase(&self, _passphrase: &str) -> WalletResult<()> {
        Err(WalletError::not_implemented("send_passphrase"))
    }

    pub async fn send_character(&self, _character: &str) -> WalletResult<()> {
        Err(WalletError::not_implemented("send_character"))
    }

    pub async fn send_word(&self, _word: &str) -> WalletResult<()> {
        Err(WalletError::not_implemented("send_word"))
    }

    pub async fn reset(&self) -> WalletResult<()> {
        Err(WalletError::not_implemented("reset"))
    }

    pub async fn recover(&self) -> WalletResult<()> {
        Err(WalletError::not_implemented("recover"))
    }

    // MARK: Bitcoin

    pub async fn btc_get_address(
        &self,
        path: &Bip32Path,
        script_type: Option<BtcScriptType>,
        show_display: bool,
    ) -> WalletResult<String> {
        self.address(&BitcoinAdapter::with_script_type(script_type), path, show_display)
            .await
    }

    pub async fn btc_sign_tx(&self, request: &BtcSignTx) -> WalletResult<BtcSignedTx> {
        self.sign(&BitcoinAdapter::new(), request).await
    }

    pub async fn btc_sign_message(&self, request: &BtcSignMessage) -> WalletResult<BtcSignedMessage> {
        let adapter = BitcoinAdapter::with_script_type(request.script_type);
        self.require(Chain::Bitcoin)?;
        let key = signing::derive_key(&adapter, &self.core, &request.address_n, self.strict(Chain::Bitcoin)).await?;

        let digest = signed_message_digest(&request.message);
        let raw = key.sign(&digest, SignatureFormat::Recoverable).await?;
        let compact = raw
            .compact()
            .ok_or_else(|| WalletError::signing_failed("Expected a 64-byte signature"))?;
        let recovery_id = raw
            .recovery_id
            .ok_or_else(|| WalletError::signing_failed("Missing recovery id"))?;

        let script_type = request
            .script_type
            .unwrap_or_else(|| script_type_for_path(&request.address_n));
        Ok(BtcSignedMessage {
            address: adapter.render_address(key.public_key(), &request.address_n)?,
            signature: encode_btc_message_signature(&compact, recovery_id, script_type),
        })
    }

    // MARK: Ethereum

    pub async fn eth_get_address(&self, path: &Bip32Path, show_display: bool) -> WalletResult<String> {
        self.address(&EthereumAdapter, path, show_display).await
    }

    pub async fn eth_sign_tx(&self, request: &EthSignTx) -> WalletResult<EthSignedTx> {
        self.sign(&EthereumAdapter, request).await
    }

    pub async fn eth_sign_message(&self, request: &EthSignMessage) -> WalletResult<EthSignedMessage> {
        self.require(Chain::Ethereum)?;
        let key = signing::derive_key(
            &EthereumAdapter,
            &self.core,
            &request.address_n,
            self.strict(Chain::Ethereum),
        )
        .await?;

        let digest = personal_message_digest(request.message.as_bytes());
        let raw = key.sign(&digest, SignatureFormat::Recoverable).await?;
        let compact = raw
            .compact()
            .ok_or_else(|| WalletError::signing_failed("Expected a 64-byte signature"))?;
        let recovery_id = raw
            .recovery_id
            .ok_or_else(|| WalletError::signing_failed("Missing recovery id"))?;

        Ok(EthSignedMessage {
            address: EthereumAdapter.render_address(key.public_key(), &request.address_n)?,
            signature: encode_eth_message_signature(&compact, recovery_id),
        })
    }

    pub fn eth_verify_message(&self, request: &EthVerifyMessage) -> WalletResult<bool> {
        verify_message(request)
    }

    // MARK: Cosmos family

    pub async fn cosmos_get_address(&self, path: &Bip32Path, show_display: bool) -> WalletResult<String> {
        self.address(&self.cosmos_family(Chain::Cosmos)?, path, show_display).await
    }

    pub async fn cosmos_sign_tx(&self, request: &CosmosSignTx) -> WalletResult<StdTx> {
        self.sign(&self.cosmos_family(Chain::Cosmos)?, request).await
    }

    pub async fn binance_get_address(&self, path: &Bip32Path, show_display: bool) -> WalletResult<String> {
        self.address(&self.cosmos_family(Chain::Binance)?, path, show_display).await
    }

    pub async fn binance_sign_tx(&self, request: &CosmosSignTx) -> WalletResult<StdTx> {
        self.sign(&self.cosmos_family(Chain::Binance)?, request).await
    }

    pub async fn thorchain_get_address(&self, path: &Bip32Path, show_display: bool) -> WalletResult<String> {
        self.address(&self.cosmos_family(Chain::Thorchain)?, path, show_display).await
    }

    pub async fn thorchain_sign_tx(&self, request: &CosmosSignTx) -> WalletResult<StdTx> {
        self.sign(&self.cosmos_family(Chain::Thorchain)?, request).await
    }

    // MARK: Ripple

    pub async fn ripple_get_address(&self, path: &Bip32Path, show_display: bool) -> WalletResult<String> {
        self.address(&RippleAdapter, path, show_display).await
    }

    pub async fn ripple_sign_tx(&self, request: &RippleSignTx) -> WalletResult<RippleTx> {
        self.sign(&RippleAdapter, request).await
    }

    // MARK: Antelope

    pub async fn eos_get_public_key(&self, path: &Bip32Path, show_display: bool) -> WalletResult<String> {
        self.address(&AntelopeAdapter::eos(), path, show_display).await
    }

    pub async fn eos_sign_tx(&self, request: &EosSignTx) -> WalletResult<EosSignedTx> {
        self.sign(&AntelopeAdapter::eos(), request).await
    }

    pub async fn fio_get_public_key(&self, path: &Bip32Path, show_display: bool) -> WalletResult<String> {
        self.address(&AntelopeAdapter::fio(), path, show_display).await
    }

    pub async fn fio_sign_tx(&self, request: &EosSignTx) -> WalletResult<FioSignedTx> {
        Ok(self.sign(&AntelopeAdapter::fio(), request).await?.into())
    }
}
