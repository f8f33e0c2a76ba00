//! Chain adapters and the signing driver
//!
//! Signing runs in three steps:
//! 1. the adapter computes pre-image digests from the request
//! 2. each digest is signed through an isolated key handle
//! 3. the adapter compiles the signatures into the chain's signed envelope
//!
//! Adapters never see private keys; they only get handles and signatures.

pub mod preimage;

pub use preimage::*;

use crate::crypto::curves::CurveType;
use crate::crypto::isolation::{IsolatedKeyHandle, KeyIsolationCore};
use crate::error::{WalletError, WalletResult};
use crate::types::{Chain, PathDescription};
use crate::wallet::derivation_path::{describe_path, Bip32Path};
use crate::{log_debug, log_warn};

/// Per-chain address rendering and transaction assembly
pub trait ChainAdapter {
    type SignRequest;
    type Signed;

    fn chain(&self) -> Chain;

    fn curve(&self) -> CurveType {
        CurveType::Secp256k1
    }

    fn describe_path(&self, path: &Bip32Path) -> PathDescription {
        describe_path(path, self.chain())
    }

    /// Path actually derived for a requested path
    fn key_path(&self, path: &Bip32Path) -> Bip32Path {
        path.clone()
    }

    /// Address for a public key derived at `path`
    fn render_address(&self, public_key: &[u8], path: &Bip32Path) -> WalletResult<String>;

    /// Requested paths whose keys the request needs, in key-index order
    fn signing_paths(&self, request: &Self::SignRequest) -> PreImageResult<Vec<Bip32Path>>;

    fn pre_image(
        &self,
        request: &Self::SignRequest,
        keys: &[IsolatedKeyHandle],
    ) -> PreImageResult<Vec<PreImage>>;

    fn compile(
        &self,
        request: &Self::SignRequest,
        keys: &[IsolatedKeyHandle],
        signatures: &[ExternalSignature],
    ) -> PreImageResult<Self::Signed>;
}

/// Fail with `UnsupportedPath` when `strict` and the path is not recognised
pub fn check_path<A: ChainAdapter + ?Sized>(
    adapter: &A,
    path: &Bip32Path,
    strict: bool,
) -> WalletResult<()> {
    if strict && !adapter.describe_path(path).is_known {
        log_warn!("signing", "Rejected unrecognised path", chain = adapter.chain(), path = path);
        return Err(WalletError::unsupported_path(format!(
            "{} is not a recognised {} path",
            path,
            adapter.chain()
        )));
    }
    Ok(())
}

/// Derive a handle for one requested path
pub async fn derive_key<A: ChainAdapter + ?Sized>(
    adapter: &A,
    core: &KeyIsolationCore,
    path: &Bip32Path,
    strict: bool,
) -> WalletResult<IsolatedKeyHandle> {
    check_path(adapter, path, strict)?;
    core.derive(&adapter.key_path(path), adapter.curve()).await
}

/// Address at `path`
pub async fn get_address<A: ChainAdapter + ?Sized>(
    adapter: &A,
    core: &KeyIsolationCore,
    path: &Bip32Path,
    strict: bool,
) -> WalletResult<String> {
    let key = derive_key(adapter, core, path, strict).await?;
    adapter.render_address(key.public_key(), path)
}

/// Run the full pre-image, sign, compile sequence. Nothing is kept on failure.
pub async fn sign_request<A: ChainAdapter + ?Sized>(
    adapter: &A,
    core: &KeyIsolationCore,
    request: &A::SignRequest,
    strict: bool,
) -> WalletResult<A::Signed> {
    let paths = adapter.signing_paths(request)?;
    if paths.is_empty() {
        return Err(WalletError::invalid_transaction("Request has nothing to sign"));
    }

    let mut keys = Vec::with_capacity(paths.len());
    for path in &paths {
        keys.push(derive_key(adapter, core, path, strict).await?);
    }

    let pre_images = adapter.pre_image(request, &keys)?;
    let mut signatures = Vec::with_capacity(pre_images.len());
    for pre in &pre_images {
        let key = keys
            .get(pre.key_index)
            .ok_or(PreImageError::InvalidInputIndex(pre.key_index))?;
        log_debug!("signing", "Signing pre-image", chain = adapter.chain(), digest = pre.digest_hex());
        let raw = key.sign(&pre.digest, pre.format).await?;
        signatures.push(ExternalSignature::from_raw(raw, key.public_key(), pre.input_index));
    }

    Ok(adapter.compile(request, &keys, &signatures)?)
}
