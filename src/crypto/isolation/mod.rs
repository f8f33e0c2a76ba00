//! Key isolation core
//!
//! Owns the session's master seed and hands out `IsolatedKeyHandle`s. The seed
//! lives behind a `tokio::sync::RwLock`:
//! - `derive` and handle signing hold the read lock
//! - `load` and `clear` take the write lock and bump the generation
//!
//! Private scalars never leave this module.

mod key_handle;
mod session;

pub use key_handle::IsolatedKeyHandle;
pub use session::{LoadOptions, MasterSecret};

use std::sync::Arc;
use tokio::sync::RwLock;

use bitcoin::bip32::{Xpriv, Xpub};
use bitcoin::Network;

use crate::crypto::curves::{self, secp256k1::context, CurveType};
use crate::error::{WalletError, WalletResult};
use crate::wallet::derivation_path::Bip32Path;
use crate::{log_debug, log_info};
use key_handle::{SessionState, SharedSession};

pub struct KeyIsolationCore {
    session: SharedSession,
}

impl std::fmt::Debug for KeyIsolationCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyIsolationCore([REDACTED])")
    }
}

impl Default for KeyIsolationCore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyIsolationCore {
    pub fn new() -> Self {
        Self {
            session: Arc::new(RwLock::new(SessionState {
                secret: None,
                generation: 0,
            })),
        }
    }

    /// Replace the session secret. Handles from any earlier secret are
    /// invalidated.
    pub async fn load(&self, secret: MasterSecret, options: LoadOptions) -> WalletResult<()> {
        let loaded = session::seed_from_secret(secret, &options)?;
        let mut state = self.session.write().await;
        state.secret = Some(loaded);
        state.generation += 1;
        log_info!("isolation", "Session loaded", generation = state.generation);
        Ok(())
    }

    /// Erase the session secret. Safe to call when nothing is loaded.
    pub async fn clear(&self) {
        let mut state = self.session.write().await;
        let had_secret = state.secret.take().is_some();
        state.generation += 1;
        log_info!(
            "isolation",
            "Session cleared",
            generation = state.generation,
            had_secret = had_secret
        );
    }

    pub async fn is_loaded(&self) -> bool {
        self.session.read().await.secret.is_some()
    }

    pub async fn generation(&self) -> u64 {
        self.session.read().await.generation
    }

    /// Derive a handle for `path` on `curve`
    pub async fn derive(&self, path: &Bip32Path, curve: CurveType) -> WalletResult<IsolatedKeyHandle> {
        let state = self.session.read().await;
        let secret = state.secret.as_ref().ok_or_else(WalletError::session_not_loaded)?;

        if !secret.allowed_curves.contains(&curve) {
            return Err(WalletError::unsupported_curve(format!(
                "Curve {} is not enabled for this session",
                curve
            )));
        }

        let derived = curves::derive_secret(curve, &secret.seed, path.as_slice())?;
        let public_key = curves::public_key(curve, &derived)?;
        log_debug!("isolation", "Derived key", path = path, curve = curve);

        Ok(IsolatedKeyHandle::new(
            Arc::clone(&self.session),
            state.generation,
            curve,
            path.clone(),
            public_key,
        ))
    }

    /// BIP32 extended public key at `path` (secp256k1 only)
    pub async fn xpub(&self, path: &Bip32Path) -> WalletResult<String> {
        let state = self.session.read().await;
        let secret = state.secret.as_ref().ok_or_else(WalletError::session_not_loaded)?;
        if !secret.allowed_curves.contains(&CurveType::Secp256k1) {
            return Err(WalletError::unsupported_curve("secp256k1 is not enabled for this session"));
        }

        let mut xpriv = Xpriv::new_master(Network::Bitcoin, &secret.seed)?
            .derive_priv(context(), &path.to_bitcoin())?;
        let xpub = Xpub::from_priv(context(), &xpriv);
        xpriv.private_key.non_secure_erase();
        Ok(xpub.to_string())
    }
}
