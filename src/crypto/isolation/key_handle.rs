//! Isolated key handles
//!
//! A handle names a key (curve + path) and carries its public key. It holds no
//! private material: every signature re-derives the scalar from the session
//! seed under the session read lock, and the scalar is wiped before `sign`
//! returns. A handle minted before a wipe or reload can no longer sign.

use std::sync::Arc;
use tokio::sync::RwLock;

use super::session::SessionSecret;
use crate::crypto::curves::{self, CurveType, RawSignature, SignatureFormat};
use crate::error::{WalletError, WalletResult};
use crate::wallet::derivation_path::Bip32Path;

pub(crate) struct SessionState {
    pub(crate) secret: Option<SessionSecret>,
    pub(crate) generation: u64,
}

pub(crate) type SharedSession = Arc<RwLock<SessionState>>;

pub struct IsolatedKeyHandle {
    session: SharedSession,
    generation: u64,
    curve: CurveType,
    path: Bip32Path,
    public_key: Vec<u8>,
}

impl IsolatedKeyHandle {
    pub(crate) fn new(
        session: SharedSession,
        generation: u64,
        curve: CurveType,
        path: Bip32Path,
        public_key: Vec<u8>,
    ) -> Self {
        Self {
            session,
            generation,
            curve,
            path,
            public_key,
        }
    }

    pub fn curve(&self) -> CurveType {
        self.curve
    }

    pub fn path(&self) -> &Bip32Path {
        &self.path
    }

    /// Compressed SEC1 (33 bytes) or raw ed25519 (32 bytes)
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Session generation this handle was derived in
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Sign a 32-byte digest (or, for ed25519, the message itself).
    ///
    /// Fails with `SessionInvalidated` if the session was wiped or reloaded
    /// after this handle was derived.
    pub async fn sign(&self, payload: &[u8], format: SignatureFormat) -> WalletResult<RawSignature> {
        let guard = self.session.read().await;
        let secret = match guard.secret.as_ref() {
            Some(s) if guard.generation == self.generation => s,
            _ => return Err(WalletError::session_invalidated()),
        };

        let derived = curves::derive_secret(self.curve, &secret.seed, self.path.as_slice())?;
        let signature = curves::sign(self.curve, &derived, payload, format)?;
        Ok(signature)
    }
}

impl std::fmt::Debug for IsolatedKeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IsolatedKeyHandle")
            .field("curve", &self.curve)
            .field("path", &self.path.to_string())
            .field("public_key", &hex::encode(&self.public_key))
            .field("generation", &self.generation)
            .finish()
    }
}
