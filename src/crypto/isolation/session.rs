//! Master secret loading
//!
//! Turns a mnemonic phrase or raw seed into the 64-byte BIP39 seed held by a
//! session. Nothing here is retained past the returned `SessionSecret`.

use bip39::{Language, Mnemonic};
use secrecy::{ExposeSecret, SecretString};
use unicode_normalization::UnicodeNormalization;
use zeroize::Zeroizing;

use crate::crypto::curves::CurveType;
use crate::error::{WalletError, WalletResult};

const VALID_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

/// Secret material accepted by `load_device`
pub enum MasterSecret {
    Mnemonic(SecretString),
    Seed(Zeroizing<Vec<u8>>),
}

impl MasterSecret {
    pub fn mnemonic(phrase: impl Into<String>) -> Self {
        MasterSecret::Mnemonic(SecretString::from(phrase.into()))
    }

    pub fn seed(bytes: impl Into<Vec<u8>>) -> Self {
        MasterSecret::Seed(Zeroizing::new(bytes.into()))
    }
}

impl std::fmt::Debug for MasterSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MasterSecret::Mnemonic(_) => f.write_str("MasterSecret::Mnemonic([REDACTED])"),
            MasterSecret::Seed(_) => f.write_str("MasterSecret::Seed([REDACTED])"),
        }
    }
}

/// Options applied while loading a secret
pub struct LoadOptions {
    /// Accept a phrase whose BIP39 checksum does not verify
    pub skip_checksum: bool,
    pub passphrase: Option<SecretString>,
    /// Curves this session may derive on
    pub allowed_curves: Vec<CurveType>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            skip_checksum: false,
            passphrase: None,
            allowed_curves: vec![CurveType::Secp256k1, CurveType::Ed25519],
        }
    }
}

impl LoadOptions {
    pub fn skip_checksum(mut self, skip: bool) -> Self {
        self.skip_checksum = skip;
        self
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(SecretString::from(passphrase.into()));
        self
    }

    pub fn with_curves(mut self, curves: Vec<CurveType>) -> Self {
        self.allowed_curves = curves;
        self
    }
}

/// Seed plus curve policy for one loaded session
pub(crate) struct SessionSecret {
    pub(crate) seed: Zeroizing<Vec<u8>>,
    pub(crate) allowed_curves: Vec<CurveType>,
}

pub(crate) fn seed_from_secret(
    secret: MasterSecret,
    options: &LoadOptions,
) -> WalletResult<SessionSecret> {
    if options.allowed_curves.is_empty() {
        return Err(WalletError::invalid_input("Session must allow at least one curve"));
    }

    let seed = match secret {
        MasterSecret::Mnemonic(phrase) => {
            let passphrase = options
                .passphrase
                .as_ref()
                .map(|p| p.expose_secret())
                .unwrap_or("");
            mnemonic_to_seed(phrase.expose_secret(), passphrase, options.skip_checksum)?
        }
        MasterSecret::Seed(bytes) => {
            if bytes.len() < 16 || bytes.len() > 64 {
                return Err(WalletError::invalid_secret(format!(
                    "Seed must be 16 to 64 bytes, got {}",
                    bytes.len()
                )));
            }
            bytes
        }
    };

    Ok(SessionSecret {
        seed,
        allowed_curves: options.allowed_curves.clone(),
    })
}

/// BIP39 seed of the NFKD phrase and passphrase
pub(crate) fn mnemonic_to_seed(
    phrase: &str,
    passphrase: &str,
    skip_checksum: bool,
) -> WalletResult<Zeroizing<Vec<u8>>> {
    let normalized: Zeroizing<String> = Zeroizing::new(phrase.nfkd().collect());
    let words: Vec<&str> = normalized.split_whitespace().collect();

    if !VALID_WORD_COUNTS.contains(&words.len()) {
        return Err(WalletError::invalid_secret(format!(
            "Mnemonic must have 12, 15, 18, 21 or 24 words, got {}",
            words.len()
        )));
    }

    let word_list = Language::English.word_list();
    if let Some(pos) = words.iter().position(|w| !word_list.iter().any(|known| known == w)) {
        return Err(WalletError::invalid_secret(format!(
            "Word {} is not in the English word list",
            pos + 1
        )));
    }

    let joined = Zeroizing::new(words.join(" "));
    let mnemonic = if skip_checksum {
        Mnemonic::parse_in_normalized_without_checksum_check(Language::English, &joined)?
    } else {
        Mnemonic::parse_in_normalized(Language::English, &joined)?
    };

    let passphrase: Zeroizing<String> = Zeroizing::new(passphrase.nfkd().collect());
    let seed = Zeroizing::new(mnemonic.to_seed_normalized(&passphrase));
    Ok(Zeroizing::new(seed.to_vec()))
}
