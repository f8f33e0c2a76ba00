//! Unified error types for the wallet core
//!
//! Every fallible operation in the crate returns a `WalletError` carrying an
//! `ErrorCode`, so callers branch on the code rather than on message text.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for all wallet operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
}

impl WalletError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// True if this error carries the given code
    pub fn is(&self, code: ErrorCode) -> bool {
        self.code == code
    }

    // Convenience constructors
    pub fn invalid_secret(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidSecret, msg)
    }

    pub fn session_not_loaded() -> Self {
        Self::new(ErrorCode::SessionNotLoaded, "No master secret is loaded")
    }

    pub fn session_invalidated() -> Self {
        Self::new(
            ErrorCode::SessionInvalidated,
            "Key handle belongs to a wiped or reloaded session",
        )
    }

    pub fn unsupported_path(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnsupportedPath, msg)
    }

    pub fn unsupported_curve(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnsupportedCurve, msg)
    }

    pub fn signing_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SigningFailed, msg)
    }

    pub fn not_implemented(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotImplemented, msg)
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, msg)
    }

    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidPath, msg)
    }

    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidAddress, msg)
    }

    pub fn invalid_transaction(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidTransaction, msg)
    }

    pub fn crypto_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::CryptoError, msg)
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::TransportError, msg)
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Cancelled, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, msg)
    }
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for WalletError {}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Session errors
    InvalidSecret,
    SessionNotLoaded,
    SessionInvalidated,

    // Path and curve errors
    InvalidPath,
    UnsupportedPath,
    UnsupportedCurve,

    // Input errors
    InvalidInput,
    InvalidAddress,
    InvalidTransaction,

    // Crypto errors
    CryptoError,
    SigningFailed,

    // Parse errors
    JsonError,
    HexError,

    // Collaborator errors
    TransportError,
    Cancelled,

    // Internal
    Internal,
    NotImplemented,
}

/// Result type alias for wallet operations
pub type WalletResult<T> = Result<T, WalletError>;

// Conversions from common error types

impl From<serde_json::Error> for WalletError {
    fn from(e: serde_json::Error) -> Self {
        WalletError::new(ErrorCode::JsonError, e.to_string())
    }
}

impl From<hex::FromHexError> for WalletError {
    fn from(e: hex::FromHexError) -> Self {
        WalletError::new(ErrorCode::HexError, e.to_string())
    }
}

impl From<bitcoin::bip32::Error> for WalletError {
    fn from(e: bitcoin::bip32::Error) -> Self {
        WalletError::new(ErrorCode::CryptoError, format!("BIP32 error: {}", e))
    }
}

impl From<secp256k1::Error> for WalletError {
    fn from(e: secp256k1::Error) -> Self {
        WalletError::new(ErrorCode::CryptoError, format!("Secp256k1 error: {}", e))
    }
}

impl From<bip39::Error> for WalletError {
    fn from(e: bip39::Error) -> Self {
        WalletError::new(ErrorCode::InvalidSecret, format!("BIP39 error: {}", e))
    }
}

impl From<bech32::Error> for WalletError {
    fn from(e: bech32::Error) -> Self {
        WalletError::new(ErrorCode::InvalidAddress, format!("Bech32 error: {}", e))
    }
}

impl From<crate::crypto::curves::CurveError> for WalletError {
    fn from(e: crate::crypto::curves::CurveError) -> Self {
        use crate::crypto::curves::CurveError;
        match e {
            CurveError::SigningFailed(_) => WalletError::signing_failed(e.to_string()),
            CurveError::UnsupportedCurve(_) => WalletError::unsupported_curve(e.to_string()),
            CurveError::NonHardenedSegment(_) => WalletError::unsupported_path(e.to_string()),
            _ => WalletError::crypto_error(e.to_string()),
        }
    }
}

impl From<crate::signing::PreImageError> for WalletError {
    fn from(e: crate::signing::PreImageError) -> Self {
        use crate::signing::PreImageError;
        match e {
            PreImageError::InvalidAddress(_) => WalletError::invalid_address(e.to_string()),
            PreImageError::InvalidSignature(_) | PreImageError::PublicKeyMismatch => {
                WalletError::signing_failed(e.to_string())
            }
            _ => WalletError::invalid_transaction(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = WalletError::unsupported_path("m/44'/60'/0'")
            .with_details("expected 5 segments");

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("unsupported_path"));
        assert!(json.contains("expected 5 segments"));
    }

    #[test]
    fn test_error_code_match() {
        let err = WalletError::session_not_loaded();
        assert!(err.is(ErrorCode::SessionNotLoaded));
        assert!(!err.is(ErrorCode::SessionInvalidated));
        assert!(err.to_string().starts_with("[SessionNotLoaded]"));
    }

    #[test]
    fn test_bip39_error_maps_to_invalid_secret() {
        let err: WalletError = bip39::Error::BadWordCount(5).into();
        assert_eq!(err.code, ErrorCode::InvalidSecret);
    }
}
