//! Structured logging for wallet operations
//!
//! Entries are emitted as one line on stderr with a UTC timestamp. Field values
//! are redacted by key name before they are stored on the entry:
//! - secret material (mnemonic, seed, private scalars, xprv) is never printed
//! - addresses and public keys keep a short prefix and suffix
//! - digests and txids are shortened

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);
static MIN_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

/// Enable debug logging
pub fn enable_debug() {
    DEBUG_ENABLED.store(true, Ordering::SeqCst);
}

/// Disable debug logging
pub fn disable_debug() {
    DEBUG_ENABLED.store(false, Ordering::SeqCst);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::SeqCst)
}

/// Lowest level that reaches stderr. Debug entries additionally need
/// `enable_debug()`.
pub fn set_min_level(level: LogLevel) {
    MIN_LEVEL.store(level as u8, Ordering::SeqCst);
}

fn min_level() -> u8 {
    MIN_LEVEL.load(Ordering::SeqCst)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Structured log entry
#[derive(Debug)]
pub struct LogEntry {
    pub level: LogLevel,
    pub module: &'static str,
    pub message: String,
    pub fields: Vec<(&'static str, String)>,
}

impl LogEntry {
    pub fn new(level: LogLevel, module: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            module,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field, redacted according to its key
    pub fn field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        let value = redact_for_key(key, &value.to_string());
        self.fields.push((key, value));
        self
    }

    /// Add a field that is always fully redacted
    pub fn secret_field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.fields.push((key, redact_secret(&value.to_string())));
        self
    }

    fn enabled(&self) -> bool {
        if self.level == LogLevel::Debug && !is_debug_enabled() {
            return false;
        }
        self.level == LogLevel::Debug || self.level as u8 >= min_level()
    }

    /// Render the entry without the timestamp
    pub fn render(&self) -> String {
        let mut line = format!("{} [{}] {}", self.level, self.module, self.message);
        if !self.fields.is_empty() {
            line.push_str(" |");
            for (k, v) in &self.fields {
                line.push(' ');
                line.push_str(k);
                line.push('=');
                line.push_str(v);
            }
        }
        line
    }

    pub fn log(self) {
        if !self.enabled() {
            return;
        }
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
        eprintln!("[{}] {}", timestamp, self.render());
    }
}

// MARK: - Redaction

const SECRET_KEYS: &[&str] = &[
    "mnemonic", "seed", "secret", "private", "scalar", "xprv", "passphrase", "pin", "wif",
];
const SHORTENED_KEYS: &[&str] = &["address", "pubkey", "public_key", "xpub", "recipient"];
const DIGEST_KEYS: &[&str] = &["digest", "hash", "txid", "signature"];

fn redact_for_key(key: &str, value: &str) -> String {
    let key = key.to_ascii_lowercase();
    if SECRET_KEYS.iter().any(|k| key.contains(k)) {
        return redact_secret(value);
    }
    if SHORTENED_KEYS.iter().any(|k| key.contains(k)) {
        return shorten(value, 6, 4);
    }
    if DIGEST_KEYS.iter().any(|k| key.contains(k)) {
        return shorten(value, 10, 6);
    }
    value.to_string()
}

fn redact_secret(value: &str) -> String {
    if value.is_empty() {
        "[EMPTY]".to_string()
    } else {
        "[REDACTED]".to_string()
    }
}

fn shorten(value: &str, prefix: usize, suffix: usize) -> String {
    let v = value.trim();
    if v.is_empty() {
        return "[EMPTY]".to_string();
    }
    if !v.is_ascii() || v.len() <= prefix + suffix + 3 {
        return v.to_string();
    }
    format!("{}...{}", &v[..prefix], &v[v.len() - suffix..])
}

#[doc(hidden)]
#[macro_export]
macro_rules! __wallet_log {
    ($level:ident, $module:expr, $msg:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::$level,
            $module,
            $msg,
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($t:tt)*) => { $crate::__wallet_log!(Debug, $($t)*) };
}

#[macro_export]
macro_rules! log_info {
    ($($t:tt)*) => { $crate::__wallet_log!(Info, $($t)*) };
}

#[macro_export]
macro_rules! log_warn {
    ($($t:tt)*) => { $crate::__wallet_log!(Warn, $($t)*) };
}

#[macro_export]
macro_rules! log_error {
    ($($t:tt)*) => { $crate::__wallet_log!(Error, $($t)*) };
}
