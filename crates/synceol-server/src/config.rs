//! Gateway configuration.
//!
//! Loads configuration from environment variables with defaults. All settings
//! can be overridden via `SYNCEOL_*` environment variables.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::http::header::InvalidHeaderValue;
use serde::Serialize;
use serde_json::ser::Formatter;
use synceol_core::SecretKey;
use tracing::warn;

/// Alert message sent when none is configured.
pub const DEFAULT_EOL_MESSAGE: &str = "sync has sunk";
/// Alert URL sent when none is configured.
pub const DEFAULT_EOL_URL: &str = "http://example.com";
/// Two days.
pub const DEFAULT_RECORD_TTL_SECS: u64 = 172_800;

/// Server configuration.
#[derive(Debug)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Which cache holds the records.
    pub cache_backend: CacheBackendType,
    /// Namespace prepended to every cache key.
    pub cache_prefix: String,
    /// How long a written record lives.
    pub record_ttl: Duration,
    /// Contents of the `X-Weave-Alert` header.
    pub eol_alert: EolAlert,
    /// Credential-hash secret. `None` means generate one at startup.
    pub secret: Option<SecretKey>,
    /// Maximum number of requests handled at once.
    pub max_concurrency: usize,
    /// How often the in-memory cache drops expired records.
    pub sweep_interval: Duration,
}

/// Supported cache backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackendType {
    /// In-process (development only, records lost on restart).
    Memory,
    /// Redis at the given URL.
    Redis { url: String },
}

impl CacheBackendType {
    /// Short name for logs. Never includes the connection URL.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Redis { .. } => "redis",
        }
    }
}

/// The end-of-life notice carried by every unsupported request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EolAlert {
    /// Human-readable explanation.
    pub message: String,
    /// Where the user should go next.
    pub url: String,
}

impl Default for EolAlert {
    fn default() -> Self {
        Self {
            message: DEFAULT_EOL_MESSAGE.to_owned(),
            url: DEFAULT_EOL_URL.to_owned(),
        }
    }
}

impl EolAlert {
    /// Render as the `X-Weave-Alert` header value: a JSON object with
    /// exactly `code`, `message`, and `url`.
    ///
    /// Non-ASCII characters are written as `\uXXXX` escapes so the header
    /// stays visible ASCII whatever the client decodes it as.
    ///
    /// # Errors
    ///
    /// Returns [`AlertError`] if the JSON cannot be rendered or is not a
    /// legal header value.
    pub fn to_header(&self) -> Result<HeaderValue, AlertError> {
        let body = serde_json::json!({
            "code": "hard-eol",
            "message": self.message,
            "url": self.url,
        });
        let mut rendered = Vec::new();
        let mut serializer = serde_json::Serializer::with_formatter(&mut rendered, AsciiFormatter);
        body.serialize(&mut serializer)?;
        Ok(HeaderValue::from_bytes(&rendered)?)
    }
}

/// Failure to turn an [`EolAlert`] into a header value.
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    /// JSON serialization failed.
    #[error("failed to render EOL alert: {0}")]
    Render(#[from] serde_json::Error),

    /// The rendered alert is not a legal header value.
    #[error("EOL alert is not a valid header value: {0}")]
    Header(#[from] InvalidHeaderValue),
}

/// Compact JSON with every non-ASCII character escaped as UTF-16 `\uXXXX`.
struct AsciiFormatter;

impl Formatter for AsciiFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                let mut byte = [0u8; 1];
                writer.write_all(ch.encode_utf8(&mut byte).as_bytes())?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT` — port to bind on, on all interfaces
    /// - `SYNCEOL_BIND_ADDR` — full bind address (overrides `PORT`, default: `127.0.0.1:8000`)
    /// - `SYNCEOL_CACHE` — `memory` or `redis` (default: `memory`)
    /// - `SYNCEOL_REDIS_URL` / `REDIS_URL` — Redis target (default: `redis://127.0.0.1:6379`)
    /// - `SYNCEOL_CACHE_PREFIX` — cache key namespace (default: empty)
    /// - `SYNCEOL_RECORD_TTL` — record lifetime in seconds (default: `172800`)
    /// - `SYNCEOL_EOL_MESSAGE` — alert message (default: `sync has sunk`)
    /// - `SYNCEOL_EOL_URL` — alert URL (default: `http://example.com`)
    /// - `SYNCEOL_SECRET` — credential-hash secret (default: random per process)
    /// - `SYNCEOL_MAX_CONCURRENCY` — in-flight request limit (default: `1024`)
    /// - `SYNCEOL_SWEEP_INTERVAL` — seconds between in-memory expiry sweeps (default: `60`)
    ///
    /// Values that do not parse are logged and replaced by the default.
    /// `SYNCEOL_LOG_LEVEL` is read separately by [`log_level_from_env`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Priority: SYNCEOL_BIND_ADDR > PORT > default 127.0.0.1:8000
        let default_addr = SocketAddr::from(([127, 0, 0, 1], 8000));
        let bind_addr = if lookup("SYNCEOL_BIND_ADDR").is_some() {
            parse_var(&lookup, "SYNCEOL_BIND_ADDR", default_addr, |_| true)
        } else if lookup("PORT").is_some() {
            SocketAddr::from(([0, 0, 0, 0], parse_var(&lookup, "PORT", 8000, |_| true)))
        } else {
            default_addr
        };

        let cache_backend = match lookup("SYNCEOL_CACHE").map(|v| v.to_lowercase()).as_deref() {
            Some("redis") => CacheBackendType::Redis {
                url: lookup("SYNCEOL_REDIS_URL")
                    .or_else(|| lookup("REDIS_URL"))
                    .unwrap_or_else(|| "redis://127.0.0.1:6379".to_owned()),
            },
            None | Some("memory") => CacheBackendType::Memory,
            Some(other) => {
                warn!(variable = "SYNCEOL_CACHE", value = other, "unknown cache backend, using memory");
                CacheBackendType::Memory
            }
        };

        let cache_prefix = lookup("SYNCEOL_CACHE_PREFIX").unwrap_or_default();

        let record_ttl = Duration::from_secs(parse_var(
            &lookup,
            "SYNCEOL_RECORD_TTL",
            DEFAULT_RECORD_TTL_SECS,
            |_| true,
        ));

        let eol_alert = EolAlert {
            message: lookup("SYNCEOL_EOL_MESSAGE").unwrap_or_else(|| DEFAULT_EOL_MESSAGE.to_owned()),
            url: lookup("SYNCEOL_EOL_URL").unwrap_or_else(|| DEFAULT_EOL_URL.to_owned()),
        };

        // An empty secret is treated as unset.
        let secret = lookup("SYNCEOL_SECRET").and_then(|s| SecretKey::new(s).ok());

        let max_concurrency =
            parse_var(&lookup, "SYNCEOL_MAX_CONCURRENCY", 1024, |n: &usize| *n > 0);

        let sweep_interval = Duration::from_secs(parse_var(
            &lookup,
            "SYNCEOL_SWEEP_INTERVAL",
            60,
            |n: &u64| *n > 0,
        ));

        Self {
            bind_addr,
            cache_backend,
            cache_prefix,
            record_ttl,
            eol_alert,
            secret,
            max_concurrency,
            sweep_interval,
        }
    }
}

/// Log filter from `SYNCEOL_LOG_LEVEL` (default `info`). Read on its own so
/// logging is up before the rest of the configuration is parsed.
#[must_use]
pub fn log_level_from_env() -> String {
    log_level_from_lookup(|name| std::env::var(name).ok())
}

fn log_level_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> String {
    lookup("SYNCEOL_LOG_LEVEL").unwrap_or_else(|| "info".to_owned())
}

/// Parse `name`, falling back to `default` (with a warning) when the value
/// does not parse or fails `valid`. Unset variables fall back silently.
fn parse_var<T, F>(lookup: &F, name: &str, default: T, valid: impl Fn(&T) -> bool) -> T
where
    T: FromStr + fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => value,
        _ => {
            warn!(variable = name, value = %raw, default = %default, "invalid value, using default");
            default
        }
    }
}
