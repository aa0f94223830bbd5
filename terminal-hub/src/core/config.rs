//! Terminal hub configuration
//!
//! Read once at startup from the environment (`.env` is loaded by `main`).

use shared::terminal::{DEFAULT_HEARTBEAT_INTERVAL_MS, DEFAULT_RECONNECT_DELAY_MS, TerminalConfig};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// WebSocket path devices connect to
pub const WS_PATH: &str = "/api/terminal/ws";

/// Upper bound for pairing code / payment session TTLs and the sweep interval
pub const MAX_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Upper bound for `HEARTBEAT_TIMEOUT_MS`
pub const MAX_HEARTBEAT_TIMEOUT_MS: u64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone)]
pub struct Config {
    /// Environment: development | staging | production
    pub environment: String,
    pub http_port: u16,
    /// Store (tenant) served by this deployment
    pub store_id: String,
    /// SQLite database file
    pub database_path: String,
    /// Externally reachable base URL, used for `wsEndpoint` and `qrCodeUrl`
    pub public_base_url: String,
    /// Bearer token guarding the admin and checkout APIs
    pub admin_api_token: String,
    pub pairing_code_ttl_secs: u64,
    pub payment_session_ttl_secs: u64,
    pub session_sweep_interval_secs: u64,
    /// Advertised to devices
    pub heartbeat_interval_ms: u64,
    /// Advertised to devices
    pub reconnect_delay_ms: u64,
    /// A connection without heartbeat for this long is dropped
    pub heartbeat_timeout_ms: u64,
    pub log_level: String,
    /// Daily rolling log files when set
    pub log_dir: Option<String>,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
        std::env::var(name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());
        let defaults = Self::with_defaults();

        let config = Self {
            http_port: Self::parse_or("HTTP_PORT", defaults.http_port),
            store_id: std::env::var("STORE_ID")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.store_id),
            database_path: std::env::var("DATABASE_PATH").unwrap_or(defaults.database_path),
            public_base_url: std::env::var("PUBLIC_BASE_URL").unwrap_or(defaults.public_base_url),
            admin_api_token: Self::require_secret("ADMIN_API_TOKEN", &environment)?,
            pairing_code_ttl_secs: Self::parse_or("PAIRING_CODE_TTL_SECS", defaults.pairing_code_ttl_secs),
            payment_session_ttl_secs: Self::parse_or(
                "PAYMENT_SESSION_TTL_SECS",
                defaults.payment_session_ttl_secs,
            ),
            session_sweep_interval_secs: Self::parse_or(
                "SESSION_SWEEP_INTERVAL_SECS",
                defaults.session_sweep_interval_secs,
            ),
            heartbeat_interval_ms: Self::parse_or("HEARTBEAT_INTERVAL_MS", defaults.heartbeat_interval_ms),
            reconnect_delay_ms: Self::parse_or("RECONNECT_DELAY_MS", defaults.reconnect_delay_ms),
            heartbeat_timeout_ms: Self::parse_or("HEARTBEAT_TIMEOUT_MS", defaults.heartbeat_timeout_ms),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_dir: std::env::var("LOG_DIR").ok().filter(|s| !s.is_empty()),
            environment,
        };
        config.validate()?;
        Ok(config)
    }

    /// Development defaults, no environment lookup (tests)
    pub fn with_defaults() -> Self {
        Self {
            environment: "development".into(),
            http_port: 3000,
            store_id: "default-store".into(),
            database_path: "data/terminals.db".into(),
            public_base_url: "http://localhost:3000".into(),
            admin_api_token: "dev-ADMIN_API_TOKEN-not-for-production".into(),
            pairing_code_ttl_secs: 600,
            payment_session_ttl_secs: 300,
            session_sweep_interval_secs: 30,
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            heartbeat_timeout_ms: 90_000,
            log_level: "info".into(),
            log_dir: None,
        }
    }

    fn validate(&self) -> Result<(), BoxError> {
        if self.admin_api_token.trim().is_empty() {
            return Err("ADMIN_API_TOKEN must not be empty".into());
        }
        for (name, secs) in [
            ("PAIRING_CODE_TTL_SECS", self.pairing_code_ttl_secs),
            ("PAYMENT_SESSION_TTL_SECS", self.payment_session_ttl_secs),
            ("SESSION_SWEEP_INTERVAL_SECS", self.session_sweep_interval_secs),
        ] {
            if secs == 0 || secs > MAX_TTL_SECS {
                return Err(format!("{name} must be within 1..={MAX_TTL_SECS}, got {secs}").into());
            }
        }
        if self.heartbeat_timeout_ms <= self.heartbeat_interval_ms {
            return Err("HEARTBEAT_TIMEOUT_MS must exceed HEARTBEAT_INTERVAL_MS".into());
        }
        if self.heartbeat_timeout_ms > MAX_HEARTBEAT_TIMEOUT_MS {
            return Err(format!("HEARTBEAT_TIMEOUT_MS must not exceed {MAX_HEARTBEAT_TIMEOUT_MS}").into());
        }
        if !(self.public_base_url.starts_with("http://") || self.public_base_url.starts_with("https://")) {
            return Err(format!("PUBLIC_BASE_URL must be http(s): {}", self.public_base_url).into());
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn pairing_code_ttl_ms(&self) -> i64 {
        secs_to_millis(self.pairing_code_ttl_secs)
    }

    pub fn payment_session_ttl_ms(&self) -> i64 {
        secs_to_millis(self.payment_session_ttl_secs)
    }

    pub fn heartbeat_timeout(&self) -> i64 {
        i64::try_from(self.heartbeat_timeout_ms).unwrap_or(i64::MAX)
    }

    /// `http(s)://host` → `ws(s)://host/api/terminal/ws`
    pub fn ws_endpoint(&self) -> String {
        let base = self.public_base_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{ws_base}{WS_PATH}")
    }

    /// Connection block handed to devices
    pub fn terminal_config(&self) -> TerminalConfig {
        TerminalConfig {
            ws_endpoint: self.ws_endpoint(),
            heartbeat_interval: self.heartbeat_interval_ms,
            reconnect_delay: self.reconnect_delay_ms,
        }
    }
}

/// 饱和换算，未校验的配置也不会溢出
fn secs_to_millis(secs: u64) -> i64 {
    i64::try_from(secs.saturating_mul(1000)).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ws_endpoint_follows_scheme() {
        let mut c = Config::with_defaults();
        assert_eq!(c.ws_endpoint(), "ws://localhost:3000/api/terminal/ws");

        c.public_base_url = "https://shop.example.com/".into();
        assert_eq!(c.ws_endpoint(), "wss://shop.example.com/api/terminal/ws");
    }

    #[test]
    fn test_terminal_config_defaults() {
        let tc = Config::with_defaults().terminal_config();
        assert_eq!(tc.heartbeat_interval, 30_000);
        assert_eq!(tc.reconnect_delay, 5_000);
    }

    #[test]
    fn test_validate() {
        assert!(Config::with_defaults().validate().is_ok());

        let mut c = Config::with_defaults();
        c.heartbeat_timeout_ms = c.heartbeat_interval_ms;
        assert!(c.validate().is_err());

        let mut c = Config::with_defaults();
        c.public_base_url = "localhost:3000".into();
        assert!(c.validate().is_err());

        let mut c = Config::with_defaults();
        c.payment_session_ttl_secs = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_durations() {
        let mut c = Config::with_defaults();
        c.pairing_code_ttl_secs = MAX_TTL_SECS;
        c.payment_session_ttl_secs = MAX_TTL_SECS;
        c.heartbeat_timeout_ms = MAX_HEARTBEAT_TIMEOUT_MS;
        assert!(c.validate().is_ok());

        let mut c = Config::with_defaults();
        c.payment_session_ttl_secs = u64::MAX;
        assert!(c.validate().is_err());

        let mut c = Config::with_defaults();
        c.session_sweep_interval_secs = MAX_TTL_SECS + 1;
        assert!(c.validate().is_err());

        let mut c = Config::with_defaults();
        c.heartbeat_timeout_ms = u64::MAX;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_admin_token() {
        let mut c = Config::with_defaults();
        c.admin_api_token = "  ".into();
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_millis_conversion_saturates() {
        let mut c = Config::with_defaults();
        c.pairing_code_ttl_secs = u64::MAX;
        c.heartbeat_timeout_ms = u64::MAX;
        assert_eq!(c.pairing_code_ttl_ms(), i64::MAX);
        assert_eq!(c.heartbeat_timeout(), i64::MAX);
        assert_eq!(secs_to_millis(MAX_TTL_SECS), 604_800_000);
    }

    #[test]
    fn test_ttl_in_millis() {
        let c = Config::with_defaults();
        assert_eq!(c.pairing_code_ttl_ms(), 600_000);
        assert_eq!(c.payment_session_ttl_ms(), 300_000);
    }
}
