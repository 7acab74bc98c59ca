use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "RxHandoff";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Credential the doctor UI ships with out of the box. Startup warns when
/// it is still in use.
pub const DEFAULT_DOCTOR_TOKEN: &str = "mock-token-for-hackathon";

/// Allowed token lifetime window, in hours.
pub const MIN_TOKEN_TTL_HOURS: i64 = 24;
pub const MAX_TOKEN_TTL_HOURS: i64 = 48;

const DEFAULT_BIND: &str = "127.0.0.1:4000";
const DEFAULT_PUBLIC_URL: &str = "http://localhost:5173";
const DEFAULT_RETENTION_DAYS: i64 = 30;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

/// Default `tracing` filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,rx_handoff=debug"
}

/// Get the application data directory (~/RxHandoff/).
///
/// Falls back to the working directory when no home directory is known
/// (containers running as a system user).
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of the token database.
pub fn default_db_path() -> PathBuf {
    app_data_dir().join("handoff.db")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}: invalid value {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime configuration, read from `RX_HANDOFF_*` environment variables.
#[derive(Debug, Clone)]
pub struct HandoffConfig {
    pub bind_addr: SocketAddr,
    /// Base URL of the pharmacist front end; share links are
    /// `{public_url}/pharmacy/{token}`.
    pub public_url: String,
    pub db_path: PathBuf,
    pub token_ttl_hours: i64,
    /// Static bearer credential for issue/revoke. Replace with per-doctor
    /// sessions before production use.
    pub doctor_token: String,
    pub retention_days: i64,
    pub sweep_interval_secs: u64,
    /// `None` → permissive CORS (local development).
    pub allowed_origin: Option<String>,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([127, 0, 0, 1], 4000))),
            public_url: DEFAULT_PUBLIC_URL.to_string(),
            db_path: default_db_path(),
            token_ttl_hours: MIN_TOKEN_TTL_HOURS,
            doctor_token: DEFAULT_DOCTOR_TOKEN.to_string(),
            retention_days: DEFAULT_RETENTION_DAYS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            allowed_origin: None,
        }
    }
}

impl HandoffConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup. Unset or blank
    /// variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(v) = get("RX_HANDOFF_BIND") {
            config.bind_addr = v.parse().map_err(|e| ConfigError::Invalid {
                var: "RX_HANDOFF_BIND",
                value: v.clone(),
                reason: format!("{e}"),
            })?;
        }
        if let Some(v) = get("RX_HANDOFF_PUBLIC_URL") {
            if !(v.starts_with("http://") || v.starts_with("https://")) {
                return Err(ConfigError::Invalid {
                    var: "RX_HANDOFF_PUBLIC_URL",
                    value: v,
                    reason: "must start with http:// or https://".into(),
                });
            }
            config.public_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("RX_HANDOFF_DB_PATH") {
            config.db_path = PathBuf::from(v);
        }
        if let Some(v) = get("RX_HANDOFF_TOKEN_TTL_HOURS") {
            let hours: i64 = parse_number("RX_HANDOFF_TOKEN_TTL_HOURS", &v)?;
            if !(MIN_TOKEN_TTL_HOURS..=MAX_TOKEN_TTL_HOURS).contains(&hours) {
                return Err(ConfigError::Invalid {
                    var: "RX_HANDOFF_TOKEN_TTL_HOURS",
                    value: v,
                    reason: format!(
                        "must be between {MIN_TOKEN_TTL_HOURS} and {MAX_TOKEN_TTL_HOURS}"
                    ),
                });
            }
            config.token_ttl_hours = hours;
        }
        if let Some(v) = get("RX_HANDOFF_DOCTOR_TOKEN") {
            config.doctor_token = v;
        }
        if let Some(v) = get("RX_HANDOFF_RETENTION_DAYS") {
            let days: i64 = parse_number("RX_HANDOFF_RETENTION_DAYS", &v)?;
            if days < 0 {
                return Err(ConfigError::Invalid {
                    var: "RX_HANDOFF_RETENTION_DAYS",
                    value: v,
                    reason: "must not be negative".into(),
                });
            }
            config.retention_days = days;
        }
        if let Some(v) = get("RX_HANDOFF_SWEEP_INTERVAL_SECS") {
            let secs: u64 = parse_number("RX_HANDOFF_SWEEP_INTERVAL_SECS", &v)?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    var: "RX_HANDOFF_SWEEP_INTERVAL_SECS",
                    value: v,
                    reason: "must be positive".into(),
                });
            }
            config.sweep_interval_secs = secs;
        }
        config.allowed_origin = get("RX_HANDOFF_ALLOWED_ORIGIN");

        Ok(config)
    }

    /// Whether the shipped demo credential is still configured.
    pub fn uses_default_credential(&self) -> bool {
        self.doctor_token == DEFAULT_DOCTOR_TOKEN
    }

    /// Pharmacist share link for a token.
    pub fn pharmacist_url(&self, token: &str) -> String {
        format!("{}/pharmacy/{token}", self.public_url)
    }
}

fn parse_number<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn app_data_dir_ends_with_app_name() {
        assert!(app_data_dir().ends_with(APP_NAME));
        assert!(default_db_path().starts_with(app_data_dir()));
    }

    #[test]
    fn defaults_when_env_empty() {
        let config = HandoffConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr.port(), 4000);
        assert_eq!(config.token_ttl_hours, 24);
        assert_eq!(config.public_url, "http://localhost:5173");
        assert!(config.uses_default_credential());
        assert!(config.allowed_origin.is_none());
    }

    #[test]
    fn reads_all_overrides() {
        let config = HandoffConfig::from_lookup(lookup(&[
            ("RX_HANDOFF_BIND", "0.0.0.0:8080"),
            ("RX_HANDOFF_PUBLIC_URL", "https://rx.example.org/"),
            ("RX_HANDOFF_DB_PATH", "/tmp/handoff.db"),
            ("RX_HANDOFF_TOKEN_TTL_HOURS", "48"),
            ("RX_HANDOFF_DOCTOR_TOKEN", "s3cret"),
            ("RX_HANDOFF_RETENTION_DAYS", "7"),
            ("RX_HANDOFF_SWEEP_INTERVAL_SECS", "60"),
            ("RX_HANDOFF_ALLOWED_ORIGIN", "https://rx.example.org"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.public_url, "https://rx.example.org");
        assert_eq!(config.db_path, PathBuf::from("/tmp/handoff.db"));
        assert_eq!(config.token_ttl_hours, 48);
        assert!(!config.uses_default_credential());
        assert_eq!(config.retention_days, 7);
        assert_eq!(config.sweep_interval_secs, 60);
        assert_eq!(config.allowed_origin.as_deref(), Some("https://rx.example.org"));
    }

    #[test]
    fn negative_retention_rejected() {
        let result = HandoffConfig::from_lookup(lookup(&[("RX_HANDOFF_RETENTION_DAYS", "-1")]));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { var: "RX_HANDOFF_RETENTION_DAYS", .. })
        ));
        let config =
            HandoffConfig::from_lookup(lookup(&[("RX_HANDOFF_RETENTION_DAYS", "0")])).unwrap();
        assert_eq!(config.retention_days, 0);
    }

    #[test]
    fn ttl_outside_window_rejected() {
        for bad in ["12", "49", "abc"] {
            let result =
                HandoffConfig::from_lookup(lookup(&[("RX_HANDOFF_TOKEN_TTL_HOURS", bad)]));
            assert!(result.is_err(), "ttl {bad} should be rejected");
        }
    }

    #[test]
    fn public_url_requires_scheme() {
        let result =
            HandoffConfig::from_lookup(lookup(&[("RX_HANDOFF_PUBLIC_URL", "rx.example.org")]));
        assert!(result.is_err());
    }

    #[test]
    fn blank_values_keep_defaults() {
        let config =
            HandoffConfig::from_lookup(lookup(&[("RX_HANDOFF_DOCTOR_TOKEN", "   ")])).unwrap();
        assert!(config.uses_default_credential());
    }

    #[test]
    fn pharmacist_url_joins_base_and_token() {
        let config = HandoffConfig::default();
        assert_eq!(
            config.pharmacist_url("MS-RX-ABC234"),
            "http://localhost:5173/pharmacy/MS-RX-ABC234"
        );
    }
}
