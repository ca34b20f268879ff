//! Configuration types, loaded from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::notify::resend::DEFAULT_RESEND_BASE_URL;
use crate::notify::smtp::SmtpConfig;

/// Origins always allowed to call the endpoint from a browser (local dev servers).
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://localhost:8888"];

/// Where leads are persisted.
#[derive(Debug, Clone)]
pub enum StoreConfig {
    /// Local libSQL database file.
    Local { path: PathBuf },
    /// Hosted Supabase project, written with the service-role key.
    Supabase {
        url: String,
        service_key: SecretString,
    },
}

/// Which provider sends notification email.
#[derive(Debug, Clone)]
pub enum MailerConfig {
    Resend {
        api_key: SecretString,
        base_url: String,
    },
    Smtp(SmtpConfig),
    /// Log emails instead of sending them.
    Disabled,
}

/// Addresses and branding for notification emails.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// Operations inbox that receives every new lead.
    pub operations_to: String,
    /// Sender for both notifications.
    pub from: String,
    /// Brand name used in subjects and signatures.
    pub brand: String,
}

/// Fixed-window submission limit per client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window: Duration::from_secs(60),
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Address the HTTP server binds to.
    pub listen_addr: SocketAddr,
    pub store: StoreConfig,
    pub mailer: MailerConfig,
    pub notify: NotifyConfig,
    pub rate_limit: RateLimitConfig,
    /// Upper bound on each store write and each email send.
    pub stage_timeout: Duration,
    /// Browser origins allowed by CORS.
    pub allowed_origins: Vec<String>,
}

impl IntakeConfig {
    /// Build config from environment variables.
    ///
    /// # Required
    /// - `NOTIFY_EMAIL`
    ///
    /// # Optional
    /// - `LEAD_LISTEN_ADDR` (default `0.0.0.0:8080`)
    /// - `SUPABASE_URL` + `SUPABASE_SERVICE_ROLE_KEY`, else `LEAD_DB_PATH`
    ///   (default `./data/leads.db`)
    /// - `RESEND_API_KEY` (+ `RESEND_BASE_URL`), else `SMTP_HOST`, `SMTP_PORT`,
    ///   `SMTP_USERNAME`, `SMTP_PASSWORD`, else email is logged only
    /// - `FROM_EMAIL`, `LEAD_BRAND_NAME`, `ALLOWED_ORIGINS`
    /// - `LEAD_RATE_LIMIT_MAX` (default 5), `LEAD_RATE_LIMIT_WINDOW_SECS` (default 60)
    /// - `LEAD_STAGE_TIMEOUT_SECS` (default 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// [`Self::from_env`] lifted into the service-wide error type.
    pub fn load() -> crate::error::Result<Self> {
        Ok(Self::from_env()?)
    }

    /// Build config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let listen_addr: SocketAddr = parse_or(&get, "LEAD_LISTEN_ADDR", "0.0.0.0:8080".parse().ok())?;

        let store = match (get("SUPABASE_URL"), get("SUPABASE_SERVICE_ROLE_KEY")) {
            (Some(url), Some(key)) => StoreConfig::Supabase {
                url,
                service_key: SecretString::from(key),
            },
            (Some(_), None) => {
                return Err(ConfigError::MissingRequired {
                    key: "SUPABASE_SERVICE_ROLE_KEY".into(),
                    hint: "Inserts need the service-role key when SUPABASE_URL is set.".into(),
                });
            }
            _ => StoreConfig::Local {
                path: get("LEAD_DB_PATH")
                    .unwrap_or_else(|| "./data/leads.db".to_string())
                    .into(),
            },
        };

        let mailer = if let Some(api_key) = get("RESEND_API_KEY") {
            MailerConfig::Resend {
                api_key: SecretString::from(api_key),
                base_url: get("RESEND_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_RESEND_BASE_URL.to_string()),
            }
        } else if let Some(host) = get("SMTP_HOST") {
            MailerConfig::Smtp(SmtpConfig {
                host,
                port: parse_or(&get, "SMTP_PORT", Some(587))?,
                username: get("SMTP_USERNAME").unwrap_or_default(),
                password: SecretString::from(get("SMTP_PASSWORD").unwrap_or_default()),
            })
        } else {
            MailerConfig::Disabled
        };

        let brand = get("LEAD_BRAND_NAME").unwrap_or_else(|| "MAQON".to_string());
        let notify = NotifyConfig {
            operations_to: get("NOTIFY_EMAIL")
                .ok_or_else(|| ConfigError::MissingEnvVar("NOTIFY_EMAIL".into()))?,
            from: get("FROM_EMAIL")
                .unwrap_or_else(|| format!("{brand} <noreply@maqoncapital.com>")),
            brand,
        };

        let defaults = RateLimitConfig::default();
        let rate_limit = RateLimitConfig {
            max_requests: parse_or(&get, "LEAD_RATE_LIMIT_MAX", Some(defaults.max_requests))?,
            window: Duration::from_secs(parse_or(
                &get,
                "LEAD_RATE_LIMIT_WINDOW_SECS",
                Some(defaults.window.as_secs()),
            )?),
        };
        if rate_limit.window.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "LEAD_RATE_LIMIT_WINDOW_SECS".into(),
                message: "window must be at least one second".into(),
            });
        }

        let stage_timeout = Duration::from_secs(parse_or(&get, "LEAD_STAGE_TIMEOUT_SECS", Some(10))?);
        if stage_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "LEAD_STAGE_TIMEOUT_SECS".into(),
                message: "timeout must be at least one second".into(),
            });
        }

        let mut allowed_origins: Vec<String> =
            DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect();
        if let Some(extra) = get("ALLOWED_ORIGINS") {
            allowed_origins.extend(
                extra
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
            );
        }

        Ok(Self {
            listen_addr,
            store,
            mailer,
            notify,
            rate_limit,
            stage_timeout,
            allowed_origins,
        })
    }
}

/// Parse `key` if set, otherwise fall back to `default`.
fn parse_or<T, G>(get: &G, key: &str, default: Option<T>) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => default.ok_or_else(|| ConfigError::MissingEnvVar(key.to_string())),
    }
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
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = IntakeConfig::from_lookup(lookup(&[("NOTIFY_EMAIL", "ops@example.com")])).unwrap();
        assert_eq!(cfg.listen_addr.port(), 8080);
        assert!(matches!(cfg.store, StoreConfig::Local { .. }));
        assert!(matches!(cfg.mailer, MailerConfig::Disabled));
        assert_eq!(cfg.notify.operations_to, "ops@example.com");
        assert_eq!(cfg.rate_limit, RateLimitConfig::default());
        assert_eq!(cfg.stage_timeout, Duration::from_secs(10));
        assert_eq!(cfg.allowed_origins.len(), DEFAULT_ALLOWED_ORIGINS.len());
    }

    #[test]
    fn notify_email_is_required() {
        let err = IntakeConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "NOTIFY_EMAIL"));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let err = IntakeConfig::from_lookup(lookup(&[("NOTIFY_EMAIL", "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn supabase_requires_service_key() {
        let err = IntakeConfig::from_lookup(lookup(&[
            ("NOTIFY_EMAIL", "ops@example.com"),
            ("SUPABASE_URL", "https://p.supabase.co"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingRequired { .. }));

        let cfg = IntakeConfig::from_lookup(lookup(&[
            ("NOTIFY_EMAIL", "ops@example.com"),
            ("SUPABASE_URL", "https://p.supabase.co"),
            ("SUPABASE_SERVICE_ROLE_KEY", "secret"),
        ]))
        .unwrap();
        assert!(matches!(cfg.store, StoreConfig::Supabase { .. }));
    }

    #[test]
    fn resend_preferred_over_smtp() {
        let cfg = IntakeConfig::from_lookup(lookup(&[
            ("NOTIFY_EMAIL", "ops@example.com"),
            ("RESEND_API_KEY", "re_123"),
            ("SMTP_HOST", "smtp.example.com"),
        ]))
        .unwrap();
        match cfg.mailer {
            MailerConfig::Resend { base_url, .. } => assert_eq!(base_url, DEFAULT_RESEND_BASE_URL),
            other => panic!("expected Resend, got {other:?}"),
        }
    }

    #[test]
    fn smtp_port_parsed() {
        let cfg = IntakeConfig::from_lookup(lookup(&[
            ("NOTIFY_EMAIL", "ops@example.com"),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_PORT", "2525"),
        ]))
        .unwrap();
        match cfg.mailer {
            MailerConfig::Smtp(smtp) => {
                assert_eq!(smtp.host, "smtp.example.com");
                assert_eq!(smtp.port, 2525);
            }
            other => panic!("expected SMTP, got {other:?}"),
        }
    }

    #[test]
    fn rate_limit_overrides_and_validation() {
        let cfg = IntakeConfig::from_lookup(lookup(&[
            ("NOTIFY_EMAIL", "ops@example.com"),
            ("LEAD_RATE_LIMIT_MAX", "3"),
            ("LEAD_RATE_LIMIT_WINDOW_SECS", "300"),
        ]))
        .unwrap();
        assert_eq!(cfg.rate_limit.max_requests, 3);
        assert_eq!(cfg.rate_limit.window, Duration::from_secs(300));

        let err = IntakeConfig::from_lookup(lookup(&[
            ("NOTIFY_EMAIL", "ops@example.com"),
            ("LEAD_RATE_LIMIT_MAX", "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "LEAD_RATE_LIMIT_MAX"));

        let err = IntakeConfig::from_lookup(lookup(&[
            ("NOTIFY_EMAIL", "ops@example.com"),
            ("LEAD_RATE_LIMIT_WINDOW_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn stage_timeout_override_and_zero_rejected() {
        let cfg = IntakeConfig::from_lookup(lookup(&[
            ("NOTIFY_EMAIL", "ops@example.com"),
            ("LEAD_STAGE_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();
        assert_eq!(cfg.stage_timeout, Duration::from_secs(3));

        let err = IntakeConfig::from_lookup(lookup(&[
            ("NOTIFY_EMAIL", "ops@example.com"),
            ("LEAD_STAGE_TIMEOUT_SECS", "0"),
        ]))
        .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "LEAD_STAGE_TIMEOUT_SECS")
        );
    }

    #[test]
    fn allowed_origins_extend_defaults() {
        let cfg = IntakeConfig::from_lookup(lookup(&[
            ("NOTIFY_EMAIL", "ops@example.com"),
            ("ALLOWED_ORIGINS", "https://example.com, ,https://www.example.com"),
        ]))
        .unwrap();
        assert!(cfg.allowed_origins.contains(&"http://localhost:5173".to_string()));
        assert!(cfg.allowed_origins.contains(&"https://example.com".to_string()));
        assert!(cfg.allowed_origins.contains(&"https://www.example.com".to_string()));
        assert_eq!(cfg.allowed_origins.len(), 4);
    }
}
