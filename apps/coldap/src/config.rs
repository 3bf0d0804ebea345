//! Process configuration from environment variables.

use coldap_directory::LdapConfig;
use coldap_source::SourceConfig;
use thiserror::Error;

use crate::logging::LogFormat;

/// Where change notifications are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyTransport {
    /// One datagram per message.
    Udp { host: String, port: u16 },
    /// One record per message on a Kafka topic.
    Kafka { brokers: String, topic: String },
}

/// Configuration for one sync run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub source: SourceConfig,
    /// Identity stamped on managed organizations.
    pub host: String,
    pub ldap: LdapConfig,
    pub base_dn: String,
    pub notify: NotifyTransport,
    /// Topic part of every change notification.
    pub topic: String,
    pub prune_group_members: bool,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl SyncConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    ///
    /// This allows tests to supply variables without mutating process-global
    /// environment state.
    pub fn from_reader<F>(reader: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let or_default = |key: &str, default: &str| reader(key).unwrap_or_else(|_| default.to_string());

        let source_password = reader("SOURCE_PASSWORD")
            .map_err(|_| ConfigError::MissingVar("SOURCE_PASSWORD".into()))?;
        let mut source = SourceConfig::new(
            or_default("SOURCE_URL", "http://localhost:8080"),
            or_default("SOURCE_USER", "sysread"),
            source_password,
        )
        .with_timeout_secs(parse_number(&reader, "SOURCE_TIMEOUT_SECS", 30)?);
        if let Ok(host) = reader("SOURCE_HOST") {
            source = source.with_host(host);
        }
        let host = source
            .source_host()
            .map_err(|e| ConfigError::InvalidValue("SOURCE_URL".into(), e.to_string()))?;

        let ldap_password = reader("LDAP_PASSWORD")
            .map_err(|_| ConfigError::MissingVar("LDAP_PASSWORD".into()))?;
        let ldap = LdapConfig::new(
            or_default("LDAP_URL", "ldap://localhost:389"),
            or_default("LDAP_BIND_DN", "cn=admin,dc=example,dc=org"),
            ldap_password,
        )
        .with_starttls(parse_bool(&reader, "LDAP_STARTTLS", false)?)
        .with_tls_verify(parse_bool(&reader, "LDAP_TLS_VERIFY", true)?)
        .with_timeout_secs(parse_number(&reader, "LDAP_TIMEOUT_SECS", 30)?);
        ldap.validate()
            .map_err(|e| ConfigError::InvalidValue("LDAP_URL".into(), e.to_string()))?;

        let base_dn = or_default("LDAP_BASE_DN", "dc=example,dc=org");
        if base_dn.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "LDAP_BASE_DN".into(),
                "must not be empty".into(),
            ));
        }

        let notify = match or_default("NOTIFY_TRANSPORT", "udp").to_lowercase().as_str() {
            "udp" => NotifyTransport::Udp {
                host: or_default("NOTIFY_HOST", "localhost"),
                port: parse_number(&reader, "NOTIFY_PORT", 5556)?,
            },
            "kafka" => NotifyTransport::Kafka {
                brokers: or_default("NOTIFY_BROKERS", "localhost:9092"),
                topic: or_default("NOTIFY_KAFKA_TOPIC", "coldap.changes"),
            },
            other => {
                return Err(ConfigError::InvalidValue(
                    "NOTIFY_TRANSPORT".into(),
                    format!("expected udp or kafka, got {other}"),
                ))
            }
        };

        let log_format = match or_default("LOG_FORMAT", "pretty").to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            other => {
                return Err(ConfigError::InvalidValue(
                    "LOG_FORMAT".into(),
                    format!("expected json or pretty, got {other}"),
                ))
            }
        };

        Ok(Self {
            source,
            host,
            ldap,
            base_dn,
            notify,
            topic: or_default("NOTIFY_TOPIC", coldap_sync::DEFAULT_TOPIC),
            prune_group_members: parse_bool(&reader, "PRUNE_GROUP_MEMBERS", false)?,
            log_level: or_default("LOG_LEVEL", "info"),
            log_format,
        })
    }
}

fn parse_bool<F>(reader: &F, key: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let Ok(raw) = reader(key) else {
        return Ok(default);
    };
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue(
            key.into(),
            format!("expected a boolean, got {raw}"),
        )),
    }
}

fn parse_number<F, T>(reader: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match reader(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.into(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}
