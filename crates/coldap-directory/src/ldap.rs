//! LDAP-backed directory
//!
//! One connection is opened and bound at start and held for the whole run.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use ldap3::result::LdapResult;
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, Mod, Scope, SearchEntry};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::attributes::AttributeSet;
use crate::diff::{describe, Modification};
use crate::directory::{Directory, DirectoryEntry};
use crate::error::{DirectoryError, DirectoryResult, WriteOperation};
use crate::filter::Filter;

/// LDAP result code: success.
const RC_SUCCESS: u32 = 0;
/// LDAP result code: noSuchObject.
const RC_NO_SUCH_OBJECT: u32 = 32;
/// LDAP result code: invalidCredentials.
const RC_INVALID_CREDENTIALS: u32 = 49;

/// Connection settings for the directory server.
#[derive(Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    /// Server URL, `ldap://` or `ldaps://`.
    pub url: String,

    /// Bind DN for authentication (e.g., "cn=admin,dc=example,dc=org").
    pub bind_dn: String,

    /// Bind password.
    #[serde(skip_serializing)]
    pub bind_password: String,

    /// Upgrade a plain connection with STARTTLS.
    #[serde(default)]
    pub use_starttls: bool,

    /// Verify the server certificate.
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,

    /// Connect timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapConfig")
            .field("url", &self.url)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &"***REDACTED***")
            .field("use_starttls", &self.use_starttls)
            .field("tls_verify", &self.tls_verify)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_tls_verify() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

impl LdapConfig {
    /// Create a config with default TLS and timeout settings.
    pub fn new(
        url: impl Into<String>,
        bind_dn: impl Into<String>,
        bind_password: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            bind_dn: bind_dn.into(),
            bind_password: bind_password.into(),
            use_starttls: false,
            tls_verify: default_tls_verify(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Enable STARTTLS.
    pub fn with_starttls(mut self, enabled: bool) -> Self {
        self.use_starttls = enabled;
        self
    }

    /// Toggle certificate verification.
    pub fn with_tls_verify(mut self, verify: bool) -> Self {
        self.tls_verify = verify;
        self
    }

    /// Set the connect timeout.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> DirectoryResult<()> {
        if !(self.url.starts_with("ldap://") || self.url.starts_with("ldaps://")) {
            return Err(DirectoryError::InvalidConfiguration {
                message: format!("unsupported LDAP URL '{}'", self.url),
            });
        }
        if self.use_starttls && self.url.starts_with("ldaps://") {
            return Err(DirectoryError::InvalidConfiguration {
                message: "STARTTLS cannot be combined with ldaps://".to_string(),
            });
        }
        if self.bind_dn.is_empty() {
            return Err(DirectoryError::InvalidConfiguration {
                message: "bind DN is required".to_string(),
            });
        }
        Ok(())
    }
}

/// Directory store backed by an LDAP server.
pub struct LdapDirectory {
    config: LdapConfig,
    ldap: Ldap,
}

impl LdapDirectory {
    /// Connect and bind.
    pub async fn connect(config: LdapConfig) -> DirectoryResult<Self> {
        config.validate()?;

        debug!(url = %config.url, "Connecting to LDAP server");

        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(config.timeout_secs))
            .set_starttls(config.use_starttls)
            .set_no_tls_verify(!config.tls_verify);

        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &config.url)
            .await
            .map_err(|e| {
                DirectoryError::connection_failed_with_source(
                    format!("Failed to connect to LDAP server at {}", config.url),
                    e,
                )
            })?;

        // Spawn the connection driver
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!(error = %e, "LDAP connection driver error");
            }
        });

        debug!(bind_dn = %config.bind_dn, "Performing LDAP bind");

        let result = ldap
            .simple_bind(&config.bind_dn, &config.bind_password)
            .await
            .map_err(|e| {
                DirectoryError::connection_failed_with_source(
                    format!("LDAP bind failed for {}", config.bind_dn),
                    e,
                )
            })?;

        if result.rc != RC_SUCCESS {
            if result.rc == RC_INVALID_CREDENTIALS {
                return Err(DirectoryError::AuthenticationFailed {
                    bind_dn: config.bind_dn.clone(),
                });
            }
            return Err(DirectoryError::connection_failed(format!(
                "LDAP bind failed with code {}: {}",
                result.rc, result.text
            )));
        }

        info!(url = %config.url, "LDAP connection established");

        Ok(Self { config, ldap })
    }

    /// The configuration this directory was opened with.
    pub fn config(&self) -> &LdapConfig {
        &self.config
    }

    async fn search(
        &self,
        base: &str,
        scope: Scope,
        filter: &str,
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        let mut ldap = self.ldap.clone();
        let result = ldap
            .search(base, scope, filter, vec!["*"])
            .await
            .map_err(|e| DirectoryError::search_failed(base, filter, e.to_string()))?;

        let ldap3::SearchResult(entries, status) = result;
        if status.rc == RC_NO_SUCH_OBJECT {
            return Ok(Vec::new());
        }
        if status.rc != RC_SUCCESS {
            return Err(DirectoryError::search_failed(
                base,
                filter,
                format!("code {}: {}", status.rc, status.text),
            ));
        }

        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(|entry| DirectoryEntry::new(entry.dn, entry.attrs.into_iter().collect()))
            .collect())
    }
}

/// Attribute list in the shape ldap3 expects for an add.
fn to_ldap_attrs(attributes: &AttributeSet) -> Vec<(String, HashSet<String>)> {
    attributes
        .iter()
        .map(|(name, values)| (name.clone(), values.iter().cloned().collect()))
        .collect()
}

/// Modification list in the shape ldap3 expects.
fn to_ldap_mods(changes: &[Modification]) -> Vec<Mod<String>> {
    changes
        .iter()
        .map(|change| match change {
            Modification::Add { attribute, values } => {
                Mod::Add(attribute.clone(), values.iter().cloned().collect())
            }
            Modification::Replace { attribute, values } => {
                Mod::Replace(attribute.clone(), values.iter().cloned().collect())
            }
            Modification::Delete { attribute } => Mod::Delete(attribute.clone(), HashSet::new()),
        })
        .collect()
}

fn check_write(
    operation: WriteOperation,
    dn: &str,
    payload: impl FnOnce() -> String,
    result: Result<LdapResult, ldap3::LdapError>,
) -> DirectoryResult<()> {
    match result {
        Ok(result) if result.rc == RC_SUCCESS => Ok(()),
        Ok(result) => Err(DirectoryError::write_rejected(
            operation,
            dn,
            payload(),
            format!("LDAP {} failed with code {}: {}", operation, result.rc, result.text),
        )),
        Err(e) => Err(DirectoryError::write_rejected(
            operation,
            dn,
            payload(),
            e.to_string(),
        )),
    }
}

#[async_trait]
impl Directory for LdapDirectory {
    #[instrument(skip(self, filter), fields(filter = %filter))]
    async fn search_one_level(
        &self,
        base: &str,
        filter: &Filter,
    ) -> DirectoryResult<Vec<DirectoryEntry>> {
        self.search(base, Scope::OneLevel, &filter.to_ldap()).await
    }

    #[instrument(skip(self))]
    async fn read(&self, dn: &str) -> DirectoryResult<Option<AttributeSet>> {
        let entries = self.search(dn, Scope::Base, "(objectClass=*)").await?;
        Ok(entries.into_iter().next().map(|entry| entry.attributes))
    }

    #[instrument(skip(self, attributes))]
    async fn add(&self, dn: &str, attributes: &AttributeSet) -> DirectoryResult<()> {
        let mut ldap = self.ldap.clone();
        let result = ldap.add(dn, to_ldap_attrs(attributes)).await;
        check_write(WriteOperation::Add, dn, || attributes.to_string(), result)?;

        info!(dn = %dn, "LDAP entry created");
        Ok(())
    }

    #[instrument(skip(self, changes))]
    async fn modify(&self, dn: &str, changes: &[Modification]) -> DirectoryResult<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut ldap = self.ldap.clone();
        let result = ldap.modify(dn, to_ldap_mods(changes)).await;
        check_write(WriteOperation::Modify, dn, || describe(changes), result)?;

        info!(dn = %dn, changes = changes.len(), "LDAP entry updated");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, dn: &str) -> DirectoryResult<()> {
        let mut ldap = self.ldap.clone();
        let result = ldap.delete(dn).await;
        check_write(WriteOperation::Delete, dn, String::new, result)?;

        info!(dn = %dn, "LDAP entry deleted");
        Ok(())
    }

    async fn unbind(&self) -> DirectoryResult<()> {
        let mut ldap = self.ldap.clone();
        ldap.unbind()
            .await
            .map_err(|e| DirectoryError::connection_failed_with_source("LDAP unbind failed", e))?;
        debug!("LDAP connection unbound");
        Ok(())
    }
}
