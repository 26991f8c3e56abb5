//! LDAP Client implementation
//!
//! Directory handle backed by `ldap3`. Connects lazily on first use and
//! supports LDAP, LDAPS (SSL) and STARTTLS connections.

use crate::ldap::handle::{DirectoryHandle, HandleFactory};
use crate::ldap::types::DirectoryEntry;
use async_trait::async_trait;
use dirbind_core::types::{AttributeSelection, SearchScope};
use dirbind_core::{AttributesConfig, Error, LdapConfig, Result};
use ldap3::{Ldap, LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry};
use std::time::Duration;
use tracing::debug;

/// Result code for invalidCredentials
const RC_INVALID_CREDENTIALS: u32 = 49;
/// Result code for noSuchObject
const RC_NO_SUCH_OBJECT: u32 = 32;

/// Transport settings for `ldap3` connections
#[derive(Debug, Clone)]
pub struct LdapSettings {
    /// Connect and per-operation timeout
    pub timeout: Duration,
    /// Negotiate STARTTLS when connecting
    pub start_tls: bool,
    /// Skip TLS certificate verification (not recommended for production)
    pub skip_tls_verify: bool,
}

impl Default for LdapSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            start_tls: false,
            skip_tls_verify: false,
        }
    }
}

impl LdapSettings {
    pub fn from_ldap_config(config: &LdapConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_seconds),
            start_tls: config.start_tls,
            skip_tls_verify: config.skip_tls_verify,
        }
    }

    pub fn from_attributes_config(config: &AttributesConfig) -> Self {
        let defaults = Self::default();
        Self {
            timeout: config
                .timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            start_tls: config.start_tls,
            skip_tls_verify: config.skip_tls_verify,
        }
    }
}

/// Lazily connecting `ldap3` handle
pub struct LdapHandle {
    url: String,
    settings: LdapSettings,
    ldap: Option<Ldap>,
}

impl LdapHandle {
    /// Create a handle pointed at `url`. No connection is made until the
    /// first operation.
    pub fn new(url: impl Into<String>, settings: LdapSettings) -> Self {
        Self {
            url: url.into(),
            settings,
            ldap: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_connected(&self) -> bool {
        self.ldap.is_some()
    }

    /// Create LDAP connection with proper TLS settings
    async fn create_connection(&self) -> Result<Ldap> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(self.settings.timeout)
            .set_starttls(self.settings.start_tls && !self.is_ldaps())
            .set_no_tls_verify(self.settings.skip_tls_verify);

        debug!("Connecting to LDAP server: {}", self.url);

        let (conn, ldap) = LdapConnAsync::with_settings(settings, &self.url)
            .await
            .map_err(|e| Error::Directory(format!("Failed to connect to LDAP server: {}", e)))?;

        ldap3::drive!(conn);

        Ok(ldap)
    }

    async fn connection(&mut self) -> Result<&mut Ldap> {
        if self.ldap.is_none() {
            let ldap = self.create_connection().await?;
            self.ldap = Some(ldap);
        }

        self.ldap
            .as_mut()
            .ok_or_else(|| Error::Directory("LDAP connection unavailable".to_string()))
    }

    /// Map an operation error, dropping the connection unless the server
    /// answered with a result code.
    fn fail(&mut self, context: &str, e: LdapError) -> Error {
        if !matches!(e, LdapError::LdapResult { .. }) && self.ldap.take().is_some() {
            debug!("Dropping connection to {} after: {}", self.url, e);
        }
        directory_error(context, e)
    }

    fn is_ldaps(&self) -> bool {
        self.url.starts_with("ldaps://")
    }
}

#[async_trait]
impl DirectoryHandle for LdapHandle {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()> {
        let timeout = self.settings.timeout;
        let ldap = self.connection().await?;

        let result = ldap
            .with_timeout(timeout)
            .simple_bind(dn, password)
            .await
            .and_then(|result| result.success());

        match result {
            Ok(_) => Ok(()),
            Err(e) => Err(self.fail("Bind failed", e)),
        }
    }

    async fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &AttributeSelection,
    ) -> Result<Vec<DirectoryEntry>> {
        let timeout = self.settings.timeout;
        let attrs = requested_attributes(attributes);
        let ldap = self.connection().await?;

        debug!("Searching {} with filter: {}", base, filter);

        let result = ldap
            .with_timeout(timeout)
            .search(base, to_ldap_scope(scope), filter, attrs)
            .await
            .and_then(|result| result.success());

        let (rs, _res) = match result {
            Ok(found) => found,
            Err(LdapError::LdapResult { result }) if result.rc == RC_NO_SUCH_OBJECT => {
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.fail("Search failed", e)),
        };

        Ok(rs
            .into_iter()
            .map(|result| {
                let entry = SearchEntry::construct(result);
                DirectoryEntry {
                    dn: entry.dn,
                    attrs: entry.attrs,
                }
            })
            .collect())
    }

    async fn start_tls(&mut self) -> Result<()> {
        if self.settings.start_tls && self.ldap.is_some() {
            return Ok(());
        }

        // STARTTLS is negotiated at connect time: drop any plain connection
        if let Some(mut ldap) = self.ldap.take() {
            let _ = ldap.unbind().await;
        }
        self.settings.start_tls = true;

        self.connection().await.map(|_| ())
    }

    async fn unbind(&mut self) -> Result<()> {
        match self.ldap.take() {
            Some(mut ldap) => ldap
                .unbind()
                .await
                .map_err(|e| directory_error("Unbind failed", e)),
            None => Ok(()),
        }
    }
}

/// Factory opening a new [`LdapHandle`] per call
#[derive(Debug, Clone)]
pub struct LdapUrl {
    url: String,
    settings: LdapSettings,
}

impl LdapUrl {
    pub fn new(url: impl Into<String>, settings: LdapSettings) -> Self {
        Self {
            url: url.into(),
            settings,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl HandleFactory for LdapUrl {
    fn open(&self) -> Box<dyn DirectoryHandle> {
        Box::new(LdapHandle::new(self.url.clone(), self.settings.clone()))
    }
}

fn to_ldap_scope(scope: SearchScope) -> Scope {
    match scope {
        SearchScope::Base => Scope::Base,
        SearchScope::OneLevel => Scope::OneLevel,
        SearchScope::Subtree => Scope::Subtree,
    }
}

fn requested_attributes(attributes: &AttributeSelection) -> Vec<String> {
    match attributes.names() {
        None => vec!["*".to_string()],
        // RFC 4511: "1.1" requests no attributes
        Some([]) => vec!["1.1".to_string()],
        Some(names) => names.to_vec(),
    }
}

fn directory_error(context: &str, e: LdapError) -> Error {
    match e {
        LdapError::LdapResult { result } if result.rc == RC_INVALID_CREDENTIALS => {
            Error::InvalidCredentials
        }
        other => Error::Directory(format!("{}: {}", context, other)),
    }
}
