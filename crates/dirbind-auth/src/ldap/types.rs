//! LDAP authentication types
//!
//! Supports:
//! - Resolver settings derived from configuration
//! - Proxy credentials for directories that forbid anonymous searches
//! - Tagged authentication outcomes

use crate::ldap::handle::DirectoryHandle;
use dirbind_core::types::{SearchScope, VerifiedIdentity};
use dirbind_core::{Error, LdapConfig, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Directory Entry
// ============================================================================

/// One entry returned by a directory search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// Entry DN (Distinguished Name)
    pub dn: String,

    /// Attribute values keyed by attribute name
    #[serde(default)]
    pub attrs: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    /// Get first value of an attribute
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attrs
            .get(name)
            .and_then(|v| v.first())
            .map(|s| s.as_str())
    }
}

// ============================================================================
// Proxy Credentials
// ============================================================================

/// Service identity bound before resolving or searching
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyCredentials {
    pub dn: String,
    password: String,
}

impl ProxyCredentials {
    pub fn new(dn: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            password: password.into(),
        }
    }

    pub fn from_pair(pair: Option<(&str, &str)>) -> Option<Self> {
        pair.map(|(dn, password)| Self::new(dn, password))
    }

    /// Bind the handle as the proxy identity
    pub async fn bind(&self, handle: &mut dyn DirectoryHandle) -> Result<()> {
        handle
            .simple_bind(&self.dn, &self.password)
            .await
            .map_err(|e| Error::CouldNotBind(format!("{}: {}", self.dn, e)))
    }
}

impl fmt::Debug for ProxyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyCredentials")
            .field("dn", &self.dn)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// Resolver Configuration
// ============================================================================

/// Settings shared by both identity resolvers
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Subtree root: suffix for composed DNs and base for searches
    pub base_dn: String,

    /// Attribute holding the login, `uid` by default
    pub naming_attribute: String,

    /// Search depth (search resolver only)
    pub scope: SearchScope,

    /// Parenthesised filter ANDed to the naming-attribute match
    pub restrict: Option<String>,

    pub proxy: Option<ProxyCredentials>,
}

impl ResolverConfig {
    pub fn new(base_dn: impl Into<String>) -> Self {
        Self {
            base_dn: base_dn.into(),
            naming_attribute: dirbind_core::DEFAULT_NAMING_ATTRIBUTE.to_string(),
            scope: SearchScope::Subtree,
            restrict: None,
            proxy: None,
        }
    }

    pub fn from_config(config: &LdapConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            base_dn: config.base()?.to_string(),
            naming_attribute: config.naming_attribute.trim().to_string(),
            scope: config.scope()?,
            restrict: config.restrict.clone().filter(|r| !r.is_empty()),
            proxy: ProxyCredentials::from_pair(config.proxy()?),
        })
    }

    pub fn with_naming_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.naming_attribute = attribute.into();
        self
    }

    pub fn with_scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_restrict(mut self, restrict: impl Into<String>) -> Self {
        self.restrict = Some(restrict.into());
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyCredentials) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Bind as the proxy identity, when one is configured
    pub async fn proxy_bind(&self, handle: &mut dyn DirectoryHandle) -> Result<()> {
        match &self.proxy {
            Some(proxy) => proxy.bind(handle).await,
            None => Ok(()),
        }
    }
}

// ============================================================================
// Authentication Result
// ============================================================================

/// LDAP authentication result
///
/// Keeps the failure kind for logs; hosts only ever see the narrowed
/// `Option` returned by [`crate::LdapAuthenticator::authenticate`].
#[derive(Debug)]
pub enum LdapAuthResult {
    /// Authentication successful
    Success(VerifiedIdentity),
    /// Login or secret missing; the directory was not contacted
    Declined(Error),
    /// No unique DN could be resolved for the login
    ResolutionFailed(Error),
    /// The directory refused the bind as the resolved DN
    InvalidCredentials(Error),
}

impl LdapAuthResult {
    pub fn is_success(&self) -> bool {
        matches!(self, LdapAuthResult::Success(_))
    }

    pub fn identity(&self) -> Option<&VerifiedIdentity> {
        match self {
            LdapAuthResult::Success(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn into_identity(self) -> Option<VerifiedIdentity> {
        match self {
            LdapAuthResult::Success(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            LdapAuthResult::Success(_) => None,
            LdapAuthResult::Declined(e)
            | LdapAuthResult::ResolutionFailed(e)
            | LdapAuthResult::InvalidCredentials(e) => Some(e),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LdapAuthResult::Success(_) => "success",
            LdapAuthResult::Declined(_) => "declined",
            LdapAuthResult::ResolutionFailed(_) => "resolution_failed",
            LdapAuthResult::InvalidCredentials(_) => "invalid_credentials",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirbind_core::types::ReturnStyle;

    #[test]
    fn test_resolver_config_from_ldap_config() {
        let config = LdapConfig {
            base_dn: Some("ou=people,dc=example,dc=org".to_string()),
            naming_attribute: "telephone".to_string(),
            search_scope: "onelevel".to_string(),
            restrict: Some("(objectClass=person)".to_string()),
            bind_dn: Some("cn=Manager,dc=example,dc=org".to_string()),
            bind_password: Some("secret".to_string()),
            ..Default::default()
        };

        let resolver = ResolverConfig::from_config(&config).unwrap();
        assert_eq!(resolver.base_dn, "ou=people,dc=example,dc=org");
        assert_eq!(resolver.naming_attribute, "telephone");
        assert_eq!(resolver.scope, SearchScope::OneLevel);
        assert_eq!(resolver.restrict.as_deref(), Some("(objectClass=person)"));
        assert_eq!(
            resolver.proxy,
            Some(ProxyCredentials::new("cn=Manager,dc=example,dc=org", "secret"))
        );
    }

    #[test]
    fn test_resolver_config_requires_base_dn() {
        let err = ResolverConfig::from_config(&LdapConfig::default()).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_proxy_password_is_redacted() {
        let proxy = ProxyCredentials::new("cn=Manager,dc=example,dc=org", "s3cr3t");
        assert!(!format!("{:?}", proxy).contains("s3cr3t"));
    }

    #[test]
    fn test_auth_result_accessors() {
        let verified = VerifiedIdentity::new(
            "carla",
            "uid=carla,ou=people,dc=example,dc=org".into(),
            ReturnStyle::BareLogin,
        );
        let success = LdapAuthResult::Success(verified.clone());
        assert!(success.is_success());
        assert_eq!(success.identity(), Some(&verified));
        assert!(success.error().is_none());

        let failed = LdapAuthResult::ResolutionFailed(Error::EntryNotFound("(uid=x)".into()));
        assert!(!failed.is_success());
        assert_eq!(failed.kind(), "resolution_failed");
        assert!(matches!(failed.error(), Some(Error::EntryNotFound(_))));
    }
}
