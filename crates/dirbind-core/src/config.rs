//! Configuration for Dirbind

use crate::error::{Error, Result};
use crate::types::{AttributeSelection, ResolverKind, ReturnStyle, SearchScope};
use crate::utils::is_parenthesized;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirbindConfig {
    #[serde(default)]
    pub ldap: LdapConfig,

    #[serde(default)]
    pub attributes: AttributesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DirbindConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        debug!("Loading configuration from {}", path);
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config: {}", e)))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Failed to parse config: {}", e)))
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("DIRBIND_LDAP_URL") {
            config.ldap.server_url = Some(url);
        }
        if let Ok(base) = std::env::var("DIRBIND_BASE_DN") {
            config.ldap.base_dn = Some(base);
        }
        if let Ok(attr) = std::env::var("DIRBIND_NAMING_ATTRIBUTE") {
            config.ldap.naming_attribute = attr;
        }
        if let Ok(resolver) = std::env::var("DIRBIND_RESOLVER") {
            config.ldap.resolver = resolver;
        }
        if let Ok(scope) = std::env::var("DIRBIND_SEARCH_SCOPE") {
            config.ldap.search_scope = scope;
        }
        if let Ok(restrict) = std::env::var("DIRBIND_RESTRICT") {
            config.ldap.restrict = Some(restrict);
        }
        if let Ok(returned_id) = std::env::var("DIRBIND_RETURNED_ID") {
            config.ldap.returned_id = returned_id;
        }
        if std::env::var("DIRBIND_START_TLS").map(|v| v == "true").unwrap_or(false) {
            config.ldap.start_tls = true;
        }
        if let Ok(dn) = std::env::var("DIRBIND_BIND_DN") {
            config.ldap.bind_dn = Some(dn);
        }
        if let Ok(password) = std::env::var("DIRBIND_BIND_PASSWORD") {
            config.ldap.bind_password = Some(password);
        }
        if let Ok(timeout) = std::env::var("DIRBIND_TIMEOUT_SECONDS") {
            if let Ok(t) = timeout.parse() {
                config.ldap.timeout_seconds = t;
            }
        }

        // Attribute lookups
        if let Ok(attrs) = std::env::var("DIRBIND_ATTRIBUTES") {
            config.attributes.attributes = Some(AttributeList::Csv(attrs));
        }
        if let Ok(filter) = std::env::var("DIRBIND_RESULT_FILTER") {
            config.attributes.filter = filter;
        }

        if let Ok(level) = std::env::var("DIRBIND_LOG_LEVEL") {
            config.logging.level = level;
        }

        config
    }

    /// Attribute settings with connection details inherited from `[ldap]`
    /// where the section leaves them unset.
    pub fn effective_attributes(&self) -> AttributesConfig {
        let mut attributes = self.attributes.clone();
        if attributes.server_url.is_none() {
            attributes.server_url = self.ldap.server_url.clone();
            attributes.start_tls |= self.ldap.start_tls;
            attributes.skip_tls_verify |= self.ldap.skip_tls_verify;
        }
        if attributes.bind_dn.is_none() {
            attributes.bind_dn = self.ldap.bind_dn.clone();
            attributes.bind_password = self.ldap.bind_password.clone();
        }
        if attributes.timeout_seconds.is_none() {
            attributes.timeout_seconds = Some(self.ldap.timeout_seconds);
        }
        attributes
    }
}

/// Authenticator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LdapConfig {
    /// LDAP server URL (ldap:// or ldaps://)
    /// Example: "ldap://ldap.example.com:389"
    #[serde(default)]
    pub server_url: Option<String>,

    /// Negotiate STARTTLS before any credentials are sent
    #[serde(default)]
    pub start_tls: bool,

    /// Skip TLS certificate verification (test rigs only)
    #[serde(default)]
    pub skip_tls_verify: bool,

    /// Proxy DN bound before resolving, for directories that forbid
    /// anonymous searches
    #[serde(default)]
    pub bind_dn: Option<String>,

    /// Proxy password
    #[serde(default)]
    pub bind_password: Option<String>,

    /// Base DN for pattern composition and searches
    /// Example: "ou=people,dc=example,dc=org"
    #[serde(default)]
    pub base_dn: Option<String>,

    /// Naming attribute for user entries
    #[serde(default = "default_naming_attribute")]
    pub naming_attribute: String,

    /// "pattern" or "search"
    #[serde(default = "default_resolver")]
    pub resolver: String,

    /// "subtree" or "onelevel" (search resolver only)
    #[serde(default = "default_search_scope")]
    pub search_scope: String,

    /// Filter ANDed to the naming-attribute match, e.g. "(objectClass=person)"
    #[serde(default)]
    pub restrict: Option<String>,

    /// "dn" or "login"
    #[serde(default = "default_returned_id")]
    pub returned_id: String,

    /// Connect and operation timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_naming_attribute() -> String {
    crate::DEFAULT_NAMING_ATTRIBUTE.to_string()
}

fn default_resolver() -> String {
    "pattern".to_string()
}

fn default_search_scope() -> String {
    "subtree".to_string()
}

fn default_returned_id() -> String {
    "dn".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_result_filter() -> String {
    crate::DEFAULT_RESULT_FILTER.to_string()
}

impl Default for LdapConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            start_tls: false,
            skip_tls_verify: false,
            bind_dn: None,
            bind_password: None,
            base_dn: None,
            naming_attribute: default_naming_attribute(),
            resolver: default_resolver(),
            search_scope: default_search_scope(),
            restrict: None,
            returned_id: default_returned_id(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl LdapConfig {
    pub fn resolver_kind(&self) -> Result<ResolverKind> {
        self.resolver.parse()
    }

    pub fn scope(&self) -> Result<SearchScope> {
        self.search_scope.parse()
    }

    pub fn return_style(&self) -> Result<ReturnStyle> {
        self.returned_id.parse()
    }

    /// Base DN, required by both resolvers
    pub fn base(&self) -> Result<&str> {
        match self.base_dn.as_deref().map(str::trim) {
            Some(base) if !base.is_empty() => Ok(base),
            _ => Err(Error::config("A base Distinguished Name must be specified")),
        }
    }

    /// Proxy credentials, if configured
    pub fn proxy(&self) -> Result<Option<(&str, &str)>> {
        proxy_pair(self.bind_dn.as_deref(), self.bind_password.as_deref())
    }

    /// Validate every construction parameter
    pub fn validate(&self) -> Result<()> {
        self.base()?;

        if self.naming_attribute.trim().is_empty() {
            return Err(Error::config("The naming attribute must not be empty"));
        }

        self.resolver_kind()?;
        self.scope()?;
        self.return_style()?;
        self.proxy()?;

        if let Some(restrict) = &self.restrict {
            if !restrict.is_empty() && !is_parenthesized(restrict) {
                return Err(Error::config(format!(
                    "The restriction filter must be parenthesised, got '{}'",
                    restrict
                )));
            }
        }

        if let Some(url) = &self.server_url {
            validate_url(url)?;
        }

        if self.skip_tls_verify {
            warn!("TLS certificate verification is disabled for the authenticator");
        }

        Ok(())
    }
}

/// Attribute enrichment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AttributesConfig {
    /// LDAP server URL; inherited from `[ldap]` when unset
    #[serde(default)]
    pub server_url: Option<String>,

    #[serde(default)]
    pub start_tls: bool,

    #[serde(default)]
    pub skip_tls_verify: bool,

    #[serde(default)]
    pub bind_dn: Option<String>,

    #[serde(default)]
    pub bind_password: Option<String>,

    /// Attributes to fetch: "cn,mail" or ["cn", "mail"]; all when unset
    #[serde(default)]
    pub attributes: Option<AttributeList>,

    /// Filter for the lookup, as documented in RFC 4515
    #[serde(default = "default_result_filter")]
    pub filter: String,

    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl Default for AttributesConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            start_tls: false,
            skip_tls_verify: false,
            bind_dn: None,
            bind_password: None,
            attributes: None,
            filter: default_result_filter(),
            timeout_seconds: None,
        }
    }
}

impl AttributesConfig {
    pub fn selection(&self) -> AttributeSelection {
        match &self.attributes {
            None => AttributeSelection::All,
            Some(AttributeList::Csv(list)) => AttributeSelection::from_csv(list),
            Some(AttributeList::List(names)) => AttributeSelection::from_names(names),
        }
    }

    pub fn proxy(&self) -> Result<Option<(&str, &str)>> {
        proxy_pair(self.bind_dn.as_deref(), self.bind_password.as_deref())
    }

    pub fn validate(&self) -> Result<()> {
        if !is_parenthesized(&self.filter) {
            return Err(Error::config(format!(
                "The result filter must be parenthesised, got '{}'",
                self.filter
            )));
        }
        self.proxy()?;
        if let Some(url) = &self.server_url {
            validate_url(url)?;
        }
        Ok(())
    }
}

/// Attribute names as written in a config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeList {
    Csv(String),
    List(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

fn proxy_pair<'a>(
    bind_dn: Option<&'a str>,
    bind_password: Option<&'a str>,
) -> Result<Option<(&'a str, &'a str)>> {
    match (bind_dn.filter(|dn| !dn.is_empty()), bind_password) {
        (None, _) => Ok(None),
        (Some(dn), Some(password)) if !password.is_empty() => Ok(Some((dn, password))),
        (Some(dn), _) => Err(Error::config(format!(
            "A bind password is required for proxy DN '{}'",
            dn
        ))),
    }
}

fn validate_url(url: &str) -> Result<()> {
    if url.is_empty() {
        return Err(Error::config("An LDAP connection must be specified"));
    }
    if !url.starts_with("ldap://") && !url.starts_with("ldaps://") && !url.starts_with("ldapi://")
    {
        return Err(Error::config(
            "Server URL must start with ldap://, ldaps:// or ldapi://",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> LdapConfig {
        LdapConfig {
            server_url: Some("ldap://localhost:389".to_string()),
            base_dn: Some("ou=people,dc=example,dc=org".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = LdapConfig::default();
        assert_eq!(config.naming_attribute, "uid");
        assert_eq!(config.resolver_kind().unwrap(), ResolverKind::Pattern);
        assert_eq!(config.scope().unwrap(), SearchScope::Subtree);
        assert_eq!(config.return_style().unwrap(), ReturnStyle::FullIdentifier);
        assert!(config.proxy().unwrap().is_none());
    }

    #[test]
    fn test_config_validation() {
        let mut config = LdapConfig::default();

        // Should fail - no base DN
        assert!(config.validate().unwrap_err().is_configuration());

        config = valid();
        assert!(config.validate().is_ok());

        config.returned_id = "email".to_string();
        assert!(config.validate().is_err());

        config = valid();
        config.search_scope = "base".to_string();
        assert!(config.validate().is_err());

        config = valid();
        config.restrict = Some("objectClass=person".to_string());
        assert!(config.validate().is_err());
        config.restrict = Some("(objectClass=person)".to_string());
        assert!(config.validate().is_ok());

        config = valid();
        config.server_url = Some("http://example.org".to_string());
        assert!(config.validate().is_err());

        config = valid();
        config.bind_dn = Some("cn=Manager,dc=example,dc=org".to_string());
        assert!(config.validate().is_err());
        config.bind_password = Some("secret".to_string());
        assert_eq!(
            config.proxy().unwrap(),
            Some(("cn=Manager,dc=example,dc=org", "secret"))
        );
    }

    #[test]
    fn test_parse_toml() {
        let config = DirbindConfig::parse(
            r#"
            [ldap]
            server_url = "ldap://ldap.example.org"
            base_dn = "ou=people,dc=example,dc=org"
            resolver = "search"
            search_scope = "one"
            returned_id = "login"
            bind_dn = "cn=Manager,dc=example,dc=org"
            bind_password = "secret"

            [attributes]
            attributes = "cn,mail"
            "#,
        )
        .unwrap();

        assert!(config.ldap.validate().is_ok());
        assert_eq!(config.ldap.resolver_kind().unwrap(), ResolverKind::Search);
        assert_eq!(config.ldap.scope().unwrap(), SearchScope::OneLevel);
        assert_eq!(config.ldap.return_style().unwrap(), ReturnStyle::BareLogin);
        assert_eq!(
            config.attributes.selection(),
            AttributeSelection::Only(vec!["cn".into(), "mail".into()])
        );
        assert_eq!(config.attributes.filter, "(objectClass=*)");
    }

    #[test]
    fn test_attribute_list_forms() {
        let config = DirbindConfig::parse(
            r#"
            [attributes]
            attributes = ["cn", "mail"]
            "#,
        )
        .unwrap();
        assert_eq!(
            config.attributes.selection(),
            AttributeSelection::Only(vec!["cn".into(), "mail".into()])
        );

        let config = DirbindConfig::parse("").unwrap();
        assert_eq!(config.attributes.selection(), AttributeSelection::All);
    }

    #[test]
    fn test_effective_attributes_inherit_connection() {
        let config = DirbindConfig::parse(
            r#"
            [ldap]
            server_url = "ldap://ldap.example.org"
            start_tls = true
            bind_dn = "cn=Manager,dc=example,dc=org"
            bind_password = "secret"
            timeout_seconds = 3
            "#,
        )
        .unwrap();

        let attributes = config.effective_attributes();
        assert_eq!(attributes.server_url.as_deref(), Some("ldap://ldap.example.org"));
        assert!(attributes.start_tls);
        assert_eq!(attributes.timeout_seconds, Some(3));
        assert_eq!(
            attributes.proxy().unwrap(),
            Some(("cn=Manager,dc=example,dc=org", "secret"))
        );
    }

    #[test]
    fn test_bad_toml() {
        let err = DirbindConfig::parse("[ldap\nserver_url = 1").unwrap_err();
        assert!(err.is_configuration());
    }
}
