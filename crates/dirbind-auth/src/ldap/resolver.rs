//! Identity resolvers
//!
//! Turn a claimed login into the DN the secret is verified against.

use crate::ldap::handle::DirectoryHandle;
use crate::ldap::types::ResolverConfig;
use async_trait::async_trait;
use dirbind_core::types::{AttributeSelection, DistinguishedName, IdentityClaim};
use dirbind_core::{Error, Result};
use ldap3::{dn_escape, ldap_escape};
use tracing::debug;

/// Resolves the DN for a claim
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve_dn(
        &self,
        handle: &mut dyn DirectoryHandle,
        claim: &IdentityClaim,
    ) -> Result<DistinguishedName>;
}

/// Composes `<naming_attribute>=<login>,<base_dn>` without searching.
///
/// If the login is `rms` and the base DN is `ou=developers,dc=gnu,dc=org`,
/// the DN is `uid=rms,ou=developers,dc=gnu,dc=org`.
#[derive(Debug, Clone)]
pub struct PatternResolver {
    config: ResolverConfig,
}

impl PatternResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn compose(&self, login: &str) -> DistinguishedName {
        DistinguishedName::new(format!(
            "{}={},{}",
            self.config.naming_attribute,
            dn_escape(login),
            self.config.base_dn
        ))
    }
}

#[async_trait]
impl IdentityResolver for PatternResolver {
    async fn resolve_dn(
        &self,
        handle: &mut dyn DirectoryHandle,
        claim: &IdentityClaim,
    ) -> Result<DistinguishedName> {
        let login = claim.login()?;
        self.config.proxy_bind(handle).await?;
        Ok(self.compose(login))
    }
}

/// Finds the unique entry whose naming attribute equals the login.
///
/// With the `uid` naming attribute and base `dc=gnu,dc=org`, the login `rms`
/// is looked up as `(uid=rms)` beneath the base, hopefully finding
/// `uid=rms,ou=developers,dc=gnu,dc=org`.
#[derive(Debug, Clone)]
pub struct SearchResolver {
    config: ResolverConfig,
}

impl SearchResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Search filter for `login`, with every RFC 4515 metacharacter escaped
    pub fn search_filter(&self, login: &str) -> String {
        let value = ldap_escape(login);
        match &self.config.restrict {
            Some(restrict) => format!(
                "(&{}({}={}))",
                restrict, self.config.naming_attribute, value
            ),
            None => format!("({}={})", self.config.naming_attribute, value),
        }
    }
}

#[async_trait]
impl IdentityResolver for SearchResolver {
    async fn resolve_dn(
        &self,
        handle: &mut dyn DirectoryHandle,
        claim: &IdentityClaim,
    ) -> Result<DistinguishedName> {
        let login = claim.login()?;
        self.config.proxy_bind(handle).await?;

        let filter = self.search_filter(login);
        debug!("Searching for user with filter: {}", filter);

        let mut entries = handle
            .search(
                &self.config.base_dn,
                self.config.scope,
                &filter,
                &AttributeSelection::Only(Vec::new()),
            )
            .await?;

        match entries.len() {
            1 => Ok(DistinguishedName::new(entries.remove(0).dn)),
            0 => Err(Error::EntryNotFound(filter)),
            count => Err(Error::AmbiguousEntry { filter, count }),
        }
    }
}
