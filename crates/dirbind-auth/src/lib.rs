//! Directory-backed authentication for Dirbind
//!
//! Verifies claimed credentials by binding to an LDAP directory as the
//! claimant's entry, then optionally loads attributes of that entry.

pub mod ldap;

pub use ldap::{
    AttributeEnricher, Connection, DirectoryConnector, DirectoryEntry, DirectoryHandle,
    HandleFactory, IdentityResolver, LdapAuthResult, LdapAuthenticator, LdapHandle,
    LdapSettings, LdapUrl, PatternResolver, ProxyCredentials, ResolverConfig, SearchResolver,
    Session,
};

#[cfg(any(test, feature = "test-util"))]
pub use ldap::{MemoryDirectory, MemoryHandle};
