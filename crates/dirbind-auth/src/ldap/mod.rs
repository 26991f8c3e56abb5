//! LDAP authentication module
//!
//! Provides:
//! - Pattern and search based DN resolution
//! - Bind-as-user credential verification
//! - Attribute lookups for authenticated identities
//! - STARTTLS negotiation at construction time
//! - An in-memory directory for tests and demos (`test-util` feature)

mod authenticator;
mod client;
mod connector;
mod enricher;
#[cfg(any(test, feature = "test-util"))]
mod filter;
mod handle;
#[cfg(any(test, feature = "test-util"))]
mod memory;
mod resolver;
mod types;

pub use authenticator::LdapAuthenticator;
pub use client::{LdapHandle, LdapSettings, LdapUrl};
pub use connector::{Connection, DirectoryConnector, Session};
pub use enricher::AttributeEnricher;
#[cfg(any(test, feature = "test-util"))]
pub use filter::Filter;
pub use handle::{DirectoryHandle, HandleFactory};
#[cfg(any(test, feature = "test-util"))]
pub use memory::{MemoryDirectory, MemoryHandle};
pub use resolver::{IdentityResolver, PatternResolver, SearchResolver};
pub use types::*;
