//! Directory handle abstraction

use crate::ldap::types::DirectoryEntry;
use async_trait::async_trait;
use dirbind_core::types::{AttributeSelection, SearchScope};
use dirbind_core::{Error, Result};

/// A session to one directory server.
///
/// Binding changes which identity the session is authenticated as, so every
/// operation takes `&mut self`: one caller at a time.
#[async_trait]
pub trait DirectoryHandle: Send {
    /// Authenticate the session as `dn`.
    ///
    /// Rejected credentials are reported as [`Error::InvalidCredentials`];
    /// anything else as a directory error.
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()>;

    /// Search beneath `base`. A base that does not exist yields no entries.
    ///
    /// `AttributeSelection::Only(vec![])` asks for DNs only.
    async fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &AttributeSelection,
    ) -> Result<Vec<DirectoryEntry>>;

    /// Upgrade the session to an encrypted channel
    async fn start_tls(&mut self) -> Result<()> {
        Err(Error::Unsupported("start_tls"))
    }

    /// Release the session
    async fn unbind(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Produces a fresh, unconnected handle for every call
pub trait HandleFactory: Send + Sync {
    fn open(&self) -> Box<dyn DirectoryHandle>;
}
