//! Directory handle resolution
//!
//! Turns a connection descriptor into per-call sessions. A server address or
//! a handle factory yields a fresh handle per call; an existing handle is
//! shared and every session holds its lock for the whole call.

use crate::ldap::client::{LdapSettings, LdapUrl};
use crate::ldap::handle::{DirectoryHandle, HandleFactory};
use dirbind_core::{Error, Result};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

/// Connection descriptor accepted by the authenticator and the enricher
pub enum Connection {
    /// Server address such as `ldap://ldap.example.com:389`
    Url(String),
    /// Opens a new handle for every call
    Factory(Arc<dyn HandleFactory>),
    /// Existing handle, shared by all calls
    Shared(Box<dyn DirectoryHandle>),
}

impl Connection {
    pub fn url(url: impl Into<String>) -> Self {
        Connection::Url(url.into())
    }

    pub fn factory(factory: impl HandleFactory + 'static) -> Self {
        Connection::Factory(Arc::new(factory))
    }

    pub fn shared(handle: impl DirectoryHandle + 'static) -> Self {
        Connection::Shared(Box::new(handle))
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Connection::Url(url) => f.debug_tuple("Url").field(url).finish(),
            Connection::Factory(_) => f.write_str("Factory"),
            Connection::Shared(_) => f.write_str("Shared"),
        }
    }
}

enum HandleSource {
    PerCall(Arc<dyn HandleFactory>),
    Shared(Arc<Mutex<Box<dyn DirectoryHandle>>>),
}

/// Resolved connection, ready to hand out sessions
pub struct DirectoryConnector {
    source: HandleSource,
    encrypted: bool,
}

impl DirectoryConnector {
    /// Resolve a connection descriptor.
    ///
    /// A server address is connected lazily, so no network I/O happens here
    /// unless STARTTLS is requested. STARTTLS is tried once; a failure is a
    /// configuration error and never falls back to plaintext.
    pub async fn make_connection(
        connection: Option<Connection>,
        settings: &LdapSettings,
    ) -> Result<Self> {
        let source = match connection {
            Some(Connection::Url(url)) if !url.trim().is_empty() => {
                debug!("Using LDAP server: {}", url);
                HandleSource::PerCall(Arc::new(LdapUrl::new(url.trim(), settings.clone())))
            }
            Some(Connection::Factory(factory)) => HandleSource::PerCall(factory),
            Some(Connection::Shared(handle)) => HandleSource::Shared(Arc::new(Mutex::new(handle))),
            Some(Connection::Url(_)) | None => {
                return Err(Error::config("An LDAP connection must be specified"));
            }
        };

        let connector = Self {
            source,
            encrypted: settings.start_tls,
        };

        if connector.encrypted {
            connector.check_start_tls().await?;
        }

        Ok(connector)
    }

    async fn check_start_tls(&self) -> Result<()> {
        let result = match &self.source {
            HandleSource::PerCall(factory) => {
                let mut handle = factory.open();
                let result = handle.start_tls().await;
                let _ = handle.unbind().await;
                result
            }
            HandleSource::Shared(handle) => handle.lock().await.start_tls().await,
        };

        result.map_err(|e| {
            warn!("STARTTLS negotiation failed: {}", e);
            Error::config(format!("Cannot upgrade the connection: {}", e))
        })
    }

    /// Whether every call goes through one shared handle
    pub fn is_shared(&self) -> bool {
        matches!(self.source, HandleSource::Shared(_))
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Start a session for one call.
    ///
    /// Shared handles are locked until the session is dropped or closed, so
    /// bind state never leaks between concurrent calls.
    pub async fn session(&self) -> Result<Session> {
        match &self.source {
            HandleSource::PerCall(factory) => {
                let mut handle = factory.open();
                if self.encrypted {
                    handle.start_tls().await?;
                }
                Ok(Session::Owned(handle))
            }
            HandleSource::Shared(handle) => Ok(Session::Shared(handle.clone().lock_owned().await)),
        }
    }
}

impl fmt::Debug for DirectoryConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryConnector")
            .field("shared", &self.is_shared())
            .field("encrypted", &self.encrypted)
            .finish()
    }
}

/// Exclusive access to a directory handle for the duration of one call
pub enum Session {
    Owned(Box<dyn DirectoryHandle>),
    Shared(OwnedMutexGuard<Box<dyn DirectoryHandle>>),
}

impl Session {
    pub fn handle(&mut self) -> &mut dyn DirectoryHandle {
        match self {
            Session::Owned(handle) => &mut **handle,
            Session::Shared(guard) => &mut ***guard,
        }
    }

    /// End the call. Owned handles are unbound; shared ones stay open.
    pub async fn close(self) {
        if let Session::Owned(mut handle) = self {
            if let Err(e) = handle.unbind().await {
                debug!("Unbind failed: {}", e);
            }
        }
    }
}
