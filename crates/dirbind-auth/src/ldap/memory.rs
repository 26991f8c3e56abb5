//! In-memory directory
//!
//! A small directory server living in process memory, used by the test
//! suites and the CLI demo. Every handle it opens carries its own bind state,
//! while the entries are shared.

use crate::ldap::filter::Filter;
use crate::ldap::handle::{DirectoryHandle, HandleFactory};
use crate::ldap::types::DirectoryEntry;
use async_trait::async_trait;
use dirbind_core::types::{AttributeSelection, SearchScope};
use dirbind_core::utils::{normalize_dn, parent_dn};
use dirbind_core::{Error, Result};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct MemoryEntry {
    dn: String,
    attrs: HashMap<String, Vec<String>>,
    password: Option<String>,
}

#[derive(Debug)]
struct DirectoryState {
    /// Entries keyed by normalized DN
    entries: BTreeMap<String, MemoryEntry>,
    anonymous_search: bool,
    start_tls: bool,
    available: bool,
    operations: usize,
}

impl Default for DirectoryState {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            anonymous_search: true,
            start_tls: true,
            available: true,
            operations: 0,
        }
    }
}

/// Shared in-memory directory tree
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    state: Arc<RwLock<DirectoryState>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry. Entries without a password cannot be bound.
    pub fn add_entry(&self, dn: &str, password: Option<&str>, attrs: &[(&str, Vec<&str>)]) {
        let attrs = attrs
            .iter()
            .map(|(name, values)| {
                (
                    name.to_string(),
                    values.iter().map(|v| v.to_string()).collect(),
                )
            })
            .collect();

        self.state.write().entries.insert(
            normalize_dn(dn),
            MemoryEntry {
                dn: dn.to_string(),
                attrs,
                password: password.map(str::to_string),
            },
        );
    }

    pub fn remove_entry(&self, dn: &str) -> bool {
        self.state.write().entries.remove(&normalize_dn(dn)).is_some()
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether searches are allowed before any successful bind
    pub fn set_anonymous_search(&self, allowed: bool) {
        self.state.write().anonymous_search = allowed;
    }

    /// Whether STARTTLS negotiation succeeds
    pub fn set_start_tls(&self, supported: bool) {
        self.state.write().start_tls = supported;
    }

    /// Simulate a transport outage: every operation fails
    pub fn set_available(&self, available: bool) {
        self.state.write().available = available;
    }

    /// Number of operations served so far, across all handles
    pub fn operations(&self) -> usize {
        self.state.read().operations
    }

    pub fn handle(&self) -> MemoryHandle {
        MemoryHandle {
            directory: self.clone(),
            bound_as: None,
            encrypted: false,
        }
    }

    fn begin(&self) -> Result<()> {
        let mut state = self.state.write();
        state.operations += 1;
        if !state.available {
            return Err(Error::Directory("Can't contact LDAP server".to_string()));
        }
        Ok(())
    }
}

impl HandleFactory for MemoryDirectory {
    fn open(&self) -> Box<dyn DirectoryHandle> {
        Box::new(self.handle())
    }
}

/// One session to a [`MemoryDirectory`]
#[derive(Debug)]
pub struct MemoryHandle {
    directory: MemoryDirectory,
    bound_as: Option<String>,
    encrypted: bool,
}

impl MemoryHandle {
    /// DN the session is currently authenticated as
    pub fn bound_as(&self) -> Option<&str> {
        self.bound_as.as_deref()
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }
}

#[async_trait]
impl DirectoryHandle for MemoryHandle {
    async fn simple_bind(&mut self, dn: &str, password: &str) -> Result<()> {
        self.directory.begin()?;
        self.bound_as = None;

        // Unauthenticated binds (empty password) are refused outright
        if password.is_empty() {
            return Err(Error::InvalidCredentials);
        }

        let state = self.directory.state.read();
        let entry = state
            .entries
            .get(&normalize_dn(dn))
            .ok_or(Error::InvalidCredentials)?;

        match entry.password.as_deref() {
            Some(expected) if expected == password => {
                self.bound_as = Some(entry.dn.clone());
                Ok(())
            }
            _ => Err(Error::InvalidCredentials),
        }
    }

    async fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &str,
        attributes: &AttributeSelection,
    ) -> Result<Vec<DirectoryEntry>> {
        self.directory.begin()?;

        let state = self.directory.state.read();
        if !state.anonymous_search && self.bound_as.is_none() {
            return Err(Error::Directory(
                "Insufficient access: anonymous search is disabled".to_string(),
            ));
        }

        let filter = Filter::parse(filter)?;
        let base = normalize_dn(base);

        Ok(state
            .entries
            .iter()
            .filter(|(key, _)| in_scope(key, &base, scope))
            .filter(|(_, entry)| filter.matches(&entry.attrs))
            .map(|(_, entry)| DirectoryEntry {
                dn: entry.dn.clone(),
                attrs: project(&entry.attrs, attributes),
            })
            .collect())
    }

    async fn start_tls(&mut self) -> Result<()> {
        self.directory.begin()?;
        if !self.directory.state.read().start_tls {
            return Err(Error::Directory("StartTLS is not supported".to_string()));
        }
        self.encrypted = true;
        Ok(())
    }

    async fn unbind(&mut self) -> Result<()> {
        self.bound_as = None;
        Ok(())
    }
}

fn in_scope(dn: &str, base: &str, scope: SearchScope) -> bool {
    match scope {
        SearchScope::Base => dn == base,
        SearchScope::OneLevel => parent_dn(dn).as_deref() == Some(base),
        SearchScope::Subtree => {
            base.is_empty() || dn == base || dn.ends_with(&format!(",{}", base))
        }
    }
}

fn project(
    attrs: &HashMap<String, Vec<String>>,
    selection: &AttributeSelection,
) -> HashMap<String, Vec<String>> {
    match selection.names() {
        None => attrs.clone(),
        Some(names) => attrs
            .iter()
            .filter(|(key, _)| names.iter().any(|n| n.eq_ignore_ascii_case(key)))
            .map(|(key, values)| (key.clone(), values.clone()))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE_DN: &str = "ou=people,dc=example,dc=org";

    fn directory() -> MemoryDirectory {
        let directory = MemoryDirectory::new();
        directory.add_entry(BASE_DN, None, &[("ou", vec!["people"])]);
        directory.add_entry(
            "uid=carla,ou=people,dc=example,dc=org",
            Some("hello"),
            &[
                ("uid", vec!["carla"]),
                ("cn", vec!["Carla Paola"]),
                ("mail", vec!["carla@example.org"]),
            ],
        );
        directory.add_entry(
            "uid=dario,ou=staff,ou=people,dc=example,dc=org",
            Some("secret"),
            &[("uid", vec!["dario"])],
        );
        directory
    }

    #[tokio::test]
    async fn test_bind() {
        let directory = directory();
        let mut handle = directory.handle();

        handle
            .simple_bind("UID=Carla, ou=people,dc=example,dc=org", "hello")
            .await
            .unwrap();
        assert_eq!(handle.bound_as(), Some("uid=carla,ou=people,dc=example,dc=org"));

        let err = handle
            .simple_bind("uid=carla,ou=people,dc=example,dc=org", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCredentials));
        assert!(handle.bound_as().is_none());

        assert!(handle.simple_bind("uid=carla,ou=people,dc=example,dc=org", "").await.is_err());
        assert!(handle.simple_bind("uid=nobody,dc=example,dc=org", "x").await.is_err());
        assert!(handle.simple_bind(BASE_DN, "x").await.is_err());
    }

    #[tokio::test]
    async fn test_search_scopes() {
        let directory = directory();
        let mut handle = directory.handle();
        let dns_only = AttributeSelection::Only(vec![]);

        let subtree = handle
            .search(BASE_DN, SearchScope::Subtree, "(uid=*)", &dns_only)
            .await
            .unwrap();
        assert_eq!(subtree.len(), 2);

        let one = handle
            .search(BASE_DN, SearchScope::OneLevel, "(uid=*)", &dns_only)
            .await
            .unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].dn, "uid=carla,ou=people,dc=example,dc=org");
        assert!(one[0].attrs.is_empty());

        let base = handle
            .search(
                "uid=carla,ou=people,dc=example,dc=org",
                SearchScope::Base,
                "(objectClass=*)",
                &AttributeSelection::from_csv("cn,MAIL"),
            )
            .await
            .unwrap();
        assert_eq!(base.len(), 1);
        assert_eq!(base[0].get_attribute("cn"), Some("Carla Paola"));
        assert_eq!(base[0].get_attribute("mail"), Some("carla@example.org"));
        assert!(base[0].get_attribute("uid").is_none());

        let missing = handle
            .search("uid=nobody,dc=example,dc=org", SearchScope::Base, "(objectClass=*)", &dns_only)
            .await
            .unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_search_disabled() {
        let directory = directory();
        directory.set_anonymous_search(false);
        let mut handle = directory.handle();

        assert!(handle
            .search(BASE_DN, SearchScope::Subtree, "(uid=carla)", &AttributeSelection::All)
            .await
            .is_err());

        handle
            .simple_bind("uid=dario,ou=staff,ou=people,dc=example,dc=org", "secret")
            .await
            .unwrap();
        assert!(handle
            .search(BASE_DN, SearchScope::Subtree, "(uid=carla)", &AttributeSelection::All)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_start_tls_and_outage() {
        let directory = directory();
        let mut handle = directory.handle();
        handle.start_tls().await.unwrap();
        assert!(handle.is_encrypted());

        directory.set_start_tls(false);
        assert!(directory.handle().start_tls().await.is_err());

        directory.set_available(false);
        let err = handle
            .simple_bind("uid=carla,ou=people,dc=example,dc=org", "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Directory(_)));
    }

    #[tokio::test]
    async fn test_operations_are_counted() {
        let directory = directory();
        assert_eq!(directory.operations(), 0);

        let mut handle = directory.open();
        let _ = handle.simple_bind("uid=carla,ou=people,dc=example,dc=org", "hello").await;
        let _ = handle
            .search(BASE_DN, SearchScope::Subtree, "(uid=carla)", &AttributeSelection::All)
            .await;
        assert_eq!(directory.operations(), 2);

        assert!(directory.remove_entry("uid=carla,ou=people,dc=example,dc=org"));
        assert_eq!(directory.len(), 2);
    }
}
