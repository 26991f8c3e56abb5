//! Identity types flowing through the authentication pipeline

use crate::error::{Error, Result};
use crate::types::{DnMarker, ReturnStyle};
use crate::USERDATA_KEY;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Distinguished Name of a single directory entry
///
/// Resolved fresh on every authentication attempt and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistinguishedName(String);

impl DistinguishedName {
    pub fn new(dn: impl Into<String>) -> Self {
        Self(dn.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DistinguishedName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for DistinguishedName {
    fn from(dn: String) -> Self {
        Self(dn)
    }
}

impl From<&str> for DistinguishedName {
    fn from(dn: &str) -> Self {
        Self(dn.to_string())
    }
}

/// Per-request data handed over by the host pipeline
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Credentials claimed by an inbound request
#[derive(Clone, Default)]
pub struct IdentityClaim {
    pub login: Option<String>,
    pub secret: Option<String>,
    /// Free-form auxiliary data; may carry a stashed DN marker
    pub aux_data: HashMap<String, String>,
}

impl IdentityClaim {
    pub fn new(login: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            login: Some(login.into()),
            secret: Some(secret.into()),
            aux_data: HashMap::new(),
        }
    }

    pub fn with_aux(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.aux_data.insert(key.into(), value.into());
        self
    }

    /// Claimed login; empty counts as missing
    pub fn login(&self) -> Result<&str> {
        match self.login.as_deref() {
            Some(login) if !login.is_empty() => Ok(login),
            _ => Err(Error::MissingCredential("login")),
        }
    }

    /// Claimed secret; empty counts as missing, since an empty simple bind
    /// is an unauthenticated bind that many servers accept.
    pub fn secret(&self) -> Result<&str> {
        match self.secret.as_deref() {
            Some(secret) if !secret.is_empty() => Ok(secret),
            _ => Err(Error::MissingCredential("secret")),
        }
    }

    pub fn userdata(&self) -> &str {
        self.aux_data
            .get(USERDATA_KEY)
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    /// Append to the userdata field, keeping whatever was there
    pub fn append_userdata(&mut self, data: &str) {
        self.aux_data
            .entry(USERDATA_KEY.to_string())
            .or_default()
            .push_str(data);
    }
}

impl fmt::Debug for IdentityClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityClaim")
            .field("login", &self.login)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("aux_data", &self.aux_data)
            .finish()
    }
}

/// Successful output of the authenticator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Value surfaced to the host: the DN or the bare login
    pub userid: String,
    /// Full DN the secret was verified against
    pub dn: DistinguishedName,
    pub style: ReturnStyle,
}

impl VerifiedIdentity {
    pub fn new(login: &str, dn: DistinguishedName, style: ReturnStyle) -> Self {
        let userid = match style {
            ReturnStyle::FullIdentifier => dn.to_string(),
            ReturnStyle::BareLogin => login.to_string(),
        };
        Self { userid, dn, style }
    }

    /// Marker to stash in auxiliary data, only for the bare-login style
    pub fn marker(&self) -> Option<String> {
        match self.style {
            ReturnStyle::FullIdentifier => None,
            ReturnStyle::BareLogin => Some(DnMarker::encode(&self.dn)),
        }
    }

    /// Hand the verified identity to later pipeline stages
    pub fn into_identity(self) -> Identity {
        let mut identity = Identity::new(self.userid);
        identity.dn = Some(self.dn);
        identity
    }
}

/// An authenticated identity as seen by metadata providers
#[derive(Debug, Clone, Default)]
pub struct Identity {
    /// Primary userid surfaced by the authenticator
    pub userid: String,
    /// DN carried over from a typed handoff
    pub dn: Option<DistinguishedName>,
    pub aux_data: HashMap<String, String>,
    /// Directory attributes merged in by enrichment
    pub attributes: HashMap<String, Vec<String>>,
}

impl Identity {
    pub fn new(userid: impl Into<String>) -> Self {
        Self {
            userid: userid.into(),
            ..Default::default()
        }
    }

    /// Build from an authenticated claim, keeping its auxiliary data
    pub fn from_claim(userid: impl Into<String>, claim: &IdentityClaim) -> Self {
        Self {
            userid: userid.into(),
            aux_data: claim.aux_data.clone(),
            ..Default::default()
        }
    }

    /// DN to look attributes up for.
    ///
    /// The typed handoff wins, then a stashed marker, then the userid itself
    /// (which already is the DN for the full-identifier return style).
    pub fn record_identifier(&self) -> DistinguishedName {
        if let Some(dn) = &self.dn {
            return dn.clone();
        }
        self.aux_data
            .get(USERDATA_KEY)
            .and_then(|userdata| DnMarker::find(userdata))
            .unwrap_or_else(|| DistinguishedName::new(self.userid.clone()))
    }

    /// Directory values overwrite existing keys
    pub fn merge_attributes(&mut self, attributes: HashMap<String, Vec<String>>) {
        self.attributes.extend(attributes);
    }

    /// Get first value of an attribute
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .and_then(|v| v.first())
            .map(|s| s.as_str())
    }
}
