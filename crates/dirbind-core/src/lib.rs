//! Dirbind Core Library
//!
//! Configuration, error taxonomy and identity types shared by the directory
//! authenticator and its tooling.

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

pub use config::{AttributesConfig, DirbindConfig, LdapConfig};
pub use error::{Error, Result};

/// Dirbind version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Naming attribute used when none is configured
pub const DEFAULT_NAMING_ATTRIBUTE: &str = "uid";

/// Filter applied to attribute lookups when none is configured
pub const DEFAULT_RESULT_FILTER: &str = "(objectClass=*)";

/// Auxiliary data key carrying the encoded DN marker
pub const USERDATA_KEY: &str = "userdata";
