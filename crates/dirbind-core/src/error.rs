//! Error types for Dirbind

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Configuration Errors
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    // Resolution Errors
    #[error("The claim has no {0}")]
    MissingCredential(&'static str),

    #[error("Couldn't bind with supplied credentials: {0}")]
    CouldNotBind(String),

    #[error("No entry found for {0}")]
    EntryNotFound(String),

    #[error("Too many entries found for {filter}: {count}")]
    AmbiguousEntry { filter: String, count: usize },

    // Verification Errors
    #[error("The directory rejected the supplied credentials")]
    InvalidCredentials,

    // Directory Errors
    #[error("Directory error: {0}")]
    Directory(String),

    #[error("Operation not supported by this directory handle: {0}")]
    Unsupported(&'static str),

    // Enrichment Errors
    #[error("Cannot add metadata: {0}")]
    EnrichmentFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidConfiguration(_) => "InvalidConfiguration",
            Error::MissingCredential(_) => "MissingCredential",
            Error::CouldNotBind(_) => "CouldNotBind",
            Error::EntryNotFound(_) => "EntryNotFound",
            Error::AmbiguousEntry { .. } => "AmbiguousEntry",
            Error::InvalidCredentials => "InvalidCredentials",
            Error::Directory(_) => "DirectoryError",
            Error::Unsupported(_) => "Unsupported",
            Error::EnrichmentFailed(_) => "EnrichmentFailed",
            Error::Io(_) => "InternalError",
            Error::Other(_) => "InternalError",
        }
    }

    /// Raised while building a component; fatal at startup.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::InvalidConfiguration(_))
    }

    /// Expected per-call outcome of turning a claim into a DN.
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            Error::MissingCredential(_)
                | Error::CouldNotBind(_)
                | Error::EntryNotFound(_)
                | Error::AmbiguousEntry { .. }
                | Error::Directory(_)
                | Error::Unsupported(_)
        )
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::InvalidConfiguration(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy() {
        assert!(Error::config("no base DN").is_configuration());
        assert!(!Error::config("no base DN").is_resolution_failure());

        let ambiguous = Error::AmbiguousEntry {
            filter: "(uid=carla)".to_string(),
            count: 2,
        };
        assert!(ambiguous.is_resolution_failure());
        assert_eq!(ambiguous.code(), "AmbiguousEntry");

        assert!(!Error::InvalidCredentials.is_resolution_failure());
        assert!(!Error::EnrichmentFailed("timeout".into()).is_resolution_failure());
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::MissingCredential("login").to_string(),
            "The claim has no login"
        );
        assert_eq!(
            Error::EntryNotFound("(uid=bob)".into()).to_string(),
            "No entry found for (uid=bob)"
        );
    }
}
