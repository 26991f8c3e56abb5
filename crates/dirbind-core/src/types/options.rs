//! Configuration keywords parsed into strong types

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Depth of a directory search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// The named entry only
    Base,
    /// Direct children of the base
    OneLevel,
    /// The base and everything beneath it
    Subtree,
}

impl Default for SearchScope {
    fn default() -> Self {
        Self::Subtree
    }
}

impl FromStr for SearchScope {
    type Err = Error;

    /// Accepts `sub[tree]` or `one[level]`, abbreviated to at least three
    /// letters. Base scope is reserved for attribute lookups.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.get(..3) {
            Some("sub") if "subtree".starts_with(&lower) => Ok(SearchScope::Subtree),
            Some("one") if "onelevel".starts_with(&lower) => Ok(SearchScope::OneLevel),
            _ => Err(Error::config(format!(
                "The search scope should be 'one[level]' or 'sub[tree]', got '{}'",
                s
            ))),
        }
    }
}

/// What the authenticator surfaces on success
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReturnStyle {
    /// The full DN
    FullIdentifier,
    /// The claimed login, with the DN stashed as a marker
    BareLogin,
}

impl Default for ReturnStyle {
    fn default() -> Self {
        Self::FullIdentifier
    }
}

impl FromStr for ReturnStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dn" | "full-identifier" => Ok(ReturnStyle::FullIdentifier),
            "login" | "bare-login" => Ok(ReturnStyle::BareLogin),
            _ => Err(Error::config(format!(
                "The return style should be 'dn' or 'login', got '{}'",
                s
            ))),
        }
    }
}

/// Strategy used to turn a login into a DN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverKind {
    Pattern,
    Search,
}

impl Default for ResolverKind {
    fn default() -> Self {
        Self::Pattern
    }
}

impl FromStr for ResolverKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pattern" => Ok(ResolverKind::Pattern),
            "search" => Ok(ResolverKind::Search),
            _ => Err(Error::config(format!(
                "The resolver should be 'pattern' or 'search', got '{}'",
                s
            ))),
        }
    }
}

/// Attributes to fetch from an entry
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AttributeSelection {
    #[default]
    All,
    Only(Vec<String>),
}

impl AttributeSelection {
    /// Parse a comma separated list such as `cn,uid,mail`
    pub fn from_csv(list: &str) -> Self {
        Self::from_names(list.split(','))
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Only(
            names
                .into_iter()
                .map(|n| n.as_ref().trim().to_string())
                .filter(|n| !n.is_empty())
                .collect(),
        )
    }

    pub fn names(&self) -> Option<&[String]> {
        match self {
            AttributeSelection::All => None,
            AttributeSelection::Only(names) => Some(names),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_scope_keywords() {
        assert_eq!("subtree".parse::<SearchScope>().unwrap(), SearchScope::Subtree);
        assert_eq!("sub".parse::<SearchScope>().unwrap(), SearchScope::Subtree);
        assert_eq!("OneLevel".parse::<SearchScope>().unwrap(), SearchScope::OneLevel);
        assert_eq!("one".parse::<SearchScope>().unwrap(), SearchScope::OneLevel);

        assert!("base".parse::<SearchScope>().is_err());
        assert!("su".parse::<SearchScope>().is_err());
        assert!("subway".parse::<SearchScope>().unwrap_err().is_configuration());
    }

    #[test]
    fn test_return_style_keywords() {
        assert_eq!("dn".parse::<ReturnStyle>().unwrap(), ReturnStyle::FullIdentifier);
        assert_eq!("LOGIN".parse::<ReturnStyle>().unwrap(), ReturnStyle::BareLogin);
        assert_eq!(
            "full-identifier".parse::<ReturnStyle>().unwrap(),
            ReturnStyle::FullIdentifier
        );
        assert!("email".parse::<ReturnStyle>().unwrap_err().is_configuration());
    }

    #[test]
    fn test_attribute_lists() {
        assert_eq!(
            AttributeSelection::from_csv("cn,uid,mail"),
            AttributeSelection::Only(vec!["cn".into(), "uid".into(), "mail".into()])
        );
        assert_eq!(
            AttributeSelection::from_csv("mail"),
            AttributeSelection::Only(vec!["mail".into()])
        );
        assert_eq!(
            AttributeSelection::from_names([" cn ", "", "mail"]),
            AttributeSelection::Only(vec!["cn".into(), "mail".into()])
        );
        assert!(AttributeSelection::All.names().is_none());
    }
}
