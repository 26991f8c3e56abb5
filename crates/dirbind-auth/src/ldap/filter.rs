//! Search filter evaluation for the in-memory directory
//!
//! Filters are parsed by ldap3 into their BER structure and evaluated
//! against entry attributes. Matching is case-insensitive for both
//! attribute names and values.

use dirbind_core::{Error, Result};
use ldap3::asn1::{ASNTag, StructureTag, PL};
use std::collections::HashMap;

// Context tags of the Filter CHOICE in RFC 4511
const AND: u64 = 0;
const OR: u64 = 1;
const NOT: u64 = 2;
const EQUALITY: u64 = 3;
const SUBSTRINGS: u64 = 4;
const GREATER_OR_EQUAL: u64 = 5;
const LESS_OR_EQUAL: u64 = 6;
const PRESENT: u64 = 7;
const APPROX: u64 = 8;

const SUB_INITIAL: u64 = 0;
const SUB_ANY: u64 = 1;
const SUB_FINAL: u64 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    tag: StructureTag,
}

impl Filter {
    pub fn parse(input: &str) -> Result<Filter> {
        let tag = ldap3::parse_filter(input)
            .map_err(|_| Error::Directory(format!("Bad search filter {}", input)))?;
        Ok(Filter {
            tag: tag.into_structure(),
        })
    }

    pub fn matches(&self, attrs: &HashMap<String, Vec<String>>) -> bool {
        evaluate(&self.tag, attrs)
    }
}

/// Extensible matches and anything else unrecognized never match.
fn evaluate(tag: &StructureTag, attrs: &HashMap<String, Vec<String>>) -> bool {
    match (tag.id, &tag.payload) {
        (AND, PL::C(inner)) => inner.iter().all(|t| evaluate(t, attrs)),
        (OR, PL::C(inner)) => inner.iter().any(|t| evaluate(t, attrs)),
        (NOT, PL::C(inner)) => !inner.iter().all(|t| evaluate(t, attrs)),
        (PRESENT, PL::P(attr)) => {
            let attr = text(attr);
            attr.eq_ignore_ascii_case("objectClass") || !values(attrs, &attr).is_empty()
        }
        (EQUALITY | APPROX | GREATER_OR_EQUAL | LESS_OR_EQUAL, PL::C(inner)) => {
            let Some((attr, value)) = assertion(inner) else {
                return false;
            };
            values(attrs, &attr).iter().any(|v| {
                let v = v.to_lowercase();
                match tag.id {
                    GREATER_OR_EQUAL => v >= value,
                    LESS_OR_EQUAL => v <= value,
                    _ => v == value,
                }
            })
        }
        (SUBSTRINGS, PL::C(inner)) => match inner.as_slice() {
            [attr, parts] => {
                let (PL::P(attr), PL::C(parts)) = (&attr.payload, &parts.payload) else {
                    return false;
                };
                values(attrs, &text(attr))
                    .iter()
                    .any(|v| substring_match(&v.to_lowercase(), parts))
            }
            _ => false,
        },
        _ => false,
    }
}

fn assertion(inner: &[StructureTag]) -> Option<(String, String)> {
    match inner {
        [attr, value] => match (&attr.payload, &value.payload) {
            (PL::P(attr), PL::P(value)) => Some((text(attr), text(value).to_lowercase())),
            _ => None,
        },
        _ => None,
    }
}

fn text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn values<'a>(attrs: &'a HashMap<String, Vec<String>>, name: &str) -> &'a [String] {
    attrs
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_slice())
        .unwrap_or(&[])
}

fn substring_match(value: &str, parts: &[StructureTag]) -> bool {
    let mut rest = value;

    for part in parts {
        let PL::P(bytes) = &part.payload else {
            return false;
        };
        let needle = text(bytes).to_lowercase();
        match part.id {
            SUB_INITIAL => match rest.strip_prefix(needle.as_str()) {
                Some(tail) => rest = tail,
                None => return false,
            },
            SUB_ANY => match rest.find(needle.as_str()) {
                Some(idx) => rest = &rest[idx + needle.len()..],
                None => return false,
            },
            SUB_FINAL => return rest.ends_with(needle.as_str()),
            _ => return false,
        }
    }
    true
}
