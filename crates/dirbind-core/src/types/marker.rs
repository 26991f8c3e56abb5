//! DN marker carried in auxiliary data
//!
//! Wire format: `<dn:BASE64(dn)>`, appended to whatever the field already
//! holds.

use crate::types::DistinguishedName;
use base64::{engine::general_purpose::STANDARD, Engine};
use once_cell::sync::Lazy;
use regex::Regex;

static MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<dn:(?P<b64dn>[A-Za-z0-9+/]+=*)>").expect("valid marker regex"));

pub struct DnMarker;

impl DnMarker {
    pub fn encode(dn: &DistinguishedName) -> String {
        format!("<dn:{}>", STANDARD.encode(dn.as_str()))
    }

    /// Find the most recently appended marker anywhere in `userdata`.
    ///
    /// Markers that are not valid base64 or not UTF-8 are skipped.
    pub fn find(userdata: &str) -> Option<DistinguishedName> {
        MARKER_RE
            .captures_iter(userdata)
            .filter_map(|caps| {
                let bytes = STANDARD.decode(&caps["b64dn"]).ok()?;
                String::from_utf8(bytes).ok()
            })
            .last()
            .map(DistinguishedName::new)
    }
}
