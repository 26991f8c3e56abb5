//! Utility functions

/// Canonical form of a DN for comparisons: RDNs trimmed and lowercased.
///
/// Escaped commas (`\,`) stay inside their RDN.
pub fn normalize_dn(dn: &str) -> String {
    split_rdns(dn)
        .iter()
        .map(|rdn| match rdn.split_once('=') {
            Some((attr, value)) => format!(
                "{}={}",
                attr.trim().to_ascii_lowercase(),
                value.trim().to_lowercase()
            ),
            None => rdn.trim().to_lowercase(),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Split a DN into its RDNs, honouring backslash escapes
pub fn split_rdns(dn: &str) -> Vec<String> {
    let mut rdns = Vec::new();
    let mut current = String::new();
    let mut escaped = false;

    for c in dn.chars() {
        if escaped {
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            current.push(c);
            escaped = true;
        } else if c == ',' {
            rdns.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    if !current.trim().is_empty() || !rdns.is_empty() {
        rdns.push(current);
    }

    rdns
}

/// Parent DN, or `None` for a single-RDN name
pub fn parent_dn(dn: &str) -> Option<String> {
    let rdns = split_rdns(dn);
    if rdns.len() < 2 {
        return None;
    }
    Some(rdns[1..].join(","))
}

/// True when `filter` is a single, balanced, parenthesised filter
/// expression such as `(objectClass=person)` or `(&(a=b)(c=d))`.
pub fn is_parenthesized(filter: &str) -> bool {
    let filter = filter.trim();
    if !filter.starts_with('(') || !filter.ends_with(')') {
        return false;
    }

    let mut depth = 0usize;
    let mut escaped = false;
    for (i, c) in filter.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
                if depth == 0 && i != filter.len() - 1 {
                    return false;
                }
            }
            _ => {}
        }
    }

    depth == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_dn() {
        assert_eq!(
            normalize_dn("UID=Carla, ou=People ,DC=example,dc=org"),
            "uid=carla,ou=people,dc=example,dc=org"
        );
        assert_eq!(
            normalize_dn("cn=Smith\\, John,dc=example"),
            "cn=smith\\, john,dc=example"
        );
    }

    #[test]
    fn test_parent_dn() {
        assert_eq!(
            parent_dn("uid=carla,ou=people,dc=example,dc=org").as_deref(),
            Some("ou=people,dc=example,dc=org")
        );
        assert_eq!(
            parent_dn("cn=Smith\\, John,dc=example").as_deref(),
            Some("dc=example")
        );
        assert!(parent_dn("dc=org").is_none());
    }

    #[test]
    fn test_is_parenthesized() {
        assert!(is_parenthesized("(objectClass=*)"));
        assert!(is_parenthesized("(&(objectClass=person)(!(locked=TRUE)))"));
        assert!(is_parenthesized("(cn=a\\29b)"));

        assert!(!is_parenthesized("objectClass=*"));
        assert!(!is_parenthesized("(a=b)(c=d)"));
        assert!(!is_parenthesized("((a=b)"));
        assert!(!is_parenthesized(""));
    }
}
