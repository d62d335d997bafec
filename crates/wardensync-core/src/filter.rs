//! Directory search filter construction (RFC 4515)

use once_cell::sync::Lazy;
use regex::Regex;

/// Group list separators: `;`, `|`, or a comma followed by whitespace.
/// Commas inside a DN are never followed by whitespace, so DNs survive the split.
static GROUP_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r";|\||,\s+").unwrap());

/// Filter returned when no clause applies
pub const MATCH_ALL: &str = "(objectClass=*)";

fn normalize(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Split a raw group list into individual group DNs
pub fn split_groups(raw: &str) -> Vec<&str> {
    GROUP_SEPARATOR
        .split(raw)
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .collect()
}

/// Build a search filter from optional criteria.
///
/// Clauses present are AND-combined; a single clause is returned bare and no
/// clause at all yields [`MATCH_ALL`].
pub fn build_filter(
    object_type: Option<&str>,
    groups: Option<&str>,
    additional_filter: Option<&str>,
    group_attr: &str,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(object_type) = normalize(object_type).filter(|o| *o != "*") {
        parts.push(format!("(objectClass={})", object_type));
    }

    if let Some(groups) = normalize(groups) {
        let clauses: Vec<String> = split_groups(groups)
            .into_iter()
            .map(|g| format!("({}={})", group_attr, g))
            .collect();
        match clauses.len() {
            0 => {}
            1 => parts.extend(clauses),
            _ => parts.push(format!("(|{})", clauses.concat())),
        }
    }

    if let Some(additional) = normalize(additional_filter) {
        if additional.starts_with('(') {
            parts.push(additional.to_string());
        } else {
            parts.push(format!("({})", additional));
        }
    }

    match parts.len() {
        0 => MATCH_ALL.to_string(),
        1 => parts.remove(0),
        _ => format!("(&{})", parts.concat()),
    }
}
