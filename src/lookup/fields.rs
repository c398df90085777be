//! Field extraction from free-text registry replies.
//!
//! Registries disagree on label spelling, so every field is looked up through
//! an ordered list of aliases. The first alias with a non-empty value wins.

use serde::{Deserialize, Serialize};

use super::sanitize_display;
use crate::state::RegistryInfo;

/// Accepted labels per field, in priority order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAliases {
    pub referral: Vec<String>,
    pub netname: Vec<String>,
    pub origin_as: Vec<String>,
    pub country: Vec<String>,
}

impl Default for FieldAliases {
    fn default() -> Self {
        fn labels(list: &[&str]) -> Vec<String> {
            list.iter().map(|s| s.to_string()).collect()
        }

        Self {
            referral: labels(&["refer", "ReferralServer"]),
            netname: labels(&["NetName", "netname"]),
            origin_as: labels(&["OriginAS", "origin", "aut-num"]),
            country: labels(&["Country", "country"]),
        }
    }
}

/// Value of the first alias found at the start of a `label: value` line
///
/// An alias present with an empty value does not stop the search: the next
/// alias is tried, so `"OriginAS:\norigin: AS3333"` yields `"AS3333"` rather
/// than the empty first match. Returns an empty string when no alias carries
/// a value.
pub fn extract_field<S: AsRef<str>>(reply: &str, aliases: &[S]) -> String {
    for alias in aliases {
        let alias = alias.as_ref();
        let value = reply.lines().find_map(|line| {
            line.trim_start()
                .strip_prefix(alias)
                .and_then(|rest| rest.strip_prefix(':'))
                .map(str::trim)
                .filter(|value| !value.is_empty())
        });
        if let Some(value) = value {
            return value.to_string();
        }
    }
    String::new()
}

/// Reduce an AS field to the digits of its first AS number
///
/// "AS701" -> "701", "AS15169, AS36040" -> "15169"
pub fn strip_as_prefix(value: &str) -> String {
    let first = value
        .split(|c: char| c == ',' || c.is_whitespace())
        .find(|token| !token.is_empty())
        .unwrap_or_default();

    match first.get(..2) {
        Some(prefix) if prefix.eq_ignore_ascii_case("AS") => first[2..].to_string(),
        _ => first.to_string(),
    }
}

/// Build the registry info for `address` from one authoritative reply
pub fn parse_registry_info(address: &str, reply: &str, aliases: &FieldAliases) -> RegistryInfo {
    RegistryInfo {
        address: address.to_string(),
        netname: sanitize_display(&extract_field(reply, &aliases.netname)),
        asn: sanitize_display(&strip_as_prefix(&extract_field(reply, &aliases.origin_as))),
        country: sanitize_display(&extract_field(reply, &aliases.country)),
    }
}
