//! Referral chain following from a root registry to the authoritative one.

use tracing::{debug, warn};

use super::client::WhoisTransport;
use super::fields::{FieldAliases, extract_field};
use crate::error::LookupError;

/// Marker of the deprecated referral protocol; such referrals are ignored
const RWHOIS_MARKER: &str = "rwhois";

/// Final reply of a referral chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Server that produced `reply`
    pub server: String,
    pub reply: String,
    /// Number of referrals followed
    pub depth: usize,
}

/// Referral target named in `reply`, if any
///
/// URL-style values (`whois://whois.ripe.net`) are reduced to the part after
/// the last `/`.
pub fn referral_server<S: AsRef<str>>(reply: &str, aliases: &[S]) -> Option<String> {
    let value = extract_field(reply, aliases);
    let server = match value.rfind('/') {
        Some(i) => &value[i + 1..],
        None => value.as_str(),
    };

    if server.is_empty() || server.contains(RWHOIS_MARKER) {
        return None;
    }
    Some(server.to_string())
}

/// Follows referrals until a reply names no further server or the depth cap is hit
pub struct ReferralResolver<'a, T: ?Sized> {
    transport: &'a T,
    aliases: &'a FieldAliases,
    max_depth: usize,
}

impl<'a, T: WhoisTransport + ?Sized> ReferralResolver<'a, T> {
    pub fn new(transport: &'a T, aliases: &'a FieldAliases, max_depth: usize) -> Self {
        Self {
            transport,
            aliases,
            max_depth,
        }
    }

    /// Query `root` for `query` and follow the chain
    ///
    /// Any failed query fails the whole chain.
    pub async fn resolve(&self, query: &str, root: &str) -> Result<Resolution, LookupError> {
        let mut server = root.to_string();
        let mut depth = 0;

        loop {
            let reply = self.transport.query(&server, query).await?;

            let next = match referral_server(&reply, &self.aliases.referral) {
                Some(next) if !next.eq_ignore_ascii_case(&server) => next,
                _ => return Ok(Resolution { server, reply, depth }),
            };

            if depth >= self.max_depth {
                warn!(root, server = %server, next = %next, depth, "Referral depth limit reached");
                return Ok(Resolution { server, reply, depth });
            }

            debug!(from = %server, to = %next, query, "Following referral");
            server = next;
            depth += 1;
        }
    }
}
