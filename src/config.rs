use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::cli::Args;
use crate::lookup::fields::FieldAliases;

/// Hop distance at which path discovery gives up
pub const DEFAULT_MAX_HOPS: u8 = 64;
/// Timeout for the first probe, before any RTT has been observed
pub const DEFAULT_INITIAL_TIMEOUT: Duration = Duration::from_secs(1);
/// Shortest first-probe timeout accepted on the command line
pub const MIN_PROBE_TIMEOUT: Duration = Duration::from_millis(1);

/// Registry lookup protocol port
pub const WHOIS_PORT: u16 = 43;
/// Accepted range for the registry read deadline
pub const MIN_WHOIS_READ_TIMEOUT: Duration = Duration::from_millis(500);
pub const MAX_WHOIS_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Top-level registry for each world region
pub const ROOT_REGISTRIES: [&str; 5] = [
    "whois.arin.net",
    "whois.ripe.net",
    "whois.apnic.net",
    "whois.lacnic.net",
    "whois.afrinic.net",
];

/// Network names registries return for blocks they do not manage themselves
pub const PLACEHOLDER_NETNAMES: [&str; 6] = [
    "IANA-BLK",
    "IANA-NETBLOCK",
    "IANA-BLOCK",
    "ERX-NETBLOCK",
    "NON-RIPE-NCC-MANAGED-ADDRESS-BLOCK",
    "NON-AFRINIC-MANAGED-ADDRESS-BLOCK",
];

/// Runtime configuration derived from CLI args
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Maximum hop distance to probe
    pub max_hops: u8,
    /// Timeout for the first probe; later ones adapt to observed RTT
    #[serde(with = "duration_serde")]
    pub initial_timeout: Duration,
    /// Resolve registry info for answering hops
    pub whois_enabled: bool,
    pub registry: RegistryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_hops: DEFAULT_MAX_HOPS,
            initial_timeout: DEFAULT_INITIAL_TIMEOUT,
            whois_enabled: true,
            registry: RegistryConfig::default(),
        }
    }
}

impl From<&Args> for Config {
    fn from(args: &Args) -> Self {
        let registry = RegistryConfig {
            read_timeout: args.whois_timeout_duration(),
            ..RegistryConfig::default()
        };

        Self {
            max_hops: args.max_hops,
            initial_timeout: args.timeout_duration(),
            whois_enabled: !args.no_whois,
            registry,
        }
    }
}

/// Registry resolution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Root registries queried concurrently, in tie-break precedence order
    pub roots: Vec<String>,
    pub port: u16,
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
    /// Deadline for reading a whole reply
    #[serde(with = "duration_serde")]
    pub read_timeout: Duration,
    /// Maximum referrals followed from one root
    pub max_referral_depth: usize,
    /// Network names that mark a bulk delegation rather than an owner
    pub placeholders: Vec<String>,
    pub aliases: FieldAliases,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            roots: ROOT_REGISTRIES.iter().map(|s| s.to_string()).collect(),
            port: WHOIS_PORT,
            connect_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_secs(1),
            max_referral_depth: 10,
            placeholders: PLACEHOLDER_NETNAMES.iter().map(|s| s.to_string()).collect(),
            aliases: FieldAliases::default(),
        }
    }
}

impl RegistryConfig {
    pub fn is_placeholder(&self, netname: &str) -> bool {
        self.placeholders
            .iter()
            .any(|p| p.eq_ignore_ascii_case(netname))
    }
}

/// Serde helper for Duration
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
