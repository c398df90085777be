//! Integration tests for the discovery → registry pipeline
//!
//! These tests drive the public API with a scripted prober and in-memory
//! registries, without requiring raw sockets or network access.

use async_trait::async_trait;
use clap::Parser;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tracert_as::cli::Args;
use tracert_as::config::{Config, RegistryConfig};
use tracert_as::error::LookupError;
use tracert_as::export::export_json_line;
use tracert_as::lookup::{RegistryResolver, WhoisTransport};
use tracert_as::state::{Hop, RegistryInfo, ReplyKind};
use tracert_as::trace::{HopProber, PathDiscovery, adaptive_timeout};

const DEST: Ipv4Addr = Ipv4Addr::new(193, 0, 6, 139);

/// Path: home router, ISP (no answer), transit, destination
struct FakePath {
    timeouts: Vec<Duration>,
}

impl HopProber for FakePath {
    fn probe(&mut self, _dest: Ipv4Addr, distance: u8, timeout: Duration) -> Hop {
        self.timeouts.push(timeout);
        let ms = Duration::from_millis;
        match distance {
            1 => Hop::answered(1, Ipv4Addr::new(192, 168, 1, 1), ms(1), ReplyKind::TimeExceeded),
            2 => Hop::failed(2),
            3 => Hop::answered(3, Ipv4Addr::new(62, 40, 98, 1), ms(9), ReplyKind::TimeExceeded),
            4 => Hop::answered(4, DEST, ms(15), ReplyKind::EchoReply),
            _ => Hop::failed(distance),
        }
    }
}

/// In-memory registries keyed by server name
struct FakeWhois {
    replies: HashMap<&'static str, &'static str>,
    queries: AtomicUsize,
}

#[async_trait]
impl WhoisTransport for FakeWhois {
    async fn query(&self, server: &str, _query: &str) -> Result<String, LookupError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.replies
            .get(server)
            .map(|r| r.to_string())
            .ok_or_else(|| LookupError::Timeout {
                server: server.to_string(),
            })
    }
}

fn fake_whois() -> Arc<FakeWhois> {
    let replies = HashMap::from([
        (
            "whois.arin.net",
            "NetName:        RIPE\nReferralServer:  whois://whois.ripe.net\n",
        ),
        (
            "whois.ripe.net",
            "inetnum: 193.0.0.0 - 193.0.7.255\nnetname: RIPE-NCC\ncountry: NL\norigin: AS3333\n",
        ),
        (
            "whois.apnic.net",
            "netname:        IANA-BLOCK\ncountry:        AU\n",
        ),
    ]);
    Arc::new(FakeWhois {
        replies,
        queries: AtomicUsize::new(0),
    })
}

#[test]
fn test_config_from_args() {
    let args = Args::try_parse_from([
        "tracert-as",
        "example.com",
        "-m",
        "20",
        "--timeout",
        "2",
        "--whois-timeout",
        "0.5",
        "--no-whois",
    ])
    .unwrap();
    assert!(args.validate().is_ok());

    let config = Config::from(&args);
    assert_eq!(config.max_hops, 20);
    assert_eq!(config.initial_timeout, Duration::from_secs(2));
    assert_eq!(config.registry.read_timeout, Duration::from_millis(500));
    assert!(!config.whois_enabled);
}

#[test]
fn test_discovery_distances_and_timeouts() {
    let mut path = FakePath {
        timeouts: Vec::new(),
    };
    let hops: Vec<Hop> = PathDiscovery::with_prober(DEST, &Config::default(), &mut path).collect();

    let distances: Vec<u8> = hops.iter().map(|h| h.distance).collect();
    assert_eq!(distances, vec![1, 2, 3, 4]);
    assert_eq!(hops.last().and_then(|h| h.addr), Some(DEST));

    let ms = Duration::from_millis;
    assert_eq!(
        path.timeouts,
        vec![
            Duration::from_secs(1),
            adaptive_timeout(ms(1)),
            adaptive_timeout(ms(1)),
            adaptive_timeout(ms(9)),
        ]
    );
}

#[tokio::test]
async fn test_hops_enriched_with_registry_info() {
    let whois = fake_whois();
    let config = RegistryConfig {
        roots: vec![
            "whois.arin.net".to_string(),
            "whois.ripe.net".to_string(),
            "whois.apnic.net".to_string(),
        ],
        ..RegistryConfig::default()
    };
    let registry = RegistryResolver::with_transport(whois.clone(), config);

    let mut path = FakePath {
        timeouts: Vec::new(),
    };
    let hops: Vec<Hop> = PathDiscovery::with_prober(DEST, &Config::default(), &mut path).collect();

    let mut enriched: Vec<(u8, Option<RegistryInfo>)> = Vec::new();
    for hop in &hops {
        let info = match hop.addr {
            Some(addr) => Some(registry.resolve(addr.into()).await),
            None => None,
        };
        enriched.push((hop.distance, info));
    }

    // Home router: synthetic local result
    let local = enriched[0].1.as_ref().unwrap();
    assert_eq!(local.netname, "local");

    // Unanswered hop: never looked up
    assert!(enriched[1].1.is_none());

    // Public hops: referral from ARIN lands on RIPE, placeholder from APNIC loses
    let dest_info = enriched[3].1.as_ref().unwrap();
    assert_eq!(dest_info.address, DEST.to_string());
    assert_eq!(dest_info.netname, "RIPE-NCC");
    assert_eq!(dest_info.asn, "3333");
    assert_eq!(dest_info.country, "NL");

    // Two public hops, each: 3 roots + 1 referral
    assert_eq!(whois.queries.load(Ordering::SeqCst), 8);
}

#[test]
fn test_json_stream_one_line_per_hop() {
    let mut path = FakePath {
        timeouts: Vec::new(),
    };
    let mut out = Vec::new();
    for hop in PathDiscovery::with_prober(DEST, &Config::default(), &mut path) {
        export_json_line(&mut out, &hop, None).unwrap();
    }

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<serde_json::Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[1]["addr"].is_null());
    assert_eq!(lines[3]["addr"], DEST.to_string());
}
