//! Path discovery: probe increasing hop distances one at a time.
//!
//! The engine is a lazy iterator. Each call to `next` runs exactly one probe
//! and blocks until it is answered or its deadline passes, so hops come out in
//! distance order with no gaps. The probe timeout follows the latest measured
//! RTT (`3 × rtt + 50ms`) and stays put after a failed hop.

use std::iter::FusedIterator;
use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::TraceError;
use crate::probe::check_permissions;
use crate::state::Hop;
use crate::trace::prober::{HopProber, IcmpProber};

/// Added to the scaled RTT when adapting the probe timeout
const TIMEOUT_MARGIN: Duration = Duration::from_millis(50);

/// Next probe timeout after a hop answered in `rtt`
pub fn adaptive_timeout(rtt: Duration) -> Duration {
    rtt * 3 + TIMEOUT_MARGIN
}

/// Resolve a host name or literal to the IPv4 address to trace
pub fn resolve_host(host: &str) -> Result<Ipv4Addr, TraceError> {
    if let Ok(ip) = host.parse::<Ipv4Addr>() {
        return Ok(ip);
    }

    let resolve_err = || TraceError::Resolve {
        host: host.to_string(),
    };

    (host, 0)
        .to_socket_addrs()
        .map_err(|_| resolve_err())?
        .find_map(|addr| match addr.ip() {
            IpAddr::V4(ip) => Some(ip),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(resolve_err)
}

/// Iterator over the hops towards one destination
pub struct PathDiscovery<P = IcmpProber> {
    prober: P,
    dest: Ipv4Addr,
    max_hops: u8,
    timeout: Duration,
    /// Distance of the next probe (wider than u8 so `max_hops = 255` terminates)
    next_distance: u16,
    done: bool,
}

impl PathDiscovery<IcmpProber> {
    /// Resolve `host` and verify raw socket access before any probe is sent
    pub fn new(host: &str, config: &Config) -> Result<Self, TraceError> {
        let dest = resolve_host(host)?;
        check_permissions()?;
        info!(host, dest = %dest, max_hops = config.max_hops, "Tracing route");
        Ok(Self::with_prober(dest, config, IcmpProber))
    }
}

impl<P: HopProber> PathDiscovery<P> {
    pub fn with_prober(dest: Ipv4Addr, config: &Config, prober: P) -> Self {
        Self {
            prober,
            dest,
            max_hops: config.max_hops,
            timeout: config.initial_timeout,
            next_distance: 1,
            done: false,
        }
    }

    pub fn destination(&self) -> Ipv4Addr {
        self.dest
    }

    /// Timeout the next probe will use
    pub fn current_timeout(&self) -> Duration {
        self.timeout
    }
}

impl<P: HopProber> Iterator for PathDiscovery<P> {
    type Item = Hop;

    fn next(&mut self) -> Option<Hop> {
        if self.done {
            return None;
        }
        if self.next_distance > self.max_hops as u16 {
            info!(max_hops = self.max_hops, dest = %self.dest, "Destination not reached");
            self.done = true;
            return None;
        }

        let distance = self.next_distance as u8;
        debug!(ttl = distance, timeout_ms = self.timeout.as_millis() as u64, "Sending probe");
        let hop = self.prober.probe(self.dest, distance, self.timeout);
        self.next_distance += 1;

        if hop.reached(self.dest) {
            debug!(ttl = distance, "Reached destination");
            self.done = true;
        } else if let Some(rtt) = hop.rtt {
            self.timeout = adaptive_timeout(rtt);
        }

        Some(hop)
    }
}

impl<P: HopProber> FusedIterator for PathDiscovery<P> {}

/// Run a discovery on a dedicated thread, streaming hops over a channel
///
/// The channel closes when the trace ends, when `cancel` fires, or when the
/// receiver is dropped. Probing stays sequential; only one probe is ever in flight.
pub fn spawn_discovery<P>(
    discovery: PathDiscovery<P>,
    cancel: CancellationToken,
) -> mpsc::Receiver<Hop>
where
    P: HopProber + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);

    std::thread::spawn(move || {
        for hop in discovery {
            if cancel.is_cancelled() || tx.blocking_send(hop).is_err() {
                break;
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ReplyKind;
    use std::collections::HashMap;

    /// Scripted prober: answers from a fixed table, records the timeouts it was given
    #[derive(Default)]
    struct ScriptedProber {
        replies: HashMap<u8, (Ipv4Addr, Duration, ReplyKind)>,
        calls: Vec<(u8, Duration)>,
    }

    impl ScriptedProber {
        fn answer(mut self, distance: u8, addr: [u8; 4], rtt_ms: u64, kind: ReplyKind) -> Self {
            self.replies
                .insert(distance, (Ipv4Addr::from(addr), Duration::from_millis(rtt_ms), kind));
            self
        }
    }

    impl HopProber for ScriptedProber {
        fn probe(&mut self, _dest: Ipv4Addr, distance: u8, timeout: Duration) -> Hop {
            self.calls.push((distance, timeout));
            match self.replies.get(&distance) {
                Some(&(addr, rtt, kind)) => Hop::answered(distance, addr, rtt, kind),
                None => Hop::failed(distance),
            }
        }
    }

    const DEST: Ipv4Addr = Ipv4Addr::new(8, 8, 8, 8);

    #[test]
    fn test_adaptive_timeout() {
        assert_eq!(
            adaptive_timeout(Duration::from_millis(10)),
            Duration::from_millis(80)
        );
        assert_eq!(adaptive_timeout(Duration::ZERO), Duration::from_millis(50));
        assert_eq!(
            adaptive_timeout(Duration::from_micros(1_500)),
            Duration::from_micros(54_500)
        );
    }

    #[test]
    fn test_stops_at_destination() {
        let mut prober = ScriptedProber::default()
            .answer(1, [192, 168, 1, 1], 1, ReplyKind::TimeExceeded)
            .answer(2, [10, 0, 0, 1], 5, ReplyKind::TimeExceeded)
            .answer(3, [8, 8, 8, 8], 12, ReplyKind::EchoReply);

        let hops: Vec<Hop> = PathDiscovery::with_prober(DEST, &Config::default(), &mut prober).collect();

        let distances: Vec<u8> = hops.iter().map(|h| h.distance).collect();
        assert_eq!(distances, vec![1, 2, 3]);
        assert_eq!(hops[2].addr, Some(DEST));
        assert_eq!(prober.calls.len(), 3);
    }

    #[test]
    fn test_timeout_adapts_and_survives_failures() {
        let mut prober = ScriptedProber::default()
            .answer(1, [192, 168, 1, 1], 10, ReplyKind::TimeExceeded)
            .answer(3, [10, 0, 0, 3], 20, ReplyKind::TimeExceeded)
            .answer(4, [8, 8, 8, 8], 30, ReplyKind::EchoReply);

        let hops: Vec<Hop> = PathDiscovery::with_prober(DEST, &Config::default(), &mut prober).collect();
        assert_eq!(hops.len(), 4);
        assert!(!hops[1].is_success());

        let timeouts: Vec<Duration> = prober.calls.iter().map(|&(_, t)| t).collect();
        assert_eq!(
            timeouts,
            vec![
                Duration::from_secs(1),
                Duration::from_millis(80),
                // hop 2 failed: timeout unchanged
                Duration::from_millis(80),
                Duration::from_millis(110),
            ]
        );
    }

    #[test]
    fn test_gives_up_at_max_hops() {
        let mut prober = ScriptedProber::default();
        let hops: Vec<Hop> = PathDiscovery::with_prober(DEST, &Config::default(), &mut prober).collect();

        assert_eq!(hops.len(), 64);
        for (i, hop) in hops.iter().enumerate() {
            assert_eq!(hop.distance as usize, i + 1);
            assert!(!hop.is_success());
        }
    }

    #[test]
    fn test_max_hops_255_terminates() {
        let config = Config {
            max_hops: 255,
            ..Config::default()
        };
        let mut prober = ScriptedProber::default();
        let count = PathDiscovery::with_prober(DEST, &config, &mut prober).count();
        assert_eq!(count, 255);
    }

    #[test]
    fn test_echo_reply_from_other_address_terminates() {
        let mut prober = ScriptedProber::default()
            .answer(1, [10, 0, 0, 1], 2, ReplyKind::TimeExceeded)
            .answer(2, [8, 8, 4, 4], 4, ReplyKind::EchoReply);

        let hops: Vec<Hop> = PathDiscovery::with_prober(DEST, &Config::default(), &mut prober).collect();
        assert_eq!(hops.len(), 2);
    }

    #[test]
    fn test_fused_after_end() {
        let mut prober =
            ScriptedProber::default().answer(1, [8, 8, 8, 8], 1, ReplyKind::EchoReply);
        let mut discovery = PathDiscovery::with_prober(DEST, &Config::default(), &mut prober);
        assert!(discovery.next().is_some());
        assert!(discovery.next().is_none());
        assert!(discovery.next().is_none());
    }

    #[test]
    fn test_resolve_literal_and_invalid() {
        assert_eq!(resolve_host("1.2.3.4").unwrap(), Ipv4Addr::new(1, 2, 3, 4));
        assert!(matches!(
            resolve_host("no-such-host.invalid"),
            Err(TraceError::Resolve { .. })
        ));
    }

    #[test]
    fn test_resolve_localhost() {
        assert!(resolve_host("localhost").unwrap().is_loopback());
    }

    #[tokio::test]
    async fn test_spawn_discovery_streams_in_order() {
        let prober = ScriptedProber::default()
            .answer(1, [10, 0, 0, 1], 1, ReplyKind::TimeExceeded)
            .answer(2, [8, 8, 8, 8], 2, ReplyKind::EchoReply);
        let discovery = PathDiscovery::with_prober(DEST, &Config::default(), prober);
        let mut rx = spawn_discovery(discovery, CancellationToken::new());

        let mut distances = Vec::new();
        while let Some(hop) = rx.recv().await {
            distances.push(hop.distance);
        }
        assert_eq!(distances, vec![1, 2]);
    }
}
