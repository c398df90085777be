//! Single probe-and-wait cycle at one hop distance.

use anyhow::{Context, Result};
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::probe::{
    Probe, RECV_BUFFER_SIZE, classify, create_raw_icmp_socket, is_timeout, recv_icmp, send_icmp,
    set_ttl,
};
use crate::state::Hop;

/// Sends one probe at one hop distance and reports the outcome
pub trait HopProber {
    /// Never fails: any problem yields a non-success [`Hop`] for `distance`
    fn probe(&mut self, dest: Ipv4Addr, distance: u8, timeout: Duration) -> Hop;
}

impl<P: HopProber + ?Sized> HopProber for &mut P {
    fn probe(&mut self, dest: Ipv4Addr, distance: u8, timeout: Duration) -> Hop {
        (**self).probe(dest, distance, timeout)
    }
}

/// ICMP echo prober over a raw socket opened per probe
#[derive(Debug, Default, Clone, Copy)]
pub struct IcmpProber;

impl HopProber for IcmpProber {
    fn probe(&mut self, dest: Ipv4Addr, distance: u8, timeout: Duration) -> Hop {
        match probe_once(dest, distance, timeout) {
            Ok(hop) => hop,
            Err(e) => {
                match e.downcast_ref::<std::io::Error>() {
                    Some(io) if is_timeout(io) => {
                        trace!(ttl = distance, timeout_ms = timeout.as_millis() as u64, "Probe timed out");
                    }
                    _ => debug!(ttl = distance, error = %e, "Probe failed"),
                }
                Hop::failed(distance)
            }
        }
    }
}

/// The socket lives for this call only and is closed on every return path
fn probe_once(dest: Ipv4Addr, distance: u8, timeout: Duration) -> Result<Hop> {
    let socket = create_raw_icmp_socket().context("open raw ICMP socket")?;
    let probe = Probe::new(distance);
    let packet = probe.encode()?;
    set_ttl(&socket, distance)?;

    let start = Instant::now();
    send_icmp(&socket, &packet, dest)?;
    let deadline = start + timeout;

    let mut buffer = [0u8; RECV_BUFFER_SIZE];
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let len = recv_icmp(&socket, &mut buffer, remaining)?;
        let rtt = start.elapsed();

        match classify(&buffer[..len], &probe)? {
            Some(reply) => return Ok(Hop::answered(distance, reply.source, rtt, reply.kind)),
            None => trace!(ttl = distance, "Skipping unrelated ICMP"),
        }
    }
}
