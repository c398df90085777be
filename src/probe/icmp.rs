use pnet::packet::Packet;
use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet::packet::icmp::{IcmpCode, IcmpPacket, IcmpTypes, checksum};
use pnet::packet::ip::IpNextHeaderProtocols;
use pnet::packet::ipv4::Ipv4Packet;
use std::net::Ipv4Addr;

use crate::error::TraceError;
use crate::state::ReplyKind;

/// ICMP header size (fixed)
pub const ICMP_HEADER_SIZE: usize = 8;
/// Minimum IPv4 header size
const IPV4_MIN_HEADER_SIZE: usize = 20;

/// An echo request in flight: random identifier, sequence equal to the hop distance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub identifier: u16,
    pub sequence: u16,
}

impl Probe {
    /// New probe for the given hop distance with a fresh random identifier
    pub fn new(distance: u8) -> Self {
        Self {
            identifier: rand::random(),
            sequence: distance as u16,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, TraceError> {
        build_echo_request(self.identifier, self.sequence)
    }
}

/// Build an ICMP Echo Request with an empty payload
pub fn build_echo_request(identifier: u16, sequence: u16) -> Result<Vec<u8>, TraceError> {
    let mut buffer = vec![0u8; ICMP_HEADER_SIZE];

    {
        let mut packet = MutableEchoRequestPacket::new(&mut buffer)
            .ok_or_else(|| TraceError::Malformed("echo request buffer too small".to_string()))?;
        packet.set_icmp_type(IcmpTypes::EchoRequest);
        packet.set_icmp_code(IcmpCode::new(0));
        packet.set_identifier(identifier);
        packet.set_sequence_number(sequence);
    }

    let icmp = IcmpPacket::new(&buffer)
        .ok_or_else(|| TraceError::Malformed("echo request buffer too small".to_string()))?;
    let cksum = checksum(&icmp);
    buffer[2..4].copy_from_slice(&cksum.to_be_bytes());

    Ok(buffer)
}

/// A classified ICMP message read from a raw IPv4 socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedReply {
    /// Source address from the IP header
    pub source: Ipv4Addr,
    pub kind: ReplyKind,
    /// Identifier and sequence of the echo request this message answers
    pub identifier: u16,
    pub sequence: u16,
}

impl ParsedReply {
    pub fn answers(&self, probe: &Probe) -> bool {
        self.identifier == probe.identifier && self.sequence == probe.sequence
    }
}

/// Parse a raw IPv4 datagram carrying ICMP.
///
/// Returns `Ok(None)` for well-formed ICMP that is not a reply to an echo
/// request (our own outgoing requests on loopback, redirects, ...).
pub fn parse_reply(data: &[u8]) -> Result<Option<ParsedReply>, TraceError> {
    parse(data, None)
}

/// Match a received datagram against the probe in flight
///
/// `Ok(Some)` only for a reply to `probe`. Traffic for other probes or
/// unrelated ICMP is `Ok(None)`; the echo reply checksum is only verified
/// once identifier and sequence match.
pub fn classify(data: &[u8], probe: &Probe) -> Result<Option<ParsedReply>, TraceError> {
    Ok(parse(data, Some(probe))?.filter(|reply| reply.answers(probe)))
}

fn parse(data: &[u8], probe: Option<&Probe>) -> Result<Option<ParsedReply>, TraceError> {
    let ip = Ipv4Packet::new(data)
        .ok_or_else(|| TraceError::Malformed(format!("{} bytes is too short for IPv4", data.len())))?;
    if ip.get_version() != 4 {
        return Err(TraceError::Malformed(format!("IP version {}", ip.get_version())));
    }
    if ip.get_next_level_protocol() != IpNextHeaderProtocols::Icmp {
        return Ok(None);
    }

    let header_len = ip.get_header_length() as usize * 4;
    if header_len < IPV4_MIN_HEADER_SIZE || data.len() < header_len + ICMP_HEADER_SIZE {
        return Err(TraceError::Malformed("truncated ICMP header".to_string()));
    }

    let source = ip.get_source();
    let icmp_data = &data[header_len..];
    let icmp = IcmpPacket::new(icmp_data)
        .ok_or_else(|| TraceError::Malformed("truncated ICMP header".to_string()))?;

    let kind = match icmp.get_icmp_type() {
        IcmpTypes::EchoReply => {
            let (identifier, sequence) = id_and_sequence(icmp_data);
            let reply = ParsedReply {
                source,
                kind: ReplyKind::EchoReply,
                identifier,
                sequence,
            };
            if probe.is_some_and(|probe| !reply.answers(probe)) {
                return Ok(None);
            }
            if checksum(&icmp) != icmp.get_checksum() {
                return Err(TraceError::Malformed("bad echo reply checksum".to_string()));
            }
            return Ok(Some(reply));
        }
        IcmpTypes::TimeExceeded => ReplyKind::TimeExceeded,
        IcmpTypes::DestinationUnreachable => ReplyKind::DestUnreachable(icmp.get_icmp_code().0),
        _ => return Ok(None),
    };

    // Error messages quote the original IP header plus the first 8 bytes of our echo request
    let Some((identifier, sequence)) = parse_quoted_echo(icmp.payload())? else {
        return Ok(None);
    };

    Ok(Some(ParsedReply {
        source,
        kind,
        identifier,
        sequence,
    }))
}

/// Extract identifier and sequence from the echo request quoted in an ICMP error
fn parse_quoted_echo(quoted: &[u8]) -> Result<Option<(u16, u16)>, TraceError> {
    // `payload()` starts right after the checksum; skip the 4 unused bytes
    let quoted = quoted.get(4..).unwrap_or_default();
    let inner = Ipv4Packet::new(quoted)
        .ok_or_else(|| TraceError::Malformed("quoted datagram too short".to_string()))?;
    let header_len = inner.get_header_length() as usize * 4;
    if header_len < IPV4_MIN_HEADER_SIZE || quoted.len() < header_len + ICMP_HEADER_SIZE {
        return Err(TraceError::Malformed("quoted datagram truncated".to_string()));
    }
    if inner.get_next_level_protocol() != IpNextHeaderProtocols::Icmp {
        return Ok(None);
    }

    let inner_icmp = &quoted[header_len..];
    if inner_icmp[0] != IcmpTypes::EchoRequest.0 {
        return Ok(None);
    }
    Ok(Some(id_and_sequence(inner_icmp)))
}

fn id_and_sequence(icmp: &[u8]) -> (u16, u16) {
    (
        u16::from_be_bytes([icmp[4], icmp[5]]),
        u16::from_be_bytes([icmp[6], icmp[7]]),
    )
}
