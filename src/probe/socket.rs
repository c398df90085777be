use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io::{self, Read};
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::TraceError;

/// Largest datagram we expect back (Ethernet MTU)
pub const RECV_BUFFER_SIZE: usize = 1500;

/// Create a raw IPv4 ICMP socket
///
/// Received datagrams include the IP header.
pub fn create_raw_icmp_socket() -> io::Result<Socket> {
    let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))?;
    socket.set_nonblocking(false)?;
    Ok(socket)
}

/// Check that raw ICMP sockets can be opened
///
/// The socket is closed again immediately; probes open their own.
pub fn check_permissions() -> Result<(), TraceError> {
    create_raw_icmp_socket()
        .map(drop)
        .map_err(TraceError::from_socket)
}

/// Remedy text shown when raw sockets are denied
pub fn permission_hint() -> String {
    let binary_path = std::env::current_exe()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "tracert-as".to_string());

    format!(
        "Could not get network permissions.\n\n\
         Fix options:\n\
         \u{2022} Run with sudo: sudo tracert-as <host>\n\
         \u{2022} Add capability: sudo setcap cap_net_raw+ep {}",
        binary_path
    )
}

/// Set TTL on a socket
pub fn set_ttl(socket: &Socket, ttl: u8) -> io::Result<()> {
    socket.set_ttl(ttl as u32)
}

/// Send ICMP packet to target
pub fn send_icmp(socket: &Socket, packet: &[u8], target: Ipv4Addr) -> io::Result<usize> {
    let addr = SockAddr::from(SocketAddr::from((target, 0)));
    socket.send_to(packet, &addr)
}

/// Receive one datagram, waiting at most `timeout`
///
/// An expired wait surfaces as `WouldBlock` or `TimedOut` depending on platform.
/// Waits under a microsecond count as expired: the socket timeout has
/// microsecond resolution and a zero value means no deadline at all.
pub fn recv_icmp(socket: &Socket, buffer: &mut [u8], timeout: Duration) -> io::Result<usize> {
    if timeout < Duration::from_micros(1) {
        return Err(io::Error::from(io::ErrorKind::TimedOut));
    }
    socket.set_read_timeout(Some(timeout))?;
    let mut reader = socket;
    reader.read(buffer)
}

/// True for the error kinds a read deadline produces
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}
