//! Error types for path discovery and registry lookups.

use std::io;
use thiserror::Error;

/// Errors that stop a trace before the first probe is sent, plus codec failures.
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("{host} is invalid: no IPv4 address found")]
    Resolve { host: String },

    #[error("Insufficient permissions for raw ICMP sockets: {0}")]
    PermissionDenied(#[source] io::Error),

    #[error("Failed to create ICMP socket: {0}")]
    Socket(#[source] io::Error),

    #[error("Malformed ICMP packet: {0}")]
    Malformed(String),
}

impl TraceError {
    /// Classify a socket creation failure
    pub fn from_socket(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => TraceError::PermissionDenied(err),
            _ => TraceError::Socket(err),
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, TraceError::PermissionDenied(_))
    }
}

/// Failure of a single registry query; isolated to the chain it happened in.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Failed to connect to {server}: {source}")]
    Connect {
        server: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error talking to {server}: {source}")]
    Io {
        server: String,
        #[source]
        source: io::Error,
    },

    #[error("Timed out waiting for {server}")]
    Timeout { server: String },
}
