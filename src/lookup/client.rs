//! Registry lookup protocol client (plain text over TCP port 43).

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, trace};

use crate::config::RegistryConfig;
use crate::error::LookupError;

/// Replies are cut off past this size
const MAX_REPLY_SIZE: usize = 1024 * 1024;

/// Sends one query to one registry server and returns the raw reply text
#[async_trait]
pub trait WhoisTransport: Send + Sync {
    async fn query(&self, server: &str, query: &str) -> Result<String, LookupError>;
}

/// TCP client; every query uses its own short-lived connection
#[derive(Debug, Clone)]
pub struct WhoisClient {
    port: u16,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl WhoisClient {
    pub fn new(config: &RegistryConfig) -> Self {
        Self {
            port: config.port,
            connect_timeout: config.connect_timeout,
            read_timeout: config.read_timeout,
        }
    }

    /// Split an optional `:port` suffix off a server name
    fn endpoint<'a>(&self, server: &'a str) -> (&'a str, u16) {
        if let Some((host, port)) = server.rsplit_once(':')
            && let Ok(port) = port.parse::<u16>()
        {
            return (host, port);
        }
        (server, self.port)
    }
}

#[async_trait]
impl WhoisTransport for WhoisClient {
    async fn query(&self, server: &str, query: &str) -> Result<String, LookupError> {
        let (host, port) = self.endpoint(server);
        trace!(server, query, "Registry query");

        let mut stream = timeout(self.connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| LookupError::Timeout {
                server: server.to_string(),
            })?
            .map_err(|source| LookupError::Connect {
                server: server.to_string(),
                source,
            })?;

        let io_err = |source| LookupError::Io {
            server: server.to_string(),
            source,
        };

        stream
            .write_all(format!("{}\r\n", query).as_bytes())
            .await
            .map_err(io_err)?;

        let deadline = Instant::now() + self.read_timeout;
        let mut reply = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            match timeout_at(deadline, stream.read(&mut chunk)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => {
                    reply.extend_from_slice(&chunk[..n]);
                    if reply.len() >= MAX_REPLY_SIZE {
                        debug!(server, "Reply too large, truncating");
                        break;
                    }
                }
                Ok(Err(source)) => return Err(io_err(source)),
                Err(_) if reply.is_empty() => {
                    return Err(LookupError::Timeout {
                        server: server.to_string(),
                    });
                }
                Err(_) => {
                    debug!(server, bytes = reply.len(), "Read deadline reached, using partial reply");
                    break;
                }
            }
        }

        Ok(String::from_utf8_lossy(&reply).into_owned())
    }
}
