use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Classification of the ICMP message that answered a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyKind {
    /// The destination answered the echo request itself
    EchoReply,
    /// A router dropped the probe because its TTL ran out
    TimeExceeded,
    /// Destination Unreachable with its ICMP code
    DestUnreachable(u8),
}

impl ReplyKind {
    /// True when the reply proves the probe reached the destination host
    pub fn is_final(&self) -> bool {
        matches!(self, ReplyKind::EchoReply)
    }
}

/// One measured point on the path
///
/// `addr`, `rtt` and `kind` are either all present (the probe was answered
/// before its deadline) or all absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hop {
    /// TTL used for the probe, starting at 1
    pub distance: u8,
    pub addr: Option<Ipv4Addr>,
    #[serde(with = "rtt_serde", default)]
    pub rtt: Option<Duration>,
    pub kind: Option<ReplyKind>,
}

impl Hop {
    pub fn answered(distance: u8, addr: Ipv4Addr, rtt: Duration, kind: ReplyKind) -> Self {
        Self {
            distance,
            addr: Some(addr),
            rtt: Some(rtt),
            kind: Some(kind),
        }
    }

    /// A hop whose probe timed out or could not be sent/parsed
    pub fn failed(distance: u8) -> Self {
        Self {
            distance,
            addr: None,
            rtt: None,
            kind: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.addr.is_some()
    }

    /// RTT truncated to whole microseconds, for display
    pub fn rtt_display(&self) -> Option<Duration> {
        self.rtt
            .map(|rtt| Duration::from_micros(rtt.as_micros().min(u64::MAX as u128) as u64))
    }

    /// Whether this hop ends the trace towards `dest`
    pub fn reached(&self, dest: Ipv4Addr) -> bool {
        self.addr == Some(dest) || self.kind.is_some_and(|k| k.is_final())
    }
}

/// RTT serialized as fractional milliseconds
mod rtt_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(rtt: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        rtt.map(|d| d.as_secs_f64() * 1000.0).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = Option::<f64>::deserialize(deserializer)?;
        Ok(ms.map(|ms| Duration::from_secs_f64(ms / 1000.0)))
    }
}
