use clap::Parser;
use std::time::Duration;

use crate::config::{
    DEFAULT_MAX_HOPS, MAX_WHOIS_READ_TIMEOUT, MIN_PROBE_TIMEOUT, MIN_WHOIS_READ_TIMEOUT,
};

/// Print the route packets trace to network host showing AS information
#[derive(Parser, Debug, Clone)]
#[command(name = "tracert-as")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Host to trace (IPv4 address or hostname)
    pub host: String,

    /// Maximum number of hops to probe
    #[arg(short = 'm', long = "max-hops", default_value_t = DEFAULT_MAX_HOPS)]
    pub max_hops: u8,

    /// Timeout for the first probe in seconds (later probes adapt to measured RTT)
    #[arg(short = 't', long = "timeout", default_value = "1")]
    pub timeout: f64,

    /// Read deadline for each registry query in seconds (0.5-2)
    #[arg(long = "whois-timeout", default_value = "1")]
    pub whois_timeout: f64,

    /// Skip registry lookups
    #[arg(long = "no-whois")]
    pub no_whois: bool,

    /// Output one JSON object per hop
    #[arg(long = "json")]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Get initial probe timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs_f64(self.timeout)
    }

    /// Get registry read deadline as Duration
    pub fn whois_timeout_duration(&self) -> Duration {
        Duration::from_secs_f64(self.whois_timeout)
    }

    /// Validate arguments
    pub fn validate(&self) -> Result<(), String> {
        if self.max_hops == 0 {
            return Err("Max hops must be at least 1".into());
        }
        if self.max_hops > DEFAULT_MAX_HOPS {
            return Err(format!("Max hops cannot exceed {}", DEFAULT_MAX_HOPS));
        }

        if !self.timeout.is_finite() || self.timeout < MIN_PROBE_TIMEOUT.as_secs_f64() {
            return Err(format!(
                "Timeout must be at least {} seconds",
                MIN_PROBE_TIMEOUT.as_secs_f64()
            ));
        }

        let min = MIN_WHOIS_READ_TIMEOUT.as_secs_f64();
        let max = MAX_WHOIS_READ_TIMEOUT.as_secs_f64();
        if !(min..=max).contains(&self.whois_timeout) {
            return Err(format!("Whois timeout must be between {} and {} seconds", min, max));
        }

        Ok(())
    }
}
