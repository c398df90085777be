use crossterm::style::{Color, Stylize, style};
use std::fmt::Display;
use std::io::Write;
use std::net::Ipv4Addr;

use crate::state::{Hop, RegistryInfo};

/// Apply `color` only when the output is a terminal
fn paint<D: Display>(text: D, color: Color, enabled: bool) -> String {
    if enabled {
        style(text).with(color).to_string()
    } else {
        text.to_string()
    }
}

/// First line of a trace
pub fn write_header<W: Write>(
    mut writer: W,
    host: &str,
    dest: Ipv4Addr,
    max_hops: u8,
) -> std::io::Result<()> {
    writeln!(writer, "tracert-as to {} ({}), {} hops max", host, dest, max_hops)
}

/// One hop line: distance, address and RTT, or `*` when unanswered
pub fn write_hop<W: Write>(mut writer: W, hop: &Hop, color: bool) -> std::io::Result<()> {
    match (hop.addr, hop.rtt_display()) {
        (Some(addr), Some(rtt)) => writeln!(
            writer,
            "{:2} {}: {}",
            hop.distance,
            paint(format!("{:>15}", addr), Color::Yellow, color),
            paint(format!("{:>9}", format!("{:?}", rtt)), Color::Blue, color),
        ),
        _ => writeln!(
            writer,
            "{:2} {}",
            hop.distance,
            paint(format!("{:>15}", "*"), Color::Red, color)
        ),
    }
}

/// Registry line under a hop: the non-empty parts of netname, AS and country
///
/// Writes nothing when the registries returned no data.
pub fn write_registry<W: Write>(
    mut writer: W,
    info: &RegistryInfo,
    color: bool,
) -> std::io::Result<()> {
    let parts: Vec<String> = [
        (&info.netname, Color::Green),
        (&info.asn, Color::Magenta),
        (&info.country, Color::Cyan),
    ]
    .into_iter()
    .filter(|(value, _)| !value.is_empty())
    .map(|(value, c)| paint(value, c, color))
    .collect();

    if parts.is_empty() {
        return Ok(());
    }
    writeln!(writer, "   {}", parts.join(", "))
}
