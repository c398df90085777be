pub mod client;
pub mod fields;
pub mod referral;
pub mod registry;

pub use client::*;
pub use fields::*;
pub use referral::*;
pub use registry::*;

/// Sanitize a string for safe terminal display by removing control characters.
///
/// Registry replies are untrusted text; this keeps escape sequences embedded in
/// them from reaching the terminal.
pub(crate) fn sanitize_display(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_control())
        .collect()
}
