pub mod hop;
pub mod registry;

pub use hop::*;
pub use registry::*;
