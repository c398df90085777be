pub mod engine;
pub mod prober;

pub use engine::*;
pub use prober::*;
