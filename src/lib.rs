// Public API - data types, engines and configuration
pub mod config;
pub mod error;
pub mod export;
pub mod lookup;
pub mod probe;
pub mod state;
pub mod trace;

// Argument definitions shared with the binary
pub mod cli;
