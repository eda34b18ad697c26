//! Mode routing
//!
//! - Server mode (HTTP server, default)
//! - Config generation

pub mod generate_config;
#[cfg(feature = "server")]
pub mod server;

pub use generate_config::run_generate_config;
#[cfg(feature = "server")]
pub use server::run_server;
