//! Geoblocker - a demonstration geo-blocking HTTP service
//!
//! Resolves the caller's IP address to a country, checks it against a mutable
//! in-memory block list, and grants or denies access.
//!
//! # Features
//! - **server**: HTTP server mode (default)
//!
//! # Architecture
//! - `utils`: client IP extraction and address classification
//! - `services`: geo resolution, block list store, access gate
//! - `api`: HTTP services and middleware
//! - `config`: Configuration management
//! - `runtime`: Application lifecycle and execution modes
//! - `system`: Logging setup

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod system;
pub mod utils;
