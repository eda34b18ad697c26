//! Service layer
//!
//! Geo resolution, the block list and the access gate. The HTTP layer in
//! [`crate::api`] only adapts requests to these components.

pub mod access_gate;
pub mod block_list;
pub mod geoip;
pub mod vpn_simulation;

pub use access_gate::{AccessDecision, AccessGate, DecisionReason, DeniedResponse};
pub use block_list::{BlockListPersistence, BlockListStore, CountrySet, MemoryOnly};
pub use geoip::{CountryCode, DetectedVia, GeoLookupResult, GeoResolver};
pub use vpn_simulation::{SimulatedAccess, simulate, simulated_ip};
