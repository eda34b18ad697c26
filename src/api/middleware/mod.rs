pub mod geo_gate;
pub mod request_log;

pub use geo_gate::GeoGate;
pub use request_log::{RequestId, RequestLog};
