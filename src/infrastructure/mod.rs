pub mod observability;
pub mod transmitter;

pub use observability::Metrics;
pub use transmitter::{UdpTransmitter, dispatch, encode_payload};
