pub mod constants;
pub mod decoder;
pub mod endpoint;
pub mod frame;

pub use endpoint::XBeeEndpoint;
