//! Addressing and payload envelopes moved between endpoints by the router
//! (spec §3). Tagged sum types with pattern-matched dispatch, rather than a
//! class hierarchy with runtime type checks (Design Notes §9).

mod address;
mod data_unit;

pub use address::{Address, Origin};
pub use data_unit::DataUnit;
