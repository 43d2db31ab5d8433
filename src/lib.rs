pub mod application;
pub mod cli;
pub mod command_queue;
pub mod error;
pub mod networking;
pub mod router;
pub mod serial_endpoint;
pub mod signal;
pub mod tcp;
pub mod xbee;
