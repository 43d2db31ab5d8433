use std::sync::Arc;

use crate::networking::Address;

use super::connection::TcpConnection;

/// Ordered sequence of connections with lookup by (from, to) among open
/// entries only; at most one open connection per (from, to) pair (spec §3).
/// Mutated only from `TcpEndpoint`'s worker thread.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: Vec<Arc<TcpConnection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_open(&self, from: &Address, to: &Address) -> Option<Arc<TcpConnection>> {
        self.connections
            .iter()
            .find(|c| c.is_open() && c.from() == from && c.to() == to)
            .cloned()
    }

    pub fn insert(&mut self, connection: Arc<TcpConnection>) {
        self.connections.push(connection);
    }

    pub fn destroy(&mut self, id: u64) {
        self.connections.retain(|c| c.id() != id);
    }

    /// Background cleanup of closed entries; not required for correctness
    /// (no TTL), just bounds registry growth.
    pub fn cleanup_closed(&mut self) {
        self.connections.retain(|c| c.is_open());
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }
}
