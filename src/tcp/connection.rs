use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc::UnboundedSender;

use crate::networking::Address;

/// Identified by a process-unique id; retained in the registry until
/// explicitly destroyed or observed closed (spec §3).
pub struct TcpConnection {
    id: u64,
    from: Address,
    to: Address,
    is_open: AtomicBool,
    outbound: UnboundedSender<Vec<u8>>,
}

impl TcpConnection {
    pub(super) fn new(id: u64, from: Address, to: Address, outbound: UnboundedSender<Vec<u8>>) -> Self {
        Self { id, from, to, is_open: AtomicBool::new(true), outbound }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn from(&self) -> &Address {
        &self.from
    }

    pub fn to(&self) -> &Address {
        &self.to
    }

    pub fn is_open(&self) -> bool {
        self.is_open.load(Ordering::SeqCst)
    }

    pub(super) fn mark_closed(&self) {
        self.is_open.store(false, Ordering::SeqCst);
    }

    /// Queues `buffer` on this connection's outbound channel; the I/O task
    /// performs the actual write once connect completes.
    pub fn send(&self, buffer: Vec<u8>) {
        if self.outbound.send(buffer).is_err() {
            self.mark_closed();
        }
    }
}
