//! Multiplexes `send(from, to, buffer)` over per-(from, to) connections
//! (spec §4.6).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::command_queue::CommandQueue;
use crate::error::BridgeError;
use crate::networking::Address;

use super::io_reactor::TcpIoReactor;
use super::registry::ConnectionRegistry;

pub struct TcpEndpoint {
    queue: CommandQueue,
    io: TcpIoReactor,
    registry: Mutex<ConnectionRegistry>,
    next_id: AtomicU64,
}

impl TcpEndpoint {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            queue: CommandQueue::new("tcp"),
            io: TcpIoReactor::new(),
            registry: Mutex::new(ConnectionRegistry::new()),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn start(&self) -> Result<(), BridgeError> {
        self.queue.start()?;
        if let Err(e) = self.io.start() {
            self.queue.stop();
            return Err(e);
        }
        Ok(())
    }

    pub fn stop(&self) {
        self.io.stop();
        self.queue.stop();
    }

    /// Enqueues `buffer` for delivery to `to`, creating a connection if one
    /// isn't already open for this (from, to) pair. `to.origin()` must be
    /// `Tcp` (precondition, spec §4.6/§7).
    pub fn send(self: &Arc<Self>, from: Address, to: Address, buffer: Vec<u8>) {
        debug_assert!(
            matches!(to, Address::Tcp { .. }),
            "TcpEndpoint::send requires a Tcp destination, got {to:?}"
        );
        let this = self.clone();
        self.queue.process(move || this.on_send(from, to, buffer));
    }

    fn on_send(&self, from: Address, to: Address, buffer: Vec<u8>) {
        if !matches!(to, Address::Tcp { .. }) {
            log::error!(
                "tcp: {}",
                BridgeError::PreconditionViolated(format!(
                    "TcpEndpoint::send requires a Tcp destination, got {to:?}"
                ))
            );
            return;
        }

        let mut registry = self.registry.lock().unwrap();
        let connection = match registry.find_open(&from, &to) {
            Some(c) => c,
            None => {
                registry.cleanup_closed();
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                let connection = self.io.connect(id, from.clone(), to.clone());
                registry.insert(connection.clone());
                connection
            }
        };
        connection.send(buffer);
    }

    /// Removes a connection from the registry by id.
    pub fn destroy(self: &Arc<Self>, id: u64) {
        let this = self.clone();
        self.queue.process(move || {
            this.registry.lock().unwrap().destroy(id);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::sync::mpsc::channel;
    use std::time::Duration;

    #[test]
    fn send_creates_and_reuses_one_open_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let tcp = TcpEndpoint::new();
        tcp.start().unwrap();

        let from = Address::Tcp { host: "127.0.0.1".into(), port: 0 };
        let to = Address::Tcp { host: "127.0.0.1".into(), port };

        tcp.send(from.clone(), to.clone(), vec![1, 2, 3]);
        tcp.send(from.clone(), to.clone(), vec![4, 5, 6]);

        let (tx, rx) = channel::<()>();
        tcp.queue.process(move || tx.send(()).unwrap());
        rx.recv_timeout(Duration::from_secs(2)).unwrap();

        assert_eq!(tcp.registry.lock().unwrap().len(), 1);
        tcp.stop();
    }
}
