//! Dedicated I/O thread for TCP sockets (spec §4.6, §5). Mirrors the
//! original design's separate "processor + I/O" threads for TcpNet: command
//! dispatch (connection lookup, registry mutation) happens on
//! `TcpEndpoint`'s `CommandQueue`; actual socket connect/read/write happens
//! here, on a small dedicated tokio runtime, so a slow connect never stalls
//! dispatch of other `send` calls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_util::sync::CancellationToken;

use crate::error::BridgeError;
use crate::networking::Address;

use super::connection::TcpConnection;

pub struct TcpIoReactor {
    handle: std::sync::Mutex<Option<JoinHandle<()>>>,
    runtime_handle: std::sync::Mutex<Option<tokio::runtime::Handle>>,
    cancel: CancellationToken,
    started: AtomicBool,
}

impl TcpIoReactor {
    pub fn new() -> Self {
        Self {
            handle: std::sync::Mutex::new(None),
            runtime_handle: std::sync::Mutex::new(None),
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
        }
    }

    pub fn start(&self) -> Result<(), BridgeError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(BridgeError::AlreadyRunning("TcpIoReactor"));
        }

        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<tokio::runtime::Handle>();
        let cancel = self.cancel.clone();
        let handle = thread::Builder::new()
            .name("tcp-io".into())
            .spawn(move || {
                let rt = match Runtime::new() {
                    Ok(rt) => rt,
                    Err(e) => {
                        log::error!("tcp: failed to start I/O runtime: {e}");
                        return;
                    }
                };
                ready_tx.send(rt.handle().clone()).ok();
                rt.block_on(cancel.cancelled());
            })
            .map_err(|e| BridgeError::StartupFailed("TcpIoReactor", e.to_string()))?;

        let runtime_handle = ready_rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .map_err(|e| BridgeError::StartupFailed("TcpIoReactor", e.to_string()))?;

        *self.handle.lock().unwrap() = Some(handle);
        *self.runtime_handle.lock().unwrap() = Some(runtime_handle);
        Ok(())
    }

    pub fn stop(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.lock().unwrap().take() {
            let _ = handle.join();
        }
        self.started.store(false, Ordering::SeqCst);
    }

    /// Spawns a connection task: connects, then relays outbound buffers to
    /// the socket until the channel closes or the socket errors. Returns
    /// immediately with a handle whose `send` enqueues onto the task.
    pub fn connect(&self, id: u64, from: Address, to: Address) -> Arc<TcpConnection> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let connection = Arc::new(TcpConnection::new(id, from, to.clone(), tx));
        let task_connection = connection.clone();

        let rt = self.runtime_handle.lock().unwrap().clone();
        let Some(rt) = rt else {
            log::error!("tcp: I/O reactor not started, connection {id} will never open");
            connection.mark_closed();
            return connection;
        };

        rt.spawn(async move {
            let Address::Tcp { host, port } = &to else {
                log::error!("tcp: connect requires a Tcp destination, got {to:?}");
                task_connection.mark_closed();
                return;
            };

            let stream = match TcpStream::connect((host.as_str(), *port)).await {
                Ok(s) => s,
                Err(e) => {
                    log::error!("tcp: connect to {host}:{port} failed: {e}");
                    task_connection.mark_closed();
                    return;
                }
            };
            let (mut read_half, mut write_half) = stream.into_split();

            let reader_connection = task_connection.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                loop {
                    match read_half.read(&mut buf).await {
                        Ok(0) | Err(_) => {
                            reader_connection.mark_closed();
                            break;
                        }
                        Ok(_) => {
                            // Inbound TCP payloads are not yet routed
                            // (Router's Tcp origin is NotImplemented, spec
                            // §4.7); the connection just needs to notice
                            // the peer closing.
                        }
                    }
                }
            });

            while let Some(buffer) = rx.recv().await {
                if write_half.write_all(&buffer).await.is_err() {
                    task_connection.mark_closed();
                    break;
                }
            }
        });

        connection
    }
}

impl Default for TcpIoReactor {
    fn default() -> Self {
        Self::new()
    }
}
