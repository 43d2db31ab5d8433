//! Single-consumer FIFO dispatch of command closures on a dedicated thread
//! (spec §4.1). Each networked component (`SerialEndpoint`, `XBeeEndpoint`,
//! `TcpEndpoint`, `Router`) owns one of these instead of sharing an
//! execution context with anyone else.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::error::BridgeError;

type Command = Box<dyn FnOnce() + Send + 'static>;

/// A component's owned thread plus FIFO queue of command closures.
pub struct CommandQueue {
    name: &'static str,
    stopping: Arc<AtomicBool>,
    sender: Mutex<Option<Sender<Command>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl CommandQueue {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            stopping: Arc::new(AtomicBool::new(true)),
            sender: Mutex::new(None),
            handle: Mutex::new(None),
        }
    }

    /// Spawns the worker thread. Fails if already running; safe to call
    /// again after `stop()`.
    pub fn start(&self) -> Result<(), BridgeError> {
        let mut sender_guard = self.sender.lock().unwrap();
        if sender_guard.is_some() {
            return Err(BridgeError::AlreadyRunning(self.name));
        }

        let (tx, rx) = mpsc::channel::<Command>();
        self.stopping.store(false, Ordering::SeqCst);
        let stopping = self.stopping.clone();
        let name = self.name;

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                for cmd in rx {
                    // Commands queued before stop() took effect are drained
                    // here without executing, not run to completion.
                    if stopping.load(Ordering::SeqCst) {
                        continue;
                    }
                    if let Err(cause) = panic::catch_unwind(AssertUnwindSafe(cmd)) {
                        log::error!("{name}: command panicked: {}", panic_message(&cause));
                    }
                }
            })
            .map_err(|e| BridgeError::StartupFailed(name, e.to_string()))?;

        *sender_guard = Some(tx);
        *self.handle.lock().unwrap() = Some(handle);
        Ok(())
    }

    /// Signals shutdown, wakes the worker, joins. Commands still sitting in
    /// the queue are discarded, not executed.
    pub fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        // Dropping the sender disconnects the channel, which unblocks the
        // worker's `for cmd in rx` once the queue drains.
        drop(self.sender.lock().unwrap().take());
        if let Some(handle) = self.handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }

    /// Enqueues a command; returns immediately. Safe from any thread. Silently
    /// dropped once `stop()` has begun.
    pub fn process(&self, cmd: impl FnOnce() + Send + 'static) {
        if self.stopping.load(Ordering::SeqCst) {
            return;
        }
        if let Some(tx) = self.sender.lock().unwrap().as_ref() {
            let _ = tx.send(Box::new(cmd));
        }
    }
}

fn panic_message(cause: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = cause.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
