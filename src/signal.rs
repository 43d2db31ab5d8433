//! Listens for SIGINT/SIGTERM on a dedicated runtime and forwards shutdown
//! to the application's command processor (spec §4.8), replacing the
//! original's POSIX signal handler registered against a counting semaphore.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use crate::error::BridgeError;

pub struct SignalListener {
    handle: std::sync::Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
    started: AtomicBool,
}

impl SignalListener {
    pub fn new() -> Self {
        Self {
            handle: std::sync::Mutex::new(None),
            cancel: CancellationToken::new(),
            started: AtomicBool::new(false),
        }
    }

    /// Spawns the listener thread. `on_signal` runs on the listener's
    /// runtime the moment either signal arrives; it is expected to enqueue
    /// application shutdown rather than block.
    pub fn start(
        &self,
        on_signal: impl Fn() + Send + 'static,
    ) -> Result<(), BridgeError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(BridgeError::AlreadyRunning("SignalListener"));
        }

        let cancel = self.cancel.clone();
        let handle = thread::Builder::new()
            .name("signal".into())
            .spawn(move || {
                let rt = match Runtime::new() {
                    Ok(rt) => rt,
                    Err(e) => {
                        log::error!("signal: failed to start runtime: {e}");
                        return;
                    }
                };
                rt.block_on(async move {
                    let mut sigterm = match tokio::signal::unix::signal(
                        tokio::signal::unix::SignalKind::terminate(),
                    ) {
                        Ok(s) => s,
                        Err(e) => {
                            log::error!("signal: failed to install SIGTERM handler: {e}");
                            return;
                        }
                    };

                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {
                            log::info!("signal: received SIGINT");
                            on_signal();
                        }
                        _ = sigterm.recv() => {
                            log::info!("signal: received SIGTERM");
                            on_signal();
                        }
                        _ = cancel.cancelled() => {}
                    }
                });
            })
            .map_err(|e| BridgeError::StartupFailed("SignalListener", e.to_string()))?;

        *self.handle.lock().unwrap() = Some(handle);
        Ok(())
    }

    pub fn stop(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.lock().unwrap().take() {
            let _ = handle.join();
        }
        self.started.store(false, Ordering::SeqCst);
    }
}

impl Default for SignalListener {
    fn default() -> Self {
        Self::new()
    }
}
