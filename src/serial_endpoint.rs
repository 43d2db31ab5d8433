//! Wraps the serial port driver (spec §4.4). Inbound bytes are read on a
//! dedicated reader thread and delivered to the router as `DataUnit::Serial`;
//! outbound writes run on the endpoint's own command queue so a slow or
//! blocked reader never stalls a write, and vice versa.

use std::io::{ErrorKind, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serialport::SerialPort;

use crate::command_queue::CommandQueue;
use crate::error::BridgeError;
use crate::networking::DataUnit;
use crate::router::Router;

const READ_TIMEOUT: Duration = Duration::from_millis(200);
const READ_CHUNK: usize = 1024;

pub struct SerialEndpoint {
    device: String,
    baud: u32,
    queue: CommandQueue,
    port: Mutex<Option<Box<dyn SerialPort>>>,
    reader: Mutex<Option<JoinHandle<()>>>,
    reader_stop: Arc<AtomicBool>,
    router: OnceLock<Arc<Router>>,
    /// Invoked with a human-readable cause when the driver reports the port
    /// closed; wired by the composition root to enqueue `ApplicationStop`.
    on_close: Box<dyn Fn(String) + Send + Sync>,
}

impl SerialEndpoint {
    pub fn new(
        device: String,
        baud: u32,
        on_close: impl Fn(String) + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            device,
            baud,
            queue: CommandQueue::new("serial"),
            port: Mutex::new(None),
            reader: Mutex::new(None),
            reader_stop: Arc::new(AtomicBool::new(true)),
            router: OnceLock::new(),
            on_close: Box::new(on_close),
        })
    }

    pub fn bind_router(&self, router: Arc<Router>) {
        let _ = self.router.set(router);
    }

    /// Starts the command queue only; does not touch hardware. Split out so
    /// other components can be exercised in tests without a real port.
    pub fn start_queue(&self) -> Result<(), BridgeError> {
        self.queue.start()
    }

    pub fn start(self: &Arc<Self>) -> Result<(), BridgeError> {
        self.start_queue()?;

        let port = serialport::new(&self.device, self.baud)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| BridgeError::StartupFailed("SerialEndpoint", e.to_string()))?;
        let reader_port = port
            .try_clone()
            .map_err(|e| BridgeError::StartupFailed("SerialEndpoint", e.to_string()))?;
        *self.port.lock().unwrap() = Some(port);

        self.reader_stop.store(false, Ordering::SeqCst);
        let this = self.clone();
        let stop_flag = self.reader_stop.clone();
        let handle = thread::Builder::new()
            .name("serial-reader".into())
            .spawn(move || this.read_loop(reader_port, stop_flag))
            .map_err(|e| BridgeError::StartupFailed("SerialEndpoint", e.to_string()))?;
        *self.reader.lock().unwrap() = Some(handle);
        Ok(())
    }

    fn read_loop(self: Arc<Self>, mut port: Box<dyn SerialPort>, stop: Arc<AtomicBool>) {
        let mut buf = [0u8; READ_CHUNK];
        while !stop.load(Ordering::SeqCst) {
            match port.read(&mut buf) {
                Ok(0) => continue,
                Ok(n) => {
                    if let Some(router) = self.router.get() {
                        router.process(DataUnit::Serial { data: buf[..n].to_vec() });
                    }
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => continue,
                Err(e) => {
                    if !stop.load(Ordering::SeqCst) {
                        log::error!("serial: port closed: {e}");
                        (self.on_close)(format!("Serial: {e}"));
                    }
                    break;
                }
            }
        }
    }

    /// Enqueues an outbound write; non-blocking.
    pub fn write(self: &Arc<Self>, buffer: Vec<u8>) {
        let this = self.clone();
        self.queue.process(move || this.on_write(buffer));
    }

    fn on_write(&self, buffer: Vec<u8>) {
        match self.port.lock().unwrap().as_mut() {
            Some(port) => {
                if let Err(e) = port.write_all(&buffer) {
                    log::error!("serial: write failed: {e}");
                }
            }
            None => log::error!("serial: write requested but no port is open, dropping"),
        }
    }

    pub fn stop(&self) {
        self.reader_stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.reader.lock().unwrap().take() {
            let _ = handle.join();
        }
        *self.port.lock().unwrap() = None;
        self.queue.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::Router;

    #[test]
    fn write_without_open_port_logs_and_does_not_panic() {
        let router = Router::new();
        let serial = SerialEndpoint::new("/dev/null-not-opened".into(), 9600, |_| {});
        serial.bind_router(router);
        serial.start_queue().unwrap();
        serial.write(vec![1, 2, 3]);
        serial.stop();
    }
}
