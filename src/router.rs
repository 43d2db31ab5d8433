//! Dispatches `DataUnit`s between endpoints by origin tag (spec §4.7).
//!
//! Router and its endpoints reference each other, so endpoints are
//! constructed first and the router is injected into each of them after
//! construction (Design Notes §9). The reverse link — router to endpoints —
//! is set via `bind`, once, at composition time.

use std::sync::{Arc, OnceLock};

use crate::command_queue::CommandQueue;
use crate::error::BridgeError;
use crate::networking::DataUnit;
use crate::serial_endpoint::SerialEndpoint;
use crate::xbee::XBeeEndpoint;

pub struct Router {
    queue: CommandQueue,
    serial: OnceLock<Arc<SerialEndpoint>>,
    xbee: OnceLock<Arc<XBeeEndpoint>>,
}

impl Router {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            queue: CommandQueue::new("router"),
            serial: OnceLock::new(),
            xbee: OnceLock::new(),
        })
    }

    /// Wires the handles the router dispatches to. Must be called exactly
    /// once before `start()`.
    pub fn bind(&self, serial: Arc<SerialEndpoint>, xbee: Arc<XBeeEndpoint>) {
        let _ = self.serial.set(serial);
        let _ = self.xbee.set(xbee);
    }

    pub fn start(&self) -> Result<(), BridgeError> {
        self.queue.start()
    }

    pub fn stop(&self) {
        self.queue.stop();
    }

    /// Enqueues dispatch of `unit` on the router's worker thread.
    pub fn process(self: &Arc<Self>, unit: DataUnit) {
        let this = self.clone();
        self.queue.process(move || this.on_process(unit));
    }

    fn on_process(&self, unit: DataUnit) {
        match unit {
            DataUnit::Serial { data } => match self.xbee.get() {
                Some(xbee) => xbee.from(data),
                None => log::error!("router: no XBeeEndpoint bound, dropping serial data"),
            },
            DataUnit::XBeeEncoder { data, .. } => match self.serial.get() {
                Some(serial) => serial.write(data),
                None => log::error!("router: no SerialEndpoint bound, dropping encoded frame"),
            },
            DataUnit::XBee { .. } => {
                // Reserved for future use; silently ignored by design
                // (REDESIGN FLAG R2 — not a fallthrough bug).
                log::debug!("router: ignoring XBee-origin unit (reserved)");
            }
            DataUnit::Tcp { .. } => {
                log::error!("router: {}", BridgeError::NotImplemented(crate::networking::Origin::Tcp));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::networking::Address;
    use std::sync::mpsc::channel;
    use std::time::Duration;

    fn wired_router() -> (Arc<Router>, Arc<SerialEndpoint>, Arc<XBeeEndpoint>) {
        let router = Router::new();
        let serial = SerialEndpoint::new("unused".into(), 9600, |_| {});
        let xbee = XBeeEndpoint::new();
        serial.bind_router(router.clone());
        xbee.bind_router(router.clone());
        router.bind(serial.clone(), xbee.clone());
        router.start().unwrap();
        xbee.start().unwrap();
        serial.start_queue().unwrap();
        (router, serial, xbee)
    }

    #[test]
    fn dispatch_is_total_over_every_origin() {
        let (router, serial, xbee) = wired_router();

        // Each call below must not panic regardless of origin.
        router.process(DataUnit::Serial { data: vec![0x00] });
        router.process(DataUnit::XBeeEncoder { data: vec![0x01], destination: Address::XBeeNet(1) });
        router.process(DataUnit::XBee { data: vec![0x02], source: Address::XBeeNet(1) });
        router.process(DataUnit::Tcp {
            data: vec![0x03],
            source: Address::Tcp { host: "a".into(), port: 1 },
            destination: Address::Tcp { host: "b".into(), port: 2 },
        });

        let (tx, rx) = channel::<()>();
        router.process(DataUnit::XBee { data: vec![], source: Address::XBeeNet(1) });
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            tx.send(()).ok();
        });
        rx.recv_timeout(Duration::from_secs(2)).unwrap();

        router.stop();
        xbee.stop();
        serial.stop();
    }
}
