//! Composition root: wires endpoints and the router together, owns startup
//! and shutdown ordering (spec §5, §9 — replaces the original's Application
//! singleton with an explicit, non-global struct).

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cli::Config;
use crate::error::BridgeError;
use crate::router::Router;
use crate::serial_endpoint::SerialEndpoint;
use crate::signal::SignalListener;
use crate::tcp::TcpEndpoint;
use crate::xbee::XBeeEndpoint;

pub struct Application {
    serial: Arc<SerialEndpoint>,
    xbee: Arc<XBeeEndpoint>,
    tcp: Arc<TcpEndpoint>,
    router: Arc<Router>,
    signal: SignalListener,
    shutdown: CancellationToken,
}

impl Application {
    pub fn new(config: &Config) -> Arc<Self> {
        let shutdown = CancellationToken::new();
        let router = Router::new();

        let closing_shutdown = shutdown.clone();
        let serial = SerialEndpoint::new(config.device.clone(), config.baud, move |reason| {
            log::error!("application: serial endpoint closed: {reason}");
            closing_shutdown.cancel();
        });
        let xbee = XBeeEndpoint::new();
        let tcp = TcpEndpoint::new();

        serial.bind_router(router.clone());
        xbee.bind_router(router.clone());
        router.bind(serial.clone(), xbee.clone());

        Arc::new(Self {
            serial,
            xbee,
            tcp,
            router,
            signal: SignalListener::new(),
            shutdown,
        })
    }

    /// Starts every component in dependency order — signal listener first,
    /// Router last — so that `stop()`, which runs the reverse order, stops
    /// Router before anything that feeds it (spec §4.8, S6). On failure,
    /// already started components are stopped before the error is returned
    /// (spec §5: startup failures must not leave partially running
    /// components).
    pub fn start(self: &Arc<Self>) -> Result<(), BridgeError> {
        let shutdown = self.shutdown.clone();
        self.signal.start(move || shutdown.cancel())?;

        if let Err(e) = self.serial.start() {
            self.signal.stop();
            return Err(e);
        }

        if let Err(e) = self.xbee.start() {
            self.serial.stop();
            self.signal.stop();
            return Err(e);
        }

        if let Err(e) = self.tcp.start() {
            self.xbee.stop();
            self.serial.stop();
            self.signal.stop();
            return Err(e);
        }

        if let Err(e) = self.router.start() {
            self.tcp.stop();
            self.xbee.stop();
            self.serial.stop();
            self.signal.stop();
            return Err(e);
        }

        log::info!("application: started");
        Ok(())
    }

    /// Blocks the calling thread until a shutdown signal arrives, then
    /// stops every component in reverse startup order.
    pub fn run(self: &Arc<Self>) {
        self.shutdown.clone().blocking_wait();
        log::info!("application: shutting down");
        self.stop();
    }

    fn stop(&self) {
        self.stop_with(|_name| {});
    }

    /// Stops every component in reverse startup order, calling `on_stop`
    /// with each component's name immediately before it is stopped. `stop`
    /// is just this with a no-op observer; tests use the observer to assert
    /// the S6 ordering directly against the real call sequence.
    fn stop_with(&self, mut on_stop: impl FnMut(&'static str)) {
        on_stop("router");
        self.router.stop();
        on_stop("tcp");
        self.tcp.stop();
        on_stop("xbee");
        self.xbee.stop();
        on_stop("serial");
        self.serial.stop();
        on_stop("signal");
        self.signal.stop();
    }
}

/// `CancellationToken` has no blocking wait of its own; this thread parks on
/// a small runtime purely to await cancellation.
trait BlockingWait {
    fn blocking_wait(self);
}

impl BlockingWait for CancellationToken {
    fn blocking_wait(self) {
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                log::error!("application: failed to start shutdown-wait runtime: {e}");
                return;
            }
        };
        rt.block_on(self.cancelled());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config { device: "/dev/null".into(), baud: 9600, peers: vec![] }
    }

    #[test]
    fn new_wires_components_without_panicking() {
        let _app = Application::new(&config());
    }

    /// S6 — stop order is the reverse of start order: Router stops before
    /// XBeeEndpoint, which stops before SerialEndpoint.
    #[test]
    fn stop_reverses_start_order() {
        let app = Application::new(&config());
        let order = std::sync::Mutex::new(Vec::new());

        app.stop_with(|name| order.lock().unwrap().push(name));

        assert_eq!(
            *order.lock().unwrap(),
            vec!["router", "tcp", "xbee", "serial", "signal"]
        );
    }
}
