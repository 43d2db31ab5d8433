//! Command-line surface (spec §4.9).

use clap::Parser;

use crate::error::BridgeError;
use crate::networking::Address;

#[derive(Debug, Parser)]
#[command(name = "xbee-tcp-bridge", about = "Bridges an XBee API-mode radio to TCP peers")]
pub struct Cli {
    /// Serial device the XBee radio is attached to, e.g. /dev/ttyUSB0.
    #[arg(long)]
    pub device: String,

    /// Serial baud rate.
    #[arg(long, default_value_t = 9600)]
    pub baud: u32,

    /// A TCP peer this bridge may connect out to, as host:port. Repeatable.
    #[arg(long = "peer", value_name = "HOST:PORT")]
    pub peers: Vec<String>,
}

/// Validated configuration derived from `Cli`.
pub struct Config {
    pub device: String,
    pub baud: u32,
    pub peers: Vec<Address>,
}

impl TryFrom<Cli> for Config {
    type Error = BridgeError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let peers = cli
            .peers
            .iter()
            .map(|p| parse_peer(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Config { device: cli.device, baud: cli.baud, peers })
    }
}

fn parse_peer(raw: &str) -> Result<Address, BridgeError> {
    let (host, port) = raw
        .rsplit_once(':')
        .ok_or_else(|| BridgeError::Config(format!("peer '{raw}' is not HOST:PORT")))?;

    if host.is_empty() {
        return Err(BridgeError::Config(format!("peer '{raw}' has an empty host")));
    }

    let port: u16 = port
        .parse()
        .map_err(|_| BridgeError::Config(format!("peer '{raw}' has an invalid port")))?;

    Ok(Address::Tcp { host: host.to_string(), port })
}
