use super::{Address, Origin};

/// A payload buffer plus optional source/destination addressing, moved
/// between endpoints by the router. Each unit owns its payload exclusively
/// while in transit; `pop_data` transfers that ownership out.
#[derive(Debug)]
pub enum DataUnit {
    /// Raw inbound bytes from the serial port, unframed.
    Serial { data: Vec<u8> },
    /// A decoded inbound XBee frame payload.
    XBee { data: Vec<u8>, source: Address },
    /// An encoded, escaped outbound byte stream ready for the serial port.
    XBeeEncoder { data: Vec<u8>, destination: Address },
    /// An inbound TCP payload.
    Tcp { data: Vec<u8>, source: Address, destination: Address },
}

impl DataUnit {
    pub fn origin(&self) -> Origin {
        match self {
            DataUnit::Serial { .. } => Origin::Serial,
            DataUnit::XBee { .. } => Origin::XbeeNet,
            DataUnit::XBeeEncoder { .. } => Origin::XbeeEncoder,
            DataUnit::Tcp { .. } => Origin::Tcp,
        }
    }

    /// Transfers ownership of the payload out of the unit.
    pub fn pop_data(self) -> Vec<u8> {
        match self {
            DataUnit::Serial { data }
            | DataUnit::XBee { data, .. }
            | DataUnit::XBeeEncoder { data, .. }
            | DataUnit::Tcp { data, .. } => data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_tag_equals_variant() {
        assert_eq!(DataUnit::Serial { data: vec![] }.origin(), Origin::Serial);
        assert_eq!(
            DataUnit::XBee { data: vec![], source: Address::XBeeNet(1) }.origin(),
            Origin::XbeeNet
        );
        assert_eq!(
            DataUnit::XBeeEncoder { data: vec![], destination: Address::XBeeNet(1) }.origin(),
            Origin::XbeeEncoder
        );
        assert_eq!(
            DataUnit::Tcp {
                data: vec![],
                source: Address::Tcp { host: "a".into(), port: 1 },
                destination: Address::Tcp { host: "b".into(), port: 2 },
            }
            .origin(),
            Origin::Tcp
        );
    }

    #[test]
    fn pop_data_transfers_payload() {
        let unit = DataUnit::Serial { data: vec![1, 2, 3] };
        assert_eq!(unit.pop_data(), vec![1, 2, 3]);
    }
}
