/// A peer address, value-typed with deep-copy (`Clone`) and structural
/// equality. The variant a value holds is also its dispatch tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Address {
    Serial,
    XBeeNet(u64),
    Tcp { host: String, port: u16 },
}

impl Address {
    pub fn origin(&self) -> Origin {
        match self {
            Address::Serial => Origin::Serial,
            Address::XBeeNet(_) => Origin::XbeeNet,
            Address::Tcp { .. } => Origin::Tcp,
        }
    }
}

/// Dispatch tag shared by `Address` and `DataUnit`. `XbeeEncoder` has no
/// corresponding `Address` variant: it exists only to route encoder output
/// back to the serial write path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Serial,
    XbeeNet,
    XbeeEncoder,
    Tcp,
}
