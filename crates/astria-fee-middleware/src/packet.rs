use std::fmt::{
    self,
    Display,
    Formatter,
};

use ibc_types::core::channel::{
    ChannelId,
    PortId,
};

/// Identifies one packet within the lifetime of a channel.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PacketId {
    pub port_id: PortId,
    pub channel_id: ChannelId,
    pub sequence: u64,
}

impl PacketId {
    #[must_use]
    pub fn new(port_id: PortId, channel_id: ChannelId, sequence: u64) -> Self {
        Self {
            port_id,
            channel_id,
            sequence,
        }
    }
}

impl Display for PacketId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.port_id, self.channel_id, self.sequence)
    }
}

/// The parts of a channel packet the fee middleware looks at.
///
/// Source is the sending chain (where fees are escrowed), destination the receiving chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub sequence: u64,
    pub source_port: PortId,
    pub source_channel: ChannelId,
    pub destination_port: PortId,
    pub destination_channel: ChannelId,
    pub data: Vec<u8>,
}

impl Packet {
    /// The id under which fees for this packet are escrowed on the source chain.
    #[must_use]
    pub fn source_id(&self) -> PacketId {
        PacketId::new(
            self.source_port.clone(),
            self.source_channel.clone(),
            self.sequence,
        )
    }

    /// The id under which the forward relayer is recorded on the destination chain.
    #[must_use]
    pub fn destination_id(&self) -> PacketId {
        PacketId::new(
            self.destination_port.clone(),
            self.destination_channel.clone(),
            self.sequence,
        )
    }
}

/// An acknowledgement as produced by an application's receive handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Acknowledgement {
    data: Vec<u8>,
    success: bool,
}

impl Acknowledgement {
    #[must_use]
    pub fn new(data: Vec<u8>, success: bool) -> Self {
        Self {
            data,
            success,
        }
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.success
    }
}
