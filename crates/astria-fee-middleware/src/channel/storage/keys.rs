use ibc_types::core::channel::{
    ChannelId,
    PortId,
};

use crate::utils::PaddedSequence;

const COMPONENT_PREFIX: &str = "channel/";

/// Example: `channel/transfer/channel-0`.
pub(in crate::channel) fn channel(port_id: &PortId, channel_id: &ChannelId) -> String {
    format!("{COMPONENT_PREFIX}{port_id}/{channel_id}")
}

/// Example: `channel/transfer/channel-0/next_sequence_send`.
pub(in crate::channel) fn next_sequence_send(port_id: &PortId, channel_id: &ChannelId) -> String {
    format!("{}/next_sequence_send", channel(port_id, channel_id))
}

/// Example: `channel/transfer/channel-0/commitment/00000000000000000001`.
///                                                 |   20 digits      |
pub(in crate::channel) fn packet_commitment(
    port_id: &PortId,
    channel_id: &ChannelId,
    sequence: u64,
) -> String {
    format!(
        "{}/commitment/{}",
        channel(port_id, channel_id),
        PaddedSequence(sequence)
    )
}
