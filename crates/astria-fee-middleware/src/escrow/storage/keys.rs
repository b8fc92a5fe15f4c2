use eyre::{
    eyre,
    OptionExt as _,
    Result,
    WrapErr as _,
};
use ibc_types::core::channel::{
    ChannelId,
    PortId,
};

use crate::{
    packet::PacketId,
    utils::PaddedSequence,
};

const COMPONENT_PREFIX: &str = "escrow/";

pub(in crate::escrow) const ESCROW_ACCOUNT: &str = "escrow/account";
pub(in crate::escrow) const PACKET_FEES_PREFIX: &str = "escrow/packet_fees/";

/// Example: `escrow/packet_fees/transfer/channel-0/`.
pub(in crate::escrow) fn packet_fees_on_channel_prefix(
    port_id: &PortId,
    channel_id: &ChannelId,
) -> String {
    format!("{PACKET_FEES_PREFIX}{port_id}/{channel_id}/")
}

/// Example: `escrow/packet_fees/transfer/channel-0/00000000000000000001`.
///                                                  |   20 digits      |
pub(in crate::escrow) fn packet_fees(packet_id: &PacketId) -> String {
    format!(
        "{}{}",
        packet_fees_on_channel_prefix(&packet_id.port_id, &packet_id.channel_id),
        PaddedSequence(packet_id.sequence)
    )
}

pub(in crate::escrow) fn extract_packet_id_from_key(key: &str) -> Result<PacketId> {
    let suffix = key
        .strip_prefix(PACKET_FEES_PREFIX)
        .ok_or_eyre("failed to strip prefix from packet fees key")?;
    let mut parts = suffix.splitn(3, '/');
    let (Some(port_id), Some(channel_id), Some(sequence)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return Err(eyre!("packet fees key `{key}` is missing components"));
    };
    Ok(PacketId::new(
        port_id
            .parse()
            .map_err(|e| eyre!("invalid port id in packet fees key: {e}"))?,
        channel_id
            .parse()
            .map_err(|e| eyre!("invalid channel id in packet fees key: {e}"))?,
        sequence
            .parse()
            .wrap_err("invalid sequence in packet fees key")?,
    ))
}
