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

const COMPONENT_PREFIX: &str = "fee_middleware/";

pub(in crate::middleware) const FEE_ENABLED_PREFIX: &str = "fee_middleware/enabled/";
pub(in crate::middleware) const FORWARD_RELAYER_PREFIX: &str = "fee_middleware/forward_relayer/";

/// Example: `fee_middleware/enabled/transfer/channel-0`.
pub(in crate::middleware) fn fee_enabled(port_id: &PortId, channel_id: &ChannelId) -> String {
    format!("{FEE_ENABLED_PREFIX}{port_id}/{channel_id}")
}

/// Example: `fee_middleware/forward_relayer/transfer/channel-0/00000000000000000001`.
///                                                             |   20 digits      |
pub(in crate::middleware) fn forward_relayer(packet_id: &PacketId) -> String {
    format!(
        "{FORWARD_RELAYER_PREFIX}{}/{}/{}",
        packet_id.port_id,
        packet_id.channel_id,
        PaddedSequence(packet_id.sequence)
    )
}

pub(in crate::middleware) fn extract_channel_from_fee_enabled_key(
    key: &str,
) -> Result<(PortId, ChannelId)> {
    let (port_id, channel_id) = key
        .strip_prefix(FEE_ENABLED_PREFIX)
        .ok_or_eyre("failed to strip prefix from fee enabled key")?
        .split_once('/')
        .ok_or_eyre("fee enabled key is missing the channel id")?;
    Ok((
        port_id
            .parse()
            .map_err(|e| eyre!("invalid port id in fee enabled key: {e}"))?,
        channel_id
            .parse()
            .map_err(|e| eyre!("invalid channel id in fee enabled key: {e}"))?,
    ))
}

pub(in crate::middleware) fn extract_packet_id_from_forward_relayer_key(
    key: &str,
) -> Result<PacketId> {
    let suffix = key
        .strip_prefix(FORWARD_RELAYER_PREFIX)
        .ok_or_eyre("failed to strip prefix from forward relayer key")?;
    let mut parts = suffix.splitn(3, '/');
    let (Some(port_id), Some(channel_id), Some(sequence)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return Err(eyre!("forward relayer key `{key}` is missing components"));
    };
    Ok(PacketId::new(
        port_id
            .parse()
            .map_err(|e| eyre!("invalid port id in forward relayer key: {e}"))?,
        channel_id
            .parse()
            .map_err(|e| eyre!("invalid channel id in forward relayer key: {e}"))?,
        sequence
            .parse()
            .wrap_err("invalid sequence in forward relayer key")?,
    ))
}
