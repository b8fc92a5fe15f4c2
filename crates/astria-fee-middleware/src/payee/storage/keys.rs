use eyre::{
    eyre,
    OptionExt as _,
    Result,
    WrapErr as _,
};
use ibc_types::core::channel::ChannelId;

use crate::address::Address;

const COMPONENT_PREFIX: &str = "payee/";

pub(in crate::payee) const PAYEE_PREFIX: &str = "payee/local/";
pub(in crate::payee) const COUNTERPARTY_PAYEE_PREFIX: &str = "payee/counterparty/";

/// Example: `payee/local/channel-0/astria1rsxy...cfgm`.
pub(in crate::payee) fn payee(channel_id: &ChannelId, relayer: &Address) -> String {
    format!("{PAYEE_PREFIX}{channel_id}/{relayer}")
}

/// Example: `payee/counterparty/channel-0/astria1rsxy...cfgm`.
pub(in crate::payee) fn counterparty_payee(channel_id: &ChannelId, relayer: &Address) -> String {
    format!("{COUNTERPARTY_PAYEE_PREFIX}{channel_id}/{relayer}")
}

/// Splits a key under `prefix` back into the channel and the relayer it was registered for.
pub(in crate::payee) fn extract_channel_and_relayer_from_key(
    key: &str,
    prefix: &str,
) -> Result<(ChannelId, Address)> {
    let (channel_id, relayer) = key
        .strip_prefix(prefix)
        .ok_or_eyre("failed to strip prefix from payee key")?
        .split_once('/')
        .ok_or_eyre("payee key is missing the relayer")?;
    Ok((
        channel_id
            .parse()
            .map_err(|e| eyre!("invalid channel id in payee key: {e}"))?,
        relayer
            .parse()
            .wrap_err("invalid relayer address in payee key")?,
    ))
}
