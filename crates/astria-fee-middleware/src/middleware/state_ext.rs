use async_trait::async_trait;
use cnidarium::{
    StateRead,
    StateWrite,
};
use eyre::{
    Result,
    WrapErr as _,
};
use futures::StreamExt as _;
use ibc_types::core::channel::{
    ChannelId,
    PortId,
};
use tracing::{
    instrument,
    Level,
};

use super::storage::{
    self,
    keys,
};
use crate::{
    address::Address,
    packet::PacketId,
    storage::StoredValue,
    utils::anyhow_to_eyre,
};

/// The relayer that delivered a packet, as recorded on the receiving chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ForwardRelayerAddress {
    pub packet_id: PacketId,
    pub address: Address,
}

#[async_trait]
pub trait StateReadExt: StateRead {
    #[instrument(skip_all, fields(%port_id, %channel_id), err(level = Level::WARN))]
    async fn is_fee_enabled(&self, port_id: &PortId, channel_id: &ChannelId) -> Result<bool> {
        Ok(self
            .get_raw(&keys::fee_enabled(port_id, channel_id))
            .await
            .map_err(anyhow_to_eyre)
            .wrap_err("failed reading raw fee enabled flag from state")?
            .is_some())
    }

    #[instrument(skip_all, err(level = Level::WARN))]
    async fn get_fee_enabled_channels(&self) -> Result<Vec<(PortId, ChannelId)>> {
        let mut channels = Vec::new();
        let mut stream = std::pin::pin!(self.prefix_keys(keys::FEE_ENABLED_PREFIX));
        while let Some(key) = stream.next().await {
            let key = key
                .map_err(anyhow_to_eyre)
                .wrap_err("failed reading fee enabled channels from state")?;
            channels.push(keys::extract_channel_from_fee_enabled_key(&key)?);
        }
        Ok(channels)
    }

    #[instrument(skip_all, fields(%packet_id), err(level = Level::WARN))]
    async fn get_forward_relayer(&self, packet_id: &PacketId) -> Result<Option<Address>> {
        let Some(bytes) = self
            .get_raw(&keys::forward_relayer(packet_id))
            .await
            .map_err(anyhow_to_eyre)
            .wrap_err("failed reading raw forward relayer from state")?
        else {
            return Ok(None);
        };
        StoredValue::deserialize(&bytes)
            .and_then(storage::ForwardRelayer::try_from)
            .and_then(Address::try_from)
            .map(Some)
            .wrap_err("invalid forward relayer bytes")
    }

    #[instrument(skip_all, err(level = Level::WARN))]
    async fn get_all_forward_relayers(&self) -> Result<Vec<ForwardRelayerAddress>> {
        let mut relayers = Vec::new();
        let mut stream = std::pin::pin!(self.prefix_raw(keys::FORWARD_RELAYER_PREFIX));
        while let Some(item) = stream.next().await {
            let (key, bytes) = item
                .map_err(anyhow_to_eyre)
                .wrap_err("failed reading forward relayers from state")?;
            let packet_id = keys::extract_packet_id_from_forward_relayer_key(&key)?;
            let address = StoredValue::deserialize(&bytes)
                .and_then(storage::ForwardRelayer::try_from)
                .and_then(Address::try_from)
                .wrap_err_with(|| format!("invalid forward relayer bytes under key `{key}`"))?;
            relayers.push(ForwardRelayerAddress {
                packet_id,
                address,
            });
        }
        Ok(relayers)
    }
}

impl<T: StateRead + ?Sized> StateReadExt for T {}

#[async_trait]
pub trait StateWriteExt: StateWrite {
    #[instrument(skip_all, fields(%port_id, %channel_id))]
    fn put_fee_enabled(&mut self, port_id: &PortId, channel_id: &ChannelId) -> Result<()> {
        let bytes = StoredValue::Unit
            .serialize()
            .wrap_err("failed to serialize fee enabled flag")?;
        self.put_raw(keys::fee_enabled(port_id, channel_id), bytes);
        Ok(())
    }

    #[instrument(skip_all, fields(%packet_id, %relayer))]
    fn put_forward_relayer(&mut self, packet_id: &PacketId, relayer: &Address) -> Result<()> {
        let bytes = StoredValue::from(storage::ForwardRelayer::from(relayer))
            .serialize()
            .wrap_err("failed to serialize forward relayer")?;
        self.put_raw(keys::forward_relayer(packet_id), bytes);
        Ok(())
    }

    #[instrument(skip_all, fields(%packet_id))]
    fn delete_forward_relayer(&mut self, packet_id: &PacketId) {
        self.delete(keys::forward_relayer(packet_id));
    }
}

impl<T: StateWrite> StateWriteExt for T {}
