use async_trait::async_trait;
use cnidarium::{
    StateRead,
    StateWrite,
};
use eyre::{
    OptionExt as _,
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
    fee::{
        IdentifiedPacketFees,
        PacketFee,
    },
    packet::PacketId,
    storage::StoredValue,
    utils::anyhow_to_eyre,
};

#[async_trait]
pub trait StateReadExt: StateRead {
    #[instrument(skip_all, err(level = Level::WARN))]
    async fn get_escrow_account(&self) -> Result<Address> {
        let bytes = self
            .get_raw(keys::ESCROW_ACCOUNT)
            .await
            .map_err(anyhow_to_eyre)
            .wrap_err("failed reading raw escrow account from state")?
            .ok_or_eyre("escrow account not found in state")?;
        StoredValue::deserialize(&bytes)
            .and_then(storage::EscrowAccount::try_from)
            .and_then(Address::try_from)
            .wrap_err("invalid escrow account bytes")
    }

    /// Returns the fees escrowed for `packet_id` in the order they were paid, or an empty
    /// list if the packet is not incentivized.
    #[instrument(skip_all, fields(%packet_id), err(level = Level::WARN))]
    async fn get_packet_fees(&self, packet_id: &PacketId) -> Result<Vec<PacketFee>> {
        let Some(bytes) = self
            .get_raw(&keys::packet_fees(packet_id))
            .await
            .map_err(anyhow_to_eyre)
            .wrap_err("failed reading raw packet fees from state")?
        else {
            return Ok(Vec::new());
        };
        StoredValue::deserialize(&bytes)
            .and_then(storage::PacketFees::try_from)
            .and_then(Vec::<PacketFee>::try_from)
            .wrap_err("invalid packet fees bytes")
    }

    #[instrument(skip_all, fields(%port_id, %channel_id), err(level = Level::WARN))]
    async fn get_identified_packet_fees_on_channel(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<Vec<IdentifiedPacketFees>> {
        let prefix = keys::packet_fees_on_channel_prefix(port_id, channel_id);
        collect_identified_packet_fees(self, &prefix).await
    }

    #[instrument(skip_all, err(level = Level::WARN))]
    async fn get_all_identified_packet_fees(&self) -> Result<Vec<IdentifiedPacketFees>> {
        collect_identified_packet_fees(self, keys::PACKET_FEES_PREFIX).await
    }
}

impl<T: StateRead + ?Sized> StateReadExt for T {}

async fn collect_identified_packet_fees<S: StateRead + ?Sized>(
    state: &S,
    prefix: &str,
) -> Result<Vec<IdentifiedPacketFees>> {
    let mut identified = Vec::new();
    let mut stream = std::pin::pin!(state.prefix_raw(prefix));
    while let Some(item) = stream.next().await {
        let (key, bytes) = item
            .map_err(anyhow_to_eyre)
            .wrap_err("failed reading packet fees from state")?;
        let packet_id = keys::extract_packet_id_from_key(&key)?;
        let packet_fees = StoredValue::deserialize(&bytes)
            .and_then(storage::PacketFees::try_from)
            .and_then(Vec::<PacketFee>::try_from)
            .wrap_err_with(|| format!("invalid packet fees bytes under key `{key}`"))?;
        identified.push(IdentifiedPacketFees {
            packet_id,
            packet_fees,
        });
    }
    Ok(identified)
}

#[async_trait]
pub trait StateWriteExt: StateWrite {
    #[instrument(skip_all, fields(%address))]
    fn put_escrow_account(&mut self, address: &Address) -> Result<()> {
        let bytes = StoredValue::from(storage::EscrowAccount::from(address))
            .serialize()
            .wrap_err("failed to serialize escrow account")?;
        self.put_raw(keys::ESCROW_ACCOUNT.to_string(), bytes);
        Ok(())
    }

    /// Overwrites the fees escrowed for `packet_id`; an empty list deletes the entry.
    #[instrument(skip_all, fields(%packet_id, entries = packet_fees.len()))]
    fn put_packet_fees(&mut self, packet_id: &PacketId, packet_fees: &[PacketFee]) -> Result<()> {
        if packet_fees.is_empty() {
            self.delete_packet_fees(packet_id);
            return Ok(());
        }
        let bytes = StoredValue::from(storage::PacketFees::from(packet_fees))
            .serialize()
            .wrap_err("failed to serialize packet fees")?;
        self.put_raw(keys::packet_fees(packet_id), bytes);
        Ok(())
    }

    #[instrument(skip_all, fields(%packet_id))]
    fn delete_packet_fees(&mut self, packet_id: &PacketId) {
        self.delete(keys::packet_fees(packet_id));
    }
}

impl<T: StateWrite> StateWriteExt for T {}
