use async_trait::async_trait;
use cnidarium::{
    StateRead,
    StateWrite,
};
use eyre::{
    Result,
    WrapErr as _,
};
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
    storage::StoredValue,
    utils::anyhow_to_eyre,
};

#[async_trait]
pub trait StateReadExt: StateRead {
    #[instrument(skip_all, fields(%port_id, %channel_id), err(level = Level::WARN))]
    async fn channel_exists(&self, port_id: &PortId, channel_id: &ChannelId) -> Result<bool> {
        Ok(self
            .get_raw(&keys::channel(port_id, channel_id))
            .await
            .map_err(anyhow_to_eyre)
            .wrap_err("failed reading raw channel from state")?
            .is_some())
    }

    /// Returns the sequence the next packet sent on the channel will carry.
    ///
    /// Channels start sending at sequence 1.
    #[instrument(skip_all, fields(%port_id, %channel_id), err(level = Level::WARN))]
    async fn get_next_sequence_send(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<u64> {
        let Some(bytes) = self
            .get_raw(&keys::next_sequence_send(port_id, channel_id))
            .await
            .map_err(anyhow_to_eyre)
            .wrap_err("failed reading raw next sequence send from state")?
        else {
            return Ok(1);
        };
        StoredValue::deserialize(&bytes)
            .and_then(|value| storage::Sequence::try_from(value).map(u64::from))
            .wrap_err("invalid next sequence send bytes")
    }

    /// Returns whether a commitment for a sent, not yet acknowledged or timed out packet
    /// exists.
    #[instrument(
        skip_all,
        fields(%port_id, %channel_id, sequence = sequence),
        err(level = Level::WARN)
    )]
    async fn has_packet_commitment(
        &self,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: u64,
    ) -> Result<bool> {
        Ok(self
            .get_raw(&keys::packet_commitment(port_id, channel_id, sequence))
            .await
            .map_err(anyhow_to_eyre)
            .wrap_err("failed reading raw packet commitment from state")?
            .is_some())
    }
}

impl<T: StateRead + ?Sized> StateReadExt for T {}

#[async_trait]
pub trait StateWriteExt: StateWrite {
    #[instrument(skip_all, fields(%port_id, %channel_id))]
    fn put_channel(&mut self, port_id: &PortId, channel_id: &ChannelId) -> Result<()> {
        let bytes = StoredValue::Unit
            .serialize()
            .wrap_err("failed to serialize channel marker")?;
        self.put_raw(keys::channel(port_id, channel_id), bytes);
        Ok(())
    }

    #[instrument(skip_all, fields(%port_id, %channel_id, sequence = sequence))]
    fn put_next_sequence_send(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: u64,
    ) -> Result<()> {
        let bytes = StoredValue::from(storage::Sequence::from(sequence))
            .serialize()
            .wrap_err("failed to serialize next sequence send")?;
        self.put_raw(keys::next_sequence_send(port_id, channel_id), bytes);
        Ok(())
    }

    #[instrument(skip_all, fields(%port_id, %channel_id, sequence = sequence))]
    fn put_packet_commitment(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: u64,
    ) -> Result<()> {
        let bytes = StoredValue::Unit
            .serialize()
            .wrap_err("failed to serialize packet commitment")?;
        self.put_raw(keys::packet_commitment(port_id, channel_id, sequence), bytes);
        Ok(())
    }

    #[instrument(skip_all, fields(%port_id, %channel_id, sequence = sequence))]
    fn delete_packet_commitment(
        &mut self,
        port_id: &PortId,
        channel_id: &ChannelId,
        sequence: u64,
    ) {
        self.delete(keys::packet_commitment(port_id, channel_id, sequence));
    }
}

impl<T: StateWrite> StateWriteExt for T {}

#[cfg(test)]
mod tests {
    use cnidarium::StateDelta;

    use super::*;

    fn port_id() -> PortId {
        "transfer".parse().unwrap()
    }

    #[tokio::test]
    async fn channel_exists_after_put() {
        let storage = cnidarium::TempStorage::new().await.unwrap();
        let snapshot = storage.latest_snapshot();
        let mut state = StateDelta::new(snapshot);

        let channel_id = ChannelId::new(0);
        assert!(!state.channel_exists(&port_id(), &channel_id).await.unwrap());
        state.put_channel(&port_id(), &channel_id).unwrap();
        assert!(state.channel_exists(&port_id(), &channel_id).await.unwrap());
        assert!(!state
            .channel_exists(&port_id(), &ChannelId::new(1))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn next_sequence_send_defaults_to_one() {
        let storage = cnidarium::TempStorage::new().await.unwrap();
        let snapshot = storage.latest_snapshot();
        let mut state = StateDelta::new(snapshot);

        let channel_id = ChannelId::new(0);
        assert_eq!(
            state
                .get_next_sequence_send(&port_id(), &channel_id)
                .await
                .unwrap(),
            1
        );
        state
            .put_next_sequence_send(&port_id(), &channel_id, 7)
            .unwrap();
        assert_eq!(
            state
                .get_next_sequence_send(&port_id(), &channel_id)
                .await
                .unwrap(),
            7
        );
    }

    #[tokio::test]
    async fn packet_commitment_put_and_delete() {
        let storage = cnidarium::TempStorage::new().await.unwrap();
        let snapshot = storage.latest_snapshot();
        let mut state = StateDelta::new(snapshot);

        let channel_id = ChannelId::new(0);
        state
            .put_packet_commitment(&port_id(), &channel_id, 3)
            .unwrap();
        assert!(state
            .has_packet_commitment(&port_id(), &channel_id, 3)
            .await
            .unwrap());
        assert!(!state
            .has_packet_commitment(&port_id(), &channel_id, 4)
            .await
            .unwrap());

        state.delete_packet_commitment(&port_id(), &channel_id, 3);
        assert!(!state
            .has_packet_commitment(&port_id(), &channel_id, 3)
            .await
            .unwrap());
    }
}
