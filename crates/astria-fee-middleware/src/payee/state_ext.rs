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
use ibc_types::core::channel::ChannelId;
use tracing::{
    debug,
    instrument,
    Level,
};

use super::{
    storage::{
        self,
        keys,
    },
    RegisteredPayee,
};
use crate::{
    address::Address,
    storage::StoredValue,
    utils::anyhow_to_eyre,
};

#[async_trait]
pub trait StateReadExt: StateRead {
    #[instrument(skip_all, fields(%channel_id, %relayer), err(level = Level::WARN))]
    async fn get_payee(
        &self,
        channel_id: &ChannelId,
        relayer: &Address,
    ) -> Result<Option<Address>> {
        get_address(self, &keys::payee(channel_id, relayer)).await
    }

    #[instrument(skip_all, fields(%channel_id, %relayer), err(level = Level::WARN))]
    async fn get_counterparty_payee(
        &self,
        channel_id: &ChannelId,
        relayer: &Address,
    ) -> Result<Option<Address>> {
        get_address(self, &keys::counterparty_payee(channel_id, relayer)).await
    }

    /// Returns the address that receives payouts earned by `relayer` on `channel_id`.
    #[instrument(skip_all, fields(%channel_id, %relayer), err(level = Level::WARN))]
    async fn resolve_payee(&self, channel_id: &ChannelId, relayer: &Address) -> Result<Address> {
        let payee = self
            .get_payee(channel_id, relayer)
            .await
            .wrap_err("failed to read payee")?;
        if let Some(payee) = &payee {
            debug!(%payee, "paying registered payee instead of relayer");
        }
        Ok(payee.unwrap_or_else(|| relayer.clone()))
    }

    #[instrument(skip_all, err(level = Level::WARN))]
    async fn get_all_payees(&self) -> Result<Vec<RegisteredPayee>> {
        collect_registrations(self, keys::PAYEE_PREFIX).await
    }

    #[instrument(skip_all, err(level = Level::WARN))]
    async fn get_all_counterparty_payees(&self) -> Result<Vec<RegisteredPayee>> {
        collect_registrations(self, keys::COUNTERPARTY_PAYEE_PREFIX).await
    }
}

impl<T: StateRead + ?Sized> StateReadExt for T {}

async fn get_address<S: StateRead + ?Sized>(state: &S, key: &str) -> Result<Option<Address>> {
    let Some(bytes) = state
        .get_raw(key)
        .await
        .map_err(anyhow_to_eyre)
        .wrap_err("failed reading raw payee from state")?
    else {
        return Ok(None);
    };
    StoredValue::deserialize(&bytes)
        .and_then(storage::PayeeAddress::try_from)
        .and_then(Address::try_from)
        .map(Some)
        .wrap_err("invalid payee bytes")
}

async fn collect_registrations<S: StateRead + ?Sized>(
    state: &S,
    prefix: &str,
) -> Result<Vec<RegisteredPayee>> {
    let mut registrations = Vec::new();
    let mut stream = std::pin::pin!(state.prefix_raw(prefix));
    while let Some(item) = stream.next().await {
        let (key, bytes) = item
            .map_err(anyhow_to_eyre)
            .wrap_err("failed reading payees from state")?;
        let (channel_id, relayer) = keys::extract_channel_and_relayer_from_key(&key, prefix)?;
        let payee = StoredValue::deserialize(&bytes)
            .and_then(storage::PayeeAddress::try_from)
            .and_then(Address::try_from)
            .wrap_err_with(|| format!("invalid payee bytes under key `{key}`"))?;
        registrations.push(RegisteredPayee {
            channel_id,
            relayer,
            payee,
        });
    }
    Ok(registrations)
}

#[async_trait]
pub trait StateWriteExt: StateWrite {
    #[instrument(skip_all, fields(%channel_id, %relayer, %payee))]
    fn put_payee(
        &mut self,
        channel_id: &ChannelId,
        relayer: &Address,
        payee: &Address,
    ) -> Result<()> {
        let bytes = StoredValue::from(storage::PayeeAddress::from(payee))
            .serialize()
            .wrap_err("failed to serialize payee")?;
        self.put_raw(keys::payee(channel_id, relayer), bytes);
        Ok(())
    }

    #[instrument(skip_all, fields(%channel_id, %relayer, %counterparty_payee))]
    fn put_counterparty_payee(
        &mut self,
        channel_id: &ChannelId,
        relayer: &Address,
        counterparty_payee: &Address,
    ) -> Result<()> {
        let bytes = StoredValue::from(storage::PayeeAddress::from(counterparty_payee))
            .serialize()
            .wrap_err("failed to serialize counterparty payee")?;
        self.put_raw(keys::counterparty_payee(channel_id, relayer), bytes);
        Ok(())
    }
}

impl<T: StateWrite> StateWriteExt for T {}
