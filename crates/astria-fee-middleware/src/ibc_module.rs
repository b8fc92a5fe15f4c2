//! The callbacks the IBC core invokes on the application bound to a port.
//!
//! [`crate::FeeMiddleware`] implements [`IbcModule`] itself and wraps another
//! implementation, so middleware and applications can be stacked.

use async_trait::async_trait;
use cnidarium::StateWrite;
use ibc_types::core::channel::{
    ChannelId,
    PortId,
};

use crate::{
    address::Address,
    packet::{
        Acknowledgement,
        Packet,
    },
};

#[async_trait]
pub trait IbcModule: Send + Sync {
    type Error: Into<eyre::Report> + Send;

    /// Returns the version the module agrees to, given the proposed `version`.
    async fn on_chan_open_init<S: StateWrite>(
        &self,
        state: S,
        port_id: &PortId,
        channel_id: &ChannelId,
        version: &str,
    ) -> Result<String, Self::Error>;

    /// Returns the version the module agrees to, given the counterparty's version.
    async fn on_chan_open_try<S: StateWrite>(
        &self,
        state: S,
        port_id: &PortId,
        channel_id: &ChannelId,
        counterparty_version: &str,
    ) -> Result<String, Self::Error>;

    async fn on_chan_open_ack<S: StateWrite>(
        &self,
        state: S,
        port_id: &PortId,
        channel_id: &ChannelId,
        counterparty_version: &str,
    ) -> Result<(), Self::Error>;

    async fn on_chan_open_confirm<S: StateWrite>(
        &self,
        state: S,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<(), Self::Error>;

    async fn on_chan_close_init<S: StateWrite>(
        &self,
        state: S,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<(), Self::Error>;

    async fn on_chan_close_confirm<S: StateWrite>(
        &self,
        state: S,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<(), Self::Error>;

    /// Handles a packet delivered by `relayer`.
    ///
    /// Returns `None` if the acknowledgement is written asynchronously later on.
    async fn on_recv_packet<S: StateWrite>(
        &self,
        state: S,
        packet: &Packet,
        relayer: &Address,
    ) -> Result<Option<Acknowledgement>, Self::Error>;

    async fn on_acknowledgement_packet<S: StateWrite>(
        &self,
        state: S,
        packet: &Packet,
        acknowledgement: &[u8],
        relayer: &Address,
    ) -> Result<(), Self::Error>;

    async fn on_timeout_packet<S: StateWrite>(
        &self,
        state: S,
        packet: &Packet,
        relayer: &Address,
    ) -> Result<(), Self::Error>;
}
