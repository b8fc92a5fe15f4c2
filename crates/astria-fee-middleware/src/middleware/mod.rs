//! The fee middleware wrapping an application's channel and packet callbacks.
//!
//! A channel becomes fee enabled when its handshake negotiates the composite version (see
//! [`crate::version`]); every other channel is passed through to the wrapped application
//! untouched and never interacts with the escrow ledger.
//!
//! On fee-enabled channels the receiving side wraps the application's acknowledgement into
//! an [`IncentivizedAcknowledgement`] naming the forward relayer. If the application
//! acknowledges asynchronously, the relayer is recorded until the acknowledgement is
//! written. The sending side
//! unwraps it, lets the application process the inner acknowledgement and then settles
//! the escrowed fees: the forward relayer earns the receive fee and the relayer that
//! submitted the acknowledgement (or timeout) earns the ack (or timeout) fee.

mod state_ext;
pub(crate) mod storage;

use async_trait::async_trait;
use cnidarium::{
    StateDelta,
    StateRead,
    StateWrite,
};
use ibc_types::core::channel::{
    ChannelId,
    PortId,
};
pub use state_ext::{
    ForwardRelayerAddress,
    StateReadExt,
    StateWriteExt,
};
use tracing::{
    debug,
    instrument,
    warn,
    Level,
};

use crate::{
    acknowledgement::IncentivizedAcknowledgement,
    address::Address,
    distribution::Outcome,
    error::{
        FeeError,
        InternalContext as _,
    },
    escrow::{
        ledger,
        StateReadExt as _,
    },
    ibc_module::IbcModule,
    packet::{
        Acknowledgement,
        Packet,
    },
    payee::StateReadExt as _,
    utils::apply_with_events,
    version::{
        decode_version,
        encode_version,
        DecodedVersion,
    },
};

/// Wraps an [`IbcModule`] with relayer fee incentivization.
#[derive(Clone, Debug, Default)]
pub struct FeeMiddleware<A> {
    app: A,
}

impl<A: IbcModule> FeeMiddleware<A> {
    pub fn new(app: A) -> Self {
        Self {
            app,
        }
    }

    pub fn app(&self) -> &A {
        &self.app
    }

    /// Wraps an acknowledgement the application writes after it returned none from its
    /// receive callback, consuming the relayer recorded for the packet.
    ///
    /// # Errors
    /// Returns [`FeeError::ForwardRelayerNotFound`] if no relayer was recorded for the
    /// packet on a fee-enabled channel.
    #[instrument(
        skip_all,
        fields(packet_id = %packet.destination_id()),
        err(level = Level::WARN)
    )]
    pub async fn write_acknowledgement<S: StateWrite>(
        &self,
        mut state: S,
        packet: &Packet,
        app_acknowledgement: Acknowledgement,
    ) -> Result<Acknowledgement, FeeError> {
        if !state
            .is_fee_enabled(&packet.destination_port, &packet.destination_channel)
            .await
            .internal("failed to read fee enabled flag")?
        {
            return Ok(app_acknowledgement);
        }
        let packet_id = packet.destination_id();
        let relayer = state
            .get_forward_relayer(&packet_id)
            .await
            .internal("failed to read forward relayer")?
            .ok_or_else(|| FeeError::ForwardRelayerNotFound {
                packet_id: packet_id.clone(),
            })?;
        let forward_relayer_address =
            forward_relayer_address(&state, &packet.destination_channel, &relayer).await?;
        let acknowledgement = IncentivizedAcknowledgement::new(
            app_acknowledgement,
            forward_relayer_address.to_string(),
        )
        .to_acknowledgement()?;
        state.delete_forward_relayer(&packet_id);
        Ok(acknowledgement)
    }

    async fn handle_chan_open<S: StateWrite>(
        &self,
        mut state: S,
        port_id: &PortId,
        channel_id: &ChannelId,
        version: &str,
        is_try: bool,
    ) -> Result<String, FeeError> {
        let app_version = match decode_version(version)? {
            DecodedVersion::FeeEnabled(app_version) => app_version,
            // an empty proposal on init asks for the default, which is fee enabled
            DecodedVersion::NotSupported if !is_try && version.trim().is_empty() => String::new(),
            DecodedVersion::NotSupported => {
                debug!("proposed version carries no fee metadata; passing channel through");
                return self
                    .open_app(&mut state, port_id, channel_id, version, is_try)
                    .await;
            }
        };
        let negotiated = self
            .open_app(&mut state, port_id, channel_id, &app_version, is_try)
            .await?;
        state
            .put_fee_enabled(port_id, channel_id)
            .internal("failed to write fee enabled flag")?;
        debug!(app_version = %negotiated, "enabled fee incentivization on channel");
        encode_version(&negotiated)
    }

    async fn open_app<S: StateWrite>(
        &self,
        state: S,
        port_id: &PortId,
        channel_id: &ChannelId,
        version: &str,
        is_try: bool,
    ) -> Result<String, FeeError> {
        let result = if is_try {
            self.app
                .on_chan_open_try(state, port_id, channel_id, version)
                .await
        } else {
            self.app
                .on_chan_open_init(state, port_id, channel_id, version)
                .await
        };
        result.map_err(app_error)
    }

    async fn handle_chan_close<S: StateWrite>(
        &self,
        mut state: S,
        port_id: &PortId,
        channel_id: &ChannelId,
        is_confirm: bool,
    ) -> Result<(), FeeError> {
        let result = if is_confirm {
            self.app
                .on_chan_close_confirm(&mut state, port_id, channel_id)
                .await
        } else {
            self.app
                .on_chan_close_init(&mut state, port_id, channel_id)
                .await
        };
        result.map_err(app_error)?;
        if state
            .is_fee_enabled(port_id, channel_id)
            .await
            .internal("failed to read fee enabled flag")?
        {
            ledger::refund_fees_on_channel_closure(&mut state, port_id, channel_id).await?;
        }
        Ok(())
    }

    async fn handle_recv_packet<S: StateWrite>(
        &self,
        mut state: S,
        packet: &Packet,
        relayer: &Address,
    ) -> Result<Option<Acknowledgement>, FeeError> {
        if !state
            .is_fee_enabled(&packet.destination_port, &packet.destination_channel)
            .await
            .internal("failed to read fee enabled flag")?
        {
            return self
                .app
                .on_recv_packet(&mut state, packet, relayer)
                .await
                .map_err(app_error);
        }

        let app_acknowledgement = self
            .app
            .on_recv_packet(&mut state, packet, relayer)
            .await
            .map_err(app_error)?;

        let Some(app_acknowledgement) = app_acknowledgement else {
            let packet_id = packet.destination_id();
            if state
                .get_forward_relayer(&packet_id)
                .await
                .internal("failed to read forward relayer")?
                .is_none()
            {
                state
                    .put_forward_relayer(&packet_id, relayer)
                    .internal("failed to write forward relayer")?;
            }
            debug!("application acknowledges asynchronously");
            return Ok(None);
        };
        let forward_relayer_address =
            forward_relayer_address(&state, &packet.destination_channel, relayer).await?;
        IncentivizedAcknowledgement::new(app_acknowledgement, forward_relayer_address.to_string())
            .to_acknowledgement()
            .map(Some)
    }

    async fn handle_acknowledgement_packet<S: StateWrite>(
        &self,
        mut state: S,
        packet: &Packet,
        acknowledgement: &[u8],
        relayer: &Address,
    ) -> Result<(), FeeError> {
        if !state
            .is_fee_enabled(&packet.source_port, &packet.source_channel)
            .await
            .internal("failed to read fee enabled flag")?
        {
            return self
                .app
                .on_acknowledgement_packet(&mut state, packet, acknowledgement, relayer)
                .await
                .map_err(app_error);
        }

        let incentivized = IncentivizedAcknowledgement::decode(acknowledgement)?;
        self.app
            .on_acknowledgement_packet(
                &mut state,
                packet,
                &incentivized.app_acknowledgement,
                relayer,
            )
            .await
            .map_err(app_error)?;

        let packet_id = packet.source_id();
        if !is_incentivized(&state, packet).await? {
            debug!("packet is not incentivized; nothing to distribute");
            return Ok(());
        }

        let forward_relayer = match incentivized.forward_relayer_address.parse::<Address>() {
            Ok(address) => Some(address),
            Err(error) => {
                warn!(
                    %error,
                    forward_relayer_address = %incentivized.forward_relayer_address,
                    "acknowledgement names no valid forward relayer; refunding receive fee"
                );
                None
            }
        };
        ledger::distribute_recv(&mut state, &packet_id, forward_relayer.as_ref()).await?;
        ledger::distribute_ack_or_timeout(&mut state, &packet_id, relayer, Outcome::Acknowledged)
            .await
    }

    async fn handle_timeout_packet<S: StateWrite>(
        &self,
        mut state: S,
        packet: &Packet,
        relayer: &Address,
    ) -> Result<(), FeeError> {
        self.app
            .on_timeout_packet(&mut state, packet, relayer)
            .await
            .map_err(app_error)?;
        if !state
            .is_fee_enabled(&packet.source_port, &packet.source_channel)
            .await
            .internal("failed to read fee enabled flag")?
            || !is_incentivized(&state, packet).await?
        {
            return Ok(());
        }

        let packet_id = packet.source_id();
        ledger::distribute_recv(&mut state, &packet_id, None).await?;
        ledger::distribute_ack_or_timeout(&mut state, &packet_id, relayer, Outcome::TimedOut).await
    }
}

#[async_trait]
impl<A: IbcModule> IbcModule for FeeMiddleware<A> {
    type Error = FeeError;

    #[instrument(skip_all, fields(%port_id, %channel_id, %version), err(level = Level::WARN))]
    async fn on_chan_open_init<S: StateWrite>(
        &self,
        mut state: S,
        port_id: &PortId,
        channel_id: &ChannelId,
        version: &str,
    ) -> Result<String, FeeError> {
        let mut delta = StateDelta::new(&mut state);
        let version = self
            .handle_chan_open(&mut delta, port_id, channel_id, version, false)
            .await?;
        apply_with_events(delta);
        Ok(version)
    }

    #[instrument(
        skip_all,
        fields(%port_id, %channel_id, %counterparty_version),
        err(level = Level::WARN)
    )]
    async fn on_chan_open_try<S: StateWrite>(
        &self,
        mut state: S,
        port_id: &PortId,
        channel_id: &ChannelId,
        counterparty_version: &str,
    ) -> Result<String, FeeError> {
        let mut delta = StateDelta::new(&mut state);
        let version = self
            .handle_chan_open(&mut delta, port_id, channel_id, counterparty_version, true)
            .await?;
        apply_with_events(delta);
        Ok(version)
    }

    #[instrument(
        skip_all,
        fields(%port_id, %channel_id, %counterparty_version),
        err(level = Level::WARN)
    )]
    async fn on_chan_open_ack<S: StateWrite>(
        &self,
        mut state: S,
        port_id: &PortId,
        channel_id: &ChannelId,
        counterparty_version: &str,
    ) -> Result<(), FeeError> {
        if !state
            .is_fee_enabled(port_id, channel_id)
            .await
            .internal("failed to read fee enabled flag")?
        {
            return self
                .app
                .on_chan_open_ack(state, port_id, channel_id, counterparty_version)
                .await
                .map_err(app_error);
        }
        let DecodedVersion::FeeEnabled(app_version) = decode_version(counterparty_version)? else {
            return Err(FeeError::UndecodableCounterpartyVersion {
                version: counterparty_version.to_string(),
            });
        };
        self.app
            .on_chan_open_ack(&mut state, port_id, channel_id, &app_version)
            .await
            .map_err(app_error)
    }

    #[instrument(skip_all, fields(%port_id, %channel_id), err(level = Level::WARN))]
    async fn on_chan_open_confirm<S: StateWrite>(
        &self,
        state: S,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<(), FeeError> {
        self.app
            .on_chan_open_confirm(state, port_id, channel_id)
            .await
            .map_err(app_error)
    }

    #[instrument(skip_all, fields(%port_id, %channel_id), err(level = Level::WARN))]
    async fn on_chan_close_init<S: StateWrite>(
        &self,
        mut state: S,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<(), FeeError> {
        let mut delta = StateDelta::new(&mut state);
        self.handle_chan_close(&mut delta, port_id, channel_id, false)
            .await?;
        apply_with_events(delta);
        Ok(())
    }

    #[instrument(skip_all, fields(%port_id, %channel_id), err(level = Level::WARN))]
    async fn on_chan_close_confirm<S: StateWrite>(
        &self,
        mut state: S,
        port_id: &PortId,
        channel_id: &ChannelId,
    ) -> Result<(), FeeError> {
        let mut delta = StateDelta::new(&mut state);
        self.handle_chan_close(&mut delta, port_id, channel_id, true)
            .await?;
        apply_with_events(delta);
        Ok(())
    }

    #[instrument(
        skip_all,
        fields(packet_id = %packet.destination_id(), %relayer),
        err(level = Level::WARN)
    )]
    async fn on_recv_packet<S: StateWrite>(
        &self,
        mut state: S,
        packet: &Packet,
        relayer: &Address,
    ) -> Result<Option<Acknowledgement>, FeeError> {
        let mut delta = StateDelta::new(&mut state);
        let acknowledgement = self.handle_recv_packet(&mut delta, packet, relayer).await?;
        apply_with_events(delta);
        Ok(acknowledgement)
    }

    #[instrument(
        skip_all,
        fields(packet_id = %packet.source_id(), %relayer),
        err(level = Level::WARN)
    )]
    async fn on_acknowledgement_packet<S: StateWrite>(
        &self,
        mut state: S,
        packet: &Packet,
        acknowledgement: &[u8],
        relayer: &Address,
    ) -> Result<(), FeeError> {
        let mut delta = StateDelta::new(&mut state);
        self.handle_acknowledgement_packet(&mut delta, packet, acknowledgement, relayer)
            .await?;
        apply_with_events(delta);
        Ok(())
    }

    #[instrument(
        skip_all,
        fields(packet_id = %packet.source_id(), %relayer),
        err(level = Level::WARN)
    )]
    async fn on_timeout_packet<S: StateWrite>(
        &self,
        mut state: S,
        packet: &Packet,
        relayer: &Address,
    ) -> Result<(), FeeError> {
        let mut delta = StateDelta::new(&mut state);
        self.handle_timeout_packet(&mut delta, packet, relayer)
            .await?;
        apply_with_events(delta);
        Ok(())
    }
}

fn app_error<E: Into<eyre::Report>>(error: E) -> FeeError {
    FeeError::App(error.into())
}

async fn is_incentivized<S: StateRead>(state: &S, packet: &Packet) -> Result<bool, FeeError> {
    Ok(!state
        .get_packet_fees(&packet.source_id())
        .await
        .internal("failed to read packet fees")?
        .is_empty())
}

/// The address on the sending chain the forward relayer is paid at: its registered
/// counterparty payee, else its own address.
async fn forward_relayer_address<S: StateRead>(
    state: &S,
    channel_id: &ChannelId,
    relayer: &Address,
) -> Result<Address, FeeError> {
    Ok(state
        .get_counterparty_payee(channel_id, relayer)
        .await
        .internal("failed to read counterparty payee")?
        .unwrap_or_else(|| relayer.clone()))
}
