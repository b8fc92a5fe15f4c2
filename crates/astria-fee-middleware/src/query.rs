//! Read-only views over the fee middleware's state.

use cnidarium::StateRead;
use ibc_types::core::channel::{
    ChannelId,
    PortId,
};
use tracing::{
    instrument,
    Level,
};

use crate::{
    address::Address,
    coin::Coins,
    error::{
        FeeError,
        InternalContext as _,
    },
    escrow::{
        self,
        StateReadExt as _,
    },
    fee::{
        FeeComponent,
        IdentifiedPacketFees,
        InvalidFee,
    },
    middleware::StateReadExt as _,
    packet::PacketId,
    payee::StateReadExt as _,
};

/// Every packet with fees in escrow, ordered by port, channel and sequence.
///
/// # Errors
/// Returns an error if state cannot be read.
#[instrument(skip_all, err(level = Level::WARN))]
pub async fn incentivized_packets<S: StateRead>(
    state: &S,
) -> Result<Vec<IdentifiedPacketFees>, FeeError> {
    state
        .get_all_identified_packet_fees()
        .await
        .internal("failed to read incentivized packets")
}

/// # Errors
/// Returns an error if state cannot be read.
#[instrument(skip_all, fields(%port_id, %channel_id), err(level = Level::WARN))]
pub async fn incentivized_packets_for_channel<S: StateRead>(
    state: &S,
    port_id: &PortId,
    channel_id: &ChannelId,
) -> Result<Vec<IdentifiedPacketFees>, FeeError> {
    state
        .get_identified_packet_fees_on_channel(port_id, channel_id)
        .await
        .internal("failed to read incentivized packets on channel")
}

/// # Errors
/// Returns [`FeeError::PacketNotFound`] if no fees are escrowed for `packet_id`.
#[instrument(skip_all, fields(%packet_id), err(level = Level::WARN))]
pub async fn incentivized_packet<S: StateRead>(
    state: &S,
    packet_id: &PacketId,
) -> Result<IdentifiedPacketFees, FeeError> {
    let packet_fees = state
        .get_packet_fees(packet_id)
        .await
        .internal("failed to read packet fees")?;
    if packet_fees.is_empty() {
        return Err(FeeError::PacketNotFound {
            packet_id: packet_id.clone(),
        });
    }
    Ok(IdentifiedPacketFees {
        packet_id: packet_id.clone(),
        packet_fees,
    })
}

/// The sum of `component` over every payer's fee for `packet_id`.
///
/// # Errors
/// Returns [`FeeError::PacketNotFound`] if no fees are escrowed for `packet_id`.
#[instrument(skip_all, fields(%packet_id, %component), err(level = Level::WARN))]
pub async fn total_fees<S: StateRead>(
    state: &S,
    packet_id: &PacketId,
    component: FeeComponent,
) -> Result<Coins, FeeError> {
    let identified = incentivized_packet(state, packet_id).await?;
    identified
        .total(component)
        .ok_or_else(|| InvalidFee::Overflow.into())
}

/// # Errors
/// Returns [`FeeError::PacketNotFound`] if no fees are escrowed for `packet_id`.
pub async fn total_recv_fees<S: StateRead>(
    state: &S,
    packet_id: &PacketId,
) -> Result<Coins, FeeError> {
    total_fees(state, packet_id, FeeComponent::Recv).await
}

/// # Errors
/// Returns [`FeeError::PacketNotFound`] if no fees are escrowed for `packet_id`.
pub async fn total_ack_fees<S: StateRead>(
    state: &S,
    packet_id: &PacketId,
) -> Result<Coins, FeeError> {
    total_fees(state, packet_id, FeeComponent::Ack).await
}

/// # Errors
/// Returns [`FeeError::PacketNotFound`] if no fees are escrowed for `packet_id`.
pub async fn total_timeout_fees<S: StateRead>(
    state: &S,
    packet_id: &PacketId,
) -> Result<Coins, FeeError> {
    total_fees(state, packet_id, FeeComponent::Timeout).await
}

/// The payee registered for `relayer` on `channel_id`, if any.
///
/// # Errors
/// Returns an error if state cannot be read.
#[instrument(skip_all, fields(%channel_id, %relayer), err(level = Level::WARN))]
pub async fn payee<S: StateRead>(
    state: &S,
    channel_id: &ChannelId,
    relayer: &Address,
) -> Result<Option<Address>, FeeError> {
    state
        .get_payee(channel_id, relayer)
        .await
        .internal("failed to read payee")
}

/// # Errors
/// Returns an error if state cannot be read.
#[instrument(skip_all, fields(%channel_id, %relayer), err(level = Level::WARN))]
pub async fn counterparty_payee<S: StateRead>(
    state: &S,
    channel_id: &ChannelId,
    relayer: &Address,
) -> Result<Option<Address>, FeeError> {
    state
        .get_counterparty_payee(channel_id, relayer)
        .await
        .internal("failed to read counterparty payee")
}

/// # Errors
/// Returns an error if state cannot be read.
#[instrument(skip_all, err(level = Level::WARN))]
pub async fn fee_enabled_channels<S: StateRead>(
    state: &S,
) -> Result<Vec<(PortId, ChannelId)>, FeeError> {
    state
        .get_fee_enabled_channels()
        .await
        .internal("failed to read fee enabled channels")
}

/// # Errors
/// Returns an error if state cannot be read.
#[instrument(skip_all, fields(%port_id, %channel_id), err(level = Level::WARN))]
pub async fn fee_enabled_channel<S: StateRead>(
    state: &S,
    port_id: &PortId,
    channel_id: &ChannelId,
) -> Result<bool, FeeError> {
    state
        .is_fee_enabled(port_id, channel_id)
        .await
        .internal("failed to read fee enabled flag")
}

/// Verifies that the escrow account holds exactly what the ledger owes, per denomination.
///
/// # Errors
/// Returns [`FeeError::EscrowInvariantViolated`] if the two disagree.
pub async fn escrow_invariant<S: StateRead>(state: &S) -> Result<(), FeeError> {
    escrow::check_escrow_invariant(state).await
}
