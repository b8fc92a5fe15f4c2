use cnidarium::{
    StateRead,
    StateWrite,
};
use ibc_types::core::channel::{
    ChannelId,
    PortId,
};
use tracing::{
    debug,
    error,
    info,
    instrument,
    warn,
    Level,
};

use super::{
    StateReadExt as _,
    StateWriteExt as _,
};
use crate::{
    accounts::{
        StateReadExt as _,
        StateWriteExt as _,
        TransferError,
    },
    address::Address,
    channel::StateReadExt as _,
    coin::Coins,
    distribution::{
        recv_split,
        terminal_split,
        Outcome,
    },
    error::{
        FeeError,
        InternalContext as _,
    },
    events,
    fee::{
        FeeComponent,
        IdentifiedPacketFees,
        InvalidFee,
        PacketFee,
    },
    middleware::StateReadExt as _,
    packet::PacketId,
    payee::StateReadExt as _,
};

/// Locates one payer's entry in the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeeHandle {
    pub packet_id: PacketId,
    pub index: usize,
}

/// Moves the total of `packet_fee` from its payer into escrow and appends it to the
/// entries of `packet_id`.
///
/// # Errors
/// Fails without touching state if the fee is invalid, the channel is not fee enabled,
/// the packet was already acknowledged or timed out, the payer is the escrow account, or
/// the payer cannot cover the fee.
#[instrument(
    skip_all,
    fields(%packet_id, payer = %packet_fee.refund_address),
    err(level = Level::WARN)
)]
pub(crate) async fn lock_fee<S: StateWrite>(
    mut state: S,
    packet_id: &PacketId,
    packet_fee: PacketFee,
) -> Result<FeeHandle, FeeError> {
    packet_fee.fee.validate()?;
    if !state
        .is_fee_enabled(&packet_id.port_id, &packet_id.channel_id)
        .await
        .internal("failed to read fee enabled flag")?
    {
        return Err(FeeError::NoExistingFeeEnabledChannel {
            port_id: packet_id.port_id.clone(),
            channel_id: packet_id.channel_id.clone(),
        });
    }

    let next_sequence_send = state
        .get_next_sequence_send(&packet_id.port_id, &packet_id.channel_id)
        .await
        .internal("failed to read next sequence send")?;
    if packet_id.sequence < next_sequence_send
        && !state
            .has_packet_commitment(&packet_id.port_id, &packet_id.channel_id, packet_id.sequence)
            .await
            .internal("failed to read packet commitment")?
    {
        return Err(FeeError::PacketAlreadyCleared {
            packet_id: packet_id.clone(),
        });
    }

    let total = packet_fee.fee.total().ok_or(InvalidFee::Overflow)?;
    let escrow_account = state
        .get_escrow_account()
        .await
        .internal("failed to read escrow account")?;
    if packet_fee.refund_address == escrow_account {
        return Err(FeeError::EscrowAccountAsRecipient {
            address: escrow_account,
        });
    }
    state
        .transfer(&packet_fee.refund_address, &escrow_account, &total)
        .await
        .map_err(|err| match err {
            TransferError::InsufficientFunds {
                address,
                denom,
                available,
                required,
            } => FeeError::InsufficientFunds {
                address: address.to_string(),
                denom,
                available,
                required,
            },
            TransferError::Storage(source) => {
                FeeError::internal("failed to move fee into escrow", source)
            }
        })?;

    let mut packet_fees = state
        .get_packet_fees(packet_id)
        .await
        .internal("failed to read packet fees")?;
    let index = packet_fees.len();
    packet_fees.push(packet_fee);
    let identified = IdentifiedPacketFees {
        packet_id: packet_id.clone(),
        packet_fees,
    };
    state
        .put_packet_fees(packet_id, &identified.packet_fees)
        .internal("failed to write packet fees")?;
    state.record(events::incentivized_packet(&identified).ok_or(InvalidFee::Overflow)?);

    info!(%total, index, "locked packet fee in escrow");
    Ok(FeeHandle {
        packet_id: packet_id.clone(),
        index,
    })
}

/// Returns every entry's remaining fee to its payer and removes the entries.
///
/// # Errors
/// Returns [`FeeError::PacketNotFound`] if no fee is escrowed for the packet.
#[instrument(skip_all, fields(%packet_id), err(level = Level::WARN))]
pub(crate) async fn refund_all<S: StateWrite>(
    mut state: S,
    packet_id: &PacketId,
) -> Result<Coins, FeeError> {
    let packet_fees = get_existing_packet_fees(&state, packet_id).await?;
    let escrow_account = state
        .get_escrow_account()
        .await
        .internal("failed to read escrow account")?;

    let mut refunded = Coins::empty();
    for packet_fee in &packet_fees {
        let amount = packet_fee.fee.total().ok_or(InvalidFee::Overflow)?;
        refund(
            &mut state,
            &escrow_account,
            packet_id,
            &packet_fee.refund_address,
            &amount,
        )
        .await?;
        refunded = refunded.checked_add(&amount).ok_or(InvalidFee::Overflow)?;
    }
    state.delete_packet_fees(packet_id);
    Ok(refunded)
}

/// Pays the receive fee of every entry to the forward relayer's payee, refunding it to
/// the payer if the relayer is unknown or not eligible. A payee that resolves to the
/// escrow account is treated like an unknown relayer. The entries stay in the ledger
/// with a zeroed receive fee.
///
/// # Errors
/// Returns [`FeeError::PacketNotFound`] if no fee is escrowed for the packet.
#[instrument(
    skip_all,
    fields(%packet_id, forward_relayer = forward_relayer.map(tracing::field::display)),
    err(level = Level::WARN)
)]
pub(crate) async fn distribute_recv<S: StateWrite>(
    mut state: S,
    packet_id: &PacketId,
    forward_relayer: Option<&Address>,
) -> Result<(), FeeError> {
    let mut packet_fees = get_existing_packet_fees(&state, packet_id).await?;
    let escrow_account = state
        .get_escrow_account()
        .await
        .internal("failed to read escrow account")?;
    let mut payee = None;
    if let Some(relayer) = forward_relayer {
        let resolved = state
            .resolve_payee(&packet_id.channel_id, relayer)
            .await
            .internal("failed to resolve forward relayer payee")?;
        if resolved == escrow_account {
            warn!(%relayer, "forward relayer payee is the escrow account; refunding receive fees");
        } else {
            payee = Some(resolved);
        }
    }
    let forward_relayer = forward_relayer.filter(|_| payee.is_some());

    for packet_fee in &mut packet_fees {
        let split = recv_split(packet_fee, forward_relayer);
        if let Some(payee) = &payee {
            pay(
                &mut state,
                &escrow_account,
                packet_id,
                FeeComponent::Recv,
                payee,
                &split.to_relayer,
            )
            .await?;
        }
        refund(
            &mut state,
            &escrow_account,
            packet_id,
            &packet_fee.refund_address,
            &split.to_payer,
        )
        .await?;
        packet_fee.fee.recv_fee = Coins::empty();
    }
    state
        .put_packet_fees(packet_id, &packet_fees)
        .internal("failed to write packet fees")?;
    Ok(())
}

/// Pays the component earned by `outcome` to the relayer's payee, refunds everything
/// else to the payers and removes the entries. A payee that resolves to the escrow
/// account earns nothing and the component is refunded instead.
///
/// # Errors
/// Returns [`FeeError::PacketNotFound`] if no fee is escrowed for the packet.
#[instrument(skip_all, fields(%packet_id, %relayer, ?outcome), err(level = Level::WARN))]
pub(crate) async fn distribute_ack_or_timeout<S: StateWrite>(
    mut state: S,
    packet_id: &PacketId,
    relayer: &Address,
    outcome: Outcome,
) -> Result<(), FeeError> {
    let packet_fees = get_existing_packet_fees(&state, packet_id).await?;
    let escrow_account = state
        .get_escrow_account()
        .await
        .internal("failed to read escrow account")?;
    let payee = state
        .resolve_payee(&packet_id.channel_id, relayer)
        .await
        .internal("failed to resolve relayer payee")?;
    let payee_is_escrow = payee == escrow_account;
    if payee_is_escrow {
        warn!(%relayer, "relayer payee is the escrow account; refunding earned fees");
    }

    for packet_fee in &packet_fees {
        let mut split =
            terminal_split(packet_fee, relayer, outcome).ok_or(InvalidFee::Overflow)?;
        if payee_is_escrow {
            split.to_payer = split
                .to_payer
                .checked_add(&split.to_relayer)
                .ok_or(InvalidFee::Overflow)?;
            split.to_relayer = Coins::empty();
        }
        pay(
            &mut state,
            &escrow_account,
            packet_id,
            outcome.paid_component(),
            &payee,
            &split.to_relayer,
        )
        .await?;
        refund(
            &mut state,
            &escrow_account,
            packet_id,
            &packet_fee.refund_address,
            &split.to_payer,
        )
        .await?;
    }
    state.delete_packet_fees(packet_id);
    Ok(())
}

/// Refunds every packet still incentivized on a closing channel.
///
/// # Errors
/// Returns an error if a refund fails.
#[instrument(skip_all, fields(%port_id, %channel_id), err(level = Level::WARN))]
pub(crate) async fn refund_fees_on_channel_closure<S: StateWrite>(
    mut state: S,
    port_id: &PortId,
    channel_id: &ChannelId,
) -> Result<(), FeeError> {
    let identified = state
        .get_identified_packet_fees_on_channel(port_id, channel_id)
        .await
        .internal("failed to read packet fees on channel")?;
    for IdentifiedPacketFees {
        packet_id, ..
    } in identified
    {
        let refunded = refund_all(&mut state, &packet_id).await?;
        debug!(%packet_id, %refunded, "refunded packet fees on channel closure");
    }
    Ok(())
}

/// Verifies that, per denomination, the escrow account holds exactly what the ledger
/// accounts for.
///
/// # Errors
/// Returns [`FeeError::EscrowInvariantViolated`] on the first mismatching denomination.
#[instrument(skip_all, err(level = Level::ERROR))]
pub async fn check_escrow_invariant<S: StateRead>(state: &S) -> Result<(), FeeError> {
    let mut ledger = Coins::empty();
    for identified in state
        .get_all_identified_packet_fees()
        .await
        .internal("failed to read packet fees")?
    {
        for packet_fee in &identified.packet_fees {
            let total = packet_fee.fee.total().ok_or(InvalidFee::Overflow)?;
            ledger = ledger.checked_add(&total).ok_or(InvalidFee::Overflow)?;
        }
    }
    let escrow_account = state
        .get_escrow_account()
        .await
        .internal("failed to read escrow account")?;
    let escrowed = state
        .get_account_balances(&escrow_account)
        .await
        .internal("failed to read escrow account balances")?;

    for denom in ledger.iter().chain(escrowed.iter()).map(|coin| &coin.denom) {
        let escrowed_amount = escrowed.amount_of(denom);
        let ledger_amount = ledger.amount_of(denom);
        if escrowed_amount != ledger_amount {
            return Err(FeeError::EscrowInvariantViolated {
                denom: denom.clone(),
                escrowed: escrowed_amount,
                ledger: ledger_amount,
            });
        }
    }
    Ok(())
}

async fn get_existing_packet_fees<S: StateRead>(
    state: &S,
    packet_id: &PacketId,
) -> Result<Vec<PacketFee>, FeeError> {
    let packet_fees = state
        .get_packet_fees(packet_id)
        .await
        .internal("failed to read packet fees")?;
    if packet_fees.is_empty() {
        return Err(FeeError::PacketNotFound {
            packet_id: packet_id.clone(),
        });
    }
    Ok(packet_fees)
}

async fn pay<S: StateWrite>(
    state: &mut S,
    escrow_account: &Address,
    packet_id: &PacketId,
    component: FeeComponent,
    recipient: &Address,
    amount: &Coins,
) -> Result<(), FeeError> {
    if amount.is_empty() {
        return Ok(());
    }
    release(state, escrow_account, recipient, amount).await?;
    state.record(events::distribute(packet_id, component, recipient, amount));
    debug!(%recipient, %amount, %component, "paid packet fee");
    Ok(())
}

async fn refund<S: StateWrite>(
    state: &mut S,
    escrow_account: &Address,
    packet_id: &PacketId,
    refund_address: &Address,
    amount: &Coins,
) -> Result<(), FeeError> {
    if amount.is_empty() {
        return Ok(());
    }
    release(state, escrow_account, refund_address, amount).await?;
    state.record(events::refund(packet_id, refund_address, amount));
    debug!(%refund_address, %amount, "refunded packet fee");
    Ok(())
}

async fn release<S: StateWrite>(
    state: &mut S,
    escrow_account: &Address,
    recipient: &Address,
    amount: &Coins,
) -> Result<(), FeeError> {
    state
        .transfer(escrow_account, recipient, amount)
        .await
        .map_err(|err| match err {
            TransferError::InsufficientFunds {
                denom,
                available,
                required,
                ..
            } => {
                error!(
                    %denom,
                    available,
                    required,
                    "escrow account cannot cover a release; the escrow ledger is corrupted"
                );
                FeeError::EscrowUnderflow {
                    denom,
                    available,
                    required,
                }
            }
            TransferError::Storage(source) => {
                FeeError::internal("failed to release escrowed funds", source)
            }
        })
}
