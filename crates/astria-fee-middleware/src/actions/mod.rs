//! The messages the fee middleware consumes.
//!
//! Each message is turned into a checked action: construction runs the stateless checks
//! once and the stateful checks against the current state, execution re-runs the
//! stateful checks before mutating. [`deliver`] applies a message atomically.

mod pay_packet_fee;
mod register_payee;

use cnidarium::{
    StateDelta,
    StateRead,
    StateWrite,
};
use ibc_types::core::channel::{
    ChannelId,
    PortId,
};
pub use pay_packet_fee::{
    CheckedPayPacketFee,
    CheckedPayPacketFeeAsync,
};
pub use register_payee::{
    CheckedRegisterCounterpartyPayee,
    CheckedRegisterPayee,
};
use tracing::{
    instrument,
    Level,
};

use crate::{
    address::Address,
    channel::StateReadExt as _,
    coin::{
        Coin,
        Coins,
    },
    error::{
        FeeError,
        InternalContext as _,
    },
    escrow::StateReadExt as _,
    fee::Fee,
    middleware::StateReadExt as _,
    utils::apply_with_events,
};

/// A fee as submitted, before its coins are validated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawFee {
    pub recv_fee: Vec<Coin>,
    pub ack_fee: Vec<Coin>,
    pub timeout_fee: Vec<Coin>,
}

impl RawFee {
    fn try_into_fee(self) -> Result<Fee, FeeError> {
        let fee = Fee::new(
            Coins::try_from_coins(self.recv_fee)?,
            Coins::try_from_coins(self.ack_fee)?,
            Coins::try_from_coins(self.timeout_fee)?,
        );
        fee.validate()?;
        Ok(fee)
    }
}

/// Escrows a fee for the next packet sent on a channel, paid by `signer`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayPacketFee {
    pub signer: String,
    pub source_port_id: PortId,
    pub source_channel_id: ChannelId,
    pub fee: RawFee,
    pub relayers: Vec<String>,
}

/// Escrows a fee for a packet that was already sent, paid by `refund_address`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PayPacketFeeAsync {
    pub port_id: PortId,
    pub channel_id: ChannelId,
    pub sequence: u64,
    pub fee: RawFee,
    pub refund_address: String,
    pub relayers: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterPayee {
    pub port_id: PortId,
    pub channel_id: ChannelId,
    pub relayer: String,
    pub payee: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterCounterpartyPayee {
    pub port_id: PortId,
    pub channel_id: ChannelId,
    pub relayer: String,
    pub counterparty_payee: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeeAction {
    PayPacketFee(PayPacketFee),
    PayPacketFeeAsync(PayPacketFeeAsync),
    RegisterPayee(RegisterPayee),
    RegisterCounterpartyPayee(RegisterCounterpartyPayee),
}

#[derive(Debug)]
pub enum CheckedFeeAction {
    PayPacketFee(CheckedPayPacketFee),
    PayPacketFeeAsync(CheckedPayPacketFeeAsync),
    RegisterPayee(CheckedRegisterPayee),
    RegisterCounterpartyPayee(CheckedRegisterCounterpartyPayee),
}

impl CheckedFeeAction {
    /// # Errors
    /// Returns an error if the action fails its stateless or stateful checks.
    pub async fn new<S: StateRead>(action: FeeAction, state: S) -> Result<Self, FeeError> {
        Ok(match action {
            FeeAction::PayPacketFee(action) => {
                Self::PayPacketFee(CheckedPayPacketFee::new(action, state).await?)
            }
            FeeAction::PayPacketFeeAsync(action) => {
                Self::PayPacketFeeAsync(CheckedPayPacketFeeAsync::new(action, state).await?)
            }
            FeeAction::RegisterPayee(action) => {
                Self::RegisterPayee(CheckedRegisterPayee::new(action, state).await?)
            }
            FeeAction::RegisterCounterpartyPayee(action) => Self::RegisterCounterpartyPayee(
                CheckedRegisterCounterpartyPayee::new(action, state).await?,
            ),
        })
    }

    /// # Errors
    /// Returns an error if the stateful checks no longer pass or execution fails.
    pub async fn execute<S: StateWrite>(&self, state: S) -> Result<(), FeeError> {
        match self {
            Self::PayPacketFee(checked_action) => checked_action.execute(state).await.map(drop),
            Self::PayPacketFeeAsync(checked_action) => {
                checked_action.execute(state).await.map(drop)
            }
            Self::RegisterPayee(checked_action) => checked_action.execute(state).await,
            Self::RegisterCounterpartyPayee(checked_action) => checked_action.execute(state).await,
        }
    }
}

/// Checks and executes `action`, leaving `state` untouched unless it succeeds.
///
/// # Errors
/// Returns an error if the action is rejected or fails to execute.
#[instrument(skip_all, err(level = Level::WARN))]
pub async fn deliver<S: StateWrite>(mut state: S, action: FeeAction) -> Result<(), FeeError> {
    let mut delta = StateDelta::new(&mut state);
    let checked_action = CheckedFeeAction::new(action, &delta).await?;
    checked_action.execute(&mut delta).await?;
    apply_with_events(delta);
    Ok(())
}

/// Ensures the channel exists and has negotiated fee incentivization.
async fn ensure_fee_enabled_channel<S: StateRead>(
    state: &S,
    port_id: &PortId,
    channel_id: &ChannelId,
) -> Result<(), FeeError> {
    if !state
        .channel_exists(port_id, channel_id)
        .await
        .internal("failed to read channel")?
    {
        return Err(FeeError::ChannelNotFound {
            port_id: port_id.clone(),
            channel_id: channel_id.clone(),
        });
    }
    if !state
        .is_fee_enabled(port_id, channel_id)
        .await
        .internal("failed to read fee enabled flag")?
    {
        return Err(FeeError::NoExistingFeeEnabledChannel {
            port_id: port_id.clone(),
            channel_id: channel_id.clone(),
        });
    }
    Ok(())
}

/// Ensures `address` is not the escrow account, which may neither earn nor be refunded
/// packet fees.
async fn ensure_not_escrow_account<S: StateRead>(
    state: &S,
    address: &Address,
) -> Result<(), FeeError> {
    let escrow_account = state
        .get_escrow_account()
        .await
        .internal("failed to read escrow account")?;
    if *address == escrow_account {
        return Err(FeeError::EscrowAccountAsRecipient {
            address: escrow_account,
        });
    }
    Ok(())
}
