use ibc_types::core::channel::{
    ChannelId,
    PortId,
};

use crate::{
    address::{
        Address,
        AddressError,
    },
    coin::CoinError,
    fee::InvalidFee,
    packet::PacketId,
};

/// Errors returned by the fee middleware and its message handlers.
///
/// Apart from the internal-consistency class (see [`FeeError::is_fatal`]) every error is
/// raised before any state was changed, and the enclosing message leaves state untouched.
#[derive(Debug, thiserror::Error)]
pub enum FeeError {
    #[error("invalid address")]
    InvalidAddress(#[from] AddressError),

    #[error("invalid coins")]
    InvalidCoins(#[from] CoinError),

    #[error("invalid fee")]
    InvalidFee(#[from] InvalidFee),

    #[error("invalid fee version: expected `{expected}`, found `{found}`")]
    InvalidVersion { expected: &'static str, found: String },

    #[error("failed to decode counterparty fee version metadata `{version}`")]
    UndecodableCounterpartyVersion { version: String },

    #[error("failed to decode incentivized acknowledgement")]
    InvalidAcknowledgement(#[source] serde_json::Error),

    #[error(
        "insufficient {denom} balance in account {address} to escrow {required}, available \
         {available}"
    )]
    InsufficientFunds {
        address: String,
        denom: String,
        available: u128,
        required: u128,
    },

    #[error("escrow account `{address}` cannot receive or refund packet fees")]
    EscrowAccountAsRecipient { address: Address },

    #[error("channel {port_id}/{channel_id} not found")]
    ChannelNotFound { port_id: PortId, channel_id: ChannelId },

    #[error("fee incentivization is not enabled on channel {port_id}/{channel_id}")]
    NoExistingFeeEnabledChannel { port_id: PortId, channel_id: ChannelId },

    #[error("packet {packet_id} has already been acknowledged or timed out")]
    PacketAlreadyCleared { packet_id: PacketId },

    #[error("packet {packet_id} has not been sent yet, next sequence send is {next_sequence_send}")]
    PacketNotSent {
        packet_id: PacketId,
        next_sequence_send: u64,
    },

    #[error("no fees escrowed for packet {packet_id}")]
    PacketNotFound { packet_id: PacketId },

    #[error("no forward relayer recorded for packet {packet_id}")]
    ForwardRelayerNotFound { packet_id: PacketId },

    #[error(
        "escrow account holds {available}{denom} but {required}{denom} were to be released; \
         the escrow ledger is corrupted"
    )]
    EscrowUnderflow {
        denom: String,
        available: u128,
        required: u128,
    },

    #[error(
        "escrow account holds {escrowed}{denom} but the ledger accounts for {ledger}{denom}"
    )]
    EscrowInvariantViolated {
        denom: String,
        escrowed: u128,
        ledger: u128,
    },

    #[error("wrapped application failed")]
    App(#[source] eyre::Report),

    #[error("internal error: {context}")]
    Internal {
        context: String,
        #[source]
        source: eyre::Report,
    },
}

impl FeeError {
    pub(crate) fn internal(context: &str, source: eyre::Report) -> Self {
        Self::Internal {
            context: context.to_string(),
            source,
        }
    }

    /// Returns whether the error signals a broken escrow ledger rather than misuse.
    ///
    /// Fatal errors must never occur given correct bookkeeping.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::EscrowUnderflow { .. } | Self::EscrowInvariantViolated { .. }
        )
    }
}

/// Wraps storage failures into [`FeeError::Internal`] with context.
pub(crate) trait InternalContext<T> {
    fn internal(self, context: &str) -> Result<T, FeeError>;
}

impl<T> InternalContext<T> for eyre::Result<T> {
    fn internal(self, context: &str) -> Result<T, FeeError> {
        self.map_err(|source| FeeError::internal(context, source))
    }
}
