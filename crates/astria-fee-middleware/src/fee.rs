use std::fmt::{
    self,
    Display,
    Formatter,
};

use crate::{
    address::Address,
    coin::Coins,
    packet::PacketId,
};

/// The fee components a packet can resolve to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FeeComponent {
    Recv,
    Ack,
    Timeout,
}

impl Display for FeeComponent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FeeComponent::Recv => "recv",
            FeeComponent::Ack => "ack",
            FeeComponent::Timeout => "timeout",
        })
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InvalidFee {
    #[error("fee contains no amounts in any of its components")]
    Empty,
    #[error("fee total overflows")]
    Overflow,
}

/// The payment escrowed for the three relaying actions of a packet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fee {
    pub recv_fee: Coins,
    pub ack_fee: Coins,
    pub timeout_fee: Coins,
}

impl Fee {
    #[must_use]
    pub fn new(recv_fee: Coins, ack_fee: Coins, timeout_fee: Coins) -> Self {
        Self {
            recv_fee,
            ack_fee,
            timeout_fee,
        }
    }

    /// Every component is a canonical [`Coins`] so amounts are already positive and
    /// denominations valid; a fee is rejected only if it escrows nothing at all, or if the
    /// total cannot be represented.
    ///
    /// # Errors
    /// Returns an error if the fee is empty or its total overflows.
    pub fn validate(&self) -> Result<(), InvalidFee> {
        if self.recv_fee.is_empty() && self.ack_fee.is_empty() && self.timeout_fee.is_empty() {
            return Err(InvalidFee::Empty);
        }
        self.total().ok_or(InvalidFee::Overflow)?;
        Ok(())
    }

    /// The amount that must be escrowed to back this fee.
    #[must_use]
    pub fn total(&self) -> Option<Coins> {
        self.recv_fee
            .checked_add(&self.ack_fee)?
            .checked_add(&self.timeout_fee)
    }

    #[must_use]
    pub fn component(&self, component: FeeComponent) -> &Coins {
        match component {
            FeeComponent::Recv => &self.recv_fee,
            FeeComponent::Ack => &self.ack_fee,
            FeeComponent::Timeout => &self.timeout_fee,
        }
    }
}

/// One payer's fee for a packet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PacketFee {
    pub fee: Fee,
    /// The payer, to whom unused components are refunded.
    pub refund_address: Address,
    /// If non-empty, only these relayers are eligible for this fee.
    pub relayers: Vec<Address>,
}

impl PacketFee {
    #[must_use]
    pub fn new(fee: Fee, refund_address: Address, relayers: Vec<Address>) -> Self {
        Self {
            fee,
            refund_address,
            relayers,
        }
    }

    /// Returns whether `relayer` may claim components of this fee.
    #[must_use]
    pub fn is_eligible(&self, relayer: &Address) -> bool {
        self.relayers.is_empty() || self.relayers.contains(relayer)
    }
}

/// All fees escrowed for one packet, in the order they were paid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentifiedPacketFees {
    pub packet_id: PacketId,
    pub packet_fees: Vec<PacketFee>,
}

impl IdentifiedPacketFees {
    /// Sums one component over every payer's fee.
    #[must_use]
    pub fn total(&self, component: FeeComponent) -> Option<Coins> {
        self.packet_fees
            .iter()
            .try_fold(Coins::empty(), |acc, packet_fee| {
                acc.checked_add(packet_fee.fee.component(component))
            })
    }
}
