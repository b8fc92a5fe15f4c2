//! Who receives which part of an escrowed fee.
//!
//! These functions only decide; moving funds is left to the escrow ledger. Each payer's
//! relayer restriction governs that payer's fee alone: an ineligible relayer forfeits the
//! component to the payer, and other payers' fees for the same packet are unaffected.
//!
//! The forward relayer passed to [`recv_split`] is the address carried in the
//! acknowledgement. When the relayer registered a counterparty payee that address is the
//! payee, so restriction lists must name the payee to admit such a relayer for the
//! receive fee.

use crate::{
    address::Address,
    coin::Coins,
    fee::{
        FeeComponent,
        PacketFee,
    },
};

/// How a packet's lifecycle ended on the sending chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Acknowledged,
    TimedOut,
}

impl Outcome {
    /// The component earned by the relayer that submitted the terminating message.
    #[must_use]
    pub fn paid_component(self) -> FeeComponent {
        match self {
            Outcome::Acknowledged => FeeComponent::Ack,
            Outcome::TimedOut => FeeComponent::Timeout,
        }
    }

    /// The component that can no longer be earned and goes back to the payer.
    #[must_use]
    pub fn refunded_component(self) -> FeeComponent {
        match self {
            Outcome::Acknowledged => FeeComponent::Timeout,
            Outcome::TimedOut => FeeComponent::Ack,
        }
    }
}

/// One payer's fee split between a relayer and the payer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Split {
    pub to_relayer: Coins,
    pub to_payer: Coins,
}

/// Splits the receive fee given the relayer that delivered the packet, if known.
#[must_use]
pub fn recv_split(packet_fee: &PacketFee, forward_relayer: Option<&Address>) -> Split {
    let recv_fee = packet_fee.fee.recv_fee.clone();
    match forward_relayer {
        Some(relayer) if packet_fee.is_eligible(relayer) => Split {
            to_relayer: recv_fee,
            to_payer: Coins::empty(),
        },
        _ => Split {
            to_relayer: Coins::empty(),
            to_payer: recv_fee,
        },
    }
}

/// Splits whatever is left of a fee once the packet's lifecycle ended.
///
/// Any receive fee still held is refunded alongside the component that was not earned.
/// Returns `None` if the refund overflows, which a validated fee never does.
#[must_use]
pub fn terminal_split(
    packet_fee: &PacketFee,
    relayer: &Address,
    outcome: Outcome,
) -> Option<Split> {
    let fee = &packet_fee.fee;
    let paid = fee.component(outcome.paid_component());
    let refund = fee
        .component(outcome.refunded_component())
        .checked_add(&fee.recv_fee)?;
    if packet_fee.is_eligible(relayer) {
        Some(Split {
            to_relayer: paid.clone(),
            to_payer: refund,
        })
    } else {
        Some(Split {
            to_relayer: Coins::empty(),
            to_payer: refund.checked_add(paid)?,
        })
    }
}
