use ibc_types::core::channel::ChannelId;
use tendermint::abci::{
    Event,
    EventAttributeIndexExt as _,
};

use crate::{
    address::Address,
    coin::Coins,
    fee::{
        FeeComponent,
        IdentifiedPacketFees,
    },
    packet::PacketId,
};

/// Creates an `abci::Event` of kind `fee.incentivized_packet` carrying the totals
/// escrowed for a packet after a fee was locked.
///
/// Returns `None` if a total overflows.
pub(crate) fn incentivized_packet(identified: &IdentifiedPacketFees) -> Option<Event> {
    let recv_fee = identified.total(FeeComponent::Recv)?;
    let ack_fee = identified.total(FeeComponent::Ack)?;
    let timeout_fee = identified.total(FeeComponent::Timeout)?;
    let packet_id = &identified.packet_id;
    Some(Event::new(
        "fee.incentivized_packet",
        [
            ("port_id", packet_id.port_id.to_string()).index(),
            ("channel_id", packet_id.channel_id.to_string()).index(),
            ("packet_sequence", packet_id.sequence.to_string()).index(),
            ("recv_fee", recv_fee.to_string()).index(),
            ("ack_fee", ack_fee.to_string()).index(),
            ("timeout_fee", timeout_fee.to_string()).index(),
        ],
    ))
}

pub(crate) fn distribute(
    packet_id: &PacketId,
    component: FeeComponent,
    recipient: &Address,
    amount: &Coins,
) -> Event {
    Event::new(
        "fee.distribute",
        [
            ("port_id", packet_id.port_id.to_string()).index(),
            ("channel_id", packet_id.channel_id.to_string()).index(),
            ("packet_sequence", packet_id.sequence.to_string()).index(),
            ("fee_component", component.to_string()).index(),
            ("receiver", recipient.to_string()).index(),
            ("fee", amount.to_string()).index(),
        ],
    )
}

pub(crate) fn refund(packet_id: &PacketId, refund_address: &Address, amount: &Coins) -> Event {
    Event::new(
        "fee.refund",
        [
            ("port_id", packet_id.port_id.to_string()).index(),
            ("channel_id", packet_id.channel_id.to_string()).index(),
            ("packet_sequence", packet_id.sequence.to_string()).index(),
            ("receiver", refund_address.to_string()).index(),
            ("fee", amount.to_string()).index(),
        ],
    )
}

pub(crate) fn register_payee(channel_id: &ChannelId, relayer: &Address, payee: &Address) -> Event {
    Event::new(
        "fee.register_payee",
        [
            ("channel_id", channel_id.to_string()).index(),
            ("relayer", relayer.to_string()).index(),
            ("payee", payee.to_string()).index(),
        ],
    )
}

pub(crate) fn register_counterparty_payee(
    channel_id: &ChannelId,
    relayer: &Address,
    counterparty_payee: &Address,
) -> Event {
    Event::new(
        "fee.register_counterparty_payee",
        [
            ("channel_id", channel_id.to_string()).index(),
            ("relayer", relayer.to_string()).index(),
            ("counterparty_payee", counterparty_payee.to_string()).index(),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fee::{
        Fee,
        PacketFee,
    };

    fn attributes(event: &Event) -> Vec<(String, String)> {
        event
            .attributes
            .iter()
            .map(|attribute| {
                (
                    String::from_utf8_lossy(attribute.key_bytes()).into_owned(),
                    String::from_utf8_lossy(attribute.value_bytes()).into_owned(),
                )
            })
            .collect()
    }

    #[test]
    fn incentivized_packet_event_carries_totals_over_all_payers() {
        let packet_fee = PacketFee::new(
            Fee::new(
                "100nria".parse().unwrap(),
                "50nria".parse().unwrap(),
                "50nria".parse().unwrap(),
            ),
            "payer".parse().unwrap(),
            vec![],
        );
        let identified = IdentifiedPacketFees {
            packet_id: PacketId::new("transfer".parse().unwrap(), ChannelId::new(0), 1),
            packet_fees: vec![packet_fee.clone(), packet_fee],
        };
        let event = incentivized_packet(&identified).unwrap();
        assert_eq!(event.kind, "fee.incentivized_packet");
        assert_eq!(
            attributes(&event),
            [
                ("port_id", "transfer"),
                ("channel_id", "channel-0"),
                ("packet_sequence", "1"),
                ("recv_fee", "200nria"),
                ("ack_fee", "100nria"),
                ("timeout_fee", "100nria"),
            ]
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .to_vec()
        );
    }
}
