use cnidarium::{
    StateRead,
    StateWrite,
};
use tracing::{
    instrument,
    Level,
};

use super::{
    ensure_fee_enabled_channel,
    ensure_not_escrow_account,
    PayPacketFee,
    PayPacketFeeAsync,
};
use crate::{
    address::Address,
    channel::StateReadExt as _,
    error::{
        FeeError,
        InternalContext as _,
    },
    escrow::{
        ledger,
        FeeHandle,
    },
    fee::PacketFee,
    packet::PacketId,
};

fn parse_relayers(relayers: Vec<String>) -> Result<Vec<Address>, FeeError> {
    relayers
        .into_iter()
        .map(|relayer| Address::try_from(relayer).map_err(FeeError::from))
        .collect()
}

#[derive(Debug)]
pub struct CheckedPayPacketFee {
    action: PayPacketFee,
    packet_fee: PacketFee,
}

impl CheckedPayPacketFee {
    #[instrument(skip_all, err(level = Level::DEBUG))]
    pub(super) async fn new<S: StateRead>(
        action: PayPacketFee,
        state: S,
    ) -> Result<Self, FeeError> {
        let refund_address = Address::try_from(action.signer.clone())?;
        let relayers = parse_relayers(action.relayers.clone())?;
        let fee = action.fee.clone().try_into_fee()?;

        let checked_action = Self {
            action,
            packet_fee: PacketFee::new(fee, refund_address, relayers),
        };
        checked_action.run_mutable_checks(state).await?;

        Ok(checked_action)
    }

    #[instrument(skip_all, err(level = Level::DEBUG))]
    pub(super) async fn run_mutable_checks<S: StateRead>(&self, state: S) -> Result<(), FeeError> {
        ensure_fee_enabled_channel(
            &state,
            &self.action.source_port_id,
            &self.action.source_channel_id,
        )
        .await?;
        ensure_not_escrow_account(&state, &self.packet_fee.refund_address).await
    }

    /// Escrows the fee for the packet that will be sent next on the channel.
    #[instrument(skip_all, err(level = Level::DEBUG))]
    pub(super) async fn execute<S: StateWrite>(&self, mut state: S) -> Result<FeeHandle, FeeError> {
        self.run_mutable_checks(&state).await?;

        let sequence = state
            .get_next_sequence_send(&self.action.source_port_id, &self.action.source_channel_id)
            .await
            .internal("failed to read next sequence send")?;
        let packet_id = PacketId::new(
            self.action.source_port_id.clone(),
            self.action.source_channel_id.clone(),
            sequence,
        );
        ledger::lock_fee(&mut state, &packet_id, self.packet_fee.clone()).await
    }

    pub fn action(&self) -> &PayPacketFee {
        &self.action
    }
}

#[derive(Debug)]
pub struct CheckedPayPacketFeeAsync {
    action: PayPacketFeeAsync,
    packet_id: PacketId,
    packet_fee: PacketFee,
}

impl CheckedPayPacketFeeAsync {
    #[instrument(skip_all, err(level = Level::DEBUG))]
    pub(super) async fn new<S: StateRead>(
        action: PayPacketFeeAsync,
        state: S,
    ) -> Result<Self, FeeError> {
        let refund_address = Address::try_from(action.refund_address.clone())?;
        let relayers = parse_relayers(action.relayers.clone())?;
        let fee = action.fee.clone().try_into_fee()?;
        let packet_id = PacketId::new(
            action.port_id.clone(),
            action.channel_id.clone(),
            action.sequence,
        );

        let checked_action = Self {
            action,
            packet_id,
            packet_fee: PacketFee::new(fee, refund_address, relayers),
        };
        checked_action.run_mutable_checks(state).await?;

        Ok(checked_action)
    }

    #[instrument(skip_all, fields(packet_id = %self.packet_id), err(level = Level::DEBUG))]
    pub(super) async fn run_mutable_checks<S: StateRead>(&self, state: S) -> Result<(), FeeError> {
        let PacketId {
            port_id,
            channel_id,
            sequence,
        } = &self.packet_id;
        ensure_fee_enabled_channel(&state, port_id, channel_id).await?;
        ensure_not_escrow_account(&state, &self.packet_fee.refund_address).await?;

        let next_sequence_send = state
            .get_next_sequence_send(port_id, channel_id)
            .await
            .internal("failed to read next sequence send")?;
        if *sequence >= next_sequence_send {
            return Err(FeeError::PacketNotSent {
                packet_id: self.packet_id.clone(),
                next_sequence_send,
            });
        }
        if !state
            .has_packet_commitment(port_id, channel_id, *sequence)
            .await
            .internal("failed to read packet commitment")?
        {
            return Err(FeeError::PacketAlreadyCleared {
                packet_id: self.packet_id.clone(),
            });
        }
        Ok(())
    }

    #[instrument(skip_all, fields(packet_id = %self.packet_id), err(level = Level::DEBUG))]
    pub(super) async fn execute<S: StateWrite>(&self, mut state: S) -> Result<FeeHandle, FeeError> {
        self.run_mutable_checks(&state).await?;
        ledger::lock_fee(&mut state, &self.packet_id, self.packet_fee.clone()).await
    }

    pub fn action(&self) -> &PayPacketFeeAsync {
        &self.action
    }
}

#[cfg(test)]
mod tests {
    use ibc_types::core::channel::ChannelId;

    use super::*;
    use crate::{
        actions::RawFee,
        coin::Coin,
        escrow::StateReadExt as _,
        test_utils::{
            address,
            assert_error_contains,
            assert_escrow_invariant,
            port_id,
            Fixture,
            ESCROW_ACCOUNT,
        },
    };

    fn raw_fee() -> RawFee {
        RawFee {
            recv_fee: vec![Coin::new(100, "nria")],
            ack_fee: vec![Coin::new(50, "nria")],
            timeout_fee: vec![Coin::new(50, "nria")],
        }
    }

    fn pay_packet_fee(channel_id: ChannelId) -> PayPacketFee {
        PayPacketFee {
            signer: "payer".to_string(),
            source_port_id: port_id(),
            source_channel_id: channel_id,
            fee: raw_fee(),
            relayers: vec![],
        }
    }

    fn pay_packet_fee_async(sequence: u64) -> PayPacketFeeAsync {
        PayPacketFeeAsync {
            port_id: port_id(),
            channel_id: Fixture::fee_channel(),
            sequence,
            fee: raw_fee(),
            refund_address: "payer".to_string(),
            relayers: vec!["relayer".to_string()],
        }
    }

    #[tokio::test]
    async fn pay_packet_fee_escrows_for_next_sequence() {
        let mut fixture = Fixture::new().await;
        fixture.send_packet().await;
        let next_packet_id = fixture.next_packet_id().await;

        let checked_action =
            CheckedPayPacketFee::new(pay_packet_fee(Fixture::fee_channel()), fixture.state())
                .await
                .unwrap();
        let handle = checked_action.execute(fixture.state_mut()).await.unwrap();

        assert_eq!(handle.packet_id, next_packet_id);
        assert_eq!(handle.index, 0);
        assert_eq!(fixture.balance("payer").await, 800);
        let packet_fees = fixture.state().get_packet_fees(&next_packet_id).await.unwrap();
        assert_eq!(packet_fees.len(), 1);
        assert_eq!(packet_fees[0].refund_address, address("payer"));
        assert_escrow_invariant(fixture.state()).await;
    }

    #[tokio::test]
    async fn pay_packet_fee_with_invalid_signer_is_rejected() {
        let fixture = Fixture::new().await;
        let action = PayPacketFee {
            signer: String::new(),
            ..pay_packet_fee(Fixture::fee_channel())
        };

        let err = CheckedPayPacketFee::new(action, fixture.state())
            .await
            .unwrap_err();
        assert!(matches!(err, FeeError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn pay_packet_fee_with_invalid_relayer_is_rejected() {
        let fixture = Fixture::new().await;
        let action = PayPacketFee {
            relayers: vec!["not an address".to_string()],
            ..pay_packet_fee(Fixture::fee_channel())
        };

        let err = CheckedPayPacketFee::new(action, fixture.state())
            .await
            .unwrap_err();
        assert!(matches!(err, FeeError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn pay_packet_fee_on_unknown_channel_is_rejected() {
        let fixture = Fixture::new().await;

        let err = CheckedPayPacketFee::new(pay_packet_fee(ChannelId::new(7)), fixture.state())
            .await
            .unwrap_err();
        assert_error_contains(&err, "ChannelNotFound");
    }

    #[tokio::test]
    async fn pay_packet_fee_on_channel_without_fees_is_rejected() {
        let fixture = Fixture::new().await;

        let err =
            CheckedPayPacketFee::new(pay_packet_fee(Fixture::plain_channel()), fixture.state())
                .await
                .unwrap_err();
        assert_error_contains(&err, "NoExistingFeeEnabledChannel");
    }

    #[tokio::test]
    async fn pay_packet_fee_with_insufficient_funds_leaves_balance_untouched() {
        let mut fixture = Fixture::new().await;
        fixture.set_balances("payer", "150nria");

        let checked_action =
            CheckedPayPacketFee::new(pay_packet_fee(Fixture::fee_channel()), fixture.state())
                .await
                .unwrap();
        let err = checked_action.execute(fixture.state_mut()).await.unwrap_err();

        assert!(matches!(
            err,
            FeeError::InsufficientFunds {
                available: 150,
                required: 200,
                ..
            }
        ));
        assert_eq!(fixture.balance("payer").await, 150);
        assert_escrow_invariant(fixture.state()).await;
    }

    #[tokio::test]
    async fn escrow_account_cannot_pay_packet_fees() {
        let mut fixture = Fixture::new().await;
        let packet_id = fixture.send_packet().await;
        fixture.set_balances(ESCROW_ACCOUNT, "1000nria");

        let action = PayPacketFee {
            signer: ESCROW_ACCOUNT.to_string(),
            ..pay_packet_fee(Fixture::fee_channel())
        };
        let err = CheckedPayPacketFee::new(action, fixture.state())
            .await
            .unwrap_err();
        assert!(matches!(err, FeeError::EscrowAccountAsRecipient { .. }));

        let action = PayPacketFeeAsync {
            refund_address: ESCROW_ACCOUNT.to_string(),
            ..pay_packet_fee_async(packet_id.sequence)
        };
        let err = CheckedPayPacketFeeAsync::new(action, fixture.state())
            .await
            .unwrap_err();
        assert!(matches!(err, FeeError::EscrowAccountAsRecipient { .. }));
        assert!(fixture
            .state()
            .get_packet_fees(&packet_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn pay_packet_fee_async_escrows_for_sent_packet() {
        let mut fixture = Fixture::new().await;
        let packet_id = fixture.send_packet().await;

        let checked_action =
            CheckedPayPacketFeeAsync::new(pay_packet_fee_async(packet_id.sequence), fixture.state())
                .await
                .unwrap();
        let handle = checked_action.execute(fixture.state_mut()).await.unwrap();

        assert_eq!(handle.packet_id, packet_id);
        let packet_fees = fixture.state().get_packet_fees(&packet_id).await.unwrap();
        assert_eq!(packet_fees[0].relayers, vec![address("relayer")]);
        assert_escrow_invariant(fixture.state()).await;
    }

    #[tokio::test]
    async fn pay_packet_fee_async_for_unsent_packet_is_rejected() {
        let fixture = Fixture::new().await;
        let next_packet_id = fixture.next_packet_id().await;

        let err = CheckedPayPacketFeeAsync::new(
            pay_packet_fee_async(next_packet_id.sequence),
            fixture.state(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            FeeError::PacketNotSent {
                next_sequence_send: 1,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn pay_packet_fee_async_for_cleared_packet_is_rejected() {
        let mut fixture = Fixture::new().await;
        let packet_id = fixture.send_packet().await;
        fixture.clear_packet(&packet_id);

        let err =
            CheckedPayPacketFeeAsync::new(pay_packet_fee_async(packet_id.sequence), fixture.state())
                .await
                .unwrap_err();
        assert!(matches!(err, FeeError::PacketAlreadyCleared { .. }));
    }

    #[tokio::test]
    async fn execute_reruns_mutable_checks() {
        let mut fixture = Fixture::new().await;
        let packet_id = fixture.send_packet().await;

        let checked_action =
            CheckedPayPacketFeeAsync::new(pay_packet_fee_async(packet_id.sequence), fixture.state())
                .await
                .unwrap();
        // the packet is acknowledged between check and execution
        fixture.clear_packet(&packet_id);

        let err = checked_action.execute(fixture.state_mut()).await.unwrap_err();
        assert!(matches!(err, FeeError::PacketAlreadyCleared { .. }));
        assert_eq!(fixture.balance("payer").await, 1_000);
    }
}
