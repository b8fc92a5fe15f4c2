use std::fmt::Debug;

use async_trait::async_trait;
use cnidarium::{
    Snapshot,
    StateDelta,
    StateRead,
    StateWrite,
    TempStorage,
};
use eyre::{
    ensure,
    WrapErr as _,
};
use ibc_types::core::channel::{
    ChannelId,
    PortId,
};
use serde::{
    Deserialize,
    Serialize,
};
use tendermint::abci::Event;

use crate::{
    accounts::{
        StateReadExt as _,
        StateWriteExt as _,
    },
    address::Address,
    channel::{
        StateReadExt as _,
        StateWriteExt as _,
    },
    coin::Coins,
    escrow::{
        check_escrow_invariant,
        ledger,
        FeeHandle,
        StateWriteExt as _,
    },
    fee::{
        Fee,
        PacketFee,
    },
    ibc_module::IbcModule,
    middleware::StateWriteExt as _,
    packet::{
        Acknowledgement,
        Packet,
        PacketId,
    },
    payee::StateWriteExt as _,
};

pub(crate) const ESCROW_ACCOUNT: &str = "fee-escrow";
pub(crate) const ICS20_VERSION: &str = "ics20-1";
pub(crate) const SUCCESS_ACK: &[u8] = br#"{"result":"AQ=="}"#;
pub(crate) const ERROR_ACK: &[u8] = br#"{"error":"invalid packet data"}"#;

const FUNDED_ACCOUNTS: [&str; 2] = ["payer", "other-payer"];
const INITIAL_BALANCE: u128 = 1_000;

pub(crate) fn address(s: &str) -> Address {
    s.parse().unwrap()
}

pub(crate) fn coins(s: &str) -> Coins {
    s.parse().unwrap()
}

pub(crate) fn fee(recv: &str, ack: &str, timeout: &str) -> Fee {
    Fee::new(coins(recv), coins(ack), coins(timeout))
}

pub(crate) fn port_id() -> PortId {
    "transfer".parse().unwrap()
}

#[track_caller]
pub(crate) fn assert_error_contains<T: Debug>(error: &T, expected: &'_ str) {
    let msg = format!("{error:?}");
    assert!(
        msg.contains(expected),
        "error contained different message\n\texpected: {expected}\n\tfull_error: {msg}",
    );
}

pub(crate) async fn assert_escrow_invariant<S: StateRead>(state: &S) {
    if let Err(error) = check_escrow_invariant(state).await {
        panic!("escrow invariant violated: {error}");
    }
}

/// A chain with the transfer port's `channel-0` open and fee enabled, `channel-1` open
/// without fees, and [`FUNDED_ACCOUNTS`] holding `1000nria,1000uatom` each.
///
/// The same state plays both ends of a channel: packets built by
/// [`Fixture::transfer_packet`] leave and arrive on the same channel id.
pub(crate) struct Fixture {
    _storage: TempStorage,
    state: StateDelta<Snapshot>,
}

impl Fixture {
    pub(crate) async fn new() -> Self {
        let storage = TempStorage::new().await.unwrap();
        let snapshot = storage.latest_snapshot();
        let mut state = StateDelta::new(snapshot);

        state.put_escrow_account(&address(ESCROW_ACCOUNT)).unwrap();
        state.put_channel(&port_id(), &Self::fee_channel()).unwrap();
        state.put_fee_enabled(&port_id(), &Self::fee_channel()).unwrap();
        state.put_channel(&port_id(), &Self::plain_channel()).unwrap();
        for account in FUNDED_ACCOUNTS {
            state
                .put_account_balance(&address(account), "nria", INITIAL_BALANCE)
                .unwrap();
            state
                .put_account_balance(&address(account), "uatom", INITIAL_BALANCE)
                .unwrap();
        }

        Self {
            _storage: storage,
            state,
        }
    }

    pub(crate) fn fee_channel() -> ChannelId {
        ChannelId::new(0)
    }

    pub(crate) fn plain_channel() -> ChannelId {
        ChannelId::new(1)
    }

    pub(crate) fn state(&self) -> &StateDelta<Snapshot> {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut StateDelta<Snapshot> {
        &mut self.state
    }

    pub(crate) fn into_events(self) -> Vec<Event> {
        let (_, mut cache) = self.state.flatten();
        cache.take_events()
    }

    /// The id the next packet sent on the fee-enabled channel will have.
    pub(crate) async fn next_packet_id(&self) -> PacketId {
        self.next_packet_id_on(&Self::fee_channel()).await
    }

    pub(crate) async fn next_packet_id_on(&self, channel_id: &ChannelId) -> PacketId {
        let sequence = self
            .state
            .get_next_sequence_send(&port_id(), channel_id)
            .await
            .unwrap();
        PacketId::new(port_id(), channel_id.clone(), sequence)
    }

    /// Sends a packet on the fee-enabled channel the way the channel layer does: stores a
    /// commitment and advances the send sequence.
    pub(crate) async fn send_packet(&mut self) -> PacketId {
        self.send_packet_on(&Self::fee_channel()).await
    }

    pub(crate) async fn send_packet_on(&mut self, channel_id: &ChannelId) -> PacketId {
        let packet_id = self.next_packet_id_on(channel_id).await;
        self.state
            .put_packet_commitment(&port_id(), channel_id, packet_id.sequence)
            .unwrap();
        self.state
            .put_next_sequence_send(&port_id(), channel_id, packet_id.sequence + 1)
            .unwrap();
        packet_id
    }

    /// Removes the commitment of a sent packet as an acknowledgement or timeout does.
    pub(crate) fn clear_packet(&mut self, packet_id: &PacketId) {
        self.state.delete_packet_commitment(
            &packet_id.port_id,
            &packet_id.channel_id,
            packet_id.sequence,
        );
    }

    pub(crate) async fn lock(
        &mut self,
        packet_id: &PacketId,
        payer: &str,
        fee: Fee,
        relayers: &[&str],
    ) -> FeeHandle {
        ledger::lock_fee(
            &mut self.state,
            packet_id,
            PacketFee::new(
                fee,
                address(payer),
                relayers.iter().map(|relayer| address(relayer)).collect(),
            ),
        )
        .await
        .unwrap()
    }

    pub(crate) fn register_payee(&mut self, relayer: &str, payee: &str) {
        self.state
            .put_payee(&Self::fee_channel(), &address(relayer), &address(payee))
            .unwrap();
    }

    pub(crate) fn register_counterparty_payee(&mut self, relayer: &str, counterparty_payee: &str) {
        self.state
            .put_counterparty_payee(
                &Self::fee_channel(),
                &address(relayer),
                &address(counterparty_payee),
            )
            .unwrap();
    }

    /// Overwrites the balances of `account` with `balances`.
    pub(crate) fn set_balances(&mut self, account: &str, balances: &str) {
        for coin in &coins(balances) {
            self.state
                .put_account_balance(&address(account), &coin.denom, coin.amount)
                .unwrap();
        }
    }

    /// The `nria` balance of `account`.
    pub(crate) async fn balance(&self, account: &str) -> u128 {
        self.state
            .get_account_balance(&address(account), "nria")
            .await
            .unwrap()
    }

    pub(crate) async fn escrow_balance(&self) -> Coins {
        self.state
            .get_account_balances(&address(ESCROW_ACCOUNT))
            .await
            .unwrap()
    }

    /// A transfer of `10nria` from `sender` to `receiver` with the given id.
    pub(crate) fn transfer_packet(packet_id: &PacketId) -> Packet {
        Packet {
            sequence: packet_id.sequence,
            source_port: packet_id.port_id.clone(),
            source_channel: packet_id.channel_id.clone(),
            destination_port: packet_id.port_id.clone(),
            destination_channel: packet_id.channel_id.clone(),
            data: serde_json::to_vec(&TransferPacketData {
                denom: "nria".to_string(),
                amount: "10".to_string(),
                sender: "sender".to_string(),
                receiver: "receiver".to_string(),
            })
            .unwrap(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct TransferPacketData {
    denom: String,
    amount: String,
    sender: String,
    receiver: String,
}

/// A token transfer application reduced to what the fee middleware observes: it
/// credits the receiver of a delivered packet and refunds the sender when the packet
/// fails or times out.
#[derive(Clone, Debug, Default)]
pub(crate) struct MockTransferApp {
    /// Return no acknowledgement from the receive callback.
    pub(crate) async_acks: bool,
}

impl MockTransferApp {
    async fn refund_sender<S: StateWrite>(mut state: S, packet: &Packet) -> eyre::Result<()> {
        let data: TransferPacketData =
            serde_json::from_slice(&packet.data).wrap_err("invalid packet data")?;
        state
            .increase_balance(
                &data.sender.parse()?,
                &data.denom,
                data.amount.parse()?,
            )
            .await
    }
}

#[async_trait]
impl IbcModule for MockTransferApp {
    type Error = eyre::Report;

    async fn on_chan_open_init<S: StateWrite>(
        &self,
        _: S,
        _: &PortId,
        _: &ChannelId,
        version: &str,
    ) -> eyre::Result<String> {
        ensure!(
            version.is_empty() || version == ICS20_VERSION,
            "unsupported transfer version `{version}`"
        );
        Ok(ICS20_VERSION.to_string())
    }

    async fn on_chan_open_try<S: StateWrite>(
        &self,
        _: S,
        _: &PortId,
        _: &ChannelId,
        counterparty_version: &str,
    ) -> eyre::Result<String> {
        ensure!(
            counterparty_version == ICS20_VERSION,
            "unsupported transfer version `{counterparty_version}`"
        );
        Ok(ICS20_VERSION.to_string())
    }

    async fn on_chan_open_ack<S: StateWrite>(
        &self,
        _: S,
        _: &PortId,
        _: &ChannelId,
        counterparty_version: &str,
    ) -> eyre::Result<()> {
        ensure!(
            counterparty_version == ICS20_VERSION,
            "unsupported transfer version `{counterparty_version}`"
        );
        Ok(())
    }

    async fn on_chan_open_confirm<S: StateWrite>(
        &self,
        _: S,
        _: &PortId,
        _: &ChannelId,
    ) -> eyre::Result<()> {
        Ok(())
    }

    async fn on_chan_close_init<S: StateWrite>(
        &self,
        _: S,
        _: &PortId,
        _: &ChannelId,
    ) -> eyre::Result<()> {
        Ok(())
    }

    async fn on_chan_close_confirm<S: StateWrite>(
        &self,
        _: S,
        _: &PortId,
        _: &ChannelId,
    ) -> eyre::Result<()> {
        Ok(())
    }

    async fn on_recv_packet<S: StateWrite>(
        &self,
        mut state: S,
        packet: &Packet,
        _: &Address,
    ) -> eyre::Result<Option<Acknowledgement>> {
        let Ok(data) = serde_json::from_slice::<TransferPacketData>(&packet.data) else {
            return Ok(Some(Acknowledgement::new(ERROR_ACK.to_vec(), false)));
        };
        state
            .increase_balance(&data.receiver.parse()?, &data.denom, data.amount.parse()?)
            .await?;
        if self.async_acks {
            return Ok(None);
        }
        Ok(Some(Acknowledgement::new(SUCCESS_ACK.to_vec(), true)))
    }

    async fn on_acknowledgement_packet<S: StateWrite>(
        &self,
        state: S,
        packet: &Packet,
        acknowledgement: &[u8],
        _: &Address,
    ) -> eyre::Result<()> {
        if acknowledgement == SUCCESS_ACK {
            return Ok(());
        }
        Self::refund_sender(state, packet).await
    }

    async fn on_timeout_packet<S: StateWrite>(
        &self,
        state: S,
        packet: &Packet,
        _: &Address,
    ) -> eyre::Result<()> {
        Self::refund_sender(state, packet).await
    }
}
