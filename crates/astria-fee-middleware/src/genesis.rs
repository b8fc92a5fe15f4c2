//! Import and export of the fee middleware's state at chain genesis.
//!
//! Account balances are not part of this state: the escrow account must already hold
//! the funds backing the imported packet fees when [`init_chain`] runs.

use cnidarium::{
    StateRead,
    StateWrite,
};
use eyre::{
    eyre,
    Result,
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
use tracing::{
    info,
    instrument,
};

use crate::{
    address::Address,
    coin::Coins,
    escrow::{
        check_escrow_invariant,
        StateReadExt as _,
        StateWriteExt as _,
    },
    fee::{
        Fee,
        PacketFee,
    },
    middleware::{
        StateReadExt as _,
        StateWriteExt as _,
    },
    packet::PacketId,
    payee::{
        StateReadExt as _,
        StateWriteExt as _,
    },
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisState {
    #[serde(default)]
    pub fee_enabled_channels: Vec<GenesisChannel>,
    #[serde(default)]
    pub registered_payees: Vec<GenesisPayee>,
    #[serde(default)]
    pub registered_counterparty_payees: Vec<GenesisPayee>,
    #[serde(default)]
    pub identified_fees: Vec<GenesisPacketFees>,
    #[serde(default)]
    pub forward_relayers: Vec<GenesisForwardRelayer>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisChannel {
    pub port_id: String,
    pub channel_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisPayee {
    pub channel_id: String,
    pub relayer: String,
    pub payee: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisPacketId {
    pub port_id: String,
    pub channel_id: String,
    pub sequence: u64,
}

/// Fee components are written as coin lists, e.g. `"10nria,5uatom"`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisPacketFee {
    pub recv_fee: String,
    pub ack_fee: String,
    pub timeout_fee: String,
    pub refund_address: String,
    #[serde(default)]
    pub relayers: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisPacketFees {
    pub packet_id: GenesisPacketId,
    pub packet_fees: Vec<GenesisPacketFee>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisForwardRelayer {
    pub packet_id: GenesisPacketId,
    pub address: String,
}

fn parse_port_id(port_id: &str) -> Result<PortId> {
    port_id
        .parse()
        .map_err(|err| eyre!("invalid port id `{port_id}`: {err}"))
}

fn parse_channel_id(channel_id: &str) -> Result<ChannelId> {
    channel_id
        .parse()
        .map_err(|err| eyre!("invalid channel id `{channel_id}`: {err}"))
}

fn parse_address(address: &str) -> Result<Address> {
    address
        .parse()
        .wrap_err_with(|| format!("invalid address `{address}`"))
}

fn parse_recipient(address: &str, escrow_account: &Address) -> Result<Address> {
    let address = parse_address(address)?;
    if &address == escrow_account {
        return Err(eyre!("escrow account `{address}` cannot receive packet fees"));
    }
    Ok(address)
}

fn parse_coins(coins: &str) -> Result<Coins> {
    coins
        .parse()
        .wrap_err_with(|| format!("invalid coins `{coins}`"))
}

impl GenesisPacketId {
    fn to_packet_id(&self) -> Result<PacketId> {
        Ok(PacketId::new(
            parse_port_id(&self.port_id)?,
            parse_channel_id(&self.channel_id)?,
            self.sequence,
        ))
    }

    fn from_packet_id(packet_id: &PacketId) -> Self {
        Self {
            port_id: packet_id.port_id.to_string(),
            channel_id: packet_id.channel_id.to_string(),
            sequence: packet_id.sequence,
        }
    }
}

impl GenesisPacketFee {
    fn to_packet_fee(&self) -> Result<PacketFee> {
        let fee = Fee::new(
            parse_coins(&self.recv_fee)?,
            parse_coins(&self.ack_fee)?,
            parse_coins(&self.timeout_fee)?,
        );
        fee.validate().wrap_err("invalid fee")?;
        let relayers = self
            .relayers
            .iter()
            .map(|relayer| parse_address(relayer))
            .collect::<Result<_>>()?;
        Ok(PacketFee::new(
            fee,
            parse_address(&self.refund_address)?,
            relayers,
        ))
    }

    fn from_packet_fee(packet_fee: &PacketFee) -> Self {
        Self {
            recv_fee: packet_fee.fee.recv_fee.to_string(),
            ack_fee: packet_fee.fee.ack_fee.to_string(),
            timeout_fee: packet_fee.fee.timeout_fee.to_string(),
            refund_address: packet_fee.refund_address.to_string(),
            relayers: packet_fee
                .relayers
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Writes `genesis` and the escrow account into state.
///
/// # Errors
/// Returns an error if an entry is malformed or if the escrow account does not hold
/// exactly the imported packet fees.
#[instrument(skip_all, fields(%escrow_account), err)]
pub async fn init_chain<S: StateWrite>(
    mut state: S,
    escrow_account: &Address,
    genesis: &GenesisState,
) -> Result<()> {
    state
        .put_escrow_account(escrow_account)
        .wrap_err("failed to write escrow account")?;

    for channel in &genesis.fee_enabled_channels {
        state
            .put_fee_enabled(
                &parse_port_id(&channel.port_id)?,
                &parse_channel_id(&channel.channel_id)?,
            )
            .wrap_err("failed to write fee enabled channel")?;
    }

    for registration in &genesis.registered_payees {
        state
            .put_payee(
                &parse_channel_id(&registration.channel_id)?,
                &parse_address(&registration.relayer)?,
                &parse_recipient(&registration.payee, escrow_account)?,
            )
            .wrap_err("failed to write payee")?;
    }

    for registration in &genesis.registered_counterparty_payees {
        state
            .put_counterparty_payee(
                &parse_channel_id(&registration.channel_id)?,
                &parse_address(&registration.relayer)?,
                &parse_recipient(&registration.payee, escrow_account)?,
            )
            .wrap_err("failed to write counterparty payee")?;
    }

    for identified in &genesis.identified_fees {
        let packet_id = identified.packet_id.to_packet_id()?;
        let packet_fees = identified
            .packet_fees
            .iter()
            .map(GenesisPacketFee::to_packet_fee)
            .collect::<Result<Vec<_>>>()
            .wrap_err_with(|| format!("invalid packet fees for packet `{packet_id}`"))?;
        if packet_fees
            .iter()
            .any(|packet_fee| &packet_fee.refund_address == escrow_account)
        {
            return Err(eyre!(
                "packet `{packet_id}` names the escrow account `{escrow_account}` as refund address"
            ));
        }
        state
            .put_packet_fees(&packet_id, &packet_fees)
            .wrap_err("failed to write packet fees")?;
    }

    for forward_relayer in &genesis.forward_relayers {
        state
            .put_forward_relayer(
                &forward_relayer.packet_id.to_packet_id()?,
                &parse_address(&forward_relayer.address)?,
            )
            .wrap_err("failed to write forward relayer")?;
    }

    check_escrow_invariant(&state)
        .await
        .wrap_err("imported packet fees are not backed by the escrow account")?;

    info!(
        fee_enabled_channels = genesis.fee_enabled_channels.len(),
        incentivized_packets = genesis.identified_fees.len(),
        "initialized fee middleware state"
    );
    Ok(())
}

/// Reads the fee middleware's state back into a [`GenesisState`].
///
/// # Errors
/// Returns an error if state cannot be read.
#[instrument(skip_all, err)]
pub async fn export_genesis<S: StateRead>(state: &S) -> Result<GenesisState> {
    let fee_enabled_channels = state
        .get_fee_enabled_channels()
        .await
        .wrap_err("failed to read fee enabled channels")?
        .into_iter()
        .map(|(port_id, channel_id)| GenesisChannel {
            port_id: port_id.to_string(),
            channel_id: channel_id.to_string(),
        })
        .collect();

    let to_genesis_payee = |registration: crate::payee::RegisteredPayee| GenesisPayee {
        channel_id: registration.channel_id.to_string(),
        relayer: registration.relayer.to_string(),
        payee: registration.payee.to_string(),
    };
    let registered_payees = state
        .get_all_payees()
        .await
        .wrap_err("failed to read payees")?
        .into_iter()
        .map(to_genesis_payee)
        .collect();
    let registered_counterparty_payees = state
        .get_all_counterparty_payees()
        .await
        .wrap_err("failed to read counterparty payees")?
        .into_iter()
        .map(to_genesis_payee)
        .collect();

    let identified_fees = state
        .get_all_identified_packet_fees()
        .await
        .wrap_err("failed to read packet fees")?
        .iter()
        .map(|identified| GenesisPacketFees {
            packet_id: GenesisPacketId::from_packet_id(&identified.packet_id),
            packet_fees: identified
                .packet_fees
                .iter()
                .map(GenesisPacketFee::from_packet_fee)
                .collect(),
        })
        .collect();

    let forward_relayers = state
        .get_all_forward_relayers()
        .await
        .wrap_err("failed to read forward relayers")?
        .into_iter()
        .map(|forward_relayer| GenesisForwardRelayer {
            packet_id: GenesisPacketId::from_packet_id(&forward_relayer.packet_id),
            address: forward_relayer.address.to_string(),
        })
        .collect();

    Ok(GenesisState {
        fee_enabled_channels,
        registered_payees,
        registered_counterparty_payees,
        identified_fees,
        forward_relayers,
    })
}

#[cfg(test)]
mod tests {
    use cnidarium::{
        StateDelta,
        TempStorage,
    };

    use super::*;
    use crate::{
        accounts::StateWriteExt as _,
        test_utils::{
            address,
            assert_error_contains,
            ESCROW_ACCOUNT,
        },
    };

    const GENESIS: &str = r#"{
        "fee_enabled_channels": [{"port_id": "transfer", "channel_id": "channel-0"}],
        "registered_payees": [
            {"channel_id": "channel-0", "relayer": "relayer", "payee": "payee"}
        ],
        "registered_counterparty_payees": [
            {"channel_id": "channel-0", "relayer": "relayer", "payee": "cosmos1payee"}
        ],
        "identified_fees": [{
            "packet_id": {"port_id": "transfer", "channel_id": "channel-0", "sequence": 3},
            "packet_fees": [{
                "recv_fee": "10nria",
                "ack_fee": "5nria",
                "timeout_fee": "5nria,1uatom",
                "refund_address": "payer",
                "relayers": ["relayer"]
            }]
        }],
        "forward_relayers": [{
            "packet_id": {"port_id": "transfer", "channel_id": "channel-0", "sequence": 2},
            "address": "relayer"
        }]
    }"#;

    fn genesis() -> GenesisState {
        serde_json::from_str(GENESIS).unwrap()
    }

    #[tokio::test]
    async fn init_chain_then_export_genesis_reproduces_state() {
        let storage = TempStorage::new().await.unwrap();
        let mut state = StateDelta::new(storage.latest_snapshot());
        state
            .put_account_balance(&address(ESCROW_ACCOUNT), "nria", 20)
            .unwrap();
        state
            .put_account_balance(&address(ESCROW_ACCOUNT), "uatom", 1)
            .unwrap();

        init_chain(&mut state, &address(ESCROW_ACCOUNT), &genesis())
            .await
            .unwrap();

        assert_eq!(export_genesis(&state).await.unwrap(), genesis());
        assert_eq!(
            state.get_escrow_account().await.unwrap(),
            address(ESCROW_ACCOUNT)
        );
    }

    #[tokio::test]
    async fn init_chain_rejects_unbacked_packet_fees() {
        let storage = TempStorage::new().await.unwrap();
        let mut state = StateDelta::new(storage.latest_snapshot());

        let err = init_chain(&mut state, &address(ESCROW_ACCOUNT), &genesis())
            .await
            .unwrap_err();
        assert_error_contains(&err, "not backed by the escrow account");
    }

    #[tokio::test]
    async fn init_chain_rejects_malformed_payee() {
        let storage = TempStorage::new().await.unwrap();
        let mut state = StateDelta::new(storage.latest_snapshot());
        let genesis = GenesisState {
            registered_payees: vec![GenesisPayee {
                channel_id: "channel-0".to_string(),
                relayer: "relayer".to_string(),
                payee: "not a payee".to_string(),
            }],
            ..GenesisState::default()
        };

        let err = init_chain(&mut state, &address(ESCROW_ACCOUNT), &genesis)
            .await
            .unwrap_err();
        assert_error_contains(&err, "invalid address `not a payee`");
    }

    #[tokio::test]
    async fn init_chain_rejects_escrow_account_as_payee() {
        let storage = TempStorage::new().await.unwrap();
        let mut state = StateDelta::new(storage.latest_snapshot());
        let genesis = GenesisState {
            registered_counterparty_payees: vec![GenesisPayee {
                channel_id: "channel-0".to_string(),
                relayer: "relayer".to_string(),
                payee: ESCROW_ACCOUNT.to_string(),
            }],
            ..GenesisState::default()
        };

        let err = init_chain(&mut state, &address(ESCROW_ACCOUNT), &genesis)
            .await
            .unwrap_err();
        assert_error_contains(&err, "escrow account `fee-escrow` cannot receive packet fees");
    }

    #[test]
    fn unknown_genesis_fields_are_rejected() {
        serde_json::from_str::<GenesisState>(r#"{"escrow_balance": "10nria"}"#).unwrap_err();
    }

    #[test]
    fn empty_genesis_is_valid() {
        assert_eq!(
            serde_json::from_str::<GenesisState>("{}").unwrap(),
            GenesisState::default()
        );
    }
}
