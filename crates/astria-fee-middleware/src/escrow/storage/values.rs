use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use eyre::{
    bail,
    Result,
    WrapErr as _,
};

use crate::{
    address::Address,
    coin::{
        Coin,
        Coins,
    },
    fee::{
        Fee,
        PacketFee,
    },
};

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(crate) struct Value(ValueImpl);

#[derive(Debug, BorshSerialize, BorshDeserialize)]
enum ValueImpl {
    EscrowAccount(EscrowAccount),
    PacketFees(PacketFees),
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::escrow) struct EscrowAccount(String);

impl From<&Address> for EscrowAccount {
    fn from(address: &Address) -> Self {
        EscrowAccount(address.to_string())
    }
}

impl TryFrom<EscrowAccount> for Address {
    type Error = eyre::Report;

    fn try_from(account: EscrowAccount) -> Result<Self> {
        account.0.parse().wrap_err("stored escrow account is not a valid address")
    }
}

impl From<EscrowAccount> for crate::storage::StoredValue {
    fn from(account: EscrowAccount) -> Self {
        crate::storage::StoredValue::Escrow(Value(ValueImpl::EscrowAccount(account)))
    }
}

impl TryFrom<crate::storage::StoredValue> for EscrowAccount {
    type Error = eyre::Report;

    fn try_from(value: crate::storage::StoredValue) -> Result<Self> {
        let crate::storage::StoredValue::Escrow(Value(ValueImpl::EscrowAccount(account))) = value
        else {
            bail!("escrow stored value type mismatch: expected escrow account, found {value:?}");
        };
        Ok(account)
    }
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
struct StoredCoin {
    denom: String,
    amount: u128,
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
struct StoredPacketFee {
    recv_fee: Vec<StoredCoin>,
    ack_fee: Vec<StoredCoin>,
    timeout_fee: Vec<StoredCoin>,
    refund_address: String,
    relayers: Vec<String>,
}

/// The ordered list of fees escrowed for one packet.
#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::escrow) struct PacketFees(Vec<StoredPacketFee>);

fn to_stored_coins(coins: &Coins) -> Vec<StoredCoin> {
    coins
        .iter()
        .map(|coin| StoredCoin {
            denom: coin.denom.clone(),
            amount: coin.amount,
        })
        .collect()
}

fn from_stored_coins(coins: Vec<StoredCoin>) -> Result<Coins> {
    Coins::try_from_coins(
        coins
            .into_iter()
            .map(|coin| Coin::new(coin.amount, coin.denom)),
    )
    .wrap_err("stored fee contains invalid coins")
}

impl From<&[PacketFee]> for PacketFees {
    fn from(packet_fees: &[PacketFee]) -> Self {
        PacketFees(
            packet_fees
                .iter()
                .map(|packet_fee| StoredPacketFee {
                    recv_fee: to_stored_coins(&packet_fee.fee.recv_fee),
                    ack_fee: to_stored_coins(&packet_fee.fee.ack_fee),
                    timeout_fee: to_stored_coins(&packet_fee.fee.timeout_fee),
                    refund_address: packet_fee.refund_address.to_string(),
                    relayers: packet_fee.relayers.iter().map(ToString::to_string).collect(),
                })
                .collect(),
        )
    }
}

impl TryFrom<PacketFees> for Vec<PacketFee> {
    type Error = eyre::Report;

    fn try_from(packet_fees: PacketFees) -> Result<Self> {
        packet_fees
            .0
            .into_iter()
            .map(|stored| {
                let fee = Fee::new(
                    from_stored_coins(stored.recv_fee)?,
                    from_stored_coins(stored.ack_fee)?,
                    from_stored_coins(stored.timeout_fee)?,
                );
                let refund_address = stored
                    .refund_address
                    .parse()
                    .wrap_err("stored refund address is invalid")?;
                let relayers = stored
                    .relayers
                    .into_iter()
                    .map(|relayer| relayer.parse::<Address>())
                    .collect::<Result<Vec<_>, _>>()
                    .wrap_err("stored relayer restriction is invalid")?;
                Ok(PacketFee::new(fee, refund_address, relayers))
            })
            .collect()
    }
}

impl From<PacketFees> for crate::storage::StoredValue {
    fn from(packet_fees: PacketFees) -> Self {
        crate::storage::StoredValue::Escrow(Value(ValueImpl::PacketFees(packet_fees)))
    }
}

impl TryFrom<crate::storage::StoredValue> for PacketFees {
    type Error = eyre::Report;

    fn try_from(value: crate::storage::StoredValue) -> Result<Self> {
        let crate::storage::StoredValue::Escrow(Value(ValueImpl::PacketFees(packet_fees))) = value
        else {
            bail!("escrow stored value type mismatch: expected packet fees, found {value:?}");
        };
        Ok(packet_fees)
    }
}
