use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use eyre::bail;

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(crate) struct Value(ValueImpl);

#[derive(Debug, BorshSerialize, BorshDeserialize)]
enum ValueImpl {
    Balance(Balance),
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::accounts) struct Balance(u128);

impl From<u128> for Balance {
    fn from(balance: u128) -> Self {
        Balance(balance)
    }
}

impl From<Balance> for u128 {
    fn from(balance: Balance) -> Self {
        balance.0
    }
}

impl From<Balance> for crate::storage::StoredValue {
    fn from(balance: Balance) -> Self {
        crate::storage::StoredValue::Accounts(Value(ValueImpl::Balance(balance)))
    }
}

impl TryFrom<crate::storage::StoredValue> for Balance {
    type Error = eyre::Error;

    fn try_from(value: crate::storage::StoredValue) -> Result<Self, Self::Error> {
        let crate::storage::StoredValue::Accounts(Value(ValueImpl::Balance(balance))) = value
        else {
            bail!("accounts stored value type mismatch: expected balance, found {value:?}");
        };
        Ok(balance)
    }
}
