use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use eyre::{
    bail,
    WrapErr as _,
};

use crate::address::Address;

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(crate) struct Value(ValueImpl);

#[derive(Debug, BorshSerialize, BorshDeserialize)]
enum ValueImpl {
    PayeeAddress(PayeeAddress),
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::payee) struct PayeeAddress(String);

impl From<&Address> for PayeeAddress {
    fn from(address: &Address) -> Self {
        PayeeAddress(address.to_string())
    }
}

impl TryFrom<PayeeAddress> for Address {
    type Error = eyre::Report;

    fn try_from(payee: PayeeAddress) -> Result<Self, Self::Error> {
        payee.0.parse().wrap_err("stored payee is not a valid address")
    }
}

impl From<PayeeAddress> for crate::storage::StoredValue {
    fn from(payee: PayeeAddress) -> Self {
        crate::storage::StoredValue::Payee(Value(ValueImpl::PayeeAddress(payee)))
    }
}

impl TryFrom<crate::storage::StoredValue> for PayeeAddress {
    type Error = eyre::Report;

    fn try_from(value: crate::storage::StoredValue) -> Result<Self, Self::Error> {
        let crate::storage::StoredValue::Payee(Value(ValueImpl::PayeeAddress(payee))) = value
        else {
            bail!("payee stored value type mismatch: expected payee address, found {value:?}");
        };
        Ok(payee)
    }
}
