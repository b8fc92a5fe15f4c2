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
    ForwardRelayer(ForwardRelayer),
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::middleware) struct ForwardRelayer(String);

impl From<&Address> for ForwardRelayer {
    fn from(address: &Address) -> Self {
        ForwardRelayer(address.to_string())
    }
}

impl TryFrom<ForwardRelayer> for Address {
    type Error = eyre::Report;

    fn try_from(relayer: ForwardRelayer) -> Result<Self, Self::Error> {
        relayer
            .0
            .parse()
            .wrap_err("stored forward relayer is not a valid address")
    }
}

impl From<ForwardRelayer> for crate::storage::StoredValue {
    fn from(relayer: ForwardRelayer) -> Self {
        crate::storage::StoredValue::Middleware(Value(ValueImpl::ForwardRelayer(relayer)))
    }
}

impl TryFrom<crate::storage::StoredValue> for ForwardRelayer {
    type Error = eyre::Report;

    fn try_from(value: crate::storage::StoredValue) -> Result<Self, Self::Error> {
        let crate::storage::StoredValue::Middleware(Value(ValueImpl::ForwardRelayer(relayer))) =
            value
        else {
            bail!(
                "middleware stored value type mismatch: expected forward relayer, found {value:?}"
            );
        };
        Ok(relayer)
    }
}
