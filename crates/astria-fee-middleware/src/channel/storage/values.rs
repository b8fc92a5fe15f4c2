use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use eyre::bail;

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(crate) struct Value(ValueImpl);

#[derive(Debug, BorshSerialize, BorshDeserialize)]
enum ValueImpl {
    Sequence(Sequence),
}

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(in crate::channel) struct Sequence(u64);

impl From<u64> for Sequence {
    fn from(sequence: u64) -> Self {
        Sequence(sequence)
    }
}

impl From<Sequence> for u64 {
    fn from(sequence: Sequence) -> Self {
        sequence.0
    }
}

impl From<Sequence> for crate::storage::StoredValue {
    fn from(sequence: Sequence) -> Self {
        crate::storage::StoredValue::Channel(Value(ValueImpl::Sequence(sequence)))
    }
}

impl TryFrom<crate::storage::StoredValue> for Sequence {
    type Error = eyre::Error;

    fn try_from(value: crate::storage::StoredValue) -> Result<Self, Self::Error> {
        let crate::storage::StoredValue::Channel(Value(ValueImpl::Sequence(sequence))) = value
        else {
            bail!("channel stored value type mismatch: expected sequence, found {value:?}");
        };
        Ok(sequence)
    }
}
