use borsh::{
    BorshDeserialize,
    BorshSerialize,
};
use eyre::{
    Result,
    WrapErr as _,
};

#[derive(Debug, BorshSerialize, BorshDeserialize)]
pub(crate) enum StoredValue {
    Unit,
    Accounts(crate::accounts::storage::Value),
    Channel(crate::channel::storage::Value),
    Escrow(crate::escrow::storage::Value),
    Payee(crate::payee::storage::Value),
    Middleware(crate::middleware::storage::Value),
}

impl StoredValue {
    pub(crate) fn serialize(&self) -> Result<Vec<u8>> {
        borsh::to_vec(&self).wrap_err("failed to serialize stored value")
    }

    pub(crate) fn deserialize(bytes: &[u8]) -> Result<Self> {
        borsh::from_slice(bytes).wrap_err("failed to deserialize stored value")
    }
}

#[cfg(test)]
mod tests {
    use super::StoredValue;

    #[test]
    fn unit_roundtrips() {
        let bytes = StoredValue::Unit.serialize().unwrap();
        assert!(matches!(
            StoredValue::deserialize(&bytes).unwrap(),
            StoredValue::Unit
        ));
    }

    #[test]
    fn garbage_fails_to_deserialize() {
        StoredValue::deserialize(&[255, 1, 2]).unwrap_err();
    }
}
