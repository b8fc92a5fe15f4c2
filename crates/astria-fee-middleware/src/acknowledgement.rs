//! The acknowledgement written on fee-enabled channels.
//!
//! The receiving chain wraps the wrapped application's acknowledgement together with the
//! address the forward relayer wants to be paid at on the sending chain. The sending
//! chain unwraps it, hands the inner acknowledgement to its application and pays the
//! forward relayer from its escrow.

use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    error::FeeError,
    packet::Acknowledgement,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncentivizedAcknowledgement {
    #[serde(with = "base64_serde")]
    pub app_acknowledgement: Vec<u8>,
    /// Empty if the receiving chain could not name a forward relayer.
    pub forward_relayer_address: String,
    pub underlying_app_success: bool,
}

impl IncentivizedAcknowledgement {
    #[must_use]
    pub fn new(app_acknowledgement: Acknowledgement, forward_relayer_address: String) -> Self {
        let underlying_app_success = app_acknowledgement.is_successful();
        Self {
            app_acknowledgement: app_acknowledgement.into_data(),
            forward_relayer_address,
            underlying_app_success,
        }
    }

    /// The acknowledgement that is written to state on the receiving chain.
    ///
    /// It is always successful: a failed application acknowledgement is carried inside
    /// and reported through `underlying_app_success`.
    ///
    /// # Errors
    /// Returns an error if the acknowledgement cannot be serialized.
    pub fn to_acknowledgement(&self) -> Result<Acknowledgement, FeeError> {
        let data = serde_json::to_vec(self).map_err(|source| {
            FeeError::internal("failed to encode incentivized acknowledgement", source.into())
        })?;
        Ok(Acknowledgement::new(data, true))
    }

    /// # Errors
    /// Returns [`FeeError::InvalidAcknowledgement`] if `bytes` is not an incentivized
    /// acknowledgement.
    pub fn decode(bytes: &[u8]) -> Result<Self, FeeError> {
        serde_json::from_slice(bytes).map_err(FeeError::InvalidAcknowledgement)
    }
}

mod base64_serde {
    use base64::{
        prelude::BASE64_STANDARD,
        Engine as _,
    };
    use serde::{
        Deserialize as _,
        Deserializer,
        Serializer,
    };

    pub(super) fn serialize<S: Serializer, T: AsRef<[u8]>>(
        input: T,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64_STANDARD.encode(input))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64_STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}
