//! Channel version negotiation.
//!
//! A fee-enabled channel carries a composite version: a JSON object holding this
//! middleware's version next to the wrapped application's version. Counterparties that
//! do not speak the composite format see only the application's version.

use serde::{
    Deserialize,
    Serialize,
};

use crate::error::FeeError;

/// The only fee version this middleware negotiates.
pub const FEE_VERSION: &str = "ics29-1";

/// The composite channel version of a fee-enabled channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub fee_version: String,
    pub app_version: String,
}

/// The outcome of decoding a proposed channel version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodedVersion {
    /// The version carried fee metadata; holds the wrapped application's version.
    FeeEnabled(String),
    /// The version is not composite and belongs to the wrapped application as is.
    NotSupported,
}

/// Wraps `app_version` into the composite version string.
///
/// # Errors
/// Returns an error if serialization fails, which does not happen for string fields.
pub fn encode_version(app_version: &str) -> Result<String, FeeError> {
    serde_json::to_string(&Metadata {
        fee_version: FEE_VERSION.to_string(),
        app_version: app_version.to_string(),
    })
    .map_err(|source| {
        FeeError::internal("failed to encode channel version metadata", source.into())
    })
}

/// Decodes a proposed channel version.
///
/// # Errors
/// Returns [`FeeError::InvalidVersion`] if the version is composite but names a fee
/// version other than [`FEE_VERSION`].
pub fn decode_version(version: &str) -> Result<DecodedVersion, FeeError> {
    let Ok(metadata) = serde_json::from_str::<Metadata>(version) else {
        return Ok(DecodedVersion::NotSupported);
    };
    if metadata.fee_version != FEE_VERSION {
        return Err(FeeError::InvalidVersion {
            expected: FEE_VERSION,
            found: metadata.fee_version,
        });
    }
    Ok(DecodedVersion::FeeEnabled(metadata.app_version))
}
