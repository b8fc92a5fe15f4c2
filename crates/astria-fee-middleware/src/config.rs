use figment::{
    providers::Env,
    Figment,
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::address::Address;

pub const ENV_PREFIX: &str = "ASTRIA_FEE_MIDDLEWARE_";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Log level: debug, info, warn, or error
    pub log: String,
    /// The account holding escrowed packet fees.
    #[serde(deserialize_with = "deserialize_address", serialize_with = "serialize_address")]
    pub escrow_account: Address,
}

impl Config {
    /// Reads the config from `ASTRIA_FEE_MIDDLEWARE_*` environment variables. `RUST_LOG`
    /// is read as `log` and is overridden by `ASTRIA_FEE_MIDDLEWARE_LOG`.
    ///
    /// # Errors
    /// Returns an error if a field is missing or malformed, or an unknown variable with
    /// the prefix is set.
    pub fn get() -> Result<Self, figment::Error> {
        Self::get_with_prefix(ENV_PREFIX)
    }

    fn get_with_prefix(prefix: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Env::prefixed("RUST_").split("_").only(&["log"]))
            .merge(Env::prefixed(prefix))
            .extract()
    }
}

fn deserialize_address<'de, D>(deserializer: D) -> Result<Address, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let address = String::deserialize(deserializer)?;
    address.parse().map_err(serde::de::Error::custom)
}

fn serialize_address<S>(address: &Address, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(address.as_str())
}
