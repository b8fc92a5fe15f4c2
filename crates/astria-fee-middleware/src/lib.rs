//! Relayer fee incentivization for IBC channels.
//!
//! [`FeeMiddleware`] wraps an [`IbcModule`] and lets users escrow fees for the packets it
//! sends. Fees are paid out to the relayers that deliver the packet and relay its
//! acknowledgement or timeout, and unused parts are refunded to the payers.

pub(crate) mod accounts;
pub mod acknowledgement;
pub mod actions;
pub mod address;
pub(crate) mod channel;
pub mod coin;
pub mod config;
pub(crate) mod distribution;
pub mod error;
pub(crate) mod escrow;
pub(crate) mod events;
pub mod fee;
pub mod genesis;
pub mod ibc_module;
pub(crate) mod middleware;
pub mod packet;
pub(crate) mod payee;
pub mod query;
pub(crate) mod storage;
#[cfg(test)]
pub(crate) mod test_utils;
pub(crate) mod utils;
pub mod version;

pub use accounts::{
    StateReadExt as AccountsStateReadExt,
    StateWriteExt as AccountsStateWriteExt,
    TransferError,
};
pub use actions::{
    deliver,
    FeeAction,
};
pub use channel::{
    StateReadExt as ChannelStateReadExt,
    StateWriteExt as ChannelStateWriteExt,
};
pub use config::Config;
pub use error::FeeError;
pub use escrow::FeeHandle;
pub use ibc_module::IbcModule;
pub use middleware::FeeMiddleware;
pub use payee::RegisteredPayee;
