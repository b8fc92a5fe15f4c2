//! Where relayers want to be paid.
//!
//! A relayer may register a payee on the local chain (used when it claims fees escrowed
//! here) and a counterparty payee (its payout address on the chain that escrows fees for
//! packets it delivers here). Both registrations are per channel and the last write wins.

mod state_ext;
pub(crate) mod storage;

use ibc_types::core::channel::ChannelId;

use crate::address::Address;
pub use state_ext::{
    StateReadExt,
    StateWriteExt,
};

/// A payee registration as listed in queries and genesis.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisteredPayee {
    pub channel_id: ChannelId,
    pub relayer: Address,
    pub payee: Address,
}
