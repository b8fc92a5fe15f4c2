//! Per-denomination account balances.
//!
//! This is the value-transfer primitive the escrow ledger moves funds with: it knows
//! balances and transfers between accounts and nothing about fees.

mod state_ext;
pub(crate) mod storage;

pub use state_ext::{
    StateReadExt,
    StateWriteExt,
    TransferError,
};
