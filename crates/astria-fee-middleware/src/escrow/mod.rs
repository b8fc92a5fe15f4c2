//! The escrow ledger.
//!
//! Fees are escrowed per packet as an ordered list of payer entries, backed one to one by
//! the balance of the module-owned escrow account. Every operation in [`ledger`] moves
//! funds and updates the entries together so that, per denomination, the sum of all live
//! entries always equals the escrow account balance.

pub(crate) mod ledger;
mod state_ext;
pub(crate) mod storage;

pub use ledger::{
    check_escrow_invariant,
    FeeHandle,
};
pub use state_ext::{
    StateReadExt,
    StateWriteExt,
};
