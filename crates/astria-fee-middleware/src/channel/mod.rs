//! The channel layer's view as consumed by the fee middleware.
//!
//! Channel ends, send sequences and packet commitments are owned by the IBC core. The
//! core writes them through [`StateWriteExt`]; the fee middleware only ever reads them to
//! decide whether a packet can still be incentivized.

mod state_ext;
pub(crate) mod storage;

pub use state_ext::{
    StateReadExt,
    StateWriteExt,
};
