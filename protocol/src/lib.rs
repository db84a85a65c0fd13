//! Wire-level types shared by the treasure hunt client and the ledger boundary.
//!
//! Everything that crosses into or out of a ledger call is defined here: board
//! locations in the contract's record shape, currency amounts, account and
//! contract identifiers, entrypoint names, and the decoders that turn loosely
//! typed call results back into Rust values.

pub use amount::*;
pub use call::*;
pub use decode::*;
pub use error::*;
pub use ids::*;
pub use location::*;

mod amount;
mod call;
mod decode;
mod error;
mod ids;
mod location;
