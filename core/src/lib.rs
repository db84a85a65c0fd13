//! Client-side core of the treasure hunt: the board, treasure and bomb
//! placement, and the state machine that settles a paid tile reveal against a
//! ledger and a treasury.

pub use board::*;
pub use config::*;
pub use error::*;
pub use ledger::*;
pub use placement::*;
pub use session::*;
pub use settlement::*;
pub use tile::*;
pub use treasure_protocol::*;

mod board;
mod config;
mod error;
mod ledger;
mod placement;
mod session;
mod settlement;
mod tile;

/// Two-dimensional size `(width, height)`.
pub type Coord2 = (Coord, Coord);
