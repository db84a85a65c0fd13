use serde::{Deserialize, Serialize};

/// Player-visible state of a single board cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellState {
    Unrevealed,
    Empty,
    Treasure,
    Bomb,
}

impl CellState {
    pub const fn is_unrevealed(self) -> bool {
        matches!(self, Self::Unrevealed)
    }
}

impl Default for CellState {
    fn default() -> Self {
        Self::Unrevealed
    }
}
