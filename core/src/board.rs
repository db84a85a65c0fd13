use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

pub trait ToNdIndex {
    type Output;
    fn to_nd_index(self) -> Self::Output;
}

impl ToNdIndex for Location {
    type Output = [usize; 2];

    /// Row-major: rows are `y`, columns are `x`.
    fn to_nd_index(self) -> Self::Output {
        [self.y.into(), self.x.into()]
    }
}

/// Client-side view of the grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Board {
    cells: Array2<CellState>,
}

impl Board {
    pub fn new((width, height): Coord2) -> Self {
        Self {
            cells: Array2::default([usize::from(height), usize::from(width)]),
        }
    }

    pub fn reset(&mut self, size: Coord2) {
        *self = Self::new(size);
    }

    /// `(width, height)`
    pub fn size(&self) -> Coord2 {
        let (rows, cols) = self.cells.dim();
        (cols.try_into().unwrap(), rows.try_into().unwrap())
    }

    pub fn total_cells(&self) -> CellCount {
        let (width, height) = self.size();
        mult(width, height)
    }

    pub fn contains(&self, loc: Location) -> bool {
        let (width, height) = self.size();
        loc.x < width && loc.y < height
    }

    pub fn validate(&self, loc: Location) -> Result<Location> {
        if self.contains(loc) {
            Ok(loc)
        } else {
            Err(HuntError::OutOfBounds(loc))
        }
    }

    pub fn get(&self, loc: Location) -> Result<CellState> {
        let loc = self.validate(loc)?;
        Ok(self.cells[loc.to_nd_index()])
    }

    /// Writes the resolved state of a cell. Cells never change once revealed,
    /// only [`Board::reset`] clears them.
    pub fn set(&mut self, loc: Location, state: CellState) -> Result<()> {
        let loc = self.validate(loc)?;
        let cell = &mut self.cells[loc.to_nd_index()];
        if !cell.is_unrevealed() {
            return Err(HuntError::AlreadyRevealed(loc));
        }
        *cell = state;
        Ok(())
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (Location, CellState)> + '_ {
        self.cells.indexed_iter().map(|((y, x), &state)| {
            // dimensions come from Coord values, so indices always fit
            (Location::new(x as Coord, y as Coord), state)
        })
    }

    pub fn count(&self, state: CellState) -> CellCount {
        self.cells
            .iter()
            .filter(|&&cell| cell == state)
            .count()
            .try_into()
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_board_is_unrevealed() {
        let board = Board::new((3, 2));

        assert_eq!(board.size(), (3, 2));
        assert_eq!(board.total_cells(), 6);
        assert_eq!(board.count(CellState::Unrevealed), 6);
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let mut board = Board::new((3, 2));

        assert_eq!(board.get(Location::new(3, 0)), Err(HuntError::OutOfBounds(Location::new(3, 0))));
        assert_eq!(
            board.set(Location::new(0, 2), CellState::Empty),
            Err(HuntError::OutOfBounds(Location::new(0, 2)))
        );
    }

    #[test]
    fn revealed_cells_cannot_be_overwritten() {
        let mut board = Board::new((3, 3));
        let loc = Location::new(1, 2);

        board.set(loc, CellState::Treasure).unwrap();

        assert_eq!(board.get(loc), Ok(CellState::Treasure));
        assert_eq!(board.set(loc, CellState::Empty), Err(HuntError::AlreadyRevealed(loc)));
        assert_eq!(board.get(loc), Ok(CellState::Treasure));
    }

    #[test]
    fn reset_clears_everything() {
        let mut board = Board::new((2, 2));
        board.set(Location::new(0, 0), CellState::Bomb).unwrap();
        board.set(Location::new(1, 1), CellState::Empty).unwrap();

        board.reset((4, 1));

        assert_eq!(board.size(), (4, 1));
        assert_eq!(board.count(CellState::Unrevealed), 4);
    }

    #[test]
    fn cells_iterate_row_major() {
        let mut board = Board::new((3, 2));
        let loc = Location::new(2, 1);
        board.set(loc, CellState::Empty).unwrap();

        let cells: Vec<_> = board.cells().collect();

        assert_eq!(cells[5], (loc, CellState::Empty));
        assert_eq!(cells[1].0, Location::new(1, 0));
    }
}
