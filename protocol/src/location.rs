use core::fmt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Single coordinate axis used for board width, height, and positions.
pub type Coord = u8;

/// Count type used for treasure/bomb counts and total-cell counts.
pub type CellCount = u16;

/// Board location, encoded on the wire as the contract record `{"x": .., "y": ..}`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub x: Coord,
    pub y: Coord,
}

impl Location {
    pub const fn new(x: Coord, y: Coord) -> Self {
        Self { x, y }
    }

    pub fn to_value(self) -> Value {
        serde_json::json!({ "x": self.x, "y": self.y })
    }
}

impl From<(Coord, Coord)> for Location {
    fn from((x, y): (Coord, Coord)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})", self.x, self.y)
    }
}

pub const fn mult(a: Coord, b: Coord) -> CellCount {
    let a = a as CellCount;
    let b = b as CellCount;
    a.saturating_mul(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_as_contract_record() {
        let loc = Location::new(3, 7);
        assert_eq!(loc.to_value(), serde_json::json!({ "x": 3, "y": 7 }));
        assert_eq!(serde_json::to_value(loc).unwrap(), loc.to_value());
    }

    #[test]
    fn rejects_coordinates_past_axis_range() {
        let res: Result<Location, _> = serde_json::from_value(serde_json::json!({ "x": 300, "y": 1 }));
        assert!(res.is_err());
    }
}
