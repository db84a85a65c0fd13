use core::fmt::Write;
use hashbrown::HashSet;
use treasure_core::*;

const AETTOS_DECIMALS: usize = 18;

/// Text view of the board, one row per line.
///
/// `#` unrevealed, `.` empty, `$` treasure, `*` bomb. Unrevealed cells that
/// hide something are shown in lowercase (`t`, `b`).
pub(crate) fn board(board: &Board, bombs: &HashSet<Location>, treasures: &HashSet<Location>) -> String {
    let (width, _) = board.size();
    let mut out = String::new();
    for (loc, state) in board.cells() {
        let c = match state {
            CellState::Unrevealed if bombs.contains(&loc) => 'b',
            CellState::Unrevealed if treasures.contains(&loc) => 't',
            CellState::Unrevealed => '#',
            CellState::Empty => '.',
            CellState::Treasure => '$',
            CellState::Bomb => '*',
        };
        out.push(c);
        if loc.x + 1 == width {
            out.push('\n');
        } else {
            out.push(' ');
        }
    }
    out
}

/// Formats aettos as AE without going through floating point.
pub(crate) fn ae(amount: Amount) -> String {
    let digits = format!("{:0>width$}", amount.to_string(), width = AETTOS_DECIMALS + 1);
    let (whole, frac) = digits.split_at(digits.len() - AETTOS_DECIMALS);
    let frac = frac.trim_end_matches('0');
    let mut out = String::from(whole);
    if !frac.is_empty() {
        let _ = write!(out, ".{frac}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_aettos() {
        assert_eq!(ae(Amount::zero()), "0");
        assert_eq!(ae(Amount::from(1_000_000_000_000_000u64)), "0.001");
        assert_eq!(ae(Amount::from(2_500_000_000_000_000_000u128)), "2.5");
    }

    #[test]
    fn renders_rows() {
        let mut b = Board::new((3, 2));
        b.set(Location::new(0, 0), CellState::Treasure).unwrap();
        b.set(Location::new(2, 1), CellState::Bomb).unwrap();
        let bombs = HashSet::from([Location::new(2, 1), Location::new(1, 0)]);
        let treasures = HashSet::from([Location::new(0, 0), Location::new(0, 1)]);

        assert_eq!(board(&b, &bombs, &treasures), "$ b #\nt # *\n");
    }
}
