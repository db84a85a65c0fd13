use hashbrown::HashSet;
use rand::prelude::*;

use crate::*;

/// Draws board locations uniformly at random by rejection sampling: draw a
/// location, keep it unless it collides with one already chosen or excluded.
#[derive(Clone, Debug)]
pub struct LocationSampler {
    rng: SmallRng,
    size: Coord2,
}

impl LocationSampler {
    pub fn new(seed: u64, size: Coord2) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            size,
        }
    }

    /// Draws `count` distinct in-bounds locations, none of them in `exclude`,
    /// in draw order.
    ///
    /// Fails when the board does not have `count` free cells, since the
    /// sampling loop would never terminate.
    pub fn sample_distinct(&mut self, count: CellCount, exclude: &HashSet<Location>) -> Result<Vec<Location>> {
        let (width, height) = self.size;
        let excluded = exclude
            .iter()
            .filter(|loc| loc.x < width && loc.y < height)
            .count();
        let free = usize::from(mult(width, height)).saturating_sub(excluded);
        if usize::from(count) > free {
            return Err(HuntError::InvalidConfig(format!(
                "cannot place {count} locations, only {free} free cells on a {width}x{height} board"
            )));
        }

        let mut chosen = HashSet::with_capacity(count.into());
        let mut ordered = Vec::with_capacity(count.into());
        while ordered.len() < usize::from(count) {
            let loc = Location::new(self.rng.random_range(0..width), self.rng.random_range(0..height));
            if exclude.contains(&loc) || !chosen.insert(loc) {
                continue;
            }
            ordered.push(loc);
        }

        log::trace!("sampled {} locations: {:?}", ordered.len(), ordered);
        Ok(ordered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_is_distinct_and_in_bounds() {
        let mut sampler = LocationSampler::new(7, (10, 10));

        let locs = sampler.sample_distinct(10, &HashSet::new()).unwrap();
        let unique: HashSet<_> = locs.iter().copied().collect();

        assert_eq!(locs.len(), 10);
        assert_eq!(unique.len(), 10);
        assert!(locs.iter().all(|loc| loc.x < 10 && loc.y < 10));
    }

    #[test]
    fn sample_avoids_excluded() {
        let mut sampler = LocationSampler::new(1, (3, 3));
        let treasures: HashSet<_> = sampler.sample_distinct(4, &HashSet::new()).unwrap().into_iter().collect();

        let bombs = sampler.sample_distinct(5, &treasures).unwrap();

        assert_eq!(bombs.len(), 5);
        assert!(bombs.iter().all(|loc| !treasures.contains(loc)));
    }

    #[test]
    fn full_board_terminates() {
        let mut sampler = LocationSampler::new(99, (4, 4));

        let locs = sampler.sample_distinct(16, &HashSet::new()).unwrap();

        assert_eq!(locs.iter().collect::<HashSet<_>>().len(), 16);
    }

    #[test]
    fn too_many_is_rejected() {
        let mut sampler = LocationSampler::new(0, (2, 2));
        let exclude = HashSet::from([Location::new(0, 0), Location::new(9, 9)]);

        assert!(matches!(
            sampler.sample_distinct(4, &exclude),
            Err(HuntError::InvalidConfig(_))
        ));
        assert_eq!(sampler.sample_distinct(3, &exclude).unwrap().len(), 3);
    }

    #[test]
    fn same_seed_same_draws() {
        let a = LocationSampler::new(42, (10, 10)).sample_distinct(5, &HashSet::new()).unwrap();
        let b = LocationSampler::new(42, (10, 10)).sample_distinct(5, &HashSet::new()).unwrap();

        assert_eq!(a, b);
    }
}
