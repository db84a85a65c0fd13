use serde::{Deserialize, Serialize};

use crate::*;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HuntConfig {
    pub width: Coord,
    pub height: Coord,
    /// Treasures placed per round when the caller does not pick a count.
    pub treasure_count: CellCount,
    pub bomb_count: CellCount,
    /// Skips the `get_reveal_fee` lookup when set.
    pub reveal_fee_override: Option<Amount>,
    /// Skips the `get_reward_amount` lookup when set.
    pub reward_override: Option<Amount>,
    /// Treat a location missing from the revealed map as empty instead of
    /// indeterminate. Only safe when the ledger indexes reveals immediately.
    pub assume_consistent_index: bool,
}

impl Default for HuntConfig {
    fn default() -> Self {
        Self {
            width: 10,
            height: 10,
            treasure_count: 10,
            bomb_count: 5,
            reveal_fee_override: None,
            reward_override: None,
            assume_consistent_index: false,
        }
    }
}

impl HuntConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| HuntError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub const fn size(&self) -> Coord2 {
        (self.width, self.height)
    }

    pub const fn total_cells(&self) -> CellCount {
        mult(self.width, self.height)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(HuntError::InvalidConfig(format!(
                "board must be at least 1x1, got {}x{}",
                self.width, self.height
            )));
        }
        self.check_fits(self.treasure_count)
    }

    /// Checks that `treasure_count` treasures plus the configured bombs fit on the board.
    pub fn check_fits(&self, treasure_count: CellCount) -> Result<()> {
        let needed = u32::from(treasure_count) + u32::from(self.bomb_count);
        let total = self.total_cells();
        if needed > u32::from(total) {
            return Err(HuntError::InvalidConfig(format!(
                "{} treasures and {} bombs do not fit on {} cells",
                treasure_count, self.bomb_count, total
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_classic_board() {
        let config = HuntConfig::default();

        assert_eq!(config.size(), (10, 10));
        assert_eq!(config.total_cells(), 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parses_toml_with_amounts() {
        let config = HuntConfig::from_toml_str(
            r#"
            width = 3
            height = 3
            treasure_count = 4
            bomb_count = 1
            reveal_fee_override = 1000000000000000
            reward_override = "5000000000000000000"
            "#,
        )
        .unwrap();

        assert_eq!(config.size(), (3, 3));
        assert_eq!(config.reveal_fee_override, Some(Amount::from(1_000_000_000_000_000u64)));
        assert_eq!(config.reward_override, Some(Amount::from(5_000_000_000_000_000_000u128)));
        assert!(!config.assume_consistent_index);
    }

    #[test]
    fn rejects_bad_configs() {
        assert!(matches!(
            HuntConfig::from_toml_str("width = 0"),
            Err(HuntError::InvalidConfig(_))
        ));
        assert!(HuntConfig::from_toml_str("width = 2\nheight = 2\ntreasure_count = 3\nbomb_count = 2").is_err());
        assert!(HuntConfig::from_toml_str("reveal_fee_override = -1").is_err());
        assert!(HuntConfig::from_toml_str("colour = \"red\"").is_err());
    }
}
