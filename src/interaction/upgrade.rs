//! Tool upgrade tiers.

use crate::constants::UPGRADE_MAX_LEVEL;
use crate::error::{SimError, SimResult};

/// Purchased tier of one tool, `1..=UPGRADE_MAX_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UpgradeLevel(u8);

impl UpgradeLevel {
    pub const BASE: Self = Self(1);
    pub const MAX: Self = Self(UPGRADE_MAX_LEVEL);

    pub fn new(level: u8) -> SimResult<Self> {
        if (1..=UPGRADE_MAX_LEVEL).contains(&level) {
            Ok(Self(level))
        } else {
            Err(SimError::UpgradeLevel {
                got: level,
                max: UPGRADE_MAX_LEVEL,
            })
        }
    }

    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based index into per-tier lookup tables.
    #[inline]
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// Tiers gained above the base tier.
    #[inline]
    pub fn steps(self) -> f32 {
        (self.0 - 1) as f32
    }

    /// `base + per_level * (level - 1)`.
    #[inline]
    pub fn scale(self, base: f32, per_level: f32) -> f32 {
        base + per_level * self.steps()
    }
}

impl Default for UpgradeLevel {
    fn default() -> Self {
        Self::BASE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_one_through_max() {
        assert!(UpgradeLevel::new(0).is_err());
        assert!(UpgradeLevel::new(UPGRADE_MAX_LEVEL + 1).is_err());
        for level in 1..=UPGRADE_MAX_LEVEL {
            assert_eq!(UpgradeLevel::new(level).map(UpgradeLevel::get).ok(), Some(level));
        }
    }

    #[test]
    fn linear_scaling_per_tier() {
        let values: Vec<f32> = (1..=4)
            .map(|l| UpgradeLevel::new(l).map(|l| l.scale(3.0, 0.75)))
            .collect::<SimResult<_>>()
            .expect("valid levels");
        assert_eq!(values, vec![3.0, 3.75, 4.5, 5.25]);
    }
}
