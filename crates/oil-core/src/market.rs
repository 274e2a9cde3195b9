use serde::{Deserialize, Serialize};

/// Market mood, ordered from worst to best.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketTrend {
    Crashing,
    Declining,
    Stable,
    Rising,
    Booming,
}

impl MarketTrend {
    pub const LEVELS: [MarketTrend; 5] = [
        MarketTrend::Crashing,
        MarketTrend::Declining,
        MarketTrend::Stable,
        MarketTrend::Rising,
        MarketTrend::Booming,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Level at `index`, clamped into the valid range.
    pub fn from_index(index: i64) -> Self {
        let i = index.clamp(0, Self::LEVELS.len() as i64 - 1) as usize;
        Self::LEVELS[i]
    }

    pub fn multiplier(self) -> f64 {
        match self {
            MarketTrend::Crashing => 0.6,
            MarketTrend::Declining => 0.8,
            MarketTrend::Stable => 1.0,
            MarketTrend::Rising => 1.2,
            MarketTrend::Booming => 1.5,
        }
    }

    /// One step up or down, saturating at the ends.
    pub fn step(self, up: bool) -> Self {
        let delta = if up { 1 } else { -1 };
        Self::from_index(self.index() as i64 + delta)
    }
}

/// Trend and last computed base price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketState {
    pub trend: MarketTrend,
    /// Base price per barrel after every multiplier, recomputed each month.
    pub base_price: i64,
}

impl Default for MarketState {
    fn default() -> Self {
        Self {
            trend: MarketTrend::Stable,
            base_price: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_saturate() {
        assert_eq!(MarketTrend::Booming.step(true), MarketTrend::Booming);
        assert_eq!(MarketTrend::Crashing.step(false), MarketTrend::Crashing);
        assert_eq!(MarketTrend::Stable.step(true), MarketTrend::Rising);
    }

    #[test]
    fn levels_are_ordered() {
        for (i, t) in MarketTrend::LEVELS.iter().enumerate() {
            assert_eq!(t.index(), i);
        }
        assert!(MarketTrend::Crashing < MarketTrend::Booming);
    }
}
