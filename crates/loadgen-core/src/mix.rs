use crate::error::LoadError;
use crate::stats::Category;
use rand::Rng;
use serde::{Deserialize, Serialize};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Traffic mix weights. The default is the fixed 60/25/15 split.
///
/// | Category | Share | Draw range     |
/// |----------|-------|----------------|
/// | Submit   |  60%  | `[0.00, 0.60)` |
/// | Top      |  25%  | `[0.60, 0.85)` |
/// | Rank     |  15%  | `[0.85, 1.00)` |
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrafficMix {
    pub submit: f64,
    pub top: f64,
    pub rank: f64,
}

impl Default for TrafficMix {
    fn default() -> Self {
        Self {
            submit: 0.60,
            top: 0.25,
            rank: 0.15,
        }
    }
}

impl TrafficMix {
    pub fn validate(&self) -> Result<(), LoadError> {
        if self.submit < 0.0 || self.top < 0.0 || self.rank < 0.0 {
            return Err(LoadError::InvalidConfig(format!(
                "traffic mix weights must be non-negative: {self:?}"
            )));
        }
        let sum = self.submit + self.top + self.rank;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(LoadError::InvalidConfig(format!(
                "traffic mix weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }

    /// Draw a uniform value in `[0, 1)` and map it to a category.
    pub fn sample(&self, rng: &mut impl Rng) -> Category {
        let draw: f64 = rng.gen();
        self.select(draw)
    }

    /// Map a draw in `[0, 1)` to a category using cumulative weights.
    /// Exposed for deterministic testing.
    pub fn select(&self, draw: f64) -> Category {
        if draw < self.submit {
            Category::Submit
        } else if draw < self.submit + self.top {
            Category::Top
        } else {
            Category::Rank
        }
    }

    /// Human-readable split, e.g. `60% submit, 25% top10, 15% rank`.
    pub fn describe(&self) -> String {
        format!(
            "{:.0}% submit, {:.0}% top10, {:.0}% rank",
            self.submit * 100.0,
            self.top * 100.0,
            self.rank * 100.0
        )
    }
}
