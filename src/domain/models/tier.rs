//! Model tiers and thinking-effort bands used by the DQ scorer, router and
//! executor.

use serde::{Deserialize, Serialize};

/// The three exposed capability bands, ordered cheapest-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Haiku,
    Sonnet,
    Opus,
}

impl ModelTier {
    pub const ORDERED: [Self; 3] = [Self::Haiku, Self::Sonnet, Self::Opus];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Haiku => "haiku",
            Self::Sonnet => "sonnet",
            Self::Opus => "opus",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "haiku" => Some(Self::Haiku),
            "sonnet" => Some(Self::Sonnet),
            "opus" => Some(Self::Opus),
            _ => None,
        }
    }

    /// The complexity ceiling this tier is provisioned for, from the
    /// default `complexity_thresholds` baseline (`{haiku_max: 0.3,
    /// sonnet_max: 0.6}`; opus has no ceiling).
    pub const fn max_complexity(self) -> f64 {
        match self {
            Self::Haiku => 0.3,
            Self::Sonnet => 0.6,
            Self::Opus => 1.0,
        }
    }

    /// Cheapest-first ordinal, used as the DQ routing tiebreaker.
    pub const fn cost_rank(self) -> u8 {
        match self {
            Self::Haiku => 0,
            Self::Sonnet => 1,
            Self::Opus => 2,
        }
    }

    /// Index into [`Self::ORDERED`], used for specificity's distance score.
    pub const fn ordinal(self) -> usize {
        self.cost_rank() as usize
    }

    /// Default per-tier executor timeout before any thinking-effort
    /// modulation (haiku 180s / sonnet 600s / opus 1200s).
    pub const fn default_timeout_secs(self) -> u64 {
        match self {
            Self::Haiku => 180,
            Self::Sonnet => 600,
            Self::Opus => 1200,
        }
    }

    /// The vendor-specific model identifier string this tier resolves to.
    pub const fn vendor_id(self) -> &'static str {
        match self {
            Self::Haiku => "claude-haiku-4-5",
            Self::Sonnet => "claude-sonnet-4-5",
            Self::Opus => "claude-opus-4-1",
        }
    }
}

/// A sub-tier within opus controlling reasoning budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThinkingEffort {
    Low,
    Medium,
    High,
    Max,
}

impl ThinkingEffort {
    /// Derive the effort tier from a complexity value, using the band
    /// table `low [0.60,0.72), medium [0.72,0.85), high [0.85,0.95), max
    /// [0.95,1.00]`. Returns `None` below the opus band floor.
    pub fn from_complexity(complexity: f64) -> Option<Self> {
        if (0.60..0.72).contains(&complexity) {
            Some(Self::Low)
        } else if (0.72..0.85).contains(&complexity) {
            Some(Self::Medium)
        } else if (0.85..0.95).contains(&complexity) {
            Some(Self::High)
        } else if (0.95..=1.00).contains(&complexity) {
            Some(Self::Max)
        } else {
            None
        }
    }

    /// Multiplier applied to the tier's base timeout.
    pub const fn timeout_multiplier(self) -> f64 {
        match self {
            Self::Low => 0.75,
            Self::Medium => 1.0,
            Self::High => 1.5,
            Self::Max => 2.0,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Max => "max",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thinking_effort_bands() {
        assert_eq!(ThinkingEffort::from_complexity(0.65), Some(ThinkingEffort::Low));
        assert_eq!(ThinkingEffort::from_complexity(0.80), Some(ThinkingEffort::Medium));
        assert_eq!(ThinkingEffort::from_complexity(0.90), Some(ThinkingEffort::High));
        assert_eq!(ThinkingEffort::from_complexity(1.0), Some(ThinkingEffort::Max));
        assert_eq!(ThinkingEffort::from_complexity(0.5), None);
    }

    #[test]
    fn tiers_are_cheapest_first() {
        assert!(ModelTier::Haiku.cost_rank() < ModelTier::Sonnet.cost_rank());
        assert!(ModelTier::Sonnet.cost_rank() < ModelTier::Opus.cost_rank());
    }
}
