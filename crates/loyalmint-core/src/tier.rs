//! Tier engine.
//!
//! Maps a point balance onto one of four fixed tiers. The tier's multiplier
//! scales the points awarded per mint. Multipliers are stored per-mille so
//! point arithmetic stays exact.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

/// Static description of a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierDefinition {
    pub tier: Tier,
    pub name: &'static str,
    pub minimum_points: u64,
    /// Reward multiplier in thousandths (1200 = x1.2).
    pub multiplier_permille: u64,
    pub display_color: &'static str,
}

impl TierDefinition {
    pub fn multiplier(&self) -> f64 {
        self.multiplier_permille as f64 / 1000.0
    }

    /// Scale a base award by this tier's multiplier, rounding down.
    pub fn apply(&self, base_points: u64) -> u64 {
        base_points.saturating_mul(self.multiplier_permille) / 1000
    }
}

/// Tier table, ascending by `minimum_points`.
pub const TIERS: [TierDefinition; 4] = [
    TierDefinition {
        tier: Tier::Bronze,
        name: "BRONZE",
        minimum_points: 0,
        multiplier_permille: 1000,
        display_color: "#CD7F32",
    },
    TierDefinition {
        tier: Tier::Silver,
        name: "SILVER",
        minimum_points: 100,
        multiplier_permille: 1200,
        display_color: "#C0C0C0",
    },
    TierDefinition {
        tier: Tier::Gold,
        name: "GOLD",
        minimum_points: 500,
        multiplier_permille: 1500,
        display_color: "#FFD700",
    },
    TierDefinition {
        tier: Tier::Platinum,
        name: "PLATINUM",
        minimum_points: 1000,
        multiplier_permille: 2000,
        display_color: "#E5E4E2",
    },
];

/// Resolve the tier for a balance. Total: anything below SILVER is BRONZE.
pub fn tier_for(balance: u64) -> &'static TierDefinition {
    TIERS
        .iter()
        .rev()
        .find(|def| balance >= def.minimum_points)
        .unwrap_or(&TIERS[0])
}

/// Where a balance sits relative to the next tier up.
#[derive(Debug, Clone, Serialize)]
pub struct TierProgress {
    pub current: TierDefinition,
    pub next: Option<TierDefinition>,
    /// Points still needed to reach `next`; zero at the top tier.
    pub points_to_next: u64,
}

pub fn progress_for(balance: u64) -> TierProgress {
    let current = *tier_for(balance);
    let next = TIERS
        .iter()
        .find(|def| def.minimum_points > balance)
        .copied();
    let points_to_next = next
        .map(|def| def.minimum_points - balance)
        .unwrap_or(0);
    TierProgress {
        current,
        next,
        points_to_next,
    }
}
