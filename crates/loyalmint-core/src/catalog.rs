//! Static catalog of redeemable rewards.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewardOption {
    pub id: String,
    pub name: String,
    pub points_cost: u64,
    pub description: String,
    pub icon: String,
}

impl RewardOption {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        points_cost: u64,
        description: impl Into<String>,
        icon: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            points_cost,
            description: description.into(),
            icon: icon.into(),
        }
    }

    pub fn is_affordable(&self, balance: u64) -> bool {
        balance >= self.points_cost
    }
}

#[derive(Debug, Clone)]
pub struct RewardCatalog {
    rewards: Vec<RewardOption>,
}

impl Default for RewardCatalog {
    fn default() -> Self {
        Self::reference()
    }
}

impl RewardCatalog {
    /// Catalog with the given entries. Entries with a zero cost are dropped.
    pub fn new(rewards: Vec<RewardOption>) -> Self {
        Self {
            rewards: rewards.into_iter().filter(|r| r.points_cost > 0).collect(),
        }
    }

    /// The three stock rewards.
    pub fn reference() -> Self {
        Self::new(vec![
            RewardOption::new(
                "discount10",
                "10% Discount",
                100,
                "Get 10% off your next purchase",
                "🏷️",
            ),
            RewardOption::new("freeItem", "Free Item", 200, "Redeem for a free item", "🎁"),
            RewardOption::new(
                "vipStatus",
                "VIP Status",
                1000,
                "Unlock VIP benefits for 30 days",
                "👑",
            ),
        ])
    }

    pub fn all(&self) -> &[RewardOption] {
        &self.rewards
    }

    pub fn find(&self, id: &str) -> Option<&RewardOption> {
        self.rewards.iter().find(|r| r.id == id)
    }

    /// Rewards the balance covers, in catalog order.
    pub fn affordable(&self, balance: u64) -> Vec<&RewardOption> {
        self.rewards.iter().filter(|r| r.is_affordable(balance)).collect()
    }
}
