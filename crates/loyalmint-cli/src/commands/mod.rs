pub mod config;
pub mod rewards;
pub mod session;
pub mod tiers;
