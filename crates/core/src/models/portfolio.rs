use serde::{Deserialize, Serialize};

/// Portfolio-level aggregation over all assets with a position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioTotals {
    /// Sum of `shares * current_value` over positioned assets
    pub market_value: f64,
    /// Sum of `shares * cost_price` over positioned assets
    pub cost_basis: f64,
    pub pnl: f64,
    /// `pnl / cost_basis * 100`, or 0 when there is no cost basis
    pub pnl_percent: f64,
}
