use serde::{Deserialize, Serialize};

use super::asset::AssetCategory;

/// A partial update produced by one quote adapter for one asset.
///
/// Every field is optional: an adapter only fills what its feed actually
/// reported. The merge step writes `Some` fields onto the canonical asset
/// and leaves everything else untouched, so a feed returning `'-'` for a
/// column can never regress a previously known value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetUpdate {
    pub current_value: Option<f64>,
    pub yesterday_value: Option<f64>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub unit_nav: Option<f64>,
    pub time: Option<String>,
}

impl AssetUpdate {
    /// True when the adapter reported nothing usable.
    pub fn is_empty(&self) -> bool {
        self.current_value.is_none()
            && self.yesterday_value.is_none()
            && self.open.is_none()
            && self.high.is_none()
            && self.low.is_none()
            && self.unit_nav.is_none()
            && self.time.is_none()
    }
}

/// Normalized result of the fund estimation feed.
///
/// Funds only publish estimated values every minute or so; the feed also
/// carries the previous official unit NAV and an estimated growth rate that
/// lets the engine back-derive yesterday's value.
#[derive(Debug, Clone, PartialEq)]
pub struct FundEstimate {
    /// Estimated intraday NAV
    pub price: f64,
    /// Estimated growth vs. previous close, in percent
    pub growth_percent: f64,
    /// Official unit NAV from the previous close, when reported
    pub unit_nav: Option<f64>,
    /// Estimation timestamp, normalized to `YYYY-MM-DD HH:MM:SS`
    pub time: String,
}

impl FundEstimate {
    /// Back-derive the previous close from the estimated growth rate:
    /// `yesterday = price / (1 + growth/100)`. None when the divisor is zero.
    pub fn derived_yesterday_value(&self) -> Option<f64> {
        let divisor = 1.0 + self.growth_percent / 100.0;
        if divisor == 0.0 {
            return None;
        }
        Some(self.price / divisor)
    }
}

/// One row of the instrument search feed, used to build new asset skeletons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub code: String,
    pub name: String,
    /// Provider's category descriptor (e.g. "混合型", "股票型")
    pub kind: String,
    pub category: AssetCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_code: Option<String>,
}
