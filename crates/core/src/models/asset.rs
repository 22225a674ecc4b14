use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

use super::history::HistoryPoint;
use super::quote::AssetUpdate;

/// The category of a tracked instrument.
/// Determines which quote feed serves it and which trading calendar applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    /// Open-end (OTC) fund — priced via the estimation feed, not tick-by-tick
    Fund,
    /// Exchange index (e.g. sh000001)
    Index,
    /// Spot gold — continuously quotable on weekdays
    Gold,
    /// Sector/industry aggregate
    Sector,
    /// Exchange-traded stock or ETF
    Stock,
}

impl std::fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetCategory::Fund => write!(f, "fund"),
            AssetCategory::Index => write!(f, "index"),
            AssetCategory::Gold => write!(f, "gold"),
            AssetCategory::Sector => write!(f, "sector"),
            AssetCategory::Stock => write!(f, "stock"),
        }
    }
}

/// A user-held position in an asset.
///
/// `shares` and `cost_price` are both-or-neither by construction:
/// an `Asset` either has a `Position` or it doesn't.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Number of shares/units held
    pub shares: f64,
    /// Weighted-average cost per share
    pub cost_price: f64,
}

impl Position {
    /// Create a position. Both values must be finite and positive.
    pub fn new(shares: f64, cost_price: f64) -> Result<Self, CoreError> {
        if !shares.is_finite() || shares <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "shares must be a positive number, got {shares}"
            )));
        }
        if !cost_price.is_finite() || cost_price <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "cost price must be a positive number, got {cost_price}"
            )));
        }
        Ok(Self { shares, cost_price })
    }

    /// Total cost basis of this position.
    pub fn cost_basis(&self) -> f64 {
        self.shares * self.cost_price
    }
}

/// One constituent row of a fund's top holdings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub code: String,
    pub name: String,
    /// Weight percentage as reported (e.g. "9.87"), or "--" when the feed
    /// omits the column.
    pub percent: String,
}

/// A tracked instrument: identity, classification, latest market state,
/// rolling intraday history, and the optional user position.
///
/// The in-memory asset list is the single source of truth during a session;
/// the external store only holds the last-synced JSON snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    /// Stable identity — equals the provider code at creation
    pub id: String,
    /// Display code shown to the user (e.g. "000001")
    pub code: String,
    /// Provider-routing code, may embed an exchange prefix (e.g. "sh000001")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_code: Option<String>,
    pub name: String,
    pub category: AssetCategory,
    /// Market-hint tags consumed by the session clock (e.g. "HK", "NASDAQ")
    #[serde(default)]
    pub tags: Vec<String>,
    /// Free-text sub-type from the data source (e.g. "Mixed", "ETF")
    #[serde(default)]
    pub kind: String,

    // ── Market state ────────────────────────────────────────────────
    pub current_value: f64,
    pub yesterday_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    /// Official end-of-day unit NAV for funds, distinct from the intraday
    /// estimated value held in `current_value`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_nav: Option<f64>,
    /// Last-update timestamp string as reported by the feed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    // ── Series ──────────────────────────────────────────────────────
    /// Intraday point series, append-mostly, insertion order meaningful.
    /// Invalid whenever `last_history_date` is not today.
    #[serde(default)]
    pub history: Vec<HistoryPoint>,
    /// Calendar date the intraday series belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_history_date: Option<NaiveDate>,

    // ── Derived cache ───────────────────────────────────────────────
    /// Recent close series for compact trend display
    #[serde(default)]
    pub sparkline: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month_change_percent: Option<f64>,

    // ── Portfolio ───────────────────────────────────────────────────
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Top-N constituents, fetched lazily once per asset lifetime
    #[serde(default)]
    pub holdings: Vec<Holding>,
}

impl Asset {
    /// Create an asset skeleton with zero market values, as produced from a
    /// search result on the user's "add asset" action.
    pub fn skeleton(
        code: impl Into<String>,
        name: impl Into<String>,
        category: AssetCategory,
        api_code: Option<String>,
    ) -> Self {
        let code = code.into();
        Self {
            id: code.clone(),
            code,
            api_code,
            name: name.into(),
            category,
            tags: Vec::new(),
            kind: String::new(),
            current_value: 0.0,
            yesterday_value: 0.0,
            open: None,
            high: None,
            low: None,
            unit_nav: None,
            time: None,
            history: Vec::new(),
            last_history_date: None,
            sparkline: Vec::new(),
            month_change_percent: None,
            position: None,
            holdings: Vec::new(),
        }
    }

    /// The code used to query quote feeds: `api_code` when present,
    /// falling back to the display code.
    pub fn routing_code(&self) -> &str {
        self.api_code.as_deref().unwrap_or(&self.code)
    }

    /// Case-insensitive tag membership test.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// True for instruments quoted on a US exchange (tag or routing prefix).
    pub fn is_us_market(&self) -> bool {
        self.has_tag("US")
            || self.has_tag("NASDAQ")
            || self.has_tag("NYSE")
            || self.routing_code().starts_with("us")
    }

    /// True for instruments quoted on the Hong Kong exchange.
    pub fn is_hk_market(&self) -> bool {
        self.has_tag("HK") || self.routing_code().starts_with("hk")
    }

    /// Merge a partial update into this asset.
    ///
    /// Field-level overwrite only for fields the update carries — absent
    /// fields never clobber existing values (the no-field-regression rule).
    pub fn apply_update(&mut self, update: &AssetUpdate) {
        if let Some(v) = update.current_value {
            self.current_value = v;
        }
        if let Some(v) = update.yesterday_value {
            self.yesterday_value = v;
        }
        if let Some(v) = update.open {
            self.open = Some(v);
        }
        if let Some(v) = update.high {
            self.high = Some(v);
        }
        if let Some(v) = update.low {
            self.low = Some(v);
        }
        if let Some(v) = update.unit_nav {
            self.unit_nav = Some(v);
        }
        if let Some(t) = &update.time {
            self.time = Some(t.clone());
        }
    }

    /// Intraday change vs. the reference close, as a percentage.
    /// None when the reference value is zero.
    pub fn change_percent(&self) -> Option<f64> {
        if self.yesterday_value == 0.0 {
            return None;
        }
        Some((self.current_value - self.yesterday_value) / self.yesterday_value * 100.0)
    }
}
