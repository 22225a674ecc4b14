use chrono::{NaiveDateTime, NaiveTime};
use std::sync::Arc;

use crate::models::asset::{Asset, AssetCategory};
use crate::models::history::{ChartPeriod, HistoryPoint};
use crate::providers::routing::secid_for;
use crate::providers::traits::HistoryProvider;

/// Minimum intraday points for an OTC fund series to be trusted — generic
/// feeds answer OTC fund codes with a single junk point (1.0 or 0.0).
const MIN_OTC_POINTS: usize = 5;

/// Chart data assembly over the history feeds.
///
/// Picks the right feed per asset and period, and degrades gracefully:
/// an intraday request that the feeds cannot serve falls back to the
/// locally accumulated session history, then to a synthesized flat line,
/// so a chart panel never renders empty while a value is known.
pub struct ChartService {
    provider: Arc<dyn HistoryProvider>,
}

impl ChartService {
    pub fn new(provider: Arc<dyn HistoryProvider>) -> Self {
        Self { provider }
    }

    /// Fetch the value series for one asset and period.
    pub async fn asset_history(
        &self,
        asset: &Asset,
        period: ChartPeriod,
        now: NaiveDateTime,
    ) -> Vec<HistoryPoint> {
        if period == ChartPeriod::Intraday {
            return self.intraday_history(asset, now).await;
        }

        // Funds are not exchange-traded; their daily series comes from the
        // NAV feed rather than candles.
        if asset.category == AssetCategory::Fund {
            let (_, count) = period.candle_params();
            return self
                .provider
                .fund_nav_history(asset.routing_code(), count)
                .await;
        }

        self.provider.candles(asset.routing_code(), period).await
    }

    async fn intraday_history(&self, asset: &Asset, now: NaiveDateTime) -> Vec<HistoryPoint> {
        let code = asset.routing_code();
        let is_otc_fund = asset.category == AssetCategory::Fund && secid_for(code).is_none();

        let mut points = self.provider.intraday(code).await;
        if is_otc_fund && points.len() < MIN_OTC_POINTS {
            points.clear();
        }
        if !points.is_empty() {
            return points;
        }

        // Keep the locally accumulated series when it belongs to today.
        if asset.last_history_date == Some(now.date()) && !asset.history.is_empty() {
            return asset.history.clone();
        }

        synthesize_flat_line(asset)
    }

    /// One-month value series condensed to a sparkline:
    /// `(values, percent change over the window)`. None below two points.
    pub async fn sparkline(&self, asset: &Asset, now: NaiveDateTime) -> Option<(Vec<f64>, f64)> {
        let history = self.asset_history(asset, ChartPeriod::OneMonth, now).await;
        if history.len() < 2 {
            return None;
        }

        let values: Vec<f64> = history.iter().map(|p| p.value).collect();
        let start = values[0];
        let end = values[values.len() - 1];
        let percent = if start != 0.0 {
            (end - start) / start * 100.0
        } else {
            0.0
        };
        Some((values, percent))
    }
}

/// Half-hour flat line across the onshore session (09:30–15:00) at the
/// last known value. Empty when no value is known at all.
fn synthesize_flat_line(asset: &Asset) -> Vec<HistoryPoint> {
    let value = if asset.current_value > 0.0 {
        asset.current_value
    } else if asset.yesterday_value > 0.0 {
        asset.yesterday_value
    } else {
        return Vec::new();
    };

    let mut points = Vec::new();
    let mut t = NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default();
    let close = NaiveTime::from_hms_opt(15, 0, 0).unwrap_or_default();
    loop {
        points.push(HistoryPoint::new(t.format("%H:%M").to_string(), value));
        if t >= close {
            break;
        }
        t += chrono::Duration::minutes(30);
    }
    points
}
