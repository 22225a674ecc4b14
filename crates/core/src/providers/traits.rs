use async_trait::async_trait;
use std::collections::HashMap;

use crate::models::asset::Holding;
use crate::models::history::{ChartPeriod, HistoryPoint};
use crate::models::quote::{AssetUpdate, FundEstimate, SearchResult};

/// Trait seams for all quote data feeds.
///
/// Every method resolves to "no data" (None / empty) on timeout, network
/// failure, or a payload the adapter cannot parse — transient provider
/// trouble is recovered inside the adapter and never propagates, so one
/// dead feed cannot abort the other fetches in a refresh cycle. Stale but
/// valid data simply stays on screen.

/// Open-end fund estimation feed: low-frequency estimated NAV plus the
/// previous official unit NAV.
#[async_trait]
pub trait FundEstimateProvider: Send + Sync {
    async fn fund_estimate(&self, code: &str) -> Option<FundEstimate>;
}

/// Exchange quote feed for stocks, ETFs, indices, and spot gold.
#[async_trait]
pub trait ExchangeQuoteProvider: Send + Sync {
    /// Fetch quotes for a batch of routing codes in one request.
    /// The result is keyed by routing code; absent keys are batch misses
    /// the caller should retry via `single_quote`.
    async fn batch_quotes(&self, codes: &[String]) -> HashMap<String, AssetUpdate>;

    /// Fetch one instrument's quote. Fallback path for batch misses —
    /// indices in particular are unreliable in the batch endpoint.
    async fn single_quote(&self, code: &str) -> Option<AssetUpdate>;
}

/// Historical series feeds: intraday ticks, OHLC-derived candle closes,
/// and the long-run fund NAV series (funds are not exchange-traded, so
/// their daily history comes from a separate feed).
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Today's full session tick series, points labeled `HH:MM`.
    async fn intraday(&self, code: &str) -> Vec<HistoryPoint>;

    /// Daily/weekly/monthly close series for the period's lookback count.
    async fn candles(&self, code: &str, period: ChartPeriod) -> Vec<HistoryPoint>;

    /// Long-run daily NAV series for an open-end fund, most recent `count`.
    async fn fund_nav_history(&self, code: &str, count: usize) -> Vec<HistoryPoint>;
}

/// Fund constituent feed: top holdings with weight percentages.
#[async_trait]
pub trait HoldingsProvider: Send + Sync {
    async fn fund_holdings(&self, code: &str) -> Vec<Holding>;
}

/// Instrument search feed, used to build new asset skeletons.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Vec<SearchResult>;
}
