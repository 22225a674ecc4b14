use chrono::NaiveDateTime;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

use crate::models::asset::{Asset, AssetCategory};
use crate::models::history::HistoryPoint;
use crate::models::quote::AssetUpdate;
use crate::providers::traits::{ExchangeQuoteProvider, FundEstimateProvider};

use super::history;
use super::session_clock::session_state;

/// Per-instrument fallback fetches run at most this many at a time.
const FALLBACK_CONCURRENCY: usize = 10;

/// Links a derived gold asset to the primary quote it is computed from.
///
/// The secondary asset has no independent feed; each cycle its value is
/// re-derived from the primary's intraday ratio, modeling a currency/unit
/// converted gold quote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoldLink {
    pub primary_id: String,
    pub secondary_id: String,
}

/// The reconciliation and merge engine.
///
/// One `reconcile` call is one refresh cycle: fan out to the quote feeds
/// for every held asset, collect at most one partial update per asset, and
/// merge the updates into the canonical list. Per-instrument failures
/// leave that asset unchanged and never disturb its siblings.
pub struct RefreshEngine {
    funds: Arc<dyn FundEstimateProvider>,
    quotes: Arc<dyn ExchangeQuoteProvider>,
    /// Routing codes per batch request (bounds URL size)
    batch_size: usize,
    gold_link: Option<GoldLink>,
}

impl RefreshEngine {
    pub fn new(
        funds: Arc<dyn FundEstimateProvider>,
        quotes: Arc<dyn ExchangeQuoteProvider>,
    ) -> Self {
        Self {
            funds,
            quotes,
            batch_size: 20,
            gold_link: None,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_gold_link(mut self, link: GoldLink) -> Self {
        self.gold_link = Some(link);
        self
    }

    pub fn set_gold_link(&mut self, link: Option<GoldLink>) {
        self.gold_link = link;
    }

    /// Run one refresh cycle over the asset list, in place.
    ///
    /// Updates merge field-by-field (absent fields never overwrite), and
    /// when `update_history` is set each updated asset in an active session
    /// gets its intraday series extended. Assets with no update keep their
    /// prior state — never dropped, never zeroed.
    pub async fn reconcile(&self, assets: &mut [Asset], update_history: bool, now: NaiveDateTime) {
        let mut updates: HashMap<String, AssetUpdate> = HashMap::new();

        self.collect_fund_updates(assets, &mut updates).await;
        self.collect_market_updates(assets, &mut updates).await;
        self.derive_gold(assets, &mut updates);

        let today = now.date();
        for asset in assets.iter_mut() {
            let Some(update) = updates.remove(&asset.id) else {
                continue;
            };
            asset.apply_update(&update);

            if update_history {
                if let Some(value) = update.current_value {
                    if session_state(asset, now).is_trading {
                        let point = HistoryPoint::new(history::minute_label(now), value);
                        history::append_or_replace(asset, point, today);
                    }
                }
            }
        }
    }

    /// Funds go through the estimation feed, one call per fund, all
    /// concurrent. Yesterday's value is back-derived from the estimated
    /// growth rate when the ratio is computable.
    async fn collect_fund_updates(&self, assets: &[Asset], updates: &mut HashMap<String, AssetUpdate>) {
        let jobs = assets
            .iter()
            .filter(|a| a.category == AssetCategory::Fund)
            .map(|a| {
                let id = a.id.clone();
                let code = a.routing_code().to_string();
                async move { (id, self.funds.fund_estimate(&code).await) }
            });

        for (id, estimate) in join_all(jobs).await {
            let Some(estimate) = estimate else { continue };
            updates.insert(
                id,
                AssetUpdate {
                    current_value: Some(estimate.price),
                    yesterday_value: estimate.derived_yesterday_value(),
                    unit_nav: estimate.unit_nav,
                    time: Some(estimate.time),
                    ..AssetUpdate::default()
                },
            );
        }
    }

    /// Market instruments (everything non-fund) go through the batch quote
    /// feed in `batch_size` chunks; anything the batch response misses gets
    /// one single-instrument fallback fetch, bounded concurrency.
    async fn collect_market_updates(&self, assets: &[Asset], updates: &mut HashMap<String, AssetUpdate>) {
        // Routing code → asset ids. Several assets may share a feed code.
        let mut by_code: HashMap<String, Vec<String>> = HashMap::new();
        for asset in assets.iter().filter(|a| a.category != AssetCategory::Fund) {
            by_code
                .entry(asset.routing_code().to_string())
                .or_default()
                .push(asset.id.clone());
        }
        if by_code.is_empty() {
            return;
        }

        let codes: Vec<String> = by_code.keys().cloned().collect();
        for chunk in codes.chunks(self.batch_size) {
            let batch = self.quotes.batch_quotes(chunk).await;
            for (code, update) in batch {
                if let Some(ids) = by_code.get(&code) {
                    for id in ids {
                        updates.insert(id.clone(), update.clone());
                    }
                }
            }
        }

        // Batch-miss fallback, one single fetch per missing instrument.
        let missing: Vec<(&String, &Vec<String>)> = by_code
            .iter()
            .filter(|(_, ids)| ids.iter().all(|id| !updates.contains_key(id)))
            .collect();
        if missing.is_empty() {
            return;
        }
        debug!("fallback fetch for {} instruments missed by batch", missing.len());

        let singles: Vec<(&Vec<String>, Option<AssetUpdate>)> = stream::iter(missing)
            .map(|(code, ids)| async move { (ids, self.quotes.single_quote(code).await) })
            .buffer_unordered(FALLBACK_CONCURRENCY)
            .collect()
            .await;

        for (ids, update) in singles {
            let Some(update) = update else { continue };
            for id in ids {
                updates.insert(id.clone(), update.clone());
            }
        }
    }

    /// Cross-asset derivation for the linked gold pair: the secondary's
    /// value tracks the primary's intraday ratio whenever both ratio terms
    /// are non-zero.
    fn derive_gold(&self, assets: &[Asset], updates: &mut HashMap<String, AssetUpdate>) {
        let Some(link) = &self.gold_link else { return };
        let Some(primary) = assets.iter().find(|a| a.id == link.primary_id) else {
            return;
        };
        let Some(secondary) = assets.iter().find(|a| a.id == link.secondary_id) else {
            return;
        };

        let primary_update = updates.get(&primary.id);
        let current = primary_update
            .and_then(|u| u.current_value)
            .unwrap_or(primary.current_value);
        let previous = primary_update
            .and_then(|u| u.yesterday_value)
            .unwrap_or(primary.yesterday_value);
        if current == 0.0 || previous == 0.0 {
            return;
        }

        let time = primary_update
            .and_then(|u| u.time.clone())
            .or_else(|| secondary.time.clone());
        updates.insert(
            secondary.id.clone(),
            AssetUpdate {
                current_value: Some(secondary.yesterday_value * (current / previous)),
                time,
                ..AssetUpdate::default()
            },
        );
    }
}
