pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use log::info;

use errors::CoreError;
use models::{
    asset::{Asset, AssetCategory},
    history::{ChartPeriod, HistoryPoint},
    portfolio::PortfolioTotals,
    quote::SearchResult,
    settings::Settings,
};
use providers::{
    exchange_quote::EastMoneyQuoteProvider,
    fund_estimate::EastMoneyFundProvider,
    fund_holdings::EastMoneyHoldingsProvider,
    fund_search::EastMoneySearchProvider,
    market_history::EastMoneyHistoryProvider,
    traits::{
        ExchangeQuoteProvider, FundEstimateProvider, HistoryProvider, HoldingsProvider,
        SearchProvider,
    },
};
use services::{
    chart::ChartService,
    history,
    portfolio,
    refresh::{GoldLink, RefreshEngine},
    scheduler::RefreshScheduler,
    session_clock::{session_state, SessionState},
};
use storage::{store::KvStore, sync::SyncService};

/// Main entry point for the fund-watch core library.
///
/// Owns the canonical asset list — the single source of truth during a
/// session — plus the refresh machinery and the snapshot sync layer.
/// User actions (add, delete, position edits) apply synchronously through
/// `&mut self`, outside any cycle boundary, so they never interleave with
/// a cycle's merge.
#[must_use]
pub struct FundWatch {
    assets: Vec<Asset>,
    settings: Settings,
    engine: RefreshEngine,
    scheduler: RefreshScheduler,
    charts: ChartService,
    holdings_provider: Arc<dyn HoldingsProvider>,
    search_provider: Arc<dyn SearchProvider>,
    sync: SyncService,
}

impl std::fmt::Debug for FundWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FundWatch")
            .field("assets", &self.assets.len())
            .field("settings", &self.settings)
            .field("busy", &self.scheduler.is_busy())
            .finish()
    }
}

impl FundWatch {
    /// Build against the default quote feeds and the given snapshot store.
    pub fn new(settings: Settings, store: Arc<dyn KvStore>) -> Self {
        Self::with_providers(
            settings,
            Arc::new(EastMoneyFundProvider::new()),
            Arc::new(EastMoneyQuoteProvider::new()),
            Arc::new(EastMoneyHistoryProvider::new()),
            Arc::new(EastMoneyHoldingsProvider::new()),
            Arc::new(EastMoneySearchProvider::new()),
            store,
        )
    }

    /// Build with explicit provider implementations (tests, alternate feeds).
    pub fn with_providers(
        settings: Settings,
        funds: Arc<dyn FundEstimateProvider>,
        quotes: Arc<dyn ExchangeQuoteProvider>,
        histories: Arc<dyn HistoryProvider>,
        holdings: Arc<dyn HoldingsProvider>,
        search: Arc<dyn SearchProvider>,
        store: Arc<dyn KvStore>,
    ) -> Self {
        let engine = RefreshEngine::new(funds, quotes).with_batch_size(settings.batch_size);
        let scheduler = RefreshScheduler::new(Duration::from_millis(settings.refresh_interval_ms));
        let sync = SyncService::new(
            store,
            &settings.user_id,
            Duration::from_millis(settings.flush_interval_ms),
        );
        Self {
            assets: Vec::new(),
            settings,
            engine,
            scheduler,
            charts: ChartService::new(histories),
            holdings_provider: holdings,
            search_provider: search,
            sync,
        }
    }

    fn now() -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    // ── Session Lifecycle ───────────────────────────────────────────

    /// Load the stored snapshot. The remote copy wins over whatever the
    /// caller seeded locally whenever it is non-empty. Stale intraday
    /// series from previous sessions are cleared on the way in.
    pub async fn load(&mut self) -> Result<(), CoreError> {
        if let Some(remote) = self.sync.load().await? {
            info!("loaded {} assets from snapshot store", remote.len());
            self.assets = remote;
        }
        history::clear_stale(&mut self.assets, Self::now().date());
        Ok(())
    }

    /// Flush the snapshot if dirty and the debounce window elapsed.
    pub async fn maybe_flush(&mut self) -> bool {
        self.sync.maybe_flush(&self.assets).await
    }

    /// Flush the snapshot unconditionally.
    pub async fn flush_now(&mut self) -> Result<(), CoreError> {
        self.sync.flush_now(&self.assets).await
    }

    /// Stop the refresh loop. Pending timers are cancelled; in-flight
    /// fetches complete and their results are discarded.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }

    // ── Refresh Loop ────────────────────────────────────────────────

    /// Run one reconciliation cycle now. Serialized against any cycle
    /// already in flight.
    pub async fn refresh(&mut self, update_history: bool) {
        let engine = &self.engine;
        let scheduler = &self.scheduler;
        let assets = &mut self.assets;
        let now = Self::now();
        scheduler
            .run_cycle(|| engine.reconcile(assets, update_history, now))
            .await;
        self.sync.mark_dirty();
    }

    /// Drive the refresh loop until shutdown: an immediate cycle, then one
    /// per interval (or per manual trigger when the interval is zero),
    /// flushing the snapshot along the way.
    pub async fn run(&mut self, update_history: bool) {
        loop {
            self.refresh(update_history).await;
            self.maybe_flush().await;
            if !self.scheduler.wait_next().await {
                break;
            }
        }
    }

    /// Request an immediate cycle from a running loop.
    pub fn trigger_refresh(&self) {
        self.scheduler.trigger();
    }

    /// True while a cycle's fetch+merge is in flight (UI affordance only).
    pub fn is_refreshing(&self) -> bool {
        self.scheduler.is_busy()
    }

    // ── Asset Management ────────────────────────────────────────────

    #[must_use]
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    #[must_use]
    pub fn asset(&self, id: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }

    /// Search the instrument feed for new assets to track.
    pub async fn search(&self, query: &str) -> Vec<SearchResult> {
        self.search_provider.search(query).await
    }

    /// Add an asset from a search result and force-fetch it once so it
    /// shows live values immediately instead of zeros.
    pub async fn add_asset(&mut self, result: &SearchResult) -> Result<(), CoreError> {
        if self.asset(&result.code).is_some() {
            return Err(CoreError::ValidationError(format!(
                "asset {} is already tracked",
                result.code
            )));
        }

        let mut asset = Asset::skeleton(
            result.code.clone(),
            result.name.clone(),
            result.category,
            result.api_code.clone(),
        );
        asset.kind = result.kind.clone();
        self.assets.push(asset);

        self.refresh(false).await;

        // Seed a first history point so the chart has something to draw.
        let now = Self::now();
        if let Some(asset) = self.assets.iter_mut().find(|a| a.id == result.code) {
            history::backfill_if_empty(asset, now);
        }
        Ok(())
    }

    /// Remove a tracked asset. The next cycle simply skips the absent id.
    pub fn remove_asset(&mut self, id: &str) -> Result<Asset, CoreError> {
        let idx = self
            .assets
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| CoreError::AssetNotFound(id.to_string()))?;
        let removed = self.assets.remove(idx);
        self.sync.mark_dirty();
        Ok(removed)
    }

    /// Designate the gold pair whose secondary value is derived from the
    /// primary's intraday ratio.
    pub fn link_gold(&mut self, primary_id: &str, secondary_id: &str) {
        self.engine.set_gold_link(Some(GoldLink {
            primary_id: primary_id.to_string(),
            secondary_id: secondary_id.to_string(),
        }));
    }

    // ── Positions & Valuation ───────────────────────────────────────

    /// Record an additional buy with weighted-average cost update.
    pub fn add_position(
        &mut self,
        id: &str,
        gross_amount: f64,
        price: f64,
        fee_rate_percent: f64,
    ) -> Result<(), CoreError> {
        let asset = self.asset_mut(id)?;
        portfolio::apply_buy(asset, gross_amount, price, fee_rate_percent)?;
        self.sync.mark_dirty();
        Ok(())
    }

    /// Override an asset's position with absolute values.
    pub fn set_position(&mut self, id: &str, shares: f64, cost_price: f64) -> Result<(), CoreError> {
        let asset = self.asset_mut(id)?;
        portfolio::set_position(asset, shares, cost_price)?;
        self.sync.mark_dirty();
        Ok(())
    }

    /// Drop an asset's position.
    pub fn clear_position(&mut self, id: &str) -> Result<(), CoreError> {
        let asset = self.asset_mut(id)?;
        portfolio::clear_position(asset);
        self.sync.mark_dirty();
        Ok(())
    }

    /// Portfolio-level market value, cost basis, and P&L.
    #[must_use]
    pub fn totals(&self) -> PortfolioTotals {
        portfolio::portfolio_totals(&self.assets)
    }

    /// One asset's unrealized `(pnl, pnl_percent)`; None without a position.
    pub fn asset_pnl(&self, id: &str) -> Result<Option<(f64, f64)>, CoreError> {
        let asset = self
            .asset(id)
            .ok_or_else(|| CoreError::AssetNotFound(id.to_string()))?;
        Ok(portfolio::asset_pnl(asset))
    }

    // ── Display Derivations ─────────────────────────────────────────

    /// Trading-session state for one asset at the current wall clock.
    pub fn session_state(&self, id: &str) -> Result<SessionState, CoreError> {
        let asset = self
            .asset(id)
            .ok_or_else(|| CoreError::AssetNotFound(id.to_string()))?;
        Ok(session_state(asset, Self::now()))
    }

    /// Value series for one asset and chart period.
    pub async fn asset_history(
        &self,
        id: &str,
        period: ChartPeriod,
    ) -> Result<Vec<HistoryPoint>, CoreError> {
        let asset = self
            .asset(id)
            .ok_or_else(|| CoreError::AssetNotFound(id.to_string()))?;
        Ok(self.charts.asset_history(asset, period, Self::now()).await)
    }

    /// Fetch and cache an asset's sparkline if it doesn't have one yet.
    pub async fn ensure_sparkline(&mut self, id: &str) -> Result<(), CoreError> {
        let asset = self
            .asset(id)
            .ok_or_else(|| CoreError::AssetNotFound(id.to_string()))?;
        if !asset.sparkline.is_empty() {
            return Ok(());
        }
        let fetched = self.charts.sparkline(asset, Self::now()).await;
        if let Some((values, percent)) = fetched {
            let asset = self.asset_mut(id)?;
            asset.sparkline = values;
            asset.month_change_percent = Some(percent);
            self.sync.mark_dirty();
        }
        Ok(())
    }

    /// Fetch a fund's constituent list, once per asset lifetime unless the
    /// previous attempt came back empty.
    pub async fn ensure_holdings(&mut self, id: &str) -> Result<(), CoreError> {
        let asset = self
            .asset(id)
            .ok_or_else(|| CoreError::AssetNotFound(id.to_string()))?;
        if asset.category != AssetCategory::Fund || !asset.holdings.is_empty() {
            return Ok(());
        }
        let code = asset.code.clone();
        let holdings = self.holdings_provider.fund_holdings(&code).await;
        if !holdings.is_empty() {
            let asset = self.asset_mut(id)?;
            asset.holdings = holdings;
            self.sync.mark_dirty();
        }
        Ok(())
    }

    /// The last snapshot-flush failure, for a one-line status indicator.
    #[must_use]
    pub fn sync_error(&self) -> Option<&str> {
        self.sync.last_error()
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ── Internal ────────────────────────────────────────────────────

    fn asset_mut(&mut self, id: &str) -> Result<&mut Asset, CoreError> {
        self.assets
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| CoreError::AssetNotFound(id.to_string()))
    }
}
