// ═══════════════════════════════════════════════════════════════════
// Service Tests — SessionClock, History Accumulator, Portfolio,
// RefreshEngine, RefreshScheduler, ChartService
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fund_watch_core::models::asset::{Asset, AssetCategory};
use fund_watch_core::models::history::{ChartPeriod, HistoryPoint};
use fund_watch_core::models::quote::{AssetUpdate, FundEstimate};
use fund_watch_core::providers::traits::{
    ExchangeQuoteProvider, FundEstimateProvider, HistoryProvider,
};
use fund_watch_core::services::chart::ChartService;
use fund_watch_core::services::history;
use fund_watch_core::services::portfolio;
use fund_watch_core::services::refresh::{GoldLink, RefreshEngine};
use fund_watch_core::services::scheduler::RefreshScheduler;
use fund_watch_core::services::session_clock::{session_state, SessionLabel};

// ═══════════════════════════════════════════════════════════════════
// Helpers & Mock Providers
// ═══════════════════════════════════════════════════════════════════

fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(hh, mm, 0)
        .unwrap()
}

// 2026-08-28 is a Friday.
fn friday(hh: u32, mm: u32) -> NaiveDateTime {
    at(2026, 8, 28, hh, mm)
}

fn fund(code: &str) -> Asset {
    Asset::skeleton(code, format!("Fund {code}"), AssetCategory::Fund, None)
}

fn stock(code: &str, api_code: &str) -> Asset {
    Asset::skeleton(code, format!("Stock {code}"), AssetCategory::Stock, Some(api_code.into()))
}

struct MockFundProvider {
    estimates: HashMap<String, FundEstimate>,
    calls: AtomicUsize,
}

impl MockFundProvider {
    fn new() -> Self {
        Self {
            estimates: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    fn with(mut self, code: &str, price: f64, growth_percent: f64) -> Self {
        self.estimates.insert(
            code.to_string(),
            FundEstimate {
                price,
                growth_percent,
                unit_nav: None,
                time: "2026-08-28 14:00:00".into(),
            },
        );
        self
    }
}

#[async_trait]
impl FundEstimateProvider for MockFundProvider {
    async fn fund_estimate(&self, code: &str) -> Option<FundEstimate> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.estimates.get(code).cloned()
    }
}

struct MockQuoteProvider {
    batch: HashMap<String, AssetUpdate>,
    singles: HashMap<String, AssetUpdate>,
    single_calls: AtomicUsize,
}

impl MockQuoteProvider {
    fn new() -> Self {
        Self {
            batch: HashMap::new(),
            singles: HashMap::new(),
            single_calls: AtomicUsize::new(0),
        }
    }

    fn with_batch(mut self, code: &str, current: f64, yesterday: f64) -> Self {
        self.batch.insert(
            code.to_string(),
            AssetUpdate {
                current_value: Some(current),
                yesterday_value: Some(yesterday),
                time: Some("10:05".into()),
                ..AssetUpdate::default()
            },
        );
        self
    }

    fn with_single(mut self, code: &str, current: f64, yesterday: f64) -> Self {
        self.singles.insert(
            code.to_string(),
            AssetUpdate {
                current_value: Some(current),
                yesterday_value: Some(yesterday),
                ..AssetUpdate::default()
            },
        );
        self
    }
}

#[async_trait]
impl ExchangeQuoteProvider for MockQuoteProvider {
    async fn batch_quotes(&self, codes: &[String]) -> HashMap<String, AssetUpdate> {
        codes
            .iter()
            .filter_map(|c| self.batch.get(c).map(|u| (c.clone(), u.clone())))
            .collect()
    }

    async fn single_quote(&self, code: &str) -> Option<AssetUpdate> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        self.singles.get(code).cloned()
    }
}

fn engine(funds: MockFundProvider, quotes: MockQuoteProvider) -> (RefreshEngine, Arc<MockFundProvider>, Arc<MockQuoteProvider>) {
    let funds = Arc::new(funds);
    let quotes = Arc::new(quotes);
    (
        RefreshEngine::new(funds.clone(), quotes.clone()),
        funds,
        quotes,
    )
}

// ═══════════════════════════════════════════════════════════════════
// Session Clock
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_onshore_session_boundaries() {
    let asset = stock("600519", "sh600519");

    // Morning close is inclusive; one minute later is the lunch break.
    assert!(session_state(&asset, friday(11, 30)).is_trading);
    let lunch = session_state(&asset, friday(11, 31));
    assert!(!lunch.is_trading);
    assert_eq!(lunch.label, SessionLabel::LunchBreak);
    assert!(session_state(&asset, friday(13, 0)).is_trading);

    assert!(session_state(&asset, friday(15, 0)).is_trading);
    assert_eq!(session_state(&asset, friday(15, 1)).label, SessionLabel::Closed);
    assert_eq!(session_state(&asset, friday(9, 0)).label, SessionLabel::PreOpen);
    assert!(session_state(&asset, friday(9, 30)).is_trading);
}

#[test]
fn test_hk_session_later_close() {
    let mut asset = stock("00700", "hk00700");
    asset.tags = vec!["HK".into()];

    assert!(session_state(&asset, friday(15, 30)).is_trading);
    assert!(session_state(&asset, friday(16, 0)).is_trading);
    assert_eq!(session_state(&asset, friday(16, 1)).label, SessionLabel::Closed);
}

#[test]
fn test_us_overnight_session() {
    let mut asset = stock("AAPL", "usAAPL");
    asset.tags = vec!["US".into()];

    assert!(session_state(&asset, friday(21, 30)).is_trading);
    assert!(session_state(&asset, friday(23, 59)).is_trading);
    assert!(!session_state(&asset, friday(12, 0)).is_trading);
    assert!(!session_state(&asset, friday(21, 29)).is_trading);

    // Saturday before 04:00 still belongs to Friday's session.
    assert!(session_state(&asset, at(2026, 8, 29, 2, 0)).is_trading);
    assert!(session_state(&asset, at(2026, 8, 29, 4, 0)).is_trading);
    assert!(!session_state(&asset, at(2026, 8, 29, 4, 1)).is_trading);
    assert!(!session_state(&asset, at(2026, 8, 29, 22, 0)).is_trading);
    // Sunday is fully closed, even in the early hours.
    assert!(!session_state(&asset, at(2026, 8, 30, 2, 0)).is_trading);
}

#[test]
fn test_gold_fluctuates_on_weekdays() {
    let gold = Asset::skeleton("XAU", "Spot Gold", AssetCategory::Gold, Some("100.XAU".into()));
    let state = session_state(&gold, friday(3, 0));
    assert!(state.is_trading);
    assert_eq!(state.label, SessionLabel::Fluctuating);

    assert!(!session_state(&gold, at(2026, 8, 29, 12, 0)).is_trading);
}

#[test]
fn test_weekend_closed_for_onshore() {
    let asset = stock("600519", "sh600519");
    assert_eq!(session_state(&asset, at(2026, 8, 29, 10, 0)).label, SessionLabel::Closed);
    assert_eq!(session_state(&asset, at(2026, 8, 30, 10, 0)).label, SessionLabel::Closed);
}

// ═══════════════════════════════════════════════════════════════════
// History Accumulator
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_append_then_replace_same_minute() {
    let mut asset = fund("000001");
    let today = friday(10, 0).date();

    history::append_or_replace(&mut asset, HistoryPoint::new("10:00", 1.50), today);
    history::append_or_replace(&mut asset, HistoryPoint::new("10:00", 1.51), today);

    assert_eq!(asset.history.len(), 1);
    assert!((asset.history[0].value - 1.51).abs() < 1e-9);
    assert_eq!(asset.last_history_date, Some(today));

    history::append_or_replace(&mut asset, HistoryPoint::new("10:01", 1.52), today);
    assert_eq!(asset.history.len(), 2);
}

#[test]
fn test_stale_series_cleared_on_first_point() {
    let mut asset = fund("000001");
    let yesterday = at(2026, 8, 27, 14, 0).date();
    let today = friday(10, 0).date();

    history::append_or_replace(&mut asset, HistoryPoint::new("14:00", 1.48), yesterday);
    history::append_or_replace(&mut asset, HistoryPoint::new("14:30", 1.49), yesterday);
    assert_eq!(asset.history.len(), 2);

    history::append_or_replace(&mut asset, HistoryPoint::new("09:31", 1.50), today);
    assert_eq!(asset.history.len(), 1);
    assert_eq!(asset.history[0].time, "09:31");
    assert_eq!(asset.last_history_date, Some(today));
}

#[test]
fn test_rollover_is_idempotent() {
    let mut asset = fund("000001");
    let today = friday(10, 0).date();

    history::append_or_replace(&mut asset, HistoryPoint::new("10:00", 1.50), today);
    let len_after_first = asset.history.len();
    history::append_or_replace(&mut asset, HistoryPoint::new("10:00", 1.50), today);
    assert_eq!(asset.history.len(), len_after_first);
}

#[test]
fn test_clear_stale_pass() {
    let today = friday(10, 0).date();
    let yesterday = at(2026, 8, 27, 14, 0).date();

    let mut fresh = fund("000001");
    fresh.history.push(HistoryPoint::new("09:31", 1.5));
    fresh.last_history_date = Some(today);

    let mut stale = fund("000002");
    stale.history.push(HistoryPoint::new("14:00", 2.0));
    stale.last_history_date = Some(yesterday);

    let mut assets = vec![fresh, stale];
    let cleared = history::clear_stale(&mut assets, today);

    assert_eq!(cleared, 1);
    assert_eq!(assets[0].history.len(), 1);
    assert!(assets[1].history.is_empty());
    assert_eq!(assets[1].last_history_date, Some(today));
}

#[test]
fn test_backfill_only_when_empty_and_valued() {
    let now = friday(10, 15);

    let mut asset = fund("000001");
    asset.current_value = 1.5;
    history::backfill_if_empty(&mut asset, now);
    assert_eq!(asset.history.len(), 1);
    assert_eq!(asset.history[0].time, "10:15");

    // Not repeated once a point exists.
    history::backfill_if_empty(&mut asset, now);
    assert_eq!(asset.history.len(), 1);

    // No value, no point.
    let mut empty = fund("000002");
    history::backfill_if_empty(&mut empty, now);
    assert!(empty.history.is_empty());
}

// ═══════════════════════════════════════════════════════════════════
// Portfolio Valuation
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_weighted_average_buy() {
    let mut asset = fund("000001");
    portfolio::set_position(&mut asset, 100.0, 1.5).unwrap();

    portfolio::apply_buy(&mut asset, 1000.0, 2.0, 0.0).unwrap();

    let position = asset.position.unwrap();
    assert!((position.shares - 600.0).abs() < 1e-9);
    // Cost basis carries the gross amount: (100*1.5 + 1000) / 600.
    assert!((position.cost_price - 1150.0 / 600.0).abs() < 1e-9);
}

#[test]
fn test_buy_fee_reduces_shares_not_cost() {
    let mut asset = fund("000001");
    portfolio::apply_buy(&mut asset, 1000.0, 2.0, 1.5).unwrap();

    let position = asset.position.unwrap();
    // net = 985, shares = 492.5, but the basis is the full 1000.
    assert!((position.shares - 492.5).abs() < 1e-9);
    assert!((position.shares * position.cost_price - 1000.0).abs() < 1e-9);
}

#[test]
fn test_buy_rejects_invalid_inputs_without_mutating() {
    let mut asset = fund("000001");
    portfolio::set_position(&mut asset, 100.0, 1.5).unwrap();
    let before = asset.position;

    assert!(portfolio::apply_buy(&mut asset, 0.0, 2.0, 0.0).is_err());
    assert!(portfolio::apply_buy(&mut asset, -100.0, 2.0, 0.0).is_err());
    assert!(portfolio::apply_buy(&mut asset, 1000.0, 0.0, 0.0).is_err());
    assert!(portfolio::apply_buy(&mut asset, 1000.0, 2.0, 100.0).is_err());
    assert!(portfolio::apply_buy(&mut asset, f64::NAN, 2.0, 0.0).is_err());

    assert_eq!(asset.position, before);
}

#[test]
fn test_positionless_portfolio_is_all_zeros() {
    let assets = vec![fund("000001"), stock("600519", "sh600519")];
    let totals = portfolio::portfolio_totals(&assets);
    assert_eq!(totals.market_value, 0.0);
    assert_eq!(totals.cost_basis, 0.0);
    assert_eq!(totals.pnl, 0.0);
    assert_eq!(totals.pnl_percent, 0.0);
}

#[test]
fn test_portfolio_totals() {
    let mut a = fund("000001");
    a.current_value = 2.0;
    portfolio::set_position(&mut a, 100.0, 1.5).unwrap();

    let mut b = stock("600519", "sh600519");
    b.current_value = 1500.0;
    portfolio::set_position(&mut b, 10.0, 1400.0).unwrap();

    // No position: contributes nothing.
    let mut c = fund("000002");
    c.current_value = 99.0;

    let totals = portfolio::portfolio_totals(&[a, b, c]);
    assert!((totals.market_value - (200.0 + 15000.0)).abs() < 1e-9);
    assert!((totals.cost_basis - (150.0 + 14000.0)).abs() < 1e-9);
    assert!((totals.pnl - 1050.0).abs() < 1e-9);
    assert!((totals.pnl_percent - 1050.0 / 14150.0 * 100.0).abs() < 1e-9);
}

#[test]
fn test_asset_pnl() {
    let mut asset = fund("000001");
    asset.current_value = 1.8;
    portfolio::set_position(&mut asset, 100.0, 1.5).unwrap();

    let (pnl, pnl_percent) = portfolio::asset_pnl(&asset).unwrap();
    assert!((pnl - 30.0).abs() < 1e-9);
    assert!((pnl_percent - 20.0).abs() < 1e-9);

    portfolio::clear_position(&mut asset);
    assert!(portfolio::asset_pnl(&asset).is_none());
}

// ═══════════════════════════════════════════════════════════════════
// RefreshEngine — reconcile
// ═══════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_fund_estimate_back_derives_yesterday() {
    let (engine, _, _) = engine(
        MockFundProvider::new().with("161725", 1.234, 2.5),
        MockQuoteProvider::new(),
    );
    let mut assets = vec![fund("161725")];

    engine.reconcile(&mut assets, false, friday(14, 0)).await;

    assert!((assets[0].current_value - 1.234).abs() < 1e-9);
    assert!((assets[0].yesterday_value - 1.234 / 1.025).abs() < 1e-9);
    assert_eq!(assets[0].time.as_deref(), Some("2026-08-28 14:00:00"));
}

#[tokio::test]
async fn test_failed_fetch_leaves_asset_untouched() {
    // Provider knows nothing about this fund.
    let (engine, _, _) = engine(MockFundProvider::new(), MockQuoteProvider::new());
    let mut assets = vec![fund("161725")];
    assets[0].current_value = 1.5;
    assets[0].yesterday_value = 1.4;
    assets[0].time = Some("2026-08-27 15:00:00".into());

    engine.reconcile(&mut assets, true, friday(14, 0)).await;

    assert!((assets[0].current_value - 1.5).abs() < 1e-9);
    assert!((assets[0].yesterday_value - 1.4).abs() < 1e-9);
    assert_eq!(assets[0].time.as_deref(), Some("2026-08-27 15:00:00"));
    assert!(assets[0].history.is_empty());
}

#[tokio::test]
async fn test_batch_miss_falls_back_to_exactly_one_single_fetch() {
    let quotes = MockQuoteProvider::new()
        .with_batch("sh600519", 1432.5, 1420.0)
        .with_single("sh000001", 3005.0, 2998.0);
    let (engine, _, quotes) = engine(MockFundProvider::new(), quotes);

    let mut assets = vec![
        stock("600519", "sh600519"),
        Asset::skeleton("000001", "SSE Index", AssetCategory::Index, Some("sh000001".into())),
    ];

    engine.reconcile(&mut assets, false, friday(10, 0)).await;

    // The batch hit needs no fallback; the miss gets exactly one.
    assert_eq!(quotes.single_calls.load(Ordering::SeqCst), 1);
    assert!((assets[0].current_value - 1432.5).abs() < 1e-9);
    assert!((assets[1].current_value - 3005.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_at_most_one_update_per_asset_per_cycle() {
    // Both the batch and the single path would answer; only one update may
    // reach the asset.
    let quotes = MockQuoteProvider::new()
        .with_batch("sh600519", 1432.5, 1420.0)
        .with_single("sh600519", 9999.0, 9999.0);
    let (engine, _, quotes) = engine(MockFundProvider::new(), quotes);
    let mut assets = vec![stock("600519", "sh600519")];

    engine.reconcile(&mut assets, false, friday(10, 0)).await;

    assert_eq!(quotes.single_calls.load(Ordering::SeqCst), 0);
    assert!((assets[0].current_value - 1432.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_history_gated_by_session() {
    let quotes = MockQuoteProvider::new().with_batch("sh600519", 1432.5, 1420.0);
    let (engine, _, _) = engine(MockFundProvider::new(), quotes);
    let mut assets = vec![stock("600519", "sh600519")];

    // During lunch break: value merges but the series stays empty.
    engine.reconcile(&mut assets, true, friday(12, 0)).await;
    assert!((assets[0].current_value - 1432.5).abs() < 1e-9);
    assert!(assets[0].history.is_empty());

    // In session: one point per cycle, same minute replaces.
    engine.reconcile(&mut assets, true, friday(10, 5)).await;
    engine.reconcile(&mut assets, true, friday(10, 5)).await;
    assert_eq!(assets[0].history.len(), 1);
    assert_eq!(assets[0].history[0].time, "10:05");
}

#[tokio::test]
async fn test_update_history_flag_off() {
    let quotes = MockQuoteProvider::new().with_batch("sh600519", 1432.5, 1420.0);
    let (engine, _, _) = engine(MockFundProvider::new(), quotes);
    let mut assets = vec![stock("600519", "sh600519")];

    engine.reconcile(&mut assets, false, friday(10, 5)).await;
    assert!(assets[0].history.is_empty());
}

#[tokio::test]
async fn test_gold_derivation_follows_primary_ratio() {
    let quotes = MockQuoteProvider::new().with_batch("100.XAU", 2100.0, 2000.0);
    let (engine, _, _) = engine(MockFundProvider::new(), quotes);
    let engine = engine.with_gold_link(GoldLink {
        primary_id: "XAU".into(),
        secondary_id: "AU9999".into(),
    });

    let mut primary = Asset::skeleton("XAU", "Spot Gold USD", AssetCategory::Gold, Some("100.XAU".into()));
    primary.yesterday_value = 2000.0;
    let mut secondary = Asset::skeleton("AU9999", "Spot Gold CNY", AssetCategory::Gold, None);
    secondary.current_value = 480.0;
    secondary.yesterday_value = 480.0;

    let mut assets = vec![primary, secondary];
    engine.reconcile(&mut assets, false, friday(10, 0)).await;

    // Secondary tracks the primary's +5% move.
    assert!((assets[1].current_value - 480.0 * 1.05).abs() < 1e-9);
    // Its own reference close is untouched.
    assert!((assets[1].yesterday_value - 480.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_gold_derivation_skipped_on_zero_terms() {
    let (engine, _, _) = engine(MockFundProvider::new(), MockQuoteProvider::new());
    let engine = engine.with_gold_link(GoldLink {
        primary_id: "XAU".into(),
        secondary_id: "AU9999".into(),
    });

    // Primary has no values yet; the derived asset must not move.
    let primary = Asset::skeleton("XAU", "Spot Gold USD", AssetCategory::Gold, Some("100.XAU".into()));
    let mut secondary = Asset::skeleton("AU9999", "Spot Gold CNY", AssetCategory::Gold, None);
    secondary.current_value = 480.0;
    secondary.yesterday_value = 480.0;

    let mut assets = vec![primary, secondary];
    engine.reconcile(&mut assets, false, friday(10, 0)).await;
    assert!((assets[1].current_value - 480.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_small_batch_size_still_covers_all_codes() {
    let quotes = MockQuoteProvider::new()
        .with_batch("sh600519", 1.0, 1.0)
        .with_batch("sz000858", 2.0, 2.0)
        .with_batch("sh000001", 3.0, 3.0);
    let funds = Arc::new(MockFundProvider::new());
    let quotes = Arc::new(quotes);
    let engine = RefreshEngine::new(funds, quotes).with_batch_size(1);

    let mut assets = vec![
        stock("600519", "sh600519"),
        stock("000858", "sz000858"),
        Asset::skeleton("000001", "SSE Index", AssetCategory::Index, Some("sh000001".into())),
    ];
    engine.reconcile(&mut assets, false, friday(10, 0)).await;

    for asset in &assets {
        assert!(asset.current_value > 0.0, "{} not updated", asset.code);
    }
}

// ═══════════════════════════════════════════════════════════════════
// RefreshScheduler
// ═══════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_run_cycle_tracks_busy_and_count() {
    let scheduler = RefreshScheduler::new(Duration::from_secs(60));
    assert!(!scheduler.is_busy());
    assert_eq!(scheduler.cycles_started(), 0);

    let out = scheduler.run_cycle(|| async { 42 }).await;
    assert_eq!(out, 42);
    assert!(!scheduler.is_busy());
    assert_eq!(scheduler.cycles_started(), 1);
}

#[tokio::test]
async fn test_cycles_are_serialized() {
    let scheduler = Arc::new(RefreshScheduler::new(Duration::from_secs(60)));
    let running = Arc::new(AtomicUsize::new(0));
    let overlap_seen = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let scheduler = scheduler.clone();
        let running = running.clone();
        let overlap_seen = overlap_seen.clone();
        handles.push(tokio::spawn(async move {
            scheduler
                .run_cycle(|| async move {
                    if running.fetch_add(1, Ordering::SeqCst) > 0 {
                        overlap_seen.fetch_add(1, Ordering::SeqCst);
                    }
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
                .await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(overlap_seen.load(Ordering::SeqCst), 0);
    assert_eq!(scheduler.cycles_started(), 4);
}

#[tokio::test]
async fn test_manual_trigger_wakes_waiter() {
    let scheduler = Arc::new(RefreshScheduler::new(Duration::ZERO));
    let waiter = scheduler.clone();
    let handle = tokio::spawn(async move { waiter.wait_next().await });

    tokio::time::sleep(Duration::from_millis(5)).await;
    scheduler.trigger();
    assert!(handle.await.unwrap());
}

#[tokio::test]
async fn test_shutdown_stops_waiting() {
    let scheduler = Arc::new(RefreshScheduler::new(Duration::from_secs(3600)));
    let waiter = scheduler.clone();
    let handle = tokio::spawn(async move { waiter.wait_next().await });

    tokio::time::sleep(Duration::from_millis(5)).await;
    scheduler.shutdown();
    assert!(!handle.await.unwrap());
    assert!(scheduler.is_shut_down());

    // After shutdown, waiting returns immediately.
    assert!(!scheduler.wait_next().await);
}

#[tokio::test]
async fn test_interval_elapses() {
    let scheduler = RefreshScheduler::new(Duration::from_millis(10));
    assert!(scheduler.wait_next().await);
}

// ═══════════════════════════════════════════════════════════════════
// ChartService
// ═══════════════════════════════════════════════════════════════════

struct MockHistoryProvider {
    intraday: Vec<HistoryPoint>,
    candles: Vec<HistoryPoint>,
    nav: Vec<HistoryPoint>,
}

impl MockHistoryProvider {
    fn empty() -> Self {
        Self {
            intraday: Vec::new(),
            candles: Vec::new(),
            nav: Vec::new(),
        }
    }
}

#[async_trait]
impl HistoryProvider for MockHistoryProvider {
    async fn intraday(&self, _code: &str) -> Vec<HistoryPoint> {
        self.intraday.clone()
    }

    async fn candles(&self, _code: &str, _period: ChartPeriod) -> Vec<HistoryPoint> {
        self.candles.clone()
    }

    async fn fund_nav_history(&self, _code: &str, count: usize) -> Vec<HistoryPoint> {
        let skip = self.nav.len().saturating_sub(count);
        self.nav[skip..].to_vec()
    }
}

#[tokio::test]
async fn test_funds_use_nav_feed_for_daily_history() {
    let mut provider = MockHistoryProvider::empty();
    provider.nav = (0..30)
        .map(|i| HistoryPoint::new(format!("2026-07-{:02}", i + 1), 1.0 + i as f64 * 0.01))
        .collect();
    provider.candles = vec![HistoryPoint::new("should-not-be-used", 0.0)];
    let charts = ChartService::new(Arc::new(provider));

    let asset = fund("161725");
    let points = charts.asset_history(&asset, ChartPeriod::OneMonth, friday(14, 0)).await;
    // OneMonth asks for 22 points; NAV feed honors the count.
    assert_eq!(points.len(), 22);
    assert!(points[0].time.starts_with("2026-07"));
}

#[tokio::test]
async fn test_stocks_use_candles() {
    let mut provider = MockHistoryProvider::empty();
    provider.candles = vec![
        HistoryPoint::new("2026-08-27", 12.1),
        HistoryPoint::new("2026-08-28", 12.3),
    ];
    let charts = ChartService::new(Arc::new(provider));

    let asset = stock("600519", "sh600519");
    let points = charts.asset_history(&asset, ChartPeriod::Daily, friday(14, 0)).await;
    assert_eq!(points.len(), 2);
    assert_eq!(points[1].time, "2026-08-28");
}

#[tokio::test]
async fn test_otc_fund_junk_intraday_rejected_in_favor_of_local_history() {
    // A single point for an OTC fund is the feed's junk answer.
    let mut provider = MockHistoryProvider::empty();
    provider.intraday = vec![HistoryPoint::new("09:30", 1.0)];
    let charts = ChartService::new(Arc::new(provider));

    // 970188 has no exchange routing, so the junk guard applies.
    let now = friday(14, 0);
    let mut asset = fund("970188");
    asset.history = vec![
        HistoryPoint::new("09:31", 1.50),
        HistoryPoint::new("09:32", 1.51),
    ];
    asset.last_history_date = Some(now.date());

    let points = charts.asset_history(&asset, ChartPeriod::Intraday, now).await;
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].time, "09:31");
}

#[tokio::test]
async fn test_intraday_synthesizes_flat_line_as_last_resort() {
    let charts = ChartService::new(Arc::new(MockHistoryProvider::empty()));

    let mut asset = fund("161725");
    asset.current_value = 1.5;

    let points = charts.asset_history(&asset, ChartPeriod::Intraday, friday(14, 0)).await;
    assert!(!points.is_empty());
    assert_eq!(points[0].time, "09:30");
    assert!(points.iter().all(|p| (p.value - 1.5).abs() < 1e-9));

    // With no value at all the chart is genuinely empty.
    let bare = fund("000002");
    let points = charts.asset_history(&bare, ChartPeriod::Intraday, friday(14, 0)).await;
    assert!(points.is_empty());
}

#[tokio::test]
async fn test_sparkline_change_percent() {
    let mut provider = MockHistoryProvider::empty();
    provider.nav = vec![
        HistoryPoint::new("2026-08-01", 1.00),
        HistoryPoint::new("2026-08-15", 1.05),
        HistoryPoint::new("2026-08-28", 1.10),
    ];
    let charts = ChartService::new(Arc::new(provider));

    let asset = fund("161725");
    let (values, percent) = charts.sparkline(&asset, friday(14, 0)).await.unwrap();
    assert_eq!(values.len(), 3);
    assert!((percent - 10.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_sparkline_needs_two_points() {
    let mut provider = MockHistoryProvider::empty();
    provider.nav = vec![HistoryPoint::new("2026-08-28", 1.10)];
    let charts = ChartService::new(Arc::new(provider));

    let asset = fund("161725");
    assert!(charts.sparkline(&asset, friday(14, 0)).await.is_none());
}
