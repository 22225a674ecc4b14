use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::history::{ChartPeriod, HistoryPoint};

use super::payload::{extract_js_array, unwrap_jsonp};
use super::routing::secid_for;
use super::traits::HistoryProvider;

const TRENDS_URL: &str = "https://push2.eastmoney.com/api/qt/stock/trends2/get";
const KLINE_URL: &str = "https://push2his.eastmoney.com/api/qt/stock/kline/get";
const FUND_NAV_URL: &str = "https://fund.eastmoney.com/pingzhongdata";

/// Adapter for the historical series feeds.
///
/// Three distinct upstreams: `trends2` for the intraday tick series,
/// `kline` for daily/weekly/monthly candles (close column only), and the
/// `pingzhongdata` JavaScript bundle for the long-run fund NAV series —
/// open-end funds are not exchange-traded, so the candle feed cannot serve
/// them.
pub struct EastMoneyHistoryProvider {
    client: Client,
}

impl EastMoneyHistoryProvider {
    pub fn new() -> Self {
        let builder = Client::builder().timeout(Duration::from_secs(5));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
        }
    }

    async fn fetch_intraday(&self, code: &str) -> Result<Vec<HistoryPoint>, CoreError> {
        let secid = match secid_for(code) {
            Some(s) => s,
            None => return Ok(Vec::new()),
        };
        let ts = chrono::Utc::now().timestamp_millis();
        let url =
            format!("{TRENDS_URL}?secid={secid}&fields1=f1,f2,f3&fields2=f51,f53&iscr=0&ndays=1&_={ts}");
        let body = self.client.get(&url).send().await?.text().await?;
        Ok(parse_trends(&body))
    }

    async fn fetch_candles(&self, code: &str, period: ChartPeriod) -> Result<Vec<HistoryPoint>, CoreError> {
        let secid = match secid_for(code) {
            Some(s) => s,
            None => return Ok(Vec::new()),
        };
        let (klt, count) = period.candle_params();
        let ts = chrono::Utc::now().timestamp_millis();
        // fqt=1 requests forward-adjusted prices; f51,f53 = date,close
        let url = format!(
            "{KLINE_URL}?secid={secid}&fields1=f1,f2,f3&fields2=f51,f53&klt={klt}&fqt=1&end=20500101&lmt={count}&_={ts}"
        );
        let body = self.client.get(&url).send().await?.text().await?;
        Ok(parse_klines(&body))
    }

    async fn fetch_fund_nav(&self, code: &str, count: usize) -> Result<Vec<HistoryPoint>, CoreError> {
        let url = format!("{FUND_NAV_URL}/{code}.js");
        let body = self.client.get(&url).send().await?.text().await?;
        Ok(parse_nav_trend(&body, count))
    }
}

impl Default for EastMoneyHistoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

// ── Payload parsing ─────────────────────────────────────────────────

/// Parse the intraday tick payload. Rows look like
/// `"2024-02-02 09:30,12.34,…"`; keep the `HH:MM` label and the price.
pub fn parse_trends(body: &str) -> Vec<HistoryPoint> {
    let inner = unwrap_jsonp(body).unwrap_or(body);
    let parsed: serde_json::Value = match serde_json::from_str(inner) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };
    let Some(rows) = parsed.pointer("/data/trends").and_then(|v| v.as_array()) else {
        return Vec::new();
    };

    rows.iter()
        .filter_map(|row| {
            let row = row.as_str()?;
            let (stamp, rest) = row.split_once(',')?;
            let (_, clock) = stamp.split_once(' ')?;
            let label = clock.get(..5)?;
            let value: f64 = rest.split(',').next()?.parse().ok()?;
            Some(HistoryPoint::new(label, value))
        })
        .collect()
}

/// Parse the candle payload. Rows are `"2024-02-02,12.34"` (date, close).
pub fn parse_klines(body: &str) -> Vec<HistoryPoint> {
    let inner = unwrap_jsonp(body).unwrap_or(body);
    let parsed: serde_json::Value = match serde_json::from_str(inner) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };
    let Some(rows) = parsed.pointer("/data/klines").and_then(|v| v.as_array()) else {
        return Vec::new();
    };

    rows.iter()
        .filter_map(|row| {
            let (date, close) = row.as_str()?.split_once(',')?;
            let value: f64 = close.split(',').next()?.parse().ok()?;
            Some(HistoryPoint::new(date, value))
        })
        .collect()
}

/// Extract the fund NAV series from the `pingzhongdata` JavaScript bundle:
/// `var Data_netWorthTrend = [{"x": <ms epoch>, "y": <nav>}, …];`
/// Returns the most recent `count` points, dated `YYYY-MM-DD`.
pub fn parse_nav_trend(body: &str, count: usize) -> Vec<HistoryPoint> {
    let Some(raw) = extract_js_array(body, "Data_netWorthTrend") else {
        return Vec::new();
    };
    let parsed: Vec<serde_json::Value> = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };

    let points: Vec<HistoryPoint> = parsed
        .iter()
        .filter_map(|item| {
            let ms = item.get("x")?.as_i64()?;
            let value = item.get("y")?.as_f64()?;
            let date = chrono::DateTime::from_timestamp_millis(ms)?;
            Some(HistoryPoint::new(
                date.date_naive().format("%Y-%m-%d").to_string(),
                value,
            ))
        })
        .collect();

    let skip = points.len().saturating_sub(count);
    points.into_iter().skip(skip).collect()
}

#[async_trait]
impl HistoryProvider for EastMoneyHistoryProvider {
    async fn intraday(&self, code: &str) -> Vec<HistoryPoint> {
        match self.fetch_intraday(code).await {
            Ok(points) => points,
            Err(e) => {
                debug!("intraday series for {code} unavailable: {e}");
                Vec::new()
            }
        }
    }

    async fn candles(&self, code: &str, period: ChartPeriod) -> Vec<HistoryPoint> {
        match self.fetch_candles(code, period).await {
            Ok(points) => points,
            Err(e) => {
                debug!("candle series for {code} unavailable: {e}");
                Vec::new()
            }
        }
    }

    async fn fund_nav_history(&self, code: &str, count: usize) -> Vec<HistoryPoint> {
        match self.fetch_fund_nav(code, count).await {
            Ok(points) => points,
            Err(e) => {
                debug!("fund NAV series for {code} unavailable: {e}");
                Vec::new()
            }
        }
    }
}
