use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::quote::AssetUpdate;

use super::payload::{lenient_f64, unwrap_jsonp};
use super::routing::secid_for;
use super::traits::ExchangeQuoteProvider;

const BATCH_URL: &str = "https://push2.eastmoney.com/api/qt/ulist.np/get";
const SINGLE_URL: &str = "https://push2.eastmoney.com/api/qt/stock/get";

/// Batch field list: f12 code, f13 market, f2 price, f18 prev close,
/// f17 open, f15 high, f16 low.
const BATCH_FIELDS: &str = "f12,f13,f14,f2,f3,f4,f18,f17,f15,f16,f49";
/// Single-instrument field list: f43/f60 price and prev close (preferred),
/// f2/f18 fallbacks, f46 open, f44 high, f45 low, f86 quote timestamp.
const SINGLE_FIELDS: &str = "f2,f18,f43,f44,f45,f46,f60,f86";

/// Adapter for the exchange quote feed (stocks, ETFs, indices, spot gold).
///
/// The batch endpoint takes comma-joined secids and returns one row per
/// instrument; the single endpoint serves instruments the batch endpoint
/// drops (indices do this routinely). Numeric columns report `'-'` when a
/// value is unavailable and those parse to `None` so the merge step keeps
/// the previous value.
pub struct EastMoneyQuoteProvider {
    client: Client,
}

impl EastMoneyQuoteProvider {
    pub fn new() -> Self {
        let builder = Client::builder().timeout(Duration::from_secs(5));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
        }
    }

    async fn fetch_batch(&self, codes: &[String]) -> Result<HashMap<String, AssetUpdate>, CoreError> {
        let mut secids = Vec::new();
        for code in codes {
            if let Some(secid) = secid_for(code) {
                secids.push((secid, code.clone()));
            }
        }
        if secids.is_empty() {
            return Ok(HashMap::new());
        }

        let joined: Vec<&str> = secids.iter().map(|(s, _)| s.as_str()).collect();
        let ts = chrono::Utc::now().timestamp_millis();
        let url = format!(
            "{BATCH_URL}?secids={}&fields={BATCH_FIELDS}&_={ts}",
            joined.join(",")
        );
        let body = self.client.get(&url).send().await?.text().await?;
        let now_label = chrono::Local::now().format("%H:%M").to_string();
        Ok(parse_batch(&body, &secids, &now_label))
    }

    async fn fetch_single(&self, code: &str) -> Result<Option<AssetUpdate>, CoreError> {
        let secid = match secid_for(code) {
            Some(s) => s,
            None => return Ok(None),
        };
        let ts = chrono::Utc::now().timestamp_millis();
        let url = format!("{SINGLE_URL}?secid={secid}&fields={SINGLE_FIELDS}&_={ts}");
        let body = self.client.get(&url).send().await?.text().await?;
        Ok(parse_single(&body))
    }
}

impl Default for EastMoneyQuoteProvider {
    fn default() -> Self {
        Self::new()
    }
}

// ── Payload parsing ─────────────────────────────────────────────────

/// Parse a batch response body, mapping rows back to the requested routing
/// codes. `requested` pairs each queried secid with its routing code.
///
/// Matching discipline: exact secid (`market.code`) first. When the feed
/// reorders or drops the market discriminator, fall back to matching the
/// code alone — but only if exactly one requested secid carries that code;
/// an ambiguous code-only match is skipped (and logged) rather than guessed.
pub fn parse_batch(
    body: &str,
    requested: &[(String, String)],
    now_label: &str,
) -> HashMap<String, AssetUpdate> {
    let mut results = HashMap::new();

    let inner = match unwrap_jsonp(body) {
        Some(inner) => inner,
        None => body,
    };
    let parsed: Value = match serde_json::from_str(inner) {
        Ok(v) => v,
        Err(e) => {
            debug!("batch quote payload unparseable: {e}");
            return results;
        }
    };

    let diff = parsed.pointer("/data/diff");
    let items: Vec<&Value> = match diff {
        // The feed serves `diff` as an array or, in some variants, an
        // index-keyed object.
        Some(Value::Array(arr)) => arr.iter().collect(),
        Some(Value::Object(map)) => map.values().collect(),
        _ => return results,
    };

    for item in items {
        let code = match item.get("f12") {
            Some(Value::String(s)) => format!("{s:0>6}"),
            Some(Value::Number(n)) => format!("{:0>6}", n.to_string()),
            _ => continue,
        };
        let market = match item.get("f13") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };

        let row_secid = format!("{market}.{code}");
        let matched = requested
            .iter()
            .find(|(secid, _)| *secid == row_secid)
            .or_else(|| {
                let candidates: Vec<&(String, String)> = requested
                    .iter()
                    .filter(|(secid, _)| secid.ends_with(&format!(".{code}")))
                    .collect();
                match candidates.as_slice() {
                    [only] => {
                        debug!("batch row {row_secid} matched by code alone to {}", only.0);
                        Some(*only)
                    }
                    [] => None,
                    _ => {
                        debug!("batch row {row_secid} is ambiguous by code, skipping");
                        None
                    }
                }
            });

        let Some((_, routing_code)) = matched else {
            continue;
        };

        let current_value = lenient_f64(item.get("f2"));
        let update = AssetUpdate {
            current_value,
            yesterday_value: lenient_f64(item.get("f18")),
            open: lenient_f64(item.get("f17")),
            high: lenient_f64(item.get("f15")),
            low: lenient_f64(item.get("f16")),
            unit_nav: None,
            // The batch feed's own time column (f49) is unreliable; stamp
            // with the client clock whenever a live price came through.
            time: current_value.map(|_| now_label.to_string()),
        };
        if !update.is_empty() {
            results.insert(routing_code.clone(), update);
        }
    }

    results
}

/// Parse a single-instrument response.
///
/// Price and previous close prefer the f43/f60 columns, falling back to
/// f2/f18 when those report `'-'`. f86 is the quote's unix timestamp.
pub fn parse_single(body: &str) -> Option<AssetUpdate> {
    let inner = unwrap_jsonp(body).unwrap_or(body);
    let parsed: Value = serde_json::from_str(inner).ok()?;
    let data = parsed.get("data")?;
    if data.is_null() {
        return None;
    }

    let price = lenient_f64(data.get("f43"))
        .filter(|v| *v != 0.0)
        .or_else(|| lenient_f64(data.get("f2")));
    let prev_close = lenient_f64(data.get("f60"))
        .filter(|v| *v != 0.0)
        .or_else(|| lenient_f64(data.get("f18")));

    let time = lenient_f64(data.get("f86"))
        .map(|ts| ts as i64)
        .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
        .map(|dt| {
            dt.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        });

    let update = AssetUpdate {
        current_value: price,
        yesterday_value: prev_close,
        open: lenient_f64(data.get("f46")),
        high: lenient_f64(data.get("f44")),
        low: lenient_f64(data.get("f45")),
        unit_nav: None,
        time,
    };
    if update.is_empty() {
        None
    } else {
        Some(update)
    }
}

#[async_trait]
impl ExchangeQuoteProvider for EastMoneyQuoteProvider {
    async fn batch_quotes(&self, codes: &[String]) -> HashMap<String, AssetUpdate> {
        match self.fetch_batch(codes).await {
            Ok(map) => map,
            Err(e) => {
                debug!("batch quote fetch failed for {} codes: {e}", codes.len());
                HashMap::new()
            }
        }
    }

    async fn single_quote(&self, code: &str) -> Option<AssetUpdate> {
        match self.fetch_single(code).await {
            Ok(update) => update,
            Err(e) => {
                debug!("single quote for {code} unavailable: {e}");
                None
            }
        }
    }
}
