use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::asset::AssetCategory;
use crate::models::quote::SearchResult;

use super::payload::unwrap_jsonp;
use super::traits::SearchProvider;

const BASE_URL: &str = "https://fundsuggest.eastmoney.com/FundSearch/api/FundSearchAPI.ashx";

/// Adapter for the instrument search feed.
///
/// Results carry a Chinese-language category descriptor (CATEGORYDESC) that
/// decides whether a row becomes a fund, stock, or index asset, plus a
/// market flag (MKT) used to assign the `sh`/`sz` routing prefix for
/// exchange-traded rows.
pub struct EastMoneySearchProvider {
    client: Client,
}

impl EastMoneySearchProvider {
    pub fn new() -> Self {
        let builder = Client::builder().timeout(Duration::from_secs(5));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
        }
    }

    async fn fetch(&self, query: &str) -> Result<Vec<SearchResult>, CoreError> {
        let ts = chrono::Utc::now().timestamp_millis();
        let url = format!("{BASE_URL}?m=1&key={}&_={ts}", urlencode(query));
        let body = self.client.get(&url).send().await?.text().await?;
        Ok(parse_search(&body))
    }
}

impl Default for EastMoneySearchProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn urlencode(s: &str) -> String {
    let mut out = String::new();
    for b in s.as_bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(*b as char)
            }
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

/// Parse the search payload. The row list arrives under `Datas` (or `data`
/// in some variants).
pub fn parse_search(body: &str) -> Vec<SearchResult> {
    let inner = unwrap_jsonp(body).unwrap_or(body);
    let parsed: Value = match serde_json::from_str(inner) {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };
    let rows = parsed
        .get("Datas")
        .or_else(|| parsed.get("data"))
        .and_then(|v| v.as_array());
    let Some(rows) = rows else {
        return Vec::new();
    };

    rows.iter()
        .filter_map(|item| {
            let code = item.get("CODE")?.as_str()?.to_string();
            let name = item.get("NAME")?.as_str()?.to_string();
            let kind = item
                .get("CATEGORYDESC")
                .or_else(|| item.get("AssetType"))
                .and_then(|v| v.as_str())
                .unwrap_or("基金")
                .to_string();

            let category = if kind.contains("股票") || kind.contains("A股") {
                AssetCategory::Stock
            } else if kind.contains("指数") && !kind.contains("基金") {
                AssetCategory::Index
            } else {
                AssetCategory::Fund
            };

            // Exchange-traded rows get a routed code; MKT 1 = Shanghai.
            let api_code = match category {
                AssetCategory::Stock | AssetCategory::Index => {
                    let mkt = item.get("MKT").and_then(|v| v.as_str()).unwrap_or("");
                    if mkt == "1" || code.starts_with('6') {
                        Some(format!("sh{code}"))
                    } else {
                        Some(format!("sz{code}"))
                    }
                }
                _ => None,
            };

            Some(SearchResult {
                code,
                name,
                kind,
                category,
                api_code,
            })
        })
        .collect()
}

#[async_trait]
impl SearchProvider for EastMoneySearchProvider {
    async fn search(&self, query: &str) -> Vec<SearchResult> {
        match self.fetch(query).await {
            Ok(results) => results,
            Err(e) => {
                debug!("search for '{query}' failed: {e}");
                Vec::new()
            }
        }
    }
}
