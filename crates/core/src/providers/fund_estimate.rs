use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::quote::FundEstimate;

use super::payload::unwrap_jsonp;
use super::traits::FundEstimateProvider;

const BASE_URL: &str = "https://fundgz.1234567.com.cn/js";

/// Adapter for the open-end fund estimation feed.
///
/// The feed serves one fund per request as `jsonpgz({...});` where every
/// field is a string: `dwjz` is the previous official unit NAV, `gsz` the
/// estimated intraday NAV, `gszzl` the estimated growth percentage, and
/// `gztime` the estimation timestamp. Estimates refresh on the order of a
/// minute — there is no point polling this faster.
pub struct EastMoneyFundProvider {
    client: Client,
}

impl EastMoneyFundProvider {
    pub fn new() -> Self {
        // The fund feed is the slowest of the upstreams; 8s bound.
        let builder = Client::builder().timeout(Duration::from_secs(8));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
        }
    }

    async fn fetch(&self, code: &str) -> Result<FundEstimate, CoreError> {
        let rt = chrono::Utc::now().timestamp_millis();
        let url = format!("{BASE_URL}/{code}.js?rt={rt}");
        let body = self.client.get(&url).send().await?.text().await?;
        parse_estimate(&body)
    }
}

impl Default for EastMoneyFundProvider {
    fn default() -> Self {
        Self::new()
    }
}

// ── Feed payload ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct FundGzPayload {
    #[serde(default)]
    fundcode: String,
    /// Previous official unit NAV
    #[serde(default)]
    dwjz: String,
    /// Estimated intraday NAV
    #[serde(default)]
    gsz: String,
    /// Estimated growth rate, percent
    #[serde(default)]
    gszzl: String,
    /// Estimation timestamp
    #[serde(default)]
    gztime: String,
}

/// Parse a raw `jsonpgz({...});` body into a normalized estimate.
pub fn parse_estimate(body: &str) -> Result<FundEstimate, CoreError> {
    let inner = unwrap_jsonp(body).ok_or_else(|| CoreError::Api {
        provider: "fundgz".into(),
        message: "response is not a JSONP body".into(),
    })?;
    let payload: FundGzPayload = serde_json::from_str(inner)?;

    let price: f64 = payload.gsz.parse().map_err(|_| CoreError::Api {
        provider: "fundgz".into(),
        message: format!("invalid estimated value '{}' for {}", payload.gsz, payload.fundcode),
    })?;
    let growth_percent: f64 = payload.gszzl.parse().map_err(|_| CoreError::Api {
        provider: "fundgz".into(),
        message: format!("invalid growth rate '{}' for {}", payload.gszzl, payload.fundcode),
    })?;

    Ok(FundEstimate {
        price,
        growth_percent,
        unit_nav: payload.dwjz.parse().ok(),
        time: normalize_estimate_time(&payload.gztime),
    })
}

/// The feed reports `YYYY-MM-DD HH:MM`; append seconds so timestamps have a
/// uniform shape across feeds. Anything else passes through unchanged.
pub fn normalize_estimate_time(raw: &str) -> String {
    let looks_minute_resolution = raw.len() == 16
        && raw.as_bytes().get(10) == Some(&b' ')
        && raw.as_bytes().get(13) == Some(&b':');
    if looks_minute_resolution {
        format!("{raw}:00")
    } else {
        raw.to_string()
    }
}

#[async_trait]
impl FundEstimateProvider for EastMoneyFundProvider {
    async fn fund_estimate(&self, code: &str) -> Option<FundEstimate> {
        match self.fetch(code).await {
            Ok(estimate) => Some(estimate),
            Err(e) => {
                debug!("fund estimate for {code} unavailable: {e}");
                None
            }
        }
    }
}
