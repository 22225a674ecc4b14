use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::asset::Holding;

use super::payload::{extract_quoted, strip_tags};
use super::traits::HoldingsProvider;

const BASE_URL: &str = "https://fundf10.eastmoney.com/FundArchivesDatas.aspx";

const MAX_HOLDINGS: usize = 10;

/// Adapter for the fund constituent feed.
///
/// The feed answers with a JavaScript object literal whose `content` field
/// is an HTML table fragment — one row per constituent, columns for rank,
/// stock code, stock name, and somewhere to the right a percentage column.
/// Rows are deduplicated by code and a missing percentage becomes the
/// `"--"` placeholder rather than failing the call.
pub struct EastMoneyHoldingsProvider {
    client: Client,
}

impl EastMoneyHoldingsProvider {
    pub fn new() -> Self {
        let builder = Client::builder().timeout(Duration::from_secs(8));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
        }
    }

    async fn fetch(&self, code: &str) -> Result<Vec<Holding>, CoreError> {
        let rt = chrono::Utc::now().timestamp_millis();
        let url = format!("{BASE_URL}?type=jjcc&code={code}&topline={MAX_HOLDINGS}&year=&month=&rt={rt}");
        let body = self.client.get(&url).send().await?.text().await?;
        Ok(parse_holdings(&body))
    }
}

impl Default for EastMoneyHoldingsProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse the holdings payload: pull the embedded HTML fragment out of the
/// `content:"…"` field, then scan its table rows.
pub fn parse_holdings(body: &str) -> Vec<Holding> {
    let Some(content) = extract_quoted(body, "content") else {
        return Vec::new();
    };

    let mut holdings = Vec::new();
    let mut seen = HashSet::new();

    for row in table_rows(&content) {
        if holdings.len() >= MAX_HOLDINGS {
            break;
        }
        let cells = row_cells(row);
        if cells.len() < 3 {
            continue;
        }

        // Column layout: 0 = rank, 1 = code, 2 = name, percentage somewhere
        // in the remaining columns (the one carrying a '%').
        let code = strip_tags(cells[1]);
        let name = strip_tags(cells[2]);
        if code.is_empty() || name.is_empty() || !seen.insert(code.clone()) {
            continue;
        }

        let percent = cells[3..]
            .iter()
            .map(|c| strip_tags(c))
            .find(|text| text.contains('%'))
            .map(|text| text.replace('%', "").trim().to_string())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| "--".to_string());

        holdings.push(Holding { code, name, percent });
    }

    holdings
}

/// Iterate `<tr>…</tr>` segments of an HTML fragment.
fn table_rows(html: &str) -> impl Iterator<Item = &str> {
    html.split("<tr").skip(1).filter_map(|seg| {
        let inner = seg.split_once('>')?.1;
        Some(inner.split("</tr>").next().unwrap_or(inner))
    })
}

/// Extract the `<td>…</td>` cell bodies of one table row.
fn row_cells(row: &str) -> Vec<&str> {
    row.split("<td")
        .skip(1)
        .filter_map(|seg| {
            let inner = seg.split_once('>')?.1;
            Some(inner.split("</td>").next().unwrap_or(inner))
        })
        .collect()
}

#[async_trait]
impl HoldingsProvider for EastMoneyHoldingsProvider {
    async fn fund_holdings(&self, code: &str) -> Vec<Holding> {
        match self.fetch(code).await {
            Ok(holdings) => holdings,
            Err(e) => {
                debug!("holdings for fund {code} unavailable: {e}");
                Vec::new()
            }
        }
    }
}
