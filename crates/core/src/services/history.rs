use chrono::{NaiveDate, NaiveDateTime};
use log::info;

use crate::models::asset::Asset;
use crate::models::history::HistoryPoint;

/// Intraday history accumulation.
///
/// Each asset carries a rolling point series for the current session plus
/// the calendar date it belongs to. The series is only ever extended while
/// the asset's market is trading — the refresh engine enforces that — so
/// closed-market cycles never pad charts with flat lines.

/// `HH:MM` label for an intraday point.
pub fn minute_label(now: NaiveDateTime) -> String {
    now.format("%H:%M").to_string()
}

/// Append a point to an asset's intraday series, or replace the most
/// recent point when it shares the same minute label (duplicate x-axis
/// ticks would otherwise pile up within one minute).
///
/// A stale series — `last_history_date` different from `today` — is
/// cleared first, so yesterday's curve never leaks into today's chart.
pub fn append_or_replace(asset: &mut Asset, point: HistoryPoint, today: NaiveDate) {
    if asset.last_history_date != Some(today) {
        if asset.last_history_date.is_some() && !asset.history.is_empty() {
            info!("clearing stale intraday history for {}", asset.name);
        }
        asset.history.clear();
        asset.last_history_date = Some(today);
    }

    match asset.history.last_mut() {
        Some(last) if last.time == point.time => last.value = point.value,
        _ => asset.history.push(point),
    }
}

/// Seed a single point from the current value when an asset has no history
/// yet, so charts never render empty before the first adapter success.
pub fn backfill_if_empty(asset: &mut Asset, now: NaiveDateTime) {
    if asset.history.is_empty() && asset.current_value > 0.0 {
        let point = HistoryPoint::new(minute_label(now), asset.current_value);
        append_or_replace(asset, point, now.date());
    }
}

/// One pass over the asset list clearing any intraday series left over
/// from a previous session. Run once when a stored snapshot is loaded.
/// Returns how many assets were cleared.
pub fn clear_stale(assets: &mut [Asset], today: NaiveDate) -> usize {
    let mut cleared = 0;
    for asset in assets.iter_mut() {
        if let Some(date) = asset.last_history_date {
            if date != today && !asset.history.is_empty() {
                info!("clearing stale intraday history for {}", asset.name);
                asset.history.clear();
                asset.last_history_date = Some(today);
                cleared += 1;
            }
        }
    }
    cleared
}
