use serde::{Deserialize, Serialize};

/// A single point of an asset's value series.
///
/// `time` is a display-formatted label — `HH:MM` for intraday points,
/// `YYYY-MM-DD` for candle/NAV series. Insertion order is meaningful;
/// the accumulator treats the last element as the most recent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub time: String,
    pub value: f64,
}

impl HistoryPoint {
    pub fn new(time: impl Into<String>, value: f64) -> Self {
        Self {
            time: time.into(),
            value,
        }
    }
}

/// Chart lookback selection. Maps to the candle feed's period code (klt)
/// and a lookback count, except `Intraday` which uses the tick feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartPeriod {
    Intraday,
    Daily,
    Weekly,
    Monthly,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
}

impl ChartPeriod {
    /// Candle feed parameters: (period code, lookback count).
    /// 101 = daily, 102 = weekly, 103 = monthly candles.
    pub fn candle_params(&self) -> (u32, usize) {
        match self {
            ChartPeriod::Intraday | ChartPeriod::Daily => (101, 120),
            ChartPeriod::Weekly => (102, 100),
            ChartPeriod::Monthly => (103, 60),
            ChartPeriod::OneMonth => (101, 22),
            ChartPeriod::ThreeMonths => (101, 65),
            ChartPeriod::SixMonths => (101, 130),
            ChartPeriod::OneYear => (101, 250),
        }
    }
}
