use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};

use crate::models::asset::{Asset, AssetCategory};

/// Where an instrument's market currently is in its trading day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLabel {
    /// Inside a trading window
    Trading,
    /// Gold: continuously quotable on weekdays
    Fluctuating,
    /// The onshore/HK midday halt (11:30–13:00)
    LunchBreak,
    /// Before the morning open
    PreOpen,
    /// Weekend, after close, or outside the US overnight window
    Closed,
}

impl std::fmt::Display for SessionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionLabel::Trading => write!(f, "trading"),
            SessionLabel::Fluctuating => write!(f, "fluctuating"),
            SessionLabel::LunchBreak => write!(f, "lunch break"),
            SessionLabel::PreOpen => write!(f, "pre-open"),
            SessionLabel::Closed => write!(f, "closed"),
        }
    }
}

/// Session classification for one asset at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    pub label: SessionLabel,
    /// Whether live updates should extend the intraday history
    pub is_trading: bool,
}

impl SessionState {
    fn trading(label: SessionLabel) -> Self {
        Self {
            label,
            is_trading: true,
        }
    }

    fn halted(label: SessionLabel) -> Self {
        Self {
            label,
            is_trading: false,
        }
    }
}

// Trading windows in minutes since midnight, local clock.
const MORNING_OPEN: u32 = 9 * 60 + 30;
const MORNING_CLOSE: u32 = 11 * 60 + 30;
const AFTERNOON_OPEN: u32 = 13 * 60;
const CN_CLOSE: u32 = 15 * 60;
const HK_CLOSE: u32 = 16 * 60;
const US_OPEN: u32 = 21 * 60 + 30;
const US_OVERNIGHT_CLOSE: u32 = 4 * 60;

/// Derive an asset's trading-session state from instrument tags, category,
/// and the wall clock.
///
/// Pure function: all time comparisons use minutes-since-midnight of the
/// supplied instant, assuming the client clock is in the exchange-relevant
/// timezone. Holidays are not modeled.
pub fn session_state(asset: &Asset, now: NaiveDateTime) -> SessionState {
    let weekday = now.weekday();
    let minutes = now.hour() * 60 + now.minute();

    // US instruments first: their session runs 21:30 into 04:00 the next
    // local day, so the early hours of Saturday still belong to Friday's
    // session while Sunday is fully closed.
    if asset.is_us_market() {
        let overnight = minutes >= US_OPEN;
        let early_morning = minutes <= US_OVERNIGHT_CLOSE;
        if weekday == Weekday::Sun {
            return SessionState::halted(SessionLabel::Closed);
        }
        if weekday == Weekday::Sat && !early_morning {
            return SessionState::halted(SessionLabel::Closed);
        }
        if overnight || early_morning {
            return SessionState::trading(SessionLabel::Trading);
        }
        return SessionState::halted(SessionLabel::Closed);
    }

    if weekday == Weekday::Sat || weekday == Weekday::Sun {
        return SessionState::halted(SessionLabel::Closed);
    }

    if asset.category == AssetCategory::Gold {
        return SessionState::trading(SessionLabel::Fluctuating);
    }

    // Onshore/HK instruments: two windows with the midday halt between.
    let close = if asset.is_hk_market() { HK_CLOSE } else { CN_CLOSE };
    if (MORNING_OPEN..=MORNING_CLOSE).contains(&minutes) {
        return SessionState::trading(SessionLabel::Trading);
    }
    if (AFTERNOON_OPEN..=close).contains(&minutes) {
        return SessionState::trading(SessionLabel::Trading);
    }
    if minutes > MORNING_CLOSE && minutes < AFTERNOON_OPEN {
        return SessionState::halted(SessionLabel::LunchBreak);
    }
    if minutes < MORNING_OPEN {
        return SessionState::halted(SessionLabel::PreOpen);
    }
    SessionState::halted(SessionLabel::Closed)
}
