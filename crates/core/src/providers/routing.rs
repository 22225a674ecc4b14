//! Routing-code to security-id mapping for the exchange quote feeds.
//!
//! The quote endpoints address instruments by `market.code` pairs ("secids"):
//! market 1 = Shanghai, 0 = Shenzhen, plus special markets like `100.XAU`
//! for spot gold. User-facing routing codes carry `sh`/`sz` prefixes or are
//! bare six-digit codes whose exchange has to be guessed from the leading
//! digit.

/// Derive the feed security id for a routing code.
///
/// Already-dotted codes pass through unchanged. `sh`/`sz` prefixes map to
/// markets 1/0. Bare codes fall back to leading-digit conventions: 6xxxxx
/// is SH, 0xxxxx/3xxxxx SZ, 159xxx-style SZ ETFs, 51xxxx-style SH ETFs.
/// Returns None for codes with no discernible exchange (e.g. OTC funds).
pub fn secid_for(code: &str) -> Option<String> {
    if code.contains('.') {
        return Some(code.to_string());
    }
    if let Some(rest) = code.strip_prefix("sh") {
        return Some(format!("1.{rest}"));
    }
    if let Some(rest) = code.strip_prefix("sz") {
        return Some(format!("0.{rest}"));
    }
    match code.chars().next()? {
        '6' => Some(format!("1.{code}")),
        '0' | '3' => Some(format!("0.{code}")),
        '1' => Some(format!("0.{code}")),
        '5' => Some(format!("1.{code}")),
        _ => None,
    }
}

/// The display code embedded in a secid (part after the market dot).
pub fn secid_code(secid: &str) -> &str {
    secid.split_once('.').map(|(_, c)| c).unwrap_or(secid)
}
