use crate::errors::CoreError;
use crate::models::asset::{Asset, Position};
use crate::models::portfolio::PortfolioTotals;

/// Portfolio valuation: pure aggregation over the asset list plus the
/// position-edit operations. No I/O, no provider calls.

/// Aggregate market value, cost basis, and P&L over all assets carrying a
/// position. An asset list without positions yields all zeros.
pub fn portfolio_totals(assets: &[Asset]) -> PortfolioTotals {
    let mut market_value = 0.0;
    let mut cost_basis = 0.0;

    for asset in assets {
        if let Some(position) = &asset.position {
            market_value += position.shares * asset.current_value;
            cost_basis += position.cost_basis();
        }
    }

    let pnl = market_value - cost_basis;
    let pnl_percent = if cost_basis > 0.0 {
        pnl / cost_basis * 100.0
    } else {
        0.0
    };

    PortfolioTotals {
        market_value,
        cost_basis,
        pnl,
        pnl_percent,
    }
}

/// Per-asset unrealized P&L as `(pnl, pnl_percent)`.
/// None when the asset has no position.
pub fn asset_pnl(asset: &Asset) -> Option<(f64, f64)> {
    let position = asset.position.as_ref()?;
    let pnl = position.shares * (asset.current_value - position.cost_price);
    let pnl_percent = (asset.current_value - position.cost_price) / position.cost_price * 100.0;
    Some((pnl, pnl_percent))
}

/// Record an additional buy with weighted-average cost update.
///
/// The fee only reduces the shares bought (`net = gross * (1 - fee%)`,
/// `shares += net / price`); the GROSS amount feeds the cost basis. That
/// asymmetry is deliberate — it treats the fee as part of what the
/// position cost you.
///
/// Rejects without mutating when any input is non-finite or out of range.
pub fn apply_buy(
    asset: &mut Asset,
    gross_amount: f64,
    price: f64,
    fee_rate_percent: f64,
) -> Result<(), CoreError> {
    if !gross_amount.is_finite() || gross_amount <= 0.0 {
        return Err(CoreError::ValidationError(format!(
            "buy amount must be a positive number, got {gross_amount}"
        )));
    }
    if !price.is_finite() || price <= 0.0 {
        return Err(CoreError::ValidationError(format!(
            "buy price must be a positive number, got {price}"
        )));
    }
    if !fee_rate_percent.is_finite() || !(0.0..100.0).contains(&fee_rate_percent) {
        return Err(CoreError::ValidationError(format!(
            "fee rate must be in [0, 100), got {fee_rate_percent}"
        )));
    }

    let (current_shares, current_cost) = match &asset.position {
        Some(p) => (p.shares, p.cost_basis()),
        None => (0.0, 0.0),
    };

    let net_amount = gross_amount * (1.0 - fee_rate_percent / 100.0);
    let new_shares = net_amount / price;
    let total_shares = current_shares + new_shares;
    let total_cost = current_cost + gross_amount;

    asset.position = Some(Position::new(total_shares, total_cost / total_shares)?);
    Ok(())
}

/// Override a position with absolute values, used for correcting
/// previously-entered positions. No weighting.
pub fn set_position(asset: &mut Asset, shares: f64, cost_price: f64) -> Result<(), CoreError> {
    asset.position = Some(Position::new(shares, cost_price)?);
    Ok(())
}

/// Drop an asset's position entirely.
pub fn clear_position(asset: &mut Asset) {
    asset.position = None;
}
