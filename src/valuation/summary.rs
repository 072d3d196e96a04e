//! Portfolio totals over valued lines

use crate::core::{PortfolioSummary, PositionValuation};

/// Aggregate a set of valued lines
///
/// Lines without a market value count as skipped and contribute nothing to
/// the totals. Option lines with a known expiry feed the average tenor even
/// when their premium is missing.
pub fn summarize(lines: &[PositionValuation]) -> PortfolioSummary {
    let mut summary = PortfolioSummary::default();
    let mut days_total = 0.0;
    let mut days_count = 0usize;

    for line in lines {
        if line.position.instrument.is_option() {
            if let Some(days) = line.days_to_expiry {
                days_total += days as f64;
                days_count += 1;
            }
        }

        let Some(value) = line.market_value else {
            summary.positions_skipped += 1;
            continue;
        };

        summary.positions_valued += 1;
        summary.total_value += value;
        summary.total_pnl += line.pnl.unwrap_or(0.0);

        if line.position.instrument.is_option() {
            summary.options_value += value;
        } else {
            summary.equity_value += value;
        }
    }

    if summary.total_value > 0.0 {
        summary.options_exposure_pct = summary.options_value / summary.total_value * 100.0;
        summary.equity_exposure_pct = summary.equity_value / summary.total_value * 100.0;
    }

    summary.average_days_to_expiry = (days_count > 0).then(|| days_total / days_count as f64);
    summary
}
