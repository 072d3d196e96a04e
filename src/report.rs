//! Plain-text portfolio report
//!
//! Renders a `PortfolioReport` for the terminal: a position table sorted by
//! market value, the summary block, and one block per option valuation.

use std::cmp::Ordering;
use std::fmt::Write;

use crate::core::{OptionValuation, PortfolioReport, PositionValuation, ValuationOutcome};

const MISSING: &str = "-";

/// Render the full report as a string
pub fn render_text(report: &PortfolioReport) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = write_report(&mut out, report);
    out
}

fn write_report(out: &mut String, report: &PortfolioReport) -> std::fmt::Result {
    writeln!(out, "Portfolio Fair Value Report")?;
    writeln!(out, "===========================")?;
    writeln!(out, "As of: {}", report.as_of)?;
    writeln!(out, "Risk-free rate: {:.2}%\n", report.risk_free_rate * 100.0)?;

    write_positions(out, report)?;
    write_summary(out, report)?;

    let options: Vec<&OptionValuation> = report.option_valuations().collect();
    if !options.is_empty() {
        writeln!(out, "\n--- Option Valuations ---")?;
        for valuation in options {
            write_option(out, valuation)?;
        }
    }

    Ok(())
}

fn write_positions(out: &mut String, report: &PortfolioReport) -> std::fmt::Result {
    writeln!(out, "--- Positions ---")?;
    writeln!(
        out,
        "{:<8} {:<6} {:>8} {:>12} {:>10} {:>14} {:>12} {:>6}",
        "Ticker", "Type", "Strike", "Expiry", "Qty", "Value", "P&L", "Days"
    )?;

    for line in sorted_by_value(&report.positions) {
        let instrument = &line.position.instrument;
        writeln!(
            out,
            "{:<8} {:<6} {:>8} {:>12} {:>10} {:>14} {:>12} {:>6}",
            line.position.ticker,
            instrument.kind(),
            instrument.strike().map_or(MISSING.to_string(), |k| format!("{:.2}", k)),
            instrument.expiry().map_or(MISSING.to_string(), |d| d.to_string()),
            line.position.quantity,
            money(line.market_value),
            money(line.pnl),
            line.days_to_expiry.map_or(MISSING.to_string(), |d| d.to_string()),
        )?;
        if line.option.is_none() {
            if let Some(note) = &line.note {
                writeln!(out, "         ! {}", note)?;
            }
        }
    }

    Ok(())
}

fn write_summary(out: &mut String, report: &PortfolioReport) -> std::fmt::Result {
    let s = &report.summary;

    writeln!(out, "\n--- Summary ---")?;
    writeln!(out, "  Total value:    {}", money(Some(s.total_value)))?;
    writeln!(out, "  Total P&L:      {}", money(Some(s.total_pnl)))?;
    writeln!(
        out,
        "  Options:        {} ({:.1}%)",
        money(Some(s.options_value)),
        s.options_exposure_pct
    )?;
    writeln!(
        out,
        "  Equity:         {} ({:.1}%)",
        money(Some(s.equity_value)),
        s.equity_exposure_pct
    )?;
    match s.average_days_to_expiry {
        Some(days) => writeln!(out, "  Avg days to expiry: {:.0}", days)?,
        None => writeln!(out, "  Avg days to expiry: {}", MISSING)?,
    }
    writeln!(
        out,
        "  Positions valued: {} (skipped {})",
        s.positions_valued, s.positions_skipped
    )
}

fn write_option(out: &mut String, v: &OptionValuation) -> std::fmt::Result {
    writeln!(out, "\n{} ({} days)", v.contract.label(), v.days_to_expiry)?;
    writeln!(out, "  Market price:      {}", price(v.market_price))?;
    writeln!(out, "  Theoretical price: {}", price(v.theoretical_price))?;
    writeln!(out, "  Implied vol:       {}", percent(v.implied_volatility))?;
    if v.historical_volatility.is_some() {
        writeln!(out, "  Historical vol:    {}", percent(v.historical_volatility))?;
    }
    if let (Some(vol), Some(origin)) = (v.volatility_used, v.volatility_origin) {
        writeln!(out, "  Vol used:          {:.2}% ({:?})", vol * 100.0, origin)?;
    }

    if let Some(comparison) = v.iv_vs_hv {
        writeln!(out, "  IV vs HV:          {}", comparison.as_str())?;
    }

    match &v.outcome {
        ValuationOutcome::Compared => {
            let verdict = v.verdict.map_or("n/a", |verdict| verdict.as_str());
            let pct = v
                .mispricing_pct
                .map_or(MISSING.to_string(), |p| format!("{:+.2}%", p));
            writeln!(
                out,
                "  Mispricing:        {} ({}, {})",
                price(v.mispricing),
                pct,
                verdict
            )
        }
        ValuationOutcome::Incomplete { reached, reason } => {
            let stage = reached.map_or("none".to_string(), |s| format!("{:?}", s));
            writeln!(out, "  Incomplete after {}: {}", stage, reason)
        }
        ValuationOutcome::Unsupported { reason } => writeln!(out, "  Unsupported: {}", reason),
    }
}

/// Lines with a market value first, largest value on top
fn sorted_by_value(lines: &[PositionValuation]) -> Vec<&PositionValuation> {
    let mut sorted: Vec<&PositionValuation> = lines.iter().collect();
    sorted.sort_by(|a, b| match (a.market_value, b.market_value) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    sorted
}

fn money(value: Option<f64>) -> String {
    value.map_or(MISSING.to_string(), |v| format!("${:.2}", v))
}

fn price(value: Option<f64>) -> String {
    value.map_or(MISSING.to_string(), |v| format!("{:.4}", v))
}

fn percent(value: Option<f64>) -> String {
    value.map_or(MISSING.to_string(), |v| format!("{:.2}%", v * 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        OptionContract, OptionType, PortfolioSummary, Position, PriceVerdict, ValuationStage,
        VolatilityComparison,
    };
    use chrono::NaiveDate;

    fn report() -> PortfolioReport {
        let expiry = NaiveDate::from_ymd_opt(2025, 12, 19).unwrap();
        let call = Position::call("LDOS", 180.0, expiry, 10, Some(4.0));
        let contract = OptionContract::american("LDOS", 180.0, expiry, OptionType::Call);

        let option = OptionValuation {
            contract,
            market_price: Some(4.3),
            theoretical_price: None,
            implied_volatility: None,
            historical_volatility: None,
            volatility_used: None,
            volatility_origin: None,
            time_to_expiry: 0.5,
            days_to_expiry: 182,
            mispricing: None,
            mispricing_pct: None,
            verdict: None,
            iv_vs_hv: None,
            outcome: ValuationOutcome::Incomplete {
                reached: Some(ValuationStage::PricedLive),
                reason: "no implied volatility".to_string(),
            },
        };

        PortfolioReport {
            as_of: NaiveDate::from_ymd_opt(2025, 6, 20).unwrap(),
            risk_free_rate: 0.0441,
            positions: vec![
                PositionValuation {
                    market_value: Some(4_300.0),
                    pnl: Some(300.0),
                    days_to_expiry: Some(182),
                    option: Some(option),
                    ..PositionValuation::skipped(call, "")
                },
                PositionValuation::skipped(Position::stock("GONE", 5, None), "no spot price for GONE"),
                PositionValuation {
                    market_value: Some(45_600.0),
                    pnl: Some(600.0),
                    note: None,
                    ..PositionValuation::skipped(Position::etf("DFEN", 1000, Some(45.0)), "")
                },
            ],
            summary: PortfolioSummary {
                total_value: 49_900.0,
                total_pnl: 900.0,
                positions_valued: 2,
                positions_skipped: 1,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_render_verdicts() {
        let mut report = report();
        let option = report.positions[0].option.as_mut().unwrap();
        option.theoretical_price = Some(4.0);
        option.implied_volatility = Some(0.40);
        option.historical_volatility = Some(0.30);
        option.mispricing = Some(0.3);
        option.mispricing_pct = Some(7.5);
        option.verdict = Some(PriceVerdict::Overvalued);
        option.iv_vs_hv = Some(VolatilityComparison::AboveRealized);
        option.outcome = ValuationOutcome::Compared;

        let text = render_text(&report);

        assert!(text.contains("Historical vol:    30.00%"));
        assert!(text.contains("IV vs HV:          above realized volatility"));
        assert!(text.contains("(+7.50%, overvalued)"));
    }

    #[test]
    fn test_positions_sorted_by_value() {
        let report = report();
        let sorted = sorted_by_value(&report.positions);
        let tickers: Vec<&str> = sorted.iter().map(|l| l.position.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["DFEN", "LDOS", "GONE"]);
    }

    #[test]
    fn test_render_contains_sections() {
        let text = render_text(&report());

        assert!(text.contains("Risk-free rate: 4.41%"));
        assert!(text.contains("$45600.00"));
        assert!(text.contains("no spot price for GONE"));
        assert!(text.contains("Incomplete after PricedLive: no implied volatility"));
        assert!(text.contains("Positions valued: 2 (skipped 1)"));
        assert!(text.contains("Avg days to expiry: -"));
    }
}
