//! Plain-English rendering of analysis results
//!
//! Keeps prose out of the core types: every result struct stays pure data
//! and this module turns it into short human-readable lines, one block per
//! analyzer plus a combined report.

use std::fmt::Write as _;

use crate::analyzers::classic::{ChartPattern, ClassicResult, PriceTrend};
use crate::analyzers::elliott::ElliottResult;
use crate::analyzers::fibonacci::FibonacciResult;
use crate::analyzers::harmonic::HarmonicMatch;
use crate::analyzers::ict::{IctResult, LiquidityKind, RangeZone};
use crate::{Direction, FullReport, Signal};

fn direction_word(direction: Direction) -> &'static str {
    match direction {
        Direction::Bullish => "bullish",
        Direction::Bearish => "bearish",
        Direction::Neutral => "neutral",
    }
}

/// One line for a chart pattern, e.g.
/// "bearish Double Top (bars 12-41, confidence 75): target 92.50, stop 121.30"
pub fn describe_pattern(pattern: &ChartPattern) -> String {
    let mut line = format!(
        "{} {} (bars {}-{}, confidence {:.0})",
        direction_word(pattern.direction),
        pattern.kind.as_str(),
        pattern.start_index,
        pattern.end_index,
        pattern.confidence,
    );
    let _ = write!(
        line,
        ": target {:.2}, stop {:.2}",
        pattern.target, pattern.stop_loss
    );
    line
}

/// One line for a harmonic match, e.g.
/// "bullish Gartley at bar 40 (confidence 90), reversal zone 109.60-111.80"
pub fn describe_harmonic(m: &HarmonicMatch) -> String {
    let at = m.points.last().map(|p| p.index).unwrap_or(0);
    format!(
        "{} {} at bar {} (confidence {:.0}), reversal zone {:.2}-{:.2}",
        direction_word(m.direction),
        m.kind.as_str(),
        at,
        m.confidence,
        m.prz_low,
        m.prz_high,
    )
}

pub fn classic_text(result: &ClassicResult) -> String {
    let mut out = String::new();

    let trend_word = match result.trend {
        PriceTrend::Up => "rising",
        PriceTrend::Down => "falling",
        PriceTrend::Sideways => "sideways",
    };
    let _ = writeln!(
        out,
        "Trend: {} ({:+.2}% slope). Overall signal: {}.",
        trend_word,
        result.trend_slope_percent,
        signal_word(result.signal),
    );

    if let Some(support) = result.levels.nearest_support() {
        let _ = writeln!(
            out,
            "Nearest support {:.2} (touched {} times).",
            support.price, support.strength
        );
    }
    if let Some(resistance) = result.levels.nearest_resistance() {
        let _ = writeln!(
            out,
            "Nearest resistance {:.2} (touched {} times).",
            resistance.price, resistance.strength
        );
    }

    if result.patterns.is_empty() {
        let _ = writeln!(out, "No chart patterns detected.");
    } else {
        for pattern in &result.patterns {
            let _ = writeln!(out, "Pattern: {}.", describe_pattern(pattern));
        }
    }
    out
}

pub fn elliott_text(result: &ElliottResult) -> String {
    let mut out = String::new();

    match (result.current_wave, result.next_expected) {
        (Some(current), Some(next)) => {
            let _ = writeln!(
                out,
                "Wave count: currently in wave {} (confidence {:.0}), wave {} expected next.",
                current.as_str(),
                result.confidence,
                next.as_str(),
            );
        }
        _ => {
            let _ = writeln!(out, "Not enough swings for a wave count.");
        }
    }

    if !result.violations.is_empty() {
        let _ = writeln!(
            out,
            "Rule violations: {}.",
            result.violations.len()
        );
    }
    if let Some(extension) = &result.extension_target {
        let _ = writeln!(out, "161.8% extension target: {:.2}.", extension.price);
    }
    out
}

pub fn harmonic_text(matches: &[HarmonicMatch]) -> String {
    if matches.is_empty() {
        return "No harmonic patterns detected.\n".to_string();
    }
    let mut out = String::new();
    for m in matches {
        let _ = writeln!(out, "Harmonic: {}.", describe_harmonic(m));
    }
    out
}

pub fn ict_text(result: &IctResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Market structure bias: {}.", result.bias.as_str());

    if let Some(pd) = &result.premium_discount {
        let zone = match pd.current {
            RangeZone::Premium => "premium",
            RangeZone::Discount => "discount",
            RangeZone::Equilibrium => "equilibrium",
        };
        let _ = writeln!(
            out,
            "Price is in the {} zone of the {:.2}-{:.2} range.",
            zone, pd.range_low, pd.range_high
        );
    }

    let open_gaps = result.fair_value_gaps.iter().filter(|g| !g.filled).count();
    let unmitigated = result.order_blocks.iter().filter(|b| !b.mitigated).count();
    let _ = writeln!(
        out,
        "{} structure break(s), {} open gap(s), {} fresh order block(s).",
        result.breaks.len(),
        open_gaps,
        unmitigated,
    );

    for zone in &result.liquidity {
        let side = match zone.kind {
            LiquidityKind::BuySide => "buy-side",
            LiquidityKind::SellSide => "sell-side",
        };
        let state = if zone.swept { "swept" } else { "intact" };
        let _ = writeln!(out, "{} liquidity at {:.2} ({}).", side, zone.level, state);
    }

    if let Some(entry) = &result.entry {
        let _ = writeln!(
            out,
            "Setup: {} entry {:.2}-{:.2}, stop {:.2}, target {:.2}.",
            direction_word(entry.direction),
            entry.entry_low,
            entry.entry_high,
            entry.stop_loss,
            entry.target,
        );
    }
    out
}

pub fn fibonacci_text(result: &FibonacciResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Fibonacci swing {:.2}-{:.2}, {} trend. Suggested action: {}.",
        result.swing_low,
        result.swing_high,
        direction_word(result.trend),
        result.action.as_str(),
    );
    for key in &result.key_levels {
        let _ = writeln!(
            out,
            "Level {:.1}% at {:.2} ({:.2}% away).",
            key.ratio * 100.0,
            key.price,
            key.distance_percent,
        );
    }
    out
}

fn signal_word(signal: Signal) -> &'static str {
    match signal {
        Signal::Buy => "buy",
        Signal::Sell => "sell",
        Signal::Neutral => "neutral",
    }
}

/// Full multi-section report for one series.
pub fn report_text(report: &FullReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Chart patterns ===");
    out.push_str(&classic_text(&report.classic));
    let _ = writeln!(out, "=== Elliott waves ===");
    out.push_str(&elliott_text(&report.elliott));
    let _ = writeln!(out, "=== Harmonics ===");
    out.push_str(&harmonic_text(&report.harmonic.matches));
    let _ = writeln!(out, "=== Market structure ===");
    out.push_str(&ict_text(&report.ict));
    let _ = writeln!(out, "=== Fibonacci ===");
    match &report.fibonacci {
        Some(fib) => out.push_str(&fibonacci_text(fib)),
        None => {
            let _ = writeln!(out, "Not enough data for Fibonacci levels.");
        }
    }
    out
}
