//! Fibonacci retracement and extension levels over the most recent swing
//!
//! The swing is the high-low range of the lookback window. Trend direction
//! decides which end anchors the retracement grid; the current price's
//! position in that grid drives a zone classification and a suggested
//! action.

use serde::{Deserialize, Serialize};

use crate::{Direction, FibLevel, Window, OHLCV};

const RETRACEMENT_RATIOS: [f64; 7] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0];
const EXTENSION_RATIOS: [f64; 5] = [1.272, 1.618, 2.0, 2.618, 3.618];

// ============================================================
// TYPES
// ============================================================

/// Where the last close sits relative to the retracement grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FibZone {
    /// Between two adjacent retracement ratios, `from_ratio <= to_ratio`
    Between { from_ratio: f64, to_ratio: f64 },
    /// Beyond the 0% level, past the swing extreme
    Extended,
    /// Beyond the 100% level, past the swing origin
    Oversold,
}

/// Suggested stance from the golden-zone rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FibAction {
    StrongBuy,
    Buy,
    StrongSell,
    Sell,
    Hold,
    Wait,
}

impl FibAction {
    pub fn as_str(self) -> &'static str {
        match self {
            FibAction::StrongBuy => "strong buy",
            FibAction::Buy => "buy",
            FibAction::StrongSell => "strong sell",
            FibAction::Sell => "sell",
            FibAction::Hold => "hold",
            FibAction::Wait => "wait",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FibLevelKind {
    Retracement,
    Extension,
}

/// A level annotated with its kind and distance from the last close
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyLevel {
    pub kind: FibLevelKind,
    pub ratio: f64,
    pub price: f64,
    /// Percent distance from the last close
    pub distance_percent: f64,
}

/// Fibonacci analysis output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FibonacciResult {
    pub swing_high: f64,
    pub swing_low: f64,
    pub trend: Direction,
    pub retracements: Vec<FibLevel>,
    pub extensions: Vec<FibLevel>,
    pub zone: FibZone,
    pub action: FibAction,
    /// Five levels closest to the last close
    pub key_levels: Vec<KeyLevel>,
    /// 1.272, 1.618 and 2.618 extensions in trade order
    pub targets: [f64; 3],
    pub stop_loss: f64,
}

// ============================================================
// ANALYZER
// ============================================================

/// Fibonacci level analyzer
#[derive(Debug, Clone, Copy)]
pub struct FibonacciAnalyzer {
    /// Bars considered when finding the swing
    pub lookback: Window,
}

impl Default for FibonacciAnalyzer {
    fn default() -> Self {
        Self {
            lookback: Window::new_const(50),
        }
    }
}

impl FibonacciAnalyzer {
    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn analyze<T: OHLCV>(&self, bars: &[T]) -> Option<FibonacciResult> {
        if bars.len() < 2 {
            return None;
        }

        let lookback = self.lookback.get().min(bars.len());
        let window = &bars[bars.len() - lookback..];
        let swing_high = window.iter().map(|b| b.high()).fold(f64::MIN, f64::max);
        let swing_low = window.iter().map(|b| b.low()).fold(f64::MAX, f64::min);
        let diff = swing_high - swing_low;
        let close = bars[bars.len() - 1].close();

        let trend = detect_trend(bars, swing_high, swing_low);

        // Bullish grids retrace down from the high, bearish up from the low.
        let level = |ratio: f64, retracement: bool| -> f64 {
            match (trend, retracement) {
                (Direction::Bearish, true) => swing_low + ratio * diff,
                (Direction::Bearish, false) => swing_high - ratio * diff,
                (_, true) => swing_high - ratio * diff,
                (_, false) => swing_low + ratio * diff,
            }
        };

        let retracements: Vec<FibLevel> = RETRACEMENT_RATIOS
            .iter()
            .map(|&ratio| FibLevel {
                ratio,
                price: level(ratio, true),
            })
            .collect();
        let extensions: Vec<FibLevel> = EXTENSION_RATIOS
            .iter()
            .map(|&ratio| FibLevel {
                ratio,
                price: level(ratio, false),
            })
            .collect();

        let zone = classify_zone(close, &retracements);
        let action = suggest_action(close, trend, &retracements);
        let key_levels = key_levels(close, &retracements, &extensions);

        let ext_price = |ratio: f64| {
            extensions
                .iter()
                .find(|l| l.ratio == ratio)
                .map(|l| l.price)
                .unwrap_or(close)
        };
        let retr_price = |ratio: f64| {
            retracements
                .iter()
                .find(|l| l.ratio == ratio)
                .map(|l| l.price)
                .unwrap_or(close)
        };

        let targets = [ext_price(1.272), ext_price(1.618), ext_price(2.618)];
        let stop_loss = retr_price(0.786);

        Some(FibonacciResult {
            swing_high,
            swing_low,
            trend,
            retracements,
            extensions,
            zone,
            action,
            key_levels,
            targets,
            stop_loss,
        })
    }
}

/// Trend from position in the range plus a short/long SMA cross; falls back
/// to the recent close change when the signals disagree.
fn detect_trend<T: OHLCV>(bars: &[T], swing_high: f64, swing_low: f64) -> Direction {
    let close = bars[bars.len() - 1].close();
    let midpoint = (swing_high + swing_low) / 2.0;

    if bars.len() >= 20 {
        let sma = |n: usize| {
            bars[bars.len() - n..].iter().map(|b| b.close()).sum::<f64>() / n as f64
        };
        let (sma10, sma20) = (sma(10), sma(20));
        if close > midpoint && sma10 > sma20 {
            return Direction::Bullish;
        }
        if close < midpoint && sma10 < sma20 {
            return Direction::Bearish;
        }
    }

    let reference = if bars.len() >= 5 {
        bars[bars.len() - 5].close()
    } else {
        bars[0].close()
    };
    if close >= reference {
        Direction::Bullish
    } else {
        Direction::Bearish
    }
}

/// Locate the close between adjacent retracement levels.
fn classify_zone(close: f64, retracements: &[FibLevel]) -> FibZone {
    let mut sorted: Vec<&FibLevel> = retracements.iter().collect();
    sorted.sort_by(|a, b| b.price.total_cmp(&a.price));

    let highest = sorted.first();
    let lowest = sorted.last();
    if highest.is_some_and(|l| close > l.price) {
        return FibZone::Extended;
    }
    if lowest.is_some_and(|l| close < l.price) {
        return FibZone::Oversold;
    }

    for pair in sorted.windows(2) {
        if close <= pair[0].price && close >= pair[1].price {
            // Bearish grids run the ratios the other way; keep the pair ordered.
            let (from_ratio, to_ratio) = if pair[0].ratio <= pair[1].ratio {
                (pair[0].ratio, pair[1].ratio)
            } else {
                (pair[1].ratio, pair[0].ratio)
            };
            return FibZone::Between {
                from_ratio,
                to_ratio,
            };
        }
    }
    FibZone::Extended
}

/// Golden-zone rules: buying a pullback into 0.382-0.618 of an uptrend,
/// mirrored for a downtrend.
fn suggest_action(close: f64, trend: Direction, retracements: &[FibLevel]) -> FibAction {
    let price_at = |ratio: f64| {
        retracements
            .iter()
            .find(|l| l.ratio == ratio)
            .map(|l| l.price)
            .unwrap_or(close)
    };
    let p382 = price_at(0.382);
    let p500 = price_at(0.5);
    let p618 = price_at(0.618);

    match trend {
        Direction::Bearish => {
            // Bearish grid rises from the low: p382 < p500 < p618. Selling a
            // rally into the golden zone, waiting once it pushes past 61.8%.
            if (p500..=p618).contains(&close) {
                FibAction::StrongSell
            } else if (p382..=p500).contains(&close) {
                FibAction::Sell
            } else if close > p618 {
                FibAction::Wait
            } else {
                FibAction::Hold
            }
        }
        _ => {
            // Bullish grid descends from the high: p618 < p500 < p382.
            if (p618..=p500).contains(&close) {
                FibAction::StrongBuy
            } else if (p500..=p382).contains(&close) {
                FibAction::Buy
            } else if close < p618 {
                FibAction::Wait
            } else {
                FibAction::Hold
            }
        }
    }
}

/// Five levels closest to the close by percent distance.
fn key_levels(close: f64, retracements: &[FibLevel], extensions: &[FibLevel]) -> Vec<KeyLevel> {
    let mut levels: Vec<KeyLevel> = retracements
        .iter()
        .map(|l| (FibLevelKind::Retracement, l))
        .chain(extensions.iter().map(|l| (FibLevelKind::Extension, l)))
        .map(|(kind, l)| KeyLevel {
            kind,
            ratio: l.ratio,
            price: l.price,
            distance_percent: if close != 0.0 {
                (l.price - close).abs() / close * 100.0
            } else {
                f64::INFINITY
            },
        })
        .collect();

    levels.sort_by(|a, b| a.distance_percent.total_cmp(&b.distance_percent));
    levels.truncate(5);
    levels
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::TestBar;

    /// 60 bars: rally 100 -> 160, then 10 bars consolidating at `level`.
    fn rally_then_flat(level: f64) -> Vec<TestBar> {
        let mut bars: Vec<TestBar> = (0..50)
            .map(|i| {
                let base = 100.0 + i as f64 * 60.0 / 49.0;
                TestBar::new(base, base + 1.0, base - 1.0, base + 0.5)
            })
            .collect();
        for _ in 0..10 {
            bars.push(TestBar::new(level, level + 1.0, level - 0.5, level));
        }
        bars
    }

    fn grid(high: f64, low: f64) -> Vec<FibLevel> {
        super::RETRACEMENT_RATIOS
            .iter()
            .map(|&ratio| FibLevel {
                ratio,
                price: high - ratio * (high - low),
            })
            .collect()
    }

    #[test]
    fn too_few_bars_yields_none() {
        let bars = vec![TestBar::new(100.0, 101.0, 99.0, 100.5)];
        assert!(FibonacciAnalyzer::default().analyze(&bars).is_none());
    }

    #[test]
    fn bullish_grid_descends_from_high() {
        let bars = rally_then_flat(158.0);
        let result = FibonacciAnalyzer::default().analyze(&bars).unwrap();
        assert_eq!(result.trend, Direction::Bullish);
        // 0% anchors at the swing high, 100% at the low.
        assert_eq!(result.retracements[0].price, result.swing_high);
        assert_eq!(result.retracements[6].price, result.swing_low);
        // Extensions project beyond the high.
        assert!(result.extensions.iter().all(|l| l.price > result.swing_high));
        assert_eq!(result.targets[0], result.extensions[0].price);
        // Stop sits at the deep 78.6% retracement.
        assert!(result.stop_loss < result.swing_high);
    }

    #[test]
    fn golden_zone_pullback_is_strong_buy() {
        // Grid over 100..160: 50% at 130, 61.8% at 122.92.
        let levels = grid(160.0, 100.0);
        assert_eq!(
            suggest_action(126.0, Direction::Bullish, &levels),
            FibAction::StrongBuy
        );
        assert_eq!(
            suggest_action(134.0, Direction::Bullish, &levels),
            FibAction::Buy
        );
        assert_eq!(
            suggest_action(118.0, Direction::Bullish, &levels),
            FibAction::Wait
        );
    }

    #[test]
    fn shallow_pullback_is_hold() {
        let bars = rally_then_flat(158.0);
        let result = FibonacciAnalyzer::default().analyze(&bars).unwrap();
        assert_eq!(result.action, FibAction::Hold);
    }

    #[test]
    fn zone_brackets_the_close() {
        let bars = rally_then_flat(150.0);
        let result = FibonacciAnalyzer::default().analyze(&bars).unwrap();
        match result.zone {
            FibZone::Between {
                from_ratio,
                to_ratio,
            } => {
                assert!(from_ratio < to_ratio);
            }
            other => panic!("expected a bracketing zone, got {other:?}"),
        }
    }

    #[test]
    fn zone_ratio_pair_is_ordered_on_a_bearish_grid() {
        let mut bars: Vec<TestBar> = (0..50)
            .map(|i| {
                let base = 160.0 - i as f64 * 60.0 / 49.0;
                TestBar::new(base, base + 1.0, base - 1.0, base - 0.5)
            })
            .collect();
        for _ in 0..10 {
            bars.push(TestBar::new(101.0, 102.0, 99.5, 100.0));
        }
        let result = FibonacciAnalyzer::default().analyze(&bars).unwrap();
        assert_eq!(result.trend, Direction::Bearish);
        match result.zone {
            FibZone::Between {
                from_ratio,
                to_ratio,
            } => {
                assert!(from_ratio < to_ratio);
            }
            other => panic!("expected a bracketing zone, got {other:?}"),
        }
    }

    #[test]
    fn key_levels_are_five_closest() {
        let bars = rally_then_flat(150.0);
        let result = FibonacciAnalyzer::default().analyze(&bars).unwrap();
        assert_eq!(result.key_levels.len(), 5);
        for pair in result.key_levels.windows(2) {
            assert!(pair[0].distance_percent <= pair[1].distance_percent);
        }
    }

    #[test]
    fn downtrend_mirrors_the_grid() {
        let mut bars: Vec<TestBar> = (0..50)
            .map(|i| {
                let base = 160.0 - i as f64 * 60.0 / 49.0;
                TestBar::new(base, base + 1.0, base - 1.0, base - 0.5)
            })
            .collect();
        for _ in 0..10 {
            bars.push(TestBar::new(101.0, 102.0, 99.5, 100.0));
        }
        let result = FibonacciAnalyzer::default().analyze(&bars).unwrap();
        assert_eq!(result.trend, Direction::Bearish);
        // 0% anchors at the swing low and extensions project below it.
        assert_eq!(result.retracements[0].price, result.swing_low);
        assert!(result.extensions.iter().all(|l| l.price < result.swing_low));
    }
}
