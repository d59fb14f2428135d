//! Classical chart pattern analysis
//!
//! Support/resistance levels, trend lines, reversal patterns (double
//! top/bottom, head & shoulders), triangle continuations, a moving-average
//! trend read, and a basic indicator block that feeds the overall signal.

use serde::{Deserialize, Serialize};

use crate::swing::{self, Levels, PivotPoint, TrendLine};
use crate::{Direction, Signal, Tolerance, Window, OHLCV};

// ============================================================
// RESULT TYPES
// ============================================================

/// Classical pattern shapes the detector recognizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartPatternKind {
    DoubleTop,
    DoubleBottom,
    HeadAndShoulders,
    AscendingTriangle,
    DescendingTriangle,
    SymmetricTriangle,
}

impl ChartPatternKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChartPatternKind::DoubleTop => "double top",
            ChartPatternKind::DoubleBottom => "double bottom",
            ChartPatternKind::HeadAndShoulders => "head and shoulders",
            ChartPatternKind::AscendingTriangle => "ascending triangle",
            ChartPatternKind::DescendingTriangle => "descending triangle",
            ChartPatternKind::SymmetricTriangle => "symmetric triangle",
        }
    }
}

/// A matched classical pattern
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPattern {
    pub kind: ChartPatternKind,
    pub direction: Direction,
    pub signal: Signal,
    pub start_index: usize,
    pub end_index: usize,
    /// Ranking hint in [0, 100], not a probability
    pub confidence: f64,
    pub target: f64,
    pub stop_loss: f64,
    /// Pattern-defining price: peak/trough average, head, or breakout level
    pub key_price: f64,
}

/// Overall price trend from the moving-average slope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceTrend {
    Up,
    Down,
    #[default]
    Sideways,
}

impl PriceTrend {
    pub fn as_str(self) -> &'static str {
        match self {
            PriceTrend::Up => "up",
            PriceTrend::Down => "down",
            PriceTrend::Sideways => "sideways",
        }
    }
}

/// Basic indicator block. Fields are `None` while the series is too short
/// for the corresponding window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub ema_20: Option<f64>,
    pub bollinger_upper: Option<f64>,
    pub bollinger_middle: Option<f64>,
    pub bollinger_lower: Option<f64>,
}

/// Full classical analysis output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassicResult {
    pub levels: Levels,
    pub trend_lines: Vec<TrendLine>,
    pub patterns: Vec<ChartPattern>,
    pub trend: PriceTrend,
    /// Moving-average slope as percent of the last close per bar
    pub trend_slope_percent: f64,
    pub indicators: Indicators,
    pub signal: Signal,
}

/// Condensed view for the front-end
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassicSummary {
    pub trend: PriceTrend,
    pub signal: Signal,
    pub nearest_support: Option<f64>,
    pub nearest_resistance: Option<f64>,
    pub top_pattern: Option<ChartPatternKind>,
    pub top_confidence: Option<f64>,
}

impl ClassicResult {
    pub fn summary(&self) -> ClassicSummary {
        let top = self
            .patterns
            .iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence));
        ClassicSummary {
            trend: self.trend,
            signal: self.signal,
            nearest_support: self.levels.nearest_support().map(|l| l.price),
            nearest_resistance: self.levels.nearest_resistance().map(|l| l.price),
            top_pattern: top.map(|p| p.kind),
            top_confidence: top.map(|p| p.confidence),
        }
    }
}

// ============================================================
// ANALYZER
// ============================================================

/// Classical chart pattern analyzer
#[derive(Debug, Clone, Copy)]
pub struct ClassicAnalyzer {
    /// Symmetric swing detection window
    pub pivot_window: Window,
    /// Relative tolerance for merging levels
    pub level_tolerance: Tolerance,
    /// Levels kept per side
    pub max_levels: usize,
    /// Moving-average period for the trend read
    pub trend_period: Window,
    /// Slope below which a triangle boundary counts as flat (price units per bar)
    pub flat_slope: f64,
}

impl Default for ClassicAnalyzer {
    fn default() -> Self {
        Self {
            pivot_window: Window::new_const(5),
            level_tolerance: Tolerance::new_const(0.02),
            max_levels: 5,
            trend_period: Window::new_const(20),
            flat_slope: 0.01,
        }
    }
}

impl ClassicAnalyzer {
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Run the full classical analysis, extracting pivots internally.
    pub fn analyze<T: OHLCV>(&self, bars: &[T]) -> ClassicResult {
        let pivots = swing::extract_pivots(bars, self.pivot_window.get());
        self.analyze_with_pivots(bars, &pivots)
    }

    /// Run the analysis against a precomputed pivot list.
    pub fn analyze_with_pivots<T: OHLCV>(
        &self,
        bars: &[T],
        pivots: &[PivotPoint],
    ) -> ClassicResult {
        if bars.is_empty() {
            return ClassicResult::default();
        }

        let highs: Vec<f64> = bars.iter().map(|b| b.high()).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low()).collect();
        let closes: Vec<f64> = bars.iter().map(|b| b.close()).collect();
        let current_price = closes[closes.len() - 1];

        let levels = cluster(pivots, current_price, self);
        let trend_lines = swing::fit_trend_lines(pivots);
        let (trend, trend_slope_percent) = self.detect_trend(&closes);

        let mut patterns = Vec::new();
        patterns.extend(detect_double_top(&highs));
        patterns.extend(detect_double_bottom(&lows));
        patterns.extend(detect_head_and_shoulders(&highs, &lows));
        patterns.extend(self.detect_triangle(&highs, &lows, current_price));

        let indicators = compute_indicators(&closes);
        let signal = determine_signal(trend, &patterns, &indicators);

        ClassicResult {
            levels,
            trend_lines,
            patterns,
            trend,
            trend_slope_percent,
            indicators,
            signal,
        }
    }

    /// Trend read: least-squares slope of the trailing SMA, as percent of the
    /// last close. More than +-0.1% per bar counts as a trend.
    fn detect_trend(&self, closes: &[f64]) -> (PriceTrend, f64) {
        let period = self.trend_period.get();
        if closes.len() < period + 1 {
            return (PriceTrend::Sideways, 0.0);
        }

        let sma = sma_series(closes, period);
        let tail = &sma[sma.len().saturating_sub(period)..];
        let points: Vec<(f64, f64)> = tail
            .iter()
            .enumerate()
            .map(|(i, &v)| (i as f64, v))
            .collect();

        let Some((slope, _)) = swing::least_squares(&points) else {
            return (PriceTrend::Sideways, 0.0);
        };

        let last_close = closes[closes.len() - 1];
        if last_close <= f64::EPSILON {
            return (PriceTrend::Sideways, 0.0);
        }
        let slope_percent = slope / last_close * 100.0;

        let trend = if slope_percent > 0.1 {
            PriceTrend::Up
        } else if slope_percent < -0.1 {
            PriceTrend::Down
        } else {
            PriceTrend::Sideways
        };
        (trend, slope_percent)
    }

    /// Triangle detection over the last 20 bars: least-squares slopes of the
    /// highs and lows classify ascending/descending/symmetric shapes.
    fn detect_triangle(&self, highs: &[f64], lows: &[f64], current: f64) -> Option<ChartPattern> {
        const SPAN: usize = 20;
        if highs.len() < SPAN {
            return None;
        }

        let start = highs.len() - SPAN;
        let top: Vec<(f64, f64)> = highs[start..]
            .iter()
            .enumerate()
            .map(|(i, &v)| (i as f64, v))
            .collect();
        let bottom: Vec<(f64, f64)> = lows[start..]
            .iter()
            .enumerate()
            .map(|(i, &v)| (i as f64, v))
            .collect();

        let (high_slope, _) = swing::least_squares(&top)?;
        let (low_slope, _) = swing::least_squares(&bottom)?;

        let flat = self.flat_slope;
        let (kind, signal) = if high_slope < -flat && low_slope > flat {
            (ChartPatternKind::SymmetricTriangle, Signal::Neutral)
        } else if high_slope.abs() < flat && low_slope > flat {
            (ChartPatternKind::AscendingTriangle, Signal::Buy)
        } else if high_slope < -flat && low_slope.abs() < flat {
            (ChartPatternKind::DescendingTriangle, Signal::Sell)
        } else {
            return None;
        };

        let height = highs[start] - lows[start];
        let target = match signal {
            Signal::Buy => current + height,
            Signal::Sell => current - height,
            Signal::Neutral => current,
        };
        let stop_loss = match signal {
            Signal::Buy => current * 0.98,
            _ => current * 1.02,
        };

        Some(ChartPattern {
            kind,
            direction: signal.direction(),
            signal,
            start_index: start,
            end_index: highs.len() - 1,
            confidence: 70.0,
            target,
            stop_loss,
            key_price: current,
        })
    }
}

fn cluster(pivots: &[PivotPoint], current_price: f64, cfg: &ClassicAnalyzer) -> Levels {
    swing::cluster_levels(
        pivots,
        current_price,
        cfg.level_tolerance.get(),
        cfg.max_levels,
    )
}

// ============================================================
// PATTERN DETECTORS
// ============================================================

/// Index of the maximum value in a slice
fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Index of the minimum value in a slice
fn argmin(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Double top: two peaks within 3% of each other in the last 30 bars, with a
/// retracement valley between. Target projects the pattern height below the
/// valley.
fn detect_double_top(highs: &[f64]) -> Option<ChartPattern> {
    if highs.len() < 20 {
        return None;
    }

    let offset = highs.len().saturating_sub(30);
    let recent = &highs[offset..];
    let idx1 = argmax(&recent[..15]);
    let idx2 = argmax(&recent[15..]) + 15;

    let peak1 = recent[idx1];
    let peak2 = recent[idx2];
    if peak1 <= 0.0 || (peak1 - peak2).abs() / peak1 >= 0.03 {
        return None;
    }

    let valley = recent[idx1..=idx2]
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);
    let neckline_peak = (peak1 + peak2) / 2.0;
    let height = neckline_peak - valley;

    Some(ChartPattern {
        kind: ChartPatternKind::DoubleTop,
        direction: Direction::Bearish,
        signal: Signal::Sell,
        start_index: offset + idx1,
        end_index: offset + idx2,
        confidence: 75.0,
        target: valley - height,
        stop_loss: neckline_peak * 1.02,
        key_price: neckline_peak,
    })
}

/// Double bottom, mirror of [`detect_double_top`].
fn detect_double_bottom(lows: &[f64]) -> Option<ChartPattern> {
    if lows.len() < 20 {
        return None;
    }

    let offset = lows.len().saturating_sub(30);
    let recent = &lows[offset..];
    let idx1 = argmin(&recent[..15]);
    let idx2 = argmin(&recent[15..]) + 15;

    let bottom1 = recent[idx1];
    let bottom2 = recent[idx2];
    if bottom1 <= 0.0 || (bottom1 - bottom2).abs() / bottom1 >= 0.03 {
        return None;
    }

    let peak = recent[idx1..=idx2]
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let neckline_bottom = (bottom1 + bottom2) / 2.0;
    let height = peak - neckline_bottom;

    Some(ChartPattern {
        kind: ChartPatternKind::DoubleBottom,
        direction: Direction::Bullish,
        signal: Signal::Buy,
        start_index: offset + idx1,
        end_index: offset + idx2,
        confidence: 75.0,
        target: peak + height,
        stop_loss: neckline_bottom * 0.98,
        key_price: neckline_bottom,
    })
}

/// Head & shoulders: three peaks over the last 40 bars with the middle one
/// tallest and the outer two within 5%. The neckline is the lowest low
/// between the shoulders; target projects the head-to-neckline height below
/// the neckline.
fn detect_head_and_shoulders(highs: &[f64], lows: &[f64]) -> Option<ChartPattern> {
    if highs.len() < 30 {
        return None;
    }

    let offset = highs.len().saturating_sub(40);
    let recent = &highs[offset..];
    let third = recent.len() / 3;

    let left_idx = argmax(&recent[..third]);
    let head_idx = argmax(&recent[third..2 * third]) + third;
    let right_idx = argmax(&recent[2 * third..]) + 2 * third;

    let left = recent[left_idx];
    let head = recent[head_idx];
    let right = recent[right_idx];

    if head <= left || head <= right {
        return None;
    }
    if left <= 0.0 || (left - right).abs() / left >= 0.05 {
        return None;
    }

    let neckline = lows[offset..][left_idx..=right_idx]
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);
    let height = head - neckline;

    Some(ChartPattern {
        kind: ChartPatternKind::HeadAndShoulders,
        direction: Direction::Bearish,
        signal: Signal::Sell,
        start_index: offset + left_idx,
        end_index: offset + right_idx,
        confidence: 80.0,
        target: neckline - height,
        stop_loss: head * 1.02,
        key_price: neckline,
    })
}

// ============================================================
// INDICATORS
// ============================================================

fn sma_series(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }
    values
        .windows(period)
        .map(|w| w.iter().sum::<f64>() / period as f64)
        .collect()
}

fn ema_series(values: &[f64], span: usize) -> Vec<f64> {
    if values.is_empty() || span == 0 {
        return Vec::new();
    }
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut ema = values[0];
    out.push(ema);
    for &v in &values[1..] {
        ema = alpha * v + (1.0 - alpha) * ema;
        out.push(ema);
    }
    out
}

fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    if closes.len() < period + 1 {
        return None;
    }
    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let tail = &deltas[deltas.len() - period..];
    let gain: f64 = tail.iter().filter(|&&d| d > 0.0).sum::<f64>() / period as f64;
    let loss: f64 = -tail.iter().filter(|&&d| d < 0.0).sum::<f64>() / period as f64;
    if loss <= f64::EPSILON {
        return Some(100.0);
    }
    Some(100.0 - 100.0 / (1.0 + gain / loss))
}

fn compute_indicators(closes: &[f64]) -> Indicators {
    let mut out = Indicators {
        rsi: rsi(closes, 14),
        ..Indicators::default()
    };

    if closes.len() >= 26 {
        let fast = ema_series(closes, 12);
        let slow = ema_series(closes, 26);
        let macd: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let signal = ema_series(&macd, 9);
        let m = macd[macd.len() - 1];
        let s = signal[signal.len() - 1];
        out.macd = Some(m);
        out.macd_signal = Some(s);
        out.macd_histogram = Some(m - s);
    }

    if closes.len() >= 20 {
        let window = &closes[closes.len() - 20..];
        let mean = window.iter().sum::<f64>() / 20.0;
        let var = window.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / 19.0;
        let std = var.sqrt();
        out.sma_20 = Some(mean);
        out.bollinger_middle = Some(mean);
        out.bollinger_upper = Some(mean + 2.0 * std);
        out.bollinger_lower = Some(mean - 2.0 * std);
        out.ema_20 = ema_series(closes, 20).last().copied();
    }

    if closes.len() >= 50 {
        let window = &closes[closes.len() - 50..];
        out.sma_50 = Some(window.iter().sum::<f64>() / 50.0);
    }

    out
}

/// Weighted vote across trend, patterns, RSI, and MACD. Buy/Sell only when
/// one side leads by more than 2.
fn determine_signal(trend: PriceTrend, patterns: &[ChartPattern], ind: &Indicators) -> Signal {
    let mut buy = 0i32;
    let mut sell = 0i32;

    match trend {
        PriceTrend::Up => buy += 2,
        PriceTrend::Down => sell += 2,
        PriceTrend::Sideways => {}
    }

    for p in patterns {
        match p.signal {
            Signal::Buy => buy += 3,
            Signal::Sell => sell += 3,
            Signal::Neutral => {}
        }
    }

    if let Some(rsi) = ind.rsi {
        if rsi < 30.0 {
            buy += 2;
        } else if rsi > 70.0 {
            sell += 2;
        }
    }

    if let Some(hist) = ind.macd_histogram {
        if hist > 0.0 {
            buy += 1;
        } else {
            sell += 1;
        }
    }

    if buy > sell + 2 {
        Signal::Buy
    } else if sell > buy + 2 {
        Signal::Sell
    } else {
        Signal::Neutral
    }
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{flat_series, ramp, TestBar};

    fn highs_with_double_top() -> Vec<f64> {
        let mut highs = vec![100.0; 30];
        // Two peaks 1% apart with a valley between.
        highs[5] = 120.0;
        highs[14] = 105.0;
        highs[22] = 118.8;
        highs
    }

    #[test]
    fn double_top_detected() {
        let highs = highs_with_double_top();
        let p = detect_double_top(&highs).expect("double top");
        assert_eq!(p.kind, ChartPatternKind::DoubleTop);
        assert_eq!(p.signal, Signal::Sell);
        assert!(p.target < 100.0, "target projects below the valley");
        assert!(p.stop_loss > 119.0);
        assert_eq!(p.start_index, 5);
        assert_eq!(p.end_index, 22);
    }

    #[test]
    fn double_top_requires_close_peaks() {
        let mut highs = vec![100.0; 30];
        highs[5] = 120.0;
        highs[22] = 112.0; // 6.7% apart
        assert!(detect_double_top(&highs).is_none());
    }

    #[test]
    fn double_bottom_detected() {
        let mut lows = vec![100.0; 30];
        lows[4] = 80.0;
        lows[13] = 95.0;
        lows[23] = 80.6;
        let p = detect_double_bottom(&lows).expect("double bottom");
        assert_eq!(p.kind, ChartPatternKind::DoubleBottom);
        assert_eq!(p.signal, Signal::Buy);
        assert!(p.target > 100.0);
    }

    #[test]
    fn head_and_shoulders_detected() {
        let mut highs = vec![100.0; 40];
        let mut lows = vec![95.0; 40];
        highs[6] = 110.0; // left shoulder
        highs[19] = 120.0; // head
        highs[33] = 109.0; // right shoulder
        lows[12] = 90.0;
        lows[26] = 91.0;
        let p = detect_head_and_shoulders(&highs, &lows).expect("head and shoulders");
        assert_eq!(p.kind, ChartPatternKind::HeadAndShoulders);
        assert!((p.key_price - 90.0).abs() < 1e-9, "neckline at lowest trough");
        assert!((p.target - (90.0 - 30.0)).abs() < 1e-9);
        assert_eq!(p.confidence, 80.0);
    }

    #[test]
    fn head_must_exceed_shoulders() {
        let mut highs = vec![100.0; 40];
        let lows = vec![95.0; 40];
        highs[6] = 121.0;
        highs[19] = 120.0;
        highs[33] = 119.0;
        assert!(detect_head_and_shoulders(&highs, &lows).is_none());
    }

    #[test]
    fn ascending_triangle_detected() {
        // Flat highs, rising lows.
        let highs = vec![110.0; 20];
        let lows: Vec<f64> = (0..20).map(|i| 90.0 + i as f64).collect();
        let cfg = ClassicAnalyzer::default();
        let p = cfg.detect_triangle(&highs, &lows, 108.0).expect("triangle");
        assert_eq!(p.kind, ChartPatternKind::AscendingTriangle);
        assert_eq!(p.signal, Signal::Buy);
        // Height = first high - first low = 20, projected above current.
        assert!((p.target - 128.0).abs() < 1e-9);
    }

    #[test]
    fn symmetric_triangle_is_neutral() {
        let highs: Vec<f64> = (0..20).map(|i| 120.0 - i as f64 * 0.5).collect();
        let lows: Vec<f64> = (0..20).map(|i| 90.0 + i as f64 * 0.5).collect();
        let cfg = ClassicAnalyzer::default();
        let p = cfg.detect_triangle(&highs, &lows, 105.0).expect("triangle");
        assert_eq!(p.kind, ChartPatternKind::SymmetricTriangle);
        assert_eq!(p.signal, Signal::Neutral);
        assert_eq!(p.target, 105.0);
    }

    #[test]
    fn trend_reads_rising_sma() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let cfg = ClassicAnalyzer::default();
        let (trend, slope) = cfg.detect_trend(&closes);
        assert_eq!(trend, PriceTrend::Up);
        assert!(slope > 0.1);
    }

    #[test]
    fn trend_sideways_on_flat_series() {
        let closes = vec![100.0; 60];
        let cfg = ClassicAnalyzer::default();
        let (trend, slope) = cfg.detect_trend(&closes);
        assert_eq!(trend, PriceTrend::Sideways);
        assert_eq!(slope, 0.0);
    }

    #[test]
    fn rsi_bounds() {
        let rising: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        assert_eq!(rsi(&rising, 14), Some(100.0));

        let falling: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let v = rsi(&falling, 14).unwrap();
        assert!(v < 1.0, "all-loss series pins RSI near 0, got {v}");

        assert!(rsi(&rising[..10], 14).is_none());
    }

    #[test]
    fn indicators_empty_on_short_series() {
        let ind = compute_indicators(&[100.0, 101.0, 102.0]);
        assert!(ind.rsi.is_none());
        assert!(ind.macd.is_none());
        assert!(ind.sma_20.is_none());
        assert!(ind.sma_50.is_none());
    }

    #[test]
    fn analyze_empty_series_is_neutral() {
        let bars: Vec<TestBar> = Vec::new();
        let result = ClassicAnalyzer::default().analyze(&bars);
        assert!(result.patterns.is_empty());
        assert_eq!(result.signal, Signal::Neutral);
    }

    #[test]
    fn analyze_short_series_is_empty_not_error() {
        let bars = flat_series(8, 100.0);
        let result = ClassicAnalyzer::default().analyze(&bars);
        assert!(result.patterns.is_empty());
        assert!(result.levels.supports.is_empty());
        assert!(result.trend_lines.is_empty());
    }

    #[test]
    fn steady_uptrend_trend_and_vote() {
        let bars = ramp(60, 100.0, 1.0);
        let result = ClassicAnalyzer::default().analyze(&bars);
        assert_eq!(result.trend, PriceTrend::Up);
        // Trend +2 and MACD +1 for buy, but RSI pinned at 100 votes +2 sell:
        // no side leads by more than 2.
        assert_eq!(result.signal, Signal::Neutral);
    }
}
