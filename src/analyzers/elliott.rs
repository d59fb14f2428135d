//! Elliott wave segmentation and rule scoring
//!
//! Labels the waves between the most recent pivots as 1-5 (impulse) or A-B-C
//! (correction) and scores the count against the three structural rules:
//! wave 2 may not retrace beyond the origin of wave 1, wave 3 may not be the
//! shortest of 1/3/5, and wave 4 may not overlap wave 1's territory.
//! Confidence values are ranking hints, not probabilities.

use serde::{Deserialize, Serialize};

use crate::swing::{self, PivotPoint};
use crate::{Direction, FibLevel, Window, OHLCV};

// ============================================================
// TYPES
// ============================================================

/// Wave position in the 1-2-3-4-5-A-B-C cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaveLabel {
    One,
    Two,
    Three,
    Four,
    Five,
    A,
    B,
    C,
}

impl WaveLabel {
    pub const SEQUENCE: [WaveLabel; 8] = [
        WaveLabel::One,
        WaveLabel::Two,
        WaveLabel::Three,
        WaveLabel::Four,
        WaveLabel::Five,
        WaveLabel::A,
        WaveLabel::B,
        WaveLabel::C,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WaveLabel::One => "1",
            WaveLabel::Two => "2",
            WaveLabel::Three => "3",
            WaveLabel::Four => "4",
            WaveLabel::Five => "5",
            WaveLabel::A => "A",
            WaveLabel::B => "B",
            WaveLabel::C => "C",
        }
    }

    /// Next label in the cycle, wrapping C back to 1
    pub fn next(self) -> WaveLabel {
        let i = Self::SEQUENCE.iter().position(|&l| l == self).unwrap_or(0);
        Self::SEQUENCE[(i + 1) % Self::SEQUENCE.len()]
    }

    pub fn is_impulse(self) -> bool {
        matches!(
            self,
            WaveLabel::One | WaveLabel::Two | WaveLabel::Three | WaveLabel::Four | WaveLabel::Five
        )
    }
}

/// One labeled wave between two pivots
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wave {
    pub label: WaveLabel,
    pub start_index: usize,
    pub end_index: usize,
    pub start_price: f64,
    pub end_price: f64,
    /// Bullish = rising wave, Bearish = falling
    pub direction: Direction,
}

impl Wave {
    #[inline]
    pub fn length(&self) -> f64 {
        (self.end_price - self.start_price).abs()
    }
}

/// Structural rule violations found in an impulse count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaveViolation {
    /// Wave 2 closed beyond the start of wave 1 (-40)
    Wave2BeyondOrigin,
    /// Wave 3 is the shortest of waves 1/3/5 (-30)
    Wave3Shortest,
    /// Wave 4 entered wave 1's price territory (-20)
    Wave4Overlap,
}

/// Shape of the scored segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaveCountKind {
    Impulse,
    Correction,
    /// Too few pivots committed to either shape
    Forming,
}

/// Elliott wave analysis output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElliottResult {
    pub waves: Vec<Wave>,
    pub pivots: Vec<PivotPoint>,
    pub kind: Option<WaveCountKind>,
    pub current_wave: Option<WaveLabel>,
    pub next_expected: Option<WaveLabel>,
    /// Bullish when the series closed above where it opened
    pub trend: Option<Direction>,
    /// Rule-compliance score in [0, 100]
    pub confidence: f64,
    pub violations: Vec<WaveViolation>,
    /// Forward Fibonacci targets projected from the last wave
    pub retracement_targets: Vec<FibLevel>,
    pub extension_target: Option<FibLevel>,
}

impl ElliottResult {
    /// True when the count scored at least 50
    pub fn is_valid(&self) -> bool {
        self.kind.is_some() && self.confidence >= 50.0
    }
}

// ============================================================
// ANALYZER
// ============================================================

/// Elliott wave analyzer
#[derive(Debug, Clone, Copy)]
pub struct ElliottAnalyzer {
    pub pivot_window: Window,
    /// Pivots considered for the count (labels cap at 8 waves)
    pub max_pivots: usize,
}

impl Default for ElliottAnalyzer {
    fn default() -> Self {
        Self {
            pivot_window: Window::new_const(5),
            max_pivots: 9,
        }
    }
}

impl ElliottAnalyzer {
    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn analyze<T: OHLCV>(&self, bars: &[T]) -> ElliottResult {
        let pivots = swing::extract_pivots(bars, self.pivot_window.get());
        self.analyze_with_pivots(bars, &pivots)
    }

    pub fn analyze_with_pivots<T: OHLCV>(
        &self,
        bars: &[T],
        pivots: &[PivotPoint],
    ) -> ElliottResult {
        if bars.is_empty() || pivots.len() < 3 {
            return ElliottResult::default();
        }

        let window = &pivots[pivots.len().saturating_sub(self.max_pivots)..];
        let waves = label_waves(window);

        let trend = if bars[bars.len() - 1].close() > bars[0].close() {
            Direction::Bullish
        } else {
            Direction::Bearish
        };

        let (kind, confidence, violations) = if window.len() >= 6 {
            let (score, violations) = score_impulse(window);
            (WaveCountKind::Impulse, score, violations)
        } else if window.len() >= 4 {
            (WaveCountKind::Correction, score_correction(window), Vec::new())
        } else {
            (WaveCountKind::Forming, 50.0, Vec::new())
        };

        let current_wave = waves.last().map(|w| w.label);
        let next_expected = current_wave.map(WaveLabel::next);
        let (retracement_targets, extension_target) = fibonacci_targets(waves.last());

        ElliottResult {
            waves,
            pivots: window.to_vec(),
            kind: Some(kind),
            current_wave,
            next_expected,
            trend: Some(trend),
            confidence,
            violations,
            retracement_targets,
            extension_target,
        }
    }
}

/// Label consecutive pivot pairs 1..5 then A..C.
fn label_waves(pivots: &[PivotPoint]) -> Vec<Wave> {
    pivots
        .windows(2)
        .take(WaveLabel::SEQUENCE.len())
        .enumerate()
        .map(|(i, pair)| {
            let (start, end) = (pair[0], pair[1]);
            Wave {
                label: WaveLabel::SEQUENCE[i],
                start_index: start.index,
                end_index: end.index,
                start_price: start.price,
                end_price: end.price,
                direction: if end.price > start.price {
                    Direction::Bullish
                } else {
                    Direction::Bearish
                },
            }
        })
        .collect()
}

/// Score a 5-wave impulse over the first six pivots of the window.
///
/// Base 100; each broken rule subtracts its fixed penalty, Fibonacci
/// conformance of waves 2 and 3 adds small bonuses. Clamped to [0, 100].
fn score_impulse(pivots: &[PivotPoint]) -> (f64, Vec<WaveViolation>) {
    debug_assert!(pivots.len() >= 6);

    let w1_start = pivots[0].price;
    let w1_end = pivots[1].price;
    let w2_end = pivots[2].price;
    let w3_end = pivots[3].price;
    let w4_end = pivots[4].price;
    let w5_end = pivots[5].price;

    let rising = w1_end > w1_start;
    let w1_len = (w1_end - w1_start).abs();
    let w3_len = (w3_end - w2_end).abs();
    let w5_len = (w5_end - w4_end).abs();

    let mut confidence: f64 = 100.0;
    let mut violations = Vec::new();

    // Rule 1: wave 2 may not close beyond wave 1's origin.
    if (rising && w2_end < w1_start) || (!rising && w2_end > w1_start) {
        confidence -= 40.0;
        violations.push(WaveViolation::Wave2BeyondOrigin);
    }

    // Rule 2: wave 3 may not be the shortest of 1/3/5.
    if w3_len < w1_len && w3_len < w5_len {
        confidence -= 30.0;
        violations.push(WaveViolation::Wave3Shortest);
    }

    // Rule 3: wave 4 may not enter wave 1's territory.
    if (rising && w4_end < w1_end) || (!rising && w4_end > w1_end) {
        confidence -= 20.0;
        violations.push(WaveViolation::Wave4Overlap);
    }

    if w1_len > 0.0 {
        let w2_retracement = (w2_end - w1_end).abs() / w1_len;
        if (0.382..=0.618).contains(&w2_retracement) {
            confidence += 5.0;
        }
        let w3_extension = w3_len / w1_len;
        if (1.618..=2.618).contains(&w3_extension) {
            confidence += 10.0;
        }
    }

    (confidence.clamp(0.0, 100.0), violations)
}

/// Score an A-B-C correction over the first four pivots of the window.
fn score_correction(pivots: &[PivotPoint]) -> f64 {
    debug_assert!(pivots.len() >= 4);

    let a_start = pivots[0].price;
    let a_end = pivots[1].price;
    let b_end = pivots[2].price;
    let c_end = pivots[3].price;

    let a_len = (a_end - a_start).abs();
    let c_len = (c_end - b_end).abs();

    let mut confidence: f64 = 80.0;
    if a_len > 0.0 {
        let b_retracement = (b_end - a_end).abs() / a_len;
        if (0.382..=0.786).contains(&b_retracement) {
            confidence += 10.0;
        }
        let c_ratio = c_len / a_len;
        if (0.618..=1.618).contains(&c_ratio) {
            confidence += 10.0;
        }
    }

    confidence.min(100.0)
}

/// Forward Fibonacci targets from the last completed wave: four retracement
/// levels against the wave and one 161.8% extension with it.
fn fibonacci_targets(last: Option<&Wave>) -> (Vec<FibLevel>, Option<FibLevel>) {
    let Some(wave) = last else {
        return (Vec::new(), None);
    };
    let length = wave.length();
    let base = wave.end_price;
    let sign = if wave.direction == Direction::Bullish {
        1.0
    } else {
        -1.0
    };

    let retracements = [0.236, 0.382, 0.5, 0.618]
        .iter()
        .map(|&r| FibLevel {
            ratio: r,
            price: base - sign * length * r,
        })
        .collect();
    let extension = FibLevel {
        ratio: 1.618,
        price: base + sign * length * 0.618,
    };

    (retracements, Some(extension))
}

// ============================================================
// TESTS
// ============================================================
