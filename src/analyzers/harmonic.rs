//! Harmonic pattern matching (Gartley, Butterfly, Bat, Crab, AB=CD)
//!
//! Slides a five-pivot XABCD window (four for AB=CD) across the extracted
//! swing points and tests the leg ratios against each pattern's Fibonacci
//! bands, widened by a configurable tolerance. Matches carry a potential
//! reversal zone and fixed-ratio targets projected from the D point.

use serde::{Deserialize, Serialize};

use crate::swing::{self, PivotPoint};
use crate::{Direction, FibLevel, Tolerance, Window, OHLCV};

// ============================================================
// TYPES
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HarmonicKind {
    Gartley,
    Butterfly,
    Bat,
    Crab,
    Abcd,
}

impl HarmonicKind {
    pub fn as_str(self) -> &'static str {
        match self {
            HarmonicKind::Gartley => "Gartley",
            HarmonicKind::Butterfly => "Butterfly",
            HarmonicKind::Bat => "Bat",
            HarmonicKind::Crab => "Crab",
            HarmonicKind::Abcd => "AB=CD",
        }
    }
}

/// Measured leg ratios of a match. AB=CD patterns fill only `abc` (BC/AB)
/// and `bcd` (CD/BC).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HarmonicRatios {
    pub xab: Option<f64>,
    pub abc: Option<f64>,
    pub bcd: Option<f64>,
    pub xad: Option<f64>,
}

/// One matched harmonic pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarmonicMatch {
    pub kind: HarmonicKind,
    /// Bullish when D is a swing low (reversal up expected)
    pub direction: Direction,
    /// X, A, B, C, D for XABCD patterns; A, B, C, D for AB=CD
    pub points: Vec<PivotPoint>,
    pub ratios: HarmonicRatios,
    pub confidence: f64,
    pub prz_low: f64,
    pub prz_high: f64,
    pub target_1: f64,
    pub target_2: f64,
    pub stop_loss: f64,
}

/// Harmonic analysis output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HarmonicResult {
    /// Matches sorted by confidence, best first
    pub matches: Vec<HarmonicMatch>,
    /// Fibonacci grid over the full series range, high to low
    pub fibonacci: Vec<FibLevel>,
}

/// Acceptance bands for one XABCD pattern, before tolerance widening
struct RatioBands {
    kind: HarmonicKind,
    xab: (f64, f64),
    abc: (f64, f64),
    xad: (f64, f64),
}

const XABCD_BANDS: [RatioBands; 4] = [
    RatioBands {
        kind: HarmonicKind::Gartley,
        xab: (0.618, 0.618),
        abc: (0.382, 0.886),
        xad: (0.786, 0.786),
    },
    RatioBands {
        kind: HarmonicKind::Butterfly,
        xab: (0.786, 0.786),
        abc: (0.382, 0.886),
        xad: (1.27, 1.618),
    },
    RatioBands {
        kind: HarmonicKind::Bat,
        xab: (0.382, 0.50),
        abc: (0.382, 0.886),
        xad: (0.886, 0.886),
    },
    RatioBands {
        kind: HarmonicKind::Crab,
        xab: (0.382, 0.618),
        abc: (0.382, 0.886),
        xad: (1.618, 1.618),
    },
];

const FIB_GRID: [f64; 9] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0, 1.272, 1.618];

// ============================================================
// ANALYZER
// ============================================================

/// Harmonic pattern analyzer
#[derive(Debug, Clone, Copy)]
pub struct HarmonicAnalyzer {
    pub pivot_window: Window,
    /// Band widening applied at each edge
    pub tolerance: Tolerance,
    pub max_matches: usize,
}

impl Default for HarmonicAnalyzer {
    fn default() -> Self {
        Self {
            pivot_window: Window::new_const(5),
            tolerance: Tolerance::new_const(0.05),
            max_matches: 5,
        }
    }
}

impl HarmonicAnalyzer {
    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn analyze<T: OHLCV>(&self, bars: &[T]) -> HarmonicResult {
        let pivots = swing::extract_pivots(bars, self.pivot_window.get());
        self.analyze_with_pivots(bars, &pivots)
    }

    pub fn analyze_with_pivots<T: OHLCV>(
        &self,
        bars: &[T],
        pivots: &[PivotPoint],
    ) -> HarmonicResult {
        HarmonicResult {
            matches: self.match_pivots(pivots),
            fibonacci: range_fibonacci(bars),
        }
    }

    /// Test every pivot window against the ratio tables and rank the matches.
    pub fn match_pivots(&self, pivots: &[PivotPoint]) -> Vec<HarmonicMatch> {
        let mut matches = Vec::new();

        for window in pivots.windows(5) {
            if let Some(m) = self.match_xabcd(window) {
                matches.push(m);
            }
        }
        for window in pivots.windows(4) {
            if let Some(m) = self.match_abcd(window) {
                matches.push(m);
            }
        }

        matches.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        matches.truncate(self.max_matches);
        matches
    }

    fn match_xabcd(&self, window: &[PivotPoint]) -> Option<HarmonicMatch> {
        let [x, a, b, c, d] = window else {
            return None;
        };
        if !alternating(window) {
            return None;
        }

        let xa = (a.price - x.price).abs();
        let ab = (b.price - a.price).abs();
        let bc = (c.price - b.price).abs();
        let cd = (d.price - c.price).abs();
        if xa <= 0.0 || ab <= 0.0 || bc <= 0.0 {
            return None;
        }

        let xab = ab / xa;
        let abc = bc / ab;
        let bcd = cd / bc;
        let xad = (d.price - x.price).abs() / xa;

        let tol = self.tolerance.get();
        let bands = XABCD_BANDS.iter().find(|bands| {
            in_band(xab, bands.xab, tol) && in_band(abc, bands.abc, tol) && in_band(xad, bands.xad, tol)
        })?;

        let bullish = d.kind.is_low();
        let sign = if bullish { 1.0 } else { -1.0 };

        let mut confidence: f64 = 75.0;
        if bands.kind == HarmonicKind::Gartley {
            if (xab - 0.618).abs() < 0.02 {
                confidence += 5.0;
            }
            if (xad - 0.786).abs() < 0.02 {
                confidence += 10.0;
            }
        }

        // The reversal zone centers on the 0.786 XD projection for Gartley
        // and on D itself for the extension patterns.
        let prz_center = match bands.kind {
            HarmonicKind::Gartley => {
                if d.price >= x.price {
                    x.price + xa * 0.786
                } else {
                    x.price - xa * 0.786
                }
            }
            _ => d.price,
        };

        Some(HarmonicMatch {
            kind: bands.kind,
            direction: if bullish {
                Direction::Bullish
            } else {
                Direction::Bearish
            },
            points: window.to_vec(),
            ratios: HarmonicRatios {
                xab: Some(xab),
                abc: Some(abc),
                bcd: Some(bcd),
                xad: Some(xad),
            },
            confidence: confidence.min(95.0),
            prz_low: prz_center * 0.99,
            prz_high: prz_center * 1.01,
            target_1: d.price + sign * xa * 0.382,
            target_2: d.price + sign * xa * 0.618,
            stop_loss: d.price - sign * xa * 0.118,
        })
    }

    fn match_abcd(&self, window: &[PivotPoint]) -> Option<HarmonicMatch> {
        let [a, b, c, d] = window else {
            return None;
        };
        if !alternating(window) {
            return None;
        }

        let ab = (b.price - a.price).abs();
        let bc = (c.price - b.price).abs();
        let cd = (d.price - c.price).abs();
        if ab <= 0.0 || bc <= 0.0 {
            return None;
        }

        let abc = bc / ab;
        let bcd = cd / bc;
        if !(0.55..=0.85).contains(&abc) || !(1.2..=1.7).contains(&bcd) {
            return None;
        }

        let mut confidence: f64 = 70.0;
        if (0.6..=0.8).contains(&abc) {
            confidence += 10.0;
        }
        if (1.27..=1.618).contains(&bcd) {
            confidence += 10.0;
        }

        let bullish = d.kind.is_low();
        let sign = if bullish { 1.0 } else { -1.0 };

        Some(HarmonicMatch {
            kind: HarmonicKind::Abcd,
            direction: if bullish {
                Direction::Bullish
            } else {
                Direction::Bearish
            },
            points: window.to_vec(),
            ratios: HarmonicRatios {
                abc: Some(abc),
                bcd: Some(bcd),
                ..HarmonicRatios::default()
            },
            confidence: confidence.min(95.0),
            prz_low: d.price * 0.99,
            prz_high: d.price * 1.01,
            target_1: d.price + sign * ab * 0.618,
            target_2: d.price + sign * ab,
            stop_loss: d.price - sign * ab * 0.236,
        })
    }
}

/// Pivots must alternate high/low for legs to be meaningful.
fn alternating(pivots: &[PivotPoint]) -> bool {
    pivots.windows(2).all(|pair| pair[0].kind != pair[1].kind)
}

#[inline]
fn in_band(value: f64, band: (f64, f64), tolerance: f64) -> bool {
    value >= band.0 - tolerance && value <= band.1 + tolerance
}

/// Fibonacci grid spanning the full high-low range of the series.
pub fn range_fibonacci<T: OHLCV>(bars: &[T]) -> Vec<FibLevel> {
    if bars.is_empty() {
        return Vec::new();
    }
    let high = bars.iter().map(|b| b.high()).fold(f64::MIN, f64::max);
    let low = bars.iter().map(|b| b.low()).fold(f64::MAX, f64::min);
    let diff = high - low;

    FIB_GRID
        .iter()
        .map(|&ratio| FibLevel {
            ratio,
            price: high - diff * ratio,
        })
        .collect()
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swing::PivotKind;
    use crate::test_util::TestBar;

    fn pivot(index: usize, price: f64, kind: PivotKind) -> PivotPoint {
        PivotPoint::new(index, price, kind)
    }

    /// Textbook bullish Gartley: XAB 0.62, ABC 0.516, XAD 0.786 where the
    /// XD leg is measured from X.
    fn gartley_pivots() -> Vec<PivotPoint> {
        vec![
            pivot(0, 100.0, PivotKind::Low),
            pivot(10, 150.0, PivotKind::High),
            pivot(20, 119.0, PivotKind::Low),
            pivot(30, 135.0, PivotKind::High),
            pivot(40, 60.7, PivotKind::Low),
        ]
    }

    #[test]
    fn gartley_matches_with_high_confidence() {
        let matches = HarmonicAnalyzer::default().match_pivots(&gartley_pivots());
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert_eq!(m.kind, HarmonicKind::Gartley);
        assert_eq!(m.direction, Direction::Bullish);
        assert!(m.confidence >= 75.0);
        assert!(m.prz_low < m.prz_high);
        // Bullish reversal: targets above D, stop below.
        assert!(m.target_1 > 60.7 && m.target_2 > m.target_1);
        assert!(m.stop_loss < 60.7);
    }

    #[test]
    fn xad_is_the_xd_leg_over_xa() {
        let matches = HarmonicAnalyzer::default().match_pivots(&gartley_pivots());
        let ratios = matches[0].ratios;
        // |D - X| / |A - X| = 39.3 / 50.
        assert!((ratios.xad.unwrap() - 0.786).abs() < 1e-9);
        // The PRZ brackets the 0.786 XD projection below X.
        let m = &matches[0];
        assert!(m.prz_low < 60.7 && 60.7 < m.prz_high);
    }

    #[test]
    fn shallow_d_above_x_is_not_a_gartley() {
        // Same X-A-B-C but D only falls back to 110.7: XD/XA is 0.214,
        // far outside the 0.786 band.
        let mut pivots = gartley_pivots();
        pivots[4] = pivot(40, 110.7, PivotKind::Low);
        assert!(HarmonicAnalyzer::default().match_pivots(&pivots).is_empty());
    }

    #[test]
    fn non_alternating_pivots_never_match() {
        let mut pivots = gartley_pivots();
        pivots[2].kind = PivotKind::High;
        assert!(HarmonicAnalyzer::default().match_pivots(&pivots).is_empty());
    }

    #[test]
    fn ratios_outside_all_bands_yield_nothing() {
        // AB retraces only 20% of XA, outside every XAB band.
        let pivots = vec![
            pivot(0, 100.0, PivotKind::Low),
            pivot(10, 150.0, PivotKind::High),
            pivot(20, 140.0, PivotKind::Low),
            pivot(30, 146.0, PivotKind::High),
            pivot(40, 120.0, PivotKind::Low),
        ];
        assert!(HarmonicAnalyzer::default().match_pivots(&pivots).is_empty());
    }

    #[test]
    fn abcd_match_from_four_pivots() {
        // AB = 20 down, BC = 14 (0.7 of AB), CD = 21 (1.5 of BC).
        let pivots = vec![
            pivot(0, 120.0, PivotKind::High),
            pivot(10, 100.0, PivotKind::Low),
            pivot(20, 114.0, PivotKind::High),
            pivot(30, 93.0, PivotKind::Low),
        ];
        let matches = HarmonicAnalyzer::default().match_pivots(&pivots);
        let m = matches
            .iter()
            .find(|m| m.kind == HarmonicKind::Abcd)
            .expect("AB=CD should match");
        assert_eq!(m.direction, Direction::Bullish);
        // Both ratio bonuses apply.
        assert_eq!(m.confidence, 90.0);
        assert_eq!(m.ratios.xab, None);
    }

    #[test]
    fn matches_are_sorted_and_capped() {
        let analyzer = HarmonicAnalyzer {
            max_matches: 1,
            ..HarmonicAnalyzer::default()
        };
        // Gartley window plus an embedded AB=CD candidate.
        let matches = analyzer.match_pivots(&gartley_pivots());
        assert!(matches.len() <= 1);
    }

    #[test]
    fn range_grid_spans_high_to_low() {
        let bars = vec![
            TestBar::new(100.0, 110.0, 90.0, 105.0),
            TestBar::new(105.0, 120.0, 100.0, 115.0),
        ];
        let grid = range_fibonacci(&bars);
        assert_eq!(grid.len(), 9);
        assert_eq!(grid[0].price, 120.0); // 0% = high
        assert_eq!(grid[6].price, 90.0); // 100% = low
        assert!(grid[8].price < 90.0); // 161.8% extends below
    }

    #[test]
    fn empty_series_yields_empty_grid() {
        assert!(range_fibonacci::<TestBar>(&[]).is_empty());
    }
}
