//! Swing-point foundation shared by every analyzer
//!
//! Pivot extraction, support/resistance clustering, and least-squares trend
//! line fitting. Everything downstream (classic, Elliott, harmonic, ICT)
//! consumes the pivot list produced here.

use serde::{Deserialize, Serialize};

use crate::OHLCV;

// ============================================================
// PIVOTS
// ============================================================

/// Kind of local extremum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PivotKind {
    High,
    Low,
}

impl PivotKind {
    #[inline]
    pub fn is_high(self) -> bool {
        matches!(self, PivotKind::High)
    }

    #[inline]
    pub fn is_low(self) -> bool {
        matches!(self, PivotKind::Low)
    }
}

/// A swing high or swing low in the bar series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PivotPoint {
    /// Index into the bar series
    pub index: usize,
    pub price: f64,
    pub kind: PivotKind,
}

impl PivotPoint {
    pub fn new(index: usize, price: f64, kind: PivotKind) -> Self {
        Self { index, price, kind }
    }

    /// True if `other` is the more extreme pivot of the same kind.
    fn beaten_by(&self, other: &PivotPoint) -> bool {
        match self.kind {
            PivotKind::High => other.price > self.price,
            PivotKind::Low => other.price < self.price,
        }
    }
}

/// Extract swing highs and lows using a symmetric window.
///
/// Bar `i` is a swing high when its high is the maximum of `[i-window, i+window]`,
/// a swing low when its low is the minimum of that range. Consecutive pivots of
/// the same kind are merged, keeping the more extreme price, so the returned
/// list strictly alternates High/Low.
///
/// Returns an empty list when the series is shorter than `2 * window + 1`.
pub fn extract_pivots<T: OHLCV>(bars: &[T], window: usize) -> Vec<PivotPoint> {
    if window == 0 || bars.len() < 2 * window + 1 {
        return Vec::new();
    }

    let mut raw = Vec::new();
    for i in window..bars.len() - window {
        let slice = &bars[i - window..=i + window];

        let high = bars[i].high();
        if slice.iter().all(|b| b.high() <= high) {
            raw.push(PivotPoint::new(i, high, PivotKind::High));
        }

        let low = bars[i].low();
        if slice.iter().all(|b| b.low() >= low) {
            raw.push(PivotPoint::new(i, low, PivotKind::Low));
        }
    }

    // Collapse same-kind runs, keeping the more extreme price.
    let mut cleaned: Vec<PivotPoint> = Vec::with_capacity(raw.len());
    for pivot in raw {
        match cleaned.last_mut() {
            Some(last) if last.kind == pivot.kind => {
                if last.beaten_by(&pivot) {
                    *last = pivot;
                }
            }
            _ => cleaned.push(pivot),
        }
    }

    cleaned
}

// ============================================================
// SUPPORT / RESISTANCE LEVELS
// ============================================================

/// Side of a horizontal level or trend line relative to price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelKind {
    Support,
    Resistance,
}

/// A clustered horizontal price level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Level {
    /// Average price of the merged pivots
    pub price: f64,
    pub kind: LevelKind,
    /// Number of pivots merged into this level
    pub strength: usize,
    /// Bar index of the most recent touch
    pub last_touch: usize,
}

/// Support and resistance levels, strongest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Levels {
    pub supports: Vec<Level>,
    pub resistances: Vec<Level>,
}

impl Levels {
    /// Strongest support, which ties break toward the current price
    pub fn nearest_support(&self) -> Option<&Level> {
        self.supports.first()
    }

    pub fn nearest_resistance(&self) -> Option<&Level> {
        self.resistances.first()
    }
}

/// Cluster pivot prices into support/resistance levels.
///
/// Pivots within `tolerance` (relative) of the first member of the running
/// group merge into one level carrying the average price, the summed touch
/// count, and the latest touch index. Anchoring at the first member bounds
/// every merged pivot within `tolerance` of the level average. Levels below
/// `current_price` are supports, the rest resistances; each side keeps the
/// top `max_levels` by touch count with ties broken toward proximity to the
/// current price.
pub fn cluster_levels(
    pivots: &[PivotPoint],
    current_price: f64,
    tolerance: f64,
    max_levels: usize,
) -> Levels {
    let mut sorted: Vec<&PivotPoint> = pivots.iter().collect();
    sorted.sort_by(|a, b| a.price.total_cmp(&b.price));

    let mut levels: Vec<Level> = Vec::new();
    let mut group: Vec<&PivotPoint> = Vec::new();

    let flush = |group: &[&PivotPoint], levels: &mut Vec<Level>, current_price: f64| {
        if group.is_empty() {
            return;
        }
        let price = group.iter().map(|p| p.price).sum::<f64>() / group.len() as f64;
        let last_touch = group.iter().map(|p| p.index).max().unwrap_or(0);
        let kind = if price < current_price {
            LevelKind::Support
        } else {
            LevelKind::Resistance
        };
        levels.push(Level {
            price,
            kind,
            strength: group.len(),
            last_touch,
        });
    };

    for pivot in sorted {
        let joins_group = group.first().is_some_and(|anchor| {
            anchor.price > 0.0 && (pivot.price - anchor.price) / anchor.price < tolerance
        });
        if joins_group {
            group.push(pivot);
        } else {
            flush(&group, &mut levels, current_price);
            group.clear();
            group.push(pivot);
        }
    }
    flush(&group, &mut levels, current_price);

    let mut supports: Vec<Level> = levels
        .iter()
        .copied()
        .filter(|l| l.kind == LevelKind::Support)
        .collect();
    let mut resistances: Vec<Level> = levels
        .into_iter()
        .filter(|l| l.kind == LevelKind::Resistance)
        .collect();

    // Nearest-to-price wins ties: highest support, lowest resistance.
    supports.sort_by(|a, b| {
        b.strength
            .cmp(&a.strength)
            .then(b.price.total_cmp(&a.price))
    });
    resistances.sort_by(|a, b| {
        b.strength
            .cmp(&a.strength)
            .then(a.price.total_cmp(&b.price))
    });

    supports.truncate(max_levels);
    resistances.truncate(max_levels);

    Levels {
        supports,
        resistances,
    }
}

// ============================================================
// TREND LINES
// ============================================================

/// A fitted line through same-kind pivots
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
    pub start_index: usize,
    pub end_index: usize,
    pub side: LevelKind,
    pub touches: usize,
}

impl TrendLine {
    /// Price of the line at a bar index
    #[inline]
    pub fn price_at(&self, index: usize) -> f64 {
        self.slope * index as f64 + self.intercept
    }
}

/// Least-squares line fit over (x, y) pairs.
///
/// Returns `(slope, intercept)`, or `None` when fewer than two points are
/// given or all x values coincide (zero-width fit).
pub fn least_squares(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let sx: f64 = points.iter().map(|p| p.0).sum();
    let sy: f64 = points.iter().map(|p| p.1).sum();
    let sxx: f64 = points.iter().map(|p| p.0 * p.0).sum();
    let sxy: f64 = points.iter().map(|p| p.0 * p.1).sum();

    let denom = n * sxx - sx * sx;
    if denom.abs() < f64::EPSILON {
        return None;
    }

    let slope = (n * sxy - sx * sy) / denom;
    let intercept = (sy - slope * sx) / n;
    Some((slope, intercept))
}

/// Fit resistance and support trend lines through the last 2-3 same-kind pivots.
pub fn fit_trend_lines(pivots: &[PivotPoint]) -> Vec<TrendLine> {
    let mut lines = Vec::new();

    for (kind, side) in [
        (PivotKind::High, LevelKind::Resistance),
        (PivotKind::Low, LevelKind::Support),
    ] {
        let same: Vec<&PivotPoint> = pivots.iter().filter(|p| p.kind == kind).collect();
        if same.len() < 2 {
            continue;
        }
        let tail = &same[same.len().saturating_sub(3)..];
        let points: Vec<(f64, f64)> = tail.iter().map(|p| (p.index as f64, p.price)).collect();

        if let Some((slope, intercept)) = least_squares(&points) {
            lines.push(TrendLine {
                slope,
                intercept,
                start_index: tail[0].index,
                end_index: tail[tail.len() - 1].index,
                side,
                touches: tail.len(),
            });
        }
    }

    lines
}

// ============================================================
// TESTS
// ============================================================
