//! Market structure analysis: swing classification, structure breaks,
//! order blocks, fair value gaps, liquidity pools, and premium/discount
//! ranges, with an optional trade setup derived from the strongest
//! unmitigated order block aligned with the current bias.

use serde::{Deserialize, Serialize};

use crate::swing::{self, PivotKind, PivotPoint};
use crate::{Direction, Tolerance, Window, OHLCV, OHLCVExt};

// ============================================================
// TYPES
// ============================================================

/// Swing classification relative to the previous swing of the same side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StructureTag {
    HigherHigh,
    HigherLow,
    LowerHigh,
    LowerLow,
}

impl StructureTag {
    pub fn as_str(self) -> &'static str {
        match self {
            StructureTag::HigherHigh => "HH",
            StructureTag::HigherLow => "HL",
            StructureTag::LowerHigh => "LH",
            StructureTag::LowerLow => "LL",
        }
    }

    pub fn is_bullish(self) -> bool {
        matches!(self, StructureTag::HigherHigh | StructureTag::HigherLow)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructurePoint {
    pub tag: StructureTag,
    pub price: f64,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketBias {
    Bullish,
    Bearish,
    #[default]
    Ranging,
}

impl MarketBias {
    pub fn as_str(self) -> &'static str {
        match self {
            MarketBias::Bullish => "bullish",
            MarketBias::Bearish => "bearish",
            MarketBias::Ranging => "ranging",
        }
    }
}

/// Break of structure continues the trend, change of character reverses it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BreakKind {
    Bos,
    Choch,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructureBreak {
    pub kind: BreakKind,
    pub direction: Direction,
    pub price: f64,
    pub index: usize,
}

/// Last opposing candle before a displacement move
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderBlock {
    pub kind: Direction,
    pub high: f64,
    pub low: f64,
    pub index: usize,
    /// Displacement size relative to the block's range
    pub strength: f64,
    /// True once a later bar traded back through the block
    pub mitigated: bool,
}

/// Three-bar imbalance where the wicks of the outer bars do not overlap
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FairValueGap {
    pub kind: Direction,
    pub high: f64,
    pub low: f64,
    /// Middle bar of the three-bar formation
    pub index: usize,
    pub filled: bool,
    /// Fraction of the gap traded through, in [0, 1]
    pub fill_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiquidityKind {
    /// Resting stops above equal highs
    BuySide,
    /// Resting stops below equal lows
    SellSide,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidityZone {
    pub kind: LiquidityKind,
    pub level: f64,
    /// Number of swings forming the pool
    pub strength: usize,
    pub swept: bool,
    /// Most recent swing in the pool
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeZone {
    Premium,
    Discount,
    Equilibrium,
}

/// Premium/discount split of the analyzed range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PremiumDiscount {
    pub range_high: f64,
    pub range_low: f64,
    pub equilibrium: f64,
    /// Upper quarter boundary
    pub premium: f64,
    /// Lower quarter boundary
    pub discount: f64,
    pub current: RangeZone,
}

/// Entry idea built from the strongest unmitigated order block
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeEntry {
    pub direction: Direction,
    pub entry_high: f64,
    pub entry_low: f64,
    pub stop_loss: f64,
    pub target: f64,
}

/// Market structure analysis output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IctResult {
    pub structure: Vec<StructurePoint>,
    pub bias: MarketBias,
    pub breaks: Vec<StructureBreak>,
    pub order_blocks: Vec<OrderBlock>,
    pub fair_value_gaps: Vec<FairValueGap>,
    pub liquidity: Vec<LiquidityZone>,
    pub premium_discount: Option<PremiumDiscount>,
    pub entry: Option<TradeEntry>,
}

// ============================================================
// ANALYZER
// ============================================================

/// Market structure analyzer
#[derive(Debug, Clone, Copy)]
pub struct IctAnalyzer {
    pub swing_window: Window,
    /// Relative distance for grouping equal highs/lows
    pub liquidity_tolerance: Tolerance,
    pub max_results: usize,
}

impl Default for IctAnalyzer {
    fn default() -> Self {
        Self {
            swing_window: Window::new_const(3),
            liquidity_tolerance: Tolerance::new_const(0.001),
            max_results: 10,
        }
    }
}

impl IctAnalyzer {
    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn analyze<T: OHLCV>(&self, bars: &[T]) -> IctResult {
        if bars.is_empty() {
            return IctResult::default();
        }
        let pivots = swing::extract_pivots(bars, self.swing_window.get());

        let structure = classify_structure(&pivots);
        let bias = market_bias(&structure, bars);
        let breaks = structure_breaks(&structure);
        let mut order_blocks = find_order_blocks(bars, &pivots);
        order_blocks.sort_by(|a, b| b.strength.total_cmp(&a.strength));
        order_blocks.truncate(self.max_results);
        let fair_value_gaps = self.find_fair_value_gaps(bars);
        let liquidity = self.find_liquidity(bars, &pivots);
        let premium_discount = premium_discount(bars);
        let entry = trade_entry(bars, bias, &order_blocks);

        IctResult {
            structure,
            bias,
            breaks,
            order_blocks,
            fair_value_gaps,
            liquidity,
            premium_discount,
            entry,
        }
    }

    fn find_fair_value_gaps<T: OHLCV>(&self, bars: &[T]) -> Vec<FairValueGap> {
        let mut gaps = Vec::new();
        for i in 2..bars.len() {
            let first = &bars[i - 2];
            let third = &bars[i];
            let middle_index = i - 1;

            let (kind, low, high) = if third.low() > first.high() {
                (Direction::Bullish, first.high(), third.low())
            } else if third.high() < first.low() {
                (Direction::Bearish, third.high(), first.low())
            } else {
                continue;
            };

            let size = high - low;
            if size <= 0.0 {
                continue;
            }

            // How far later bars traded back into the gap.
            let mut fill_percent: f64 = 0.0;
            for bar in &bars[i + 1..] {
                let covered = match kind {
                    Direction::Bullish => (high - bar.low().max(low)).max(0.0),
                    _ => (bar.high().min(high) - low).max(0.0),
                };
                fill_percent = fill_percent.max(covered / size);
            }
            let fill_percent = fill_percent.min(1.0);

            gaps.push(FairValueGap {
                kind,
                high,
                low,
                index: middle_index,
                filled: fill_percent >= 1.0,
                fill_percent,
            });
        }

        // Open gaps first, newest within each group.
        gaps.sort_by(|a, b| a.filled.cmp(&b.filled).then(b.index.cmp(&a.index)));
        gaps.truncate(self.max_results);
        gaps
    }

    fn find_liquidity<T: OHLCV>(&self, bars: &[T], pivots: &[PivotPoint]) -> Vec<LiquidityZone> {
        let last_close = match bars.last() {
            Some(bar) => bar.close(),
            None => return Vec::new(),
        };
        let tolerance = self.liquidity_tolerance.get();

        let mut zones = Vec::new();
        for kind in [PivotKind::High, PivotKind::Low] {
            let mut side: Vec<&PivotPoint> =
                pivots.iter().filter(|p| p.kind == kind).collect();
            side.sort_by(|a, b| a.price.total_cmp(&b.price));

            let mut group: Vec<&PivotPoint> = Vec::new();
            let flush = |group: &mut Vec<&PivotPoint>, zones: &mut Vec<LiquidityZone>| {
                if group.len() < 2 {
                    group.clear();
                    return;
                }
                let level = group.iter().map(|p| p.price).sum::<f64>() / group.len() as f64;
                let index = group.iter().map(|p| p.index).max().unwrap_or(0);
                let swept = match kind {
                    PivotKind::High => last_close > level,
                    PivotKind::Low => last_close < level,
                };
                zones.push(LiquidityZone {
                    kind: match kind {
                        PivotKind::High => LiquidityKind::BuySide,
                        PivotKind::Low => LiquidityKind::SellSide,
                    },
                    level,
                    strength: group.len(),
                    swept,
                    index,
                });
                group.clear();
            };

            for pivot in side {
                let joins = group
                    .first()
                    .is_some_and(|anchor| {
                        anchor.price > 0.0
                            && (pivot.price - anchor.price) / anchor.price < tolerance
                    });
                if group.is_empty() || joins {
                    group.push(pivot);
                } else {
                    flush(&mut group, &mut zones);
                    group.push(pivot);
                }
            }
            flush(&mut group, &mut zones);
        }

        zones.sort_by(|a, b| b.strength.cmp(&a.strength));
        zones.truncate(self.max_results);
        zones
    }
}

// ============================================================
// STRUCTURE
// ============================================================

/// Tag each swing relative to the previous swing of its side and merge
/// the two sides in chronological order.
fn classify_structure(pivots: &[PivotPoint]) -> Vec<StructurePoint> {
    let mut points = Vec::new();

    for kind in [PivotKind::High, PivotKind::Low] {
        let mut prev: Option<f64> = None;
        for pivot in pivots.iter().filter(|p| p.kind == kind) {
            if let Some(prev_price) = prev {
                let tag = match kind {
                    PivotKind::High if pivot.price > prev_price => StructureTag::HigherHigh,
                    PivotKind::High => StructureTag::LowerHigh,
                    PivotKind::Low if pivot.price > prev_price => StructureTag::HigherLow,
                    PivotKind::Low => StructureTag::LowerLow,
                };
                points.push(StructurePoint {
                    tag,
                    price: pivot.price,
                    index: pivot.index,
                });
            }
            prev = Some(pivot.price);
        }
    }

    points.sort_by_key(|p| p.index);
    points
}

/// Bias from the last six structure tags; with fewer than four tags the
/// net close change decides.
fn market_bias<T: OHLCV>(structure: &[StructurePoint], bars: &[T]) -> MarketBias {
    if structure.len() < 4 {
        let first = bars[0].close();
        let last = bars[bars.len() - 1].close();
        return if last > first {
            MarketBias::Bullish
        } else if last < first {
            MarketBias::Bearish
        } else {
            MarketBias::Ranging
        };
    }

    let recent = &structure[structure.len().saturating_sub(6)..];
    let bullish = recent.iter().filter(|p| p.tag.is_bullish()).count();
    let bearish = recent.len() - bullish;

    if bullish > bearish + 1 {
        MarketBias::Bullish
    } else if bearish > bullish + 1 {
        MarketBias::Bearish
    } else {
        MarketBias::Ranging
    }
}

/// Detect BOS and CHoCH from consecutive tags of the same side.
fn structure_breaks(structure: &[StructurePoint]) -> Vec<StructureBreak> {
    let mut breaks = Vec::new();
    let mut prev_high: Option<StructureTag> = None;
    let mut prev_low: Option<StructureTag> = None;

    for point in structure {
        match point.tag {
            StructureTag::HigherHigh | StructureTag::LowerHigh => {
                // A higher high following any prior high tag is a bullish
                // BOS; a lower high right after a higher high is a bearish
                // CHoCH. The first tag on a side only sets context.
                if point.tag == StructureTag::HigherHigh && prev_high.is_some() {
                    breaks.push(StructureBreak {
                        kind: BreakKind::Bos,
                        direction: Direction::Bullish,
                        price: point.price,
                        index: point.index,
                    });
                } else if prev_high == Some(StructureTag::HigherHigh) {
                    breaks.push(StructureBreak {
                        kind: BreakKind::Choch,
                        direction: Direction::Bearish,
                        price: point.price,
                        index: point.index,
                    });
                }
                prev_high = Some(point.tag);
            }
            StructureTag::HigherLow | StructureTag::LowerLow => {
                if point.tag == StructureTag::LowerLow && prev_low.is_some() {
                    breaks.push(StructureBreak {
                        kind: BreakKind::Bos,
                        direction: Direction::Bearish,
                        price: point.price,
                        index: point.index,
                    });
                } else if prev_low == Some(StructureTag::LowerLow) {
                    breaks.push(StructureBreak {
                        kind: BreakKind::Choch,
                        direction: Direction::Bullish,
                        price: point.price,
                        index: point.index,
                    });
                }
                prev_low = Some(point.tag);
            }
        }
    }

    breaks
}

// ============================================================
// ORDER BLOCKS
// ============================================================

/// For each swing, walk back up to five bars for the last candle closing
/// against the move out of the swing. A swing low's block is the last
/// bearish candle before the rally, a swing high's the last bullish one.
/// The three-bar move out of the swing must displace more than twice the
/// candle's range before a block counts.
fn find_order_blocks<T: OHLCV + OHLCVExt>(bars: &[T], pivots: &[PivotPoint]) -> Vec<OrderBlock> {
    let mut blocks = Vec::new();

    for pivot in pivots {
        let idx = pivot.index;
        if idx == 0 || idx + 1 >= bars.len() {
            continue;
        }
        let wants_bearish = pivot.kind.is_low();

        let out = &bars[idx..bars.len().min(idx + 3)];
        let displacement = if wants_bearish {
            out.iter().map(|b| b.high()).fold(f64::MIN, f64::max) - bars[idx].low()
        } else {
            bars[idx].high() - out.iter().map(|b| b.low()).fold(f64::MAX, f64::min)
        };

        let lo = idx.saturating_sub(5);
        for i in (lo..idx).rev() {
            let candle = &bars[i];
            let opposes = if wants_bearish {
                candle.is_bearish()
            } else {
                candle.is_bullish()
            };
            if !opposes {
                continue;
            }

            let candle_range = candle.range();
            if candle_range > 0.0 && displacement > candle_range * 2.0 {
                let kind = if wants_bearish {
                    Direction::Bullish
                } else {
                    Direction::Bearish
                };
                let mitigated = is_mitigated(bars, idx, kind, candle.high(), candle.low());
                blocks.push(OrderBlock {
                    kind,
                    high: candle.high(),
                    low: candle.low(),
                    index: i,
                    strength: (displacement / candle_range).min(5.0),
                    mitigated,
                });
            }
            break;
        }
    }

    blocks
}

/// A block is spent once price comes all the way back through it after
/// the swing, not on the way into the swing itself.
fn is_mitigated<T: OHLCV>(
    bars: &[T],
    swing_index: usize,
    kind: Direction,
    high: f64,
    low: f64,
) -> bool {
    bars[swing_index + 1..].iter().any(|bar| match kind {
        Direction::Bullish => bar.low() < low,
        _ => bar.high() > high,
    })
}

// ============================================================
// RANGE AND ENTRY
// ============================================================

fn premium_discount<T: OHLCV>(bars: &[T]) -> Option<PremiumDiscount> {
    if bars.is_empty() {
        return None;
    }
    let high = bars.iter().map(|b| b.high()).fold(f64::MIN, f64::max);
    let low = bars.iter().map(|b| b.low()).fold(f64::MAX, f64::min);
    let range = high - low;
    if range <= 0.0 {
        return None;
    }

    let close = bars[bars.len() - 1].close();
    let premium = low + range * 0.75;
    let discount = low + range * 0.25;
    let current = if close >= premium {
        RangeZone::Premium
    } else if close <= discount {
        RangeZone::Discount
    } else {
        RangeZone::Equilibrium
    };

    Some(PremiumDiscount {
        range_high: high,
        range_low: low,
        equilibrium: low + range * 0.5,
        premium,
        discount,
        current,
    })
}

/// Entry from the strongest unmitigated block aligned with the bias;
/// the target is the 20-bar extreme on the trade's side.
fn trade_entry<T: OHLCV>(
    bars: &[T],
    bias: MarketBias,
    order_blocks: &[OrderBlock],
) -> Option<TradeEntry> {
    let direction = match bias {
        MarketBias::Bullish => Direction::Bullish,
        MarketBias::Bearish => Direction::Bearish,
        MarketBias::Ranging => return None,
    };

    let block = order_blocks
        .iter()
        .find(|b| !b.mitigated && b.kind == direction)?;

    let tail = &bars[bars.len().saturating_sub(20)..];
    let (stop_loss, target) = match direction {
        Direction::Bullish => (
            block.low * 0.99,
            tail.iter().map(|b| b.high()).fold(f64::MIN, f64::max),
        ),
        _ => (
            block.high * 1.01,
            tail.iter().map(|b| b.low()).fold(f64::MAX, f64::min),
        ),
    };

    Some(TradeEntry {
        direction,
        entry_high: block.high,
        entry_low: block.low,
        stop_loss,
        target,
    })
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{ramp, TestBar};

    fn sp(tag: StructureTag, price: f64, index: usize) -> StructurePoint {
        StructurePoint { tag, price, index }
    }

    #[test]
    fn structure_tags_compare_same_side_swings() {
        let pivots = vec![
            PivotPoint::new(2, 110.0, PivotKind::High),
            PivotPoint::new(5, 100.0, PivotKind::Low),
            PivotPoint::new(8, 115.0, PivotKind::High),
            PivotPoint::new(11, 104.0, PivotKind::Low),
        ];
        let structure = classify_structure(&pivots);
        assert_eq!(structure.len(), 2);
        assert_eq!(structure[0].tag, StructureTag::HigherHigh);
        assert_eq!(structure[1].tag, StructureTag::HigherLow);
    }

    #[test]
    fn bias_falls_back_to_net_change_with_sparse_structure() {
        // Monotonic rise produces no interior pivots at all.
        let bars = ramp(60, 100.0, 1.0);
        let result = IctAnalyzer::default().analyze(&bars);
        assert_eq!(result.bias, MarketBias::Bullish);
    }

    #[test]
    fn bullish_tags_dominate_bias() {
        let structure = vec![
            sp(StructureTag::HigherHigh, 110.0, 2),
            sp(StructureTag::HigherLow, 104.0, 5),
            sp(StructureTag::HigherHigh, 116.0, 8),
            sp(StructureTag::HigherLow, 108.0, 11),
            sp(StructureTag::LowerHigh, 114.0, 14),
        ];
        let bars = ramp(20, 100.0, 0.5);
        assert_eq!(market_bias(&structure, &bars), MarketBias::Bullish);
    }

    #[test]
    fn higher_high_emits_bullish_bos() {
        let structure = vec![
            sp(StructureTag::LowerHigh, 110.0, 2),
            sp(StructureTag::HigherHigh, 116.0, 8),
        ];
        let breaks = structure_breaks(&structure);
        assert_eq!(breaks.len(), 1);
        assert_eq!(breaks[0].kind, BreakKind::Bos);
        assert_eq!(breaks[0].direction, Direction::Bullish);
    }

    #[test]
    fn lower_high_after_higher_high_is_bearish_choch() {
        let structure = vec![
            sp(StructureTag::HigherHigh, 116.0, 2),
            sp(StructureTag::LowerHigh, 112.0, 8),
        ];
        let breaks = structure_breaks(&structure);
        assert_eq!(breaks.len(), 1);
        assert_eq!(breaks[0].kind, BreakKind::Choch);
        assert_eq!(breaks[0].direction, Direction::Bearish);
    }

    #[test]
    fn lower_low_emits_bearish_bos() {
        let structure = vec![
            sp(StructureTag::HigherLow, 104.0, 5),
            sp(StructureTag::LowerLow, 98.0, 11),
        ];
        let breaks = structure_breaks(&structure);
        assert_eq!(breaks.len(), 1);
        assert_eq!(breaks[0].kind, BreakKind::Bos);
        assert_eq!(breaks[0].direction, Direction::Bearish);
    }

    #[test]
    fn first_tag_on_a_side_sets_context_without_a_break() {
        let structure = vec![
            sp(StructureTag::HigherHigh, 116.0, 2),
            sp(StructureTag::LowerLow, 98.0, 5),
        ];
        // Neither side has a prior tag to break.
        assert!(structure_breaks(&structure).is_empty());
    }

    #[test]
    fn weak_move_off_a_swing_leaves_no_block() {
        // Bearish candle with a 10-point range, then a 5-point rally off
        // the swing low: under the 2x displacement bar.
        let bars = vec![
            TestBar::new(105.0, 105.0, 95.0, 96.0),
            TestBar::new(96.0, 97.0, 94.0, 95.0),
            TestBar::new(95.0, 98.0, 94.5, 97.5),
            TestBar::new(97.5, 99.0, 96.0, 98.5),
        ];
        let pivots = vec![PivotPoint::new(1, 94.0, PivotKind::Low)];
        assert!(find_order_blocks(&bars, &pivots).is_empty());
    }

    #[test]
    fn displacement_off_a_swing_low_marks_the_bearish_candle() {
        // Candle range 2, three-bar move out of the swing 18: block
        // emitted with strength capped at 5.
        let bars = vec![
            TestBar::new(102.0, 102.5, 100.5, 100.6),
            TestBar::new(100.6, 101.0, 100.0, 100.8),
            TestBar::new(101.0, 115.0, 100.9, 114.0),
            TestBar::new(114.0, 118.0, 113.0, 117.0),
        ];
        let pivots = vec![PivotPoint::new(1, 100.0, PivotKind::Low)];
        let blocks = find_order_blocks(&bars, &pivots);
        assert_eq!(blocks.len(), 1);
        let block = &blocks[0];
        assert_eq!(block.kind, Direction::Bullish);
        assert_eq!(block.index, 0);
        assert_eq!(block.strength, 5.0);
        // No later low undercuts the candle.
        assert!(!block.mitigated);
    }

    #[test]
    fn block_mitigated_only_by_a_post_swing_undercut() {
        let mut bars = vec![
            TestBar::new(102.0, 102.5, 100.5, 100.6),
            TestBar::new(100.6, 101.0, 100.0, 100.8),
            TestBar::new(101.0, 115.0, 100.9, 114.0),
            TestBar::new(114.0, 118.0, 113.0, 117.0),
        ];
        let pivots = vec![PivotPoint::new(1, 100.0, PivotKind::Low)];
        // Price trades back below the candle low after the swing.
        bars.push(TestBar::new(117.0, 117.0, 100.0, 101.0));
        let blocks = find_order_blocks(&bars, &pivots);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].mitigated);
    }

    #[test]
    fn gap_up_detected_as_bullish_fvg() {
        // Bar 3 low (120) clears bar 1 high (105): gap anchored at bar 2.
        let bars = vec![
            TestBar::new(100.0, 105.0, 98.0, 104.0),
            TestBar::new(104.0, 118.0, 104.0, 117.0),
            TestBar::new(121.0, 125.0, 120.0, 124.0),
        ];
        let gaps = IctAnalyzer::default().find_fair_value_gaps(&bars);
        assert_eq!(gaps.len(), 1);
        let gap = &gaps[0];
        assert_eq!(gap.kind, Direction::Bullish);
        assert_eq!(gap.index, 1);
        assert_eq!(gap.low, 105.0);
        assert_eq!(gap.high, 120.0);
        assert!(!gap.filled);
        assert_eq!(gap.fill_percent, 0.0);
    }

    #[test]
    fn fvg_fill_tracked_from_later_bars() {
        let bars = vec![
            TestBar::new(100.0, 105.0, 98.0, 104.0),
            TestBar::new(104.0, 118.0, 104.0, 117.0),
            TestBar::new(121.0, 125.0, 120.0, 124.0),
            // Trades back down through the whole gap.
            TestBar::new(124.0, 124.0, 104.0, 106.0),
        ];
        let gaps = IctAnalyzer::default().find_fair_value_gaps(&bars);
        assert_eq!(gaps.len(), 1);
        assert!(gaps[0].filled);
        assert_eq!(gaps[0].fill_percent, 1.0);
    }

    #[test]
    fn equal_highs_form_buy_side_liquidity() {
        let pivots = vec![
            PivotPoint::new(3, 110.0, PivotKind::High),
            PivotPoint::new(9, 110.05, PivotKind::High),
            PivotPoint::new(6, 100.0, PivotKind::Low),
        ];
        let bars = vec![TestBar::new(105.0, 106.0, 104.0, 105.0)];
        let zones = IctAnalyzer::default().find_liquidity(&bars, &pivots);
        assert_eq!(zones.len(), 1);
        let zone = &zones[0];
        assert_eq!(zone.kind, LiquidityKind::BuySide);
        assert_eq!(zone.strength, 2);
        assert!(!zone.swept); // close 105 below the pool
        assert!((zone.level - 110.025).abs() < 1e-9);
        assert_eq!(zone.index, 9);
    }

    #[test]
    fn pool_swept_when_close_beyond_level() {
        let pivots = vec![
            PivotPoint::new(3, 110.0, PivotKind::High),
            PivotPoint::new(9, 110.05, PivotKind::High),
        ];
        let bars = vec![TestBar::new(111.0, 112.0, 110.5, 111.5)];
        let zones = IctAnalyzer::default().find_liquidity(&bars, &pivots);
        assert!(zones[0].swept);
    }

    #[test]
    fn premium_discount_splits_range() {
        let bars = vec![
            TestBar::new(100.0, 120.0, 100.0, 118.0),
            TestBar::new(118.0, 120.0, 117.0, 119.0),
        ];
        let pd = premium_discount(&bars).unwrap();
        assert_eq!(pd.range_high, 120.0);
        assert_eq!(pd.range_low, 100.0);
        assert_eq!(pd.equilibrium, 110.0);
        assert_eq!(pd.premium, 115.0);
        assert_eq!(pd.discount, 105.0);
        assert_eq!(pd.current, RangeZone::Premium);
    }

    #[test]
    fn flat_series_has_no_range_split() {
        let bars = crate::test_util::flat_series(10, 100.0);
        assert!(premium_discount(&bars).is_none());
    }

    #[test]
    fn no_entry_when_ranging() {
        let blocks = vec![OrderBlock {
            kind: Direction::Bullish,
            high: 105.0,
            low: 100.0,
            index: 3,
            strength: 2.0,
            mitigated: false,
        }];
        let bars = ramp(20, 100.0, 0.0);
        assert!(trade_entry(&bars, MarketBias::Ranging, &blocks).is_none());
    }

    #[test]
    fn bullish_entry_from_unmitigated_block() {
        let blocks = vec![
            OrderBlock {
                kind: Direction::Bullish,
                high: 105.0,
                low: 100.0,
                index: 3,
                strength: 3.0,
                mitigated: true,
            },
            OrderBlock {
                kind: Direction::Bullish,
                high: 108.0,
                low: 104.0,
                index: 7,
                strength: 2.0,
                mitigated: false,
            },
        ];
        let bars = ramp(30, 100.0, 1.0);
        let entry = trade_entry(&bars, MarketBias::Bullish, &blocks).unwrap();
        // Mitigated block skipped.
        assert_eq!(entry.entry_low, 104.0);
        assert!((entry.stop_loss - 104.0 * 0.99).abs() < 1e-9);
        assert!(entry.target >= entry.entry_high);
    }

    #[test]
    fn empty_input_yields_default() {
        let result = IctAnalyzer::default().analyze::<TestBar>(&[]);
        assert_eq!(result, IctResult::default());
    }
}
