//! # chartsig - Chart Pattern and Market Structure Detection
//!
//! Deterministic technical-analysis engine over OHLCV bars: support and
//! resistance levels, classical chart patterns, Elliott wave counts,
//! harmonic XABCD patterns, market structure (order blocks, fair value
//! gaps, liquidity pools), and Fibonacci levels.
//!
//! ## Quick Start
//!
//! ```rust
//! use chartsig::prelude::*;
//!
//! // Define your OHLCV data
//! struct Bar { o: f64, h: f64, l: f64, c: f64, v: f64 }
//!
//! impl OHLCV for Bar {
//!     fn open(&self) -> f64 { self.o }
//!     fn high(&self) -> f64 { self.h }
//!     fn low(&self) -> f64 { self.l }
//!     fn close(&self) -> f64 { self.c }
//!     fn volume(&self) -> f64 { self.v }
//! }
//!
//! // Run every analyzer with defaults
//! let engine = AnalysisEngine::new();
//! let bars: Vec<Bar> = vec![];
//! let report = engine.analyze(&bars).unwrap();
//! assert!(report.classic.patterns.is_empty());
//! ```

pub mod analyzers;
pub mod summary;
pub mod swing;

pub mod prelude {
    pub use crate::{
        // Analyzers
        analyzers::classic::{ChartPattern, ChartPatternKind, ClassicAnalyzer, ClassicResult},
        analyzers::elliott::{ElliottAnalyzer, ElliottResult, Wave, WaveLabel},
        analyzers::fibonacci::{FibAction, FibonacciAnalyzer, FibonacciResult},
        analyzers::harmonic::{HarmonicAnalyzer, HarmonicKind, HarmonicMatch, HarmonicResult},
        analyzers::ict::{IctAnalyzer, IctResult, MarketBias, OrderBlock},
        // Parallel
        analyze_parallel,
        // Swing foundation
        swing::{Level, Levels, PivotKind, PivotPoint, TrendLine},
        // Engine
        AnalysisEngine,
        // Errors
        AnalysisError,
        Direction,
        FibLevel,
        FullReport,
        // Types
        OHLCVExt,
        ReportError,
        ReportResult,
        Result,
        Signal,
        Tolerance,
        Window,
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors raised for broken caller contracts. Thin data never errors:
/// analyzers return empty results when there is not enough to work with.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid OHLCV at index {index}: {reason}")]
    InvalidOHLCV { index: usize, reason: &'static str },

    #[error("Timestamps not increasing at index {index}")]
    NonMonotonicTimestamps { index: usize },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Window length in bars (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Window(usize);

impl Window {
    /// Create a new Window, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(AnalysisError::InvalidValue("Window must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Window {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Window {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Window::new(value).map_err(serde::de::Error::custom)
    }
}

/// Relative tolerance in range (0.0, 1.0)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Tolerance(f64);

impl Tolerance {
    /// Create a new Tolerance, validating the value is in (0.0, 1.0)
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(AnalysisError::InvalidValue(
                "Tolerance cannot be NaN or infinite",
            ));
        }
        if value <= 0.0 || value >= 1.0 {
            return Err(AnalysisError::OutOfRange {
                field: "Tolerance",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Tolerance {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Tolerance {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Tolerance::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;

    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Blanket impl for references to dyn OHLCV
impl OHLCV for &dyn OHLCV {
    fn open(&self) -> f64 {
        (*self).open()
    }

    fn high(&self) -> f64 {
        (*self).high()
    }

    fn low(&self) -> f64 {
        (*self).low()
    }

    fn close(&self) -> f64 {
        (*self).close()
    }

    fn volume(&self) -> f64 {
        (*self).volume()
    }

    fn timestamp(&self) -> Option<i64> {
        (*self).timestamp()
    }
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Validate OHLCV data consistency
    fn validate(&self) -> Result<()> {
        if self.high() < self.low() {
            return Err(AnalysisError::InvalidOHLCV {
                index: 0,
                reason: "high < low",
            });
        }
        if self.open().is_nan()
            || self.high().is_nan()
            || self.low().is_nan()
            || self.close().is_nan()
        {
            return Err(AnalysisError::InvalidOHLCV {
                index: 0,
                reason: "NaN in OHLCV",
            });
        }
        if self.open().is_infinite()
            || self.high().is_infinite()
            || self.low().is_infinite()
            || self.close().is_infinite()
        {
            return Err(AnalysisError::InvalidOHLCV {
                index: 0,
                reason: "Infinite value in OHLCV",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

/// Validate every bar and the timestamp order across the series.
pub fn validate_bars<T: OHLCV>(bars: &[T]) -> Result<()> {
    let mut prev_ts: Option<i64> = None;
    for (i, bar) in bars.iter().enumerate() {
        bar.validate().map_err(|e| match e {
            AnalysisError::InvalidOHLCV { reason, .. } => {
                AnalysisError::InvalidOHLCV { index: i, reason }
            }
            other => other,
        })?;
        if let Some(ts) = bar.timestamp() {
            if prev_ts.is_some_and(|prev| ts <= prev) {
                return Err(AnalysisError::NonMonotonicTimestamps { index: i });
            }
            prev_ts = Some(ts);
        }
    }
    Ok(())
}

// ============================================================
// SHARED TYPES
// ============================================================

/// Directional bias of a pattern or structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }
}

/// Trading signal derived from an analysis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Signal {
    Buy,
    Sell,
    #[default]
    Neutral,
}

impl Signal {
    #[inline]
    pub fn direction(self) -> Direction {
        match self {
            Signal::Buy => Direction::Bullish,
            Signal::Sell => Direction::Bearish,
            Signal::Neutral => Direction::Neutral,
        }
    }
}

/// A Fibonacci ratio with its projected price
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FibLevel {
    pub ratio: f64,
    pub price: f64,
}

// ============================================================
// ANALYSIS ENGINE
// ============================================================

use analyzers::classic::{ClassicAnalyzer, ClassicResult};
use analyzers::elliott::{ElliottAnalyzer, ElliottResult};
use analyzers::fibonacci::{FibonacciAnalyzer, FibonacciResult};
use analyzers::harmonic::{HarmonicAnalyzer, HarmonicResult};
use analyzers::ict::{IctAnalyzer, IctResult};

/// Combined output of all analyzers for one series
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FullReport {
    pub classic: ClassicResult,
    pub elliott: ElliottResult,
    pub harmonic: HarmonicResult,
    pub ict: IctResult,
    /// None when the series is too short for a swing
    pub fibonacci: Option<FibonacciResult>,
}

impl FullReport {
    /// Render the report as plain English.
    pub fn to_text(&self) -> String {
        summary::report_text(self)
    }
}

/// Runs every analyzer over one bar series.
///
/// Pivots for the classic, Elliott, and harmonic analyzers are extracted
/// once with `swing_window`; the structure analyzer uses its own tighter
/// window.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisEngine {
    pub classic: ClassicAnalyzer,
    pub elliott: ElliottAnalyzer,
    pub harmonic: HarmonicAnalyzer,
    pub ict: IctAnalyzer,
    pub fibonacci: FibonacciAnalyzer,
    pub swing_window: Window,
    pub validate_data: bool,
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self {
            classic: ClassicAnalyzer::default(),
            elliott: ElliottAnalyzer::default(),
            harmonic: HarmonicAnalyzer::default(),
            ict: IctAnalyzer::default(),
            fibonacci: FibonacciAnalyzer::default(),
            swing_window: Window::new_const(5),
            validate_data: true,
        }
    }
}

impl AnalysisEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable per-bar input validation
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.validate_data = enable;
        self
    }

    pub fn analyze<T: OHLCV>(&self, bars: &[T]) -> Result<FullReport> {
        if self.validate_data {
            validate_bars(bars)?;
        }

        let pivots = swing::extract_pivots(bars, self.swing_window.get());

        Ok(FullReport {
            classic: self.classic.analyze_with_pivots(bars, &pivots),
            elliott: self.elliott.analyze_with_pivots(bars, &pivots),
            harmonic: self.harmonic.analyze_with_pivots(bars, &pivots),
            ict: self.ict.analyze(bars),
            fibonacci: self.fibonacci.analyze(bars),
        })
    }
}

// ============================================================
// PARALLEL ANALYSIS
// ============================================================

use rayon::prelude::*;

/// Report for a single instrument
#[derive(Debug)]
pub struct ReportResult {
    pub symbol: String,
    pub report: FullReport,
}

/// Error from analyzing a single instrument
#[derive(Debug)]
pub struct ReportError {
    pub symbol: String,
    pub error: AnalysisError,
}

/// Analyze many instruments in parallel.
pub fn analyze_parallel<'a, T, I>(
    engine: &AnalysisEngine,
    instruments: I,
) -> (Vec<ReportResult>, Vec<ReportError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            engine
                .analyze(bars)
                .map(|report| ReportResult {
                    symbol: symbol.to_string(),
                    report,
                })
                .map_err(|error| ReportError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TEST FIXTURES
// ============================================================


// ============================================================
// TESTS
// ============================================================
