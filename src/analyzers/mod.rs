//! Series-level analyzers
//!
//! Each analyzer is a stateless parameter struct with a `Default` impl and an
//! `analyze` method that is a pure function of the bar series. They share the
//! pivot list from [`crate::swing`] but never each other's output, so a caller
//! may run any subset independently.
//!
//! - **classic**: support/resistance, trend lines, double tops/bottoms,
//!   head & shoulders, triangles, basic indicators
//! - **elliott**: 5-wave impulse / A-B-C correction labeling and rule scoring
//! - **harmonic**: XABCD ratio matching (Gartley, Butterfly, Bat, Crab, ABCD)
//! - **ict**: market structure, order blocks, fair value gaps, liquidity
//! - **fibonacci**: dominant-swing retracement/extension grid

pub mod classic;
pub mod elliott;
pub mod fibonacci;
pub mod harmonic;
pub mod ict;

pub use classic::*;
pub use elliott::*;
pub use fibonacci::*;
pub use harmonic::*;
pub use ict::*;
