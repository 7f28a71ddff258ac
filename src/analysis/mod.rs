//! Leaf image analysis.
//!
//! # Data Flow
//! ```text
//! decoded RGBA pixels (width × height × 4 bytes)
//!     → features.rs (colour histogram, patterns, affected bands)
//!     → ImageFeatures (serializable)
//!     → summary lines embedded in the diagnosis prompt sent to the LLM
//! ```
//!
//! # Design Decisions
//! - Image decoding is the caller's job; this module only sees raw pixels
//! - Alpha is ignored
//! - Empty images produce empty features, not an error

pub mod features;

pub use features::{extract_features, AnalysisError, AffectedArea, ImageFeatures, Pattern, QuantizedColor};
