//! moodscan Core
//!
//! Core types, traits, and utilities shared across moodscan components.
//!
//! This crate provides:
//! - The five-class label scale and per-text result type
//! - The label mapper shared by every classifier path
//! - Input validation applied before classification
//! - Error types and result handling

pub mod error;
pub mod label;
pub mod types;
pub mod validation;

pub use error::{Error, Result, ValidationError};
pub use label::{label_for_score, map_to_five_class};
pub use types::{
    Classification, Outcome, Reliability, ResultError, ResultSource, SentimentLabel,
    SentimentResult,
};
pub use validation::validate;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result, ValidationError};
    pub use crate::label::map_to_five_class;
    pub use crate::types::{
        Classification, ResultError, ResultSource, SentimentLabel, SentimentResult,
    };
    pub use crate::validation::validate;
}
