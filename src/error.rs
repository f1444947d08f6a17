//! Typed errors raised by the step layer itself.
//!
//! Failures coming out of a backend (element not found, timeouts, adb errors)
//! travel as `anyhow::Error`; the variants here cover what this crate decides
//! on its own.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StepError {
    #[error("No step definition matches: {0}")]
    Undefined(String),

    #[error("Step '{text}' is ambiguous, it matches: {patterns:?}")]
    Ambiguous { text: String, patterns: Vec<String> },

    #[error("Missing capture group {index} for pattern {pattern}")]
    MissingCapture { pattern: String, index: usize },

    #[error("Invalid value '{value}' for capture group {index}: expected {expected}")]
    InvalidCapture {
        index: usize,
        value: String,
        expected: &'static str,
    },

    /// Raised through `Actor::fail`
    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("Next slot {slot} is outside business hours (latest {latest})")]
    OutsideBusinessHours { slot: String, latest: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Condition not met after {attempts} attempts")]
pub struct PollTimeout {
    pub attempts: u32,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{path}:{line}: {message}")]
    Syntax {
        path: String,
        line: usize,
        message: String,
    },

    #[error("{path}: no scenarios found")]
    Empty { path: String },
}
