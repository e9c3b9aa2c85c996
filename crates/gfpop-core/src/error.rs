// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Structured error type for gfpop-rs core APIs.
///
/// # Error Philosophy
/// - Error messages are operational and actionable.
/// - Variants are structured for reliable pattern matching.
/// - Expected failures are represented as `GfpopError` (not panics).
/// - An infeasible segmentation is not an error: drivers surface it as an
///   infinite global cost with an empty segmentation.
#[derive(thiserror::Error, Debug)]
pub enum GfpopError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("numerical issue: {0}")]
    NumericalIssue(String),
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("resource limit exceeded: {0}")]
    ResourceLimit(String),
    #[error("cancelled")]
    Cancelled,
}

impl GfpopError {
    /// Creates a `GfpopError::InvalidInput`.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Creates a `GfpopError::NumericalIssue`.
    pub fn numerical_issue(msg: impl Into<String>) -> Self {
        Self::NumericalIssue(msg.into())
    }

    /// Creates a `GfpopError::NotSupported`.
    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported(msg.into())
    }

    /// Creates a `GfpopError::ResourceLimit`.
    pub fn resource_limit(msg: impl Into<String>) -> Self {
        Self::ResourceLimit(msg.into())
    }

    /// Creates a `GfpopError::Cancelled`.
    pub fn cancelled() -> Self {
        Self::Cancelled
    }
}
