// SPDX-License-Identifier: MIT OR Apache-2.0
//! Error types for the timeline engine.

/// Errors raised while creating timelines
#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    /// No tokio runtime is reachable from the calling thread
    #[error("No tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

/// Errors an [`Animator`](crate::Animator) may report when writing properties.
///
/// The engine never propagates these; a failed write is logged and the step
/// still settles on time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnimatorError {
    /// The target no longer exists
    #[error("Target no longer exists: {0}")]
    TargetGone(String),

    /// The target refused the property set
    #[error("Properties rejected: {0}")]
    Rejected(String),
}

/// Errors while loading configuration or scripts
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// RON parse error
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
}
