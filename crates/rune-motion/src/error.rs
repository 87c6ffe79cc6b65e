//! Error types for track building and animation playback.

use thiserror::Error;

/// Result type for motion operations.
pub type Result<T> = std::result::Result<T, MotionError>;

/// Errors that can occur while building or starting an animation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MotionError {
    /// Duration or sample rate cannot produce a finite sample stride.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The animation has no live target node or no value function.
    #[error("missing target: {0}")]
    MissingTarget(String),

    /// The backend rejected the assembled keyframe group.
    #[error("backend rejected submission: {0}")]
    BackendSubmission(String),
}

impl MotionError {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn missing_target(msg: impl Into<String>) -> Self {
        Self::MissingTarget(msg.into())
    }

    pub fn backend_submission(msg: impl Into<String>) -> Self {
        Self::BackendSubmission(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            MotionError::invalid_parameter("fps")
                .to_string()
                .starts_with("invalid parameter:")
        );
        assert!(
            MotionError::missing_target("node")
                .to_string()
                .starts_with("missing target:")
        );
        assert!(
            MotionError::backend_submission("tracks")
                .to_string()
                .starts_with("backend rejected submission:")
        );
    }
}
