//! Pipeline error taxonomy.
//!
//! Every failure that aborts a forecast request is one of four kinds. Lower
//! layers keep their own structured errors (`DataError`, `EngineError`) and the
//! pipeline components map them onto this enum at their boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort a forecast request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("data unavailable for '{symbol}': {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("insufficient data: {available} usable point(s), at least {required} required")]
    InsufficientData { available: usize, required: usize },

    #[error("model fit failed: {0}")]
    FitFailed(String),
}

/// Discriminant of a [`PipelineError`], for matching without payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    DataUnavailable,
    InsufficientData,
    FitFailed,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            PipelineError::DataUnavailable { .. } => ErrorKind::DataUnavailable,
            PipelineError::InsufficientData { .. } => ErrorKind::InsufficientData,
            PipelineError::FitFailed(_) => ErrorKind::FitFailed,
        }
    }

    pub(crate) fn unavailable(symbol: &str, reason: impl Into<String>) -> Self {
        PipelineError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_name_the_problem() {
        let err = PipelineError::unavailable("GM", "provider returned no rows");
        assert_eq!(
            err.to_string(),
            "data unavailable for 'GM': provider returned no rows"
        );

        let err = PipelineError::InsufficientData {
            available: 1,
            required: 2,
        };
        assert!(err.to_string().contains("1 usable point(s)"));
    }

    #[test]
    fn kinds_are_distinct() {
        let kinds = [
            PipelineError::InvalidRequest("x".into()).kind(),
            PipelineError::unavailable("F", "y").kind(),
            PipelineError::InsufficientData {
                available: 0,
                required: 2,
            }
            .kind(),
            PipelineError::FitFailed("z".into()).kind(),
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
