use thiserror::Error;

/// All errors produced by speechseg-core.
#[derive(Debug, Error)]
pub enum SegmenterError {
    /// Rejected `DetectorConfig` field. The message names the field.
    #[error("invalid config: {0}")]
    Config(String),

    #[error("not enough samples")]
    NotEnoughSamples,

    #[error("infer failed: {0}")]
    Inference(String),

    #[error("ONNX session error: {0}")]
    OnnxSession(String),

    /// Silence was confirmed while no segment was open.
    #[error("unexpected speech end")]
    UnexpectedSpeechEnd,

    #[error("detector has been destroyed")]
    Destroyed,

    #[error("model file not found: {path}")]
    ModelNotFound { path: std::path::PathBuf },

    #[error("unsupported audio format: {0}")]
    AudioFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SegmenterError {
    /// Whether the detector that produced this error should be discarded.
    ///
    /// Inference failures can leave recurrent state and counters half
    /// advanced, so the instance is no longer trustworthy.
    pub fn is_fatal_to_detector(&self) -> bool {
        matches!(
            self,
            SegmenterError::Inference(_)
                | SegmenterError::OnnxSession(_)
                | SegmenterError::UnexpectedSpeechEnd
                | SegmenterError::Destroyed
        )
    }
}

pub type Result<T> = std::result::Result<T, SegmenterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_keeps_field_message() {
        let err = SegmenterError::Config("invalid Threshold: should be in range (0, 1)".into());
        assert_eq!(
            err.to_string(),
            "invalid config: invalid Threshold: should be in range (0, 1)"
        );
    }

    #[test]
    fn input_error_leaves_detector_usable() {
        assert!(!SegmenterError::NotEnoughSamples.is_fatal_to_detector());
        assert!(SegmenterError::Inference("boom".into()).is_fatal_to_detector());
        assert!(SegmenterError::UnexpectedSpeechEnd.is_fatal_to_detector());
    }
}
