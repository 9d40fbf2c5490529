use thiserror::Error;

/// Request-level failures of the analysis pipeline. Each one becomes an
/// `{error}` body; component-level model failures never reach this type.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("could not decode audio: {0:#}")]
    Decode(anyhow::Error),

    #[error("audio clip contains no samples")]
    EmptyClip,

    #[error("feature extraction failed: {0:#}")]
    Features(anyhow::Error),

    #[error("analysis aborted unexpectedly: {0}")]
    Panicked(String),
}

impl AnalysisError {
    /// Recover the message carried by a caught panic payload.
    pub fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "unknown panic".to_string()
        };
        AnalysisError::Panicked(message)
    }
}
