use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DictationError {
    #[error("dictation is not supported in this environment")]
    Unavailable,
    #[error("a dictation capture is already running")]
    Busy,
    #[error("dictation capture failed: {0}")]
    Capture(String),
}

/// Speech-to-text capture behind an injectable seam. One capture at a time;
/// a successful capture resolves to the recognized transcript.
#[async_trait]
pub trait DictationCapture: Send + Sync {
    async fn capture(&self) -> Result<String, DictationError>;
    fn is_supported(&self) -> bool;
}

/// Replays canned transcripts in order. Used by tests and terminal demos
/// where no microphone stack exists.
pub struct ScriptedDictation {
    transcripts: Mutex<VecDeque<String>>,
}

impl ScriptedDictation {
    pub fn new(transcripts: Vec<String>) -> Self {
        Self {
            transcripts: Mutex::new(transcripts.into()),
        }
    }
}

#[async_trait]
impl DictationCapture for ScriptedDictation {
    async fn capture(&self) -> Result<String, DictationError> {
        let mut transcripts = self
            .transcripts
            .lock()
            .map_err(|_| DictationError::Capture("transcript queue poisoned".into()))?;
        transcripts
            .pop_front()
            .ok_or_else(|| DictationError::Capture("transcript script exhausted".into()))
    }

    fn is_supported(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_capture_replays_in_order() {
        let dictation = ScriptedDictation::new(vec!["aspirin 100mg".into(), "taken daily".into()]);
        assert!(dictation.is_supported());
        assert_eq!(dictation.capture().await.expect("first"), "aspirin 100mg");
        assert_eq!(dictation.capture().await.expect("second"), "taken daily");
    }

    #[tokio::test]
    async fn scripted_capture_errors_when_exhausted() {
        let dictation = ScriptedDictation::new(Vec::new());
        let err = dictation.capture().await.expect_err("script is empty");
        assert!(matches!(err, DictationError::Capture(_)));
    }
}
