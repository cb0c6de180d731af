use dictation::DictationError;
use shared::domain::Phase;
use thiserror::Error;

/// Local rejections raised before any network activity. These block the
/// action, leave the session phase untouched, and never leave the client.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("please enter a valid patient id or name")]
    EmptyIdentifier,
    #[error("please upload a prescription or enter medication details")]
    EmptyRequest,
    #[error("unknown condition: {0}")]
    UnknownCondition(String),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("analysis request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected analysis payload: {0}")]
    UnexpectedPayload(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Dictation(#[from] DictationError),
    #[error("{action} is not available while the session is {phase:?}")]
    UnavailableInPhase { action: &'static str, phase: Phase },
    #[error("session was closed before the response arrived")]
    SessionClosed,
}
