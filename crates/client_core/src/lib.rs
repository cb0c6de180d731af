use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use dictation::{DictationCapture, DictationError};
use reqwest::Client;
use shared::{
    domain::{PatientId, Phase},
    protocol::{AnalysisEnvelope, ServiceHealth},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

pub mod config;
pub mod error;
pub mod form;
pub mod render;
pub mod request;

pub use config::{load_settings, Settings};
pub use error::{SessionError, TransportError, ValidationError};
pub use form::{FormState, ImageAttachment};
pub use render::{MedicinesView, ResultView};
pub use request::AnalysisRequest;

/// Events observed by the display layer. Every action also reports its
/// outcome directly through its return value; the stream exists so a UI can
/// follow the session without polling.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    PhaseChanged(Phase),
    AttachmentsChanged { label: Option<String> },
    DictationStarted,
    ValidationRejected { message: String },
    ResultReady(ResultView),
    SubmissionFailed { message: String },
}

/// Point-in-time copy of the session for display.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub patient: Option<PatientId>,
    pub attachment_label: Option<String>,
    pub description: String,
    pub conditions: Vec<(String, bool)>,
    pub language: Option<String>,
    pub last_result: Option<ResultView>,
}

/// Fallback used when no dictation backend was injected.
pub struct MissingDictation;

#[async_trait]
impl DictationCapture for MissingDictation {
    async fn capture(&self) -> Result<String, DictationError> {
        Err(DictationError::Unavailable)
    }

    fn is_supported(&self) -> bool {
        false
    }
}

struct SessionState {
    phase: Phase,
    patient: Option<PatientId>,
    form: FormState,
    last_result: Option<ResultView>,
    epoch: u64,
}

impl SessionState {
    fn fresh(settings: &Settings) -> Self {
        Self {
            phase: Phase::Unauthenticated,
            patient: None,
            form: FormState::new(&settings.conditions),
            last_result: None,
            epoch: 0,
        }
    }

    fn require_phase(&self, action: &'static str, expected: Phase) -> Result<(), SessionError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(SessionError::UnavailableInPhase {
                action,
                phase: self.phase,
            })
        }
    }
}

/// Owns the session: the phase machine, the captured identifier, the form
/// fields, and the single outstanding analysis request.
pub struct SessionController {
    http: Client,
    settings: Settings,
    dictation: Arc<dyn DictationCapture>,
    dictation_gate: Mutex<()>,
    inner: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionController {
    pub fn new(settings: Settings) -> Arc<Self> {
        Self::new_with_dictation(settings, Arc::new(MissingDictation))
    }

    pub fn new_with_dictation(
        settings: Settings,
        dictation: Arc<dyn DictationCapture>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        let inner = Mutex::new(SessionState::fresh(&settings));
        Arc::new(Self {
            http: Client::new(),
            settings,
            dictation,
            dictation_gate: Mutex::new(()),
            inner,
            events,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn dictation_supported(&self) -> bool {
        self.dictation.is_supported()
    }

    pub async fn phase(&self) -> Phase {
        self.inner.lock().await.phase
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let guard = self.inner.lock().await;
        SessionSnapshot {
            phase: guard.phase,
            patient: guard.patient.clone(),
            attachment_label: guard.form.attachment_label(),
            description: guard.form.description.clone(),
            conditions: guard.form.conditions.entries().to_vec(),
            language: guard.form.language.clone(),
            last_result: guard.last_result.clone(),
        }
    }

    /// Captures the patient identifier and opens the input form. The
    /// identifier is trimmed; a blank one is rejected without leaving
    /// Unauthenticated.
    pub async fn sign_in(&self, identifier: &str) -> Result<PatientId, SessionError> {
        let mut guard = self.inner.lock().await;
        guard.require_phase("sign_in", Phase::Unauthenticated)?;

        let trimmed = identifier.trim();
        if trimmed.is_empty() {
            let err = ValidationError::EmptyIdentifier;
            let _ = self.events.send(SessionEvent::ValidationRejected {
                message: err.to_string(),
            });
            return Err(err.into());
        }

        let patient = PatientId::new(trimmed);
        guard.patient = Some(patient.clone());
        guard.phase = Phase::Input;
        let _ = self.events.send(SessionEvent::PhaseChanged(Phase::Input));
        info!(patient = %patient, "session: signed in");
        Ok(patient)
    }

    pub async fn attach_image(&self, attachment: ImageAttachment) -> Result<(), SessionError> {
        let mut guard = self.inner.lock().await;
        guard.require_phase("attach_image", Phase::Input)?;
        guard.form.attachments.push(attachment);
        let label = guard.form.attachment_label();
        let _ = self.events.send(SessionEvent::AttachmentsChanged { label });
        Ok(())
    }

    pub async fn set_description(&self, text: &str) -> Result<(), SessionError> {
        let mut guard = self.inner.lock().await;
        guard.require_phase("set_description", Phase::Input)?;
        guard.form.description = text.to_string();
        Ok(())
    }

    pub async fn set_language(&self, tag: &str) -> Result<(), SessionError> {
        let mut guard = self.inner.lock().await;
        guard.require_phase("set_language", Phase::Input)?;
        guard.form.language = Some(tag.to_string());
        Ok(())
    }

    /// Flips a declared condition and returns its new state. Undeclared
    /// names are rejected and change nothing.
    pub async fn toggle_condition(&self, name: &str) -> Result<bool, SessionError> {
        let mut guard = self.inner.lock().await;
        guard.require_phase("toggle_condition", Phase::Input)?;
        match guard.form.conditions.toggle(name) {
            Some(checked) => Ok(checked),
            None => {
                let err = ValidationError::UnknownCondition(name.to_string());
                let _ = self.events.send(SessionEvent::ValidationRejected {
                    message: err.to_string(),
                });
                Err(err.into())
            }
        }
    }

    /// Runs one dictation capture and appends the transcript to the
    /// description. At most one capture runs at a time. The state lock is
    /// released while the capability runs; the transcript is dropped if the
    /// session closed or left the input form in the meantime.
    pub async fn dictate(&self) -> Result<String, SessionError> {
        let _capture = self
            .dictation_gate
            .try_lock()
            .map_err(|_| DictationError::Busy)?;

        let epoch = {
            let guard = self.inner.lock().await;
            guard.require_phase("dictate", Phase::Input)?;
            guard.epoch
        };

        let _ = self.events.send(SessionEvent::DictationStarted);
        let transcript = self.dictation.capture().await?;

        let mut guard = self.inner.lock().await;
        if guard.epoch != epoch {
            return Err(SessionError::SessionClosed);
        }
        guard.require_phase("dictate", Phase::Input)?;
        guard.form.append_dictated(&transcript);
        info!(chars = transcript.len(), "session: dictation captured");
        Ok(transcript)
    }

    /// Validates, assembles, and submits the analysis request, driving the
    /// session through Loading and into Results on success. Any failure
    /// returns the session to the input form; a response that arrives after
    /// sign-out is discarded unrendered.
    pub async fn submit(&self) -> Result<ResultView, SessionError> {
        let (request, epoch) = {
            let mut guard = self.inner.lock().await;
            guard.require_phase("submit", Phase::Input)?;

            let request = match AnalysisRequest::assemble(
                &guard.form,
                guard.patient.as_ref(),
                &self.settings.default_language,
            ) {
                Ok(request) => request,
                Err(err) => {
                    let _ = self.events.send(SessionEvent::ValidationRejected {
                        message: err.to_string(),
                    });
                    return Err(err.into());
                }
            };

            guard.phase = Phase::Loading;
            let _ = self.events.send(SessionEvent::PhaseChanged(Phase::Loading));
            (request, guard.epoch)
        };

        info!(
            images = request.images.len(),
            conditions = request.conditions.len(),
            language = %request.language,
            "session: submitting analysis request"
        );

        let outcome = self.run_analysis(request).await;

        if outcome.is_ok() && self.settings.results_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.settings.results_delay_ms)).await;
        }

        let mut guard = self.inner.lock().await;
        if guard.epoch != epoch {
            info!("session: discarding analysis response for closed session");
            return Err(SessionError::SessionClosed);
        }

        match outcome {
            Ok(view) => {
                guard.phase = Phase::Results;
                guard.last_result = Some(view.clone());
                let _ = self.events.send(SessionEvent::PhaseChanged(Phase::Results));
                let _ = self.events.send(SessionEvent::ResultReady(view.clone()));
                info!(risk = %view.risk_label, "session: analysis result ready");
                Ok(view)
            }
            Err(err) => {
                warn!("session: analysis request failed: {err}");
                guard.phase = Phase::Input;
                let _ = self.events.send(SessionEvent::PhaseChanged(Phase::Input));
                let _ = self.events.send(SessionEvent::SubmissionFailed {
                    message: err.to_string(),
                });
                Err(err.into())
            }
        }
    }

    async fn run_analysis(&self, request: AnalysisRequest) -> Result<ResultView, TransportError> {
        let form = request.into_form()?;
        let mut builder = self
            .http
            .post(format!("{}/api/analyze", self.settings.service_url))
            .timeout(Duration::from_secs(self.settings.request_timeout_secs))
            .multipart(form);
        if self.settings.mock_analysis {
            builder = builder.query(&[("mock", "true")]);
        }

        let envelope: AnalysisEnvelope = builder
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if envelope.status != "success" {
            return Err(TransportError::UnexpectedPayload(format!(
                "service reported status '{}'",
                envelope.status
            )));
        }
        let verdict = envelope
            .data
            .ok_or_else(|| TransportError::UnexpectedPayload("missing analysis data".into()))?;

        Ok(ResultView::from_verdict(&verdict))
    }

    /// Clears the form entries and any rendered result, returning to the
    /// input form. The language selection survives, matching a reset of the
    /// entry fields rather than of preferences.
    pub async fn reset(&self) -> Result<(), SessionError> {
        let mut guard = self.inner.lock().await;
        if guard.phase != Phase::Input && guard.phase != Phase::Results {
            return Err(SessionError::UnavailableInPhase {
                action: "reset",
                phase: guard.phase,
            });
        }

        guard.form.clear_entries();
        guard.last_result = None;
        let _ = self
            .events
            .send(SessionEvent::AttachmentsChanged { label: None });
        if guard.phase != Phase::Input {
            guard.phase = Phase::Input;
            let _ = self.events.send(SessionEvent::PhaseChanged(Phase::Input));
        }
        Ok(())
    }

    /// Ends the session from any phase. The epoch bump makes an in-flight
    /// submission resolve as closed instead of rendering into the next
    /// session.
    pub async fn sign_out(&self) {
        let mut guard = self.inner.lock().await;
        let was_open = guard.phase != Phase::Unauthenticated;
        let epoch = guard.epoch.wrapping_add(1);
        *guard = SessionState::fresh(&self.settings);
        guard.epoch = epoch;
        if was_open {
            let _ = self
                .events
                .send(SessionEvent::PhaseChanged(Phase::Unauthenticated));
            info!("session: signed out");
        }
    }

    /// Probes the analysis service's health endpoint. Available in any
    /// phase; purely diagnostic.
    pub async fn check_health(&self) -> Result<ServiceHealth, SessionError> {
        Ok(self.fetch_health().await?)
    }

    async fn fetch_health(&self) -> Result<ServiceHealth, TransportError> {
        let health: ServiceHealth = self
            .http
            .get(format!("{}/health", self.settings.service_url))
            .timeout(Duration::from_secs(self.settings.request_timeout_secs))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(health)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
