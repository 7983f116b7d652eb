//! Form sessions: explicit state machines for the applicant intake form and
//! the application create/edit form.

mod applicant;
mod application;

use std::fmt::Display;

use log::debug;

pub use applicant::ApplicantFormSession;
pub use application::{fetch_load, ApplicationFormSession, FormMode, LoadResponse, LoadTicket, LoadedForm};

use crate::{
    base64::encode_data_url,
    error::{AdmissionsError, LoadError, SubmissionError},
    models::Attachment,
};

/// What the caller should do after a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A record was created; the form has been cleared for the next entry.
    Created(i64),
    /// An edit was saved; show the record's detail view.
    ShowDetail(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Loading,
    Ready,
    Submitting,
    Success(SubmitOutcome),
    Failed(SubmissionError),
    LoadFailed(LoadError),
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Loading => "loading",
            SessionState::Ready => "ready",
            SessionState::Submitting => "submitting",
            SessionState::Success(_) => "success",
            SessionState::Failed(_) => "failed",
            SessionState::LoadFailed(_) => "load_failed",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Ready)
    }
}

impl Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn invalid_transition(from: &SessionState, action: &str) -> AdmissionsError {
    AdmissionsError::InvalidTransition(format!("cannot {} while {}", action, from))
}

/// Success and Failed both go back to Ready on acknowledgement.
pub(crate) fn acknowledged(state: &SessionState) -> Result<SessionState, AdmissionsError> {
    match state {
        SessionState::Success(_) | SessionState::Failed(_) => Ok(SessionState::Ready),
        other => Err(invalid_transition(other, "acknowledge")),
    }
}

/// In-memory preview of a newly selected photo. Released when dropped.
#[derive(Debug, PartialEq, Eq)]
pub struct PhotoPreview {
    file_name: String,
    data_url: String,
}

impl PhotoPreview {
    pub fn new(file: &Attachment) -> Self {
        debug!("Creating photo preview for {}", file.file_name);
        Self {
            file_name: file.file_name.clone(),
            data_url: encode_data_url(&file.mime_type, &file.bytes),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }
}

impl Drop for PhotoPreview {
    fn drop(&mut self) {
        debug!("Releasing photo preview for {}", self.file_name);
    }
}
