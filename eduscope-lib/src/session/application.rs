use std::collections::HashMap;

use futures::try_join;
use log::{info, warn};

use super::{acknowledged, invalid_transition, PhotoPreview, SessionState, SubmitOutcome};
use crate::{
    config::ApiConfig,
    error::{AdmissionsError, LoadError, ValidationError},
    models::{Applicant, ApplicantKey, Application, ApplicationFormValues, Attachment, AttachmentSlot},
    store::AdmissionsApi,
    submission::{build_payload, split_activity_tags, SubmissionMode},
    validators::{
        validate_activity_options, validate_applicant_ref, validate_application_form,
        validate_document, validate_grade, validate_image, validate_status, FormField,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(i64),
}

impl FormMode {
    pub fn submission_mode(&self) -> SubmissionMode {
        match self {
            FormMode::Create => SubmissionMode::Create,
            FormMode::Edit(_) => SubmissionMode::Update,
        }
    }
}

/// Identifies one load. Responses carrying an older generation are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    mode: FormMode,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedForm {
    pub applicants: Vec<Applicant>,
    /// The record being edited; `None` in create mode.
    pub record: Option<Application>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadResponse {
    pub ticket: LoadTicket,
    pub result: Result<LoadedForm, LoadError>,
}

/// Fetches what a form needs before it becomes editable: the applicant
/// dropdown and, in edit mode, the record itself, concurrently.
pub async fn fetch_load<A>(api: &A, ticket: LoadTicket) -> LoadResponse
where
    A: AdmissionsApi + ?Sized,
{
    let result = match ticket.mode {
        FormMode::Create => api
            .list_applicants()
            .await
            .map(|applicants| LoadedForm {
                applicants,
                record: None,
            }),
        FormMode::Edit(id) => try_join!(api.list_applicants(), api.get_application(id)).map(
            |(applicants, record)| LoadedForm {
                applicants,
                record: Some(record),
            },
        ),
    };
    LoadResponse { ticket, result }
}

pub struct ApplicationFormSession<A> {
    api: A,
    config: ApiConfig,
    mode: FormMode,
    generation: u64,
    state: SessionState,
    preset_applicant: String,
    values: ApplicationFormValues,
    errors: ValidationError,
    applicants: Vec<Applicant>,
    existing: HashMap<AttachmentSlot, String>,
    photo_preview: Option<PhotoPreview>,
}

impl<A: AdmissionsApi> ApplicationFormSession<A> {
    pub fn new(api: A, config: ApiConfig, mode: FormMode) -> Self {
        Self {
            api,
            config,
            mode,
            generation: 0,
            state: SessionState::Idle,
            preset_applicant: String::new(),
            values: ApplicationFormValues::default(),
            errors: ValidationError::new(),
            applicants: Vec::new(),
            existing: HashMap::new(),
            photo_preview: None,
        }
    }

    /// Preselects the applicant, as when applying from an applicant's page.
    /// The preset survives `reset()` and successful creates.
    pub fn with_applicant(mut self, key: ApplicantKey) -> Self {
        self.preset_applicant = key.to_string();
        self.values.applicant = self.preset_applicant.clone();
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn values(&self) -> &ApplicationFormValues {
        &self.values
    }

    pub fn errors(&self) -> &ValidationError {
        &self.errors
    }

    /// Applicants for the dropdown, as of the last applied load.
    pub fn applicants(&self) -> &[Applicant] {
        &self.applicants
    }

    /// Fetchable URLs of files already stored on the record being edited.
    /// New selections never appear here.
    pub fn existing_attachments(&self) -> &HashMap<AttachmentSlot, String> {
        &self.existing
    }

    pub fn photo_preview(&self) -> Option<&PhotoPreview> {
        self.photo_preview.as_ref()
    }

    /// Re-targets the session, e.g. when navigating from one record's edit
    /// view to another's. Any load still in flight becomes stale.
    pub fn open(&mut self, mode: FormMode) {
        self.mode = mode;
        self.generation += 1;
        self.state = SessionState::Idle;
        self.clear_form();
        self.existing.clear();
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.generation += 1;
        self.state = SessionState::Loading;
        LoadTicket {
            generation: self.generation,
            mode: self.mode,
        }
    }

    /// Returns false when the response belongs to a superseded load.
    pub fn apply_load(&mut self, response: LoadResponse) -> bool {
        let LoadResponse { ticket, result } = response;
        if ticket.generation != self.generation || ticket.mode != self.mode {
            warn!(
                "Discarding stale form load {} for {:?} (current is {})",
                ticket.generation, ticket.mode, self.generation
            );
            return false;
        }
        match result {
            Ok(loaded) => {
                self.applicants = loaded.applicants;
                if let Some(record) = loaded.record {
                    self.seed(&record);
                }
                self.state = SessionState::Ready;
            }
            Err(e) => {
                warn!("Form load failed: {}", e);
                self.state = SessionState::LoadFailed(e);
            }
        }
        true
    }

    pub async fn load(&mut self) -> Result<(), LoadError> {
        let ticket = self.begin_load();
        let response = fetch_load(&self.api, ticket).await;
        self.apply_load(response);
        match &self.state {
            SessionState::LoadFailed(e) => Err(e.clone()),
            _ => Ok(()),
        }
    }

    fn seed(&mut self, record: &Application) {
        let (checked, other) = split_activity_tags(&record.extra_curriculars);
        self.clear_form();
        self.values = ApplicationFormValues {
            applicant: record
                .applicant_key()
                .map(|key| key.to_string())
                .unwrap_or_default(),
            apply_grade: record.apply_grade.as_str().to_string(),
            status: record.status.as_str().to_string(),
            extra_curriculars_checked: checked,
            extra_curriculars_other: other,
            ..ApplicationFormValues::default()
        };
        self.remember_existing(record);
    }

    fn remember_existing(&mut self, record: &Application) {
        self.existing = AttachmentSlot::ALL
            .into_iter()
            .filter_map(|slot| {
                record
                    .attachment(slot)
                    .and_then(|value| self.config.resolve_attachment_url(value))
                    .map(|url| (slot, url))
            })
            .collect();
    }

    fn clear_form(&mut self) {
        self.values = ApplicationFormValues::for_applicant(self.preset_applicant.clone());
        self.errors = ValidationError::new();
        self.photo_preview = None;
    }

    pub fn set_applicant(&mut self, value: impl Into<String>) {
        self.values.applicant = value.into();
        self.errors
            .update(FormField::Applicant, validate_applicant_ref(&self.values.applicant));
    }

    pub fn set_grade(&mut self, value: impl Into<String>) {
        self.values.apply_grade = value.into();
        self.errors
            .update(FormField::ApplyGrade, validate_grade(&self.values.apply_grade));
    }

    pub fn set_status(&mut self, value: impl Into<String>) {
        self.values.status = value.into();
        self.errors
            .update(FormField::Status, validate_status(&self.values.status));
    }

    pub fn set_activity(&mut self, label: &str, checked: bool) {
        let tags = &mut self.values.extra_curriculars_checked;
        let present = tags.iter().any(|tag| tag == label);
        if checked && !present {
            tags.push(label.to_string());
        } else if !checked {
            tags.retain(|tag| tag != label);
        }
        self.errors.update(
            FormField::ExtraCurriculars,
            validate_activity_options(&self.values.extra_curriculars_checked),
        );
    }

    pub fn set_other_activities(&mut self, value: impl Into<String>) {
        self.values.extra_curriculars_other = value.into();
    }

    /// Replaces the photo selection; the previous preview is released first.
    pub fn select_photo(&mut self, file: Option<Attachment>) {
        self.photo_preview = None;
        let check = validate_image(file.as_ref());
        if check.is_ok() {
            self.photo_preview = file.as_ref().map(PhotoPreview::new);
        }
        self.errors.update(FormField::Photo, check);
        self.values.photo = file;
    }

    pub fn select_birth_certificate(&mut self, file: Option<Attachment>) {
        self.errors
            .update(FormField::BirthCertificate, validate_document(file.as_ref()));
        self.values.birth_certificate = file;
    }

    pub fn select_health_record(&mut self, file: Option<Attachment>) {
        self.errors
            .update(FormField::HealthRecord, validate_document(file.as_ref()));
        self.values.health_record = file;
    }

    /// Validates, builds the payload and dispatches it. Validation failures
    /// leave the session `Ready`; dispatch failures keep every entered value.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, AdmissionsError> {
        if !self.state.is_ready() {
            return Err(invalid_transition(&self.state, "submit"));
        }
        let mode = self.mode.submission_mode();
        if let Err(errors) = validate_application_form(&self.values, mode) {
            self.errors = errors.clone();
            return Err(errors.into());
        }
        self.errors = ValidationError::new();

        self.state = SessionState::Submitting;
        let payload = build_payload(&self.values, mode);
        let result = match self.mode {
            FormMode::Create => self.api.create_application(payload).await,
            FormMode::Edit(id) => self.api.update_application(id, payload).await,
        };

        match result {
            Ok(record) => {
                let outcome = match self.mode {
                    FormMode::Create => {
                        info!("Created application {}", record.id);
                        self.clear_form();
                        SubmitOutcome::Created(record.id)
                    }
                    FormMode::Edit(id) => {
                        info!("Updated application {}", id);
                        self.values.clear_files();
                        self.photo_preview = None;
                        self.remember_existing(&record);
                        SubmitOutcome::ShowDetail(id)
                    }
                };
                self.state = SessionState::Success(outcome);
                Ok(outcome)
            }
            Err(e) => {
                self.state = SessionState::Failed(e.clone());
                Err(e.into())
            }
        }
    }

    pub fn acknowledge(&mut self) -> Result<(), AdmissionsError> {
        self.state = acknowledged(&self.state)?;
        Ok(())
    }

    /// Back to the defaults (the preset applicant, if any), keeping the
    /// loaded dropdown and stored-file references.
    pub fn reset(&mut self) {
        self.clear_form();
        if matches!(self.state, SessionState::Success(_) | SessionState::Failed(_)) {
            self.state = SessionState::Ready;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{applicant, application, FakeApi};
    use serde_json::json;

    fn config() -> ApiConfig {
        ApiConfig::new("http://localhost:8000/api/").unwrap()
    }

    fn stored_record() -> Application {
        application(
            7,
            json!({
                "applicant_id": 3,
                "apply_grade": "Grade 4",
                "status": "approved",
                "extra_curriculars": ["Music", "Chess", "Sports", "Drama"],
                "photo": "media/photo/old.png",
                "health_record": "https://files.example/health.pdf",
            }),
        )
    }

    fn api() -> FakeApi {
        FakeApi::new(vec![applicant(3, "Ama")], vec![stored_record()])
    }

    fn png() -> Attachment {
        Attachment::new("new.png", "image/png", vec![0x89, 0x50, 0x4e, 0x47])
    }

    async fn ready_create() -> ApplicationFormSession<FakeApi> {
        let mut session =
            ApplicationFormSession::new(api(), config(), FormMode::Create).with_applicant(ApplicantKey(3));
        session.load().await.unwrap();
        session
    }

    #[tokio::test]
    async fn edit_load_seeds_values_and_existing_files() {
        let mut session = ApplicationFormSession::new(api(), config(), FormMode::Edit(7));
        assert_eq!(session.state(), &SessionState::Idle);
        session.load().await.unwrap();

        assert_eq!(session.state(), &SessionState::Ready);
        assert_eq!(session.applicants().len(), 1);
        let values = session.values();
        assert_eq!(values.applicant, "3");
        assert_eq!(values.apply_grade, "Grade 4");
        assert_eq!(values.status, "approved");
        assert_eq!(values.extra_curriculars_checked, vec!["Music", "Sports"]);
        assert_eq!(values.extra_curriculars_other, "Chess, Drama");
        assert!(values.photo.is_none());

        let existing = session.existing_attachments();
        assert_eq!(
            existing.get(&AttachmentSlot::Photo).map(String::as_str),
            Some("http://localhost:8000/api/media/photo/old.png")
        );
        assert_eq!(
            existing.get(&AttachmentSlot::HealthRecord).map(String::as_str),
            Some("https://files.example/health.pdf")
        );
        assert!(!existing.contains_key(&AttachmentSlot::BirthCertificate));
    }

    #[tokio::test]
    async fn missing_record_is_a_load_failure() {
        let mut session = ApplicationFormSession::new(api(), config(), FormMode::Edit(99));
        let err = session.load().await.unwrap_err();
        assert_eq!(err.status, Some(404));
        assert_eq!(session.state(), &SessionState::LoadFailed(err));
        assert!(session.submit().await.is_err());
    }

    #[tokio::test]
    async fn stale_response_is_discarded_after_navigation() {
        let mut session = ApplicationFormSession::new(api(), config(), FormMode::Edit(7));
        let first = session.begin_load();
        let slow = fetch_load(session.api(), first).await;

        session.open(FormMode::Edit(99));
        let second = session.begin_load();
        assert!(!session.apply_load(slow));
        assert_eq!(session.state(), &SessionState::Loading);
        assert_eq!(session.values().apply_grade, "");

        let fresh = fetch_load(session.api(), second).await;
        assert!(session.apply_load(fresh));
        assert!(matches!(session.state(), SessionState::LoadFailed(_)));
    }

    #[tokio::test]
    async fn invalid_form_stays_ready_and_sends_nothing() {
        let mut session = ready_create().await;
        session.set_activity("Knitting", true);
        let err = session.submit().await.unwrap_err();

        assert!(matches!(err, AdmissionsError::Validation(_)));
        assert_eq!(session.state(), &SessionState::Ready);
        assert_eq!(
            session.errors().get(FormField::ApplyGrade),
            Some("Select a grade.")
        );
        assert!(session.errors().get(FormField::ExtraCurriculars).is_some());
        assert!(session.api().sent().is_empty());
    }

    #[tokio::test]
    async fn create_success_clears_the_form_but_keeps_the_applicant() {
        let mut session = ready_create().await;
        session.set_grade("Grade 2");
        session.set_activity("Sports", true);
        session.set_other_activities("Chess");
        session.select_photo(Some(png()));
        assert!(session.photo_preview().is_some());

        let outcome = session.submit().await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Created(_)));
        assert_eq!(session.state(), &SessionState::Success(outcome));
        assert_eq!(session.values(), &ApplicationFormValues::for_applicant("3"));
        assert!(session.photo_preview().is_none());

        let (target, payload) = session.api().sent().remove(0);
        assert_eq!(target, None);
        assert!(!payload.has_field("status"));
        assert_eq!(payload.text("extra_curriculars"), Some(r#"["Sports","Chess"]"#));
        assert_eq!(payload.file("photo").map(|f| f.file_name.as_str()), Some("new.png"));

        session.acknowledge().unwrap();
        assert_eq!(session.state(), &SessionState::Ready);
    }

    #[tokio::test]
    async fn edit_without_new_photo_keeps_the_stored_one() {
        let mut session = ApplicationFormSession::new(api(), config(), FormMode::Edit(7));
        session.load().await.unwrap();
        session.set_status("rejected");

        let outcome = session.submit().await.unwrap();
        assert_eq!(outcome, SubmitOutcome::ShowDetail(7));

        let (target, payload) = session.api().sent().remove(0);
        assert_eq!(target, Some(7));
        assert!(!payload.has_field("photo"));
        assert_eq!(payload.text("status"), Some("rejected"));

        let stored = session.api().stored_application(7).unwrap();
        assert_eq!(stored.photo.as_deref(), Some("media/photo/old.png"));
        assert_eq!(stored.status.as_str(), "rejected");
        assert_eq!(
            stored.extra_curriculars,
            vec!["Music", "Sports", "Chess", "Drama"]
        );
    }

    #[tokio::test]
    async fn edit_with_new_photo_replaces_only_that_slot() {
        let mut session = ApplicationFormSession::new(api(), config(), FormMode::Edit(7));
        session.load().await.unwrap();
        session.select_photo(Some(png()));
        session.submit().await.unwrap();

        let stored = session.api().stored_application(7).unwrap();
        assert_eq!(stored.photo.as_deref(), Some("/media/photo/new.png"));
        assert_eq!(stored.health_record.as_deref(), Some("https://files.example/health.pdf"));
        assert!(session.values().photo.is_none());
        assert_eq!(
            session.existing_attachments().get(&AttachmentSlot::Photo).map(String::as_str),
            Some("http://localhost:8000/api/media/photo/new.png")
        );
    }

    #[tokio::test]
    async fn failed_dispatch_keeps_entered_values() {
        let mut session = ready_create().await;
        session.api().fail_submissions();
        session.set_grade("Grade 9");
        session.select_birth_certificate(Some(Attachment::new(
            "bc.pdf",
            "application/pdf",
            vec![1],
        )));

        let err = session.submit().await.unwrap_err();
        assert!(matches!(err, AdmissionsError::Submission(_)));
        assert!(matches!(session.state(), SessionState::Failed(_)));
        assert_eq!(session.values().apply_grade, "Grade 9");
        assert!(session.values().birth_certificate.is_some());

        assert!(session.submit().await.is_err());
        assert_eq!(session.api().sent().len(), 1);

        session.acknowledge().unwrap();
        assert_eq!(session.values().apply_grade, "Grade 9");
    }

    #[tokio::test]
    async fn photo_preview_follows_the_selection() {
        let mut session = ready_create().await;
        session.select_photo(Some(png()));
        let first = session.photo_preview().unwrap().data_url().to_string();

        session.select_photo(Some(Attachment::new("other.jpg", "image/jpeg", vec![1, 2])));
        let second = session.photo_preview().unwrap();
        assert_eq!(second.file_name(), "other.jpg");
        assert_ne!(second.data_url(), first);

        session.select_photo(Some(Attachment::new("notes.txt", "text/plain", vec![1])));
        assert!(session.photo_preview().is_none());
        assert_eq!(
            session.errors().get(FormField::Photo),
            Some("Only image files are allowed.")
        );

        session.select_photo(None);
        assert!(session.photo_preview().is_none());
        assert!(session.errors().get(FormField::Photo).is_none());
    }

    #[tokio::test]
    async fn on_input_checks_clear_once_fixed() {
        let mut session = ready_create().await;
        session.set_applicant("abc");
        assert!(session.errors().get(FormField::Applicant).is_some());
        session.set_applicant("3");
        assert!(session.errors().is_empty());
    }
}
