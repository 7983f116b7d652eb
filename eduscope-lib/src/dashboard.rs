//! Applicant and application dashboards plus the single-application view.

use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::{
    config::ApiConfig,
    error::{LoadError, SubmissionError},
    join::{
        applicant_rows, application_rows, build_latest_status_index, ApplicantRow, ApplicationRow,
        LatestStatusIndex, StatusTally,
    },
    models::{Applicant, Application, AttachmentSlot},
    store::{load_collections, AdmissionsApi, FetchState},
};

static IMAGE_EXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(png|jpe?g|gif|webp|bmp|svg)$").expect("image extension pattern compiles")
});
static PDF_EXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.pdf$").expect("pdf extension pattern compiles"));

/// Both collections plus the index derived from them.
#[derive(Debug, Clone)]
pub struct DashboardData {
    applicants: Vec<Applicant>,
    applications: Vec<Application>,
    index: LatestStatusIndex,
}

impl DashboardData {
    pub fn new(applicants: Vec<Applicant>, applications: Vec<Application>) -> Self {
        let index = build_latest_status_index(&applicants, &applications);
        Self {
            applicants,
            applications,
            index,
        }
    }

    pub fn applicants(&self) -> &[Applicant] {
        &self.applicants
    }

    pub fn applications(&self) -> &[Application] {
        &self.applications
    }

    pub fn index(&self) -> &LatestStatusIndex {
        &self.index
    }

    pub fn set_applications(&mut self, applications: Vec<Application>) {
        self.applications = applications;
        self.index = build_latest_status_index(&self.applicants, &self.applications);
    }

    /// Returns whether anything was removed.
    pub fn remove_application(&mut self, id: i64) -> bool {
        let before = self.applications.len();
        self.applications.retain(|app| app.id != id);
        let removed = self.applications.len() != before;
        if removed {
            self.index = build_latest_status_index(&self.applicants, &self.applications);
        }
        removed
    }

    pub fn applicant_rows(&self) -> Vec<ApplicantRow<'_>> {
        applicant_rows(&self.applicants, &self.index)
    }

    pub fn application_rows(&self) -> Vec<ApplicationRow> {
        application_rows(&self.applicants, &self.applications)
    }

    pub fn tally(&self) -> StatusTally {
        StatusTally::from_applications(&self.applications)
    }
}

pub struct ApplicationDashboard<A> {
    api: A,
    generation: u64,
    state: FetchState<DashboardData>,
}

impl<A: AdmissionsApi> ApplicationDashboard<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            generation: 0,
            state: FetchState::Loading,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn state(&self) -> &FetchState<DashboardData> {
        &self.state
    }

    pub fn data(&self) -> Option<&DashboardData> {
        self.state.loaded()
    }

    /// Marks the dashboard as loading and returns the generation the
    /// eventual result must carry.
    pub fn begin_load(&mut self) -> u64 {
        self.generation += 1;
        self.state = FetchState::Loading;
        self.generation
    }

    /// Applies a completed load unless a newer one has started since.
    pub fn apply_load(
        &mut self,
        generation: u64,
        result: Result<(Vec<Applicant>, Vec<Application>), LoadError>,
    ) -> bool {
        if generation != self.generation {
            warn!(
                "Discarding dashboard load {} (current is {})",
                generation, self.generation
            );
            return false;
        }
        self.state = result
            .map(|(applicants, applications)| DashboardData::new(applicants, applications))
            .into();
        true
    }

    pub async fn load(&mut self) -> Result<(), LoadError> {
        let generation = self.begin_load();
        let result = load_collections(&self.api).await;
        self.apply_load(generation, result);
        match self.state.error() {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    /// Removes the application locally only after the server acknowledged it.
    pub async fn delete_application(&mut self, id: i64) -> Result<(), SubmissionError> {
        self.api.delete_application(id).await?;
        info!("Deleted application {}", id);
        if let Some(data) = self.state.loaded_mut() {
            data.remove_application(id);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Pdf,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentLink {
    pub slot: AttachmentSlot,
    pub url: String,
    pub file_name: String,
    pub kind: AttachmentKind,
}

pub fn attachment_link(config: &ApiConfig, slot: AttachmentSlot, value: &str) -> Option<AttachmentLink> {
    let url = config.resolve_attachment_url(value)?;
    let file_name = match Url::parse(&url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string(),
        Err(_) => url.rsplit('/').next().unwrap_or_default().to_string(),
    };
    let kind = if IMAGE_EXT_RE.is_match(&file_name) {
        AttachmentKind::Image
    } else if PDF_EXT_RE.is_match(&file_name) {
        AttachmentKind::Pdf
    } else {
        AttachmentKind::Other
    };
    Some(AttachmentLink {
        slot,
        url,
        file_name,
        kind,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationDetail {
    pub application: Application,
    pub applicant: Option<Applicant>,
    pub attachments: Vec<AttachmentLink>,
}

impl ApplicationDetail {
    pub fn applicant_name(&self) -> String {
        if let Some(applicant) = &self.applicant {
            return applicant.display_name();
        }
        self.application
            .applicant_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| format!("Application #{}", self.application.id))
    }

    pub fn attachment(&self, slot: AttachmentSlot) -> Option<&AttachmentLink> {
        self.attachments.iter().find(|link| link.slot == slot)
    }
}

/// Loads one application and, when the record does not already carry a
/// name, its applicant. A failed applicant lookup only loses the name.
pub async fn load_application_detail<A>(
    api: &A,
    config: &ApiConfig,
    id: i64,
) -> Result<ApplicationDetail, LoadError>
where
    A: AdmissionsApi + ?Sized,
{
    let application = api.get_application(id).await?;

    let has_name = application
        .applicant_name
        .as_deref()
        .map_or(false, |name| !name.trim().is_empty());
    let applicant = match application.applicant_key() {
        Some(key) if !has_name => match api.get_applicant(key).await {
            Ok(applicant) => Some(applicant),
            Err(e) => {
                warn!("Could not load applicant {} for application {}: {}", key, id, e);
                None
            }
        },
        _ => None,
    };

    let attachments = AttachmentSlot::ALL
        .into_iter()
        .filter_map(|slot| {
            application
                .attachment(slot)
                .and_then(|value| attachment_link(config, slot, value))
        })
        .collect();

    Ok(ApplicationDetail {
        application,
        applicant,
        attachments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::LatestStatus;
    use crate::models::{ApplicantKey, ApplicationStatus};
    use crate::testing::{applicant, application, FakeApi};
    use serde_json::json;

    fn dashboard() -> ApplicationDashboard<FakeApi> {
        let api = FakeApi::new(
            vec![applicant(1, "Ama"), applicant(2, "Kasun")],
            vec![
                application(10, json!({"applicant": 1, "status": "approved"})),
                application(11, json!({"applicant": 2})),
                application(12, json!({"applicant_id": 1, "status": "rejected",
                    "updated_at": "2025-05-01T00:00:00Z"})),
            ],
        );
        ApplicationDashboard::new(api)
    }

    #[tokio::test]
    async fn load_builds_rows_and_index() {
        let mut dash = dashboard();
        assert!(dash.state().is_loading());
        dash.load().await.unwrap();

        let data = dash.data().unwrap();
        assert_eq!(data.application_rows().len(), 3);
        assert_eq!(data.tally().approved, 1);
        let rows = data.applicant_rows();
        assert_eq!(rows[0].latest_status.to_string(), "rejected");
        assert_eq!(rows[1].latest_status.to_string(), "pending");
    }

    #[tokio::test]
    async fn failing_fetch_fails_the_whole_view() {
        let mut dash = dashboard();
        dash.api().fail_application_list();
        let err = dash.load().await.unwrap_err();
        assert_eq!(err.status, Some(500));
        assert!(dash.data().is_none());
        assert_eq!(dash.state().error(), Some(&err));
    }

    #[tokio::test]
    async fn stale_load_is_discarded() {
        let mut dash = dashboard();
        let first = dash.begin_load();
        let first_result = load_collections(dash.api()).await;
        let second = dash.begin_load();

        assert!(!dash.apply_load(first, first_result));
        assert!(dash.state().is_loading());

        let second_result = load_collections(dash.api()).await;
        assert!(dash.apply_load(second, second_result));
        assert!(dash.data().is_some());
    }

    #[tokio::test]
    async fn rejected_delete_leaves_the_list_alone() {
        let mut dash = dashboard();
        dash.load().await.unwrap();
        dash.api().reject_delete(11);

        let err = dash.delete_application(11).await.unwrap_err();
        assert_eq!(err.status, Some(403));
        let ids: Vec<i64> = dash.data().unwrap().applications().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![10, 11, 12]);
    }

    #[tokio::test]
    async fn accepted_delete_removes_and_reindexes() {
        let mut dash = dashboard();
        dash.load().await.unwrap();

        dash.delete_application(12).await.unwrap();
        let data = dash.data().unwrap();
        let ids: Vec<i64> = data.applications().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![10, 11]);
        assert_eq!(data.applicant_rows()[0].latest_status.to_string(), "approved");
        assert_eq!(data.index().grouped_len(), 2);
    }

    #[tokio::test]
    async fn replacing_applications_rebuilds_the_index() {
        let mut dash = dashboard();
        dash.load().await.unwrap();
        let data = dash.state.loaded_mut().unwrap();

        data.set_applications(vec![
            application(30, json!({"applicant": 2, "status": "approved"})),
            application(31, json!({"applicant": 2, "status": "rejected",
                "updated_at": "2025-06-01T00:00:00Z"})),
        ]);
        assert_eq!(data.index().latest_status(ApplicantKey(1)), LatestStatus::NotAvailable);
        assert_eq!(
            data.index().latest_status(ApplicantKey(2)),
            LatestStatus::Status(ApplicationStatus::Rejected)
        );
        assert_eq!(data.index().grouped_len(), 2);
        assert_eq!(data.tally().total, 2);
    }

    #[test]
    fn query_strings_do_not_hide_the_file_kind() {
        let config = ApiConfig::new("http://localhost:8000/api/").unwrap();
        let link = attachment_link(
            &config,
            AttachmentSlot::BirthCertificate,
            "https://bucket.example/docs/bc.pdf?X-Amz-Signature=abc#page=2",
        )
        .unwrap();
        assert_eq!(link.file_name, "bc.pdf");
        assert_eq!(link.kind, AttachmentKind::Pdf);
        assert!(link.url.ends_with("X-Amz-Signature=abc#page=2"));
    }

    #[tokio::test]
    async fn detail_resolves_applicant_and_attachments() {
        let api = FakeApi::new(
            vec![applicant(4, "Nila")],
            vec![application(
                20,
                json!({
                    "applicant": 4,
                    "photo": "/media/photos/nila.JPG",
                    "birth_certificate": "https://files.example/bc.pdf",
                    "health_record": "",
                }),
            )],
        );
        let config = ApiConfig::new("http://localhost:8000/api").unwrap();
        let detail = load_application_detail(&api, &config, 20).await.unwrap();

        assert_eq!(detail.applicant_name(), "Nila Perera");
        assert_eq!(detail.attachments.len(), 2);
        let photo = detail.attachment(AttachmentSlot::Photo).unwrap();
        assert_eq!(photo.url, "http://localhost:8000/api/media/photos/nila.JPG");
        assert_eq!(photo.kind, AttachmentKind::Image);
        assert_eq!(photo.file_name, "nila.JPG");
        let bc = detail.attachment(AttachmentSlot::BirthCertificate).unwrap();
        assert_eq!(bc.kind, AttachmentKind::Pdf);
        assert!(detail.attachment(AttachmentSlot::HealthRecord).is_none());
    }

    #[tokio::test]
    async fn detail_tolerates_missing_applicant() {
        let api = FakeApi::new(vec![], vec![application(21, json!({"applicant": 99}))]);
        let config = ApiConfig::new("http://localhost:8000/api/").unwrap();
        let detail = load_application_detail(&api, &config, 21).await.unwrap();
        assert!(detail.applicant.is_none());
        assert_eq!(detail.applicant_name(), "Application #21");

        assert!(load_application_detail(&api, &config, 404).await.is_err());
    }
}
