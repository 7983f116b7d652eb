//! In-memory `AdmissionsApi` used by unit tests.

use std::{collections::HashSet, sync::Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{
    error::{LoadError, SubmissionError},
    models::{Applicant, ApplicantKey, Application, NewApplicant},
    store::AdmissionsApi,
    submission::MultipartPayload,
};

pub fn applicant(id: i64, first_name: &str) -> Applicant {
    serde_json::from_value(json!({
        "id": id,
        "first_name": first_name,
        "last_name": "Perera",
        "gender": "female",
        "dob": "2015-04-02",
        "email": format!("{}@example.com", first_name.to_lowercase()),
    }))
    .unwrap()
}

/// `fields` is merged over a minimal Grade 1 record.
pub fn application(id: i64, fields: Value) -> Application {
    let mut record = json!({"id": id, "apply_grade": "Grade 1"});
    if let (Some(base), Value::Object(extra)) = (record.as_object_mut(), fields) {
        base.extend(extra);
    }
    serde_json::from_value(record).unwrap()
}

#[derive(Default)]
struct FakeState {
    applicants: Vec<Applicant>,
    applications: Vec<Application>,
    fail_application_list: bool,
    fail_submissions: bool,
    rejected_deletes: HashSet<i64>,
    sent: Vec<(Option<i64>, MultipartPayload)>,
    created_applicants: Vec<NewApplicant>,
}

#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new(applicants: Vec<Applicant>, applications: Vec<Application>) -> Self {
        Self {
            state: Mutex::new(FakeState {
                applicants,
                applications,
                ..FakeState::default()
            }),
        }
    }

    pub fn fail_application_list(&self) {
        self.state.lock().unwrap().fail_application_list = true;
    }

    pub fn fail_submissions(&self) {
        self.state.lock().unwrap().fail_submissions = true;
    }

    pub fn reject_delete(&self, id: i64) {
        self.state.lock().unwrap().rejected_deletes.insert(id);
    }

    /// Payloads received so far, tagged with the target id on updates.
    pub fn sent(&self) -> Vec<(Option<i64>, MultipartPayload)> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn created_applicants(&self) -> Vec<NewApplicant> {
        self.state.lock().unwrap().created_applicants.clone()
    }

    pub fn stored_application(&self, id: i64) -> Option<Application> {
        let state = self.state.lock().unwrap();
        state.applications.iter().find(|a| a.id == id).cloned()
    }
}

/// Applies a payload the way the server does: only fields present change.
fn apply_payload(record: &mut Value, payload: &MultipartPayload) {
    for (name, value) in payload.text_fields() {
        let value = match name.as_str() {
            "extra_curriculars" => serde_json::from_str(value).unwrap_or(Value::Null),
            "applicant" => value.parse::<i64>().map(Value::from).unwrap_or(Value::Null),
            _ => Value::from(value.as_str()),
        };
        record[name.as_str()] = value;
    }
    for (name, file) in payload.file_fields() {
        record[name.as_str()] = Value::from(format!("/media/{}/{}", name, file.file_name));
    }
}

#[async_trait]
impl AdmissionsApi for FakeApi {
    async fn list_applicants(&self) -> Result<Vec<Applicant>, LoadError> {
        Ok(self.state.lock().unwrap().applicants.clone())
    }

    async fn get_applicant(&self, key: ApplicantKey) -> Result<Applicant, LoadError> {
        let state = self.state.lock().unwrap();
        state
            .applicants
            .iter()
            .find(|a| a.key() == key)
            .cloned()
            .ok_or_else(|| LoadError::with_status(404, "Not found."))
    }

    async fn create_applicant(&self, body: &NewApplicant) -> Result<Applicant, SubmissionError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_submissions {
            return Err(SubmissionError::with_status(400, "rejected"));
        }
        state.created_applicants.push(body.clone());
        let mut record = serde_json::to_value(body).unwrap();
        record["id"] = Value::from(100 + state.applicants.len() as i64);
        let created: Applicant = serde_json::from_value(record).unwrap();
        state.applicants.push(created.clone());
        Ok(created)
    }

    async fn list_applications(&self) -> Result<Vec<Application>, LoadError> {
        let state = self.state.lock().unwrap();
        if state.fail_application_list {
            return Err(LoadError::with_status(500, "boom"));
        }
        Ok(state.applications.clone())
    }

    async fn get_application(&self, id: i64) -> Result<Application, LoadError> {
        let state = self.state.lock().unwrap();
        state
            .applications
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| LoadError::with_status(404, "Not found."))
    }

    async fn create_application(
        &self,
        payload: MultipartPayload,
    ) -> Result<Application, SubmissionError> {
        let mut state = self.state.lock().unwrap();
        state.sent.push((None, payload.clone()));
        if state.fail_submissions {
            return Err(SubmissionError::with_status(400, "rejected"));
        }
        let mut record = json!({"id": 500 + state.applications.len() as i64});
        apply_payload(&mut record, &payload);
        let created: Application = serde_json::from_value(record)
            .map_err(|e| SubmissionError::new(e.to_string()))?;
        state.applications.push(created.clone());
        Ok(created)
    }

    async fn update_application(
        &self,
        id: i64,
        payload: MultipartPayload,
    ) -> Result<Application, SubmissionError> {
        let mut state = self.state.lock().unwrap();
        state.sent.push((Some(id), payload.clone()));
        if state.fail_submissions {
            return Err(SubmissionError::with_status(400, "rejected"));
        }
        let position = state
            .applications
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| SubmissionError::with_status(404, "Not found."))?;
        let mut record = serde_json::to_value(&state.applications[position]).unwrap();
        apply_payload(&mut record, &payload);
        let updated: Application = serde_json::from_value(record)
            .map_err(|e| SubmissionError::new(e.to_string()))?;
        state.applications[position] = updated.clone();
        Ok(updated)
    }

    async fn delete_application(&self, id: i64) -> Result<(), SubmissionError> {
        let mut state = self.state.lock().unwrap();
        if state.rejected_deletes.contains(&id) {
            return Err(SubmissionError::with_status(403, "Not allowed."));
        }
        state.applications.retain(|a| a.id != id);
        Ok(())
    }
}
