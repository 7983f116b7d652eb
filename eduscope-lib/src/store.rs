//! RecordStore: typed access to the `Applicant` and `Application` resources.

use async_trait::async_trait;
use futures::try_join;
use log::{error, info, warn};
use reqwest::{
    header::{CACHE_CONTROL, PRAGMA},
    multipart::{Form, Part},
    RequestBuilder, Response,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    config::ApiConfig,
    error::{LoadError, SubmissionError},
    models::{Applicant, ApplicantKey, Application, NewApplicant},
    submission::MultipartPayload,
};

const APPLICANTS: &str = "Applicant/";
const APPLICATIONS: &str = "Application/";

/// The remote resource collections the intake screens depend on.
#[async_trait]
pub trait AdmissionsApi {
    async fn list_applicants(&self) -> Result<Vec<Applicant>, LoadError>;
    async fn get_applicant(&self, key: ApplicantKey) -> Result<Applicant, LoadError>;
    async fn create_applicant(&self, body: &NewApplicant) -> Result<Applicant, SubmissionError>;
    async fn list_applications(&self) -> Result<Vec<Application>, LoadError>;
    async fn get_application(&self, id: i64) -> Result<Application, LoadError>;
    async fn create_application(
        &self,
        payload: MultipartPayload,
    ) -> Result<Application, SubmissionError>;
    async fn update_application(
        &self,
        id: i64,
        payload: MultipartPayload,
    ) -> Result<Application, SubmissionError>;
    async fn delete_application(&self, id: i64) -> Result<(), SubmissionError>;
}

/// Progress of a fetch backing a view.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState<T> {
    Loading,
    Loaded(T),
    Failed(LoadError),
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        FetchState::Loading
    }
}

impl<T> FetchState<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            FetchState::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn loaded_mut(&mut self) -> Option<&mut T> {
        match self {
            FetchState::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&LoadError> {
        match self {
            FetchState::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading)
    }
}

impl<T> From<Result<T, LoadError>> for FetchState<T> {
    fn from(result: Result<T, LoadError>) -> Self {
        match result {
            Ok(value) => FetchState::Loaded(value),
            Err(e) => FetchState::Failed(e),
        }
    }
}

/// Fetches both collections concurrently. Either failure fails the pair.
pub async fn load_collections<A>(api: &A) -> Result<(Vec<Applicant>, Vec<Application>), LoadError>
where
    A: AdmissionsApi + ?Sized,
{
    try_join!(api.list_applicants(), api.list_applications())
}

#[derive(Debug, Clone)]
pub struct RecordStore {
    client: reqwest::Client,
    config: ApiConfig,
}

impl RecordStore {
    pub fn new(config: ApiConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    pub fn with_client(config: ApiConfig, client: reqwest::Client) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Reads always go to the origin; other operators edit concurrently.
    fn read(&self, path: &str) -> RequestBuilder {
        self.client
            .get(self.config.endpoint(path))
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
    }

    async fn fetch_value(&self, path: &str, what: &str) -> Result<Value, LoadError> {
        let response = self.read(path).send().await.map_err(|e| {
            error!("Failed to load {}: {}", what, e);
            LoadError::new(format!("Failed to load {}: {}", what, e))
        })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Failed to load {}: status {}", what, status);
            let e = LoadError::with_status(status.as_u16(), &body);
            return Err(LoadError {
                message: format!("Failed to load {}: {}", what, e.message),
                ..e
            });
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| LoadError::new(format!("Failed to read {}: {}", what, e)))
    }

    async fn fetch_one<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T, LoadError> {
        let value = self.fetch_value(path, what).await?;
        serde_json::from_value(value)
            .map_err(|e| LoadError::new(format!("Failed to read {}: {}", what, e)))
    }

    /// Anything other than a JSON array is treated as an empty collection.
    async fn fetch_list<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<Vec<T>, LoadError> {
        match self.fetch_value(path, what).await? {
            Value::Array(items) => Ok(parse_records(items, what)),
            _ => {
                warn!("Expected a list of {}, treating the response as empty", what);
                Ok(Vec::new())
            }
        }
    }

    async fn dispatch(&self, request: RequestBuilder, what: &str) -> Result<Response, SubmissionError> {
        let response = request.send().await.map_err(|e| {
            error!("Failed to {}: {}", what, e);
            SubmissionError::new(format!("Failed to {}: {}", what, e))
        })?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Failed to {}: status {}", what, status);
            return Err(SubmissionError::with_status(status.as_u16(), &body));
        }
        info!("{}: status {}", what, status);
        Ok(response)
    }

    async fn dispatch_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &str,
    ) -> Result<T, SubmissionError> {
        let response = self.dispatch(request, what).await?;
        let status = response.status().as_u16();
        response.json::<T>().await.map_err(|e| SubmissionError {
            message: format!("Request to {} succeeded but the response could not be read: {}", what, e),
            status: Some(status),
        })
    }
}

/// Parses each record on its own; one that does not fit is logged and
/// skipped instead of failing the whole collection.
pub fn parse_records<T: DeserializeOwned>(items: Vec<Value>, what: &str) -> Vec<T> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(position, item)| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping unreadable entry {} in {}: {}", position, what, e);
                None
            }
        })
        .collect()
}

pub fn multipart_form(payload: MultipartPayload) -> Result<Form, SubmissionError> {
    let (text_fields, file_fields) = payload.into_parts();
    let mut form = Form::new();
    for (name, value) in text_fields {
        form = form.text(name, value);
    }
    for (name, file) in file_fields {
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.mime_type)
            .map_err(|e| SubmissionError::new(format!("Invalid file type for {}: {}", name, e)))?;
        form = form.part(name, part);
    }
    Ok(form)
}

#[async_trait]
impl AdmissionsApi for RecordStore {
    async fn list_applicants(&self) -> Result<Vec<Applicant>, LoadError> {
        self.fetch_list(APPLICANTS, "applicants").await
    }

    async fn get_applicant(&self, key: ApplicantKey) -> Result<Applicant, LoadError> {
        self.fetch_one(&format!("{}{}/", APPLICANTS, key), "applicant")
            .await
    }

    async fn create_applicant(&self, body: &NewApplicant) -> Result<Applicant, SubmissionError> {
        let request = self.client.post(self.config.endpoint(APPLICANTS)).json(body);
        self.dispatch_json(request, "create applicant").await
    }

    async fn list_applications(&self) -> Result<Vec<Application>, LoadError> {
        self.fetch_list(APPLICATIONS, "applications").await
    }

    async fn get_application(&self, id: i64) -> Result<Application, LoadError> {
        self.fetch_one(&format!("{}{}/", APPLICATIONS, id), "application")
            .await
    }

    async fn create_application(
        &self,
        payload: MultipartPayload,
    ) -> Result<Application, SubmissionError> {
        let request = self
            .client
            .post(self.config.endpoint(APPLICATIONS))
            .multipart(multipart_form(payload)?);
        self.dispatch_json(request, "submit application").await
    }

    async fn update_application(
        &self,
        id: i64,
        payload: MultipartPayload,
    ) -> Result<Application, SubmissionError> {
        let url = self.config.endpoint(&format!("{}{}/", APPLICATIONS, id));
        let request = self.client.patch(url).multipart(multipart_form(payload)?);
        self.dispatch_json(request, "update application").await
    }

    async fn delete_application(&self, id: i64) -> Result<(), SubmissionError> {
        let url = self.config.endpoint(&format!("{}{}/", APPLICATIONS, id));
        self.dispatch(self.client.delete(url), "delete application")
            .await
            .map(|_| ())
    }
}
