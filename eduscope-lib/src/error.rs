use std::{collections::BTreeMap, fmt::Display};

use crate::validators::FormField;

/// Per-field validation failures. Never sent to the network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    errors: BTreeMap<FormField, String>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the first reason recorded for a field.
    pub fn insert(&mut self, field: FormField, reason: impl Into<String>) {
        self.errors.entry(field).or_insert_with(|| reason.into());
    }

    /// Replaces whatever was recorded for `field` with the outcome of a
    /// fresh check of that field alone.
    pub fn update(&mut self, field: FormField, check: Result<(), String>) {
        match check {
            Ok(()) => {
                self.errors.remove(&field);
            }
            Err(reason) => {
                self.errors.insert(field, reason);
            }
        }
    }

    pub fn get(&self, field: FormField) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FormField, &str)> {
        self.errors.iter().map(|(f, r)| (*f, r.as_str()))
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ValidationError:")?;
        for (field, reason) in &self.errors {
            write!(f, " {}: {};", field.as_str(), reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// A prerequisite fetch failed. Transport failures carry no status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    pub message: String,
    pub status: Option<u16>,
}

impl LoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(status: u16, body: &str) -> Self {
        Self {
            message: failure_message(status, body),
            status: Some(status),
        }
    }
}

impl Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LoadError: {}", self.message)
    }
}

impl std::error::Error for LoadError {}

/// A create, update or delete request failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionError {
    pub message: String,
    pub status: Option<u16>,
}

impl SubmissionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(status: u16, body: &str) -> Self {
        Self {
            message: failure_message(status, body),
            status: Some(status),
        }
    }
}

impl Display for SubmissionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SubmissionError: {}", self.message)
    }
}

impl std::error::Error for SubmissionError {}

fn failure_message(status: u16, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        format!("Request failed with {}", status)
    } else {
        body.to_string()
    }
}

/// An application whose applicant reference matched none of the known aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnresolvedRelationError {
    pub application_id: i64,
}

impl Display for UnresolvedRelationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "UnresolvedRelationError: application {} has no resolvable applicant reference",
            self.application_id
        )
    }
}

impl std::error::Error for UnresolvedRelationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingBaseUrl,
    InvalidBaseUrl(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingBaseUrl => write!(f, "ConfigError: API base url is empty"),
            ConfigError::InvalidBaseUrl(e) => write!(f, "ConfigError: invalid API base url {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionsError {
    Validation(ValidationError),
    Load(LoadError),
    Submission(SubmissionError),
    UnresolvedRelation(UnresolvedRelationError),
    Config(ConfigError),
    InvalidTransition(String),
}

impl Display for AdmissionsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdmissionsError::Validation(e) => Display::fmt(e, f),
            AdmissionsError::Load(e) => Display::fmt(e, f),
            AdmissionsError::Submission(e) => Display::fmt(e, f),
            AdmissionsError::UnresolvedRelation(e) => Display::fmt(e, f),
            AdmissionsError::Config(e) => Display::fmt(e, f),
            AdmissionsError::InvalidTransition(e) => write!(f, "InvalidTransition: {}", e),
        }
    }
}

impl std::error::Error for AdmissionsError {}

impl From<ValidationError> for AdmissionsError {
    fn from(e: ValidationError) -> Self {
        AdmissionsError::Validation(e)
    }
}

impl From<LoadError> for AdmissionsError {
    fn from(e: LoadError) -> Self {
        AdmissionsError::Load(e)
    }
}

impl From<SubmissionError> for AdmissionsError {
    fn from(e: SubmissionError) -> Self {
        AdmissionsError::Submission(e)
    }
}

impl From<UnresolvedRelationError> for AdmissionsError {
    fn from(e: UnresolvedRelationError) -> Self {
        AdmissionsError::UnresolvedRelation(e)
    }
}

impl From<ConfigError> for AdmissionsError {
    fn from(e: ConfigError) -> Self {
        AdmissionsError::Config(e)
    }
}
