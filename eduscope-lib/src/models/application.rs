use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::applicant::ApplicantKey;

/// Names under which an application may carry its applicant reference,
/// tried in this order. The first non-null value that resolves wins.
pub const APPLICANT_KEY_ALIASES: [&str; 4] = ["applicant_id", "applicantId", "applicant", "ApplicantId"];

/// Checkbox options for extra-curricular activities.
pub const ACTIVITY_OPTIONS: [&str; 6] = ["Sports", "Music", "Art", "Debate", "Scouts", "Coding Club"];

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Grade {
    #[serde(rename = "Grade 1")]
    Grade1,
    #[serde(rename = "Grade 2")]
    Grade2,
    #[serde(rename = "Grade 3")]
    Grade3,
    #[serde(rename = "Grade 4")]
    Grade4,
    #[serde(rename = "Grade 5")]
    Grade5,
    #[serde(rename = "Grade 6")]
    Grade6,
    #[serde(rename = "Grade 7")]
    Grade7,
    #[serde(rename = "Grade 8")]
    Grade8,
    #[serde(rename = "Grade 9")]
    Grade9,
    #[serde(rename = "Grade 10")]
    Grade10,
    #[serde(rename = "Grade 11")]
    Grade11,
    #[serde(rename = "Grade 12")]
    Grade12,
    #[serde(rename = "Grade 13")]
    Grade13,
}

impl Grade {
    pub const ALL: [Grade; 13] = [
        Grade::Grade1,
        Grade::Grade2,
        Grade::Grade3,
        Grade::Grade4,
        Grade::Grade5,
        Grade::Grade6,
        Grade::Grade7,
        Grade::Grade8,
        Grade::Grade9,
        Grade::Grade10,
        Grade::Grade11,
        Grade::Grade12,
        Grade::Grade13,
    ];

    pub fn as_str(&self) -> &'static str {
        match *self {
            Grade::Grade1 => "Grade 1",
            Grade::Grade2 => "Grade 2",
            Grade::Grade3 => "Grade 3",
            Grade::Grade4 => "Grade 4",
            Grade::Grade5 => "Grade 5",
            Grade::Grade6 => "Grade 6",
            Grade::Grade7 => "Grade 7",
            Grade::Grade8 => "Grade 8",
            Grade::Grade9 => "Grade 9",
            Grade::Grade10 => "Grade 10",
            Grade::Grade11 => "Grade 11",
            Grade::Grade12 => "Grade 12",
            Grade::Grade13 => "Grade 13",
        }
    }
}

impl Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Grade::ALL
            .into_iter()
            .find(|g| g.as_str() == s.trim())
            .ok_or_else(|| format!("{} is not a valid grade", s))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 3] = [
        ApplicationStatus::Pending,
        ApplicationStatus::Approved,
        ApplicationStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match *self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

impl Display for ApplicationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("{} is not a valid status", s)),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Application {
    pub id: i64,
    #[serde(alias = "grade")]
    pub apply_grade: Grade,
    #[serde(default, deserialize_with = "status_or_default")]
    pub status: ApplicationStatus,
    #[serde(default, alias = "extras", deserialize_with = "list_or_empty")]
    pub extra_curriculars: Vec<String>,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub birth_certificate: Option<String>,
    #[serde(default)]
    pub health_record: Option<String>,
    #[serde(default, alias = "submission_date")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub applicant_name: Option<String>,
    /// Everything else on the record, including the applicant reference
    /// under whichever alias the payload used.
    #[serde(flatten)]
    pub relations: BTreeMap<String, Value>,
}

impl Application {
    /// Applicant reference, looked up through `APPLICANT_KEY_ALIASES`.
    pub fn applicant_key(&self) -> Option<ApplicantKey> {
        APPLICANT_KEY_ALIASES
            .iter()
            .filter_map(|alias| self.relations.get(*alias))
            .filter(|value| !value.is_null())
            .find_map(key_from_value)
    }

    /// Creation time, preferring the submission stamp.
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.submitted_at.or(self.created_at)
    }

    /// Timestamp used to order an applicant's history: update, then
    /// creation, then the epoch.
    pub fn recency(&self) -> DateTime<Utc> {
        self.updated_at
            .or_else(|| self.created())
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn attachment(&self, slot: AttachmentSlot) -> Option<&str> {
        match slot {
            AttachmentSlot::Photo => self.photo.as_deref(),
            AttachmentSlot::BirthCertificate => self.birth_certificate.as_deref(),
            AttachmentSlot::HealthRecord => self.health_record.as_deref(),
        }
        .filter(|v| !v.trim().is_empty())
    }
}

/// The three binary fields of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentSlot {
    Photo,
    BirthCertificate,
    HealthRecord,
}

impl AttachmentSlot {
    pub const ALL: [AttachmentSlot; 3] = [
        AttachmentSlot::Photo,
        AttachmentSlot::BirthCertificate,
        AttachmentSlot::HealthRecord,
    ];

    pub fn field_name(&self) -> &'static str {
        match *self {
            AttachmentSlot::Photo => "photo",
            AttachmentSlot::BirthCertificate => "birth_certificate",
            AttachmentSlot::HealthRecord => "health_record",
        }
    }
}

fn key_from_value(value: &Value) -> Option<ApplicantKey> {
    match value {
        Value::Number(n) => n.as_i64().map(ApplicantKey),
        Value::String(s) => s.trim().parse::<i64>().ok().map(ApplicantKey),
        Value::Object(o) => o.get("id").and_then(key_from_value),
        _ => None,
    }
}

/// A missing or null status reads as the default, pending.
fn status_or_default<'de, D>(de: D) -> Result<ApplicationStatus, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<String>::deserialize(de)? {
        Some(raw) => raw.parse().map_err(serde::de::Error::custom),
        None => Ok(ApplicationStatus::default()),
    }
}

fn list_or_empty<'de, D>(de: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let helper: Value = Deserialize::deserialize(de)?;

    match helper {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect()),
        _ => Ok(Vec::new()),
    }
}
