//! Reconciles the applicant and application collections into dashboard views.
//!
//! The index is a pure function of its two inputs; callers rebuild it
//! whenever the application collection changes.

use std::{collections::HashMap, fmt::Display};

use chrono::NaiveDate;
use log::warn;

use crate::{
    error::UnresolvedRelationError,
    models::{Applicant, ApplicantKey, Application, ApplicationStatus},
};

pub const NOT_AVAILABLE: &str = "N/A";
const MISSING_NAME: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatestStatus {
    Status(ApplicationStatus),
    NotAvailable,
}

impl Display for LatestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LatestStatus::Status(status) => write!(f, "{}", status),
            LatestStatus::NotAvailable => f.write_str(NOT_AVAILABLE),
        }
    }
}

/// Applications grouped by applicant, newest first within each group.
#[derive(Debug, Clone, Default)]
pub struct LatestStatusIndex {
    groups: HashMap<ApplicantKey, Vec<Application>>,
    unresolved: Vec<UnresolvedRelationError>,
}

impl LatestStatusIndex {
    pub fn group(&self, key: ApplicantKey) -> &[Application] {
        self.groups.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn latest(&self, key: ApplicantKey) -> Option<&Application> {
        self.group(key).first()
    }

    pub fn latest_status(&self, key: ApplicantKey) -> LatestStatus {
        match self.latest(key) {
            Some(app) => LatestStatus::Status(app.status),
            None => LatestStatus::NotAvailable,
        }
    }

    pub fn groups(&self) -> &HashMap<ApplicantKey, Vec<Application>> {
        &self.groups
    }

    /// Applications left out because their applicant reference did not resolve.
    pub fn unresolved(&self) -> &[UnresolvedRelationError] {
        &self.unresolved
    }

    pub fn grouped_len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

pub fn build_latest_status_index(
    applicants: &[Applicant],
    applications: &[Application],
) -> LatestStatusIndex {
    let mut index = LatestStatusIndex::default();

    for app in applications {
        match app.applicant_key() {
            Some(key) => index.groups.entry(key).or_default().push(app.clone()),
            None => {
                warn!(
                    "Application {} has no resolvable applicant reference, leaving it out of the status index",
                    app.id
                );
                index
                    .unresolved
                    .push(UnresolvedRelationError { application_id: app.id });
            }
        }
    }

    for applicant in applicants {
        index.groups.entry(applicant.key()).or_default();
    }

    // sort_by is stable: equal timestamps keep their fetch order
    for group in index.groups.values_mut() {
        group.sort_by(|a, b| b.recency().cmp(&a.recency()));
    }

    index
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplicantRow<'a> {
    pub applicant: &'a Applicant,
    pub latest_status: LatestStatus,
    pub history: &'a [Application],
}

pub fn applicant_rows<'a>(
    applicants: &'a [Applicant],
    index: &'a LatestStatusIndex,
) -> Vec<ApplicantRow<'a>> {
    applicants
        .iter()
        .map(|applicant| ApplicantRow {
            applicant,
            latest_status: index.latest_status(applicant.key()),
            history: index.group(applicant.key()),
        })
        .collect()
}

/// One line of the application table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationRow {
    pub id: i64,
    pub applicant_name: String,
    pub status: ApplicationStatus,
    pub submitted_on: Option<NaiveDate>,
}

pub fn applicant_name_for(
    app: &Application,
    applicants_by_key: &HashMap<ApplicantKey, &Applicant>,
) -> String {
    if let Some(applicant) = app
        .applicant_key()
        .and_then(|key| applicants_by_key.get(&key))
    {
        return applicant.display_name();
    }
    app.applicant_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(MISSING_NAME)
        .to_string()
}

pub fn application_rows(applicants: &[Applicant], applications: &[Application]) -> Vec<ApplicationRow> {
    let by_key: HashMap<ApplicantKey, &Applicant> =
        applicants.iter().map(|a| (a.key(), a)).collect();

    applications
        .iter()
        .map(|app| ApplicationRow {
            id: app.id,
            applicant_name: applicant_name_for(app, &by_key),
            status: app.status,
            submitted_on: app.created().map(|t| t.date_naive()),
        })
        .collect()
}

/// Counts behind the dashboard status bars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusTally {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

impl StatusTally {
    pub fn from_applications(applications: &[Application]) -> Self {
        applications
            .iter()
            .fold(StatusTally::default(), |mut tally, app| {
                tally.total += 1;
                match app.status {
                    ApplicationStatus::Pending => tally.pending += 1,
                    ApplicationStatus::Approved => tally.approved += 1,
                    ApplicationStatus::Rejected => tally.rejected += 1,
                }
                tally
            })
    }

    pub fn padded(count: usize) -> String {
        format!("{:02}", count)
    }
}
