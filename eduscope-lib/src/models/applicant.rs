use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Resolved value of an application's applicant reference.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ApplicantKey(pub i64);

impl Display for ApplicantKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &str {
        match *self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            _ => Err(format!("{} is not a valid gender", s)),
        }
    }
}

/// The server stores gender as free text, so "Male" is read as `male`.
fn gender_any_case<'de, D>(de: D) -> Result<Gender, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(de)?;
    raw.parse().map_err(serde::de::Error::custom)
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Applicant {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(deserialize_with = "gender_any_case")]
    pub gender: Gender,
    #[serde(default)]
    pub dob: Option<NaiveDate>,
    #[serde(default)]
    pub guardian_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Applicant {
    pub fn key(&self) -> ApplicantKey {
        ApplicantKey(self.id)
    }

    /// Full name, else email, else a numbered placeholder.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string();
        if !full.is_empty() {
            return full;
        }
        if !self.email.trim().is_empty() {
            return self.email.clone();
        }
        format!("Applicant #{}", self.id)
    }
}

/// Body of `POST /Applicant/`. Only produced by form validation.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NewApplicant {
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub dob: NaiveDate,
    pub guardian_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn gender_is_read_in_any_case() {
        let applicant: Applicant = serde_json::from_value(json!({
            "id": 1, "first_name": "Ama", "last_name": "Perera", "gender": "Female",
        }))
        .unwrap();
        assert_eq!(applicant.gender, Gender::Female);

        let unknown = serde_json::from_value::<Applicant>(json!({
            "id": 2, "first_name": "Ama", "last_name": "Perera", "gender": "n/a",
        }));
        assert!(unknown.is_err());
    }

    #[test]
    fn display_name_fallbacks() {
        let mut applicant: Applicant = serde_json::from_value(json!({
            "id": 12,
            "first_name": "Nimal",
            "last_name": "Perera",
            "gender": "male",
            "dob": "2015-04-02",
            "email": "nimal@example.com",
        }))
        .unwrap();
        assert_eq!(applicant.display_name(), "Nimal Perera");
        assert_eq!(applicant.dob, NaiveDate::from_ymd_opt(2015, 4, 2));

        applicant.first_name.clear();
        applicant.last_name = " ".to_string();
        assert_eq!(applicant.display_name(), "nimal@example.com");

        applicant.email.clear();
        assert_eq!(applicant.display_name(), "Applicant #12");
    }

    #[test]
    fn new_applicant_serializes_wire_shape() {
        let body = NewApplicant {
            first_name: "Ama".to_string(),
            last_name: "Silva".to_string(),
            gender: Gender::Female,
            dob: NaiveDate::from_ymd_opt(2016, 1, 31).unwrap(),
            guardian_name: "Kamala Silva".to_string(),
            email: "kamala@example.com".to_string(),
            phone: "+94771234567".to_string(),
            address: "12 Lake Road, Kandy".to_string(),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["gender"], "female");
        assert_eq!(value["dob"], "2016-01-31");
    }
}
