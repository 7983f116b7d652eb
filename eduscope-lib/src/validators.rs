//! Field rules for the applicant and application forms.
//!
//! Every check is pure: it looks at one raw value and returns the reason it
//! failed. Attachments are optional everywhere, so `None` always passes.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    error::ValidationError,
    models::{
        ApplicantFormValues, ApplicationFormValues, ApplicationStatus, Attachment, Gender, Grade,
        NewApplicant, ACTIVITY_OPTIONS,
    },
    submission::SubmissionMode,
};

pub type FieldCheck = Result<(), String>;

pub const MIN_NAME_CHARS: usize = 2;
pub const MIN_ADDRESS_CHARS: usize = 5;
pub const MAX_EMAIL_CHARS: usize = 100;
pub const MAX_PHONE_CHARS: usize = 20;
pub const MIN_PHONE_DIGITS: usize = 8;
pub const MAX_PHONE_DIGITS: usize = 15;
pub const MINIMUM_AGE: i32 = 6;
pub const MAX_IMAGE_MB: u64 = 5;
pub const MAX_DOCUMENT_MB: u64 = 10;
pub const DOCUMENT_MIME_TYPES: [&str; 3] = [
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

const BYTES_PER_MB: u64 = 1024 * 1024;

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z\s'-]+$").expect("name pattern compiles"));
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[A-Z0-9_'+\-.]*[A-Z0-9_+\-]@([A-Z0-9][A-Z0-9\-]*\.)+[A-Z]{2,}$")
        .expect("email pattern compiles")
});

/// Form fields that can carry a validation reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    FirstName,
    LastName,
    Gender,
    Dob,
    GuardianName,
    Email,
    Phone,
    Address,
    Applicant,
    ApplyGrade,
    Status,
    ExtraCurriculars,
    Photo,
    BirthCertificate,
    HealthRecord,
}

impl FormField {
    pub fn as_str(&self) -> &'static str {
        match *self {
            FormField::FirstName => "first_name",
            FormField::LastName => "last_name",
            FormField::Gender => "gender",
            FormField::Dob => "dob",
            FormField::GuardianName => "guardian_name",
            FormField::Email => "email",
            FormField::Phone => "phone",
            FormField::Address => "address",
            FormField::Applicant => "applicant",
            FormField::ApplyGrade => "apply_grade",
            FormField::Status => "status",
            FormField::ExtraCurriculars => "extra_curriculars",
            FormField::Photo => "photo",
            FormField::BirthCertificate => "birth_certificate",
            FormField::HealthRecord => "health_record",
        }
    }
}

fn validate_person_name(label: &str, value: &str) -> FieldCheck {
    let value = value.trim();
    if value.chars().count() < MIN_NAME_CHARS {
        return Err(format!("{} must be at least {} characters.", label, MIN_NAME_CHARS));
    }
    if !NAME_RE.is_match(value) {
        return Err(format!(
            "{} can only contain letters, spaces, apostrophes, and hyphens.",
            label
        ));
    }
    Ok(())
}

pub fn validate_first_name(value: &str) -> FieldCheck {
    validate_person_name("First name", value)
}

pub fn validate_last_name(value: &str) -> FieldCheck {
    validate_person_name("Last name", value)
}

pub fn validate_guardian_name(value: &str) -> FieldCheck {
    validate_person_name("Guardian name", value)
}

pub fn validate_gender(value: &str) -> FieldCheck {
    value
        .parse::<Gender>()
        .map(|_| ())
        .map_err(|_| "Please select a gender.".to_string())
}

pub fn validate_email(value: &str) -> FieldCheck {
    let value = value.trim();
    if value.chars().count() > MAX_EMAIL_CHARS {
        return Err(format!("Email must be at most {} characters.", MAX_EMAIL_CHARS));
    }
    if value.starts_with('.') || value.contains("..") || !EMAIL_RE.is_match(value) {
        return Err("Enter a valid email address.".to_string());
    }
    Ok(())
}

/// International format: `+`, a country code that does not start with 0,
/// 8 to 15 digits in total, no separators.
pub fn validate_phone(value: &str) -> FieldCheck {
    let value = value.trim();
    if value.chars().count() > MAX_PHONE_CHARS {
        return Err(format!("Phone must be at most {} characters.", MAX_PHONE_CHARS));
    }
    let digits = match value.strip_prefix('+') {
        Some(digits) => digits,
        None => {
            return Err(
                "Phone must start with + and the country code, like +94771234567.".to_string(),
            )
        }
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err("Phone can only contain digits after the +, no spaces or dashes.".to_string());
    }
    if digits.starts_with('0') {
        return Err("Country code cannot start with 0.".to_string());
    }
    if digits.len() < MIN_PHONE_DIGITS {
        return Err(format!(
            "Phone is too short, use {} to {} digits after the +.",
            MIN_PHONE_DIGITS, MAX_PHONE_DIGITS
        ));
    }
    if digits.len() > MAX_PHONE_DIGITS {
        return Err(format!(
            "Phone is too long, use at most {} digits after the +.",
            MAX_PHONE_DIGITS
        ));
    }
    Ok(())
}

pub fn validate_address(value: &str) -> FieldCheck {
    if value.trim().chars().count() < MIN_ADDRESS_CHARS {
        return Err(format!(
            "Address must be at least {} characters.",
            MIN_ADDRESS_CHARS
        ));
    }
    Ok(())
}

/// Whole years between `dob` and `today`, counting this year only once the
/// birthday has passed.
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> i32 {
    let years = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        years - 1
    } else {
        years
    }
}

pub fn parse_dob(value: &str, today: NaiveDate) -> Result<NaiveDate, String> {
    let dob = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| "Enter a valid date of birth (YYYY-MM-DD).".to_string())?;
    if dob >= today {
        return Err("Date of birth must be in the past.".to_string());
    }
    if age_on(dob, today) < MINIMUM_AGE {
        return Err(format!("Minimum age must be {} years.", MINIMUM_AGE));
    }
    Ok(dob)
}

pub fn validate_dob(value: &str, today: NaiveDate) -> FieldCheck {
    parse_dob(value, today).map(|_| ())
}

pub fn validate_image(file: Option<&Attachment>) -> FieldCheck {
    let Some(file) = file else { return Ok(()) };
    if !file.mime_type.starts_with("image/") {
        return Err("Only image files are allowed.".to_string());
    }
    if file.size() > MAX_IMAGE_MB * BYTES_PER_MB {
        return Err(format!("Image must be at most {} MB.", MAX_IMAGE_MB));
    }
    Ok(())
}

pub fn validate_document(file: Option<&Attachment>) -> FieldCheck {
    let Some(file) = file else { return Ok(()) };
    if !DOCUMENT_MIME_TYPES.contains(&file.mime_type.as_str()) {
        return Err("Only PDF or DOC/DOCX files are allowed.".to_string());
    }
    if file.size() > MAX_DOCUMENT_MB * BYTES_PER_MB {
        return Err(format!("Document must be at most {} MB.", MAX_DOCUMENT_MB));
    }
    Ok(())
}

pub fn validate_grade(value: &str) -> FieldCheck {
    if value.trim().is_empty() {
        return Err("Select a grade.".to_string());
    }
    value
        .parse::<Grade>()
        .map(|_| ())
        .map_err(|_| "Select a grade from Grade 1 to Grade 13.".to_string())
}

pub fn validate_status(value: &str) -> FieldCheck {
    value
        .parse::<ApplicationStatus>()
        .map(|_| ())
        .map_err(|_| "Select a status: pending, approved or rejected.".to_string())
}

pub fn validate_applicant_ref(value: &str) -> FieldCheck {
    let value = value.trim();
    if value.is_empty() {
        return Err("Select an applicant.".to_string());
    }
    match value.parse::<i64>() {
        Ok(id) if id > 0 => Ok(()),
        _ => Err(format!("{} is not a valid applicant id.", value)),
    }
}

pub fn validate_activity_options(checked: &[String]) -> FieldCheck {
    match checked
        .iter()
        .find(|label| !ACTIVITY_OPTIONS.contains(&label.as_str()))
    {
        Some(unknown) => Err(format!("{} is not one of the listed activities.", unknown)),
        None => Ok(()),
    }
}

fn record(errors: &mut ValidationError, field: FormField, check: FieldCheck) {
    if let Err(reason) = check {
        errors.insert(field, reason);
    }
}

/// Checks every applicant field and, when all pass, returns the trimmed
/// request body.
pub fn validate_applicant_form(
    form: &ApplicantFormValues,
    today: NaiveDate,
) -> Result<NewApplicant, ValidationError> {
    let mut errors = ValidationError::new();
    record(&mut errors, FormField::FirstName, validate_first_name(&form.first_name));
    record(&mut errors, FormField::LastName, validate_last_name(&form.last_name));
    record(&mut errors, FormField::Gender, validate_gender(&form.gender));
    let dob = parse_dob(&form.dob, today);
    if let Err(reason) = &dob {
        errors.insert(FormField::Dob, reason.clone());
    }
    record(&mut errors, FormField::GuardianName, validate_guardian_name(&form.guardian_name));
    record(&mut errors, FormField::Email, validate_email(&form.email));
    record(&mut errors, FormField::Phone, validate_phone(&form.phone));
    record(&mut errors, FormField::Address, validate_address(&form.address));

    let (Ok(gender), Ok(dob)) = (form.gender.parse::<Gender>(), dob) else {
        return Err(errors);
    };
    errors.into_result()?;

    Ok(NewApplicant {
        first_name: form.first_name.trim().to_string(),
        last_name: form.last_name.trim().to_string(),
        gender,
        dob,
        guardian_name: form.guardian_name.trim().to_string(),
        email: form.email.trim().to_string(),
        phone: form.phone.trim().to_string(),
        address: form.address.trim().to_string(),
    })
}

/// Status is only checked when editing; create leaves it to the server default.
pub fn validate_application_form(
    form: &ApplicationFormValues,
    mode: SubmissionMode,
) -> Result<(), ValidationError> {
    let mut errors = ValidationError::new();
    record(&mut errors, FormField::Applicant, validate_applicant_ref(&form.applicant));
    record(&mut errors, FormField::ApplyGrade, validate_grade(&form.apply_grade));
    if mode == SubmissionMode::Update {
        record(&mut errors, FormField::Status, validate_status(&form.status));
    }
    record(
        &mut errors,
        FormField::ExtraCurriculars,
        validate_activity_options(&form.extra_curriculars_checked),
    );
    record(&mut errors, FormField::Photo, validate_image(form.photo.as_ref()));
    record(
        &mut errors,
        FormField::BirthCertificate,
        validate_document(form.birth_certificate.as_ref()),
    );
    record(
        &mut errors,
        FormField::HealthRecord,
        validate_document(form.health_record.as_ref()),
    );
    errors.into_result()
}
