//! Builds create/update request bodies from application form values.

use serde_json::Value;

use crate::models::{ApplicationFormValues, Attachment, AttachmentSlot, ACTIVITY_OPTIONS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionMode {
    Create,
    Update,
}

/// Multipart body, kept as plain data until the store sends it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartPayload {
    text_fields: Vec<(String, String)>,
    file_fields: Vec<(String, Attachment)>,
}

impl MultipartPayload {
    pub fn push_text(&mut self, name: &str, value: impl Into<String>) {
        self.text_fields.push((name.to_string(), value.into()));
    }

    pub fn push_file(&mut self, name: &str, file: Attachment) {
        self.file_fields.push((name.to_string(), file));
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.text_fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn file(&self, name: &str) -> Option<&Attachment> {
        self.file_fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, file)| file)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.text(name).is_some() || self.file(name).is_some()
    }

    pub fn text_fields(&self) -> &[(String, String)] {
        &self.text_fields
    }

    pub fn file_fields(&self) -> &[(String, Attachment)] {
        &self.file_fields
    }

    pub fn into_parts(self) -> (Vec<(String, String)>, Vec<(String, Attachment)>) {
        (self.text_fields, self.file_fields)
    }
}

/// Checked options first, then the comma separated extras, blanks dropped.
/// Duplicates are kept.
pub fn merge_activity_tags(checked: &[String], other: &str) -> Vec<String> {
    checked
        .iter()
        .map(|tag| tag.trim())
        .chain(other.split(','))
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Inverse of `merge_activity_tags` for seeding an edit form: tags from the
/// fixed option list become checkboxes, the rest is rejoined as free text.
pub fn split_activity_tags(tags: &[String]) -> (Vec<String>, String) {
    let (checked, other): (Vec<String>, Vec<String>) = tags
        .iter()
        .cloned()
        .partition(|tag| ACTIVITY_OPTIONS.contains(&tag.as_str()));
    (checked, other.join(", "))
}

/// Tags travel as one JSON array field rather than repeated keys.
pub fn activity_tags_field(tags: Vec<String>) -> String {
    Value::from(tags).to_string()
}

/// Expects values that already passed `validate_application_form`.
/// File slots without a new selection are left out entirely so a partial
/// update keeps whatever the server already stores.
pub fn build_payload(values: &ApplicationFormValues, mode: SubmissionMode) -> MultipartPayload {
    let mut payload = MultipartPayload::default();
    payload.push_text("applicant", values.applicant.trim());
    payload.push_text("apply_grade", values.apply_grade.trim());
    if mode == SubmissionMode::Update {
        payload.push_text("status", values.status.trim());
    }
    let tags = merge_activity_tags(
        &values.extra_curriculars_checked,
        &values.extra_curriculars_other,
    );
    payload.push_text("extra_curriculars", activity_tags_field(tags));

    for slot in AttachmentSlot::ALL {
        if let Some(file) = values.file(slot) {
            payload.push_file(slot.field_name(), file.clone());
        }
    }
    payload
}
