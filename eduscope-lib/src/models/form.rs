use super::{application::AttachmentSlot, Attachment};

/// Raw applicant intake input, as typed by the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicantFormValues {
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub dob: String,
    pub guardian_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

/// Raw application form input. File slots only hold files picked in this
/// session; previously uploaded files are tracked separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationFormValues {
    pub applicant: String,
    pub apply_grade: String,
    pub status: String,
    pub extra_curriculars_checked: Vec<String>,
    pub extra_curriculars_other: String,
    pub photo: Option<Attachment>,
    pub birth_certificate: Option<Attachment>,
    pub health_record: Option<Attachment>,
}

impl Default for ApplicationFormValues {
    fn default() -> Self {
        Self {
            applicant: String::new(),
            apply_grade: String::new(),
            status: "pending".to_string(),
            extra_curriculars_checked: Vec::new(),
            extra_curriculars_other: String::new(),
            photo: None,
            birth_certificate: None,
            health_record: None,
        }
    }
}

impl ApplicationFormValues {
    pub fn for_applicant(applicant: impl Into<String>) -> Self {
        Self {
            applicant: applicant.into(),
            ..Self::default()
        }
    }

    pub fn file(&self, slot: AttachmentSlot) -> Option<&Attachment> {
        match slot {
            AttachmentSlot::Photo => self.photo.as_ref(),
            AttachmentSlot::BirthCertificate => self.birth_certificate.as_ref(),
            AttachmentSlot::HealthRecord => self.health_record.as_ref(),
        }
    }

    pub fn file_mut(&mut self, slot: AttachmentSlot) -> &mut Option<Attachment> {
        match slot {
            AttachmentSlot::Photo => &mut self.photo,
            AttachmentSlot::BirthCertificate => &mut self.birth_certificate,
            AttachmentSlot::HealthRecord => &mut self.health_record,
        }
    }

    pub fn clear_files(&mut self) {
        for slot in AttachmentSlot::ALL {
            *self.file_mut(slot) = None;
        }
    }
}
