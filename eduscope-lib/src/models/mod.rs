pub mod applicant;
pub mod application;
pub mod attachment;
pub mod form;

pub use applicant::{Applicant, ApplicantKey, Gender, NewApplicant};
pub use application::{
    Application, ApplicationStatus, AttachmentSlot, Grade, ACTIVITY_OPTIONS,
    APPLICANT_KEY_ALIASES,
};
pub use attachment::Attachment;
pub use form::{ApplicantFormValues, ApplicationFormValues};
