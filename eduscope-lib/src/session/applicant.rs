use chrono::{Local, NaiveDate};
use log::info;

use super::{acknowledged, invalid_transition, SessionState, SubmitOutcome};
use crate::{
    error::{AdmissionsError, ValidationError},
    models::{Applicant, ApplicantFormValues},
    store::AdmissionsApi,
    validators::{
        validate_address, validate_applicant_form, validate_dob, validate_email,
        validate_first_name, validate_gender, validate_guardian_name, validate_last_name,
        validate_phone, FormField,
    },
};

/// The applicant intake form. Nothing to prefetch, so it starts `Ready`.
pub struct ApplicantFormSession<A> {
    api: A,
    state: SessionState,
    values: ApplicantFormValues,
    errors: ValidationError,
}

impl<A: AdmissionsApi> ApplicantFormSession<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: SessionState::Ready,
            values: ApplicantFormValues::default(),
            errors: ValidationError::new(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn values(&self) -> &ApplicantFormValues {
        &self.values
    }

    pub fn errors(&self) -> &ValidationError {
        &self.errors
    }

    /// Sets one field and re-checks it. Date of birth is checked against
    /// the local date.
    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        self.set_as_of(field, value, Local::now().date_naive());
    }

    pub fn set_as_of(&mut self, field: FormField, value: impl Into<String>, today: NaiveDate) {
        let value = value.into();
        let check = match field {
            FormField::FirstName => validate_first_name(&value),
            FormField::LastName => validate_last_name(&value),
            FormField::Gender => validate_gender(&value),
            FormField::Dob => validate_dob(&value, today),
            FormField::GuardianName => validate_guardian_name(&value),
            FormField::Email => validate_email(&value),
            FormField::Phone => validate_phone(&value),
            FormField::Address => validate_address(&value),
            _ => return,
        };
        let slot = match field {
            FormField::FirstName => &mut self.values.first_name,
            FormField::LastName => &mut self.values.last_name,
            FormField::Gender => &mut self.values.gender,
            FormField::Dob => &mut self.values.dob,
            FormField::GuardianName => &mut self.values.guardian_name,
            FormField::Email => &mut self.values.email,
            FormField::Phone => &mut self.values.phone,
            _ => &mut self.values.address,
        };
        *slot = value;
        self.errors.update(field, check);
    }

    pub async fn submit(&mut self) -> Result<SubmitOutcome, AdmissionsError> {
        self.submit_as_of(Local::now().date_naive()).await
    }

    pub async fn submit_as_of(&mut self, today: NaiveDate) -> Result<SubmitOutcome, AdmissionsError> {
        if !self.state.is_ready() {
            return Err(invalid_transition(&self.state, "submit"));
        }
        let body = match validate_applicant_form(&self.values, today) {
            Ok(body) => body,
            Err(errors) => {
                self.errors = errors.clone();
                return Err(errors.into());
            }
        };
        self.errors = ValidationError::new();

        self.state = SessionState::Submitting;
        match self.api.create_applicant(&body).await {
            Ok(Applicant { id, .. }) => {
                info!("Created applicant {}", id);
                self.values = ApplicantFormValues::default();
                let outcome = SubmitOutcome::Created(id);
                self.state = SessionState::Success(outcome);
                Ok(outcome)
            }
            Err(e) => {
                self.state = SessionState::Failed(e.clone());
                Err(e.into())
            }
        }
    }

    pub fn acknowledge(&mut self) -> Result<(), AdmissionsError> {
        self.state = acknowledged(&self.state)?;
        Ok(())
    }

    pub fn reset(&mut self) {
        self.values = ApplicantFormValues::default();
        self.errors = ValidationError::new();
        if matches!(self.state, SessionState::Success(_) | SessionState::Failed(_)) {
            self.state = SessionState::Ready;
        }
    }
}
