//! Form validation, run before any network or database work.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{MAX_PATIENT_AGE, MIN_PASSWORD_LEN};
use crate::models::{
    MedicationInput, ProfileUpdate, Registration, RoleDetails, VitalInput, VitalReading,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every failing field of one form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{} field(s) failed validation", .0.len())]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    fn require(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.push(field, "required");
        }
    }
}

fn looks_like_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

pub fn validate_credentials(email: &str, password: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if !looks_like_email(email) {
        errors.push("email", "invalid e-mail address");
    }
    if password.is_empty() {
        errors.push("password", "required");
    }
    errors.into_result()
}

pub fn validate_registration(reg: &Registration) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    errors.require("name", &reg.name);
    if !looks_like_email(&reg.email) {
        errors.push("email", "invalid e-mail address");
    }
    if reg.password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(
            "password",
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        );
    }

    match &reg.details {
        RoleDetails::Patient { age, .. } => {
            if let Some(age) = age {
                if *age == 0 || *age > MAX_PATIENT_AGE {
                    errors.push("age", format!("must be between 1 and {MAX_PATIENT_AGE}"));
                }
            }
        }
        RoleDetails::Clinic {
            clinic_name, crm, ..
        } => {
            errors.require("clinic_name", clinic_name);
            errors.require("crm", crm);
            if !crm.trim().is_empty() && !crm.chars().any(|c| c.is_ascii_digit()) {
                errors.push("crm", "must contain the registration number");
            }
        }
    }

    errors.into_result()
}

/// Only the fields present in the update are checked.
pub fn validate_profile_update(update: &ProfileUpdate) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    if let Some(name) = &update.name {
        errors.require("name", name);
    }
    if let Some(clinic_name) = &update.clinic_name {
        errors.require("clinic_name", clinic_name);
    }
    if let Some(age) = update.age {
        if age == 0 || age > MAX_PATIENT_AGE {
            errors.push("age", format!("must be between 1 and {MAX_PATIENT_AGE}"));
        }
    }

    errors.into_result()
}

pub fn validate_medication(input: &MedicationInput) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    errors.require("name", &input.name);
    errors.require("dosage", &input.dosage);
    errors.require("frequency", &input.frequency);
    if let Some(end) = input.end_date {
        if end < input.start_date {
            errors.push("end_date", "must not be before the start date");
        }
    }

    errors.into_result()
}

pub fn validate_vital(input: &VitalInput) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    match &input.reading {
        VitalReading::BloodPressure {
            systolic,
            diastolic,
        } => {
            if !(50..=300).contains(systolic) {
                errors.push("systolic", "must be between 50 and 300");
            }
            if !(30..=200).contains(diastolic) {
                errors.push("diastolic", "must be between 30 and 200");
            }
            if diastolic >= systolic {
                errors.push("diastolic", "must be lower than systolic");
            }
        }
        VitalReading::Weight { value, unit }
        | VitalReading::HeartRate { value, unit }
        | VitalReading::Glucose { value, unit } => {
            if !value.is_finite() || *value <= 0.0 {
                errors.push("value", "must be a positive number");
            }
            errors.require("unit", unit);
        }
    }

    errors.into_result()
}
