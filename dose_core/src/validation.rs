//! Input validation for records entering the core.
//!
//! Every check here runs before anything is written to a store.

use crate::{
    EnrollmentPatch, Error, IntakeSchedule, MedicationPatch, NewEnrollment, NewMedication,
    Result,
};

/// Maximum allowed length for email addresses.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Minimum length of medication names and descriptions.
pub const MIN_TEXT_LENGTH: usize = 2;

/// Longest enrollment that can be created, in days (ten years).
///
/// Every day materialises one dose log per schedule entry.
pub const MAX_DURATION_DAYS: u32 = 3650;

/// Validate an email address (basic local@domain.tld shape).
pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(Error::Validation("email cannot be empty".into()));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(Error::Validation(format!(
            "email is too long ({} chars, max {})",
            email.len(),
            MAX_EMAIL_LENGTH
        )));
    }

    let (local, domain) = match email.split_once('@') {
        Some((local, domain)) if !domain.contains('@') => (local, domain),
        _ => {
            return Err(Error::Validation(
                "email must contain exactly one @ symbol".into(),
            ))
        }
    };

    if local.is_empty() {
        return Err(Error::Validation("email is missing the local part".into()));
    }

    if domain.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.')
    {
        return Err(Error::Validation(format!(
            "email domain '{}' is not valid",
            domain
        )));
    }

    if email.chars().any(char::is_whitespace) {
        return Err(Error::Validation("email cannot contain whitespace".into()));
    }

    Ok(())
}

/// Validate a non-empty schedule list with strictly positive doses
pub fn validate_schedules(schedules: &[IntakeSchedule]) -> Result<()> {
    if schedules.is_empty() {
        return Err(Error::Validation(
            "at least one intake schedule is required".into(),
        ));
    }

    for (i, schedule) in schedules.iter().enumerate() {
        if !schedule.dose_amount.is_finite() || schedule.dose_amount <= 0.0 {
            return Err(Error::Validation(format!(
                "schedule #{} ({}) has a non-positive dose amount: {}",
                i + 1,
                schedule.time_slot,
                schedule.dose_amount
            )));
        }
    }

    Ok(())
}

fn validate_boxes(boxes_owned: u32) -> Result<()> {
    if boxes_owned < 1 {
        return Err(Error::Validation("boxes_owned must be at least 1".into()));
    }
    Ok(())
}

/// Validate enrollment creation input
pub fn validate_new_enrollment(input: &NewEnrollment) -> Result<()> {
    validate_boxes(input.boxes_owned)?;
    if input.duration_days < 1 {
        return Err(Error::Validation("duration_days must be at least 1".into()));
    }
    if input.duration_days > MAX_DURATION_DAYS {
        return Err(Error::Validation(format!(
            "duration_days must be at most {}, got {}",
            MAX_DURATION_DAYS, input.duration_days
        )));
    }
    validate_schedules(&input.schedules)
}

/// Validate the shape of the supplied patch fields.
///
/// Supply sufficiency is not re-checked on update.
pub fn validate_enrollment_patch(patch: &EnrollmentPatch) -> Result<()> {
    if let Some(boxes_owned) = patch.boxes_owned {
        validate_boxes(boxes_owned)?;
    }
    if let Some(ref schedules) = patch.schedules {
        validate_schedules(schedules)?;
    }
    Ok(())
}

fn validate_text(field: &str, value: &str) -> Result<()> {
    if value.trim().chars().count() < MIN_TEXT_LENGTH {
        return Err(Error::Validation(format!(
            "{} must be at least {} characters",
            field, MIN_TEXT_LENGTH
        )));
    }
    Ok(())
}

fn validate_strength(strength_mg: f64) -> Result<()> {
    if !strength_mg.is_finite() || strength_mg <= 0.0 {
        return Err(Error::Validation(format!(
            "strength_mg must be greater than 0, got {}",
            strength_mg
        )));
    }
    Ok(())
}

/// Validate medication creation input
pub fn validate_new_medication(input: &NewMedication) -> Result<()> {
    validate_text("name", &input.name)?;
    if let Some(ref description) = input.description {
        validate_text("description", description)?;
    }
    validate_strength(input.strength_mg)?;
    if input.pills_per_box < 1 {
        return Err(Error::Validation("pills_per_box must be at least 1".into()));
    }
    Ok(())
}

/// Validate the fields present in a medication patch
pub fn validate_medication_patch(patch: &MedicationPatch) -> Result<()> {
    if let Some(ref name) = patch.name {
        validate_text("name", name)?;
    }
    if let Some(ref description) = patch.description {
        validate_text("description", description)?;
    }
    if let Some(ref manufacturer) = patch.manufacturer {
        validate_text("manufacturer", manufacturer)?;
    }
    if let Some(strength_mg) = patch.strength_mg {
        validate_strength(strength_mg)?;
    }
    Ok(())
}
