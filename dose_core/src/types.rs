//! Core domain types for the dose log system.
//!
//! This module defines the fundamental records handled by the core:
//! - Users and medications
//! - Intake schedules and time slots
//! - Enrollments (a user tracking one medication) and their dose logs
//! - Input records and partial-update patches
//! - The stock/consumption report

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Enumerations
// ============================================================================

/// Fixed daily period a dose is scheduled for
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TimeSlot {
    Morning,
    Noon,
    Evening,
    Night,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 4] = [
        TimeSlot::Morning,
        TimeSlot::Noon,
        TimeSlot::Evening,
        TimeSlot::Night,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSlot::Morning => "morning",
            TimeSlot::Noon => "noon",
            TimeSlot::Evening => "evening",
            TimeSlot::Night => "night",
        }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeSlot {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "morning" => Ok(TimeSlot::Morning),
            "noon" => Ok(TimeSlot::Noon),
            "evening" => Ok(TimeSlot::Evening),
            "night" => Ok(TimeSlot::Night),
            other => Err(Error::Validation(format!(
                "unknown time slot '{}' (expected morning, noon, evening or night)",
                other
            ))),
        }
    }
}

/// How a medication should be taken relative to meals
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MealRelation {
    BeforeMeal,
    AfterMeal,
    WithMeal,
    Irrelevant,
}

impl MealRelation {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealRelation::BeforeMeal => "before_meal",
            MealRelation::AfterMeal => "after_meal",
            MealRelation::WithMeal => "with_meal",
            MealRelation::Irrelevant => "irrelevant",
        }
    }
}

impl fmt::Display for MealRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealRelation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "before_meal" | "before" => Ok(MealRelation::BeforeMeal),
            "after_meal" | "after" => Ok(MealRelation::AfterMeal),
            "with_meal" | "with" => Ok(MealRelation::WithMeal),
            "irrelevant" => Ok(MealRelation::Irrelevant),
            other => Err(Error::Validation(format!(
                "unknown meal relation '{}'",
                other
            ))),
        }
    }
}

/// Galenic form of a medication
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MedicationForm {
    Tablet,
    Capsule,
    Syrup,
    Drop,
    Injection,
}

impl MedicationForm {
    pub fn as_str(&self) -> &'static str {
        match self {
            MedicationForm::Tablet => "tablet",
            MedicationForm::Capsule => "capsule",
            MedicationForm::Syrup => "syrup",
            MedicationForm::Drop => "drop",
            MedicationForm::Injection => "injection",
        }
    }
}

impl fmt::Display for MedicationForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MedicationForm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "tablet" => Ok(MedicationForm::Tablet),
            "capsule" => Ok(MedicationForm::Capsule),
            "syrup" => Ok(MedicationForm::Syrup),
            "drop" => Ok(MedicationForm::Drop),
            "injection" => Ok(MedicationForm::Injection),
            other => Err(Error::Validation(format!(
                "unknown medication form '{}'",
                other
            ))),
        }
    }
}

/// Tiered supply-exhaustion indicator
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    Normal,
    Warning,
    Critical,
}

impl fmt::Display for WarningLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WarningLevel::Normal => "normal",
            WarningLevel::Warning => "warning",
            WarningLevel::Critical => "critical",
        })
    }
}

// ============================================================================
// Stored records
// ============================================================================

/// A registered user
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// A medication product
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Medication {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub manufacturer: Option<String>,
    pub form: MedicationForm,
    pub strength_mg: f64,
    pub pills_per_box: u32,
    pub meal_relation: MealRelation,
    pub created_at: DateTime<Utc>,
}

/// One (time slot, dose amount) entry of an intake schedule
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct IntakeSchedule {
    pub time_slot: TimeSlot,
    pub dose_amount: f64,
}

impl IntakeSchedule {
    pub fn new(time_slot: TimeSlot, dose_amount: f64) -> Self {
        Self {
            time_slot,
            dose_amount,
        }
    }
}

impl FromStr for IntakeSchedule {
    type Err = Error;

    /// Parses `slot:amount`, e.g. `morning:1` or `night:0.5`
    fn from_str(s: &str) -> Result<Self> {
        let (slot, amount) = s.split_once(':').ok_or_else(|| {
            Error::Validation(format!("schedule '{}' must look like slot:amount", s))
        })?;
        let dose_amount = amount.trim().parse::<f64>().map_err(|e| {
            Error::Validation(format!("invalid dose amount '{}': {}", amount, e))
        })?;
        Ok(IntakeSchedule {
            time_slot: slot.parse()?,
            dose_amount,
        })
    }
}

/// Sum of dose amounts over one day of a schedule list
pub fn daily_consumption(schedules: &[IntakeSchedule]) -> f64 {
    schedules.iter().map(|s| s.dose_amount).sum()
}

/// A user's tracking of one medication (a "user medication")
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Enrollment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub medication_id: Uuid,
    pub boxes_owned: u32,
    pub schedules: Vec<IntakeSchedule>,
    pub duration_days: u32,
    pub start_at: DateTime<Utc>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn daily_consumption(&self) -> f64 {
        daily_consumption(&self.schedules)
    }
}

/// One planned-or-taken dose tied to a day and slot
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DoseLog {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub time_slot: TimeSlot,
    pub planned_dose: f64,
    pub taken: bool,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Inputs and patches
// ============================================================================

/// Input for creating a medication
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewMedication {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    pub form: MedicationForm,
    pub strength_mg: f64,
    pub pills_per_box: u32,
    pub meal_relation: MealRelation,
}

/// Partial update of a medication; `None` leaves a field unchanged
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MedicationPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub manufacturer: Option<String>,
    pub form: Option<MedicationForm>,
    pub strength_mg: Option<f64>,
    pub meal_relation: Option<MealRelation>,
}

impl MedicationPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.manufacturer.is_none()
            && self.form.is_none()
            && self.strength_mg.is_none()
            && self.meal_relation.is_none()
    }

    pub fn apply(&self, med: &mut Medication) {
        if let Some(ref name) = self.name {
            med.name = name.clone();
        }
        if let Some(ref description) = self.description {
            med.description = Some(description.clone());
        }
        if let Some(ref manufacturer) = self.manufacturer {
            med.manufacturer = Some(manufacturer.clone());
        }
        if let Some(form) = self.form {
            med.form = form;
        }
        if let Some(strength_mg) = self.strength_mg {
            med.strength_mg = strength_mg;
        }
        if let Some(meal_relation) = self.meal_relation {
            med.meal_relation = meal_relation;
        }
    }
}

/// Input for creating an enrollment
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewEnrollment {
    pub medication_id: Uuid,
    pub boxes_owned: u32,
    pub schedules: Vec<IntakeSchedule>,
    pub duration_days: u32,
}

/// Partial update of an enrollment
///
/// `schedules` replaces the whole list when present.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EnrollmentPatch {
    pub boxes_owned: Option<u32>,
    pub schedules: Option<Vec<IntakeSchedule>>,
    pub active: Option<bool>,
}

impl EnrollmentPatch {
    pub fn is_empty(&self) -> bool {
        self.boxes_owned.is_none() && self.schedules.is_none() && self.active.is_none()
    }

    pub fn apply(&self, enrollment: &mut Enrollment) {
        if let Some(boxes_owned) = self.boxes_owned {
            enrollment.boxes_owned = boxes_owned;
        }
        if let Some(ref schedules) = self.schedules {
            enrollment.schedules = schedules.clone();
        }
        if let Some(active) = self.active {
            enrollment.active = active;
        }
    }
}

// ============================================================================
// Reports
// ============================================================================

/// Stock and consumption figures for one enrollment
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StatsReport {
    pub total_pills: u64,
    pub used_pills: f64,
    pub remaining_pills: f64,
    pub daily_consumption: f64,
    pub estimated_days_remaining: i64,
    pub estimated_end_date: Option<DateTime<Utc>>,
    pub planned_duration_days: u32,
    pub days_elapsed: i64,
    pub planned_days_remaining: i64,
    pub warning_level: WarningLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_slots() {
        assert_eq!("morning".parse::<TimeSlot>().unwrap(), TimeSlot::Morning);
        assert_eq!("NOON".parse::<TimeSlot>().unwrap(), TimeSlot::Noon);
        assert_eq!(" evening ".parse::<TimeSlot>().unwrap(), TimeSlot::Evening);
        assert_eq!("night".parse::<TimeSlot>().unwrap(), TimeSlot::Night);
        assert!(matches!(
            "midnight".parse::<TimeSlot>(),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_time_slot_serde_names() {
        let json = serde_json::to_string(&TimeSlot::Evening).unwrap();
        assert_eq!(json, "\"evening\"");
        for slot in TimeSlot::ALL {
            assert_eq!(slot.to_string(), slot.as_str());
        }
    }

    #[test]
    fn test_parse_intake_schedule() {
        let s: IntakeSchedule = "night:0.5".parse().unwrap();
        assert_eq!(s.time_slot, TimeSlot::Night);
        assert_eq!(s.dose_amount, 0.5);

        assert!("night".parse::<IntakeSchedule>().is_err());
        assert!("night:lots".parse::<IntakeSchedule>().is_err());
        assert!("dawn:1".parse::<IntakeSchedule>().is_err());
    }

    #[test]
    fn test_schedule_json_field_names() {
        let s = IntakeSchedule::new(TimeSlot::Morning, 1.0);
        let value = serde_json::to_value(s).unwrap();
        assert_eq!(value["time_slot"], "morning");
        assert_eq!(value["dose_amount"], 1.0);
    }

    #[test]
    fn test_meal_relation_and_form_parsing() {
        assert_eq!(
            "before_meal".parse::<MealRelation>().unwrap(),
            MealRelation::BeforeMeal
        );
        assert_eq!(
            serde_json::to_string(&MealRelation::Irrelevant).unwrap(),
            "\"irrelevant\""
        );
        assert_eq!(
            "Capsule".parse::<MedicationForm>().unwrap(),
            MedicationForm::Capsule
        );
        assert!("powder".parse::<MedicationForm>().is_err());
    }

    #[test]
    fn test_enrollment_patch_absent_fields_unchanged() {
        let now = Utc::now();
        let mut enrollment = Enrollment {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            medication_id: Uuid::new_v4(),
            boxes_owned: 2,
            schedules: vec![IntakeSchedule::new(TimeSlot::Morning, 1.0)],
            duration_days: 30,
            start_at: now,
            active: true,
            created_at: now,
        };

        EnrollmentPatch {
            active: Some(false),
            ..Default::default()
        }
        .apply(&mut enrollment);

        assert!(!enrollment.active);
        assert_eq!(enrollment.boxes_owned, 2);
        assert_eq!(enrollment.schedules.len(), 1);

        EnrollmentPatch {
            schedules: Some(vec![
                IntakeSchedule::new(TimeSlot::Noon, 2.0),
                IntakeSchedule::new(TimeSlot::Night, 1.0),
            ]),
            ..Default::default()
        }
        .apply(&mut enrollment);

        assert_eq!(enrollment.schedules.len(), 2);
        assert_eq!(enrollment.schedules[0].time_slot, TimeSlot::Noon);
        assert_eq!(enrollment.daily_consumption(), 3.0);
    }

    #[test]
    fn test_enrollment_patch_is_empty() {
        assert!(EnrollmentPatch::default().is_empty());
        assert!(!EnrollmentPatch {
            active: Some(true),
            ..Default::default()
        }
        .is_empty());
        assert!(!EnrollmentPatch {
            schedules: Some(Vec::new()),
            ..Default::default()
        }
        .is_empty());
    }

    #[test]
    fn test_warning_level_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&WarningLevel::Critical).unwrap(),
            "\"critical\""
        );
        assert_eq!(WarningLevel::Warning.to_string(), "warning");
    }
}
