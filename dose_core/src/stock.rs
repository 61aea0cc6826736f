//! Stock and consumption estimation for an enrollment.
//!
//! The report is re-derived from the dose logs on every call: pills used are
//! the sum of `planned_dose` over taken logs, never an accumulated counter.

use crate::schedule::total_pills;
use crate::{DoseLog, Enrollment, Medication, StatsReport, WarningLevel};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Absolute remaining-pill thresholds for the warning tiers (inclusive)
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct StockThresholds {
    #[serde(default = "default_critical_threshold")]
    pub critical_threshold: f64,

    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: f64,
}

impl Default for StockThresholds {
    fn default() -> Self {
        Self {
            critical_threshold: default_critical_threshold(),
            warning_threshold: default_warning_threshold(),
        }
    }
}

fn default_critical_threshold() -> f64 {
    10.0
}

fn default_warning_threshold() -> f64 {
    20.0
}

/// Classify a remaining pill count
pub fn warning_level(remaining_pills: f64, thresholds: &StockThresholds) -> WarningLevel {
    if remaining_pills <= thresholds.critical_threshold {
        WarningLevel::Critical
    } else if remaining_pills <= thresholds.warning_threshold {
        WarningLevel::Warning
    } else {
        WarningLevel::Normal
    }
}

/// Pills consumed so far: planned doses of taken logs only
pub fn used_pills(logs: &[DoseLog]) -> f64 {
    logs.iter()
        .filter(|log| log.taken)
        .map(|log| log.planned_dose)
        .sum()
}

/// Compute the stock report of an enrollment at `now`
///
/// Remaining pills are reported as-is and may be negative when more doses
/// were marked taken than the boxes contained. With a zero daily consumption
/// the depletion estimate is left unset. The end date is also unset when it
/// falls outside the representable date range (tiny daily doses).
pub fn compute_stats(
    enrollment: &Enrollment,
    medication: &Medication,
    logs: &[DoseLog],
    thresholds: &StockThresholds,
    now: DateTime<Utc>,
) -> StatsReport {
    let total_pills = total_pills(enrollment.boxes_owned, medication.pills_per_box);
    let daily_consumption = enrollment.daily_consumption();
    let used_pills = used_pills(logs);
    let remaining_pills = total_pills as f64 - used_pills;

    let (estimated_days_remaining, estimated_end_date) = if daily_consumption > 0.0 {
        let days = (remaining_pills / daily_consumption).floor() as i64;
        let end = Duration::try_days(days).and_then(|d| now.checked_add_signed(d));
        (days, end)
    } else {
        (0, None)
    };

    let days_elapsed = (now - enrollment.start_at).num_hours() / 24;
    let planned_days_remaining = (i64::from(enrollment.duration_days) - days_elapsed).max(0);

    StatsReport {
        total_pills,
        used_pills,
        remaining_pills,
        daily_consumption,
        estimated_days_remaining,
        estimated_end_date,
        planned_duration_days: enrollment.duration_days,
        days_elapsed,
        planned_days_remaining,
        warning_level: warning_level(remaining_pills, thresholds),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::generate_dose_logs;
    use crate::{IntakeSchedule, MealRelation, MedicationForm, TimeSlot};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    fn medication(pills_per_box: u32) -> Medication {
        Medication {
            id: Uuid::new_v4(),
            name: "Lisinopril".into(),
            description: None,
            manufacturer: None,
            form: MedicationForm::Tablet,
            strength_mg: 10.0,
            pills_per_box,
            meal_relation: MealRelation::Irrelevant,
            created_at: start(),
        }
    }

    fn enrollment(med: &Medication, schedules: Vec<IntakeSchedule>) -> Enrollment {
        Enrollment {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            medication_id: med.id,
            boxes_owned: 2,
            schedules,
            duration_days: 30,
            start_at: start(),
            active: true,
            created_at: start(),
        }
    }

    fn twice_daily() -> Vec<IntakeSchedule> {
        vec![
            IntakeSchedule::new(TimeSlot::Morning, 1.0),
            IntakeSchedule::new(TimeSlot::Evening, 1.0),
        ]
    }

    fn take_first(logs: &mut [DoseLog], n: usize) {
        for log in logs.iter_mut().take(n) {
            log.taken = true;
        }
    }

    #[test]
    fn test_fresh_enrollment_report() {
        let med = medication(30);
        let e = enrollment(&med, twice_daily());
        let logs = generate_dose_logs(&e);

        let report = compute_stats(&e, &med, &logs, &StockThresholds::default(), start());

        assert_eq!(report.total_pills, 60);
        assert_eq!(report.used_pills, 0.0);
        assert_eq!(report.remaining_pills, 60.0);
        assert_eq!(report.daily_consumption, 2.0);
        assert_eq!(report.estimated_days_remaining, 30);
        assert_eq!(report.estimated_end_date, Some(start() + Duration::days(30)));
        assert_eq!(report.planned_duration_days, 30);
        assert_eq!(report.days_elapsed, 0);
        assert_eq!(report.planned_days_remaining, 30);
        assert_eq!(report.warning_level, WarningLevel::Normal);
    }

    #[test]
    fn test_forty_five_taken_is_warning() {
        let med = medication(30);
        let e = enrollment(&med, twice_daily());
        let mut logs = generate_dose_logs(&e);
        take_first(&mut logs, 45);

        let report = compute_stats(&e, &med, &logs, &StockThresholds::default(), start());

        assert_eq!(report.used_pills, 45.0);
        assert_eq!(report.remaining_pills, 15.0);
        assert_eq!(report.estimated_days_remaining, 7);
        assert_eq!(report.warning_level, WarningLevel::Warning);
    }

    #[test]
    fn test_fifty_two_taken_is_critical() {
        let med = medication(30);
        let e = enrollment(&med, twice_daily());
        let mut logs = generate_dose_logs(&e);
        take_first(&mut logs, 52);

        let report = compute_stats(&e, &med, &logs, &StockThresholds::default(), start());

        assert_eq!(report.remaining_pills, 8.0);
        assert_eq!(report.warning_level, WarningLevel::Critical);
    }

    #[test]
    fn test_untaken_logs_never_count() {
        let med = medication(30);
        let e = enrollment(&med, twice_daily());
        let logs = generate_dose_logs(&e);

        // Long after every scheduled dose is in the past.
        let later = start() + Duration::days(90);
        let report = compute_stats(&e, &med, &logs, &StockThresholds::default(), later);

        assert_eq!(report.used_pills, 0.0);
        assert_eq!(report.remaining_pills, 60.0);
    }

    #[test]
    fn test_warning_boundaries_are_inclusive() {
        let t = StockThresholds::default();
        assert_eq!(warning_level(-3.0, &t), WarningLevel::Critical);
        assert_eq!(warning_level(0.0, &t), WarningLevel::Critical);
        assert_eq!(warning_level(10.0, &t), WarningLevel::Critical);
        assert_eq!(warning_level(10.5, &t), WarningLevel::Warning);
        assert_eq!(warning_level(11.0, &t), WarningLevel::Warning);
        assert_eq!(warning_level(20.0, &t), WarningLevel::Warning);
        assert_eq!(warning_level(21.0, &t), WarningLevel::Normal);
    }

    #[test]
    fn test_custom_thresholds() {
        let t = StockThresholds {
            critical_threshold: 5.0,
            warning_threshold: 50.0,
        };
        assert_eq!(warning_level(8.0, &t), WarningLevel::Warning);
        assert_eq!(warning_level(5.0, &t), WarningLevel::Critical);
    }

    #[test]
    fn test_remaining_is_not_clamped() {
        let med = medication(1);
        let mut e = enrollment(&med, twice_daily());
        e.boxes_owned = 1;
        let mut logs = generate_dose_logs(&e);
        take_first(&mut logs, 4);

        let report = compute_stats(&e, &med, &logs, &StockThresholds::default(), start());

        assert_eq!(report.total_pills, 1);
        assert_eq!(report.remaining_pills, -3.0);
        assert_eq!(report.estimated_days_remaining, -2);
        assert_eq!(report.warning_level, WarningLevel::Critical);
    }

    #[test]
    fn test_zero_daily_consumption_leaves_estimate_unset() {
        let med = medication(30);
        let e = enrollment(&med, vec![]);

        let report = compute_stats(&e, &med, &[], &StockThresholds::default(), start());

        assert_eq!(report.daily_consumption, 0.0);
        assert_eq!(report.estimated_days_remaining, 0);
        assert_eq!(report.estimated_end_date, None);
        assert_eq!(report.remaining_pills, 60.0);
    }

    #[test]
    fn test_elapsed_days_floor_and_planned_remaining_clamp() {
        let med = medication(30);
        let e = enrollment(&med, twice_daily());

        let now = start() + Duration::days(3) + Duration::hours(23);
        let report = compute_stats(&e, &med, &[], &StockThresholds::default(), now);
        assert_eq!(report.days_elapsed, 3);
        assert_eq!(report.planned_days_remaining, 27);

        let now = start() + Duration::days(45);
        let report = compute_stats(&e, &med, &[], &StockThresholds::default(), now);
        assert_eq!(report.days_elapsed, 45);
        assert_eq!(report.planned_days_remaining, 0);
    }

    #[test]
    fn test_fractional_doses() {
        let med = medication(30);
        let mut e = enrollment(&med, vec![IntakeSchedule::new(TimeSlot::Night, 0.5)]);
        e.boxes_owned = 1;
        let mut logs = generate_dose_logs(&e);
        take_first(&mut logs, 9);

        let report = compute_stats(&e, &med, &logs, &StockThresholds::default(), start());

        assert_eq!(report.used_pills, 4.5);
        assert_eq!(report.remaining_pills, 25.5);
        assert_eq!(report.estimated_days_remaining, 51);
        assert_eq!(report.warning_level, WarningLevel::Normal);
    }

    #[test]
    fn test_tiny_daily_dose_leaves_end_date_unset() {
        let med = medication(1000);
        let mut e = enrollment(&med, vec![IntakeSchedule::new(TimeSlot::Morning, 1e-6)]);
        e.boxes_owned = 1;
        e.duration_days = 1;
        let logs = generate_dose_logs(&e);

        let report = compute_stats(&e, &med, &logs, &StockThresholds::default(), start());

        assert_eq!(report.total_pills, 1000);
        assert!(report.estimated_days_remaining > 900_000_000);
        assert_eq!(report.estimated_end_date, None);
        assert_eq!(report.warning_level, WarningLevel::Normal);
    }

    #[test]
    fn test_day_count_beyond_duration_range() {
        let med = medication(1000);
        let mut e = enrollment(&med, vec![IntakeSchedule::new(TimeSlot::Night, 1e-300)]);
        e.boxes_owned = 1;

        let report = compute_stats(&e, &med, &[], &StockThresholds::default(), start());

        // The float quotient saturates at i64::MAX days.
        assert_eq!(report.estimated_days_remaining, i64::MAX);
        assert_eq!(report.estimated_end_date, None);
    }
}
