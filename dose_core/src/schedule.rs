//! Supply sufficiency checks and dose-log generation for new enrollments.
//!
//! An enrollment is only accepted when the owned boxes cover the planned
//! duration:
//!
//! `boxes_owned * pills_per_box >= duration_days * Σ dose_amount`
//!
//! Once accepted, one [`DoseLog`] is materialised per schedule entry per day.

use crate::{daily_consumption, DoseLog, Enrollment, Error, IntakeSchedule, Result};
use chrono::Duration;
use uuid::Uuid;

/// Outcome of a successful supply check
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SupplyPlan {
    pub total_pills: u64,
    pub daily_consumption: f64,
    pub max_days: u64,
}

/// Total pills available from a number of boxes
pub fn total_pills(boxes_owned: u32, pills_per_box: u32) -> u64 {
    u64::from(boxes_owned) * u64::from(pills_per_box)
}

/// Verify that `duration_days` can be covered by the owned supply
///
/// `max_days` is the integer part of `total_pills / daily_consumption`.
/// Fails with [`Error::InsufficientSupply`] when the request exceeds it.
pub fn check_supply(
    boxes_owned: u32,
    pills_per_box: u32,
    schedules: &[IntakeSchedule],
    duration_days: u32,
) -> Result<SupplyPlan> {
    let total_pills = total_pills(boxes_owned, pills_per_box);
    let daily_consumption = daily_consumption(schedules);

    if daily_consumption <= 0.0 {
        return Err(Error::Validation(
            "daily consumption must be greater than 0".into(),
        ));
    }

    let max_days = (total_pills as f64 / daily_consumption).floor() as u64;

    if u64::from(duration_days) > max_days {
        tracing::info!(
            "Rejecting enrollment: {} days requested, supply covers {} days",
            duration_days,
            max_days
        );
        return Err(Error::InsufficientSupply {
            total_pills,
            daily_consumption,
            max_days,
            requested_days: duration_days,
        });
    }

    Ok(SupplyPlan {
        total_pills,
        daily_consumption,
        max_days,
    })
}

/// Materialise the dose logs of an enrollment
///
/// Days run from `start_at` (inclusive) for `duration_days` days; within a
/// day the logs follow schedule-list order. Every log starts untaken and
/// carries the dose amount of its schedule entry.
pub fn generate_dose_logs(enrollment: &Enrollment) -> Vec<DoseLog> {
    let mut logs =
        Vec::with_capacity(enrollment.duration_days as usize * enrollment.schedules.len());

    for day in 0..i64::from(enrollment.duration_days) {
        let timestamp = enrollment.start_at + Duration::days(day);
        for schedule in &enrollment.schedules {
            logs.push(DoseLog {
                id: Uuid::new_v4(),
                enrollment_id: enrollment.id,
                time_slot: schedule.time_slot,
                planned_dose: schedule.dose_amount,
                taken: false,
                timestamp,
            });
        }
    }

    tracing::debug!(
        "Generated {} dose logs for enrollment {}",
        logs.len(),
        enrollment.id
    );
    logs
}
