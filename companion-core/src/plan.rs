//! Study plan derivation.
//!
//! The remote controller turns a requested duration into break and hydration
//! parameters using this table. The operator console applies the same plan
//! locally so the device can be exercised without a controller.

use heapless::Vec;

use crate::config::ConfigUpdate;

/// Hydration milestone spacing.
pub const WATER_EVERY_MINUTES: u32 = 30;
/// Suggested intake per milestone.
pub const WATER_PER_MILESTONE_ML: u32 = 250;
/// Upper bound on tracked milestones; longer plans keep the first ones.
pub const MAX_WATER_MILESTONES: usize = 32;

/// Derived schedule for a study session.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StudyPlan {
    pub duration_minutes: u32,
    pub break_interval_minutes: u32,
    pub break_count: u32,
    pub break_length_minutes: u32,
    /// Milestone offsets in seconds from session start.
    pub water_milestones: Vec<u32, MAX_WATER_MILESTONES>,
    pub water_per_milestone_ml: u32,
    pub water_total_ml: u32,
}

impl StudyPlan {
    /// Builds the plan for `requested` minutes (clamped to at least one).
    #[must_use]
    pub fn for_duration(requested: i32) -> Self {
        let duration = u32::try_from(requested).unwrap_or(0).max(1);

        let (interval, count, length) = match duration {
            d if d <= 30 => (d, 0, 0),
            d if d <= 60 => (30, d / 30, 5),
            d if d <= 120 => (40, d / 40, 7),
            d if d <= 180 => (45, d / 45, 10),
            d => (60, d / 60, 15),
        };

        let milestone_count = (duration / WATER_EVERY_MINUTES).max(1);
        let mut water_milestones = Vec::new();
        for index in 1..=milestone_count {
            if water_milestones
                .push(index * WATER_EVERY_MINUTES * 60)
                .is_err()
            {
                break;
            }
        }

        Self {
            duration_minutes: duration,
            break_interval_minutes: interval,
            break_count: count,
            break_length_minutes: length,
            water_milestones,
            water_per_milestone_ml: WATER_PER_MILESTONE_ML,
            water_total_ml: milestone_count.saturating_mul(WATER_PER_MILESTONE_ML),
        }
    }

    /// Returns the configuration updates a controller publishes for this plan.
    #[must_use]
    pub fn config_updates(&self) -> [ConfigUpdate; 4] {
        [
            ConfigUpdate::Duration(to_i32(self.duration_minutes)),
            ConfigUpdate::BreakInterval(to_i32(self.break_interval_minutes)),
            ConfigUpdate::BreakLength(to_i32(self.break_length_minutes)),
            ConfigUpdate::WaterReminder(true),
        ]
    }
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_sessions_have_no_breaks() {
        let plan = StudyPlan::for_duration(25);
        assert_eq!(plan.break_interval_minutes, 25);
        assert_eq!(plan.break_count, 0);
        assert_eq!(plan.break_length_minutes, 0);
        assert_eq!(plan.water_milestones.as_slice(), &[1_800]);
        assert_eq!(plan.water_total_ml, 250);
    }

    #[test]
    fn plan_table_bands() {
        let hour = StudyPlan::for_duration(60);
        assert_eq!(
            (hour.break_interval_minutes, hour.break_count, hour.break_length_minutes),
            (30, 2, 5)
        );

        let two_hours = StudyPlan::for_duration(120);
        assert_eq!(
            (two_hours.break_interval_minutes, two_hours.break_count, two_hours.break_length_minutes),
            (40, 3, 7)
        );

        let three_hours = StudyPlan::for_duration(180);
        assert_eq!(
            (three_hours.break_interval_minutes, three_hours.break_count),
            (45, 4)
        );

        let long = StudyPlan::for_duration(240);
        assert_eq!(
            (long.break_interval_minutes, long.break_count, long.break_length_minutes),
            (60, 4, 15)
        );
        assert_eq!(long.water_milestones.len(), 8);
    }

    #[test]
    fn non_positive_request_clamps_to_one_minute() {
        assert_eq!(StudyPlan::for_duration(-3).duration_minutes, 1);
        assert_eq!(StudyPlan::for_duration(0).duration_minutes, 1);
    }

    #[test]
    fn huge_request_saturates_instead_of_overflowing() {
        let plan = StudyPlan::for_duration(i32::MAX);
        assert_eq!(plan.water_milestones.len(), MAX_WATER_MILESTONES);
        assert_eq!(plan.water_total_ml, u32::MAX);
        assert_eq!(
            plan.config_updates()[0],
            ConfigUpdate::Duration(i32::MAX)
        );
    }
}
