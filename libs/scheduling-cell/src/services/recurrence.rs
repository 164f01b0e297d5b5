// libs/scheduling-cell/src/services/recurrence.rs
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc};
use tracing::debug;

use crate::models::{
    CandidateSlot, GenerationLimits, RecurrenceEnd, RecurrencePattern, RecurringAppointment,
};

/// Expands a recurrence rule into a bounded, ordered list of candidate slots.
///
/// Expansion is pure date arithmetic; conflict checks and persistence happen
/// later, per candidate. Every walk is capped by `GenerationLimits` so no end
/// condition can produce an unbounded schedule.
pub struct RecurrenceExpansionService {
    limits: GenerationLimits,
}

impl RecurrenceExpansionService {
    pub fn new() -> Self {
        Self {
            limits: GenerationLimits::default(),
        }
    }

    pub fn with_limits(limits: GenerationLimits) -> Self {
        Self { limits }
    }

    /// Walk the rule's cadence from `first_start` and collect occurrences.
    ///
    /// End conditions: an end date bounds the cursor (inclusive), an
    /// occurrence count bounds the number of accepted slots, and a
    /// never-ending rule is bounded by the lookahead horizon. The
    /// `max_instances` cap applies on top of all three.
    pub fn expand(&self, rule: &RecurringAppointment) -> Vec<CandidateSlot> {
        let duration = rule.occurrence_duration();

        let max_occurrences = match rule.end {
            RecurrenceEnd::AfterOccurrences { count } => {
                (count as usize).min(self.limits.max_instances)
            }
            _ => self.limits.max_instances,
        };

        let boundary = match rule.end {
            RecurrenceEnd::OnDate { date } => Some(date),
            RecurrenceEnd::AfterOccurrences { .. } => None,
            RecurrenceEnd::Never => {
                Some(rule.first_start + Months::new(12 * self.limits.default_lookahead_years))
            }
        };

        let weekday_filter = match rule.pattern {
            RecurrencePattern::Weekly => {
                rule.days_of_week.as_deref().filter(|days| !days.is_empty())
            }
            _ => None,
        };

        let mut slots = Vec::new();
        let mut cursor = rule.first_start;

        while slots.len() < max_occurrences && boundary.map_or(true, |b| cursor <= b) {
            if let Some(days) = weekday_filter {
                // Day-granularity stepping: the weekday filter finds the next
                // matching day across week boundaries on its own, so the
                // interval multiplier does not apply on this path.
                if days.contains(&weekday_number(cursor)) {
                    slots.push(CandidateSlot {
                        start_time: cursor,
                        end_time: cursor + duration,
                    });
                }
                cursor += Duration::days(1);
                continue;
            }

            slots.push(CandidateSlot {
                start_time: cursor,
                end_time: cursor + duration,
            });

            cursor = match rule.pattern {
                RecurrencePattern::Daily => cursor + Duration::days(rule.interval as i64),
                RecurrencePattern::Weekly => cursor + Duration::weeks(rule.interval as i64),
                RecurrencePattern::Biweekly => {
                    cursor + Duration::weeks(2 * rule.interval as i64)
                }
                RecurrencePattern::Monthly => {
                    step_monthly(cursor, rule.interval, rule.day_of_month)
                }
                // Unrecognized cadences fall back to daily stepping.
                RecurrencePattern::Custom => cursor + Duration::days(rule.interval as i64),
            };
        }

        debug!(
            "Expanded recurring appointment {} into {} candidate slots",
            rule.id,
            slots.len()
        );

        slots
    }
}

impl Default for RecurrenceExpansionService {
    fn default() -> Self {
        Self::new()
    }
}

/// Advance by whole months, then pin the day of month if the rule asks for
/// one. A pinned day past the end of the target month clamps to its last day.
fn step_monthly(cursor: DateTime<Utc>, interval: u32, pinned_day: Option<u32>) -> DateTime<Utc> {
    let stepped = cursor + Months::new(interval);

    match pinned_day {
        Some(day) => {
            let clamped = day.min(last_day_of_month(stepped.year(), stepped.month()));
            stepped.with_day(clamped).unwrap_or(stepped)
        }
        None => stepped,
    }
}

fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// Weekday as 0-6 with 0 = Sunday, the numbering stored on weekly rules.
fn weekday_number(timestamp: DateTime<Utc>) -> u8 {
    timestamp.weekday().num_days_from_sunday() as u8
}
