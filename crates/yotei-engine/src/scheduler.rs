//! Single-pass task placement over a busy-interval snapshot.
//!
//! Given one [`TaskAnalysis`] and the existing events, picks a concrete
//! start/end interval with deterministic tie-breaking:
//!
//! 1. an unconflicted preferred start time is honored verbatim, even
//!    outside working hours;
//! 2. a conflicted preferred time falls back to the nearest later slot on
//!    the same civil day (searching from the preferred instant, not from
//!    the start of working hours);
//! 3. otherwise the working-hours window of each of the next
//!    `horizon_days` days is scanned in order, earliest slot first, with a
//!    deadline acting as a soft preference within a day;
//! 4. a fully booked horizon yields [`Placement::NoSlot`].
//!
//! The scheduler holds no state across calls and never reads the system
//! clock; `now` is an explicit argument. Its conflict check is only as
//! fresh as the snapshot it is handed.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use log::debug;
use serde::Serialize;

use crate::analyzer::TaskAnalysis;
use crate::civil::{self, jst_instant};
use crate::freebusy::{find_free_slots, BusyInterval};

/// Working-hours window and search horizon for automatic placement.
///
/// Hours are JST wall-clock hours in `0..=23`.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub work_start_hour: u32,
    pub work_end_hour: u32,
    pub horizon_days: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            work_start_hour: 8,
            work_end_hour: 22,
            horizon_days: 7,
        }
    }
}

/// Outcome of a placement attempt.
///
/// `NoSlot` carries no instants on purpose: a failed search has no
/// placement a caller could accidentally persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Placement {
    Scheduled {
        #[serde(with = "jst_instant")]
        start: DateTime<Utc>,
        #[serde(with = "jst_instant")]
        end: DateTime<Utc>,
    },
    NoSlot,
}

impl Placement {
    pub fn is_scheduled(&self) -> bool {
        matches!(self, Placement::Scheduled { .. })
    }
}

/// Place one task against the supplied busy-interval snapshot.
///
/// Pure function of its arguments; assumes `analysis.duration_minutes > 0`.
pub fn schedule_task(
    analysis: &TaskAnalysis,
    existing: &[BusyInterval],
    now: DateTime<Utc>,
    config: &SchedulerConfig,
) -> Placement {
    let duration = Duration::minutes(analysis.duration_minutes);

    if let Some(preferred) = analysis.preferred_start_time {
        let end = preferred + duration;
        let conflicted = existing
            .iter()
            .any(|e| !e.all_day && e.start < end && e.end > preferred);

        if !conflicted {
            debug!(
                "preferred time {} is free, honoring it verbatim",
                civil::to_fixed_offset_iso(preferred)
            );
            return Placement::Scheduled {
                start: preferred,
                end,
            };
        }

        // Conflict: nearest later slot on the same civil day, searching from
        // the preferred instant rather than from work_start_hour
        let day_end = civil::at_local(civil::local_date(preferred), hour(config.work_end_hour));
        let nearby = find_free_slots(existing, preferred, day_end, analysis.duration_minutes);
        if let Some(slot) = nearby.first() {
            debug!(
                "preferred time conflicted, rerouting to {}",
                civil::to_fixed_offset_iso(slot.start)
            );
            return Placement::Scheduled {
                start: slot.start,
                end: slot.start + duration,
            };
        }
        debug!("preferred day exhausted, falling back to horizon scan");
    }

    for day_offset in 0..config.horizon_days {
        let date = civil::local_date(civil::add_days(now, day_offset));
        let mut day_start = civil::at_local(date, hour(config.work_start_hour));
        let day_end = civil::at_local(date, hour(config.work_end_hour));

        // Never schedule today before "now"
        if day_offset == 0 && day_start < now {
            let rounded = civil::round_up_to_quarter_hour(now);
            if rounded > day_start {
                day_start = rounded;
            }
        }
        if day_start >= day_end {
            continue;
        }

        let slots = find_free_slots(existing, day_start, day_end, analysis.duration_minutes);

        // Deadline is a soft preference: prefer a slot ending by it, but
        // take any slot on the first day that has one
        if let Some(deadline) = analysis.deadline {
            if let Some(slot) = slots.iter().find(|s| s.start + duration <= deadline) {
                return Placement::Scheduled {
                    start: slot.start,
                    end: slot.start + duration,
                };
            }
        }
        if let Some(slot) = slots.first() {
            return Placement::Scheduled {
                start: slot.start,
                end: slot.start + duration,
            };
        }
    }

    debug!("no usable slot within {} day(s)", config.horizon_days);
    Placement::NoSlot
}

fn hour(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap_or(NaiveTime::MIN)
}

// ── Tests ───────────────────────────────────────────────────────────────────
