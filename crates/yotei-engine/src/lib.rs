//! # yotei-engine
//!
//! Deterministic scheduling of Japanese natural-language tasks.
//!
//! Takes one free-form sentence (「明日9時から30分瞑想します」), extracts a
//! start time, duration, category, and clean title without any external AI
//! call, and places the task into the first suitable gap of a busy-interval
//! snapshot. Every function is pure: the "now" anchor is an explicit
//! argument, so identical inputs always produce identical placements.
//!
//! All civil-day reasoning happens in one fixed timezone (Asia/Tokyo);
//! instants cross the API as `DateTime<Utc>` and serialize as fixed-offset
//! `+09:00` ISO strings.
//!
//! ## Modules
//!
//! - [`civil`] — JST civil-time utilities: day keys, day boundaries, civil
//!   day arithmetic, fixed-offset wire serialization
//! - [`freebusy`] — free-slot computation over existing busy intervals
//! - [`analyzer`] — rule-based extraction from a Japanese sentence, and the
//!   corrective overlay for externally produced analyses
//! - [`scheduler`] — placement policy: preferred time, same-day reroute,
//!   multi-day scan with soft deadlines
//! - [`error`] — error types

pub mod analyzer;
pub mod civil;
pub mod error;
pub mod freebusy;
pub mod scheduler;

pub use analyzer::{
    apply_fallback, classify_category, create_fallback_analysis, extract_title, FallbackAnalysis,
    TaskAnalysis, TaskCategory, DEFAULT_DURATION_MINUTES,
};
pub use error::YoteiError;
pub use freebusy::{find_free_slots, group_events_by_date, BusyInterval, FreeSlot};
pub use scheduler::{schedule_task, Placement, SchedulerConfig};
