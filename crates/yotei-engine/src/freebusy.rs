//! Free-slot computation over a busy-interval snapshot.
//!
//! The caller supplies a read-only snapshot of existing calendar events as
//! [`BusyInterval`]s with instants already resolved to absolute time; this
//! module performs no normalization or dedup beyond sorting.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::civil::{self, jst_instant};

/// A time range already occupied by an existing calendar event.
///
/// All-day events never block timed scheduling and are excluded from every
/// free-slot computation. An inverted interval (`start > end`) is treated as
/// zero-length rather than rejected, keeping slot search total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    #[serde(with = "jst_instant")]
    pub start: DateTime<Utc>,
    #[serde(with = "jst_instant")]
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
}

impl BusyInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        BusyInterval {
            start,
            end,
            all_day: false,
        }
    }

    /// End of the interval with inverted inputs clamped to zero length.
    fn effective_end(&self) -> DateTime<Utc> {
        self.end.max(self.start)
    }
}

/// A maximal gap between busy intervals (or window edges) at least as long
/// as the requested minimum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FreeSlot {
    #[serde(with = "jst_instant")]
    pub start: DateTime<Utc>,
    #[serde(with = "jst_instant")]
    pub end: DateTime<Utc>,
    pub duration_minutes: i64,
}

/// Compute the free gaps of at least `min_minutes` within
/// `[window_start, window_end)`.
///
/// All-day intervals and intervals that do not overlap the window are
/// discarded; the rest are swept in start order with a cursor. Returned
/// slots are chronological, non-overlapping, and together with the filtered
/// busy intervals partition the window.
///
/// An empty busy list yields the whole window as one slot (if long enough);
/// a fully covered or zero-length window yields nothing.
pub fn find_free_slots(
    busy: &[BusyInterval],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    min_minutes: i64,
) -> Vec<FreeSlot> {
    let mut in_window: Vec<&BusyInterval> = busy
        .iter()
        .filter(|b| !b.all_day && b.start < window_end && b.effective_end() > window_start)
        .collect();
    in_window.sort_by_key(|b| b.start);

    let mut slots = Vec::new();
    let mut cursor = window_start;

    for interval in in_window {
        if interval.start > cursor {
            push_if_long_enough(&mut slots, cursor, interval.start, min_minutes);
        }
        if interval.effective_end() > cursor {
            cursor = interval.effective_end();
        }
    }

    if window_end > cursor {
        push_if_long_enough(&mut slots, cursor, window_end, min_minutes);
    }

    debug!(
        "free-slot sweep [{} .. {}): {} slot(s) of >= {} min",
        civil::to_fixed_offset_iso(window_start),
        civil::to_fixed_offset_iso(window_end),
        slots.len(),
        min_minutes
    );
    slots
}

fn push_if_long_enough(
    slots: &mut Vec<FreeSlot>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    min_minutes: i64,
) {
    let duration_minutes = (end - start).num_minutes();
    if duration_minutes >= min_minutes {
        slots.push(FreeSlot {
            start,
            end,
            duration_minutes,
        });
    }
}

/// Group events by JST day key, each group sorted by start time.
///
/// `BTreeMap` keeps the day keys themselves in chronological order, since
/// `YYYY-MM-DD` sorts lexicographically.
pub fn group_events_by_date(events: &[BusyInterval]) -> BTreeMap<String, Vec<BusyInterval>> {
    let mut groups: BTreeMap<String, Vec<BusyInterval>> = BTreeMap::new();
    for event in events {
        groups
            .entry(civil::date_key(event.start))
            .or_default()
            .push(event.clone());
    }
    for list in groups.values_mut() {
        list.sort_by_key(|e| e.start);
    }
    groups
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::civil::parse_instant;
    use proptest::prelude::*;

    fn t(s: &str) -> DateTime<Utc> {
        parse_instant(s).unwrap()
    }

    fn busy(start: &str, end: &str) -> BusyInterval {
        BusyInterval::new(t(start), t(end))
    }

    #[test]
    fn test_empty_busy_list_yields_whole_window() {
        let slots = find_free_slots(
            &[],
            t("2026-02-14T08:00:00+09:00"),
            t("2026-02-14T22:00:00+09:00"),
            30,
        );
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].start, t("2026-02-14T08:00:00+09:00"));
        assert_eq!(slots[0].end, t("2026-02-14T22:00:00+09:00"));
        assert_eq!(slots[0].duration_minutes, 14 * 60);
    }

    #[test]
    fn test_gaps_between_events() {
        let events = vec![
            busy("2026-02-14T09:00:00+09:00", "2026-02-14T10:00:00+09:00"),
            busy("2026-02-14T12:00:00+09:00", "2026-02-14T13:00:00+09:00"),
        ];
        let slots = find_free_slots(
            &events,
            t("2026-02-14T08:00:00+09:00"),
            t("2026-02-14T14:00:00+09:00"),
            30,
        );
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].duration_minutes, 60); // 08:00-09:00
        assert_eq!(slots[1].duration_minutes, 120); // 10:00-12:00
        assert_eq!(slots[2].duration_minutes, 60); // 13:00-14:00
    }

    #[test]
    fn test_minimum_length_filters_short_gaps() {
        let events = vec![
            busy("2026-02-14T09:00:00+09:00", "2026-02-14T10:00:00+09:00"),
            busy("2026-02-14T10:20:00+09:00", "2026-02-14T12:00:00+09:00"),
        ];
        let slots = find_free_slots(
            &events,
            t("2026-02-14T09:00:00+09:00"),
            t("2026-02-14T12:00:00+09:00"),
            30,
        );
        // The 20-minute gap at 10:00 is dropped, nothing else remains
        assert!(slots.is_empty());
    }

    #[test]
    fn test_overlapping_events_merge_under_cursor() {
        let events = vec![
            busy("2026-02-14T09:00:00+09:00", "2026-02-14T11:00:00+09:00"),
            busy("2026-02-14T10:00:00+09:00", "2026-02-14T10:30:00+09:00"),
            busy("2026-02-14T10:30:00+09:00", "2026-02-14T12:00:00+09:00"),
        ];
        let slots = find_free_slots(
            &events,
            t("2026-02-14T08:00:00+09:00"),
            t("2026-02-14T13:00:00+09:00"),
            15,
        );
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].end, t("2026-02-14T09:00:00+09:00"));
        assert_eq!(slots[1].start, t("2026-02-14T12:00:00+09:00"));
    }

    #[test]
    fn test_all_day_events_do_not_block() {
        let mut all_day = busy("2026-02-14T00:00:00+09:00", "2026-02-15T00:00:00+09:00");
        all_day.all_day = true;
        let slots = find_free_slots(
            &[all_day],
            t("2026-02-14T08:00:00+09:00"),
            t("2026-02-14T22:00:00+09:00"),
            30,
        );
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].duration_minutes, 14 * 60);
    }

    #[test]
    fn test_fully_covered_window_is_empty() {
        let events = vec![busy("2026-02-14T07:00:00+09:00", "2026-02-14T23:00:00+09:00")];
        let slots = find_free_slots(
            &events,
            t("2026-02-14T08:00:00+09:00"),
            t("2026-02-14T22:00:00+09:00"),
            30,
        );
        assert!(slots.is_empty());
    }

    #[test]
    fn test_zero_length_window_is_empty() {
        let w = t("2026-02-14T08:00:00+09:00");
        assert!(find_free_slots(&[], w, w, 0).is_empty());
    }

    #[test]
    fn test_inverted_interval_treated_as_zero_length() {
        let events = vec![busy("2026-02-14T12:00:00+09:00", "2026-02-14T09:00:00+09:00")];
        let slots = find_free_slots(
            &events,
            t("2026-02-14T08:00:00+09:00"),
            t("2026-02-14T22:00:00+09:00"),
            30,
        );
        // A zero-length obstacle at 12:00 splits the window without eating time
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].end, t("2026-02-14T12:00:00+09:00"));
        assert_eq!(slots[1].start, t("2026-02-14T12:00:00+09:00"));
    }

    #[test]
    fn test_event_straddling_window_start() {
        let events = vec![busy("2026-02-14T07:00:00+09:00", "2026-02-14T09:30:00+09:00")];
        let slots = find_free_slots(
            &events,
            t("2026-02-14T08:00:00+09:00"),
            t("2026-02-14T12:00:00+09:00"),
            30,
        );
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].start, t("2026-02-14T09:30:00+09:00"));
    }

    #[test]
    fn test_group_events_by_date() {
        let events = vec![
            busy("2026-02-15T10:00:00+09:00", "2026-02-15T11:00:00+09:00"),
            busy("2026-02-14T14:00:00+09:00", "2026-02-14T15:00:00+09:00"),
            busy("2026-02-14T09:00:00+09:00", "2026-02-14T10:00:00+09:00"),
        ];
        let groups = group_events_by_date(&events);
        let keys: Vec<&String> = groups.keys().collect();
        assert_eq!(keys, ["2026-02-14", "2026-02-15"]);
        let day1 = &groups["2026-02-14"];
        assert_eq!(day1.len(), 2);
        assert!(day1[0].start < day1[1].start);
    }

    #[test]
    fn test_busy_interval_json_wire_format() {
        let interval = busy("2026-02-14T09:00:00+09:00", "2026-02-14T10:00:00+09:00");
        let json = serde_json::to_value(&interval).unwrap();
        assert_eq!(json["start"], "2026-02-14T09:00:00+09:00");
        assert_eq!(json["all_day"], false);
        // all_day defaults to false when absent on the wire
        let parsed: BusyInterval = serde_json::from_str(
            r#"{"start":"2026-02-14T09:00:00+09:00","end":"2026-02-14T10:00:00+09:00"}"#,
        )
        .unwrap();
        assert_eq!(parsed, interval);
    }

    // ── Property tests ──────────────────────────────────────────────────

    /// Busy intervals as minute offsets within a 0..=1440 window.
    fn arb_busy() -> impl Strategy<Value = Vec<(i64, i64, bool)>> {
        prop::collection::vec(
            (0i64..1440, 0i64..240, prop::bool::ANY).prop_map(|(s, len, all_day)| {
                (s, (s + len).min(1440), all_day)
            }),
            0..12,
        )
    }

    proptest! {
        #[test]
        fn prop_slots_partition_window(busy_mins in arb_busy(), min in 0i64..120) {
            let base = t("2026-02-14T00:00:00+09:00");
            let window_end = base + chrono::Duration::minutes(1440);
            let events: Vec<BusyInterval> = busy_mins
                .iter()
                .map(|&(s, e, all_day)| BusyInterval {
                    start: base + chrono::Duration::minutes(s),
                    end: base + chrono::Duration::minutes(e),
                    all_day,
                })
                .collect();

            let slots = find_free_slots(&events, base, window_end, min);

            // Chronological, non-overlapping, each at least the minimum
            for pair in slots.windows(2) {
                prop_assert!(pair[0].end <= pair[1].start);
            }
            for slot in &slots {
                prop_assert!(slot.duration_minutes >= min);
                prop_assert_eq!(
                    slot.duration_minutes,
                    (slot.end - slot.start).num_minutes()
                );
                prop_assert!(slot.start >= base && slot.end <= window_end);
                // Disjoint from every timed busy interval
                for event in events.iter().filter(|e| !e.all_day) {
                    let busy_end = event.end.max(event.start);
                    prop_assert!(event.start >= slot.end || busy_end <= slot.start);
                }
            }
        }

        #[test]
        fn prop_no_omitted_slot_with_zero_minimum(busy_mins in arb_busy()) {
            // With min = 0, free slots plus timed busy intervals must cover
            // the whole window minute by minute.
            let base = t("2026-02-14T00:00:00+09:00");
            let window_end = base + chrono::Duration::minutes(1440);
            let events: Vec<BusyInterval> = busy_mins
                .iter()
                .map(|&(s, e, all_day)| BusyInterval {
                    start: base + chrono::Duration::minutes(s),
                    end: base + chrono::Duration::minutes(e),
                    all_day,
                })
                .collect();

            let slots = find_free_slots(&events, base, window_end, 0);

            let mut covered = vec![false; 1440];
            for slot in &slots {
                let s = (slot.start - base).num_minutes();
                let e = (slot.end - base).num_minutes();
                for m in s..e {
                    covered[m as usize] = true;
                }
            }
            for event in events.iter().filter(|e| !e.all_day) {
                let s = (event.start - base).num_minutes().max(0);
                let e = (event.end.max(event.start) - base).num_minutes().min(1440);
                for m in s..e {
                    covered[m as usize] = true;
                }
            }
            prop_assert!(covered.iter().all(|&c| c));
        }
    }
}
