use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use crate::{CoreError, CoreResult};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Default width of a lock segment, in minutes.
pub const DEFAULT_LOCK_GRANULARITY_MINUTES: u32 = 15;

/// A candidate or committed reservation window on one court.
///
/// The interval is half-open: a slot ending at 11:00 does not overlap one
/// starting at 11:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub court_id: i32,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Slot {
    /// `NaiveTime` has no 24:00, so a window cannot end at midnight; the
    /// last bookable end is 23:59:59.
    pub fn new(court_id: i32, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> CoreResult<Self> {
        if second_of_day_ceil(end) == 0 && second_of_day_ceil(start) > 0 {
            return Err(CoreError::InvalidSlot(format!(
                "window starting {} cannot end at midnight, use 23:59:59",
                start.format("%H:%M")
            )));
        }
        if end <= start {
            return Err(CoreError::InvalidSlot(format!(
                "end {} must be after start {}",
                end.format("%H:%M"),
                start.format("%H:%M")
            )));
        }
        Ok(Self { court_id, date, start, end })
    }

    pub fn overlaps(&self, other: &Slot) -> bool {
        self.court_id == other.court_id
            && self.date == other.date
            && intervals_overlap(self.start, self.end, other.start, other.end)
    }

    /// Advisory lock keys guarding this slot.
    ///
    /// The day is cut into `granularity_minutes` wide segments and one key is
    /// derived per segment the slot touches. Two slots that overlap always
    /// share at least one segment, so they contend on a common key; slots
    /// that only meet at a segment boundary share none. Keys come back sorted
    /// and de-duplicated, and must be acquired in that order.
    pub fn lock_keys(&self, granularity_minutes: u32) -> Vec<i64> {
        let step = granularity_minutes.clamp(1, MINUTES_PER_DAY);
        let start = second_of_day_floor(self.start);
        let end = second_of_day_ceil(self.end);

        // Segments are compared in seconds so a window shorter than a minute,
        // or one overlapping another only by seconds, still gets the shared key
        let mut keys = Vec::new();
        let mut segment = (start / 60) / step * step;
        while segment * 60 < end {
            let segment_end = (segment + step).min(MINUTES_PER_DAY);
            keys.push(slot_lock_key(self.court_id, self.date, segment, segment_end));
            segment = segment_end;
        }

        keys.sort_unstable();
        keys.dedup();
        keys
    }
}

/// Half-open interval overlap: `a_start < b_end AND a_end > b_start`.
pub fn intervals_overlap(a_start: NaiveTime, a_end: NaiveTime, b_start: NaiveTime, b_end: NaiveTime) -> bool {
    a_start < b_end && a_end > b_start
}

/// Deterministic 64-bit key for `(court, date, start, end)`, bounds given in
/// minutes since midnight.
///
/// xxh3 is seedless and stable across processes and releases, so every
/// application node derives the same key for the same window.
pub fn slot_lock_key(court_id: i32, date: NaiveDate, start_minute: u32, end_minute: u32) -> i64 {
    let material = format!(
        "{}:{}:{}:{}",
        court_id,
        date.format("%Y-%m-%d"),
        format_minute(start_minute),
        format_minute(end_minute)
    );
    xxh3_64(material.as_bytes()) as i64
}

fn second_of_day_floor(time: NaiveTime) -> u32 {
    time.num_seconds_from_midnight()
}

fn second_of_day_ceil(time: NaiveTime) -> u32 {
    time.num_seconds_from_midnight() + u32::from(time.nanosecond() > 0)
}

fn format_minute(minute: u32) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(court: i32, start: &str, end: &str) -> Slot {
        Slot::new(
            court,
            NaiveDate::from_ymd_opt(2025, 10, 10).unwrap(),
            NaiveTime::parse_from_str(start, "%H:%M").unwrap(),
            NaiveTime::parse_from_str(end, "%H:%M").unwrap(),
        )
        .unwrap()
    }

    fn shares_key(a: &Slot, b: &Slot) -> bool {
        let b_keys = b.lock_keys(DEFAULT_LOCK_GRANULARITY_MINUTES);
        a.lock_keys(DEFAULT_LOCK_GRANULARITY_MINUTES)
            .iter()
            .any(|k| b_keys.contains(k))
    }

    #[test]
    fn test_rejects_inverted_interval() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 10).unwrap();
        let t = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
        assert!(matches!(Slot::new(1, date, t, t), Err(CoreError::InvalidSlot(_))));
    }

    #[test]
    fn test_half_open_overlap() {
        assert!(slot(1, "18:00", "19:00").overlaps(&slot(1, "18:30", "19:30")));
        assert!(!slot(1, "10:00", "11:00").overlaps(&slot(1, "11:00", "12:00")));
        assert!(!slot(1, "18:00", "19:00").overlaps(&slot(2, "18:00", "19:00")));
    }

    #[test]
    fn test_overlapping_slots_share_a_lock_key() {
        assert!(shares_key(&slot(1, "18:00", "19:00"), &slot(1, "18:30", "19:30")));
        assert!(shares_key(&slot(1, "18:00", "19:00"), &slot(1, "18:10", "18:20")));
    }

    #[test]
    fn test_adjacent_and_foreign_slots_do_not_contend() {
        assert!(!shares_key(&slot(1, "10:00", "11:00"), &slot(1, "11:00", "12:00")));
        assert!(!shares_key(&slot(1, "10:00", "11:00"), &slot(2, "10:00", "11:00")));
    }

    #[test]
    fn test_lock_keys_are_sorted_and_cover_segments() {
        let keys = slot(1, "18:10", "19:00").lock_keys(15);
        assert_eq!(keys.len(), 4);
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_lock_key_is_deterministic() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 10).unwrap();
        assert_eq!(slot_lock_key(1, date, 1080, 1140), slot_lock_key(1, date, 1080, 1140));
        assert_ne!(slot_lock_key(1, date, 1080, 1140), slot_lock_key(2, date, 1080, 1140));
    }

    fn slot_secs(court: i32, start: &str, end: &str) -> Slot {
        Slot::new(
            court,
            NaiveDate::from_ymd_opt(2025, 10, 10).unwrap(),
            NaiveTime::parse_from_str(start, "%H:%M:%S").unwrap(),
            NaiveTime::parse_from_str(end, "%H:%M:%S").unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_sub_minute_window_still_locks() {
        let short = slot_secs(1, "18:00:00", "18:00:30");
        assert_eq!(short.lock_keys(DEFAULT_LOCK_GRANULARITY_MINUTES).len(), 1);
        assert!(shares_key(&short, &slot(1, "17:30", "18:01")));
    }

    #[test]
    fn test_overlap_by_seconds_shares_a_key() {
        let a = slot_secs(1, "18:14:30", "18:15:30");
        let b = slot_secs(1, "18:15:00", "18:16:00");
        assert!(a.overlaps(&b));
        assert!(shares_key(&a, &b));

        // Touching on a segment boundary, down to the second
        let c = slot_secs(1, "18:00:00", "18:15:00");
        let d = slot_secs(1, "18:15:00", "18:30:00");
        assert!(!c.overlaps(&d));
        assert!(!shares_key(&c, &d));
    }

    #[test]
    fn test_overlapping_windows_always_share_a_key() {
        // Every overlapping pair on a 5-minute grid with second offsets
        let starts: Vec<u32> = (0..24).map(|i| 17 * 3600 + i * 300 + (i % 3) * 20).collect();
        let at = |secs: u32| NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 10, 10).unwrap();
        for &a_start in &starts {
            for &b_start in &starts {
                for (a_len, b_len) in [(45, 3600), (600, 90), (1800, 1800)] {
                    let a = Slot::new(1, date, at(a_start), at(a_start + a_len)).unwrap();
                    let b = Slot::new(1, date, at(b_start), at(b_start + b_len)).unwrap();
                    if a.overlaps(&b) {
                        assert!(shares_key(&a, &b), "{:?} vs {:?}", a, b);
                    }
                }
            }
        }
    }

    #[test]
    fn test_midnight_end_is_rejected_and_last_second_is_bookable() {
        let date = NaiveDate::from_ymd_opt(2025, 10, 10).unwrap();
        let eleven = NaiveTime::from_hms_opt(23, 0, 0).unwrap();
        assert!(matches!(
            Slot::new(1, date, eleven, NaiveTime::from_hms_opt(0, 0, 0).unwrap()),
            Err(CoreError::InvalidSlot(_))
        ));

        let late = slot_secs(1, "23:00:00", "23:59:59");
        assert_eq!(late.lock_keys(DEFAULT_LOCK_GRANULARITY_MINUTES).len(), 4);
    }

    #[test]
    fn test_whole_day_granularity_yields_single_key() {
        assert_eq!(slot(1, "08:00", "23:00").lock_keys(MINUTES_PER_DAY).len(), 1);
    }
}
