//! Daily acceptance window.
//!
//! A run accepts items published in the 24 hours that ended at the most recent
//! *completed* cutover (16:00 local by default). Running right after the
//! cutover every day yields contiguous, non-overlapping windows.

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use std::fmt;

/// A closed interval of acceptable publish times, expressed in the local zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl TimeWindow {
    /// Compute the window for a run happening at `now`.
    ///
    /// At or after the cutover hour the window ends at today's cutover;
    /// before it, the window ends at yesterday's cutover. Hours above 23 are
    /// clamped to 23.
    pub fn compute<Tz: TimeZone>(now: &DateTime<Tz>, local: FixedOffset, cutover_hour: u32) -> Self {
        let hour = cutover_hour.min(23);
        let now_local = now.with_timezone(&local);
        let cutover = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
        let mut end_naive = now_local.date_naive().and_time(cutover);
        if now_local.hour() < hour {
            end_naive -= Duration::days(1);
        }
        let end = at_local(end_naive, local);
        Self {
            start: end - Duration::days(1),
            end,
        }
    }

    /// Inclusive on both bounds; `t` is converted to the window's zone first.
    pub fn contains<Tz: TimeZone>(&self, t: &DateTime<Tz>) -> bool {
        let t = t.with_timezone(&self.start.timezone());
        self.start <= t && t <= self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%Y-%m-%d %H:%M %:z"),
            self.end.format("%Y-%m-%d %H:%M %:z")
        )
    }
}

fn at_local(naive: NaiveDateTime, offset: FixedOffset) -> DateTime<FixedOffset> {
    let utc = naive - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn kst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn kst_at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<FixedOffset> {
        kst().with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn after_cutover_window_ends_today() {
        let w = TimeWindow::compute(&kst_at(2025, 5, 2, 16, 10), kst(), 16);
        assert_eq!(w.start, kst_at(2025, 5, 1, 16, 0));
        assert_eq!(w.end, kst_at(2025, 5, 2, 16, 0));
    }

    #[test]
    fn before_cutover_window_ends_yesterday() {
        let w = TimeWindow::compute(&kst_at(2025, 5, 2, 10, 0), kst(), 16);
        assert_eq!(w.start, kst_at(2025, 4, 30, 16, 0));
        assert_eq!(w.end, kst_at(2025, 5, 1, 16, 0));
    }

    #[test]
    fn exactly_at_cutover_counts_as_after() {
        let w = TimeWindow::compute(&kst_at(2025, 5, 2, 16, 0), kst(), 16);
        assert_eq!(w.end, kst_at(2025, 5, 2, 16, 0));
    }

    #[test]
    fn utc_input_is_converted_before_the_hour_check() {
        // 2025-05-02 07:30 UTC is 16:30 KST.
        let now = Utc.with_ymd_and_hms(2025, 5, 2, 7, 30, 0).unwrap();
        let w = TimeWindow::compute(&now, kst(), 16);
        assert_eq!(w.end, kst_at(2025, 5, 2, 16, 0));
    }

    #[test]
    fn window_is_exactly_one_day() {
        let w = TimeWindow::compute(&kst_at(2025, 12, 31, 23, 59), kst(), 16);
        assert_eq!(w.end - w.start, Duration::days(1));
    }

    #[test]
    fn contains_is_inclusive_on_both_bounds() {
        let w = TimeWindow::compute(&kst_at(2025, 5, 2, 17, 0), kst(), 16);
        assert!(w.contains(&w.start));
        assert!(w.contains(&w.end));
        assert!(!w.contains(&(w.start - Duration::seconds(1))));
        assert!(!w.contains(&(w.end + Duration::seconds(1))));
    }

    #[test]
    fn contains_compares_across_zones() {
        let w = TimeWindow::compute(&kst_at(2025, 5, 2, 17, 0), kst(), 16);
        // 2025-05-02 06:59 UTC is 15:59 KST, inside the window.
        let inside = Utc.with_ymd_and_hms(2025, 5, 2, 6, 59, 0).unwrap();
        let outside = Utc.with_ymd_and_hms(2025, 5, 2, 7, 1, 0).unwrap();
        assert!(w.contains(&inside));
        assert!(!w.contains(&outside));
    }
}
