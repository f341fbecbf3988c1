//! Calendar-gated bandwidth shaping: a list of time windows, each either
//! unlimited or capped at a byte rate, matched against the current time
//! with the *last* matching node winning so a specific override placed
//! after a general window takes precedence over it.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Datelike, Local, Timelike, Weekday};
use parking_lot::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Self {
        TimeOfDay { hour, minute }
    }

    fn minutes_since_midnight(&self) -> u32 {
        self.hour * 60 + self.minute
    }
}

/// How long a file-sourced limit is trusted before it's re-read. Keeps a
/// busy throttle loop from stat-ing the limit file on every sample.
const FILE_LIMIT_DEBOUNCE: Duration = Duration::from_secs(1);

/// The cap a node applies once it's in effect: either an inline number or
/// a value read (and debounced) from an external file, so an operator can
/// change the limit without restarting the job.
pub enum BandWidthLimit {
    Unlimited,
    Inline(u64),
    File { path: PathBuf, cache: Mutex<Option<(Instant, u64)>> },
}

impl BandWidthLimit {
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        BandWidthLimit::File { path: path.into(), cache: Mutex::new(None) }
    }

    /// Resolves the current cap. A file that can't be read or doesn't
    /// contain a plain integer is treated as unlimited rather than
    /// failing the calling throttle.
    fn resolve(&self) -> Option<u64> {
        match self {
            BandWidthLimit::Unlimited => None,
            BandWidthLimit::Inline(limit) => Some(*limit),
            BandWidthLimit::File { path, cache } => {
                let mut cache = cache.lock();
                if let Some((read_at, limit)) = *cache {
                    if read_at.elapsed() < FILE_LIMIT_DEBOUNCE {
                        return Some(limit);
                    }
                }
                let limit = std::fs::read_to_string(path)
                    .ok()
                    .and_then(|text| text.trim().parse::<u64>().ok());
                if let Some(limit) = limit {
                    *cache = Some((Instant::now(), limit));
                }
                limit
            }
        }
    }
}

impl std::fmt::Debug for BandWidthLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BandWidthLimit::Unlimited => f.write_str("Unlimited"),
            BandWidthLimit::Inline(limit) => write!(f, "Inline({limit})"),
            BandWidthLimit::File { path, .. } => write!(f, "File({})", path.display()),
        }
    }
}

impl Clone for BandWidthLimit {
    /// A cloned file-sourced limit starts with an empty cache; it's cheap
    /// to re-read and correctness only depends on the debounce window,
    /// never on sharing a cache across clones.
    fn clone(&self) -> Self {
        match self {
            BandWidthLimit::Unlimited => BandWidthLimit::Unlimited,
            BandWidthLimit::Inline(limit) => BandWidthLimit::Inline(*limit),
            BandWidthLimit::File { path, .. } => BandWidthLimit::from_file(path.clone()),
        }
    }
}

#[derive(Debug)]
pub struct BandWidthNode {
    /// Calendar fields are `None` for "any"; all given fields must match.
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    /// Days this node applies to; empty means every day.
    pub weekdays: Vec<Weekday>,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub limit: BandWidthLimit,
}

impl Clone for BandWidthNode {
    fn clone(&self) -> Self {
        BandWidthNode {
            year: self.year,
            month: self.month,
            day: self.day,
            weekdays: self.weekdays.clone(),
            start: self.start,
            end: self.end,
            limit: self.limit.clone(),
        }
    }
}

impl BandWidthNode {
    fn covers(&self, now: &DateTime<Local>) -> bool {
        if let Some(year) = self.year {
            if now.year() != year {
                return false;
            }
        }
        if let Some(month) = self.month {
            if now.month() != month {
                return false;
            }
        }
        if let Some(day) = self.day {
            if now.day() != day {
                return false;
            }
        }
        if !self.weekdays.is_empty() && !self.weekdays.contains(&now.weekday()) {
            return false;
        }
        let minute_of_day = now.hour() * 60 + now.minute();
        let start = self.start.minutes_since_midnight();
        let end = self.end.minutes_since_midnight();
        if start <= end {
            minute_of_day >= start && minute_of_day < end
        } else {
            // Window wraps past midnight.
            minute_of_day >= start || minute_of_day < end
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct BandWidthList(Vec<BandWidthNode>);

impl BandWidthList {
    pub fn new(nodes: Vec<BandWidthNode>) -> Self {
        BandWidthList(nodes)
    }

    /// Returns the byte-rate cap in effect at `now`. Nodes are matched in
    /// list order and the last one covering `now` wins, so a specific
    /// override placed after a general window takes precedence over it.
    /// `None` means no node matches, or the winning node is unlimited.
    pub fn limit_at(&self, now: DateTime<Local>) -> Option<u64> {
        self.0
            .iter()
            .filter(|node| node.covers(&now))
            .last()
            .and_then(|node| node.limit.resolve())
    }
}

/// A simple token-bucket throttle driven by a `BandWidthList`. Callers
/// report bytes as they're about to be sent and get back how long to sleep
/// first.
pub struct Throttle {
    schedule: BandWidthList,
    bucket_bytes: f64,
    last_refill: std::time::Instant,
}

impl Throttle {
    pub fn new(schedule: BandWidthList) -> Self {
        Throttle {
            schedule,
            bucket_bytes: 0.0,
            last_refill: std::time::Instant::now(),
        }
    }

    /// Call before sending `bytes`; returns how long to sleep to respect
    /// the currently active limit (zero if unlimited or under budget).
    pub fn wait_for(&mut self, bytes: u64, now_wall: DateTime<Local>) -> std::time::Duration {
        let Some(limit) = self.schedule.limit_at(now_wall) else {
            return std::time::Duration::ZERO;
        };
        let elapsed = self.last_refill.elapsed();
        self.last_refill = std::time::Instant::now();
        self.bucket_bytes += elapsed.as_secs_f64() * limit as f64;
        self.bucket_bytes = self.bucket_bytes.min(limit as f64);

        self.bucket_bytes -= bytes as f64;
        if self.bucket_bytes >= 0.0 {
            return std::time::Duration::ZERO;
        }
        let deficit = -self.bucket_bytes;
        std::time::Duration::from_secs_f64(deficit / limit as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32, minute: u32, weekday: Weekday) -> DateTime<Local> {
        use chrono::TimeZone;
        let base = Local.with_ymd_and_hms(2026, 8, 3, hour, minute, 0).unwrap();
        assert_eq!(base.weekday(), weekday, "fixture date must land on the expected weekday");
        base
    }

    fn any_day(start: TimeOfDay, end: TimeOfDay, limit: BandWidthLimit) -> BandWidthNode {
        BandWidthNode { year: None, month: None, day: None, weekdays: vec![], start, end, limit }
    }

    #[test]
    fn unbounded_schedule_never_limits() {
        let schedule = BandWidthList::new(vec![]);
        assert_eq!(schedule.limit_at(at(12, 0, Weekday::Mon)), None);
    }

    #[test]
    fn window_applies_only_on_listed_days_and_hours() {
        let schedule = BandWidthList::new(vec![BandWidthNode {
            year: None,
            month: None,
            day: None,
            weekdays: vec![Weekday::Mon],
            start: TimeOfDay::new(9, 0),
            end: TimeOfDay::new(17, 0),
            limit: BandWidthLimit::Inline(1_000_000),
        }]);
        assert_eq!(schedule.limit_at(at(12, 0, Weekday::Mon)), Some(1_000_000));
        assert_eq!(schedule.limit_at(at(20, 0, Weekday::Mon)), None);
    }

    #[test]
    fn wrapping_window_covers_midnight() {
        let schedule = BandWidthList::new(vec![any_day(
            TimeOfDay::new(22, 0),
            TimeOfDay::new(6, 0),
            BandWidthLimit::Inline(500),
        )]);
        assert_eq!(schedule.limit_at(at(23, 0, Weekday::Mon)), Some(500));
        assert_eq!(schedule.limit_at(at(12, 0, Weekday::Mon)), None);
    }

    #[test]
    fn later_node_overrides_an_earlier_overlapping_one() {
        // A general all-day cap followed by a tighter lunchtime-specific
        // override: the more specific node comes second and must win.
        let schedule = BandWidthList::new(vec![
            any_day(TimeOfDay::new(0, 0), TimeOfDay::new(23, 59), BandWidthLimit::Inline(10_000_000)),
            any_day(TimeOfDay::new(12, 0), TimeOfDay::new(13, 0), BandWidthLimit::Inline(1_000)),
        ]);
        assert_eq!(schedule.limit_at(at(12, 30, Weekday::Mon)), Some(1_000));
        assert_eq!(schedule.limit_at(at(9, 0, Weekday::Mon)), Some(10_000_000));
    }

    #[test]
    fn year_month_day_fields_narrow_a_node_to_one_date() {
        let schedule = BandWidthList::new(vec![BandWidthNode {
            year: Some(2026),
            month: Some(8),
            day: Some(3),
            weekdays: vec![],
            start: TimeOfDay::new(0, 0),
            end: TimeOfDay::new(23, 59),
            limit: BandWidthLimit::Inline(42),
        }]);
        assert_eq!(schedule.limit_at(at(12, 0, Weekday::Mon)), Some(42));

        use chrono::TimeZone;
        let other_day = Local.with_ymd_and_hms(2026, 8, 4, 12, 0, 0).unwrap();
        assert_eq!(schedule.limit_at(other_day), None);
    }

    #[test]
    fn file_backed_limit_reads_the_current_value_and_then_debounces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("limit");
        std::fs::write(&path, "7777").unwrap();

        let schedule = BandWidthList::new(vec![any_day(
            TimeOfDay::new(0, 0),
            TimeOfDay::new(23, 59),
            BandWidthLimit::from_file(&path),
        )]);
        assert_eq!(schedule.limit_at(at(12, 0, Weekday::Mon)), Some(7777));

        std::fs::write(&path, "1").unwrap();
        assert_eq!(schedule.limit_at(at(12, 0, Weekday::Mon)), Some(7777));
    }

    #[test]
    fn throttle_demands_wait_once_bucket_is_exhausted() {
        let schedule = BandWidthList::new(vec![any_day(
            TimeOfDay::new(0, 0),
            TimeOfDay::new(23, 59),
            BandWidthLimit::Inline(100),
        )]);
        let mut throttle = Throttle::new(schedule);
        let now = at(12, 0, Weekday::Mon);
        let wait = throttle.wait_for(1000, now);
        assert!(wait > std::time::Duration::ZERO);
    }
}
