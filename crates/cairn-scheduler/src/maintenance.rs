//! Maintenance windows: time ranges during which pruning, aggregate
//! recomputation and storage consolidation are allowed to run, kept
//! separate from the job schedule so they never compete with active
//! archive jobs for I/O.

use chrono::{DateTime, Datelike, Local, Timelike, Weekday};

use crate::bandwidth::TimeOfDay;

#[derive(Clone, Debug)]
pub struct MaintenanceWindow {
    pub weekdays: Vec<Weekday>,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl MaintenanceWindow {
    fn covers(&self, now: &DateTime<Local>) -> bool {
        if !self.weekdays.is_empty() && !self.weekdays.contains(&now.weekday()) {
            return false;
        }
        let minute_of_day = now.hour() * 60 + now.minute();
        let start = self.start.hour * 60 + self.start.minute;
        let end = self.end.hour * 60 + self.end.minute;
        if start <= end {
            minute_of_day >= start && minute_of_day < end
        } else {
            minute_of_day >= start || minute_of_day < end
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MaintenanceCalendar(Vec<MaintenanceWindow>);

impl MaintenanceCalendar {
    /// An empty calendar means maintenance is always allowed.
    pub fn new(windows: Vec<MaintenanceWindow>) -> Self {
        MaintenanceCalendar(windows)
    }

    pub fn is_open(&self, now: DateTime<Local>) -> bool {
        self.0.is_empty() || self.0.iter().any(|w| w.covers(&now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 8, 3, hour, minute, 0).unwrap()
    }

    #[test]
    fn empty_calendar_is_always_open() {
        let calendar = MaintenanceCalendar::new(vec![]);
        assert!(calendar.is_open(at(3, 0)));
    }

    #[test]
    fn window_restricts_to_its_hours() {
        let calendar = MaintenanceCalendar::new(vec![MaintenanceWindow {
            weekdays: vec![],
            start: TimeOfDay::new(1, 0),
            end: TimeOfDay::new(4, 0),
        }]);
        assert!(calendar.is_open(at(2, 0)));
        assert!(!calendar.is_open(at(10, 0)));
    }
}
