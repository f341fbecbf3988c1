//! Matching the calendar a job is supposed to run on against wall-clock
//! time, independent of bandwidth shaping and maintenance windows.

use chrono::{DateTime, Datelike, Local, Timelike, Weekday};

use crate::bandwidth::TimeOfDay;

#[derive(Clone, Debug)]
pub enum ScheduleNode {
    /// Fires once per matching day, at `time`.
    Daily { weekdays: Vec<Weekday>, time: TimeOfDay },
    /// Fires every `interval` starting from `anchor`.
    Interval {
        anchor: DateTime<Local>,
        interval: chrono::Duration,
    },
}

impl ScheduleNode {
    /// Whether this node is due at `now`, given the last time it actually
    /// ran (`None` if it has never run). `Daily` matches within the same
    /// minute it's scheduled for, once per day. `Interval` matches once
    /// `interval` has elapsed since `last_run`.
    pub fn is_due(&self, now: DateTime<Local>, last_run: Option<DateTime<Local>>) -> bool {
        match self {
            ScheduleNode::Daily { weekdays, time } => {
                if !weekdays.is_empty() && !weekdays.contains(&now.weekday()) {
                    return false;
                }
                if now.hour() != time.hour || now.minute() != time.minute {
                    return false;
                }
                match last_run {
                    Some(last) => last.date_naive() != now.date_naive(),
                    None => true,
                }
            }
            ScheduleNode::Interval { anchor, interval } => {
                let due_since = last_run.unwrap_or(*anchor);
                now - due_since >= *interval
            }
        }
    }
}
