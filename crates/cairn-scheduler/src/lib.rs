//! Job scheduling: bandwidth shaping, maintenance windows, mount
//! reference-counting, and the schedule/retention coupling that drives
//! catalog pruning.

pub mod bandwidth;
pub mod maintenance;
pub mod mount;
pub mod persistence;
pub mod schedule;

pub use bandwidth::{BandWidthLimit, BandWidthList, BandWidthNode, Throttle, TimeOfDay};
pub use maintenance::{MaintenanceCalendar, MaintenanceWindow};
pub use mount::{MountGuard, MountTable};
pub use persistence::PersistenceNode;
pub use schedule::ScheduleNode;
