//! Small, dependency-light building blocks shared across the archiver:
//! a dense bitmap, glob/regex pattern matching, and a typed option map.

pub mod bitmap;
pub mod logging;
pub mod option_map;
pub mod pattern;
pub mod units;

pub use bitmap::Bitmap;
pub use logging::{init_logging, LogArgs, LogFormat, LogLevel};
pub use option_map::OptionMap;
pub use pattern::{EntryKind, EntryList, Pattern, PatternList, PatternType};
