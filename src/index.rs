//! Line index records and the engines that produce them.

pub mod builder;
pub mod record;
pub mod watch;

pub use builder::IndexBuilder;
pub use record::{LineBatch, LineRecord};
pub use watch::{WatchEngine, WatchState};
