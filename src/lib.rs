pub mod cli;
pub mod commands;
pub mod config;
pub mod date;
pub mod logging;
pub mod model;
pub mod planner;
pub mod sheet;
pub mod store;
pub mod timer;
mod ui;

pub use date::DateCursor;
pub use model::{Habit, PlannerError, Priority, Task};
pub use planner::{HabitLoad, Planner};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use timer::{FocusTimer, TickOutcome, Ticker, TimerMode};
