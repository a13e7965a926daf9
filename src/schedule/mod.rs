//! Cron-driven restarts
//!
//! - [`cron`]: parsing of 5/6-field expressions and shortcuts
//! - [`engine`]: per-service triggers performing safe restarts

pub mod cron;
pub mod engine;

pub use self::cron::CronSchedule;
pub use self::engine::{FireOutcome, RestartScheduler};
