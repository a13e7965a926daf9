//! Linux service manager - health checks, automatic restarts and scheduled
//! restarts for services described by shell commands.

pub mod cli;
pub mod daemon;
pub mod errors;
pub mod guard;
pub mod logging;
pub mod monitor;
pub mod process;
pub mod registry;
pub mod schedule;
