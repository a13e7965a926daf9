//! CLI command implementations

pub mod add;
pub mod config;
pub mod daemon;
pub mod definition;
pub mod list;
pub mod remove;
pub mod toggle;
pub mod update;

pub use definition::{Cli, Commands};

use anyhow::{bail, Result};
use nix::unistd::Uid;

use crate::schedule::CronSchedule;

pub fn require_root() -> Result<()> {
    if !Uid::effective().is_root() {
        bail!("This command must be run as root (try sudo)");
    }
    Ok(())
}

/// Reject malformed cron expressions before they are stored. Empty means
/// unscheduled and is accepted.
pub fn validate_schedule(schedule: &str) -> Result<()> {
    if schedule.trim().is_empty() {
        return Ok(());
    }
    if let Err(e) = CronSchedule::parse(schedule) {
        bail!("Invalid schedule '{}': {}", schedule, e);
    }
    Ok(())
}

pub fn print_restart_notice() {
    println!("Note: restart the lsm daemon to apply schedule changes.");
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else if max <= 3 {
        s.chars().take(max).collect()
    } else {
        let head: String = s.chars().take(max - 3).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_shorter_than_max() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_longer_than_max() {
        assert_eq!(truncate("0 */5 * * * *", 8), "0 */5...");
    }

    #[test]
    fn test_truncate_with_small_max() {
        assert_eq!(truncate("hello", 2), "he");
        assert_eq!(truncate("hello", 0), "");
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        assert_eq!(truncate("héllo wörld", 8), "héllo...");
    }

    #[test]
    fn test_validate_schedule() {
        assert!(validate_schedule("").is_ok());
        assert!(validate_schedule("  ").is_ok());
        assert!(validate_schedule("@daily").is_ok());
        assert!(validate_schedule("30 3 * * 1-5").is_ok());
        assert!(validate_schedule("@every 30m").is_ok());
        assert!(validate_schedule("@every soon").is_err());

        let err = validate_schedule("every day").unwrap_err();
        assert!(err.to_string().contains("Invalid schedule"));
    }
}
