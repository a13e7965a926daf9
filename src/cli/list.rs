//! `lsm list` command implementation

use anyhow::Result;
use chrono::{DateTime, Local, SecondsFormat, Utc};
use clap::Args;
use serde::Serialize;
use std::path::Path;

use crate::registry::{FileRegistry, Service, ServiceRegistry};
use crate::schedule::CronSchedule;

const TABLE_COL_ID: usize = 4;
const TABLE_COL_NAME: usize = 20;
const TABLE_COL_SCHEDULE: usize = 16;
const TABLE_COL_ENABLED: usize = 8;
const TABLE_COL_TIME: usize = 26;

#[derive(Args)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct ServiceJson<'a> {
    #[serde(flatten)]
    service: &'a Service,
    /// Next scheduled restart in local time
    #[serde(skip_serializing_if = "Option::is_none")]
    next_restart: Option<DateTime<Local>>,
}

fn format_time(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| "-".to_string())
}

fn next_restart(service: &Service) -> Option<DateTime<Local>> {
    if !service.enabled || !service.is_scheduled() {
        return None;
    }
    CronSchedule::parse(&service.cron_schedule)
        .ok()?
        .upcoming(Local)
}

fn print_table_header() {
    println!(
        "{:<w_id$} {:<w_name$} {:<w_sched$} {:<w_en$} {:<w_time$} LAST RESTARTED",
        "ID",
        "NAME",
        "SCHEDULE",
        "ENABLED",
        "LAST CHECKED",
        w_id = TABLE_COL_ID,
        w_name = TABLE_COL_NAME,
        w_sched = TABLE_COL_SCHEDULE,
        w_en = TABLE_COL_ENABLED,
        w_time = TABLE_COL_TIME,
    );
    println!(
        "{}",
        "-".repeat(
            TABLE_COL_ID
                + TABLE_COL_NAME
                + TABLE_COL_SCHEDULE
                + TABLE_COL_ENABLED
                + TABLE_COL_TIME * 2
                + 5
        )
    );
}

fn print_table_row(service: &Service) {
    let schedule = if service.is_scheduled() {
        super::truncate(&service.cron_schedule, TABLE_COL_SCHEDULE)
    } else {
        "-".to_string()
    };
    println!(
        "{:<w_id$} {:<w_name$} {:<w_sched$} {:<w_en$} {:<w_time$} {}",
        service.id,
        super::truncate(&service.name, TABLE_COL_NAME),
        schedule,
        if service.enabled { "yes" } else { "no" },
        format_time(service.last_checked),
        format_time(service.last_restarted),
        w_id = TABLE_COL_ID,
        w_name = TABLE_COL_NAME,
        w_sched = TABLE_COL_SCHEDULE,
        w_en = TABLE_COL_ENABLED,
        w_time = TABLE_COL_TIME,
    );
}

pub async fn run(data_dir: &Path, args: ListArgs) -> Result<()> {
    let services = if data_dir.exists() {
        FileRegistry::open(data_dir)?.list_services()?
    } else {
        Vec::new()
    };

    if args.json {
        let rows: Vec<ServiceJson> = services
            .iter()
            .map(|service| ServiceJson {
                service,
                next_restart: next_restart(service),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if services.is_empty() {
        println!("No services registered.");
        return Ok(());
    }

    print_table_header();
    for service in &services {
        print_table_row(service);
    }
    println!("\nTotal: {} services", services.len());

    Ok(())
}
