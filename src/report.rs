//! Whole-table ticket snapshot as a CSV file.
//!
//! Always every row, no filtering. Timestamps are shifted into the configured
//! display timezone and written without offset markers so spreadsheet tools
//! take them as plain local times. The file is transient: the caller delivers
//! it and deletes it.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use std::fs;
use std::path::{Path, PathBuf};

use crate::db::Database;
use crate::models::Ticket;

const HEADER: [&str; 11] = [
    "id",
    "created_at",
    "client_name",
    "client_phone",
    "machine_number",
    "engineer_closed_by",
    "engineer_status",
    "engineer_closed_at",
    "accountant_closed_by",
    "accountant_status",
    "accountant_closed_at",
];

/// Export every ticket into `<dir>/<unix-timestamp>.csv` and return the path.
pub fn export_all_tickets(db: &Database, dir: &Path, tz: FixedOffset) -> Result<PathBuf> {
    let tickets = db.list_all()?;

    let mut out = String::new();
    out.push_str(&HEADER.join(","));
    out.push('\n');
    for ticket in &tickets {
        out.push_str(&ticket_row(ticket, tz));
        out.push('\n');
    }

    let path = dir.join(format!("{}.csv", Utc::now().timestamp()));
    fs::write(&path, out).context("Failed to write report file")?;
    Ok(path)
}

fn ticket_row(ticket: &Ticket, tz: FixedOffset) -> String {
    let fields = [
        ticket.id.to_string(),
        format_timestamp(ticket.created_at, tz),
        ticket.full_name.clone(),
        ticket.phone.clone(),
        ticket.machine_number.clone(),
        ticket.engineer.closed_by.clone().unwrap_or_default(),
        ticket.engineer.status.to_string(),
        ticket
            .engineer
            .closed_at
            .map(|dt| format_timestamp(dt, tz))
            .unwrap_or_default(),
        ticket.accountant.closed_by.clone().unwrap_or_default(),
        ticket.accountant.status.to_string(),
        ticket
            .accountant
            .closed_at
            .map(|dt| format_timestamp(dt, tz))
            .unwrap_or_default(),
    ];
    fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Display-timezone wall time, offset marker stripped.
fn format_timestamp(dt: DateTime<Utc>, tz: FixedOffset) -> String {
    dt.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S").to_string()
}

fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}
