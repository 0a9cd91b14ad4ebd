//! Text and JSON output for listings

use crate::commands::{CommandError, Listing};
use opsdeck_query::{FetchMode, ListControls};
use opsdeck_resources::{
    LogEntry, LogStats, RegisteredUser, TransferRequest, TransferStats, UserStats,
};
use serde::Serialize;
use std::io::Write;

/// A record that renders as one table row
pub trait Tabular {
    /// Column headers
    const HEADERS: &'static [&'static str];

    /// One cell per header
    fn cells(&self) -> Vec<String>;
}

/// A stats block that renders as `label: value` lines
pub trait Summary {
    /// Labelled values in display order
    fn summary(&self) -> Vec<(&'static str, String)>;
}

fn or_dash(value: Option<&str>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or("-").to_string()
}

impl Tabular for LogEntry {
    const HEADERS: &'static [&'static str] = &["ID", "TIME", "TYPE", "USER", "DETAIL"];

    fn cells(&self) -> Vec<String> {
        let detail = match (&self.old_status, &self.new_status) {
            (Some(old), Some(new)) => format!("{old} -> {new}"),
            _ => or_dash(self.message_text.as_deref()),
        };
        vec![
            self.id.clone(),
            self.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            self.kind.clone(),
            or_dash(self.user_name.as_deref().or(self.changed_by.as_deref())),
            detail,
        ]
    }
}

impl Summary for LogStats {
    fn summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("received messages", self.received_messages.to_string()),
            ("status changes", self.change_status.to_string()),
            ("bot actions", self.bot_actions.to_string()),
        ]
    }
}

impl Tabular for TransferRequest {
    const HEADERS: &'static [&'static str] = &["ID", "CREATED", "USER", "PLATFORM", "STATUS", "AMOUNT"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.created_at.format("%Y-%m-%d %H:%M").to_string(),
            self.username.clone(),
            self.platform.clone(),
            self.status.to_string(),
            self.amount()
                .map_or_else(|| "-".to_string(), |amount| format!("{amount:.2}")),
        ]
    }
}

impl Summary for TransferStats {
    fn summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("transfers", self.total_transfers.to_string()),
            ("total amount", format!("{:.2}", self.total_amount)),
            ("pending", format!("{} ({:.2})", self.pending, self.pending_amount)),
            ("processed", format!("{} ({:.2})", self.processed, self.processed_amount)),
            ("errors", format!("{} ({:.2})", self.error, self.error_amount)),
            ("average", format!("{:.2}", self.average_amount)),
            ("approval rate", format!("{:.1}%", self.approval_rate)),
        ]
    }
}

impl Tabular for RegisteredUser {
    const HEADERS: &'static [&'static str] = &["ID", "NAME", "USERNAME", "CHANNEL", "STATUS", "CREATED"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            or_dash(Some(&self.name)),
            or_dash(Some(&self.username)),
            or_dash(Some(&self.channel)),
            or_dash(Some(&self.status)),
            or_dash(self.created_at.as_deref()),
        ]
    }
}

impl Summary for UserStats {
    fn summary(&self) -> Vec<(&'static str, String)> {
        vec![("users", self.total.to_string())]
    }
}

/// Footer line describing where the listing stands
#[must_use]
pub fn footer(mode: FetchMode, controls: &ListControls, shown: usize, total: Option<u64>) -> String {
    let total = total.map_or_else(|| "?".to_string(), |t| t.to_string());
    match controls {
        ListControls::Paginated(c) => format!(
            "{mode} | page {}/{} | {shown} of {total}{}",
            c.current_page,
            c.total_pages.max(1),
            if c.has_next { " | more pages" } else { "" },
        ),
        ListControls::Infinite(c) => format!(
            "{mode} | {} page(s) loaded | {shown} of {total}{}",
            c.pages_loaded,
            if c.has_next { " | more available (--all)" } else { "" },
        ),
    }
}

/// Write a padded table, the summary block and the footer
pub fn write_text<R: Tabular, S: Summary>(
    out: &mut impl Write,
    listing: &Listing<R, S>,
) -> Result<(), CommandError> {
    let rows: Vec<Vec<String>> = listing.records.iter().map(Tabular::cells).collect();
    let mut widths: Vec<usize> = R::HEADERS.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let headers: Vec<String> = R::HEADERS.iter().map(|h| (*h).to_string()).collect();
    write_row(out, &headers, &widths)?;
    for row in &rows {
        write_row(out, row, &widths)?;
    }

    if let Some(stats) = &listing.stats {
        writeln!(out)?;
        for (label, value) in stats.summary() {
            writeln!(out, "{label}: {value}")?;
        }
    }

    writeln!(out)?;
    writeln!(
        out,
        "{}",
        footer(listing.mode, &listing.controls, listing.records.len(), listing.total_matching)
    )?;
    Ok(())
}

fn write_row(out: &mut impl Write, cells: &[String], widths: &[usize]) -> std::io::Result<()> {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    writeln!(out, "{}", line.join("  ").trim_end())
}

#[derive(Serialize)]
struct JsonListing<'a, R, S> {
    mode: FetchMode,
    total: Option<u64>,
    has_next: bool,
    records: &'a [R],
    stats: Option<&'a S>,
}

/// Write the listing as one JSON document
pub fn write_json<R: Serialize, S: Serialize>(
    out: &mut impl Write,
    listing: &Listing<R, S>,
) -> Result<(), CommandError> {
    let has_next = match listing.controls {
        ListControls::Paginated(c) => c.has_next,
        ListControls::Infinite(c) => c.has_next,
    };
    let doc = JsonListing {
        mode: listing.mode,
        total: listing.total_matching,
        has_next,
        records: &listing.records,
        stats: listing.stats.as_ref(),
    };
    serde_json::to_writer_pretty(&mut *out, &doc)?;
    writeln!(out)?;
    Ok(())
}
