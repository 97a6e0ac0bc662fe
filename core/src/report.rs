//! Fixed-width provisioning table.
//!
//! ```text
//! ========================================================================================
//! SERIAL #     MAC             USER     PASSWORD       SUM_KEY
//! ~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~
//! 1098591-01   0cc47a000001    ADMIN    hunter2        ABCD-EFGH
//! ```

use std::io::{self, Write};

use scli_common::provisioning::{BatchResult, ProvisioningRecord};

pub const REPORT_WIDTH: usize = 88;

const SERIAL_WIDTH: usize = 12;
const MAC_WIDTH: usize = 15;
const USER_WIDTH: usize = 8;
const PASSWORD_WIDTH: usize = 14;

/// Writes the table for every record of `batch`, in serial order.
pub fn render<W: Write>(out: &mut W, batch: &BatchResult) -> io::Result<()> {
    let mut records: Vec<&ProvisioningRecord> = batch.records().iter().collect();
    records.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    writeln!(out, "{}", "=".repeat(REPORT_WIDTH))?;
    writeln!(
        out,
        "{}",
        row("SERIAL #", "MAC", "USER", "PASSWORD", "SUM_KEY")
    )?;
    writeln!(out, "{}", "~".repeat(REPORT_WIDTH))?;

    for record in records {
        writeln!(out, "{}", format_record(record))?;
    }

    Ok(())
}

pub fn format_record(record: &ProvisioningRecord) -> String {
    let serial = match record.node {
        Some(node) => format!("{}#{node}", record.serial.display_form()),
        None => record.serial.display_form(),
    };
    let key = record
        .license_key
        .as_ref()
        .map(|k| k.as_str())
        .unwrap_or_default();

    row(
        &serial,
        &record.mac.to_string(),
        record.user,
        &record.password.to_string(),
        key,
    )
}

fn row(serial: &str, mac: &str, user: &str, password: &str, key: &str) -> String {
    let line = format!(
        "{serial:<SERIAL_WIDTH$} {mac:<MAC_WIDTH$} {user:<USER_WIDTH$} {password:<PASSWORD_WIDTH$} {key}"
    );
    line.trim_end().to_string()
}
