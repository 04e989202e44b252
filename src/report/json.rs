//! JSON report

use super::Summary;
use crate::analyzer::FileReport;
use chrono::Local;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    generator: &'static str,
    version: &'static str,
    generated_at: String,
    summary: Summary,
    files: &'a [FileReport],
}

pub fn write<W: Write>(writer: &mut W, reports: &[FileReport]) -> io::Result<()> {
    let report = JsonReport {
        generator: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        generated_at: Local::now().to_rfc3339(),
        summary: Summary::from_reports(reports),
        files: reports,
    };
    serde_json::to_writer_pretty(&mut *writer, &report).map_err(io::Error::other)?;
    writeln!(writer)
}
