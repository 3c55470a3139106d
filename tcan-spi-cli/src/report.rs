//! Record output
//!
//! Writes decoded records as text lines or JSON Lines.

use crate::config::OutputFormat;
use anyhow::Result;
use std::io::Write;
use tcan_spi_decoder::{DecodedRecord, Timestamp};

/// Writes records to an output stream
pub struct ReportWriter<W: Write> {
    out: W,
    format: OutputFormat,
    command_only: bool,
    written: usize,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(out: W, format: OutputFormat, command_only: bool) -> Self {
        Self {
            out,
            format,
            command_only,
            written: 0,
        }
    }

    /// Write one record
    pub fn write_record(&mut self, record: &DecodedRecord) -> Result<()> {
        let record = if self.command_only {
            strip_payload(record)
        } else {
            record.clone()
        };

        match self.format {
            OutputFormat::Text => writeln!(self.out, "{}", format_text(&record, self.command_only))?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, &record)?;
                writeln!(self.out)?;
            }
        }

        self.written += 1;
        Ok(())
    }

    /// Flush and return the number of records written
    pub fn finish(mut self) -> Result<usize> {
        self.out.flush()?;
        Ok(self.written)
    }
}

/// Drop payload and identifier from reads and writes
fn strip_payload(record: &DecodedRecord) -> DecodedRecord {
    let mut record = record.clone();
    if let DecodedRecord::Read(access) | DecodedRecord::Write(access) = &mut record {
        access.data.clear();
        access.id = None;
    }
    record
}

/// Format a timestamp as seconds with nanosecond resolution
pub fn format_timestamp(ns: Timestamp) -> String {
    format!("{}.{:09}", ns / 1_000_000_000, ns % 1_000_000_000)
}

fn format_text(record: &DecodedRecord, command_only: bool) -> String {
    let span = format!(
        "[{:>14} - {:>14}]",
        format_timestamp(record.start()),
        format_timestamp(record.end())
    );

    match record {
        DecodedRecord::Read(access) if command_only => {
            format!("{} Read {} ({})", span, access.address_hex(), access.name)
        }
        DecodedRecord::Write(access) if command_only => {
            format!("{} Write {} ({})", span, access.address_hex(), access.name)
        }
        _ => format!("{} {}", span, record),
    }
}
