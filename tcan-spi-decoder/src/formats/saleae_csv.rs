//! Saleae Logic 2 SPI analyzer CSV export parser
//!
//! Reads the table exported from the SPI analyzer's data view:
//!
//! ```text
//! name,type,start_time,duration,mosi,miso
//! SPI,enable,0.000100000,0,,
//! SPI,result,0.000100250,0.000000800,0x61,0x00
//! SPI,disable,0.000107000,0,,
//! ```
//!
//! ## Supported Frame Types
//! - `enable`: chip select asserted
//! - `result`: one byte on MOSI and MISO
//! - `disable`: chip select deasserted
//!
//! `start_time` may be seconds from capture start or an RFC 3339 timestamp.
//! Timestamps are rebased so the first supported row is at 0 ns. MOSI/MISO
//! values must be exported in hex; an empty cell reads as 0x00.

use super::CaptureParser;
use crate::types::{DecoderError, Result, SpiEvent, Timestamp};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Time column as exported: seconds or wall clock
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TimeValue {
    Seconds(f64),
    Text(String),
}

impl TimeValue {
    /// Convert to nanoseconds on the capture's own time axis
    fn to_nanos(&self) -> Result<i64> {
        match self {
            TimeValue::Seconds(secs) => Ok(seconds_to_nanos(*secs)),
            TimeValue::Text(text) => {
                if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
                    dt.timestamp_nanos_opt().ok_or_else(|| {
                        DecoderError::CaptureParse(format!("Timestamp out of range: {}", text))
                    })
                } else {
                    text.parse::<f64>().map(seconds_to_nanos).map_err(|e| {
                        DecoderError::CaptureParse(format!("Invalid start_time {:?}: {}", text, e))
                    })
                }
            }
        }
    }
}

fn seconds_to_nanos(secs: f64) -> i64 {
    (secs * 1e9).round() as i64
}

/// One row of the CSV export
#[derive(Debug, Clone, Deserialize)]
struct RawRow {
    #[serde(rename = "type")]
    frame_type: String,
    start_time: TimeValue,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    mosi: Option<String>,
    #[serde(default)]
    miso: Option<String>,
}

/// Saleae CSV parser
pub struct SaleaeCsvParser;

impl SaleaeCsvParser {
    /// Open a CSV export and return an iterator over SPI events
    pub fn parse(path: &Path) -> Result<SaleaeEventIterator<File>> {
        log::info!("Parsing Saleae CSV export: {:?}", path);

        if !path.exists() {
            return Err(DecoderError::CaptureParse(format!(
                "Capture file not found: {:?}",
                path
            )));
        }

        let file = File::open(path)?;
        Ok(Self::from_reader(file))
    }

    /// Read a CSV export from any reader
    pub fn from_reader<R: Read>(reader: R) -> SaleaeEventIterator<R> {
        let rows = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader)
            .into_deserialize();

        SaleaeEventIterator {
            rows,
            origin_ns: None,
            skipped_types: HashSet::new(),
        }
    }
}

/// Iterator over SPI events from a Saleae CSV export
pub struct SaleaeEventIterator<R: Read> {
    rows: csv::DeserializeRecordsIntoIter<R, RawRow>,
    /// Capture time of the first supported row
    origin_ns: Option<i64>,
    skipped_types: HashSet<String>,
}

impl<R: Read> SaleaeEventIterator<R> {
    /// Convert a row, or `None` for frame types that carry no SPI event
    fn convert(&mut self, row: RawRow) -> Result<Option<SpiEvent>> {
        let frame_type = row.frame_type.to_ascii_lowercase();
        if !matches!(frame_type.as_str(), "enable" | "result" | "disable") {
            if self.skipped_types.insert(frame_type.clone()) {
                log::warn!("Skipping unsupported SPI frame type {:?}", row.frame_type);
            }
            return Ok(None);
        }

        let start = self.rebase(row.start_time.to_nanos()?);

        let event = match frame_type.as_str() {
            "enable" => SpiEvent::SessionStart { timestamp: start },
            "disable" => SpiEvent::SessionEnd { timestamp: start },
            _ => {
                let duration = row
                    .duration
                    .map(|secs| seconds_to_nanos(secs).max(0) as u64)
                    .unwrap_or(0);
                SpiEvent::Transfer {
                    start,
                    end: start + duration,
                    mosi: parse_hex_byte(row.mosi.as_deref())?,
                    miso: parse_hex_byte(row.miso.as_deref())?,
                }
            }
        };

        Ok(Some(event))
    }

    fn rebase(&mut self, nanos: i64) -> Timestamp {
        let origin = *self.origin_ns.get_or_insert(nanos);
        nanos.saturating_sub(origin).max(0) as u64
    }
}

impl<R: Read> Iterator for SaleaeEventIterator<R> {
    type Item = Result<SpiEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let row = match self.rows.next()? {
                Ok(row) => row,
                Err(e) => return Some(Err(DecoderError::CaptureParse(e.to_string()))),
            };

            match self.convert(row) {
                Ok(Some(event)) => return Some(Ok(event)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

impl CaptureParser for SaleaeEventIterator<File> {
    fn parse(path: &Path) -> Result<Self> {
        SaleaeCsvParser::parse(path)
    }
}

/// Parse a byte cell (handles 0x prefix, empty reads as zero)
fn parse_hex_byte(cell: Option<&str>) -> Result<u8> {
    let s = cell.map(str::trim).unwrap_or("");
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);

    if digits.is_empty() {
        return Ok(0);
    }

    u8::from_str_radix(digits, 16)
        .map_err(|e| DecoderError::CaptureParse(format!("Invalid hex byte {:?}: {}", s, e)))
}
