//! Main decoder API
//!
//! This module provides the primary interface for the decoder library.
//! A `Decoder` is one decoding session: it owns the frame state machine and
//! the timing monitor, applies the record filter and keeps session counters.

use crate::config::{DecoderConfig, RecordFilter};
use crate::formats::{CaptureParser, SaleaeEventIterator};
use crate::state_machine::FrameStateMachine;
use crate::timing::TimingMonitor;
use crate::types::{DecodedRecord, DecoderError, Result, SpiEvent};
use serde::Serialize;
use std::fs::File;
use std::path::Path;

/// Counters for one decoding session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecoderStats {
    /// Events consumed
    pub events: usize,
    /// Completed reads and writes
    pub transactions: usize,
    /// Bytes rejected in opcode position
    pub command_errors: usize,
    /// Timing limits exceeded
    pub timing_violations: usize,
    /// Records dropped by the filter
    pub filtered: usize,
}

impl DecoderStats {
    fn count(&mut self, record: &DecodedRecord) {
        match record {
            DecodedRecord::Read(_) | DecodedRecord::Write(_) => self.transactions += 1,
            DecodedRecord::CommandError { .. } => self.command_errors += 1,
            DecodedRecord::TimingViolation(_) => self.timing_violations += 1,
        }
    }
}

/// The main decoder struct - entry point for all decoding operations
pub struct Decoder {
    config: DecoderConfig,
    frames: FrameStateMachine,
    timing: TimingMonitor,
    stats: DecoderStats,
}

impl Decoder {
    /// Create a decoder for one session
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            timing: TimingMonitor::new(config.timing),
            frames: FrameStateMachine::new(),
            config,
            stats: DecoderStats::default(),
        }
    }

    /// Feed one event into the session
    ///
    /// Returns at most one record. In `TimingViolations` mode only timing
    /// records are surfaced; otherwise only transaction records are. The
    /// frame state machine runs in every mode.
    ///
    /// # Example
    /// ```
    /// use tcan_spi_decoder::{DecodedRecord, Decoder, DecoderConfig, SpiEvent};
    ///
    /// let mut decoder = Decoder::new(DecoderConfig::new());
    /// decoder.handle_event(&SpiEvent::SessionStart { timestamp: 0 });
    ///
    /// let bytes = [0x41, 0x00, 0x08, 0x00];
    /// let records: Vec<DecodedRecord> = bytes
    ///     .iter()
    ///     .enumerate()
    ///     .filter_map(|(i, &b)| {
    ///         let start = 100 + i as u64 * 10;
    ///         decoder.handle_event(&SpiEvent::transfer(start, start + 8, b, 0x00))
    ///     })
    ///     .collect();
    ///
    /// assert_eq!(records.len(), 1);
    /// assert_eq!(records[0].access().unwrap().name, "REVISION");
    /// ```
    pub fn handle_event(&mut self, event: &SpiEvent) -> Option<DecodedRecord> {
        self.stats.events += 1;

        let frame_record = self.frames.handle_event(event);
        let record = if self.config.filter == RecordFilter::TimingViolations {
            if let Some(ref r) = frame_record {
                self.stats.count(r);
                self.stats.filtered += 1;
            }
            self.timing.handle_event(event)
        } else {
            frame_record
        };
        let record = record?;

        self.stats.count(&record);
        if self.config.should_emit(&record) {
            log::trace!("{}", record);
            Some(record)
        } else {
            self.stats.filtered += 1;
            None
        }
    }

    /// Decode a stream of events
    ///
    /// Source errors are passed through; decoding continues with the next
    /// event.
    pub fn decode_events<I>(&mut self, events: I) -> DecodingIterator<'_, I::IntoIter>
    where
        I: IntoIterator<Item = Result<SpiEvent>>,
    {
        DecodingIterator {
            events: events.into_iter(),
            decoder: self,
        }
    }

    /// Decode a capture file and return an iterator of decoded records
    ///
    /// The capture format is chosen by extension; `.csv` is read as a Saleae
    /// Logic 2 SPI analyzer export.
    ///
    /// # Example
    /// ```no_run
    /// use tcan_spi_decoder::{Decoder, DecoderConfig};
    /// use std::path::Path;
    ///
    /// let mut decoder = Decoder::new(DecoderConfig::new());
    /// for record in decoder.decode_file(Path::new("capture.csv")).unwrap() {
    ///     match record {
    ///         Ok(record) => println!("{}", record),
    ///         Err(e) => eprintln!("Error: {}", e),
    ///     }
    /// }
    /// ```
    pub fn decode_file(
        &mut self,
        path: &Path,
    ) -> Result<DecodingIterator<'_, SaleaeEventIterator<File>>> {
        log::info!("Decoding capture file: {:?}", path);

        // Determine file type from extension
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());

        match extension.as_deref() {
            Some("csv") => {
                log::debug!("Detected Saleae CSV export");
                let events = SaleaeEventIterator::<File>::parse(path)?;
                Ok(self.decode_events(events))
            }
            _ => Err(DecoderError::CaptureParse(format!(
                "Unsupported capture format: {:?}",
                extension
            ))),
        }
    }

    /// Register address of the last completed transaction
    pub fn previous_register(&self) -> Option<u16> {
        self.frames.previous_register()
    }

    /// Counters for this session
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Configuration of this session
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new(DecoderConfig::default())
    }
}

/// Iterator that decodes SPI events into records
///
/// Events that do not complete a record are consumed silently.
pub struct DecodingIterator<'a, I>
where
    I: Iterator<Item = Result<SpiEvent>>,
{
    events: I,
    decoder: &'a mut Decoder,
}

impl<'a, I> Iterator for DecodingIterator<'a, I>
where
    I: Iterator<Item = Result<SpiEvent>>,
{
    type Item = Result<DecodedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.events.next()? {
                Ok(event) => {
                    if let Some(record) = self.decoder.handle_event(&event) {
                        return Some(Ok(record));
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
