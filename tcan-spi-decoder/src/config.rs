//! Decoder configuration types
//!
//! This module defines the minimal configuration needed by the decoder library:
//! which records reach the caller and the limits for timing checks. Output
//! formatting is handled by the application layer.

use crate::types::DecodedRecord;
use serde::{Deserialize, Serialize};

/// Configuration for the decoder library
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Which records are surfaced
    #[serde(default)]
    pub filter: RecordFilter,

    /// Maximum intervals for timing checks
    #[serde(default)]
    pub timing: TimingLimits,
}

/// Record selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordFilter {
    /// Every transaction and command error
    #[default]
    All,
    /// Read results and command errors
    Read,
    /// Write results and command errors
    Write,
    /// Timing violations only
    TimingViolations,
}

/// Timing limits in nanoseconds (None = check disabled)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingLimits {
    /// Chip select asserted to first byte (tCSA_B)
    #[serde(default)]
    pub cs_to_first_byte_ns: Option<u64>,

    /// Byte end to next byte start (tB_B)
    #[serde(default)]
    pub byte_to_byte_ns: Option<u64>,

    /// Last byte end to chip select deasserted (tB_CSIA)
    #[serde(default)]
    pub last_byte_to_cs_ns: Option<u64>,
}

impl TimingLimits {
    /// True if no check is enabled
    pub fn is_empty(&self) -> bool {
        self.cs_to_first_byte_ns.is_none()
            && self.byte_to_byte_ns.is_none()
            && self.last_byte_to_cs_ns.is_none()
    }
}

impl DecoderConfig {
    /// Create a new decoder configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the record filter
    pub fn with_filter(mut self, filter: RecordFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Builder method: replace all timing limits
    pub fn with_timing(mut self, timing: TimingLimits) -> Self {
        self.timing = timing;
        self
    }

    /// Builder method: set the chip-select-to-first-byte limit
    pub fn with_cs_to_first_byte(mut self, max_ns: u64) -> Self {
        self.timing.cs_to_first_byte_ns = Some(max_ns);
        self
    }

    /// Builder method: set the byte-to-byte limit
    pub fn with_byte_to_byte(mut self, max_ns: u64) -> Self {
        self.timing.byte_to_byte_ns = Some(max_ns);
        self
    }

    /// Builder method: set the last-byte-to-chip-select limit
    pub fn with_last_byte_to_cs(mut self, max_ns: u64) -> Self {
        self.timing.last_byte_to_cs_ns = Some(max_ns);
        self
    }

    /// Check if a record should reach the caller
    pub fn should_emit(&self, record: &DecodedRecord) -> bool {
        match (self.filter, record) {
            (RecordFilter::TimingViolations, DecodedRecord::TimingViolation(_)) => true,
            (RecordFilter::TimingViolations, _) => false,
            (_, DecodedRecord::TimingViolation(_)) => false,
            (_, DecodedRecord::CommandError { .. }) => true,
            (RecordFilter::All, _) => true,
            (RecordFilter::Read, DecodedRecord::Read(_)) => true,
            (RecordFilter::Write, DecodedRecord::Write(_)) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RegisterAccess, TimingLimit, TimingViolation};

    fn access() -> RegisterAccess {
        RegisterAccess {
            address: 0x1000,
            name: "MCAN_CREL",
            word_count: 0,
            data: String::new(),
            id: None,
            start: 0,
            end: 0,
        }
    }

    fn records() -> [DecodedRecord; 4] {
        [
            DecodedRecord::Read(access()),
            DecodedRecord::Write(access()),
            DecodedRecord::CommandError { byte: 0, start: 0, end: 0 },
            DecodedRecord::TimingViolation(TimingViolation {
                limit: TimingLimit::ByteToByte,
                delta_ns: 2,
                max_ns: 1,
                start: 0,
                end: 2,
            }),
        ]
    }

    fn emitted(config: &DecoderConfig) -> Vec<bool> {
        records().iter().map(|r| config.should_emit(r)).collect()
    }

    #[test]
    fn test_decoder_config_builder() {
        let config = DecoderConfig::new()
            .with_filter(RecordFilter::TimingViolations)
            .with_cs_to_first_byte(100)
            .with_byte_to_byte(500)
            .with_last_byte_to_cs(200);

        assert_eq!(config.filter, RecordFilter::TimingViolations);
        assert_eq!(config.timing.cs_to_first_byte_ns, Some(100));
        assert_eq!(config.timing.byte_to_byte_ns, Some(500));
        assert_eq!(config.timing.last_byte_to_cs_ns, Some(200));
        assert!(!config.timing.is_empty());
        assert!(DecoderConfig::new().timing.is_empty());
    }

    #[test]
    fn test_filter_logic() {
        // Read, Write, CommandError, TimingViolation
        assert_eq!(emitted(&DecoderConfig::new()), vec![true, true, true, false]);
        assert_eq!(
            emitted(&DecoderConfig::new().with_filter(RecordFilter::Read)),
            vec![true, false, true, false]
        );
        assert_eq!(
            emitted(&DecoderConfig::new().with_filter(RecordFilter::Write)),
            vec![false, true, true, false]
        );
        assert_eq!(
            emitted(&DecoderConfig::new().with_filter(RecordFilter::TimingViolations)),
            vec![false, false, false, true]
        );
    }

    #[test]
    fn test_serde_defaults() {
        let config: DecoderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, DecoderConfig::default());

        let config: DecoderConfig = serde_json::from_str(
            r#"{"filter": "timing_violations", "timing": {"byte_to_byte_ns": 250}}"#,
        )
        .unwrap();
        assert_eq!(config.filter, RecordFilter::TimingViolations);
        assert_eq!(config.timing.byte_to_byte_ns, Some(250));
        assert_eq!(config.timing.cs_to_first_byte_ns, None);
    }
}
