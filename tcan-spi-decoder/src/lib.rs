//! TCAN SPI Decoder Library
//!
//! Decodes the SPI traffic between a host controller and a TCAN4x5x CAN
//! transceiver into register reads and writes.
//!
//! # Architecture
//!
//! This library is intentionally minimal and focused on decoding:
//! - Reassembles SPI byte transfers into transactions
//!   (opcode, register address, word count, payload)
//! - Resolves register addresses to mnemonics
//! - Extracts the CAN identifier from MCAN TX buffer writes
//! - Optionally checks chip-select and inter-byte timing
//! - Reads Saleae Logic 2 SPI analyzer CSV exports
//!
//! The library does NOT:
//! - Decode the electrical layer (the capture front end does that)
//! - Format or store records
//!
//! Output formatting is in the application layer (tcan-spi-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use tcan_spi_decoder::{Decoder, DecoderConfig, RecordFilter};
//! use std::path::Path;
//!
//! // Configure decoder
//! let config = DecoderConfig::new()
//!     .with_filter(RecordFilter::Write);
//!
//! // Decode capture file
//! let mut decoder = Decoder::new(config);
//! let records = decoder.decode_file(Path::new("capture.csv")).unwrap();
//!
//! for record in records {
//!     match record {
//!         Ok(decoded) => println!("{} at {} ns", decoded, decoded.start()),
//!         Err(e) => eprintln!("Decode error: {}", e),
//!     }
//! }
//! ```

// Public modules
pub mod config;
pub mod decoder;
pub mod formats;
pub mod registers;
pub mod state_machine;
pub mod timing;
pub mod tx_buffer;
pub mod types;

// Re-export main types for convenience
pub use config::{DecoderConfig, RecordFilter, TimingLimits};
pub use decoder::{Decoder, DecoderStats, DecodingIterator};
pub use formats::{CaptureParser, SaleaeCsvParser};
pub use state_machine::FrameStateMachine;
pub use timing::TimingMonitor;
pub use types::{
    DecodedRecord, DecoderError, Line, Opcode, RegisterAccess, Result, SpiEvent,
    TimingLimit, TimingViolation, Timestamp,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
