//! Capture file parsers
//!
//! This module contains parsers for logic analyzer exports. Each parser
//! implements an iterator pattern over SpiEvent objects.

use crate::types::{Result, SpiEvent};
use std::path::Path;

pub mod saleae_csv;

// Re-export parser types
pub use saleae_csv::{SaleaeCsvParser, SaleaeEventIterator};

/// Common trait for all capture parsers
///
/// This trait provides a unified interface for reading different capture
/// formats. Each parser returns an iterator over SpiEvent objects.
pub trait CaptureParser: Iterator<Item = Result<SpiEvent>> + Sized {
    /// Open a capture file and return an iterator over SPI events
    fn parse(path: &Path) -> Result<Self>;
}
