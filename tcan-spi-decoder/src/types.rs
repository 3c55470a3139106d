//! Core types for the TCAN SPI decoder library
//!
//! This module defines the events the decoder consumes (chip-select edges and
//! byte transfers) and the records it emits when a transaction completes.

use serde::{Serialize, Serializer};
use std::fmt;

/// Timestamp type used throughout the decoder (nanoseconds from capture start)
pub type Timestamp = u64;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Errors that can occur during decoding
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to parse capture: {0}")]
    CaptureParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// SPI data line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Line {
    /// Controller to peripheral
    Mosi,
    /// Peripheral to controller
    Miso,
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Mosi => write!(f, "MOSI"),
            Line::Miso => write!(f, "MISO"),
        }
    }
}

/// A single event delivered by the bus capture front end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiEvent {
    /// Chip select asserted
    SessionStart { timestamp: Timestamp },

    /// One full-duplex byte slot while chip select is active
    Transfer {
        /// Start of the byte on the bus
        start: Timestamp,
        /// End of the byte on the bus
        end: Timestamp,
        /// Byte driven by the controller
        mosi: u8,
        /// Byte driven by the peripheral
        miso: u8,
    },

    /// Chip select deasserted
    SessionEnd { timestamp: Timestamp },
}

impl SpiEvent {
    /// Create a transfer event
    pub fn transfer(start: Timestamp, end: Timestamp, mosi: u8, miso: u8) -> Self {
        SpiEvent::Transfer {
            start,
            end,
            mosi,
            miso,
        }
    }

    /// Get the timestamp at which this event begins
    pub fn timestamp(&self) -> Timestamp {
        match self {
            SpiEvent::SessionStart { timestamp } => *timestamp,
            SpiEvent::Transfer { start, .. } => *start,
            SpiEvent::SessionEnd { timestamp } => *timestamp,
        }
    }

    /// Byte carried on `line`, if this is a transfer
    pub fn byte(&self, line: Line) -> Option<u8> {
        match (self, line) {
            (SpiEvent::Transfer { mosi, .. }, Line::Mosi) => Some(*mosi),
            (SpiEvent::Transfer { miso, .. }, Line::Miso) => Some(*miso),
            _ => None,
        }
    }
}

/// Transaction opcode (first header byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Opcode {
    Write,
    Read,
}

impl Opcode {
    /// Opcode byte for a register write
    pub const WRITE: u8 = 0x61;
    /// Opcode byte for a register read
    pub const READ: u8 = 0x41;

    /// Decode an opcode byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            Self::WRITE => Some(Opcode::Write),
            Self::READ => Some(Opcode::Read),
            _ => None,
        }
    }

    /// Line that carries the payload for this opcode
    pub fn data_line(&self) -> Line {
        match self {
            Opcode::Write => Line::Mosi,
            Opcode::Read => Line::Miso,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Write => write!(f, "Write"),
            Opcode::Read => write!(f, "Read"),
        }
    }
}

/// A completed register read or write
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisterAccess {
    /// Register address
    #[serde(serialize_with = "serialize_address")]
    pub address: u16,
    /// Mnemonic from the register directory, or "unknown"
    pub name: &'static str,
    /// Header word count (payload is four bytes per word)
    pub word_count: u8,
    /// Payload as uppercase hex, two digits per byte in arrival order
    pub data: String,
    /// Identifier extracted from a transmit buffer write
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    /// Start of the highlighted span
    pub start: Timestamp,
    /// End of the last payload byte
    pub end: Timestamp,
}

impl RegisterAccess {
    /// Register address as four uppercase hex digits
    pub fn address_hex(&self) -> String {
        format!("{:04X}", self.address)
    }

    /// Number of payload bytes
    pub fn byte_count(&self) -> usize {
        self.data.len() / 2
    }
}

fn serialize_address<S: Serializer>(address: &u16, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:04X}", address))
}

/// Which timing limit a violation refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingLimit {
    /// Chip select asserted to first byte start (tCSA_B)
    CsToFirstByte,
    /// Previous byte end to next byte start (tB_B)
    ByteToByte,
    /// Last byte end to chip select deasserted (tB_CSIA)
    LastByteToCs,
}

impl fmt::Display for TimingLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimingLimit::CsToFirstByte => write!(f, "CS to first byte"),
            TimingLimit::ByteToByte => write!(f, "byte to byte"),
            TimingLimit::LastByteToCs => write!(f, "last byte to CS"),
        }
    }
}

/// A measured interval that exceeded its configured maximum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimingViolation {
    pub limit: TimingLimit,
    /// Measured interval in nanoseconds
    pub delta_ns: u64,
    /// Configured maximum in nanoseconds
    pub max_ns: u64,
    pub start: Timestamp,
    pub end: Timestamp,
}

/// Main decoded record type - the primary output of the decoder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum DecodedRecord {
    /// A byte in opcode position that is neither READ nor WRITE
    CommandError {
        /// The offending byte
        byte: u8,
        start: Timestamp,
        end: Timestamp,
    },

    /// A completed register read
    Read(RegisterAccess),

    /// A completed register write
    Write(RegisterAccess),

    /// A timing limit was exceeded
    TimingViolation(TimingViolation),
}

impl DecodedRecord {
    /// Get the start timestamp of this record
    pub fn start(&self) -> Timestamp {
        match self {
            DecodedRecord::CommandError { start, .. } => *start,
            DecodedRecord::Read(access) | DecodedRecord::Write(access) => access.start,
            DecodedRecord::TimingViolation(violation) => violation.start,
        }
    }

    /// Get the end timestamp of this record
    pub fn end(&self) -> Timestamp {
        match self {
            DecodedRecord::CommandError { end, .. } => *end,
            DecodedRecord::Read(access) | DecodedRecord::Write(access) => access.end,
            DecodedRecord::TimingViolation(violation) => violation.end,
        }
    }

    /// Get the register access carried by a read or write result
    pub fn access(&self) -> Option<&RegisterAccess> {
        match self {
            DecodedRecord::Read(access) | DecodedRecord::Write(access) => Some(access),
            _ => None,
        }
    }
}

impl fmt::Display for DecodedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedRecord::CommandError { byte, .. } => {
                write!(f, "Error: unexpected data 0x{:02X}", byte)
            }
            DecodedRecord::Read(access) => {
                write!(f, "Read {} ({}) data={}", access.address_hex(), access.name, access.data)
            }
            DecodedRecord::Write(access) => {
                write!(f, "Write {} ({}) data={}", access.address_hex(), access.name, access.data)?;
                if let Some(id) = access.id {
                    write!(f, " id=0x{:03X}", id)?;
                }
                Ok(())
            }
            DecodedRecord::TimingViolation(violation) => write!(
                f,
                "Timing violation ({}): {} ns > {} ns",
                violation.limit, violation.delta_ns, violation.max_ns
            ),
        }
    }
}
