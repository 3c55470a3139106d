//! Frame reassembly state machine
//!
//! Reassembles the TCAN SPI framing from individual byte transfers:
//!
//! ```text
//! | opcode | addr high | addr low | word count | word count * 4 payload bytes |
//! ```
//!
//! The header is always read from MOSI. Write payload is read from MOSI and
//! read payload from MISO. A record is produced only when the last payload
//! byte arrives; partial transactions are dropped on chip-select edges.

use crate::registers;
use crate::tx_buffer;
use crate::types::{DecodedRecord, Line, Opcode, RegisterAccess, SpiEvent, Timestamp};
use std::fmt::Write;

/// A transaction whose header is complete and whose payload is being collected
#[derive(Debug, Clone)]
struct Transaction {
    opcode: Opcode,
    address: u16,
    name: &'static str,
    word_count: u8,
    /// Payload bytes still expected
    remaining: usize,
    /// Payload as uppercase hex
    data: String,
    start: Timestamp,
    end: Timestamp,
}

impl Transaction {
    fn into_record(self) -> DecodedRecord {
        let id = if self.opcode == Opcode::Write && tx_buffer::is_tx_buffer(self.address) {
            match tx_buffer::extract_tx_id(&self.data) {
                Ok(id) => Some(id),
                Err(e) => {
                    log::warn!("TX buffer write to {:04X} without identifier: {}", self.address, e);
                    None
                }
            }
        } else {
            None
        };

        let access = RegisterAccess {
            address: self.address,
            name: self.name,
            word_count: self.word_count,
            data: self.data,
            id,
            start: self.start,
            end: self.end,
        };

        match self.opcode {
            Opcode::Write => DecodedRecord::Write(access),
            Opcode::Read => DecodedRecord::Read(access),
        }
    }
}

/// Position within the frame
#[derive(Debug, Clone)]
enum FrameState {
    /// Waiting for an opcode byte
    Command,
    /// Opcode seen, waiting for the address high byte
    RegisterHigh { opcode: Opcode, start: Timestamp },
    /// Waiting for the address low byte
    RegisterLow {
        opcode: Opcode,
        start: Timestamp,
        high: u8,
    },
    /// Waiting for the word count
    WordCount {
        opcode: Opcode,
        start: Timestamp,
        address: u16,
    },
    /// Collecting payload bytes
    Data(Transaction),
}

/// Frame reassembly state machine for one decoding session
#[derive(Debug, Clone)]
pub struct FrameStateMachine {
    state: FrameState,
    /// Register address of the last completed transaction
    previous_register: Option<u16>,
}

impl FrameStateMachine {
    /// Create a state machine waiting for an opcode
    pub fn new() -> Self {
        Self {
            state: FrameState::Command,
            previous_register: None,
        }
    }

    /// Advance the state machine by one event
    ///
    /// Returns a record when a transaction completes or an opcode byte is
    /// rejected, and `None` otherwise.
    pub fn handle_event(&mut self, event: &SpiEvent) -> Option<DecodedRecord> {
        match *event {
            SpiEvent::SessionStart { timestamp } => {
                self.reset("chip select asserted", timestamp);
                None
            }
            SpiEvent::SessionEnd { timestamp } => {
                self.reset("chip select deasserted", timestamp);
                None
            }
            SpiEvent::Transfer {
                start,
                end,
                mosi,
                miso,
            } => self.handle_transfer(start, end, mosi, miso),
        }
    }

    /// Register address of the last completed transaction
    pub fn previous_register(&self) -> Option<u16> {
        self.previous_register
    }

    /// True while no transaction is partially assembled
    pub fn is_idle(&self) -> bool {
        matches!(self.state, FrameState::Command)
    }

    fn reset(&mut self, reason: &str, timestamp: Timestamp) {
        if !self.is_idle() {
            log::debug!("Dropping partial transaction at {} ns: {}", timestamp, reason);
        }
        self.state = FrameState::Command;
    }

    fn handle_transfer(
        &mut self,
        start: Timestamp,
        end: Timestamp,
        mosi: u8,
        miso: u8,
    ) -> Option<DecodedRecord> {
        match std::mem::replace(&mut self.state, FrameState::Command) {
            FrameState::Command => match Opcode::from_byte(mosi) {
                Some(opcode) => {
                    log::trace!("{} opcode at {} ns", opcode, start);
                    self.state = FrameState::RegisterHigh { opcode, start };
                    None
                }
                None => {
                    log::debug!("Unexpected data 0x{:02X} in opcode position at {} ns", mosi, start);
                    Some(DecodedRecord::CommandError {
                        byte: mosi,
                        start,
                        end,
                    })
                }
            },
            FrameState::RegisterHigh { opcode, start: frame_start } => {
                self.state = FrameState::RegisterLow {
                    opcode,
                    start: frame_start,
                    high: mosi,
                };
                None
            }
            FrameState::RegisterLow {
                opcode,
                start: frame_start,
                high,
            } => {
                self.state = FrameState::WordCount {
                    opcode,
                    start: frame_start,
                    address: u16::from_be_bytes([high, mosi]),
                };
                None
            }
            FrameState::WordCount {
                opcode,
                start: frame_start,
                address,
            } => {
                let name = registers::register_name(address);
                let remaining = mosi as usize * 4;
                log::trace!("{} {:04X} ({}), {} payload bytes", opcode, address, name, remaining);

                let transaction = Transaction {
                    opcode,
                    address,
                    name,
                    word_count: mosi,
                    remaining,
                    data: String::with_capacity(remaining * 2),
                    start: frame_start,
                    end,
                };

                if remaining == 0 {
                    self.complete(transaction)
                } else {
                    self.state = FrameState::Data(transaction);
                    None
                }
            }
            FrameState::Data(mut transaction) => {
                let byte = match transaction.opcode.data_line() {
                    Line::Mosi => mosi,
                    Line::Miso => miso,
                };

                // Writes highlight only the payload, reads the whole frame
                if transaction.opcode == Opcode::Write && transaction.data.is_empty() {
                    transaction.start = start;
                }

                // Writing to a String cannot fail
                let _ = write!(transaction.data, "{:02X}", byte);
                transaction.remaining -= 1;

                if transaction.remaining == 0 {
                    transaction.end = end;
                    self.complete(transaction)
                } else {
                    self.state = FrameState::Data(transaction);
                    None
                }
            }
        }
    }

    fn complete(&mut self, transaction: Transaction) -> Option<DecodedRecord> {
        self.previous_register = Some(transaction.address);
        self.state = FrameState::Command;
        Some(transaction.into_record())
    }
}

impl Default for FrameStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed MOSI bytes 10 ns apart, each 8 ns long, starting at `t0`
    fn feed(machine: &mut FrameStateMachine, t0: Timestamp, bytes: &[u8]) -> Vec<DecodedRecord> {
        bytes
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| {
                let start = t0 + i as u64 * 10;
                machine.handle_event(&SpiEvent::transfer(start, start + 8, b, 0x00))
            })
            .collect()
    }

    #[test]
    fn test_write_with_payload() {
        let mut machine = FrameStateMachine::new();
        machine.handle_event(&SpiEvent::SessionStart { timestamp: 0 });
        let records = feed(&mut machine, 100, &[0x61, 0x08, 0x04, 0x01, 0x11, 0x22, 0x33, 0x44]);

        assert_eq!(records.len(), 1);
        match &records[0] {
            DecodedRecord::Write(access) => {
                assert_eq!(access.address_hex(), "0804");
                assert_eq!(access.name, "TIMESTAMP_PRESCALER");
                assert_eq!(access.word_count, 1);
                assert_eq!(access.data, "11223344");
                assert_eq!(access.id, None);
                // Write start is pinned to the first payload byte
                assert_eq!(access.start, 140);
                assert_eq!(access.end, 178);
            }
            other => panic!("expected write, got {:?}", other),
        }
        assert!(machine.is_idle());
        assert_eq!(machine.previous_register(), Some(0x0804));
    }

    #[test]
    fn test_unlisted_address_resolves_unknown() {
        let mut machine = FrameStateMachine::new();
        let records = feed(&mut machine, 0, &[0x61, 0x08, 0x40, 0x01, 0x11, 0x22, 0x33, 0x44]);
        let access = records[0].access().unwrap();
        assert_eq!(access.address_hex(), "0840");
        assert_eq!(access.name, "unknown");
        assert_eq!(access.data, "11223344");
    }

    #[test]
    fn test_read_takes_payload_from_miso() {
        let mut machine = FrameStateMachine::new();
        let header = [0x41u8, 0x00, 0x00, 0x01];
        for (i, &b) in header.iter().enumerate() {
            let start = 50 + i as u64 * 10;
            assert!(machine.handle_event(&SpiEvent::transfer(start, start + 8, b, 0xEE)).is_none());
        }

        let miso = [0x4Du8, 0x43, 0x41, 0x4E];
        let mut records = Vec::new();
        for (i, &b) in miso.iter().enumerate() {
            let start = 90 + i as u64 * 10;
            records.extend(machine.handle_event(&SpiEvent::transfer(start, start + 8, 0x00, b)));
        }

        assert_eq!(records.len(), 1);
        match &records[0] {
            DecodedRecord::Read(access) => {
                assert_eq!(access.name, "DEVICE_ID0");
                assert_eq!(access.data, "4D43414E");
                // Read start is the opcode byte
                assert_eq!(access.start, 50);
                assert_eq!(access.end, 128);
            }
            other => panic!("expected read, got {:?}", other),
        }
    }

    #[test]
    fn test_two_words_payload_length() {
        let mut machine = FrameStateMachine::new();
        let mut bytes = vec![0x61, 0x10, 0x18, 0x02];
        bytes.extend(1..=8u8);
        let records = feed(&mut machine, 0, &bytes);

        assert_eq!(records.len(), 1);
        let access = records[0].access().unwrap();
        assert_eq!(access.word_count, 2);
        assert_eq!(access.data.len(), 16);
        assert_eq!(access.byte_count(), 8);
        assert_eq!(access.data, "0102030405060708");
        assert_eq!(access.name, "MCAN_CCCR");
    }

    #[test]
    fn test_zero_word_count_completes_immediately() {
        let mut machine = FrameStateMachine::new();
        let records = feed(&mut machine, 0, &[0x41, 0x00, 0x0C, 0x00]);

        assert_eq!(records.len(), 1);
        let access = records[0].access().unwrap();
        assert_eq!(access.data, "");
        assert_eq!(access.name, "STATUS");
        assert_eq!(access.start, 0);
        assert_eq!(access.end, 38);
        assert!(machine.is_idle());

        // The next byte is an opcode again
        let records = feed(&mut machine, 100, &[0x61, 0x00, 0x0C, 0x00]);
        assert!(matches!(records[0], DecodedRecord::Write(_)));
    }

    #[test]
    fn test_zero_word_count_write_keeps_opcode_start() {
        let mut machine = FrameStateMachine::new();
        let records = feed(&mut machine, 20, &[0x61, 0x84, 0x00, 0x00]);
        let access = records[0].access().unwrap();
        assert_eq!(access.start, 20);
        // Empty TX buffer payload cannot carry an identifier
        assert_eq!(access.id, None);
    }

    #[test]
    fn test_tx_buffer_write_extracts_id() {
        let mut machine = FrameStateMachine::new();
        let t0 = (0x123u32 << 18).to_be_bytes();
        let mut bytes = vec![0x61, 0x84, 0x00, 0x02];
        bytes.extend_from_slice(&t0);
        bytes.extend_from_slice(&[0x08, 0x00, 0x00, 0x00]);
        let records = feed(&mut machine, 0, &bytes);

        let access = records[0].access().unwrap();
        assert_eq!(access.address_hex(), "8400");
        assert_eq!(access.id, Some(0x123));
    }

    #[test]
    fn test_tx_buffer_read_has_no_id() {
        let mut machine = FrameStateMachine::new();
        let records = feed(&mut machine, 0, &[0x41, 0x84, 0x00, 0x01]);
        assert!(records.is_empty());

        let records: Vec<_> = (0..4)
            .filter_map(|i| machine.handle_event(&SpiEvent::transfer(100 + i * 10, 108 + i * 10, 0, 0xFF)))
            .collect();
        assert_eq!(records[0].access().unwrap().id, None);
    }

    #[test]
    fn test_unexpected_opcode_resynchronizes_on_next_byte() {
        let mut machine = FrameStateMachine::new();
        let records = feed(&mut machine, 0, &[0xFF, 0x41, 0x00, 0x08, 0x00]);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0], DecodedRecord::CommandError { byte: 0xFF, start: 0, end: 8 });
        let access = records[1].access().unwrap();
        assert_eq!(access.name, "REVISION");
        assert_eq!(access.start, 10);
    }

    #[test]
    fn test_session_start_discards_partial_transaction() {
        let mut machine = FrameStateMachine::new();
        assert!(feed(&mut machine, 0, &[0x61, 0x08, 0x04, 0x01, 0x11, 0x22]).is_empty());
        assert!(!machine.is_idle());

        assert!(machine.handle_event(&SpiEvent::SessionStart { timestamp: 200 }).is_none());
        assert!(machine.is_idle());

        // Remaining payload bytes of the dropped transaction are opcode attempts now
        let records = feed(&mut machine, 300, &[0x33, 0x44]);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| matches!(r, DecodedRecord::CommandError { .. })));
        assert_eq!(machine.previous_register(), None);
    }

    #[test]
    fn test_session_end_discards_partial_transaction() {
        let mut machine = FrameStateMachine::new();
        assert!(feed(&mut machine, 0, &[0x41, 0x10]).is_empty());
        assert!(machine.handle_event(&SpiEvent::SessionEnd { timestamp: 50 }).is_none());
        assert!(machine.is_idle());
    }

    #[test]
    fn test_back_to_back_transactions_in_one_session() {
        let mut machine = FrameStateMachine::new();
        machine.handle_event(&SpiEvent::SessionStart { timestamp: 0 });
        let records = feed(
            &mut machine,
            10,
            &[0x41, 0x10, 0x50, 0x00, 0x61, 0x10, 0x54, 0x01, 0xDE, 0xAD, 0xBE, 0xEF],
        );

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].access().unwrap().name, "MCAN_IR");
        assert_eq!(records[1].access().unwrap().name, "MCAN_IE");
        assert_eq!(records[1].access().unwrap().data, "DEADBEEF");
        assert_eq!(machine.previous_register(), Some(0x1054));
    }
}
