//! Chip-select and inter-byte timing checks
//!
//! Measures three intervals per session and reports the ones that exceed the
//! configured maximum:
//! - chip select asserted to the start of the first byte
//! - end of a byte to the start of the next one
//! - end of the last byte to chip select deasserted

use crate::config::TimingLimits;
use crate::types::{DecodedRecord, SpiEvent, TimingLimit, TimingViolation, Timestamp};

/// Timing monitor for one decoding session
#[derive(Debug, Clone)]
pub struct TimingMonitor {
    limits: TimingLimits,
    /// When chip select was last asserted
    cs_asserted: Option<Timestamp>,
    /// End of the previous byte in the current session
    last_byte_end: Option<Timestamp>,
}

impl TimingMonitor {
    /// Create a monitor with the given limits
    pub fn new(limits: TimingLimits) -> Self {
        Self {
            limits,
            cs_asserted: None,
            last_byte_end: None,
        }
    }

    /// Observe one event and report a violation if a limit was exceeded
    pub fn handle_event(&mut self, event: &SpiEvent) -> Option<DecodedRecord> {
        match *event {
            SpiEvent::SessionStart { timestamp } => {
                self.cs_asserted = Some(timestamp);
                self.last_byte_end = None;
                None
            }
            SpiEvent::Transfer { start, end, .. } => {
                let violation = match self.last_byte_end {
                    Some(prev_end) => check(TimingLimit::ByteToByte, self.limits.byte_to_byte_ns, prev_end, start),
                    None => self.cs_asserted.and_then(|asserted| {
                        check(TimingLimit::CsToFirstByte, self.limits.cs_to_first_byte_ns, asserted, start)
                    }),
                };
                self.last_byte_end = Some(end);
                violation
            }
            SpiEvent::SessionEnd { timestamp } => {
                let violation = self.last_byte_end.and_then(|last_end| {
                    check(TimingLimit::LastByteToCs, self.limits.last_byte_to_cs_ns, last_end, timestamp)
                });
                self.cs_asserted = None;
                self.last_byte_end = None;
                violation
            }
        }
    }
}

/// Compare the interval `from..to` against `max_ns`
fn check(limit: TimingLimit, max_ns: Option<u64>, from: Timestamp, to: Timestamp) -> Option<DecodedRecord> {
    let max_ns = max_ns?;
    let delta_ns = to.saturating_sub(from);
    if delta_ns <= max_ns {
        return None;
    }

    log::debug!("Timing violation ({}): {} ns > {} ns at {} ns", limit, delta_ns, max_ns, from);
    Some(DecodedRecord::TimingViolation(TimingViolation {
        limit,
        delta_ns,
        max_ns,
        start: from,
        end: to,
    }))
}
