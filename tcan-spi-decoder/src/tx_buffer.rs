//! MCAN transmit buffer payload decoding
//!
//! Writes into the TX buffer element region (address high byte `0x84`) carry
//! an MCAN TX buffer element. Its first word (T0) holds the CAN identifier in
//! bits 28..0; a standard 11-bit identifier sits in bits 28..18.

use crate::types::{DecoderError, Result};
use byteorder::{BigEndian, ByteOrder};

/// Register address high byte of the TX buffer element region
pub const TX_BUFFER_ADDRESS_HIGH: u8 = 0x84;

/// Mask for the 29-bit identifier field of T0
const ID_MASK: u32 = 0x1FFF_FFFF;

/// Shift from the identifier field down to the standard identifier
const STANDARD_ID_SHIFT: u32 = 18;

/// Check whether a register address lies in the TX buffer element region
pub fn is_tx_buffer(address: u16) -> bool {
    (address >> 8) as u8 == TX_BUFFER_ADDRESS_HIGH
}

/// Extract the transmit identifier from a payload hex string
///
/// The first eight hex digits are read as a big-endian T0 word, masked to
/// 29 bits and shifted down by 18.
///
/// # Errors
/// * `DecoderError::InvalidInput` if the payload has fewer than eight hex
///   digits or any of them is not a hex digit
pub fn extract_tx_id(payload_hex: &str) -> Result<u32> {
    let t0 = payload_hex
        .get(..8)
        .ok_or_else(|| DecoderError::InvalidInput(format!(
            "TX buffer payload too short: {:?}",
            payload_hex
        )))?;

    // from_str_radix accepts a leading '+', so check the digits up front
    if !t0.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(DecoderError::InvalidInput(format!(
            "Non-hex TX buffer payload: {:?}",
            t0
        )));
    }

    let mut word = [0u8; 4];
    for (idx, byte) in word.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&t0[idx * 2..idx * 2 + 2], 16)
            .map_err(|e| DecoderError::InvalidInput(e.to_string()))?;
    }

    let raw = BigEndian::read_u32(&word);
    Ok((raw & ID_MASK) >> STANDARD_ID_SHIFT)
}
