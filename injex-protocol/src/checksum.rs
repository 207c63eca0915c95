//! Two-sum packet checksum
//!
//! Two 8-bit running sums over the covered bytes:
//! - A: sum of all bytes
//! - B: sum of A after each addition
//!
//! The pair is packed as `(A << 8) | B` and transmitted A first.

use crate::PacketError;

/// Size of the checksum trailer in bytes
pub const CHECKSUM_LEN: usize = 2;

/// Calculate the checksum of a byte range
pub fn checksum(bytes: &[u8]) -> u16 {
    let mut sum_a: u8 = 0;
    let mut sum_b: u8 = 0;
    for &byte in bytes {
        sum_a = sum_a.wrapping_add(byte);
        sum_b = sum_b.wrapping_add(sum_a);
    }
    u16::from_be_bytes([sum_a, sum_b])
}

/// Write the checksum of `buffer[..len]` right after the covered bytes
///
/// Returns the total packet length including the checksum.
pub fn append_checksum(buffer: &mut [u8], len: usize) -> Result<usize, PacketError> {
    let total = len + CHECKSUM_LEN;
    if buffer.len() < total {
        return Err(PacketError::BufferTooSmall);
    }

    let sum = checksum(&buffer[..len]);
    buffer[len..total].copy_from_slice(&sum.to_be_bytes());
    Ok(total)
}

/// Verify a packet whose last two bytes are its checksum
pub fn verify_checksum(packet: &[u8]) -> Result<(), PacketError> {
    if packet.len() < CHECKSUM_LEN {
        return Err(PacketError::BufferTooSmall);
    }

    let (body, trailer) = packet.split_at(packet.len() - CHECKSUM_LEN);
    let expected = checksum(body).to_be_bytes();
    if trailer == expected {
        Ok(())
    } else {
        Err(PacketError::InvalidChecksum)
    }
}
