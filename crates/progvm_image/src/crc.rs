//! CRC-16/CCITT used by the image format.
//!
//! The same polynomial serves two purposes: the schema signature of the
//! well-known-globals layout stored in the header, and the whole-image
//! content checksum computed at load for diagnostics. Neither is a
//! security control.

const POLY: u16 = 0x1021;
const INIT: u16 = 0xffff;

/// Computes the CRC-16/CCITT of a byte slice.
#[must_use]
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = INIT;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 == 0 {
                crc << 1
            } else {
                (crc << 1) ^ POLY
            };
        }
    }
    crc
}
