//! The checksum used on both ends of the link.
//!
//! A Dallas/Maxim style CRC-8: polynomial `0x31` processed LSB first (so the
//! reflected constant `0x8c` is used), seed `0`, no final XOR. The identifier
//! byte is folded in first, then the payload, matching the order the bytes
//! appear on the wire after the sync bits.

const POLY_REFLECTED: u8 = 0x8c;

/// Folds a single byte into the running CRC value.
pub fn crc8_update(crc: u8, data: u8) -> u8 {
    let mut crc = crc ^ data;
    for _ in 0..8 {
        crc = if crc & 0x01 != 0 {
            (crc >> 1) ^ POLY_REFLECTED
        } else {
            crc >> 1
        };
    }
    crc
}

/// Computes the frame checksum over `id` followed by every byte of `data`.
pub fn checksum8(id: u8, data: &[u8]) -> u8 {
    data.iter().fold(crc8_update(0, id), |crc, &b| crc8_update(crc, b))
}
