//! Constants used across the link protocol implementation.
//!
//! This module defines the protocol-wide constants used for timing derivation,
//! frame layout, preamble control and buffer sizing. Both ends of a link must
//! agree on every value here; the protocol carries no negotiation.
//!
//! ## Key Concepts
//!
//! - **Half-symbol**: the smallest time unit on the wire. Every bit occupies two.
//! - **Header**: the identifier byte and the checksum byte that precede the payload.
//! - **Sync bits**: two `1` bits sent ahead of the header so the decoder's running
//!   symbol starts in a known state.
//! - **Thresholds**: edge intervals are classified against multiples of a quarter
//!   symbol (`T1`), all derived from the configured byte rate.

/// Lowest byte rate (bytes per second) either engine accepts.
pub const MIN_BYTE_RATE: u8 = 4;

/// Half-symbols per transmitted byte (8 bits, two half-symbols each).
pub const HALF_SYMBOLS_PER_BYTE: u32 = 16;

/// One second in microseconds, the unit of every edge timestamp.
pub const MICROS_PER_SECOND: u32 = 1_000_000;

/// Numerator for the half-symbol period: `MICROS_PER_SECOND / HALF_SYMBOLS_PER_BYTE`.
///
/// Divided by the byte rate this gives the half-symbol period in microseconds.
pub const HALF_SYMBOL_NUMERATOR_US: u32 = MICROS_PER_SECOND / HALF_SYMBOLS_PER_BYTE;

/// Numerator for `T1`, half of a half-symbol.
pub const QUARTER_SYMBOL_NUMERATOR_US: u32 = HALF_SYMBOL_NUMERATOR_US / 2;

/// `T2 = LONG_THRESHOLD_FACTOR * T1`. Intervals above this span two half-symbols.
pub const LONG_THRESHOLD_FACTOR: u32 = 3;

/// `T3 = MAX_INTERVAL_FACTOR * T1`. Intervals above this are framing violations.
pub const MAX_INTERVAL_FACTOR: u32 = 5;

/// Latency between the start of a frame and recognition of its identifier, in units of `T1`.
///
/// Subtracted from the edge timestamp that completes the identifier byte so that
/// the arrival timestamp refers to the start of the transmission.
pub const ARRIVAL_LATENCY_FACTOR: u32 = 44;

/// Number of half-symbols the carrier is held without an edge at the start of a frame.
pub const PREAMBLE_HALF_SYMBOLS: u8 = 3;

/// Clock-only edges the decoder must count before it accepts data edges.
pub const PREAMBLE_LOCK_EDGES: u8 = 1;

/// The sync field: two `1` bits, sent first.
pub const SYNC_BITS: u32 = 0b11;

/// Width of the sync field in bits.
pub const SYNC_BIT_COUNT: u8 = 2;

/// Header bits sent ahead of the payload: sync, identifier and checksum.
pub const FRAME_HEADER_BITS: u8 = SYNC_BIT_COUNT + 16;

/// Bytes stored in the receive buffer ahead of the payload (identifier and checksum).
pub const HEADER_LEN: u8 = 2;

/// See [`HEADER_LEN`](crate::consts::HEADER_LEN)
pub const HEADER_LEN_USIZE: usize = HEADER_LEN as usize;

/// Largest payload a single dataset may carry.
///
/// Zero is reserved as the "no transfer" size, which caps datasets at 255 bytes.
pub const MAX_DATASET_LEN: u8 = u8::MAX;

/// See [`MAX_DATASET_LEN`](crate::consts::MAX_DATASET_LEN)
pub const MAX_DATASET_LEN_USIZE: usize = MAX_DATASET_LEN as usize;

/// Capacity of the receive buffer in `no_std` builds: the largest dataset plus the header.
pub const RX_MAX_BUF_LEN_USIZE: usize = MAX_DATASET_LEN_USIZE + HEADER_LEN_USIZE;

/// Legacy raw code returned by a buffer transfer that exactly reached the end of the buffer.
pub const TRANSFER_END: u8 = 0xff;

/// Legacy raw code returned by a buffer transfer that was rejected.
pub const TRANSFER_FAILED: u8 = 0;
