//! Differential biphase line code.
//!
//! This module defines how bits become timed level changes on a single wire and
//! how the intervals between received edges become bits again. No clock line is
//! needed: the code guarantees an edge at least every second half-symbol, and
//! the receiver recovers the clock from the edges themselves.
//!
//! ## Encoding rules
//!
//! Every bit occupies two half-symbols. At the symbol boundary the level is
//! toggled only if the bit equals the previous bit; in the middle of the symbol
//! the level is always toggled. A bit that *differs* from its predecessor
//! therefore shows up as a single interval two half-symbols long, while equal
//! bits produce two single half-symbol intervals. Only changes carry
//! information, so the code survives an inverted wire.
//!
//! A frame starts with the carrier held for
//! [`PREAMBLE_HALF_SYMBOLS`](crate::consts::PREAMBLE_HALF_SYMBOLS) half-symbols,
//! followed by the sync field (`1, 1`), identifier, checksum and payload, all LSB first.
//! The previous-bit register starts at `0`, so the first sync bit suppresses the
//! boundary edge as well and the receiver sees a four half-symbol gap: a
//! guaranteed framing violation that resets any stale session.
//!
//! ## Decoding rules
//!
//! Intervals are classified against three thresholds derived from the byte rate
//! (see [`LineTiming`]). A long interval toggles the running symbol. After each
//! information-carrying edge the following short interval is the paired clock
//! edge and is suppressed (the debounce flag). One clock-only edge must be seen
//! before data is accepted; a long interval before that is a violation.
//!
//! ## Functions
//!
//! - [`frame_header`]: packs sync bits, identifier and checksum into one word
//! - [`LineTiming::classify`]: interval to [`IntervalClass`]
//! - [`BiphaseEncoder`]: half-symbol level generator used by the transmitter
//! - [`BiphaseDecoder`]: interval classes to bits, used by the receiver

use crate::config::ByteRate;
use crate::consts::{
    ARRIVAL_LATENCY_FACTOR, HALF_SYMBOL_NUMERATOR_US, LONG_THRESHOLD_FACTOR, MAX_INTERVAL_FACTOR,
    PREAMBLE_LOCK_EDGES, QUARTER_SYMBOL_NUMERATOR_US, SYNC_BIT_COUNT, SYNC_BITS,
};

/// Packs the frame header, ready to be shifted out LSB first.
///
/// Bit layout: `[1:0]` sync, `[9:2]` identifier, `[17:10]` checksum.
pub const fn frame_header(id: u8, checksum: u8) -> u32 {
    SYNC_BITS | ((id as u32) << SYNC_BIT_COUNT) | ((checksum as u32) << (SYNC_BIT_COUNT + 8))
}

/// Timing derived from a [`ByteRate`], all in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct LineTiming {
    /// Nominal half-symbol period; the transmit timer ticks at this interval.
    pub half_symbol_us: u32,
    /// `T1`: shortest valid interval.
    pub min_interval_us: u32,
    /// `T2`: intervals above this span two half-symbols.
    pub long_threshold_us: u32,
    /// `T3`: longest valid interval.
    pub max_interval_us: u32,
    /// Correction from identifier recognition back to frame start.
    pub arrival_latency_us: u32,
}

impl LineTiming {
    /// Derives the half-symbol period and classification thresholds.
    pub const fn new(rate: ByteRate) -> Self {
        let rate = rate.get() as u32;
        let t1 = QUARTER_SYMBOL_NUMERATOR_US / rate;
        Self {
            half_symbol_us: HALF_SYMBOL_NUMERATOR_US / rate,
            min_interval_us: t1,
            long_threshold_us: LONG_THRESHOLD_FACTOR * t1,
            max_interval_us: MAX_INTERVAL_FACTOR * t1,
            arrival_latency_us: ARRIVAL_LATENCY_FACTOR * t1,
        }
    }

    /// Classifies the time between two consecutive edges.
    pub const fn classify(&self, dt_us: u32) -> IntervalClass {
        if dt_us < self.min_interval_us || dt_us > self.max_interval_us {
            IntervalClass::Violation
        } else if dt_us > self.long_threshold_us {
            IntervalClass::Long
        } else {
            IntervalClass::Short
        }
    }
}

/// Band an edge interval falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum IntervalClass {
    /// Outside `[T1, T3]`: framing violation.
    Violation,
    /// One half-symbol.
    Short,
    /// Two half-symbols: the bit differs from the previous one.
    Long,
}

/// Generates the logical carrier level for each half-symbol of a frame.
///
/// The caller supplies one bit per pair of half-symbols; the encoder decides
/// whether the level toggles. `true` means carrier on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BiphaseEncoder {
    level: bool,
    prev_bit: bool,
}

impl BiphaseEncoder {
    /// An encoder at rest: carrier off, previous bit `0`.
    pub const fn new() -> Self {
        Self {
            level: false,
            prev_bit: false,
        }
    }

    /// Keys the carrier at the start of a frame and resets the previous bit.
    pub fn key(&mut self) -> bool {
        self.level = true;
        self.prev_bit = false;
        self.level
    }

    /// Current level.
    pub const fn level(&self) -> bool {
        self.level
    }

    /// First half of `bit`: the boundary edge is dropped when the bit changes.
    pub fn boundary(&mut self, bit: bool) -> bool {
        if bit == self.prev_bit {
            self.level = !self.level;
        }
        self.prev_bit = bit;
        self.level
    }

    /// Second half of the current bit: always an edge.
    pub fn mid(&mut self) -> bool {
        self.level = !self.level;
        self.level
    }

    /// Returns to idle, carrier off.
    pub fn release(&mut self) -> bool {
        self.level = false;
        self.level
    }
}

/// What a single edge contributed to the decoded stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Decoded {
    /// The interval was out of range or illegal during preamble; the decoder reset.
    Violation,
    /// A redundant clock edge that carried nothing.
    Clock,
    /// A clock-only edge counted towards preamble lock.
    Preamble,
    /// A data bit.
    Bit(bool),
}

/// Recovers bits from a stream of classified edge intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BiphaseDecoder {
    symbol: bool,
    debounce: bool,
    preamble: u8,
}

impl Default for BiphaseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl BiphaseDecoder {
    /// A decoder waiting for preamble; the running symbol matches the sync bits.
    pub const fn new() -> Self {
        Self {
            symbol: true,
            debounce: true,
            preamble: 0,
        }
    }

    /// Drops lock and returns to preamble acquisition.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// `true` once enough preamble edges have been counted.
    pub const fn locked(&self) -> bool {
        self.preamble >= PREAMBLE_LOCK_EDGES
    }

    /// Feeds one edge interval.
    pub fn feed(&mut self, class: IntervalClass) -> Decoded {
        let long = match class {
            IntervalClass::Violation => {
                self.reset();
                return Decoded::Violation;
            }
            IntervalClass::Short => false,
            IntervalClass::Long => true,
        };

        if !long && self.debounce {
            self.debounce = false;
            return Decoded::Clock;
        }
        self.debounce = true;

        if !self.locked() {
            if long {
                self.reset();
                return Decoded::Violation;
            }
            self.preamble += 1;
            return Decoded::Preamble;
        }

        if long {
            self.symbol = !self.symbol;
        }
        Decoded::Bit(self.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing(rate: u8) -> LineTiming {
        LineTiming::new(ByteRate::new(rate).unwrap())
    }

    #[test]
    fn test_thresholds_at_ten_bytes_per_second() {
        let t = timing(10);
        assert_eq!(t.half_symbol_us, 6250);
        assert_eq!(t.min_interval_us, 3125);
        assert_eq!(t.long_threshold_us, 9375);
        assert_eq!(t.max_interval_us, 15625);
        assert_eq!(t.arrival_latency_us, 44 * 3125);
    }

    #[test]
    fn test_classify_bands() {
        let t = timing(10);
        assert_eq!(t.classify(3124), IntervalClass::Violation);
        assert_eq!(t.classify(3125), IntervalClass::Short);
        assert_eq!(t.classify(6250), IntervalClass::Short);
        assert_eq!(t.classify(9375), IntervalClass::Short);
        assert_eq!(t.classify(9376), IntervalClass::Long);
        assert_eq!(t.classify(12500), IntervalClass::Long);
        assert_eq!(t.classify(15625), IntervalClass::Long);
        assert_eq!(t.classify(15626), IntervalClass::Violation);
        assert_eq!(t.classify(25000), IntervalClass::Violation);
    }

    #[test]
    fn test_nominal_intervals_classify_at_every_rate() {
        for rate in 4..=255u8 {
            let t = timing(rate);
            let h = t.half_symbol_us;
            assert_eq!(t.classify(h), IntervalClass::Short, "rate {rate}");
            assert_eq!(t.classify(2 * h), IntervalClass::Long, "rate {rate}");
            assert_eq!(t.classify(4 * h), IntervalClass::Violation, "rate {rate}");
        }
    }

    #[test]
    fn test_frame_header_layout() {
        let word = frame_header(0xa5, 0x3c);
        assert_eq!(word & 0b11, 0b11);
        assert_eq!((word >> 2) & 0xff, 0xa5);
        assert_eq!((word >> 10) & 0xff, 0x3c);
        assert_eq!(word >> 18, 0);
    }

    #[test]
    fn test_encoder_drops_boundary_edge_on_change() {
        let mut enc = BiphaseEncoder::new();
        assert!(enc.key());
        // previous bit is 0, first sync bit is 1: no boundary edge
        assert!(enc.boundary(true));
        assert!(!enc.mid());
        // second sync bit equal: boundary edge
        assert!(enc.boundary(true));
        assert!(!enc.mid());
        assert!(!enc.release());
    }

    #[test]
    fn test_decoder_needs_preamble_before_bits() {
        let mut dec = BiphaseDecoder::new();
        assert_eq!(dec.feed(IntervalClass::Short), Decoded::Clock);
        assert_eq!(dec.feed(IntervalClass::Short), Decoded::Preamble);
        assert!(dec.locked());
        assert_eq!(dec.feed(IntervalClass::Short), Decoded::Clock);
        assert_eq!(dec.feed(IntervalClass::Short), Decoded::Bit(true));
        assert_eq!(dec.feed(IntervalClass::Long), Decoded::Bit(false));
        assert_eq!(dec.feed(IntervalClass::Short), Decoded::Clock);
        assert_eq!(dec.feed(IntervalClass::Short), Decoded::Bit(false));
    }

    #[test]
    fn test_decoder_long_interval_in_preamble_is_violation() {
        let mut dec = BiphaseDecoder::new();
        assert_eq!(dec.feed(IntervalClass::Long), Decoded::Violation);
        assert!(!dec.locked());
    }

    #[test]
    fn test_decoder_violation_resets_lock() {
        let mut dec = BiphaseDecoder::new();
        let _ = dec.feed(IntervalClass::Short);
        let _ = dec.feed(IntervalClass::Short);
        assert!(dec.locked());
        assert_eq!(dec.feed(IntervalClass::Violation), Decoded::Violation);
        assert!(!dec.locked());
    }
}
