//! Timer and interrupt plumbing for the link engines.
//!
//! The engines never touch hardware registers. Instead they talk to two small
//! seams that the platform implements:
//!
//! - [`HalfSymbolTimer`]: the periodic timer whose interrupt calls
//!   [`Transmitter::tick`](crate::transmitter::Transmitter::tick)
//! - [`EdgeInterrupt`]: the pin-change interrupt whose handler calls
//!   [`Receiver::on_edge`](crate::receiver::Receiver::on_edge)
//!
//! Contains helpers for both scheduling styles:
//! - [`TimerConfig`]: prescaler and compare value for an 8-bit AVR timer in CTC mode
//! - `transmit_blocking`: drives a transmission with a `DelayNs` (feature `delay-loop`)
//! - `global_transmitter_tick`, `global_receiver_edge` and the `declare_link!`,
//!   `tick_transmitter!`, `edge_receiver!` macros: critical-section singletons for
//!   interrupt handlers (feature `timer-isr`)
//!
//! Prescalers available on an 8-bit AVR Timer2 and the half-symbol period range they
//! cover at 16 MHz:
//!
//! | CS2 | PRESCALER | Half-symbol range |
//! |-----|-----------|-------------------|
//! |   1 |         1 |   0.06 – 16 µs    |
//! |   2 |         8 |    0.5 – 128 µs   |
//! |   3 |        32 |      2 – 512 µs   |
//! |   4 |        64 |      4 – 1024 µs  |
//! |   5 |       128 |      8 – 2048 µs  |
//! |   6 |       256 |     16 – 4096 µs  |
//! |   7 |      1024 |     64 – 16384 µs |

use libm::roundf;

use crate::config::ByteRate;
use crate::consts::HALF_SYMBOLS_PER_BYTE;

#[cfg(feature = "delay-loop")]
mod delay;
#[cfg_attr(feature = "delay-loop", allow(unused_imports))]
#[cfg(feature = "delay-loop")]
pub use delay::*;

#[cfg(feature = "timer-isr")]
mod isr;
#[cfg_attr(feature = "timer-isr", allow(unused_imports))]
#[cfg(feature = "timer-isr")]
pub use isr::*;

#[cfg(feature = "timer-isr")]
mod macros;

/// The periodic timer that paces the transmitter, one interrupt per half-symbol.
pub trait HalfSymbolTimer {
    /// Resets the counter and enables the compare interrupt.
    fn start(&mut self);
    /// Stops the timer.
    fn stop(&mut self);
}

/// A free-running tick source, such as a delay loop, that needs no arming.
impl HalfSymbolTimer for () {
    fn start(&mut self) {}
    fn stop(&mut self) {}
}

/// The pin-change interrupt feeding the receiver.
pub trait EdgeInterrupt {
    /// Attaches the interrupt on both edges.
    fn listen(&mut self);
    /// Detaches the interrupt.
    fn unlisten(&mut self);
}

/// For edges delivered by polling or by a test harness.
impl EdgeInterrupt for () {
    fn listen(&mut self) {}
    fn unlisten(&mut self) {}
}

/// Prescaler divisors, indexed by clock-select code minus one.
pub const TIMER2_PRESCALERS: [u32; 7] = [1, 8, 32, 64, 128, 256, 1024];

/// Register values for an 8-bit timer in clear-on-compare mode.
///
/// Only [`for_byte_rate`](TimerConfig::for_byte_rate) builds one, so the
/// clock-select code always names a real prescaler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct TimerConfig {
    clock_select: u8,
    compare: u8,
    f_cpu: u32,
}

impl TimerConfig {
    /// Picks the smallest prescaler whose half-symbol count fits in 8 bits.
    ///
    /// # Arguments
    /// - `f_cpu`: CPU frequency in Hz
    /// - `rate`: the link byte rate
    ///
    /// # Returns
    /// `None` if even the largest prescaler cannot reach the period.
    pub const fn for_byte_rate(f_cpu: u32, rate: ByteRate) -> Option<Self> {
        let counts = f_cpu / (HALF_SYMBOLS_PER_BYTE * rate.get() as u32);
        let mut i = 0;
        while i < TIMER2_PRESCALERS.len() {
            let scaled = counts / TIMER2_PRESCALERS[i];
            if scaled >= 1 && scaled <= 0x100 {
                return Some(Self {
                    clock_select: i as u8 + 1,
                    compare: (scaled - 1) as u8,
                    f_cpu,
                });
            }
            i += 1;
        }
        None
    }

    /// Clock-select bits (`CS2x`), `1..=7`.
    pub const fn clock_select(&self) -> u8 {
        self.clock_select
    }

    /// Compare register value (`OCR2A`); the timer period is `compare + 1` counts.
    pub const fn compare(&self) -> u8 {
        self.compare
    }

    /// CPU clock the values were computed for.
    pub const fn f_cpu(&self) -> u32 {
        self.f_cpu
    }

    /// The prescaler divisor selected by [`Self::clock_select`].
    pub const fn prescaler(&self) -> u32 {
        TIMER2_PRESCALERS[(self.clock_select - 1) as usize]
    }

    /// Real half-symbol period in microseconds, rounded.
    pub fn half_symbol_us(&self) -> u32 {
        let counts = self.prescaler() * (self.compare as u32 + 1);
        roundf(counts as f32 * 1_000_000.0 / self.f_cpu as f32) as u32
    }

    /// The byte rate the hardware will really produce.
    pub fn effective_byte_rate(&self) -> f32 {
        let counts = self.prescaler() * (self.compare as u32 + 1) * HALF_SYMBOLS_PER_BYTE;
        self.f_cpu as f32 / counts as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const F_CPU: u32 = 16_000_000;

    fn rate(r: u8) -> ByteRate {
        ByteRate::new(r).unwrap()
    }

    #[test]
    fn test_slowest_rate_uses_largest_prescaler() {
        // 16 MHz / (16 * 4) = 250000 counts; / 1024 = 244
        let config = TimerConfig::for_byte_rate(F_CPU, rate(4)).unwrap();
        assert_eq!(config.clock_select(), 7);
        assert_eq!(config.prescaler(), 1024);
        assert_eq!(config.compare(), 243);
    }

    #[test]
    fn test_ten_bytes_per_second() {
        // 100000 counts; /256 = 390 too big, /1024 = 97
        let config = TimerConfig::for_byte_rate(F_CPU, rate(10)).unwrap();
        assert_eq!(config.prescaler(), 1024);
        assert_eq!(config.compare(), 96);
        assert_eq!(config.half_symbol_us(), 6208);
    }

    #[test]
    fn test_fastest_rate() {
        // 3921 counts; /8 = 490, /32 = 122
        let config = TimerConfig::for_byte_rate(F_CPU, rate(255)).unwrap();
        assert_eq!(config.prescaler(), 32);
        assert_eq!(config.compare(), 121);
    }

    #[test]
    fn test_effective_rate_is_close() {
        for r in [4u8, 10, 50, 100, 200, 255] {
            let config = TimerConfig::for_byte_rate(F_CPU, rate(r)).unwrap();
            let effective = config.effective_byte_rate();
            let error = (effective - r as f32).abs() / r as f32;
            assert!(error < 0.02, "rate {r}: effective {effective}");
        }
    }

    #[test]
    fn test_every_rate_has_valid_registers() {
        for r in 4..=255u8 {
            let config = TimerConfig::for_byte_rate(F_CPU, rate(r)).unwrap();
            assert!((1..=7).contains(&config.clock_select()), "rate {r}");
            assert_eq!(config.f_cpu(), F_CPU);
            let index = config.clock_select() as usize - 1;
            assert_eq!(config.prescaler(), TIMER2_PRESCALERS[index]);
        }
    }

    #[test]
    fn test_unreachable_period() {
        // 1 GHz is too fast for a 4 B/s half-symbol even at /1024
        assert!(TimerConfig::for_byte_rate(1_000_000_000, rate(4)).is_none());
    }
}
