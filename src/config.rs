//! Out-of-band link parameters.
//!
//! Both ends of a link must be configured with the same [`ByteRate`]; the
//! protocol carries no rate negotiation. Output polarity only concerns the
//! transmitter, since the line code is insensitive to wire inversion.

use core::fmt;

use crate::consts::MIN_BYTE_RATE;
use crate::encoding::LineTiming;
use crate::error::LinkError;

/// Gross transfer rate in bytes per second, bounded to `4..=255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct ByteRate(u8);

impl ByteRate {
    /// The slowest supported rate.
    pub const MIN: ByteRate = ByteRate(MIN_BYTE_RATE);
    /// The fastest supported rate.
    pub const MAX: ByteRate = ByteRate(u8::MAX);

    /// Validates a byte rate.
    ///
    /// # Errors
    /// [`LinkError::InvalidByteRate`] if `rate` is below 4.
    pub const fn new(rate: u8) -> Result<Self, LinkError> {
        if rate < MIN_BYTE_RATE {
            Err(LinkError::InvalidByteRate(rate))
        } else {
            Ok(ByteRate(rate))
        }
    }

    /// The rate in bytes per second.
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for ByteRate {
    type Error = LinkError;

    fn try_from(rate: u8) -> Result<Self, Self::Error> {
        ByteRate::new(rate)
    }
}

impl fmt::Display for ByteRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} B/s", self.0)
    }
}

/// Parameters shared by the two ends of a link, plus the transmitter's polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct LinkConfig {
    /// Gross transfer rate.
    pub byte_rate: ByteRate,
    /// The transmitter is keyed by driving its input low.
    pub active_low: bool,
}

impl LinkConfig {
    /// Creates an active-high configuration for `byte_rate`.
    pub const fn new(byte_rate: ByteRate) -> Self {
        Self {
            byte_rate,
            active_low: false,
        }
    }

    /// Sets the output polarity.
    pub const fn with_active_low(mut self, active_low: bool) -> Self {
        self.active_low = active_low;
        self
    }

    /// Timing thresholds derived from the byte rate.
    pub const fn timing(&self) -> LineTiming {
        LineTiming::new(self.byte_rate)
    }
}
