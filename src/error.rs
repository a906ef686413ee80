//! Error type shared by both engines.
//!
//! Only foreground operations return errors. Anything that goes wrong inside an
//! interrupt handler (framing violations, unknown identifiers, an undrained
//! result buffer) is handled by silently resetting the receive session.

use thiserror::Error;

use crate::receiver::RxStatus;

/// Failure of a foreground link operation.
///
/// Every operation that returns `Err` leaves the engine exactly as it was.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum LinkError {
    /// The byte rate is below [`MIN_BYTE_RATE`](crate::consts::MIN_BYTE_RATE).
    #[error("byte rate {0} is below the minimum of 4 bytes/s")]
    InvalidByteRate(u8),
    /// A receiver was initialised with no datasets.
    #[error("the dataset registry is empty")]
    EmptyRegistry,
    /// Two registry entries share an identifier.
    #[error("dataset id {0} is registered twice")]
    DuplicateId(u8),
    /// A dataset size of zero, or one larger than the backing memory.
    #[error("dataset size must be between 1 and 255 bytes and fit the payload")]
    InvalidDatasetSize,
    /// More than 255 registry entries; indices are a single byte.
    #[error("the dataset registry holds more than 255 entries")]
    RegistryTooLarge,
    /// The receiver already owns a buffer and registry.
    #[error("the receiver is already initialised")]
    AlreadyInitialized,
    /// The receiver has not been initialised.
    #[error("the receiver is not initialised")]
    NotInitialized,
    /// The receive buffer could not be allocated.
    #[error("failed to allocate the receive buffer")]
    AllocationFailed,
    /// A transmit session is already armed or running.
    #[error("a transmit session is already in progress")]
    Busy,
    /// The application asked for a status change it is not allowed to make.
    #[error("cannot move the receive status from {from:?} to {to:?}")]
    InvalidStatusTransition {
        /// Status at the time of the request.
        from: RxStatus,
        /// Requested status.
        to: RxStatus,
    },
}
