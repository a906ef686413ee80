//! Offset-bounded access to dataset payloads.
//!
//! Applications build a transmit payload, or take a received one apart, one
//! field at a time: each call copies a value into or out of the payload at an
//! offset and hands back where the next field starts. The same contract is
//! used by [`TxDataset`](crate::transmitter::TxDataset) and
//! [`Receiver`](crate::receiver::Receiver), so a payload layout written on one
//! end can be read back with the mirror sequence of calls on the other.
//!
//! ```rust
//! use biphase_link::buffer::{BufferAccess, TransferResult};
//! use biphase_link::transmitter::TxDataset;
//!
//! let mut payload = [0u8; 6];
//! let mut dataset = TxDataset::new(&mut payload, 7, 6).unwrap();
//! let next = dataset.write_value(0, 21.5f32);
//! assert_eq!(next, TransferResult::Next(4));
//! assert_eq!(dataset.write_value(4, 1013u16), TransferResult::End);
//! ```

use crate::consts::{TRANSFER_END, TRANSFER_FAILED};

/// Outcome of a buffer transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum TransferResult {
    /// The copy succeeded; the next field starts at this offset.
    Next(u8),
    /// The copy succeeded and ended exactly at the end of the payload.
    End,
    /// Nothing was copied: the range was empty or ran past the payload.
    OutOfRange,
}

impl TransferResult {
    /// The single-byte code older firmware expects: the next offset,
    /// [`TRANSFER_END`] or [`TRANSFER_FAILED`].
    pub const fn raw(self) -> u8 {
        match self {
            TransferResult::Next(next) => next,
            TransferResult::End => TRANSFER_END,
            TransferResult::OutOfRange => TRANSFER_FAILED,
        }
    }

    /// `true` unless the transfer was rejected.
    pub const fn is_ok(self) -> bool {
        !matches!(self, TransferResult::OutOfRange)
    }
}

impl From<TransferResult> for u8 {
    fn from(result: TransferResult) -> Self {
        result.raw()
    }
}

/// Direction and data of a transfer, seen from the caller.
#[derive(Debug)]
pub enum Transfer<'a> {
    /// Copy these bytes into the payload.
    Write(&'a [u8]),
    /// Fill this slice from the payload.
    Read(&'a mut [u8]),
}

impl Transfer<'_> {
    /// Number of bytes to move.
    pub fn scope(&self) -> usize {
        match self {
            Transfer::Write(src) => src.len(),
            Transfer::Read(dst) => dst.len(),
        }
    }
}

/// Copies `data` into or out of `buf` starting at `offset`.
///
/// # Returns
/// - [`TransferResult::End`] when `offset + scope == buf.len()`
/// - [`TransferResult::OutOfRange`] when `scope` is zero or exceeds the space left
/// - [`TransferResult::Next`] with `offset + scope` otherwise
pub fn transfer(buf: &mut [u8], offset: u8, data: Transfer<'_>) -> TransferResult {
    let start = offset as usize;
    let scope = data.scope();
    let remaining = match buf.len().checked_sub(start) {
        Some(remaining) => remaining,
        None => return TransferResult::OutOfRange,
    };
    if scope == 0 || scope > remaining {
        return TransferResult::OutOfRange;
    }
    let end = start + scope;
    let next = if end == buf.len() {
        TransferResult::End
    } else {
        match u8::try_from(end) {
            Ok(next) => TransferResult::Next(next),
            Err(_) => return TransferResult::OutOfRange,
        }
    };
    match data {
        Transfer::Write(src) => buf[start..end].copy_from_slice(src),
        Transfer::Read(dst) => dst.copy_from_slice(&buf[start..end]),
    }
    next
}

/// A plain value that can be stored in a payload, little-endian.
pub trait Field: Copy {
    /// Encoded width in bytes.
    const SIZE: usize;

    /// Writes the value into the first [`Self::SIZE`] bytes of `out`.
    fn put(self, out: &mut [u8]);

    /// Reads a value from the first [`Self::SIZE`] bytes of `bytes`.
    fn get(bytes: &[u8]) -> Self;
}

macro_rules! impl_field {
    ( $( $t:ty ),* ) => {
        $(
            impl Field for $t {
                const SIZE: usize = size_of::<$t>();

                fn put(self, out: &mut [u8]) {
                    out[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
                }

                fn get(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; size_of::<$t>()];
                    raw.copy_from_slice(&bytes[..Self::SIZE]);
                    <$t>::from_le_bytes(raw)
                }
            }
        )*
    };
}

impl_field!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

const MAX_FIELD_SIZE: usize = 8;

/// The shared read/write contract for dataset payloads.
pub trait BufferAccess {
    /// Copies bytes into or out of the payload. See [`transfer`].
    fn buffer_transfer(&mut self, offset: u8, data: Transfer<'_>) -> TransferResult;

    /// Stores `value` at `offset`.
    fn write_value<T: Field>(&mut self, offset: u8, value: T) -> TransferResult {
        let mut raw = [0u8; MAX_FIELD_SIZE];
        value.put(&mut raw);
        self.buffer_transfer(offset, Transfer::Write(&raw[..T::SIZE]))
    }

    /// Loads the value at `offset` into `value`, which is left untouched on failure.
    fn read_value<T: Field>(&mut self, offset: u8, value: &mut T) -> TransferResult {
        let mut raw = [0u8; MAX_FIELD_SIZE];
        let result = self.buffer_transfer(offset, Transfer::Read(&mut raw[..T::SIZE]));
        if result.is_ok() {
            *value = T::get(&raw);
        }
        result
    }
}

impl BufferAccess for [u8] {
    fn buffer_transfer(&mut self, offset: u8, data: Transfer<'_>) -> TransferResult {
        transfer(self, offset, data)
    }
}
