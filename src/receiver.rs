//! Edge-driven frame receiver.
//!
//! The [`Receiver`] reconstructs frames from nothing but the timestamps of the
//! level changes on its input pin. The platform's pin-change interrupt calls
//! [`on_edge`](Receiver::on_edge) with a free-running microsecond timestamp;
//! everything else (clock recovery, byte assembly, identifier matching) happens
//! inside that call.
//!
//! ## Session lifecycle
//!
//! ```text
//!            id found             last byte stored
//!   Idle ─────────────► Writing ──────────────────► DataAvailable
//!    ▲  ▲                  │ violation                │      │
//!    │  └──────────────────┘                          │      │ set_status(Reading)
//!    │             set_status(Idle)                   ▼      ▼
//!    └───────────────────────────────────────────── Reading ◄┘
//! ```
//!
//! Only the interrupt path moves the status out of `Idle` into `Writing` and on
//! to `DataAvailable`. Only the application moves it back, through
//! [`set_status`](Receiver::set_status). While the status is anything other
//! than `Idle`, newly arriving frames are dropped at their identifier byte, so
//! an undrained result is never overwritten.
//!
//! ## Example
//!
//! ```rust
//! use biphase_link::config::ByteRate;
//! use biphase_link::receiver::{Receiver, RxStatus};
//! use biphase_link::registry::RxDataset;
//!
//! static DATASETS: [RxDataset; 1] = match RxDataset::new(7, 4) {
//!     Ok(dataset) => [dataset],
//!     Err(_) => panic!(),
//! };
//!
//! let mut receiver = Receiver::new(());
//! receiver.init(ByteRate::new(10).unwrap(), &DATASETS).unwrap();
//!
//! // in the pin-change interrupt: receiver.on_edge(micros());
//!
//! if receiver.status() == RxStatus::DataAvailable {
//!     receiver.set_status(RxStatus::Reading).unwrap();
//!     let valid = receiver.validate();
//!     # let _ = valid;
//!     receiver.set_status(RxStatus::Idle).unwrap();
//! }
//! ```

use core::convert::Infallible;

#[cfg(not(feature = "std"))]
use heapless::Vec;
#[cfg(feature = "std")]
use std::vec::Vec;

use crate::buffer::{BufferAccess, Transfer, TransferResult, transfer};
use crate::config::ByteRate;
#[cfg(not(feature = "std"))]
use crate::consts::RX_MAX_BUF_LEN_USIZE;
use crate::consts::{HEADER_LEN, HEADER_LEN_USIZE};
use crate::crc::checksum8;
use crate::encoding::{BiphaseDecoder, Decoded, LineTiming};
use crate::error::LinkError;
use crate::registry::{Registry, RxDataset};
use crate::timer::EdgeInterrupt;

/// State of the receive buffer.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum RxStatus {
    /// Free; the next frame with a registered identifier will be stored.
    #[default]
    Idle,
    /// A frame is being stored by the interrupt handler.
    Writing,
    /// The application is reading the buffer; new frames are dropped.
    Reading,
    /// A complete frame is waiting to be drained.
    DataAvailable,
}

/// Differential biphase receiver for one interrupt-capable input pin.
///
/// The receiver is inert until [`init`](Receiver::init) succeeds: edges are
/// ignored and accessors return neutral values.
#[derive(Debug)]
pub struct Receiver<'r, IRQ>
where
    IRQ: EdgeInterrupt,
{
    /// Pin-change interrupt
    pub irq: IRQ,
    registry: Option<Registry<'r>>,
    timing: Option<LineTiming>,
    input_enabled: bool,
    decoder: BiphaseDecoder,

    last_edge: u32,
    /// Bytes stored so far, header included.
    byte_offset: u16,
    bit_mask: u8,
    assembling: u8,
    matched: u8,
    status: RxStatus,
    arrival: u32,

    /// Identifier, checksum, then payload.
    #[cfg(feature = "std")]
    buf: Vec<u8>,
    /// Identifier, checksum, then payload.
    #[cfg(not(feature = "std"))]
    buf: Vec<u8, RX_MAX_BUF_LEN_USIZE>,

    /// Counter of frames that reached `DataAvailable`.
    pub frames_received: u16,
    /// Counter of frames abandoned after their identifier: framing violations
    /// while writing, unknown identifiers, and frames refused because the
    /// previous result was not yet drained.
    pub frames_dropped: u16,
}

impl<'r, IRQ> Receiver<'r, IRQ>
where
    IRQ: EdgeInterrupt,
{
    /// Creates an uninitialised receiver owning the pin-change interrupt.
    pub fn new(irq: IRQ) -> Self {
        Self {
            irq,
            registry: None,
            timing: None,
            input_enabled: false,
            decoder: BiphaseDecoder::new(),
            last_edge: 0,
            byte_offset: 0,
            bit_mask: 1,
            assembling: 0,
            matched: 0,
            status: RxStatus::Idle,
            arrival: 0,
            buf: Vec::new(),
            frames_received: 0,
            frames_dropped: 0,
        }
    }

    /// Binds the receiver to a rate and dataset table and attaches the interrupt.
    ///
    /// Allocates a buffer of the largest registered size plus the two header
    /// bytes. On failure the receiver stays inert.
    ///
    /// # Errors
    /// - [`LinkError::AlreadyInitialized`] on a second call
    /// - [`LinkError::EmptyRegistry`], [`LinkError::DuplicateId`],
    ///   [`LinkError::RegistryTooLarge`] for an invalid table
    /// - [`LinkError::AllocationFailed`] if the buffer cannot be allocated
    pub fn init(&mut self, rate: ByteRate, datasets: &'r [RxDataset]) -> Result<(), LinkError> {
        if self.is_initialized() {
            return Err(LinkError::AlreadyInitialized);
        }
        let registry = Registry::new(datasets)?;
        let len = registry.max_size() as usize + HEADER_LEN_USIZE;

        self.buf.clear();
        #[cfg(feature = "std")]
        self.buf
            .try_reserve_exact(len)
            .map_err(|_| LinkError::AllocationFailed)?;
        #[cfg(feature = "std")]
        self.buf.resize(len, 0);
        #[cfg(not(feature = "std"))]
        self.buf
            .resize(len, 0)
            .map_err(|_| LinkError::AllocationFailed)?;

        self.timing = Some(LineTiming::new(rate));
        self.registry = Some(registry);
        self.status = RxStatus::Idle;
        self.reset_reception();
        self.input_enabled = true;
        self.irq.listen();
        info!(
            "receiver ready at {} B/s, {} datasets, buffer {} bytes",
            rate.get(),
            registry.len(),
            len
        );
        Ok(())
    }

    /// `true` once [`init`](Receiver::init) has succeeded.
    pub fn is_initialized(&self) -> bool {
        self.registry.is_some()
    }

    /// Mutes or unmutes reception, e.g. while the local transmitter is keyed.
    ///
    /// While muted, edges are not timed; the first edge after unmuting is always
    /// treated as a framing violation and reception resynchronises on the next
    /// preamble.
    pub fn set_input_enabled(&mut self, enabled: bool) {
        if !self.is_initialized() {
            return;
        }
        self.input_enabled = enabled;
        if enabled {
            self.irq.listen();
        } else {
            self.irq.unlisten();
        }
    }

    /// Handles one level change. Call from the pin-change interrupt.
    ///
    /// # Arguments
    /// - `now_us`: free-running microsecond timestamp; wrapping is fine.
    pub fn on_edge(&mut self, now_us: u32) {
        let Some(timing) = self.timing else {
            return;
        };
        if !self.input_enabled {
            return;
        }
        let dt = now_us.wrapping_sub(self.last_edge);
        self.last_edge = now_us;

        match self.decoder.feed(timing.classify(dt)) {
            Decoded::Violation => self.reset_reception(),
            Decoded::Clock | Decoded::Preamble => {}
            Decoded::Bit(bit) => self.push_bit(bit, now_us, &timing),
        }
    }

    fn push_bit(&mut self, bit: bool, now_us: u32, timing: &LineTiming) {
        if bit {
            self.assembling |= self.bit_mask;
        }
        if self.bit_mask != 0x80 {
            self.bit_mask <<= 1;
            return;
        }

        let byte = self.assembling;
        if self.byte_offset == 0 {
            self.accept_id(byte, now_us.wrapping_sub(timing.arrival_latency_us));
            return;
        }

        self.store(byte);
        if self.byte_offset >= self.expected_len() {
            self.complete();
        }
    }

    fn accept_id(&mut self, id: u8, arrival: u32) {
        let Some(registry) = self.registry else {
            return;
        };
        if self.status != RxStatus::Idle {
            debug!("id {} dropped, previous result not drained", id);
            self.frames_dropped = self.frames_dropped.wrapping_add(1);
            self.reset_reception();
            return;
        }
        match registry.find(id) {
            Some((index, _)) => {
                self.matched = index;
                self.status = RxStatus::Writing;
                self.arrival = arrival;
                self.store(id);
            }
            None => {
                trace!("unknown id {}", id);
                self.frames_dropped = self.frames_dropped.wrapping_add(1);
                self.reset_reception();
            }
        }
    }

    fn store(&mut self, byte: u8) {
        if let Some(slot) = self.buf.get_mut(self.byte_offset as usize) {
            *slot = byte;
        }
        self.byte_offset = self.byte_offset.saturating_add(1);
        self.bit_mask = 1;
        self.assembling = 0;
    }

    fn complete(&mut self) {
        self.status = RxStatus::DataAvailable;
        self.frames_received = self.frames_received.wrapping_add(1);
        debug!("dataset {} available", self.matched);
        if let Some(hook) = self.entry().and_then(RxDataset::hook) {
            hook(self.matched, self.arrival);
        }
        self.reset_reception();
    }

    // Discards a frame in progress; a finished result is left alone.
    fn reset_reception(&mut self) {
        self.decoder.reset();
        self.byte_offset = 0;
        self.bit_mask = 1;
        self.assembling = 0;
        if self.status == RxStatus::Writing {
            trace!("frame for dataset {} abandoned", self.matched);
            self.status = RxStatus::Idle;
            self.frames_dropped = self.frames_dropped.wrapping_add(1);
        }
    }

    fn entry(&self) -> Option<&'r RxDataset> {
        self.registry.and_then(|registry| registry.get(self.matched))
    }

    fn expected_len(&self) -> u16 {
        self.entry()
            .map_or(0, |entry| u16::from(entry.size()) + u16::from(HEADER_LEN))
    }

    /// Current buffer status.
    pub fn status(&self) -> RxStatus {
        self.status
    }

    /// Application acknowledgement of a result.
    ///
    /// Allowed targets are [`RxStatus::Reading`] (from `Idle`, `DataAvailable`
    /// or `Reading`) and [`RxStatus::Idle`] (from `DataAvailable`, `Reading` or
    /// `Idle`). A frame being written belongs to the interrupt handler.
    ///
    /// # Errors
    /// - [`LinkError::NotInitialized`] before [`init`](Receiver::init)
    /// - [`LinkError::InvalidStatusTransition`] for any other request
    pub fn set_status(&mut self, to: RxStatus) -> Result<(), LinkError> {
        if !self.is_initialized() {
            return Err(LinkError::NotInitialized);
        }
        let from = self.status;
        let allowed = matches!(
            (from, to),
            (
                RxStatus::Idle | RxStatus::DataAvailable | RxStatus::Reading,
                RxStatus::Idle | RxStatus::Reading
            )
        );
        if !allowed {
            return Err(LinkError::InvalidStatusTransition { from, to });
        }
        self.status = to;
        Ok(())
    }

    /// Completes with the registry index of the received dataset once data is available.
    pub fn poll_available(&self) -> nb::Result<u8, Infallible> {
        if self.status == RxStatus::DataAvailable {
            Ok(self.matched)
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    /// Microsecond timestamp of the start of the stored frame, latency corrected.
    pub fn timestamp(&self) -> u32 {
        self.arrival
    }

    /// Identifier stored in the buffer.
    pub fn id(&self) -> u8 {
        self.buf.first().copied().unwrap_or(0)
    }

    /// Registry index of the stored dataset.
    pub fn dataset_index(&self) -> u8 {
        self.matched
    }

    /// Checksum byte received with the stored frame.
    pub fn checksum_byte(&self) -> u8 {
        self.buf.get(1).copied().unwrap_or(0)
    }

    /// Payload of the stored dataset, sized to its registry entry.
    pub fn payload(&self) -> &[u8] {
        let size = self.entry().map_or(0, |entry| entry.size() as usize);
        self.buf
            .get(HEADER_LEN_USIZE..HEADER_LEN_USIZE + size)
            .unwrap_or(&[])
    }

    /// Recomputes the checksum over identifier and payload and compares it
    /// to the received checksum byte.
    pub fn validate(&self) -> bool {
        match self.entry() {
            Some(entry) => checksum8(entry.id(), self.payload()) == self.checksum_byte(),
            None => false,
        }
    }
}

impl<IRQ> BufferAccess for Receiver<'_, IRQ>
where
    IRQ: EdgeInterrupt,
{
    /// Offsets are relative to the payload; the capacity is the largest
    /// registered dataset.
    fn buffer_transfer(&mut self, offset: u8, data: Transfer<'_>) -> TransferResult {
        match self.buf.get_mut(HEADER_LEN_USIZE..) {
            Some(payload) => transfer(payload, offset, data),
            None => TransferResult::OutOfRange,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(feature = "std")]
    use crate::consts::PREAMBLE_HALF_SYMBOLS;
    #[cfg(feature = "std")]
    use crate::encoding::BiphaseEncoder;

    #[derive(Debug, Default)]
    struct IrqState {
        listening: bool,
        attaches: u8,
    }

    impl EdgeInterrupt for IrqState {
        fn listen(&mut self) {
            self.listening = true;
            self.attaches += 1;
        }

        fn unlisten(&mut self) {
            self.listening = false;
        }
    }

    const H: u32 = 6250; // half-symbol at 10 B/s

    fn datasets() -> [RxDataset; 2] {
        [RxDataset::new(7, 4).unwrap(), RxDataset::new(9, 2).unwrap()]
    }

    fn rate() -> ByteRate {
        ByteRate::new(10).unwrap()
    }

    /// Plays a frame into the receiver as the transmitter would emit it, one
    /// half-symbol every `H` starting at `start`. Returns the time of the
    /// trailing idle half-symbol.
    #[cfg(feature = "std")]
    fn play_frame<I: EdgeInterrupt>(
        rx: &mut Receiver<'_, I>,
        start: u32,
        id: u8,
        payload: &[u8],
    ) -> u32 {
        let checksum = checksum8(id, payload);
        let mut bits = std::vec![true, true];
        for byte in [id, checksum].iter().chain(payload) {
            bits.extend((0..8).map(|i| (byte >> i) & 1 != 0));
        }
        play_bits(rx, start, &bits)
    }

    #[cfg(feature = "std")]
    fn play_bits<I: EdgeInterrupt>(rx: &mut Receiver<'_, I>, start: u32, bits: &[bool]) -> u32 {
        fn drive<I: EdgeInterrupt>(rx: &mut Receiver<'_, I>, level: &mut bool, next: bool, t: u32) {
            if next != *level {
                rx.on_edge(t);
                *level = next;
            }
        }

        let mut enc = BiphaseEncoder::new();
        let mut level = false;
        let mut t = start;
        drive(rx, &mut level, enc.key(), t);
        t += u32::from(PREAMBLE_HALF_SYMBOLS - 1) * H;
        for &bit in bits {
            t += H;
            drive(rx, &mut level, enc.boundary(bit), t);
            t += H;
            drive(rx, &mut level, enc.mid(), t);
        }
        t += H;
        drive(rx, &mut level, enc.release(), t);
        t
    }

    #[test]
    fn test_uninitialised_is_inert() {
        let mut rx = Receiver::new(IrqState::default());
        rx.on_edge(10);
        rx.on_edge(10 + H);
        assert_eq!(rx.status(), RxStatus::Idle);
        assert!(!rx.validate());
        assert!(rx.payload().is_empty());
        assert_eq!(rx.set_status(RxStatus::Reading), Err(LinkError::NotInitialized));
        rx.set_input_enabled(true);
        assert!(!rx.irq.listening);
    }

    #[test]
    fn test_init_allocates_and_listens() {
        let table = datasets();
        let mut rx = Receiver::new(IrqState::default());
        assert_eq!(rx.init(rate(), &table), Ok(()));
        assert!(rx.irq.listening);
        assert_eq!(rx.buf.len(), 6);
        assert_eq!(rx.init(rate(), &table), Err(LinkError::AlreadyInitialized));
        assert_eq!(rx.irq.attaches, 1);
    }

    #[test]
    fn test_init_rejects_empty_registry() {
        let mut rx = Receiver::new(IrqState::default());
        assert_eq!(rx.init(rate(), &[]), Err(LinkError::EmptyRegistry));
        assert!(!rx.is_initialized());
        assert!(!rx.irq.listening);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_receives_registered_frame() {
        let table = datasets();
        let mut rx = Receiver::new(IrqState::default());
        rx.init(rate(), &table).unwrap();

        let payload = [0xde, 0xad];
        let _ = play_frame(&mut rx, 1_000_000, 9, &payload);

        assert_eq!(rx.status(), RxStatus::DataAvailable);
        assert_eq!(rx.poll_available(), Ok(1));
        assert_eq!(rx.id(), 9);
        assert_eq!(rx.dataset_index(), 1);
        assert_eq!(rx.payload(), &payload);
        assert_eq!(rx.checksum_byte(), checksum8(9, &payload));
        assert!(rx.validate());
        assert_eq!(rx.frames_received, 1);
        // the identifier completes 22 half-symbols after keying, which is
        // exactly the latency correction at this rate
        assert_eq!(rx.timestamp(), 1_000_000);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_unknown_id_is_discarded() {
        let table = datasets();
        let mut rx = Receiver::new(IrqState::default());
        rx.init(rate(), &table).unwrap();

        let end = play_frame(&mut rx, 1_000_000, 3, &[1, 2]);
        // the next frame's carrier key is a violation on this receiver
        rx.on_edge(end + 100 * H);
        assert_eq!(rx.status(), RxStatus::Idle);
        assert!(rx.frames_dropped >= 1);
        assert_eq!(rx.frames_received, 0);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_undrained_result_blocks_next_frame() {
        let table = datasets();
        let mut rx = Receiver::new(IrqState::default());
        rx.init(rate(), &table).unwrap();

        let end = play_frame(&mut rx, 1_000_000, 9, &[1, 2]);
        assert_eq!(rx.status(), RxStatus::DataAvailable);

        let _ = play_frame(&mut rx, end + 100 * H, 9, &[3, 4]);
        assert_eq!(rx.status(), RxStatus::DataAvailable);
        assert_eq!(rx.payload(), &[1, 2]);
        assert_eq!(rx.frames_received, 1);
        assert!(rx.frames_dropped >= 1);

        rx.set_status(RxStatus::Idle).unwrap();
        let _ = play_frame(&mut rx, end + 400 * H, 9, &[3, 4]);
        assert_eq!(rx.payload(), &[3, 4]);
        assert_eq!(rx.frames_received, 2);
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_corrupted_payload_fails_validation() {
        let table = datasets();
        let mut rx = Receiver::new(IrqState::default());
        rx.init(rate(), &table).unwrap();

        let checksum = checksum8(9, &[0x0f, 0xf0]);
        let mut bits = std::vec![true, true];
        for byte in [9u8, checksum, 0x0f, 0xf0] {
            bits.extend((0..8).map(|i| (byte >> i) & 1 != 0));
        }
        // flip the last payload bit; the line code itself stays valid
        let last = bits.len() - 1;
        bits[last] = !bits[last];
        let _ = play_bits(&mut rx, 1_000_000, &bits);
        assert_eq!(rx.status(), RxStatus::DataAvailable);
        assert_eq!(rx.payload(), &[0x0f, 0x70]);
        assert!(!rx.validate());
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_violation_mid_frame_returns_to_idle() {
        let table = datasets();
        let mut rx = Receiver::new(IrqState::default());
        rx.init(rate(), &table).unwrap();

        let mut bits = std::vec![true, true];
        for byte in [9u8, checksum8(9, &[5, 6])] {
            bits.extend((0..8).map(|i| (byte >> i) & 1 != 0));
        }
        let t = play_bits(&mut rx, 1_000_000, &bits);
        assert_eq!(rx.status(), RxStatus::Writing);
        // line goes quiet before the payload arrives
        rx.on_edge(t + 10 * H);
        assert_eq!(rx.status(), RxStatus::Idle);
        assert_eq!(rx.frames_dropped, 1);
    }

    #[test]
    fn test_status_transitions() {
        let table = datasets();
        let mut rx = Receiver::new(IrqState::default());
        rx.init(rate(), &table).unwrap();

        assert_eq!(rx.set_status(RxStatus::Reading), Ok(()));
        assert_eq!(rx.set_status(RxStatus::Idle), Ok(()));
        assert_eq!(
            rx.set_status(RxStatus::DataAvailable),
            Err(LinkError::InvalidStatusTransition {
                from: RxStatus::Idle,
                to: RxStatus::DataAvailable
            })
        );
        rx.status = RxStatus::DataAvailable;
        assert_eq!(rx.set_status(RxStatus::Reading), Ok(()));
        rx.status = RxStatus::Writing;
        assert!(rx.set_status(RxStatus::Idle).is_err());
        assert_eq!(rx.status(), RxStatus::Writing);
    }

    #[test]
    fn test_muting_ignores_edges() {
        let table = datasets();
        let mut rx = Receiver::new(IrqState::default());
        rx.init(rate(), &table).unwrap();

        rx.set_input_enabled(false);
        assert!(!rx.irq.listening);
        rx.on_edge(5);
        assert_eq!(rx.last_edge, 0);
        rx.set_input_enabled(true);
        assert!(rx.irq.listening);
        rx.on_edge(5);
        assert_eq!(rx.last_edge, 5);
    }

    #[test]
    fn test_buffer_transfer_skips_header() {
        let table = datasets();
        let mut rx = Receiver::new(IrqState::default());
        rx.init(rate(), &table).unwrap();
        rx.buf.copy_from_slice(&[7, 0xaa, 1, 2, 3, 4]);

        let mut out = [0u8; 2];
        assert_eq!(
            rx.buffer_transfer(0, Transfer::Read(&mut out)),
            TransferResult::Next(2)
        );
        assert_eq!(out, [1, 2]);
        let mut word = 0u16;
        assert_eq!(rx.read_value(2, &mut word), TransferResult::End);
        assert_eq!(word, 0x0403);
        assert_eq!(rx.read_value(3, &mut word), TransferResult::OutOfRange);
    }
}
