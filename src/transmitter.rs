//! Interrupt-driven frame transmitter.
//!
//! This module provides the [`Transmitter`] struct, which serialises one dataset
//! at a time into differential biphase half-symbols on a single output pin. The
//! transmitter does no timing of its own: a periodic timer interrupt must call
//! [`tick()`](Transmitter::tick) once per half-symbol, at the period given by
//! [`LineTiming::half_symbol_us`].
//!
//! ## Example
//!
//! ```rust
//! # use embedded_hal_mock::eh1::digital::{Mock as Pin, State as PinState, Transaction as PinTransaction};
//! use biphase_link::config::{ByteRate, LinkConfig};
//! use biphase_link::transmitter::{Transmitter, TxDataset};
//!
//! # let tx_pin = Pin::new(&[PinTransaction::set(PinState::Low), PinTransaction::set(PinState::High)]);
//! let config = LinkConfig::new(ByteRate::new(10).unwrap());
//! let mut transmitter = Transmitter::new(tx_pin, (), config);
//!
//! let mut reading = [0x11, 0x22, 0x33, 0x44];
//! let dataset = TxDataset::new(&mut reading, 7, 4).unwrap();
//! transmitter.transmit_data(&dataset).unwrap();
//!
//! transmitter.tick(); // called from the timer interrupt, every half-symbol
//! # transmitter.tx.done();
//! ```
//!
//! ## Ownership
//!
//! [`transmit_data`](Transmitter::transmit_data) copies the payload into the
//! transmitter, so the caller's memory may be reused as soon as the call
//! returns. A [`TxDataset`] only borrows the caller's memory while the
//! application fills it in.

use core::convert::Infallible;

use embedded_hal::digital::OutputPin;
#[cfg(not(feature = "std"))]
use heapless::Vec;
#[cfg(feature = "std")]
use std::vec::Vec;

use crate::buffer::{BufferAccess, Transfer, TransferResult, transfer};
use crate::config::LinkConfig;
#[cfg(not(feature = "std"))]
use crate::consts::MAX_DATASET_LEN_USIZE;
use crate::consts::{FRAME_HEADER_BITS, PREAMBLE_HALF_SYMBOLS};
use crate::crc::checksum8;
use crate::encoding::{BiphaseEncoder, LineTiming, frame_header};
use crate::error::LinkError;
use crate::timer::HalfSymbolTimer;

/// A payload waiting to be sent, borrowed from the application.
#[derive(Debug)]
pub struct TxDataset<'a> {
    payload: &'a mut [u8],
    id: u8,
}

impl<'a> TxDataset<'a> {
    /// Packages the first `size` bytes of `payload` under `id`.
    ///
    /// # Errors
    /// [`LinkError::InvalidDatasetSize`] if `size` is zero (reserved for "no transfer")
    /// or larger than `payload`.
    pub fn new(payload: &'a mut [u8], id: u8, size: u8) -> Result<Self, LinkError> {
        let size = size as usize;
        if size == 0 || size > payload.len() {
            return Err(LinkError::InvalidDatasetSize);
        }
        Ok(Self {
            payload: &mut payload[..size],
            id,
        })
    }

    /// The dataset identifier.
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Payload size in bytes, `1..=255`.
    pub fn size(&self) -> u8 {
        self.payload.len() as u8
    }

    /// The payload as it will be sent.
    pub fn payload(&self) -> &[u8] {
        &self.payload[..]
    }
}

impl BufferAccess for TxDataset<'_> {
    fn buffer_transfer(&mut self, offset: u8, data: Transfer<'_>) -> TransferResult {
        transfer(self.payload, offset, data)
    }
}

/// Lifecycle of the transmit session.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum TxSession {
    /// Nothing to send; the timer is stopped.
    #[default]
    Idle,
    /// A frame has been accepted and the timer started; no half-symbol emitted yet.
    Armed,
    /// Half-symbols are being emitted.
    Active,
}

/// Differential biphase transmitter for one output pin.
///
/// ## Type Parameters
///
/// - `TX`: an [`embedded_hal::digital::OutputPin`] keying the transmitter
/// - `TIM`: the [`HalfSymbolTimer`] whose interrupt calls [`tick()`](Transmitter::tick)
///
/// ## Notes
///
/// - At most one session exists at a time; a second
///   [`transmit_data`](Transmitter::transmit_data) is refused until the first ends.
/// - There is no abort. A session ends after its last half-symbol, which is
///   the only place the timer is stopped.
#[derive(Debug)]
pub struct Transmitter<TX, TIM>
where
    TX: OutputPin,
    TIM: HalfSymbolTimer,
{
    /// Output pin
    pub tx: TX,
    /// Half-symbol timer
    pub timer: TIM,
    config: LinkConfig,
    session: TxSession,
    encoder: BiphaseEncoder,

    /// Bits still to be shifted out of `word`, LSB first.
    word: u32,
    bits_left: u8,
    /// The next tick emits the second half of the current bit.
    second_half: bool,
    /// Preamble half-symbols left to hold after keying.
    hold: u8,
    /// Index of the next payload byte to load into `word`.
    offset: u8,

    #[cfg(feature = "std")]
    payload: Vec<u8>,
    #[cfg(not(feature = "std"))]
    payload: Vec<u8, MAX_DATASET_LEN_USIZE>,

    /// Counter of completed transmissions.
    pub frames_sent: u16,
}

impl<TX, TIM> Transmitter<TX, TIM>
where
    TX: OutputPin,
    TIM: HalfSymbolTimer,
{
    /// Creates a transmitter and drives the output to its idle level.
    ///
    /// The timer should already be configured to interrupt every
    /// [`LineTiming::half_symbol_us`] (see [`crate::timer::TimerConfig`]) but
    /// left stopped; the transmitter starts and stops it.
    pub fn new(tx: TX, timer: TIM, config: LinkConfig) -> Self {
        let mut cls = Self {
            tx,
            timer,
            config,
            session: TxSession::Idle,
            encoder: BiphaseEncoder::new(),
            word: 0,
            bits_left: 0,
            second_half: false,
            hold: 0,
            offset: 0,
            payload: Vec::new(),
            frames_sent: 0,
        };
        cls.write_level(false);
        info!(
            "transmitter ready at {} B/s, active low: {}",
            config.byte_rate.get(),
            config.active_low
        );
        cls
    }

    /// The link configuration.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Half-symbol period and thresholds for the configured rate.
    pub fn timing(&self) -> LineTiming {
        self.config.timing()
    }

    /// Current session state.
    pub fn session(&self) -> TxSession {
        self.session
    }

    /// `true` while a session is armed or running.
    pub fn is_busy(&self) -> bool {
        self.session != TxSession::Idle
    }

    /// Completes once the current session, if any, has ended.
    pub fn poll_sent(&self) -> nb::Result<(), Infallible> {
        if self.is_busy() {
            Err(nb::Error::WouldBlock)
        } else {
            Ok(())
        }
    }

    /// Starts sending `dataset`.
    ///
    /// Computes the checksum over identifier and payload, copies the payload,
    /// queues the header (two sync bits, identifier, checksum) and starts the
    /// timer.
    ///
    /// # Errors
    /// [`LinkError::Busy`] if a session is already armed or running. Nothing
    /// about the transmitter changes in that case.
    pub fn transmit_data(&mut self, dataset: &TxDataset<'_>) -> Result<(), LinkError> {
        if self.is_busy() {
            warn!("transmit of id {} refused, session in progress", dataset.id());
            return Err(LinkError::Busy);
        }
        let payload = dataset.payload();
        let checksum = checksum8(dataset.id(), payload);

        self.payload.clear();
        #[cfg(feature = "std")]
        self.payload.extend_from_slice(payload);
        #[cfg(not(feature = "std"))]
        self.payload
            .extend_from_slice(payload)
            .map_err(|_| LinkError::InvalidDatasetSize)?;

        self.word = frame_header(dataset.id(), checksum);
        self.bits_left = FRAME_HEADER_BITS;
        self.second_half = false;
        self.hold = PREAMBLE_HALF_SYMBOLS - 1;
        self.offset = 0;
        self.session = TxSession::Armed;
        self.timer.start();
        debug!(
            "transmit id {} ({} bytes, crc {})",
            dataset.id(),
            dataset.size(),
            checksum
        );
        Ok(())
    }

    /// Emits the next half-symbol. Call from the timer interrupt.
    ///
    /// Does nothing while idle.
    pub fn tick(&mut self) {
        match self.session {
            TxSession::Idle => {}
            TxSession::Armed => {
                self.session = TxSession::Active;
                let level = self.encoder.key();
                self.write_level(level);
            }
            TxSession::Active => self.advance(),
        }
    }

    fn advance(&mut self) {
        if self.hold > 0 {
            self.hold -= 1;
            let level = self.encoder.level();
            self.write_level(level);
            return;
        }

        let level = if self.second_half {
            self.second_half = false;
            self.encoder.mid()
        } else {
            if self.bits_left == 0 && !self.load_next_byte() {
                self.finish();
                return;
            }
            let bit = self.word & 1 != 0;
            self.word >>= 1;
            self.bits_left -= 1;
            self.second_half = true;
            self.encoder.boundary(bit)
        };
        self.write_level(level);
    }

    fn load_next_byte(&mut self) -> bool {
        match self.payload.get(self.offset as usize) {
            Some(&byte) => {
                self.word = byte as u32;
                self.bits_left = 8;
                self.offset = self.offset.saturating_add(1);
                true
            }
            None => false,
        }
    }

    // Trailing idle half-symbol: the only way a session ends.
    fn finish(&mut self) {
        let level = self.encoder.release();
        self.write_level(level);
        self.timer.stop();
        self.session = TxSession::Idle;
        self.frames_sent = self.frames_sent.wrapping_add(1);
        debug!("transmit complete, {} frames sent", self.frames_sent);
    }

    fn write_level(&mut self, carrier: bool) {
        let _ = if carrier != self.config.active_low {
            self.tx.set_high()
        } else {
            self.tx.set_low()
        };
    }

    /// Releases the pin and timer.
    pub fn free(self) -> (TX, TIM) {
        (self.tx, self.timer)
    }
}
