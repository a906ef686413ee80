//! # biphase-link
//!
//! A portable, no_std Rust implementation of a one-wire telemetry link for
//! cheap radio or opto-coupled transmitters: datasets of 1 to 255 bytes are
//! framed with an identifier and a CRC-8, line coded as self-clocking
//! differential biphase, and recovered on the other end from nothing but the
//! timestamps of the received edges.
//!
//! This crate provides:
//! - `embedded-hal` traits for digital output and blocking delay
//! - a [`Transmitter`](transmitter::Transmitter) ticked from a periodic timer interrupt
//! - a [`Receiver`](receiver::Receiver) fed from a pin-change interrupt, with a
//!   registry of accepted datasets
//! - interrupt-safe global access with `critical-section`
//! - offset-based field access to payloads ([`buffer::BufferAccess`])
//!
//! ## Crate features
//! | Feature               | Description |
//! |-----------------------|-------------|
//! | `std`                 | Disables `#![no_std]` support and replaces `heapless::Vec`s with
//! `std::vec::Vec`s |
//! | `delay-loop`          | Uses `embedded_hal::delay::DelayNs` to pace a transmission |
//! | `timer-isr` (default) | Uses `critical_section::with` to share engines with interrupt handlers |
//! | `defmt-0-3`           | Uses `defmt` logging |
//! | `log`                 | Uses `log` logging |
//!
//! ## Wire format
//!
//! ```text
//! carrier held 3 half-symbols | 1 1 | id (8) | crc (8) | payload (8 * size)
//! ```
//!
//! All fields are sent LSB first. Each bit takes two half-symbols of
//! `62500 / byte_rate` microseconds. See [`encoding`] for the line code.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use biphase_link::config::{ByteRate, LinkConfig};
//! use biphase_link::transmitter::{Transmitter, TxDataset};
//!
//! let config = LinkConfig::new(ByteRate::new(10)?);
//! let mut transmitter = Transmitter::new(tx_pin, timer2, config);
//!
//! let mut reading = [0u8; 4];
//! let mut dataset = TxDataset::new(&mut reading, 7, 4)?;
//! dataset.write_value(0, 21.5f32);
//! transmitter.transmit_data(&dataset)?;
//!
//! // in the timer interrupt, every `config.timing().half_symbol_us`:
//! transmitter.tick();
//! ```
//!
//! On the receiving side:
//!
//! ```rust,ignore
//! static DATASETS: [RxDataset; 1] = [/* RxDataset::new(7, 4) */];
//!
//! let mut receiver = Receiver::new(pcint);
//! receiver.init(ByteRate::new(10)?, &DATASETS)?;
//!
//! // in the pin-change interrupt:
//! receiver.on_edge(micros());
//! ```
//!
//! ## Integration Notes
//!
//! - Both ends must agree on the byte rate; nothing is negotiated.
//! - Mute the receiver with `set_input_enabled(false)` while a co-located
//!   transmitter is keyed.
//! - Only one session per engine exists at a time in interrupt-driven mode.

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
mod fmt;

#[cfg(feature = "timer-isr")]
pub use critical_section;

#[cfg(not(feature = "std"))]
pub use heapless;

pub mod buffer;
pub mod config;
pub mod consts;
pub mod crc;
pub mod encoding;
pub mod error;
pub mod receiver;
pub mod registry;
pub mod timer;
pub mod transmitter;

pub use error::LinkError;
