#![allow(dead_code)]

use core::convert::Infallible;

use biphase_link::receiver::Receiver;
use biphase_link::timer::{EdgeInterrupt, HalfSymbolTimer};
use biphase_link::transmitter::{Transmitter, TxDataset};
use embedded_hal::digital::{ErrorType, OutputPin};

/// An output pin that remembers its level.
#[derive(Debug, Default)]
pub struct LevelPin {
    pub high: bool,
    pub writes: usize,
}

impl ErrorType for LevelPin {
    type Error = Infallible;
}

impl OutputPin for LevelPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        self.writes += 1;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        self.writes += 1;
        Ok(())
    }
}

/// Sends `dataset` and feeds every level change into `rx` with its nominal
/// timestamp. The first tick happens at `start`; returns the time after the
/// trailing idle half-symbol.
pub fn loopback<TIM: HalfSymbolTimer, IRQ: EdgeInterrupt>(
    tx: &mut Transmitter<LevelPin, TIM>,
    rx: &mut Receiver<'_, IRQ>,
    dataset: &TxDataset<'_>,
    start: u32,
) -> u32 {
    let edges = record(tx, dataset, start);
    for &t in &edges {
        rx.on_edge(t);
    }
    start.wrapping_add(tx.timing().half_symbol_us * tx_ticks(dataset))
}

/// Sends `dataset` and returns the timestamps of every level change.
pub fn record<TIM: HalfSymbolTimer>(
    tx: &mut Transmitter<LevelPin, TIM>,
    dataset: &TxDataset<'_>,
    start: u32,
) -> Vec<u32> {
    let half = tx.timing().half_symbol_us;
    tx.transmit_data(dataset).unwrap();
    let mut level = tx.tx.high;
    let mut t = start;
    let mut edges = Vec::new();
    while tx.is_busy() {
        tx.tick();
        if tx.tx.high != level {
            level = tx.tx.high;
            edges.push(t);
        }
        t = t.wrapping_add(half);
    }
    edges
}

/// Half-symbols in one frame, trailing idle included.
pub fn tx_ticks(dataset: &TxDataset<'_>) -> u32 {
    3 + 2 * (18 + 8 * u32::from(dataset.size())) + 1
}

/// Deterministic filler bytes.
pub fn pattern(seed: u8, len: usize) -> Vec<u8> {
    let mut x = u32::from(seed).wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..len)
        .map(|_| {
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (x >> 16) as u8
        })
        .collect()
}
