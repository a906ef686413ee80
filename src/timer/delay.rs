use crate::error::LinkError;
use crate::timer::HalfSymbolTimer;
use crate::transmitter::{Transmitter, TxDataset};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

/// Sends one dataset, pacing the half-symbols with a blocking delay.
///
/// For environments where a timer interrupt is unavailable or undesired.
/// Returns once the trailing idle half-symbol has been written.
///
/// # Arguments
/// - `transmitter`: a transmitter, typically built with `()` as its timer
/// - `dataset`: the payload to send
/// - `delay`: a delay provider implementing `DelayNs`, typically from the HAL
///
/// # Example
/// ```rust,ignore
/// use biphase_link::timer::transmit_blocking;
///
/// let mut transmitter = Transmitter::new(tx, (), config);
/// transmit_blocking(&mut transmitter, &dataset, &mut delay)?;
/// ```
///
/// # Errors
/// [`LinkError::Busy`] if a session is already running.
///
/// # Notes
/// - The delay does not account for the time spent in `tick()`, so the real
///   half-symbol is slightly longer than nominal; the receiver thresholds
///   tolerate this.
pub fn transmit_blocking<D: DelayNs, TX: OutputPin, TIM: HalfSymbolTimer>(
    transmitter: &mut Transmitter<TX, TIM>,
    dataset: &TxDataset<'_>,
    delay: &mut D,
) -> Result<(), LinkError> {
    transmitter.transmit_data(dataset)?;
    let half_symbol_us = transmitter.timing().half_symbol_us;
    loop {
        transmitter.tick();
        if !transmitter.is_busy() {
            return Ok(());
        }
        delay.delay_us(half_symbol_us);
    }
}
