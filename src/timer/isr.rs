use crate::config::{ByteRate, LinkConfig};
use crate::error::LinkError;
use crate::receiver::{Receiver, RxStatus};
use crate::registry::RxDataset;
use crate::timer::{EdgeInterrupt, HalfSymbolTimer};
use crate::transmitter::{Transmitter, TxDataset};
use core::cell::RefCell;
use critical_section::Mutex;
use embedded_hal::digital::OutputPin;

/// A transmitter shared between `main` and the timer interrupt.
pub type SharedTransmitter<TX, TIM> = Mutex<RefCell<Option<Transmitter<TX, TIM>>>>;

/// A receiver shared between `main` and the pin-change interrupt.
pub type SharedReceiver<IRQ> = Mutex<RefCell<Option<Receiver<'static, IRQ>>>>;

/// Used to initialize a global static [`Transmitter`] for use with
/// `critical_section`.
///
/// # Returns
/// * An empty mutable ref-cell
///
/// # Example
/// ```rust,ignore
/// use biphase_link::timer::{SharedTransmitter, global_transmitter_init};
/// use some_hal::{PD3, Timer2};
///
/// static LINK_TX: SharedTransmitter<PD3, Timer2> = global_transmitter_init();
/// ```
pub const fn global_transmitter_init<TX: OutputPin, TIM: HalfSymbolTimer>()
-> SharedTransmitter<TX, TIM> {
    Mutex::new(RefCell::new(None))
}

/// Builds the transmitter inside the global slot, replacing any previous one.
///
/// # Arguments
/// * The global static transmitter
/// * The output pin
/// * The half-symbol timer, configured but stopped
/// * The link configuration
pub fn global_transmitter_setup<TX: OutputPin, TIM: HalfSymbolTimer>(
    global: &'static SharedTransmitter<TX, TIM>,
    tx: TX,
    timer: TIM,
    config: LinkConfig,
) {
    critical_section::with(|cs| {
        let _ = global
            .borrow(cs)
            .replace(Some(Transmitter::new(tx, timer, config)));
    });
}

/// Runs the tick at each timer interrupt
///
/// # Arguments
/// * The global static transmitter
///# Example
/// ```rust,ignore
/// #[interrupt]
/// fn TIMER2_COMPA() {
///     global_transmitter_tick(&LINK_TX);
/// }
/// ```
pub fn global_transmitter_tick<TX: OutputPin, TIM: HalfSymbolTimer>(
    global: &'static SharedTransmitter<TX, TIM>,
) {
    critical_section::with(|cs| {
        if let Some(transmitter) = global.borrow(cs).borrow_mut().as_mut() {
            transmitter.tick();
        }
    });
}

/// Starts a transmission on the global transmitter.
///
/// # Errors
/// [`LinkError::NotInitialized`] before [`global_transmitter_setup`], otherwise
/// whatever [`Transmitter::transmit_data`] returns.
pub fn global_transmit<TX: OutputPin, TIM: HalfSymbolTimer>(
    global: &'static SharedTransmitter<TX, TIM>,
    dataset: &TxDataset<'_>,
) -> Result<(), LinkError> {
    critical_section::with(|cs| match global.borrow(cs).borrow_mut().as_mut() {
        Some(transmitter) => transmitter.transmit_data(dataset),
        None => Err(LinkError::NotInitialized),
    })
}

/// Used to initialize a global static [`Receiver`] for use with
/// `critical_section`.
pub const fn global_receiver_init<IRQ: EdgeInterrupt>() -> SharedReceiver<IRQ> {
    Mutex::new(RefCell::new(None))
}

/// Builds and initialises the receiver inside the global slot.
///
/// The slot stays empty if initialisation fails.
///
/// # Errors
/// [`LinkError::AlreadyInitialized`] if the slot is already occupied, or any
/// error from [`Receiver::init`].
pub fn global_receiver_setup<IRQ: EdgeInterrupt>(
    global: &'static SharedReceiver<IRQ>,
    irq: IRQ,
    rate: ByteRate,
    datasets: &'static [RxDataset],
) -> Result<(), LinkError> {
    critical_section::with(|cs| {
        let mut slot = global.borrow(cs).borrow_mut();
        if slot.is_some() {
            return Err(LinkError::AlreadyInitialized);
        }
        let mut receiver = Receiver::new(irq);
        receiver.init(rate, datasets)?;
        *slot = Some(receiver);
        Ok(())
    })
}

/// Feeds an edge timestamp to the global receiver from the pin-change interrupt.
///
///# Example
/// ```rust,ignore
/// #[interrupt]
/// fn PCINT2() {
///     global_receiver_edge(&LINK_RX, micros());
/// }
/// ```
pub fn global_receiver_edge<IRQ: EdgeInterrupt>(global: &'static SharedReceiver<IRQ>, now_us: u32) {
    critical_section::with(|cs| {
        if let Some(receiver) = global.borrow(cs).borrow_mut().as_mut() {
            receiver.on_edge(now_us);
        }
    });
}

/// Status of the global receiver, `None` before setup.
pub fn global_receiver_status<IRQ: EdgeInterrupt>(
    global: &'static SharedReceiver<IRQ>,
) -> Option<RxStatus> {
    critical_section::with(|cs| global.borrow(cs).borrow().as_ref().map(Receiver::status))
}

/// Runs `f` on the global receiver inside a critical section.
///
/// Use this to drain a result: the edge interrupt is held off while `f`
/// runs, so keep it short.
pub fn with_global_receiver<IRQ: EdgeInterrupt, R>(
    global: &'static SharedReceiver<IRQ>,
    f: impl FnOnce(&mut Receiver<'static, IRQ>) -> R,
) -> Option<R> {
    critical_section::with(|cs| global.borrow(cs).borrow_mut().as_mut().map(f))
}
