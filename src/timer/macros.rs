/// Declares a static global link engine protected by a `critical_section` mutex.
///
/// This macro creates a `static` singleton suitable for use in
/// interrupt-based environments, where both the main thread and an ISR need
/// to safely access the shared engine state.
///
/// # Arguments
/// - `transmitter $name: $tx, $tim`: a [`Transmitter`](crate::transmitter::Transmitter)
///   over output pin type `$tx` and timer type `$tim`
/// - `receiver $name: $irq`: a [`Receiver`](crate::receiver::Receiver) over
///   interrupt type `$irq`
///
/// # Example
/// ```rust,ignore
/// declare_link!(transmitter LINK_TX: MyTxPin, MyTimer2);
/// declare_link!(receiver LINK_RX: MyPcInt);
/// ```
#[macro_export]
macro_rules! declare_link {
    ( transmitter $name:ident : $tx:ty, $tim:ty ) => {
        static $name: $crate::timer::SharedTransmitter<$tx, $tim> =
            $crate::timer::global_transmitter_init();
    };
    ( receiver $name:ident : $irq:ty ) => {
        static $name: $crate::timer::SharedReceiver<$irq> = $crate::timer::global_receiver_init();
    };
}

/// Calls `tick()` on a global transmitter declared with `declare_link!`.
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn TIMER2_COMPA() {
///     tick_transmitter!(LINK_TX);
/// }
/// ```
///
/// # Notes
/// - Does nothing until the transmitter has been set up.
#[macro_export]
macro_rules! tick_transmitter {
    ( $name:ident ) => {
        $crate::timer::global_transmitter_tick(&$name)
    };
}

/// Passes an edge timestamp to a global receiver declared with `declare_link!`.
///
/// # Example
/// ```rust,ignore
/// #[interrupt]
/// fn PCINT2() {
///     edge_receiver!(LINK_RX, micros());
/// }
/// ```
#[macro_export]
macro_rules! edge_receiver {
    ( $name:ident, $now:expr ) => {
        $crate::timer::global_receiver_edge(&$name, $now)
    };
}
