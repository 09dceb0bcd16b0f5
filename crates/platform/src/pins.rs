//! Signal line and peripheral clock ownership.

/// The three output lines (word select, data, bit clock) and the serial
/// peripheral's clock gate, claimed as one unit for the lifetime of a stream.
pub trait SignalPins {
    /// Error type
    type Error: core::fmt::Debug;

    /// Route the lines to the serial peripheral and enable its clock.
    fn claim(&mut self) -> Result<(), Self::Error>;

    /// Return the lines to their default function and gate the clock.
    fn release(&mut self);
}

impl<T: SignalPins + ?Sized> SignalPins for &mut T {
    type Error = T::Error;

    fn claim(&mut self) -> Result<(), Self::Error> {
        (**self).claim()
    }

    fn release(&mut self) {
        (**self).release();
    }
}
