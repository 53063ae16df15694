use core::convert::Infallible;

use embedded_hal::digital::{InputPin, OutputPin};

/// The open collector clock and data pair.
///
/// "Hold low" actively drives the line to 0. "Release" stops driving it so
/// the pull-up (or the device) decides the level.
pub trait Line {
    // Reading is `&mut self`, because most pin APIs require it.
    fn clock_is_low(&mut self) -> bool;
    fn data_is_high(&mut self) -> bool;

    fn hold_clock_low(&mut self);
    fn release_clock(&mut self);
    fn hold_data_low(&mut self);
    fn release_data(&mut self);
}

/// [`Line`] over two `embedded-hal` pins configured as open drain outputs
/// with input buffers enabled. Setting an open drain pin high releases it.
#[derive(Debug)]
pub struct OpenDrainLine<C, D> {
    clock: C,
    data: D,
}

impl<C, D> OpenDrainLine<C, D>
where
    C: InputPin + OutputPin<Error = Infallible>,
    D: InputPin + OutputPin<Error = Infallible>,
{
    /// Both lines are released.
    pub fn new(mut clock: C, mut data: D) -> Self {
        infallible(clock.set_high());
        infallible(data.set_high());

        Self { clock, data }
    }

    pub fn free(self) -> (C, D) {
        (self.clock, self.data)
    }
}

impl<C, D> Line for OpenDrainLine<C, D>
where
    C: InputPin + OutputPin<Error = Infallible>,
    D: InputPin + OutputPin<Error = Infallible>,
{
    fn clock_is_low(&mut self) -> bool {
        infallible(self.clock.is_low())
    }

    fn data_is_high(&mut self) -> bool {
        infallible(self.data.is_high())
    }

    fn hold_clock_low(&mut self) {
        infallible(self.clock.set_low())
    }

    fn release_clock(&mut self) {
        infallible(self.clock.set_high())
    }

    fn hold_data_low(&mut self) {
        infallible(self.data.set_low())
    }

    fn release_data(&mut self) {
        infallible(self.data.set_high())
    }
}

fn infallible<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}
