//! GPIO actuator.
//!
//! Stateless wrapper over a [`GpioPort`] backend: validates the pin number
//! and drives the line. An invalid pin is never an error at the command
//! boundary; it is reported here, at driver level, and otherwise ignored.

use embedded_hal::digital::PinState;
use log::warn;

use crate::app::ports::GpioPort;

pub struct GpioActuator<P> {
    port: P,
}

impl<P: GpioPort> GpioActuator<P> {
    pub fn new(port: P) -> Self {
        Self { port }
    }

    /// Validate `pin` and drive it to `level`. Returns `true` when the
    /// write reached the line.
    pub fn set(&self, pin: u32, level: PinState) -> bool {
        if !self.port.is_valid(pin) {
            warn!("gpio: pin {} is not a valid output, ignored", pin);
            return false;
        }
        match self.port.write(pin, level) {
            Ok(()) => true,
            Err(e) => {
                warn!("gpio: {}", e);
                false
            }
        }
    }

    pub fn port(&self) -> &P {
        &self.port
    }
}
