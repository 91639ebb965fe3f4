//! Active-low board LEDs.

use ars_central::AssistIndicator;
use embassy_nrf::gpio::{AnyPin, Level, Output, OutputDrive};

pub struct Led {
    pin: Output<'static>,
}

impl Led {
    /// Take `pin` as an LED, initially off.
    pub fn new(pin: AnyPin) -> Self {
        Self {
            pin: Output::new(pin, Level::High, OutputDrive::Standard),
        }
    }

    pub fn on(&mut self) {
        self.pin.set_low();
    }

    pub fn off(&mut self) {
        self.pin.set_high();
    }
}

impl AssistIndicator for Led {
    fn set_assist_requested(&mut self, requested: bool) {
        if requested {
            self.on();
        } else {
            self.off();
        }
    }
}
