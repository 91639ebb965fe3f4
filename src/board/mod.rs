//! nRF52840-DK peripherals used by the firmware: two LEDs and the
//! acknowledge button.

pub mod buttons;
pub mod led;
