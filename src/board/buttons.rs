//! GPIO button input with async debouncing.
//!
//! One physical button (active-low with internal pull-up) acknowledges an
//! assistance request. The task waits for a GPIO edge, debounces it, and
//! posts a press to [`ACK_BUTTON`].

use ars_central::config::BUTTON_DEBOUNCE_MS;
use defmt::info;
use embassy_nrf::gpio::{AnyPin, Input, Pull};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Timer};

/// Debounced presses of the acknowledge button.
pub static ACK_BUTTON: Channel<CriticalSectionRawMutex, (), 4> = Channel::new();

/// Waits for the pin to go low (pressed), debounces, posts the press,
/// then waits for release before repeating.
#[embassy_executor::task]
pub async fn ack_button_task(pin: AnyPin) -> ! {
    let mut btn = Input::new(pin, Pull::Up);

    loop {
        // Wait for falling edge (button press, active-low).
        btn.wait_for_falling_edge().await;

        // Debounce: wait and re-check.
        Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;

        if btn.is_low() {
            info!("Ack button pressed");
            // Presses while the ARS task is busy collapse into the queued ones.
            let _ = ACK_BUTTON.try_send(());

            // Wait for release to avoid repeat triggers.
            btn.wait_for_rising_edge().await;
            Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;
        }
    }
}
