//! SoftDevice side of the firmware: scanning, connecting and executing
//! GATT work for the ARS client.
//!
//! The central task owns the radio. It scans for an ARS peripheral,
//! connects, and hands the link to [`link::run`], which reports everything
//! that happens on it through [`LINK_EVENTS`]. The ARS task on the other
//! end feeds those events to the client and queues requests into
//! [`queue::GATT_QUEUE`].

pub mod link;
pub mod queue;
pub mod scanner;

use ars_central::ble::event::{BleEvent, DbDiscoveryEvent};
use defmt::info;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Timer};
use nrf_softdevice::Softdevice;

use crate::board::led::Led;

/// Pause before scanning again after a failed scan or connect.
const RETRY_DELAY_MS: u64 = 1000;

/// Everything the ARS task needs to know about a link.
pub enum LinkEvent {
    Ble(BleEvent),
    Discovery(DbDiscoveryEvent),
}

pub static LINK_EVENTS: Channel<CriticalSectionRawMutex, LinkEvent, 8> = Channel::new();

#[embassy_executor::task]
pub async fn central_task(sd: &'static Softdevice, mut scan_led: Led) -> ! {
    loop {
        scan_led.on();
        let Some(address) = scanner::scan_for_ars(sd).await else {
            Timer::after(Duration::from_millis(RETRY_DELAY_MS)).await;
            continue;
        };
        scan_led.off();

        let Some(conn) = link::connect(sd, &address).await else {
            Timer::after(Duration::from_millis(RETRY_DELAY_MS)).await;
            continue;
        };

        link::run(&conn).await;
        info!("Returning to scan");
    }
}
