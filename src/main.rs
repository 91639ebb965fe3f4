//! ars-central firmware - nRF52840 + S140 SoftDevice.
//!
//! Scans for a peripheral exposing the Assistance Request Service,
//! subscribes to its Assistance Request characteristic and mirrors the
//! request state on LED 2. Button 1 acknowledges the request. LED 1 is lit
//! while scanning.
//!
//! Task layout:
//!   - `softdevice_task`  - SoftDevice event loop
//!   - `central_task`     - scan / connect / discover / execute GATT work
//!   - `ack_button_task`  - debounced acknowledge button
//!   - `ars_task`         - ARS client + application glue

#![no_std]
#![no_main]

mod board;
mod central;

use core::cell::RefCell;
use core::mem;

use ars_central::ble::event::BleEvent;
use ars_central::ble::uuid::Uuid;
use ars_central::config::{MAX_CONNECTIONS, MAX_REGISTERED_SERVICES};
use ars_central::{ArsClient, ArsClientEvent, ArsClientInit, AssistMonitor, ClientState, Error};
use defmt::{info, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_nrf::gpio::Pin as _;
use embassy_nrf::interrupt::Priority;
use heapless::{Deque, Vec};
use nrf_softdevice::{raw, Softdevice};
use panic_probe as _;

use crate::board::buttons::{ack_button_task, ACK_BUTTON};
use crate::board::led::Led;
use crate::central::queue::GATT_QUEUE;
use crate::central::{central_task, LinkEvent, LINK_EVENTS};

const DEVICE_NAME: &[u8] = b"ARS Central";

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

/// Errors reported by the ARS client outside of a direct call. A lost link
/// is expected; anything else is a bug or a misbehaving peer.
fn ars_error_handler(e: Error) {
    if e.is_benign() {
        warn!("ARS: {}", e);
    } else {
        defmt::panic!("ARS error: {}", e);
    }
}

#[embassy_executor::task]
async fn ars_task(assist_led: Led) -> ! {
    let pending: RefCell<Deque<ArsClientEvent, 4>> = RefCell::new(Deque::new());
    let mut registry: Vec<Uuid, MAX_REGISTERED_SERVICES> = Vec::new();

    let mut client = defmt::unwrap!(ArsClient::new(
        ArsClientInit {
            evt_handler: Some(|evt: &ArsClientEvent| {
                if pending.borrow_mut().push_back(*evt).is_err() {
                    warn!("ARS event buffer full - dropping {}", evt);
                }
            }),
            gatt_queue: Some(&GATT_QUEUE),
            error_handler: Some(ars_error_handler),
        },
        &mut registry,
    ));
    info!("Discovery registry: {} service(s)", registry.len());

    let mut monitor = AssistMonitor::new(assist_led);

    loop {
        match select(LINK_EVENTS.receive(), ACK_BUTTON.receive()).await {
            Either::First(LinkEvent::Ble(evt)) => {
                client.handle_ble_event(&evt);
                if matches!(evt, BleEvent::Disconnected { .. })
                    && client.state() == ClientState::Unbound
                {
                    monitor.on_disconnected();
                }
            }
            Either::First(LinkEvent::Discovery(evt)) => client.handle_discovery_event(&evt),
            Either::Second(()) => match monitor.on_ack_button(&client) {
                Ok(true) => info!("Assistance request acknowledged"),
                Ok(false) => {}
                Err(e) => ars_error_handler(e),
            },
        }

        // Client events are buffered by the handler and applied here, once
        // the client is no longer borrowed by its own event sink.
        loop {
            let next = pending.borrow_mut().pop_front();
            let Some(evt) = next else {
                break;
            };
            if let Err(e) = monitor.on_client_event(&mut client, &evt) {
                ars_error_handler(e);
            }
        }
    }
}

fn softdevice_config() -> nrf_softdevice::Config {
    nrf_softdevice::Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: MAX_CONNECTIONS as u8,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 23 }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 0,
            periph_role_count: 0,
            central_role_count: MAX_CONNECTIONS as u8,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: DEVICE_NAME.as_ptr() as _,
            current_len: DEVICE_NAME.len() as u16,
            max_len: DEVICE_NAME.len() as u16,
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("ars-central starting");

    // The SoftDevice reserves interrupt priorities 0, 1 and 4.
    let mut config = embassy_nrf::config::Config::default();
    config.gpiote_interrupt_priority = Priority::P2;
    config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(config);

    let sd = Softdevice::enable(&softdevice_config());
    defmt::unwrap!(spawner.spawn(softdevice_task(sd)));

    let scan_led = Led::new(p.P0_13.degrade());
    let assist_led = Led::new(p.P0_14.degrade());

    defmt::unwrap!(spawner.spawn(ack_button_task(p.P0_11.degrade())));
    defmt::unwrap!(spawner.spawn(ars_task(assist_led)));
    defmt::unwrap!(spawner.spawn(central_task(sd, scan_led)));
}
