//! Channel-backed GATT queue shared by the ARS task (producer) and the
//! link task (consumer).

use core::cell::RefCell;

use ars_central::ble::gatt_queue::{GattQueue, GattRequest, QueueError};
use ars_central::config::{GATT_QUEUE_DEPTH, MAX_CONNECTIONS};
use defmt::debug;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use heapless::Vec;

pub struct SoftdeviceQueue {
    requests: Channel<CriticalSectionRawMutex, GattRequest, GATT_QUEUE_DEPTH>,
    links: Mutex<CriticalSectionRawMutex, RefCell<Vec<u16, MAX_CONNECTIONS>>>,
}

impl SoftdeviceQueue {
    pub const fn new() -> Self {
        Self {
            requests: Channel::new(),
            links: Mutex::new(RefCell::new(Vec::new())),
        }
    }

    /// Wait for the next request to execute.
    pub async fn next(&self) -> GattRequest {
        self.requests.receive().await
    }

    /// Forget a closed link and drop whatever it still had queued.
    pub fn on_disconnected(&self, conn_handle: u16) {
        self.links
            .lock(|links| links.borrow_mut().retain(|&c| c != conn_handle));

        let mut dropped = 0usize;
        for _ in 0..self.requests.len() {
            let Ok(request) = self.requests.try_receive() else {
                break;
            };
            // A producer may have refilled the freed slot meanwhile.
            if request.conn_handle == conn_handle || self.requests.try_send(request).is_err() {
                dropped += 1;
            }
        }
        if dropped > 0 {
            debug!("Dropped {} queued requests for conn 0x{:04x}", dropped, conn_handle);
        }
    }
}

impl GattQueue for SoftdeviceQueue {
    fn register_connection(&self, conn_handle: u16) -> Result<(), QueueError> {
        self.links.lock(|links| {
            let mut links = links.borrow_mut();
            if links.contains(&conn_handle) {
                return Ok(());
            }
            links.push(conn_handle).map_err(|_| QueueError::Full)
        })
    }

    fn enqueue(&self, request: GattRequest) -> Result<(), QueueError> {
        let known = self
            .links
            .lock(|links| links.borrow().contains(&request.conn_handle));
        if !known {
            return Err(QueueError::InvalidConnHandle);
        }
        self.requests
            .try_send(request)
            .map_err(|_| QueueError::Full)
    }
}

/// Queue shared by every ARS client in the firmware.
pub static GATT_QUEUE: SoftdeviceQueue = SoftdeviceQueue::new();
