//! One BLE link to an ARS peripheral.
//!
//! After GAP connection is established, this module:
//! 1. Reports the new connection to the ARS task.
//! 2. Discovers the Assistance Request Service and reports the attribute
//!    table it found (or why it found none).
//! 3. Pumps handle value notifications to the ARS task while executing the
//!    requests the ARS client queued, until the link drops.

use ars_central::ble::event::{
    BleEvent, DbDiscoveryEvent, DbDiscoveryOutcome, DiscoveredCharacteristic,
    DiscoveredDescriptor, DiscoveredService, HandleRange, HvxKind,
};
use ars_central::ble::gatt_queue::{GattOp, GattRequest, WriteOp};
use ars_central::ble::uuid::{Uuid, ARS_ASSIST_REQ_CHAR, ARS_SERVICE, CCCD};
use ars_central::ble::{AttValue, GattStatus};
use ars_central::config::{self, ATT_MAX_VALUE_LEN};
use defmt::{info, warn};
use embassy_futures::select::{select, Either};
use heapless::Vec;
use nrf_softdevice::ble::gatt_client::{self, Characteristic, Descriptor, DiscoverError};
use nrf_softdevice::ble::{central, Address, Connection, HvxType};
use nrf_softdevice::{raw, Softdevice};

use crate::central::queue::GATT_QUEUE;
use crate::central::{LinkEvent, LINK_EVENTS};

/// The SoftDevice wrapper does not surface the HCI disconnect reason.
const DISCONNECT_REASON_UNKNOWN: u8 = 0x00;

pub async fn connect(sd: &'static Softdevice, address: &Address) -> Option<Connection> {
    let whitelist = [address];
    let conn_cfg = central::ConnectConfig {
        scan_config: central::ScanConfig {
            whitelist: Some(&whitelist),
            ..Default::default()
        },
        conn_params: raw::ble_gap_conn_params_t {
            min_conn_interval: config::BLE_CONN_INTERVAL_MIN,
            max_conn_interval: config::BLE_CONN_INTERVAL_MAX,
            slave_latency: config::BLE_SLAVE_LATENCY,
            conn_sup_timeout: config::BLE_SUP_TIMEOUT,
        },
        ..Default::default()
    };

    match central::connect(sd, &conn_cfg).await {
        Ok(conn) => Some(conn),
        Err(e) => {
            warn!("Connect failed: {:?}", e);
            None
        }
    }
}

/// Drive `conn` until it is closed.
pub async fn run(conn: &Connection) {
    let Some(conn_handle) = conn.handle() else {
        return;
    };
    info!("Link up on conn 0x{:04x}", conn_handle);
    LINK_EVENTS
        .send(LinkEvent::Ble(BleEvent::Connected { conn_handle }))
        .await;

    let (collector, outcome) = match gatt_client::discover::<ArsCollector>(conn).await {
        Ok(collector) => {
            let outcome = DbDiscoveryOutcome::Complete(collector.service.clone());
            (Some(collector), outcome)
        }
        Err(DiscoverError::ServiceNotFound) => (None, DbDiscoveryOutcome::ServiceNotFound(ARS_SERVICE)),
        Err(e) => {
            warn!("Discovery failed: {:?}", e);
            (None, DbDiscoveryOutcome::Failed(raw::NRF_ERROR_INTERNAL))
        }
    };
    LINK_EVENTS
        .send(LinkEvent::Discovery(DbDiscoveryEvent {
            conn_handle,
            outcome,
        }))
        .await;

    match collector {
        Some(collector) => {
            let notifications = gatt_client::run(conn, &collector, |evt| {
                // try_send avoids blocking the SoftDevice event loop; if the
                // ARS task is behind, we drop.
                if LINK_EVENTS.try_send(LinkEvent::Ble(evt)).is_err() {
                    warn!("Link event channel full - dropping notification");
                }
            });
            if let Either::First(e) = select(notifications, execute_requests(conn, conn_handle)).await {
                info!("Notification loop ended: {:?}", e);
            }
        }
        None => {
            // Nothing to talk to; drop the link and go back to scanning.
            let _ = conn.disconnect();
        }
    }

    GATT_QUEUE.on_disconnected(conn_handle);
    info!("Link down on conn 0x{:04x}", conn_handle);
    LINK_EVENTS
        .send(LinkEvent::Ble(BleEvent::Disconnected {
            conn_handle,
            reason: DISCONNECT_REASON_UNKNOWN,
        }))
        .await;
}

/// Execute queued requests for `conn_handle` in FIFO order and report their
/// completion as stack events. Returns once the link is gone.
async fn execute_requests(conn: &Connection, conn_handle: u16) {
    loop {
        let request = GATT_QUEUE.next().await;
        if request.conn_handle != conn_handle {
            warn!("Request for stale conn 0x{:04x} dropped", request.conn_handle);
            continue;
        }
        if conn.handle().is_none() {
            return;
        }

        if let Some(evt) = execute(conn, request).await {
            LINK_EVENTS.send(LinkEvent::Ble(evt)).await;
        }
    }
}

/// Run one request. A request cut short by the link dropping yields no
/// event; the disconnect that follows says it all.
async fn execute(conn: &Connection, request: GattRequest) -> Option<BleEvent> {
    let conn_handle = request.conn_handle;
    match request.op {
        GattOp::Write {
            attr_handle,
            op: WriteOp::Request,
            value,
        } => {
            let status = match gatt_client::write(conn, attr_handle, &value).await {
                Ok(()) => GattStatus::SUCCESS,
                Err(_) if conn.handle().is_none() => return None,
                Err(e) => {
                    warn!("Write to 0x{:04x} failed: {:?}", attr_handle, e);
                    GattStatus::UNLIKELY_ERROR
                }
            };
            Some(BleEvent::WriteResponse {
                conn_handle,
                attr_handle,
                status,
            })
        }
        GattOp::Write {
            attr_handle,
            op: WriteOp::Command,
            value,
        } => {
            // Write commands are not acknowledged by the peer, so only a
            // local failure produces a response.
            match gatt_client::write_without_response(conn, attr_handle, &value).await {
                Ok(()) => None,
                Err(_) if conn.handle().is_none() => None,
                Err(e) => {
                    warn!("Write command to 0x{:04x} failed: {:?}", attr_handle, e);
                    Some(BleEvent::WriteResponse {
                        conn_handle,
                        attr_handle,
                        status: GattStatus::UNLIKELY_ERROR,
                    })
                }
            }
        }
        GattOp::Read { attr_handle } => {
            let mut buf = [0u8; ATT_MAX_VALUE_LEN];
            let (status, data) = match gatt_client::read(conn, attr_handle, &mut buf).await {
                Ok(len) => (
                    GattStatus::SUCCESS,
                    AttValue::from_slice(&buf[..len.min(ATT_MAX_VALUE_LEN)]).unwrap_or_default(),
                ),
                Err(_) if conn.handle().is_none() => return None,
                Err(e) => {
                    warn!("Read of 0x{:04x} failed: {:?}", attr_handle, e);
                    (GattStatus::UNLIKELY_ERROR, AttValue::new())
                }
            };
            Some(BleEvent::ReadResponse {
                conn_handle,
                attr_handle,
                status,
                data,
            })
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Discovery
// ═══════════════════════════════════════════════════════════════════════════

fn to_softdevice_uuid(uuid: &Uuid) -> nrf_softdevice::ble::Uuid {
    match uuid {
        Uuid::Uuid16(short) => nrf_softdevice::ble::Uuid::new_16(*short),
        Uuid::Uuid128(bytes) => nrf_softdevice::ble::Uuid::new_128(bytes),
    }
}

/// Map a SoftDevice UUID back onto the ones the ARS client looks for.
/// Anything else is recorded as an unnamed 16-bit placeholder.
fn from_softdevice_uuid(uuid: Option<&nrf_softdevice::ble::Uuid>) -> Uuid {
    uuid.and_then(|u| {
        [ARS_ASSIST_REQ_CHAR, CCCD]
            .into_iter()
            .find(|known| to_softdevice_uuid(known) == *u)
    })
    .unwrap_or(Uuid::Uuid16(0x0000))
}

/// Records the Assistance Request Service's attribute table during
/// `gatt_client::discover` and decodes notifications afterwards.
struct ArsCollector {
    conn_handle: u16,
    service: DiscoveredService,
}

impl gatt_client::Client for ArsCollector {
    type Event = BleEvent;

    fn uuid() -> nrf_softdevice::ble::Uuid {
        to_softdevice_uuid(&ARS_SERVICE)
    }

    fn new_undiscovered(conn: Connection) -> Self {
        Self {
            conn_handle: conn.handle().unwrap_or(ars_central::ble::CONN_HANDLE_INVALID),
            service: DiscoveredService {
                uuid: ARS_SERVICE,
                range: HandleRange {
                    start: u16::MAX,
                    end: 0,
                },
                characteristics: Vec::new(),
            },
        }
    }

    fn discovered_characteristic(
        &mut self,
        characteristic: &Characteristic,
        descriptors: &[Descriptor],
    ) {
        let mut recorded = DiscoveredCharacteristic {
            uuid: from_softdevice_uuid(characteristic.uuid.as_ref()),
            handle_decl: characteristic.handle_decl,
            handle_value: characteristic.handle_value,
            descriptors: Vec::new(),
        };

        let range = &mut self.service.range;
        range.start = range.start.min(characteristic.handle_decl);
        range.end = range.end.max(characteristic.handle_value);

        for descriptor in descriptors {
            range.end = range.end.max(descriptor.handle);
            let entry = DiscoveredDescriptor {
                uuid: from_softdevice_uuid(descriptor.uuid.as_ref()),
                handle: descriptor.handle,
            };
            if recorded.descriptors.push(entry).is_err() {
                warn!("Descriptor table full at 0x{:04x}", descriptor.handle);
                break;
            }
        }

        if self.service.characteristics.push(recorded).is_err() {
            warn!(
                "Characteristic table full at 0x{:04x}",
                characteristic.handle_value
            );
        }
    }

    fn discovery_complete(&mut self) -> Result<(), DiscoverError> {
        // Whether the table is usable is for the ARS client to judge.
        Ok(())
    }

    fn on_hvx(
        &self,
        _conn: &Connection,
        type_: HvxType,
        handle: u16,
        data: &[u8],
    ) -> Option<Self::Event> {
        let kind = match type_ {
            HvxType::Notification => HvxKind::Notification,
            HvxType::Indication => HvxKind::Indication,
            _ => return None,
        };
        let data = &data[..data.len().min(ATT_MAX_VALUE_LEN)];
        Some(BleEvent::Hvx {
            conn_handle: self.conn_handle,
            attr_handle: handle,
            kind,
            data: AttValue::from_slice(data).unwrap_or_default(),
        })
    }
}
