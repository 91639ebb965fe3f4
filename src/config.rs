//! Application-wide constants and compile-time configuration.
//!
//! Protocol identifiers, buffer capacities, BLE timing parameters and
//! board pin assignments live here so they can be tuned in one place.

use crate::ble::gatt_queue::WriteOp;

// Assistance Request Service

/// Vendor-specific 128-bit base UUID of the Assistance Request Service
/// (little-endian, as stored over the air).
pub const ARS_UUID_BASE: [u8; 16] = [
    0xD2, 0x5F, 0xC5, 0xB3, 0xD6, 0xBA, 0xCF, 0x84, 0x1E, 0x45, 0x13, 0x14, 0x6A, 0x66, 0xD7, 0xBA,
];

/// 16-bit alias of the service inside the vendor base.
pub const ARS_UUID_SERVICE: u16 = 0x1000;

/// 16-bit alias of the Assistance Request characteristic.
pub const ARS_UUID_ASSIST_REQ_CHAR: u16 = 0x1001;

/// Write operation used by `ArsClient::send_status` unless overridden.
pub const ASSIST_REQ_WRITE_OP: WriteOp = WriteOp::Command;

// GATT

/// Client Characteristic Configuration Descriptor.
pub const BLE_UUID_CCCD: u16 = 0x2902;

/// CCCD bit pattern that arms notifications (sent little-endian).
pub const CCCD_NOTIFICATION_ENABLE: u16 = 0x0001;

/// Largest attribute value carried in a single write / notification
/// (default ATT MTU 23 minus the 3-byte header).
pub const ATT_MAX_VALUE_LEN: usize = 20;

// Capacities

/// Maximum simultaneous peers tracked by an `ArsClientPool`.
pub const MAX_CONNECTIONS: usize = 2;

/// Outstanding GATT requests the queue holds before refusing more.
pub const GATT_QUEUE_DEPTH: usize = 8;

/// Characteristics recorded per discovered service.
pub const MAX_DISCOVERED_CHARS: usize = 6;

/// Descriptors recorded per discovered characteristic.
pub const MAX_DESCRIPTORS_PER_CHAR: usize = 4;

/// Service UUIDs the discovery registry accepts.
pub const MAX_REGISTERED_SERVICES: usize = 4;

// BLE link

/// BLE connection interval range (in 1.25 ms units).
/// 24 = 30 ms, 80 = 100 ms; assistance requests are not latency critical.
pub const BLE_CONN_INTERVAL_MIN: u16 = 24;
pub const BLE_CONN_INTERVAL_MAX: u16 = 80;

/// BLE slave latency (number of connection events the peripheral can skip).
pub const BLE_SLAVE_LATENCY: u16 = 0;

/// BLE supervision timeout (in 10 ms units). 400 = 4 s.
pub const BLE_SUP_TIMEOUT: u16 = 400;

// GPIO pin assignments (nRF52840-DK defaults)
//
// These are logical names; actual `embassy_nrf::peripherals::*` types are
// selected in `main.rs`.  Adjust for your custom PCB.
//
//   LED 1 (scanning)             → P0.13
//   LED 2 (assistance requested) → P0.14
//   Button 1 (acknowledge)       → P0.11

/// Button debounce time (ms).
pub const BUTTON_DEBOUNCE_MS: u64 = 50;
