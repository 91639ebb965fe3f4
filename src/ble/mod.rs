//! Bluetooth Low Energy client side of the Assistance Request Service.
//!
//! 1. **Events** - link-layer and discovery events delivered by the stack.
//! 2. **GATT queue** - the transport collaborator that serialises outbound
//!    writes/reads per connection.
//! 3. **ARS client** - per-peer state machine that binds attribute handles,
//!    arms notifications and turns raw events into [`ars_client::ArsClientEvent`]s.
//! 4. **Client pool** - several clients for several simultaneous peers.
//!
//! The link layer itself (connection establishment, ATT framing,
//! notification delivery) is supplied by the SoftDevice.

pub mod adv_parser;
pub mod ars_client;
pub mod discovery;
pub mod event;
pub mod gatt_queue;
pub mod multi_conn;
pub mod uuid;

use heapless::Vec;

use crate::config::ATT_MAX_VALUE_LEN;

/// Connection handle value meaning "no link".
pub const CONN_HANDLE_INVALID: u16 = 0xFFFF;

/// Attribute handle value meaning "not discovered". ATT handles start at 1.
pub const ATTR_HANDLE_INVALID: u16 = 0x0000;

/// Attribute value as carried by one write, read response or notification.
pub type AttValue = Vec<u8, ATT_MAX_VALUE_LEN>;

/// GATT operation status as reported by the stack.
///
/// `0` is success; ATT error codes are offset by `0x0100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GattStatus(pub u16);

impl GattStatus {
    pub const SUCCESS: GattStatus = GattStatus(0x0000);
    pub const INVALID_HANDLE: GattStatus = GattStatus(0x0101);
    pub const READ_NOT_PERMITTED: GattStatus = GattStatus(0x0102);
    pub const WRITE_NOT_PERMITTED: GattStatus = GattStatus(0x0103);
    pub const INSUFFICIENT_AUTHENTICATION: GattStatus = GattStatus(0x0105);
    pub const UNLIKELY_ERROR: GattStatus = GattStatus(0x010E);

    pub fn is_success(&self) -> bool {
        *self == Self::SUCCESS
    }
}
