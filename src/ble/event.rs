//! Events delivered to the ARS client by its collaborators.
//!
//! [`BleEvent`] mirrors the raw link-layer events of the BLE stack
//! (connection lifecycle, handle value notifications, GATT responses);
//! [`DbDiscoveryEvent`] is what the discovery module reports once a
//! discovery pass over a peer's attribute table finishes.

use heapless::Vec;

use crate::ble::uuid::Uuid;
use crate::ble::{AttValue, GattStatus};
use crate::config::{MAX_DESCRIPTORS_PER_CHAR, MAX_DISCOVERED_CHARS};

/// Kind of handle value PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HvxKind {
    Notification,
    Indication,
}

/// Low-level BLE stack event, tagged with the connection it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BleEvent {
    /// A link was established.
    Connected { conn_handle: u16 },
    /// A link was closed. `reason` is the HCI disconnect reason.
    Disconnected { conn_handle: u16, reason: u8 },
    /// The peer pushed a characteristic value.
    Hvx {
        conn_handle: u16,
        attr_handle: u16,
        kind: HvxKind,
        data: AttValue,
    },
    /// Response to a queued read.
    ReadResponse {
        conn_handle: u16,
        attr_handle: u16,
        status: GattStatus,
        data: AttValue,
    },
    /// Completion of a queued write.
    WriteResponse {
        conn_handle: u16,
        attr_handle: u16,
        status: GattStatus,
    },
}

/// Inclusive attribute handle range of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HandleRange {
    pub start: u16,
    pub end: u16,
}

impl HandleRange {
    pub fn contains(&self, handle: u16) -> bool {
        self.start <= handle && handle <= self.end
    }
}

/// A descriptor found below a characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DiscoveredDescriptor {
    pub uuid: Uuid,
    pub handle: u16,
}

/// A characteristic found inside a service, with its descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DiscoveredCharacteristic {
    pub uuid: Uuid,
    pub handle_decl: u16,
    pub handle_value: u16,
    pub descriptors: Vec<DiscoveredDescriptor, MAX_DESCRIPTORS_PER_CHAR>,
}

impl DiscoveredCharacteristic {
    /// Handle of the first descriptor matching `uuid`.
    pub fn descriptor_handle(&self, uuid: &Uuid) -> Option<u16> {
        self.descriptors
            .iter()
            .find(|d| d.uuid.matches(uuid))
            .map(|d| d.handle)
    }
}

/// One service as reported by a completed discovery pass.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DiscoveredService {
    pub uuid: Uuid,
    pub range: HandleRange,
    pub characteristics: Vec<DiscoveredCharacteristic, MAX_DISCOVERED_CHARS>,
}

impl DiscoveredService {
    /// First characteristic matching `uuid` whose value handle lies in
    /// the service range.
    pub fn characteristic(&self, uuid: &Uuid) -> Option<&DiscoveredCharacteristic> {
        self.characteristics
            .iter()
            .find(|c| c.uuid.matches(uuid) && self.range.contains(c.handle_value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DbDiscoveryOutcome {
    /// A registered service was found and enumerated.
    Complete(DiscoveredService),
    /// The peer does not expose the registered service.
    ServiceNotFound(Uuid),
    /// Discovery aborted with a stack error code.
    Failed(u32),
}

/// Result of a discovery pass on one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DbDiscoveryEvent {
    pub conn_handle: u16,
    pub outcome: DbDiscoveryOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::uuid::{ARS_ASSIST_REQ_CHAR, CCCD};

    fn characteristic(handle_value: u16, cccd: Option<u16>) -> DiscoveredCharacteristic {
        let mut descriptors = Vec::new();
        if let Some(handle) = cccd {
            descriptors
                .push(DiscoveredDescriptor { uuid: CCCD, handle })
                .unwrap();
        }
        DiscoveredCharacteristic {
            uuid: ARS_ASSIST_REQ_CHAR,
            handle_decl: handle_value - 1,
            handle_value,
            descriptors,
        }
    }

    #[test]
    fn handle_range_is_inclusive() {
        let range = HandleRange { start: 0x10, end: 0x20 };
        assert!(range.contains(0x10));
        assert!(range.contains(0x20));
        assert!(!range.contains(0x0F));
        assert!(!range.contains(0x21));
    }

    #[test]
    fn characteristic_outside_range_is_not_found() {
        let mut characteristics = Vec::new();
        characteristics.push(characteristic(0x30, Some(0x31))).unwrap();
        let service = DiscoveredService {
            uuid: crate::ble::uuid::ARS_SERVICE,
            range: HandleRange { start: 0x10, end: 0x20 },
            characteristics,
        };
        assert!(service.characteristic(&ARS_ASSIST_REQ_CHAR).is_none());
    }

    #[test]
    fn descriptor_lookup_by_uuid() {
        let chr = characteristic(0x14, Some(0x15));
        assert_eq!(chr.descriptor_handle(&CCCD), Some(0x15));

        let bare = characteristic(0x14, None);
        assert_eq!(bare.descriptor_handle(&CCCD), None);
    }
}
