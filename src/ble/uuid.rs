//! BLE UUIDs: SIG-assigned 16-bit values and vendor 128-bit values.
//!
//! Vendor UUIDs follow the SoftDevice convention: a 128-bit base with the
//! 16-bit alias written little-endian into bytes 12 and 13.

use crate::config::{ARS_UUID_ASSIST_REQ_CHAR, ARS_UUID_BASE, ARS_UUID_SERVICE, BLE_UUID_CCCD};

/// Bluetooth SIG base UUID `0000xxxx-0000-1000-8000-00805F9B34FB`, little-endian.
const SIG_BASE: [u8; 16] = [
    0xFB, 0x34, 0x9B, 0x5F, 0x80, 0x00, 0x00, 0x80, 0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Uuid {
    /// SIG-assigned 16-bit UUID.
    Uuid16(u16),
    /// Full 128-bit UUID, little-endian.
    Uuid128([u8; 16]),
}

impl Uuid {
    /// Vendor UUID built from `base` with `alias` in bytes 12..14.
    pub const fn vendor(base: [u8; 16], alias: u16) -> Self {
        let b = base;
        Uuid::Uuid128([
            b[0],
            b[1],
            b[2],
            b[3],
            b[4],
            b[5],
            b[6],
            b[7],
            b[8],
            b[9],
            b[10],
            b[11],
            alias as u8,
            (alias >> 8) as u8,
            b[14],
            b[15],
        ])
    }

    /// Little-endian 128-bit form (16-bit values expanded over the SIG base).
    pub fn to_le_bytes(&self) -> [u8; 16] {
        match *self {
            Uuid::Uuid128(bytes) => bytes,
            Uuid::Uuid16(short) => Uuid::vendor(SIG_BASE, short).to_le_bytes(),
        }
    }

    /// Parse a little-endian UUID as found in advertising or ATT PDUs.
    /// Only 2- and 16-byte inputs are valid.
    pub fn from_le_slice(data: &[u8]) -> Option<Self> {
        match data.len() {
            2 => Some(Uuid::Uuid16(u16::from_le_bytes([data[0], data[1]]))),
            16 => {
                let mut bytes = [0u8; 16];
                bytes.copy_from_slice(data);
                Some(Uuid::Uuid128(bytes))
            }
            _ => None,
        }
    }

    /// Compare by value, so `Uuid16(x)` equals its SIG-base 128-bit expansion.
    pub fn matches(&self, other: &Uuid) -> bool {
        self.to_le_bytes() == other.to_le_bytes()
    }
}

/// The Assistance Request Service.
pub const ARS_SERVICE: Uuid = Uuid::vendor(ARS_UUID_BASE, ARS_UUID_SERVICE);

/// The Assistance Request characteristic.
pub const ARS_ASSIST_REQ_CHAR: Uuid = Uuid::vendor(ARS_UUID_BASE, ARS_UUID_ASSIST_REQ_CHAR);

/// Client Characteristic Configuration Descriptor.
pub const CCCD: Uuid = Uuid::Uuid16(BLE_UUID_CCCD);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_alias_lands_in_bytes_12_and_13() {
        let bytes = ARS_SERVICE.to_le_bytes();
        assert_eq!(bytes[12], 0x00);
        assert_eq!(bytes[13], 0x10);
        assert_eq!(bytes[..12], ARS_UUID_BASE[..12]);
        assert_eq!(bytes[14..], ARS_UUID_BASE[14..]);
    }

    #[test]
    fn service_and_characteristic_differ_only_in_alias() {
        let svc = ARS_SERVICE.to_le_bytes();
        let chr = ARS_ASSIST_REQ_CHAR.to_le_bytes();
        assert_eq!(chr[12], 0x01);
        assert_eq!(chr[13], 0x10);
        assert_ne!(ARS_SERVICE, ARS_ASSIST_REQ_CHAR);
        assert_eq!(svc[..12], chr[..12]);
    }

    #[test]
    fn sixteen_bit_matches_its_sig_expansion() {
        let expanded = Uuid::Uuid128(CCCD.to_le_bytes());
        assert!(CCCD.matches(&expanded));
        assert_ne!(CCCD, expanded);
        assert!(!CCCD.matches(&ARS_SERVICE));
    }

    #[test]
    fn from_le_slice_accepts_only_valid_lengths() {
        assert_eq!(Uuid::from_le_slice(&[0x02, 0x29]), Some(CCCD));
        assert_eq!(
            Uuid::from_le_slice(&ARS_SERVICE.to_le_bytes()),
            Some(ARS_SERVICE)
        );
        assert_eq!(Uuid::from_le_slice(&[0x02]), None);
        assert_eq!(Uuid::from_le_slice(&[0u8; 4]), None);
    }
}
