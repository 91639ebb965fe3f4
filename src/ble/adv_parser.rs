//! Advertising data helpers used by the scanner to pick ARS peripherals.

use heapless::String;

use crate::ble::uuid::Uuid;

const AD_INCOMPLETE_UUID16: u8 = 0x02;
const AD_COMPLETE_UUID16: u8 = 0x03;
const AD_INCOMPLETE_UUID128: u8 = 0x06;
const AD_COMPLETE_UUID128: u8 = 0x07;
const AD_SHORT_NAME: u8 = 0x08;
const AD_COMPLETE_NAME: u8 = 0x09;

/// Walk the `len | type | payload` structures of raw advertising data.
/// Stops at a zero length or a structure running past the buffer.
fn ad_structures(data: &[u8]) -> impl Iterator<Item = (u8, &[u8])> {
    let mut i = 0;
    core::iter::from_fn(move || {
        let len = *data.get(i)? as usize;
        if len == 0 || i + len >= data.len() {
            return None;
        }
        let ad_type = data[i + 1];
        let payload = &data[i + 2..i + 1 + len];
        i += len + 1;
        Some((ad_type, payload))
    })
}

/// Check if raw advertisement data lists `uuid` among its service UUIDs.
pub fn contains_service_uuid(data: &[u8], uuid: &Uuid) -> bool {
    ad_structures(data).any(|(ad_type, payload)| {
        let width = match ad_type {
            AD_INCOMPLETE_UUID16 | AD_COMPLETE_UUID16 => 2,
            AD_INCOMPLETE_UUID128 | AD_COMPLETE_UUID128 => 16,
            _ => return false,
        };
        payload
            .chunks_exact(width)
            .filter_map(Uuid::from_le_slice)
            .any(|advertised| advertised.matches(uuid))
    })
}

/// Extract complete/shortened local name from advertisement data.
pub fn extract_device_name(data: &[u8]) -> String<32> {
    let mut name = String::new();
    match ad_structures(data).find(|(t, _)| *t == AD_SHORT_NAME || *t == AD_COMPLETE_NAME) {
        Some((_, bytes)) => {
            for &b in bytes {
                if name.push(b as char).is_err() {
                    break;
                }
            }
        }
        None => {
            let _ = name.push_str("Unknown");
        }
    }
    name
}
