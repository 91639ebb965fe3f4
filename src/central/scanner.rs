//! BLE GAP scanner - finds a peripheral advertising the Assistance
//! Request Service.
//!
//! Uses the SoftDevice Central-role scanning API. Advertising reports are
//! filtered on the ARS 128-bit UUID; the first match ends the scan.

use ars_central::ble::adv_parser::{contains_service_uuid, extract_device_name};
use ars_central::ble::uuid::ARS_SERVICE;
use defmt::{info, warn};
use nrf_softdevice::ble::{central, Address};
use nrf_softdevice::Softdevice;

/// Scan until an ARS peripheral shows up and return its address.
pub async fn scan_for_ars(sd: &Softdevice) -> Option<Address> {
    info!("BLE scan starting");

    let config = central::ScanConfig {
        // Active scan so 128-bit UUID lists in scan responses are seen too.
        active: true,
        ..Default::default()
    };

    let result = central::scan(sd, &config, |params| {
        let data =
            unsafe { core::slice::from_raw_parts(params.data.p_data, params.data.len as usize) };

        if !contains_service_uuid(data, &ARS_SERVICE) {
            return None;
        }

        let name = extract_device_name(data);
        info!("Found ARS peer: {} (RSSI {})", name.as_str(), params.rssi);
        Some(Address::from_raw(params.peer_addr))
    })
    .await;

    match result {
        Ok(address) => Some(address),
        Err(e) => {
            warn!("BLE scan ended with error: {:?}", e);
            None
        }
    }
}
