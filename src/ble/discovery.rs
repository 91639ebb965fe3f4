//! Registration with the database discovery module.
//!
//! Clients register the service UUIDs they care about at init; the
//! discovery module only reports passes for registered services.

use heapless::Vec;

use crate::ble::uuid::Uuid;

/// The discovery module has no room for another service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegistryFull;

pub trait DbDiscovery {
    /// Track `uuid` in future discovery passes. Registering twice is not an error.
    fn register_service(&mut self, uuid: Uuid) -> Result<(), RegistryFull>;

    fn is_registered(&self, uuid: &Uuid) -> bool;
}

/// A plain list of service UUIDs is enough of a registry for the firmware,
/// which discovers each registered service in turn.
impl<const N: usize> DbDiscovery for Vec<Uuid, N> {
    fn register_service(&mut self, uuid: Uuid) -> Result<(), RegistryFull> {
        if self.is_registered(&uuid) {
            return Ok(());
        }
        self.push(uuid).map_err(|_| RegistryFull)
    }

    fn is_registered(&self, uuid: &Uuid) -> bool {
        self.iter().any(|u| u.matches(uuid))
    }
}
