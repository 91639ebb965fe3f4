//! Multi-peer ARS client pool.
//!
//! Holds one [`ArsClient`] per connection slot (up to `N` concurrent
//! peers) and routes stack events to them:
//!
//! - a new connection goes to the first unbound client only,
//! - a discovery result goes to the client bound to that link, or to the
//!   first unbound one,
//! - everything else is offered to every client, each filtering on its own
//!   connection handle.

use heapless::Vec;

use crate::ble::ars_client::{ArsClient, ArsClientEvent, ClientState};
use crate::ble::event::{BleEvent, DbDiscoveryEvent};
use crate::ble::gatt_queue::GattQueue;
use crate::error::Error;

pub struct ArsClientPool<'q, Q, H, E, const N: usize> {
    clients: Vec<ArsClient<'q, Q, H, E>, N>,
}

impl<'q, Q, H, E, const N: usize> ArsClientPool<'q, Q, H, E, N>
where
    Q: GattQueue,
    H: FnMut(&ArsClientEvent),
    E: FnMut(Error),
{
    pub const fn new() -> Self {
        Self {
            clients: Vec::new(),
        }
    }

    /// Add a client to the pool and return its slot. Hands the client back
    /// if every slot is taken.
    pub fn add(
        &mut self,
        client: ArsClient<'q, Q, H, E>,
    ) -> Result<usize, ArsClient<'q, Q, H, E>> {
        self.clients.push(client)?;
        Ok(self.clients.len() - 1)
    }

    pub fn handle_ble_event(&mut self, evt: &BleEvent) {
        match evt {
            BleEvent::Connected { conn_handle } => {
                if self.client_for(*conn_handle).is_some() {
                    return;
                }
                match self.find_unbound() {
                    Some(slot) => {
                        info!("conn 0x{:04x} -> slot {}", conn_handle, slot);
                        self.clients[slot].handle_ble_event(evt);
                    }
                    None => warn!("No free ARS client for conn 0x{:04x}", conn_handle),
                }
            }
            _ => {
                for client in self.clients.iter_mut() {
                    client.handle_ble_event(evt);
                }
            }
        }
    }

    pub fn handle_discovery_event(&mut self, evt: &DbDiscoveryEvent) {
        let slot = self
            .clients
            .iter()
            .position(|c| c.conn_handle() == Some(evt.conn_handle))
            .or_else(|| self.find_unbound());

        match slot {
            Some(slot) => self.clients[slot].handle_discovery_event(evt),
            None => debug!("Discovery on conn 0x{:04x} has no client", evt.conn_handle),
        }
    }

    pub fn client_for(&self, conn_handle: u16) -> Option<&ArsClient<'q, Q, H, E>> {
        self.clients
            .iter()
            .find(|c| c.conn_handle() == Some(conn_handle))
    }

    pub fn client_for_mut(&mut self, conn_handle: u16) -> Option<&mut ArsClient<'q, Q, H, E>> {
        self.clients
            .iter_mut()
            .find(|c| c.conn_handle() == Some(conn_handle))
    }

    pub fn get(&self, slot: usize) -> Option<&ArsClient<'q, Q, H, E>> {
        self.clients.get(slot)
    }

    pub fn find_unbound(&self) -> Option<usize> {
        self.clients
            .iter()
            .position(|c| c.state() == ClientState::Unbound)
    }

    /// Number of clients bound to a link.
    pub fn active_count(&self) -> usize {
        self.clients
            .iter()
            .filter(|c| c.state() != ClientState::Unbound)
            .count()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl<'q, Q, H, E, const N: usize> Default for ArsClientPool<'q, Q, H, E, N>
where
    Q: GattQueue,
    H: FnMut(&ArsClientEvent),
    E: FnMut(Error),
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use core::cell::RefCell;
    use std::vec::Vec as StdVec;

    use super::*;
    use crate::ble::ars_client::{ArsClientInit, ArsDb};
    use crate::ble::event::{
        DbDiscoveryOutcome, DiscoveredCharacteristic, DiscoveredDescriptor, DiscoveredService,
        HandleRange, HvxKind,
    };
    use crate::ble::gatt_queue::GattRequestQueue;
    use crate::ble::uuid::{Uuid, ARS_ASSIST_REQ_CHAR, ARS_SERVICE, CCCD};
    use crate::ble::AttValue;

    type Queue = GattRequestQueue<8>;
    type Events = RefCell<StdVec<ArsClientEvent>>;

    fn make_client<'a>(
        queue: &'a Queue,
        events: &'a Events,
        registry: &mut Vec<Uuid, 2>,
    ) -> ArsClient<'a, Queue, impl FnMut(&ArsClientEvent) + 'a, impl FnMut(Error) + 'a> {
        ArsClient::new(
            ArsClientInit {
                evt_handler: Some(move |e: &ArsClientEvent| events.borrow_mut().push(*e)),
                gatt_queue: Some(queue),
                error_handler: Some(|_: Error| {}),
            },
            registry,
        )
        .unwrap()
    }

    fn discovery(conn_handle: u16) -> DbDiscoveryEvent {
        let mut descriptors = Vec::new();
        descriptors
            .push(DiscoveredDescriptor {
                uuid: CCCD,
                handle: 0x0F,
            })
            .unwrap();
        let mut characteristics = Vec::new();
        characteristics
            .push(DiscoveredCharacteristic {
                uuid: ARS_ASSIST_REQ_CHAR,
                handle_decl: 0x0D,
                handle_value: 0x0E,
                descriptors,
            })
            .unwrap();
        DbDiscoveryEvent {
            conn_handle,
            outcome: DbDiscoveryOutcome::Complete(DiscoveredService {
                uuid: ARS_SERVICE,
                range: HandleRange {
                    start: 0x0C,
                    end: 0x0F,
                },
                characteristics,
            }),
        }
    }

    #[test]
    fn connections_fill_free_slots_in_order() {
        let queue = Queue::new();
        let events = Events::default();
        let mut registry = Vec::new();
        let mut pool: ArsClientPool<'_, _, _, _, 2> = ArsClientPool::new();
        for _ in 0..2 {
            assert!(pool.add(make_client(&queue, &events, &mut registry)).is_ok());
        }
        assert!(pool.add(make_client(&queue, &events, &mut registry)).is_err());

        pool.handle_ble_event(&BleEvent::Connected { conn_handle: 1 });
        pool.handle_ble_event(&BleEvent::Connected { conn_handle: 2 });
        pool.handle_ble_event(&BleEvent::Connected { conn_handle: 3 });

        assert_eq!(pool.get(0).unwrap().conn_handle(), Some(1));
        assert_eq!(pool.get(1).unwrap().conn_handle(), Some(2));
        assert!(pool.client_for(3).is_none());
        assert_eq!(pool.active_count(), 2);
        assert_eq!(pool.find_unbound(), None);
    }

    #[test]
    fn repeated_connect_does_not_take_second_slot() {
        let queue = Queue::new();
        let events = Events::default();
        let mut registry = Vec::new();
        let mut pool: ArsClientPool<'_, _, _, _, 2> = ArsClientPool::new();
        for _ in 0..2 {
            let _ = pool.add(make_client(&queue, &events, &mut registry));
        }

        pool.handle_ble_event(&BleEvent::Connected { conn_handle: 1 });
        pool.handle_ble_event(&BleEvent::Connected { conn_handle: 1 });

        assert_eq!(pool.active_count(), 1);
    }

    #[test]
    fn events_reach_only_the_owning_client() {
        let queue = Queue::new();
        let events = Events::default();
        let mut registry = Vec::new();
        let mut pool: ArsClientPool<'_, _, _, _, 2> = ArsClientPool::new();
        for _ in 0..2 {
            let _ = pool.add(make_client(&queue, &events, &mut registry));
        }
        pool.handle_ble_event(&BleEvent::Connected { conn_handle: 1 });
        pool.handle_ble_event(&BleEvent::Connected { conn_handle: 2 });

        pool.handle_discovery_event(&discovery(2));
        pool.handle_ble_event(&BleEvent::Hvx {
            conn_handle: 2,
            attr_handle: 0x0E,
            kind: HvxKind::Notification,
            data: AttValue::from_slice(&[1]).unwrap(),
        });

        let db = ArsDb {
            assist_req_cccd_handle: 0x0F,
            assist_req_handle: 0x0E,
        };
        assert_eq!(pool.client_for(1).unwrap().peer_db(), None);
        assert_eq!(pool.client_for(2).unwrap().peer_db(), Some(db));
        assert_eq!(
            *events.borrow(),
            [
                ArsClientEvent::DiscoveryComplete {
                    conn_handle: 2,
                    peer_db: db
                },
                ArsClientEvent::Notification {
                    conn_handle: 2,
                    req_state: 1
                },
            ]
        );
    }

    #[test]
    fn disconnect_frees_the_slot() {
        let queue = Queue::new();
        let events = Events::default();
        let mut registry = Vec::new();
        let mut pool: ArsClientPool<'_, _, _, _, 1> = ArsClientPool::new();
        let _ = pool.add(make_client(&queue, &events, &mut registry));

        pool.handle_ble_event(&BleEvent::Connected { conn_handle: 1 });
        pool.handle_ble_event(&BleEvent::Disconnected {
            conn_handle: 1,
            reason: 0x08,
        });
        queue.on_disconnected(1);
        pool.handle_ble_event(&BleEvent::Connected { conn_handle: 4 });

        assert_eq!(pool.get(0).unwrap().conn_handle(), Some(4));
        assert_eq!(pool.active_count(), 1);
    }

    #[test]
    fn discovery_without_free_client_is_dropped() {
        let queue = Queue::new();
        let events = Events::default();
        let mut registry = Vec::new();
        let mut pool: ArsClientPool<'_, _, _, _, 1> = ArsClientPool::new();
        let _ = pool.add(make_client(&queue, &events, &mut registry));
        pool.handle_ble_event(&BleEvent::Connected { conn_handle: 1 });

        pool.handle_discovery_event(&discovery(5));

        assert!(events.borrow().is_empty());
        assert!(pool.client_for_mut(1).is_some());
        assert_eq!(pool.len(), 1);
    }
}
