//! Application glue between an ARS client, the "assistance requested"
//! indicator and the acknowledge button.
//!
//! Client events are delivered synchronously from inside the client's
//! event sinks, so the firmware buffers them and feeds them to
//! [`AssistMonitor::on_client_event`] afterwards, when the client can be
//! borrowed again.

use crate::ble::ars_client::{ArsClient, ArsClientEvent};
use crate::ble::gatt_queue::GattQueue;
use crate::error::Error;

/// Status value written back to acknowledge a request.
pub const ASSIST_ACK: u8 = 0x00;

/// Something that shows whether assistance is requested (an LED on the DK).
pub trait AssistIndicator {
    fn set_assist_requested(&mut self, requested: bool);
}

pub struct AssistMonitor<I> {
    indicator: I,
    requested: bool,
    ack_enabled: bool,
}

impl<I: AssistIndicator> AssistMonitor<I> {
    pub fn new(indicator: I) -> Self {
        Self {
            indicator,
            requested: false,
            ack_enabled: false,
        }
    }

    /// React to an event emitted by `client`.
    ///
    /// On discovery the handles are committed to the client, the ack button
    /// is armed and notifications are enabled. On a state report the
    /// indicator follows the peer.
    pub fn on_client_event<Q, H, E>(
        &mut self,
        client: &mut ArsClient<'_, Q, H, E>,
        evt: &ArsClientEvent,
    ) -> Result<(), Error>
    where
        Q: GattQueue,
        H: FnMut(&ArsClientEvent),
        E: FnMut(Error),
    {
        match *evt {
            ArsClientEvent::DiscoveryComplete {
                conn_handle,
                peer_db,
            } => {
                client.assign_handles(conn_handle, Some(peer_db))?;
                info!(
                    "Assistance Request service discovered on conn 0x{:04x}",
                    conn_handle
                );
                self.ack_enabled = true;
                client.enable_notifications()
            }
            ArsClientEvent::Notification { req_state, .. } => {
                info!("Assistance Request state changed on peer to 0x{:02x}", req_state);
                self.requested = req_state != 0;
                self.indicator.set_assist_requested(self.requested);
                Ok(())
            }
        }
    }

    /// Acknowledge the request on `client`.
    ///
    /// Returns `Ok(true)` when the acknowledgement was queued and
    /// `Ok(false)` when there was nothing to send to: the button is not
    /// armed yet, or the link went away (benign errors). Other errors are
    /// returned.
    pub fn on_ack_button<Q, H, E>(&mut self, client: &ArsClient<'_, Q, H, E>) -> Result<bool, Error>
    where
        Q: GattQueue,
        H: FnMut(&ArsClientEvent),
        E: FnMut(Error),
    {
        if !self.ack_enabled {
            debug!("Ack button ignored, service not discovered");
            return Ok(false);
        }

        match client.send_status(ASSIST_ACK) {
            Ok(()) => Ok(true),
            Err(e) if e.is_benign() => {
                debug!("Ack dropped: {:?}", e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// The link to the peer is gone: clear the indicator and disarm the
    /// button until the next discovery.
    pub fn on_disconnected(&mut self) {
        self.ack_enabled = false;
        if self.requested {
            self.requested = false;
            self.indicator.set_assist_requested(false);
        }
    }

    pub fn assist_requested(&self) -> bool {
        self.requested
    }

    pub fn ack_enabled(&self) -> bool {
        self.ack_enabled
    }
}
