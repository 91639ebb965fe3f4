//! Assistance Request Service client.
//!
//! One [`ArsClient`] tracks one peer. It moves through three states:
//!
//! ```text
//!  Unbound ──connect / assign(h, None)──▶ BoundUndiscovered
//!     ▲                                        │
//!     │                discovery complete / assign(h, Some(db))
//!     │                                        ▼
//!     └────────── disconnect(h) ─────────  BoundDiscovered
//! ```
//!
//! While bound it:
//! 1. Resolves the Assistance Request characteristic and its CCCD from a
//!    discovery pass and reports them as [`ArsClientEvent::DiscoveryComplete`].
//! 2. Arms notifications by writing the CCCD through the shared GATT queue.
//! 3. Decodes notifications and read responses on the characteristic into
//!    [`ArsClientEvent::Notification`].
//! 4. Writes a status byte back to acknowledge a request.
//!
//! Everything runs to completion on the caller's thread; writes and reads
//! only enqueue work, their results come back later as stack events.

use crate::ble::discovery::DbDiscovery;
use crate::ble::event::{BleEvent, DbDiscoveryEvent, DbDiscoveryOutcome};
use crate::ble::gatt_queue::{GattQueue, WriteOp};
use crate::ble::uuid::{ARS_ASSIST_REQ_CHAR, ARS_SERVICE, CCCD};
use crate::ble::{GattStatus, ATTR_HANDLE_INVALID, CONN_HANDLE_INVALID};
use crate::config::{ASSIST_REQ_WRITE_OP, CCCD_NOTIFICATION_ENABLE};
use crate::error::{Error, GattFailure};

/// Handles of the Assistance Request Service found on the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ArsDb {
    /// CCCD of the Assistance Request characteristic.
    pub assist_req_cccd_handle: u16,
    /// Value handle of the Assistance Request characteristic.
    pub assist_req_handle: u16,
}

impl ArsDb {
    fn is_valid(&self) -> bool {
        self.assist_req_cccd_handle != ATTR_HANDLE_INVALID
            && self.assist_req_handle != ATTR_HANDLE_INVALID
    }
}

/// Events delivered to the application handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ArsClientEvent {
    /// The service was found on the peer and the client is now bound to it.
    DiscoveryComplete { conn_handle: u16, peer_db: ArsDb },
    /// The peer reported its assistance request state (notification or
    /// read response). Nonzero means assistance is requested.
    Notification { conn_handle: u16, req_state: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClientState {
    /// No connection handle assigned.
    Unbound,
    /// Connection handle assigned, attribute handles unknown.
    BoundUndiscovered,
    /// Connection handle and both attribute handles known.
    BoundDiscovered,
}

/// Construction parameters. Every field is required; a missing one makes
/// [`ArsClient::new`] fail with [`Error::InvalidArgument`].
pub struct ArsClientInit<'q, Q, H, E> {
    /// Receives [`ArsClientEvent`]s synchronously from the event sinks.
    pub evt_handler: Option<H>,
    /// Shared transport for writes and reads.
    pub gatt_queue: Option<&'q Q>,
    /// Receives failures that happen after a request was accepted.
    pub error_handler: Option<E>,
}

pub struct ArsClient<'q, Q, H, E> {
    conn_handle: Option<u16>,
    peer_db: Option<ArsDb>,
    evt_handler: H,
    error_handler: E,
    gatt_queue: &'q Q,
    status_write_op: WriteOp,
}

impl<'q, Q, H, E> ArsClient<'q, Q, H, E>
where
    Q: GattQueue,
    H: FnMut(&ArsClientEvent),
    E: FnMut(Error),
{
    /// Create an unbound client and register the Assistance Request Service
    /// with the discovery module.
    pub fn new(
        init: ArsClientInit<'q, Q, H, E>,
        discovery: &mut impl DbDiscovery,
    ) -> Result<Self, Error> {
        let (Some(evt_handler), Some(gatt_queue), Some(error_handler)) =
            (init.evt_handler, init.gatt_queue, init.error_handler)
        else {
            return Err(Error::InvalidArgument);
        };

        discovery
            .register_service(ARS_SERVICE)
            .map_err(|_| Error::DiscoveryRegistration)?;

        info!("ARS client initialised");
        Ok(Self {
            conn_handle: None,
            peer_db: None,
            evt_handler,
            error_handler,
            gatt_queue,
            status_write_op: ASSIST_REQ_WRITE_OP,
        })
    }

    /// Override how [`send_status`](Self::send_status) writes the value.
    pub fn with_status_write_op(mut self, op: WriteOp) -> Self {
        self.status_write_op = op;
        self
    }

    pub fn state(&self) -> ClientState {
        match (self.conn_handle, self.peer_db) {
            (None, _) => ClientState::Unbound,
            (Some(_), None) => ClientState::BoundUndiscovered,
            (Some(_), Some(_)) => ClientState::BoundDiscovered,
        }
    }

    pub fn conn_handle(&self) -> Option<u16> {
        self.conn_handle
    }

    pub fn peer_db(&self) -> Option<ArsDb> {
        self.peer_db
    }

    // ════════════════════════════════════════════════════════════════════
    // Event sinks
    // ════════════════════════════════════════════════════════════════════

    /// Handle the result of a discovery pass.
    ///
    /// Only a completed pass over the Assistance Request Service that
    /// exposes both the characteristic and its CCCD binds the client. A
    /// peer without them is a silent non-match: no event, no error.
    pub fn handle_discovery_event(&mut self, evt: &DbDiscoveryEvent) {
        let service = match &evt.outcome {
            DbDiscoveryOutcome::Complete(service) if service.uuid.matches(&ARS_SERVICE) => service,
            DbDiscoveryOutcome::Complete(_) => return,
            DbDiscoveryOutcome::ServiceNotFound(uuid) => {
                if uuid.matches(&ARS_SERVICE) {
                    debug!("ARS not found on conn 0x{:04x}", evt.conn_handle);
                }
                return;
            }
            DbDiscoveryOutcome::Failed(code) => {
                warn!(
                    "Discovery failed on conn 0x{:04x}: 0x{:08x}",
                    evt.conn_handle, code
                );
                return;
            }
        };

        if let Some(bound) = self.conn_handle {
            if bound != evt.conn_handle {
                debug!(
                    "ARS discovery for conn 0x{:04x} ignored, bound to 0x{:04x}",
                    evt.conn_handle, bound
                );
                return;
            }
        }

        let Some(chr) = service.characteristic(&ARS_ASSIST_REQ_CHAR) else {
            info!("ARS on conn 0x{:04x} lacks the request characteristic", evt.conn_handle);
            return;
        };
        let Some(cccd) = chr.descriptor_handle(&CCCD) else {
            info!("ARS on conn 0x{:04x} lacks the request CCCD", evt.conn_handle);
            return;
        };

        let peer_db = ArsDb {
            assist_req_cccd_handle: cccd,
            assist_req_handle: chr.handle_value,
        };
        if !peer_db.is_valid() {
            info!(
                "ARS on conn 0x{:04x} reports an invalid handle (value 0x{:04x}, cccd 0x{:04x})",
                evt.conn_handle, peer_db.assist_req_handle, peer_db.assist_req_cccd_handle
            );
            return;
        }

        if self.conn_handle.is_none() {
            if let Err(e) = self.bind(evt.conn_handle) {
                (self.error_handler)(e);
                return;
            }
        }
        self.peer_db = Some(peer_db);

        info!(
            "ARS discovered on conn 0x{:04x} (value 0x{:04x}, cccd 0x{:04x})",
            evt.conn_handle, peer_db.assist_req_handle, peer_db.assist_req_cccd_handle
        );
        (self.evt_handler)(&ArsClientEvent::DiscoveryComplete {
            conn_handle: evt.conn_handle,
            peer_db,
        });
    }

    /// Handle a raw BLE stack event. Events for other connections or other
    /// attributes are ignored.
    pub fn handle_ble_event(&mut self, evt: &BleEvent) {
        match evt {
            BleEvent::Connected { conn_handle } => {
                if let Some(bound) = self.conn_handle {
                    debug!(
                        "Connect on 0x{:04x} ignored, bound to 0x{:04x}",
                        conn_handle, bound
                    );
                    return;
                }
                if let Err(e) = self.bind(*conn_handle) {
                    (self.error_handler)(e);
                }
            }
            BleEvent::Disconnected {
                conn_handle,
                reason,
            } => {
                if self.conn_handle == Some(*conn_handle) {
                    info!(
                        "ARS conn 0x{:04x} closed (reason 0x{:02x})",
                        conn_handle, reason
                    );
                    self.unbind();
                }
            }
            BleEvent::Hvx {
                conn_handle,
                attr_handle,
                data,
                ..
            } => {
                if self.is_assist_req(*conn_handle, *attr_handle) {
                    self.dispatch_req_state(*conn_handle, data);
                }
            }
            BleEvent::ReadResponse {
                conn_handle,
                attr_handle,
                status,
                data,
            } => {
                if !self.is_assist_req(*conn_handle, *attr_handle) {
                    return;
                }
                if status.is_success() {
                    self.dispatch_req_state(*conn_handle, data);
                } else {
                    self.report_failure(*conn_handle, *attr_handle, *status);
                }
            }
            BleEvent::WriteResponse {
                conn_handle,
                attr_handle,
                status,
            } => {
                if !status.is_success() && self.owns_attribute(*conn_handle, *attr_handle) {
                    self.report_failure(*conn_handle, *attr_handle, *status);
                }
            }
        }
    }

    // ════════════════════════════════════════════════════════════════════
    // Operations
    // ════════════════════════════════════════════════════════════════════

    /// Ask the peer to notify Assistance Request changes by writing the
    /// CCCD.
    pub fn enable_notifications(&self) -> Result<(), Error> {
        let (conn_handle, db) = self.bound()?;
        let value = CCCD_NOTIFICATION_ENABLE.to_le_bytes();

        self.gatt_queue
            .enqueue_write(conn_handle, db.assist_req_cccd_handle, &value, WriteOp::Request)
            .map_err(|e| {
                warn!("CCCD write rejected: {:?}", e);
                Error::from(e)
            })?;

        debug!(
            "CCCD write queued on conn 0x{:04x} handle 0x{:04x}",
            conn_handle, db.assist_req_cccd_handle
        );
        Ok(())
    }

    /// Write `status` to the Assistance Request characteristic. `0`
    /// acknowledges an outstanding request.
    pub fn send_status(&self, status: u8) -> Result<(), Error> {
        let (conn_handle, db) = self.bound()?;

        self.gatt_queue
            .enqueue_write(
                conn_handle,
                db.assist_req_handle,
                &[status],
                self.status_write_op,
            )
            .map_err(|e| {
                warn!("Status write rejected: {:?}", e);
                Error::from(e)
            })?;

        debug!(
            "Status 0x{:02x} queued on conn 0x{:04x}",
            status, conn_handle
        );
        Ok(())
    }

    /// Read the Assistance Request characteristic. The value arrives later
    /// as a read response and is reported like a notification.
    pub fn read_status(&self) -> Result<(), Error> {
        let (conn_handle, db) = self.bound()?;

        self.gatt_queue
            .enqueue_read(conn_handle, db.assist_req_handle)
            .map_err(|e| {
                warn!("Status read rejected: {:?}", e);
                Error::from(e)
            })?;

        debug!("Status read queued on conn 0x{:04x}", conn_handle);
        Ok(())
    }

    /// Associate this instance with a link.
    ///
    /// With `None` only the connection is bound and the attribute handles
    /// are cleared, so discovery still has to run. With `Some` (e.g. handles
    /// cached from a bonded peer) the client is immediately usable.
    /// Assigning [`CONN_HANDLE_INVALID`] unbinds the instance.
    pub fn assign_handles(
        &mut self,
        conn_handle: u16,
        peer_handles: Option<ArsDb>,
    ) -> Result<(), Error> {
        if conn_handle == CONN_HANDLE_INVALID {
            self.unbind();
            return Ok(());
        }
        if let Some(db) = peer_handles {
            if !db.is_valid() {
                return Err(Error::InvalidArgument);
            }
        }

        self.bind(conn_handle)?;
        self.peer_db = peer_handles;
        Ok(())
    }

    // ════════════════════════════════════════════════════════════════════
    // Internals
    // ════════════════════════════════════════════════════════════════════

    fn bind(&mut self, conn_handle: u16) -> Result<(), Error> {
        self.gatt_queue.register_connection(conn_handle)?;
        if self.conn_handle != Some(conn_handle) {
            info!("ARS client bound to conn 0x{:04x}", conn_handle);
        }
        self.conn_handle = Some(conn_handle);
        self.peer_db = None;
        Ok(())
    }

    fn unbind(&mut self) {
        self.conn_handle = None;
        self.peer_db = None;
    }

    fn bound(&self) -> Result<(u16, ArsDb), Error> {
        match (self.conn_handle, self.peer_db) {
            (Some(conn_handle), Some(db)) => Ok((conn_handle, db)),
            _ => Err(Error::InvalidState),
        }
    }

    fn is_assist_req(&self, conn_handle: u16, attr_handle: u16) -> bool {
        matches!(self.bound(), Ok((c, db)) if c == conn_handle && db.assist_req_handle == attr_handle)
    }

    fn owns_attribute(&self, conn_handle: u16, attr_handle: u16) -> bool {
        matches!(self.bound(), Ok((c, db))
            if c == conn_handle
                && (db.assist_req_handle == attr_handle || db.assist_req_cccd_handle == attr_handle))
    }

    fn dispatch_req_state(&mut self, conn_handle: u16, data: &[u8]) {
        let Some(&req_state) = data.first() else {
            warn!("Empty Assistance Request value on conn 0x{:04x}", conn_handle);
            return;
        };

        debug!(
            "Assistance Request state 0x{:02x} on conn 0x{:04x}",
            req_state, conn_handle
        );
        (self.evt_handler)(&ArsClientEvent::Notification {
            conn_handle,
            req_state,
        });
    }

    fn report_failure(&mut self, conn_handle: u16, attr_handle: u16, status: GattStatus) {
        error!(
            "GATT failure on conn 0x{:04x} handle 0x{:04x}: {:?}",
            conn_handle, attr_handle, status
        );
        (self.error_handler)(Error::from(GattFailure {
            conn_handle,
            attr_handle,
            status,
        }));
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests (run on host, not embedded)
// ═══════════════════════════════════════════════════════════════════════════
