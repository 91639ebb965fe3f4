//! GATT request queue - the transport the ARS client submits work to.
//!
//! The client never talks to the stack directly. It builds a
//! [`GattRequest`] and hands it to a [`GattQueue`], which executes requests
//! in FIFO order per connection and reports the outcome later as a
//! [`BleEvent`](crate::ble::event::BleEvent). The only synchronous result is
//! whether the request was accepted.
//!
//! [`GattRequestQueue`] is a single-threaded reference implementation used
//! by host tests; the firmware provides a channel-backed one.

use core::cell::RefCell;
use core::fmt;

use heapless::{Deque, Vec};

use crate::ble::AttValue;
use crate::config::MAX_CONNECTIONS;

/// How a write is carried over the air.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteOp {
    /// Write request - the peer acknowledges with a write response.
    Request,
    /// Write command - no acknowledgement.
    Command,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GattOp {
    Write {
        attr_handle: u16,
        op: WriteOp,
        value: AttValue,
    },
    Read {
        attr_handle: u16,
    },
}

/// One unit of work for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GattRequest {
    pub conn_handle: u16,
    pub op: GattOp,
}

impl GattRequest {
    pub fn attr_handle(&self) -> u16 {
        match self.op {
            GattOp::Write { attr_handle, .. } | GattOp::Read { attr_handle } => attr_handle,
        }
    }
}

/// Why the queue refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QueueError {
    /// No room for another request (or another connection).
    Full,
    /// The connection handle is not registered with the queue.
    InvalidConnHandle,
    /// The value does not fit into a single ATT PDU.
    ValueTooLong,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Full => f.write_str("queue full"),
            QueueError::InvalidConnHandle => f.write_str("invalid connection handle"),
            QueueError::ValueTooLong => f.write_str("value too long"),
        }
    }
}

/// Transport collaborator shared by every client instance.
///
/// Methods take `&self`: one queue is shared across instances and outlives
/// them, so implementations use interior mutability.
pub trait GattQueue {
    /// Make `conn_handle` known to the queue. Registering twice is not an error.
    fn register_connection(&self, conn_handle: u16) -> Result<(), QueueError>;

    /// Accept `request` for later execution.
    fn enqueue(&self, request: GattRequest) -> Result<(), QueueError>;

    fn enqueue_write(
        &self,
        conn_handle: u16,
        attr_handle: u16,
        value: &[u8],
        op: WriteOp,
    ) -> Result<(), QueueError> {
        let value = AttValue::from_slice(value).map_err(|_| QueueError::ValueTooLong)?;
        self.enqueue(GattRequest {
            conn_handle,
            op: GattOp::Write {
                attr_handle,
                op,
                value,
            },
        })
    }

    fn enqueue_read(&self, conn_handle: u16, attr_handle: u16) -> Result<(), QueueError> {
        self.enqueue(GattRequest {
            conn_handle,
            op: GattOp::Read { attr_handle },
        })
    }
}

struct QueueState<const N: usize> {
    pending: Deque<GattRequest, N>,
    connections: Vec<u16, MAX_CONNECTIONS>,
}

/// FIFO request queue with a bounded connection registry.
pub struct GattRequestQueue<const N: usize> {
    state: RefCell<QueueState<N>>,
}

impl<const N: usize> GattRequestQueue<N> {
    pub const fn new() -> Self {
        Self {
            state: RefCell::new(QueueState {
                pending: Deque::new(),
                connections: Vec::new(),
            }),
        }
    }

    /// Take the oldest request for execution.
    pub fn pop(&self) -> Option<GattRequest> {
        self.state.borrow_mut().pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().pending.is_empty()
    }

    pub fn is_registered(&self, conn_handle: u16) -> bool {
        self.state.borrow().connections.contains(&conn_handle)
    }

    /// Forget a closed link and drop its pending requests.
    pub fn on_disconnected(&self, conn_handle: u16) {
        let mut state = self.state.borrow_mut();
        state.connections.retain(|&c| c != conn_handle);

        for _ in 0..state.pending.len() {
            if let Some(request) = state.pending.pop_front() {
                if request.conn_handle != conn_handle {
                    // Rotating through the same buffer: cannot overflow.
                    let _ = state.pending.push_back(request);
                }
            }
        }
    }
}

impl<const N: usize> Default for GattRequestQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> GattQueue for GattRequestQueue<N> {
    fn register_connection(&self, conn_handle: u16) -> Result<(), QueueError> {
        let mut state = self.state.borrow_mut();
        if state.connections.contains(&conn_handle) {
            return Ok(());
        }
        state
            .connections
            .push(conn_handle)
            .map_err(|_| QueueError::Full)
    }

    fn enqueue(&self, request: GattRequest) -> Result<(), QueueError> {
        let mut state = self.state.borrow_mut();
        if !state.connections.contains(&request.conn_handle) {
            return Err(QueueError::InvalidConnHandle);
        }
        state
            .pending
            .push_back(request)
            .map_err(|_| QueueError::Full)
    }
}
