//! Unified error type for ars-central.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` (feature `defmt`) for efficient on-target logging.

use core::fmt;

use crate::ble::gatt_queue::QueueError;
use crate::ble::GattStatus;

/// Top-level error type used across the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A required reference (event handler, GATT queue, error handler)
    /// was not supplied.
    InvalidArgument,

    /// No connection is bound, or the peer's attribute handles are not
    /// resolved yet.
    InvalidState,

    /// The GATT queue declined to accept the operation.
    TransportRejected(QueueError),

    /// The discovery module refused to track the service UUID.
    DiscoveryRegistration,

    /// An operation accepted by the queue later failed on the link.
    Gatt(GattFailure),
}

/// Failure reported by the transport after a request was enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GattFailure {
    pub conn_handle: u16,
    pub attr_handle: u16,
    pub status: GattStatus,
}

impl Error {
    /// Errors that only mean the link went away between an event and the
    /// action taken on it. Callers are expected to ignore these.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            Error::InvalidState | Error::TransportRejected(QueueError::InvalidConnHandle)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument => f.write_str("missing required argument"),
            Error::InvalidState => f.write_str("no connection or attribute handles bound"),
            Error::TransportRejected(e) => write!(f, "GATT queue rejected request: {}", e),
            Error::DiscoveryRegistration => f.write_str("discovery registration failed"),
            Error::Gatt(g) => write!(
                f,
                "GATT failure on conn 0x{:04x} handle 0x{:04x}: status 0x{:04x}",
                g.conn_handle, g.attr_handle, g.status.0
            ),
        }
    }
}

// Convenience conversions

impl From<QueueError> for Error {
    fn from(e: QueueError) -> Self {
        Error::TransportRejected(e)
    }
}

impl From<GattFailure> for Error {
    fn from(f: GattFailure) -> Self {
        Error::Gatt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn benign_errors_are_the_tolerated_races() {
        assert!(Error::InvalidState.is_benign());
        assert!(Error::TransportRejected(QueueError::InvalidConnHandle).is_benign());

        assert!(!Error::InvalidArgument.is_benign());
        assert!(!Error::TransportRejected(QueueError::Full).is_benign());
        assert!(!Error::DiscoveryRegistration.is_benign());
        assert!(!Error::Gatt(GattFailure {
            conn_handle: 0,
            attr_handle: 0x15,
            status: GattStatus::WRITE_NOT_PERMITTED,
        })
        .is_benign());
    }

    #[test]
    fn queue_error_converts_to_transport_rejected() {
        let err: Error = QueueError::Full.into();
        assert_eq!(err, Error::TransportRejected(QueueError::Full));
    }

    #[test]
    fn display_includes_handles() {
        let err = Error::Gatt(GattFailure {
            conn_handle: 7,
            attr_handle: 0x14,
            status: GattStatus::WRITE_NOT_PERMITTED,
        });
        let text = std::format!("{}", err);
        assert!(text.contains("0x0007"));
        assert!(text.contains("0x0014"));
        assert!(text.contains("0x0103"));
    }
}
