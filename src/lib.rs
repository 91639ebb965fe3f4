//! Assistance Request Service (ARS) central.
//!
//! Host-testable core of the firmware: the per-peer ARS client state
//! machine, the GATT request queue abstraction it submits work to, and the
//! application glue that drives the "assistance requested" indicator and
//! the acknowledge button.
//!
//! Usage: `cargo test --lib` (host) or `cargo test` for the integration
//! suite as well.
//!
//! Note: The embedded binary uses main.rs with #![no_std] and #![no_main]
//! and links against this library. Logging goes through `defmt` when the
//! `defmt` feature is on, through `log` with the `log` feature, and is
//! compiled out otherwise.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod assist;
pub mod ble;
pub mod config;
pub mod error;

pub use assist::{AssistIndicator, AssistMonitor};
pub use ble::ars_client::{ArsClient, ArsClientEvent, ArsClientInit, ArsDb, ClientState};
pub use ble::gatt_queue::{GattQueue, GattRequest, WriteOp};
pub use ble::multi_conn::ArsClientPool;
pub use error::Error;
