//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the round orchestration for the FieldLog system:
//! the logger service, its outbound events, and the port traits.  All
//! interaction with hardware happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
