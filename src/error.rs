//! Unified error types for the FieldLog firmware.
//!
//! Follows embedded best practice: a single `Error` enum that every subsystem
//! can convert into, keeping the top-level control loop's error handling uniform.
//! All variants are `Copy` so they can be cheaply passed through the scheduler
//! and lifecycle engine without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A device lifecycle operation was invoked out of order or its
    /// delegated action failed.
    Lifecycle(LifecycleError),
    /// A protocol decoder could not produce a reading.
    Decode(DecodeError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lifecycle(e) => write!(f, "lifecycle: {e}"),
            Self::Decode(e) => write!(f, "decode: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Lifecycle errors
// ---------------------------------------------------------------------------

/// Returned by the device lifecycle engine.
///
/// The first six variants are precondition violations: the caller invoked an
/// operation before its stage was reached. The engine rejects these rather
/// than proceeding with stale timestamps. The `*Failed` variants mean the
/// delegated device action did not succeed and the stage is parked at
/// *attempted, not confirmed* — the caller may retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleError {
    /// Power-on has not been confirmed.
    PowerNotConfirmed,
    /// Warm-up time has not elapsed since power-on.
    NotWarmedUp,
    /// Activation has not been confirmed.
    ActivationNotConfirmed,
    /// Stabilization time has not elapsed since activation.
    NotStable,
    /// No measurement start has been confirmed.
    MeasurementNotConfirmed,
    /// Measurement time has not elapsed since the start request.
    MeasurementNotReady,
    /// The activation action failed; retry `wake()`.
    ActivationFailed,
    /// The start-of-measurement action failed; retry `start_measurement()`.
    MeasurementStartFailed,
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PowerNotConfirmed => write!(f, "power not confirmed"),
            Self::NotWarmedUp => write!(f, "not warmed up"),
            Self::ActivationNotConfirmed => write!(f, "activation not confirmed"),
            Self::NotStable => write!(f, "not stable"),
            Self::MeasurementNotConfirmed => write!(f, "measurement not confirmed"),
            Self::MeasurementNotReady => write!(f, "measurement not ready"),
            Self::ActivationFailed => write!(f, "activation failed"),
            Self::MeasurementStartFailed => write!(f, "measurement start failed"),
        }
    }
}

impl From<LifecycleError> for Error {
    fn from(e: LifecycleError) -> Self {
        Self::Lifecycle(e)
    }
}

// ---------------------------------------------------------------------------
// Decode errors
// ---------------------------------------------------------------------------

/// Returned by [`ProtocolDecoder`](crate::app::ports::ProtocolDecoder)
/// implementations. Every variant is retryable: the engine substitutes the
/// failure sentinel for the affected reading and the device remains usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The device did not answer within the protocol's reply window.
    NoReply,
    /// The reply arrived but could not be parsed into numeric values.
    Malformed,
    /// The bus transaction itself failed (framing, CRC, direction control).
    BusError,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoReply => write!(f, "no reply"),
            Self::Malformed => write!(f, "malformed reply"),
            Self::BusError => write!(f, "bus error"),
        }
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
