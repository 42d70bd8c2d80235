//! Port traits — the boundary between the lifecycle engine and the
//! collaborators it does not re-implement.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ engine / scheduler / service (domain)
//! ```
//!
//! Wire-level SDI-12 and Modbus decoding, the modem's AT dialect, and the
//! transport above connect/disconnect all live on the far side of these
//! traits.  The domain consumes them via generics (or `dyn` where devices
//! are heterogeneous), so it never touches a bus driver directly and the
//! whole engine runs against mocks on the host.

use crate::error::DecodeError;
use crate::lifecycle::average::MAX_VARIABLES;

use super::events::LoggerEvent;

/// One decoded frame: the raw numeric readings of a single measurement,
/// in the device's variable declaration order.
pub type ValueFrame = heapless::Vec<f64, MAX_VARIABLES>;

// ───────────────────────────────────────────────────────────────
// Protocol decoder (driven adapter: bus driver → domain)
// ───────────────────────────────────────────────────────────────

/// A device's command channel.  One instance per device, bound to its bus
/// address at construction.  Every error is retryable: the engine parks the
/// affected stage at *attempted* and the scheduler decides when to retry.
pub trait ProtocolDecoder {
    /// Device-specific activation action (exit sleep mode, claim the bus).
    /// Most bus sensors need nothing beyond being powered.
    fn activate(&mut self) -> Result<(), DecodeError> {
        Ok(())
    }

    /// Ask the device to begin one measurement.
    fn start_measurement(&mut self) -> Result<(), DecodeError>;

    /// Fetch the finished measurement's values.
    fn read_values(&mut self) -> Result<ValueFrame, DecodeError>;
}

// ───────────────────────────────────────────────────────────────
// Modem ports (power sequencing vs. network session)
// ───────────────────────────────────────────────────────────────

/// Electrical control of the modem.  Implemented over the
/// [`ModemPowerSwitch`](crate::power::ModemPowerSwitch) sequencer.
pub trait ModemPower {
    /// Sequence the modem on.  `false` when confirmation timed out.
    fn power_on(&mut self) -> bool;

    /// Sequence the modem off.  Main power is always cut, even when the
    /// off-confirmation times out.
    fn power_off(&mut self);

    /// Status-line readback; reports on when no sensing is wired.
    fn is_powered(&mut self) -> bool;
}

/// The modem's network session, above the power boundary.
pub trait ModemTransport {
    /// Register on the network and open the data session.
    fn connect(&mut self) -> bool;

    /// Tear the session down.
    fn disconnect(&mut self);

    fn is_network_up(&mut self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Variable publisher (domain → value container)
// ───────────────────────────────────────────────────────────────

/// Receives one value per logical variable at the end of each averaging
/// window.  Indices are assigned when devices are registered and stay
/// stable for the process lifetime.
pub trait VariablePublisher {
    fn publish(&mut self, index: usize, value: f64);
}

// ───────────────────────────────────────────────────────────────
// Event sink (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`LoggerEvent`]s through this port.
/// Adapters decide where they go (serial log, telemetry uplink, test
/// recorder).
pub trait EventSink {
    fn emit(&mut self, event: &LoggerEvent);
}
