//! Sensor catalog — per-model capability data and the [`Device`] glue.
//!
//! Instead of one subclass per physical sensor model, a model is a plain
//! [`SensorModel`] value: its name, its datasheet timing, and the variables
//! it reports.  A [`Device`] pairs one model with a bus address, the power
//! lines it owns, a lifecycle engine, and an accumulator bank.  The wire
//! protocol lives behind the
//! [`ProtocolDecoder`](crate::app::ports::ProtocolDecoder) port, one
//! instance per device.

pub mod ctd;
pub mod gas_probe;
pub mod onboard;

use core::fmt::Write as _;

use crate::lifecycle::average::ReadingSet;
use crate::lifecycle::{DeviceLifecycle, PowerPins};
use crate::lifecycle::timing::TimingProfile;

// ───────────────────────────────────────────────────────────────
// Model metadata
// ───────────────────────────────────────────────────────────────

/// One logical variable a model reports.
#[derive(Debug, Clone, Copy)]
pub struct VariableSpec {
    /// Controlled-vocabulary variable name (e.g. "specificConductance").
    pub name: &'static str,
    /// Controlled-vocabulary unit name (e.g. "microsiemenPerCentimeter").
    pub unit: &'static str,
    /// Decimal places that are actually meaningful at the sensor's
    /// resolution; consumed by display/serialisation adapters.
    pub resolution: u8,
    /// Plausible range; readings outside it are sentinel-substituted.
    pub min: f64,
    pub max: f64,
}

/// Datasheet facts for one sensor model.
#[derive(Debug)]
pub struct SensorModel {
    pub name: &'static str,
    pub timing: TimingProfile,
    pub variables: &'static [VariableSpec],
}

/// Which bus a device hangs off.  Determines the location label only; the
/// wire protocol itself arrives through the decoder port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusKind {
    Sdi12,
    Modbus,
    Onboard,
}

// ───────────────────────────────────────────────────────────────
// Device
// ───────────────────────────────────────────────────────────────

/// One physical unit under power/timing control.  Constructed once at
/// startup with immutable pin assignments; never destroyed while the
/// process runs.
pub struct Device {
    model: &'static SensorModel,
    bus: BusKind,
    address: u8,
    location: heapless::String<24>,
    pub lifecycle: DeviceLifecycle,
    pub readings: ReadingSet,
}

impl Device {
    /// Build a device from its model.  `readings_to_average` overrides the
    /// model's default averaging count for this installation.
    pub fn new(
        model: &'static SensorModel,
        bus: BusKind,
        address: u8,
        pins: PowerPins,
        readings_to_average: u8,
    ) -> Self {
        let timing = model.timing.averaging(readings_to_average);
        let mut readings = ReadingSet::new();
        for var in model.variables {
            readings.push_range(var.min, var.max);
        }
        Self {
            model,
            bus,
            address,
            location: location_label(bus, address),
            lifecycle: DeviceLifecycle::new(timing, pins),
            readings,
        }
    }

    pub fn name(&self) -> &'static str {
        self.model.name
    }

    /// Installation location, e.g. `"modbus_0x05"`.
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn bus(&self) -> BusKind {
        self.bus
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn variables(&self) -> &'static [VariableSpec] {
        self.model.variables
    }

    pub fn variable_count(&self) -> usize {
        self.model.variables.len()
    }
}

fn location_label(bus: BusKind, address: u8) -> heapless::String<24> {
    let mut label = heapless::String::new();
    let _ = match bus {
        BusKind::Sdi12 => write!(label, "sdi12_0x{:02x}", address),
        BusKind::Modbus => write!(label, "modbus_0x{:02x}", address),
        BusKind::Onboard => write!(label, "onboard"),
    };
    label
}
