//! Decagon CTD-10 water probe (SDI-12).
//!
//! Reports water depth, temperature, and bulk electrical conductivity from
//! one SDI-12 measurement.  The probe runs from the switched sensor rail
//! and is quick: half a second to wake, half a second per measurement, no
//! stabilization delay.

use crate::lifecycle::timing::TimingProfile;
use crate::lifecycle::PowerPins;

use super::{BusKind, Device, SensorModel, VariableSpec};

/// CTD-10 accepts commands 500 ms after power-on.
pub const CTD_WARM_UP_MS: u32 = 500;
/// First reading is already trustworthy.
pub const CTD_STABILIZATION_MS: u32 = 0;
/// An M! measurement completes within 500 ms.
pub const CTD_MEASUREMENT_MS: u32 = 500;

static CTD_VARIABLES: [VariableSpec; 3] = [
    VariableSpec {
        name: "waterDepth",
        unit: "millimeter",
        resolution: 0,
        min: 0.0,
        max: 10_000.0,
    },
    VariableSpec {
        name: "temperature",
        unit: "degreeCelsius",
        resolution: 1,
        min: -11.0,
        max: 49.0,
    },
    VariableSpec {
        name: "specificConductance",
        unit: "microsiemenPerCentimeter",
        resolution: 0,
        min: 0.0,
        max: 120_000.0,
    },
];

pub static CTD_MODEL: SensorModel = SensorModel {
    name: "Decagon CTD-10",
    timing: TimingProfile::new(CTD_WARM_UP_MS, CTD_STABILIZATION_MS, CTD_MEASUREMENT_MS),
    variables: &CTD_VARIABLES,
};

/// A CTD-10 at `address` on the SDI-12 bus, powered from `power_pin`.
pub fn device(address: u8, power_pin: i32, readings_to_average: u8) -> Device {
    Device::new(
        &CTD_MODEL,
        BusKind::Sdi12,
        address,
        PowerPins::single(power_pin),
        readings_to_average,
    )
}
