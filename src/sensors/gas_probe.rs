//! Vaisala GMP252 CO₂ probe (Modbus RTU over RS485).
//!
//! The slowest device in the catalog: 12 s from power to first command,
//! two minutes of stabilization before consecutive readings diverge from
//! each other, 4 s per measurement.  Runs from the boost rail, with the
//! RS485 transceiver on its own switched rail and a direction-enable line
//! owned by the bus driver.

use crate::lifecycle::timing::TimingProfile;
use crate::lifecycle::PowerPins;

use super::{BusKind, Device, SensorModel, VariableSpec};

/// GMP252 starts delivering values 12 s after power-on.
pub const GMP252_WARM_UP_MS: u32 = 12_000;
/// Warm-up + stabilization must exceed 120 s for consecutive readings to
/// give different results.
pub const GMP252_STABILIZATION_MS: u32 = 120_000;
/// One measurement completes in about 4 s.
pub const GMP252_MEASUREMENT_MS: u32 = 4_000;

static GMP252_VARIABLES: [VariableSpec; 2] = [
    VariableSpec {
        name: "carbonDioxide",
        unit: "partPerMillion",
        resolution: 0,
        min: 0.0,
        max: 30_000.0,
    },
    VariableSpec {
        name: "temperature",
        unit: "degreeCelsius",
        resolution: 0,
        min: -40.0,
        max: 60.0,
    },
];

pub static GMP252_MODEL: SensorModel = SensorModel {
    name: "Vaisala GMP252",
    timing: TimingProfile::new(
        GMP252_WARM_UP_MS,
        GMP252_STABILIZATION_MS,
        GMP252_MEASUREMENT_MS,
    ),
    variables: &GMP252_VARIABLES,
};

/// A GMP252 at Modbus `address`, with the probe and RS485 adapter on
/// separate rails and the adapter's direction-enable line.
pub fn device(address: u8, pins: PowerPins, readings_to_average: u8) -> Device {
    Device::new(
        &GMP252_MODEL,
        BusKind::Modbus,
        address,
        pins,
        readings_to_average,
    )
}
