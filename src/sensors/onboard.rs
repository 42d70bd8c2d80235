//! Onboard board "sensors".
//!
//! The logger board itself reports its battery voltage through the ADC
//! divider.  Always powered, no delays — the lifecycle engine treats it as
//! instantly warm and stable, so it simply rides along in every round.

use crate::lifecycle::timing::TimingProfile;
use crate::lifecycle::PowerPins;

use super::{BusKind, Device, SensorModel, VariableSpec};

static ONBOARD_VARIABLES: [VariableSpec; 1] = [VariableSpec {
    name: "batteryVoltage",
    unit: "volt",
    resolution: 3,
    min: 0.0,
    max: 6.0,
}];

pub static ONBOARD_MODEL: SensorModel = SensorModel {
    name: "FieldLog onboard",
    timing: TimingProfile::instant(),
    variables: &ONBOARD_VARIABLES,
};

/// The board's own readings; no power pins, no bus address.
pub fn device() -> Device {
    Device::new(&ONBOARD_MODEL, BusKind::Onboard, 0, PowerPins::none(), 1)
}
