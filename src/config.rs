//! System configuration parameters
//!
//! All tunable parameters for the FieldLog datalogger.
//! Values can be overridden from the field-station provisioning file.

use serde::{Deserialize, Serialize};

/// Core logger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    // --- Sampling ---
    /// Time between sampling rounds (seconds)
    pub round_interval_secs: u32,
    /// Hard deadline for one sampling round (seconds).  Devices that have
    /// not produced a result by then are powered down and publish the
    /// failure sentinel.
    pub round_deadline_secs: u32,
    /// Control loop tick interval (milliseconds)
    pub tick_interval_ms: u32,

    // --- Modem ---
    /// Cellular access point name
    pub apn: heapless::String<32>,
    /// Bounded wait for network registration after modem power-on (milliseconds)
    pub network_wait_ms: u32,

    // --- Power budget ---
    /// Battery voltage below which sampling rounds are skipped
    pub low_battery_volts: f32,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            // Sampling
            round_interval_secs: 900, // 15 min
            round_deadline_secs: 300, // 5 min
            tick_interval_ms: 100,    // 10 Hz

            // Modem
            apn: heapless::String::new(),
            network_wait_ms: 55_000,

            // Power budget
            low_battery_volts: 3.4,
        }
    }
}
