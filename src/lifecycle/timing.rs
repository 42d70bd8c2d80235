//! Per-device-type timing policy.
//!
//! Each sensor model publishes three datasheet delays, all measured in
//! milliseconds of monotonic time:
//!
//! - **warm-up** — power-on until the device accepts commands
//! - **stabilization** — activation until readings are trustworthy
//! - **measurement** — start-of-measurement until the result is ready
//!
//! plus how many raw readings are averaged into one published value.

/// Timing constants for one device type, with a per-instance averaging count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingProfile {
    pub warm_up_ms: u32,
    pub stabilization_ms: u32,
    pub measurement_ms: u32,
    /// Raw readings reduced into one published value (≥ 1).
    pub readings_to_average: u8,
}

impl TimingProfile {
    pub const fn new(warm_up_ms: u32, stabilization_ms: u32, measurement_ms: u32) -> Self {
        Self {
            warm_up_ms,
            stabilization_ms,
            measurement_ms,
            readings_to_average: 1,
        }
    }

    /// Same datasheet delays, different averaging count.  Used when a
    /// device is constructed with a site-specific averaging window.
    pub const fn averaging(mut self, readings: u8) -> Self {
        self.readings_to_average = if readings == 0 { 1 } else { readings };
        self
    }

    /// An always-ready profile (onboard peripherals with no delays).
    pub const fn instant() -> Self {
        Self::new(0, 0, 0)
    }
}
