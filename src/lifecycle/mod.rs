//! Device lifecycle state machine.
//!
//! Every power-cycled device — SDI-12 probe, Modbus probe, modem — follows
//! the same linear path from "off" to "result available", parameterised per
//! model by a [`TimingProfile`]:
//!
//! ```text
//!  OFF ──power_up──▶ WARMING ──[warm-up elapsed]──▶ WAKE-READY
//!                                                       │ wake
//!                                                       ▼
//!  RESULT-READY ◀──[measurement elapsed]── MEASURING ◀──start── STABLE ◀──[stabilization]── STABILIZING
//!       │ collect_result                                            (retry-in-place on failure)
//!       └──▶ next sub-reading, or power_down
//! ```
//!
//! The engine never sleeps.  Waiting is expressed as "not yet due — call
//! again later": each `is_*` predicate is a pure function of `now` minus a
//! stored timestamp, and the scheduler polls them from its single control
//! loop.  `power_down()` is the universal abort — always legal, returns the
//! device to OFF, and discards any in-flight measurement.

pub mod average;
pub mod status;
pub mod timing;

use log::{debug, warn};

use crate::app::ports::ProtocolDecoder;
use crate::error::LifecycleError;
use crate::hal;
use average::ReadingSet;
use status::StatusRegister;
use timing::TimingProfile;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Where a device currently is, derived from the status register and
/// timestamps.  Purely informational — the register stays the source of
/// truth — but it is what the scheduler matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Unpowered (or power-cycled back to the start).
    Off,
    /// Powered, warm-up time still running.
    WarmingUp,
    /// Warm; waiting for a successful `wake()`.
    WakeReady,
    /// Awake, stabilization time still running.
    Stabilizing,
    /// Stable; waiting for a successful `start_measurement()`.
    MeasureReady,
    /// Measurement running, result not yet due.
    Measuring,
    /// Result due; `collect_result()` may be called.
    ResultReady,
}

// ---------------------------------------------------------------------------
// PowerPins
// ---------------------------------------------------------------------------

/// A device's ownership of power-control lines.  All optional: an
/// always-on device owns none.
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerPins {
    /// Main power rail.  Its presence is what makes warm-up timing apply.
    pub primary: Option<i32>,
    /// Secondary rail (e.g. the RS485 adapter between MCU and probe).
    pub secondary: Option<i32>,
    /// Bus direction-enable line; mode-configured here, driven by the
    /// protocol decoder.
    pub bus_enable: Option<i32>,
}

impl PowerPins {
    pub const fn none() -> Self {
        Self {
            primary: None,
            secondary: None,
            bus_enable: None,
        }
    }

    pub const fn single(primary: i32) -> Self {
        Self {
            primary: Some(primary),
            secondary: None,
            bus_enable: None,
        }
    }
}

// ---------------------------------------------------------------------------
// DeviceLifecycle
// ---------------------------------------------------------------------------

/// The per-device engine: status register, timestamp set, timing policy.
#[derive(Debug)]
pub struct DeviceLifecycle {
    timing: TimingProfile,
    pins: PowerPins,
    status: StatusRegister,
    /// When the main rail was asserted.  `None` for always-on devices.
    powered_at: Option<u64>,
    /// When activation succeeded.
    activated_at: Option<u64>,
    /// When the current measurement was started.
    measurement_requested_at: Option<u64>,
}

impl DeviceLifecycle {
    pub const fn new(timing: TimingProfile, pins: PowerPins) -> Self {
        Self {
            timing,
            pins,
            status: StatusRegister::new(),
            powered_at: None,
            activated_at: None,
            measurement_requested_at: None,
        }
    }

    pub fn timing(&self) -> &TimingProfile {
        &self.timing
    }

    pub fn status(&self) -> &StatusRegister {
        &self.status
    }

    // ── Setup ─────────────────────────────────────────────────

    /// Configure pin modes for every owned line, once per process lifetime.
    /// Idempotent; the sticky setup bit survives power cycling because
    /// pin-mode configuration need not be redone.
    pub fn setup(&mut self) {
        if self.status.setup_complete() {
            return;
        }
        for pin in [self.pins.primary, self.pins.secondary, self.pins.bus_enable]
            .into_iter()
            .flatten()
        {
            // Write the idle level first, then switch the pin to output.
            hal::gpio_write(pin, false);
            hal::gpio_configure_output(pin);
        }
        self.status.mark_setup_complete();
    }

    // ── Power ─────────────────────────────────────────────────

    /// Assert the power rails and stamp the power-on time.  Devices without
    /// a primary rail are assumed always-on: the status phases advance but
    /// no timestamp is stamped, so warm-up reports ready immediately.
    /// Power assertion cannot fail, only be absent.
    pub fn power_up(&mut self, now: u64) {
        self.status.power.attempt();
        if let Some(pin) = self.pins.primary {
            hal::gpio_write(pin, true);
            self.powered_at = Some(now);
        }
        if let Some(pin) = self.pins.secondary {
            hal::gpio_write(pin, true);
        }
        if self.pins.primary.is_none() && self.pins.secondary.is_none() {
            debug!("power not controlled here; assuming always-on");
        }
        self.status.power.confirm();
    }

    /// True once the warm-up time has elapsed (boundary-inclusive), or
    /// immediately for always-on devices.
    pub fn is_warmed_up(&self, now: u64) -> bool {
        if !self.status.power.is_confirmed() {
            return false;
        }
        match self.powered_at {
            None => true,
            Some(t) => now.saturating_sub(t) >= u64::from(self.timing.warm_up_ms),
        }
    }

    // ── Activation ────────────────────────────────────────────

    /// Send the device-specific activation action.  On failure the
    /// activation phase is parked at attempted for the caller to retry.
    pub fn wake(
        &mut self,
        now: u64,
        link: &mut dyn ProtocolDecoder,
    ) -> Result<(), LifecycleError> {
        if !self.status.power.is_confirmed() {
            return Err(LifecycleError::PowerNotConfirmed);
        }
        if !self.is_warmed_up(now) {
            return Err(LifecycleError::NotWarmedUp);
        }

        self.status.activation.attempt();
        match link.activate() {
            Ok(()) => {
                self.activated_at = Some(now);
                self.status.activation.confirm();
                Ok(())
            }
            Err(e) => {
                warn!("activation failed: {e}");
                Err(LifecycleError::ActivationFailed)
            }
        }
    }

    /// True once the stabilization time has elapsed since activation
    /// (boundary-inclusive).
    pub fn is_stable(&self, now: u64) -> bool {
        self.status.activation.is_confirmed()
            && self
                .activated_at
                .is_some_and(|t| now.saturating_sub(t) >= u64::from(self.timing.stabilization_ms))
    }

    // ── Measurement ───────────────────────────────────────────

    /// Issue the start-of-measurement action.  On failure the measurement
    /// phase is parked at attempted for the caller to retry.
    pub fn start_measurement(
        &mut self,
        now: u64,
        link: &mut dyn ProtocolDecoder,
    ) -> Result<(), LifecycleError> {
        if !self.status.activation.is_confirmed() {
            return Err(LifecycleError::ActivationNotConfirmed);
        }
        if !self.is_stable(now) {
            return Err(LifecycleError::NotStable);
        }

        self.status.measurement.attempt();
        match link.start_measurement() {
            Ok(()) => {
                self.measurement_requested_at = Some(now);
                self.status.measurement.confirm();
                Ok(())
            }
            Err(e) => {
                warn!("measurement start failed: {e}");
                Err(LifecycleError::MeasurementStartFailed)
            }
        }
    }

    /// True once the measurement time has elapsed since the start request
    /// (boundary-inclusive).
    pub fn is_measurement_ready(&self, now: u64) -> bool {
        self.status.measurement.is_confirmed()
            && self
                .measurement_requested_at
                .is_some_and(|t| now.saturating_sub(t) >= u64::from(self.timing.measurement_ms))
    }

    /// Read the decoded values and feed them through sentinel screening
    /// into `readings`.  Clears the measurement timestamp and phase either
    /// way, permitting the next averaging sub-reading to begin.
    ///
    /// Returns `Ok(true)` when at least one value was counted, `Ok(false)`
    /// on decode failure (the cycle continues; the affected variables will
    /// publish the sentinel if nothing better arrives).
    pub fn collect_result(
        &mut self,
        now: u64,
        readings: &mut ReadingSet,
        link: &mut dyn ProtocolDecoder,
    ) -> Result<bool, LifecycleError> {
        if !self.status.measurement.is_confirmed() {
            return Err(LifecycleError::MeasurementNotConfirmed);
        }
        if !self.is_measurement_ready(now) {
            return Err(LifecycleError::MeasurementNotReady);
        }

        let outcome = match link.read_values() {
            Ok(values) => {
                let mut any = false;
                for (index, value) in values.iter().enumerate() {
                    if readings.record(index, *value) {
                        any = true;
                    } else {
                        debug!("variable {index}: reading substituted with sentinel");
                    }
                }
                any
            }
            Err(e) => {
                warn!("decode failed: {e}");
                false
            }
        };

        self.measurement_requested_at = None;
        self.status.clear_measurement();
        Ok(outcome)
    }

    // ── Power-down / abort ────────────────────────────────────

    /// Drop the rails, clear every timestamp, regress all phases.  The
    /// sticky setup bit is preserved.  Always safe to call, from any stage.
    pub fn power_down(&mut self) {
        if let Some(pin) = self.pins.primary {
            hal::gpio_write(pin, false);
        }
        if let Some(pin) = self.pins.secondary {
            hal::gpio_write(pin, false);
        }
        self.powered_at = None;
        self.activated_at = None;
        self.measurement_requested_at = None;
        self.status.clear_power_cycle();
    }

    // ── Derived stage ─────────────────────────────────────────

    /// Current stage, for the scheduler and for log lines.
    pub fn stage(&self, now: u64) -> Stage {
        if !self.status.power.is_confirmed() {
            Stage::Off
        } else if !self.status.activation.is_confirmed() {
            if self.is_warmed_up(now) {
                Stage::WakeReady
            } else {
                Stage::WarmingUp
            }
        } else if !self.status.measurement.is_confirmed() {
            if self.is_stable(now) {
                Stage::MeasureReady
            } else {
                Stage::Stabilizing
            }
        } else if self.is_measurement_ready(now) {
            Stage::ResultReady
        } else {
            Stage::Measuring
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::ValueFrame;
    use crate::error::DecodeError;

    /// Scripted decoder: fails activation/start a set number of times,
    /// then succeeds; returns a fixed value frame.
    struct ScriptedLink {
        activate_failures: u32,
        start_failures: u32,
        values: Vec<f64>,
        fail_read: bool,
    }

    impl ScriptedLink {
        fn ok(values: &[f64]) -> Self {
            Self {
                activate_failures: 0,
                start_failures: 0,
                values: values.to_vec(),
                fail_read: false,
            }
        }
    }

    impl ProtocolDecoder for ScriptedLink {
        fn activate(&mut self) -> Result<(), DecodeError> {
            if self.activate_failures > 0 {
                self.activate_failures -= 1;
                return Err(DecodeError::NoReply);
            }
            Ok(())
        }

        fn start_measurement(&mut self) -> Result<(), DecodeError> {
            if self.start_failures > 0 {
                self.start_failures -= 1;
                return Err(DecodeError::NoReply);
            }
            Ok(())
        }

        fn read_values(&mut self) -> Result<ValueFrame, DecodeError> {
            if self.fail_read {
                return Err(DecodeError::Malformed);
            }
            Ok(self.values.iter().copied().collect())
        }
    }

    fn engine(pin: i32) -> DeviceLifecycle {
        DeviceLifecycle::new(TimingProfile::new(100, 200, 50), PowerPins::single(pin))
    }

    fn one_var_readings() -> ReadingSet {
        let mut set = ReadingSet::new();
        set.push_range(-100.0, 100.0);
        set
    }

    #[test]
    fn full_cycle_timing_scenario() {
        let mut lc = engine(40);
        let mut link = ScriptedLink::ok(&[42.0]);
        let mut readings = one_var_readings();

        lc.setup();
        lc.power_up(0);

        // Not warmed up until t=100 (boundary-inclusive).
        assert_eq!(lc.wake(50, &mut link), Err(LifecycleError::NotWarmedUp));
        assert!(!lc.is_warmed_up(99));
        assert!(lc.is_warmed_up(100));

        // Retried wake at t=150 is accepted; activation stamped there.
        lc.wake(150, &mut link).unwrap();

        // Stable only from t = 150 + 200 = 350.
        assert_eq!(
            lc.start_measurement(300, &mut link),
            Err(LifecycleError::NotStable)
        );
        assert_eq!(
            lc.start_measurement(349, &mut link),
            Err(LifecycleError::NotStable)
        );
        lc.start_measurement(350, &mut link).unwrap();

        // Result due from t = 350 + 50 = 400.
        assert!(!lc.is_measurement_ready(399));
        assert!(lc.is_measurement_ready(400));
        assert_eq!(
            lc.collect_result(399, &mut readings, &mut link),
            Err(LifecycleError::MeasurementNotReady)
        );
        assert_eq!(lc.collect_result(400, &mut readings, &mut link), Ok(true));
        assert!((readings.means()[0] - 42.0).abs() < f64::EPSILON);
    }

    #[test]
    fn power_up_asserts_rail_and_power_down_clears_it() {
        let mut lc = engine(41);
        lc.setup();
        lc.power_up(0);
        assert!(hal::sim_pin_level(41));
        lc.power_down();
        assert!(!hal::sim_pin_level(41));
    }

    #[test]
    fn power_down_defeats_every_predicate() {
        let mut lc = engine(42);
        let mut link = ScriptedLink::ok(&[1.0]);
        lc.setup();
        lc.power_up(0);
        lc.wake(100, &mut link).unwrap();
        lc.start_measurement(300, &mut link).unwrap();

        lc.power_down();
        assert!(!lc.is_warmed_up(10_000));
        assert!(!lc.is_stable(10_000));
        assert!(!lc.is_measurement_ready(10_000));
        assert_eq!(lc.stage(10_000), Stage::Off);
    }

    #[test]
    fn always_on_device_is_warm_immediately() {
        let mut lc =
            DeviceLifecycle::new(TimingProfile::new(5_000, 0, 0), PowerPins::none());
        lc.setup();
        assert!(!lc.is_warmed_up(0)); // not powered yet
        lc.power_up(0);
        assert!(lc.is_warmed_up(0)); // no rail → no warm-up wait
    }

    #[test]
    fn failed_wake_parks_at_attempted_and_can_retry() {
        let mut lc = engine(43);
        let mut link = ScriptedLink::ok(&[1.0]);
        link.activate_failures = 1;
        lc.setup();
        lc.power_up(0);

        assert_eq!(
            lc.wake(200, &mut link),
            Err(LifecycleError::ActivationFailed)
        );
        assert!(lc.status().activation.is_attempted());
        assert!(!lc.status().activation.is_confirmed());
        assert!(!lc.is_stable(10_000));

        lc.wake(250, &mut link).unwrap();
        assert!(lc.status().activation.is_confirmed());
    }

    #[test]
    fn failed_start_parks_at_attempted() {
        let mut lc = engine(44);
        let mut link = ScriptedLink::ok(&[1.0]);
        link.start_failures = 1;
        lc.setup();
        lc.power_up(0);
        lc.wake(100, &mut link).unwrap();

        assert_eq!(
            lc.start_measurement(300, &mut link),
            Err(LifecycleError::MeasurementStartFailed)
        );
        assert!(lc.status().measurement.is_attempted());
        assert!(!lc.is_measurement_ready(10_000));

        lc.start_measurement(301, &mut link).unwrap();
        assert!(lc.is_measurement_ready(351));
    }

    #[test]
    fn out_of_order_calls_are_rejected() {
        let mut lc = engine(45);
        let mut link = ScriptedLink::ok(&[1.0]);
        let mut readings = one_var_readings();

        assert_eq!(
            lc.wake(0, &mut link),
            Err(LifecycleError::PowerNotConfirmed)
        );
        assert_eq!(
            lc.start_measurement(0, &mut link),
            Err(LifecycleError::ActivationNotConfirmed)
        );
        assert_eq!(
            lc.collect_result(0, &mut readings, &mut link),
            Err(LifecycleError::MeasurementNotConfirmed)
        );
    }

    #[test]
    fn collect_clears_measurement_for_next_sub_reading() {
        let mut lc = engine(46);
        let mut link = ScriptedLink::ok(&[10.0]);
        let mut readings = one_var_readings();
        lc.setup();
        lc.power_up(0);
        lc.wake(100, &mut link).unwrap();
        lc.start_measurement(300, &mut link).unwrap();
        assert_eq!(lc.collect_result(350, &mut readings, &mut link), Ok(true));

        // Activation is still confirmed — the device is stable, a second
        // sub-reading can start without re-waking.
        assert_eq!(lc.stage(351), Stage::MeasureReady);
        lc.start_measurement(351, &mut link).unwrap();
        assert_eq!(lc.collect_result(401, &mut readings, &mut link), Ok(true));
        assert!((readings.means()[0] - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn decode_failure_degrades_without_aborting() {
        let mut lc = engine(47);
        let mut link = ScriptedLink::ok(&[1.0]);
        link.fail_read = true;
        let mut readings = one_var_readings();
        lc.setup();
        lc.power_up(0);
        lc.wake(100, &mut link).unwrap();
        lc.start_measurement(300, &mut link).unwrap();

        assert_eq!(lc.collect_result(350, &mut readings, &mut link), Ok(false));
        assert_eq!(readings.means()[0], average::SENTINEL);
        // Engine is ready for the next attempt.
        assert_eq!(lc.stage(351), Stage::MeasureReady);
    }

    #[test]
    fn stage_walks_the_whole_path() {
        let mut lc = engine(48);
        let mut link = ScriptedLink::ok(&[1.0]);
        let mut readings = one_var_readings();

        assert_eq!(lc.stage(0), Stage::Off);
        lc.setup();
        lc.power_up(0);
        assert_eq!(lc.stage(0), Stage::WarmingUp);
        assert_eq!(lc.stage(100), Stage::WakeReady);
        lc.wake(100, &mut link).unwrap();
        assert_eq!(lc.stage(101), Stage::Stabilizing);
        assert_eq!(lc.stage(300), Stage::MeasureReady);
        lc.start_measurement(300, &mut link).unwrap();
        assert_eq!(lc.stage(301), Stage::Measuring);
        assert_eq!(lc.stage(350), Stage::ResultReady);
        assert_eq!(lc.collect_result(350, &mut readings, &mut link), Ok(true));
        assert_eq!(lc.stage(350), Stage::MeasureReady);
    }
}
