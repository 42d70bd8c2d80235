//! Logger service — the round orchestrator.
//!
//! [`LoggerService`] owns the sampling scheduler and walks each round
//! through three phases from the single control loop:
//!
//! ```text
//!  IDLE ──[round due]──▶ SAMPLING ──[all devices done / deadline]──▶ REPORTING ──▶ IDLE
//! ```
//!
//! All I/O flows through port traits injected at call sites, so the whole
//! round runs against mock adapters on the host.  The service never
//! sleeps: `tick()` does bounded work and returns, and the caller decides
//! the loop cadence.

use log::{info, warn};

use crate::config::LoggerConfig;
use crate::scheduler::SamplingScheduler;
use crate::sensors::Device;

use super::events::LoggerEvent;
use super::ports::{EventSink, ModemPower, ModemTransport, ProtocolDecoder, VariablePublisher};

// ───────────────────────────────────────────────────────────────
// Round phase
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoundPhase {
    Idle,
    Sampling,
    Reporting,
}

// ───────────────────────────────────────────────────────────────
// LoggerService
// ───────────────────────────────────────────────────────────────

/// Orchestrates sampling rounds and the modem session around them.
pub struct LoggerService {
    scheduler: SamplingScheduler,
    config: LoggerConfig,
    phase: RoundPhase,
    round: u32,
    round_started_at: u64,
    next_round_at: u64,
}

impl LoggerService {
    pub fn new(config: LoggerConfig) -> Self {
        Self {
            scheduler: SamplingScheduler::new(),
            config,
            phase: RoundPhase::Idle,
            round: 0,
            round_started_at: 0,
            next_round_at: u64::MAX,
        }
    }

    /// Register a device with its decoder.  Returns the device's base
    /// published-variable index, or `None` when the table is full.
    pub fn add_device(&mut self, device: Device, link: Box<dyn ProtocolDecoder>) -> Option<usize> {
        self.scheduler.add(device, link)
    }

    /// Arm the round timer; the first round starts on the next tick.
    pub fn start(&mut self, now: u64) {
        self.next_round_at = now;
        info!(
            "logger armed: {} device(s), {} variable(s), every {} s",
            self.scheduler.device_count(),
            self.scheduler.variable_count(),
            self.config.round_interval_secs
        );
    }

    pub fn is_idle(&self) -> bool {
        self.phase == RoundPhase::Idle
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    /// Run one slice of the round state machine.
    pub fn tick(
        &mut self,
        now: u64,
        modem: &mut (impl ModemPower + ModemTransport),
        publisher: &mut impl VariablePublisher,
        sink: &mut impl EventSink,
    ) {
        match self.phase {
            RoundPhase::Idle => {
                if now >= self.next_round_at {
                    self.round += 1;
                    self.round_started_at = now;
                    self.scheduler.begin_round(now);
                    sink.emit(&LoggerEvent::RoundStarted { round: self.round });
                    info!("round {} started", self.round);
                    self.phase = RoundPhase::Sampling;
                }
            }

            RoundPhase::Sampling => {
                let deadline_ms = u64::from(self.config.round_deadline_secs) * 1_000;
                if self.scheduler.tick(now, publisher, sink) {
                    self.phase = RoundPhase::Reporting;
                } else if now.saturating_sub(self.round_started_at) >= deadline_ms {
                    warn!("round {} hit the {} s deadline", self.round, self.config.round_deadline_secs);
                    let unfinished = self.scheduler.abort_round(publisher, sink);
                    sink.emit(&LoggerEvent::RoundAborted { unfinished });
                    self.phase = RoundPhase::Reporting;
                }
            }

            RoundPhase::Reporting => {
                self.report(modem, sink);
                let duration_ms = now.saturating_sub(self.round_started_at);
                sink.emit(&LoggerEvent::RoundCompleted {
                    round: self.round,
                    duration_ms,
                });
                info!("round {} completed in {} ms", self.round, duration_ms);

                // Fixed cadence from round start; skip forward if a round
                // overran its own interval.
                let interval_ms = u64::from(self.config.round_interval_secs) * 1_000;
                self.next_round_at = self.round_started_at + interval_ms;
                if self.next_round_at <= now {
                    self.next_round_at = now + interval_ms;
                }
                self.phase = RoundPhase::Idle;
            }
        }
    }

    /// One modem session: power → connect → disconnect → power off.
    /// Every failure degrades; the round's values are already published.
    fn report(&mut self, modem: &mut (impl ModemPower + ModemTransport), sink: &mut impl EventSink) {
        if !modem.power_on() {
            warn!("modem power-on unconfirmed; skipping uplink");
            sink.emit(&LoggerEvent::NetworkFailed);
            modem.power_off();
            sink.emit(&LoggerEvent::ModemDown);
            return;
        }

        if modem.connect() {
            sink.emit(&LoggerEvent::ModemUp);
            if !modem.is_network_up() {
                warn!("network dropped during the session");
            }
            modem.disconnect();
        } else {
            warn!("network registration failed");
            sink.emit(&LoggerEvent::NetworkFailed);
        }

        modem.power_off();
        sink.emit(&LoggerEvent::ModemDown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::ValueFrame;
    use crate::error::DecodeError;
    use crate::lifecycle::timing::TimingProfile;
    use crate::lifecycle::PowerPins;
    use crate::sensors::{BusKind, SensorModel, VariableSpec};

    static VAR: [VariableSpec; 1] = [VariableSpec {
        name: "level",
        unit: "millimeter",
        resolution: 0,
        min: 0.0,
        max: 1_000.0,
    }];

    static QUICK_MODEL: SensorModel = SensorModel {
        name: "quick probe",
        timing: TimingProfile::new(50, 0, 50),
        variables: &VAR,
    };

    struct FixedLink(f64);

    impl ProtocolDecoder for FixedLink {
        fn start_measurement(&mut self) -> Result<(), DecodeError> {
            Ok(())
        }

        fn read_values(&mut self) -> Result<ValueFrame, DecodeError> {
            let mut frame = ValueFrame::new();
            let _ = frame.push(self.0);
            Ok(frame)
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum ModemCall {
        PowerOn,
        Connect,
        Disconnect,
        PowerOff,
    }

    struct MockModem {
        calls: Vec<ModemCall>,
        power_on_ok: bool,
        connect_ok: bool,
    }

    impl MockModem {
        fn healthy() -> Self {
            Self {
                calls: Vec::new(),
                power_on_ok: true,
                connect_ok: true,
            }
        }
    }

    impl ModemPower for MockModem {
        fn power_on(&mut self) -> bool {
            self.calls.push(ModemCall::PowerOn);
            self.power_on_ok
        }

        fn power_off(&mut self) {
            self.calls.push(ModemCall::PowerOff);
        }

        fn is_powered(&mut self) -> bool {
            self.power_on_ok
        }
    }

    impl ModemTransport for MockModem {
        fn connect(&mut self) -> bool {
            self.calls.push(ModemCall::Connect);
            self.connect_ok
        }

        fn disconnect(&mut self) {
            self.calls.push(ModemCall::Disconnect);
        }

        fn is_network_up(&mut self) -> bool {
            self.connect_ok
        }
    }

    #[derive(Default)]
    struct Recorder {
        values: Vec<(usize, f64)>,
    }

    impl VariablePublisher for Recorder {
        fn publish(&mut self, index: usize, value: f64) {
            self.values.push((index, value));
        }
    }

    #[derive(Default)]
    struct Events(Vec<LoggerEvent>);

    impl EventSink for Events {
        fn emit(&mut self, event: &LoggerEvent) {
            self.0.push(event.clone());
        }
    }

    fn quick_config() -> LoggerConfig {
        LoggerConfig {
            round_interval_secs: 60,
            round_deadline_secs: 10,
            ..LoggerConfig::default()
        }
    }

    fn drive_one_round(
        service: &mut LoggerService,
        modem: &mut MockModem,
        rec: &mut Recorder,
        events: &mut Events,
        mut now: u64,
    ) -> u64 {
        service.tick(now, modem, rec, events); // Idle → Sampling
        while !service.is_idle() {
            now += 25;
            service.tick(now, modem, rec, events);
            assert!(now < 120_000, "round never completed");
        }
        now
    }

    #[test]
    fn round_runs_end_to_end() {
        let mut service = LoggerService::new(quick_config());
        service.add_device(
            Device::new(&QUICK_MODEL, BusKind::Sdi12, 0x30, PowerPins::none(), 1),
            Box::new(FixedLink(7.0)),
        );

        let mut modem = MockModem::healthy();
        let mut rec = Recorder::default();
        let mut events = Events::default();

        service.start(0);
        drive_one_round(&mut service, &mut modem, &mut rec, &mut events, 0);

        assert_eq!(service.round(), 1);
        assert_eq!(rec.values, vec![(0, 7.0)]);
        assert_eq!(
            modem.calls,
            vec![
                ModemCall::PowerOn,
                ModemCall::Connect,
                ModemCall::Disconnect,
                ModemCall::PowerOff,
            ]
        );
        assert!(matches!(events.0.first(), Some(LoggerEvent::RoundStarted { round: 1 })));
        assert!(events
            .0
            .iter()
            .any(|e| matches!(e, LoggerEvent::RoundCompleted { round: 1, .. })));
    }

    #[test]
    fn next_round_waits_for_the_interval() {
        let mut service = LoggerService::new(quick_config());
        service.add_device(
            Device::new(&QUICK_MODEL, BusKind::Sdi12, 0x30, PowerPins::none(), 1),
            Box::new(FixedLink(1.0)),
        );

        let mut modem = MockModem::healthy();
        let mut rec = Recorder::default();
        let mut events = Events::default();

        service.start(0);
        let end = drive_one_round(&mut service, &mut modem, &mut rec, &mut events, 0);

        // Still idle just before the 60 s cadence point.
        service.tick(end + 1_000, &mut modem, &mut rec, &mut events);
        assert!(service.is_idle());
        assert_eq!(service.round(), 1);

        service.tick(60_000, &mut modem, &mut rec, &mut events);
        assert_eq!(service.round(), 2);
    }

    #[test]
    fn modem_failure_degrades_but_round_completes() {
        let mut service = LoggerService::new(quick_config());
        service.add_device(
            Device::new(&QUICK_MODEL, BusKind::Sdi12, 0x30, PowerPins::none(), 1),
            Box::new(FixedLink(3.0)),
        );

        let mut modem = MockModem::healthy();
        modem.power_on_ok = false;
        let mut rec = Recorder::default();
        let mut events = Events::default();

        service.start(0);
        drive_one_round(&mut service, &mut modem, &mut rec, &mut events, 0);

        // Power is still cut after the failed bring-up.
        assert_eq!(modem.calls.last(), Some(&ModemCall::PowerOff));
        assert!(events.0.iter().any(|e| matches!(e, LoggerEvent::NetworkFailed)));
        assert!(events
            .0
            .iter()
            .any(|e| matches!(e, LoggerEvent::RoundCompleted { .. })));
        // The sampled value was still published.
        assert_eq!(rec.values, vec![(0, 3.0)]);
    }

    #[test]
    fn stuck_device_is_cut_at_the_deadline() {
        static STUCK_MODEL: SensorModel = SensorModel {
            name: "stuck probe",
            timing: TimingProfile::new(3_600_000, 0, 0),
            variables: &VAR,
        };

        let mut service = LoggerService::new(quick_config());
        service.add_device(
            Device::new(&STUCK_MODEL, BusKind::Sdi12, 0x31, PowerPins::single(27), 1),
            Box::new(FixedLink(1.0)),
        );

        let mut modem = MockModem::healthy();
        let mut rec = Recorder::default();
        let mut events = Events::default();

        service.start(0);
        drive_one_round(&mut service, &mut modem, &mut rec, &mut events, 0);

        assert!(events
            .0
            .iter()
            .any(|e| matches!(e, LoggerEvent::RoundAborted { unfinished: 1 })));
        assert_eq!(rec.values.len(), 1);
        assert_eq!(rec.values[0].1, crate::lifecycle::average::SENTINEL);
    }
}
