//! Sampling scheduler.
//!
//! Owns the device table and drives every device's lifecycle engine from a
//! single control loop.  Each [`tick`](SamplingScheduler::tick) advances
//! every device by **at most one action** — power-up, wake, start, or
//! collect — chosen by polling the engine's readiness predicates.  Waiting
//! devices cost one predicate check per tick, so a slow CO₂ probe and a
//! half-second SDI-12 probe interleave freely on one thread with nobody
//! sleeping on anybody's behalf.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ tick(now)                                                     │
//! │                                                               │
//! │  dev[0] ──stage?──▶ Off          → power_up                   │
//! │  dev[1] ──stage?──▶ WarmingUp    → (wait)                     │
//! │  dev[2] ──stage?──▶ WakeReady    → wake, retry-budgeted       │
//! │  dev[3] ──stage?──▶ ResultReady  → collect → maybe publish    │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Retry policy lives here, not in the engine: a failed wake or start
//! parks the device at *attempted* and the scheduler retries on later
//! ticks until [`MAX_STAGE_RETRIES`] is spent, at which point the device
//! is cut from the round and its variables publish whatever the
//! accumulators hold (the sentinel, when nothing was collected).

use log::{debug, info, warn};

use crate::app::events::LoggerEvent;
use crate::app::ports::{EventSink, ProtocolDecoder, VariablePublisher};
use crate::lifecycle::Stage;
use crate::sensors::Device;

/// Maximum number of devices one logger services (stack-allocated table).
pub const MAX_DEVICES: usize = 8;

/// Failed wake/start attempts tolerated per device per round.
pub const MAX_STAGE_RETRIES: u8 = 5;

/// One device, its command channel, and its per-round bookkeeping.
struct DeviceEntry {
    device: Device,
    link: Box<dyn ProtocolDecoder>,
    /// First published-variable index owned by this device.
    base_index: usize,
    /// Measurement sub-cycles completed in the current window.
    samples_done: u8,
    retries: u8,
    done: bool,
}

/// The device table and round driver.
pub struct SamplingScheduler {
    entries: heapless::Vec<DeviceEntry, MAX_DEVICES>,
    next_index: usize,
}

impl SamplingScheduler {
    pub fn new() -> Self {
        Self {
            entries: heapless::Vec::new(),
            next_index: 0,
        }
    }

    /// Register a device with its decoder.  Returns the device's base
    /// published-variable index, or `None` when the table is full.
    pub fn add(&mut self, device: Device, link: Box<dyn ProtocolDecoder>) -> Option<usize> {
        let base_index = self.next_index;
        let variables = device.variable_count();
        let entry = DeviceEntry {
            device,
            link,
            base_index,
            samples_done: 0,
            retries: 0,
            done: true, // idle until a round begins
        };
        match self.entries.push(entry) {
            Ok(()) => {
                self.next_index += variables;
                if let Some(added) = self.entries.last() {
                    info!(
                        "scheduler: added '{}' at {} (vars {}..{})",
                        added.device.name(),
                        added.device.location(),
                        base_index,
                        self.next_index,
                    );
                }
                Some(base_index)
            }
            Err(_) => None, // table full
        }
    }

    pub fn device_count(&self) -> usize {
        self.entries.len()
    }

    /// Total published variables across all devices.
    pub fn variable_count(&self) -> usize {
        self.next_index
    }

    /// Open a fresh averaging window on every device.
    pub fn begin_round(&mut self, now: u64) {
        for entry in &mut self.entries {
            entry.device.lifecycle.setup(); // sticky; first round only
            entry.device.readings.reset();
            entry.samples_done = 0;
            entry.retries = 0;
            entry.done = false;
            debug!(
                "round: '{}' starting at stage {:?}",
                entry.device.name(),
                entry.device.lifecycle.stage(now)
            );
        }
    }

    /// Advance every in-flight device by at most one action.
    /// Returns `true` once every device has finished its window.
    pub fn tick(
        &mut self,
        now: u64,
        publisher: &mut dyn VariablePublisher,
        sink: &mut dyn EventSink,
    ) -> bool {
        for entry in &mut self.entries {
            if entry.done {
                continue;
            }

            match entry.device.lifecycle.stage(now) {
                Stage::Off => entry.device.lifecycle.power_up(now),

                // Pure waiting: one predicate check, no action.
                Stage::WarmingUp | Stage::Stabilizing | Stage::Measuring => {}

                Stage::WakeReady => {
                    if entry.device.lifecycle.wake(now, entry.link.as_mut()).is_ok() {
                        entry.retries = 0;
                    } else {
                        spend_retry(entry, publisher, sink);
                    }
                }

                Stage::MeasureReady => {
                    if entry
                        .device
                        .lifecycle
                        .start_measurement(now, entry.link.as_mut())
                        .is_ok()
                    {
                        entry.retries = 0;
                    } else {
                        spend_retry(entry, publisher, sink);
                    }
                }

                Stage::ResultReady => {
                    match entry.device.lifecycle.collect_result(
                        now,
                        &mut entry.device.readings,
                        entry.link.as_mut(),
                    ) {
                        Ok(_counted) => {
                            entry.samples_done += 1;
                            if entry.samples_done
                                >= entry.device.lifecycle.timing().readings_to_average
                            {
                                finish(entry, publisher, sink);
                            }
                        }
                        Err(e) => debug!("'{}': collect rejected: {e}", entry.device.name()),
                    }
                }
            }
        }
        self.all_done()
    }

    pub fn all_done(&self) -> bool {
        self.entries.iter().all(|e| e.done)
    }

    /// Deadline cut-off: power down every straggler and publish whatever
    /// its accumulators hold.  Returns how many devices were cut.
    pub fn abort_round(
        &mut self,
        publisher: &mut dyn VariablePublisher,
        sink: &mut dyn EventSink,
    ) -> usize {
        let mut cut = 0;
        for entry in &mut self.entries {
            if !entry.done {
                warn!("'{}' cut off by round deadline", entry.device.name());
                finish(entry, publisher, sink);
                cut += 1;
            }
        }
        cut
    }
}

/// Close one device's averaging window: publish a mean (or sentinel) per
/// variable, power the device down, mark it done.
fn finish(entry: &mut DeviceEntry, publisher: &mut dyn VariablePublisher, sink: &mut dyn EventSink) {
    for (offset, mean) in entry.device.readings.means().iter().enumerate() {
        let index = entry.base_index + offset;
        publisher.publish(index, *mean);
        sink.emit(&LoggerEvent::ValuePublished {
            index,
            value: *mean,
        });
    }
    entry.device.lifecycle.power_down();
    entry.done = true;
    sink.emit(&LoggerEvent::DeviceFinished {
        name: entry.device.name(),
        samples: entry.samples_done,
    });
    info!(
        "'{}' window closed after {} sample(s)",
        entry.device.name(),
        entry.samples_done
    );
}

/// Burn one retry; cut the device from the round when the budget is spent.
fn spend_retry(
    entry: &mut DeviceEntry,
    publisher: &mut dyn VariablePublisher,
    sink: &mut dyn EventSink,
) {
    entry.retries += 1;
    if entry.retries > MAX_STAGE_RETRIES {
        warn!(
            "'{}' gave up after {} failed attempts",
            entry.device.name(),
            entry.retries
        );
        sink.emit(&LoggerEvent::DeviceGaveUp {
            name: entry.device.name(),
        });
        finish(entry, publisher, sink);
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::ValueFrame;
    use crate::error::DecodeError;
    use crate::hal;
    use crate::lifecycle::average::SENTINEL;
    use crate::lifecycle::timing::TimingProfile;
    use crate::lifecycle::PowerPins;
    use crate::sensors::{BusKind, SensorModel, VariableSpec};
    use std::collections::VecDeque;

    static PROBE_VARIABLES: [VariableSpec; 2] = [
        VariableSpec {
            name: "level",
            unit: "millimeter",
            resolution: 0,
            min: 0.0,
            max: 1_000.0,
        },
        VariableSpec {
            name: "temperature",
            unit: "degreeCelsius",
            resolution: 1,
            min: -20.0,
            max: 60.0,
        },
    ];

    static PROBE_MODEL: SensorModel = SensorModel {
        name: "test probe",
        timing: TimingProfile::new(100, 200, 50),
        variables: &PROBE_VARIABLES,
    };

    /// Decoder fed a queue of frames; empty queue = decode failure.
    struct QueueLink {
        frames: VecDeque<Vec<f64>>,
        fail_start: bool,
    }

    impl QueueLink {
        fn with_frames(frames: &[&[f64]]) -> Box<Self> {
            Box::new(Self {
                frames: frames.iter().map(|f| f.to_vec()).collect(),
                fail_start: false,
            })
        }

        fn broken() -> Box<Self> {
            Box::new(Self {
                frames: VecDeque::new(),
                fail_start: true,
            })
        }
    }

    impl ProtocolDecoder for QueueLink {
        fn start_measurement(&mut self) -> Result<(), DecodeError> {
            if self.fail_start {
                Err(DecodeError::NoReply)
            } else {
                Ok(())
            }
        }

        fn read_values(&mut self) -> Result<ValueFrame, DecodeError> {
            match self.frames.pop_front() {
                Some(frame) => Ok(frame.into_iter().collect()),
                None => Err(DecodeError::NoReply),
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        values: Vec<(usize, f64)>,
        events: Vec<LoggerEvent>,
    }

    fn probe(power_pin: i32, readings: u8) -> Device {
        Device::new(
            &PROBE_MODEL,
            BusKind::Sdi12,
            0x30,
            PowerPins::single(power_pin),
            readings,
        )
    }

    fn run_until_done(sched: &mut SamplingScheduler, rec: &mut Recorder, limit_ms: u64) -> u64 {
        let mut now = 0;
        sched.begin_round(now);
        loop {
            // The two ports need independent &mut, so each borrows its
            // own Recorder field through a shim.
            let done = {
                let mut pub_shim = PubShim(&mut rec.values);
                let mut sink_shim = SinkShim(&mut rec.events);
                sched.tick(now, &mut pub_shim, &mut sink_shim)
            };
            if done || now > limit_ms {
                return now;
            }
            now += 25;
        }
    }

    struct PubShim<'a>(&'a mut Vec<(usize, f64)>);
    impl VariablePublisher for PubShim<'_> {
        fn publish(&mut self, index: usize, value: f64) {
            self.0.push((index, value));
        }
    }

    struct SinkShim<'a>(&'a mut Vec<LoggerEvent>);
    impl EventSink for SinkShim<'_> {
        fn emit(&mut self, event: &LoggerEvent) {
            self.0.push(event.clone());
        }
    }

    #[test]
    fn single_device_round_publishes_averages() {
        let mut sched = SamplingScheduler::new();
        sched
            .add(
                probe(20, 2),
                QueueLink::with_frames(&[&[10.0, 21.0], &[12.0, 23.0]]),
            )
            .unwrap();

        let mut rec = Recorder::default();
        run_until_done(&mut sched, &mut rec, 10_000);

        assert!(sched.all_done());
        assert_eq!(rec.values.len(), 2);
        assert_eq!(rec.values[0].0, 0);
        assert!((rec.values[0].1 - 11.0).abs() < f64::EPSILON);
        assert!((rec.values[1].1 - 22.0).abs() < f64::EPSILON);
        // Rail is dropped once the window closes.
        assert!(!hal::sim_pin_level(20));
    }

    #[test]
    fn two_devices_interleave_and_get_distinct_indices() {
        let mut sched = SamplingScheduler::new();
        let base_a = sched
            .add(probe(21, 1), QueueLink::with_frames(&[&[1.0, 2.0]]))
            .unwrap();
        let base_b = sched
            .add(probe(22, 1), QueueLink::with_frames(&[&[3.0, 4.0]]))
            .unwrap();
        assert_eq!(base_a, 0);
        assert_eq!(base_b, 2);

        let mut rec = Recorder::default();
        run_until_done(&mut sched, &mut rec, 10_000);

        let mut indices: Vec<usize> = rec.values.iter().map(|(i, _)| *i).collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn broken_device_gives_up_and_publishes_sentinels() {
        let mut sched = SamplingScheduler::new();
        sched.add(probe(23, 1), QueueLink::broken()).unwrap();

        let mut rec = Recorder::default();
        run_until_done(&mut sched, &mut rec, 60_000);

        assert!(sched.all_done());
        assert!(rec
            .events
            .iter()
            .any(|e| matches!(e, LoggerEvent::DeviceGaveUp { .. })));
        assert_eq!(rec.values.len(), 2);
        assert_eq!(rec.values[0].1, SENTINEL);
        assert_eq!(rec.values[1].1, SENTINEL);
        assert!(!hal::sim_pin_level(23));
    }

    #[test]
    fn nan_samples_do_not_zero_fill_the_mean() {
        let mut sched = SamplingScheduler::new();
        sched
            .add(
                probe(24, 3),
                QueueLink::with_frames(&[
                    &[10.0, 0.0],
                    &[f64::NAN, 0.0],
                    &[12.0, 0.0],
                ]),
            )
            .unwrap();

        let mut rec = Recorder::default();
        run_until_done(&mut sched, &mut rec, 10_000);

        assert!((rec.values[0].1 - 11.0).abs() < f64::EPSILON);
    }

    #[test]
    fn abort_cuts_stragglers_and_powers_down() {
        static SLOW_MODEL: SensorModel = SensorModel {
            name: "glacier",
            timing: TimingProfile::new(3_600_000, 0, 0),
            variables: &PROBE_VARIABLES,
        };
        let mut sched = SamplingScheduler::new();
        sched
            .add(
                Device::new(&SLOW_MODEL, BusKind::Sdi12, 0x31, PowerPins::single(25), 1),
                QueueLink::with_frames(&[&[1.0, 2.0]]),
            )
            .unwrap();

        let mut rec = Recorder::default();
        sched.begin_round(0);
        let done = sched.tick(0, &mut PubShim(&mut rec.values), &mut SinkShim(&mut rec.events));
        assert!(!done);
        assert!(hal::sim_pin_level(25)); // warming up, rail on

        let cut = sched.abort_round(&mut PubShim(&mut rec.values), &mut SinkShim(&mut rec.events));
        assert_eq!(cut, 1);
        assert!(sched.all_done());
        assert!(!hal::sim_pin_level(25));
        assert_eq!(rec.values[0].1, SENTINEL);
    }

    #[test]
    fn second_round_reuses_the_same_devices() {
        let mut sched = SamplingScheduler::new();
        sched
            .add(
                probe(26, 1),
                QueueLink::with_frames(&[&[5.0, 6.0], &[7.0, 8.0]]),
            )
            .unwrap();

        let mut rec = Recorder::default();
        run_until_done(&mut sched, &mut rec, 10_000);
        run_until_done(&mut sched, &mut rec, 10_000);

        assert_eq!(rec.values.len(), 4);
        // Second window starts clean: 7.0, not an average with 5.0.
        assert!((rec.values[2].1 - 7.0).abs() < f64::EPSILON);
    }
}
