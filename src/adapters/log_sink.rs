//! Log-based event sink and publisher adapters.
//!
//! Implements [`EventSink`] and [`VariablePublisher`] by writing to the
//! serial logger (UART / USB-CDC in production).  A telemetry uplink
//! adapter would implement the same traits.

use log::{info, warn};

use crate::app::events::LoggerEvent;
use crate::app::ports::{EventSink, VariablePublisher};
use crate::lifecycle::average::SENTINEL;

/// Adapter that logs every [`LoggerEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &LoggerEvent) {
        match event {
            LoggerEvent::RoundStarted { round } => {
                info!("ROUND | #{round} started");
            }
            LoggerEvent::DeviceFinished { name, samples } => {
                info!("DEV   | '{name}' done ({samples} sample(s))");
            }
            LoggerEvent::DeviceGaveUp { name } => {
                warn!("DEV   | '{name}' gave up this round");
            }
            LoggerEvent::ValuePublished { index, value } => {
                info!("VALUE | [{index}] = {value}");
            }
            LoggerEvent::ModemUp => info!("MODEM | session up"),
            LoggerEvent::ModemDown => info!("MODEM | powered down"),
            LoggerEvent::NetworkFailed => warn!("MODEM | network unavailable"),
            LoggerEvent::RoundCompleted { round, duration_ms } => {
                info!("ROUND | #{round} completed in {duration_ms} ms");
            }
            LoggerEvent::RoundAborted { unfinished } => {
                warn!("ROUND | aborted with {unfinished} device(s) unfinished");
            }
        }
    }
}

/// Publisher that logs each averaged value instead of uplinking it.
pub struct LogPublisher;

impl LogPublisher {
    pub fn new() -> Self {
        Self
    }
}

impl VariablePublisher for LogPublisher {
    fn publish(&mut self, index: usize, value: f64) {
        if value == SENTINEL {
            warn!("publish: var[{index}] has no reading this round");
        } else {
            info!("publish: var[{index}] = {value:.3}");
        }
    }
}
