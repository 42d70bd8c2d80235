//! Outbound application events.
//!
//! The [`LoggerService`](super::service::LoggerService) emits these through
//! the [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them — log to serial, stage for the uplink,
//! record in a test.

/// Structured events emitted by the logger core.
#[derive(Debug, Clone, PartialEq)]
pub enum LoggerEvent {
    /// A sampling round began.
    RoundStarted { round: u32 },

    /// One device finished its averaging window.
    DeviceFinished {
        name: &'static str,
        /// Measurement sub-cycles completed in the window.
        samples: u8,
    },

    /// A device exhausted its retry budget and was cut from the round.
    DeviceGaveUp { name: &'static str },

    /// One averaged value was handed to the publisher.
    ValuePublished { index: usize, value: f64 },

    /// Modem powered and network session opened.
    ModemUp,

    /// Modem session closed and power cut.
    ModemDown,

    /// The modem could not be brought up or registered; the round's values
    /// stay published locally.
    NetworkFailed,

    /// A sampling round finished, modem session included.
    RoundCompleted { round: u32, duration_ms: u64 },

    /// The round deadline passed with devices still in flight.
    RoundAborted { unfinished: usize },
}
