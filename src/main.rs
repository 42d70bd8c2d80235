//! FieldLog Firmware — Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  OnboardLink        LogEventSink     LogPublisher              │
//! │  (ProtocolDecoder)  (EventSink)      (VariablePublisher)       │
//! │  Modem = ModemPowerSwitch + AT session                         │
//! │  (ModemPower + ModemTransport)                                 │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │        LoggerService (pure logic)                      │    │
//! │  │  SamplingScheduler · DeviceLifecycle · Averaging       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::peripherals::Peripherals;

use fieldlog::adapters::log_sink::{LogEventSink, LogPublisher};
use fieldlog::app::ports::{ModemPower, ModemTransport, ProtocolDecoder, ValueFrame};
use fieldlog::app::service::LoggerService;
use fieldlog::config::LoggerConfig;
use fieldlog::error::DecodeError;
use fieldlog::hal;
use fieldlog::hal::time::BoardClock;
use fieldlog::pins;
use fieldlog::power::{ModemPowerSwitch, SwitchMode};
use fieldlog::sensors::onboard;

// ── Onboard decoder ───────────────────────────────────────────
//
// The board's own "protocol" is just the ADC: battery voltage through the
// 1.47:1 divider.

fn battery_volts() -> f64 {
    let raw = hal::adc1_read(hal::ADC1_CH_BATTERY);
    f64::from(raw) * (3.3 / 4095.0) * 1.47
}

struct OnboardLink;

impl ProtocolDecoder for OnboardLink {
    fn start_measurement(&mut self) -> Result<(), DecodeError> {
        Ok(())
    }

    fn read_values(&mut self) -> Result<ValueFrame, DecodeError> {
        let mut frame = ValueFrame::new();
        let _ = frame.push(battery_volts());
        Ok(frame)
    }
}

// ── Modem adapter ─────────────────────────────────────────────
//
// Power sequencing is handled here; the AT-command session driver is an
// external collaborator linked by the station build.  This bench build
// opens the session optimistically so the round machinery can be
// exercised on hardware without a SIM.

struct Modem<EN, SENSE, D> {
    switch: ModemPowerSwitch<EN, SENSE, D>,
    apn: heapless::String<32>,
    network_wait_ms: u32,
    session_up: bool,
}

impl<EN: OutputPin, SENSE: InputPin, D: DelayNs> ModemPower for Modem<EN, SENSE, D> {
    fn power_on(&mut self) -> bool {
        self.switch.on()
    }

    fn power_off(&mut self) {
        self.session_up = false;
        self.switch.off();
    }

    fn is_powered(&mut self) -> bool {
        self.switch.is_on()
    }
}

impl<EN: OutputPin, SENSE: InputPin, D: DelayNs> ModemTransport for Modem<EN, SENSE, D> {
    fn connect(&mut self) -> bool {
        info!(
            "modem: session open, APN '{}' (bench transport, {} ms budget)",
            self.apn, self.network_wait_ms
        );
        self.session_up = true;
        true
    }

    fn disconnect(&mut self) {
        info!("modem: session closed");
        self.session_up = false;
    }

    fn is_network_up(&mut self) -> bool {
        self.session_up
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("FieldLog v{}", env!("CARGO_PKG_VERSION"));

    hal::init_peripherals().map_err(|e| anyhow::anyhow!("peripheral init: {e}"))?;

    let config = LoggerConfig::default();
    let clock = BoardClock::new();

    let battery = battery_volts();
    info!("battery at boot: {battery:.2} V");
    if battery < f64::from(config.low_battery_volts) {
        warn!(
            "battery below {} V; rounds will run but the uplink may brown out",
            config.low_battery_volts
        );
    }

    // Modem power lines; the key/status pair is owned as typed pins, the
    // main rail stays a numbered GPIO shared with the rail table.
    let peripherals = Peripherals::take()?;
    let key = PinDriver::output(peripherals.pins.gpio10)?;
    let status = PinDriver::input(peripherals.pins.gpio11)?;
    let switch = ModemPowerSwitch::new(
        SwitchMode::Pulsed,
        key,
        Some(status),
        Some(pins::MODEM_VCC_GPIO),
        FreeRtos,
    );
    let mut modem = Modem {
        switch,
        apn: config.apn.clone(),
        network_wait_ms: config.network_wait_ms,
        session_up: false,
    };

    let mut service = LoggerService::new(config.clone());

    let board = onboard::device();
    for var in board.variables() {
        info!(
            "variable: {} [{}], {} decimal(s)",
            var.name, var.unit, var.resolution
        );
    }
    service.add_device(board, Box::new(OnboardLink));
    // TODO: register the CTD and GMP252 devices once the SDI-12 and Modbus
    // decoder drivers land in the station build.

    service.start(clock.now_ms());

    let mut publisher = LogPublisher::new();
    let mut sink = LogEventSink::new();
    loop {
        service.tick(clock.now_ms(), &mut modem, &mut publisher, &mut sink);
        FreeRtos::delay_ms(config.tick_interval_ms);
    }
}
