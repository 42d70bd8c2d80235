//! Modem power sequencing.
//!
//! Cellular/Wi-Fi bee modules come in two electrical flavours: some want a
//! momentary pulse on the key line to toggle power, others want the line
//! held.  Both confirm (when a status line is wired at all) through the
//! same bounded poll, so the two strategies share one switch type and
//! differ only in how they drive the key line.
//!
//! ```text
//!  on():   [main rail up] ─▶ pulse / hold key ─▶ poll status ≤ 10 s
//!  off():  pulse / drop key ─▶ poll status ≤ 10 s ─▶ [main rail DOWN]
//! ```
//!
//! The off-path drops the main rail even when confirmation times out — a
//! stuck modem must never be left draining the battery.  This is the one
//! place in the crate allowed to wait in place; everything above it polls.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::{debug, info, warn};

use crate::hal;

/// Key-line low time before the toggle pulse.
pub const PULSE_SETTLE_MS: u32 = 200;
/// Key-line high time that constitutes the toggle pulse.
pub const PULSE_HOLD_MS: u32 = 2_500;
/// Bound on the status-confirmation poll.
pub const CONFIRM_TIMEOUT_MS: u32 = 10_000;
/// Status poll granularity.
pub const CONFIRM_POLL_MS: u32 = 5;

/// How the fitted module's key line is driven.  Chosen once at
/// construction — never re-decided per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchMode {
    /// Momentary low→high→low pulse toggles power.
    Pulsed,
    /// Level-held key line: high = on, low = off.
    Held,
}

/// The on-off sequencer for one modem.
///
/// Owns the key line and optional status-sense line as embedded-hal pins,
/// plus the numbered main-rail GPIO.  With no status line wired,
/// [`is_on`](Self::is_on) optimistically reports on — the caller cannot
/// distinguish "on" from "no sensing capability".
pub struct ModemPowerSwitch<EN, SENSE, D> {
    mode: SwitchMode,
    key: EN,
    sense: Option<SENSE>,
    /// Main power rail (load switch), if this board controls one.
    vcc_pin: Option<i32>,
    delay: D,
}

impl<EN, SENSE, D> ModemPowerSwitch<EN, SENSE, D>
where
    EN: OutputPin,
    SENSE: InputPin,
    D: DelayNs,
{
    pub fn new(
        mode: SwitchMode,
        key: EN,
        sense: Option<SENSE>,
        vcc_pin: Option<i32>,
        delay: D,
    ) -> Self {
        Self {
            mode,
            key,
            sense,
            vcc_pin,
            delay,
        }
    }

    /// Status-line readback; optimistic without sensing.
    pub fn is_on(&mut self) -> bool {
        match &mut self.sense {
            Some(pin) => pin.is_high().unwrap_or(false),
            None => true,
        }
    }

    /// Sequence the modem on.  Returns `false` when the status line never
    /// confirmed within [`CONFIRM_TIMEOUT_MS`].
    pub fn on(&mut self) -> bool {
        self.drive_rail(true);
        match self.mode {
            SwitchMode::Pulsed => {
                if !self.is_on() {
                    self.pulse();
                }
            }
            SwitchMode::Held => self.drive_key(true),
        }

        let confirmed = self.wait_for(true);
        if confirmed {
            info!("modem on ({:?})", self.mode);
        } else {
            warn!("modem failed to confirm on within {} ms", CONFIRM_TIMEOUT_MS);
        }
        confirmed
    }

    /// Sequence the modem off.  The main rail is **always** cut at the
    /// end, confirmed or not.
    pub fn off(&mut self) {
        match self.mode {
            SwitchMode::Pulsed => {
                if self.is_on() {
                    self.pulse();
                }
            }
            SwitchMode::Held => self.drive_key(false),
        }

        if self.wait_for(false) {
            info!("modem off");
        } else {
            warn!(
                "modem did not confirm off within {} ms; cutting power anyway",
                CONFIRM_TIMEOUT_MS
            );
        }
        self.drive_rail(false);
    }

    // ── Internal ──────────────────────────────────────────────

    /// The momentary toggle: low, settle, high for the pulse width, low.
    fn pulse(&mut self) {
        self.drive_key(false);
        self.delay.delay_ms(PULSE_SETTLE_MS);
        self.drive_key(true);
        self.delay.delay_ms(PULSE_HOLD_MS);
        self.drive_key(false);
    }

    /// The shared confirmation poll, bounded by [`CONFIRM_TIMEOUT_MS`].
    fn wait_for(&mut self, desired: bool) -> bool {
        for _ in 0..(CONFIRM_TIMEOUT_MS / CONFIRM_POLL_MS) {
            if self.is_on() == desired {
                return true;
            }
            self.delay.delay_ms(CONFIRM_POLL_MS);
        }
        self.is_on() == desired
    }

    fn drive_key(&mut self, high: bool) {
        let result = if high {
            self.key.set_high()
        } else {
            self.key.set_low()
        };
        if result.is_err() {
            warn!("modem key line write failed");
        }
    }

    fn drive_rail(&mut self, high: bool) {
        if let Some(pin) = self.vcc_pin {
            debug!(
                "modem main rail {}",
                if high { "up" } else { "down" }
            );
            hal::gpio_write(pin, high);
        }
    }
}
