//! Host-side embedded-hal test doubles.
//!
//! [`SimPin`] and [`SimDelay`] stand in for the modem enable/status lines
//! and the FreeRTOS delay provider when the power sequencer runs on the
//! host.  `SimDelay` advances a virtual clock instead of sleeping, and can
//! flip a [`SimPin`] at a scheduled virtual time — which is how tests model
//! a modem whose status line confirms some milliseconds after the key
//! pulse.

use core::convert::Infallible;
use std::cell::Cell;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

// ── SimPin ────────────────────────────────────────────────────

/// A shared-level digital pin.  Cloning via [`SimPin::handle`] yields a
/// second handle onto the same electrical node, so a test can keep one
/// while the sequencer owns the other.
#[derive(Clone)]
pub struct SimPin {
    level: Rc<Cell<bool>>,
}

impl SimPin {
    pub fn new(initial: bool) -> Self {
        Self {
            level: Rc::new(Cell::new(initial)),
        }
    }

    /// Another handle onto the same node.
    pub fn handle(&self) -> Self {
        self.clone()
    }

    pub fn level(&self) -> bool {
        self.level.get()
    }

    pub fn set_level(&self, high: bool) {
        self.level.set(high);
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.level.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.level.set(true);
        Ok(())
    }
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.level.get())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.level.get())
    }
}

// ── SimDelay ──────────────────────────────────────────────────

/// Virtual-time delay provider.  Each `delay_ns` call advances the virtual
/// clock and fires any scheduled pin changes that have come due.
pub struct SimDelay {
    elapsed_ns: u64,
    events: Vec<(u64, Rc<Cell<bool>>, bool)>,
}

impl Default for SimDelay {
    fn default() -> Self {
        Self::new()
    }
}

impl SimDelay {
    pub fn new() -> Self {
        Self {
            elapsed_ns: 0,
            events: Vec::new(),
        }
    }

    /// Schedule `pin` to change to `level` once `ms` of virtual time have
    /// elapsed (measured from now, not from schedule creation order).
    pub fn set_level_after(&mut self, ms: u64, pin: &SimPin, level: bool) {
        let deadline = self.elapsed_ns + ms * 1_000_000;
        self.events.push((deadline, pin.level.clone(), level));
    }

    /// Virtual milliseconds spent inside `delay_*` calls so far.
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns / 1_000_000
    }

    fn fire_due(&mut self) {
        let now = self.elapsed_ns;
        self.events.retain(|(deadline, cell, level)| {
            if *deadline <= now {
                cell.set(*level);
                false
            } else {
                true
            }
        });
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += u64::from(ns);
        self.fire_due();
    }
}
