//! Per-device status register.
//!
//! The original hardware convention packs seven flags into one byte; here
//! the same facts are a sticky setup bit plus three [`Phase`] values, one
//! per stage that needs an attempted/confirmed distinction.  A confirmed
//! phase is only reachable through attempted — the register refuses to
//! skip, so a caller can trust `Confirmed` to mean the action really ran.

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Progress of one confirm-gated stage (power-on, activation, measurement).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Phase {
    /// Stage not begun.
    #[default]
    Idle = 0,
    /// Action sent, outcome unknown or failed — retry territory.
    Attempted = 1,
    /// Action known to have taken effect.
    Confirmed = 2,
}

impl Phase {
    /// Record an attempt.  A confirmed phase stays confirmed (re-attempting
    /// a completed stage never downgrades it).
    pub fn attempt(&mut self) {
        if *self != Self::Confirmed {
            *self = Self::Attempted;
        }
    }

    /// Record a confirmation.  Returns `false` and stays `Idle` when no
    /// attempt was recorded first — confirmation cannot leapfrog.
    pub fn confirm(&mut self) -> bool {
        match self {
            Self::Idle => false,
            Self::Attempted | Self::Confirmed => {
                *self = Self::Confirmed;
                true
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::Idle;
    }

    pub fn is_attempted(self) -> bool {
        self != Self::Idle
    }

    pub fn is_confirmed(self) -> bool {
        self == Self::Confirmed
    }
}

// ---------------------------------------------------------------------------
// StatusRegister
// ---------------------------------------------------------------------------

/// The sole source of truth for "what stage is this device at".
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusRegister {
    setup_complete: bool,
    pub power: Phase,
    pub activation: Phase,
    pub measurement: Phase,
}

impl StatusRegister {
    pub const fn new() -> Self {
        Self {
            setup_complete: false,
            power: Phase::Idle,
            activation: Phase::Idle,
            measurement: Phase::Idle,
        }
    }

    /// Pin modes have been configured.  Sticky: survives power cycling,
    /// because pin-mode configuration is a one-time hardware operation.
    pub fn mark_setup_complete(&mut self) {
        self.setup_complete = true;
    }

    pub fn setup_complete(&self) -> bool {
        self.setup_complete
    }

    /// Power-off regression: every phase back to `Idle`, setup preserved.
    pub fn clear_power_cycle(&mut self) {
        self.power.reset();
        self.activation.reset();
        self.measurement.reset();
    }

    /// End of one measurement sub-cycle: only the measurement phase resets,
    /// so the next averaging sub-reading can start without re-waking.
    pub fn clear_measurement(&mut self) {
        self.measurement.reset();
    }
}
