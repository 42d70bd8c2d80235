//! One-shot peripheral initialization and numbered-GPIO access.
//!
//! The lifecycle engine switches many heterogeneous power rails that are
//! configured once at boot and addressed by pin number afterwards; this
//! module is that seam.  Raw ESP-IDF sys calls on the device, an in-memory
//! pin table on the host so tests can observe rail states.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: `gpio_config`/`gpio_set_level`/`gpio_get_level` and the
//! oneshot ADC API.
//! On host/test: a static atomic pin table plus `sim_*` injection helpers.

pub mod time;

#[cfg(not(target_os = "espidf"))]
pub mod sim;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    GpioConfigFailed(i32),
    AdcInitFailed(i32),
}

impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
        }
    }
}

// ── Boot-time peripheral bring-up ─────────────────────────────

/// Configure the board's fixed pins: power rails low, modem status as
/// input, battery ADC ready.  Called once from `main()` before the
/// control loop starts.  Per-device pins are configured later by each
/// device's `setup()`.
#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HalError> {
    let rail_pins = [
        pins::SDI12_RAIL_GPIO,
        pins::MODBUS_RAIL_GPIO,
        pins::RS485_RAIL_GPIO,
        pins::RS485_DE_GPIO,
        pins::MODEM_VCC_GPIO,
    ];
    for &pin in &rail_pins {
        gpio_configure_output(pin);
        gpio_write(pin, false);
    }

    gpio_configure_input(pins::MODEM_STATUS_GPIO);

    // SAFETY: called once from main() before the control loop; single-threaded.
    unsafe { init_adc()? };

    info!("hal: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HalError> {
    info!("hal(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO by pin number ────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn gpio_configure_output(pin: i32) {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: gpio_config validates the pin mask; main-loop context only.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        log::error!("hal: output config failed for GPIO{} (rc={})", pin, ret);
    }
}

#[cfg(target_os = "espidf")]
pub fn gpio_configure_input(pin: i32) {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_ENABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: gpio_config validates the pin mask; main-loop context only.
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        log::error!("hal: input config failed for GPIO{} (rc={})", pin, ret);
    }
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin;
    // main-loop only.
    unsafe {
        gpio_set_level(pin, if high { 1 } else { 0 });
    }
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access on an
    // already-configured input pin; safe to call from main context.
    (unsafe { gpio_get_level(pin) }) != 0
}

// ── Host simulation backend ───────────────────────────────────
//
// A flat table of pin levels, written by gpio_write and by the sim_*
// helpers, read by gpio_read and sim_pin_level.  Tests use distinct pin
// numbers so parallel test threads do not trample each other.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};

#[cfg(not(target_os = "espidf"))]
const SIM_PIN_COUNT: usize = 49; // ESP32-S3 exposes GPIO0..GPIO48

#[cfg(not(target_os = "espidf"))]
static SIM_PIN_LEVELS: [AtomicBool; SIM_PIN_COUNT] =
    [const { AtomicBool::new(false) }; SIM_PIN_COUNT];

#[cfg(not(target_os = "espidf"))]
pub fn gpio_configure_output(_pin: i32) {}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_configure_input(_pin: i32) {}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(pin: i32, high: bool) {
    if let Some(slot) = SIM_PIN_LEVELS.get(pin as usize) {
        slot.store(high, Ordering::Relaxed);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(pin: i32) -> bool {
    SIM_PIN_LEVELS
        .get(pin as usize)
        .map_or(false, |slot| slot.load(Ordering::Relaxed))
}

/// Drive a simulated input pin from a test.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_pin(pin: i32, high: bool) {
    gpio_write(pin, high);
}

/// Observe a simulated pin level (e.g. assert a power rail was dropped).
#[cfg(not(target_os = "espidf"))]
pub fn sim_pin_level(pin: i32) -> bool {
    gpio_read(pin)
}

// ── ADC (oneshot) ─────────────────────────────────────────────

/// ADC1 channel for the battery divider.
pub const ADC1_CH_BATTERY: u32 = 0;

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HalError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HalError::AdcInitFailed(ret));
    }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    // SAFETY: handle was created above; single-threaded init path.
    let ret = unsafe { adc_oneshot_config_channel(ADC1_HANDLE, ADC1_CH_BATTERY, &chan_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HalError::AdcInitFailed(ret));
    }

    info!("hal: ADC1 configured (CH0=battery)");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> u16 {
    let mut raw: i32 = 0;
    // SAFETY: ADC1_HANDLE is written once during init_adc() before this
    // function is called; single-threaded main-loop access guaranteed.
    let ret = unsafe { adc_oneshot_read(ADC1_HANDLE, channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return 0;
    }
    raw.max(0) as u16
}

#[cfg(not(target_os = "espidf"))]
static SIM_BATTERY_ADC: AtomicU16 = AtomicU16::new(0);

#[cfg(not(target_os = "espidf"))]
pub fn adc1_read(_channel: u32) -> u16 {
    SIM_BATTERY_ADC.load(Ordering::Relaxed)
}

/// Inject a raw battery ADC count for host tests.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_battery_adc(raw: u16) {
    SIM_BATTERY_ADC.store(raw, Ordering::Relaxed);
}
