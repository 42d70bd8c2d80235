//! GPIO / peripheral pin assignments for the FieldLog main board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Switched sensor power rails
// ---------------------------------------------------------------------------

/// Digital output: switched 3V3 rail feeding the SDI-12 sensor bank
/// (active HIGH, load switch with soft-start).
pub const SDI12_RAIL_GPIO: i32 = 5;
/// Digital output: switched 12 V boost rail for Modbus/RS485 probes.
pub const MODBUS_RAIL_GPIO: i32 = 6;
/// Digital output: 3V3 rail for the RS485 transceiver itself, kept on a
/// separate switch so the transceiver can be powered without the probe.
pub const RS485_RAIL_GPIO: i32 = 7;
/// Digital output: RS485 driver-enable (DE/RE direction control).
pub const RS485_DE_GPIO: i32 = 8;

// ---------------------------------------------------------------------------
// Modem (cellular bee socket)
// ---------------------------------------------------------------------------

/// Digital output: modem VCC load switch (main power, active HIGH).
pub const MODEM_VCC_GPIO: i32 = 9;
/// Digital output: modem on/off key line (DTR/KEY, pulsed or held
/// depending on the module fitted).
pub const MODEM_KEY_GPIO: i32 = 10;
/// Digital input: modem status feedback (STATUS/CTS).  HIGH = modem on.
pub const MODEM_STATUS_GPIO: i32 = 11;

// ---------------------------------------------------------------------------
// Data buses
// ---------------------------------------------------------------------------

/// SDI-12 single-wire data line (bit-banged UART, 1200 baud).
pub const SDI12_DATA_GPIO: i32 = 4;

/// RS485 UART.
pub const RS485_TX_GPIO: i32 = 15;
pub const RS485_RX_GPIO: i32 = 16;

/// Modem UART.
pub const MODEM_TX_GPIO: i32 = 17;
pub const MODEM_RX_GPIO: i32 = 18;

// ---------------------------------------------------------------------------
// Onboard sensing — Analog (ADC1)
// ---------------------------------------------------------------------------

/// Battery voltage through a 1.47:1 resistive divider.
/// ADC1 channel 0 (GPIO 1 on ESP32-S3).
pub const BATTERY_ADC_GPIO: i32 = 1;
