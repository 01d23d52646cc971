#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared status storage for the firmware target.
//!
//! Atomics mirror the front-panel lamps, the last climate reading and the
//! log card counters so a debugger (or a later diagnostics task) can read a
//! [`StatusSnapshot`] without borrowing the mission's collaborators.

use mission_core::environment::{DeciCelsius, DeciPercent};
use mission_core::io::Indicator;
use portable_atomic::{AtomicI16, AtomicU8, AtomicU16, AtomicU32, Ordering};

/// Sentinel stored while no valid humidity has been read.
const NO_HUMIDITY: u16 = u16::MAX;
/// Sentinel stored while no valid temperature has been read.
const NO_TEMPERATURE: i16 = i16::MIN;

/// Bitmask of lit indicators (1 == lit).
static LAMP_MASK: AtomicU8 = AtomicU8::new(0);
static LAST_TEMPERATURE: AtomicI16 = AtomicI16::new(NO_TEMPERATURE);
static LAST_HUMIDITY: AtomicU16 = AtomicU16::new(NO_HUMIDITY);
/// Sensor frames rejected by the decoder.
static SENSOR_FAULTS: AtomicU32 = AtomicU32::new(0);
/// Lines made durable on the log card.
static LOG_LINES: AtomicU32 = AtomicU32::new(0);
/// Lines the log card refused.
static LOG_FAILURES: AtomicU32 = AtomicU32::new(0);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatusSnapshot {
    pub power: bool,
    pub trigger_armed: bool,
    pub link_connected: bool,
    pub temperature: Option<DeciCelsius>,
    pub humidity: Option<DeciPercent>,
    pub sensor_faults: u32,
    pub log_lines: u32,
    pub log_failures: u32,
}

fn bit_for(indicator: Indicator) -> u8 {
    match indicator {
        Indicator::Power => 1 << 0,
        Indicator::TriggerArmed => 1 << 1,
        Indicator::LinkConnected => 1 << 2,
    }
}

/// Records the state of one front-panel lamp.
pub fn record_indicator(indicator: Indicator, lit: bool) {
    let bit = bit_for(indicator);
    if lit {
        LAMP_MASK.fetch_or(bit, Ordering::Relaxed);
    } else {
        LAMP_MASK.fetch_and(!bit, Ordering::Relaxed);
    }
}

pub fn indicator_lit(indicator: Indicator) -> bool {
    LAMP_MASK.load(Ordering::Relaxed) & bit_for(indicator) != 0
}

/// Stores a decoded climate reading.
pub fn record_climate(temperature: DeciCelsius, humidity: DeciPercent) {
    LAST_TEMPERATURE.store(temperature.tenths(), Ordering::Relaxed);
    LAST_HUMIDITY.store(humidity.tenths(), Ordering::Relaxed);
}

pub fn record_sensor_fault() {
    SENSOR_FAULTS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_log_line(durable: bool) {
    if durable {
        LOG_LINES.fetch_add(1, Ordering::Relaxed);
    } else {
        LOG_FAILURES.fetch_add(1, Ordering::Relaxed);
    }
}

/// Builds a [`StatusSnapshot`] from the stored values.
pub fn snapshot() -> StatusSnapshot {
    let temperature = match LAST_TEMPERATURE.load(Ordering::Relaxed) {
        NO_TEMPERATURE => None,
        tenths => Some(DeciCelsius::from_tenths(tenths)),
    };
    let humidity = match LAST_HUMIDITY.load(Ordering::Relaxed) {
        NO_HUMIDITY => None,
        tenths => Some(DeciPercent::from_tenths(tenths)),
    };

    StatusSnapshot {
        power: indicator_lit(Indicator::Power),
        trigger_armed: indicator_lit(Indicator::TriggerArmed),
        link_connected: indicator_lit(Indicator::LinkConnected),
        temperature,
        humidity,
        sensor_faults: SENSOR_FAULTS.load(Ordering::Relaxed),
        log_lines: LOG_LINES.load(Ordering::Relaxed),
        log_failures: LOG_FAILURES.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The cells are process-wide, so everything is checked in one test.
    #[test]
    fn snapshot_reflects_recorded_state() {
        record_indicator(Indicator::Power, true);
        record_indicator(Indicator::LinkConnected, true);
        record_indicator(Indicator::LinkConnected, false);
        record_climate(DeciCelsius::from_tenths(-15), DeciPercent::from_tenths(873));
        record_sensor_fault();
        record_log_line(true);
        record_log_line(true);
        record_log_line(false);

        let snapshot = snapshot();
        assert!(snapshot.power);
        assert!(!snapshot.trigger_armed);
        assert!(!snapshot.link_connected);
        assert_eq!(snapshot.temperature, Some(DeciCelsius::from_tenths(-15)));
        assert_eq!(snapshot.humidity, Some(DeciPercent::from_tenths(873)));
        assert_eq!(snapshot.sensor_faults, 1);
        assert_eq!((snapshot.log_lines, snapshot.log_failures), (2, 1));
    }
}
