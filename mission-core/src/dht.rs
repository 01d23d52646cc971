//! DHT22 (AM2302) frame decoding.
//!
//! The sensor answers a start pulse with 40 data bits. Every bit is a ~50 µs
//! low separator followed by a high pulse whose width encodes the value:
//! ~26-28 µs for `0`, ~70 µs for `1`. The firmware only captures the high-pulse
//! widths; everything from there to a reading happens here.
//!
//! Frame layout: humidity (16 bits, tenths of a percent), temperature
//! (15 bits magnitude in tenths of a degree plus a sign bit), checksum (low
//! byte of the sum of the first four bytes).

use core::fmt;

use crate::environment::{DeciCelsius, DeciPercent};

pub const FRAME_BITS: usize = 40;
pub const FRAME_BYTES: usize = FRAME_BITS / 8;

/// High pulses longer than this are `1` bits.
pub const ONE_THRESHOLD_MICROS: u16 = 50;

/// The sensor needs at least this long between conversions.
pub const MIN_SAMPLE_PERIOD_MILLIS: u64 = 2_000;

const MAX_HUMIDITY_TENTHS: u16 = 1_000;
const MIN_TEMPERATURE_TENTHS: i16 = -400;
const MAX_TEMPERATURE_TENTHS: i16 = 800;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DhtError {
    /// No response pulse after the start signal.
    NoResponse,
    /// The sensor stopped toggling mid-frame.
    Truncated,
    /// Checksum byte did not match the payload.
    Checksum { expected: u8, actual: u8 },
    /// Decoded values lie outside the sensor's rated range.
    OutOfRange,
}

impl fmt::Display for DhtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoResponse => f.write_str("sensor did not respond"),
            Self::Truncated => f.write_str("sensor frame truncated"),
            Self::Checksum { expected, actual } => {
                write!(f, "checksum mismatch (expected {expected:#04x}, got {actual:#04x})")
            }
            Self::OutOfRange => f.write_str("reading outside sensor range"),
        }
    }
}

/// Decoded humidity/temperature pair.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DhtReading {
    pub humidity: DeciPercent,
    pub temperature: DeciCelsius,
}

/// Packs captured high-pulse widths, most significant bit first.
#[must_use]
pub fn pack_pulses(high_micros: &[u16; FRAME_BITS]) -> [u8; FRAME_BYTES] {
    let mut frame = [0u8; FRAME_BYTES];
    for (index, &width) in high_micros.iter().enumerate() {
        if width > ONE_THRESHOLD_MICROS {
            frame[index / 8] |= 0x80 >> (index % 8);
        }
    }
    frame
}

/// Validates and decodes a packed frame.
///
/// # Errors
///
/// Returns [`DhtError::Checksum`] on a corrupted frame and
/// [`DhtError::OutOfRange`] when the values exceed the sensor's ratings.
pub fn decode(frame: [u8; FRAME_BYTES]) -> Result<DhtReading, DhtError> {
    let [h_hi, h_lo, t_hi, t_lo, checksum] = frame;
    let expected = h_hi
        .wrapping_add(h_lo)
        .wrapping_add(t_hi)
        .wrapping_add(t_lo);
    if expected != checksum {
        return Err(DhtError::Checksum {
            expected,
            actual: checksum,
        });
    }

    let humidity = u16::from_be_bytes([h_hi, h_lo]);
    let magnitude = i16::from_be_bytes([t_hi & 0x7F, t_lo]);
    let temperature = if t_hi & 0x80 == 0 { magnitude } else { -magnitude };

    if humidity > MAX_HUMIDITY_TENTHS
        || !(MIN_TEMPERATURE_TENTHS..=MAX_TEMPERATURE_TENTHS).contains(&temperature)
    {
        return Err(DhtError::OutOfRange);
    }

    Ok(DhtReading {
        humidity: DeciPercent::from_tenths(humidity),
        temperature: DeciCelsius::from_tenths(temperature),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulses_for(frame: [u8; FRAME_BYTES]) -> [u16; FRAME_BITS] {
        let mut pulses = [0u16; FRAME_BITS];
        for (index, pulse) in pulses.iter_mut().enumerate() {
            let bit = frame[index / 8] & (0x80 >> (index % 8));
            *pulse = if bit == 0 { 27 } else { 70 };
        }
        pulses
    }

    #[test]
    fn decodes_datasheet_example() {
        // 65.2 %RH, 35.1 °C
        let frame = [0x02, 0x8C, 0x01, 0x5F, 0xEE];
        assert_eq!(pack_pulses(&pulses_for(frame)), frame);

        let reading = decode(frame).expect("valid frame");
        assert_eq!(reading.humidity, DeciPercent::from_tenths(652));
        assert_eq!(reading.temperature, DeciCelsius::from_tenths(351));
    }

    #[test]
    fn sign_bit_yields_negative_temperature() {
        // -10.1 °C
        let frame = [0x02, 0x8C, 0x80, 0x65, 0x73];
        let reading = decode(frame).expect("valid frame");
        assert_eq!(reading.temperature, DeciCelsius::from_tenths(-101));
    }

    #[test]
    fn corrupted_frames_are_rejected() {
        let frame = [0x02, 0x8C, 0x01, 0x5F, 0xEF];
        assert_eq!(
            decode(frame),
            Err(DhtError::Checksum {
                expected: 0xEE,
                actual: 0xEF
            })
        );
    }

    #[test]
    fn implausible_values_are_rejected() {
        // 120.0 %RH
        let frame = [0x04, 0xB0, 0x00, 0xC8, 0x7C];
        assert_eq!(decode(frame), Err(DhtError::OutOfRange));
    }
}
