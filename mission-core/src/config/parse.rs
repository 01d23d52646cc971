//! Text forms of configuration values, for command lines and bench tooling.
//!
//! Accepted forms:
//! - durations: `<n>ms`, `<n>s`, `<n>m`, `<n>h`
//! - IPv4 addresses: dotted quad
//! - endpoints: `<ipv4>:<port>`
//! - hardware identifiers: six hex pairs separated by `:` or `-`
//! - temperatures: degrees Celsius with at most one decimal, e.g. `-3.5`

use core::fmt;
use core::time::Duration;

use winnow::ascii::{dec_uint, hex_uint};
use winnow::combinator::{alt, opt, preceded, separated_pair};
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

use crate::environment::DeciCelsius;
use crate::link::{Endpoint, HardwareId, Ipv4};

/// Value kind that failed to parse.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ValueError {
    Duration,
    Address,
    Endpoint,
    HardwareId,
    Temperature,
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let expected = match self {
            ValueError::Duration => "duration such as 500ms, 90s, 2m or 1h",
            ValueError::Address => "IPv4 address such as 10.5.5.9",
            ValueError::Endpoint => "endpoint such as 10.5.5.9:80",
            ValueError::HardwareId => "hardware id such as 04:41:69:5A:3C:21",
            ValueError::Temperature => "temperature in Celsius such as 80 or 72.5",
        };
        write!(f, "expected {expected}")
    }
}

/// Parses a duration literal.
///
/// # Errors
///
/// Returns [`ValueError::Duration`] on malformed or overflowing input.
pub fn duration(text: &str) -> Result<Duration, ValueError> {
    duration_literal
        .parse(text.trim())
        .map_err(|_| ValueError::Duration)
}

/// Parses a dotted-quad IPv4 address.
///
/// # Errors
///
/// Returns [`ValueError::Address`] on malformed input.
pub fn ipv4(text: &str) -> Result<Ipv4, ValueError> {
    address.parse(text.trim()).map_err(|_| ValueError::Address)
}

/// Parses `<ipv4>:<port>`.
///
/// # Errors
///
/// Returns [`ValueError::Endpoint`] on malformed input.
pub fn endpoint(text: &str) -> Result<Endpoint, ValueError> {
    separated_pair(address, ':', dec_uint)
        .map(|(address, port)| Endpoint::new(address, port))
        .parse(text.trim())
        .map_err(|_| ValueError::Endpoint)
}

/// Parses a six-byte hardware identifier.
///
/// # Errors
///
/// Returns [`ValueError::HardwareId`] on malformed input.
pub fn hardware_id(text: &str) -> Result<HardwareId, ValueError> {
    hardware_literal
        .parse(text.trim())
        .map_err(|_| ValueError::HardwareId)
}

/// Parses a temperature in degrees Celsius.
///
/// # Errors
///
/// Returns [`ValueError::Temperature`] on malformed or out-of-range input.
pub fn temperature(text: &str) -> Result<DeciCelsius, ValueError> {
    celsius.parse(text.trim()).map_err(|_| ValueError::Temperature)
}

#[derive(Copy, Clone)]
enum Unit {
    Millis,
    Seconds,
    Minutes,
    Hours,
}

fn duration_literal(input: &mut &str) -> ModalResult<Duration> {
    (
        dec_uint::<_, u64, _>,
        alt((
            "ms".value(Unit::Millis),
            "s".value(Unit::Seconds),
            "m".value(Unit::Minutes),
            "h".value(Unit::Hours),
        )),
    )
        .verify_map(|(value, unit)| match unit {
            Unit::Millis => Some(Duration::from_millis(value)),
            Unit::Seconds => Some(Duration::from_secs(value)),
            Unit::Minutes => value.checked_mul(60).map(Duration::from_secs),
            Unit::Hours => value.checked_mul(3_600).map(Duration::from_secs),
        })
        .parse_next(input)
}

fn address(input: &mut &str) -> ModalResult<Ipv4> {
    (
        dec_uint::<_, u8, _>,
        preceded('.', dec_uint),
        preceded('.', dec_uint),
        preceded('.', dec_uint),
    )
        .map(|(a, b, c, d)| Ipv4::new(a, b, c, d))
        .parse_next(input)
}

fn hex_pair(input: &mut &str) -> ModalResult<u8> {
    take_while(2, |ch: char| ch.is_ascii_hexdigit())
        .and_then(hex_uint::<_, u8, _>)
        .parse_next(input)
}

fn hardware_literal(input: &mut &str) -> ModalResult<HardwareId> {
    let mut bytes = [0u8; 6];
    bytes[0] = hex_pair.parse_next(input)?;
    for byte in &mut bytes[1..] {
        *byte = preceded(one_of([':', '-']), hex_pair).parse_next(input)?;
    }
    Ok(HardwareId::new(bytes))
}

fn celsius(input: &mut &str) -> ModalResult<DeciCelsius> {
    (
        opt('-'),
        dec_uint::<_, u16, _>,
        opt(preceded('.', one_of('0'..='9'))),
    )
        .verify_map(|(sign, whole, tenth): (Option<char>, u16, Option<char>)| {
            let tenth = tenth.and_then(|digit| digit.to_digit(10)).unwrap_or(0);
            let magnitude = u32::from(whole) * 10 + tenth;
            let magnitude = i16::try_from(magnitude).ok()?;
            Some(DeciCelsius::from_tenths(if sign.is_some() {
                -magnitude
            } else {
                magnitude
            }))
        })
        .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_accept_each_unit() {
        assert_eq!(duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(duration("90s"), Ok(Duration::from_secs(90)));
        assert_eq!(duration("2m"), Ok(Duration::from_secs(120)));
        assert_eq!(duration(" 1h "), Ok(Duration::from_secs(3_600)));
    }

    #[test]
    fn durations_reject_missing_units_and_overflow() {
        assert_eq!(duration("90"), Err(ValueError::Duration));
        assert_eq!(duration("5 s"), Err(ValueError::Duration));
        assert_eq!(duration("18446744073709551615h"), Err(ValueError::Duration));
    }

    #[test]
    fn addresses_and_endpoints() {
        assert_eq!(ipv4("10.5.5.9"), Ok(Ipv4::new(10, 5, 5, 9)));
        assert_eq!(ipv4("10.5.5.256"), Err(ValueError::Address));
        assert_eq!(ipv4("10.5.5"), Err(ValueError::Address));
        assert_eq!(
            endpoint("10.5.5.255:9"),
            Ok(Endpoint::new(Ipv4::new(10, 5, 5, 255), 9))
        );
        assert_eq!(endpoint("10.5.5.9:70000"), Err(ValueError::Endpoint));
    }

    #[test]
    fn hardware_ids_accept_both_separators() {
        let expected = HardwareId::new([0x04, 0x41, 0x69, 0x5A, 0x3C, 0x21]);
        assert_eq!(hardware_id("04:41:69:5a:3c:21"), Ok(expected));
        assert_eq!(hardware_id("04-41-69-5A-3C-21"), Ok(expected));
        assert_eq!(hardware_id("04:41:69:5A:3C"), Err(ValueError::HardwareId));
        assert_eq!(hardware_id("4:41:69:5A:3C:21"), Err(ValueError::HardwareId));
    }

    #[test]
    fn temperatures_keep_one_decimal() {
        assert_eq!(temperature("80"), Ok(DeciCelsius::from_tenths(800)));
        assert_eq!(temperature("72.5"), Ok(DeciCelsius::from_tenths(725)));
        assert_eq!(temperature("-3.5"), Ok(DeciCelsius::from_tenths(-35)));
        assert_eq!(temperature("72.55"), Err(ValueError::Temperature));
        assert_eq!(temperature("hot"), Err(ValueError::Temperature));
    }
}
