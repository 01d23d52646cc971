//! Housing climate monitoring and the thermal safety interlock.
//!
//! Every sample reads humidity and temperature once. A temperature at or above
//! the configured limit fires the ballast release before the sample is handed
//! back, so an overheating rig surfaces even if the rest of the mission keeps
//! running. A failed read is logged and reported; it is never retried within
//! the same sample.

use core::fmt;

use crate::clock::{MissionClock, MissionInstant};
use crate::context::MissionContext;
use crate::dht::DhtError;
use crate::io::{StatusIndicators, SwitchOutput};
use crate::log::LogSink;
use crate::release::{ReleaseActuator, ReleaseOutcome};

/// Temperature in tenths of a degree Celsius.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DeciCelsius(i16);

impl DeciCelsius {
    #[must_use]
    pub const fn from_tenths(tenths: i16) -> Self {
        Self(tenths)
    }

    #[must_use]
    pub const fn tenths(self) -> i16 {
        self.0
    }
}

impl fmt::Display for DeciCelsius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        write!(f, "{sign}{}.{}", magnitude / 10, magnitude % 10)
    }
}

/// Relative humidity in tenths of a percent.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DeciPercent(u16);

impl DeciPercent {
    #[must_use]
    pub const fn from_tenths(tenths: u16) -> Self {
        Self(tenths)
    }

    #[must_use]
    pub const fn tenths(self) -> u16 {
        self.0
    }
}

impl fmt::Display for DeciPercent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 10, self.0 % 10)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SensorError {
    /// The sensor produced no value.
    NoReading,
    /// The raw frame was unusable.
    Frame(DhtError),
}

impl From<DhtError> for SensorError {
    fn from(error: DhtError) -> Self {
        Self::Frame(error)
    }
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorError::NoReading => f.write_str("no reading"),
            SensorError::Frame(error) => error.fmt(f),
        }
    }
}

/// Combined humidity/temperature sensor.
pub trait ClimateSensor {
    fn read_humidity(&mut self) -> Result<DeciPercent, SensorError>;

    fn read_temperature(&mut self) -> Result<DeciCelsius, SensorError>;
}

/// How a sample was judged.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SampleVerdict {
    Nominal,
    /// At least one reading failed.
    Invalid,
    /// Temperature reached the limit and the release was requested.
    ThermalFault(ReleaseOutcome),
}

/// One environmental sample.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SensorSample {
    pub taken_at: MissionInstant,
    pub temperature: Option<DeciCelsius>,
    pub humidity: Option<DeciPercent>,
    pub verdict: SampleVerdict,
}

impl SensorSample {
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.temperature.is_some() && self.humidity.is_some()
    }

    #[must_use]
    pub const fn is_thermal_fault(&self) -> bool {
        matches!(self.verdict, SampleVerdict::ThermalFault(_))
    }
}

impl fmt::Display for SensorSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.temperature {
            Some(temperature) => write!(f, "T={temperature}C")?,
            None => f.write_str("T=--")?,
        }
        match self.humidity {
            Some(humidity) => write!(f, " H={humidity}%"),
            None => f.write_str(" H=--"),
        }
    }
}

pub struct EnvironmentalMonitor<S> {
    sensor: S,
    samples: u32,
    invalid: u32,
    faults: u32,
}

impl<S: ClimateSensor> EnvironmentalMonitor<S> {
    pub const fn new(sensor: S) -> Self {
        Self {
            sensor,
            samples: 0,
            invalid: 0,
            faults: 0,
        }
    }

    /// Takes one sample, firing `release` first when the temperature is at or
    /// above the configured limit.
    pub async fn sample<C, L, N, O>(
        &mut self,
        ctx: &mut MissionContext<C, L, N>,
        release: &mut ReleaseActuator<O>,
    ) -> SensorSample
    where
        C: MissionClock,
        L: LogSink,
        N: StatusIndicators,
        O: SwitchOutput,
    {
        let taken_at = ctx.clock.now();
        let humidity = self.sensor.read_humidity();
        let temperature = self.sensor.read_temperature();
        self.samples = self.samples.saturating_add(1);

        let mut verdict = SampleVerdict::Nominal;
        if let Ok(reading) = temperature {
            let limit = ctx.config.temperature_limit;
            if reading >= limit {
                self.faults = self.faults.saturating_add(1);
                ctx.record_fmt(format_args!("Temperature {reading}C over limit {limit}C"));
                verdict = SampleVerdict::ThermalFault(release.release(ctx).await);
            }
        }

        if let Err(error) = humidity.and(temperature) {
            self.invalid = self.invalid.saturating_add(1);
            ctx.record_fmt(format_args!("Failed to read from sensor: {error}"));
            if verdict == SampleVerdict::Nominal {
                verdict = SampleVerdict::Invalid;
            }
        }

        SensorSample {
            taken_at,
            temperature: temperature.ok(),
            humidity: humidity.ok(),
            verdict,
        }
    }

    #[must_use]
    pub const fn samples(&self) -> u32 {
        self.samples
    }

    #[must_use]
    pub const fn invalid_samples(&self) -> u32 {
        self.invalid
    }

    #[must_use]
    pub const fn thermal_faults(&self) -> u32 {
        self.faults
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }
}
