//! DHT22 acquisition on a single open-drain line.
//!
//! One frame carries both values, so a humidity read fetches a fresh frame
//! (at most once per [`MIN_SAMPLE_PERIOD_MILLIS`]) and the temperature read
//! that follows reuses it. Bit timing is measured by busy-waiting on the
//! embassy clock; the whole exchange takes about 5 ms.

use embassy_stm32::Peri;
use embassy_stm32::gpio::{Flex, Pin, Speed};
use embassy_time::{Duration, Instant, block_for};

use mission_core::dht::{self, DhtError, DhtReading, FRAME_BITS, MIN_SAMPLE_PERIOD_MILLIS};
use mission_core::environment::{ClimateSensor, DeciCelsius, DeciPercent, SensorError};

use crate::status;

/// Host start signal; the sensor wants at least 1 ms.
const START_LOW: Duration = Duration::from_millis(2);
/// Longest the sensor may hold any level during its response.
const RESPONSE_MICROS: u64 = 100;

pub struct Dht22 {
    pin: Flex<'static>,
    frame: Option<(Instant, Result<DhtReading, DhtError>)>,
}

impl Dht22 {
    pub fn new(pin: Peri<'static, impl Pin>) -> Self {
        let mut pin = Flex::new(pin);
        pin.set_high();
        pin.set_as_input_output(Speed::Low);
        Self { pin, frame: None }
    }

    fn frame(&mut self) -> Result<DhtReading, DhtError> {
        if let Some((taken, result)) = self.frame {
            if taken.elapsed() < Duration::from_millis(MIN_SAMPLE_PERIOD_MILLIS) {
                return result;
            }
        }

        let result = self.acquire();
        match result {
            Ok(reading) => status::record_climate(reading.temperature, reading.humidity),
            Err(error) => {
                status::record_sensor_fault();
                defmt::warn!("dht22: {}", defmt::Display2Format(&error));
            }
        }
        self.frame = Some((Instant::now(), result));
        result
    }

    fn acquire(&mut self) -> Result<DhtReading, DhtError> {
        self.pin.set_low();
        block_for(START_LOW);
        self.pin.set_high();

        // Response: low 80 us, high 80 us, then the first bit's low half.
        self.await_level(false)?;
        self.await_level(true)?;
        self.await_level(false)?;

        let mut pulses = [0u16; FRAME_BITS];
        for pulse in &mut pulses {
            self.await_level(true).map_err(|_| DhtError::Truncated)?;
            let rose = Instant::now();
            self.await_level(false).map_err(|_| DhtError::Truncated)?;
            *pulse = u16::try_from(rose.elapsed().as_micros()).unwrap_or(u16::MAX);
        }

        dht::decode(dht::pack_pulses(&pulses))
    }

    fn await_level(&self, high: bool) -> Result<(), DhtError> {
        let started = Instant::now();
        while self.pin.is_high() != high {
            if started.elapsed().as_micros() > RESPONSE_MICROS {
                return Err(DhtError::NoResponse);
            }
        }
        Ok(())
    }
}

impl ClimateSensor for Dht22 {
    fn read_humidity(&mut self) -> Result<DeciPercent, SensorError> {
        Ok(self.frame()?.humidity)
    }

    fn read_temperature(&mut self) -> Result<DeciCelsius, SensorError> {
        Ok(self.frame()?.temperature)
    }
}
