//! Mission log on a FAT-formatted SD card.
//!
//! Every line is written and flushed before `append_line` returns, so the
//! file survives power being cut at any point. Lines are also mirrored to
//! RTT.

use embassy_stm32::Peri;
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_stm32::mode::Blocking;
use embassy_stm32::peripherals::{PA4, PA5, PA6, PA7, SPI1};
use embassy_stm32::spi::{self, Spi};
use embassy_stm32::time::Hertz;
use embassy_time::Delay;
use embedded_hal_bus::spi::{ExclusiveDevice, NoDelay};
use embedded_sdmmc::{
    Mode, RawDirectory, RawFile, SdCard, TimeSource, Timestamp, VolumeIdx, VolumeManager,
};

use mission_core::log::{LOG_FILE_NAME, LogSink, SinkError};

use crate::status;

/// SD cards must be initialised at 400 kHz or below.
const CARD_BAUD_RATE: u32 = 400_000;

type CardDevice = ExclusiveDevice<Spi<'static, Blocking>, Output<'static>, NoDelay>;
type Card = SdCard<CardDevice, Delay>;

/// The rig has no calendar; every file carries the same timestamp.
#[derive(Default)]
pub struct FixedTime;

impl TimeSource for FixedTime {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 56,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

pub struct CardLog {
    volumes: VolumeManager<Card, FixedTime>,
    root: Option<RawDirectory>,
    file: Option<RawFile>,
}

impl CardLog {
    pub fn new(
        spi: Peri<'static, SPI1>,
        sck: Peri<'static, PA5>,
        mosi: Peri<'static, PA7>,
        miso: Peri<'static, PA6>,
        cs: Peri<'static, PA4>,
    ) -> Self {
        let mut config = spi::Config::default();
        config.frequency = Hertz(CARD_BAUD_RATE);
        let bus = Spi::new_blocking(spi, sck, mosi, miso, config);
        let cs = Output::new(cs, Level::High, Speed::VeryHigh);
        let device = ExclusiveDevice::new_no_delay(bus, cs);

        Self {
            volumes: VolumeManager::new(SdCard::new(device, Delay), FixedTime),
            root: None,
            file: None,
        }
    }
}

impl LogSink for CardLog {
    fn is_present(&mut self) -> bool {
        if self.root.is_some() {
            return true;
        }
        let opened = self
            .volumes
            .open_raw_volume(VolumeIdx(0))
            .and_then(|volume| self.volumes.open_root_dir(volume));
        match opened {
            Ok(root) => {
                self.root = Some(root);
                true
            }
            Err(error) => {
                defmt::error!("log card: {}", defmt::Debug2Format(&error));
                false
            }
        }
    }

    fn truncate(&mut self) -> Result<(), SinkError> {
        let root = self.root.ok_or(SinkError::Absent)?;
        if let Some(file) = self.file.take() {
            let _ = self.volumes.close_file(file);
        }
        let file = self
            .volumes
            .open_file_in_dir(root, LOG_FILE_NAME, Mode::ReadWriteCreateOrTruncate)
            .map_err(|error| {
                defmt::error!("log card: truncate: {}", defmt::Debug2Format(&error));
                SinkError::Truncate
            })?;
        self.file = Some(file);
        Ok(())
    }

    fn append_line(&mut self, line: &str) -> Result<(), SinkError> {
        defmt::info!("log: {=str}", line.trim_end());
        let file = self.file.ok_or(SinkError::Absent)?;
        let written = self
            .volumes
            .write(file, line.as_bytes())
            .and_then(|()| self.volumes.flush_file(file));
        status::record_log_line(written.is_ok());
        written.map_err(|error| {
            defmt::warn!("log card: write: {}", defmt::Debug2Format(&error));
            SinkError::Write
        })
    }
}
