//! Board support for the camera rig controller (STM32G0B1KE).
//!
//! | Function            | Pin / peripheral            |
//! |---------------------|-----------------------------|
//! | launch trigger      | PA0, active low, pull-up    |
//! | DHT22 data          | PA1, open drain             |
//! | ESP-AT co-processor | USART2 (PA2 TX, PA3 RX)     |
//! | log card            | SPI1 (PA5, PA6, PA7), CS PA4 |
//! | burnwire driver     | PA8                         |
//! | lamp PWM            | TIM3 CH1 on PB4             |
//! | indicator LEDs      | PB0 power, PB1 armed, PB2 link |

pub mod dht;
pub mod storage;
pub mod wifi;

use embassy_stm32 as hal;
use embassy_stm32::gpio::{Input, Level, Output, OutputType, Pull, Speed};
use embassy_stm32::peripherals::TIM3;
use embassy_stm32::time::khz;
use embassy_stm32::timer::low_level::CountingMode;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm, SimplePwmChannel, SimplePwmChannels};
use embassy_time::{Duration as EmbassyDuration, Instant, Timer};

use mission_core::clock::{MissionClock, MissionInstant};
use mission_core::illumination::MAX_LEVEL;
use mission_core::io::{DutyOutput, Indicator, StatusIndicators, SwitchOutput, TriggerInput};
use mission_core::mission::{Board, BoardParts};

use crate::status;

pub struct RigBoard;

impl Board for RigBoard {
    type Clock = EmbassyClock;
    type Sink = storage::CardLog;
    type Indicators = PanelLeds;
    type Trigger = TriggerPin;
    type Sensor = dht::Dht22;
    type Lamp = LampPwm;
    type Burnwire = Burnwire;
    type Link = wifi::Radio;
}

/// Claims the rig's pins and peripherals.
pub fn assemble(p: hal::Peripherals) -> BoardParts<RigBoard> {
    let clock = EmbassyClock::started_now();

    let pwm = SimplePwm::new(
        p.TIM3,
        Some(PwmPin::new(p.PB4, OutputType::PushPull)),
        None,
        None,
        None,
        khz(1),
        CountingMode::EdgeAlignedUp,
    );
    let SimplePwmChannels { ch1, .. } = pwm.split();

    BoardParts {
        clock,
        sink: storage::CardLog::new(p.SPI1, p.PA5, p.PA7, p.PA6, p.PA4),
        indicators: PanelLeds {
            power: Output::new(p.PB0, Level::Low, Speed::Low),
            armed: Output::new(p.PB1, Level::Low, Speed::Low),
            link: Output::new(p.PB2, Level::Low, Speed::Low),
        },
        trigger: TriggerPin {
            pin: Input::new(p.PA0, Pull::Up),
        },
        sensor: dht::Dht22::new(p.PA1),
        lamp: LampPwm::new(ch1),
        burnwire: Burnwire {
            pin: Output::new(p.PA8, Level::Low, Speed::Low),
        },
        link: wifi::radio(p.USART2, p.PA2, p.PA3, clock),
    }
}

/// Mission time measured from the moment the board was assembled.
#[derive(Copy, Clone)]
pub struct EmbassyClock {
    boot: Instant,
}

impl EmbassyClock {
    pub fn started_now() -> Self {
        Self {
            boot: Instant::now(),
        }
    }
}

impl MissionClock for EmbassyClock {
    fn now(&self) -> MissionInstant {
        MissionInstant::from_micros(Instant::now().saturating_duration_since(self.boot).as_micros())
    }

    async fn sleep_until(&mut self, deadline: MissionInstant) {
        let at = self
            .boot
            .checked_add(EmbassyDuration::from_micros(deadline.as_micros()))
            .unwrap_or(Instant::MAX);
        Timer::at(at).await;
    }
}

pub struct TriggerPin {
    pin: Input<'static>,
}

impl TriggerInput for TriggerPin {
    fn is_asserted(&mut self) -> bool {
        self.pin.is_low()
    }
}

pub struct LampPwm {
    channel: SimplePwmChannel<'static, TIM3>,
}

impl LampPwm {
    fn new(mut channel: SimplePwmChannel<'static, TIM3>) -> Self {
        channel.set_duty_cycle_fully_off();
        channel.enable();
        Self { channel }
    }
}

impl DutyOutput for LampPwm {
    fn set_duty(&mut self, level: u8) {
        self.channel
            .set_duty_cycle_fraction(u16::from(level), u16::from(MAX_LEVEL));
    }
}

pub struct Burnwire {
    pin: Output<'static>,
}

impl SwitchOutput for Burnwire {
    fn set_active(&mut self, active: bool) {
        if active {
            defmt::warn!("burnwire: energised");
            self.pin.set_high();
        } else {
            self.pin.set_low();
            defmt::info!("burnwire: off");
        }
    }
}

pub struct PanelLeds {
    power: Output<'static>,
    armed: Output<'static>,
    link: Output<'static>,
}

impl StatusIndicators for PanelLeds {
    fn set(&mut self, indicator: Indicator, lit: bool) {
        let led = match indicator {
            Indicator::Power => &mut self.power,
            Indicator::TriggerArmed => &mut self.armed,
            Indicator::LinkConnected => &mut self.link,
        };
        led.set_level(Level::from(lit));
        status::record_indicator(indicator, lit);
    }
}
