#![allow(dead_code)]

use core::time::Duration;

use mission_core::clock::FakeClock;
use mission_core::config::MissionConfig;
use mission_core::environment::{DeciCelsius, DeciPercent};
use mission_core::mission::{Board, BoardParts, MissionSequencer};
use mission_core::sim::{
    LampBank, LinkBehaviour, MemorySink, RecordingLamp, RecordingSwitch, ScriptedReading,
    ScriptedSensor, ScriptedTrigger, SimulatedLink,
};

pub struct SimBoard;

impl Board for SimBoard {
    type Clock = FakeClock;
    type Sink = MemorySink;
    type Indicators = LampBank;
    type Trigger = ScriptedTrigger;
    type Sensor = ScriptedSensor;
    type Lamp = RecordingLamp;
    type Burnwire = RecordingSwitch;
    type Link = SimulatedLink;
}

pub const COOL: ScriptedReading =
    ScriptedReading::valid(DeciCelsius::from_tenths(215), DeciPercent::from_tenths(402));
pub const HOT: ScriptedReading =
    ScriptedReading::valid(DeciCelsius::from_tenths(850), DeciPercent::from_tenths(402));
pub const COOL_LINE: &str = "T=21.5C H=40.2%";

/// Reference profile shortened to a one-minute descent and a two-minute
/// recording, sampling every minute.
pub fn short_mission() -> MissionConfig {
    MissionConfig::reference()
        .with_descent(Duration::from_secs(60))
        .with_recording(Duration::from_secs(120))
        .with_sample_interval(Duration::from_secs(60))
}

pub struct Rig {
    pub sink: MemorySink,
    pub sensor: ScriptedSensor,
    pub link: SimulatedLink,
    pub trigger: ScriptedTrigger,
}

impl Rig {
    pub fn nominal() -> Self {
        Self {
            sink: MemorySink::new(),
            sensor: ScriptedSensor::steady(COOL),
            link: SimulatedLink::new(LinkBehaviour::NOMINAL),
            trigger: ScriptedTrigger::after_polls(5),
        }
    }

    pub fn with_link(mut self, behaviour: LinkBehaviour) -> Self {
        self.link = SimulatedLink::new(behaviour);
        self
    }

    pub fn with_sink(mut self, sink: MemorySink) -> Self {
        self.sink = sink;
        self
    }

    /// Queues readings ahead of the steady baseline.
    pub fn with_readings(mut self, readings: &[ScriptedReading]) -> Self {
        for &reading in readings {
            assert!(self.sensor.push(reading), "sensor script full");
        }
        self
    }

    pub fn parts(self) -> BoardParts<SimBoard> {
        BoardParts {
            clock: FakeClock::new(),
            sink: self.sink,
            indicators: LampBank::new(),
            trigger: self.trigger,
            sensor: self.sensor,
            lamp: RecordingLamp::new(),
            burnwire: RecordingSwitch::new(),
            link: self.link,
        }
    }
}

pub fn boot(config: MissionConfig, rig: Rig) -> MissionSequencer<SimBoard> {
    embassy_futures::block_on(MissionSequencer::boot(config, rig.parts())).expect("boot succeeds")
}

/// Log messages after the boot lines, in order.
pub fn mission_messages(sequencer: &MissionSequencer<SimBoard>) -> Vec<String> {
    sequencer
        .context()
        .log
        .sink()
        .messages()
        .skip_while(|message| *message != "Trigger activated")
        .map(str::to_owned)
        .collect()
}
