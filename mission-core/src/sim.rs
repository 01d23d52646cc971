//! Simulated collaborators for host runs and tests.
//!
//! These stand in for the board: a trigger that fires after a number of polls,
//! a climate sensor that replays a script, outputs that record what they were
//! driven to, an in-memory log sink, and a camera link that accepts or refuses
//! traffic on demand. Everything is bounded and `no_std`.

use heapless::{Deque, String, Vec};

use crate::environment::{ClimateSensor, DeciCelsius, DeciPercent, SensorError};
use crate::io::{DutyOutput, Indicator, StatusIndicators, SwitchOutput, TriggerInput};
use crate::link::wake::WAKE_PACKET_LEN;
use crate::link::{Endpoint, LinkError, RemoteLink};
use crate::log::{LogSink, SinkError};

/// Trigger that asserts after a fixed number of negative polls.
#[derive(Clone, Debug)]
pub struct ScriptedTrigger {
    remaining: u32,
}

impl ScriptedTrigger {
    #[must_use]
    pub const fn after_polls(polls: u32) -> Self {
        Self { remaining: polls }
    }

    #[must_use]
    pub const fn immediate() -> Self {
        Self::after_polls(0)
    }
}

impl TriggerInput for ScriptedTrigger {
    fn is_asserted(&mut self) -> bool {
        if self.remaining == 0 {
            true
        } else {
            self.remaining -= 1;
            false
        }
    }
}

/// One scripted sensor answer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ScriptedReading {
    pub temperature: Option<DeciCelsius>,
    pub humidity: Option<DeciPercent>,
}

impl ScriptedReading {
    #[must_use]
    pub const fn valid(temperature: DeciCelsius, humidity: DeciPercent) -> Self {
        Self {
            temperature: Some(temperature),
            humidity: Some(humidity),
        }
    }

    #[must_use]
    pub const fn failed() -> Self {
        Self {
            temperature: None,
            humidity: None,
        }
    }
}

pub const SENSOR_SCRIPT_LEN: usize = 64;

/// Sensor replaying scripted readings, then a steady baseline.
///
/// Humidity is read first for every sample; the matching temperature comes
/// from the same scripted entry.
#[derive(Clone, Debug)]
pub struct ScriptedSensor {
    script: Deque<ScriptedReading, SENSOR_SCRIPT_LEN>,
    baseline: ScriptedReading,
    current: ScriptedReading,
    reads: u32,
}

impl ScriptedSensor {
    #[must_use]
    pub fn steady(baseline: ScriptedReading) -> Self {
        Self {
            script: Deque::new(),
            baseline,
            current: baseline,
            reads: 0,
        }
    }

    /// Queues `reading` for a future sample. Returns `false` when the script
    /// is full.
    pub fn push(&mut self, reading: ScriptedReading) -> bool {
        self.script.push_back(reading).is_ok()
    }

    /// Number of samples taken so far.
    #[must_use]
    pub const fn reads(&self) -> u32 {
        self.reads
    }
}

impl ClimateSensor for ScriptedSensor {
    fn read_humidity(&mut self) -> Result<DeciPercent, SensorError> {
        self.current = self.script.pop_front().unwrap_or(self.baseline);
        self.reads += 1;
        self.current.humidity.ok_or(SensorError::NoReading)
    }

    fn read_temperature(&mut self) -> Result<DeciCelsius, SensorError> {
        self.current.temperature.ok_or(SensorError::NoReading)
    }
}

pub const LAMP_HISTORY: usize = 1_024;

/// PWM output recording every duty it was set to.
#[derive(Clone, Debug, Default)]
pub struct RecordingLamp {
    levels: Vec<u8, LAMP_HISTORY>,
    overflowed: bool,
}

impl RecordingLamp {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            levels: Vec::new(),
            overflowed: false,
        }
    }

    #[must_use]
    pub fn levels(&self) -> &[u8] {
        &self.levels
    }

    #[must_use]
    pub fn level(&self) -> u8 {
        self.levels.last().copied().unwrap_or(0)
    }

    /// `true` once more writes arrived than the history holds.
    #[must_use]
    pub const fn overflowed(&self) -> bool {
        self.overflowed
    }
}

impl DutyOutput for RecordingLamp {
    fn set_duty(&mut self, level: u8) {
        if self.levels.push(level).is_err() {
            self.overflowed = true;
        }
    }
}

/// Switch output recording state changes.
#[derive(Clone, Debug, Default)]
pub struct RecordingSwitch {
    transitions: Vec<bool, 16>,
    activations: u32,
}

impl RecordingSwitch {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            transitions: Vec::new(),
            activations: 0,
        }
    }

    #[must_use]
    pub fn transitions(&self) -> &[bool] {
        &self.transitions
    }

    #[must_use]
    pub const fn activations(&self) -> u32 {
        self.activations
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.transitions.last().copied().unwrap_or(false)
    }
}

impl SwitchOutput for RecordingSwitch {
    fn set_active(&mut self, active: bool) {
        if active {
            self.activations += 1;
        }
        let _ = self.transitions.push(active);
    }
}

/// Indicator bank remembering which lamps are lit.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct LampBank {
    lit: [bool; 3],
}

impl LampBank {
    #[must_use]
    pub const fn new() -> Self {
        Self { lit: [false; 3] }
    }

    #[must_use]
    pub const fn is_lit(&self, indicator: Indicator) -> bool {
        self.lit[indicator as usize]
    }
}

impl StatusIndicators for LampBank {
    fn set(&mut self, indicator: Indicator, lit: bool) {
        self.lit[indicator as usize] = lit;
    }
}

pub const SINK_CAPACITY: usize = 4_096;

/// Log sink holding the rendered log text in memory.
#[derive(Clone, Debug)]
pub struct MemorySink {
    present: bool,
    fail_writes: bool,
    text: String<SINK_CAPACITY>,
}

impl MemorySink {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            present: true,
            fail_writes: false,
            text: String::new(),
        }
    }

    /// Sink whose medium is missing.
    #[must_use]
    pub const fn absent() -> Self {
        Self {
            present: false,
            fail_writes: false,
            text: String::new(),
        }
    }

    /// Sink whose medium rejects every write.
    #[must_use]
    pub const fn failing() -> Self {
        Self {
            present: true,
            fail_writes: true,
            text: String::new(),
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Message part of every persisted line, oldest first.
    pub fn messages(&self) -> impl Iterator<Item = &str> + '_ {
        self.text
            .lines()
            .filter_map(|line| line.split_once('\t').map(|(_, message)| message))
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for MemorySink {
    fn is_present(&mut self) -> bool {
        self.present
    }

    fn truncate(&mut self) -> Result<(), SinkError> {
        if !self.present {
            return Err(SinkError::Absent);
        }
        self.text.clear();
        Ok(())
    }

    fn append_line(&mut self, line: &str) -> Result<(), SinkError> {
        if !self.present {
            return Err(SinkError::Absent);
        }
        if self.fail_writes {
            return Err(SinkError::Write);
        }
        self.text.push_str(line).map_err(|_| SinkError::Write)
    }
}

pub const MAX_CAPTURED: usize = 8;
pub const MAX_CAPTURED_REQUEST: usize = 256;

/// How the simulated camera network behaves.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LinkBehaviour {
    pub present: bool,
    pub joinable: bool,
    /// The camera accepts wake datagrams.
    pub wake_accepted: bool,
    /// The camera accepts command connections.
    pub reachable: bool,
}

impl LinkBehaviour {
    pub const NOMINAL: Self = Self {
        present: true,
        joinable: true,
        wake_accepted: true,
        reachable: true,
    };
}

/// In-memory camera network that captures everything sent to it.
#[derive(Clone, Debug)]
pub struct SimulatedLink {
    behaviour: LinkBehaviour,
    joined: bool,
    datagram: Option<Endpoint>,
    stream: Option<Endpoint>,
    wake_packets: Vec<[u8; WAKE_PACKET_LEN], MAX_CAPTURED>,
    requests: Vec<Vec<u8, MAX_CAPTURED_REQUEST>, MAX_CAPTURED>,
    pending_inbound: usize,
    connect_attempts: u32,
}

impl SimulatedLink {
    #[must_use]
    pub const fn new(behaviour: LinkBehaviour) -> Self {
        Self {
            behaviour,
            joined: false,
            datagram: None,
            stream: None,
            wake_packets: Vec::new(),
            requests: Vec::new(),
            pending_inbound: 0,
            connect_attempts: 0,
        }
    }

    /// Queues inbound bytes that a drain will discard.
    pub fn queue_inbound(&mut self, bytes: usize) {
        self.pending_inbound += bytes;
    }

    #[must_use]
    pub fn wake_packets(&self) -> &[[u8; WAKE_PACKET_LEN]] {
        &self.wake_packets
    }

    /// Requests written to command connections, one per connection.
    pub fn requests(&self) -> impl Iterator<Item = &str> + '_ {
        self.requests
            .iter()
            .map(|request| core::str::from_utf8(request).unwrap_or(""))
    }

    #[must_use]
    pub const fn connect_attempts(&self) -> u32 {
        self.connect_attempts
    }

    /// `true` while any channel is open.
    #[must_use]
    pub const fn has_open_channel(&self) -> bool {
        self.datagram.is_some() || self.stream.is_some()
    }
}

impl RemoteLink for SimulatedLink {
    async fn probe(&mut self) -> bool {
        self.behaviour.present
    }

    async fn join(&mut self) -> Result<(), LinkError> {
        if !self.behaviour.present {
            return Err(LinkError::HardwareAbsent);
        }
        if !self.behaviour.joinable {
            return Err(LinkError::JoinRejected);
        }
        self.joined = true;
        Ok(())
    }

    async fn open_datagram(&mut self, remote: Endpoint, _local_port: u16) -> Result<(), LinkError> {
        if !self.joined {
            return Err(LinkError::NotJoined);
        }
        self.datagram = Some(remote);
        Ok(())
    }

    async fn send_datagram(&mut self, payload: &[u8]) -> Result<(), LinkError> {
        if self.datagram.is_none() {
            return Err(LinkError::NotOpen);
        }
        if !self.behaviour.wake_accepted {
            return Err(LinkError::Io);
        }
        let packet: [u8; WAKE_PACKET_LEN] = payload.try_into().map_err(|_| LinkError::TooLarge)?;
        self.wake_packets
            .push(packet)
            .map_err(|_| LinkError::TooLarge)
    }

    async fn drain_inbound(&mut self) -> usize {
        core::mem::take(&mut self.pending_inbound)
    }

    async fn close_datagram(&mut self) {
        self.datagram = None;
    }

    async fn connect(&mut self, remote: Endpoint) -> Result<(), LinkError> {
        self.connect_attempts += 1;
        if !self.joined {
            return Err(LinkError::NotJoined);
        }
        if !self.behaviour.reachable {
            return Err(LinkError::Refused);
        }
        self.requests
            .push(Vec::new())
            .map_err(|_| LinkError::TooLarge)?;
        self.stream = Some(remote);
        Ok(())
    }

    async fn write_stream(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        if self.stream.is_none() {
            return Err(LinkError::NotOpen);
        }
        let request = self.requests.last_mut().ok_or(LinkError::NotOpen)?;
        request
            .extend_from_slice(bytes)
            .map_err(|_| LinkError::TooLarge)
    }

    async fn close_stream(&mut self) {
        self.stream = None;
    }
}
