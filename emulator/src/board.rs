use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant as HostInstant;

use crossterm::style::Stylize;
use mission_core::clock::{FakeClock, MissionClock, MissionInstant};
use mission_core::io::{Indicator, StatusIndicators};
use mission_core::link::{Endpoint, LinkError, RemoteLink};
use mission_core::log::{LogSink, SinkError};
use mission_core::mission::{Board, BoardParts};
use mission_core::sim::{
    RecordingLamp, RecordingSwitch, ScriptedSensor, ScriptedTrigger, SimulatedLink,
};
use mission_core::trigger::TRIGGER_POLL_INTERVAL;

use crate::net::SocketLink;
use crate::options::Options;

pub struct HostBoard;

impl Board for HostBoard {
    type Clock = HostClock;
    type Sink = FileSink;
    type Indicators = ConsoleIndicators;
    type Trigger = ScriptedTrigger;
    type Sensor = ScriptedSensor;
    type Lamp = RecordingLamp;
    type Burnwire = RecordingSwitch;
    type Link = HostLink;
}

pub fn assemble(options: &Options) -> BoardParts<HostBoard> {
    let clock = if options.realtime {
        HostClock::realtime()
    } else {
        HostClock::Simulated(FakeClock::new())
    };
    let link = if options.network {
        HostLink::Socket(SocketLink::new(options.ssid.clone()))
    } else {
        HostLink::Simulated(SimulatedLink::new(options.profile.link_behaviour()))
    };
    let polls = options.trigger_after.as_micros() / TRIGGER_POLL_INTERVAL.as_micros().max(1);

    BoardParts {
        clock,
        sink: FileSink::new(options.log_path.clone()),
        indicators: ConsoleIndicators::default(),
        trigger: ScriptedTrigger::after_polls(u32::try_from(polls).unwrap_or(u32::MAX)),
        sensor: options.profile.sensor(),
        lamp: RecordingLamp::new(),
        burnwire: RecordingSwitch::new(),
        link,
    }
}

/// Simulated time jumps straight to each deadline; real time blocks the
/// thread, which is the only thread the mission runs on.
pub enum HostClock {
    Simulated(FakeClock),
    Realtime { started: HostInstant },
}

impl HostClock {
    pub fn realtime() -> Self {
        Self::Realtime {
            started: HostInstant::now(),
        }
    }
}

impl MissionClock for HostClock {
    fn now(&self) -> MissionInstant {
        match self {
            HostClock::Simulated(clock) => clock.now(),
            HostClock::Realtime { started } => {
                let micros = started.elapsed().as_micros();
                MissionInstant::from_micros(u64::try_from(micros).unwrap_or(u64::MAX))
            }
        }
    }

    async fn sleep_until(&mut self, deadline: MissionInstant) {
        let remaining = deadline.saturating_duration_since(self.now());
        match self {
            HostClock::Simulated(clock) => clock.sleep_until(deadline).await,
            HostClock::Realtime { .. } => {
                if !remaining.is_zero() {
                    thread::sleep(remaining);
                }
            }
        }
    }
}

/// Mission log on the host filesystem, echoed to stdout.
pub struct FileSink {
    path: PathBuf,
    file: Option<File>,
}

impl FileSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path, file: None }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.path)
    }
}

impl LogSink for FileSink {
    fn is_present(&mut self) -> bool {
        if self.file.is_none() {
            self.file = self.open().ok();
        }
        self.file.is_some()
    }

    fn truncate(&mut self) -> Result<(), SinkError> {
        let file = self.file.as_mut().ok_or(SinkError::Absent)?;
        file.set_len(0).map_err(|_| SinkError::Truncate)?;
        file.seek(SeekFrom::Start(0)).map_err(|_| SinkError::Truncate)?;
        Ok(())
    }

    fn append_line(&mut self, line: &str) -> Result<(), SinkError> {
        let file = self.file.as_mut().ok_or(SinkError::Absent)?;
        file.write_all(line.as_bytes())
            .and_then(|()| file.sync_data())
            .map_err(|_| SinkError::Write)?;
        print!("{} {line}", "log".dim());
        Ok(())
    }
}

/// Front-panel lamps drawn on the terminal whenever one changes.
#[derive(Default)]
pub struct ConsoleIndicators {
    lit: [bool; Indicator::ALL.len()],
}

impl ConsoleIndicators {
    pub fn is_lit(&self, indicator: Indicator) -> bool {
        self.lit[slot(indicator)]
    }

    pub fn render(&self) -> String {
        let mut panel = String::new();
        for indicator in Indicator::ALL {
            let label = format!("[{indicator}]");
            let lamp = if self.is_lit(indicator) {
                label.green().bold().to_string()
            } else {
                label.dark_grey().to_string()
            };
            if !panel.is_empty() {
                panel.push(' ');
            }
            panel.push_str(&lamp);
        }
        panel
    }
}

impl StatusIndicators for ConsoleIndicators {
    fn set(&mut self, indicator: Indicator, on: bool) {
        let slot = slot(indicator);
        if self.lit[slot] != on {
            self.lit[slot] = on;
            println!("{} {}", "panel".dim(), self.render());
        }
    }
}

fn slot(indicator: Indicator) -> usize {
    match indicator {
        Indicator::Power => 0,
        Indicator::TriggerArmed => 1,
        Indicator::LinkConnected => 2,
    }
}

/// Either the in-memory camera network or real sockets.
pub enum HostLink {
    Simulated(SimulatedLink),
    Socket(SocketLink),
}

impl HostLink {
    pub fn simulated(&self) -> Option<&SimulatedLink> {
        match self {
            HostLink::Simulated(link) => Some(link),
            HostLink::Socket(_) => None,
        }
    }
}

impl RemoteLink for HostLink {
    async fn probe(&mut self) -> bool {
        match self {
            HostLink::Simulated(link) => link.probe().await,
            HostLink::Socket(link) => link.probe().await,
        }
    }

    async fn join(&mut self) -> Result<(), LinkError> {
        match self {
            HostLink::Simulated(link) => link.join().await,
            HostLink::Socket(link) => link.join().await,
        }
    }

    async fn open_datagram(&mut self, remote: Endpoint, local_port: u16) -> Result<(), LinkError> {
        match self {
            HostLink::Simulated(link) => link.open_datagram(remote, local_port).await,
            HostLink::Socket(link) => link.open_datagram(remote, local_port).await,
        }
    }

    async fn send_datagram(&mut self, payload: &[u8]) -> Result<(), LinkError> {
        match self {
            HostLink::Simulated(link) => link.send_datagram(payload).await,
            HostLink::Socket(link) => link.send_datagram(payload).await,
        }
    }

    async fn drain_inbound(&mut self) -> usize {
        match self {
            HostLink::Simulated(link) => link.drain_inbound().await,
            HostLink::Socket(link) => link.drain_inbound().await,
        }
    }

    async fn close_datagram(&mut self) {
        match self {
            HostLink::Simulated(link) => link.close_datagram().await,
            HostLink::Socket(link) => link.close_datagram().await,
        }
    }

    async fn connect(&mut self, remote: Endpoint) -> Result<(), LinkError> {
        match self {
            HostLink::Simulated(link) => link.connect(remote).await,
            HostLink::Socket(link) => link.connect(remote).await,
        }
    }

    async fn write_stream(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        match self {
            HostLink::Simulated(link) => link.write_stream(bytes).await,
            HostLink::Socket(link) => link.write_stream(bytes).await,
        }
    }

    async fn close_stream(&mut self) {
        match self {
            HostLink::Simulated(link) => link.close_stream().await,
            HostLink::Socket(link) => link.close_stream().await,
        }
    }
}
