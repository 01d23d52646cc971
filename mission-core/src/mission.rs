//! Mission sequencer.
//!
//! One mission per power cycle:
//!
//! ```text
//! AwaitingTrigger -> Waking -> Descending -> Recording -> Releasing -> Idle
//! ```
//!
//! Descending and Recording are wait phases. They last a configured duration
//! and sample the environment on a fixed cadence; a sample never runs late by
//! more than one interval because ticks are scheduled on an absolute grid. A
//! thermal fault during a wait phase fires the release immediately. What
//! happens next is decided by [`FaultResponse`]: by default the mission keeps
//! its normal order, so the lights still ramp down, recording is stopped and
//! the end-of-mission release is requested again under the
//! [`ReleasePolicy`](crate::config::ReleasePolicy).
//!
//! Nothing in here fails across a phase boundary. Collaborator errors become
//! log lines and [`LinkOutcome`]s; only boot can refuse to start a mission.

use core::fmt;
use core::time::Duration;

use crate::clock::{MissionClock, MissionInstant};
use crate::config::{ConfigError, FaultResponse, MissionConfig};
use crate::context::MissionContext;
use crate::environment::{ClimateSensor, EnvironmentalMonitor};
use crate::illumination::IlluminationController;
use crate::io::{DutyOutput, Indicator, StatusIndicators, SwitchOutput, TriggerInput};
use crate::link::{LinkOutcome, RemoteLink};
use crate::log::{LogSink, SinkError};
use crate::phase::MissionPhase;
use crate::release::ReleaseActuator;
use crate::remote::{CameraCommand, RemoteDeviceController};
use crate::trigger::TriggerDetector;

/// Sleep period of the terminal idle loop.
pub const IDLE_PERIOD: Duration = Duration::from_secs(3_600);

/// Board-specific collaborators, named once so the sequencer takes a single
/// type parameter.
pub trait Board {
    type Clock: MissionClock;
    type Sink: LogSink;
    type Indicators: StatusIndicators;
    type Trigger: TriggerInput;
    type Sensor: ClimateSensor;
    type Lamp: DutyOutput;
    type Burnwire: SwitchOutput;
    type Link: RemoteLink;
}

pub type BoardContext<B> =
    MissionContext<<B as Board>::Clock, <B as Board>::Sink, <B as Board>::Indicators>;

/// Concrete collaborators handed to the sequencer at boot.
pub struct BoardParts<B: Board> {
    pub clock: B::Clock,
    pub sink: B::Sink,
    pub indicators: B::Indicators,
    pub trigger: B::Trigger,
    pub sensor: B::Sensor,
    pub lamp: B::Lamp,
    pub burnwire: B::Burnwire,
    pub link: B::Link,
}

/// Conditions that stop the controller before a mission can start.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BootFault {
    InvalidConfig(ConfigError),
    StorageAbsent(SinkError),
    NetworkAbsent,
}

impl fmt::Display for BootFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootFault::InvalidConfig(error) => write!(f, "invalid configuration: {error}"),
            BootFault::StorageAbsent(error) => write!(f, "log storage unavailable: {error}"),
            BootFault::NetworkAbsent => f.write_str("network hardware absent"),
        }
    }
}

/// What happened during one mission.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MissionReport {
    pub final_phase: MissionPhase,
    pub triggered_at: Option<MissionInstant>,
    pub wake: Option<LinkOutcome>,
    pub start_recording: Option<LinkOutcome>,
    pub stop_recording: Option<LinkOutcome>,
    pub descent_samples: u32,
    pub recording_samples: u32,
    pub invalid_samples: u32,
    pub thermal_faults: u32,
    pub releases_fired: u8,
    pub releases_suppressed: u8,
    pub log_entries_dropped: u32,
}

impl MissionReport {
    const fn new() -> Self {
        Self {
            final_phase: MissionPhase::AwaitingTrigger,
            triggered_at: None,
            wake: None,
            start_recording: None,
            stop_recording: None,
            descent_samples: 0,
            recording_samples: 0,
            invalid_samples: 0,
            thermal_faults: 0,
            releases_fired: 0,
            releases_suppressed: 0,
            log_entries_dropped: 0,
        }
    }
}

/// Outcome of one wait phase.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct WaitSummary {
    samples: u32,
    aborted: bool,
}

pub struct MissionSequencer<B: Board> {
    ctx: BoardContext<B>,
    trigger: TriggerDetector<B::Trigger>,
    monitor: EnvironmentalMonitor<B::Sensor>,
    lights: IlluminationController<B::Lamp>,
    release: ReleaseActuator<B::Burnwire>,
    remote: RemoteDeviceController<B::Link>,
    phase: MissionPhase,
    report: MissionReport,
}

impl<B: Board> MissionSequencer<B> {
    /// Wires up the collaborators without touching storage or the network.
    pub fn new(config: MissionConfig, parts: BoardParts<B>) -> Self {
        Self {
            ctx: MissionContext::new(config, parts.clock, parts.sink, parts.indicators),
            trigger: TriggerDetector::new(parts.trigger),
            monitor: EnvironmentalMonitor::new(parts.sensor),
            lights: IlluminationController::new(parts.lamp),
            release: ReleaseActuator::new(parts.burnwire),
            remote: RemoteDeviceController::new(parts.link),
            phase: MissionPhase::AwaitingTrigger,
            report: MissionReport::new(),
        }
    }

    /// Brings the controller up: power lamp, fresh log, network hardware,
    /// network join. A failed join is logged and tolerated; camera commands
    /// will then report the camera unreachable.
    ///
    /// # Errors
    ///
    /// Returns a [`BootFailure`] carrying the fault and the sequencer so the
    /// caller can [`BootFailure::halt`].
    pub async fn boot(config: MissionConfig, parts: BoardParts<B>) -> Result<Self, BootFailure<B>> {
        let mut sequencer = Self::new(config, parts);
        match sequencer.bring_up().await {
            Ok(()) => Ok(sequencer),
            Err(fault) => Err(BootFailure { fault, sequencer }),
        }
    }

    async fn bring_up(&mut self) -> Result<(), BootFault> {
        self.ctx.indicate(Indicator::Power, true);
        self.ctx
            .config
            .validate()
            .map_err(BootFault::InvalidConfig)?;
        self.ctx.log.begin().map_err(BootFault::StorageAbsent)?;
        self.ctx.record("Controller started");

        if !self.remote.probe().await {
            return Err(BootFault::NetworkAbsent);
        }
        // Join failures are already logged; the mission goes ahead without.
        let _ = self.remote.join(&mut self.ctx).await;
        Ok(())
    }

    /// Runs the mission and then idles until power is removed.
    pub async fn run(mut self) -> ! {
        self.execute().await;
        loop {
            self.ctx.sleep_for(IDLE_PERIOD).await;
        }
    }

    /// Runs the mission from the trigger wait to the end of the release.
    ///
    /// Only the first call runs a mission; later calls return the same report.
    pub async fn execute(&mut self) -> MissionReport {
        if self.phase != MissionPhase::AwaitingTrigger {
            return self.report;
        }

        self.report.triggered_at = Some(self.trigger.await_trigger(&mut self.ctx).await);
        self.ctx.record("Trigger activated");

        self.enter(MissionPhase::Waking);
        self.ctx.record("Waking camera");
        self.report.wake = Some(self.remote.wake(&mut self.ctx).await);

        self.enter(MissionPhase::Descending);
        self.ctx.record("On its way");
        let descent = self.wait_phase(self.ctx.config.descent).await;
        self.report.descent_samples = descent.samples;

        if descent.aborted {
            self.ctx.record("Descent aborted");
        } else {
            self.ctx.record("Arrived");
            self.enter(MissionPhase::Recording);
            self.lights.ramp_up(&mut self.ctx).await;
            self.ctx.record("Lights on");
            self.ctx.record("Start recording");
            self.report.start_recording = Some(
                self.remote
                    .issue_command(&mut self.ctx, CameraCommand::StartRecording)
                    .await,
            );
            let recording = self.wait_phase(self.ctx.config.recording).await;
            self.report.recording_samples = recording.samples;
            if recording.aborted {
                self.ctx.record("Recording aborted");
            }
        }

        self.enter(MissionPhase::Releasing);
        let was_recording = self.report.start_recording.is_some();
        if was_recording {
            self.ctx.record("Stop recording");
        }
        if self.lights.is_lit() {
            self.lights.ramp_down(&mut self.ctx).await;
            self.ctx.record("Lights off");
        }
        // The camera is told to stop only once the scene has gone dark.
        if was_recording {
            self.report.stop_recording = Some(
                self.remote
                    .issue_command(&mut self.ctx, CameraCommand::StopRecording)
                    .await,
            );
        }
        self.release.release(&mut self.ctx).await;

        self.enter(MissionPhase::Idle);
        self.ctx.record("End of mission");
        self.finish_report()
    }

    /// Samples on a fixed grid until `duration` has elapsed. Returns early
    /// only when a thermal fault fired and the mission is set to skip ahead.
    async fn wait_phase(&mut self, duration: Duration) -> WaitSummary {
        let interval = self.ctx.config.sample_interval;
        let started = self.ctx.clock.now();
        let mut tick = started;
        let mut summary = WaitSummary {
            samples: 0,
            aborted: false,
        };

        while self.ctx.clock.elapsed_since(started) < duration {
            let sample = self.monitor.sample(&mut self.ctx, &mut self.release).await;
            summary.samples += 1;
            if sample.is_valid() {
                self.ctx.record_fmt(format_args!("{sample}"));
            }
            if sample.is_thermal_fault()
                && self.ctx.config.fault_response == FaultResponse::SkipToRelease
            {
                summary.aborted = true;
                return summary;
            }

            // A release hold can outlast several intervals; skip the ticks it
            // swallowed rather than sampling in a burst.
            let now = self.ctx.clock.now();
            tick = tick + interval;
            while tick <= now {
                tick = tick + interval;
            }
            self.ctx.clock.sleep_until(tick).await;
        }
        summary
    }

    fn enter(&mut self, next: MissionPhase) {
        match self.phase.advance_to(next) {
            Ok(phase) => self.phase = phase,
            Err(error) => self.ctx.record_fmt(format_args!("{error}")),
        }
    }

    fn finish_report(&mut self) -> MissionReport {
        self.report.final_phase = self.phase;
        self.report.invalid_samples = self.monitor.invalid_samples();
        self.report.thermal_faults = self.monitor.thermal_faults();
        self.report.releases_fired = self.release.fired();
        self.report.releases_suppressed = self.release.suppressed();
        self.report.log_entries_dropped = self.ctx.log.dropped();
        self.report
    }

    #[must_use]
    pub const fn phase(&self) -> MissionPhase {
        self.phase
    }

    pub fn context(&self) -> &BoardContext<B> {
        &self.ctx
    }

    pub fn lights(&self) -> &IlluminationController<B::Lamp> {
        &self.lights
    }

    pub fn release(&self) -> &ReleaseActuator<B::Burnwire> {
        &self.release
    }

    pub fn remote(&self) -> &RemoteDeviceController<B::Link> {
        &self.remote
    }

    pub fn monitor(&self) -> &EnvironmentalMonitor<B::Sensor> {
        &self.monitor
    }
}

/// Boot fault together with the sequencer that hit it.
pub struct BootFailure<B: Board> {
    fault: BootFault,
    sequencer: MissionSequencer<B>,
}

impl<B: Board> BootFailure<B> {
    #[must_use]
    pub const fn fault(&self) -> BootFault {
        self.fault
    }

    pub fn sequencer(&self) -> &MissionSequencer<B> {
        &self.sequencer
    }

    /// Logs the fault once and idles until power is removed. The power lamp
    /// stays lit; the other indicators stay dark.
    pub async fn halt(self) -> ! {
        let Self {
            fault,
            mut sequencer,
        } = self;
        sequencer.ctx.record_fmt(format_args!("Halted: {fault}"));
        loop {
            sequencer.ctx.sleep_for(IDLE_PERIOD).await;
        }
    }
}

impl<B: Board> fmt::Debug for BootFailure<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootFailure")
            .field("fault", &self.fault)
            .finish_non_exhaustive()
    }
}
