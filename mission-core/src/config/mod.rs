//! Mission configuration.
//!
//! Timings, thresholds and camera identity are compiled in. [`MissionConfig::reference`]
//! is the deployed profile; the `with_*` builders exist so simulations and
//! tests can shorten it. A configuration is validated once before the mission
//! arms and is immutable afterwards.

pub mod parse;

use core::fmt;
use core::time::Duration;

use crate::environment::DeciCelsius;
use crate::link::request::{self, MAX_REQUEST_LEN};
use crate::link::{Endpoint, HardwareId, Ipv4};

pub const DESCENT_DURATION: Duration = Duration::from_secs(10 * 60);
pub const RECORDING_DURATION: Duration = Duration::from_secs(30 * 60);
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(60);
/// 80.0 °C inside the housing means the electronics are cooking.
pub const TEMPERATURE_LIMIT: DeciCelsius = DeciCelsius::from_tenths(800);
pub const RAMP_UP_STEP: Duration = Duration::from_millis(10);
pub const RAMP_DOWN_STEP: Duration = Duration::from_millis(20);
/// Long enough for the burnwire to part under load.
pub const RELEASE_HOLD: Duration = Duration::from_secs(10 * 60);
pub const WAKE_SETTLE: Duration = Duration::from_secs(7);

pub const CAMERA_ADDRESS: Ipv4 = Ipv4::new(10, 5, 5, 9);
pub const COMMAND_PORT: u16 = 80;
pub const WAKE_BROADCAST: Endpoint = Endpoint::new(Ipv4::new(10, 5, 5, 255), 9);
pub const WAKE_LOCAL_PORT: u16 = 9;
pub const CAMERA_HARDWARE_ID: HardwareId = HardwareId::new([0x04, 0x41, 0x69, 0x5A, 0x3C, 0x21]);
pub const START_RECORDING_PATH: &str = "/gp/gpControl/command/shutter?p=1";
pub const STOP_RECORDING_PATH: &str = "/gp/gpControl/command/shutter?p=0";

/// How often the burnwire may be energised in one mission.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReleasePolicy {
    /// The first request fires; later ones are logged and ignored.
    AtMostOnce,
    /// Every request fires, including the end-of-mission release after a
    /// thermal fault already burned the wire.
    EveryRequest,
}

/// What the sequencer does after a thermal fault fired the release.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FaultResponse {
    /// Carry on with the normal phase order.
    Continue,
    /// Abandon the remaining waits and go straight to releasing.
    SkipToRelease,
}

/// Camera identity and command paths.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CameraConfig {
    pub address: Ipv4,
    pub command_port: u16,
    pub hardware_id: HardwareId,
    pub wake_broadcast: Endpoint,
    pub wake_local_port: u16,
    pub start_path: &'static str,
    pub stop_path: &'static str,
}

impl CameraConfig {
    #[must_use]
    pub const fn reference() -> Self {
        Self {
            address: CAMERA_ADDRESS,
            command_port: COMMAND_PORT,
            hardware_id: CAMERA_HARDWARE_ID,
            wake_broadcast: WAKE_BROADCAST,
            wake_local_port: WAKE_LOCAL_PORT,
            start_path: START_RECORDING_PATH,
            stop_path: STOP_RECORDING_PATH,
        }
    }

    #[must_use]
    pub const fn command_endpoint(&self) -> Endpoint {
        Endpoint::new(self.address, self.command_port)
    }
}

/// Everything one mission needs to know up front.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct MissionConfig {
    pub descent: Duration,
    pub recording: Duration,
    pub sample_interval: Duration,
    pub temperature_limit: DeciCelsius,
    pub ramp_up_step: Duration,
    pub ramp_down_step: Duration,
    pub release_hold: Duration,
    pub wake_settle: Duration,
    pub camera: CameraConfig,
    pub release_policy: ReleasePolicy,
    pub fault_response: FaultResponse,
}

impl MissionConfig {
    /// Deployed mission profile.
    #[must_use]
    pub const fn reference() -> Self {
        Self {
            descent: DESCENT_DURATION,
            recording: RECORDING_DURATION,
            sample_interval: SAMPLE_INTERVAL,
            temperature_limit: TEMPERATURE_LIMIT,
            ramp_up_step: RAMP_UP_STEP,
            ramp_down_step: RAMP_DOWN_STEP,
            release_hold: RELEASE_HOLD,
            wake_settle: WAKE_SETTLE,
            camera: CameraConfig::reference(),
            release_policy: ReleasePolicy::AtMostOnce,
            fault_response: FaultResponse::Continue,
        }
    }

    #[must_use]
    pub const fn with_descent(mut self, descent: Duration) -> Self {
        self.descent = descent;
        self
    }

    #[must_use]
    pub const fn with_recording(mut self, recording: Duration) -> Self {
        self.recording = recording;
        self
    }

    #[must_use]
    pub const fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_temperature_limit(mut self, limit: DeciCelsius) -> Self {
        self.temperature_limit = limit;
        self
    }

    #[must_use]
    pub const fn with_ramp_steps(mut self, up: Duration, down: Duration) -> Self {
        self.ramp_up_step = up;
        self.ramp_down_step = down;
        self
    }

    #[must_use]
    pub const fn with_release_hold(mut self, hold: Duration) -> Self {
        self.release_hold = hold;
        self
    }

    #[must_use]
    pub const fn with_wake_settle(mut self, settle: Duration) -> Self {
        self.wake_settle = settle;
        self
    }

    #[must_use]
    pub const fn with_camera(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    #[must_use]
    pub const fn with_release_policy(mut self, policy: ReleasePolicy) -> Self {
        self.release_policy = policy;
        self
    }

    #[must_use]
    pub const fn with_fault_response(mut self, response: FaultResponse) -> Self {
        self.fault_response = response;
        self
    }

    /// Checks the configuration before the mission arms.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_interval.is_zero() {
            return Err(ConfigError::ZeroSampleInterval);
        }
        for path in [self.camera.start_path, self.camera.stop_path] {
            request::encode_get(path, self.camera.address)
                .map_err(|_| ConfigError::InvalidCommandPath(path))?;
        }
        if self.camera.command_port == 0 || self.camera.wake_broadcast.port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        Ok(())
    }
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self::reference()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    ZeroSampleInterval,
    ZeroPort,
    /// Path is relative, contains whitespace, or frames a request longer than
    /// the request buffer.
    InvalidCommandPath(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroSampleInterval => f.write_str("sampling interval must be non-zero"),
            Self::ZeroPort => f.write_str("camera ports must be non-zero"),
            Self::InvalidCommandPath(path) => {
                write!(f, "command path `{path}` unusable (max request {MAX_REQUEST_LEN} bytes)")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_profile_is_valid() {
        let config = MissionConfig::reference();
        assert_eq!(config.validate(), Ok(()));
        assert!(config.ramp_up_step < config.ramp_down_step);
        assert_eq!(config.release_policy, ReleasePolicy::AtMostOnce);
        assert_eq!(config.fault_response, FaultResponse::Continue);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let config = MissionConfig::reference().with_sample_interval(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroSampleInterval));
    }

    #[test]
    fn malformed_paths_are_rejected() {
        let camera = CameraConfig {
            stop_path: "shutter off",
            ..CameraConfig::reference()
        };
        let config = MissionConfig::reference().with_camera(camera);
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidCommandPath("shutter off"))
        );
    }
}
