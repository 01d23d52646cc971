use std::path::PathBuf;
use std::time::Duration;

use mission_core::config::{FaultResponse, MissionConfig, ReleasePolicy, parse};
use mission_core::environment::{DeciCelsius, DeciPercent};
use mission_core::log::LOG_FILE_NAME;
use mission_core::sim::{LinkBehaviour, ScriptedReading, ScriptedSensor};

pub const USAGE: &str = "\
Usage: mission-emulator [<profile>] [options]

Profiles: nominal (default), overheat, unreachable, offline, sensor-fault

Options:
  --profile <tag>           select a profile (also --profile=<tag>)
  --realtime                sleep on the host clock instead of simulating time
  --network                 talk to a real camera over UDP/TCP
  --ssid <name>             network name reported by --network
  --log <path>              mission log file (default MISSION.LOG)
  --trigger-after <dur>     assert the trigger after this long (default 3s)
  --descent <dur>           descent phase length
  --recording <dur>         recording phase length
  --interval <dur>          sampling interval
  --hold <dur>              burnwire hold time
  --settle <dur>            wake settle time
  --limit <celsius>         temperature limit
  --camera <ipv4>           camera address
  --broadcast <ipv4:port>   wake broadcast endpoint
  --wake-port <port>        local port the wake datagram is sent from
  --hardware-id <id>        camera hardware id, e.g. 04:41:69:5A:3C:21
  --policy <at-most-once|every-request>
  --on-fault <continue|skip-to-release>
  -h, --help                show this text";

pub const DEFAULT_TRIGGER_DELAY: Duration = Duration::from_secs(3);

pub const COOL_WATER: ScriptedReading =
    ScriptedReading::valid(DeciCelsius::from_tenths(182), DeciPercent::from_tenths(455));
pub const OVERHEATED: ScriptedReading =
    ScriptedReading::valid(DeciCelsius::from_tenths(853), DeciPercent::from_tenths(312));

/// Canned rig behaviour.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Profile {
    Nominal,
    /// The housing overheats after the first sample.
    Overheat,
    /// The camera refuses every command connection.
    Unreachable,
    /// The camera network rejects the join.
    Offline,
    /// The climate sensor fails its first two reads.
    SensorFault,
}

impl Profile {
    pub fn from_tag(tag: &str) -> Result<Self, String> {
        const TAGS: [(&str, Profile); 5] = [
            ("nominal", Profile::Nominal),
            ("overheat", Profile::Overheat),
            ("unreachable", Profile::Unreachable),
            ("offline", Profile::Offline),
            ("sensor-fault", Profile::SensorFault),
        ];
        TAGS.iter()
            .find(|(name, _)| tag.eq_ignore_ascii_case(name))
            .map(|&(_, profile)| profile)
            .ok_or_else(|| format!("Unknown profile `{tag}`"))
    }

    pub fn tag(self) -> &'static str {
        match self {
            Profile::Nominal => "nominal",
            Profile::Overheat => "overheat",
            Profile::Unreachable => "unreachable",
            Profile::Offline => "offline",
            Profile::SensorFault => "sensor-fault",
        }
    }

    pub fn link_behaviour(self) -> LinkBehaviour {
        match self {
            Profile::Unreachable => LinkBehaviour {
                reachable: false,
                ..LinkBehaviour::NOMINAL
            },
            Profile::Offline => LinkBehaviour {
                joinable: false,
                ..LinkBehaviour::NOMINAL
            },
            Profile::Nominal | Profile::Overheat | Profile::SensorFault => LinkBehaviour::NOMINAL,
        }
    }

    pub fn sensor(self) -> ScriptedSensor {
        match self {
            Profile::Overheat => {
                let mut sensor = ScriptedSensor::steady(OVERHEATED);
                sensor.push(COOL_WATER);
                sensor
            }
            Profile::SensorFault => {
                let mut sensor = ScriptedSensor::steady(COOL_WATER);
                sensor.push(ScriptedReading::failed());
                sensor.push(ScriptedReading::failed());
                sensor
            }
            Profile::Nominal | Profile::Unreachable | Profile::Offline => {
                ScriptedSensor::steady(COOL_WATER)
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct Options {
    pub profile: Profile,
    pub config: MissionConfig,
    pub realtime: bool,
    pub network: bool,
    pub ssid: String,
    pub log_path: PathBuf,
    pub trigger_after: Duration,
    pub help: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            profile: Profile::Nominal,
            config: MissionConfig::reference(),
            realtime: false,
            network: false,
            ssid: String::from("camera"),
            log_path: PathBuf::from(LOG_FILE_NAME),
            trigger_after: DEFAULT_TRIGGER_DELAY,
            help: false,
        }
    }
}

impl Options {
    pub fn parse<I>(args: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut options = Self::default();
        let mut args = args.into_iter().peekable();

        if let Some(first) = args.next_if(|arg| !arg.starts_with('-')) {
            options.profile = Profile::from_tag(&first)?;
        }

        while let Some(arg) = args.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) if flag.starts_with("--") => {
                    (flag.to_string(), Some(value.to_string()))
                }
                _ => (arg, None),
            };
            let mut value = || -> Result<String, String> {
                inline
                    .clone()
                    .or_else(|| args.next())
                    .ok_or_else(|| format!("Expected value after {flag}"))
            };

            match flag.as_str() {
                "-h" | "--help" => options.help = true,
                "--realtime" => options.realtime = true,
                "--network" => options.network = true,
                "--profile" => options.profile = Profile::from_tag(&value()?)?,
                "--ssid" => options.ssid = value()?,
                "--log" => options.log_path = PathBuf::from(value()?),
                "--trigger-after" => options.trigger_after = duration(&value()?)?,
                "--descent" => options.config.descent = duration(&value()?)?,
                "--recording" => options.config.recording = duration(&value()?)?,
                "--interval" => options.config.sample_interval = duration(&value()?)?,
                "--hold" => options.config.release_hold = duration(&value()?)?,
                "--settle" => options.config.wake_settle = duration(&value()?)?,
                "--limit" => options.config.temperature_limit = temperature(&value()?)?,
                "--camera" => {
                    let address = parse::ipv4(&value()?).map_err(|err| err.to_string())?;
                    options.config.camera.address = address;
                }
                "--broadcast" => {
                    let endpoint = parse::endpoint(&value()?).map_err(|err| err.to_string())?;
                    options.config.camera.wake_broadcast = endpoint;
                }
                "--wake-port" => {
                    let port = value()?;
                    options.config.camera.wake_local_port = port
                        .parse()
                        .map_err(|_| format!("Invalid port `{port}`"))?;
                }
                "--hardware-id" => {
                    let id = parse::hardware_id(&value()?).map_err(|err| err.to_string())?;
                    options.config.camera.hardware_id = id;
                }
                "--policy" => options.config.release_policy = release_policy(&value()?)?,
                "--on-fault" => options.config.fault_response = fault_response(&value()?)?,
                other => return Err(format!("Unknown option `{other}`")),
            }
        }

        options
            .config
            .validate()
            .map_err(|err| format!("Invalid mission configuration: {err}"))?;
        Ok(options)
    }
}

fn duration(text: &str) -> Result<Duration, String> {
    parse::duration(text).map_err(|err| format!("`{text}`: {err}"))
}

fn temperature(text: &str) -> Result<DeciCelsius, String> {
    parse::temperature(text).map_err(|err| format!("`{text}`: {err}"))
}

fn release_policy(text: &str) -> Result<ReleasePolicy, String> {
    match text {
        "at-most-once" => Ok(ReleasePolicy::AtMostOnce),
        "every-request" => Ok(ReleasePolicy::EveryRequest),
        _ => Err(format!("Unknown release policy `{text}`")),
    }
}

fn fault_response(text: &str) -> Result<FaultResponse, String> {
    match text {
        "continue" => Ok(FaultResponse::Continue),
        "skip-to-release" => Ok(FaultResponse::SkipToRelease),
        _ => Err(format!("Unknown fault response `{text}`")),
    }
}
