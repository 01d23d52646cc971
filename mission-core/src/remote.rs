//! Remote camera control: wake-up and start/stop commands.
//!
//! The camera gives no useful acknowledgement, so nothing here waits for one.
//! A wake is one broadcast datagram followed by a fixed settle. A command is
//! one request on a fresh connection, closed without reading the reply. Any
//! failure is logged once and reported as [`LinkOutcome::Unreachable`]; there
//! are no retries.

use core::fmt;

use crate::clock::MissionClock;
use crate::config::CameraConfig;
use crate::context::MissionContext;
use crate::io::{Indicator, StatusIndicators};
use crate::link::request;
use crate::link::wake::WakePacket;
use crate::link::{LinkError, LinkOutcome, RemoteLink};
use crate::log::LogSink;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CameraCommand {
    StartRecording,
    StopRecording,
}

impl CameraCommand {
    #[must_use]
    pub const fn path(self, camera: &CameraConfig) -> &'static str {
        match self {
            Self::StartRecording => camera.start_path,
            Self::StopRecording => camera.stop_path,
        }
    }
}

impl fmt::Display for CameraCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraCommand::StartRecording => f.write_str("start-recording"),
            CameraCommand::StopRecording => f.write_str("stop-recording"),
        }
    }
}

pub struct RemoteDeviceController<L> {
    link: L,
}

impl<L: RemoteLink> RemoteDeviceController<L> {
    pub const fn new(link: L) -> Self {
        Self { link }
    }

    /// Checks that the network hardware answers.
    pub async fn probe(&mut self) -> bool {
        self.link.probe().await
    }

    /// Joins the camera's network and lights the link indicator on success.
    ///
    /// # Errors
    ///
    /// Returns the link's [`LinkError`]; the failure is also logged.
    pub async fn join<C, S, N>(
        &mut self,
        ctx: &mut MissionContext<C, S, N>,
    ) -> Result<(), LinkError>
    where
        C: MissionClock,
        S: LogSink,
        N: StatusIndicators,
    {
        match self.link.join().await {
            Ok(()) => {
                ctx.indicate(Indicator::LinkConnected, true);
                ctx.record("Joined camera network");
                Ok(())
            }
            Err(error) => {
                ctx.indicate(Indicator::LinkConnected, false);
                ctx.record_fmt(format_args!("Network join failed: {error}"));
                Err(error)
            }
        }
    }

    /// Broadcasts one wake packet, lets the camera settle and discards
    /// whatever it sent back.
    pub async fn wake<C, S, N>(&mut self, ctx: &mut MissionContext<C, S, N>) -> LinkOutcome
    where
        C: MissionClock,
        S: LogSink,
        N: StatusIndicators,
    {
        let camera = ctx.config.camera;
        let packet = WakePacket::new(&camera.hardware_id);

        if let Err(error) = self
            .link
            .open_datagram(camera.wake_broadcast, camera.wake_local_port)
            .await
        {
            ctx.record_fmt(format_args!("Wake failed: {error}"));
            return LinkOutcome::Unreachable;
        }
        if let Err(error) = self.link.send_datagram(packet.as_bytes()).await {
            self.link.close_datagram().await;
            ctx.record_fmt(format_args!("Wake failed: {error}"));
            return LinkOutcome::Unreachable;
        }

        ctx.sleep_for(ctx.config.wake_settle).await;
        self.link.drain_inbound().await;
        self.link.close_datagram().await;
        LinkOutcome::Sent
    }

    /// Sends `command` on a fresh connection and closes it without waiting
    /// for the reply.
    pub async fn issue_command<C, S, N>(
        &mut self,
        ctx: &mut MissionContext<C, S, N>,
        command: CameraCommand,
    ) -> LinkOutcome
    where
        C: MissionClock,
        S: LogSink,
        N: StatusIndicators,
    {
        let camera = ctx.config.camera;
        let request = match request::encode_get(command.path(&camera), camera.address) {
            Ok(request) => request,
            Err(error) => {
                ctx.record_fmt(format_args!("Bad {command} request: {error}"));
                return LinkOutcome::Unreachable;
            }
        };

        if self.link.connect(camera.command_endpoint()).await.is_err() {
            ctx.record("Connection to camera failed");
            return LinkOutcome::Unreachable;
        }
        let written = self.link.write_stream(request.as_bytes()).await;
        self.link.close_stream().await;

        match written {
            Ok(()) => LinkOutcome::Sent,
            Err(error) => {
                ctx.record_fmt(format_args!("Sending {command} failed: {error}"));
                LinkOutcome::Unreachable
            }
        }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{FakeClock, MissionInstant};
    use crate::config::MissionConfig;
    use crate::link::wake::WAKE_PACKET_LEN;
    use crate::sim::{LampBank, LinkBehaviour, MemorySink, SimulatedLink};
    use embassy_futures::block_on;

    type Context = MissionContext<FakeClock, MemorySink, LampBank>;

    fn joined(behaviour: LinkBehaviour) -> (Context, RemoteDeviceController<SimulatedLink>) {
        let mut ctx = MissionContext::new(
            MissionConfig::reference(),
            FakeClock::new(),
            MemorySink::new(),
            LampBank::new(),
        );
        let mut remote = RemoteDeviceController::new(SimulatedLink::new(behaviour));
        block_on(remote.join(&mut ctx)).expect("join");
        (ctx, remote)
    }

    #[test]
    fn join_lights_the_link_indicator() {
        let (ctx, _) = joined(LinkBehaviour::NOMINAL);
        assert!(ctx.indicators.is_lit(Indicator::LinkConnected));
    }

    #[test]
    fn failed_join_is_logged_and_leaves_the_indicator_dark() {
        let mut ctx = MissionContext::new(
            MissionConfig::reference(),
            FakeClock::new(),
            MemorySink::new(),
            LampBank::new(),
        );
        let mut remote = RemoteDeviceController::new(SimulatedLink::new(LinkBehaviour {
            joinable: false,
            ..LinkBehaviour::NOMINAL
        }));

        assert_eq!(block_on(remote.join(&mut ctx)), Err(LinkError::JoinRejected));
        assert!(!ctx.indicators.is_lit(Indicator::LinkConnected));
        assert_eq!(
            ctx.log.sink().text(),
            "0:00:00\tNetwork join failed: network join rejected\n"
        );
    }

    #[test]
    fn wake_broadcasts_one_packet_and_settles() {
        let (mut ctx, mut remote) = joined(LinkBehaviour::NOMINAL);
        remote.link_mut().queue_inbound(32);

        assert_eq!(block_on(remote.wake(&mut ctx)), LinkOutcome::Sent);

        let packets = remote.link().wake_packets();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].len(), WAKE_PACKET_LEN);
        assert_eq!(
            packets[0],
            *WakePacket::new(&ctx.config.camera.hardware_id).as_bytes()
        );
        assert_eq!(ctx.clock.now(), MissionInstant::from_millis(7_000));
        assert!(!remote.link().has_open_channel());
    }

    #[test]
    fn failed_wake_skips_the_settle() {
        let (mut ctx, mut remote) = joined(LinkBehaviour {
            wake_accepted: false,
            ..LinkBehaviour::NOMINAL
        });

        assert_eq!(block_on(remote.wake(&mut ctx)), LinkOutcome::Unreachable);
        assert_eq!(ctx.clock.now(), MissionInstant::BOOT);
        assert!(!remote.link().has_open_channel());
    }

    #[test]
    fn command_is_a_single_close_delimited_request() {
        let (mut ctx, mut remote) = joined(LinkBehaviour::NOMINAL);

        let outcome = block_on(remote.issue_command(&mut ctx, CameraCommand::StartRecording));
        assert_eq!(outcome, LinkOutcome::Sent);
        assert_eq!(
            remote.link().requests().collect::<heapless::Vec<_, 2>>().as_slice(),
            ["GET /gp/gpControl/command/shutter?p=1 HTTP/1.1\r\nHost: 10.5.5.9\r\nConnection: close\r\n\r\n"]
        );
        assert!(!remote.link().has_open_channel());
    }

    #[test]
    fn unreachable_camera_is_logged_once_without_retry() {
        let (mut ctx, mut remote) = joined(LinkBehaviour {
            reachable: false,
            ..LinkBehaviour::NOMINAL
        });

        let outcome = block_on(remote.issue_command(&mut ctx, CameraCommand::StopRecording));
        assert_eq!(outcome, LinkOutcome::Unreachable);
        assert_eq!(remote.link().connect_attempts(), 1);
        assert_eq!(
            ctx.log.sink().messages().last(),
            Some("Connection to camera failed")
        );
    }
}
