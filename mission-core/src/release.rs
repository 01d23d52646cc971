//! Ballast release through a burnwire.

use crate::clock::MissionClock;
use crate::config::ReleasePolicy;
use crate::context::MissionContext;
use crate::io::{StatusIndicators, SwitchOutput};
use crate::log::LogSink;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ReleaseOutcome {
    /// The burnwire was energised for the full hold.
    Fired,
    /// The policy refused a repeat release.
    Suppressed,
}

/// Energises the burnwire for the configured hold. There is no feedback; a
/// completed hold is assumed to have parted the wire.
pub struct ReleaseActuator<O> {
    output: O,
    fired: u8,
    suppressed: u8,
}

impl<O: SwitchOutput> ReleaseActuator<O> {
    pub fn new(mut output: O) -> Self {
        output.set_active(false);
        Self {
            output,
            fired: 0,
            suppressed: 0,
        }
    }

    pub async fn release<C, S, N>(&mut self, ctx: &mut MissionContext<C, S, N>) -> ReleaseOutcome
    where
        C: MissionClock,
        S: LogSink,
        N: StatusIndicators,
    {
        if self.fired > 0 && ctx.config.release_policy == ReleasePolicy::AtMostOnce {
            self.suppressed = self.suppressed.saturating_add(1);
            ctx.record("Release already fired");
            return ReleaseOutcome::Suppressed;
        }

        ctx.record("Burning wire");
        self.output.set_active(true);
        ctx.clock.sleep_for(ctx.config.release_hold).await;
        self.output.set_active(false);
        self.fired = self.fired.saturating_add(1);
        ctx.record("Burn complete");
        ReleaseOutcome::Fired
    }

    #[must_use]
    pub const fn fired(&self) -> u8 {
        self.fired
    }

    #[must_use]
    pub const fn suppressed(&self) -> u8 {
        self.suppressed
    }

    pub fn output(&self) -> &O {
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{FakeClock, MissionInstant};
    use crate::config::MissionConfig;
    use crate::sim::{LampBank, MemorySink, RecordingSwitch};
    use core::time::Duration;
    use embassy_futures::block_on;

    fn context(policy: ReleasePolicy) -> MissionContext<FakeClock, MemorySink, LampBank> {
        let config = MissionConfig::reference()
            .with_release_hold(Duration::from_secs(600))
            .with_release_policy(policy);
        MissionContext::new(config, FakeClock::new(), MemorySink::new(), LampBank::new())
    }

    #[test]
    fn holds_the_output_for_the_configured_time() {
        let mut ctx = context(ReleasePolicy::AtMostOnce);
        let mut release = ReleaseActuator::new(RecordingSwitch::new());

        assert_eq!(block_on(release.release(&mut ctx)), ReleaseOutcome::Fired);
        assert_eq!(ctx.clock.now(), MissionInstant::from_millis(600_000));
        assert_eq!(release.output().transitions(), &[false, true, false]);
        assert!(!release.output().is_active());
        assert_eq!(ctx.log.sink().text(), "0:00:00\tBurning wire\n0:10:00\tBurn complete\n");
    }

    #[test]
    fn at_most_once_suppresses_repeats() {
        let mut ctx = context(ReleasePolicy::AtMostOnce);
        let mut release = ReleaseActuator::new(RecordingSwitch::new());

        block_on(release.release(&mut ctx));
        let after_first = ctx.clock.now();
        assert_eq!(block_on(release.release(&mut ctx)), ReleaseOutcome::Suppressed);

        assert_eq!(ctx.clock.now(), after_first);
        assert_eq!((release.fired(), release.suppressed()), (1, 1));
        assert_eq!(release.output().activations(), 1);
    }

    #[test]
    fn every_request_fires_again() {
        let mut ctx = context(ReleasePolicy::EveryRequest);
        let mut release = ReleaseActuator::new(RecordingSwitch::new());

        block_on(release.release(&mut ctx));
        assert_eq!(block_on(release.release(&mut ctx)), ReleaseOutcome::Fired);
        assert_eq!(release.output().activations(), 2);
    }
}
