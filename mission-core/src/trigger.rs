//! Launch trigger.

use core::time::Duration;

use crate::clock::{MissionClock, MissionInstant};
use crate::context::MissionContext;
use crate::io::{Indicator, StatusIndicators, TriggerInput};
use crate::log::LogSink;

/// Gap between reads of the trigger input.
pub const TRIGGER_POLL_INTERVAL: Duration = Duration::from_millis(1);

pub struct TriggerDetector<T> {
    input: T,
}

impl<T: TriggerInput> TriggerDetector<T> {
    pub const fn new(input: T) -> Self {
        Self { input }
    }

    /// Waits for the trigger without timeout or debounce, lights the armed
    /// indicator and returns when it was seen.
    pub async fn await_trigger<C, S, N>(
        &mut self,
        ctx: &mut MissionContext<C, S, N>,
    ) -> MissionInstant
    where
        C: MissionClock,
        S: LogSink,
        N: StatusIndicators,
    {
        while !self.input.is_asserted() {
            ctx.sleep_for(TRIGGER_POLL_INTERVAL).await;
        }
        ctx.indicate(Indicator::TriggerArmed, true);
        ctx.clock.now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::config::MissionConfig;
    use crate::sim::{LampBank, MemorySink, ScriptedTrigger};
    use embassy_futures::block_on;

    #[test]
    fn returns_once_asserted_and_lights_the_armed_lamp() {
        let mut ctx = MissionContext::new(
            MissionConfig::reference(),
            FakeClock::new(),
            MemorySink::new(),
            LampBank::new(),
        );
        let mut trigger = TriggerDetector::new(ScriptedTrigger::after_polls(250));

        assert!(!ctx.indicators.is_lit(Indicator::TriggerArmed));
        let seen = block_on(trigger.await_trigger(&mut ctx));

        assert_eq!(seen, MissionInstant::from_millis(250));
        assert!(ctx.indicators.is_lit(Indicator::TriggerArmed));
    }
}
