//! Lamp brightness ramps.
//!
//! The lamp is never switched hard: it ramps through every duty level so the
//! inrush stays low and the camera's exposure can follow. Ramping up is faster
//! than ramping down.

use crate::clock::MissionClock;
use crate::context::MissionContext;
use crate::io::{DutyOutput, StatusIndicators};
use crate::log::LogSink;

pub const MAX_LEVEL: u8 = u8::MAX;

pub struct IlluminationController<P> {
    output: P,
    level: u8,
}

impl<P: DutyOutput> IlluminationController<P> {
    pub fn new(mut output: P) -> Self {
        output.set_duty(0);
        Self { output, level: 0 }
    }

    /// Raises the duty one step at a time up to [`MAX_LEVEL`].
    pub async fn ramp_up<C, S, N>(&mut self, ctx: &mut MissionContext<C, S, N>)
    where
        C: MissionClock,
        S: LogSink,
        N: StatusIndicators,
    {
        for level in self.level..=MAX_LEVEL {
            self.apply(level);
            ctx.sleep_for(ctx.config.ramp_up_step).await;
        }
    }

    /// Lowers the duty one step at a time down to zero.
    pub async fn ramp_down<C, S, N>(&mut self, ctx: &mut MissionContext<C, S, N>)
    where
        C: MissionClock,
        S: LogSink,
        N: StatusIndicators,
    {
        for level in (0..=self.level).rev() {
            self.apply(level);
            ctx.sleep_for(ctx.config.ramp_down_step).await;
        }
    }

    #[must_use]
    pub const fn level(&self) -> u8 {
        self.level
    }

    #[must_use]
    pub const fn is_lit(&self) -> bool {
        self.level > 0
    }

    pub fn output(&self) -> &P {
        &self.output
    }

    fn apply(&mut self, level: u8) {
        self.level = level;
        self.output.set_duty(level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{FakeClock, MissionInstant};
    use crate::config::MissionConfig;
    use crate::sim::{LampBank, MemorySink, RecordingLamp};
    use embassy_futures::block_on;

    fn context() -> MissionContext<FakeClock, MemorySink, LampBank> {
        MissionContext::new(
            MissionConfig::reference(),
            FakeClock::new(),
            MemorySink::new(),
            LampBank::new(),
        )
    }

    #[test]
    fn ramp_up_visits_every_level_in_order() {
        let mut ctx = context();
        let mut lights = IlluminationController::new(RecordingLamp::new());
        block_on(lights.ramp_up(&mut ctx));

        let levels = lights.output().levels();
        // Initial zero from construction, then the ramp.
        assert_eq!(levels.len(), 1 + 256);
        assert!(levels.windows(2).skip(1).all(|pair| pair[1] == pair[0] + 1));
        assert_eq!(lights.level(), MAX_LEVEL);
        assert_eq!(ctx.clock.now(), MissionInstant::from_millis(2_560));
    }

    #[test]
    fn ramp_down_is_slower_and_monotone() {
        let mut ctx = context();
        let mut lights = IlluminationController::new(RecordingLamp::new());
        block_on(lights.ramp_up(&mut ctx));
        let lit_at = ctx.clock.now();
        block_on(lights.ramp_down(&mut ctx));

        let levels = lights.output().levels();
        let descent = &levels[257..];
        assert_eq!(descent.first(), Some(&MAX_LEVEL));
        assert_eq!(descent.last(), Some(&0));
        assert!(descent.windows(2).all(|pair| pair[1] + 1 == pair[0]));
        assert_eq!(
            ctx.clock.now().saturating_duration_since(lit_at),
            ctx.config.ramp_down_step * 256
        );
        assert!(!lights.is_lit());
    }
}
