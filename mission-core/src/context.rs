//! State shared by every mission component: configuration, clock, event log
//! and indicators. Components borrow it per call instead of reaching for
//! globals.

use core::fmt;
use core::time::Duration;

use crate::clock::MissionClock;
use crate::config::MissionConfig;
use crate::io::{Indicator, StatusIndicators};
use crate::log::{EventLog, LogSink};

pub struct MissionContext<C, S, N> {
    pub config: MissionConfig,
    pub clock: C,
    pub log: EventLog<S>,
    pub indicators: N,
}

impl<C, S, N> MissionContext<C, S, N>
where
    C: MissionClock,
    S: LogSink,
    N: StatusIndicators,
{
    pub fn new(config: MissionConfig, clock: C, sink: S, indicators: N) -> Self {
        Self {
            config,
            clock,
            log: EventLog::new(sink),
            indicators,
        }
    }

    /// Appends `message` to the event log, stamped now.
    pub fn record(&mut self, message: &str) {
        let now = self.clock.now();
        self.log.append(now, message);
    }

    pub fn record_fmt(&mut self, args: fmt::Arguments<'_>) {
        let now = self.clock.now();
        self.log.append_fmt(now, args);
    }

    pub fn indicate(&mut self, indicator: Indicator, lit: bool) {
        self.indicators.set(indicator, lit);
    }

    pub async fn sleep_for(&mut self, duration: Duration) {
        self.clock.sleep_for(duration).await;
    }
}
