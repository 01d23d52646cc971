//! Monotonic time base shared by the sequencer and its collaborators.
//!
//! Every suspension point in a mission goes through [`MissionClock`], so the
//! firmware can back it with an embassy timer while tests and the emulator use
//! [`FakeClock`], which advances only when something sleeps on it. Instants are
//! measured from boot; nothing in the mission depends on calendar time.

use core::{fmt, ops::Add, time::Duration};

/// Microseconds elapsed since the controller booted.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MissionInstant(u64);

impl MissionInstant {
    /// The boot instant.
    pub const BOOT: Self = Self(0);

    #[must_use]
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros)
    }

    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(1_000))
    }

    #[must_use]
    pub const fn as_micros(self) -> u64 {
        self.0
    }

    /// Returns the saturating duration from `earlier` to `self`.
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }

    /// Time since boot broken into hours, minutes and seconds.
    #[must_use]
    pub const fn since_boot(self) -> Elapsed {
        Elapsed::from_instant(self)
    }
}

impl Add<Duration> for MissionInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        let micros = u64::try_from(rhs.as_micros()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(micros))
    }
}

/// Elapsed time since boot, rendered as `H:MM:SS` in log entries.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Elapsed {
    hours: u32,
    minutes: u8,
    seconds: u8,
}

impl Elapsed {
    #[must_use]
    pub const fn from_instant(instant: MissionInstant) -> Self {
        let total = instant.as_micros() / 1_000_000;
        #[allow(clippy::cast_possible_truncation)]
        Self {
            hours: (total / 3_600) as u32,
            minutes: ((total / 60) % 60) as u8,
            seconds: (total % 60) as u8,
        }
    }

    #[must_use]
    pub const fn hours(&self) -> u32 {
        self.hours
    }

    #[must_use]
    pub const fn minutes(&self) -> u8 {
        self.minutes
    }

    #[must_use]
    pub const fn seconds(&self) -> u8 {
        self.seconds
    }
}

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

/// Time source and scheduler for the single mission thread.
pub trait MissionClock {
    /// Current instant.
    fn now(&self) -> MissionInstant;

    /// Suspends until `deadline`. Returns immediately when it already passed.
    async fn sleep_until(&mut self, deadline: MissionInstant);

    /// Suspends for `duration` measured from now.
    async fn sleep_for(&mut self, duration: Duration) {
        let deadline = self.now() + duration;
        self.sleep_until(deadline).await;
    }

    /// Duration elapsed since `earlier`.
    fn elapsed_since(&self, earlier: MissionInstant) -> Duration {
        self.now().saturating_duration_since(earlier)
    }
}

/// Clock that only moves when slept on.
#[derive(Clone, Debug, Default)]
pub struct FakeClock {
    now: MissionInstant,
}

impl FakeClock {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: MissionInstant::BOOT,
        }
    }

    #[must_use]
    pub const fn starting_at(now: MissionInstant) -> Self {
        Self { now }
    }

    /// Moves time forward without suspending, e.g. to model slow I/O.
    pub fn advance(&mut self, duration: Duration) {
        self.now = self.now + duration;
    }
}

impl MissionClock for FakeClock {
    fn now(&self) -> MissionInstant {
        self.now
    }

    async fn sleep_until(&mut self, deadline: MissionInstant) {
        if deadline > self.now {
            self.now = deadline;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    #[test]
    fn elapsed_renders_hours_minutes_seconds() {
        let instant = MissionInstant::from_millis(((2 * 3_600) + (5 * 60) + 7) * 1_000 + 999);
        let elapsed = instant.since_boot();
        assert_eq!(elapsed.hours(), 2);
        assert_eq!(elapsed.minutes(), 5);
        assert_eq!(elapsed.seconds(), 7);

        let mut rendered = heapless::String::<16>::new();
        core::fmt::write(&mut rendered, format_args!("{elapsed}")).unwrap();
        assert_eq!(rendered.as_str(), "2:05:07");
    }

    #[test]
    fn fake_clock_never_moves_backwards() {
        let mut clock = FakeClock::starting_at(MissionInstant::from_millis(5_000));
        block_on(clock.sleep_until(MissionInstant::from_millis(1_000)));
        assert_eq!(clock.now(), MissionInstant::from_millis(5_000));

        block_on(clock.sleep_for(Duration::from_secs(2)));
        assert_eq!(clock.now(), MissionInstant::from_millis(7_000));
        assert_eq!(
            clock.elapsed_since(MissionInstant::from_millis(6_500)),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn instant_addition_saturates() {
        let near_end = MissionInstant::from_micros(u64::MAX - 1);
        assert_eq!(
            near_end + Duration::from_secs(1),
            MissionInstant::from_micros(u64::MAX)
        );
    }
}
