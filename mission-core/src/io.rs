//! Physical I/O seams: trigger input, PWM lamp, burnwire switch and the status
//! indicators. Each trait is deliberately tiny so board support code maps it
//! onto one pin.

use core::fmt;

/// Digital input sampled by the trigger detector.
pub trait TriggerInput {
    /// Returns `true` while the trigger is asserted.
    fn is_asserted(&mut self) -> bool;
}

/// PWM output with an 8-bit duty cycle.
pub trait DutyOutput {
    fn set_duty(&mut self, level: u8);
}

/// Digital output driving a high-current load.
pub trait SwitchOutput {
    fn set_active(&mut self, active: bool);
}

/// Front-panel indicator lamps.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Indicator {
    /// Lit once the controller has power and is booting.
    Power,
    /// Lit once the launch trigger has been observed.
    TriggerArmed,
    /// Lit while the controller is joined to the camera's network.
    LinkConnected,
}

impl Indicator {
    pub const ALL: [Self; 3] = [Self::Power, Self::TriggerArmed, Self::LinkConnected];
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Indicator::Power => f.write_str("power"),
            Indicator::TriggerArmed => f.write_str("trigger-armed"),
            Indicator::LinkConnected => f.write_str("link-connected"),
        }
    }
}

/// Drives the indicator lamps.
pub trait StatusIndicators {
    fn set(&mut self, indicator: Indicator, lit: bool);
}
