/**
 * Output capabilities
 *
 * The core never talks to a PWM peripheral or GPIO bank directly; it drives
 * these traits. Real hardware goes through `uart::SerialBridge`, tests and
 * `--sim` runs go through `sim`.
 */

use crate::error::Result;

/// Actuator channel identifier (the configured pin number)
pub type Channel = u8;

/// PWM output for one motor per channel. Duty is in percent.
pub trait ActuatorDriver: Send{
    /// Enable output on a channel at an initial duty cycle
    fn start(&mut self, channel: Channel, duty: f32) -> Result<()>;

    fn set_duty_cycle(&mut self, channel: Channel, duty: f32) -> Result<()>;

    /// Stop driving the channel
    fn stop(&mut self, channel: Channel) -> Result<()>;

    /// Give the channel back to the system
    fn release(&mut self, channel: Channel) -> Result<()>;
}

/// Digital output used for status indicators
pub trait IndicatorOutput: Send{
    fn set_level(&mut self, pin: u8, active: bool) -> Result<()>;

    fn release(&mut self, pin: u8) -> Result<()>;
}

impl<A: ActuatorDriver + ?Sized> ActuatorDriver for Box<A>{
    fn start(&mut self, channel: Channel, duty: f32) -> Result<()>{
        (**self).start(channel, duty)
    }

    fn set_duty_cycle(&mut self, channel: Channel, duty: f32) -> Result<()>{
        (**self).set_duty_cycle(channel, duty)
    }

    fn stop(&mut self, channel: Channel) -> Result<()>{
        (**self).stop(channel)
    }

    fn release(&mut self, channel: Channel) -> Result<()>{
        (**self).release(channel)
    }
}

impl<O: IndicatorOutput + ?Sized> IndicatorOutput for Box<O>{
    fn set_level(&mut self, pin: u8, active: bool) -> Result<()>{
        (**self).set_level(pin, active)
    }

    fn release(&mut self, pin: u8) -> Result<()>{
        (**self).release(pin)
    }
}
