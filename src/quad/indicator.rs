/**
 * Status indicators
 *
 * One LED per motor position. Not safety relevant: the bank has its own lock
 * and never looks at the motor power state.
 */

use std::thread;
use std::time::Duration;

use crate::actuator::IndicatorOutput;
use crate::config::QuadPins;
use crate::error::Result;
use super::power::MotorPosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedState{
    pub pin: u8,
    pub active: bool,
}

pub struct IndicatorBank{
    output: Box<dyn IndicatorOutput>,
    leds: [LedState; 4],
    released: bool,
}

impl IndicatorBank{
    pub fn new(pins: &QuadPins, output: Box<dyn IndicatorOutput>) -> Self{
        Self{
            output,
            leds: pins.to_array().map(|pin| LedState{ pin, active: false }),
            released: false,
        }
    }

    pub fn states(&self) -> [LedState; 4]{
        self.leds
    }

    pub fn is_released(&self) -> bool{
        self.released
    }

    pub fn set(&mut self, position: MotorPosition, active: bool) -> Result<()>{
        if self.released{
            return Ok(());
        }
        let led = &mut self.leds[position.index()];
        self.output.set_level(led.pin, active)?;
        led.active = active;
        Ok(())
    }

    pub fn set_all(&mut self, active: bool) -> Result<()>{
        for position in MotorPosition::ALL{
            self.set(position, active)?;
        }
        Ok(())
    }

    pub fn all_off(&mut self) -> Result<()>{
        self.set_all(false)
    }

    /// Flip every LED; lit ones go dark and vice versa
    pub fn toggle_all(&mut self) -> Result<()>{
        for position in MotorPosition::ALL{
            let active = self.leds[position.index()].active;
            self.set(position, !active)?;
        }
        Ok(())
    }

    /// Flash everything `count` times
    pub fn blink(&mut self, count: u32, period: Duration) -> Result<()>{
        for _ in 0..count{
            self.set_all(true)?;
            thread::sleep(period);
            self.set_all(false)?;
            thread::sleep(period);
        }
        Ok(())
    }

    /// Ready pattern: one diagonal lit, so the periodic toggle alternates the
    /// two diagonals
    pub fn show_ready(&mut self) -> Result<()>{
        self.all_off()?;
        self.set(MotorPosition::FrontLeft, true)?;
        self.set(MotorPosition::BackRight, true)
    }

    /// Switch every pin off and hand it back. Safe to call repeatedly.
    pub fn release_all(&mut self) -> Result<()>{
        if self.released{
            return Ok(());
        }
        let mut first_err = None;
        for led in self.leds.iter_mut(){
            let result = self.output.set_level(led.pin, false)
                .and_then(|_| self.output.release(led.pin));
            led.active = false;
            if let Err(e) = result{
                log::error!("failed to release indicator pin {}: {}", led.pin, e);
                first_err.get_or_insert(e);
            }
        }
        self.released = true;
        match first_err{
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
