/**
 * Timing helpers
 *
 * Clock measures elapsed time since its last restart.
 * LoopRate caps how often a loop body may run.
 */

use std::thread;
use std::time::{Duration, Instant};

use crate::error::{QuadError, Result};

#[derive(Debug, Clone, Copy)]
pub struct Clock{
    start: Instant,
}

impl Clock{
    pub fn new() -> Self{
        Self{ start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration{
        self.start.elapsed()
    }

    /// Returns the elapsed time and starts measuring again
    pub fn restart(&mut self) -> Duration{
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.start);
        self.start = now;
        elapsed
    }
}

impl Default for Clock{
    fn default() -> Self{
        Self::new()
    }
}

/// Sleeps at most long enough that consecutive `tick()` returns are one
/// period apart. Lost time is not made up on later ticks.
#[derive(Debug)]
pub struct LoopRate{
    frequency: f32,
    period: Duration,
    clock: Clock,
}

impl LoopRate{
    pub fn new(frequency: f32) -> Result<Self>{
        let mut rate = LoopRate{
            frequency: 1.0,
            period: Duration::from_secs(1),
            clock: Clock::new(),
        };
        rate.set_frequency(frequency)?;
        Ok(rate)
    }

    pub fn set_frequency(&mut self, frequency: f32) -> Result<()>{
        if !(frequency > 0.0) || !frequency.is_finite(){
            return Err(QuadError::InvalidArgument(
                format!("loop frequency must be greater than 0, got {}", frequency)
            ));
        }
        let period = Duration::try_from_secs_f64(1.0 / frequency as f64)
            .map_err(|_| QuadError::InvalidArgument(
                format!("loop frequency {} gives a period too long to represent", frequency)
            ))?;
        self.frequency = frequency;
        self.period = period;
        Ok(())
    }

    pub fn frequency(&self) -> f32{
        self.frequency
    }

    pub fn period(&self) -> Duration{
        self.period
    }

    /// Block out the rest of the period, then restart the reference point.
    /// Returns how long it slept.
    pub fn tick(&mut self) -> Duration{
        let remaining = self.period.saturating_sub(self.clock.elapsed());
        if !remaining.is_zero(){
            thread::sleep(remaining);
        }
        self.clock.restart();
        remaining
    }
}
