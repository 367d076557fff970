/**
 * Maneuvers
 *
 * Rotation (yaw spin) and slope (directional lean) commands, the bias
 * patterns they put on the motors, and the tilt ranges the correction loop
 * holds while a slope is active.
 *
 * Bias patterns are in MotorPosition order: [FL, FR, BL, BR].
 */

use std::fmt;
use std::str::FromStr;

use crate::config::{ControllerConfig, SlopePolicy};
use crate::error::QuadError;
use super::power::PowerDistribution;

/// Ordered: the numeric distance between two rotations scales the bias
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Rotation{
    Left = 0,
    Stay = 1,
    Right = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Slope{
    Stay = 0,
    Forward = 1,
    Backward = 2,
    Left = 3,
    Right = 4,
}

impl Rotation{
    pub fn from_u8(val: u8) -> Option<Self>{
        match val{
            0 => Some(Rotation::Left),
            1 => Some(Rotation::Stay),
            2 => Some(Rotation::Right),
            _ => None,
        }
    }
}

impl Slope{
    pub fn from_u8(val: u8) -> Option<Self>{
        match val{
            0 => Some(Slope::Stay),
            1 => Some(Slope::Forward),
            2 => Some(Slope::Backward),
            3 => Some(Slope::Left),
            4 => Some(Slope::Right),
            _ => None,
        }
    }
}

impl FromStr for Rotation{
    type Err = QuadError;

    fn from_str(s: &str) -> Result<Self, Self::Err>{
        match s.to_ascii_lowercase().as_str(){
            "left" | "l" => Ok(Rotation::Left),
            "stay" | "s" => Ok(Rotation::Stay),
            "right" | "r" => Ok(Rotation::Right),
            other => Err(QuadError::InvalidArgument(format!("unknown rotation '{}'", other))),
        }
    }
}

impl FromStr for Slope{
    type Err = QuadError;

    fn from_str(s: &str) -> Result<Self, Self::Err>{
        match s.to_ascii_lowercase().as_str(){
            "stay" | "s" => Ok(Slope::Stay),
            "forward" | "f" => Ok(Slope::Forward),
            "backward" | "b" => Ok(Slope::Backward),
            "left" | "l" => Ok(Slope::Left),
            "right" | "r" => Ok(Slope::Right),
            other => Err(QuadError::InvalidArgument(format!("unknown slope '{}'", other))),
        }
    }
}

impl fmt::Display for Rotation{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result{
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for Slope{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result{
        fmt::Debug::fmt(self, f)
    }
}

/// Accepted tilt band in degrees, inclusive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleRange{
    pub lo: f32,
    pub hi: f32,
}

impl AngleRange{
    pub const fn new(lo: f32, hi: f32) -> Self{
        Self{ lo, hi }
    }

    pub fn contains(&self, angle: f32) -> bool{
        angle >= self.lo && angle <= self.hi
    }
}

pub const STAY_RANGE: AngleRange = AngleRange::new(-1.0, 1.0);
pub const LEAN_POSITIVE: AngleRange = AngleRange::new(18.0, 22.0);
pub const LEAN_NEGATIVE: AngleRange = AngleRange::new(-22.0, -18.0);

/// (x range, y range) held while `slope` is active
pub fn ranges_for(slope: Slope) -> (AngleRange, AngleRange){
    match slope{
        Slope::Stay => (STAY_RANGE, STAY_RANGE),
        Slope::Forward => (LEAN_POSITIVE, STAY_RANGE),
        Slope::Backward => (LEAN_NEGATIVE, STAY_RANGE),
        Slope::Left => (STAY_RANGE, LEAN_NEGATIVE),
        Slope::Right => (STAY_RANGE, LEAN_POSITIVE),
    }
}

/// Bias for moving `diff` rotation steps: FL and BR go down, FR and BL go up
pub fn rotation_bias(diff: i32, magnitude: f32) -> [f32; 4]{
    let b = diff as f32 * magnitude;
    [-b, b, b, -b]
}

/// Bias added when `slope` becomes active
pub fn slope_bias(slope: Slope, magnitude: f32) -> [f32; 4]{
    let m = magnitude;
    match slope{
        Slope::Stay => [0.0; 4],
        Slope::Forward => [-m, -m, m, m],
        Slope::Backward => [m, m, -m, -m],
        Slope::Left => [-m, m, -m, m],
        Slope::Right => [m, -m, m, -m],
    }
}

fn negated(pattern: [f32; 4]) -> [f32; 4]{
    pattern.map(|b| -b)
}

/// Current qualitative mode plus the angle ranges derived from it.
///
/// Methods return whether motor biases were touched, in which case the
/// caller has to rebalance and commit.
#[derive(Debug, Clone, PartialEq)]
pub struct Maneuver{
    rotation: Rotation,
    slope: Slope,
    x_range: AngleRange,
    y_range: AngleRange,
    rotation_magnitude: f32,
    slope_magnitude: f32,
    policy: SlopePolicy,
}

impl Maneuver{
    pub fn new(config: &ControllerConfig) -> Self{
        let (x_range, y_range) = ranges_for(Slope::Stay);
        Self{
            rotation: Rotation::Stay,
            slope: Slope::Stay,
            x_range,
            y_range,
            rotation_magnitude: config.rotation_bias,
            slope_magnitude: config.slope_bias,
            policy: config.slope_policy,
        }
    }

    pub fn rotation(&self) -> Rotation{
        self.rotation
    }

    pub fn slope(&self) -> Slope{
        self.slope
    }

    pub fn x_range(&self) -> AngleRange{
        self.x_range
    }

    pub fn y_range(&self) -> AngleRange{
        self.y_range
    }

    fn enter_slope(&mut self, slope: Slope){
        self.slope = slope;
        let (x_range, y_range) = ranges_for(slope);
        self.x_range = x_range;
        self.y_range = y_range;
    }

    /// Drop any slope, taking its bias back off the motors
    pub fn clear_slope(&mut self, engine: &mut PowerDistribution) -> bool{
        if self.slope == Slope::Stay{
            return false;
        }
        engine.add_bias(negated(slope_bias(self.slope, self.slope_magnitude)));
        self.enter_slope(Slope::Stay);
        true
    }

    pub fn set_rotation(&mut self, engine: &mut PowerDistribution, rotation: Rotation, clear_slope: bool) -> bool{
        let mut touched = false;
        if clear_slope{
            touched |= self.clear_slope(engine);
        }
        if rotation == self.rotation{
            return touched;
        }

        //only one mode at a time: a rotation change drops the slope
        self.clear_slope(engine);

        let diff = rotation as i32 - self.rotation as i32;
        engine.add_bias(rotation_bias(diff, self.rotation_magnitude));
        self.rotation = rotation;
        true
    }

    pub fn set_slope(&mut self, engine: &mut PowerDistribution, slope: Slope, clear_rotation: bool) -> bool{
        let mut touched = false;
        if clear_rotation{
            touched |= self.set_rotation(engine, Rotation::Stay, false);
        }

        let act = match self.policy{
            SlopePolicy::MatchingOnly => slope == self.slope,
            SlopePolicy::Switch => slope != self.slope,
        };
        if !act{
            return touched;
        }

        engine.add_bias(negated(slope_bias(self.slope, self.slope_magnitude)));
        engine.add_bias(slope_bias(slope, self.slope_magnitude));
        self.enter_slope(slope);
        true
    }
}
