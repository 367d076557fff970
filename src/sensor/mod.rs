/**
 * Tilt sensing
 *
 * Sensor-side types shared by the drivers and the filter:
 * - TiltSample (two angles in degrees, yaw is not sensed)
 * - SensorDriver capability trait
 * - accelerometer -> tilt conversion
 */

pub mod filter;

pub use filter::TiltFilter;

use crate::error::Result;

/// Accelerometer counts per g at the +-2g range
pub const ACCEL_LSB_PER_G: f32 = 16384.0;

/// One tilt reading, degrees around the pitch/roll axes
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TiltSample{
    pub angle_x: f32,
    pub angle_y: f32,
}

impl TiltSample{
    pub fn new(angle_x: f32, angle_y: f32) -> Self{
        Self{ angle_x, angle_y }
    }
}

/// Source of tilt samples.
///
/// A failed read is not fatal: the control loop skips that sample and polls
/// again on the next tick.
pub trait SensorDriver: Send{
    fn read_tilt(&mut self) -> Result<TiltSample>;
}

impl<S: SensorDriver + ?Sized> SensorDriver for Box<S>{
    fn read_tilt(&mut self) -> Result<TiltSample>{
        (**self).read_tilt()
    }
}

/// Tilt from scaled accelerometer axes (in g)
pub fn tilt_from_accel(x: f32, y: f32, z: f32) -> TiltSample{
    TiltSample{
        angle_x: y.atan2(x.hypot(z)).to_degrees(),
        angle_y: x.atan2(y.hypot(z)).to_degrees(),
    }
}

/// Tilt from raw signed accelerometer registers
pub fn tilt_from_raw(x: i16, y: i16, z: i16) -> TiltSample{
    tilt_from_accel(
        x as f32 / ACCEL_LSB_PER_G,
        y as f32 / ACCEL_LSB_PER_G,
        z as f32 / ACCEL_LSB_PER_G,
    )
}

#[cfg(test)]
mod tests{
    use super::*;

    fn close(a: f32, b: f32) -> bool{
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_level_is_zero(){
        let t = tilt_from_accel(0.0, 0.0, 1.0);
        assert!(close(t.angle_x, 0.0));
        assert!(close(t.angle_y, 0.0));
    }

    #[test]
    fn test_axes_map_to_angles(){
        //y axis pointing half up -> x angle 45
        let t = tilt_from_accel(0.0, 1.0, 1.0);
        assert!(close(t.angle_x, 45.0));
        assert!(close(t.angle_y, 0.0));

        let t = tilt_from_accel(-1.0, 0.0, 1.0);
        assert!(close(t.angle_y, -45.0));
    }

    #[test]
    fn test_raw_scaling(){
        let t = tilt_from_raw(0, 16384, 0);
        assert!(close(t.angle_x, 90.0));
    }
}
