/**
 * Power Distribution
 *
 * Turns main power plus per-motor offsets into four duty cycles.
 *
 * Each motor's offset is the sum of
 * - its maneuver bias (rotation/slope commands),
 * - the projection of the tilt-correction deltas (x, y) through TILT_MIX,
 * - a common shift that pulls the whole quad back inside [min, max] power.
 *
 * The shift is recomputed on every rebalance from the highest and lowest
 * projected duty, so relative differences between motors never change.
 */

use crate::actuator::{ActuatorDriver, Channel};
use crate::config::{ControllerConfig, QuadPins};
use crate::error::{QuadError, Result};
use crate::sensor::TiltSample;
use super::maneuver::AngleRange;

pub const MAIN_POWER_MIN: f32 = 0.0;
pub const MAIN_POWER_MAX: f32 = 10.0;

//       FL  y+  FR
//        \     /
//   x+     X     x-
//        /     \
//       BL  y-  BR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MotorPosition{
    FrontLeft,
    FrontRight,
    BackLeft,
    BackRight,
}

impl MotorPosition{
    pub const ALL: [MotorPosition; 4] = [
        MotorPosition::FrontLeft,
        MotorPosition::FrontRight,
        MotorPosition::BackLeft,
        MotorPosition::BackRight,
    ];

    pub fn index(self) -> usize{
        self as usize
    }

    /// Key used in pin configuration files
    pub fn name(self) -> &'static str{
        match self{
            MotorPosition::FrontLeft => "frontLeft",
            MotorPosition::FrontRight => "frontRight",
            MotorPosition::BackLeft => "backLeft",
            MotorPosition::BackRight => "backRight",
        }
    }
}

/// Contribution of the correction deltas to each motor
/// Rows: motors in MotorPosition order, Columns: [x_delta, y_delta]
pub const TILT_MIX: [[f32; 2]; 4] = [
    // front-left: left pair, front pair
    [0.5, 0.5],
    // front-right: right pair, front pair
    [-0.5, 0.5],
    // back-left
    [0.5, -0.5],
    // back-right
    [-0.5, -0.5],
];

#[derive(Debug, Clone, PartialEq)]
pub struct MotorState{
    pub position: MotorPosition,
    pub pin: u8,
    pub channel: Channel,
    /// Offset requested by maneuver commands
    pub bias: f32,
    /// Offset actually applied on top of main power
    pub power_delta: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Limits{
    min_power: f32,
    max_power: f32,
    step: f32,
    max_delta: f32,
    low_power_cutoff: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PowerDistribution{
    main_power: f32,
    motors: [MotorState; 4],
    x_delta: f32,
    y_delta: f32,
    limits: Limits,
}

impl PowerDistribution{
    pub fn new(pins: &QuadPins, config: &ControllerConfig) -> Self{
        let motors = MotorPosition::ALL.map(|position|{
            let pin = pins.get(position);
            MotorState{ position, pin, channel: pin, bias: 0.0, power_delta: 0.0 }
        });

        Self{
            main_power: 0.0,
            motors,
            x_delta: 0.0,
            y_delta: 0.0,
            limits: Limits{
                min_power: config.min_power,
                max_power: config.max_power,
                step: config.power_step,
                max_delta: config.max_delta,
                low_power_cutoff: config.low_power_cutoff,
            },
        }
    }

    pub fn main_power(&self) -> f32{
        self.main_power
    }

    pub fn x_delta(&self) -> f32{
        self.x_delta
    }

    pub fn y_delta(&self) -> f32{
        self.y_delta
    }

    pub fn motors(&self) -> &[MotorState; 4]{
        &self.motors
    }

    pub fn channels(&self) -> [Channel; 4]{
        std::array::from_fn(|i| self.motors[i].channel)
    }

    /// Rejects anything outside [0, 10] without touching state
    pub fn set_main_power(&mut self, power: f32) -> Result<()>{
        if !(MAIN_POWER_MIN..=MAIN_POWER_MAX).contains(&power){
            return Err(QuadError::OutOfRange{
                value: power,
                min: MAIN_POWER_MIN,
                max: MAIN_POWER_MAX,
            });
        }
        self.main_power = power;
        self.rebalance();
        Ok(())
    }

    /// One integral step of tilt correction.
    ///
    /// Each axis moves its delta by one step against the side of the range the
    /// angle has left, and never beyond +-(max_delta - step). Below the
    /// low-power cutoff the deltas are reset instead.
    pub fn apply_tilt_correction(&mut self, tilt: TiltSample, x_range: AngleRange, y_range: AngleRange){
        if self.main_power < self.limits.low_power_cutoff{
            self.x_delta = 0.0;
            self.y_delta = 0.0;
            return;
        }
        self.x_delta = self.step_axis(self.x_delta, tilt.angle_x, x_range);
        self.y_delta = self.step_axis(self.y_delta, tilt.angle_y, y_range);
    }

    fn step_axis(&self, delta: f32, angle: f32, range: AngleRange) -> f32{
        let Limits{ step, max_delta, .. } = self.limits;
        if angle < range.lo{
            if delta <= max_delta - step{
                return delta + step;
            }
        }else if angle > range.hi{
            if delta >= -max_delta + step{
                return delta - step;
            }
        }
        delta
    }

    /// Project the correction deltas onto the motors on top of their bias,
    /// then clamp the quad as a whole
    pub fn distribute(&mut self, x_delta: f32, y_delta: f32){
        self.x_delta = x_delta;
        self.y_delta = y_delta;
        for (motor, mix) in self.motors.iter_mut().zip(TILT_MIX.iter()){
            motor.power_delta = motor.bias + mix[0] * x_delta + mix[1] * y_delta;
        }
        self.clamp_shift();
    }

    /// Redistribute with the current deltas
    pub fn rebalance(&mut self){
        self.distribute(self.x_delta, self.y_delta);
    }

    /// Add a maneuver bias pattern (motor order) to the motor biases.
    /// Takes effect on the next rebalance.
    pub fn add_bias(&mut self, pattern: [f32; 4]){
        for (motor, b) in self.motors.iter_mut().zip(pattern){
            motor.bias += b;
        }
    }

    /// Shift all four offsets by the same amount so every duty lies inside
    /// [min_power, max_power]. Returns the shift applied.
    ///
    /// If the spread alone is wider than the band, the upper bound wins.
    pub fn clamp_shift(&mut self) -> f32{
        let duties = self.duties();
        let max = duties.iter().copied().fold(f32::MIN, f32::max);
        let min = duties.iter().copied().fold(f32::MAX, f32::min);

        let shift = if max > self.limits.max_power{
            self.limits.max_power - max
        }else if min < self.limits.min_power{
            (self.limits.min_power - min).min(self.limits.max_power - max)
        }else{
            0.0
        };

        if max - min > self.limits.max_power - self.limits.min_power{
            log::warn!("motor spread {:.3} exceeds power band, favouring the upper bound", max - min);
        }

        if shift != 0.0{
            for motor in self.motors.iter_mut(){
                motor.power_delta += shift;
            }
        }
        shift
    }

    /// Duty cycle per motor, in MotorPosition order
    pub fn duties(&self) -> [f32; 4]{
        std::array::from_fn(|i| self.main_power + self.motors[i].power_delta)
    }

    /// Write all four duty cycles in one pass
    pub fn commit(&self, actuator: &mut dyn ActuatorDriver) -> Result<[f32; 4]>{
        let duties = self.duties();
        for (motor, duty) in self.motors.iter().zip(duties){
            actuator.set_duty_cycle(motor.channel, duty)?;
        }
        Ok(duties)
    }
}

#[cfg(test)]
mod tests{
    use super::*;
    use crate::quad::maneuver::STAY_RANGE;
    use crate::sim::SimActuator;

    const EPS: f32 = 1e-5;

    fn engine() -> PowerDistribution{
        PowerDistribution::new(&QuadPins{
            front_left: 20, front_right: 12, back_left: 21, back_right: 16,
        }, &ControllerConfig::default())
    }

    fn assert_close(a: f32, b: f32){
        assert!((a - b).abs() < EPS, "{} != {}", a, b);
    }

    #[test]
    fn test_main_power_range(){
        let mut e = engine();
        e.set_main_power(6.0).unwrap();
        let before = e.clone();

        assert!(e.set_main_power(-1.0).unwrap_err().is_out_of_range());
        assert!(e.set_main_power(11.0).unwrap_err().is_out_of_range());
        assert!(e.set_main_power(f32::NAN).is_err());
        assert_eq!(e, before);

        e.set_main_power(0.0).unwrap();
        e.set_main_power(10.0).unwrap();
    }

    #[test]
    fn test_low_main_power_lifted_to_min(){
        let mut e = engine();
        e.set_main_power(2.0).unwrap();
        for d in e.duties(){
            assert_close(d, 5.0);
        }
    }

    #[test]
    fn test_x_correction_above_range(){
        let mut e = engine();
        e.set_main_power(6.0).unwrap();

        let x_range = AngleRange::new(18.0, 22.0);
        e.apply_tilt_correction(TiltSample::new(25.0, 0.0), x_range, STAY_RANGE);
        e.rebalance();

        //above hi -> one step down
        assert_close(e.x_delta(), -0.08);
        assert_close(e.y_delta(), 0.0);
        let d = e.duties();
        assert_close(d[0], d[2]);
        assert_close(d[1], d[3]);
        assert_close(d[0] - d[1], e.x_delta());
    }

    #[test]
    fn test_x_correction_below_range(){
        let mut e = engine();
        e.set_main_power(6.0).unwrap();

        e.apply_tilt_correction(TiltSample::new(15.0, 0.0), AngleRange::new(18.0, 22.0), STAY_RANGE);
        e.rebalance();

        assert_close(e.x_delta(), 0.08);
        let d = e.duties();
        //left pair above right pair by exactly x_delta
        assert_close(d[0] - d[1], 0.08);
        assert_close(d[2] - d[3], 0.08);
        assert_close(d[0], 6.04);
    }

    #[test]
    fn test_y_correction_front_back(){
        let mut e = engine();
        e.set_main_power(7.0).unwrap();
        e.apply_tilt_correction(TiltSample::new(0.0, -3.0), STAY_RANGE, STAY_RANGE);
        e.rebalance();

        assert_close(e.y_delta(), 0.08);
        let d = e.duties();
        assert_close(d[0] - d[2], 0.08);
        assert_close(d[1] - d[3], 0.08);
    }

    #[test]
    fn test_delta_saturates(){
        let mut e = engine();
        e.set_main_power(7.0).unwrap();
        for _ in 0..200{
            e.apply_tilt_correction(TiltSample::new(-40.0, 40.0), STAY_RANGE, STAY_RANGE);
        }
        assert!(e.x_delta() <= 2.0 + EPS);
        assert!(e.x_delta() > 2.0 - 0.08 - EPS);
        assert!(e.y_delta() >= -2.0 - EPS);
        assert!(e.y_delta() < -2.0 + 0.08 + EPS);
    }

    #[test]
    fn test_inside_range_holds_delta(){
        let mut e = engine();
        e.set_main_power(7.0).unwrap();
        e.apply_tilt_correction(TiltSample::new(-5.0, 0.0), STAY_RANGE, STAY_RANGE);
        e.apply_tilt_correction(TiltSample::new(0.0, 1.0), STAY_RANGE, STAY_RANGE);
        assert_close(e.x_delta(), 0.08);
        assert_close(e.y_delta(), 0.0);
    }

    #[test]
    fn test_low_power_resets_deltas(){
        let mut e = engine();
        e.set_main_power(7.0).unwrap();
        e.apply_tilt_correction(TiltSample::new(-5.0, 5.0), STAY_RANGE, STAY_RANGE);
        assert!(e.x_delta() != 0.0);

        e.set_main_power(5.2).unwrap();
        e.apply_tilt_correction(TiltSample::new(-5.0, 5.0), STAY_RANGE, STAY_RANGE);
        assert_eq!((e.x_delta(), e.y_delta()), (0.0, 0.0));
    }

    #[test]
    fn test_distribute_adds_to_bias(){
        let mut e = engine();
        e.set_main_power(7.0).unwrap();
        e.add_bias([-0.15, 0.15, 0.15, -0.15]);
        e.distribute(0.4, 0.2);

        let d = e.duties();
        assert_close(d[0], 7.0 - 0.15 + 0.2 + 0.1);
        assert_close(d[1], 7.0 + 0.15 - 0.2 + 0.1);
        assert_close(d[2], 7.0 + 0.15 + 0.2 - 0.1);
        assert_close(d[3], 7.0 - 0.15 - 0.2 - 0.1);

        //redistributing does not integrate twice
        e.distribute(0.4, 0.2);
        assert_close(e.duties()[0], d[0]);
    }

    #[test]
    fn test_clamp_preserves_relative_differences(){
        let cases: [(f32, f32, f32); 5] = [
            (9.8, 2.0, 2.0),
            (5.1, -2.0, 1.5),
            (10.0, -1.2, 0.3),
            (5.0, 2.0, -2.0),
            (7.5, 0.0, 0.0),
        ];
        for (power, x, y) in cases{
            let mut e = engine();
            e.set_main_power(power).unwrap();
            e.add_bias([0.3, -0.3, -0.3, 0.3]);

            let raw: Vec<f32> = e.motors().iter().zip(TILT_MIX.iter())
                .map(|(m, mix)| power + m.bias + mix[0] * x + mix[1] * y)
                .collect();
            e.distribute(x, y);
            let d = e.duties();

            let max = d.iter().copied().fold(f32::MIN, f32::max);
            let min = d.iter().copied().fold(f32::MAX, f32::min);
            assert!(max <= 10.0 + EPS, "max {} for {:?}", max, (power, x, y));
            assert!(min >= 5.0 - EPS, "min {} for {:?}", min, (power, x, y));

            let shift = d[0] - raw[0];
            for i in 1..4{
                assert_close(d[i] - raw[i], shift);
            }
        }
    }

    #[test]
    fn test_commit_writes_all_four_in_order(){
        let probe = SimActuator::new();
        let mut actuator = probe.clone();
        let mut e = engine();
        e.set_main_power(6.5).unwrap();

        let duties = e.commit(&mut actuator).unwrap();
        assert_eq!(duties, [6.5; 4]);
        assert_eq!(probe.writes_since(0), vec![(20, 6.5), (12, 6.5), (21, 6.5), (16, 6.5)]);
    }
}
