/**
 * Configuration
 *
 * PinConfig: motor and indicator pin assignments, keyed by logical motor name
 * (frontLeft, frontRight, backLeft, backRight), loaded once at startup.
 *
 * ControllerConfig: every tunable of the stabilizer, all optional in JSON.
 */

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{QuadError, Result};
use crate::quad::MotorPosition;
use crate::timing::LoopRate;

/// One pin per motor position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuadPins{
    pub front_left: u8,
    pub front_right: u8,
    pub back_left: u8,
    pub back_right: u8,
}

impl QuadPins{
    pub fn get(&self, position: MotorPosition) -> u8{
        match position{
            MotorPosition::FrontLeft => self.front_left,
            MotorPosition::FrontRight => self.front_right,
            MotorPosition::BackLeft => self.back_left,
            MotorPosition::BackRight => self.back_right,
        }
    }

    /// Pins in motor index order
    pub fn to_array(&self) -> [u8; 4]{
        MotorPosition::ALL.map(|p| self.get(p))
    }

    fn from_json(json: &str, what: &str) -> Result<Self>{
        serde_json::from_str(json)
            .map_err(|e| QuadError::Config(format!("{} pins: {}", what, e)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinConfig{
    pub motors: QuadPins,
    pub leds: QuadPins,
}

impl PinConfig{
    pub fn from_json_str(motors_json: &str, leds_json: &str) -> Result<Self>{
        Ok(PinConfig{
            motors: QuadPins::from_json(motors_json, "motor")?,
            leds: QuadPins::from_json(leds_json, "led")?,
        })
    }

    /// Read the two pin maps from separate JSON files
    pub fn load(motor_path: impl AsRef<Path>, led_path: impl AsRef<Path>) -> Result<Self>{
        let motors = read_file(motor_path.as_ref())?;
        let leds = read_file(led_path.as_ref())?;
        Self::from_json_str(&motors, &leds)
    }
}

impl Default for PinConfig{
    //BCM pins of the reference airframe
    fn default() -> Self{
        PinConfig{
            motors: QuadPins{ front_left: 20, front_right: 12, back_left: 21, back_right: 16 },
            leds: QuadPins{ front_left: 6, front_right: 26, back_left: 13, back_right: 19 },
        }
    }
}

/// How `set_slope` treats a request for a slope other than the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SlopePolicy{
    /// Only a request matching the current slope is acted on (and nets to
    /// zero); any other slope is ignored
    #[default]
    MatchingOnly,
    /// Remove the current slope bias and apply the requested one
    Switch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig{
    pub min_power: f32,
    pub max_power: f32,
    /// Tilt correction step per tick
    pub power_step: f32,
    pub max_delta: f32,
    pub rotation_bias: f32,
    pub slope_bias: f32,
    /// Below this main power no tilt correction is integrated
    pub low_power_cutoff: f32,
    pub safe_duty: f32,
    pub startup_duty: f32,
    pub test_duty: f32,
    /// Main power after the self-test
    pub idle_power: f32,

    pub samples_per_tick: usize,
    pub sample_spacing_ms: u64,
    pub loop_frequency: f32,
    pub round_precision: i32,
    pub indicator_interval_ms: u64,

    pub arm_wait_ms: u64,
    pub motor_test_ms: u64,
    pub blink_count: u32,
    pub blink_ms: u64,
    pub teardown_pause_ms: u64,

    pub slope_policy: SlopePolicy,
}

impl Default for ControllerConfig{
    fn default() -> Self{
        ControllerConfig{
            min_power: 5.0,
            max_power: 10.0,
            power_step: 0.08,
            max_delta: 2.0,
            rotation_bias: 0.15,
            slope_bias: 0.125,
            low_power_cutoff: 5.5,
            safe_duty: 5.0,
            startup_duty: 4.0,
            test_duty: 5.7,
            idle_power: 5.0,

            samples_per_tick: 3,
            sample_spacing_ms: 60,
            loop_frequency: 30.0,
            round_precision: 0,
            indicator_interval_ms: 2000,

            arm_wait_ms: 5000,
            motor_test_ms: 2000,
            blink_count: 3,
            blink_ms: 300,
            teardown_pause_ms: 500,

            slope_policy: SlopePolicy::MatchingOnly,
        }
    }
}

impl ControllerConfig{
    /// Defaults with every wait set to zero
    #[cfg(test)]
    pub fn instant() -> Self{
        ControllerConfig{
            sample_spacing_ms: 0,
            loop_frequency: 1000.0,
            indicator_interval_ms: 0,
            arm_wait_ms: 0,
            motor_test_ms: 0,
            blink_ms: 0,
            teardown_pause_ms: 0,
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self>{
        let config: Self = serde_json::from_str(json)
            .map_err(|e| QuadError::Config(format!("controller config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self>{
        Self::from_json_str(&read_file(path.as_ref())?)
    }

    pub fn validate(&self) -> Result<()>{
        if !(self.min_power < self.max_power){
            return Err(QuadError::InvalidArgument(format!(
                "min_power {} must be below max_power {}", self.min_power, self.max_power
            )));
        }
        LoopRate::new(self.loop_frequency)?;
        if self.round_precision < -1{
            return Err(QuadError::InvalidArgument(format!(
                "round_precision must be >= -1, got {}", self.round_precision
            )));
        }
        if self.samples_per_tick == 0{
            return Err(QuadError::InvalidArgument("samples_per_tick must be at least 1".into()));
        }
        if self.power_step <= 0.0 || self.max_delta < self.power_step{
            return Err(QuadError::InvalidArgument(format!(
                "power_step {} must be positive and not above max_delta {}",
                self.power_step, self.max_delta
            )));
        }
        Ok(())
    }

    pub fn sample_spacing(&self) -> Duration{
        Duration::from_millis(self.sample_spacing_ms)
    }

    pub fn indicator_interval(&self) -> Duration{
        Duration::from_millis(self.indicator_interval_ms)
    }

    pub fn arm_wait(&self) -> Duration{
        Duration::from_millis(self.arm_wait_ms)
    }

    pub fn motor_test(&self) -> Duration{
        Duration::from_millis(self.motor_test_ms)
    }

    pub fn blink(&self) -> Duration{
        Duration::from_millis(self.blink_ms)
    }

    pub fn teardown_pause(&self) -> Duration{
        Duration::from_millis(self.teardown_pause_ms)
    }
}

fn read_file(path: &Path) -> Result<String>{
    fs::read_to_string(path)
        .map_err(|e| QuadError::Config(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests{
    use super::*;

    #[test]
    fn test_pins_by_motor_name(){
        let motors = r#"{"frontLeft": 20, "frontRight": 12, "backLeft": 21, "backRight": 16}"#;
        let leds = r#"{"backRight": 19, "backLeft": 13, "frontRight": 26, "frontLeft": 6}"#;
        let pins = PinConfig::from_json_str(motors, leds).unwrap();

        assert_eq!(pins, PinConfig::default());
        assert_eq!(pins.motors.get(MotorPosition::BackLeft), 21);
        assert_eq!(pins.leds.to_array(), [6, 26, 13, 19]);
    }

    #[test]
    fn test_missing_motor_is_config_error(){
        let motors = r#"{"frontLeft": 20, "frontRight": 12, "backLeft": 21}"#;
        let leds = r#"{"frontLeft": 6, "frontRight": 26, "backLeft": 13, "backRight": 19}"#;
        let err = PinConfig::from_json_str(motors, leds).unwrap_err();
        assert!(matches!(err, QuadError::Config(_)));
    }

    #[test]
    fn test_partial_controller_config_uses_defaults(){
        let config = ControllerConfig::from_json_str(
            r#"{"loop_frequency": 50.0, "slope_policy": "Switch"}"#
        ).unwrap();
        assert_eq!(config.loop_frequency, 50.0);
        assert_eq!(config.slope_policy, SlopePolicy::Switch);
        assert_eq!(config.power_step, 0.08);
        assert_eq!(config.sample_spacing(), Duration::from_millis(60));
    }

    #[test]
    fn test_validate_rejects_bad_values(){
        assert!(ControllerConfig::from_json_str(r#"{"loop_frequency": 0.0}"#).is_err());
        assert!(ControllerConfig::from_json_str(r#"{"round_precision": -2}"#).is_err());
        assert!(ControllerConfig::from_json_str(r#"{"min_power": 10.0}"#).is_err());
        assert!(ControllerConfig::from_json_str(r#"{"samples_per_tick": 0}"#).is_err());
        let err = ControllerConfig::from_json_str(r#"{"loop_frequency": 1e-20}"#).unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(ControllerConfig::default().validate().is_ok());
        assert!(ControllerConfig::instant().validate().is_ok());
    }
}
