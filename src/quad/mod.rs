/**
 * Quadcopter stabilizer
 *
 * - power: main power + per-motor offsets -> clamped duty cycles
 * - maneuver: rotation/slope modes and their bias patterns
 * - indicator: one status LED per motor
 * - controller: locking, correction loop, startup and teardown
 */

pub mod controller;
pub mod indicator;
pub mod maneuver;
pub mod power;

pub use controller::{Controller, ControllerSnapshot, ShutdownGuard};
pub use indicator::{IndicatorBank, LedState};
pub use maneuver::{AngleRange, Maneuver, Rotation, Slope};
pub use power::{MotorPosition, MotorState, PowerDistribution, MAIN_POWER_MAX, MAIN_POWER_MIN};
