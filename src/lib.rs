pub mod error;
pub mod ring_buffer;
pub mod sensor;
pub mod timing;
pub mod actuator;
pub mod sim;
pub mod config;
pub mod quad;
pub mod uart;
pub mod signal;
pub mod ffi;

#[cfg(feature = "python")]
pub mod python;

pub use error::{QuadError, Result};
pub use ring_buffer::RingBuffer;
pub use config::{ControllerConfig, PinConfig, QuadPins, SlopePolicy};
pub use sensor::{SensorDriver, TiltFilter, TiltSample};
pub use actuator::{ActuatorDriver, Channel, IndicatorOutput};
pub use timing::{Clock, LoopRate};

pub use quad::{
    Controller, ControllerSnapshot, ShutdownGuard,
    MotorPosition, PowerDistribution,
    Maneuver, Rotation, Slope, AngleRange,
    IndicatorBank, LedState,
};
