use thiserror::Error;

/// Errors raised by the stabilizer core and its drivers
#[derive(Debug, Error)]
pub enum QuadError{
    /// A parameter was rejected before any state was touched
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("value {value} out of range [{min}, {max}]")]
    OutOfRange{ value: f32, min: f32, max: f32 },

    /// Sensor or actuator fault
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("configuration error: {0}")]
    Config(String),

    /// The controller has been torn down and no longer accepts commands
    #[error("controller is shut down")]
    ShutDown,

    /// SIGINT/SIGTERM arrived while a blocking sequence was running
    #[error("interrupted")]
    Interrupted,
}

impl QuadError{
    pub fn is_out_of_range(&self) -> bool{
        matches!(self, QuadError::OutOfRange{ .. })
    }

    pub fn is_invalid_argument(&self) -> bool{
        matches!(self, QuadError::InvalidArgument(_))
    }
}

pub type Result<T> = std::result::Result<T, QuadError>;
