//payloads exchanged with the motor/IMU microcontroller, little-endian

#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default)]
pub struct RawAccelMsg{
    pub accel_x: i16,     //raw counts, +-2g range
    pub accel_y: i16,
    pub accel_z: i16,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default)]
pub struct TiltMsg{
    pub angle_x: f32,     //degrees
    pub angle_y: f32,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default)]
pub struct DutyCmd{
    pub channel: u8,
    pub duty: f32,        //percent
}

#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default)]
pub struct ChannelCmd{
    pub channel: u8,
}

#[repr(C, packed)]
#[derive(Clone, Copy, Debug, Default)]
pub struct IndicatorCmd{
    pub pin: u8,
    pub level: u8,
}

//message sizes
pub const RAW_ACCEL_MSG_SIZE: usize = 6;   //3 * i16
pub const TILT_MSG_SIZE: usize = 8;        //2 * f32
pub const DUTY_CMD_SIZE: usize = 5;        //u8 + f32
pub const CHANNEL_CMD_SIZE: usize = 1;
pub const INDICATOR_CMD_SIZE: usize = 2;

impl RawAccelMsg{
    pub fn from_bytes(data: &[u8]) -> Option<Self>{
        if data.len() < RAW_ACCEL_MSG_SIZE{
            return None;
        }
        Some(RawAccelMsg{
            accel_x: i16::from_le_bytes([data[0], data[1]]),
            accel_y: i16::from_le_bytes([data[2], data[3]]),
            accel_z: i16::from_le_bytes([data[4], data[5]]),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8>{
        let (x, y, z) = (self.accel_x, self.accel_y, self.accel_z);
        let mut bytes = Vec::with_capacity(RAW_ACCEL_MSG_SIZE);
        bytes.extend_from_slice(&x.to_le_bytes());
        bytes.extend_from_slice(&y.to_le_bytes());
        bytes.extend_from_slice(&z.to_le_bytes());
        bytes
    }
}

impl TiltMsg{
    pub fn from_bytes(data: &[u8]) -> Option<Self>{
        if data.len() < TILT_MSG_SIZE{
            return None;
        }
        Some(TiltMsg{
            angle_x: f32::from_le_bytes([data[0], data[1], data[2], data[3]]),
            angle_y: f32::from_le_bytes([data[4], data[5], data[6], data[7]]),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8>{
        let (x, y) = (self.angle_x, self.angle_y);
        let mut bytes = Vec::with_capacity(TILT_MSG_SIZE);
        bytes.extend_from_slice(&x.to_le_bytes());
        bytes.extend_from_slice(&y.to_le_bytes());
        bytes
    }
}

impl DutyCmd{
    pub fn new(channel: u8, duty: f32) -> Self{
        DutyCmd{ channel, duty }
    }

    pub fn from_bytes(data: &[u8]) -> Option<Self>{
        if data.len() < DUTY_CMD_SIZE{
            return None;
        }
        Some(DutyCmd{
            channel: data[0],
            duty: f32::from_le_bytes([data[1], data[2], data[3], data[4]]),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8>{
        let duty = self.duty;
        let mut bytes = Vec::with_capacity(DUTY_CMD_SIZE);
        bytes.push(self.channel);
        bytes.extend_from_slice(&duty.to_le_bytes());
        bytes
    }
}

impl ChannelCmd{
    pub fn to_bytes(&self) -> Vec<u8>{
        vec![self.channel]
    }
}

impl IndicatorCmd{
    pub fn new(pin: u8, active: bool) -> Self{
        IndicatorCmd{ pin, level: active as u8 }
    }

    pub fn to_bytes(&self) -> Vec<u8>{
        vec![self.pin, self.level]
    }
}
