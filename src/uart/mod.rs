/**
 * UART bridge to the motor/IMU microcontroller
 *
 * One serial link carries everything:
 * - outbound: PWM start/duty/stop/release, indicator levels
 * - inbound: tilt angles or raw accelerometer readings
 *
 * SerialBridge implements the actuator, indicator and sensor traits, so a
 * controller can be built on top of a single port.
 */

pub mod protocol;
pub use protocol::*;

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serialport::SerialPort;

use crate::actuator::{ActuatorDriver, Channel, IndicatorOutput};
use crate::error::{QuadError, Result};
use crate::sensor::{tilt_from_raw, SensorDriver, TiltSample};

pub const SYNC_BYTE: u8 = 0xAA;
pub const MAX_MSG_SIZE: usize = 244;

/// How long `read_tilt` waits for a sample before giving up
pub const SENSOR_TIMEOUT: Duration = Duration::from_millis(100);
const PORT_TIMEOUT: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MsgType{
    RawAccel = 0x01,
    Duty = 0x03,
    Heartbeat = 0x04,
    Tilt = 0x05,
    PwmStart = 0x06,
    PwmStop = 0x07,
    PwmRelease = 0x08,
    Indicator = 0x09,
    IndicatorRelease = 0x0A,
}

impl MsgType{
    pub fn from_u8(val: u8) -> Option<Self>{
        match val{
            0x01 => Some(MsgType::RawAccel),
            0x03 => Some(MsgType::Duty),
            0x04 => Some(MsgType::Heartbeat),
            0x05 => Some(MsgType::Tilt),
            0x06 => Some(MsgType::PwmStart),
            0x07 => Some(MsgType::PwmStop),
            0x08 => Some(MsgType::PwmRelease),
            0x09 => Some(MsgType::Indicator),
            0x0A => Some(MsgType::IndicatorRelease),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UartFrame{
    pub msg_type: MsgType,
    pub payload: Vec<u8>,
}

impl UartFrame{
    /// Tilt carried by this frame, if it is a sensor frame
    pub fn tilt(&self) -> Option<TiltSample>{
        match self.msg_type{
            MsgType::Tilt => TiltMsg::from_bytes(&self.payload)
                .map(|m| TiltSample::new(m.angle_x, m.angle_y)),
            MsgType::RawAccel => RawAccelMsg::from_bytes(&self.payload)
                .map(|m| tilt_from_raw(m.accel_x, m.accel_y, m.accel_z)),
            _ => None,
        }
    }
}

fn calculate_checksum(data: &[u8]) -> u8{
    data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Build `[SYNC][TYPE][LEN][PAYLOAD...][CHECKSUM]`; the checksum is the
/// wrapping sum of TYPE, LEN and the payload
pub fn encode_frame(msg_type: MsgType, payload: &[u8]) -> Result<Vec<u8>>{
    if payload.len() > MAX_MSG_SIZE{
        return Err(QuadError::InvalidArgument(format!(
            "payload of {} bytes exceeds {}", payload.len(), MAX_MSG_SIZE
        )));
    }

    let mut frame = Vec::with_capacity(4 + payload.len());
    frame.push(SYNC_BYTE);
    frame.push(msg_type as u8);
    frame.push(payload.len() as u8);
    frame.extend_from_slice(payload);

    let checksum = calculate_checksum(&frame[1..]);
    frame.push(checksum);
    Ok(frame)
}

/// Incremental frame decoder. Garbage, bad checksums and unknown types are
/// skipped by resyncing on the next sync byte.
#[derive(Debug, Default)]
pub struct FrameParser{
    rx_buffer: Vec<u8>,
}

impl FrameParser{
    pub fn new() -> Self{
        FrameParser{ rx_buffer: Vec::with_capacity(512) }
    }

    pub fn push(&mut self, data: &[u8]){
        self.rx_buffer.extend_from_slice(data);
    }

    pub fn buffered(&self) -> usize{
        self.rx_buffer.len()
    }

    pub fn next_frame(&mut self) -> Option<UartFrame>{
        loop{
            //find sync byte
            let sync_pos = match self.rx_buffer.iter().position(|&b| b == SYNC_BYTE){
                Some(pos) => pos,
                None =>{
                    self.rx_buffer.clear();
                    return None;
                }
            };
            if sync_pos > 0{
                self.rx_buffer.drain(0..sync_pos);
            }

            if self.rx_buffer.len() < 4{
                return None;
            }

            let len = self.rx_buffer[2] as usize;
            if len > MAX_MSG_SIZE{
                self.rx_buffer.remove(0);
                continue;
            }

            let frame_len = 4 + len;
            if self.rx_buffer.len() < frame_len{
                return None;
            }

            let checksum = self.rx_buffer[3 + len];
            if checksum != calculate_checksum(&self.rx_buffer[1..3 + len]){
                self.rx_buffer.remove(0);
                continue;
            }

            let msg_type = MsgType::from_u8(self.rx_buffer[1]);
            let payload = self.rx_buffer[3..3 + len].to_vec();
            self.rx_buffer.drain(0..frame_len);

            match msg_type{
                Some(msg_type) => return Some(UartFrame{ msg_type, payload }),
                None => log::debug!("dropping frame of unknown type"),
            }
        }
    }
}

struct Link{
    port: Box<dyn SerialPort>,
    parser: FrameParser,
}

/// Shared handle on the serial link; clones talk over the same port
#[derive(Clone)]
pub struct SerialBridge{
    link: Arc<Mutex<Link>>,
}

impl SerialBridge{
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self>{
        let port = serialport::new(port_name, baud_rate)
            .timeout(PORT_TIMEOUT)
            .open()?;
        log::info!("Opened {} at {} baud", port_name, baud_rate);

        Ok(SerialBridge{
            link: Arc::new(Mutex::new(Link{ port, parser: FrameParser::new() })),
        })
    }

    pub fn send_frame(&self, msg_type: MsgType, payload: &[u8]) -> Result<()>{
        let frame = encode_frame(msg_type, payload)?;
        let mut link = self.link.lock();
        link.port.write_all(&frame)?;
        link.port.flush()?;
        Ok(())
    }

    /// Drain buffered frames and keep the newest tilt, reading from the port
    /// once if nothing is buffered
    fn poll_tilt(&self) -> Result<Option<TiltSample>>{
        let mut link = self.link.lock();
        let mut latest = None;
        while let Some(frame) = link.parser.next_frame(){
            if let Some(tilt) = frame.tilt(){
                latest = Some(tilt);
            }
        }
        if latest.is_some(){
            return Ok(latest);
        }

        let mut read_buf = [0u8; 256];
        match link.port.read(&mut read_buf){
            Ok(n) if n > 0 => link.parser.push(&read_buf[..n]),
            Ok(_) => {}
            Err(ref e) if e.kind() == io::ErrorKind::TimedOut => {}
            Err(e) => return Err(e.into()),
        }
        Ok(None)
    }
}

impl ActuatorDriver for SerialBridge{
    fn start(&mut self, channel: Channel, duty: f32) -> Result<()>{
        self.send_frame(MsgType::PwmStart, &DutyCmd::new(channel, duty).to_bytes())
    }

    fn set_duty_cycle(&mut self, channel: Channel, duty: f32) -> Result<()>{
        self.send_frame(MsgType::Duty, &DutyCmd::new(channel, duty).to_bytes())
    }

    fn stop(&mut self, channel: Channel) -> Result<()>{
        self.send_frame(MsgType::PwmStop, &ChannelCmd{ channel }.to_bytes())
    }

    fn release(&mut self, channel: Channel) -> Result<()>{
        self.send_frame(MsgType::PwmRelease, &ChannelCmd{ channel }.to_bytes())
    }
}

impl IndicatorOutput for SerialBridge{
    fn set_level(&mut self, pin: u8, active: bool) -> Result<()>{
        self.send_frame(MsgType::Indicator, &IndicatorCmd::new(pin, active).to_bytes())
    }

    fn release(&mut self, pin: u8) -> Result<()>{
        self.send_frame(MsgType::IndicatorRelease, &ChannelCmd{ channel: pin }.to_bytes())
    }
}

impl SensorDriver for SerialBridge{
    fn read_tilt(&mut self) -> Result<TiltSample>{
        let deadline = Instant::now() + SENSOR_TIMEOUT;
        loop{
            if let Some(tilt) = self.poll_tilt()?{
                return Ok(tilt);
            }
            if Instant::now() >= deadline{
                return Err(QuadError::Io(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "no tilt frame from sensor",
                )));
            }
        }
    }
}
