/**
 * Simulated drivers
 *
 * In-memory stand-ins for the sensor, the motor PWM outputs and the indicator
 * pins. Every handle is cheap to clone and clones share state, so a test can
 * hand one copy to the controller and inspect the other.
 */

use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::actuator::{ActuatorDriver, Channel, IndicatorOutput};
use crate::error::{QuadError, Result};
use crate::sensor::{SensorDriver, TiltSample};

fn injected(what: &str) -> QuadError{
    QuadError::Io(io::Error::new(io::ErrorKind::Other, format!("simulated {} fault", what)))
}

#[derive(Debug, Default)]
struct SensorScript{
    queue: VecDeque<Option<TiltSample>>, //None = failed read
    fallback: TiltSample,
    reads: usize,
}

/// Replays queued samples, then keeps returning the fallback sample
#[derive(Debug, Clone, Default)]
pub struct SimSensor{
    inner: Arc<Mutex<SensorScript>>,
}

impl SimSensor{
    pub fn new() -> Self{
        Self::default()
    }

    pub fn constant(sample: TiltSample) -> Self{
        let sensor = Self::new();
        sensor.set_fallback(sample);
        sensor
    }

    pub fn set_fallback(&self, sample: TiltSample){
        self.inner.lock().fallback = sample;
    }

    pub fn push(&self, sample: TiltSample){
        self.inner.lock().queue.push_back(Some(sample));
    }

    /// Queue one failing read
    pub fn push_failure(&self){
        self.inner.lock().queue.push_back(None);
    }

    pub fn reads(&self) -> usize{
        self.inner.lock().reads
    }
}

impl SensorDriver for SimSensor{
    fn read_tilt(&mut self) -> Result<TiltSample>{
        let mut script = self.inner.lock();
        script.reads += 1;
        match script.queue.pop_front(){
            Some(Some(sample)) => Ok(sample),
            Some(None) => Err(injected("sensor")),
            None => Ok(script.fallback),
        }
    }
}

/// One successful actuator call
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActuatorEvent{
    Start(Channel, f32),
    Duty(Channel, f32),
    Stop(Channel),
    Release(Channel),
}

#[derive(Debug, Default)]
pub struct ActuatorLog{
    pub duties: BTreeMap<Channel, f32>,
    pub writes: Vec<(Channel, f32)>,
    pub started: Vec<Channel>,
    pub stopped: Vec<Channel>,
    pub released: Vec<Channel>,
    /// Every call above in the order it happened
    pub events: Vec<ActuatorEvent>,
    fail_at_write: Option<usize>,
}

/// Records every PWM operation
#[derive(Debug, Clone, Default)]
pub struct SimActuator{
    inner: Arc<Mutex<ActuatorLog>>,
}

impl SimActuator{
    pub fn new() -> Self{
        Self::default()
    }

    /// Make the write with this zero-based index (counted from now) fail once
    pub fn fail_write_after(&self, writes_from_now: usize){
        let mut log = self.inner.lock();
        let at = log.writes.len() + writes_from_now;
        log.fail_at_write = Some(at);
    }

    pub fn duty(&self, channel: Channel) -> Option<f32>{
        self.inner.lock().duties.get(&channel).copied()
    }

    pub fn duties(&self) -> BTreeMap<Channel, f32>{
        self.inner.lock().duties.clone()
    }

    pub fn write_count(&self) -> usize{
        self.inner.lock().writes.len()
    }

    /// All writes since `from`, in order
    pub fn writes_since(&self, from: usize) -> Vec<(Channel, f32)>{
        self.inner.lock().writes[from..].to_vec()
    }

    pub fn started(&self) -> Vec<Channel>{
        self.inner.lock().started.clone()
    }

    pub fn stopped(&self) -> Vec<Channel>{
        self.inner.lock().stopped.clone()
    }

    pub fn released(&self) -> Vec<Channel>{
        self.inner.lock().released.clone()
    }

    pub fn event_count(&self) -> usize{
        self.inner.lock().events.len()
    }

    pub fn events_since(&self, from: usize) -> Vec<ActuatorEvent>{
        self.inner.lock().events[from..].to_vec()
    }
}

impl ActuatorDriver for SimActuator{
    fn start(&mut self, channel: Channel, duty: f32) -> Result<()>{
        let mut log = self.inner.lock();
        log.started.push(channel);
        log.events.push(ActuatorEvent::Start(channel, duty));
        log.duties.insert(channel, duty);
        Ok(())
    }

    fn set_duty_cycle(&mut self, channel: Channel, duty: f32) -> Result<()>{
        let mut log = self.inner.lock();
        if log.fail_at_write == Some(log.writes.len()){
            log.fail_at_write = None;
            return Err(injected("actuator"));
        }
        log.writes.push((channel, duty));
        log.events.push(ActuatorEvent::Duty(channel, duty));
        log.duties.insert(channel, duty);
        Ok(())
    }

    fn stop(&mut self, channel: Channel) -> Result<()>{
        let mut log = self.inner.lock();
        log.stopped.push(channel);
        log.events.push(ActuatorEvent::Stop(channel));
        Ok(())
    }

    fn release(&mut self, channel: Channel) -> Result<()>{
        let mut log = self.inner.lock();
        log.released.push(channel);
        log.events.push(ActuatorEvent::Release(channel));
        Ok(())
    }
}

#[derive(Debug, Default)]
struct PinLog{
    levels: BTreeMap<u8, bool>,
    changes: usize,
    released: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct SimIndicators{
    inner: Arc<Mutex<PinLog>>,
}

impl SimIndicators{
    pub fn new() -> Self{
        Self::default()
    }

    pub fn level(&self, pin: u8) -> Option<bool>{
        self.inner.lock().levels.get(&pin).copied()
    }

    pub fn changes(&self) -> usize{
        self.inner.lock().changes
    }

    pub fn released(&self) -> Vec<u8>{
        self.inner.lock().released.clone()
    }
}

impl IndicatorOutput for SimIndicators{
    fn set_level(&mut self, pin: u8, active: bool) -> Result<()>{
        let mut log = self.inner.lock();
        log.levels.insert(pin, active);
        log.changes += 1;
        Ok(())
    }

    fn release(&mut self, pin: u8) -> Result<()>{
        let mut log = self.inner.lock();
        log.levels.remove(&pin);
        log.released.push(pin);
        Ok(())
    }
}

#[cfg(test)]
mod tests{
    use super::*;

    #[test]
    fn test_sensor_script_then_fallback(){
        let mut sensor = SimSensor::constant(TiltSample::new(1.0, 2.0));
        sensor.push(TiltSample::new(5.0, 5.0));
        sensor.push_failure();

        assert_eq!(sensor.read_tilt().unwrap(), TiltSample::new(5.0, 5.0));
        assert!(sensor.read_tilt().is_err());
        assert_eq!(sensor.read_tilt().unwrap(), TiltSample::new(1.0, 2.0));
        assert_eq!(sensor.reads(), 3);
    }

    #[test]
    fn test_actuator_failure_injection(){
        let probe = SimActuator::new();
        let mut actuator = probe.clone();

        actuator.set_duty_cycle(1, 5.0).unwrap();
        probe.fail_write_after(1);
        actuator.set_duty_cycle(2, 6.0).unwrap();
        assert!(actuator.set_duty_cycle(3, 7.0).is_err());
        actuator.set_duty_cycle(3, 7.5).unwrap();

        assert_eq!(probe.write_count(), 3);
        assert_eq!(probe.duty(3), Some(7.5));
    }

    #[test]
    fn test_actuator_events_in_call_order(){
        let probe = SimActuator::new();
        let mut actuator = probe.clone();
        actuator.start(4, 4.0).unwrap();
        actuator.set_duty_cycle(4, 5.0).unwrap();
        actuator.stop(4).unwrap();
        actuator.release(4).unwrap();

        assert_eq!(probe.events_since(1), vec![
            ActuatorEvent::Duty(4, 5.0),
            ActuatorEvent::Stop(4),
            ActuatorEvent::Release(4),
        ]);
        assert_eq!(probe.event_count(), 4);
    }
}
