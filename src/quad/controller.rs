/**
 * Quad Controller
 *
 * Owns the motor power state and serializes every change to it:
 * 1. Command calls (any thread) adjust main power, rotation and slope
 * 2. The correction loop (own thread) samples tilt and re-applies correction
 * 3. Both end in one batched write of all four duty cycles
 *
 * A single lock covers read-modify-write-commit. If the write fails the
 * state is rolled back to what it was before the call.
 */

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;

use crate::actuator::{ActuatorDriver, IndicatorOutput};
use crate::config::{ControllerConfig, PinConfig};
use crate::error::{QuadError, Result};
use crate::signal;
use crate::sensor::{SensorDriver, TiltFilter, TiltSample};
use crate::sim::{SimActuator, SimIndicators, SimSensor};
use crate::timing::{Clock, LoopRate};
use crate::uart::SerialBridge;
use super::indicator::IndicatorBank;
use super::maneuver::{AngleRange, Maneuver, Rotation, Slope};
use super::power::{MotorPosition, PowerDistribution};

/// Everything guarded by the controller lock
struct ControllerState{
    engine: PowerDistribution,
    maneuver: Maneuver,
    actuator: Box<dyn ActuatorDriver>,
    /// Last duties that reached the actuator
    committed: [f32; 4],
    shut_down: bool,
}

/// State private to the correction loop
struct LoopState{
    sensor: Box<dyn SensorDriver>,
    filter: TiltFilter,
    rate: LoopRate,
    indicator_clock: Clock,
}

/// Read-only view for telemetry
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSnapshot{
    pub main_power: f32,
    pub duties: [f32; 4],
    pub rotation: Rotation,
    pub slope: Slope,
    pub x_delta: f32,
    pub y_delta: f32,
    pub x_range: AngleRange,
    pub y_range: AngleRange,
}

pub struct Controller{
    state: Mutex<ControllerState>,
    indicators: Mutex<IndicatorBank>,
    control: Mutex<LoopState>,
    config: ControllerConfig,
    running: AtomicBool,
    torn_down: AtomicBool,
}

impl Controller{
    /// Build a controller. No hardware is touched until `start`.
    pub fn new(
        pins: PinConfig,
        config: ControllerConfig,
        actuator: Box<dyn ActuatorDriver>,
        sensor: Box<dyn SensorDriver>,
        indicators: Box<dyn IndicatorOutput>,
    ) -> Result<Self>{
        config.validate()?;

        Ok(Self{
            state: Mutex::new(ControllerState{
                engine: PowerDistribution::new(&pins.motors, &config),
                maneuver: Maneuver::new(&config),
                actuator,
                committed: [0.0; 4],
                shut_down: false,
            }),
            indicators: Mutex::new(IndicatorBank::new(&pins.leds, indicators)),
            control: Mutex::new(LoopState{
                sensor,
                filter: TiltFilter::with_precision(config.round_precision)?,
                rate: LoopRate::new(config.loop_frequency)?,
                indicator_clock: Clock::new(),
            }),
            config,
            running: AtomicBool::new(false),
            torn_down: AtomicBool::new(false),
        })
    }

    /// Controller driving a microcontroller over one serial link
    pub fn over_serial(port_name: &str, baud_rate: u32, pins: PinConfig, config: ControllerConfig) -> Result<Self>{
        let bridge = SerialBridge::open(port_name, baud_rate)?;
        Self::new(
            pins,
            config,
            Box::new(bridge.clone()),
            Box::new(bridge.clone()),
            Box::new(bridge),
        )
    }

    /// Controller on simulated drivers; the returned handles share their state
    pub fn simulated(
        pins: PinConfig,
        config: ControllerConfig,
        sensor: SimSensor,
    ) -> Result<(Self, SimActuator, SimIndicators)>{
        let actuator = SimActuator::new();
        let indicators = SimIndicators::new();
        let controller = Self::new(
            pins,
            config,
            Box::new(actuator.clone()),
            Box::new(sensor),
            Box::new(indicators.clone()),
        )?;
        Ok((controller, actuator, indicators))
    }

    /// Arm the motors and run the startup self-test:
    /// every motor is pulsed in turn with its indicator lit, then main power
    /// settles at idle and the indicators show the ready pattern.
    ///
    /// Locks are dropped while waiting, so `shutdown` or an interrupt can cut
    /// the sequence short.
    pub fn start(&self) -> Result<()>{
        let cfg = &self.config;
        log::info!("Arming motors at {:.1}%", cfg.startup_duty);
        self.startup_step(|state, indicators|{
            indicators.all_off()?;
            for channel in state.engine.channels(){
                state.actuator.start(channel, cfg.startup_duty)?;
            }
            state.committed = [cfg.startup_duty; 4];
            Ok(())
        })?;
        thread::sleep(cfg.arm_wait());

        for (i, position) in MotorPosition::ALL.into_iter().enumerate(){
            log::info!("Self-test {}", position.name());
            self.startup_step(|state, indicators|{
                state.actuator.set_duty_cycle(state.engine.channels()[i], cfg.test_duty)?;
                indicators.set(position, true)
            })?;
            thread::sleep(cfg.motor_test());
            self.startup_step(|state, indicators|{
                state.actuator.set_duty_cycle(state.engine.channels()[i], cfg.safe_duty)?;
                state.committed[i] = cfg.safe_duty;
                indicators.set(position, false)
            })?;
        }

        self.startup_step(|state, _|{
            state.engine.set_main_power(cfg.idle_power)?;
            state.committed = state.engine.commit(&mut *state.actuator)?;
            Ok(())
        })?;

        //one flash per step so an interrupt is seen between flashes
        for _ in 0..cfg.blink_count{
            self.startup_step(|_, indicators| indicators.blink(1, cfg.blink()))?;
        }
        self.startup_step(|_, indicators| indicators.show_ready())?;
        self.control.lock().indicator_clock.restart();

        log::info!("Controller ready, main power {:.2}", cfg.idle_power);
        Ok(())
    }

    //one startup action under both locks, refused once teardown or an
    //interrupt has been requested
    fn startup_step<F>(&self, step: F) -> Result<()>
    where
        F: FnOnce(&mut ControllerState, &mut IndicatorBank) -> Result<()>,
    {
        if signal::interrupted(){
            log::warn!("Startup interrupted");
            return Err(QuadError::Interrupted);
        }
        let mut state = self.state.lock();
        if state.shut_down{
            return Err(QuadError::ShutDown);
        }
        let mut indicators = self.indicators.lock();
        step(&mut *state, &mut *indicators)
    }

    /// Run one mutation under the lock, then rebalance and commit.
    /// `mutate` reports whether anything changed; on a failed write the state
    /// is restored and the previous duties are written back.
    fn apply<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut PowerDistribution, &mut Maneuver) -> Result<bool>,
    {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.shut_down{
            return Err(QuadError::ShutDown);
        }

        let engine_before = state.engine.clone();
        let maneuver_before = state.maneuver.clone();

        let changed = match mutate(&mut state.engine, &mut state.maneuver){
            Ok(changed) => changed,
            Err(e) =>{
                state.engine = engine_before;
                state.maneuver = maneuver_before;
                return Err(e);
            }
        };
        if !changed{
            return Ok(());
        }

        state.engine.rebalance();
        match state.engine.commit(&mut *state.actuator){
            Ok(duties) =>{
                log::debug!("Committed duties {:?}", duties);
                state.committed = duties;
                Ok(())
            }
            Err(e) =>{
                log::warn!("Duty commit failed, rolling back: {}", e);
                state.engine = engine_before;
                state.maneuver = maneuver_before;
                match state.engine.commit(&mut *state.actuator){
                    Ok(duties) => state.committed = duties,
                    Err(restore) => log::error!("Could not restore previous duties: {}", restore),
                }
                Err(e)
            }
        }
    }

    pub fn set_main_power(&self, power: f32) -> Result<()>{
        self.apply(|engine, _| engine.set_main_power(power).map(|_| true))?;
        log::info!("Main power set to {:.2}", power);
        Ok(())
    }

    pub fn set_rotation(&self, rotation: Rotation, clear_slope: bool) -> Result<()>{
        self.apply(|engine, maneuver| Ok(maneuver.set_rotation(engine, rotation, clear_slope)))
    }

    pub fn set_slope(&self, slope: Slope, clear_rotation: bool) -> Result<()>{
        self.apply(|engine, maneuver| Ok(maneuver.set_slope(engine, slope, clear_rotation)))
    }

    /// Committed duty per motor index
    pub fn get_powers(&self) -> BTreeMap<usize, f32>{
        self.state.lock().committed.iter().copied().enumerate().collect()
    }

    pub fn rotation(&self) -> Rotation{
        self.state.lock().maneuver.rotation()
    }

    pub fn slope(&self) -> Slope{
        self.state.lock().maneuver.slope()
    }

    pub fn snapshot(&self) -> ControllerSnapshot{
        let state = self.state.lock();
        ControllerSnapshot{
            main_power: state.engine.main_power(),
            duties: state.committed,
            rotation: state.maneuver.rotation(),
            slope: state.maneuver.slope(),
            x_delta: state.engine.x_delta(),
            y_delta: state.engine.y_delta(),
            x_range: state.maneuver.x_range(),
            y_range: state.maneuver.y_range(),
        }
    }

    /// One pass of the correction loop. Returns the filtered tilt, or None
    /// when no fresh sample could be read and correction was skipped.
    pub fn run_iteration(&self) -> Result<Option<TiltSample>>{
        let mut control = self.control.lock();
        let control = &mut *control;

        if control.indicator_clock.elapsed() >= self.config.indicator_interval(){
            if let Err(e) = self.indicators.lock().toggle_all(){
                log::warn!("Indicator toggle failed: {}", e);
            }
            control.indicator_clock.restart();
        }

        let mut fresh = 0;
        for i in 0..self.config.samples_per_tick{
            if i > 0{
                thread::sleep(self.config.sample_spacing());
            }
            match control.sensor.read_tilt(){
                Ok(sample) =>{
                    control.filter.add_sample(sample);
                    fresh += 1;
                }
                Err(e) => log::warn!("Skipping tilt sample: {}", e),
            }
        }
        if fresh == 0{
            return Ok(None);
        }

        let tilt = control.filter.filtered();
        self.apply(|engine, maneuver|{
            engine.apply_tilt_correction(tilt, maneuver.x_range(), maneuver.y_range());
            Ok(true)
        })?;
        Ok(Some(tilt))
    }

    /// Correction loop; returns once `stop`/`shutdown` is called
    pub fn run(&self){
        self.running.store(true, Ordering::SeqCst);
        log::info!("Correction loop started at up to {:.1}Hz", self.config.loop_frequency);

        while self.running.load(Ordering::SeqCst) && !self.is_shut_down(){
            match self.run_iteration(){
                Ok(Some(tilt)) => log::debug!("Tilt x={:.1} y={:.1}", tilt.angle_x, tilt.angle_y),
                Ok(None) => {}
                Err(QuadError::ShutDown) => break,
                Err(e) => log::warn!("Correction step failed: {}", e),
            }
            let mut control = self.control.lock();
            control.rate.tick();
        }

        self.running.store(false, Ordering::SeqCst);
        log::info!("Correction loop stopped");
    }

    /// Start the correction loop in a background thread
    pub fn start_background(self: Arc<Self>) -> Result<JoinHandle<()>>{
        self.running.store(true, Ordering::SeqCst);
        let handle = thread::Builder::new()
            .name("quad-control".to_string())
            .spawn(move ||{
                self.run();
            })?;
        Ok(handle)
    }

    pub fn is_running(&self) -> bool{
        self.running.load(Ordering::SeqCst)
    }

    /// Signal the loop to exit after the current iteration
    pub fn stop(&self){
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_shut_down(&self) -> bool{
        self.torn_down.load(Ordering::SeqCst)
    }

    /// Teardown: motors to the safe duty, short pause, outputs stopped and
    /// released, indicators off and released.
    ///
    /// Runs once; later calls return Ok without touching hardware. Every
    /// step is attempted even if an earlier one fails, the first error is
    /// returned.
    pub fn shutdown(&self) -> Result<()>{
        if self.torn_down.swap(true, Ordering::SeqCst){
            return Ok(());
        }
        log::info!("Shutting down");
        self.stop();

        let mut first_err: Option<QuadError> = None;
        let mut note = |result: Result<()>|{
            if let Err(e) = result{
                log::error!("Teardown step failed: {}", e);
                first_err.get_or_insert(e);
            }
        };

        {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            state.shut_down = true;

            let channels = state.engine.channels();
            for channel in channels{
                note(state.actuator.set_duty_cycle(channel, self.config.safe_duty));
            }
            state.committed = [self.config.safe_duty; 4];
            thread::sleep(self.config.teardown_pause());

            for channel in channels{
                note(state.actuator.stop(channel));
            }
            for channel in channels{
                note(state.actuator.release(channel));
            }
        }

        note(self.indicators.lock().release_all());

        log::info!("Shutdown complete");
        match first_err{
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Runs `shutdown` when dropped, for exit paths that skip the explicit call.
/// If it owns the correction loop thread, that thread is joined too.
pub struct ShutdownGuard{
    controller: Arc<Controller>,
    worker: Option<JoinHandle<()>>,
}

impl ShutdownGuard{
    pub fn new(controller: Arc<Controller>) -> Self{
        Self{ controller, worker: None }
    }

    /// Hand over the thread returned by `start_background`
    pub fn set_worker(&mut self, worker: JoinHandle<()>){
        self.worker = Some(worker);
    }

    pub fn has_worker(&self) -> bool{
        self.worker.is_some()
    }

    /// Shut down now and wait for the loop thread to exit
    pub fn finish(&mut self) -> Result<()>{
        let result = self.controller.shutdown();
        if let Some(worker) = self.worker.take(){
            if worker.join().is_err(){
                log::error!("Correction loop thread panicked");
            }
        }
        result
    }
}

impl Drop for ShutdownGuard{
    fn drop(&mut self){
        if let Err(e) = self.finish(){
            log::error!("Shutdown failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests{
    use super::*;
    use std::time::Duration;
    use crate::config::SlopePolicy;
    use crate::sim::ActuatorEvent;

    const EPS: f32 = 1e-5;

    fn controller_with(config: ControllerConfig, sensor: SimSensor) -> (Controller, SimActuator, SimIndicators){
        Controller::simulated(PinConfig::default(), config, sensor).unwrap()
    }

    fn started(sensor: SimSensor) -> (Controller, SimActuator, SimIndicators){
        let (c, a, i) = controller_with(ControllerConfig::instant(), sensor);
        c.start().unwrap();
        (c, a, i)
    }

    fn duties(c: &Controller) -> Vec<f32>{
        c.get_powers().values().copied().collect()
    }

    #[test]
    fn test_start_runs_self_test(){
        let (c, actuator, leds) = started(SimSensor::new());

        assert_eq!(actuator.started(), vec![20, 12, 21, 16]);
        //each motor: test pulse, back to safe; then the idle commit
        let writes = actuator.writes_since(0);
        assert_eq!(&writes[..2], &[(20, 5.7), (20, 5.0)]);
        assert_eq!(writes.len(), 4 * 2 + 4);
        assert_eq!(duties(&c), vec![5.0; 4]);
        assert_eq!(c.snapshot().main_power, 5.0);

        //ready pattern
        assert_eq!(leds.level(6), Some(true));
        assert_eq!(leds.level(19), Some(true));
        assert_eq!(leds.level(26), Some(false));
    }

    #[test]
    fn test_main_power_out_of_range_leaves_state(){
        let (c, actuator, _) = started(SimSensor::new());
        c.set_main_power(6.0).unwrap();
        let before = c.snapshot();
        let writes = actuator.write_count();

        assert!(c.set_main_power(-1.0).unwrap_err().is_out_of_range());
        assert!(c.set_main_power(11.0).unwrap_err().is_out_of_range());

        assert_eq!(c.snapshot(), before);
        assert_eq!(actuator.write_count(), writes);
    }

    #[test]
    fn test_main_power_commits_batch(){
        let (c, actuator, _) = started(SimSensor::new());
        let from = actuator.write_count();
        c.set_main_power(7.25).unwrap();
        assert_eq!(actuator.writes_since(from), vec![(20, 7.25), (12, 7.25), (21, 7.25), (16, 7.25)]);
        assert_eq!(duties(&c), vec![7.25; 4]);
    }

    #[test]
    fn test_repeated_rotation_is_idempotent(){
        let (c, actuator, _) = started(SimSensor::new());
        c.set_main_power(7.0).unwrap();

        c.set_rotation(Rotation::Right, false).unwrap();
        let after_first = duties(&c);
        let writes = actuator.write_count();

        c.set_rotation(Rotation::Right, false).unwrap();
        assert_eq!(duties(&c), after_first);
        assert_eq!(actuator.write_count(), writes);

        assert!((after_first[0] - 6.85).abs() < EPS);
        assert!((after_first[1] - 7.15).abs() < EPS);
    }

    #[test]
    fn test_default_slope_policy_ignores_new_slope(){
        let (c, actuator, _) = started(SimSensor::new());
        c.set_main_power(7.0).unwrap();
        let writes = actuator.write_count();

        c.set_slope(Slope::Forward, true).unwrap();
        assert_eq!(c.slope(), Slope::Stay);
        assert_eq!(actuator.write_count(), writes);
        assert_eq!(duties(&c), vec![7.0; 4]);
    }

    #[test]
    fn test_switch_policy_changes_ranges(){
        let config = ControllerConfig{ slope_policy: SlopePolicy::Switch, ..ControllerConfig::instant() };
        let (c, _, _) = controller_with(config, SimSensor::constant(TiltSample::new(20.0, 0.0)));
        c.start().unwrap();
        c.set_main_power(7.0).unwrap();

        c.set_slope(Slope::Forward, true).unwrap();
        let snap = c.snapshot();
        assert_eq!(snap.slope, Slope::Forward);
        assert_eq!(snap.x_range, AngleRange::new(18.0, 22.0));

        //20 degrees is inside the forward band: no correction
        c.run_iteration().unwrap();
        assert_eq!(c.snapshot().x_delta, 0.0);
    }

    #[test]
    fn test_iteration_corrects_tilt(){
        let (c, actuator, _) = started(SimSensor::constant(TiltSample::new(-6.0, 0.0)));
        c.set_main_power(6.0).unwrap();
        let from = actuator.write_count();

        let tilt = c.run_iteration().unwrap().unwrap();
        assert_eq!(tilt, TiltSample::new(-6.0, 0.0));

        let snap = c.snapshot();
        assert!((snap.x_delta - 0.08).abs() < EPS);
        assert!((snap.duties[0] - snap.duties[1] - 0.08).abs() < EPS);
        assert_eq!(actuator.writes_since(from).len(), 4);
    }

    #[test]
    fn test_low_power_skips_correction(){
        let (c, _, _) = started(SimSensor::constant(TiltSample::new(-30.0, 30.0)));
        c.run_iteration().unwrap();
        let snap = c.snapshot();
        assert_eq!((snap.x_delta, snap.y_delta), (0.0, 0.0));
        assert_eq!(snap.duties, [5.0; 4]);
    }

    #[test]
    fn test_sensor_faults_are_skipped(){
        let sensor = SimSensor::constant(TiltSample::new(-6.0, 0.0));
        let (c, _, _) = started(sensor.clone());
        c.set_main_power(6.0).unwrap();

        for _ in 0..3{
            sensor.push_failure();
        }
        assert_eq!(c.run_iteration().unwrap(), None);
        assert_eq!(c.snapshot().x_delta, 0.0);

        //one good read out of three is enough
        sensor.push_failure();
        sensor.push_failure();
        assert!(c.run_iteration().unwrap().is_some());
    }

    #[test]
    fn test_actuator_fault_rolls_back(){
        let (c, actuator, _) = started(SimSensor::new());
        c.set_main_power(6.0).unwrap();
        let before = c.snapshot();

        actuator.fail_write_after(2);
        assert!(matches!(c.set_main_power(8.0), Err(QuadError::Io(_))));

        assert_eq!(c.snapshot(), before);
        //previous duties were written back
        assert_eq!(actuator.duties().values().copied().collect::<Vec<_>>(), vec![6.0; 4]);
    }

    #[test]
    fn test_shutdown_twice(){
        let (c, actuator, leds) = started(SimSensor::new());
        c.set_main_power(8.0).unwrap();

        c.shutdown().unwrap();
        c.shutdown().unwrap();

        assert!(c.is_shut_down());
        assert_eq!(actuator.stopped(), vec![20, 12, 21, 16]);
        assert_eq!(actuator.released(), vec![20, 12, 21, 16]);
        assert_eq!(leds.released(), vec![6, 26, 13, 19]);
        assert_eq!(duties(&c), vec![5.0; 4]);
        assert!(matches!(c.set_main_power(6.0), Err(QuadError::ShutDown)));
        assert!(matches!(c.run_iteration(), Err(QuadError::ShutDown)));
    }

    #[test]
    fn test_teardown_order(){
        let (c, actuator, _) = started(SimSensor::new());
        c.set_main_power(8.0).unwrap();
        let from = actuator.event_count();

        c.shutdown().unwrap();
        c.shutdown().unwrap();

        let channels = [20, 12, 21, 16];
        let mut expected: Vec<ActuatorEvent> = channels.iter().map(|&ch| ActuatorEvent::Duty(ch, 5.0)).collect();
        expected.extend(channels.iter().map(|&ch| ActuatorEvent::Stop(ch)));
        expected.extend(channels.iter().map(|&ch| ActuatorEvent::Release(ch)));
        assert_eq!(actuator.events_since(from), expected);
    }

    #[test]
    fn test_shutdown_guard(){
        let (c, actuator, _) = started(SimSensor::new());
        let c = Arc::new(c);
        {
            let _guard = ShutdownGuard::new(Arc::clone(&c));
        }
        assert!(c.is_shut_down());
        c.shutdown().unwrap();
        assert_eq!(actuator.released().len(), 4);
    }

    #[test]
    fn test_dropped_guard_stops_loop_thread(){
        let (c, actuator, _) = started(SimSensor::constant(TiltSample::new(5.0, 0.0)));
        let c = Arc::new(c);
        c.set_main_power(7.0).unwrap();

        let mut guard = ShutdownGuard::new(Arc::clone(&c));
        guard.set_worker(Arc::clone(&c).start_background().unwrap());
        assert!(guard.has_worker());
        thread::sleep(Duration::from_millis(20));
        drop(guard);

        //thread joined: nothing commits any more
        assert!(c.is_shut_down());
        assert!(!c.is_running());
        let events = actuator.event_count();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(actuator.event_count(), events);
        assert_eq!(actuator.released(), vec![20, 12, 21, 16]);
    }

    #[test]
    fn test_shutdown_cuts_self_test_short(){
        let config = ControllerConfig{ motor_test_ms: 100, ..ControllerConfig::instant() };
        let (c, actuator, _) = controller_with(config, SimSensor::new());

        let result = thread::scope(|scope|{
            scope.spawn(||{
                thread::sleep(Duration::from_millis(30));
                c.shutdown().unwrap();
            });
            c.start()
        });

        assert!(matches!(result, Err(QuadError::ShutDown)));
        let pulses = actuator.events_since(0).iter()
            .filter(|e| matches!(e, ActuatorEvent::Duty(_, d) if *d == 5.7))
            .count();
        assert!(pulses < 4);
        //teardown was the last thing to reach the motors
        assert_eq!(actuator.events_since(0).last(), Some(&ActuatorEvent::Release(16)));
    }

    #[test]
    fn test_unrepresentable_loop_rate_rejected(){
        let config = ControllerConfig{ loop_frequency: 1e-20, ..ControllerConfig::instant() };
        let err = Controller::simulated(PinConfig::default(), config, SimSensor::new()).err().unwrap();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_background_loop_with_concurrent_commands(){
        let (c, actuator, _) = started(SimSensor::constant(TiltSample::new(3.0, -3.0)));
        let c = Arc::new(c);
        c.set_main_power(7.0).unwrap();

        let handle = Arc::clone(&c).start_background().unwrap();
        for i in 0..20{
            let rotation = if i % 2 == 0{ Rotation::Left }else{ Rotation::Right };
            c.set_rotation(rotation, true).unwrap();
            thread::sleep(Duration::from_millis(1));
        }
        c.shutdown().unwrap();
        handle.join().unwrap();

        assert!(!c.is_running());
        //every batch that reached the actuator stayed inside the band
        for (_, duty) in actuator.writes_since(0){
            assert!(duty >= 4.0 - EPS && duty <= 10.0 + EPS);
        }
        let writes = actuator.writes_since(0);
        assert_eq!(writes.len() % 4, 0);
    }
}
