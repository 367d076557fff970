use std::ffi::{c_char, CStr};
use std::ptr;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{ControllerConfig, PinConfig};
use crate::error::QuadError;
use crate::quad::{Controller, Rotation, ShutdownGuard, Slope};
use crate::sim::SimSensor;

pub const QUAD_OK: i32 = 0;
pub const QUAD_ERR_NULL: i32 = -1;
pub const QUAD_ERR_INVALID: i32 = -2;
pub const QUAD_ERR_OUT_OF_RANGE: i32 = -3;
pub const QUAD_ERR_IO: i32 = -4;
pub const QUAD_ERR_SHUT_DOWN: i32 = -5;
pub const QUAD_ERR_CONFIG: i32 = -6;
pub const QUAD_ERR_INTERRUPTED: i32 = -7;

pub struct QuadController{
    inner: Arc<Controller>,
    guard: Mutex<ShutdownGuard>,
}

fn error_code(err: &QuadError) -> i32{
    match err{
        QuadError::InvalidArgument(_) => QUAD_ERR_INVALID,
        QuadError::OutOfRange{ .. } => QUAD_ERR_OUT_OF_RANGE,
        QuadError::Io(_) | QuadError::Serial(_) => QUAD_ERR_IO,
        QuadError::ShutDown => QUAD_ERR_SHUT_DOWN,
        QuadError::Config(_) => QUAD_ERR_CONFIG,
        QuadError::Interrupted => QUAD_ERR_INTERRUPTED,
    }
}

fn to_code(result: crate::error::Result<()>) -> i32{
    match result{
        Ok(()) => QUAD_OK,
        Err(e) =>{
            log::warn!("ffi call failed: {}", e);
            error_code(&e)
        }
    }
}

//null path -> defaults
unsafe fn load_config(path: *const c_char) -> Option<ControllerConfig>{
    if path.is_null(){
        return Some(ControllerConfig::default());
    }
    let path = unsafe{ CStr::from_ptr(path) }.to_str().ok()?;
    match ControllerConfig::load(path){
        Ok(config) => Some(config),
        Err(e) =>{
            log::error!("{}", e);
            None
        }
    }
}

fn into_handle(controller: Controller) -> *mut QuadController{
    let inner = Arc::new(controller);
    let guard = Mutex::new(ShutdownGuard::new(Arc::clone(&inner)));
    Box::into_raw(Box::new(QuadController{ inner, guard }))
}

/// Open a controller on a serial port. Returns null on failure.
#[no_mangle]
pub unsafe extern "C" fn quad_controller_open(
    port: *const c_char,
    baud: u32,
    config_path: *const c_char,
) -> *mut QuadController{
    if port.is_null(){
        return ptr::null_mut();
    }
    let port = match unsafe{ CStr::from_ptr(port) }.to_str(){
        Ok(s) => s,
        Err(_) => return ptr::null_mut(),
    };
    let config = match unsafe{ load_config(config_path) }{
        Some(c) => c,
        None => return ptr::null_mut(),
    };

    match Controller::over_serial(port, baud, PinConfig::default(), config){
        Ok(controller) => into_handle(controller),
        Err(e) =>{
            log::error!("failed to open controller on {}: {}", port, e);
            ptr::null_mut()
        }
    }
}

/// Controller on simulated drivers with a level sensor
#[no_mangle]
pub unsafe extern "C" fn quad_controller_new_simulated(config_path: *const c_char) -> *mut QuadController{
    let config = match unsafe{ load_config(config_path) }{
        Some(c) => c,
        None => return ptr::null_mut(),
    };
    match Controller::simulated(PinConfig::default(), config, SimSensor::new()){
        Ok((controller, _, _)) => into_handle(controller),
        Err(e) =>{
            log::error!("failed to create simulated controller: {}", e);
            ptr::null_mut()
        }
    }
}

/// Self-test, then start the correction loop in the background
#[no_mangle]
pub unsafe extern "C" fn quad_controller_start(ctrl: *mut QuadController) -> i32{
    if ctrl.is_null(){
        return QUAD_ERR_NULL;
    }
    let c = unsafe{ &*ctrl };
    let mut guard = c.guard.lock();
    if guard.has_worker(){
        return QUAD_OK;
    }
    to_code(c.inner.start().and_then(|_|{
        guard.set_worker(Arc::clone(&c.inner).start_background()?);
        Ok(())
    }))
}

#[no_mangle]
pub unsafe extern "C" fn quad_controller_set_main_power(ctrl: *mut QuadController, power: f32) -> i32{
    if ctrl.is_null(){
        return QUAD_ERR_NULL;
    }
    let c = unsafe{ &*ctrl };
    to_code(c.inner.set_main_power(power))
}

/// 0 = left, 1 = stay, 2 = right
#[no_mangle]
pub unsafe extern "C" fn quad_controller_set_rotation(ctrl: *mut QuadController, rotation: u8, clear_slope: bool) -> i32{
    if ctrl.is_null(){
        return QUAD_ERR_NULL;
    }
    let c = unsafe{ &*ctrl };
    match Rotation::from_u8(rotation){
        Some(r) => to_code(c.inner.set_rotation(r, clear_slope)),
        None => QUAD_ERR_INVALID,
    }
}

/// 0 = stay, 1 = forward, 2 = backward, 3 = left, 4 = right
#[no_mangle]
pub unsafe extern "C" fn quad_controller_set_slope(ctrl: *mut QuadController, slope: u8, clear_rotation: bool) -> i32{
    if ctrl.is_null(){
        return QUAD_ERR_NULL;
    }
    let c = unsafe{ &*ctrl };
    match Slope::from_u8(slope){
        Some(s) => to_code(c.inner.set_slope(s, clear_rotation)),
        None => QUAD_ERR_INVALID,
    }
}

/// Copy the committed duties (motor order FL, FR, BL, BR) into `out`.
/// Returns the number written.
#[no_mangle]
pub unsafe extern "C" fn quad_controller_get_powers(ctrl: *mut QuadController, out: *mut f32, len: usize) -> i32{
    if ctrl.is_null() || out.is_null(){
        return QUAD_ERR_NULL;
    }
    let c = unsafe{ &*ctrl };
    let powers = c.inner.get_powers();
    let n = powers.len().min(len);
    let out = unsafe{ std::slice::from_raw_parts_mut(out, n) };
    for (slot, duty) in out.iter_mut().zip(powers.values()){
        *slot = *duty;
    }
    n as i32
}

/// Teardown; safe to call more than once
#[no_mangle]
pub unsafe extern "C" fn quad_controller_shutdown(ctrl: *mut QuadController) -> i32{
    if ctrl.is_null(){
        return QUAD_ERR_NULL;
    }
    let c = unsafe{ &*ctrl };
    to_code(c.guard.lock().finish())
}

/// Shuts down if still running, then frees the handle
#[no_mangle]
pub unsafe extern "C" fn quad_controller_free(ctrl: *mut QuadController){
    if !ctrl.is_null(){
        unsafe{
            quad_controller_shutdown(ctrl);
            drop(Box::from_raw(ctrl));
        }
    }
}
