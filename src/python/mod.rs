use pyo3::prelude::*;
use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{ControllerConfig, PinConfig};
use crate::error::QuadError;
use crate::quad::{Controller, Rotation, ShutdownGuard, Slope};
use crate::sim::SimSensor;

fn to_py_err(err: QuadError) -> PyErr{
    match err{
        QuadError::InvalidArgument(_) | QuadError::OutOfRange{ .. } | QuadError::Config(_) =>
            PyValueError::new_err(err.to_string()),
        QuadError::Io(_) | QuadError::Serial(_) => PyIOError::new_err(err.to_string()),
        QuadError::ShutDown | QuadError::Interrupted => PyRuntimeError::new_err(err.to_string()),
    }
}

#[pyclass(name = "Controller")]
pub struct PyController{
    inner: Arc<Controller>,
    //tears down on drop if Python never called shutdown()
    guard: ShutdownGuard,
}

#[pymethods]
impl PyController{
    /// Without a port the controller runs on simulated drivers
    #[new]
    #[pyo3(signature = (port=None, baud=9600, config_path=None))]
    fn new(port: Option<&str>, baud: u32, config_path: Option<&str>) -> PyResult<Self>{
        let config = match config_path{
            Some(path) => ControllerConfig::load(path).map_err(to_py_err)?,
            None => ControllerConfig::default(),
        };
        let controller = match port{
            Some(port) => Controller::over_serial(port, baud, PinConfig::default(), config),
            None => Controller::simulated(PinConfig::default(), config, SimSensor::new()).map(|(c, _, _)| c),
        }.map_err(to_py_err)?;

        let inner = Arc::new(controller);
        let guard = ShutdownGuard::new(Arc::clone(&inner));
        Ok(PyController{ inner, guard })
    }

    /// Self-test, then run the correction loop in the background
    fn start(&mut self, py: Python<'_>) -> PyResult<()>{
        if self.guard.has_worker(){
            return Ok(());
        }
        let inner = Arc::clone(&self.inner);
        let handle = py.allow_threads(move ||{
            inner.start()?;
            inner.start_background()
        }).map_err(to_py_err)?;
        self.guard.set_worker(handle);
        Ok(())
    }

    fn set_main_power(&self, power: f32) -> PyResult<()>{
        self.inner.set_main_power(power).map_err(to_py_err)
    }

    #[pyo3(signature = (rotation, clear_slope=false))]
    fn set_rotation(&self, rotation: &str, clear_slope: bool) -> PyResult<()>{
        let rotation: Rotation = rotation.parse().map_err(to_py_err)?;
        self.inner.set_rotation(rotation, clear_slope).map_err(to_py_err)
    }

    #[pyo3(signature = (slope, clear_rotation=false))]
    fn set_slope(&self, slope: &str, clear_rotation: bool) -> PyResult<()>{
        let slope: Slope = slope.parse().map_err(to_py_err)?;
        self.inner.set_slope(slope, clear_rotation).map_err(to_py_err)
    }

    fn get_powers(&self) -> BTreeMap<usize, f32>{
        self.inner.get_powers()
    }

    fn rotation(&self) -> String{
        self.inner.rotation().to_string()
    }

    fn slope(&self) -> String{
        self.inner.slope().to_string()
    }

    fn shutdown(&mut self, py: Python<'_>) -> PyResult<()>{
        let guard = &mut self.guard;
        py.allow_threads(move || guard.finish()).map_err(to_py_err)
    }

    fn is_shut_down(&self) -> bool{
        self.inner.is_shut_down()
    }
}

#[pymodule]
fn quad_stab(_py: Python, m: &PyModule) -> PyResult<()>{
    m.add_class::<PyController>()?;
    Ok(())
}
