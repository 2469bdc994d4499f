use pyo3::prelude::*;
use pyo3::exceptions::{PyIOError, PyTimeoutError, PyValueError};
use std::sync::Arc;
use crate::boat::BoatDriver;
use crate::config::RigConfig;
use crate::error::Error;

fn to_py_err(err: Error) -> PyErr{
    match err{
        Error::Timeout => PyTimeoutError::new_err(err.to_string()),
        Error::CommandTooLong{ .. } | Error::Config(_) => PyValueError::new_err(err.to_string()),
        _ => PyIOError::new_err(err.to_string()),
    }
}

//boatd driver surface; unsupported sensors come back as None
#[pyclass(name = "BoatDriver")]
pub struct PyBoatDriver{
    inner: Arc<BoatDriver>,
}

#[pymethods]
impl PyBoatDriver{
    #[new]
    #[pyo3(signature = (rig = "dewi", config = None))]
    fn new(py: Python<'_>, rig: &str, config: Option<&str>) -> PyResult<Self>{
        let rig = match config{
            Some(path) => RigConfig::load(path),
            None => RigConfig::preset(rig),
        }.map_err(to_py_err)?;

        //connecting may sleep through settle delays
        let driver = py.allow_threads(move || BoatDriver::connect(rig)).map_err(to_py_err)?;
        Ok(PyBoatDriver{ inner: Arc::new(driver) })
    }

    fn rig_name(&self) -> String{
        self.inner.rig().name.clone()
    }

    fn heading(&self, py: Python<'_>) -> PyResult<f64>{
        let d = Arc::clone(&self.inner);
        py.allow_threads(move || d.heading()).map_err(to_py_err)
    }

    fn pitch(&self, py: Python<'_>) -> PyResult<Option<f64>>{
        let d = Arc::clone(&self.inner);
        py.allow_threads(move || d.pitch()).map_err(to_py_err)
    }

    fn roll(&self, py: Python<'_>) -> PyResult<Option<f64>>{
        let d = Arc::clone(&self.inner);
        py.allow_threads(move || d.roll()).map_err(to_py_err)
    }

    fn wind_direction(&self, py: Python<'_>) -> PyResult<Option<f64>>{
        let d = Arc::clone(&self.inner);
        py.allow_threads(move || d.wind_direction()).map_err(to_py_err)
    }

    fn apparent_wind_direction(&self, py: Python<'_>) -> PyResult<Option<f64>>{
        let d = Arc::clone(&self.inner);
        py.allow_threads(move || d.apparent_wind_direction()).map_err(to_py_err)
    }

    fn wind_speed(&self) -> Option<f64>{
        self.inner.wind_speed()
    }

    fn position(&self, py: Python<'_>) -> (f64, f64){
        let d = Arc::clone(&self.inner);
        py.allow_threads(move || d.position())
    }

    fn rudder(&self, py: Python<'_>, angle: f64) -> PyResult<i32>{
        let d = Arc::clone(&self.inner);
        py.allow_threads(move || d.rudder(angle)).map_err(to_py_err)
    }

    fn sail(&self, py: Python<'_>, angle: f64) -> PyResult<Option<i32>>{
        let d = Arc::clone(&self.inner);
        py.allow_threads(move || d.sail(angle)).map_err(to_py_err)
    }
}

#[pymodule]
fn sail_hal(_py: Python, m: &PyModule) -> PyResult<()>{
    m.add_class::<PyBoatDriver>()?;
    m.add("PRESETS", crate::config::PRESETS.to_vec())?;
    Ok(())
}
