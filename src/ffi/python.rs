// In: src/ffi/python.rs

use arrow::pyarrow::ToPyArrow;
use pyo3::prelude::*;

use crate::bridge::{NullSink, Session};
use crate::config::{LoggingConfig, MolvisConfig};
use crate::frame::ATOMS;
use crate::observability::init_logging;

//==================================================================================
// I. Session
//==================================================================================

/// A viewer session driven by JSON messages from the widget frontend.
///
/// Sessions hold non-`Send` renderer state, so an instance must stay on the
/// Python thread that created it.
#[pyclass(name = "Session", module = "molvis_core", unsendable)]
pub struct PySession {
    inner: Session,
}

#[pymethods]
impl PySession {
    /// Creates a session. `config_json` is an optional `MolvisConfig` document;
    /// every field in it is optional. Its `logging` section installs the logger.
    #[new]
    #[pyo3(signature = (config_json = None))]
    fn new(config_json: Option<&str>) -> PyResult<Self> {
        let config = match config_json {
            Some(json) => MolvisConfig::from_json_str(json)?,
            None => MolvisConfig::default(),
        };
        Ok(Self {
            inner: Session::from_config(config, Box::new(NullSink))?,
        })
    }

    /// Handles one protocol message and returns the JSON response.
    pub fn handle_message(&mut self, message: &str) -> String {
        self.inner.handle_message(message)
    }

    /// The atoms of the current pipeline result as a `pyarrow.RecordBatch`.
    pub fn atoms_arrow(&self, py: Python) -> PyResult<PyObject> {
        let batch = self.inner.result().frame.block(ATOMS)?.to_record_batch()?;
        batch.to_pyarrow(py)
    }

    #[getter]
    pub fn id(&self) -> u32 {
        self.inner.id()
    }
}

//==================================================================================
// II. Logging
//==================================================================================

/// Turns on `log` output, optionally appended to `log_file`.
#[pyfunction]
#[pyo3(name = "enable_verbose_logging", signature = (log_file = None, level = "debug"))]
pub fn enable_verbose_logging_py(log_file: Option<String>, level: &str) -> PyResult<()> {
    init_logging(&LoggingConfig {
        level: level.to_string(),
        log_file,
    })?;
    Ok(())
}
