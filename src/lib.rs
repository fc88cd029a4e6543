//! This file is the root of the `molvis_core` Rust crate.
//!
//! Its responsibilities are strictly limited to:
//! 1.  Declaring all the top-level modules of the library (`frame`, `pipeline`, etc.)
//!     and re-exporting the types a host needs.
//! 2.  Defining the `#[pymodule]` which acts as the main entry point when the
//!     compiled library is imported into Python (feature `python`).

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
//==================================================================================
// 1. Module Declarations
//==================================================================================
#[macro_use]
pub mod observability; // Make macros available throughout the crate

pub mod bridge;
pub mod config;
pub mod error;
pub mod frame;
pub mod io;
pub mod modifier;
pub mod pipeline;
pub mod selection;
pub mod types;

#[cfg(feature = "python")]
mod ffi;

//==================================================================================
// 2. Public API Re-exports
//==================================================================================
pub use bridge::{InteractionMode, SceneSink, Session};
pub use config::MolvisConfig;
pub use error::MolvisError;
pub use frame::{Block, Column, Frame, Trajectory};
pub use modifier::{ApplyContext, Diagnostic, DiagnosticKind, Modifier, ModifierKind};
pub use pipeline::{ModifierId, ModifierPipeline, PipelineResult};

//==================================================================================
// 3. Python Module Definition
//==================================================================================
#[cfg(feature = "python")]
use pyo3::prelude::*;

/// The `molvis_core` Python module.
#[cfg(feature = "python")]
#[pymodule]
fn molvis_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::PySession>()?;
    m.add_function(wrap_pyfunction!(ffi::enable_verbose_logging_py, m)?)?;

    // --- Expose version string as a module attribute ---
    m.add("__version__", VERSION)?;
    Ok(())
}
