//! The Foreign Function Interface layer. Only compiled with the `python` feature.

//==================================================================================
// 1. Module Declarations
//==================================================================================
/// Contains all logic for interfacing with the Python/CPython ecosystem.
pub mod python;

//==================================================================================
// 2. Public API Re-exports
//==================================================================================
pub use self::python::{enable_verbose_logging_py, PySession};
