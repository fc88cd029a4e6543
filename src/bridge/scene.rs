// In: src/bridge/scene.rs

use log::debug;
use serde_json::Value;

use crate::error::MolvisError;
use crate::frame::Frame;

/// **CONTRACT:** The rendering collaborator a `Session` draws into.
///
/// The core never inspects what a sink does with a frame. `forward` carries
/// the purely visual commands (styles, themes, grid, snapshots) that have no
/// meaning inside the pipeline; its result is sent back to the host verbatim.
pub trait SceneSink {
    fn render(&mut self, frame: &Frame, options: &Value);

    fn clear(&mut self);

    fn forward(&mut self, method: &str, params: &Value) -> Result<Value, MolvisError>;
}

/// A sink that draws nothing. Used when no renderer is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl SceneSink for NullSink {
    fn render(&mut self, frame: &Frame, _options: &Value) {
        debug!(
            "null sink: render {} atoms, {} bonds",
            frame.atom_count(),
            frame.bond_count()
        );
    }

    fn clear(&mut self) {
        debug!("null sink: clear");
    }

    fn forward(&mut self, method: &str, _params: &Value) -> Result<Value, MolvisError> {
        debug!("null sink: ignoring '{}'", method);
        Ok(Value::Null)
    }
}
