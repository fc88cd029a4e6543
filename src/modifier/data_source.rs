// In: src/modifier/data_source.rs

use std::any::Any;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{merge_parameters, ApplyContext, Modifier, ModifierKind};
use crate::error::MolvisError;
use crate::frame::Frame;

/// Where the held frame came from.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Frame data pushed by the host.
    Frame,
    /// Parsed from an XYZ file.
    Xyz,
    #[default]
    Empty,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DataSourceParams {
    #[serde(default)]
    pub source_type: SourceType,
    #[serde(default)]
    pub filename: Option<String>,
}

/// The root of a pipeline: ignores its input and returns the held frame.
#[derive(Debug, Clone)]
pub struct DataSourceModifier {
    frame: Arc<Frame>,
    params: DataSourceParams,
}

impl DataSourceModifier {
    pub fn new(frame: impl Into<Arc<Frame>>, source_type: SourceType) -> Self {
        Self {
            frame: frame.into(),
            params: DataSourceParams {
                source_type,
                filename: None,
            },
        }
    }

    /// A source holding zero-row `atoms` and `bonds` blocks.
    pub fn empty() -> Self {
        Self::new(Frame::empty_molecule(), SourceType::Empty)
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.params.filename = Some(filename.into());
        self
    }

    pub fn frame(&self) -> &Arc<Frame> {
        &self.frame
    }

    /// Swaps in a new frame. The previous frame is not touched, so any
    /// trajectory still holding it keeps its history.
    pub fn set_frame(&mut self, frame: impl Into<Arc<Frame>>, source_type: SourceType) {
        self.frame = frame.into();
        self.params.source_type = source_type;
    }

    pub fn source_type(&self) -> SourceType {
        self.params.source_type
    }

    pub fn filename(&self) -> Option<&str> {
        self.params.filename.as_deref()
    }

    pub fn set_filename(&mut self, filename: Option<String>) {
        self.params.filename = filename;
    }
}

impl Modifier for DataSourceModifier {
    fn kind(&self) -> ModifierKind {
        ModifierKind::DataSource
    }

    fn label(&self) -> String {
        match &self.params.filename {
            Some(name) => format!("Data Source: {}", name),
            None => "Data Source".to_string(),
        }
    }

    fn apply(&self, _input: &Frame, _ctx: &mut ApplyContext) -> Result<Frame, MolvisError> {
        Ok(Frame::clone(&self.frame))
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::to_value(&self.params).unwrap_or_default()
    }

    fn update_parameters(&mut self, params: serde_json::Value) -> Result<(), MolvisError> {
        self.params = merge_parameters(&self.params, params)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MolvisConfig;
    use crate::frame::{Block, ATOMS};
    use serde_json::json;

    #[test]
    fn test_apply_ignores_input() {
        let mut atoms = Block::new();
        atoms.set_strings("element", vec!["C"]).unwrap();
        let mut held = Frame::new();
        held.insert_block(ATOMS, atoms);
        let source = DataSourceModifier::new(held.clone(), SourceType::Frame);

        let mut ctx = ApplyContext::new(Arc::new(MolvisConfig::default()));
        let out = source.apply(&Frame::empty_molecule(), &mut ctx).unwrap();

        assert_eq!(out, held);
    }

    #[test]
    fn test_set_frame_leaves_previous_frame_alone() {
        let first = Arc::new(Frame::empty_molecule());
        let mut source = DataSourceModifier::new(Arc::clone(&first), SourceType::Frame);
        source.set_frame(Frame::new(), SourceType::Xyz);

        assert_eq!(first.atom_count(), 0);
        assert!(first.contains_block(ATOMS));
        assert!(!source.frame().contains_block(ATOMS));
        assert_eq!(source.source_type(), SourceType::Xyz);
    }

    #[test]
    fn test_parameters_round_trip() {
        let mut source = DataSourceModifier::empty().with_filename("water.xyz");
        assert_eq!(
            source.parameters(),
            json!({ "source_type": "empty", "filename": "water.xyz" })
        );
        source
            .update_parameters(json!({ "source_type": "xyz" }))
            .unwrap();
        assert_eq!(source.source_type(), SourceType::Xyz);
        assert_eq!(source.label(), "Data Source: water.xyz");
    }
}
