// In: src/bridge/session.rs

//! The stateful command session behind one viewer widget.
//!
//! A `Session` owns the trajectory, the modifier pipeline, the last pipeline
//! result and the scene sink. Every mutating command re-applies the pipeline
//! and re-renders; source frames are replaced, never edited in place, so
//! frames already in the trajectory keep their history.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use bitvec::prelude::*;
use log::{info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::format::{block_to_json, box_block_from_json, frame_from_json, frame_to_json};
use super::protocol::{Request, Response};
use super::scene::{NullSink, SceneSink};
use crate::config::MolvisConfig;
use crate::error::MolvisError;
use crate::frame::{Block, Frame, Trajectory, ATOMS, BONDS, BOX};
use crate::io::read_xyz_str;
use crate::observability::init_logging;
use crate::modifier::hide::remove_atoms;
use crate::modifier::selection::resolve_selection;
use crate::modifier::{build_modifier, decode, DataSourceModifier, ModifierKind, SourceType};
use crate::pipeline::{ModifierId, ModifierPipeline, PipelineResult};

/// What pointer interaction in the viewer currently does.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    #[default]
    View,
    Select,
    Edit,
}

/// Commands the session hands to the scene sink untouched.
const FORWARDED: [&str; 5] = [
    "set_style",
    "set_theme",
    "set_view_mode",
    "draw_grid",
    "take_snapshot",
];

//==================================================================================
// Command parameters
//==================================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DrawFrameParams {
    frame_data: Value,
    #[serde(default)]
    options: Option<Value>,
}

#[derive(Deserialize)]
struct NewFrameParams {
    #[serde(default)]
    name: Option<String>,
    #[serde(default = "yes")]
    clear: bool,
}

fn yes() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DrawBoxParams {
    box_data: Value,
    #[serde(default)]
    options: Option<Value>,
}

#[derive(Deserialize)]
struct LoadXyzParams {
    content: String,
    #[serde(default)]
    filename: Option<String>,
}

#[derive(Deserialize)]
struct AdvanceParams {
    #[serde(default = "one")]
    delta: isize,
}

fn one() -> isize {
    1
}

#[derive(Deserialize)]
struct SeekParams {
    index: usize,
}

#[derive(Deserialize)]
struct AddModifierParams {
    kind: ModifierKind,
    #[serde(default)]
    params: Value,
    #[serde(default)]
    index: Option<usize>,
}

#[derive(Deserialize)]
struct ModifierRefParams {
    id: ModifierId,
}

#[derive(Deserialize)]
struct UpdateModifierParams {
    id: ModifierId,
    params: Value,
}

#[derive(Deserialize)]
struct ReorderParams {
    from: usize,
    to: usize,
}

#[derive(Deserialize)]
struct EnableParams {
    id: ModifierId,
    enabled: bool,
}

#[derive(Deserialize)]
struct GetSelectedParams {
    #[serde(default)]
    selection: Option<String>,
}

#[derive(Deserialize)]
struct SetModeParams {
    mode: InteractionMode,
}

#[derive(Deserialize)]
struct DeleteAtomsParams {
    indices: Vec<usize>,
}

#[derive(Deserialize)]
struct AddAtomParams {
    element: String,
    x: f32,
    y: f32,
    z: f32,
}

/// Decodes command parameters; a missing `params` behaves like `{}`.
fn params<P: serde::de::DeserializeOwned>(value: Value) -> Result<P, MolvisError> {
    if value.is_null() {
        decode(Value::Object(Default::default()))
    } else {
        decode(value)
    }
}

//==================================================================================
// Session
//==================================================================================

pub struct Session {
    id: u32,
    config: Arc<MolvisConfig>,
    trajectory: Trajectory,
    pipeline: ModifierPipeline,
    result: PipelineResult,
    mode: InteractionMode,
    draw_options: Value,
    sink: Box<dyn SceneSink>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Arc::new(MolvisConfig::default()), Box::new(NullSink))
    }
}

impl Session {
    /// Creates a session whose pipeline holds a single empty data source.
    pub fn new(config: Arc<MolvisConfig>, sink: Box<dyn SceneSink>) -> Self {
        let mut pipeline = ModifierPipeline::new(Arc::clone(&config));
        pipeline.add_modifier(Box::new(DataSourceModifier::empty()));
        let result = pipeline.apply();
        let id = rand::rng().random_range(0..100_000);
        info!("session {}: created", id);
        Self {
            id,
            trajectory: Trajectory::new(Vec::new(), config.trajectory.boundary),
            config,
            pipeline,
            result,
            mode: InteractionMode::default(),
            draw_options: Value::Null,
            sink,
        }
    }

    /// Installs the configured logger, then creates a session with `new`.
    ///
    /// # Errors
    /// `InvalidParameters` for an unknown log level, `Io` if the log file
    /// cannot be opened.
    pub fn from_config(config: MolvisConfig, sink: Box<dyn SceneSink>) -> Result<Self, MolvisError> {
        init_logging(&config.logging)?;
        Ok(Self::new(Arc::new(config), sink))
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn config(&self) -> &Arc<MolvisConfig> {
        &self.config
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn pipeline(&self) -> &ModifierPipeline {
        &self.pipeline
    }

    /// The result of the most recent pipeline run.
    pub fn result(&self) -> &PipelineResult {
        &self.result
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    /// Handles one raw protocol message and returns the serialized response.
    ///
    /// Never panics and never returns an error: malformed input, failed
    /// commands and panics inside a command all become `error` responses.
    pub fn handle_message(&mut self, message: &str) -> String {
        let request: Request = match serde_json::from_str(message) {
            Ok(request) => request,
            Err(err) => {
                warn!("session {}: malformed request: {}", self.id, err);
                return Response::failure(None, format!("Malformed request: {}", err))
                    .to_json_string();
            }
        };

        let Request {
            id,
            method,
            params: raw,
            ..
        } = request;
        let outcome = catch_unwind(AssertUnwindSafe(|| self.execute(&method, raw)));
        let response = match outcome {
            Ok(Ok(result)) => Response::success(id, result),
            Ok(Err(err)) => {
                warn!("session {}: '{}' failed: {}", self.id, method, err);
                Response::failure(id, err.to_string())
            }
            Err(payload) => {
                let detail = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                warn!("session {}: '{}' panicked: {}", self.id, method, detail);
                Response::failure(id, format!("Internal error while handling '{}': {}", method, detail))
            }
        };
        response.to_json_string()
    }

    /// Executes one decoded command.
    pub fn execute(&mut self, method: &str, raw: Value) -> Result<Value, MolvisError> {
        match method {
            "draw_frame" => {
                let p: DrawFrameParams = params(raw)?;
                let frame = frame_from_json(&p.frame_data)?;
                if let Some(options) = p.options {
                    self.draw_options = options;
                }
                self.push_frame(frame, SourceType::Frame, None)
            }
            "new_frame" => {
                let p: NewFrameParams = params(raw)?;
                let frame = if p.clear {
                    Frame::empty_molecule()
                } else {
                    Frame::clone(&self.source_frame())
                };
                self.push_frame(frame, SourceType::Frame, p.name)
            }
            "draw_box" => {
                let p: DrawBoxParams = params(raw)?;
                let mut frame = Frame::clone(&self.source_frame());
                frame.insert_block(BOX, box_block_from_json(&p.box_data)?);
                if let Some(options) = p.options {
                    self.draw_options = options;
                }
                self.commit_edit(frame)
            }
            "clear" => {
                self.trajectory.clear();
                self.set_source(Arc::new(Frame::empty_molecule()), SourceType::Empty, None)?;
                self.result = self.pipeline.apply();
                self.sink.clear();
                info!("session {}: cleared", self.id);
                Ok(json!({ "cleared": true }))
            }
            "load_xyz" => {
                let p: LoadXyzParams = params(raw)?;
                let trajectory = read_xyz_str(&p.content, self.config.trajectory.boundary)?;
                let first = trajectory.current().ok_or_else(|| {
                    MolvisError::FrameFormatError("XYZ content holds no frames".to_string())
                })?;
                info!(
                    "session {}: loaded {} xyz frame(s) from {}",
                    self.id,
                    trajectory.len(),
                    p.filename.as_deref().unwrap_or("<inline>")
                );
                self.trajectory = trajectory;
                self.set_source(first, SourceType::Xyz, p.filename)?;
                self.reapply()
            }
            "advance" => {
                let p: AdvanceParams = params(raw)?;
                let frame = self.trajectory.advance(p.delta).ok_or(MolvisError::IndexOutOfBounds {
                    index: 0,
                    len: 0,
                })?;
                self.navigate(frame)
            }
            "seek" => {
                let p: SeekParams = params(raw)?;
                let frame = self.trajectory.seek(p.index)?;
                self.navigate(frame)
            }
            "add_modifier" => {
                let p: AddModifierParams = params(raw)?;
                let modifier = build_modifier(p.kind, p.params)?;
                let id = match p.index {
                    Some(index) => self.pipeline.insert_modifier(index, modifier)?,
                    None => self.pipeline.add_modifier(modifier),
                };
                info!("session {}: added {} {}", self.id, p.kind, id);
                self.reapply_with(json!({ "id": id }))
            }
            "remove_modifier" => {
                let p: ModifierRefParams = params(raw)?;
                self.pipeline
                    .remove_modifier(p.id)
                    .ok_or(MolvisError::ModifierNotFound(p.id))?;
                self.reapply_with(json!({ "id": p.id }))
            }
            "update_modifier" => {
                let p: UpdateModifierParams = params(raw)?;
                self.pipeline
                    .get_modifier_mut(p.id)
                    .ok_or(MolvisError::ModifierNotFound(p.id))?
                    .update_parameters(p.params)?;
                self.reapply_with(json!({ "id": p.id }))
            }
            "reorder_modifiers" => {
                let p: ReorderParams = params(raw)?;
                self.pipeline.reorder(p.from, p.to)?;
                self.reapply()
            }
            "set_modifier_enabled" => {
                let p: EnableParams = params(raw)?;
                self.pipeline.set_enabled(p.id, p.enabled)?;
                self.reapply_with(json!({ "id": p.id, "enabled": p.enabled }))
            }
            "list_modifiers" => Ok(self.list_modifiers()),
            "apply_pipeline" => self.reapply(),
            "get_selected" => {
                let p: GetSelectedParams = params(raw)?;
                self.selected(p.selection.as_deref())
            }
            "dump_frame" => Ok(json!({ "frameData": frame_to_json(&self.result.frame) })),
            "get_frame_info" => Ok(self.frame_info()),
            "set_mode" => {
                let p: SetModeParams = params(raw)?;
                info!("session {}: mode {:?} -> {:?}", self.id, self.mode, p.mode);
                self.mode = p.mode;
                Ok(json!({ "mode": self.mode }))
            }
            "delete_atoms" => {
                self.require_edit(method)?;
                let p: DeleteAtomsParams = params(raw)?;
                let frame = self.source_frame();
                let atoms = frame.block(ATOMS)?.row_count();
                let mut keep = bitvec![1; atoms];
                for index in p.indices {
                    if index >= atoms {
                        return Err(MolvisError::IndexOutOfBounds { index, len: atoms });
                    }
                    keep.set(index, false);
                }
                let edited = remove_atoms(&frame, &keep)?;
                self.commit_edit(edited)
            }
            "add_atom" => {
                self.require_edit(method)?;
                let p: AddAtomParams = params(raw)?;
                let mut atom = Block::new();
                atom.set_strings("element", vec![p.element])?;
                atom.set_f32("x", vec![p.x])?;
                atom.set_f32("y", vec![p.y])?;
                atom.set_f32("z", vec![p.z])?;

                let mut edited = Frame::clone(&self.source_frame());
                let atoms = match edited.get_block(ATOMS) {
                    Some(existing) => existing.append(&atom)?,
                    None => atom,
                };
                edited.insert_block(ATOMS, atoms);
                self.commit_edit(edited)
            }
            _ if FORWARDED.contains(&method) => self.sink.forward(method, &raw),
            _ => Err(MolvisError::UnknownCommand(method.to_string())),
        }
    }

    //==============================================================================
    // Source & trajectory plumbing
    //==============================================================================

    /// The frame held by the pipeline's data source, or an empty molecule.
    fn source_frame(&self) -> Arc<Frame> {
        self.pipeline
            .get_modifiers()
            .into_iter()
            .find_map(|(_, m)| m.as_any().downcast_ref::<DataSourceModifier>())
            .map(|source| Arc::clone(source.frame()))
            .unwrap_or_else(|| Arc::new(Frame::empty_molecule()))
    }

    /// Points the data source at `frame`, inserting a source at the head of
    /// the pipeline if there is none.
    fn set_source(
        &mut self,
        frame: Arc<Frame>,
        source_type: SourceType,
        filename: Option<String>,
    ) -> Result<(), MolvisError> {
        let existing = self
            .pipeline
            .get_modifiers()
            .into_iter()
            .find(|(_, m)| m.kind() == ModifierKind::DataSource)
            .map(|(id, _)| id);
        let id = match existing {
            Some(id) => id,
            None => self
                .pipeline
                .insert_modifier(0, Box::new(DataSourceModifier::empty()))?,
        };
        let source = self
            .pipeline
            .get_modifier_mut(id)
            .and_then(|m| m.as_any_mut().downcast_mut::<DataSourceModifier>())
            .ok_or_else(|| MolvisError::InternalError("data source has an unexpected type".to_string()))?;
        source.set_frame(frame, source_type);
        if filename.is_some() {
            source.set_filename(filename);
        }
        Ok(())
    }

    /// Appends `frame` to the trajectory, moves the cursor onto it and makes
    /// it the source.
    fn push_frame(
        &mut self,
        frame: Frame,
        source_type: SourceType,
        name: Option<String>,
    ) -> Result<Value, MolvisError> {
        self.trajectory.append(frame);
        let frame = self.trajectory.seek(self.trajectory.len() - 1)?;
        self.set_source(frame, source_type, name)?;
        self.reapply()
    }

    /// Replaces the current trajectory slot (or starts the trajectory) with
    /// an edited copy of the source.
    fn commit_edit(&mut self, frame: Frame) -> Result<Value, MolvisError> {
        match self.trajectory.current_index() {
            Some(index) => {
                self.trajectory.replace(index, frame)?;
            }
            None => self.trajectory.append(frame),
        }
        let frame = self.trajectory.current().ok_or_else(|| {
            MolvisError::InternalError("trajectory empty after edit".to_string())
        })?;
        self.set_source(frame, SourceType::Frame, None)?;
        self.reapply()
    }

    /// Makes a trajectory frame the source, keeping the source's origin tag.
    fn navigate(&mut self, frame: Arc<Frame>) -> Result<Value, MolvisError> {
        let source_type = self
            .pipeline
            .get_modifiers()
            .into_iter()
            .find_map(|(_, m)| m.as_any().downcast_ref::<DataSourceModifier>())
            .map_or(SourceType::Frame, DataSourceModifier::source_type);
        self.set_source(frame, source_type, None)?;
        self.reapply()
    }

    fn require_edit(&self, method: &str) -> Result<(), MolvisError> {
        match self.mode {
            InteractionMode::Edit => Ok(()),
            _ => Err(MolvisError::ModeViolation(method.to_string())),
        }
    }

    //==============================================================================
    // Results
    //==============================================================================

    fn reapply(&mut self) -> Result<Value, MolvisError> {
        self.reapply_with(Value::Object(Default::default()))
    }

    /// Re-runs the pipeline, renders the result and returns a summary merged
    /// into `extra`.
    fn reapply_with(&mut self, extra: Value) -> Result<Value, MolvisError> {
        self.result = self.pipeline.apply();
        self.sink.render(&self.result.frame, &self.draw_options);
        info!(
            "session {}: rendered {} atoms, {} bonds ({} diagnostic(s))",
            self.id,
            self.result.frame.atom_count(),
            self.result.frame.bond_count(),
            self.result.diagnostics.len()
        );

        let mut summary = json!({
            "atoms": self.result.frame.atom_count(),
            "bonds": self.result.frame.bond_count(),
            "frame_index": self.trajectory.current_index(),
            "frames": self.trajectory.len(),
            "diagnostics": serde_json::to_value(&self.result.diagnostics)?,
        });
        if let (Value::Object(summary), Value::Object(extra)) = (&mut summary, extra) {
            summary.extend(extra);
        }
        Ok(summary)
    }

    fn list_modifiers(&self) -> Value {
        self.pipeline
            .entries()
            .iter()
            .map(|entry| {
                json!({
                    "id": entry.id(),
                    "kind": entry.modifier().kind(),
                    "label": entry.modifier().label(),
                    "enabled": entry.enabled(),
                    "params": entry.modifier().parameters(),
                })
            })
            .collect()
    }

    fn frame_info(&self) -> Value {
        json!({
            "frame_index": self.trajectory.current_index(),
            "frames": self.trajectory.len(),
            "atoms": self.result.frame.atom_count(),
            "bonds": self.result.frame.bond_count(),
            "blocks": self.result.frame.block_names(),
            "mode": self.mode,
        })
    }

    /// Atoms flagged by the selection and the bonds between them, as column
    /// maps. With no resolvable selection both maps are empty.
    fn selected(&self, explicit: Option<&str>) -> Result<Value, MolvisError> {
        let frame = &self.result.frame;
        let Some(name) = resolve_selection(explicit, frame)? else {
            return Ok(json!({ "selection": null, "atoms": {}, "bonds": {} }));
        };
        let mask = frame.block(ATOMS)?.get_bool(&name)?.to_bitvec();
        let subset = remove_atoms(frame, &mask)?;
        let bonds = subset
            .get_block(BONDS)
            .map_or_else(|| json!({}), block_to_json);
        Ok(json!({
            "selection": name,
            "atoms": block_to_json(subset.block(ATOMS)?),
            "bonds": bonds,
        }))
    }
}
