// In: src/pipeline/mod.rs

//! The ordered, re-runnable modifier chain.
//!
//! `ModifierPipeline::apply` recomputes the whole chain on every call. There
//! are no caches, so editing any modifier's parameters and calling `apply`
//! again always reflects the edit, and two calls with nothing changed in
//! between yield structurally equal frames.

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::MolvisConfig;
use crate::error::MolvisError;
use crate::frame::Frame;
use crate::modifier::{ApplyContext, Diagnostic, DiagnosticKind, Modifier, ModifierKind};

/// Stable identity of a modifier within one pipeline. Ids are never reused.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ModifierId(pub u64);

impl fmt::Display for ModifierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One slot of the pipeline.
#[derive(Debug)]
pub struct ModifierEntry {
    id: ModifierId,
    enabled: bool,
    modifier: Box<dyn Modifier>,
}

impl ModifierEntry {
    pub fn id(&self) -> ModifierId {
        self.id
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn modifier(&self) -> &dyn Modifier {
        self.modifier.as_ref()
    }
}

/// **CONTRACT:** The unified result of a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineResult {
    pub frame: Frame,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug)]
pub struct ModifierPipeline {
    entries: Vec<ModifierEntry>,
    next_id: u64,
    config: Arc<MolvisConfig>,
}

impl Default for ModifierPipeline {
    fn default() -> Self {
        Self::new(Arc::new(MolvisConfig::default()))
    }
}

impl ModifierPipeline {
    pub fn new(config: Arc<MolvisConfig>) -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
            config,
        }
    }

    pub fn config(&self) -> &Arc<MolvisConfig> {
        &self.config
    }

    fn allocate_id(&mut self) -> ModifierId {
        let id = ModifierId(self.next_id);
        self.next_id += 1;
        id
    }

    //==============================================================================
    // Editing
    //==============================================================================

    /// Appends an enabled modifier to the end of the chain.
    pub fn add_modifier(&mut self, modifier: Box<dyn Modifier>) -> ModifierId {
        let id = self.allocate_id();
        debug!("pipeline: add {} {}", id, modifier.label());
        self.entries.push(ModifierEntry {
            id,
            enabled: true,
            modifier,
        });
        id
    }

    /// Inserts an enabled modifier at `index` (`index == len` appends).
    pub fn insert_modifier(
        &mut self,
        index: usize,
        modifier: Box<dyn Modifier>,
    ) -> Result<ModifierId, MolvisError> {
        if index > self.entries.len() {
            return Err(MolvisError::IndexOutOfBounds {
                index,
                len: self.entries.len(),
            });
        }
        let id = self.allocate_id();
        self.entries.insert(
            index,
            ModifierEntry {
                id,
                enabled: true,
                modifier,
            },
        );
        Ok(id)
    }

    pub fn remove_modifier(&mut self, id: ModifierId) -> Option<Box<dyn Modifier>> {
        let position = self.position(id)?;
        Some(self.entries.remove(position).modifier)
    }

    /// The modifiers in chain order, with their ids.
    pub fn get_modifiers(&self) -> Vec<(ModifierId, &dyn Modifier)> {
        self.entries
            .iter()
            .map(|entry| (entry.id, entry.modifier.as_ref()))
            .collect()
    }

    pub fn entries(&self) -> &[ModifierEntry] {
        &self.entries
    }

    pub fn get_modifier(&self, id: ModifierId) -> Option<&dyn Modifier> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.modifier.as_ref())
    }

    pub fn get_modifier_mut(&mut self, id: ModifierId) -> Option<&mut (dyn Modifier + 'static)> {
        self.entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .map(|entry| entry.modifier.as_mut())
    }

    pub fn position(&self, id: ModifierId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    /// Moves the modifier at `from` so that it ends up at index `to`.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), MolvisError> {
        let len = self.entries.len();
        for index in [from, to] {
            if index >= len {
                return Err(MolvisError::IndexOutOfBounds { index, len });
            }
        }
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
        Ok(())
    }

    pub fn set_enabled(&mut self, id: ModifierId, enabled: bool) -> Result<(), MolvisError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or(MolvisError::ModifierNotFound(id))?;
        entry.enabled = enabled;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    //==============================================================================
    // Execution
    //==============================================================================

    /// Runs the chain from an empty frame.
    ///
    /// The first enabled modifier must be a data source; otherwise the result
    /// is an empty frame carrying a `MissingSource` diagnostic.
    pub fn apply(&self) -> PipelineResult {
        let mut ctx = ApplyContext::new(Arc::clone(&self.config));
        let leading = self.entries.iter().find(|entry| entry.enabled);
        if !matches!(leading, Some(entry) if entry.modifier.kind() == ModifierKind::DataSource) {
            ctx.report(DiagnosticKind::MissingSource, MolvisError::MissingSource.to_string());
            return PipelineResult {
                frame: Frame::new(),
                diagnostics: ctx.into_diagnostics(),
            };
        }
        self.fold(Frame::new(), ctx)
    }

    /// Runs the chain seeded with `base` instead of an empty frame. No data
    /// source is required.
    pub fn apply_to(&self, base: &Frame) -> PipelineResult {
        let ctx = ApplyContext::new(Arc::clone(&self.config));
        self.fold(base.clone(), ctx)
    }

    fn fold(&self, seed: Frame, mut ctx: ApplyContext) -> PipelineResult {
        let mut frame = seed;
        for entry in self.entries.iter().filter(|entry| entry.enabled) {
            let label = entry.modifier.label();
            ctx.enter(Some(label.clone()));
            match entry.modifier.apply(&frame, &mut ctx) {
                Ok(next) => {
                    debug!(
                        "stage {} '{}': {} atoms, {} bonds",
                        entry.id,
                        label,
                        next.atom_count(),
                        next.bond_count()
                    );
                    frame = next;
                }
                Err(err) => {
                    let kind = match err {
                        MolvisError::Parse(_) => DiagnosticKind::ParseError,
                        _ => DiagnosticKind::ModifierFailed,
                    };
                    warn!("stage {} failed, passing its input through", entry.id);
                    ctx.report(kind, err.to_string());
                }
            }
        }
        ctx.enter(None);

        log_metric!(
            "event" = "pipeline_apply",
            "stages" = self.entries.len(),
            "atoms" = frame.atom_count(),
            "bonds" = frame.bond_count(),
            "diagnostics" = ctx.diagnostics().len()
        );
        PipelineResult {
            frame,
            diagnostics: ctx.into_diagnostics(),
        }
    }
}
