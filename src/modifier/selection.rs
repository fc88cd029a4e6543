// In: src/modifier/selection.rs

//! Modifiers that create and maintain boolean selection columns on `atoms`.

use std::any::Any;

use log::debug;
use serde::{Deserialize, Serialize};

use super::{merge_parameters, ApplyContext, DiagnosticKind, Modifier, ModifierKind};
use crate::error::MolvisError;
use crate::frame::{Frame, ATOMS};
use crate::selection::{evaluate, parse_expression};

//==================================================================================
// Expression Selection
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExpressionSelectionParams {
    pub expression: String,
    /// Column to write; the configured default slot when absent.
    #[serde(default)]
    pub selection_name: Option<String>,
}

/// Flags the atoms matching an expression in a boolean column.
#[derive(Debug, Clone)]
pub struct ExpressionSelectionModifier {
    params: ExpressionSelectionParams,
}

impl ExpressionSelectionModifier {
    pub fn new(expression: impl Into<String>) -> Self {
        Self::from_params(ExpressionSelectionParams {
            expression: expression.into(),
            selection_name: None,
        })
    }

    pub fn from_params(params: ExpressionSelectionParams) -> Self {
        Self { params }
    }

    pub fn named(mut self, selection_name: impl Into<String>) -> Self {
        self.params.selection_name = Some(selection_name.into());
        self
    }

    pub fn expression(&self) -> &str {
        &self.params.expression
    }

    pub fn set_expression(&mut self, expression: impl Into<String>) {
        self.params.expression = expression.into();
    }
}

impl Modifier for ExpressionSelectionModifier {
    fn kind(&self) -> ModifierKind {
        ModifierKind::ExpressionSelection
    }

    fn label(&self) -> String {
        format!("Select: {}", self.params.expression)
    }

    fn apply(&self, input: &Frame, ctx: &mut ApplyContext) -> Result<Frame, MolvisError> {
        let expr = parse_expression(&self.params.expression)?;
        let atoms = input.block(ATOMS)?;
        let evaluation = evaluate(&expr, atoms)?;
        if evaluation.mismatched_rows > 0 {
            ctx.report(
                DiagnosticKind::EvaluationTypeMismatch,
                format!(
                    "{} row(s) compared a string with a number in '{}'",
                    evaluation.mismatched_rows, self.params.expression
                ),
            );
        }

        let name = self
            .params
            .selection_name
            .clone()
            .unwrap_or_else(|| ctx.config().selection.default_name.clone());
        debug!(
            "selection '{}' matched {} of {} atoms",
            name,
            evaluation.mask.count_ones(),
            evaluation.mask.len()
        );

        let mut output = input.clone();
        if let Some(atoms) = output.get_block_mut(ATOMS) {
            atoms.set_bool(name.as_str(), evaluation.mask)?;
        }
        output.set_active_selection(Some(name));
        Ok(output)
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

//==================================================================================
// Selection maintenance (invert / clear)
//==================================================================================

/// Parameters naming an existing selection column.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SelectionRefParams {
    /// Defaults to the frame's active selection.
    #[serde(default)]
    pub selection: Option<String>,
}

/// Resolves the selection column a maintenance modifier works on.
///
/// An explicitly named column must exist. A missing active selection, or an
/// active selection whose column has since disappeared, yields `None`.
pub(crate) fn resolve_selection(
    explicit: Option<&str>,
    frame: &Frame,
) -> Result<Option<String>, MolvisError> {
    let atoms = frame.get_block(ATOMS);
    match explicit {
        Some(name) => {
            let atoms = frame.block(ATOMS)?;
            atoms.column(name)?;
            Ok(Some(name.to_string()))
        }
        None => Ok(frame
            .active_selection()
            .filter(|name| atoms.is_some_and(|a| a.contains(name)))
            .map(str::to_string)),
    }
}

/// Flips every bit of a selection column.
#[derive(Debug, Clone, Default)]
pub struct InvertSelectionModifier {
    params: SelectionRefParams,
}

impl InvertSelectionModifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_params(params: SelectionRefParams) -> Self {
        Self { params }
    }
}

impl Modifier for InvertSelectionModifier {
    fn kind(&self) -> ModifierKind {
        ModifierKind::InvertSelection
    }

    fn apply(&self, input: &Frame, _ctx: &mut ApplyContext) -> Result<Frame, MolvisError> {
        let Some(name) = resolve_selection(self.params.selection.as_deref(), input)? else {
            debug!("invert: no selection to invert, passing frame through");
            return Ok(input.clone());
        };
        let mut output = input.clone();
        if let Some(atoms) = output.get_block_mut(ATOMS) {
            let inverted = !atoms.get_bool(&name)?.to_bitvec();
            atoms.set_bool(name.as_str(), inverted)?;
        }
        output.set_active_selection(Some(name));
        Ok(output)
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

/// Removes a selection column and forgets it as the active selection.
#[derive(Debug, Clone, Default)]
pub struct ClearSelectionModifier {
    params: SelectionRefParams,
}

impl ClearSelectionModifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_params(params: SelectionRefParams) -> Self {
        Self { params }
    }
}

impl Modifier for ClearSelectionModifier {
    fn kind(&self) -> ModifierKind {
        ModifierKind::ClearSelection
    }

    fn apply(&self, input: &Frame, _ctx: &mut ApplyContext) -> Result<Frame, MolvisError> {
        let Some(name) = resolve_selection(self.params.selection.as_deref(), input)? else {
            debug!("clear: no selection to clear, passing frame through");
            return Ok(input.clone());
        };
        let mut output = input.clone();
        if let Some(atoms) = output.get_block_mut(ATOMS) {
            atoms.remove_column(&name);
        }
        if output.active_selection() == Some(name.as_str()) {
            output.set_active_selection(None);
        }
        Ok(output)
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
    use std::sync::Arc;

    use bitvec::prelude::*;

    use super::*;
    use crate::config::MolvisConfig;
    use crate::frame::Block;
    use crate::selection::ParseError;

    fn water() -> Frame {
        let mut atoms = Block::new();
        atoms.set_f32("x", vec![0.0, 0.757, -0.757]).unwrap();
        atoms.set_f32("y", vec![0.0, 0.586, 0.586]).unwrap();
        atoms.set_f32("z", vec![0.0, 0.0, 0.0]).unwrap();
        atoms.set_strings("element", vec!["O", "H", "H"]).unwrap();
        let mut frame = Frame::new();
        frame.insert_block(ATOMS, atoms);
        frame
    }

    fn ctx() -> ApplyContext {
        ApplyContext::new(Arc::new(MolvisConfig::default()))
    }

    #[test]
    fn test_selection_writes_default_column() {
        let out = ExpressionSelectionModifier::new("element == 'H'")
            .apply(&water(), &mut ctx())
            .unwrap();
        let atoms = out.get_block(ATOMS).unwrap();
        assert_eq!(atoms.get_bool("selected").unwrap(), bits![0, 1, 1]);
        assert_eq!(out.active_selection(), Some("selected"));
    }

    #[test]
    fn test_selection_uses_configured_default_name() {
        let mut config = MolvisConfig::default();
        config.selection.default_name = "picked".to_string();
        let mut ctx = ApplyContext::new(Arc::new(config));
        let out = ExpressionSelectionModifier::new("index == 0")
            .apply(&water(), &mut ctx)
            .unwrap();
        assert!(out.get_block(ATOMS).unwrap().contains("picked"));
    }

    #[test]
    fn test_malformed_expression_is_a_parse_error() {
        let result = ExpressionSelectionModifier::new("element ==").apply(&water(), &mut ctx());
        assert!(matches!(
            result,
            Err(MolvisError::Parse(ParseError::UnexpectedEof))
        ));
    }

    #[test]
    fn test_type_mismatch_is_reported_once() {
        let mut ctx = ctx();
        let out = ExpressionSelectionModifier::new("x == 'H'")
            .named("odd")
            .apply(&water(), &mut ctx)
            .unwrap();
        assert_eq!(out.get_block(ATOMS).unwrap().get_bool("odd").unwrap().count_ones(), 0);
        let diagnostics = ctx.into_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::EvaluationTypeMismatch);
        assert!(diagnostics[0].message.starts_with("3 row(s)"));
    }

    #[test]
    fn test_invert_then_clear() {
        let selected = ExpressionSelectionModifier::new("element == 'O'")
            .apply(&water(), &mut ctx())
            .unwrap();

        let inverted = InvertSelectionModifier::new()
            .apply(&selected, &mut ctx())
            .unwrap();
        let atoms = inverted.get_block(ATOMS).unwrap();
        assert_eq!(atoms.get_bool("selected").unwrap(), bits![0, 1, 1]);

        let cleared = ClearSelectionModifier::new()
            .apply(&inverted, &mut ctx())
            .unwrap();
        assert!(!cleared.get_block(ATOMS).unwrap().contains("selected"));
        assert_eq!(cleared.active_selection(), None);
    }

    #[test]
    fn test_maintenance_without_selection_passes_through() {
        let frame = water();
        let out = InvertSelectionModifier::new().apply(&frame, &mut ctx()).unwrap();
        assert_eq!(out, frame);
        let out = ClearSelectionModifier::new().apply(&frame, &mut ctx()).unwrap();
        assert_eq!(out, frame);
    }

    #[test]
    fn test_explicit_missing_selection_is_an_error() {
        let modifier = InvertSelectionModifier::from_params(SelectionRefParams {
            selection: Some("ghost".to_string()),
        });
        assert!(matches!(
            modifier.apply(&water(), &mut ctx()),
            Err(MolvisError::ColumnNotFound(_))
        ));
    }
}
