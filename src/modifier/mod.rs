// In: src/modifier/mod.rs

//! Frame-to-frame transformation stages.
//!
//! Every stage implements `Modifier`. A modifier is a pure function of its
//! input frame and its own parameters, with one exception: the
//! `DataSourceModifier` ignores its input and returns the frame it holds, which
//! is why it must sit at the root of a pipeline.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::MolvisConfig;
use crate::error::MolvisError;
use crate::frame::Frame;

//==================================================================================
// 1. Module Declarations
//==================================================================================

pub mod data_source;
pub mod filter;
pub mod hide;
pub mod selection;

//==================================================================================
// 2. Public API Re-exports
//==================================================================================

pub use self::data_source::{DataSourceModifier, SourceType};
pub use self::filter::ExpressionFilterModifier;
pub use self::hide::HideSelectionModifier;
pub use self::selection::{
    ClearSelectionModifier, ExpressionSelectionModifier, InvertSelectionModifier,
};

//==================================================================================
// 3. Contracts
//==================================================================================

/// The closed set of modifier variants, as named on the bridge protocol.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ModifierKind {
    DataSource,
    ExpressionSelection,
    HideSelection,
    ExpressionFilter,
    InvertSelection,
    ClearSelection,
}

impl fmt::Display for ModifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModifierKind::DataSource => "Data Source",
            ModifierKind::ExpressionSelection => "Expression Selection",
            ModifierKind::HideSelection => "Hide Selection",
            ModifierKind::ExpressionFilter => "Expression Filter",
            ModifierKind::InvertSelection => "Invert Selection",
            ModifierKind::ClearSelection => "Clear Selection",
        };
        f.write_str(name)
    }
}

/// **CONTRACT:** The trait that every pipeline stage implements.
pub trait Modifier: fmt::Debug + Send {
    fn kind(&self) -> ModifierKind;

    /// A short human-readable description for UI lists.
    fn label(&self) -> String {
        self.kind().to_string()
    }

    /// Produces a new frame from `input`. Errors are local to this stage: the
    /// pipeline records them and passes `input` through.
    fn apply(&self, input: &Frame, ctx: &mut ApplyContext) -> Result<Frame, MolvisError>;

    /// The current parameters as JSON.
    fn parameters(&self) -> serde_json::Value;

    /// Overlays the given JSON object onto the current parameters. Keys not
    /// present keep their value.
    fn update_parameters(&mut self, params: serde_json::Value) -> Result<(), MolvisError>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

//==================================================================================
// 4. Diagnostics & Apply Context
//==================================================================================

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A selection or filter expression did not parse.
    ParseError,
    /// Some rows compared strings with numbers and were treated as non-matching.
    EvaluationTypeMismatch,
    /// No enabled `DataSourceModifier` leads the pipeline.
    MissingSource,
    /// Any other stage failure.
    ModifierFailed,
}

/// A non-fatal, observable fault raised while applying a pipeline.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Label of the modifier that raised it, if any.
    pub modifier: Option<String>,
    pub message: String,
}

/// Shared state handed to every `Modifier::apply` call of one pipeline run.
#[derive(Debug)]
pub struct ApplyContext {
    config: Arc<MolvisConfig>,
    current: Option<String>,
    diagnostics: Vec<Diagnostic>,
}

impl ApplyContext {
    pub fn new(config: Arc<MolvisConfig>) -> Self {
        Self {
            config,
            current: None,
            diagnostics: Vec::new(),
        }
    }

    pub fn config(&self) -> &MolvisConfig {
        &self.config
    }

    /// Names the stage that subsequent reports are attributed to.
    pub(crate) fn enter(&mut self, label: Option<String>) {
        self.current = label;
    }

    /// Records and logs a diagnostic against the current stage.
    pub fn report(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        match &self.current {
            Some(label) => warn!("[{}] {:?}: {}", label, kind, message),
            None => warn!("{:?}: {}", kind, message),
        }
        self.diagnostics.push(Diagnostic {
            kind,
            modifier: self.current.clone(),
            message,
        });
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

//==================================================================================
// 5. Factory
//==================================================================================

/// Builds a modifier of the given kind from bridge-supplied JSON parameters.
/// `null` is treated as an empty parameter object.
pub fn build_modifier(
    kind: ModifierKind,
    params: serde_json::Value,
) -> Result<Box<dyn Modifier>, MolvisError> {
    let params = if params.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        params
    };
    let modifier: Box<dyn Modifier> = match kind {
        ModifierKind::DataSource => {
            let mut source = DataSourceModifier::empty();
            source.update_parameters(params)?;
            Box::new(source)
        }
        ModifierKind::ExpressionSelection => {
            Box::new(ExpressionSelectionModifier::from_params(decode(params)?))
        }
        ModifierKind::HideSelection => Box::new(HideSelectionModifier::from_params(decode(params)?)),
        ModifierKind::ExpressionFilter => {
            Box::new(ExpressionFilterModifier::from_params(decode(params)?))
        }
        ModifierKind::InvertSelection => {
            Box::new(InvertSelectionModifier::from_params(decode(params)?))
        }
        ModifierKind::ClearSelection => Box::new(ClearSelectionModifier::from_params(decode(params)?)),
    };
    Ok(modifier)
}

/// Deserializes a parameter struct, reporting failures as `InvalidParameters`.
pub(crate) fn decode<P: DeserializeOwned>(params: serde_json::Value) -> Result<P, MolvisError> {
    serde_json::from_value(params).map_err(|e| MolvisError::InvalidParameters(e.to_string()))
}

/// Overlays the keys of `patch` onto the serialized form of `current`.
pub(crate) fn merge_parameters<P>(current: &P, patch: serde_json::Value) -> Result<P, MolvisError>
where
    P: Serialize + DeserializeOwned,
{
    let serde_json::Value::Object(patch) = patch else {
        return Err(MolvisError::InvalidParameters(
            "parameters must be a JSON object".to_string(),
        ));
    };
    let mut merged = serde_json::to_value(current)?;
    if let serde_json::Value::Object(fields) = &mut merged {
        fields.extend(patch);
    }
    decode(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_uses_snake_case_on_the_wire() {
        let kind: ModifierKind = serde_json::from_value(json!("expression_selection")).unwrap();
        assert_eq!(kind, ModifierKind::ExpressionSelection);
        assert_eq!(
            serde_json::to_value(ModifierKind::HideSelection).unwrap(),
            json!("hide_selection")
        );
    }

    #[test]
    fn test_build_modifier_for_every_kind() {
        let cases = [
            (ModifierKind::DataSource, json!(null)),
            (ModifierKind::ExpressionSelection, json!({ "expression": "x > 0" })),
            (ModifierKind::HideSelection, json!({})),
            (ModifierKind::ExpressionFilter, json!({ "expression": "x > 0" })),
            (ModifierKind::InvertSelection, json!(null)),
            (ModifierKind::ClearSelection, json!({ "selection": "picked" })),
        ];
        for (kind, params) in cases {
            let modifier = build_modifier(kind, params).unwrap();
            assert_eq!(modifier.kind(), kind);
        }
    }

    #[test]
    fn test_build_modifier_rejects_missing_expression() {
        let result = build_modifier(ModifierKind::ExpressionSelection, json!({}));
        assert!(matches!(result, Err(MolvisError::InvalidParameters(_))));
    }

    #[test]
    fn test_update_parameters_merges_keys() {
        let mut modifier = build_modifier(
            ModifierKind::ExpressionSelection,
            json!({ "expression": "x > 0", "selection_name": "right" }),
        )
        .unwrap();
        modifier
            .update_parameters(json!({ "expression": "x < 0" }))
            .unwrap();
        assert_eq!(
            modifier.parameters(),
            json!({ "expression": "x < 0", "selection_name": "right" })
        );
        assert!(modifier.update_parameters(json!([1, 2])).is_err());
    }

    #[test]
    fn test_context_attributes_reports_to_the_current_stage() {
        let mut ctx = ApplyContext::new(Arc::new(MolvisConfig::default()));
        ctx.enter(Some("Expression Selection".to_string()));
        ctx.report(DiagnosticKind::EvaluationTypeMismatch, "2 rows");
        let diagnostics = ctx.into_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].modifier.as_deref(), Some("Expression Selection"));
    }
}
