// In: src/modifier/filter.rs

use std::any::Any;

use log::debug;
use serde::{Deserialize, Serialize};

use super::hide::remove_atoms;
use super::{merge_parameters, ApplyContext, DiagnosticKind, Modifier, ModifierKind};
use crate::error::MolvisError;
use crate::frame::{Frame, ATOMS};
use crate::selection::{evaluate, parse_expression};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExpressionFilterParams {
    pub expression: String,
}

/// Keeps only the atoms matching an expression. Bonds are dropped and
/// re-indexed the same way as when hiding.
#[derive(Debug, Clone)]
pub struct ExpressionFilterModifier {
    params: ExpressionFilterParams,
}

impl ExpressionFilterModifier {
    pub fn new(expression: impl Into<String>) -> Self {
        Self::from_params(ExpressionFilterParams {
            expression: expression.into(),
        })
    }

    pub fn from_params(params: ExpressionFilterParams) -> Self {
        Self { params }
    }
}

impl Modifier for ExpressionFilterModifier {
    fn kind(&self) -> ModifierKind {
        ModifierKind::ExpressionFilter
    }

    fn label(&self) -> String {
        format!("Filter: {}", self.params.expression)
    }

    fn apply(&self, input: &Frame, ctx: &mut ApplyContext) -> Result<Frame, MolvisError> {
        let expr = parse_expression(&self.params.expression)?;
        let evaluation = evaluate(&expr, input.block(ATOMS)?)?;
        if evaluation.mismatched_rows > 0 {
            ctx.report(
                DiagnosticKind::EvaluationTypeMismatch,
                format!(
                    "{} row(s) compared a string with a number in '{}'",
                    evaluation.mismatched_rows, self.params.expression
                ),
            );
        }
        debug!(
            "filter kept {} of {} atoms",
            evaluation.mask.count_ones(),
            evaluation.mask.len()
        );
        remove_atoms(input, &evaluation.mask)
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
