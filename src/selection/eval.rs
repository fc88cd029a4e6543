// In: src/selection/eval.rs

//! Row-by-row evaluation of a parsed expression against an atoms block.

use bitvec::prelude::*;

use super::ast::{CompareOp, Expr, Operand, Variable};
use crate::error::MolvisError;
use crate::frame::{Block, Column, RowMask};

/// The result of evaluating an expression over every row of a block.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// One bit per row, set where the expression matched.
    pub mask: RowMask,
    /// Rows skipped because a comparison mixed strings and numbers.
    pub mismatched_rows: usize,
}

#[derive(Debug, Clone, Copy)]
enum Value<'a> {
    Num(f64),
    Str(&'a str),
}

/// Resolved column handles for the variables an expression reads.
struct RowSource<'a> {
    x: Option<&'a Column>,
    y: Option<&'a Column>,
    z: Option<&'a Column>,
    element: Option<&'a Column>,
    id: Option<&'a Column>,
}

impl<'a> RowSource<'a> {
    fn resolve(expr: &Expr, atoms: &'a Block) -> Result<Self, MolvisError> {
        let mut source = RowSource {
            x: None,
            y: None,
            z: None,
            element: None,
            id: atoms.get_column("id"),
        };
        for variable in expr.variables() {
            let Some(name) = variable.column() else {
                continue;
            };
            let column = atoms.column(name)?;
            match variable {
                Variable::X => source.x = Some(column),
                Variable::Y => source.y = Some(column),
                Variable::Z => source.z = Some(column),
                Variable::Element => source.element = Some(column),
                Variable::Id | Variable::Index => {}
            }
        }
        Ok(source)
    }

    fn cell(column: Option<&'a Column>, row: usize) -> Option<Value<'a>> {
        let column = column?;
        column
            .numeric_at(row)
            .map(Value::Num)
            .or_else(|| column.str_at(row).map(Value::Str))
    }

    fn value(&self, variable: Variable, row: usize) -> Option<Value<'a>> {
        match variable {
            Variable::X => Self::cell(self.x, row),
            Variable::Y => Self::cell(self.y, row),
            Variable::Z => Self::cell(self.z, row),
            Variable::Element => Self::cell(self.element, row),
            Variable::Id => match self.id {
                Some(column) => Self::cell(Some(column), row),
                None => Some(Value::Num(row as f64)),
            },
            Variable::Index => Some(Value::Num(row as f64)),
        }
    }
}

/// Evaluates `expr` for every row of `atoms`.
///
/// Referenced columns must exist. A comparison between a string and a number
/// makes its row non-matching and is counted in `mismatched_rows`.
pub fn evaluate(expr: &Expr, atoms: &Block) -> Result<Evaluation, MolvisError> {
    let source = RowSource::resolve(expr, atoms)?;
    let rows = atoms.row_count();

    let mut mask = bitvec![0; rows];
    let mut mismatched_rows = 0;
    for row in 0..rows {
        match eval_row(expr, &source, row) {
            Some(hit) => mask.set(row, hit),
            None => mismatched_rows += 1,
        }
    }
    Ok(Evaluation {
        mask,
        mismatched_rows,
    })
}

/// `None` marks a type mismatch; `and`/`or` short-circuit before reaching one.
fn eval_row(expr: &Expr, source: &RowSource<'_>, row: usize) -> Option<bool> {
    match expr {
        Expr::Compare { lhs, op, rhs } => {
            let a = operand_value(lhs, source, row)?;
            let b = operand_value(rhs, source, row)?;
            compare(*op, a, b)
        }
        Expr::And(a, b) => match eval_row(a, source, row)? {
            false => Some(false),
            true => eval_row(b, source, row),
        },
        Expr::Or(a, b) => match eval_row(a, source, row)? {
            true => Some(true),
            false => eval_row(b, source, row),
        },
        Expr::Not(inner) => eval_row(inner, source, row).map(|hit| !hit),
    }
}

fn operand_value<'a>(operand: &'a Operand, source: &RowSource<'a>, row: usize) -> Option<Value<'a>> {
    match operand {
        Operand::Var(variable) => source.value(*variable, row),
        Operand::Number(n) => Some(Value::Num(*n)),
        Operand::Str(s) => Some(Value::Str(s)),
    }
}

fn compare(op: CompareOp, a: Value<'_>, b: Value<'_>) -> Option<bool> {
    match (a, b) {
        (Value::Num(a), Value::Num(b)) => Some(op.compare_f64(a, b)),
        (Value::Str(a), Value::Str(b)) => Some(op.compare_str(a, b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::parse_expression;

    fn water_atoms() -> Block {
        let mut atoms = Block::new();
        atoms.set_f32("x", vec![0.0, 0.757, -0.757]).unwrap();
        atoms.set_f32("y", vec![0.0, 0.586, 0.586]).unwrap();
        atoms.set_f32("z", vec![0.0, 0.0, 0.0]).unwrap();
        atoms.set_strings("element", vec!["O", "H", "H"]).unwrap();
        atoms
    }

    fn select(expression: &str, atoms: &Block) -> Evaluation {
        evaluate(&parse_expression(expression).unwrap(), atoms).unwrap()
    }

    #[test]
    fn test_element_equality() {
        let result = select("element == 'H'", &water_atoms());
        assert_eq!(result.mask, bitvec![0, 1, 1]);
        assert_eq!(result.mismatched_rows, 0);
    }

    #[test]
    fn test_coordinate_ranges_and_logic() {
        let atoms = water_atoms();
        assert_eq!(select("x > 0 and y > 0", &atoms).mask, bitvec![0, 1, 0]);
        assert_eq!(select("x > 0 || x < 0", &atoms).mask, bitvec![0, 1, 1]);
        assert_eq!(select("not x == 0.757", &atoms).mask, bitvec![1, 0, 1]);
    }

    #[test]
    fn test_index_and_id_fall_back_to_row_number() {
        let mut atoms = water_atoms();
        assert_eq!(select("index >= 1", &atoms).mask, bitvec![0, 1, 1]);
        assert_eq!(select("id == 0", &atoms).mask, bitvec![1, 0, 0]);

        atoms.set_u32("id", vec![10, 11, 12]).unwrap();
        assert_eq!(select("id == 12", &atoms).mask, bitvec![0, 0, 1]);
        assert_eq!(select("index == 2", &atoms).mask, bitvec![0, 0, 1]);
    }

    #[test]
    fn test_type_mismatch_skips_rows() {
        let result = select("x == 'H'", &water_atoms());
        assert_eq!(result.mask, bitvec![0, 0, 0]);
        assert_eq!(result.mismatched_rows, 3);
    }

    #[test]
    fn test_short_circuit_avoids_mismatch() {
        let result = select("element == 'O' or element > 1", &water_atoms());
        assert_eq!(result.mask, bitvec![1, 0, 0]);
        assert_eq!(result.mismatched_rows, 2);
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let mut atoms = water_atoms();
        atoms.remove_column("element");
        let expr = parse_expression("element == 'C'").unwrap();
        assert!(matches!(
            evaluate(&expr, &atoms),
            Err(MolvisError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_zero_row_block() {
        let mut atoms = Block::new();
        atoms.set_strings::<String>("element", Vec::new()).unwrap();
        let result = select("element == 'H'", &atoms);
        assert!(result.mask.is_empty());
    }
}
