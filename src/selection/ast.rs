// In: src/selection/ast.rs

//! Syntax tree for atom selection expressions.

use std::fmt;

/// A per-atom quantity an expression may read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    X,
    Y,
    Z,
    Element,
    /// The `id` column when present, else the row index.
    Id,
    Index,
}

impl Variable {
    /// Case-insensitive lookup of an identifier.
    pub fn lookup(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "x" => Some(Variable::X),
            "y" => Some(Variable::Y),
            "z" => Some(Variable::Z),
            "element" => Some(Variable::Element),
            "id" => Some(Variable::Id),
            "index" => Some(Variable::Index),
            _ => None,
        }
    }

    /// The atoms column backing this variable, if any.
    pub fn column(self) -> Option<&'static str> {
        match self {
            Variable::X => Some("x"),
            Variable::Y => Some("y"),
            Variable::Z => Some("z"),
            Variable::Element => Some("element"),
            Variable::Id | Variable::Index => None,
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Variable::X => "x",
            Variable::Y => "y",
            Variable::Z => "z",
            Variable::Element => "element",
            Variable::Id => "id",
            Variable::Index => "index",
        };
        f.write_str(name)
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// Numeric comparison. Equality tolerates the rounding introduced by
    /// storing coordinates as `f32`.
    #[inline]
    pub fn compare_f64(self, a: f64, b: f64) -> bool {
        let tolerance = f64::from(f32::EPSILON) * a.abs().max(b.abs()).max(1.0);
        match self {
            CompareOp::Eq => (a - b).abs() <= tolerance,
            CompareOp::Ne => (a - b).abs() > tolerance,
            CompareOp::Lt => a < b,
            CompareOp::Le => a <= b,
            CompareOp::Gt => a > b,
            CompareOp::Ge => a >= b,
        }
    }

    #[inline]
    pub fn compare_str(self, a: &str, b: &str) -> bool {
        match self {
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            CompareOp::Lt => a < b,
            CompareOp::Le => a <= b,
            CompareOp::Gt => a > b,
            CompareOp::Ge => a >= b,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "=="),
            CompareOp::Ne => write!(f, "!="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Le => write!(f, "<="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Ge => write!(f, ">="),
        }
    }
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Var(Variable),
    Number(f64),
    Str(String),
}

/// A parsed selection expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Compare {
        lhs: Operand,
        op: CompareOp,
        rhs: Operand,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    /// Every variable referenced anywhere in the expression.
    pub fn variables(&self) -> Vec<Variable> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut Vec<Variable>) {
        match self {
            Expr::Compare { lhs, rhs, .. } => {
                for operand in [lhs, rhs] {
                    if let Operand::Var(v) = operand {
                        if !out.contains(v) {
                            out.push(*v);
                        }
                    }
                }
            }
            Expr::And(a, b) | Expr::Or(a, b) => {
                a.collect_variables(out);
                b.collect_variables(out);
            }
            Expr::Not(inner) => inner.collect_variables(out),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Var(v) => write!(f, "{}", v),
            Operand::Number(n) => write!(f, "{}", n),
            Operand::Str(s) => write!(f, "'{}'", s),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Compare { lhs, op, rhs } => write!(f, "{} {} {}", lhs, op, rhs),
            Expr::And(a, b) => write!(f, "({} and {})", a, b),
            Expr::Or(a, b) => write!(f, "({} or {})", a, b),
            Expr::Not(inner) => write!(f, "not {}", inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_lookup_is_case_insensitive() {
        assert_eq!(Variable::lookup("Element"), Some(Variable::Element));
        assert_eq!(Variable::lookup("X"), Some(Variable::X));
        assert_eq!(Variable::lookup("mass"), None);
    }

    #[test]
    fn test_float_equality_absorbs_f32_rounding() {
        let stored = f64::from(0.757f32);
        assert!(CompareOp::Eq.compare_f64(stored, 0.757));
        assert!(!CompareOp::Ne.compare_f64(stored, 0.757));
        assert!(CompareOp::Lt.compare_f64(-0.757, 0.0));
    }
}
