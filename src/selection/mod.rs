// In: src/selection/mod.rs

//! The atom selection language.
//!
//! Expressions compare per-atom variables (`x`, `y`, `z`, `element`, `id`,
//! `index`) against numeric or quoted string literals and combine the results
//! with `and` / `or` / `not` (or `&&` / `||` / `!`). Parsing is strict: any
//! malformed input or unknown identifier is a `ParseError`. Evaluation is
//! lenient: a string/number comparison only disqualifies its own row.

//==================================================================================
// 1. Module Declarations
//==================================================================================

pub mod ast;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;

//==================================================================================
// 2. Public API Re-exports
//==================================================================================

pub use self::ast::{CompareOp, Expr, Operand, Variable};
pub use self::error::ParseError;
pub use self::eval::{evaluate, Evaluation};
pub use self::parser::parse_expression;
