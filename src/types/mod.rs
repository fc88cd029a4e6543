//! This module defines the core, strongly-typed tags used throughout the
//! frame storage layer.
//!
//! It currently includes the `ColumnType` enum that names the kind of data a
//! `Column` holds and maps it onto Arrow.

pub mod column_type;

pub use column_type::ColumnType;
