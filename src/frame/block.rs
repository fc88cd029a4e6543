// In: src/frame/block.rs

//! A `Block` is one columnar table inside a `Frame`: the atoms, the bonds, or
//! the simulation box.
//!
//! **Length invariant:** every column in a block has the same number of rows.
//! The first column establishes the row count; any later column of a different
//! length is rejected with `LengthMismatch` and the block is left untouched.

use std::sync::Arc;

use arrow::datatypes::{Field, Schema};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use bitvec::slice::BitSlice;
use hashbrown::HashMap;
use ndarray::{Array2, ArrayView2, ErrorKind, ShapeError};

use super::column::{Column, RowMask};
use crate::error::MolvisError;
use crate::types::ColumnType;

/// A named set of same-length typed columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    columns: HashMap<String, Column>,
    /// Column names in insertion order.
    order: Vec<String>,
}

/// Generates a typed getter that pattern-matches one `Column` variant.
macro_rules! typed_getter {
    ($fn_name:ident, $variant:ident, $ty:ty, $col_ty:expr) => {
        pub fn $fn_name(&self, name: &str) -> Result<&$ty, MolvisError> {
            match self.column(name)? {
                Column::$variant(values) => Ok(&values[..]),
                other => Err(MolvisError::TypeMismatch {
                    column: name.to_string(),
                    expected: $col_ty,
                    found: other.column_type(),
                }),
            }
        }
    };
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared row count, 0 for a block without columns.
    pub fn row_count(&self) -> usize {
        self.order
            .first()
            .and_then(|name| self.columns.get(name))
            .map_or(0, Column::len)
    }

    pub fn num_columns(&self) -> usize {
        self.order.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column names in the order they were first set.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// `(name, column)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.order
            .iter()
            .filter_map(move |name| self.columns.get(name).map(|c| (name.as_str(), c)))
    }

    /// Row count imposed by every column except those in `excluding`.
    fn constrained_len(&self, excluding: &[&str]) -> Option<usize> {
        self.iter()
            .find(|(name, _)| !excluding.contains(name))
            .map(|(_, column)| column.len())
    }

    /// Replaces or creates a column.
    ///
    /// # Errors
    /// `LengthMismatch` if the other columns of the block hold a different
    /// number of rows. The block is unchanged in that case.
    pub fn set_column(
        &mut self,
        name: impl Into<String>,
        column: impl Into<Column>,
    ) -> Result<(), MolvisError> {
        let name = name.into();
        let column = column.into();
        if let Some(expected) = self.constrained_len(&[name.as_str()]) {
            if expected != column.len() {
                return Err(MolvisError::LengthMismatch {
                    column: name,
                    expected,
                    got: column.len(),
                });
            }
        }
        if !self.columns.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.columns.insert(name, column);
        Ok(())
    }

    pub fn set_f32(&mut self, name: impl Into<String>, values: Vec<f32>) -> Result<(), MolvisError> {
        self.set_column(name, Column::Float32(values))
    }

    pub fn set_u32(&mut self, name: impl Into<String>, values: Vec<u32>) -> Result<(), MolvisError> {
        self.set_column(name, Column::UInt32(values))
    }

    pub fn set_u8(&mut self, name: impl Into<String>, values: Vec<u8>) -> Result<(), MolvisError> {
        self.set_column(name, Column::UInt8(values))
    }

    pub fn set_strings<S: Into<String>>(
        &mut self,
        name: impl Into<String>,
        values: Vec<S>,
    ) -> Result<(), MolvisError> {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        self.set_column(name, Column::Utf8(values))
    }

    pub fn set_bool(&mut self, name: impl Into<String>, values: RowMask) -> Result<(), MolvisError> {
        self.set_column(name, Column::Bool(values))
    }

    /// Returns the column, or `None` when it is absent. Absence is not an error:
    /// optional columns such as bond `order` may simply not be there.
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Like `get_column`, but absence is reported as `ColumnNotFound`.
    pub fn column(&self, name: &str) -> Result<&Column, MolvisError> {
        self.columns
            .get(name)
            .ok_or_else(|| MolvisError::ColumnNotFound(name.to_string()))
    }

    typed_getter!(get_f32, Float32, [f32], ColumnType::Float32);
    typed_getter!(get_u32, UInt32, [u32], ColumnType::UInt32);
    typed_getter!(get_u8, UInt8, [u8], ColumnType::UInt8);
    typed_getter!(get_strings, Utf8, [String], ColumnType::Utf8);
    typed_getter!(get_bool, Bool, BitSlice, ColumnType::Bool);

    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        let removed = self.columns.remove(name)?;
        self.order.retain(|n| n != name);
        Some(removed)
    }

    /// A new block holding only the rows whose bit is set in `keep`, with every
    /// column filtered by the same mask.
    pub fn take_rows(&self, keep: &BitSlice) -> Result<Block, MolvisError> {
        let rows = self.row_count();
        if self.num_columns() > 0 && keep.len() != rows {
            return Err(MolvisError::LengthMismatch {
                column: "<row mask>".to_string(),
                expected: rows,
                got: keep.len(),
            });
        }
        let mut out = Block::new();
        for (name, column) in self.iter() {
            out.order.push(name.to_string());
            out.columns.insert(name.to_string(), column.take(keep));
        }
        Ok(out)
    }

    /// A new block holding the rows of `self` followed by the rows of `tail`.
    ///
    /// Columns present on only one side are filled with default cells on the
    /// other; a column present on both sides must have the same kind.
    pub fn append(&self, tail: &Block) -> Result<Block, MolvisError> {
        let (head_rows, tail_rows) = (self.row_count(), tail.row_count());
        let mut out = Block::new();
        for (name, column) in self.iter() {
            let rest = match tail.get_column(name) {
                Some(other) => column.concat(name, other)?,
                None => column.concat(name, &Column::filled(column.column_type(), tail_rows))?,
            };
            out.order.push(name.to_string());
            out.columns.insert(name.to_string(), rest);
        }
        for (name, column) in tail.iter().filter(|(name, _)| !self.contains(name)) {
            let joined = Column::filled(column.column_type(), head_rows).concat(name, column)?;
            out.order.push(name.to_string());
            out.columns.insert(name.to_string(), joined);
        }
        Ok(out)
    }

    //==============================================================================
    // Positions as an N×3 array
    //==============================================================================

    /// The `x`, `y`, `z` columns gathered into an N×3 array.
    pub fn positions(&self) -> Result<Array2<f32>, MolvisError> {
        let x = self.get_f32("x")?;
        let y = self.get_f32("y")?;
        let z = self.get_f32("z")?;
        Ok(Array2::from_shape_fn((x.len(), 3), |(row, axis)| match axis {
            0 => x[row],
            1 => y[row],
            _ => z[row],
        }))
    }

    /// Splits an N×3 array into the `x`, `y`, `z` columns.
    pub fn set_positions(&mut self, xyz: ArrayView2<'_, f32>) -> Result<(), MolvisError> {
        if xyz.ncols() != 3 {
            return Err(ShapeError::from_kind(ErrorKind::IncompatibleShape).into());
        }
        if let Some(expected) = self.constrained_len(&["x", "y", "z"]) {
            if expected != xyz.nrows() {
                return Err(MolvisError::LengthMismatch {
                    column: "xyz".to_string(),
                    expected,
                    got: xyz.nrows(),
                });
            }
        }
        // Lengths were checked above for all three axes at once; inserting one by
        // one through `set_column` would trip over the old x/y/z lengths.
        for (index, axis) in ["x", "y", "z"].into_iter().enumerate() {
            if !self.columns.contains_key(axis) {
                self.order.push(axis.to_string());
            }
            self.columns
                .insert(axis.to_string(), Column::Float32(xyz.column(index).to_vec()));
        }
        Ok(())
    }

    //==============================================================================
    // Arrow interop
    //==============================================================================

    /// Converts the block into an Arrow `RecordBatch`, columns in insertion order.
    pub fn to_record_batch(&self) -> Result<RecordBatch, MolvisError> {
        let fields: Vec<Field> = self
            .iter()
            .map(|(name, column)| Field::new(name, column.column_type().to_arrow_type(), false))
            .collect();
        let arrays = self.iter().map(|(_, column)| column.to_arrow()).collect();
        let options = RecordBatchOptions::new().with_row_count(Some(self.row_count()));
        Ok(RecordBatch::try_new_with_options(
            Arc::new(Schema::new(fields)),
            arrays,
            &options,
        )?)
    }

    /// Builds a block from an Arrow `RecordBatch`.
    pub fn try_from_record_batch(batch: &RecordBatch) -> Result<Block, MolvisError> {
        let mut block = Block::new();
        for (field, array) in batch.schema().fields().iter().zip(batch.columns()) {
            block.set_column(field.name().as_str(), Column::try_from_arrow(array.as_ref())?)?;
        }
        Ok(block)
    }
}
