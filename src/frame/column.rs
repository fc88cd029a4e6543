// In: src/frame/column.rs

//! The tagged-union column type stored inside a `Block`.
//!
//! A column is one of a closed set of typed vectors. Accessors pattern-match
//! the tag; a caller asking for the wrong kind gets a `TypeMismatch` rather
//! than a silent conversion.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, Float32Array, StringArray, UInt32Array, UInt8Array};
use bitvec::prelude::*;

use crate::error::MolvisError;
use crate::types::ColumnType;

/// A per-row boolean mask, used for selections and row filtering.
pub type RowMask = BitVec<usize, Lsb0>;

/// A single typed column of row data.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Float32(Vec<f32>),
    UInt32(Vec<u32>),
    UInt8(Vec<u8>),
    Utf8(Vec<String>),
    Bool(RowMask),
}

impl Column {
    /// Number of rows in the column.
    pub fn len(&self) -> usize {
        match self {
            Column::Float32(v) => v.len(),
            Column::UInt32(v) => v.len(),
            Column::UInt8(v) => v.len(),
            Column::Utf8(v) => v.len(),
            Column::Bool(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Column::Float32(_) => ColumnType::Float32,
            Column::UInt32(_) => ColumnType::UInt32,
            Column::UInt8(_) => ColumnType::UInt8,
            Column::Utf8(_) => ColumnType::Utf8,
            Column::Bool(_) => ColumnType::Bool,
        }
    }

    /// An empty column of the given kind.
    pub fn empty(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Float32 => Column::Float32(Vec::new()),
            ColumnType::UInt32 => Column::UInt32(Vec::new()),
            ColumnType::UInt8 => Column::UInt8(Vec::new()),
            ColumnType::Utf8 => Column::Utf8(Vec::new()),
            ColumnType::Bool => Column::Bool(RowMask::new()),
        }
    }

    /// A column of `rows` default cells: zeros, empty strings or `false`.
    pub fn filled(column_type: ColumnType, rows: usize) -> Self {
        match column_type {
            ColumnType::Float32 => Column::Float32(vec![0.0; rows]),
            ColumnType::UInt32 => Column::UInt32(vec![0; rows]),
            ColumnType::UInt8 => Column::UInt8(vec![0; rows]),
            ColumnType::Utf8 => Column::Utf8(vec![String::new(); rows]),
            ColumnType::Bool => Column::Bool(bitvec![0; rows]),
        }
    }

    /// `self` followed by the rows of `tail`. Both must hold the same kind.
    pub fn concat(&self, name: &str, tail: &Column) -> Result<Column, MolvisError> {
        let joined = match (self, tail) {
            (Column::Float32(a), Column::Float32(b)) => Column::Float32([&a[..], &b[..]].concat()),
            (Column::UInt32(a), Column::UInt32(b)) => Column::UInt32([&a[..], &b[..]].concat()),
            (Column::UInt8(a), Column::UInt8(b)) => Column::UInt8([&a[..], &b[..]].concat()),
            (Column::Utf8(a), Column::Utf8(b)) => Column::Utf8([&a[..], &b[..]].concat()),
            (Column::Bool(a), Column::Bool(b)) => {
                let mut joined = a.clone();
                joined.extend_from_bitslice(b);
                Column::Bool(joined)
            }
            _ => {
                return Err(MolvisError::TypeMismatch {
                    column: name.to_string(),
                    expected: self.column_type(),
                    found: tail.column_type(),
                })
            }
        };
        Ok(joined)
    }

    /// Keeps the rows whose bit is set in `keep`.
    ///
    /// `keep` must have exactly `self.len()` bits; the caller (`Block::take_rows`)
    /// checks this once for all columns.
    pub fn take(&self, keep: &BitSlice) -> Column {
        fn filter<T: Clone>(values: &[T], keep: &BitSlice) -> Vec<T> {
            keep.iter_ones().map(|row| values[row].clone()).collect()
        }
        match self {
            Column::Float32(v) => Column::Float32(filter(v, keep)),
            Column::UInt32(v) => Column::UInt32(filter(v, keep)),
            Column::UInt8(v) => Column::UInt8(filter(v, keep)),
            Column::Utf8(v) => Column::Utf8(filter(v, keep)),
            Column::Bool(v) => Column::Bool(keep.iter_ones().map(|row| v[row]).collect()),
        }
    }

    /// Reads a numeric cell as `f64`, or `None` for non-numeric columns.
    pub fn numeric_at(&self, row: usize) -> Option<f64> {
        use num_traits::ToPrimitive;
        match self {
            Column::Float32(v) => v.get(row).and_then(|x| x.to_f64()),
            Column::UInt32(v) => v.get(row).and_then(|x| x.to_f64()),
            Column::UInt8(v) => v.get(row).and_then(|x| x.to_f64()),
            Column::Utf8(_) | Column::Bool(_) => None,
        }
    }

    /// Reads a string cell, or `None` for non-string columns.
    pub fn str_at(&self, row: usize) -> Option<&str> {
        match self {
            Column::Utf8(v) => v.get(row).map(String::as_str),
            _ => None,
        }
    }

    /// A little-endian byte view of a numeric column, for binary transport.
    /// String and boolean columns have no flat byte layout and return `None`.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Column::Float32(v) => Some(bytemuck::cast_slice(v.as_slice())),
            Column::UInt32(v) => Some(bytemuck::cast_slice(v.as_slice())),
            Column::UInt8(v) => Some(v.as_slice()),
            Column::Utf8(_) | Column::Bool(_) => None,
        }
    }

    //==============================================================================
    // Arrow interop
    //==============================================================================

    /// Converts the column into an Arrow array of the matching type.
    pub fn to_arrow(&self) -> ArrayRef {
        match self {
            Column::Float32(v) => Arc::new(Float32Array::from(v.clone())),
            Column::UInt32(v) => Arc::new(UInt32Array::from(v.clone())),
            Column::UInt8(v) => Arc::new(UInt8Array::from(v.clone())),
            Column::Utf8(v) => Arc::new(StringArray::from_iter_values(v.iter())),
            Column::Bool(v) => Arc::new(BooleanArray::from(v.iter().by_vals().collect::<Vec<bool>>())),
        }
    }

    /// Builds a column from an Arrow array. Arrays containing nulls are rejected,
    /// since columns have no validity bitmap.
    pub fn try_from_arrow(array: &dyn Array) -> Result<Self, MolvisError> {
        if array.null_count() > 0 {
            return Err(MolvisError::UnsupportedType(format!(
                "columns cannot hold nulls ({} found)",
                array.null_count()
            )));
        }
        let column = match ColumnType::from_arrow_type(array.data_type())? {
            ColumnType::Float32 => Column::Float32(downcast::<Float32Array>(array)?.values().to_vec()),
            ColumnType::UInt32 => Column::UInt32(downcast::<UInt32Array>(array)?.values().to_vec()),
            ColumnType::UInt8 => Column::UInt8(downcast::<UInt8Array>(array)?.values().to_vec()),
            ColumnType::Utf8 => Column::Utf8(
                downcast::<StringArray>(array)?
                    .iter()
                    .map(|s| s.unwrap_or_default().to_string())
                    .collect(),
            ),
            ColumnType::Bool => Column::Bool(downcast::<BooleanArray>(array)?.values().iter().collect()),
        };
        Ok(column)
    }
}

fn downcast<T: 'static>(array: &dyn Array) -> Result<&T, MolvisError> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        MolvisError::InternalError(format!(
            "Arrow array reported {:?} but failed to downcast",
            array.data_type()
        ))
    })
}

//==================================================================================
// Conversions from plain vectors
//==================================================================================

impl From<Vec<f32>> for Column {
    fn from(v: Vec<f32>) -> Self {
        Column::Float32(v)
    }
}

impl From<Vec<u32>> for Column {
    fn from(v: Vec<u32>) -> Self {
        Column::UInt32(v)
    }
}

impl From<Vec<u8>> for Column {
    fn from(v: Vec<u8>) -> Self {
        Column::UInt8(v)
    }
}

impl From<Vec<String>> for Column {
    fn from(v: Vec<String>) -> Self {
        Column::Utf8(v)
    }
}

impl From<Vec<&str>> for Column {
    fn from(v: Vec<&str>) -> Self {
        Column::Utf8(v.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<bool>> for Column {
    fn from(v: Vec<bool>) -> Self {
        Column::Bool(v.into_iter().collect())
    }
}

impl From<RowMask> for Column {
    fn from(v: RowMask) -> Self {
        Column::Bool(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_filters_every_kind_consistently() {
        let keep = bitvec![1, 0, 1];
        let columns: Vec<Column> = vec![
            vec![1.0f32, 2.0, 3.0].into(),
            vec![10u32, 20, 30].into(),
            vec![1u8, 2, 3].into(),
            vec!["O", "H", "H"].into(),
            vec![true, false, false].into(),
        ];
        for column in &columns {
            assert_eq!(column.take(&keep).len(), 2);
        }
        assert_eq!(columns[0].take(&keep), Column::Float32(vec![1.0, 3.0]));
        assert_eq!(columns[3].take(&keep), Column::from(vec!["O", "H"]));
        assert_eq!(columns[4].take(&keep), Column::from(vec![true, false]));
    }

    #[test]
    fn test_concat_requires_matching_kinds() {
        let head: Column = vec![1u32, 2].into();
        let tail: Column = vec![3u32].into();
        assert_eq!(head.concat("i", &tail).unwrap(), Column::UInt32(vec![1, 2, 3]));

        let flags: Column = vec![true].into();
        let joined = flags.concat("visible", &Column::filled(ColumnType::Bool, 2)).unwrap();
        assert_eq!(joined, Column::from(vec![true, false, false]));

        assert!(matches!(
            head.concat("i", &Column::from(vec![1.0f32])),
            Err(MolvisError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_numeric_and_string_access() {
        let x: Column = vec![0.5f32].into();
        let element: Column = vec!["C"].into();
        assert_eq!(x.numeric_at(0), Some(0.5));
        assert_eq!(x.str_at(0), None);
        assert_eq!(element.str_at(0), Some("C"));
        assert_eq!(element.numeric_at(0), None);
        assert_eq!(x.numeric_at(1), None);
    }

    #[test]
    fn test_as_bytes_is_little_endian() {
        let column: Column = vec![1u32, 256].into();
        assert_eq!(column.as_bytes().unwrap(), &[1, 0, 0, 0, 0, 1, 0, 0]);
        assert!(Column::from(vec!["H"]).as_bytes().is_none());
    }

    #[test]
    fn test_arrow_conversion_preserves_values() {
        let original: Column = vec!["O", "H"].into();
        let array = original.to_arrow();
        assert_eq!(Column::try_from_arrow(array.as_ref()).unwrap(), original);

        let mask: Column = vec![true, false, true].into();
        let array = mask.to_arrow();
        assert_eq!(Column::try_from_arrow(array.as_ref()).unwrap(), mask);
    }

    #[test]
    fn test_arrow_nulls_are_rejected() {
        let array = Float32Array::from(vec![Some(1.0), None]);
        let result = Column::try_from_arrow(&array);
        assert!(matches!(result, Err(MolvisError::UnsupportedType(_))));
    }
}
