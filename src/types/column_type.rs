//! This module defines the canonical, type-safe tag for the data held by a
//! `Column`.

use crate::error::MolvisError;
use arrow::datatypes::DataType as ArrowDataType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of data stored in a column.
///
/// Every `Column` variant maps to exactly one `ColumnType`, and every
/// `ColumnType` maps to exactly one Arrow `DataType`. Accessors that ask a
/// column for the wrong kind report both tags in a `TypeMismatch`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Float32,
    UInt32,
    UInt8,
    Utf8,
    Bool,
}

impl ColumnType {
    /// Converts an Arrow `DataType` into a `ColumnType`.
    pub fn from_arrow_type(arrow_type: &ArrowDataType) -> Result<Self, MolvisError> {
        match arrow_type {
            ArrowDataType::Float32 => Ok(Self::Float32),
            ArrowDataType::UInt32 => Ok(Self::UInt32),
            ArrowDataType::UInt8 => Ok(Self::UInt8),
            ArrowDataType::Utf8 => Ok(Self::Utf8),
            ArrowDataType::Boolean => Ok(Self::Bool),
            dt => Err(MolvisError::UnsupportedType(format!(
                "Cannot convert Arrow type {:?} to a column type",
                dt
            ))),
        }
    }

    /// Converts a `ColumnType` back into an Arrow `DataType`.
    pub fn to_arrow_type(&self) -> ArrowDataType {
        match self {
            Self::Float32 => ArrowDataType::Float32,
            Self::UInt32 => ArrowDataType::UInt32,
            Self::UInt8 => ArrowDataType::UInt8,
            Self::Utf8 => ArrowDataType::Utf8,
            Self::Bool => ArrowDataType::Boolean,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrow_type_mapping_is_bijective() {
        for ty in [
            ColumnType::Float32,
            ColumnType::UInt32,
            ColumnType::UInt8,
            ColumnType::Utf8,
            ColumnType::Bool,
        ] {
            assert_eq!(ColumnType::from_arrow_type(&ty.to_arrow_type()).unwrap(), ty);
        }
    }

    #[test]
    fn test_unsupported_arrow_type_is_rejected() {
        let result = ColumnType::from_arrow_type(&ArrowDataType::Float64);
        assert!(matches!(result, Err(MolvisError::UnsupportedType(_))));
    }

    #[test]
    fn test_serde_names_are_lowercase() {
        let json = serde_json::to_string(&ColumnType::UInt32).unwrap();
        assert_eq!(json, "\"uint32\"");
    }
}
