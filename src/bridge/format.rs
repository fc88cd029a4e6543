// In: src/bridge/format.rs

//! Conversion between the host's frame JSON and `Frame`.
//!
//! Wire shape: `{ "blocks": { "<block>": { "<column>": [values...] } } }`,
//! plus an optional `"active_selection"` name. Column kinds are inferred from
//! the values, except that known index columns keep their integer kind:
//! `i`, `j`, `id` are UInt32 and `order`, `pbc` are UInt8.

use log::warn;
use ndarray::Array2;
use serde_json::{Map, Value};

use crate::error::MolvisError;
use crate::frame::{Block, Column, Frame, ATOMS};
use crate::types::ColumnType;

/// The column kind implied by a well-known column name, if any.
fn named_kind(column: &str) -> Option<ColumnType> {
    match column {
        "i" | "j" | "id" => Some(ColumnType::UInt32),
        "order" | "pbc" => Some(ColumnType::UInt8),
        "element" | "name" => Some(ColumnType::Utf8),
        "selected" | "visible" => Some(ColumnType::Bool),
        _ => None,
    }
}

fn malformed(block: &str, column: &str, what: &str) -> MolvisError {
    MolvisError::FrameFormatError(format!("{}.{}: {}", block, column, what))
}

//==================================================================================
// I. JSON -> Frame
//==================================================================================

pub fn frame_from_json(value: &Value) -> Result<Frame, MolvisError> {
    let blocks = value
        .get("blocks")
        .and_then(Value::as_object)
        .ok_or_else(|| MolvisError::FrameFormatError("expected a 'blocks' object".to_string()))?;

    let mut frame = Frame::new();
    for (name, block) in blocks {
        let columns = block.as_object().ok_or_else(|| {
            MolvisError::FrameFormatError(format!("block '{}' is not an object", name))
        })?;
        frame.insert_block(name.as_str(), block_from_json(name, columns)?);
    }
    if let Some(selection) = value.get("active_selection").and_then(Value::as_str) {
        frame.set_active_selection(Some(selection.to_string()));
    }
    Ok(frame)
}

pub fn block_from_json(name: &str, columns: &Map<String, Value>) -> Result<Block, MolvisError> {
    let mut block = Block::new();
    for (column, values) in columns {
        let values = values
            .as_array()
            .ok_or_else(|| malformed(name, column, "expected an array"))?;

        if values.first().is_some_and(Value::is_array) {
            if name == ATOMS && column == "xyz" {
                block.set_positions(positions_from_json(name, column, values)?.view())?;
            } else {
                warn!("frame json: skipping nested column {}.{}", name, column);
            }
            continue;
        }
        block.set_column(column.as_str(), column_from_json(name, column, values)?)?;
    }
    Ok(block)
}

fn column_from_json(block: &str, column: &str, values: &[Value]) -> Result<Column, MolvisError> {
    let kind = match (named_kind(column), values.first()) {
        (Some(kind), _) => kind,
        (None, None) => ColumnType::Float32,
        (None, Some(Value::Number(_))) => ColumnType::Float32,
        (None, Some(Value::String(_))) => ColumnType::Utf8,
        (None, Some(Value::Bool(_))) => ColumnType::Bool,
        (None, Some(_)) => return Err(malformed(block, column, "unsupported value")),
    };

    let mismatch = || malformed(block, column, &format!("every value must be {}", kind));
    let parsed = match kind {
        ColumnType::Float32 => Column::Float32(
            values
                .iter()
                .map(|v| v.as_f64().map(|f| f as f32))
                .collect::<Option<_>>()
                .ok_or_else(mismatch)?,
        ),
        ColumnType::UInt32 => Column::UInt32(
            values
                .iter()
                .map(|v| v.as_u64().and_then(|n| u32::try_from(n).ok()))
                .collect::<Option<_>>()
                .ok_or_else(mismatch)?,
        ),
        ColumnType::UInt8 => Column::UInt8(
            values
                .iter()
                .map(|v| match v {
                    Value::Bool(flag) => Some(u8::from(*flag)),
                    _ => v.as_u64().and_then(|n| u8::try_from(n).ok()),
                })
                .collect::<Option<_>>()
                .ok_or_else(mismatch)?,
        ),
        ColumnType::Utf8 => Column::Utf8(
            values
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Option<_>>()
                .ok_or_else(mismatch)?,
        ),
        ColumnType::Bool => Column::Bool(
            values
                .iter()
                .map(Value::as_bool)
                .collect::<Option<_>>()
                .ok_or_else(mismatch)?,
        ),
    };
    Ok(parsed)
}

fn positions_from_json(block: &str, column: &str, rows: &[Value]) -> Result<Array2<f32>, MolvisError> {
    let mut flat = Vec::with_capacity(rows.len() * 3);
    for row in rows {
        let triple = row
            .as_array()
            .filter(|triple| triple.len() == 3)
            .ok_or_else(|| malformed(block, column, "expected rows of 3 numbers"))?;
        for value in triple {
            let coordinate = value
                .as_f64()
                .ok_or_else(|| malformed(block, column, "coordinates must be numbers"))?;
            flat.push(coordinate as f32);
        }
    }
    Ok(Array2::from_shape_vec((rows.len(), 3), flat)?)
}

/// Builds the 3-row `box` block from `{matrix, pbc?, origin?}`. Each row
/// holds one lattice vector in `x`/`y`/`z`; `pbc` defaults to periodic on
/// every axis and `origin` to zero.
pub fn box_block_from_json(value: &Value) -> Result<Block, MolvisError> {
    let matrix = value
        .get("matrix")
        .and_then(Value::as_array)
        .filter(|rows| rows.len() == 3)
        .ok_or_else(|| malformed("box", "matrix", "expected a 3x3 array"))?;

    let pbc = match value.get("pbc") {
        None | Some(Value::Null) => vec![1u8; 3],
        Some(Value::Array(flags)) if flags.len() == 3 => match column_from_json("box", "pbc", flags)? {
            Column::UInt8(flags) => flags,
            _ => return Err(malformed("box", "pbc", "expected 3 flags")),
        },
        Some(_) => return Err(malformed("box", "pbc", "expected 3 flags")),
    };

    let origin = match value.get("origin") {
        None | Some(Value::Null) => vec![0.0f32; 3],
        Some(Value::Array(coords)) if coords.len() == 3 => {
            match column_from_json("box", "origin", coords)? {
                Column::Float32(coords) => coords,
                _ => return Err(malformed("box", "origin", "expected 3 numbers")),
            }
        }
        Some(_) => return Err(malformed("box", "origin", "expected 3 numbers")),
    };

    let mut block = Block::new();
    block.set_positions(positions_from_json("box", "matrix", matrix)?.view())?;
    block.set_u8("pbc", pbc)?;
    block.set_f32("origin", origin)?;
    Ok(block)
}

//==================================================================================
// II. Frame -> JSON
//==================================================================================

pub fn frame_to_json(frame: &Frame) -> Value {
    let mut blocks = Map::new();
    for name in frame.block_names() {
        if let Some(block) = frame.get_block(name) {
            blocks.insert(name.to_string(), block_to_json(block));
        }
    }
    let mut out = Map::new();
    out.insert("blocks".to_string(), Value::Object(blocks));
    if let Some(selection) = frame.active_selection() {
        out.insert("active_selection".to_string(), Value::from(selection));
    }
    Value::Object(out)
}

pub fn block_to_json(block: &Block) -> Value {
    let columns = block
        .iter()
        .map(|(name, column)| (name.to_string(), column_to_json(column)))
        .collect::<Map<_, _>>();
    Value::Object(columns)
}

fn column_to_json(column: &Column) -> Value {
    match column {
        Column::Float32(v) => v.iter().map(|&x| Value::from(x)).collect(),
        Column::UInt32(v) => v.iter().map(|&x| Value::from(x)).collect(),
        Column::UInt8(v) => v.iter().map(|&x| Value::from(x)).collect(),
        Column::Utf8(v) => v.iter().map(|x| Value::from(x.as_str())).collect(),
        Column::Bool(v) => v.iter().by_vals().map(Value::from).collect(),
    }
}
