// In: src/modifier/hide.rs

//! Hiding selected atoms, and the row-removal routine shared with filtering.

use std::any::Any;

use bitvec::prelude::*;
use log::debug;
use serde::{Deserialize, Serialize};

use super::selection::resolve_selection;
use super::{merge_parameters, ApplyContext, Modifier, ModifierKind};
use crate::config::HideMode;
use crate::error::MolvisError;
use crate::frame::{Block, Frame, RowMask, ATOMS, BONDS};

/// Name of the per-row visibility column written in mask mode.
pub const VISIBLE: &str = "visible";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct HideSelectionParams {
    /// Selection column to hide; the frame's active selection when absent.
    #[serde(default)]
    pub selection: Option<String>,
    /// Overrides `hide.mode` from the configuration.
    #[serde(default)]
    pub mode: Option<HideMode>,
}

/// Removes or masks the atoms flagged by a selection, keeping every bond
/// endpoint valid.
#[derive(Debug, Clone, Default)]
pub struct HideSelectionModifier {
    params: HideSelectionParams,
}

impl HideSelectionModifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_params(params: HideSelectionParams) -> Self {
        Self { params }
    }

    pub fn with_mode(mut self, mode: HideMode) -> Self {
        self.params.mode = Some(mode);
        self
    }
}

impl Modifier for HideSelectionModifier {
    fn kind(&self) -> ModifierKind {
        ModifierKind::HideSelection
    }

    fn apply(&self, input: &Frame, ctx: &mut ApplyContext) -> Result<Frame, MolvisError> {
        let Some(name) = resolve_selection(self.params.selection.as_deref(), input)? else {
            debug!("hide: no active selection, passing frame through");
            return Ok(input.clone());
        };
        let hidden = input.block(ATOMS)?.get_bool(&name)?.to_bitvec();
        let mode = self.params.mode.unwrap_or(ctx.config().hide.mode);
        log_metric!(
            "event" = "hide",
            "selection" = name,
            "mode" = format!("{:?}", mode),
            "hidden" = hidden.count_ones()
        );

        match mode {
            HideMode::Remove => remove_atoms(input, &!hidden),
            HideMode::Mask => mask_atoms(input, &!hidden),
        }
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

//==================================================================================
// Row removal & masking
//==================================================================================

/// Keeps only the atoms whose bit is set in `keep`.
///
/// Every atoms column is filtered by the same mask. Bonds with a removed or
/// out-of-range endpoint are dropped, and the surviving endpoints are
/// re-indexed into the reduced atoms block.
pub(crate) fn remove_atoms(input: &Frame, keep: &BitSlice) -> Result<Frame, MolvisError> {
    let atoms = input.block(ATOMS)?;
    let mut output = input.clone();
    output.insert_block(ATOMS, atoms.take_rows(keep)?);

    if let Some(bonds) = input.get_block(BONDS) {
        let reduced = reindex_bonds(bonds, keep)?;
        let dropped = bonds.row_count() - reduced.row_count();
        if dropped > 0 {
            debug!("dropped {} bond(s) touching removed atoms", dropped);
        }
        output.insert_block(BONDS, reduced);
    }
    Ok(output)
}

/// New atom index for every kept row, `None` for removed rows.
fn index_map(keep: &BitSlice) -> Vec<Option<u32>> {
    let mut next = 0u32;
    keep.iter()
        .by_vals()
        .map(|kept| {
            kept.then(|| {
                next += 1;
                next - 1
            })
        })
        .collect()
}

fn reindex_bonds(bonds: &Block, keep: &BitSlice) -> Result<Block, MolvisError> {
    let (Ok(i), Ok(j)) = (bonds.get_u32("i"), bonds.get_u32("j")) else {
        return bonds.take_rows(&bitvec![0; bonds.row_count()]);
    };
    let map = index_map(keep);
    let lookup = |atom: u32| map.get(atom as usize).copied().flatten();

    let surviving: RowMask = i
        .iter()
        .zip(j)
        .map(|(&a, &b)| lookup(a).is_some() && lookup(b).is_some())
        .collect();
    let new_i: Vec<u32> = surviving.iter_ones().filter_map(|row| lookup(i[row])).collect();
    let new_j: Vec<u32> = surviving.iter_ones().filter_map(|row| lookup(j[row])).collect();

    let mut out = bonds.take_rows(&surviving)?;
    out.set_u32("i", new_i)?;
    out.set_u32("j", new_j)?;
    Ok(out)
}

/// Keeps every row but records visibility: atoms get a `visible` column,
/// bonds are visible only when both endpoints are. Out-of-range bonds are
/// dropped, so endpoints stay valid.
fn mask_atoms(input: &Frame, show: &BitSlice) -> Result<Frame, MolvisError> {
    let (mut output, dropped) = input.drop_dangling_bonds()?;
    if dropped > 0 {
        debug!("dropped {} dangling bond(s) before masking", dropped);
    }

    let atoms = output.block(ATOMS)?;
    let mut visible = show.to_bitvec();
    // Stacked hides accumulate.
    if let Ok(previous) = atoms.get_bool(VISIBLE) {
        visible &= previous;
    }

    let bond_visible: Option<RowMask> = match output.get_block(BONDS) {
        Some(bonds) => match (bonds.get_u32("i"), bonds.get_u32("j")) {
            (Ok(i), Ok(j)) => {
                let mut mask: RowMask = i
                    .iter()
                    .zip(j)
                    .map(|(&a, &b)| visible[a as usize] && visible[b as usize])
                    .collect();
                if let Ok(previous) = bonds.get_bool(VISIBLE) {
                    mask &= previous;
                }
                Some(mask)
            }
            _ => None,
        },
        None => None,
    };

    if let Some(atoms) = output.get_block_mut(ATOMS) {
        atoms.set_bool(VISIBLE, visible)?;
    }
    if let (Some(mask), Some(bonds)) = (bond_visible, output.get_block_mut(BONDS)) {
        bonds.set_bool(VISIBLE, mask)?;
    }
    Ok(output)
}
