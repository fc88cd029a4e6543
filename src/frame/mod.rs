// In: src/frame/mod.rs

//! In-memory columnar storage for molecular snapshots.
//!
//! A `Frame` is a named collection of `Block`s (conventionally `atoms`, `bonds`
//! and `box`), and a `Trajectory` is an ordered sequence of frames with a
//! playback cursor.
//!
//! Cross-block integrity (bond endpoints vs. atom count) is never checked
//! eagerly. Consumers call `valid_bond_mask` / `drop_dangling_bonds` when they
//! need it, and invalid bonds are dropped rather than reported as faults.

//==================================================================================
// 1. Module Declarations
//==================================================================================

pub mod block;
pub mod column;
pub mod trajectory;

//==================================================================================
// 2. Public API Re-exports
//==================================================================================

pub use self::block::Block;
pub use self::column::{Column, RowMask};
pub use self::trajectory::Trajectory;

use std::collections::BTreeSet;

use bitvec::prelude::*;
use hashbrown::HashMap;

use crate::error::MolvisError;

/// Name of the block holding one row per atom.
pub const ATOMS: &str = "atoms";
/// Name of the block holding one row per bond (`i`, `j`, optional `order`).
pub const BONDS: &str = "bonds";
/// Name of the block describing the simulation box.
pub const BOX: &str = "box";

/// One molecular snapshot: a mapping from block name to `Block`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    blocks: HashMap<String, Block>,
    /// Column in the atoms block written by the most recent selection.
    active_selection: Option<String>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// A frame with zero-row `atoms` (x, y, z, element) and `bonds` (i, j) blocks.
    pub fn empty_molecule() -> Self {
        let mut atoms = Block::new();
        let mut bonds = Block::new();
        // Zero-length columns can never disagree in length.
        let _ = atoms.set_f32("x", Vec::new());
        let _ = atoms.set_f32("y", Vec::new());
        let _ = atoms.set_f32("z", Vec::new());
        let _ = atoms.set_strings::<String>("element", Vec::new());
        let _ = bonds.set_u32("i", Vec::new());
        let _ = bonds.set_u32("j", Vec::new());

        let mut frame = Frame::new();
        frame.insert_block(ATOMS, atoms);
        frame.insert_block(BONDS, bonds);
        frame
    }

    /// Associates `name` with `block`, returning the block it replaced.
    pub fn insert_block(&mut self, name: impl Into<String>, block: Block) -> Option<Block> {
        self.blocks.insert(name.into(), block)
    }

    pub fn get_block(&self, name: &str) -> Option<&Block> {
        self.blocks.get(name)
    }

    pub fn get_block_mut(&mut self, name: &str) -> Option<&mut Block> {
        self.blocks.get_mut(name)
    }

    /// Like `get_block`, but absence is reported as `BlockNotFound`.
    pub fn block(&self, name: &str) -> Result<&Block, MolvisError> {
        self.blocks
            .get(name)
            .ok_or_else(|| MolvisError::BlockNotFound(name.to_string()))
    }

    pub fn remove_block(&mut self, name: &str) -> Option<Block> {
        self.blocks.remove(name)
    }

    pub fn contains_block(&self, name: &str) -> bool {
        self.blocks.contains_key(name)
    }

    /// The set of block names currently held, in sorted order.
    pub fn block_names(&self) -> BTreeSet<&str> {
        self.blocks.keys().map(String::as_str).collect()
    }

    pub fn atom_count(&self) -> usize {
        self.get_block(ATOMS).map_or(0, Block::row_count)
    }

    pub fn bond_count(&self) -> usize {
        self.get_block(BONDS).map_or(0, Block::row_count)
    }

    pub fn active_selection(&self) -> Option<&str> {
        self.active_selection.as_deref()
    }

    pub fn set_active_selection(&mut self, name: Option<String>) {
        self.active_selection = name;
    }

    /// One bit per bond row: set when both endpoints index an existing atom.
    ///
    /// A bonds block without usable `i`/`j` columns marks every bond invalid.
    pub fn valid_bond_mask(&self) -> RowMask {
        let Some(bonds) = self.get_block(BONDS) else {
            return RowMask::new();
        };
        let rows = bonds.row_count();
        let (Ok(i), Ok(j)) = (bonds.get_u32("i"), bonds.get_u32("j")) else {
            return bitvec![0; rows];
        };
        let atoms = self.atom_count();
        i.iter()
            .zip(j)
            .map(|(&a, &b)| (a as usize) < atoms && (b as usize) < atoms)
            .collect()
    }

    /// A copy of this frame without bonds whose endpoints are out of range,
    /// plus the number of bonds dropped.
    pub fn drop_dangling_bonds(&self) -> Result<(Frame, usize), MolvisError> {
        let Some(bonds) = self.get_block(BONDS) else {
            return Ok((self.clone(), 0));
        };
        let valid = self.valid_bond_mask();
        let dropped = valid.count_zeros();
        if dropped == 0 {
            return Ok((self.clone(), 0));
        }
        let mut out = self.clone();
        out.insert_block(BONDS, bonds.take_rows(&valid)?);
        Ok((out, dropped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water() -> Frame {
        let mut atoms = Block::new();
        atoms.set_f32("x", vec![0.0, 0.757, -0.757]).unwrap();
        atoms.set_f32("y", vec![0.0, 0.586, 0.586]).unwrap();
        atoms.set_f32("z", vec![0.0, 0.0, 0.0]).unwrap();
        atoms.set_strings("element", vec!["O", "H", "H"]).unwrap();
        let mut bonds = Block::new();
        bonds.set_u32("i", vec![0, 0]).unwrap();
        bonds.set_u32("j", vec![1, 2]).unwrap();
        bonds.set_u8("order", vec![1, 1]).unwrap();
        let mut frame = Frame::new();
        frame.insert_block(ATOMS, atoms);
        frame.insert_block(BONDS, bonds);
        frame
    }

    #[test]
    fn test_insert_overwrites_existing_block() {
        let mut frame = water();
        let replaced = frame.insert_block(ATOMS, Block::new());
        assert_eq!(replaced.unwrap().row_count(), 3);
        assert_eq!(frame.atom_count(), 0);
    }

    #[test]
    fn test_block_names_is_the_held_set() {
        let mut frame = water();
        frame.insert_block(BOX, Block::new());
        let names: Vec<&str> = frame.block_names().into_iter().collect();
        assert_eq!(names, vec!["atoms", "bonds", "box"]);
        assert!(matches!(frame.block("cell"), Err(MolvisError::BlockNotFound(_))));
        assert!(frame.get_block("cell").is_none());
    }

    #[test]
    fn test_valid_bond_mask_flags_out_of_range_endpoints() {
        let mut frame = water();
        frame
            .get_block_mut(BONDS)
            .unwrap()
            .set_u32("j", vec![1, 7])
            .unwrap();
        assert_eq!(frame.valid_bond_mask(), bitvec![1, 0]);
    }

    #[test]
    fn test_drop_dangling_bonds_keeps_valid_rows_in_every_column() {
        let mut frame = water();
        frame
            .get_block_mut(BONDS)
            .unwrap()
            .set_u32("i", vec![5, 0])
            .unwrap();

        let (healed, dropped) = frame.drop_dangling_bonds().unwrap();

        assert_eq!(dropped, 1);
        let bonds = healed.get_block(BONDS).unwrap();
        assert_eq!(bonds.row_count(), 1);
        assert_eq!(bonds.get_u32("j").unwrap(), &[2]);
        assert_eq!(bonds.get_u8("order").unwrap(), &[1]);
        // The input frame is untouched.
        assert_eq!(frame.bond_count(), 2);
    }

    #[test]
    fn test_bonds_without_endpoint_columns_are_all_invalid() {
        let mut frame = water();
        frame.get_block_mut(BONDS).unwrap().remove_column("i");
        let (healed, dropped) = frame.drop_dangling_bonds().unwrap();
        assert_eq!(dropped, 2);
        assert_eq!(healed.bond_count(), 0);
    }

    #[test]
    fn test_empty_molecule_has_zero_rows() {
        let frame = Frame::empty_molecule();
        assert_eq!(frame.atom_count(), 0);
        assert_eq!(frame.bond_count(), 0);
        assert!(frame.valid_bond_mask().is_empty());
    }
}
