// In: src/io/xyz.rs

//! Multi-frame XYZ reader.
//!
//! Each frame is an atom-count line, a comment line, then one
//! `element x y z` line per atom. Extra columns after `z` are ignored.
//! Errors carry the 1-based line number they were detected on.

use std::io::{BufRead, BufReader, Read};

use log::debug;

use crate::config::BoundaryPolicy;
use crate::error::MolvisError;
use crate::frame::{Block, Frame, Trajectory, ATOMS, BONDS};

pub struct XyzReader<R> {
    reader: BufReader<R>,
    line_number: usize,
}

impl<R: Read> XyzReader<R> {
    pub fn new(reader: R) -> Self {
        XyzReader {
            reader: BufReader::new(reader),
            line_number: 0,
        }
    }

    fn read_line(&mut self) -> Result<Option<String>, MolvisError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    /// Reads the next frame, or `None` at end of input. Blank lines between
    /// frames are skipped.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, MolvisError> {
        let count_line = loop {
            match self.read_line()? {
                None => return Ok(None),
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => break line,
            }
        };
        let count: usize = count_line
            .trim()
            .parse()
            .map_err(|_| MolvisError::xyz(self.line_number, "invalid atom count"))?;

        if self.read_line()?.is_none() {
            return Err(MolvisError::xyz(
                self.line_number,
                "expected comment line after atom count",
            ));
        }

        let mut elements = Vec::with_capacity(count);
        let mut coords: [Vec<f32>; 3] = Default::default();
        for atom in 0..count {
            let line = self.read_line()?.ok_or_else(|| {
                MolvisError::xyz(
                    self.line_number,
                    format!("expected atom {}, got end of file", atom + 1),
                )
            })?;
            let mut fields = line.split_whitespace();
            let element = fields
                .next()
                .ok_or_else(|| MolvisError::xyz(self.line_number, "empty atom line"))?;
            for axis in &mut coords {
                let value = fields
                    .next()
                    .ok_or_else(|| MolvisError::xyz(self.line_number, "expected 3 coordinates"))?;
                axis.push(value.parse().map_err(|_| {
                    MolvisError::xyz(self.line_number, format!("invalid coordinate '{}'", value))
                })?);
            }
            elements.push(element.to_string());
        }

        let [x, y, z] = coords;
        let mut atoms = Block::new();
        atoms.set_strings("element", elements)?;
        atoms.set_f32("x", x)?;
        atoms.set_f32("y", y)?;
        atoms.set_f32("z", z)?;
        let mut bonds = Block::new();
        bonds.set_u32("i", Vec::new())?;
        bonds.set_u32("j", Vec::new())?;

        let mut frame = Frame::new();
        frame.insert_block(ATOMS, atoms);
        frame.insert_block(BONDS, bonds);
        Ok(Some(frame))
    }

    /// Reads every remaining frame.
    pub fn read_all(&mut self) -> Result<Vec<Frame>, MolvisError> {
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }
}

/// Reads a whole XYZ stream into a trajectory.
pub fn read_xyz<R: Read>(reader: R, policy: BoundaryPolicy) -> Result<Trajectory, MolvisError> {
    let frames = XyzReader::new(reader).read_all()?;
    debug!("xyz: read {} frame(s)", frames.len());
    Ok(Trajectory::new(frames, policy))
}

pub fn read_xyz_str(content: &str, policy: BoundaryPolicy) -> Result<Trajectory, MolvisError> {
    read_xyz(content.as_bytes(), policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WATER_TWO_FRAMES: &str = "3
water
O 0.000 0.000 0.000
H 0.757 0.586 0.000
H -0.757 0.586 0.000

3
water, stretched
O 0.000 0.000 0.000
H 0.900 0.600 0.000
H -0.900 0.600 0.000 extra
";

    #[test]
    fn test_reads_every_frame() {
        let trajectory = read_xyz_str(WATER_TWO_FRAMES, BoundaryPolicy::Clamp).unwrap();
        assert_eq!(trajectory.len(), 2);

        let second = trajectory.get(1).unwrap();
        let atoms = second.get_block(ATOMS).unwrap();
        assert_eq!(atoms.get_strings("element").unwrap(), &["O", "H", "H"]);
        assert_eq!(atoms.get_f32("x").unwrap(), &[0.0, 0.9, -0.9]);
        assert_eq!(second.bond_count(), 0);
        assert!(second.contains_block(BONDS));
    }

    #[test]
    fn test_bad_coordinate_reports_line() {
        let err = read_xyz_str("1\n\nC 0.0 abc 0.0\n", BoundaryPolicy::Clamp).unwrap_err();
        assert!(matches!(err, MolvisError::XyzFormat { line: 3, .. }));
    }

    #[test]
    fn test_truncated_frame() {
        let err = read_xyz_str("2\ncomment\nC 0 0 0\n", BoundaryPolicy::Clamp).unwrap_err();
        assert!(matches!(err, MolvisError::XyzFormat { line: 3, .. }));
    }

    #[test]
    fn test_bad_count_line() {
        let err = read_xyz_str("three\n", BoundaryPolicy::Clamp).unwrap_err();
        assert!(matches!(err, MolvisError::XyzFormat { line: 1, .. }));
    }

    #[test]
    fn test_empty_input_is_empty_trajectory() {
        assert!(read_xyz_str("", BoundaryPolicy::Clamp).unwrap().is_empty());
    }
}
