// In: src/frame/trajectory.rs

//! An ordered sequence of immutable frames with a playback cursor.

use std::sync::Arc;

use super::Frame;
use crate::config::BoundaryPolicy;
use crate::error::MolvisError;

/// Frame history for playback. Frames are shared behind `Arc` and never
/// mutated once inserted; replacing a frame means inserting a new one.
///
/// The cursor is always a valid index, or the trajectory is empty.
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    frames: Vec<Arc<Frame>>,
    cursor: usize,
    policy: BoundaryPolicy,
}

impl Trajectory {
    pub fn new(frames: Vec<Frame>, policy: BoundaryPolicy) -> Self {
        Self {
            frames: frames.into_iter().map(Arc::new).collect(),
            cursor: 0,
            policy,
        }
    }

    /// A single-frame trajectory, for static structures.
    pub fn from_frame(frame: Frame, policy: BoundaryPolicy) -> Self {
        Self::new(vec![frame], policy)
    }

    pub fn policy(&self) -> BoundaryPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: BoundaryPolicy) {
        self.policy = policy;
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The frame at the cursor, or `None` for an empty trajectory.
    pub fn current(&self) -> Option<Arc<Frame>> {
        self.frames.get(self.cursor).cloned()
    }

    pub fn current_index(&self) -> Option<usize> {
        (!self.frames.is_empty()).then_some(self.cursor)
    }

    pub fn get(&self, index: usize) -> Option<Arc<Frame>> {
        self.frames.get(index).cloned()
    }

    /// Moves the cursor to `index`.
    pub fn seek(&mut self, index: usize) -> Result<Arc<Frame>, MolvisError> {
        let frame = self.get(index).ok_or(MolvisError::IndexOutOfBounds {
            index,
            len: self.frames.len(),
        })?;
        self.cursor = index;
        Ok(frame)
    }

    /// Moves the cursor by `delta` frames, clamping or wrapping at the ends
    /// according to the boundary policy. Returns the new current frame.
    pub fn advance(&mut self, delta: isize) -> Option<Arc<Frame>> {
        let len = self.frames.len();
        if len == 0 {
            return None;
        }
        let target = self.cursor as i128 + delta as i128;
        self.cursor = match self.policy {
            BoundaryPolicy::Clamp => target.clamp(0, len as i128 - 1) as usize,
            BoundaryPolicy::Wrap => target.rem_euclid(len as i128) as usize,
        };
        self.current()
    }

    /// Appends a frame; the cursor stays where it is, except on the first
    /// append to an empty trajectory, where it lands on the new frame.
    pub fn append(&mut self, frame: Frame) {
        if self.frames.is_empty() {
            self.cursor = 0;
        }
        self.frames.push(Arc::new(frame));
    }

    /// Swaps the frame at `index` for a new one, returning the old frame.
    /// The old frame itself is never modified.
    pub fn replace(&mut self, index: usize, frame: Frame) -> Result<Arc<Frame>, MolvisError> {
        let len = self.frames.len();
        let slot = self
            .frames
            .get_mut(index)
            .ok_or(MolvisError::IndexOutOfBounds { index, len })?;
        Ok(std::mem::replace(slot, Arc::new(frame)))
    }

    /// Drops every frame.
    pub fn clear(&mut self) {
        self.frames.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Block, ATOMS};

    fn numbered(count: usize, policy: BoundaryPolicy) -> Trajectory {
        let frames = (0..count)
            .map(|n| {
                let mut atoms = Block::new();
                atoms.set_f32("x", vec![n as f32]).unwrap();
                let mut frame = Frame::new();
                frame.insert_block(ATOMS, atoms);
                frame
            })
            .collect();
        Trajectory::new(frames, policy)
    }

    fn x_of(frame: &Frame) -> f32 {
        frame.get_block(ATOMS).unwrap().get_f32("x").unwrap()[0]
    }

    #[test]
    fn test_advance_clamps_by_default() {
        let mut trajectory = numbered(3, BoundaryPolicy::default());
        assert_eq!(x_of(&trajectory.advance(5).unwrap()), 2.0);
        assert_eq!(trajectory.current_index(), Some(2));
        assert_eq!(x_of(&trajectory.advance(-10).unwrap()), 0.0);
    }

    #[test]
    fn test_advance_wraps_when_configured() {
        let mut trajectory = numbered(3, BoundaryPolicy::Wrap);
        trajectory.advance(4);
        assert_eq!(trajectory.current_index(), Some(1));
        trajectory.advance(-2);
        assert_eq!(trajectory.current_index(), Some(2));
    }

    #[test]
    fn test_empty_trajectory_is_inert() {
        let mut trajectory = Trajectory::default();
        assert!(trajectory.advance(1).is_none());
        assert!(trajectory.current().is_none());
        assert_eq!(trajectory.current_index(), None);
        assert!(matches!(
            trajectory.seek(0),
            Err(MolvisError::IndexOutOfBounds { index: 0, len: 0 })
        ));
    }

    #[test]
    fn test_replace_leaves_old_frame_intact() {
        let mut trajectory = numbered(2, BoundaryPolicy::Clamp);
        let old = trajectory.replace(1, Frame::new()).unwrap();
        assert_eq!(x_of(&old), 1.0);
        assert!(!trajectory.get(1).unwrap().contains_block(ATOMS));
        assert!(trajectory.replace(2, Frame::new()).is_err());
    }

    #[test]
    fn test_append_keeps_cursor_and_history_is_shared() {
        let mut trajectory = Trajectory::default();
        trajectory.append(Frame::new());
        assert_eq!(trajectory.current_index(), Some(0));

        let mut atoms = Block::new();
        atoms.set_f32("x", vec![9.0]).unwrap();
        let mut second = Frame::new();
        second.insert_block(ATOMS, atoms);
        trajectory.append(second);

        assert_eq!(trajectory.len(), 2);
        assert_eq!(trajectory.current_index(), Some(0));
        let held = trajectory.get(1).unwrap();
        assert!(Arc::ptr_eq(&held, &trajectory.seek(1).unwrap()));
    }
}
