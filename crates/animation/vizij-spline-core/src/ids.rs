//! Identifiers for bones, matrix operations and time.

use serde::{Deserialize, Serialize};

/// Integer animation time. Integer ticks keep precision at the end of long clips.
pub type Tick = i32;

/// Index of a bone in a rig's bone arena.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct BoneIndex(pub u16);

impl BoneIndex {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for BoneIndex {
    fn from(idx: usize) -> Self {
        debug_assert!(idx <= u16::MAX as usize);
        Self(idx as u16)
    }
}

/// Stable id of a matrix operation within a bone. Channels are kept sorted by this id,
/// which is also the order in which the operations are applied.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct MatrixOpId(pub u8);

impl MatrixOpId {
    /// Shift the id by a signed offset. Used when one operation is replaced by a sibling
    /// operation whose id sits at a fixed distance.
    #[inline]
    pub fn offset(self, delta: i32) -> Self {
        let id = i32::from(self.0) + delta;
        debug_assert!((0..=i32::from(u8::MAX)).contains(&id));
        Self(id as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bone_index_round_trips_usize() {
        let b = BoneIndex::from(7usize);
        assert_eq!(b, BoneIndex(7));
        assert_eq!(b.index(), 7);
    }

    #[test]
    fn op_id_offset_and_ordering() {
        assert_eq!(MatrixOpId(15).offset(3), MatrixOpId(18));
        assert_eq!(MatrixOpId(18).offset(-3), MatrixOpId(15));
        assert!(MatrixOpId(2) < MatrixOpId(3));
    }
}
