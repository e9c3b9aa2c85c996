// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Provenance tag attached to each piece, read back during the backward pass.
///
/// `label` is the 0-indexed start of the segment the piece belongs to,
/// `state` the segment state, `position` the piece ordinal inside its owning
/// list, and `parent_state` the state the segment was entered from. Pieces
/// transported by a null continuation keep their track; only jump edges stamp
/// a fresh one, so a label of 0 always means "first segment" and the backward
/// pass terminates there.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Track {
    pub label: usize,
    pub state: usize,
    pub position: usize,
    pub parent_state: usize,
}

impl Track {
    pub const fn new(label: usize, state: usize, position: usize, parent_state: usize) -> Self {
        Self {
            label,
            state,
            position,
            parent_state,
        }
    }

    /// Track of an initial piece in `state` (label 0, its own parent).
    pub const fn origin(state: usize) -> Self {
        Self::new(0, state, 0, state)
    }

    /// Tie-break ordering used by the envelope and the final minimum scan:
    /// smaller label first, then smaller state.
    pub fn wins_tie_over(&self, other: &Track) -> bool {
        (self.label, self.state) < (other.label, other.state)
    }
}
