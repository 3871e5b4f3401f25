use std::{collections::BTreeMap, fmt::Display};

use serde::{Deserialize, Serialize};

/// A single input-alphabet element labeling a transition.
pub type Symbol = u8;

/// Handle to a state in a [FiniteAutomaton](super::FiniteAutomaton).
///
/// A handle pairs the row index with the generation of the row at the time
/// the state was allocated. Deleting a state bumps the row's generation, so
/// a handle held across a delete-and-reuse cycle no longer matches the slot
/// and is rejected (or answered with "absent") instead of silently aliasing
/// the unrelated new occupant of the same index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId {
    index: u32,
    generation: u32,
}

impl StateId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        StateId { index, generation }
    }

    /// The row index this handle refers to.
    pub fn index(self) -> usize {
        self.index as usize
    }

    pub(crate) fn raw_index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "q{}@{}", self.index, self.generation)
    }
}

/// A single row of the transition table.
///
/// Invariant: `inbound` equals the number of transitions anywhere in the
/// table whose destination is this row, self-loops included. A non-live row
/// has an empty map and zero inbound.
#[derive(Debug, Clone, Default)]
pub(crate) struct StateRow {
    pub transitions: BTreeMap<Symbol, StateId>,
    pub generation: u32,
    pub live: bool,
    pub inbound: u32,
}

/// One live state as reported by
/// [iter_states](super::FiniteAutomaton::iter_states): its handle, finality
/// flag, and outgoing transitions in ascending-symbol order. This is the
/// whole enumeration contract an external renderer needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateExport<'a> {
    pub id: StateId,
    pub is_final: bool,
    pub transitions: &'a BTreeMap<Symbol, StateId>,
}
