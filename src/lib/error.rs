//! Error types for the automaton store.

use thiserror::Error;

use crate::automaton::fsa::state::StateId;

/// Errors reported by mutating operations on a
/// [FiniteAutomaton](crate::automaton::fsa::FiniteAutomaton).
///
/// Boundary queries (`find_transition`, `is_final`, `has_transitions`) never
/// return these; they degrade to "absent" instead.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FsaError {
    #[error("state index {index} is outside the allocated span")]
    OutOfRange { index: usize },

    #[error("stale state handle {id}: the slot has been recycled")]
    StaleId { id: StateId },

    #[error("state {id} has no outgoing transitions")]
    EmptyRow { id: StateId },

    #[error("automaton is full: {max_states} states allocated")]
    Capacity { max_states: usize },

    #[error("state {id} still has {count} inbound transitions")]
    InboundEdges { id: StateId, count: u32 },

    #[error("cannot merge state {id} into itself")]
    SelfMerge { id: StateId },
}
