use serde::{Deserialize, Serialize};

/// Configuration for a [FiniteAutomaton](crate::automaton::fsa::FiniteAutomaton).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsaConfig {
    /// Upper bound on the number of transition-table rows that may ever be
    /// allocated. Allocation past this bound reports
    /// [Capacity](crate::error::FsaError::Capacity) instead of growing the
    /// table. Indices must stay representable as `u32`.
    pub max_states: usize,
}

impl FsaConfig {
    pub fn with_max_states(max_states: usize) -> Self {
        assert!(
            max_states <= u32::MAX as usize,
            "state indices are u32, max_states {} does not fit",
            max_states
        );
        FsaConfig { max_states }
    }
}

impl Default for FsaConfig {
    fn default() -> Self {
        FsaConfig {
            max_states: u32::MAX as usize,
        }
    }
}
