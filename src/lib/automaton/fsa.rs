use std::{
    collections::BTreeSet,
    fmt::Debug,
    mem,
};

use hashbrown::HashSet;
use itertools::Itertools;

use crate::{config::FsaConfig, error::FsaError};

pub mod state;

use state::{StateExport, StateId, StateRow, Symbol};

/// A deterministic finite-state automaton store.
///
/// The store owns a dense transition table (one row per allocated state, each
/// row an ascending-symbol map to destination states), the set of final
/// states, and a free pool of recyclable row indices. It is the substrate a
/// minimization pass builds on: states can be allocated, deleted with
/// identifier recycling, and merged into one another with all inbound edges
/// rewritten.
///
/// All operations are plain synchronous table/set mutations; concurrent use
/// requires external mutual exclusion over the whole store.
#[derive(Clone)]
pub struct FiniteAutomaton {
    /// Delta-function. Indexed by state, rows stay in place for the lifetime
    /// of the store; deletion clears a row and recycles its index.
    delta: Vec<StateRow>,
    /// Recyclable row indices. Allocation takes the smallest.
    free_states: BTreeSet<u32>,
    /// Indices of the currently final states.
    final_states: HashSet<u32>,
    config: FsaConfig,
}

impl FiniteAutomaton {
    pub fn new() -> Self {
        Self::with_config(FsaConfig::default())
    }

    pub fn with_config(config: FsaConfig) -> Self {
        FiniteAutomaton {
            delta: Vec::new(),
            free_states: BTreeSet::new(),
            final_states: HashSet::new(),
            config,
        }
    }

    /// Pre-allocates table capacity for `n` states.
    pub fn reserve(&mut self, n: usize) {
        self.delta.reserve(n);
    }

    /// Resolves a handle to its row, rejecting out-of-range indices and
    /// handles whose slot has been recycled since they were issued.
    fn row(&self, id: StateId) -> Result<&StateRow, FsaError> {
        let row = self
            .delta
            .get(id.index())
            .ok_or(FsaError::OutOfRange { index: id.index() })?;

        if !row.live || row.generation != id.generation() {
            return Err(FsaError::StaleId { id });
        }

        Ok(row)
    }

    /// Handle resolution for boundary queries, which degrade to "absent"
    /// instead of failing.
    fn live_row(&self, id: StateId) -> Option<&StateRow> {
        self.row(id).ok()
    }

    /// Returns an unused state.
    ///
    /// The smallest index from the free pool is reused if there is one (its
    /// row is already empty, an invariant maintained by the deletion path);
    /// otherwise a fresh empty row is appended. Fails with
    /// [Capacity](FsaError::Capacity) once `max_states` rows exist.
    pub fn new_state(&mut self) -> Result<StateId, FsaError> {
        if let Some(index) = self.free_states.pop_first() {
            let row = &mut self.delta[index as usize];
            debug_assert!(row.transitions.is_empty() && row.inbound == 0);

            row.live = true;
            let id = StateId::new(index, row.generation);
            tracing::trace!("reusing freed slot {} as {}", index, id);
            return Ok(id);
        }

        if self.delta.len() >= self.config.max_states {
            return Err(FsaError::Capacity {
                max_states: self.config.max_states,
            });
        }

        let index = self.delta.len() as u32;
        self.delta.push(StateRow {
            live: true,
            ..StateRow::default()
        });

        Ok(StateId::new(index, 0))
    }

    /// Adds a transition from `from` with `symbol` to a freshly allocated
    /// state and returns that state.
    ///
    /// Like [insert_transition](Self::insert_transition), an existing
    /// transition on `symbol` is overwritten.
    pub fn add_transition(&mut self, from: StateId, symbol: Symbol) -> Result<StateId, FsaError> {
        // validate before allocating, so a bad handle does not leak a state
        self.row(from)?;

        let to = self.new_state()?;
        self.insert_transition(from, symbol, to)?;

        Ok(to)
    }

    /// Records the transition `from --symbol--> to`.
    ///
    /// Last write wins: if `from` already has a transition on `symbol`, the
    /// old destination is replaced and returned, so a caller that cares can
    /// tell an overwrite from a fresh insert.
    pub fn insert_transition(
        &mut self,
        from: StateId,
        symbol: Symbol,
        to: StateId,
    ) -> Result<Option<StateId>, FsaError> {
        self.row(from)?;
        self.row(to)?;

        let previous = self.delta[from.index()].transitions.insert(symbol, to);

        if previous != Some(to) {
            if let Some(old) = previous {
                self.delta[old.index()].inbound -= 1;
            }
            self.delta[to.index()].inbound += 1;
        }

        if let Some(old) = previous {
            tracing::debug!(
                "transition {} --{}--> {} overwritten, new target {}",
                from,
                symbol,
                old,
                to
            );
        }

        Ok(previous)
    }

    /// Finds the target state `p` of the transition `from --symbol--> p`.
    /// Returns [None] if the transition is undefined, including for handles
    /// that are out of range or stale.
    pub fn find_transition(&self, from: StateId, symbol: Symbol) -> Option<StateId> {
        self.live_row(from)?.transitions.get(&symbol).copied()
    }

    /// Returns true iff `from` has outgoing transitions. False for invalid
    /// handles.
    pub fn has_transitions(&self, from: StateId) -> bool {
        self.live_row(from)
            .is_some_and(|row| !row.transitions.is_empty())
    }

    /// Finds the lexicographic last child of `from`, the destination of the
    /// greatest outgoing symbol. A state without outgoing transitions
    /// reports [EmptyRow](FsaError::EmptyRow) rather than producing garbage.
    pub fn last_child(&self, from: StateId) -> Result<StateId, FsaError> {
        self.row(from)?
            .transitions
            .iter()
            .next_back()
            .map(|(_, &to)| to)
            .ok_or(FsaError::EmptyRow { id: from })
    }

    /// The outgoing transitions of `from` in ascending-symbol order. Empty
    /// for invalid handles.
    pub fn transitions(&self, from: StateId) -> impl Iterator<Item = (Symbol, StateId)> + '_ {
        self.live_row(from)
            .into_iter()
            .flat_map(|row| row.transitions.iter().map(|(&symbol, &to)| (symbol, to)))
    }

    /// Makes `q` final. Idempotent. Rejects handles that were never
    /// allocated or have been recycled.
    pub fn make_final(&mut self, q: StateId) -> Result<(), FsaError> {
        self.row(q)?;
        self.final_states.insert(q.raw_index());
        Ok(())
    }

    /// Returns true iff `q` is final. False for invalid handles.
    pub fn is_final(&self, q: StateId) -> bool {
        self.live_row(q).is_some() && self.final_states.contains(&q.raw_index())
    }

    /// Deletes `q`: clears its transitions, removes its finality, and puts
    /// its index on the free pool for reuse.
    ///
    /// Deletion is only allowed once no other state has a transition into
    /// `q` (self-loops on `q` do not count, they die with the row);
    /// otherwise [InboundEdges](FsaError::InboundEdges) is reported and
    /// nothing changes. A double delete fails with
    /// [StaleId](FsaError::StaleId), it can never corrupt the free pool.
    pub fn delete_state(&mut self, q: StateId) -> Result<(), FsaError> {
        let row = self.row(q)?;

        let self_edges = row.transitions.values().filter(|&&to| to == q).count() as u32;
        let external = row.inbound - self_edges;
        if external > 0 {
            return Err(FsaError::InboundEdges {
                id: q,
                count: external,
            });
        }

        let transitions = mem::take(&mut self.delta[q.index()].transitions);
        for to in transitions.into_values() {
            self.delta[to.index()].inbound -= 1;
        }

        let row = &mut self.delta[q.index()];
        row.live = false;
        row.generation += 1;
        self.final_states.remove(&q.raw_index());
        self.free_states.insert(q.raw_index());

        tracing::debug!("deleted state {}, slot {} freed", q, q.index());

        #[cfg(debug_assertions)]
        self.assert_consistent();

        Ok(())
    }

    /// Merges state `p` into the surviving state `q`.
    ///
    /// Finality carries over from `p` to `q`, `p`'s outgoing transitions are
    /// unioned into `q`'s row with `q`'s pre-existing edges winning symbol
    /// collisions, and every transition in the table that targeted `p` is
    /// rewritten to target `q` (a self-loop on `p` becomes a self-loop on
    /// `q`). When this returns, no transition anywhere references `p`.
    ///
    /// The merge never deletes: `p` stays allocated and orphaned until the
    /// caller reclaims it with [delete_state](Self::delete_state).
    pub fn replace_state(&mut self, p: StateId, q: StateId) -> Result<(), FsaError> {
        self.row(p)?;
        self.row(q)?;
        if p == q {
            return Err(FsaError::SelfMerge { id: p });
        }

        if self.final_states.remove(&p.raw_index()) {
            self.final_states.insert(q.raw_index());
        }

        // union p's row into q's, q wins collisions
        let p_edges = self.delta[p.index()].transitions.clone();
        for (symbol, to) in p_edges {
            let to = if to == p { q } else { to };
            if !self.delta[q.index()].transitions.contains_key(&symbol) {
                self.delta[q.index()].transitions.insert(symbol, to);
                self.delta[to.index()].inbound += 1;
            }
        }

        // rewrite every transition targeting p, p's own row included
        for index in 0..self.delta.len() {
            let rewritten = self.delta[index]
                .transitions
                .iter()
                .filter(|&(_, &to)| to == p)
                .map(|(&symbol, _)| symbol)
                .collect_vec();

            for symbol in rewritten {
                self.delta[index].transitions.insert(symbol, q);
                self.delta[p.index()].inbound -= 1;
                self.delta[q.index()].inbound += 1;
            }
        }

        debug_assert_eq!(
            self.delta[p.index()].inbound,
            0,
            "merge left a dangling reference to {}",
            p
        );

        tracing::debug!("merged state {} into {}", p, q);

        #[cfg(debug_assertions)]
        self.assert_consistent();

        Ok(())
    }

    /// Returns the number of live states.
    pub fn state_count(&self) -> usize {
        self.delta.len() - self.free_states.len()
    }

    /// Returns the allocated span of the transition table, free slots
    /// included.
    pub fn allocated_count(&self) -> usize {
        self.delta.len()
    }

    /// Returns the number of final states.
    pub fn final_state_count(&self) -> usize {
        self.final_states.len()
    }

    /// Returns the number of transitions.
    pub fn transition_count(&self) -> usize {
        self.delta.iter().map(|row| row.transitions.len()).sum()
    }

    /// Returns the maximum out-degree over all states.
    pub fn max_out_degree(&self) -> usize {
        self.delta
            .iter()
            .map(|row| row.transitions.len())
            .max()
            .unwrap_or(0)
    }

    /// Enumerates every live state in ascending-index order, with its
    /// finality flag and its transitions in ascending-symbol order. This is
    /// the full, deterministic view an external renderer needs; internal
    /// storage stays private.
    pub fn iter_states(&self) -> impl Iterator<Item = StateExport<'_>> {
        self.delta
            .iter()
            .enumerate()
            .filter(|(_, row)| row.live)
            .map(|(index, row)| StateExport {
                id: StateId::new(index as u32, row.generation),
                is_final: self.final_states.contains(&(index as u32)),
                transitions: &row.transitions,
            })
    }

    /// Asserts the cross-cutting invariants between the transition table,
    /// the free pool, and the final-state set.
    ///
    /// Panics on violation. Mutating operations run this in debug builds;
    /// tests call it after every scenario.
    pub fn assert_consistent(&self) {
        for &index in &self.free_states {
            let row = &self.delta[index as usize];
            assert!(!row.live, "free slot {} is still marked live", index);
            assert!(
                row.transitions.is_empty(),
                "free slot {} still has outgoing transitions",
                index
            );
            assert_eq!(row.inbound, 0, "free slot {} still has inbound edges", index);
            assert!(
                !self.final_states.contains(&index),
                "free slot {} is still marked final",
                index
            );
        }

        for &index in &self.final_states {
            assert!(
                (index as usize) < self.delta.len(),
                "final state {} was never allocated",
                index
            );
            assert!(
                self.delta[index as usize].live,
                "final state {} is not live",
                index
            );
        }

        let mut inbound = vec![0u32; self.delta.len()];
        for row in &self.delta {
            for (&symbol, &to) in &row.transitions {
                assert!(
                    to.index() < self.delta.len(),
                    "transition --{}--> {} leaves the allocated span",
                    symbol,
                    to
                );
                let target = &self.delta[to.index()];
                assert!(
                    target.live && target.generation == to.generation(),
                    "dangling transition --{}--> {}",
                    symbol,
                    to
                );
                inbound[to.index()] += 1;
            }
        }

        for (index, row) in self.delta.iter().enumerate() {
            assert_eq!(
                row.inbound, inbound[index],
                "inbound count drift at slot {}",
                index
            );
            assert_eq!(
                row.live,
                !self.free_states.contains(&(index as u32)),
                "slot {} is neither cleanly live nor cleanly free",
                index
            );
        }
    }
}

impl Default for FiniteAutomaton {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for FiniteAutomaton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FiniteAutomaton")
            .field("state_count", &self.state_count())
            .field("states", &self.iter_states().map(|s| s.id).collect_vec())
            .field(
                "final_states",
                &self.final_states.iter().sorted().collect_vec(),
            )
            .field("free_states", &self.free_states)
            .field("transition_count", &self.transition_count())
            .field(
                "transitions",
                &self
                    .iter_states()
                    .flat_map(|s| {
                        let id = s.id;
                        s.transitions.iter().map(move |(&symbol, &to)| {
                            format!("{} --{:?}--> {}", id, char::from(symbol), to)
                        })
                    })
                    .collect_vec(),
            )
            .finish()
    }
}
