
use crate::history::PathTracker;
use crate::predictor::entry::EqualityEntry;
use crate::predictor::{PredictorTable, TaggedPredictorTable};

use super::config::ComponentConfig;

/// A tagged, direct-mapped table of [EqualityEntry] cells keyed by one
/// history length.
///
/// The slot for a program counter is chosen by the component's
/// [PathTracker]; the stored tag decides whether the slot actually belongs
/// to that program counter and path, or is just a conflicting neighbor.
#[derive(Clone, Debug)]
pub struct EqualityComponent {
    /// The configuration used to create this component
    pub cfg: ComponentConfig,

    /// Folded speculative history for this component's history length
    path: PathTracker,

    /// Table of entries
    entries: Vec<EqualityEntry>,
}

impl EqualityComponent {
    pub(super) fn from_parts(cfg: ComponentConfig, path: PathTracker) -> Self {
        let entries = vec![EqualityEntry::new(0); cfg.size];
        Self { cfg, path, entries }
    }

    /// Return the entry a program counter maps to, ignoring the tag.
    pub fn lookup_conflict(&self, pc: u64) -> &EqualityEntry {
        self.get_entry(self.get_index(pc))
    }

    /// Mutable variant of [EqualityComponent::lookup_conflict].
    pub fn lookup_conflict_mut(&mut self, pc: u64) -> &mut EqualityEntry {
        let idx = self.get_index(pc);
        self.get_entry_mut(idx)
    }

    /// Return the entry a program counter maps to, or [None] when the
    /// stored tag does not match.
    pub fn lookup(&self, pc: u64) -> Option<&EqualityEntry> {
        let tag = self.get_tag(pc);
        let entry = self.lookup_conflict(pc);
        (entry.tag == tag).then_some(entry)
    }

    /// Mutable variant of [EqualityComponent::lookup].
    pub fn lookup_mut(&mut self, pc: u64) -> Option<&mut EqualityEntry> {
        let tag = self.get_tag(pc);
        let entry = self.lookup_conflict_mut(pc);
        if entry.tag == tag { Some(entry) } else { None }
    }

    /// Overwrite the slot for a program counter with a fresh tagged entry,
    /// trained once with `outcome`.
    pub fn allocate(&mut self, pc: u64, outcome: bool) {
        let tag = self.get_tag(pc);
        let entry = self.lookup_conflict_mut(pc);
        *entry = EqualityEntry::new(tag);
        entry.update(outcome);
    }

    /// Train the slot for a program counter iff its tag matches.
    pub fn on_commit(&mut self, pc: u64, outcome: bool) {
        if let Some(entry) = self.lookup_mut(pc) {
            entry.update(outcome);
        }
    }

    /// Extend this component's folded history with a branch outcome.
    pub fn add_branch(&mut self, outcome: bool) {
        self.path.add_branch(outcome);
    }

    /// Unwind the `num` most recent branch outcomes.
    pub fn revert_branches(&mut self, num: usize) {
        self.path.revert_branches(num);
    }

    /// The history length this component is keyed by.
    pub fn ghist_bits(&self) -> usize {
        self.path.ghist_bits()
    }
}

impl PredictorTable for EqualityComponent {
    type Entry = EqualityEntry;

    fn size(&self) -> usize { self.cfg.size }

    fn get_index(&self, pc: u64) -> usize {
        self.path.get_index(pc)
    }

    fn get_entry(&self, idx: usize) -> &EqualityEntry {
        &self.entries[idx]
    }

    fn get_entry_mut(&mut self, idx: usize) -> &mut EqualityEntry {
        &mut self.entries[idx]
    }
}

impl TaggedPredictorTable for EqualityComponent {
    fn get_tag(&self, pc: u64) -> u32 {
        self.path.get_tag(pc)
    }
}
