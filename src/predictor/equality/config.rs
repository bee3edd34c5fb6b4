
use rand::prelude::*;
use std::collections::VecDeque;

use crate::error::PredictorError;
use crate::history::PathTracker;
use crate::predictor::entry::NMAX;

use super::component::EqualityComponent;
use super::stat::EqualityStats;
use super::EqualityPredictor;

/// Configuration for one [EqualityComponent].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentConfig {
    /// Number of entries
    pub size: usize,

    /// History length in branch outcomes (0 for a history-less component)
    pub ghist_bits: usize,

    /// Number of table-index bits
    pub index_bits: usize,

    /// Number of tag bits (0 for a tagless component)
    pub tag_bits: usize,
}

impl ComponentConfig {
    pub fn new(size: usize, ghist_bits: usize, index_bits: usize,
        tag_bits: usize) -> Self
    {
        Self { size, ghist_bits, index_bits, tag_bits }
    }

    /// Get the [approximate] number of storage bits.
    pub fn storage_bits(&self) -> usize {
        let ctr_bits = 2 * (NMAX.ilog2() + 1) as usize;
        (ctr_bits + self.tag_bits) * self.size
    }

    /// Use this configuration to create a new [EqualityComponent].
    pub fn build(self) -> Result<EqualityComponent, PredictorError> {
        if self.size < (1 << self.index_bits) {
            return Err(PredictorError::UndersizedTable {
                size: self.size,
                index_bits: self.index_bits,
            });
        }
        let path = PathTracker::new(
            self.ghist_bits, self.index_bits, self.tag_bits
        )?;
        Ok(EqualityComponent::from_parts(self, path))
    }
}

/// Configuration for an [EqualityPredictor].
///
/// Components are kept in the order they are added, shortest history first;
/// that order fixes the selection and allocation progression and is never
/// rearranged.
#[derive(Clone, Debug)]
pub struct EqualityConfig {
    /// Component configurations, by increasing history length
    pub components: Vec<ComponentConfig>,

    /// Probability that a high-confidence entry blocking an allocation is
    /// decayed
    pub alloc_decay_prob: f64,

    /// Whether a high-confidence primary at a nonzero component index is
    /// still trained when no alternate provider exists. Off by default.
    pub update_lone_primary: bool,

    /// Seed for the allocation-decay stream
    pub seed: u64,
}

impl EqualityConfig {
    pub fn new(components: Vec<ComponentConfig>) -> Self {
        Self {
            components,
            alloc_decay_prob: 0.25,
            update_lone_primary: false,
            seed: 0,
        }
    }

    /// Append a component with the next-longer history length.
    pub fn add_component(&mut self, c: ComponentConfig) {
        self.components.push(c);
    }

    pub fn total_entries(&self) -> usize {
        self.components.iter().map(|c| c.size).sum()
    }

    /// Get the [approximate] number of storage bits.
    pub fn storage_bits(&self) -> usize {
        self.components.iter().map(|c| c.storage_bits()).sum()
    }

    /// Use this configuration to create a new [EqualityPredictor].
    pub fn build(self) -> Result<EqualityPredictor, PredictorError> {
        let components = self.components.iter()
            .map(|c| c.build())
            .collect::<Result<Vec<EqualityComponent>, PredictorError>>()?;
        let stat = EqualityStats::new(components.len());
        let rng = StdRng::seed_from_u64(self.seed);
        Ok(EqualityPredictor {
            components,
            branch_queue: VecDeque::new(),
            rng,
            stat,
            alloc_decay_prob: self.alloc_decay_prob,
            update_lone_primary: self.update_lone_primary,
        })
    }
}
