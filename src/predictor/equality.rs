//! Implementation of a BATAGE-style equality predictor.

pub mod component;
pub mod config;
pub mod stat;

pub use component::*;
pub use config::*;
pub use stat::*;

use log::{debug, trace};
use rand::prelude::*;
use std::collections::VecDeque;

use crate::error::PredictorError;
use crate::predictor::entry::{Confidence, EqualityEntry};

/// Maximum number of in-flight speculative branches.
pub const MAX_BRANCH_SPEC_DISTANCE: usize = 64;

/// Container for output from [EqualityPredictor::predict].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EqualityPrediction {
    /// Confidence attached to the predicted outcome
    pub confidence: Confidence,

    /// The predicted equality event: will the next committed value repeat
    /// the last one?
    pub outcome: bool,
}

/// A provider role resolved for one query: the component that supplied the
/// entry, plus a snapshot of the entry's state at selection time.
///
/// Roles are recomputed per query and never stored.
#[derive(Clone, Copy, Debug)]
struct Provider {
    comp: usize,
    confidence: Confidence,
    outcome: bool,
}

/// The primary and alternate providers resolved for one program counter.
#[derive(Clone, Copy, Debug, Default)]
struct Providers {
    primary: Option<Provider>,
    alt: Option<Provider>,
}

/// A tagged, geometric-history predictor for the event "the next committed
/// value of this instruction equals the last one".
///
/// The multi-component structure follows "A case for (partially) TAgged
/// GEometric history length branch prediction" (Seznec, 2006); the
/// dual-counter entries, confidence-driven selection, and allocation-driven
/// decay follow "An Alternative TAGE-like Conditional Branch Predictor"
/// (Michaud, 2018). Components are ordered by increasing history length, so
/// the longest matching history wins confidence ties.
///
/// Branch outcomes are fed in speculatively; the predictor keeps a bounded
/// queue of in-flight branch sequence numbers so a pipeline squash can
/// unwind exactly the wrong-path suffix of every component's history.
pub struct EqualityPredictor {
    /// Components, ordered by increasing history length
    components: Vec<EqualityComponent>,

    /// Sequence numbers of in-flight speculative branches, oldest first
    branch_queue: VecDeque<u64>,

    /// Pseudorandom stream driving allocation-driven decay
    rng: StdRng,

    /// Runtime statistics
    stat: EqualityStats,

    /// Probability that a blocking high-confidence entry is decayed
    alloc_decay_prob: f64,

    /// Policy knob: train a lone high-confidence primary at index > 0
    update_lone_primary: bool,
}

impl EqualityPredictor {
    /// Create a predictor from an ordered component list with the default
    /// knobs (decay probability 1/4, fixed seed).
    pub fn new(configs: Vec<ComponentConfig>)
        -> Result<Self, PredictorError>
    {
        EqualityConfig::new(configs).build()
    }

    /// Return the number of components.
    pub fn num_components(&self) -> usize {
        self.components.len()
    }

    /// Return the number of in-flight speculative branches.
    pub fn spec_depth(&self) -> usize {
        self.branch_queue.len()
    }

    /// Access the runtime statistics.
    pub fn stat(&self) -> &EqualityStats {
        &self.stat
    }

    /// Resolve the primary and alternate providers for a program counter.
    ///
    /// Scanning from the shortest history to the longest, a tag hit takes
    /// the primary role iff its confidence is greater than or equal to the
    /// current primary's, so ties resolve in favor of longer history. The
    /// alternate is whichever entry held the primary role just before the
    /// last replacement.
    fn select_providers(&self, pc: u64) -> Providers {
        let mut result = Providers::default();
        for (i, component) in self.components.iter().enumerate() {
            let Some(entry) = component.lookup(pc) else { continue };
            let candidate = Provider {
                comp: i,
                confidence: entry.confidence(),
                outcome: entry.direction(),
            };
            match result.primary {
                Some(p) if candidate.confidence < p.confidence => {}
                _ => {
                    result.alt = result.primary;
                    result.primary = Some(candidate);
                }
            }
        }
        result
    }

    /// Make a prediction for a program counter.
    ///
    /// With no hitting component the prediction is "changed" at low
    /// confidence.
    pub fn predict(&self, pc: u64) -> EqualityPrediction {
        match self.select_providers(pc).primary {
            Some(p) => EqualityPrediction {
                confidence: p.confidence,
                outcome: p.outcome,
            },
            None => EqualityPrediction {
                confidence: Confidence::Low,
                outcome: false,
            },
        }
    }

    /// Return the entry that would provide the prediction for a program
    /// counter, if any component hits.
    pub fn predicting_entry(&self, pc: u64) -> Option<&EqualityEntry> {
        let primary = self.select_providers(pc).primary?;
        self.components[primary.comp].lookup(pc)
    }

    /// Train the predictor with the resolved equality event for one value
    /// commit.
    ///
    /// Hits longer than the primary always train. The primary trains unless
    /// it is high-confidence and covered by an agreeing high-confidence
    /// alternate, in which case it decays so that confidence migrates toward
    /// the shorter history. The alternate trains only while the primary is
    /// below high confidence, freezing it as a stable fallback otherwise.
    /// Mispredictions then try to allocate one entry with a longer history.
    pub fn on_value_commit(&mut self, pc: u64, was_equal: bool) {
        let pd = self.select_providers(pc);
        let predicted = pd.primary.map_or(false, |p| p.outcome);
        let update_lone_primary = self.update_lone_primary;

        let mut longest_hit = 0;
        for i in 0..self.components.len() {
            let Some(entry) = self.components[i].lookup_mut(pc) else {
                self.stat.comp_miss[i] += 1;
                continue;
            };
            self.stat.comp_hits[i] += 1;
            longest_hit = i;

            let Some(primary) = pd.primary else { continue };
            if i > primary.comp {
                // Longer-history challengers keep learning.
                entry.update(was_equal);
            } else if i == primary.comp {
                let confidence = entry.confidence();
                let covered = pd.alt.map_or(false, |a| {
                    a.confidence == Confidence::High && a.outcome == was_equal
                });
                let train = i == 0
                    || confidence != Confidence::High
                    || (update_lone_primary && pd.alt.is_none())
                    || pd.alt.map_or(false, |a| {
                        a.confidence != Confidence::High
                            || a.outcome != was_equal
                    });
                if train {
                    entry.update(was_equal);
                } else if i > 0 && covered {
                    entry.decay();
                }
            } else if pd.alt.map_or(false, |a| a.comp == i) {
                if primary.confidence != Confidence::High {
                    entry.update(was_equal);
                }
            }
        }

        if predicted != was_equal {
            self.allocate(pc, was_equal, longest_hit);
        }
        self.stat.commits += 1;
    }

    /// Try to allocate one entry in a component strictly longer than the
    /// longest hit.
    ///
    /// The first candidate slot below high confidence is overwritten. Each
    /// high-confidence slot skipped on the way decays with probability
    /// `alloc_decay_prob`, so aged entries cannot block allocation forever.
    fn allocate(&mut self, pc: u64, was_equal: bool, longest_hit: usize) {
        let num = self.components.len();
        let start = longest_hit + 1;

        let mut chosen = num;
        for i in start..num {
            let confidence = self.components[i].lookup_conflict(pc)
                .confidence();
            if confidence != Confidence::High {
                self.components[i].allocate(pc, was_equal);
                chosen = i;
                break;
            }
        }

        if chosen < num {
            trace!(
                "allocated pc {:#x} in component {} (ghist {})",
                pc, chosen, self.components[chosen].ghist_bits()
            );
            self.stat.alcs += 1;
        } else {
            trace!("failed to allocate pc {:#x}", pc);
            self.stat.failed_alcs += 1;
        }

        for i in start..chosen {
            if self.rng.gen_bool(self.alloc_decay_prob) {
                self.components[i].lookup_conflict_mut(pc).decay();
                self.stat.alloc_decays += 1;
            }
        }
    }

    /// Announce a speculative branch and extend every component's folded
    /// history with its outcome.
    ///
    /// Fails with [PredictorError::SpecOverflow] when the speculation queue
    /// is full; the predictor is left unchanged in that case.
    pub fn update_on_branch(&mut self, seq: u64, outcome: bool)
        -> Result<(), PredictorError>
    {
        if self.branch_queue.len() >= MAX_BRANCH_SPEC_DISTANCE {
            return Err(PredictorError::SpecOverflow(
                MAX_BRANCH_SPEC_DISTANCE
            ));
        }
        debug_assert!(
            self.branch_queue.back().map_or(true, |b| *b <= seq),
            "branch sequence numbers must be non-decreasing"
        );

        self.branch_queue.push_back(seq);
        for component in self.components.iter_mut() {
            component.add_branch(outcome);
        }
        Ok(())
    }

    /// Retire the oldest in-flight branch. Its speculative history becomes
    /// architectural.
    ///
    /// Branches must retire in announcement order; retiring any other
    /// sequence number is a fatal protocol violation.
    pub fn on_branch_commit(&mut self, seq: u64) {
        let front = self.branch_queue.pop_front();
        assert_eq!(front, Some(seq), "branches must retire in order");
    }

    /// Cancel every in-flight branch with a sequence number at or after
    /// `seq`, unwinding the folded history of every component by exactly
    /// that many branches.
    pub fn squash(&mut self, seq: u64) {
        let mut num_to_revert = 0;
        while self.branch_queue.back().is_some_and(|b| *b >= seq) {
            self.branch_queue.pop_back();
            num_to_revert += 1;
        }
        for component in self.components.iter_mut() {
            component.revert_branches(num_to_revert);
        }

        if num_to_revert > 0 {
            debug!("squash at seq {} reverted {} branches", seq, num_to_revert);
            self.stat.squashes += 1;
            self.stat.squashed_branches += num_to_revert;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::prelude::*;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn predictor(configs: &[(usize, usize, usize, usize)])
        -> EqualityPredictor
    {
        let configs = configs.iter()
            .map(|c| ComponentConfig::new(c.0, c.1, c.2, c.3))
            .collect();
        EqualityPredictor::new(configs).unwrap()
    }

    #[test]
    fn fresh_predictor_predicts_changed() {
        let pred = predictor(&[(256, 8, 8, 0), (256, 16, 8, 8), (256, 32, 8, 8)]);
        assert_eq!(pred.num_components(), 3);
        let p = pred.predict(0x1234);
        assert_eq!(p.outcome, false);
        assert_eq!(p.confidence, Confidence::Low);
    }

    #[test]
    fn allocation_follows_mispredictions() {
        let mut pred = predictor(&[
            (256, 8, 8, 0), (256, 16, 8, 8), (256, 32, 8, 8),
        ]);
        let pc = 0x1234;

        pred.on_value_commit(pc, true);
        pred.on_value_commit(pc, true);
        for _ in 0..4 {
            pred.on_value_commit(pc, false);
        }

        assert_eq!(pred.predict(pc).outcome, false);
        assert!(pred.stat().alcs > 0);
    }

    #[test]
    fn speculative_squash_restores_predictions() {
        init_logging();
        let mut pred = predictor(&[(256, 2, 8, 0), (256, 4, 8, 8)]);
        let pc = 0x1234;

        // Ten commits whose label matches the last two branch outcomes.
        for i in 0..10u64 {
            let b = i % 2 == 0;
            pred.update_on_branch(i * 2, b).unwrap();
            pred.update_on_branch(i * 2 + 1, b).unwrap();
            pred.on_value_commit(pc, b);
        }

        pred.update_on_branch(30, true).unwrap();
        pred.update_on_branch(40, true).unwrap();
        pred.update_on_branch(50, false).unwrap();
        pred.update_on_branch(60, false).unwrap();
        assert_eq!(pred.predict(pc).outcome, false);

        pred.squash(50);
        assert_eq!(pred.predict(pc).outcome, true);

        // Squash is idempotent.
        let depth = pred.spec_depth();
        pred.squash(50);
        assert_eq!(pred.predict(pc).outcome, true);
        assert_eq!(pred.spec_depth(), depth);
    }

    #[test]
    fn speculation_queue_overflow_is_an_error() {
        let mut pred = predictor(&[(256, 4, 8, 8)]);
        for seq in 0..MAX_BRANCH_SPEC_DISTANCE as u64 {
            pred.update_on_branch(seq, true).unwrap();
        }
        assert_eq!(
            pred.update_on_branch(64, true),
            Err(PredictorError::SpecOverflow(MAX_BRANCH_SPEC_DISTANCE))
        );
        // The failed call left the queue untouched.
        assert_eq!(pred.spec_depth(), MAX_BRANCH_SPEC_DISTANCE);

        pred.on_branch_commit(0);
        assert!(pred.update_on_branch(64, true).is_ok());
    }

    #[test]
    #[should_panic(expected = "retire in order")]
    fn out_of_order_retire_panics() {
        let mut pred = predictor(&[(256, 4, 8, 8)]);
        pred.update_on_branch(10, true).unwrap();
        pred.update_on_branch(20, false).unwrap();
        pred.on_branch_commit(20);
    }

    #[test]
    fn squash_removes_exactly_the_suffix() {
        let mut pred = predictor(&[(256, 8, 8, 8)]);
        for seq in [10, 20, 30, 40, 50] {
            pred.update_on_branch(seq, true).unwrap();
        }
        pred.squash(30);
        assert_eq!(pred.spec_depth(), 2);
        pred.on_branch_commit(10);
        pred.on_branch_commit(20);
        assert_eq!(pred.spec_depth(), 0);
    }

    #[test]
    fn converges_on_learnable_pattern() {
        init_logging();
        let mut pred = predictor(&[(256, 0, 8, 0), (256, 4, 8, 8)]);
        let pc = 0x1000;

        // The label is the AND of the two most recent branch outcomes, so a
        // component with four bits of history can learn it exactly.
        let mut rng = StdRng::seed_from_u64(0x1cf);
        let mut correct = 0usize;
        let mut total = 0usize;
        let mut prev = false;
        for _ in 0..50_000 {
            let n = rng.gen::<bool>();
            pred.update_on_branch(0, n).unwrap();
            pred.on_branch_commit(0);

            let label = prev && n;
            prev = n;

            if pred.predict(pc).outcome == label {
                correct += 1;
            }
            total += 1;

            pred.on_value_commit(pc, label);
        }

        let accuracy = correct as f64 / total as f64;
        assert!(accuracy > 0.99, "accuracy {} too low", accuracy);

        // A history ending in two repeats must predict "repeats" with a
        // saturated providing entry.
        pred.update_on_branch(0, false).unwrap();
        pred.update_on_branch(1, true).unwrap();
        pred.update_on_branch(1, true).unwrap();
        let p = pred.predict(pc);
        assert_eq!(p.outcome, true);
        assert_eq!(p.confidence, Confidence::High);

        let entry = pred.predicting_entry(pc).unwrap();
        assert_eq!(entry.eq_ctr, 7);
        assert_eq!(entry.ne_ctr, 0);
    }

    #[test]
    fn alternating_pattern_never_reaches_high_confidence() {
        let mut pred = predictor(&[(256, 8, 8, 0), (256, 16, 8, 8)]);
        let pc = 0x2000;
        for i in 0..100 {
            pred.on_value_commit(pc, i % 2 == 0);
        }
        assert_ne!(pred.predict(pc).confidence, Confidence::High);
    }

    #[test]
    fn rapid_shift_is_tracked() {
        let mut pred = predictor(&[(256, 8, 8, 0), (256, 16, 8, 8)]);
        let pc = 0x3000;

        for _ in 0..50 {
            pred.on_value_commit(pc, true);
        }
        assert_eq!(pred.predict(pc).outcome, true);

        for _ in 0..50 {
            pred.on_value_commit(pc, false);
        }
        assert_eq!(pred.predict(pc).outcome, false);
    }

    #[test]
    fn contested_primary_falls_from_high_confidence() {
        let mut pred = predictor(&[(256, 8, 8, 0), (256, 16, 8, 8)]);
        let pc = 0x4000;

        for _ in 0..10 {
            pred.on_value_commit(pc, true);
        }
        for _ in 0..5 {
            pred.on_value_commit(pc, false);
        }

        let entry = pred.predicting_entry(pc).unwrap();
        assert_ne!(entry.confidence(), Confidence::High);
    }
}
