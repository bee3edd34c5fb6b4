//! The value-predicting façade over the equality predictor and the
//! last-committed-value table.

use crate::error::PredictorError;
use crate::lcvt::LastCommittedValueTable;
use crate::predictor::entry::Confidence;
use crate::predictor::equality::{
    ComponentConfig, EqualityConfig, EqualityPredictor,
};

/// Container for output from [ValuePredictor::predict].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValuePrediction {
    /// Confidence attached to the predicted value
    pub confidence: Confidence,

    /// The predicted value (the last committed one, when the equality
    /// predictor expects it to repeat)
    pub value: u64,
}

/// A last-committed-value predictor.
///
/// The [EqualityPredictor] forecasts whether an instruction's next committed
/// value repeats its previous one; when it does, the value itself comes from
/// the [LastCommittedValueTable]. The façade only ever predicts values it
/// has seen committed.
pub struct ValuePredictor {
    lcvt: LastCommittedValueTable,
    equality: EqualityPredictor,
}

impl ValuePredictor {
    /// Reference geometry: a short-history tagless base, a medium and a long
    /// tagged component.
    pub fn reference_config() -> EqualityConfig {
        EqualityConfig::new(vec![
            ComponentConfig::new(1024, 8, 10, 0),
            ComponentConfig::new(4096, 16, 12, 12),
            ComponentConfig::new(8192, 32, 13, 13),
        ])
    }

    /// Create a predictor with the reference geometry.
    pub fn new() -> Self {
        Self::with_config(Self::reference_config())
            .expect("reference geometry is valid")
    }

    /// Create a predictor with a caller-supplied geometry.
    pub fn with_config(cfg: EqualityConfig) -> Result<Self, PredictorError> {
        Ok(Self {
            lcvt: LastCommittedValueTable::new(),
            equality: cfg.build()?,
        })
    }

    /// Predict the value the next dynamic instance of `pc` will commit.
    ///
    /// Anything short of a confident repeat (an equality prediction of
    /// "changed", or no committed value to repeat) yields `(low, 0)`.
    pub fn predict(&self, pc: u64) -> ValuePrediction {
        let pred = self.equality.predict(pc);
        if !pred.outcome || !self.lcvt.has_value(pc) {
            return ValuePrediction {
                confidence: Confidence::Low,
                value: 0,
            };
        }
        ValuePrediction {
            confidence: pred.confidence,
            value: self.lcvt.lookup(pc),
        }
    }

    /// Record a committed value for `pc`.
    ///
    /// The equality event is assessed against the table *before* the table
    /// is overwritten; a first-ever commit trains the predictor with
    /// "changed".
    pub fn on_value_commit(&mut self, pc: u64, val: u64) {
        let was_equal = self.lcvt.has_value(pc) && self.lcvt.lookup(pc) == val;
        self.equality.on_value_commit(pc, was_equal);
        self.lcvt.update(pc, val);
    }

    /// Announce a speculative branch outcome.
    pub fn update_on_branch(&mut self, seq: u64, taken: bool)
        -> Result<(), PredictorError>
    {
        self.equality.update_on_branch(seq, taken)
    }

    /// Retire the oldest in-flight branch.
    pub fn on_branch_commit(&mut self, seq: u64) {
        self.equality.on_branch_commit(seq);
    }

    /// Cancel in-flight branches with sequence numbers at or after `seq`.
    pub fn squash(&mut self, seq: u64) {
        self.equality.squash(seq);
    }

    /// Access the last-committed-value table.
    pub fn lcvt(&self) -> &LastCommittedValueTable {
        &self.lcvt
    }

    /// Access the equality predictor.
    pub fn equality(&self) -> &EqualityPredictor {
        &self.equality
    }
}

impl Default for ValuePredictor {
    fn default() -> Self {
        Self::new()
    }
}
