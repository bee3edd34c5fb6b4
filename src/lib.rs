//! Last-committed-value prediction.
//!
//! The core is a tagged, geometric-history equality predictor in the style
//! of BATAGE: it forecasts whether the next dynamic instance of an
//! instruction will commit the same value it committed last time, together
//! with a discrete confidence the consuming pipeline can gate speculation
//! on. A thin façade pairs it with a last-committed-value table to turn the
//! equality forecast into a predicted value.

pub mod error;
pub mod history;
pub mod lcvt;
pub mod predictor;

pub use error::*;
pub use history::*;
pub use lcvt::*;
pub use predictor::*;
