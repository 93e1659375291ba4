//! Reconciliation of independently produced credit-score predictions.
//!
//! The analysis is advisory: it tells a reviewer how far the ensemble members disagree with
//! the combined score and never feeds the submission decision.

mod analysis;

pub use analysis::{
    analyze_ensemble, consensus_from_variance, population_variance, DeviationBand,
    DisagreementLevel, EnsembleAnalysis, EnsembleError, ModelDeviation, ModelEnsemble,
    ModelPrediction, MEDIUM_DISAGREEMENT_POINTS, OUTLIER_DISTANCE_POINTS,
};
