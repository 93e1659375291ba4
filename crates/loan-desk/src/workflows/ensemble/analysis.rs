use serde::{Deserialize, Serialize};

/// Distance from the ensemble score beyond which a model is an outlier.
pub const OUTLIER_DISTANCE_POINTS: f64 = 100.0;
pub const MEDIUM_DISAGREEMENT_POINTS: f64 = OUTLIER_DISTANCE_POINTS / 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPrediction {
    #[serde(alias = "modelName")]
    pub model_name: String,
    pub score: f64,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub confidence: f64,
}

/// Ordered ensemble members plus the scores the scoring service reported for them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelEnsemble {
    pub predictions: Vec<ModelPrediction>,
    #[serde(default, alias = "ensembleScore")]
    pub ensemble_score: Option<f64>,
    #[serde(default, alias = "consensusScore")]
    pub consensus_score: Option<f64>,
}

impl ModelEnsemble {
    pub fn new(predictions: Vec<ModelPrediction>) -> Self {
        Self {
            predictions,
            ensemble_score: None,
            consensus_score: None,
        }
    }

    /// Weight-normalized mean of member scores, or the plain mean when no weights are set.
    pub fn weighted_score(&self) -> Option<f64> {
        if self.predictions.is_empty() {
            return None;
        }

        let total_weight: f64 = self.predictions.iter().map(|p| p.weight.max(0.0)).sum();
        if total_weight > 0.0 {
            let weighted: f64 = self
                .predictions
                .iter()
                .map(|p| p.score * p.weight.max(0.0))
                .sum();
            Some(weighted / total_weight)
        } else {
            let sum: f64 = self.predictions.iter().map(|p| p.score).sum();
            Some(sum / self.predictions.len() as f64)
        }
    }

    /// Analyze against the reported ensemble score, deriving one if the service sent none.
    pub fn analyze(&self) -> Result<EnsembleAnalysis, EnsembleError> {
        let ensemble_score = match self.ensemble_score {
            Some(score) => score,
            None => self.weighted_score().ok_or(EnsembleError::Empty)?,
        };
        analyze_ensemble(&self.predictions, ensemble_score, self.consensus_score)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnsembleError {
    #[error("ensemble has no model predictions")]
    Empty,
    #[error("model '{0}' reported a non-finite score")]
    NonFiniteScore(String),
    #[error("ensemble score must be finite")]
    NonFiniteEnsembleScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisagreementLevel {
    Low,
    Medium,
    High,
}

impl DisagreementLevel {
    pub const fn label(self) -> &'static str {
        match self {
            DisagreementLevel::Low => "low",
            DisagreementLevel::Medium => "medium",
            DisagreementLevel::High => "high",
        }
    }

    pub fn advisory(self) -> Option<&'static str> {
        match self {
            DisagreementLevel::High => {
                Some("Significant disagreement - manual review recommended.")
            }
            DisagreementLevel::Medium => Some("Moderate disagreement - review recommended."),
            DisagreementLevel::Low => None,
        }
    }

    fn from_distance(distance: f64) -> Self {
        if distance > OUTLIER_DISTANCE_POINTS {
            DisagreementLevel::High
        } else if distance > MEDIUM_DISAGREEMENT_POINTS {
            DisagreementLevel::Medium
        } else {
            DisagreementLevel::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviationBand {
    Within,
    Moderate,
    Outlier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDeviation {
    pub model_name: String,
    pub score: f64,
    pub distance: f64,
    pub band: DeviationBand,
}

impl ModelDeviation {
    pub fn is_outlier(&self) -> bool {
        self.band == DeviationBand::Outlier
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleAnalysis {
    pub ensemble_score: f64,
    pub variance: f64,
    pub score_range: f64,
    pub consensus_score: f64,
    pub disagreement_level: DisagreementLevel,
    pub deviations: Vec<ModelDeviation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advisory: Option<String>,
}

impl EnsembleAnalysis {
    pub fn outliers(&self) -> impl Iterator<Item = &ModelDeviation> {
        self.deviations.iter().filter(|deviation| deviation.is_outlier())
    }

    pub fn needs_review(&self) -> bool {
        self.disagreement_level != DisagreementLevel::Low
    }
}

pub fn population_variance(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let count = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / count;
    scores.iter().map(|score| (score - mean).powi(2)).sum::<f64>() / count
}

/// Maps variance onto `(0, 1]`, strictly decreasing as variance grows.
pub fn consensus_from_variance(variance: f64) -> f64 {
    1.0 / (1.0 + variance.max(0.0).sqrt() / OUTLIER_DISTANCE_POINTS)
}

pub fn analyze_ensemble(
    predictions: &[ModelPrediction],
    ensemble_score: f64,
    consensus_score: Option<f64>,
) -> Result<EnsembleAnalysis, EnsembleError> {
    if predictions.is_empty() {
        return Err(EnsembleError::Empty);
    }
    if !ensemble_score.is_finite() {
        return Err(EnsembleError::NonFiniteEnsembleScore);
    }
    if let Some(bad) = predictions.iter().find(|p| !p.score.is_finite()) {
        return Err(EnsembleError::NonFiniteScore(bad.model_name.clone()));
    }

    let scores: Vec<f64> = predictions.iter().map(|p| p.score).collect();
    let variance = population_variance(&scores);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);

    let deviations: Vec<ModelDeviation> = predictions
        .iter()
        .map(|prediction| {
            let distance = (prediction.score - ensemble_score).abs();
            let band = match DisagreementLevel::from_distance(distance) {
                DisagreementLevel::High => DeviationBand::Outlier,
                DisagreementLevel::Medium => DeviationBand::Moderate,
                DisagreementLevel::Low => DeviationBand::Within,
            };
            ModelDeviation {
                model_name: prediction.model_name.clone(),
                score: prediction.score,
                distance,
                band,
            }
        })
        .collect();

    let widest = deviations
        .iter()
        .map(|deviation| deviation.distance)
        .fold(0.0, f64::max);
    let disagreement_level = DisagreementLevel::from_distance(widest);

    let consensus_score = consensus_score
        .filter(|score| score.is_finite())
        .map(|score| score.clamp(0.0, 1.0))
        .unwrap_or_else(|| consensus_from_variance(variance));

    Ok(EnsembleAnalysis {
        ensemble_score,
        variance,
        score_range: max - min,
        consensus_score,
        disagreement_level,
        deviations,
        advisory: disagreement_level.advisory().map(str::to_string),
    })
}
