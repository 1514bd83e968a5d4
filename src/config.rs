use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{Category, Metric, MetricScores};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Engine configuration, injected into the engine at construction.
///
/// Example JSON:
/// ```json
/// {
///   "weights": { "rentabilidad": 0.12, "volumen": 0.15, ... },
///   "ladder": [{ "min_score": 8.5, "category": "A+++" }, ...],
///   "house_margin": 0.05
/// }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub weights: WeightTable,

    #[serde(default)]
    pub ladder: CategoryLadder,

    /// Assumed house margin used to estimate wagered amounts from GGR.
    #[serde(default = "default_house_margin")]
    pub house_margin: f64,
}

fn default_house_margin() -> f64 {
    0.05
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: WeightTable::default(),
            ladder: CategoryLadder::default(),
            house_margin: default_house_margin(),
        }
    }
}

impl EngineConfig {
    pub fn from_path(path: &Path) -> EngineResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        self.weights.validate()?;
        self.ladder.validate()?;
        if !(self.house_margin > 0.0 && self.house_margin.is_finite()) {
            return Err(EngineError::InvalidConfig(format!(
                "house margin must be positive, got {}",
                self.house_margin
            )));
        }
        Ok(())
    }
}

/// Weight per metric. Changing these values changes historical
/// classifications, so the default is treated as a versioned constant.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WeightTable {
    #[serde(rename = "rentabilidad")]
    pub profitability: f64,
    #[serde(rename = "volumen")]
    pub volume: f64,
    #[serde(rename = "fidelidad")]
    pub loyalty: f64,
    #[serde(rename = "estabilidad")]
    pub stability: f64,
    #[serde(rename = "crecimiento")]
    pub growth: f64,
    #[serde(rename = "eficiencia_casino")]
    pub casino_efficiency: f64,
    #[serde(rename = "eficiencia_deportes")]
    pub sportsbook_efficiency: f64,
    #[serde(rename = "eficiencia_conversion")]
    pub conversion: f64,
    #[serde(rename = "tendencia")]
    pub trend: f64,
    #[serde(rename = "diversificacion")]
    pub diversification: f64,
    #[serde(rename = "calidad_jugadores")]
    pub player_quality: f64,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            profitability: 0.12,
            volume: 0.15,
            loyalty: 0.15,
            stability: 0.12,
            growth: 0.10,
            casino_efficiency: 0.08,
            sportsbook_efficiency: 0.08,
            conversion: 0.11,
            trend: 0.04,
            diversification: 0.03,
            player_quality: 0.02,
        }
    }
}

impl WeightTable {
    pub fn weight(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Profitability => self.profitability,
            Metric::Volume => self.volume,
            Metric::Loyalty => self.loyalty,
            Metric::Stability => self.stability,
            Metric::Growth => self.growth,
            Metric::CasinoEfficiency => self.casino_efficiency,
            Metric::SportsbookEfficiency => self.sportsbook_efficiency,
            Metric::Conversion => self.conversion,
            Metric::Trend => self.trend,
            Metric::Diversification => self.diversification,
            Metric::PlayerQuality => self.player_quality,
        }
    }

    pub fn total(&self) -> f64 {
        Metric::ALL.iter().map(|metric| self.weight(*metric)).sum()
    }

    pub fn validate(&self) -> EngineResult<()> {
        for metric in Metric::ALL {
            let weight = self.weight(metric);
            if !(weight > 0.0 && weight < 1.0) {
                return Err(EngineError::InvalidWeights(format!(
                    "{} must lie in (0, 1), got {}",
                    metric.key(),
                    weight
                )));
            }
        }
        let total = self.total();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(EngineError::InvalidWeights(format!(
                "weights must sum to 1.00, got {total}"
            )));
        }
        Ok(())
    }

    /// Weighted sum of the metric scores.
    pub fn combine(&self, scores: &MetricScores) -> f64 {
        scores
            .iter()
            .map(|(metric, value)| value * self.weight(metric))
            .sum()
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LadderStep {
    pub min_score: f64,
    pub category: Category,
}

/// Score thresholds, highest first. A score below every step maps to the
/// floor category.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct CategoryLadder {
    pub steps: Vec<LadderStep>,
}

impl Default for CategoryLadder {
    fn default() -> Self {
        let thresholds = [8.5, 8.0, 7.5, 6.5, 5.5, 4.5, 3.5, 2.5, 1.5];
        Self {
            steps: thresholds
                .iter()
                .zip(Category::ORDERED.iter())
                .map(|(min_score, category)| LadderStep {
                    min_score: *min_score,
                    category: *category,
                })
                .collect(),
        }
    }
}

impl CategoryLadder {
    pub fn classify(&self, score: f64) -> Category {
        self.steps
            .iter()
            .find(|step| score >= step.min_score)
            .map(|step| step.category)
            .unwrap_or(Category::C)
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.steps.is_empty() {
            return Err(EngineError::InvalidLadder("ladder has no steps".to_string()));
        }
        for pair in self.steps.windows(2) {
            if pair[1].min_score >= pair[0].min_score {
                return Err(EngineError::InvalidLadder(format!(
                    "thresholds must be strictly descending ({} then {})",
                    pair[0].min_score, pair[1].min_score
                )));
            }
            if pair[1].category <= pair[0].category {
                return Err(EngineError::InvalidLadder(format!(
                    "{} listed after {}",
                    pair[1].category, pair[0].category
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one() {
        let weights = WeightTable::default();
        assert!((weights.total() - 1.0).abs() < 1e-9);
        assert!(weights.validate().is_ok());
    }

    #[test]
    fn rejects_weights_that_do_not_sum_to_one() {
        let weights = WeightTable {
            volume: 0.20,
            ..WeightTable::default()
        };
        assert!(matches!(
            weights.validate(),
            Err(EngineError::InvalidWeights(_))
        ));
    }

    #[test]
    fn combine_applies_each_weight() {
        let scores = MetricScores {
            volume: 10.0,
            trend: 5.0,
            ..MetricScores::default()
        };
        let combined = WeightTable::default().combine(&scores);
        assert!((combined - (10.0 * 0.15 + 5.0 * 0.04)).abs() < 1e-12);
    }

    #[test]
    fn ladder_boundaries_are_inclusive() {
        let ladder = CategoryLadder::default();
        assert_eq!(ladder.classify(8.5), Category::APlusPlusPlus);
        assert_eq!(ladder.classify(8.4999), Category::APlusPlus);
        assert_eq!(ladder.classify(8.0), Category::APlusPlus);
        assert_eq!(ladder.classify(7.5), Category::APlus);
        assert_eq!(ladder.classify(6.5), Category::BPlusPlusPlus);
        assert_eq!(ladder.classify(5.5), Category::BPlusPlus);
        assert_eq!(ladder.classify(4.5), Category::BPlus);
        assert_eq!(ladder.classify(4.4999), Category::CPlusPlusPlus);
        assert_eq!(ladder.classify(3.5), Category::CPlusPlusPlus);
        assert_eq!(ladder.classify(2.5), Category::CPlusPlus);
        assert_eq!(ladder.classify(1.5), Category::CPlus);
        assert_eq!(ladder.classify(1.4999), Category::C);
        assert_eq!(ladder.classify(0.0), Category::C);
    }

    #[test]
    fn rejects_unsorted_ladder() {
        let mut ladder = CategoryLadder::default();
        ladder.steps.swap(0, 1);
        assert!(ladder.validate().is_err());
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{ "house_margin": 0.04 }"#).unwrap();
        assert_eq!(config.weights, WeightTable::default());
        assert_eq!(config.ladder, CategoryLadder::default());
        assert_eq!(config.house_margin, 0.04);
    }

    #[test]
    fn config_json_uses_stable_metric_keys() {
        let json = serde_json::to_value(EngineConfig::default()).unwrap();
        assert_eq!(json["weights"]["calidad_jugadores"], 0.02);
        assert_eq!(json["ladder"][0]["category"], "A+++");
    }

    #[test]
    fn unknown_config_fields_are_rejected() {
        let parsed: Result<EngineConfig, _> = serde_json::from_str(r#"{ "margin": 0.04 }"#);
        assert!(parsed.is_err());
    }
}
