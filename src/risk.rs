use serde::Serialize;

use crate::config::EngineConfig;
use crate::models::{AgentProfile, Category, Metric, MetricScores};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub score: f64,
    pub category: Category,
    pub risk_safe: bool,
}

pub fn classify(scores: &MetricScores, config: &EngineConfig) -> Classification {
    let score = config.weights.combine(scores);
    let category = config.ladder.classify(score);
    Classification {
        score,
        category,
        risk_safe: category.is_safe(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricContribution {
    pub metric: Metric,
    pub value: f64,
    pub weight: f64,
    pub contribution: f64,
}

/// Per-metric share of the combined score.
pub fn breakdown(scores: &MetricScores, config: &EngineConfig) -> Vec<MetricContribution> {
    scores
        .iter()
        .map(|(metric, value)| {
            let weight = config.weights.weight(metric);
            MetricContribution {
                metric,
                value,
                weight,
                contribution: value * weight,
            }
        })
        .collect()
}

/// Ranks by combined score, best first. Ties share the lowest rank and the
/// next rank skips ahead. Profiles come back ordered by (rank, agent id).
pub fn assign_ranks(profiles: &mut [AgentProfile]) {
    profiles.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.agent_id.cmp(&b.agent_id))
    });

    let mut previous: Option<(f64, usize)> = None;
    for (index, profile) in profiles.iter_mut().enumerate() {
        let rank = match previous {
            Some((score, rank)) if score == profile.score => rank,
            _ => index + 1,
        };
        profile.rank = rank;
        previous = Some((profile.score, rank));
    }
}
