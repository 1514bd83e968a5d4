//! Distance from each agent to the next better category present in a run.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{AgentProfile, Category, Metric};
use crate::stats;

const TOP_GAPS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricGap {
    pub metric: Metric,
    pub current: f64,
    pub target: f64,
    pub diff: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassGap {
    pub agent_id: i64,
    pub category: Category,
    /// `None` when the agent already sits in the best category of the run.
    pub target: Option<Category>,
    pub distance: f64,
    pub gaps: Vec<MetricGap>,
}

/// Mean metric score per category.
pub fn centroids(profiles: &[AgentProfile]) -> BTreeMap<Category, [f64; 11]> {
    let mut sums: BTreeMap<Category, ([f64; 11], usize)> = BTreeMap::new();
    for profile in profiles {
        let (totals, count) = sums.entry(profile.category).or_insert(([0.0; 11], 0));
        for (slot, metric) in totals.iter_mut().zip(Metric::ALL) {
            *slot += profile.metrics.get(metric);
        }
        *count += 1;
    }
    sums.into_iter()
        .map(|(category, (totals, count))| {
            (category, totals.map(|total| total / count as f64))
        })
        .collect()
}

pub fn class_gaps(profiles: &[AgentProfile]) -> Vec<ClassGap> {
    let centroids = centroids(profiles);
    // BTreeMap keys follow Category ordering, best first.
    let present: Vec<Category> = centroids.keys().copied().collect();

    profiles
        .iter()
        .map(|profile| {
            let position = present.iter().position(|c| *c == profile.category);
            let target = match position {
                Some(index) if index > 0 => Some(present[index - 1]),
                _ => None,
            };
            let Some(target) = target else {
                return ClassGap {
                    agent_id: profile.agent_id,
                    category: profile.category,
                    target: None,
                    distance: 0.0,
                    gaps: Vec::new(),
                };
            };

            let centroid = centroids[&target];
            let mut squared = 0.0;
            let mut gaps = Vec::new();
            for (metric, target_value) in Metric::ALL.into_iter().zip(centroid) {
                let current = profile.metrics.get(metric);
                let diff = target_value - current;
                squared += diff * diff;
                if diff > 0.0 {
                    gaps.push(MetricGap {
                        metric,
                        current,
                        target: target_value,
                        diff,
                    });
                }
            }
            gaps.sort_by(|a, b| b.diff.partial_cmp(&a.diff).unwrap_or(std::cmp::Ordering::Equal));
            gaps.truncate(TOP_GAPS);

            ClassGap {
                agent_id: profile.agent_id,
                category: profile.category,
                target: Some(target),
                distance: stats::round2(squared.sqrt()),
                gaps,
            }
        })
        .collect()
}
