use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::task::JoinSet;

use crate::aggregate;
use crate::cohort;
use crate::config::EngineConfig;
use crate::credit;
use crate::error::{EngineError, EngineResult};
use crate::forecast;
use crate::gap::{self, ClassGap};
use crate::metrics::{self, MetricInput, ScoreContext};
use crate::models::{
    ActivityRecord, AgentFailure, AgentProfile, CreditRecommendation, GrowthRow, MetricScores,
    MonthlyScoreRow, RetentionRow,
};
use crate::risk;

/// Everything computed for a single agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentOutcome {
    pub profile: AgentProfile,
    pub retention: Vec<RetentionRow>,
    pub growth: Vec<GrowthRow>,
}

/// Joined result of a batch run, in a deterministic order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoringRun {
    pub platform_players: usize,
    pub profiles: Vec<AgentProfile>,
    pub retention: Vec<RetentionRow>,
    pub growth: Vec<GrowthRow>,
    pub class_gaps: Vec<ClassGap>,
    pub failures: Vec<AgentFailure>,
}

impl ScoringRun {
    pub fn pct_risky(&self) -> f64 {
        if self.profiles.is_empty() {
            return 0.0;
        }
        let risky = self.profiles.iter().filter(|p| !p.risk_safe).count();
        risky as f64 / self.profiles.len() as f64 * 100.0
    }

    pub fn profile(&self, agent: &str) -> Option<&AgentProfile> {
        self.profiles.iter().find(|profile| {
            profile.agent_name.eq_ignore_ascii_case(agent) || profile.agent_id.to_string() == agent
        })
    }
}

#[derive(Debug, Clone)]
pub struct ScoringEngine {
    config: EngineConfig,
}

impl ScoringEngine {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Scores one agent. `platform_players` is the distinct player count
    /// across the whole platform.
    pub fn score_agent(
        &self,
        agent_id: i64,
        records: &[ActivityRecord],
        platform_players: usize,
    ) -> EngineResult<AgentOutcome> {
        validate_records(agent_id, records)?;
        let agent_name = records
            .first()
            .map(|record| record.agent_name.clone())
            .unwrap_or_default();

        let months = aggregate::aggregate_monthly(records);
        if months.is_empty() {
            debug!("agent {agent_id} has no dated records, scoring as empty");
            let classification = risk::classify(&MetricScores::default(), &self.config);
            return Ok(AgentOutcome {
                profile: AgentProfile {
                    agent_id,
                    agent_name,
                    rank: 0,
                    metrics: MetricScores::default(),
                    score: classification.score,
                    category: classification.category,
                    risk_safe: classification.risk_safe,
                    credit: CreditRecommendation {
                        amount: 0.0,
                        details: None,
                        reason: Some("no dated activity".to_string()),
                    },
                    forecast_ggr: 0.0,
                    history: Vec::new(),
                },
                retention: Vec::new(),
                growth: Vec::new(),
            });
        }

        let house_margin = self.config.house_margin;
        let ngr_history: Vec<f64> = months.iter().map(|month| month.ngr).collect();
        let lifetime = MetricInput::lifetime(&months, aggregate::distinct_players(records));
        let ctx = ScoreContext::lifetime(&months, &ngr_history, platform_players, house_margin);
        let scores = metrics::score_metrics(&lifetime, &ctx);
        let classification = risk::classify(&scores, &self.config);

        let history = months
            .iter()
            .enumerate()
            .map(|(index, month)| {
                let previous = index.checked_sub(1).map(|prev| &months[prev]);
                let ctx = ScoreContext::month(previous, month, platform_players, house_margin);
                let month_scores = metrics::score_metrics(&MetricInput::from_month(month), &ctx);
                let month_class = risk::classify(&month_scores, &self.config);
                MonthlyScoreRow {
                    aggregate: month.clone(),
                    metrics: month_scores,
                    score: month_class.score,
                    category: month_class.category,
                    risk_safe: month_class.risk_safe,
                }
            })
            .collect();

        let credit = credit::recommend_credit(&months, classification.score, scores.stability);
        let monthly_ggr: Vec<f64> = months.iter().map(|month| month.total_ggr()).collect();
        let forecast_ggr = forecast::forecast_ggr(&monthly_ggr)?;

        let players = aggregate::monthly_player_sets(records);
        debug!(
            "agent {agent_id} scored {:.4} ({}) over {} months",
            classification.score,
            classification.category,
            months.len()
        );

        Ok(AgentOutcome {
            profile: AgentProfile {
                agent_id,
                agent_name,
                rank: 0,
                metrics: scores,
                score: classification.score,
                category: classification.category,
                risk_safe: classification.risk_safe,
                credit,
                forecast_ggr,
                history,
            },
            retention: cohort::retention(agent_id, &players),
            growth: cohort::organic_growth(agent_id, &players),
        })
    }

    /// Scores every agent in `records` on the blocking pool and joins the
    /// results. A failing agent is reported in `failures` and does not stop
    /// the others.
    pub async fn run(self: Arc<Self>, records: Vec<ActivityRecord>) -> ScoringRun {
        let platform_players = aggregate::platform_player_count(&records);
        let agents = aggregate::group_by_agent(records);
        info!(
            "scoring {} agents across {platform_players} platform players",
            agents.len()
        );

        let mut tasks = JoinSet::new();
        for (agent_id, agent_records) in agents {
            let engine = Arc::clone(&self);
            tasks.spawn_blocking(move || {
                let outcome = engine.score_agent(agent_id, &agent_records, platform_players);
                (agent_id, outcome)
            });
        }

        let mut profiles = Vec::new();
        let mut retention = Vec::new();
        let mut growth = Vec::new();
        let mut failures = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(outcome))) => {
                    profiles.push(outcome.profile);
                    retention.extend(outcome.retention);
                    growth.extend(outcome.growth);
                }
                Ok((agent_id, Err(err))) => {
                    warn!("agent {agent_id} rejected: {err}");
                    failures.push(AgentFailure {
                        agent_id: Some(agent_id),
                        reason: err.to_string(),
                    });
                }
                Err(err) => {
                    error!("scoring task failed: {err}");
                    failures.push(AgentFailure {
                        agent_id: None,
                        reason: err.to_string(),
                    });
                }
            }
        }

        risk::assign_ranks(&mut profiles);
        retention.sort_by_key(|row| (row.agent_id, row.month));
        growth.sort_by_key(|row| (row.agent_id, row.month));
        failures.sort_by(|a, b| a.agent_id.cmp(&b.agent_id).then(a.reason.cmp(&b.reason)));
        let class_gaps = gap::class_gaps(&profiles);

        info!(
            "scored {} agents, {} failures",
            profiles.len(),
            failures.len()
        );

        ScoringRun {
            platform_players,
            profiles,
            retention,
            growth,
            class_gaps,
            failures,
        }
    }
}

/// Rejects a record set the engine cannot score meaningfully.
fn validate_records(agent_id: i64, records: &[ActivityRecord]) -> EngineResult<()> {
    let invalid = |reason: String| EngineError::InvalidRecord { agent_id, reason };

    for (index, record) in records.iter().enumerate() {
        if record.agent_id != agent_id {
            return Err(invalid(format!(
                "record {index} belongs to agent {}",
                record.agent_id
            )));
        }
        if record.player_id.trim().is_empty() {
            return Err(invalid(format!("record {index} has no player id")));
        }
        let amounts = [
            ("ngr", record.ngr),
            ("commission", record.commission),
            ("deposit_total", record.deposit_total),
            ("withdrawal_total", record.withdrawal_total),
            ("casino_ggr", record.casino_ggr),
            ("sportsbook_ggr", record.sportsbook_ggr),
        ];
        for (field, value) in amounts {
            if !value.is_finite() {
                return Err(invalid(format!("record {index} has non-finite {field}")));
            }
        }
        let counts = [
            ("deposit_count", record.deposit_count),
            ("withdrawal_count", record.withdrawal_count),
        ];
        for (field, value) in counts {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("record {index} has invalid {field} {value}")));
            }
        }
    }
    Ok(())
}
