use std::collections::BTreeMap;
use std::fmt::Write;

use crate::config::EngineConfig;
use crate::engine::ScoringRun;
use crate::models::{AgentProfile, Category, MetricScores};
use crate::risk;

#[derive(Debug, Clone, PartialEq)]
pub struct CategorySummary {
    pub category: Category,
    pub count: usize,
    pub avg_score: f64,
}

/// Count and average score per category, best category first.
pub fn summarize_by_category(profiles: &[AgentProfile]) -> Vec<CategorySummary> {
    let mut map: BTreeMap<Category, (usize, f64)> = BTreeMap::new();

    for profile in profiles {
        let entry = map.entry(profile.category).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += profile.score;
    }

    map.into_iter()
        .map(|(category, (count, total_score))| CategorySummary {
            category,
            count,
            avg_score: if count == 0 {
                0.0
            } else {
                total_score / count as f64
            },
        })
        .collect()
}

pub fn build_report(run: &ScoringRun, limit: usize) -> String {
    let summaries = summarize_by_category(&run.profiles);
    let mut output = String::new();

    let _ = writeln!(output, "# Agent Scoring Report");
    let _ = writeln!(
        output,
        "{} agents scored across {} platform players ({:.1}% flagged risky)",
        run.profiles.len(),
        run.platform_players,
        run.pct_risky()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Category Mix");

    if summaries.is_empty() {
        let _ = writeln!(output, "No agents scored in this run.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {} ({}): {} agents (avg score {:.2})",
                summary.category,
                summary.category.description(),
                summary.count,
                summary.avg_score
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Ranking");

    if run.profiles.is_empty() {
        let _ = writeln!(output, "No agents scored in this run.");
    } else {
        let _ = writeln!(output, "| # | Agent | Score | Class | Safe | Credit | GGR forecast |");
        let _ = writeln!(output, "|---|-------|-------|-------|------|--------|--------------|");
        for profile in run.profiles.iter().take(limit) {
            let _ = writeln!(
                output,
                "| {} | {} ({}) | {:.2} | {} | {} | {:.2} | {:.2} |",
                profile.rank,
                profile.agent_name,
                profile.agent_id,
                profile.score,
                profile.category,
                if profile.risk_safe { "yes" } else { "no" },
                profile.credit.amount,
                profile.forecast_ggr
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Closest Improvements");

    let improvable: Vec<_> = run
        .class_gaps
        .iter()
        .filter(|gap| gap.target.is_some())
        .take(limit)
        .collect();
    if improvable.is_empty() {
        let _ = writeln!(output, "Every agent already sits in the best category of this run.");
    } else {
        for gap in improvable {
            let metrics: Vec<String> = gap
                .gaps
                .iter()
                .map(|m| format!("{} +{:.2}", m.metric.key(), m.diff))
                .collect();
            let _ = writeln!(
                output,
                "- agent {}: {} -> {} (distance {:.2}): {}",
                gap.agent_id,
                gap.category,
                gap.target.map(|c| c.label()).unwrap_or("-"),
                gap.distance,
                metrics.join(", ")
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Latest Cohort Movement");

    let mut latest_growth = BTreeMap::new();
    for row in &run.growth {
        latest_growth.insert(row.agent_id, row);
    }
    let mut latest_retention = BTreeMap::new();
    for row in &run.retention {
        latest_retention.insert(row.agent_id, row);
    }

    if latest_growth.is_empty() {
        let _ = writeln!(output, "No dated player activity in this run.");
    } else {
        for (agent_id, growth) in latest_growth {
            let retention = latest_retention
                .get(&agent_id)
                .map(|row| format!("{:.1}% retained", row.retention_rate))
                .unwrap_or_else(|| "no retention signal yet".to_string());
            let _ = writeln!(
                output,
                "- agent {} in {}: {} players, {} new ({:.1}%), {} returning, {}",
                agent_id,
                growth.month,
                growth.total_players,
                growth.new_players,
                growth.pct_new,
                growth.returning_players,
                retention
            );
        }
    }

    if !run.failures.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Rejected Agents");
        for failure in &run.failures {
            let agent = failure
                .agent_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let _ = writeln!(output, "- {}: {}", agent, failure.reason);
        }
    }

    output
}

/// Metric-by-metric breakdown of one agent, lifetime and month by month.
pub fn build_breakdown(profile: &AgentProfile, config: &EngineConfig) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "Agent {} ({})", profile.agent_name, profile.agent_id);
    let _ = writeln!(
        output,
        "Score {:.4}  Class {} ({})  {}",
        profile.score,
        profile.category,
        profile.category.description(),
        if profile.risk_safe { "safe" } else { "risky" }
    );
    let _ = writeln!(output);
    write_contributions(&mut output, &profile.metrics, config, profile.score);

    let _ = writeln!(output);
    let _ = writeln!(output, "Suggested credit: {:.2}", profile.credit.amount);
    if let Some(details) = &profile.credit.details {
        let _ = writeln!(
            output,
            "  p25 {:.2}, median {:.2} over {} months; f_score {:.3}, volatility {:.2} ({}), trend {:.2} ({}), turnover {:.2}",
            details.p25,
            details.median,
            details.qualifying_months,
            details.f_score,
            details.f_volatility,
            details.volatility_band,
            details.f_trend,
            details.trend_band,
            details.f_turnover
        );
    }
    if let Some(reason) = &profile.credit.reason {
        let _ = writeln!(output, "  {reason}");
    }
    let _ = writeln!(output, "GGR forecast: {:.2}", profile.forecast_ggr);

    for row in &profile.history {
        let month = &row.aggregate;
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "Month {}  Score {:.4}  Class {}  {}",
            month.month,
            row.score,
            row.category,
            if row.risk_safe { "safe" } else { "risky" }
        );
        let _ = writeln!(
            output,
            "  NGR {:.2}, deposits {:.2} ({:.0} txn), withdrawals {:.2} ({:.0} txn), GGR casino {:.2}, sportsbook {:.2}, players {}",
            month.ngr,
            month.deposit_total,
            month.deposit_count,
            month.withdrawal_total,
            month.withdrawal_count,
            month.casino_ggr,
            month.sportsbook_ggr,
            month.active_players
        );
        write_contributions(&mut output, &row.metrics, config, row.score);
    }

    output
}

fn write_contributions(
    output: &mut String,
    scores: &MetricScores,
    config: &EngineConfig,
    total: f64,
) {
    let _ = writeln!(
        output,
        "  {:<25} {:>8} {:>8} {:>14}",
        "metric", "score", "weight", "contribution"
    );
    for item in risk::breakdown(scores, config) {
        let _ = writeln!(
            output,
            "  {:<25} {:>8.4} {:>8.2} {:>14.4}",
            item.metric.key(),
            item.value,
            item.weight,
            item.contribution
        );
    }
    let _ = writeln!(output, "  {:<25} {:>8} {:>8.2} {:>14.4}", "total", "", config.weights.total(), total);
}
