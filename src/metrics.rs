//! The eleven metric calculators.
//!
//! Every calculator maps an aggregate quantity to a 0-10 score. The same
//! entry point, [`score_metrics`], serves both the lifetime score (totals
//! across all months plus the monthly NGR history) and the per-month score
//! (one month plus the previous month's deposit count). Stability and trend
//! need a history window, so they are neutral in per-month mode.
//!
//! Tier boundaries are business thresholds: `>=` and `<` are exact.

use crate::models::{MetricScores, MonthlyAggregate};
use crate::stats;

const NEUTRAL: f64 = 5.0;

/// Quantities a score set is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricInput {
    pub ngr: f64,
    pub deposit_total: f64,
    pub deposit_count: f64,
    pub withdrawal_count: f64,
    pub casino_ggr: f64,
    pub sportsbook_ggr: f64,
    pub players: usize,
}

impl MetricInput {
    pub fn from_month(month: &MonthlyAggregate) -> Self {
        Self {
            ngr: month.ngr,
            deposit_total: month.deposit_total,
            deposit_count: month.deposit_count,
            withdrawal_count: month.withdrawal_count,
            casino_ggr: month.casino_ggr,
            sportsbook_ggr: month.sportsbook_ggr,
            players: month.active_players,
        }
    }

    /// Lifetime totals. `players` is the distinct player count over the
    /// whole history, not the sum of monthly actives.
    pub fn lifetime(months: &[MonthlyAggregate], players: usize) -> Self {
        months.iter().fold(
            Self {
                players,
                ..Self::default()
            },
            |acc, month| Self {
                ngr: acc.ngr + month.ngr,
                deposit_total: acc.deposit_total + month.deposit_total,
                deposit_count: acc.deposit_count + month.deposit_count,
                withdrawal_count: acc.withdrawal_count + month.withdrawal_count,
                casino_ggr: acc.casino_ggr + month.casino_ggr,
                sportsbook_ggr: acc.sportsbook_ggr + month.sportsbook_ggr,
                players: acc.players,
            },
        )
    }
}

/// Deposit counts of two consecutive observed months.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepositChange {
    pub previous: f64,
    pub current: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ScoreContext<'a> {
    pub platform_players: usize,
    pub house_margin: f64,
    /// `None` for the first observed month.
    pub deposit_change: Option<DepositChange>,
    /// Monthly NGR history; `None` in per-month mode.
    pub ngr_history: Option<&'a [f64]>,
}

impl<'a> ScoreContext<'a> {
    pub fn lifetime(
        months: &[MonthlyAggregate],
        ngr_history: &'a [f64],
        platform_players: usize,
        house_margin: f64,
    ) -> Self {
        let deposit_change = match months {
            [.., previous, current] => Some(DepositChange {
                previous: previous.deposit_count,
                current: current.deposit_count,
            }),
            _ => None,
        };
        Self {
            platform_players,
            house_margin,
            deposit_change,
            ngr_history: Some(ngr_history),
        }
    }

    pub fn month(
        previous: Option<&MonthlyAggregate>,
        current: &MonthlyAggregate,
        platform_players: usize,
        house_margin: f64,
    ) -> Self {
        Self {
            platform_players,
            house_margin,
            deposit_change: previous.map(|previous| DepositChange {
                previous: previous.deposit_count,
                current: current.deposit_count,
            }),
            ngr_history: None,
        }
    }
}

pub fn score_metrics(input: &MetricInput, ctx: &ScoreContext<'_>) -> MetricScores {
    let casino_bets = input.casino_ggr / ctx.house_margin;
    let sportsbook_bets = input.sportsbook_ggr / ctx.house_margin;

    MetricScores {
        profitability: profitability_score(input.ngr, input.deposit_total),
        volume: volume_score(input.deposit_count + input.withdrawal_count),
        loyalty: loyalty_score(input.players, ctx.platform_players),
        stability: ctx.ngr_history.map_or(NEUTRAL, stability_score),
        growth: growth_score(ctx.deposit_change),
        casino_efficiency: efficiency_score(input.deposit_count, input.casino_ggr),
        sportsbook_efficiency: efficiency_score(input.deposit_count, input.sportsbook_ggr),
        conversion: conversion_score(input.casino_ggr + input.sportsbook_ggr, input.deposit_total),
        trend: ctx.ngr_history.map_or(NEUTRAL, trend_score),
        diversification: diversification_score(casino_bets, sportsbook_bets),
        player_quality: player_quality_score(casino_bets + sportsbook_bets, input.players),
    }
}

pub fn profitability_tier(ratio_pct: f64) -> f64 {
    if ratio_pct >= 8.0 {
        7.0
    } else if ratio_pct >= 6.0 {
        5.5
    } else if ratio_pct >= 4.0 {
        4.0
    } else {
        (ratio_pct * 1.75).clamp(0.0, 7.0)
    }
}

pub fn profitability_score(ngr: f64, deposit_total: f64) -> f64 {
    if deposit_total <= 0.0 {
        return 0.0;
    }
    let ratio_pct = ngr / deposit_total * 100.0;
    let volume_bonus = if ngr > 0.0 {
        ((ngr + 1.0).log10() * 0.75).clamp(0.0, 3.0)
    } else {
        0.0
    };
    profitability_tier(ratio_pct) + volume_bonus
}

pub fn volume_score(transactions: f64) -> f64 {
    if transactions <= 0.0 {
        return 0.0;
    }
    ((transactions + 1.0).log10() * 2.3).clamp(0.0, 10.0)
}

pub fn loyalty_score(agent_players: usize, platform_players: usize) -> f64 {
    if platform_players == 0 {
        return 0.0;
    }
    (agent_players as f64 / platform_players as f64 * 100.0 * 2.5).clamp(0.0, 10.0)
}

pub fn stability_score(ngr_history: &[f64]) -> f64 {
    if ngr_history.len() < 2 {
        return NEUTRAL;
    }
    let shifted = stats::log_shift(ngr_history);
    let ef = 1.0 - stats::coefficient_of_variation(&shifted);
    stability_band(ef)
}

/// Maps `1 - CV` through four linear bands.
pub fn stability_band(ef: f64) -> f64 {
    if ef >= 0.8 {
        8.0 + (ef - 0.8) / 0.2 * 2.0
    } else if ef >= 0.6 {
        6.0 + (ef - 0.6) / 0.2 * 2.0
    } else if ef >= 0.4 {
        4.0 + (ef - 0.4) / 0.2 * 2.0
    } else if ef >= 0.0 {
        ef / 0.4 * 4.0
    } else {
        0.0
    }
}

pub fn growth_tier(pct_change: f64) -> f64 {
    if pct_change >= 20.0 {
        10.0
    } else if pct_change >= 10.0 {
        8.0
    } else if pct_change >= 5.0 {
        6.5
    } else if pct_change >= 0.0 {
        5.0
    } else if pct_change >= -10.0 {
        3.5
    } else if pct_change >= -20.0 {
        2.0
    } else {
        1.0
    }
}

pub fn growth_score(change: Option<DepositChange>) -> f64 {
    let Some(DepositChange { previous, current }) = change else {
        return NEUTRAL;
    };
    if previous > 0.0 {
        growth_tier((current - previous) / previous * 100.0)
    } else if current > 0.0 {
        10.0
    } else {
        NEUTRAL
    }
}

pub fn efficiency_tier(value: f64) -> f64 {
    if value < 5.5 {
        10.0
    } else if value < 10.0 {
        7.5
    } else if value < 14.0 {
        5.0
    } else if value < 20.0 {
        3.0
    } else if value < 33.0 {
        2.0
    } else {
        (10.0 - value / 10.0).max(1.0)
    }
}

/// Deposits needed per unit of product GGR. Floor of 1.0 when the product
/// has positive GGR.
pub fn efficiency_score(deposit_count: f64, ggr: f64) -> f64 {
    if ggr <= 0.0 {
        return 0.0;
    }
    efficiency_tier(deposit_count / ggr * 100.0)
}

pub fn conversion_tier(value: f64) -> f64 {
    if value >= 15.0 {
        10.0
    } else if value >= 10.0 {
        7.5
    } else if value >= 7.0 {
        5.0
    } else if value >= 5.0 {
        3.0
    } else {
        (value * 2.0).max(0.0)
    }
}

pub fn conversion_score(total_ggr: f64, deposit_total: f64) -> f64 {
    if deposit_total <= 0.0 {
        return 0.0;
    }
    conversion_tier(total_ggr / deposit_total * 100.0)
}

pub fn trend_tier(slope: f64) -> f64 {
    if slope > 1000.0 {
        8.0
    } else if slope > 0.0 {
        6.0
    } else if slope > -1000.0 {
        4.0
    } else {
        2.0
    }
}

pub fn trend_score(ngr_history: &[f64]) -> f64 {
    if ngr_history.len() < 3 {
        return NEUTRAL;
    }
    trend_tier(stats::ols_slope(ngr_history))
}

/// `(1 - H) * 10` where H is the Herfindahl index of the two product lines.
pub fn diversification_score(casino_bets: f64, sportsbook_bets: f64) -> f64 {
    let total = casino_bets + sportsbook_bets;
    if total <= 0.0 {
        return 0.0;
    }
    let herfindahl = (casino_bets / total).powi(2) + (sportsbook_bets / total).powi(2);
    (1.0 - herfindahl) * 10.0
}

pub fn player_quality_tier(avg_bet: f64) -> f64 {
    if avg_bet > 10_000.0 {
        8.0
    } else if avg_bet > 5_000.0 {
        6.0
    } else if avg_bet > 1_000.0 {
        4.0
    } else {
        2.0
    }
}

pub fn player_quality_score(total_bets: f64, players: usize) -> f64 {
    if players == 0 {
        return 0.0;
    }
    player_quality_tier(total_bets / players as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MonthKey;

    const EPS: f64 = 1e-9;

    fn month(ngr: f64, deposit_total: f64, deposit_count: f64) -> MonthlyAggregate {
        MonthlyAggregate {
            ngr,
            deposit_total,
            deposit_count,
            ..MonthlyAggregate::empty(MonthKey::new(2025, 1))
        }
    }

    #[test]
    fn profitability_tiers_at_boundaries() {
        assert_eq!(profitability_tier(8.0), 7.0);
        assert_eq!(profitability_tier(7.999), 5.5);
        assert_eq!(profitability_tier(6.0), 5.5);
        assert_eq!(profitability_tier(5.999), 4.0);
        assert_eq!(profitability_tier(4.0), 4.0);
        assert!((profitability_tier(2.0) - 3.5).abs() < EPS);
        assert_eq!(profitability_tier(-3.0), 0.0);
    }

    #[test]
    fn profitability_adds_capped_volume_bonus() {
        let score = profitability_score(80.0, 1_000.0);
        let expected = 7.0 + 81.0_f64.log10() * 0.75;
        assert!((score - expected).abs() < EPS);
        assert!((score - 8.43).abs() < 0.01);

        // Bonus capped at 3 for very large NGR.
        assert!((profitability_score(1e9, 1e9) - 10.0).abs() < EPS);
        assert_eq!(profitability_score(-50.0, 1_000.0), 0.0);
        assert_eq!(profitability_score(80.0, 0.0), 0.0);
    }

    #[test]
    fn volume_is_logarithmic_and_capped() {
        assert_eq!(volume_score(0.0), 0.0);
        assert!((volume_score(9.0) - 2.3).abs() < EPS);
        assert_eq!(volume_score(1e12), 10.0);
    }

    #[test]
    fn loyalty_is_monotonic_in_agent_players() {
        let mut last = 0.0;
        for players in 0..=50 {
            let score = loyalty_score(players, 1_000);
            assert!(score >= last);
            assert!((0.0..=10.0).contains(&score));
            last = score;
        }
        assert_eq!(loyalty_score(10, 0), 0.0);
        assert!((loyalty_score(20, 1_000) - 5.0).abs() < EPS);
    }

    #[test]
    fn stability_defaults_and_bands() {
        assert_eq!(stability_score(&[]), 5.0);
        assert_eq!(stability_score(&[1_000.0]), 5.0);
        // Identical months have zero variation.
        assert!((stability_score(&[500.0, 500.0, 500.0]) - 10.0).abs() < EPS);

        assert!((stability_band(0.8) - 8.0).abs() < EPS);
        assert!((stability_band(0.6) - 6.0).abs() < EPS);
        let below_upper = stability_band(0.7999);
        assert!(below_upper < 8.0 && below_upper > 7.99);
        let below_middle = stability_band(0.5999);
        assert!(below_middle < 6.0 && below_middle > 5.99);
        assert!((stability_band(0.4) - 4.0).abs() < EPS);
        assert!((stability_band(0.2) - 2.0).abs() < EPS);
        assert_eq!(stability_band(-0.5), 0.0);
    }

    #[test]
    fn growth_tiers_at_boundaries() {
        assert_eq!(growth_tier(20.0), 10.0);
        assert_eq!(growth_tier(19.99), 8.0);
        assert_eq!(growth_tier(10.0), 8.0);
        assert_eq!(growth_tier(5.0), 6.5);
        assert_eq!(growth_tier(0.0), 5.0);
        assert_eq!(growth_tier(-0.01), 3.5);
        assert_eq!(growth_tier(-10.0), 3.5);
        assert_eq!(growth_tier(-20.0), 2.0);
        assert_eq!(growth_tier(-20.01), 1.0);
    }

    #[test]
    fn growth_edge_cases() {
        assert_eq!(growth_score(None), 5.0);
        let change = |previous, current| Some(DepositChange { previous, current });
        assert_eq!(growth_score(change(0.0, 3.0)), 10.0);
        assert_eq!(growth_score(change(0.0, 0.0)), 5.0);
        assert_eq!(growth_score(change(100.0, 120.0)), 10.0);
        assert_eq!(growth_score(change(100.0, 70.0)), 1.0);
    }

    #[test]
    fn efficiency_tiers_and_floor() {
        assert_eq!(efficiency_tier(5.49), 10.0);
        assert_eq!(efficiency_tier(5.5), 7.5);
        assert_eq!(efficiency_tier(10.0), 5.0);
        assert_eq!(efficiency_tier(14.0), 3.0);
        assert_eq!(efficiency_tier(20.0), 2.0);
        assert!((efficiency_tier(33.0) - 6.7).abs() < EPS);
        assert_eq!(efficiency_tier(500.0), 1.0);
        assert_eq!(efficiency_score(10.0, 0.0), 0.0);
        assert_eq!(efficiency_score(5.0, 100.0), 10.0);
    }

    #[test]
    fn conversion_tiers_at_boundaries() {
        assert_eq!(conversion_tier(15.0), 10.0);
        assert_eq!(conversion_tier(10.0), 7.5);
        assert_eq!(conversion_tier(7.0), 5.0);
        assert_eq!(conversion_tier(5.0), 3.0);
        assert_eq!(conversion_tier(14.99), 7.5);
        assert_eq!(conversion_tier(9.99), 5.0);
        assert_eq!(conversion_tier(6.99), 3.0);
        assert!((conversion_tier(4.99) - 9.98).abs() < EPS);
        assert!((conversion_tier(4.0) - 8.0).abs() < EPS);
        assert_eq!(conversion_tier(-2.0), 0.0);
        assert_eq!(conversion_score(500.0, 0.0), 0.0);
    }

    #[test]
    fn trend_tiers_use_strict_bounds() {
        assert_eq!(trend_tier(1000.01), 8.0);
        assert_eq!(trend_tier(1000.0), 6.0);
        assert_eq!(trend_tier(0.0), 4.0);
        assert_eq!(trend_tier(-1000.0), 2.0);
        assert_eq!(trend_score(&[1.0, 2.0]), 5.0);
        assert_eq!(trend_score(&[0.0, 2_000.0, 4_000.0]), 8.0);
    }

    #[test]
    fn diversification_uses_herfindahl() {
        assert_eq!(diversification_score(0.0, 0.0), 0.0);
        assert!((diversification_score(50.0, 50.0) - 5.0).abs() < EPS);
        assert!(diversification_score(100.0, 0.0).abs() < EPS);
    }

    #[test]
    fn player_quality_tiers() {
        assert_eq!(player_quality_score(1_000.0, 0), 0.0);
        assert_eq!(player_quality_tier(10_000.0), 6.0);
        assert_eq!(player_quality_tier(10_000.01), 8.0);
        assert_eq!(player_quality_tier(5_000.0), 4.0);
        assert_eq!(player_quality_tier(1_000.0), 2.0);
    }

    #[test]
    fn single_month_lifetime_scenario() {
        let months = vec![month(80.0, 1_000.0, 10.0)];
        let history: Vec<f64> = months.iter().map(|m| m.ngr).collect();
        let input = MetricInput::lifetime(&months, 4);
        let ctx = ScoreContext::lifetime(&months, &history, 100, 0.05);
        let scores = score_metrics(&input, &ctx);

        assert!((scores.profitability - 8.43).abs() < 0.01);
        assert_eq!(scores.stability, 5.0);
        assert_eq!(scores.growth, 5.0);
        assert_eq!(scores.trend, 5.0);
        assert!((scores.loyalty - 10.0).abs() < EPS);
    }

    #[test]
    fn lifetime_growth_compares_last_two_months() {
        let months = vec![month(0.0, 0.0, 50.0), month(0.0, 0.0, 100.0), month(0.0, 0.0, 90.0)];
        let history = vec![0.0; 3];
        let ctx = ScoreContext::lifetime(&months, &history, 1, 0.05);
        assert_eq!(
            ctx.deposit_change,
            Some(DepositChange {
                previous: 100.0,
                current: 90.0
            })
        );
    }

    #[test]
    fn per_month_mode_is_neutral_for_history_metrics() {
        let current = month(-5_000.0, 1_000.0, 10.0);
        let ctx = ScoreContext::month(None, &current, 10, 0.05);
        let scores = score_metrics(&MetricInput::from_month(&current), &ctx);
        assert_eq!(scores.stability, 5.0);
        assert_eq!(scores.trend, 5.0);
        assert_eq!(scores.growth, 5.0);
    }

    #[test]
    fn all_scores_stay_within_range() {
        let samples = [
            MetricInput::default(),
            MetricInput {
                ngr: 1e7,
                deposit_total: 2e7,
                deposit_count: 1e6,
                withdrawal_count: 1e6,
                casino_ggr: 3e6,
                sportsbook_ggr: 1.0,
                players: 900,
            },
            MetricInput {
                ngr: -4e4,
                deposit_total: 10.0,
                deposit_count: 3.0,
                withdrawal_count: 0.0,
                casino_ggr: 0.01,
                sportsbook_ggr: 0.02,
                players: 1,
            },
        ];
        let history = [-4e4, 1e7, 3.0, 12.0];
        for input in samples {
            let ctx = ScoreContext {
                platform_players: 1_000,
                house_margin: 0.05,
                deposit_change: Some(DepositChange {
                    previous: 3.0,
                    current: 1e6,
                }),
                ngr_history: Some(&history),
            };
            for (metric, value) in score_metrics(&input, &ctx).iter() {
                assert!(
                    (0.0..=10.0).contains(&value),
                    "{} out of range: {value}",
                    metric.key()
                );
            }
        }
    }
}
