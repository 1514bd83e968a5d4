//! Credit-line recommendation.
//!
//! The ceiling starts from the 25th percentile of the agent's profitable
//! months and is scaled by score, volatility, trend and turnover factors.

use crate::models::{CreditDetails, CreditRecommendation, MonthlyAggregate};
use crate::stats;

/// Below this p25 the agent gets no credit at all.
const TRUST_FLOOR: f64 = 100.0;
const CAP_MEDIAN_MULTIPLE: f64 = 3.0;
const MIN_QUALIFYING_MONTHS: usize = 3;

pub fn volatility_factor(cv: f64) -> (f64, &'static str) {
    if cv < 0.2 {
        (1.00, "Baja volatilidad")
    } else if cv < 0.4 {
        (0.85, "Moderada")
    } else if cv < 0.6 {
        (0.70, "Alta")
    } else if cv < 0.8 {
        (0.55, "Muy alta")
    } else {
        (0.40, "Extrema")
    }
}

pub fn trend_factor(slope: f64) -> (f64, &'static str) {
    if slope > 5_000.0 {
        (1.15, "Crecimiento fuerte")
    } else if slope > 0.0 {
        (1.05, "Crecimiento moderado")
    } else if slope >= -5_000.0 {
        (0.95, "Estancamiento")
    } else {
        (0.80, "Decrecimiento")
    }
}

pub fn turnover_factor(total: f64) -> f64 {
    if total >= 50_000.0 {
        1.5
    } else if total >= 30_000.0 {
        1.3
    } else if total >= 15_000.0 {
        1.15
    } else if total >= 5_000.0 {
        1.0
    } else {
        0.85
    }
}

pub fn recommend_credit(
    months: &[MonthlyAggregate],
    combined_score: f64,
    stability_score: f64,
) -> CreditRecommendation {
    let positive: Vec<f64> = months.iter().map(|m| m.ngr).filter(|ngr| *ngr > 0.0).collect();
    if positive.is_empty() {
        return CreditRecommendation {
            amount: 0.0,
            details: None,
            reason: Some("no months with positive net gaming revenue".to_string()),
        };
    }

    let p25 = stats::percentile(&positive, 25.0);
    let median = stats::median(&positive);
    let f_score = 0.5 + 0.05 * ((combined_score + stability_score) / 2.0);
    let (f_volatility, volatility_band) =
        volatility_factor(stats::coefficient_of_variation(&stats::log_shift(&positive)));
    let (f_trend, trend_band) = trend_factor(stats::ols_slope(&positive));
    let f_turnover = turnover_factor(positive.iter().sum());

    let mut amount = p25 * f_score * f_volatility * f_trend * f_turnover;
    let mut reason = None;
    if p25 < TRUST_FLOOR {
        amount = 0.0;
        reason = Some(format!("p25 of {p25:.2} is below the trust floor of {TRUST_FLOOR}"));
    } else {
        amount = amount.min(CAP_MEDIAN_MULTIPLE * median * f_turnover);
    }
    if positive.len() < MIN_QUALIFYING_MONTHS {
        amount *= 0.5;
    }

    CreditRecommendation {
        amount: stats::round2(amount),
        details: Some(CreditDetails {
            qualifying_months: positive.len(),
            p25,
            median,
            f_score,
            f_volatility,
            volatility_band,
            f_trend,
            trend_band,
            f_turnover,
        }),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MonthKey;

    fn months(ngr: &[f64]) -> Vec<MonthlyAggregate> {
        ngr.iter()
            .enumerate()
            .map(|(i, value)| MonthlyAggregate {
                ngr: *value,
                ..MonthlyAggregate::empty(MonthKey::new(2025, i as u32 + 1))
            })
            .collect()
    }

    #[test]
    fn no_positive_months_means_no_credit() {
        let credit = recommend_credit(&months(&[-10.0, 0.0]), 9.0, 9.0);
        assert_eq!(credit.amount, 0.0);
        assert!(credit.details.is_none());
        assert!(credit.reason.is_some());
    }

    #[test]
    fn p25_below_floor_forces_zero() {
        let credit = recommend_credit(&months(&[50.0, 90.0, 5_000.0, 90_000.0]), 10.0, 10.0);
        let details = credit.details.unwrap();
        assert!(details.p25 < 100.0);
        assert_eq!(credit.amount, 0.0);
    }

    #[test]
    fn steady_history_matches_hand_computation() {
        // Three identical months: CV 0, slope 0, turnover 6000.
        let credit = recommend_credit(&months(&[2_000.0, 2_000.0, 2_000.0]), 6.0, 8.0);
        let details = credit.details.clone().unwrap();
        assert_eq!(details.p25, 2_000.0);
        assert!((details.f_score - 0.85).abs() < 1e-12);
        assert_eq!(details.f_volatility, 1.0);
        assert_eq!(details.f_trend, 0.95);
        assert_eq!(details.f_turnover, 1.0);
        assert_eq!(credit.amount, 1_615.0);
    }

    #[test]
    fn thin_history_is_halved() {
        // Two identical months: CV 0, slope 0, turnover 6000.
        let credit = recommend_credit(&months(&[3_000.0, 3_000.0]), 6.0, 8.0);
        let details = credit.details.clone().unwrap();
        assert_eq!(details.qualifying_months, 2);
        assert_eq!(details.f_turnover, 1.0);
        let unhalved = details.p25
            * details.f_score
            * details.f_volatility
            * details.f_trend
            * details.f_turnover;
        assert!((credit.amount - stats::round2(unhalved / 2.0)).abs() < 1e-9);
        assert_eq!(credit.amount, 1_211.25);
    }

    #[test]
    fn two_small_months_fall_in_the_lowest_turnover_band() {
        let credit = recommend_credit(&months(&[2_000.0, 2_000.0]), 6.0, 8.0);
        assert_eq!(credit.details.clone().unwrap().f_turnover, 0.85);
        assert_eq!(credit.amount, 686.38);
    }

    #[test]
    fn credit_is_capped_by_median() {
        // Very high score factor would exceed 3 x median x turnover.
        let credit = recommend_credit(&months(&[1_000.0, 1_000.0, 1_000.0, 60_000.0]), 1_000.0, 10.0);
        let details = credit.details.clone().unwrap();
        let cap = 3.0 * details.median * details.f_turnover;
        assert!((credit.amount - stats::round2(cap)).abs() < 1e-9);
    }

    #[test]
    fn factor_bands_at_boundaries() {
        assert_eq!(volatility_factor(0.19).0, 1.0);
        assert_eq!(volatility_factor(0.2).0, 0.85);
        assert_eq!(volatility_factor(0.39).0, 0.85);
        assert_eq!(volatility_factor(0.4).0, 0.70);
        assert_eq!(volatility_factor(0.6).0, 0.55);
        assert_eq!(volatility_factor(0.79).0, 0.55);
        assert_eq!(volatility_factor(0.8).0, 0.40);
        assert_eq!(trend_factor(5_000.0).0, 1.05);
        assert_eq!(trend_factor(0.0).0, 0.95);
        assert_eq!(trend_factor(-5_000.0).0, 0.95);
        assert_eq!(trend_factor(-5_000.1).0, 0.80);
        assert_eq!(turnover_factor(50_000.0), 1.5);
        assert_eq!(turnover_factor(49_999.99), 1.3);
        assert_eq!(turnover_factor(30_000.0), 1.3);
        assert_eq!(turnover_factor(29_999.99), 1.15);
        assert_eq!(turnover_factor(15_000.0), 1.15);
        assert_eq!(turnover_factor(14_999.99), 1.0);
        assert_eq!(turnover_factor(5_000.0), 1.0);
        assert_eq!(turnover_factor(4_999.99), 0.85);
    }
}
