use crate::error::{EngineError, EngineResult};

/// Weighted moving average over the last one to three months of GGR,
/// most recent month weighted heaviest.
pub fn forecast_ggr(monthly_ggr: &[f64]) -> EngineResult<f64> {
    match monthly_ggr {
        [] => Err(EngineError::EmptySeries),
        [only] => Ok(*only),
        [previous, last] => Ok(last * 0.6 + previous * 0.4),
        [.., third, second, last] => Ok(last * 0.5 + second * 0.3 + third * 0.2),
    }
}
