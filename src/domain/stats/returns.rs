use crate::domain::errors::StatsError;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

/// Scale applied to every statistic that passes through the `f64` widening
/// path (square roots, fractional powers). Comparisons of derived series
/// are exact at this scale.
pub const RETURN_SCALE: u32 = 10;

/// Divisor convention for dispersion statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variance {
    /// Unbiased estimator, divisor n-1.
    Sample,
    /// Divisor n.
    Population,
}

/// Square root via f64, rounded back to [`RETURN_SCALE`]. Decimal itself
/// has no root; the widening loses nothing at the scales involved here.
pub(crate) fn decimal_sqrt(value: Decimal) -> Decimal {
    let wide = value.to_f64().unwrap_or(0.0);
    if wide <= 0.0 {
        return Decimal::ZERO;
    }
    Decimal::from_f64(wide.sqrt())
        .unwrap_or(Decimal::ZERO)
        .round_dp(RETURN_SCALE)
}

/// `base^exp` via f64, rounded back to [`RETURN_SCALE`]. Requires base > 0.
pub(crate) fn decimal_powf(base: Decimal, exp: f64) -> Decimal {
    let wide = base.to_f64().unwrap_or(0.0);
    if wide <= 0.0 {
        return Decimal::ZERO;
    }
    Decimal::from_f64(wide.powf(exp))
        .unwrap_or(Decimal::ZERO)
        .round_dp(RETURN_SCALE)
}

pub fn mean(values: &[Decimal]) -> Result<Decimal, StatsError> {
    if values.is_empty() {
        return Err(StatsError::EmptyInput);
    }
    let sum: Decimal = values.iter().sum();
    Ok(sum / Decimal::from(values.len()))
}

pub fn variance(values: &[Decimal], kind: Variance) -> Result<Decimal, StatsError> {
    if values.is_empty() {
        return Err(StatsError::EmptyInput);
    }
    if kind == Variance::Sample && values.len() < 2 {
        return Err(StatsError::InsufficientData {
            required: 2,
            actual: values.len(),
        });
    }
    let mu = mean(values)?;
    let mut sum_sq = Decimal::ZERO;
    for v in values {
        let diff = v - mu;
        sum_sq += diff * diff;
    }
    let divisor = match kind {
        Variance::Sample => Decimal::from(values.len() - 1),
        Variance::Population => Decimal::from(values.len()),
    };
    Ok(sum_sq / divisor)
}

pub fn std_dev(values: &[Decimal], kind: Variance) -> Result<Decimal, StatsError> {
    Ok(decimal_sqrt(variance(values, kind)?))
}

/// Sample covariance over the common prefix of the two series.
pub fn covariance(a: &[Decimal], b: &[Decimal]) -> Result<Decimal, StatsError> {
    let n = a.len().min(b.len());
    if n == 0 {
        return Err(StatsError::EmptyInput);
    }
    if n < 2 {
        return Err(StatsError::InsufficientData {
            required: 2,
            actual: n,
        });
    }
    let a = &a[..n];
    let b = &b[..n];
    let mean_a = mean(a)?;
    let mean_b = mean(b)?;
    let mut sum = Decimal::ZERO;
    for i in 0..n {
        sum += (a[i] - mean_a) * (b[i] - mean_b);
    }
    Ok(sum / Decimal::from(n - 1))
}

/// Simple returns between consecutive equity points: `r_i = (e_{i+1} - e_i) / e_i`.
pub fn daily_returns(equity: &[Decimal]) -> Result<Vec<Decimal>, StatsError> {
    if equity.is_empty() {
        return Err(StatsError::EmptyInput);
    }
    if equity.len() < 2 {
        return Err(StatsError::InsufficientData {
            required: 2,
            actual: equity.len(),
        });
    }
    let mut returns = Vec::with_capacity(equity.len() - 1);
    for (i, window) in equity.windows(2).enumerate() {
        if window[0].is_zero() {
            return Err(StatsError::ZeroEquity { index: i });
        }
        returns.push((window[1] - window[0]) / window[0]);
    }
    Ok(returns)
}

/// Compound `initial` forward through a return series, producing a curve
/// one element longer than the input. Inverse of [`daily_returns`].
pub fn equity_curve(returns: &[Decimal], initial: Decimal) -> Result<Vec<Decimal>, StatsError> {
    if returns.is_empty() {
        return Err(StatsError::EmptyInput);
    }
    let mut curve = Vec::with_capacity(returns.len() + 1);
    curve.push(initial);
    let mut current = initial;
    for r in returns {
        current *= Decimal::ONE + r;
        curve.push(current);
    }
    Ok(curve)
}
