use crate::domain::errors::StatsError;
use crate::domain::stats::returns::{
    RETURN_SCALE, Variance, covariance, decimal_powf, decimal_sqrt, mean, std_dev, variance,
};
use rust_decimal::Decimal;

pub const DEFAULT_TRADING_DAYS: u32 = 252;

fn check_trading_days(trading_days: u32) -> Result<(), StatsError> {
    if trading_days == 0 {
        return Err(StatsError::InvalidTradingDays {
            value: trading_days,
        });
    }
    Ok(())
}

/// Dispersion of a return series. Sample uses the n-1 divisor.
pub fn volatility(returns: &[Decimal], kind: Variance) -> Result<Decimal, StatsError> {
    std_dev(returns, kind)
}

/// Sample volatility scaled by the square root of the trading year.
pub fn annualized_volatility(
    returns: &[Decimal],
    trading_days: u32,
) -> Result<Decimal, StatsError> {
    check_trading_days(trading_days)?;
    let vol = std_dev(returns, Variance::Sample)?;
    Ok((vol * decimal_sqrt(Decimal::from(trading_days))).round_dp(RETURN_SCALE))
}

/// Excess mean return per unit of sample volatility. A dispersion-free
/// series has no meaningful ratio and yields zero by convention; the same
/// convention applies to [`sortino`], [`beta`] and [`information_ratio`].
pub fn sharpe(returns: &[Decimal], risk_free: Decimal) -> Result<Decimal, StatsError> {
    let mu = mean(returns)?;
    let vol = std_dev(returns, Variance::Sample)?;
    if vol.is_zero() {
        return Ok(Decimal::ZERO);
    }
    Ok(((mu - risk_free) / vol).round_dp(RETURN_SCALE))
}

/// Root-mean-square of the shortfalls `min(r_i - rf, 0)` across the full
/// series (not only the negative observations), with the sample divisor.
pub fn downside_deviation(
    returns: &[Decimal],
    risk_free: Decimal,
) -> Result<Decimal, StatsError> {
    if returns.is_empty() {
        return Err(StatsError::EmptyInput);
    }
    if returns.len() < 2 {
        return Err(StatsError::InsufficientData {
            required: 2,
            actual: returns.len(),
        });
    }
    let mut sum_sq = Decimal::ZERO;
    for r in returns {
        let shortfall = (r - risk_free).min(Decimal::ZERO);
        sum_sq += shortfall * shortfall;
    }
    Ok(decimal_sqrt(sum_sq / Decimal::from(returns.len() - 1)))
}

pub fn sortino(returns: &[Decimal], risk_free: Decimal) -> Result<Decimal, StatsError> {
    let mu = mean(returns)?;
    let downside = downside_deviation(returns, risk_free)?;
    if downside.is_zero() {
        return Ok(Decimal::ZERO);
    }
    Ok(((mu - risk_free) / downside).round_dp(RETURN_SCALE))
}

/// Compound annual growth rate: `prod(1 + r_i)^(N/n) - 1`.
///
/// A series that compounds to zero or below (a wipeout) pins the result at
/// -1, the limit of the formula.
pub fn cagr(returns: &[Decimal], trading_days: u32) -> Result<Decimal, StatsError> {
    check_trading_days(trading_days)?;
    if returns.is_empty() {
        return Err(StatsError::EmptyInput);
    }
    let mut growth = Decimal::ONE;
    for r in returns {
        growth *= Decimal::ONE + r;
    }
    if growth <= Decimal::ZERO {
        return Ok(Decimal::NEGATIVE_ONE);
    }
    let exponent = f64::from(trading_days) / returns.len() as f64;
    Ok((decimal_powf(growth, exponent) - Decimal::ONE).round_dp(RETURN_SCALE))
}

/// Mean daily return compounded over a trading year: `(1 + mean)^N - 1`.
pub fn annualized_return(returns: &[Decimal], trading_days: u32) -> Result<Decimal, StatsError> {
    check_trading_days(trading_days)?;
    let mu = mean(returns)?;
    let base = Decimal::ONE + mu;
    if base <= Decimal::ZERO {
        return Ok(Decimal::NEGATIVE_ONE);
    }
    Ok((decimal_powf(base, f64::from(trading_days)) - Decimal::ONE).round_dp(RETURN_SCALE))
}

/// Slope of portfolio returns against benchmark returns:
/// `cov(rp, rb) / var(rb)`, both with the sample divisor.
pub fn beta(portfolio: &[Decimal], benchmark: &[Decimal]) -> Result<Decimal, StatsError> {
    let n = portfolio.len().min(benchmark.len());
    let cov = covariance(portfolio, benchmark)?;
    let var_b = variance(&benchmark[..n], Variance::Sample)?;
    if var_b.is_zero() {
        return Ok(Decimal::ZERO);
    }
    Ok((cov / var_b).round_dp(RETURN_SCALE))
}

/// CAPM-style intercept: `mean(rp) - (rf + beta * (mean(rb) - rf))`.
pub fn alpha(
    portfolio: &[Decimal],
    benchmark: &[Decimal],
    risk_free: Decimal,
) -> Result<Decimal, StatsError> {
    let n = portfolio.len().min(benchmark.len());
    if n == 0 {
        return Err(StatsError::EmptyInput);
    }
    let mean_p = mean(&portfolio[..n])?;
    let mean_b = mean(&benchmark[..n])?;
    let b = beta(portfolio, benchmark)?;
    Ok((mean_p - (risk_free + b * (mean_b - risk_free))).round_dp(RETURN_SCALE))
}

/// Mean active return per unit of tracking error.
pub fn information_ratio(
    portfolio: &[Decimal],
    benchmark: &[Decimal],
) -> Result<Decimal, StatsError> {
    let n = portfolio.len().min(benchmark.len());
    if n == 0 {
        return Err(StatsError::EmptyInput);
    }
    let active: Vec<Decimal> = (0..n).map(|i| portfolio[i] - benchmark[i]).collect();
    let mu = mean(&active)?;
    let tracking = std_dev(&active, Variance::Sample)?;
    if tracking.is_zero() {
        return Ok(Decimal::ZERO);
    }
    Ok((mu / tracking).round_dp(RETURN_SCALE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_invalid_trading_days() {
        let r = [dec!(0.01), dec!(0.02)];
        assert_eq!(
            annualized_volatility(&r, 0).unwrap_err(),
            StatsError::InvalidTradingDays { value: 0 }
        );
        assert_eq!(
            cagr(&r, 0).unwrap_err(),
            StatsError::InvalidTradingDays { value: 0 }
        );
        assert_eq!(
            annualized_return(&r, 0).unwrap_err(),
            StatsError::InvalidTradingDays { value: 0 }
        );
    }

    #[test]
    fn test_sharpe_of_constant_series_is_zero() {
        let flat = [dec!(0), dec!(0), dec!(0)];
        assert_eq!(sharpe(&flat, Decimal::ZERO).unwrap(), Decimal::ZERO);
        assert_eq!(sortino(&flat, Decimal::ZERO).unwrap(), Decimal::ZERO);

        let constant = [dec!(0.01), dec!(0.01), dec!(0.01)];
        assert_eq!(sharpe(&constant, Decimal::ZERO).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_sharpe_positive_series() {
        let r = [dec!(0.10), dec!(0.05)];
        // mean 0.075, sample stdev 0.0353553391
        let s = sharpe(&r, Decimal::ZERO).unwrap();
        assert!(s > dec!(2.1) && s < dec!(2.2), "sharpe {s}");
    }

    #[test]
    fn test_sortino_ignores_upside() {
        // Shortfalls: [0, -0.02, 0]; rms over n-1: sqrt(0.0004 / 2)
        let r = [dec!(0.01), dec!(-0.02), dec!(0.03)];
        let dd = downside_deviation(&r, Decimal::ZERO).unwrap();
        assert!((dd - dec!(0.0141421356)).abs() < dec!(0.0000000002));

        let s = sortino(&r, Decimal::ZERO).unwrap();
        let expected = (mean(&r).unwrap() / dd).round_dp(RETURN_SCALE);
        assert_eq!(s, expected);
    }

    #[test]
    fn test_beta_identity() {
        let r = [dec!(0.01), dec!(-0.02), dec!(0.03)];
        assert_eq!(beta(&r, &r).unwrap(), Decimal::ONE);
    }

    #[test]
    fn test_beta_and_alpha_of_identical_series() {
        // S6: rp = rb, beta = 1 and alpha = 0 with rf = 0.
        let r = [dec!(0.01), dec!(-0.02), dec!(0.03)];
        assert_eq!(beta(&r, &r).unwrap(), Decimal::ONE);
        assert_eq!(alpha(&r, &r, Decimal::ZERO).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_beta_of_scaled_series() {
        let rb = [dec!(0.01), dec!(-0.02), dec!(0.03), dec!(0.005)];
        let rp: Vec<Decimal> = rb.iter().map(|r| r * dec!(2)).collect();
        assert_eq!(beta(&rp, &rb).unwrap(), dec!(2));
    }

    #[test]
    fn test_information_ratio_of_identical_series_is_zero() {
        let r = [dec!(0.01), dec!(-0.02), dec!(0.03)];
        assert_eq!(information_ratio(&r, &r).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_cagr_full_year_equals_total_return() {
        // 252 returns of zero except one +10%: exponent N/n = 1, so CAGR
        // collapses to the total compounded return.
        let mut r = vec![Decimal::ZERO; 251];
        r.push(dec!(0.10));
        assert_eq!(cagr(&r, DEFAULT_TRADING_DAYS).unwrap(), dec!(0.1));
    }

    #[test]
    fn test_cagr_wipeout_pins_at_minus_one() {
        let r = [dec!(0.5), dec!(-1)];
        assert_eq!(cagr(&r, DEFAULT_TRADING_DAYS).unwrap(), Decimal::NEGATIVE_ONE);
    }

    #[test]
    fn test_annualized_volatility_scales_by_root_year() {
        let r = [dec!(0.01), dec!(-0.01), dec!(0.02), dec!(0)];
        let daily = volatility(&r, Variance::Sample).unwrap();
        let annual = annualized_volatility(&r, 252).unwrap();
        let expected = (daily * decimal_sqrt(Decimal::from(252))).round_dp(RETURN_SCALE);
        assert_eq!(annual, expected);
    }
}
