use crate::domain::errors::SimulationError;
use crate::domain::stats::{self, DEFAULT_TRADING_DAYS};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The bundle of performance metrics a finished run reports: absolute
/// risk/return measures from the trading curve, relative measures against
/// the benchmark, the drawdown scan, and the equity curve itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tearsheet {
    pub annualized_return: Decimal,
    pub annualized_volatility: Decimal,
    pub sharpe: Decimal,
    pub sortino: Decimal,
    pub cagr: Decimal,
    pub alpha: Decimal,
    pub beta: Decimal,
    pub information_ratio: Decimal,
    pub max_drawdown: Decimal,
    pub max_drawdown_duration: usize,
    pub drawdown_series: Vec<(NaiveDate, Decimal)>,
    pub equity_curve: BTreeMap<NaiveDate, Decimal>,
}

/// Assembles a [`Tearsheet`] from the trading and benchmark equity curves.
/// Risk-free rate defaults to zero and the trading year to 252 days.
#[derive(Debug, Clone)]
pub struct TearsheetBuilder {
    risk_free_rate: Decimal,
    trading_days: u32,
}

impl Default for TearsheetBuilder {
    fn default() -> Self {
        Self {
            risk_free_rate: Decimal::ZERO,
            trading_days: DEFAULT_TRADING_DAYS,
        }
    }
}

impl TearsheetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn risk_free_rate(mut self, rate: Decimal) -> Self {
        self.risk_free_rate = rate;
        self
    }

    pub fn trading_days_per_year(mut self, days: u32) -> Self {
        self.trading_days = days;
        self
    }

    pub fn build(
        &self,
        trading: &BTreeMap<NaiveDate, Decimal>,
        benchmark: &BTreeMap<NaiveDate, Decimal>,
    ) -> Result<Tearsheet, SimulationError> {
        if trading.len() != benchmark.len()
            || trading.keys().zip(benchmark.keys()).any(|(a, b)| a != b)
        {
            return Err(SimulationError::MisalignedCurves {
                trading: trading.len(),
                benchmark: benchmark.len(),
            });
        }

        let trading_equity: Vec<Decimal> = trading.values().copied().collect();
        let benchmark_equity: Vec<Decimal> = benchmark.values().copied().collect();
        let trading_returns = stats::daily_returns(&trading_equity)?;
        let benchmark_returns = stats::daily_returns(&benchmark_equity)?;

        let drawdown = stats::drawdowns(trading)?;

        Ok(Tearsheet {
            annualized_return: stats::annualized_return(&trading_returns, self.trading_days)?,
            annualized_volatility: stats::annualized_volatility(
                &trading_returns,
                self.trading_days,
            )?,
            sharpe: stats::sharpe(&trading_returns, self.risk_free_rate)?,
            sortino: stats::sortino(&trading_returns, self.risk_free_rate)?,
            cagr: stats::cagr(&trading_returns, self.trading_days)?,
            alpha: stats::alpha(&trading_returns, &benchmark_returns, self.risk_free_rate)?,
            beta: stats::beta(&trading_returns, &benchmark_returns)?,
            information_ratio: stats::information_ratio(&trading_returns, &benchmark_returns)?,
            max_drawdown: drawdown.max_drawdown,
            max_drawdown_duration: drawdown.max_drawdown_duration,
            drawdown_series: drawdown.series,
            equity_curve: trading.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn curve(values: &[Decimal]) -> BTreeMap<NaiveDate, Decimal> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                (
                    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64),
                    v,
                )
            })
            .collect()
    }

    #[test]
    fn test_identical_curves_have_unit_beta_zero_alpha() {
        let equity = curve(&[dec!(1000), dec!(1010), dec!(990), dec!(1030)]);
        let sheet = TearsheetBuilder::new().build(&equity, &equity).unwrap();

        assert_eq!(sheet.beta, Decimal::ONE);
        assert_eq!(sheet.alpha, Decimal::ZERO);
        assert_eq!(sheet.information_ratio, Decimal::ZERO);
        assert_eq!(sheet.equity_curve, equity);
    }

    #[test]
    fn test_misaligned_lengths_are_rejected() {
        let trading = curve(&[dec!(1000), dec!(1010), dec!(1020)]);
        let benchmark = curve(&[dec!(1000), dec!(1010)]);
        let err = TearsheetBuilder::new()
            .build(&trading, &benchmark)
            .unwrap_err();
        assert!(matches!(
            err,
            SimulationError::MisalignedCurves {
                trading: 3,
                benchmark: 2
            }
        ));
    }

    #[test]
    fn test_misaligned_dates_are_rejected() {
        let trading = curve(&[dec!(1000), dec!(1010)]);
        let mut benchmark = curve(&[dec!(1000), dec!(1010)]);
        let shifted: BTreeMap<NaiveDate, Decimal> = benchmark
            .iter()
            .map(|(&d, &v)| (d + chrono::Days::new(30), v))
            .collect();
        benchmark = shifted;

        let err = TearsheetBuilder::new()
            .build(&trading, &benchmark)
            .unwrap_err();
        assert!(matches!(err, SimulationError::MisalignedCurves { .. }));
    }

    #[test]
    fn test_single_point_curves_are_insufficient() {
        let tiny = curve(&[dec!(1000)]);
        let err = TearsheetBuilder::new().build(&tiny, &tiny).unwrap_err();
        assert!(matches!(err, SimulationError::Stats(_)));
    }

    #[test]
    fn test_drawdown_block_matches_kernel() {
        let equity = curve(&[
            dec!(1000),
            dec!(1020),
            dec!(1010),
            dec!(1030),
            dec!(950),
            dec!(1100),
            dec!(900),
        ]);
        let sheet = TearsheetBuilder::new().build(&equity, &equity).unwrap();
        assert_eq!(sheet.max_drawdown, dec!(-0.1818181818));
        assert_eq!(sheet.max_drawdown_duration, 1);
        assert_eq!(sheet.drawdown_series.len(), 7);
    }

    #[test]
    fn test_tearsheet_serde_round_trip() {
        let equity = curve(&[dec!(1000), dec!(1010), dec!(990), dec!(1030)]);
        let sheet = TearsheetBuilder::new().build(&equity, &equity).unwrap();
        let json = serde_json::to_string(&sheet).unwrap();
        let back: Tearsheet = serde_json::from_str(&json).unwrap();
        assert_eq!(sheet, back);
    }
}
