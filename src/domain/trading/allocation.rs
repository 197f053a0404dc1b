use crate::domain::errors::SimulationError;
use crate::domain::market::{FxHistory, MarketHistory};
use crate::domain::trading::strategy::Strategy;
use crate::domain::types::CurrencyCode;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Decides how much base-currency capital each strategy may deploy on a
/// bar. Runs exactly once per bar, before any sizer.
pub trait CapitalAllocator: Send + Sync {
    fn allocate(
        &self,
        date: NaiveDate,
        base: CurrencyCode,
        strategies: &[Strategy],
        market: &MarketHistory,
        fx: &FxHistory,
    ) -> Result<BTreeMap<String, Decimal>, SimulationError>;
}

/// Identity policy: each strategy trades against its own mark-to-market
/// value. Capital never migrates between strategies.
pub struct SelfFundedAllocator;

impl CapitalAllocator for SelfFundedAllocator {
    fn allocate(
        &self,
        date: NaiveDate,
        base: CurrencyCode,
        strategies: &[Strategy],
        market: &MarketHistory,
        fx: &FxHistory,
    ) -> Result<BTreeMap<String, Decimal>, SimulationError> {
        let mut allocations = BTreeMap::new();
        for strategy in strategies {
            let value = strategy.compute_total_value(date, base, market, fx)?;
            allocations.insert(strategy.name().to_string(), value);
        }
        Ok(allocations)
    }
}

/// Pools the portfolio's total value and hands every strategy an equal
/// share, regardless of which strategy holds the assets.
pub struct EqualSplitAllocator;

impl CapitalAllocator for EqualSplitAllocator {
    fn allocate(
        &self,
        date: NaiveDate,
        base: CurrencyCode,
        strategies: &[Strategy],
        market: &MarketHistory,
        fx: &FxHistory,
    ) -> Result<BTreeMap<String, Decimal>, SimulationError> {
        if strategies.is_empty() {
            return Ok(BTreeMap::new());
        }
        let mut total = Decimal::ZERO;
        for strategy in strategies {
            total += strategy.compute_total_value(date, base, market, fx)?;
        }
        let share = total / Decimal::from(strategies.len());
        Ok(strategies
            .iter()
            .map(|s| (s.name().to_string(), share))
            .collect())
    }
}
