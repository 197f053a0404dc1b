use crate::domain::errors::SimulationError;
use crate::domain::market::{FxHistory, MarketHistory};
use crate::domain::trading::strategy::Strategy;
use crate::domain::types::{CurrencyCode, OrderType, SignalType, TradeAction};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::collections::BTreeMap;

/// Translates a bar's signals into absolute target positions (share
/// counts, not deltas). `allocation` is the capital the allocator granted
/// this strategy for the bar, in the base currency.
pub trait PositionSizer: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    fn target_positions(
        &self,
        date: NaiveDate,
        base: CurrencyCode,
        signals: &BTreeMap<String, SignalType>,
        strategy: &Strategy,
        allocation: Decimal,
        market: &MarketHistory,
        fx: &FxHistory,
    ) -> Result<BTreeMap<String, i64>, SimulationError>;
}

/// Produces the order type and price pair for one leg of a trade.
pub trait OrderPricer: Send + Sync {
    fn price(
        &self,
        date: NaiveDate,
        asset: &str,
        action: TradeAction,
        market: &MarketHistory,
    ) -> Result<(OrderType, Decimal, Decimal), SimulationError>;
}

/// Share counts are quantized at this scale before flooring, so a
/// conversion round-trip error in the 20th decimal place cannot cost a
/// whole share.
const QUANTIZE_SCALE: u32 = 10;

/// Splits the bar's allocation evenly across every signaled asset and
/// targets `floor(slice / adjusted close)` shares. `NoOp` signals leave
/// the existing position untouched.
pub struct EqualWeightSizer;

impl PositionSizer for EqualWeightSizer {
    #[allow(clippy::too_many_arguments)]
    fn target_positions(
        &self,
        date: NaiveDate,
        base: CurrencyCode,
        signals: &BTreeMap<String, SignalType>,
        strategy: &Strategy,
        allocation: Decimal,
        market: &MarketHistory,
        fx: &FxHistory,
    ) -> Result<BTreeMap<String, i64>, SimulationError> {
        let active: Vec<&String> = signals
            .iter()
            .filter(|(_, signal)| **signal != SignalType::NoOp)
            .map(|(asset, _)| asset)
            .collect();
        if active.is_empty() {
            return Ok(BTreeMap::new());
        }

        let slice = allocation / Decimal::from(active.len());
        let mut targets = BTreeMap::new();
        for asset in active {
            let currency = strategy.currency_of(asset).ok_or_else(|| {
                SimulationError::InvalidEvent(format!(
                    "signal for {asset} outside the universe of strategy {}",
                    strategy.name()
                ))
            })?;
            let bar = market
                .as_of(asset, date)
                .ok_or_else(|| SimulationError::MissingMarketData {
                    date,
                    asset: asset.clone(),
                })?;
            // The slice is in base currency; spendable cash is in the
            // asset's currency. Rates are units of quote per base.
            let local_slice = if currency == base {
                slice
            } else {
                let rate = fx
                    .as_of(currency, date)
                    .ok_or(SimulationError::MissingFxRate { date, currency })?;
                slice * rate
            };
            let target = (local_slice / bar.adj_close)
                .round_dp(QUANTIZE_SCALE)
                .floor()
                .to_i64()
                .ok_or_else(|| {
                    SimulationError::InvalidEvent(format!("target size for {asset} overflows"))
                })?;
            targets.insert(asset.clone(), target);
        }
        Ok(targets)
    }
}

/// Market orders at the bar's adjusted close.
pub struct CloseOrderPricer;

impl OrderPricer for CloseOrderPricer {
    fn price(
        &self,
        date: NaiveDate,
        asset: &str,
        _action: TradeAction,
        market: &MarketHistory,
    ) -> Result<(OrderType, Decimal, Decimal), SimulationError> {
        let bar = market
            .as_of(asset, date)
            .ok_or_else(|| SimulationError::MissingMarketData {
                date,
                asset: asset.to_string(),
            })?;
        Ok((OrderType::Market, bar.adj_close, Decimal::ZERO))
    }
}

/// Limit orders a fixed fraction inside the close: buys below it, sells
/// above it.
pub struct LimitOrderPricer {
    pub offset: Decimal,
}

impl LimitOrderPricer {
    pub fn new(offset: Decimal) -> Self {
        Self { offset }
    }
}

impl OrderPricer for LimitOrderPricer {
    fn price(
        &self,
        date: NaiveDate,
        asset: &str,
        action: TradeAction,
        market: &MarketHistory,
    ) -> Result<(OrderType, Decimal, Decimal), SimulationError> {
        let bar = market
            .as_of(asset, date)
            .ok_or_else(|| SimulationError::MissingMarketData {
                date,
                asset: asset.to_string(),
            })?;
        let limit = match action {
            TradeAction::Buy => bar.adj_close * (Decimal::ONE - self.offset),
            TradeAction::Sell => bar.adj_close * (Decimal::ONE + self.offset),
        };
        Ok((OrderType::Limit, limit, Decimal::ZERO))
    }
}
