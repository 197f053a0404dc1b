use crate::domain::errors::SimulationError;
use crate::domain::events::SignalEvent;
use crate::domain::market::{FxHistory, MarketHistory};
use crate::domain::trading::sizing::{OrderPricer, PositionSizer};
use crate::domain::types::{CurrencyCode, RebalancingFrequency, SignalType};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Converts an amount of `currency` into the base currency.
///
/// Rates are quoted as units of `currency` per one unit of base, so the
/// conversion divides. Base-currency amounts pass through without needing
/// a rate at all.
pub fn convert_to_base(
    amount: Decimal,
    currency: CurrencyCode,
    base: CurrencyCode,
    date: NaiveDate,
    fx: &FxHistory,
) -> Result<Decimal, SimulationError> {
    if currency == base {
        return Ok(amount);
    }
    let rate = fx
        .as_of(currency, date)
        .ok_or(SimulationError::MissingFxRate { date, currency })?;
    Ok(amount / rate)
}

/// Decides what a strategy wants to signal on a bar. Stateful: rebalancing
/// models track their own schedule.
pub trait SignalModel: Send + Sync {
    fn generate(
        &mut self,
        date: NaiveDate,
        base: CurrencyCode,
        assets: &BTreeMap<String, CurrencyCode>,
        market: &MarketHistory,
        fx: &FxHistory,
    ) -> BTreeMap<String, SignalType>;
}

/// Takes a target position in every asset on the first bar at or after the
/// configured start date, then stays silent. The sizer decides the sizes.
pub struct BuyAndHold {
    initial_date: NaiveDate,
    entered: bool,
}

impl BuyAndHold {
    pub fn new(initial_date: NaiveDate) -> Self {
        Self {
            initial_date,
            entered: false,
        }
    }
}

impl SignalModel for BuyAndHold {
    fn generate(
        &mut self,
        date: NaiveDate,
        _base: CurrencyCode,
        assets: &BTreeMap<String, CurrencyCode>,
        _market: &MarketHistory,
        _fx: &FxHistory,
    ) -> BTreeMap<String, SignalType> {
        if self.entered || date < self.initial_date {
            return BTreeMap::new();
        }
        self.entered = true;
        assets
            .keys()
            .map(|asset| (asset.clone(), SignalType::Underweight))
            .collect()
    }
}

/// Buy-and-hold that resets to target weights on a fixed schedule. The
/// first bar always rebalances; thereafter a rebalance fires once the
/// current date reaches the next scheduled date.
pub struct RebalancingBuyAndHold {
    frequency: RebalancingFrequency,
    last_rebalance: Option<NaiveDate>,
}

impl RebalancingBuyAndHold {
    pub fn new(frequency: RebalancingFrequency) -> Self {
        Self {
            frequency,
            last_rebalance: None,
        }
    }

    pub fn last_rebalance(&self) -> Option<NaiveDate> {
        self.last_rebalance
    }
}

impl SignalModel for RebalancingBuyAndHold {
    fn generate(
        &mut self,
        date: NaiveDate,
        _base: CurrencyCode,
        assets: &BTreeMap<String, CurrencyCode>,
        _market: &MarketHistory,
        _fx: &FxHistory,
    ) -> BTreeMap<String, SignalType> {
        let due = match self.last_rebalance {
            None => true,
            Some(last) => date >= self.frequency.next_after(last),
        };
        if !due {
            return BTreeMap::new();
        }
        self.last_rebalance = Some(date);
        assets
            .keys()
            .map(|asset| (asset.clone(), SignalType::Rebalance))
            .collect()
    }
}

/// Per-strategy trading state: the asset universe with its currencies,
/// signed positions, multi-currency cash, and the pluggable signal/sizing
/// /pricing seams. Only the portfolio engine mutates positions and cash.
pub struct Strategy {
    name: String,
    assets: BTreeMap<String, CurrencyCode>,
    pub(crate) positions: BTreeMap<String, i64>,
    pub(crate) cash: BTreeMap<CurrencyCode, Decimal>,
    pub(crate) sizer: Box<dyn PositionSizer>,
    pub(crate) pricer: Box<dyn OrderPricer>,
    signal_model: Box<dyn SignalModel>,
}

impl Strategy {
    pub fn new(
        name: impl Into<String>,
        assets: BTreeMap<String, CurrencyCode>,
        initial_cash: BTreeMap<CurrencyCode, Decimal>,
        signal_model: Box<dyn SignalModel>,
        sizer: Box<dyn PositionSizer>,
        pricer: Box<dyn OrderPricer>,
    ) -> Result<Self, SimulationError> {
        let name = name.into();
        if name.is_empty() {
            return Err(SimulationError::NullOrEmptyCollection {
                what: "strategy name",
            });
        }
        if assets.is_empty() {
            return Err(SimulationError::NullOrEmptyCollection {
                what: "strategy asset universe",
            });
        }
        // Every referenced currency gets a cash bucket, even if unfunded.
        let mut cash = initial_cash;
        for &currency in assets.values() {
            cash.entry(currency).or_insert(Decimal::ZERO);
        }
        Ok(Self {
            name,
            assets,
            positions: BTreeMap::new(),
            cash,
            sizer,
            pricer,
            signal_model,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn assets(&self) -> &BTreeMap<String, CurrencyCode> {
        &self.assets
    }

    pub fn currency_of(&self, asset: &str) -> Option<CurrencyCode> {
        self.assets.get(asset).copied()
    }

    pub fn position(&self, asset: &str) -> i64 {
        self.positions.get(asset).copied().unwrap_or(0)
    }

    pub fn positions(&self) -> &BTreeMap<String, i64> {
        &self.positions
    }

    pub fn cash_balance(&self, currency: CurrencyCode) -> Decimal {
        self.cash.get(&currency).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn cash(&self) -> &BTreeMap<CurrencyCode, Decimal> {
        &self.cash
    }

    pub(crate) fn generate_signals(
        &mut self,
        date: NaiveDate,
        base: CurrencyCode,
        market: &MarketHistory,
        fx: &FxHistory,
    ) -> SignalEvent {
        let signals = self
            .signal_model
            .generate(date, base, &self.assets, market, fx);
        SignalEvent {
            date,
            strategy: self.name.clone(),
            signals,
        }
    }

    /// Mark-to-market value in the base currency: every non-flat position
    /// at its as-of adjusted close plus every non-zero cash bucket, each
    /// converted through the FX history for `date`.
    pub fn compute_total_value(
        &self,
        date: NaiveDate,
        base: CurrencyCode,
        market: &MarketHistory,
        fx: &FxHistory,
    ) -> Result<Decimal, SimulationError> {
        let mut total = Decimal::ZERO;
        for (asset, &quantity) in &self.positions {
            if quantity == 0 {
                continue;
            }
            let bar = market
                .as_of(asset, date)
                .ok_or_else(|| SimulationError::MissingMarketData {
                    date,
                    asset: asset.clone(),
                })?;
            let currency =
                self.currency_of(asset)
                    .ok_or_else(|| SimulationError::MissingMarketData {
                        date,
                        asset: asset.clone(),
                    })?;
            let local = bar.adj_close * Decimal::from(quantity);
            total += convert_to_base(local, currency, base, date, fx)?;
        }
        for (&currency, &amount) in &self.cash {
            if amount.is_zero() {
                continue;
            }
            total += convert_to_base(amount, currency, base, date, fx)?;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::MarketData;
    use crate::domain::trading::sizing::{CloseOrderPricer, EqualWeightSizer};
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn bar(date: NaiveDate, close: Decimal) -> MarketData {
        MarketData {
            date,
            open: close,
            high: close,
            low: close,
            close,
            adj_close: close,
            volume: dec!(1000),
            dividend_per_share: Decimal::ZERO,
            split_coefficient: Decimal::ONE,
        }
    }

    fn strategy(assets: BTreeMap<String, CurrencyCode>) -> Strategy {
        Strategy::new(
            "core",
            assets,
            BTreeMap::new(),
            Box::new(BuyAndHold::new(d(2))),
            Box::new(EqualWeightSizer),
            Box::new(CloseOrderPricer),
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_empty_name_and_universe() {
        let assets = BTreeMap::from([("ACME".to_string(), CurrencyCode::USD)]);
        assert!(
            Strategy::new(
                "",
                assets,
                BTreeMap::new(),
                Box::new(BuyAndHold::new(d(2))),
                Box::new(EqualWeightSizer),
                Box::new(CloseOrderPricer),
            )
            .is_err()
        );
        assert!(
            Strategy::new(
                "core",
                BTreeMap::new(),
                BTreeMap::new(),
                Box::new(BuyAndHold::new(d(2))),
                Box::new(EqualWeightSizer),
                Box::new(CloseOrderPricer),
            )
            .is_err()
        );
    }

    #[test]
    fn test_buy_and_hold_signals_once() {
        let assets = BTreeMap::from([
            ("ACME".to_string(), CurrencyCode::USD),
            ("BAVA".to_string(), CurrencyCode::EUR),
        ]);
        let mut model = BuyAndHold::new(d(2));
        let market = MarketHistory::new();
        let fx = FxHistory::new();

        // Before the start date: nothing.
        assert!(
            model
                .generate(d(1), CurrencyCode::USD, &assets, &market, &fx)
                .is_empty()
        );
        let first = model.generate(d(2), CurrencyCode::USD, &assets, &market, &fx);
        assert_eq!(first.len(), 2);
        assert!(first.values().all(|s| *s == SignalType::Underweight));
        // And never again.
        assert!(
            model
                .generate(d(3), CurrencyCode::USD, &assets, &market, &fx)
                .is_empty()
        );
    }

    #[test]
    fn test_rebalancing_fires_on_schedule() {
        let assets = BTreeMap::from([("ACME".to_string(), CurrencyCode::USD)]);
        let market = MarketHistory::new();
        let fx = FxHistory::new();
        let mut model = RebalancingBuyAndHold::new(RebalancingFrequency::Weekly);

        // First bar always rebalances.
        assert!(
            !model
                .generate(d(2), CurrencyCode::USD, &assets, &market, &fx)
                .is_empty()
        );
        assert_eq!(model.last_rebalance(), Some(d(2)));
        // Mid-week: quiet.
        assert!(
            model
                .generate(d(5), CurrencyCode::USD, &assets, &market, &fx)
                .is_empty()
        );
        // A week later: fires and advances the marker.
        let signals = model.generate(d(9), CurrencyCode::USD, &assets, &market, &fx);
        assert_eq!(
            signals.get("ACME").copied(),
            Some(SignalType::Rebalance)
        );
        assert_eq!(model.last_rebalance(), Some(d(9)));
    }

    #[test]
    fn test_total_value_converts_foreign_holdings() {
        let assets = BTreeMap::from([("BAVA".to_string(), CurrencyCode::EUR)]);
        let mut strategy = strategy(assets);
        strategy.positions.insert("BAVA".to_string(), 10);

        let mut market = MarketHistory::new();
        market
            .append(
                d(2),
                BTreeMap::from([("BAVA".to_string(), bar(d(2), dec!(20)))]),
            )
            .unwrap();
        let mut fx = FxHistory::new();
        fx.append(d(2), BTreeMap::from([(CurrencyCode::EUR, dec!(0.9))]))
            .unwrap();

        // 10 shares x 20 EUR = 200 EUR; at 0.9 EUR per USD that is 222.22 USD.
        let value = strategy
            .compute_total_value(d(2), CurrencyCode::USD, &market, &fx)
            .unwrap();
        assert!((value - dec!(222.2222222222)).abs() < dec!(0.0000000001));
    }

    #[test]
    fn test_total_value_requires_fx_for_foreign_cash() {
        let assets = BTreeMap::from([("BAVA".to_string(), CurrencyCode::EUR)]);
        let mut strategy = strategy(assets);
        strategy.cash.insert(CurrencyCode::EUR, dec!(100));

        let mut market = MarketHistory::new();
        market
            .append(
                d(2),
                BTreeMap::from([("BAVA".to_string(), bar(d(2), dec!(20)))]),
            )
            .unwrap();
        let fx = FxHistory::new();

        let err = strategy
            .compute_total_value(d(2), CurrencyCode::USD, &market, &fx)
            .unwrap_err();
        assert!(matches!(
            err,
            SimulationError::MissingFxRate {
                currency: CurrencyCode::EUR,
                ..
            }
        ));
    }

    #[test]
    fn test_total_value_ignores_flat_positions_and_empty_cash() {
        let assets = BTreeMap::from([("BAVA".to_string(), CurrencyCode::EUR)]);
        let mut strategy = strategy(assets);
        strategy.positions.insert("BAVA".to_string(), 0);
        strategy.cash.insert(CurrencyCode::USD, dec!(1000));

        // No market data and no FX needed: flat position and zero EUR cash.
        let value = strategy
            .compute_total_value(d(2), CurrencyCode::USD, &MarketHistory::new(), &FxHistory::new())
            .unwrap();
        assert_eq!(value, dec!(1000));
    }
}
