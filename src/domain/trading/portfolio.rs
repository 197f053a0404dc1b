use crate::domain::errors::SimulationError;
use crate::domain::events::{
    DividendEvent, Event, FillEvent, MarketEvent, OrderEvent, SignalEvent, SplitEvent,
};
use crate::domain::market::{FxHistory, MarketHistory};
use crate::domain::ports::Brokerage;
use crate::domain::trading::allocation::CapitalAllocator;
use crate::domain::trading::strategy::Strategy;
use crate::domain::types::{CurrencyCode, TradeAction};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver, error::TryRecvError};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What happens to the fractional share a split leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplitRounding {
    /// Drop the fraction. Biases value down by less than one post-split
    /// share per split.
    #[default]
    DiscardFraction,
    /// Credit the fraction's value to the strategy's cash in the asset
    /// currency, at the post-split adjusted close.
    CreditCash,
}

const FILL_QUEUE_CAPACITY: usize = 1024;

/// The central state machine. Owns its strategies, its historical market
/// and FX maps, and its equity curve; drives the fixed intra-bar sequence
/// market → splits → dividends → allocation → signals → orders, and drains
/// broker fills before each equity sample.
pub struct Portfolio {
    base_currency: CurrencyCode,
    strategies: Vec<Strategy>,
    allocator: Box<dyn CapitalAllocator>,
    broker: Arc<dyn Brokerage>,
    market_history: MarketHistory,
    fx_history: FxHistory,
    equity_curve: BTreeMap<NaiveDate, Decimal>,
    allocations: BTreeMap<String, Decimal>,
    fills: Receiver<FillEvent>,
    split_rounding: SplitRounding,
    started: bool,
}

impl Portfolio {
    pub fn new(
        base_currency: CurrencyCode,
        allocator: Box<dyn CapitalAllocator>,
        broker: Arc<dyn Brokerage>,
    ) -> Self {
        let (fill_tx, fill_rx) = mpsc::channel(FILL_QUEUE_CAPACITY);
        broker.register_fill_sink(fill_tx);
        Self {
            base_currency,
            strategies: Vec::new(),
            allocator,
            broker,
            market_history: MarketHistory::new(),
            fx_history: FxHistory::new(),
            equity_curve: BTreeMap::new(),
            allocations: BTreeMap::new(),
            fills: fill_rx,
            split_rounding: SplitRounding::default(),
            started: false,
        }
    }

    pub fn with_split_rounding(mut self, rounding: SplitRounding) -> Self {
        self.split_rounding = rounding;
        self
    }

    /// Register a strategy. Only legal before the first market event.
    pub fn add_strategy(&mut self, strategy: Strategy) -> Result<(), SimulationError> {
        if self.started {
            return Err(SimulationError::InvalidEvent(format!(
                "strategy {} added after the first market event",
                strategy.name()
            )));
        }
        if self.strategies.iter().any(|s| s.name() == strategy.name()) {
            return Err(SimulationError::InvalidEvent(format!(
                "duplicate strategy name {}",
                strategy.name()
            )));
        }
        self.strategies.push(strategy);
        Ok(())
    }

    pub fn base_currency(&self) -> CurrencyCode {
        self.base_currency
    }

    pub fn equity_curve(&self) -> &BTreeMap<NaiveDate, Decimal> {
        &self.equity_curve
    }

    pub fn strategy(&self, name: &str) -> Option<&Strategy> {
        self.strategies.iter().find(|s| s.name() == name)
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    pub fn market_history(&self) -> &MarketHistory {
        &self.market_history
    }

    pub fn fx_history(&self) -> &FxHistory {
        &self.fx_history
    }

    /// Union of every strategy's asset universe.
    pub fn assets(&self) -> BTreeSet<String> {
        self.strategies
            .iter()
            .flat_map(|s| s.assets().keys().cloned())
            .collect()
    }

    /// Every non-base currency any strategy can hold.
    pub fn foreign_currencies(&self) -> BTreeSet<CurrencyCode> {
        self.strategies
            .iter()
            .flat_map(|s| s.assets().values().copied())
            .filter(|c| *c != self.base_currency)
            .collect()
    }

    /// Dispatch one event. Market events open a new bar; the remaining
    /// variants are normally synthesized internally in the fixed intra-bar
    /// order, so an externally injected one must belong to the bar in
    /// progress.
    pub async fn handle(&mut self, event: Event) -> Result<(), SimulationError> {
        event.validate()?;
        match event {
            Event::Market(ev) => self.on_market(ev).await,
            Event::Signal(ev) => {
                self.ensure_current_bar(ev.date, "signal")?;
                self.on_signal(ev).await
            }
            Event::Order(ev) => {
                self.ensure_current_bar(ev.date, "order")?;
                self.on_order(ev).await
            }
            Event::Fill(ev) => {
                self.ensure_current_bar(ev.date, "fill")?;
                self.on_fill(ev)
            }
            Event::Split(ev) => {
                self.ensure_current_bar(ev.date, "split")?;
                self.on_split(&ev)
            }
            Event::Dividend(ev) => {
                self.ensure_current_bar(ev.date, "dividend")?;
                self.on_dividend(&ev)
            }
        }
    }

    /// Drain pending fills, mark every strategy to market, and append the
    /// total under `date`. Dates must be strictly increasing.
    pub fn update_equity_curve(&mut self, date: NaiveDate) -> Result<Decimal, SimulationError> {
        self.drain_fills()?;
        let mut total = Decimal::ZERO;
        for strategy in &self.strategies {
            total += strategy.compute_total_value(
                date,
                self.base_currency,
                &self.market_history,
                &self.fx_history,
            )?;
        }
        if let Some((&last, _)) = self.equity_curve.last_key_value()
            && date <= last
        {
            return Err(SimulationError::OutOfOrderBar {
                last,
                incoming: date,
            });
        }
        self.equity_curve.insert(date, total);
        debug!(%date, equity = %total, "equity curve updated");
        Ok(total)
    }

    fn ensure_current_bar(
        &self,
        date: NaiveDate,
        kind: &'static str,
    ) -> Result<(), SimulationError> {
        if self.market_history.last_date() != Some(date) {
            return Err(SimulationError::UnsupportedEvent {
                date,
                kind,
                reason: "event does not belong to the bar in progress".to_string(),
            });
        }
        Ok(())
    }

    async fn on_market(&mut self, event: MarketEvent) -> Result<(), SimulationError> {
        debug!(date = %event.date, assets = event.prices.len(), "dispatching market event");
        self.market_history.append(event.date, event.prices.clone())?;
        self.fx_history.append(event.date, event.fx.clone())?;
        self.started = true;

        // All splits before any dividend, so dividend cash accrues on
        // post-split share counts.
        for (asset, bar) in &event.prices {
            if bar.split_coefficient != Decimal::ONE {
                let split = SplitEvent {
                    date: event.date,
                    asset: asset.clone(),
                    ratio: bar.split_coefficient,
                };
                split.validate()?;
                self.on_split(&split)?;
            }
        }
        for (asset, bar) in &event.prices {
            if bar.dividend_per_share > Decimal::ZERO {
                let dividend = DividendEvent {
                    date: event.date,
                    asset: asset.clone(),
                    per_share: bar.dividend_per_share,
                };
                dividend.validate()?;
                self.on_dividend(&dividend)?;
            }
        }

        // Allocation runs once per bar, before any sizer sees a signal.
        self.allocations = self.allocator.allocate(
            event.date,
            self.base_currency,
            &self.strategies,
            &self.market_history,
            &self.fx_history,
        )?;

        for index in 0..self.strategies.len() {
            let signal = self.strategies[index].generate_signals(
                event.date,
                self.base_currency,
                &self.market_history,
                &self.fx_history,
            );
            signal.validate()?;
            self.on_signal(signal).await?;
        }
        Ok(())
    }

    async fn on_signal(&mut self, event: SignalEvent) -> Result<(), SimulationError> {
        let index = self
            .strategies
            .iter()
            .position(|s| s.name() == event.strategy)
            .ok_or_else(|| SimulationError::UnknownStrategy {
                date: event.date,
                name: event.strategy.clone(),
            })?;

        let strategy = &self.strategies[index];
        let allocation = self
            .allocations
            .get(strategy.name())
            .copied()
            .unwrap_or(Decimal::ZERO);
        let targets = strategy.sizer.target_positions(
            event.date,
            self.base_currency,
            &event.signals,
            strategy,
            allocation,
            &self.market_history,
            &self.fx_history,
        )?;

        let mut orders = Vec::new();
        for (asset, target) in targets {
            let current = strategy.position(&asset);
            let delta = target - current;
            if delta == 0 {
                continue;
            }
            let action = if delta > 0 {
                TradeAction::Buy
            } else {
                TradeAction::Sell
            };
            let (order_type, primary, secondary) =
                strategy
                    .pricer
                    .price(event.date, &asset, action, &self.market_history)?;
            orders.push(OrderEvent {
                id: Uuid::new_v4(),
                date: event.date,
                strategy: event.strategy.clone(),
                asset,
                action,
                order_type,
                quantity: delta.unsigned_abs() as i64,
                primary_price: primary,
                secondary_price: secondary,
            });
        }

        for order in orders {
            order.validate()?;
            self.on_order(order).await?;
        }
        Ok(())
    }

    /// Submission failures are soft: real brokers reject orders and the
    /// simulation keeps going without the trade.
    async fn on_order(&self, order: OrderEvent) -> Result<(), SimulationError> {
        debug!(
            id = %order.id,
            asset = %order.asset,
            action = %order.action,
            quantity = order.quantity,
            "submitting order"
        );
        match self.broker.submit(order.clone()).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(id = %order.id, asset = %order.asset, "order rejected by brokerage");
            }
            Err(error) => {
                warn!(id = %order.id, asset = %order.asset, %error, "order submission failed");
            }
        }
        Ok(())
    }

    fn on_fill(&mut self, fill: FillEvent) -> Result<(), SimulationError> {
        let strategy = self
            .strategies
            .iter_mut()
            .find(|s| s.name() == fill.strategy)
            .ok_or_else(|| SimulationError::UnknownStrategy {
                date: fill.date,
                name: fill.strategy.clone(),
            })?;
        let currency =
            strategy
                .currency_of(&fill.asset)
                .ok_or_else(|| SimulationError::UnsupportedEvent {
                    date: fill.date,
                    kind: "fill",
                    reason: format!(
                        "asset {} is not in the universe of strategy {}",
                        fill.asset, fill.strategy
                    ),
                })?;

        *strategy.positions.entry(fill.asset.clone()).or_insert(0) += fill.quantity;
        let trade_value = fill.fill_price * Decimal::from(fill.quantity);
        *strategy.cash.entry(currency).or_insert(Decimal::ZERO) -=
            trade_value + fill.commission;
        debug!(
            strategy = %fill.strategy,
            asset = %fill.asset,
            quantity = fill.quantity,
            price = %fill.fill_price,
            "fill applied"
        );
        Ok(())
    }

    fn on_split(&mut self, split: &SplitEvent) -> Result<(), SimulationError> {
        info!(asset = %split.asset, ratio = %split.ratio, date = %split.date, "applying split");
        for strategy in &mut self.strategies {
            let Some(&current) = strategy.positions.get(&split.asset) else {
                continue;
            };
            if current == 0 {
                continue;
            }
            let scaled = Decimal::from(current) * split.ratio;
            let floored = scaled.floor();
            let adjusted = floored.to_i64().ok_or_else(|| {
                SimulationError::InvalidEvent(format!(
                    "split-adjusted position for {} overflows",
                    split.asset
                ))
            })?;

            if self.split_rounding == SplitRounding::CreditCash {
                let fraction = scaled - floored;
                if fraction > Decimal::ZERO
                    && let Some(bar) = self.market_history.as_of(&split.asset, split.date)
                    && let Some(currency) = strategy.currency_of(&split.asset)
                {
                    // The history is restated after this loop, so the
                    // post-split price is the stored close over the ratio.
                    let credit = fraction * (bar.adj_close / split.ratio);
                    *strategy.cash.entry(currency).or_insert(Decimal::ZERO) += credit;
                }
            }
            strategy.positions.insert(split.asset.clone(), adjusted);
        }
        self.market_history.apply_split(&split.asset, split.ratio);
        Ok(())
    }

    fn on_dividend(&mut self, dividend: &DividendEvent) -> Result<(), SimulationError> {
        for strategy in &mut self.strategies {
            let Some(&quantity) = strategy.positions.get(&dividend.asset) else {
                continue;
            };
            if quantity == 0 {
                continue;
            }
            let Some(currency) = strategy.currency_of(&dividend.asset) else {
                continue;
            };
            let amount = dividend.per_share * Decimal::from(quantity);
            *strategy.cash.entry(currency).or_insert(Decimal::ZERO) += amount;
            debug!(
                strategy = %strategy.name(),
                asset = %dividend.asset,
                %amount,
                "dividend accrued"
            );
        }
        Ok(())
    }

    fn drain_fills(&mut self) -> Result<(), SimulationError> {
        loop {
            match self.fills.try_recv() {
                Ok(fill) => {
                    fill.validate()?;
                    self.on_fill(fill)?;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        Ok(())
    }
}
