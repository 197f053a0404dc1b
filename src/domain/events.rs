use crate::domain::errors::SimulationError;
use crate::domain::types::{CurrencyCode, OrderType, SignalType, TradeAction};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One bar of vendor data for a single asset.
///
/// `split_coefficient` of 1 means no split; `dividend_per_share` of 0 means
/// no distribution. Both are carried on the bar itself so the engine can
/// derive corporate-action events without a second data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub adj_close: Decimal,
    pub volume: Decimal,
    pub dividend_per_share: Decimal,
    pub split_coefficient: Decimal,
}

impl MarketData {
    pub fn validate(&self) -> Result<(), SimulationError> {
        for (label, px) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("adj_close", self.adj_close),
        ] {
            if px <= Decimal::ZERO {
                return Err(SimulationError::InvalidEvent(format!(
                    "{label} price {px} on {} must be positive",
                    self.date
                )));
            }
        }
        if self.volume < Decimal::ZERO {
            return Err(SimulationError::InvalidEvent(format!(
                "volume {} on {} must be non-negative",
                self.volume, self.date
            )));
        }
        if self.dividend_per_share < Decimal::ZERO {
            return Err(SimulationError::InvalidEvent(format!(
                "dividend per share {} on {} must be non-negative",
                self.dividend_per_share, self.date
            )));
        }
        if self.split_coefficient <= Decimal::ZERO {
            return Err(SimulationError::InvalidEvent(format!(
                "split coefficient {} on {} must be positive",
                self.split_coefficient, self.date
            )));
        }
        Ok(())
    }
}

/// A full cross-sectional snapshot for one date: every asset's bar plus the
/// FX rates needed to value non-base holdings on that date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketEvent {
    pub date: NaiveDate,
    pub prices: BTreeMap<String, MarketData>,
    pub fx: BTreeMap<CurrencyCode, Decimal>,
}

impl MarketEvent {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.prices.is_empty() {
            return Err(SimulationError::NullOrEmptyCollection {
                what: "market event price snapshot",
            });
        }
        for md in self.prices.values() {
            md.validate()?;
        }
        for (currency, rate) in &self.fx {
            if *rate <= Decimal::ZERO {
                return Err(SimulationError::InvalidEvent(format!(
                    "{currency} rate {rate} on {} must be positive",
                    self.date
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub date: NaiveDate,
    pub strategy: String,
    pub signals: BTreeMap<String, SignalType>,
}

impl SignalEvent {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.strategy.is_empty() {
            return Err(SimulationError::NullOrEmptyCollection {
                what: "signal event strategy name",
            });
        }
        Ok(())
    }
}

/// A request to trade `quantity` (always positive, the direction lives in
/// `action`) of one asset. `primary_price` is the limit/market reference
/// price, `secondary_price` the stop trigger where the order type needs one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub id: Uuid,
    pub date: NaiveDate,
    pub strategy: String,
    pub asset: String,
    pub action: TradeAction,
    pub order_type: OrderType,
    pub quantity: i64,
    pub primary_price: Decimal,
    pub secondary_price: Decimal,
}

impl OrderEvent {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.strategy.is_empty() || self.asset.is_empty() {
            return Err(SimulationError::NullOrEmptyCollection {
                what: "order event strategy/asset",
            });
        }
        if self.quantity <= 0 {
            return Err(SimulationError::InvalidQuantity {
                asset: self.asset.clone(),
                quantity: self.quantity,
            });
        }
        if self.primary_price < Decimal::ZERO || self.secondary_price < Decimal::ZERO {
            return Err(SimulationError::InvalidEvent(format!(
                "order prices for {} must be non-negative",
                self.asset
            )));
        }
        Ok(())
    }
}

/// An execution report. `quantity` is signed: positive for buys, negative
/// for sells, matching the direction of the originating order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillEvent {
    pub order_id: Uuid,
    pub date: NaiveDate,
    pub strategy: String,
    pub asset: String,
    pub fill_price: Decimal,
    pub quantity: i64,
    pub commission: Decimal,
}

impl FillEvent {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.strategy.is_empty() || self.asset.is_empty() {
            return Err(SimulationError::NullOrEmptyCollection {
                what: "fill event strategy/asset",
            });
        }
        if self.quantity == 0 {
            return Err(SimulationError::InvalidQuantity {
                asset: self.asset.clone(),
                quantity: self.quantity,
            });
        }
        if self.fill_price <= Decimal::ZERO {
            return Err(SimulationError::InvalidEvent(format!(
                "fill price {} for {} must be positive",
                self.fill_price, self.asset
            )));
        }
        if self.commission < Decimal::ZERO {
            return Err(SimulationError::InvalidEvent(format!(
                "commission {} for {} must be non-negative",
                self.commission, self.asset
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitEvent {
    pub date: NaiveDate,
    pub asset: String,
    pub ratio: Decimal,
}

impl SplitEvent {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.ratio <= Decimal::ZERO || self.ratio == Decimal::ONE {
            return Err(SimulationError::InvalidEvent(format!(
                "split ratio {} for {} must be positive and not 1",
                self.ratio, self.asset
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendEvent {
    pub date: NaiveDate,
    pub asset: String,
    pub per_share: Decimal,
}

impl DividendEvent {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.per_share <= Decimal::ZERO {
            return Err(SimulationError::InvalidEvent(format!(
                "dividend per share {} for {} must be positive",
                self.per_share, self.asset
            )));
        }
        Ok(())
    }
}

/// Closed union over everything the dispatcher understands. Dispatch is a
/// total match: adding a variant forces every consumer to handle it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Market(MarketEvent),
    Signal(SignalEvent),
    Order(OrderEvent),
    Fill(FillEvent),
    Split(SplitEvent),
    Dividend(DividendEvent),
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Market(_) => "market",
            Event::Signal(_) => "signal",
            Event::Order(_) => "order",
            Event::Fill(_) => "fill",
            Event::Split(_) => "split",
            Event::Dividend(_) => "dividend",
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            Event::Market(e) => e.date,
            Event::Signal(e) => e.date,
            Event::Order(e) => e.date,
            Event::Fill(e) => e.date,
            Event::Split(e) => e.date,
            Event::Dividend(e) => e.date,
        }
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        match self {
            Event::Market(e) => e.validate(),
            Event::Signal(e) => e.validate(),
            Event::Order(e) => e.validate(),
            Event::Fill(e) => e.validate(),
            Event::Split(e) => e.validate(),
            Event::Dividend(e) => e.validate(),
        }
    }
}

impl From<MarketEvent> for Event {
    fn from(e: MarketEvent) -> Self {
        Event::Market(e)
    }
}

impl From<FillEvent> for Event {
    fn from(e: FillEvent) -> Self {
        Event::Fill(e)
    }
}

impl From<DividendEvent> for Event {
    fn from(e: DividendEvent) -> Self {
        Event::Dividend(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

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

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn test_market_data_rejects_non_positive_price() {
        let mut md = bar(d(2), dec!(10));
        md.low = Decimal::ZERO;
        assert!(md.validate().is_err());
    }

    #[test]
    fn test_market_event_rejects_empty_snapshot() {
        let ev = MarketEvent {
            date: d(2),
            prices: BTreeMap::new(),
            fx: BTreeMap::new(),
        };
        let err = ev.validate().unwrap_err();
        assert!(matches!(err, SimulationError::NullOrEmptyCollection { .. }));
    }

    #[test]
    fn test_order_event_rejects_zero_quantity() {
        let order = OrderEvent {
            id: Uuid::new_v4(),
            date: d(2),
            strategy: "core".to_string(),
            asset: "ACME".to_string(),
            action: TradeAction::Buy,
            order_type: OrderType::Market,
            quantity: 0,
            primary_price: dec!(10),
            secondary_price: Decimal::ZERO,
        };
        let err = order.validate().unwrap_err();
        assert!(matches!(err, SimulationError::InvalidQuantity { quantity: 0, .. }));
    }

    #[test]
    fn test_split_event_rejects_no_op_ratio() {
        let split = SplitEvent {
            date: d(2),
            asset: "ACME".to_string(),
            ratio: Decimal::ONE,
        };
        assert!(split.validate().is_err());
    }

    #[test]
    fn test_event_kind_and_date() {
        let ev: Event = MarketEvent {
            date: d(3),
            prices: BTreeMap::from([("ACME".to_string(), bar(d(3), dec!(12)))]),
            fx: BTreeMap::new(),
        }
        .into();
        assert_eq!(ev.kind(), "market");
        assert_eq!(ev.date(), d(3));
        assert!(ev.validate().is_ok());
    }

    #[test]
    fn test_event_serde_round_trip() {
        let ev: Event = DividendEvent {
            date: d(5),
            asset: "ACME".to_string(),
            per_share: dec!(0.5),
        }
        .into();
        let json = serde_json::to_string(&ev).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(ev, back);
    }
}
