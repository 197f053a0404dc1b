use crate::domain::events::{FillEvent, OrderEvent};
use crate::domain::ports::Brokerage;
use crate::domain::trading::fees::{FeeModel, PerShareFeeModel};
use crate::domain::types::{OrderType, TradeAction};
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::Sender;
use tracing::{debug, info, warn};

/// Brokerage that fills every accepted order immediately at its reference
/// price, charging whatever the fee model says. Fills go out through the
/// sink the portfolio registered, so they land on the portfolio's own
/// dispatch queue like a real broker callback would.
pub struct SimulatedBrokerage {
    sink: Mutex<Option<Sender<FillEvent>>>,
    fee_model: Arc<dyn FeeModel>,
    reject_all: bool,
}

impl SimulatedBrokerage {
    pub fn new(fee_model: Arc<dyn FeeModel>) -> Self {
        info!("simulated brokerage using {}", fee_model.description());
        Self {
            sink: Mutex::new(None),
            fee_model,
            reject_all: false,
        }
    }

    /// Zero-commission broker, the default for scenario tests.
    pub fn frictionless() -> Self {
        Self::new(Arc::new(PerShareFeeModel::free()))
    }

    /// Broker that rejects every submission. Exercises the soft-failure
    /// path: the simulation keeps running without the trades.
    pub fn rejecting() -> Self {
        Self {
            sink: Mutex::new(None),
            fee_model: Arc::new(PerShareFeeModel::free()),
            reject_all: true,
        }
    }

    fn reference_price(order: &OrderEvent) -> Decimal {
        match order.order_type {
            OrderType::Market | OrderType::Limit => order.primary_price,
            OrderType::Stop | OrderType::StopLimit => {
                if order.secondary_price > Decimal::ZERO {
                    order.secondary_price
                } else {
                    order.primary_price
                }
            }
        }
    }
}

#[async_trait]
impl Brokerage for SimulatedBrokerage {
    fn register_fill_sink(&self, sink: Sender<FillEvent>) {
        match self.sink.lock() {
            Ok(mut guard) => *guard = Some(sink),
            Err(_) => warn!("fill sink lock poisoned, sink not registered"),
        }
    }

    async fn submit(&self, order: OrderEvent) -> Result<bool> {
        if self.reject_all {
            info!(id = %order.id, asset = %order.asset, "rejecting order");
            return Ok(false);
        }

        let fill_price = Self::reference_price(&order);
        if fill_price <= Decimal::ZERO {
            warn!(id = %order.id, asset = %order.asset, "no positive reference price, rejecting");
            return Ok(false);
        }

        let sender = match self.sink.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => None,
        };
        let Some(sender) = sender else {
            warn!(id = %order.id, "no fill sink registered, rejecting order");
            return Ok(false);
        };

        let signed_quantity = match order.action {
            TradeAction::Buy => order.quantity,
            TradeAction::Sell => -order.quantity,
        };
        let fill = FillEvent {
            order_id: order.id,
            date: order.date,
            strategy: order.strategy.clone(),
            asset: order.asset.clone(),
            fill_price,
            quantity: signed_quantity,
            commission: self.fee_model.commission(order.quantity, fill_price),
        };
        debug!(
            id = %order.id,
            asset = %order.asset,
            price = %fill_price,
            quantity = signed_quantity,
            "order filled"
        );
        if sender.send(fill).await.is_err() {
            warn!(id = %order.id, "fill sink closed, order dropped");
            return Ok(false);
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    fn order(action: TradeAction, quantity: i64, price: Decimal) -> OrderEvent {
        OrderEvent {
            id: Uuid::new_v4(),
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            strategy: "core".to_string(),
            asset: "ACME".to_string(),
            action,
            order_type: OrderType::Market,
            quantity,
            primary_price: price,
            secondary_price: Decimal::ZERO,
        }
    }

    #[test]
    fn test_buy_fill_is_positive_and_sell_negative() {
        tokio_test::block_on(async {
            let broker = SimulatedBrokerage::frictionless();
            let (tx, mut rx) = mpsc::channel(8);
            broker.register_fill_sink(tx);

            assert!(broker.submit(order(TradeAction::Buy, 100, dec!(10))).await.unwrap());
            assert!(broker.submit(order(TradeAction::Sell, 40, dec!(11))).await.unwrap());

            let buy = rx.recv().await.unwrap();
            assert_eq!(buy.quantity, 100);
            assert_eq!(buy.fill_price, dec!(10));
            assert_eq!(buy.commission, Decimal::ZERO);

            let sell = rx.recv().await.unwrap();
            assert_eq!(sell.quantity, -40);
        });
    }

    #[test]
    fn test_commission_comes_from_fee_model() {
        tokio_test::block_on(async {
            let broker =
                SimulatedBrokerage::new(Arc::new(PerShareFeeModel::new(dec!(0.01), dec!(0))));
            let (tx, mut rx) = mpsc::channel(8);
            broker.register_fill_sink(tx);

            broker.submit(order(TradeAction::Buy, 200, dec!(5))).await.unwrap();
            let fill = rx.recv().await.unwrap();
            assert_eq!(fill.commission, dec!(2.00));
        });
    }

    #[test]
    fn test_rejecting_broker_never_fills() {
        tokio_test::block_on(async {
            let broker = SimulatedBrokerage::rejecting();
            let (tx, mut rx) = mpsc::channel(8);
            broker.register_fill_sink(tx);

            let accepted = broker.submit(order(TradeAction::Buy, 10, dec!(10))).await.unwrap();
            assert!(!accepted);
            assert!(rx.try_recv().is_err());
        });
    }

    #[test]
    fn test_unregistered_sink_soft_rejects() {
        tokio_test::block_on(async {
            let broker = SimulatedBrokerage::frictionless();
            let accepted = broker.submit(order(TradeAction::Buy, 10, dec!(10))).await.unwrap();
            assert!(!accepted);
        });
    }
}
