use crate::domain::events::{FillEvent, MarketData, OrderEvent};
use crate::domain::types::CurrencyCode;
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tokio::sync::mpsc::{Receiver, Sender};

/// One date's cross-section of bars for the requested assets.
pub type MarketSlice = (NaiveDate, BTreeMap<String, MarketData>);

/// One date's FX snapshot: units of each quote currency per one unit of
/// the caller's base currency.
pub type FxSlice = (NaiveDate, BTreeMap<CurrencyCode, Decimal>);

/// Source of historical observations. Implementations deliver lazily
/// through a channel, strictly ascending by date; an `Err` item aborts
/// the simulation at that bar.
#[async_trait]
pub trait MarketDataFetcher: Send + Sync {
    async fn fetch_market_data(&self, assets: Vec<String>) -> Result<Receiver<Result<MarketSlice>>>;

    async fn fetch_fx_rates(
        &self,
        base: CurrencyCode,
        quotes: Vec<CurrencyCode>,
    ) -> Result<Receiver<Result<FxSlice>>>;
}

/// Order sink. `submit` returning `Ok(false)` is a soft reject; fills come
/// back asynchronously through the sink the portfolio registers, and are
/// drained on the portfolio's own dispatch context.
#[async_trait]
pub trait Brokerage: Send + Sync {
    fn register_fill_sink(&self, sink: Sender<FillEvent>);

    async fn submit(&self, order: OrderEvent) -> Result<bool>;
}
