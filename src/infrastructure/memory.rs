use crate::domain::events::MarketData;
use crate::domain::ports::{FxSlice, MarketDataFetcher, MarketSlice};
use crate::domain::types::CurrencyCode;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tokio::sync::mpsc::{self, Receiver};
use tracing::info;

const STREAM_CAPACITY: usize = 64;

/// Fetcher backed by maps built up-front, streaming slices through a
/// channel in date order the way a vendor-backed implementation would.
/// `failing_after` turns it into a mid-stream outage for abort tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryMarketDataFetcher {
    bars: BTreeMap<NaiveDate, BTreeMap<String, MarketData>>,
    fx: BTreeMap<NaiveDate, BTreeMap<CurrencyCode, Decimal>>,
    fail_after: Option<usize>,
}

impl MemoryMarketDataFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bar(mut self, asset: impl Into<String>, bar: MarketData) -> Self {
        self.bars.entry(bar.date).or_default().insert(asset.into(), bar);
        self
    }

    pub fn with_fx_rate(mut self, date: NaiveDate, currency: CurrencyCode, rate: Decimal) -> Self {
        self.fx.entry(date).or_default().insert(currency, rate);
        self
    }

    /// Error out after streaming `count` price slices.
    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }
}

#[async_trait]
impl MarketDataFetcher for MemoryMarketDataFetcher {
    async fn fetch_market_data(&self, assets: Vec<String>) -> Result<Receiver<Result<MarketSlice>>> {
        let slices: Vec<MarketSlice> = self
            .bars
            .iter()
            .map(|(&date, snapshot)| {
                let filtered: BTreeMap<String, MarketData> = snapshot
                    .iter()
                    .filter(|(asset, _)| assets.contains(asset))
                    .map(|(asset, bar)| (asset.clone(), bar.clone()))
                    .collect();
                (date, filtered)
            })
            .filter(|(_, snapshot)| !snapshot.is_empty())
            .collect();
        info!(slices = slices.len(), assets = assets.len(), "streaming market data");

        let fail_after = self.fail_after;
        let (tx, rx) = mpsc::channel(STREAM_CAPACITY);
        tokio::spawn(async move {
            for (index, slice) in slices.into_iter().enumerate() {
                if fail_after == Some(index) {
                    let _ = tx.send(Err(anyhow!("market data feed interrupted"))).await;
                    return;
                }
                if tx.send(Ok(slice)).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }

    async fn fetch_fx_rates(
        &self,
        _base: CurrencyCode,
        quotes: Vec<CurrencyCode>,
    ) -> Result<Receiver<Result<FxSlice>>> {
        let slices: Vec<FxSlice> = self
            .fx
            .iter()
            .map(|(&date, snapshot)| {
                let filtered: BTreeMap<CurrencyCode, Decimal> = snapshot
                    .iter()
                    .filter(|(currency, _)| quotes.contains(currency))
                    .map(|(&currency, &rate)| (currency, rate))
                    .collect();
                (date, filtered)
            })
            .filter(|(_, snapshot)| !snapshot.is_empty())
            .collect();

        let (tx, rx) = mpsc::channel(STREAM_CAPACITY);
        tokio::spawn(async move {
            for slice in slices {
                if tx.send(Ok(slice)).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }
}
