use crate::application::tearsheet::{Tearsheet, TearsheetBuilder};
use crate::domain::events::{Event, MarketEvent};
use crate::domain::ports::MarketDataFetcher;
use crate::domain::trading::portfolio::Portfolio;
use crate::domain::types::CurrencyCode;
use anyhow::{Context, Result, ensure};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Drives a trading portfolio and its benchmark through the fetcher's
/// historical timeline, one bar at a time, and hands the resulting equity
/// curves to the tearsheet builder.
///
/// The two portfolios share nothing mutable, so each bar dispatches to
/// them concurrently; equity sampling happens only after both finish the
/// bar's synchronous phases.
pub struct Simulator {
    trading: Portfolio,
    benchmark: Portfolio,
    fetcher: Arc<dyn MarketDataFetcher>,
    cancel: Arc<AtomicBool>,
    tearsheet: TearsheetBuilder,
}

impl Simulator {
    pub fn new(
        trading: Portfolio,
        benchmark: Portfolio,
        fetcher: Arc<dyn MarketDataFetcher>,
    ) -> Self {
        Self {
            trading,
            benchmark,
            fetcher,
            cancel: Arc::new(AtomicBool::new(false)),
            tearsheet: TearsheetBuilder::new(),
        }
    }

    pub fn with_tearsheet_builder(mut self, builder: TearsheetBuilder) -> Self {
        self.tearsheet = builder;
        self
    }

    /// Flag checked at every bar boundary; setting it stops the run before
    /// the next bar starts, leaving both curves consistent.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn trading(&self) -> &Portfolio {
        &self.trading
    }

    pub fn benchmark(&self) -> &Portfolio {
        &self.benchmark
    }

    pub async fn run(&mut self, start: NaiveDate, end: NaiveDate) -> Result<Tearsheet> {
        let base = self.trading.base_currency();
        ensure!(
            self.benchmark.base_currency() == base,
            "trading and benchmark portfolios must share a base currency"
        );
        ensure!(start <= end, "start {start} is after end {end}");

        let assets: Vec<String> = self
            .trading
            .assets()
            .into_iter()
            .chain(self.benchmark.assets())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let quotes: Vec<CurrencyCode> = self
            .trading
            .foreign_currencies()
            .into_iter()
            .chain(self.benchmark.foreign_currencies())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        info!(
            assets = assets.len(),
            quotes = quotes.len(),
            %start,
            %end,
            "starting simulation"
        );

        // FX is small next to the price panel; materialize it up-front so
        // each bar's snapshot is a plain map lookup.
        let mut fx_by_date: BTreeMap<NaiveDate, BTreeMap<CurrencyCode, Decimal>> = BTreeMap::new();
        let mut fx_rx = self
            .fetcher
            .fetch_fx_rates(base, quotes)
            .await
            .context("opening FX rate stream")?;
        while let Some(item) = fx_rx.recv().await {
            let (date, rates) = item.context("FX rate stream failed")?;
            fx_by_date.insert(date, rates);
        }

        let mut price_rx = self
            .fetcher
            .fetch_market_data(assets)
            .await
            .context("opening market data stream")?;

        let mut bars = 0usize;
        while let Some(item) = price_rx.recv().await {
            if self.cancel.load(Ordering::Relaxed) {
                info!(bars, "cancellation requested, stopping at bar boundary");
                break;
            }
            let (date, prices) =
                item.with_context(|| format!("market data stream failed after {bars} bars"))?;
            if date < start {
                continue;
            }
            if date > end {
                break;
            }

            let fx = fx_by_date.get(&date).cloned().unwrap_or_default();
            let event = MarketEvent { date, prices, fx };

            let (trading_result, benchmark_result) = tokio::join!(
                self.trading.handle(Event::Market(event.clone())),
                self.benchmark.handle(Event::Market(event)),
            );
            trading_result.with_context(|| format!("trading portfolio failed on {date}"))?;
            benchmark_result.with_context(|| format!("benchmark portfolio failed on {date}"))?;

            self.trading
                .update_equity_curve(date)
                .with_context(|| format!("sampling trading equity on {date}"))?;
            self.benchmark
                .update_equity_curve(date)
                .with_context(|| format!("sampling benchmark equity on {date}"))?;
            bars += 1;
        }

        info!(bars, "simulation finished, building tearsheet");
        let tearsheet = self
            .tearsheet
            .build(self.trading.equity_curve(), self.benchmark.equity_curve())
            .context("building tearsheet")?;
        Ok(tearsheet)
    }
}
