use crate::domain::errors::SimulationError;
use crate::domain::events::MarketData;
use crate::domain::types::CurrencyCode;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Append-only, date-ordered store of market snapshots.
///
/// The portfolio engine appends one snapshot per bar; everything else only
/// reads. Lookups are "as of" a date: the most recent bar at or before the
/// requested date, which tolerates assets that skip trading days.
#[derive(Debug, Default, Clone)]
pub struct MarketHistory {
    bars: BTreeMap<NaiveDate, BTreeMap<String, MarketData>>,
}

impl MarketHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot. Dates must be strictly increasing.
    pub fn append(
        &mut self,
        date: NaiveDate,
        snapshot: BTreeMap<String, MarketData>,
    ) -> Result<(), SimulationError> {
        if let Some((&last, _)) = self.bars.last_key_value()
            && date <= last
        {
            return Err(SimulationError::OutOfOrderBar {
                last,
                incoming: date,
            });
        }
        self.bars.insert(date, snapshot);
        Ok(())
    }

    /// The most recent bar for `asset` at or before `date`.
    pub fn as_of(&self, asset: &str, date: NaiveDate) -> Option<&MarketData> {
        self.bars
            .range(..=date)
            .rev()
            .find_map(|(_, snapshot)| snapshot.get(asset))
    }

    /// The last `n` bars for `asset` up to and including `date`, oldest
    /// first. Used by lookback-style sizers.
    pub fn last_n(&self, asset: &str, date: NaiveDate, n: usize) -> Vec<&MarketData> {
        let mut window: Vec<&MarketData> = self
            .bars
            .range(..=date)
            .rev()
            .filter_map(|(_, snapshot)| snapshot.get(asset))
            .take(n)
            .collect();
        window.reverse();
        window
    }

    pub fn snapshot(&self, date: NaiveDate) -> Option<&BTreeMap<String, MarketData>> {
        self.bars.get(&date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last_key_value().map(|(&d, _)| d)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Retroactively restate every stored bar of `asset` for a split:
    /// prices divide by the ratio, volume multiplies. Mirrors how vendors
    /// restate adjusted-close series after a split.
    pub fn apply_split(&mut self, asset: &str, ratio: Decimal) {
        for snapshot in self.bars.values_mut() {
            if let Some(md) = snapshot.get_mut(asset) {
                md.open /= ratio;
                md.high /= ratio;
                md.low /= ratio;
                md.close /= ratio;
                md.adj_close /= ratio;
                md.volume *= ratio;
            }
        }
    }
}

/// Append-only, date-ordered store of FX snapshots.
///
/// A rate keyed by currency `c` is the number of units of `c` one unit of
/// the portfolio base currency buys on that date. Converting an amount of
/// `c` into base therefore divides by the rate.
#[derive(Debug, Default, Clone)]
pub struct FxHistory {
    rates: BTreeMap<NaiveDate, BTreeMap<CurrencyCode, Decimal>>,
}

impl FxHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rate snapshot (may be empty when no foreign assets trade).
    /// Dates must be strictly increasing.
    pub fn append(
        &mut self,
        date: NaiveDate,
        snapshot: BTreeMap<CurrencyCode, Decimal>,
    ) -> Result<(), SimulationError> {
        if let Some((&last, _)) = self.rates.last_key_value()
            && date <= last
        {
            return Err(SimulationError::OutOfOrderBar {
                last,
                incoming: date,
            });
        }
        self.rates.insert(date, snapshot);
        Ok(())
    }

    /// The most recent rate for `currency` at or before `date`.
    pub fn as_of(&self, currency: CurrencyCode, date: NaiveDate) -> Option<Decimal> {
        self.rates
            .range(..=date)
            .rev()
            .find_map(|(_, snapshot)| snapshot.get(&currency).copied())
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}
