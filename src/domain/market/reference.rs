use crate::domain::types::CurrencyCode;
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// ISO 4217 numeric code and conventional symbol for a currency.
pub fn currency_details(code: CurrencyCode) -> (u16, &'static str) {
    match code {
        CurrencyCode::USD => (840, "$"),
        CurrencyCode::EUR => (978, "€"),
        CurrencyCode::GBP => (826, "£"),
        CurrencyCode::JPY => (392, "¥"),
        CurrencyCode::CHF => (756, "CHF"),
        CurrencyCode::CAD => (124, "C$"),
        CurrencyCode::AUD => (36, "A$"),
        CurrencyCode::NZD => (554, "NZ$"),
        CurrencyCode::SEK => (752, "kr"),
        CurrencyCode::NOK => (578, "kr"),
        CurrencyCode::DKK => (208, "kr"),
        CurrencyCode::HKD => (344, "HK$"),
        CurrencyCode::SGD => (702, "S$"),
        CurrencyCode::CNY => (156, "¥"),
        CurrencyCode::KRW => (410, "₩"),
        CurrencyCode::INR => (356, "₹"),
        CurrencyCode::BRL => (986, "R$"),
        CurrencyCode::MXN => (484, "$"),
        CurrencyCode::ZAR => (710, "R"),
        CurrencyCode::PLN => (985, "zł"),
    }
}

/// A listing venue with its holiday calendar. Consumed opaquely; the engine
/// itself never skips dates, it replays whatever the fetcher delivers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exchange {
    pub code: String,
    pub city: String,
    pub holidays: BTreeSet<NaiveDate>,
}

impl Exchange {
    pub fn new(code: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            city: city.into(),
            holidays: BTreeSet::new(),
        }
    }

    pub fn with_holidays(mut self, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.holidays.extend(holidays);
        self
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityListing {
    pub currency: CurrencyCode,
    pub exchange: Option<String>,
}

/// Immutable asset → currency (and optionally exchange) lookup, built once
/// by the caller from its reference master and shared read-only.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SecurityMaster {
    listings: BTreeMap<String, SecurityListing>,
}

impl SecurityMaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(
        mut self,
        asset: impl Into<String>,
        currency: CurrencyCode,
        exchange: Option<String>,
    ) -> Self {
        self.listings
            .insert(asset.into(), SecurityListing { currency, exchange });
        self
    }

    pub fn currency_of(&self, asset: &str) -> Option<CurrencyCode> {
        self.listings.get(asset).map(|l| l.currency)
    }

    pub fn listing(&self, asset: &str) -> Option<&SecurityListing> {
        self.listings.get(asset)
    }

    pub fn assets(&self) -> impl Iterator<Item = &str> {
        self.listings.keys().map(String::as_str)
    }
}
