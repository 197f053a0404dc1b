use crate::domain::errors::SimulationError;
use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of signal a strategy emits for an asset on a given bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalType {
    Underweight,
    Overweight,
    Rebalance,
    NoOp,
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalType::Underweight => write!(f, "UNDERWEIGHT"),
            SignalType::Overweight => write!(f, "OVERWEIGHT"),
            SignalType::Rebalance => write!(f, "REBALANCE"),
            SignalType::NoOp => write!(f, "NOOP"),
        }
    }
}

impl FromStr for SignalType {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "UNDERWEIGHT" => Ok(SignalType::Underweight),
            "OVERWEIGHT" => Ok(SignalType::Overweight),
            "REBALANCE" => Ok(SignalType::Rebalance),
            "NOOP" => Ok(SignalType::NoOp),
            _ => Err(SimulationError::UndefinedEnum {
                kind: "SignalType",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeAction {
    Buy,
    Sell,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "BUY"),
            TradeAction::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for TradeAction {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BUY" => Ok(TradeAction::Buy),
            "SELL" => Ok(TradeAction::Sell),
            _ => Err(SimulationError::UndefinedEnum {
                kind: "TradeAction",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
            OrderType::Limit => write!(f, "LIMIT"),
            OrderType::Stop => write!(f, "STOP"),
            OrderType::StopLimit => write!(f, "STOP_LIMIT"),
        }
    }
}

impl FromStr for OrderType {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MARKET" => Ok(OrderType::Market),
            "LIMIT" => Ok(OrderType::Limit),
            "STOP" => Ok(OrderType::Stop),
            "STOP_LIMIT" | "STOPLIMIT" => Ok(OrderType::StopLimit),
            _ => Err(SimulationError::UndefinedEnum {
                kind: "OrderType",
                value: s.to_string(),
            }),
        }
    }
}

/// How often a rebalancing strategy resets its holdings to target weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RebalancingFrequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Annually,
}

impl RebalancingFrequency {
    /// Next scheduled rebalance date strictly after `from`.
    pub fn next_after(&self, from: NaiveDate) -> NaiveDate {
        match self {
            RebalancingFrequency::Daily => from + Days::new(1),
            RebalancingFrequency::Weekly => from + Days::new(7),
            RebalancingFrequency::Monthly => from + Months::new(1),
            RebalancingFrequency::Quarterly => from + Months::new(3),
            RebalancingFrequency::Annually => from + Months::new(12),
        }
    }
}

impl FromStr for RebalancingFrequency {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DAILY" => Ok(RebalancingFrequency::Daily),
            "WEEKLY" => Ok(RebalancingFrequency::Weekly),
            "MONTHLY" => Ok(RebalancingFrequency::Monthly),
            "QUARTERLY" => Ok(RebalancingFrequency::Quarterly),
            "ANNUALLY" => Ok(RebalancingFrequency::Annually),
            _ => Err(SimulationError::UndefinedEnum {
                kind: "RebalancingFrequency",
                value: s.to_string(),
            }),
        }
    }
}

/// ISO 4217 currency codes. Closed set: adding a market means adding a variant.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CurrencyCode {
    USD,
    EUR,
    GBP,
    JPY,
    CHF,
    CAD,
    AUD,
    NZD,
    SEK,
    NOK,
    DKK,
    HKD,
    SGD,
    CNY,
    KRW,
    INR,
    BRL,
    MXN,
    ZAR,
    PLN,
}

impl CurrencyCode {
    pub const fn code(&self) -> &'static str {
        match self {
            CurrencyCode::USD => "USD",
            CurrencyCode::EUR => "EUR",
            CurrencyCode::GBP => "GBP",
            CurrencyCode::JPY => "JPY",
            CurrencyCode::CHF => "CHF",
            CurrencyCode::CAD => "CAD",
            CurrencyCode::AUD => "AUD",
            CurrencyCode::NZD => "NZD",
            CurrencyCode::SEK => "SEK",
            CurrencyCode::NOK => "NOK",
            CurrencyCode::DKK => "DKK",
            CurrencyCode::HKD => "HKD",
            CurrencyCode::SGD => "SGD",
            CurrencyCode::CNY => "CNY",
            CurrencyCode::KRW => "KRW",
            CurrencyCode::INR => "INR",
            CurrencyCode::BRL => "BRL",
            CurrencyCode::MXN => "MXN",
            CurrencyCode::ZAR => "ZAR",
            CurrencyCode::PLN => "PLN",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for CurrencyCode {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Ok(CurrencyCode::USD),
            "EUR" => Ok(CurrencyCode::EUR),
            "GBP" => Ok(CurrencyCode::GBP),
            "JPY" => Ok(CurrencyCode::JPY),
            "CHF" => Ok(CurrencyCode::CHF),
            "CAD" => Ok(CurrencyCode::CAD),
            "AUD" => Ok(CurrencyCode::AUD),
            "NZD" => Ok(CurrencyCode::NZD),
            "SEK" => Ok(CurrencyCode::SEK),
            "NOK" => Ok(CurrencyCode::NOK),
            "DKK" => Ok(CurrencyCode::DKK),
            "HKD" => Ok(CurrencyCode::HKD),
            "SGD" => Ok(CurrencyCode::SGD),
            "CNY" => Ok(CurrencyCode::CNY),
            "KRW" => Ok(CurrencyCode::KRW),
            "INR" => Ok(CurrencyCode::INR),
            "BRL" => Ok(CurrencyCode::BRL),
            "MXN" => Ok(CurrencyCode::MXN),
            "ZAR" => Ok(CurrencyCode::ZAR),
            "PLN" => Ok(CurrencyCode::PLN),
            _ => Err(SimulationError::UndefinedEnum {
                kind: "CurrencyCode",
                value: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_round_trip_through_display() {
        assert_eq!("BUY".parse::<TradeAction>().unwrap(), TradeAction::Buy);
        assert_eq!(
            TradeAction::Sell.to_string().parse::<TradeAction>().unwrap(),
            TradeAction::Sell
        );
        assert_eq!(
            "stop_limit".parse::<OrderType>().unwrap(),
            OrderType::StopLimit
        );
        assert_eq!("eur".parse::<CurrencyCode>().unwrap(), CurrencyCode::EUR);
    }

    #[test]
    fn test_unknown_value_is_undefined_enum() {
        let err = "HOLD".parse::<SignalType>().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("SignalType"));
        assert!(msg.contains("HOLD"));
    }

    #[test]
    fn test_rebalancing_schedule_advances() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(
            RebalancingFrequency::Daily.next_after(d),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );
        assert_eq!(
            RebalancingFrequency::Weekly.next_after(d),
            NaiveDate::from_ymd_opt(2024, 2, 7).unwrap()
        );
        // Month-end arithmetic clamps to the last valid day.
        assert_eq!(
            RebalancingFrequency::Monthly.next_after(d),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            RebalancingFrequency::Quarterly.next_after(d),
            NaiveDate::from_ymd_opt(2024, 4, 30).unwrap()
        );
        assert_eq!(
            RebalancingFrequency::Annually.next_after(d),
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()
        );
    }
}
