use crate::domain::types::CurrencyCode;
use chrono::NaiveDate;
use thiserror::Error;

/// Errors produced by the pure statistics kernel.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatsError {
    #[error("input series is empty")]
    EmptyInput,

    #[error("insufficient data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("trading days per year must be positive, got {value}")]
    InvalidTradingDays { value: u32 },

    #[error("equity value at index {index} is zero, cannot compute return")]
    ZeroEquity { index: usize },
}

/// Errors raised by the portfolio engine and tearsheet builder.
///
/// Dispatcher errors abort the current bar and the run; they carry the
/// date and entity that triggered them so the failure is diagnosable
/// without replaying the simulation.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("unknown strategy '{name}' referenced on {date}")]
    UnknownStrategy { date: NaiveDate, name: String },

    #[error("unsupported {kind} event on {date}: {reason}")]
    UnsupportedEvent {
        date: NaiveDate,
        kind: &'static str,
        reason: String,
    },

    #[error("out-of-order bar: {incoming} does not advance past {last}")]
    OutOfOrderBar { last: NaiveDate, incoming: NaiveDate },

    #[error("no market data for {asset} on or before {date}")]
    MissingMarketData { date: NaiveDate, asset: String },

    #[error("no {currency} rate on or before {date}")]
    MissingFxRate {
        date: NaiveDate,
        currency: CurrencyCode,
    },

    #[error("invalid quantity {quantity} for {asset}")]
    InvalidQuantity { asset: String, quantity: i64 },

    #[error("equity curves misaligned: trading curve has {trading} points, benchmark has {benchmark}")]
    MisalignedCurves { trading: usize, benchmark: usize },

    #[error("{what} must not be empty")]
    NullOrEmptyCollection { what: &'static str },

    #[error("invalid event: {0}")]
    InvalidEvent(String),

    #[error("unrecognized {kind} value '{value}'")]
    UndefinedEnum { kind: &'static str, value: String },

    #[error(transparent)]
    Stats(#[from] StatsError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_order_bar_formatting() {
        let err = SimulationError::OutOfOrderBar {
            last: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            incoming: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
        };
        let msg = err.to_string();
        assert!(msg.contains("2024-03-04"));
        assert!(msg.contains("2024-03-05"));
    }

    #[test]
    fn test_missing_fx_rate_formatting() {
        let err = SimulationError::MissingFxRate {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            currency: CurrencyCode::EUR,
        };
        assert!(err.to_string().contains("EUR"));
    }

    #[test]
    fn test_stats_error_converts() {
        fn inner() -> Result<(), SimulationError> {
            Err(StatsError::EmptyInput)?;
            Ok(())
        }
        let msg = inner().unwrap_err().to_string();
        assert!(msg.contains("empty"));
    }
}
