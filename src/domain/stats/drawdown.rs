use crate::domain::errors::StatsError;
use crate::domain::stats::returns::RETURN_SCALE;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Drawdown scan over an equity curve.
///
/// `max_drawdown` is the deepest peak-to-trough decline (≤ 0);
/// `max_drawdown_duration` counts bars from the peak that defined it to
/// the bar where the trough was realized. Ties resolve to the earlier
/// peak and the earliest realization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownReport {
    pub series: Vec<(NaiveDate, Decimal)>,
    pub max_drawdown: Decimal,
    pub max_drawdown_duration: usize,
}

pub fn drawdowns(curve: &BTreeMap<NaiveDate, Decimal>) -> Result<DrawdownReport, StatsError> {
    if curve.is_empty() {
        return Err(StatsError::EmptyInput);
    }

    let mut series = Vec::with_capacity(curve.len());
    let mut peak = Decimal::MIN;
    let mut peak_index = 0usize;
    let mut max_drawdown = Decimal::ZERO;
    let mut duration = 0usize;

    for (index, (&date, &equity)) in curve.iter().enumerate() {
        // Strict comparison: an equal later value does not displace the
        // earlier peak.
        if equity > peak {
            peak = equity;
            peak_index = index;
        }
        if peak.is_zero() {
            return Err(StatsError::ZeroEquity { index: peak_index });
        }
        let drawdown = (equity - peak) / peak;
        series.push((date, drawdown.round_dp(RETURN_SCALE)));

        // Strict comparison again: the earliest realization of the
        // deepest level wins.
        if drawdown < max_drawdown {
            max_drawdown = drawdown;
            duration = index - peak_index;
        }
    }

    Ok(DrawdownReport {
        series,
        max_drawdown: max_drawdown.round_dp(RETURN_SCALE),
        max_drawdown_duration: duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn curve(values: &[Decimal]) -> BTreeMap<NaiveDate, Decimal> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                (
                    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64),
                    v,
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_curve_is_an_error() {
        assert_eq!(
            drawdowns(&BTreeMap::new()).unwrap_err(),
            StatsError::EmptyInput
        );
    }

    #[test]
    fn test_monotone_curve_has_no_drawdown() {
        let report = drawdowns(&curve(&[dec!(100), dec!(110), dec!(120)])).unwrap();
        assert_eq!(report.max_drawdown, Decimal::ZERO);
        assert_eq!(report.max_drawdown_duration, 0);
        assert!(report.series.iter().all(|(_, dd)| dd.is_zero()));
    }

    #[test]
    fn test_drawdown_scan_matches_hand_computation() {
        let equity = [
            dec!(1000),
            dec!(1020),
            dec!(1010),
            dec!(1030),
            dec!(950),
            dec!(1100),
            dec!(900),
        ];
        let report = drawdowns(&curve(&equity)).unwrap();

        let expected = [
            dec!(0),
            dec!(0),
            dec!(-0.0098039216),
            dec!(0),
            dec!(-0.0776699029),
            dec!(0),
            dec!(-0.1818181818),
        ];
        for ((_, dd), want) in report.series.iter().zip(expected) {
            assert_eq!(*dd, want);
        }

        assert_eq!(report.max_drawdown, dec!(-0.1818181818));
        // Peak at index 5 (1100), realized at index 6 (900).
        assert_eq!(report.max_drawdown_duration, 1);
    }

    #[test]
    fn test_equal_peaks_keep_the_earlier_one() {
        // Peak 100 at index 0 repeats at index 2; the trough at index 3
        // measures its duration from index 0.
        let report = drawdowns(&curve(&[dec!(100), dec!(90), dec!(100), dec!(80)])).unwrap();
        assert_eq!(report.max_drawdown, dec!(-0.2));
        assert_eq!(report.max_drawdown_duration, 3);
    }

    #[test]
    fn test_repeated_trough_keeps_earliest_realization() {
        let report = drawdowns(&curve(&[dec!(100), dec!(80), dec!(80), dec!(80)])).unwrap();
        assert_eq!(report.max_drawdown, dec!(-0.2));
        assert_eq!(report.max_drawdown_duration, 1);
    }
}
