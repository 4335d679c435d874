//! Derived series: relative changes, differences, ratios and moving averages.
//!
//! Every function returns freshly computed values and leaves its inputs
//! untouched. An index that cannot be computed carries its own error while the
//! rest of the output is still filled in.

use crate::error::{Computed, StatsError, ZeroDivisor, finite};
use crate::series::{DerivedPoint, TimeSeries, derive};

fn relative_change(val: f64, reference: f64, divisor: ZeroDivisor) -> Computed<f64> {
    if reference == 0.0 {
        return Err(StatsError::DivisionByZero(divisor));
    }
    finite((val / reference - 1.0) * 100.0)
}

/// Percentage change of each value with respect to the preceding one.
///
/// The output has one entry per value after the first.
pub fn period_change(vals: &[f64]) -> Vec<Computed<f64>> {
    vals.windows(2)
        .map(|pair| relative_change(pair[1], pair[0], ZeroDivisor::PreviousValue))
        .collect()
}

/// Percentage change of each value with respect to the first one.
pub fn cumulative_change(vals: &[f64]) -> Computed<Vec<Computed<f64>>> {
    let &base = vals.first().ok_or(StatsError::EmptyInput)?;
    if base == 0.0 {
        return Err(StatsError::DivisionByZero(ZeroDivisor::BaseValue));
    }
    Ok(vals
        .iter()
        .map(|&val| relative_change(val, base, ZeroDivisor::BaseValue))
        .collect())
}

/// Absolute change of each value with respect to the preceding one.
pub fn first_difference(vals: &[f64]) -> Vec<Computed<f64>> {
    vals.windows(2).map(|pair| finite(pair[1] - pair[0])).collect()
}

/// Element-wise `numerator / (denominator * scale) * 100`.
pub fn ratio(numerator: &[f64], denominator: &[f64], scale: f64) -> Computed<Vec<Computed<f64>>> {
    if numerator.len() != denominator.len() {
        return Err(StatsError::LengthMismatch {
            left: numerator.len(),
            right: denominator.len(),
        });
    }
    Ok(numerator
        .iter()
        .zip(denominator)
        .map(|(num, den)| {
            let den = den * scale;
            if den == 0.0 {
                return Err(StatsError::DivisionByZero(ZeroDivisor::Denominator));
            }
            finite(num / den * 100.0)
        })
        .collect())
}

/// Element-wise `minuend - subtrahend`.
pub fn difference(minuend: &[f64], subtrahend: &[f64]) -> Computed<Vec<Computed<f64>>> {
    if minuend.len() != subtrahend.len() {
        return Err(StatsError::LengthMismatch {
            left: minuend.len(),
            right: subtrahend.len(),
        });
    }
    Ok(minuend
        .iter()
        .zip(subtrahend)
        .map(|(a, b)| finite(a - b))
        .collect())
}

/// Centered moving average over `window` values.
///
/// Value `i` averages `vals[i - window / 2 ..= i + (window - 1 - window / 2)]`;
/// values near either end without a complete window are not computable.
pub fn moving_average(vals: &[f64], window: usize) -> Vec<Computed<f64>> {
    let n_vals = vals.len();
    if window == 0 {
        return vec![Err(StatsError::EmptyInput); n_vals];
    }
    let half_lo = window / 2;
    let half_hi = window - 1 - half_lo;

    (0..n_vals)
        .map(|idx| {
            let lo = idx.saturating_sub(half_lo);
            let hi = (idx + half_hi).min(n_vals - 1);
            let available = hi - lo + 1;
            if available < window {
                return Err(StatsError::InsufficientData {
                    required: window,
                    actual: available,
                });
            }
            let window_vals = &vals[lo..=hi];
            let max_abs = window_vals.iter().fold(0.0_f64, |acc, val| acc.max(val.abs()));
            if max_abs == 0.0 {
                return Ok(0.0);
            }
            let scaled_sum = window_vals.iter().map(|val| val / max_abs).sum::<f64>();
            finite(scaled_sum / window as f64 * max_abs)
        })
        .collect()
}

/// Period-over-period change keyed by the later period.
pub fn period_change_series(series: &TimeSeries) -> Vec<DerivedPoint> {
    let keys = series.keys();
    derive(keys.get(1..).unwrap_or_default(), period_change(series.values()))
}

/// Change with respect to the same period one year earlier, looked up by key.
///
/// Works on series with gaps: a point whose reference period is absent is
/// reported as [`StatsError::MissingPeriod`].
pub fn year_over_year_series(series: &TimeSeries) -> Vec<DerivedPoint> {
    let vals = series
        .keys()
        .iter()
        .zip(series.values())
        .map(|(key, &val)| {
            let reference = key.year_before();
            let reference_val = series
                .get(reference)
                .ok_or(StatsError::MissingPeriod(reference))?;
            relative_change(val, reference_val, ZeroDivisor::PreviousValue)
        })
        .collect();
    derive(series.keys(), vals)
}

/// Cumulative change keyed by period; fails as a whole on an empty series or zero base.
pub fn cumulative_change_series(series: &TimeSeries) -> Computed<Vec<DerivedPoint>> {
    let vals = cumulative_change(series.values())?;
    Ok(derive(series.keys(), vals))
}

/// First difference keyed by the later period.
pub fn first_difference_series(series: &TimeSeries) -> Vec<DerivedPoint> {
    let keys = series.keys();
    derive(keys.get(1..).unwrap_or_default(), first_difference(series.values()))
}

/// Ratio of two paired series with identical keys.
pub fn ratio_series(
    numerator: &TimeSeries,
    denominator: &TimeSeries,
    scale: f64,
) -> Computed<Vec<DerivedPoint>> {
    numerator.check_paired(denominator)?;
    let vals = ratio(numerator.values(), denominator.values(), scale)?;
    Ok(derive(numerator.keys(), vals))
}

/// Difference of two paired series with identical keys.
pub fn difference_series(
    minuend: &TimeSeries,
    subtrahend: &TimeSeries,
) -> Computed<Vec<DerivedPoint>> {
    minuend.check_paired(subtrahend)?;
    let vals = difference(minuend.values(), subtrahend.values())?;
    Ok(derive(minuend.keys(), vals))
}

/// Centered moving average keyed by period.
pub fn moving_average_series(series: &TimeSeries, window: usize) -> Vec<DerivedPoint> {
    derive(series.keys(), moving_average(series.values(), window))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::Period;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    fn yearly(keys: &[i32], vals: &[f64]) -> TimeSeries {
        let keys = keys.iter().map(|&year| Period::Year(year)).collect();
        TimeSeries::new("test", keys, vals.to_vec()).unwrap()
    }

    #[test]
    fn compounding_growth() {
        let vals = [100.0, 110.0, 121.0];

        let yoy = period_change(&vals);
        assert_eq!(yoy.len(), 2);
        for change in yoy {
            assert_close(change.unwrap(), 10.0);
        }

        let cum = cumulative_change(&vals).unwrap();
        assert_eq!(cum.len(), 3);
        assert_close(cum[0].unwrap(), 0.0);
        assert_close(cum[1].unwrap(), 10.0);
        assert_close(cum[2].unwrap(), 21.0);
    }

    #[test]
    fn cumulative_change_starts_at_zero() {
        let cases: [&[f64]; 3] = [&[67.8, 70.2, 108.5], &[-3.0, 4.0], &[0.36, -0.02, 1.15]];
        for vals in cases {
            assert_eq!(cumulative_change(vals).unwrap()[0], Ok(0.0));
        }
    }

    #[test]
    fn cumulative_change_needs_nonzero_base() {
        assert_eq!(
            cumulative_change(&[0.0, 1.0]),
            Err(StatsError::DivisionByZero(ZeroDivisor::BaseValue))
        );
        assert_eq!(cumulative_change(&[]), Err(StatsError::EmptyInput));
    }

    #[test]
    fn zero_previous_value_only_affects_its_index() {
        let changes = period_change(&[-0.02, 0.0, 0.09, 0.18]);
        assert!(changes[0].is_ok());
        assert_eq!(
            changes[1],
            Err(StatsError::DivisionByZero(ZeroDivisor::PreviousValue))
        );
        assert_close(changes[2].unwrap(), 100.0);
    }

    #[test]
    fn zero_denominator_only_affects_its_index() {
        let ratios = ratio(&[50.0, 30.0, 45.0], &[100.0, 0.0, 90.0], 1.0).unwrap();
        assert_close(ratios[0].unwrap(), 50.0);
        assert_eq!(
            ratios[1],
            Err(StatsError::DivisionByZero(ZeroDivisor::Denominator))
        );
        assert_close(ratios[2].unwrap(), 50.0);
    }

    #[test]
    fn ratio_applies_denominator_scale() {
        let ratios = ratio(&[-250_000.0], &[500.0], 10_000.0).unwrap();
        assert_close(ratios[0].unwrap(), -5.0);
    }

    #[test]
    fn overflowing_results_are_not_computable() {
        let ratios = ratio(&[1e300, 1.0], &[1e-300, 4.0], 1.0).unwrap();
        assert_eq!(ratios[0], Err(StatsError::NonFinite));
        assert_close(ratios[1].unwrap(), 25.0);

        let changes = period_change(&[1e-300, 1e300, 2e300]);
        assert_eq!(changes[0], Err(StatsError::NonFinite));
        assert_close(changes[1].unwrap(), 100.0);

        let cum = cumulative_change(&[5e-324, 1e300]).unwrap();
        assert_eq!(cum[0], Ok(0.0));
        assert_eq!(cum[1], Err(StatsError::NonFinite));

        let gaps = difference(&[1.7e308, 1.0], &[-1.7e308, 1.0]).unwrap();
        assert_eq!(gaps, vec![Err(StatsError::NonFinite), Ok(0.0)]);
        assert_eq!(
            first_difference(&[-1.7e308, 1.7e308]),
            vec![Err(StatsError::NonFinite)]
        );
    }

    #[test]
    fn moving_average_of_large_values_stays_finite() {
        let avgs = moving_average(&[1.7e308, 1.7e308, 1.7e308], 3);
        assert_close(avgs[1].unwrap() / 1.7e308, 1.0);
        assert_eq!(moving_average(&[0.0, 0.0, 0.0], 3)[1], Ok(0.0));
    }

    #[test]
    fn paired_operations_reject_mismatched_keys() {
        let a = yearly(&[2000, 2001], &[1.0, 2.0]);
        let b = yearly(&[2000, 2002], &[1.0, 2.0]);
        assert_eq!(
            ratio_series(&a, &b, 1.0),
            Err(StatsError::LengthMismatch { left: 2, right: 2 })
        );
        assert!(difference_series(&a, &b).is_err());
        assert_eq!(
            difference(&[1.0], &[1.0, 2.0]),
            Err(StatsError::LengthMismatch { left: 1, right: 2 })
        );
    }

    #[test]
    fn difference_of_paired_series() {
        let cons = yearly(&[2022, 2023, 2024], &[103.5, 108.2, 112.8]);
        let gdp = yearly(&[2022, 2023, 2024], &[101.2, 104.8, 108.5]);
        let gap = difference_series(&cons, &gdp).unwrap();
        assert_eq!(gap[0].period, Period::Year(2022));
        assert_close(gap[2].value.unwrap(), 4.3);
    }

    #[test]
    fn first_difference_in_points() {
        let diffs = first_difference(&[9.22, 6.34, 7.36]);
        assert_close(diffs[0].unwrap(), -2.88);
        assert_close(diffs[1].unwrap(), 1.02);
    }

    #[test]
    fn keyed_change_uses_later_period() {
        let series = yearly(&[1980, 1985, 1990], &[100.0, 110.0, 121.0]);
        let changes = period_change_series(&series);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].period, Period::Year(1985));
        assert_eq!(changes[1].period, Period::Year(1990));
    }

    #[test]
    fn year_over_year_respects_gaps() {
        let series = yearly(&[1980, 1985, 1986], &[100.0, 200.0, 250.0]);
        let yoy = year_over_year_series(&series);
        assert_eq!(
            yoy[0].value,
            Err(StatsError::MissingPeriod(Period::Year(1979)))
        );
        assert_eq!(
            yoy[1].value,
            Err(StatsError::MissingPeriod(Period::Year(1984)))
        );
        assert_close(yoy[2].value.unwrap(), 25.0);
    }

    #[test]
    fn year_over_year_on_months() {
        let keys: Vec<_> = (1..=12)
            .map(|month| Period::Month { year: 2020, month })
            .chain((1..=2).map(|month| Period::Month { year: 2021, month }))
            .collect();
        let mut vals = vec![100.0; 12];
        vals.extend([90.0, 120.0]);
        let series = TimeSeries::new("tot", keys, vals).unwrap();

        let yoy = year_over_year_series(&series);
        assert!(yoy[..12].iter().all(|point| point.value.is_err()));
        assert_close(yoy[12].value.unwrap(), -10.0);
        assert_close(yoy[13].value.unwrap(), 20.0);
    }

    #[test]
    fn centered_moving_average() {
        let avgs = moving_average(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(
            avgs[0],
            Err(StatsError::InsufficientData {
                required: 3,
                actual: 2
            })
        );
        assert_close(avgs[1].unwrap(), 2.0);
        assert_close(avgs[3].unwrap(), 4.0);
        assert!(avgs[4].is_err());

        let avgs = moving_average(&[1.0, 2.0, 3.0, 4.0], 2);
        assert!(avgs[0].is_err());
        assert_close(avgs[1].unwrap(), 1.5);
        assert_close(avgs[3].unwrap(), 3.5);
    }

    #[test]
    fn sources_are_left_untouched() {
        let series = yearly(&[2000, 2001, 2002], &[1.0, 2.0, 4.0]);
        let before = series.clone();
        let _ = period_change_series(&series);
        let _ = cumulative_change_series(&series);
        let _ = moving_average_series(&series, 2);
        assert_eq!(series, before);
    }
}
