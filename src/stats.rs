use crate::error::{Computed, StatsError, ZeroDivisor, finite};
use crate::series::{Period, TimeSeries};
use serde::{Deserialize, Serialize};

/// Streaming accumulator of mean, sample variance and extremes (Welford's method).
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
    min: f64,
    max: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            n_vals: 0,
            mean: 0.0,
            diff_2_sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;

        self.min = self.min.min(val);
        self.max = self.max.max(val);
    }

    pub fn n_vals(&self) -> usize {
        self.n_vals
    }

    pub fn mean(&self) -> Computed<f64> {
        if self.n_vals == 0 {
            return Err(StatsError::EmptyInput);
        }
        // Rounding can push the running mean just past an extreme.
        Ok(finite(self.mean)?.clamp(self.min, self.max))
    }

    pub fn std_dev(&self) -> Computed<f64> {
        if self.n_vals < 2 {
            return Err(StatsError::InsufficientData {
                required: 2,
                actual: self.n_vals,
            });
        }
        finite((self.diff_2_sum / (self.n_vals as f64 - 1.0)).sqrt())
    }

    pub fn min(&self) -> Computed<f64> {
        if self.n_vals == 0 {
            return Err(StatsError::EmptyInput);
        }
        Ok(self.min)
    }

    pub fn max(&self) -> Computed<f64> {
        if self.n_vals == 0 {
            return Err(StatsError::EmptyInput);
        }
        Ok(self.max)
    }
}

/// Start, end, extremes and mean of a non-empty sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Description {
    pub start: f64,
    pub end: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Describe a sequence of values.
pub fn describe(vals: &[f64]) -> Computed<Description> {
    let (&start, &end) = match (vals.first(), vals.last()) {
        (Some(start), Some(end)) => (start, end),
        _ => return Err(StatsError::EmptyInput),
    };

    let mut acc = Accumulator::new();
    vals.iter().for_each(|&val| acc.add(val));

    Ok(Description {
        start,
        end,
        min: acc.min()?,
        max: acc.max()?,
        mean: acc.mean()?,
    })
}

/// Percentage change between the first and the last value.
pub fn growth_rate(vals: &[f64]) -> Computed<f64> {
    match vals {
        [] => Err(StatsError::EmptyInput),
        [_] => Err(StatsError::InsufficientData {
            required: 2,
            actual: 1,
        }),
        [start, .., end] => {
            if *start == 0.0 {
                return Err(StatsError::DivisionByZero(ZeroDivisor::BaseValue));
            }
            finite((end / start - 1.0) * 100.0)
        }
    }
}

/// Descriptive summary of a keyed series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub len: usize,
    pub first_period: Period,
    pub last_period: Period,
    pub description: Description,
    pub min_period: Period,
    pub max_period: Period,
    pub change: Computed<f64>,
    pub growth_rate: Computed<f64>,
    pub std_dev: Computed<f64>,
}

impl SeriesSummary {
    pub fn compute(series: &TimeSeries) -> Computed<Self> {
        Self::from_parts(series.keys(), series.values())
    }

    /// Summarize values with their keys; both slices must have the same length.
    pub fn from_parts(keys: &[Period], vals: &[f64]) -> Computed<Self> {
        if keys.len() != vals.len() {
            return Err(StatsError::LengthMismatch {
                left: keys.len(),
                right: vals.len(),
            });
        }
        let description = describe(vals)?;

        let mut acc = Accumulator::new();
        vals.iter().for_each(|&val| acc.add(val));

        // First occurrence of each extreme.
        let min_idx = vals
            .iter()
            .position(|&val| val == description.min)
            .unwrap_or(0);
        let max_idx = vals
            .iter()
            .position(|&val| val == description.max)
            .unwrap_or(0);

        Ok(Self {
            len: vals.len(),
            first_period: keys[0],
            last_period: keys[keys.len() - 1],
            description,
            min_period: keys[min_idx],
            max_period: keys[max_idx],
            change: finite(description.end - description.start),
            growth_rate: growth_rate(vals),
            std_dev: acc.std_dev(),
        })
    }
}

/// Named, inclusive range of years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub label: String,
    pub start: i32,
    pub end: i32,
}

/// Summary of the points of a series that fall within a [`Span`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanSummary {
    pub label: String,
    pub count: usize,
    pub mean: f64,
    pub std_dev: Computed<f64>,
    pub min: f64,
    pub max: f64,
}

/// Summarize `series` over each span; spans without points are omitted.
pub fn summarize_spans(series: &TimeSeries, spans: &[Span]) -> Vec<SpanSummary> {
    spans
        .iter()
        .filter_map(|span| {
            let mut acc = Accumulator::new();
            series
                .keys()
                .iter()
                .zip(series.values())
                .filter(|(key, _)| (span.start..=span.end).contains(&key.year()))
                .for_each(|(_, &val)| acc.add(val));

            Some(SpanSummary {
                label: span.label.clone(),
                count: acc.n_vals(),
                mean: acc.mean().ok()?,
                std_dev: acc.std_dev(),
                min: acc.min().ok()?,
                max: acc.max().ok()?,
            })
        })
        .collect()
}

/// Peaks and troughs over a centered window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurningPoints {
    pub peaks: Vec<(Period, f64)>,
    pub troughs: Vec<(Period, f64)>,
}

/// Find points equal to the maximum (peak) or minimum (trough) of the
/// centered window around them.
///
/// Only points with a complete window are considered, so short series have
/// no turning points.
pub fn turning_points(series: &TimeSeries, window: usize) -> TurningPoints {
    let vals = series.values();
    let keys = series.keys();
    let mut points = TurningPoints::default();
    if window == 0 {
        return points;
    }

    let half_lo = window / 2;
    let half_hi = window - 1 - half_lo;
    if vals.len() < window {
        return points;
    }

    for idx in half_lo..vals.len() - half_hi {
        let neighborhood = &vals[idx - half_lo..=idx + half_hi];
        let val = vals[idx];
        let max = neighborhood.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = neighborhood.iter().copied().fold(f64::INFINITY, f64::min);
        if val == max {
            points.peaks.push((keys[idx], val));
        }
        if val == min {
            points.troughs.push((keys[idx], val));
        }
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yearly(start: i32, vals: &[f64]) -> TimeSeries {
        let keys = (0..vals.len() as i32).map(|i| Period::Year(start + i)).collect();
        TimeSeries::new("test", keys, vals.to_vec()).unwrap()
    }

    #[test]
    fn describes_sequence() {
        let desc = describe(&[100.0, 110.0, 121.0]).unwrap();
        assert_eq!(desc.start, 100.0);
        assert_eq!(desc.end, 121.0);
        assert_eq!(desc.min, 100.0);
        assert_eq!(desc.max, 121.0);
        assert!((desc.mean - 110.333_333_333_333_33).abs() < 1e-9);
    }

    #[test]
    fn empty_input_is_not_computable() {
        assert_eq!(describe(&[]), Err(StatsError::EmptyInput));
        assert_eq!(growth_rate(&[]), Err(StatsError::EmptyInput));
    }

    #[test]
    fn single_value_collapses_and_has_no_growth_rate() {
        let desc = describe(&[42.5]).unwrap();
        assert_eq!(desc.start, 42.5);
        assert_eq!(desc.end, 42.5);
        assert_eq!(desc.min, 42.5);
        assert_eq!(desc.max, 42.5);
        assert_eq!(desc.mean, 42.5);
        assert_eq!(
            growth_rate(&[42.5]),
            Err(StatsError::InsufficientData {
                required: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn growth_rate_needs_nonzero_base() {
        assert_eq!(
            growth_rate(&[0.0, 5.0]),
            Err(StatsError::DivisionByZero(ZeroDivisor::BaseValue))
        );
        let rate = growth_rate(&[249.4, 680.5]).unwrap();
        assert!((rate - 172.854_851_643_945_47).abs() < 1e-9);
    }

    #[test]
    fn overflowing_statistics_are_not_computable() {
        assert_eq!(growth_rate(&[1e-300, 1e300]), Err(StatsError::NonFinite));

        let vals = [-1.7e308, 1.7e308];
        let mut acc = Accumulator::new();
        vals.iter().for_each(|&val| acc.add(val));
        assert_eq!(acc.std_dev(), Err(StatsError::NonFinite));

        let keys = [Period::Year(2000), Period::Year(2001)];
        let summary = SeriesSummary::from_parts(&keys, &[1e-300, 1e300]).unwrap();
        assert_eq!(summary.growth_rate, Err(StatsError::NonFinite));
        assert!(summary.change.is_ok());
    }

    #[test]
    fn mean_lies_between_extremes() {
        let cases: [&[f64]; 4] = [
            &[0.1, 0.1, 0.1],
            &[9.22, 6.34, 7.36, -0.02, 0.07, -0.01],
            &[1e300, 1e300, 1e300],
            &[-3.5],
        ];
        for vals in cases {
            let desc = describe(vals).unwrap();
            assert!(desc.min <= desc.mean && desc.mean <= desc.max, "{vals:?}");
        }
    }

    #[test]
    fn accumulator_std_dev() {
        let mut acc = Accumulator::new();
        assert_eq!(acc.mean(), Err(StatsError::EmptyInput));
        for val in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            acc.add(val);
        }
        assert!((acc.mean().unwrap() - 5.0).abs() < 1e-12);
        let std_dev = acc.std_dev().unwrap();
        assert!((std_dev - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn summary_reports_extreme_periods() {
        let series = yearly(2016, &[596.5, 606.3, 615.8, 625.2, 610.4]);
        let summary = SeriesSummary::compute(&series).unwrap();
        assert_eq!(summary.len, 5);
        assert_eq!(summary.min_period, Period::Year(2016));
        assert_eq!(summary.max_period, Period::Year(2019));
        assert!((summary.change.unwrap() - 13.9).abs() < 1e-9);
        assert!(summary.std_dev.is_ok());
    }

    #[test]
    fn spans_skip_empty_ranges() {
        let series = yearly(1988, &[1.0, 2.0, 3.0, 4.0]);
        let spans = vec![
            Span {
                label: "1980s".into(),
                start: 1980,
                end: 1989,
            },
            Span {
                label: "1990s".into(),
                start: 1990,
                end: 1999,
            },
            Span {
                label: "2000s".into(),
                start: 2000,
                end: 2009,
            },
        ];
        let summaries = summarize_spans(&series, &spans);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].label, "1980s");
        assert_eq!(summaries[0].count, 2);
        assert_eq!(summaries[0].mean, 1.5);
        assert_eq!(summaries[1].min, 3.0);
        assert_eq!(summaries[1].max, 4.0);
    }

    #[test]
    fn finds_turning_points() {
        let series = yearly(2000, &[1.0, 3.0, 2.0, 0.0, 2.0, 5.0, 4.0]);
        let points = turning_points(&series, 3);
        assert_eq!(
            points.peaks,
            vec![(Period::Year(2001), 3.0), (Period::Year(2005), 5.0)]
        );
        assert_eq!(points.troughs, vec![(Period::Year(2003), 0.0)]);
    }

    #[test]
    fn short_series_has_no_turning_points() {
        let series = yearly(2000, &[1.0, 2.0]);
        assert_eq!(turning_points(&series, 5), TurningPoints::default());
    }
}
