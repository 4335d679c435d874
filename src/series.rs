//! Time series keyed by year or calendar month.

use crate::error::{Computed, StatsError};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Ordinal key of a time series point.
///
/// Deserializes from an integer year (`1980`) or a month string
/// (`"2020-01"` or `"2020/01"`), and serializes back to its string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPeriod", into = "String")]
pub enum Period {
    Year(i32),
    Month { year: i32, month: u8 },
}

impl Period {
    pub fn year(&self) -> i32 {
        match *self {
            Self::Year(year) => year,
            Self::Month { year, .. } => year,
        }
    }

    /// Same period one year earlier.
    pub fn year_before(&self) -> Self {
        match *self {
            Self::Year(year) => Self::Year(year - 1),
            Self::Month { year, month } => Self::Month {
                year: year - 1,
                month,
            },
        }
    }

    fn same_granularity(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (Self::Year(_), Self::Year(_)) | (Self::Month { .. }, Self::Month { .. })
        )
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Year(year) => write!(f, "{year}"),
            Self::Month { year, month } => write!(f, "{year:04}-{month:02}"),
        }
    }
}

impl FromStr for Period {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.split_once(['-', '/']) {
            None => {
                let year = s.parse().with_context(|| format!("invalid year {s:?}"))?;
                Ok(Self::Year(year))
            }
            Some((year, month)) => {
                let year = year.parse().with_context(|| format!("invalid year in {s:?}"))?;
                let month: u8 = month
                    .parse()
                    .with_context(|| format!("invalid month in {s:?}"))?;
                if !(1..=12).contains(&month) {
                    bail!("month must be in the range 1..=12, but is {month}");
                }
                Ok(Self::Month { year, month })
            }
        }
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.to_string()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPeriod {
    Year(i32),
    Text(String),
}

impl TryFrom<RawPeriod> for Period {
    type Error = anyhow::Error;

    fn try_from(raw: RawPeriod) -> Result<Self> {
        match raw {
            RawPeriod::Year(year) => Ok(Self::Year(year)),
            RawPeriod::Text(text) => text.parse(),
        }
    }
}

/// Named, immutable sequence of `(period, value)` points.
///
/// Keys are strictly increasing and share one granularity; gaps are allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    name: String,
    unit: Option<String>,
    keys: Vec<Period>,
    values: Vec<f64>,
}

impl TimeSeries {
    pub fn new<S: Into<String>>(name: S, keys: Vec<Period>, values: Vec<f64>) -> Result<Self> {
        let name = name.into();

        let (n_keys, n_vals) = (keys.len(), values.len());
        if n_keys != n_vals {
            bail!("series {name:?} has {n_keys} keys but {n_vals} values");
        }
        for pair in keys.windows(2) {
            if !pair[0].same_granularity(&pair[1]) {
                bail!("series {name:?} mixes years and months ({} and {})", pair[0], pair[1]);
            }
            if pair[0] >= pair[1] {
                bail!("series {name:?} keys must be strictly increasing ({} then {})", pair[0], pair[1]);
            }
        }
        if let Some(idx) = values.iter().position(|val| !val.is_finite()) {
            bail!("series {name:?} has a non-finite value at {}", keys[idx]);
        }

        Ok(Self {
            name,
            unit: None,
            keys,
            values,
        })
    }

    pub fn with_unit<S: Into<String>>(mut self, unit: S) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn keys(&self) -> &[Period] {
        &self.keys
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Value at `period`, if the series has a point there.
    pub fn get(&self, period: Period) -> Option<f64> {
        self.keys
            .binary_search(&period)
            .ok()
            .map(|idx| self.values[idx])
    }

    /// Check that `other` has exactly the same ordered keys.
    pub fn check_paired(&self, other: &TimeSeries) -> Computed<()> {
        if self.keys != other.keys {
            return Err(StatsError::LengthMismatch {
                left: self.len(),
                right: other.len(),
            });
        }
        Ok(())
    }
}

/// Single point of a freshly computed series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedPoint {
    pub period: Period,
    pub value: Computed<f64>,
}

/// Pair each key with the corresponding computed value.
pub fn derive(keys: &[Period], values: Vec<Computed<f64>>) -> Vec<DerivedPoint> {
    keys.iter()
        .zip(values)
        .map(|(&period, value)| DerivedPoint { period, value })
        .collect()
}
