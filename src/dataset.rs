//! Named dataset fixtures.
//!
//! Each file holds its own series and the computations requested on them.
//! Datasets are independent: two files may carry different figures for the
//! same named series and no attempt is made to reconcile them.

use crate::series::{Period, TimeSeries};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fs, path::Path};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SeriesSpec {
    name: String,
    #[serde(default)]
    unit: Option<String>,
    keys: Vec<Period>,
    values: Vec<f64>,
}

/// Ratio of two series, scaled to a percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RatioSpec {
    pub name: String,
    pub numerator: String,
    pub denominator: String,
    /// Factor applied to the denominator before dividing, for unit conversion.
    #[serde(default = "unit_scale")]
    pub scale: f64,
}

fn unit_scale() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DifferenceSpec {
    pub name: String,
    pub minuend: String,
    pub subtrahend: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorrelationSpec {
    pub x: String,
    pub y: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatasetFile {
    name: String,
    #[serde(default)]
    description: String,
    series: Vec<SeriesSpec>,
    #[serde(default)]
    ratio: Vec<RatioSpec>,
    #[serde(default)]
    difference: Vec<DifferenceSpec>,
    #[serde(default)]
    correlation: Vec<CorrelationSpec>,
}

/// Validated dataset: series plus the paired computations requested on them.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub description: String,
    pub series: Vec<TimeSeries>,
    pub ratios: Vec<RatioSpec>,
    pub differences: Vec<DifferenceSpec>,
    pub correlations: Vec<CorrelationSpec>,
}

impl Dataset {
    /// Load a [`Dataset`] from a TOML file.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents).with_context(|| format!("invalid dataset {file:?}"))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: DatasetFile = toml::from_str(contents).context("failed to deserialize dataset")?;

        let mut series = Vec::with_capacity(file.series.len());
        for spec in file.series {
            let mut ts = TimeSeries::new(spec.name, spec.keys, spec.values)
                .context("failed to construct series")?;
            if let Some(unit) = spec.unit {
                ts = ts.with_unit(unit);
            }
            series.push(ts);
        }

        let dataset = Self {
            name: file.name,
            description: file.description,
            series,
            ratios: file.ratio,
            differences: file.difference,
            correlations: file.correlation,
        };
        dataset.validate()?;

        Ok(dataset)
    }

    /// Series with the given name.
    pub fn get(&self, name: &str) -> Result<&TimeSeries> {
        self.series
            .iter()
            .find(|ts| ts.name() == name)
            .with_context(|| format!("dataset {:?} has no series {name:?}", self.name))
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("dataset name must not be empty");
        }
        if self.series.is_empty() {
            bail!("dataset {:?} has no series", self.name);
        }

        let mut names = HashSet::new();
        for ts in &self.series {
            if !names.insert(ts.name()) {
                bail!("dataset {:?} has duplicate series {:?}", self.name, ts.name());
            }
        }

        for spec in &self.ratios {
            self.get(&spec.numerator)
                .and(self.get(&spec.denominator))
                .with_context(|| format!("invalid ratio {:?}", spec.name))?;
            if !spec.scale.is_finite() || spec.scale == 0.0 {
                bail!("ratio {:?} must have a finite, non-zero scale", spec.name);
            }
        }
        for spec in &self.differences {
            self.get(&spec.minuend)
                .and(self.get(&spec.subtrahend))
                .with_context(|| format!("invalid difference {:?}", spec.name))?;
        }
        for spec in &self.correlations {
            self.get(&spec.x)
                .and(self.get(&spec.y))
                .with_context(|| format!("invalid correlation {:?} ~ {:?}", spec.x, spec.y))?;
        }

        Ok(())
    }
}
