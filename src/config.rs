use crate::correlation::Thresholds;
use crate::stats::Span;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Analysis configuration parameters.
///
/// Loaded from a TOML file and validated before use.
/// Every field has a default, so an empty file is a valid configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub analysis: AnalysisConfig,
    pub output: OutputConfig,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Window of the centered moving average.
    pub moving_average_window: usize,
    /// Window used to detect peaks and troughs.
    pub turning_point_window: usize,

    /// `|r|` above which a correlation is strong.
    pub strong_threshold: f64,
    /// `|r|` above which a correlation is moderate.
    pub moderate_threshold: f64,

    /// Padding of axis ranges, as a fraction of the data range.
    pub axis_margin: f64,
    /// Number of intervals between axis ticks.
    pub axis_ticks: usize,

    /// Year spans summarized for every series.
    pub spans: Vec<Span>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let thresholds = Thresholds::default();
        Self {
            moving_average_window: 3,
            turning_point_window: 5,
            strong_threshold: thresholds.strong,
            moderate_threshold: thresholds.moderate,
            axis_margin: 0.1,
            axis_ticks: 10,
            spans: Vec::new(),
        }
    }
}

impl AnalysisConfig {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            strong: self.strong_threshold,
            moderate: self.moderate_threshold,
        }
    }
}

#[derive(Debug, Default, PartialEq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Json,
    Msgpack,
}

impl Format {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Msgpack => "msgpack",
        }
    }
}

#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Encoding of the results files.
    pub format: Format,
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let analysis = &self.analysis;

        check_num(analysis.moving_average_window, 1..=1000)
            .context("invalid moving average window")?;
        check_num(analysis.turning_point_window, 2..=1000)
            .context("invalid turning point window")?;

        check_num(analysis.strong_threshold, 0.0..=1.0).context("invalid strong threshold")?;
        check_num(analysis.moderate_threshold, 0.0..analysis.strong_threshold)
            .context("invalid moderate threshold")?;

        check_num(analysis.axis_margin, 0.0..1.0).context("invalid axis margin")?;
        check_num(analysis.axis_ticks, 1..=100).context("invalid number of axis ticks")?;

        for span in &analysis.spans {
            check_num(span.end, span.start..)
                .with_context(|| format!("invalid span {:?}", span.label))?;
        }

        Ok(())
    }
}

pub fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}
