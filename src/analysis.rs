use crate::axis::AxisScale;
use crate::config::{AnalysisConfig, Format};
use crate::correlation::{Correlation, Thresholds};
use crate::dataset::{CorrelationSpec, Dataset, DifferenceSpec, RatioSpec};
use crate::error::Computed;
use crate::series::{DerivedPoint, Period};
use crate::stats::{SeriesSummary, SpanSummary, TurningPoints, summarize_spans, turning_points};
use crate::transform;
use anyhow::{Context, Result};
use serde::Serialize;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// Axis range and tick values for plotting a series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisReport {
    pub scale: AxisScale,
    pub ticks: Vec<f64>,
    pub sparkline: String,
}

fn axis_report(vals: &[f64], cfg: &AnalysisConfig, include_zero: bool) -> Computed<AxisReport> {
    let scale = AxisScale::fit(vals, cfg.axis_margin, include_zero)?;
    Ok(AxisReport {
        scale,
        ticks: scale.ticks(cfg.axis_ticks),
        sparkline: scale.sparkline(vals),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesReport {
    pub name: String,
    pub unit: Option<String>,
    pub summary: Computed<SeriesSummary>,
    pub period_change: Vec<DerivedPoint>,
    pub year_over_year: Vec<DerivedPoint>,
    pub cumulative_change: Computed<Vec<DerivedPoint>>,
    pub first_difference: Vec<DerivedPoint>,
    pub moving_average: Vec<DerivedPoint>,
    pub turning_points: TurningPoints,
    pub spans: Vec<SpanSummary>,
    pub axis: Computed<AxisReport>,
}

/// Series derived from two operands (ratio or difference).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedReport {
    pub name: String,
    pub operands: [String; 2],
    pub values: Computed<Vec<DerivedPoint>>,
    /// Summary over the computable points only.
    pub summary: Computed<SeriesSummary>,
    pub axis: Computed<AxisReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationReport {
    pub x: String,
    pub y: String,
    pub correlation: Computed<Correlation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MetricReport {
    Series(SeriesReport),
    Ratio(DerivedReport),
    Difference(DerivedReport),
    Correlation(CorrelationReport),
}

impl MetricReport {
    /// Name of the metric, for logging.
    pub fn label(&self) -> String {
        match self {
            Self::Series(report) => format!("series {:?}", report.name),
            Self::Ratio(report) => format!("ratio {:?}", report.name),
            Self::Difference(report) => format!("difference {:?}", report.name),
            Self::Correlation(report) => format!("correlation {:?} ~ {:?}", report.x, report.y),
        }
    }

    /// Describe every field of the report that could not be computed.
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let mut check = |field: &str, err: Option<String>| {
            if let Some(err) = err {
                issues.push(format!("{field}: {err}"));
            }
        };
        let count = |points: &[DerivedPoint]| points.iter().filter(|p| p.value.is_err()).count();

        match self {
            Self::Series(report) => {
                check("summary", report.summary.as_ref().err().map(|e| e.to_string()));
                check(
                    "cumulative change",
                    report.cumulative_change.as_ref().err().map(|e| e.to_string()),
                );
                let n_err = count(&report.period_change);
                check(
                    "period change",
                    (n_err > 0).then(|| format!("{n_err} points not computable")),
                );
            }
            Self::Ratio(report) | Self::Difference(report) => match &report.values {
                Err(err) => check("values", Some(err.to_string())),
                Ok(points) => {
                    let n_err = count(points);
                    check(
                        "values",
                        (n_err > 0).then(|| format!("{n_err} points not computable")),
                    );
                }
            },
            Self::Correlation(report) => {
                check(
                    "coefficient",
                    report.correlation.as_ref().err().map(|e| e.to_string()),
                );
            }
        }

        issues
    }
}

/// Report of every metric evaluated on a dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetReport {
    pub name: String,
    pub description: String,
    pub metrics: Vec<MetricReport>,
}

pub trait Metric {
    fn evaluate(&self, dataset: &Dataset) -> Result<MetricReport>;
}

pub struct SeriesProfile {
    name: String,
    cfg: AnalysisConfig,
}

impl SeriesProfile {
    pub fn new(name: &str, cfg: &AnalysisConfig) -> Self {
        Self {
            name: name.to_string(),
            cfg: cfg.clone(),
        }
    }
}

impl Metric for SeriesProfile {
    fn evaluate(&self, dataset: &Dataset) -> Result<MetricReport> {
        let series = dataset.get(&self.name)?;
        let cfg = &self.cfg;

        Ok(MetricReport::Series(SeriesReport {
            name: series.name().to_string(),
            unit: series.unit().map(str::to_string),
            summary: SeriesSummary::compute(series),
            period_change: transform::period_change_series(series),
            year_over_year: transform::year_over_year_series(series),
            cumulative_change: transform::cumulative_change_series(series),
            first_difference: transform::first_difference_series(series),
            moving_average: transform::moving_average_series(series, cfg.moving_average_window),
            turning_points: turning_points(series, cfg.turning_point_window),
            spans: summarize_spans(series, &cfg.spans),
            axis: axis_report(series.values(), cfg, false),
        }))
    }
}

fn derived_report(
    name: &str,
    operands: [&str; 2],
    values: Computed<Vec<DerivedPoint>>,
    cfg: &AnalysisConfig,
    include_zero: bool,
) -> DerivedReport {
    let (keys, vals): (Vec<Period>, Vec<f64>) = values
        .as_ref()
        .map(|points| {
            points
                .iter()
                .filter_map(|point| point.value.as_ref().ok().map(|&val| (point.period, val)))
                .unzip()
        })
        .unwrap_or_default();

    DerivedReport {
        name: name.to_string(),
        operands: operands.map(str::to_string),
        summary: values
            .as_ref()
            .map_err(|&err| err)
            .and_then(|_| SeriesSummary::from_parts(&keys, &vals)),
        axis: values
            .as_ref()
            .map_err(|&err| err)
            .and_then(|_| axis_report(&vals, cfg, include_zero)),
        values,
    }
}

pub struct RatioMetric {
    spec: RatioSpec,
    cfg: AnalysisConfig,
}

impl RatioMetric {
    pub fn new(spec: &RatioSpec, cfg: &AnalysisConfig) -> Self {
        Self {
            spec: spec.clone(),
            cfg: cfg.clone(),
        }
    }
}

impl Metric for RatioMetric {
    fn evaluate(&self, dataset: &Dataset) -> Result<MetricReport> {
        let spec = &self.spec;
        let numerator = dataset.get(&spec.numerator)?;
        let denominator = dataset.get(&spec.denominator)?;

        let values = transform::ratio_series(numerator, denominator, spec.scale);
        Ok(MetricReport::Ratio(derived_report(
            &spec.name,
            [spec.numerator.as_str(), spec.denominator.as_str()],
            values,
            &self.cfg,
            false,
        )))
    }
}

pub struct DifferenceMetric {
    spec: DifferenceSpec,
    cfg: AnalysisConfig,
}

impl DifferenceMetric {
    pub fn new(spec: &DifferenceSpec, cfg: &AnalysisConfig) -> Self {
        Self {
            spec: spec.clone(),
            cfg: cfg.clone(),
        }
    }
}

impl Metric for DifferenceMetric {
    fn evaluate(&self, dataset: &Dataset) -> Result<MetricReport> {
        let spec = &self.spec;
        let minuend = dataset.get(&spec.minuend)?;
        let subtrahend = dataset.get(&spec.subtrahend)?;

        let values = transform::difference_series(minuend, subtrahend);
        Ok(MetricReport::Difference(derived_report(
            &spec.name,
            [spec.minuend.as_str(), spec.subtrahend.as_str()],
            values,
            &self.cfg,
            true,
        )))
    }
}

pub struct CorrelationMetric {
    spec: CorrelationSpec,
    thresholds: Thresholds,
}

impl CorrelationMetric {
    pub fn new(spec: &CorrelationSpec, cfg: &AnalysisConfig) -> Self {
        Self {
            spec: spec.clone(),
            thresholds: cfg.thresholds(),
        }
    }
}

impl Metric for CorrelationMetric {
    fn evaluate(&self, dataset: &Dataset) -> Result<MetricReport> {
        let x = dataset.get(&self.spec.x)?;
        let y = dataset.get(&self.spec.y)?;

        Ok(MetricReport::Correlation(CorrelationReport {
            x: self.spec.x.clone(),
            y: self.spec.y.clone(),
            correlation: Correlation::between(x, y, &self.thresholds),
        }))
    }
}

pub struct Analyzer {
    dataset: Dataset,
    metric_ptr_vec: Vec<Box<dyn Metric>>,
}

impl Analyzer {
    pub fn new(cfg: &AnalysisConfig, dataset: Dataset) -> Self {
        let mut metric_ptr_vec: Vec<Box<dyn Metric>> = Vec::new();
        for series in &dataset.series {
            metric_ptr_vec.push(Box::new(SeriesProfile::new(series.name(), cfg)));
        }
        for spec in &dataset.ratios {
            metric_ptr_vec.push(Box::new(RatioMetric::new(spec, cfg)));
        }
        for spec in &dataset.differences {
            metric_ptr_vec.push(Box::new(DifferenceMetric::new(spec, cfg)));
        }
        for spec in &dataset.correlations {
            metric_ptr_vec.push(Box::new(CorrelationMetric::new(spec, cfg)));
        }
        Self {
            dataset,
            metric_ptr_vec,
        }
    }

    /// Evaluate every metric.
    ///
    /// Values that cannot be computed stay in the report as errors and are
    /// logged; they never stop the remaining metrics.
    pub fn report(&self) -> Result<DatasetReport> {
        let mut metrics = Vec::with_capacity(self.metric_ptr_vec.len());
        for metric in &self.metric_ptr_vec {
            let report = metric
                .evaluate(&self.dataset)
                .context("failed to evaluate metric")?;

            let label = report.label();
            log::debug!("evaluated {label}");
            for issue in report.issues() {
                log::warn!("{}: {label}: {issue}", self.dataset.name);
            }

            metrics.push(report);
        }

        Ok(DatasetReport {
            name: self.dataset.name.clone(),
            description: self.dataset.description.clone(),
            metrics,
        })
    }
}

/// Write a report to a file in the given format.
pub fn save_results<P: AsRef<Path>>(report: &DatasetReport, file: P, format: Format) -> Result<()> {
    let file = file.as_ref();
    let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
    let mut writer = BufWriter::new(file);

    match format {
        Format::Json => serde_json::to_writer_pretty(&mut writer, report)
            .context("failed to serialize report to JSON")?,
        Format::Msgpack => rmp_serde::encode::write_named(&mut writer, report)
            .context("failed to serialize report to MessagePack")?,
    }

    writer.flush().context("failed to flush writer stream")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::{Direction, Strength};
    use crate::error::{StatsError, ZeroDivisor};

    const DATASET: &str = r#"
name = "fixture"

[[series]]
name = "gdp"
keys = [2020, 2021, 2022]
values = [100.0, 110.0, 121.0]

[[series]]
name = "flat"
keys = [2020, 2021, 2022]
values = [5.0, 5.0, 5.0]

[[series]]
name = "deficit"
keys = [2020, 2021, 2022]
values = [-10.0, -5.5, 0.0]

[[series]]
name = "revenue"
keys = [2020, 2021, 2022]
values = [20.0, 0.0, 30.25]

[[ratio]]
name = "deficit_ratio"
numerator = "deficit"
denominator = "revenue"

[[difference]]
name = "gap"
minuend = "gdp"
subtrahend = "flat"

[[correlation]]
x = "gdp"
y = "deficit"

[[correlation]]
x = "gdp"
y = "flat"
"#;

    fn report() -> DatasetReport {
        let dataset = Dataset::from_toml(DATASET).unwrap();
        Analyzer::new(&AnalysisConfig::default(), dataset)
            .report()
            .unwrap()
    }

    #[test]
    fn evaluates_every_metric() {
        let report = report();
        assert_eq!(report.name, "fixture");
        assert_eq!(report.metrics.len(), 8);
    }

    #[test]
    fn series_profile_computes_changes() {
        let report = report();
        let MetricReport::Series(gdp) = &report.metrics[0] else {
            panic!("expected series report");
        };
        assert_eq!(gdp.period_change.len(), 2);
        assert!((gdp.period_change[1].value.unwrap() - 10.0).abs() < 1e-9);
        let cum = gdp.cumulative_change.as_ref().unwrap();
        assert!((cum[2].value.unwrap() - 21.0).abs() < 1e-9);
        assert!(report.metrics[0].issues().is_empty());
    }

    #[test]
    fn zero_denominator_is_isolated() {
        let report = report();
        let MetricReport::Ratio(ratio) = &report.metrics[4] else {
            panic!("expected ratio report");
        };
        let points = ratio.values.as_ref().unwrap();
        assert!((points[0].value.unwrap() + 50.0).abs() < 1e-9);
        assert_eq!(
            points[1].value,
            Err(StatsError::DivisionByZero(ZeroDivisor::Denominator))
        );
        assert_eq!(points[2].value, Ok(0.0));

        let summary = ratio.summary.as_ref().unwrap();
        assert_eq!(summary.len, 2);
        assert_eq!(report.metrics[4].issues().len(), 1);
    }

    #[test]
    fn zero_variance_correlation_is_reported() {
        let report = report();
        let MetricReport::Correlation(corr) = &report.metrics[6] else {
            panic!("expected correlation report");
        };
        let corr = corr.correlation.unwrap();
        assert_eq!(corr.direction, Direction::Positive);
        assert_eq!(corr.strength, Strength::Strong);

        let MetricReport::Correlation(flat) = &report.metrics[7] else {
            panic!("expected correlation report");
        };
        assert_eq!(
            flat.correlation,
            Err(StatsError::DivisionByZero(ZeroDivisor::ZeroVariance))
        );
        assert_eq!(report.metrics[7].issues().len(), 1);
    }

    #[test]
    fn serializes_not_computable_values_explicitly() {
        let report = report();
        let json = serde_json::to_value(&report).unwrap();
        let flat = &json["metrics"][7];
        assert_eq!(flat["kind"], "correlation");
        assert_eq!(flat["correlation"]["Err"]["division_by_zero"], "zero_variance");

        let ratio = &json["metrics"][4]["values"]["Ok"];
        assert_eq!(ratio[1]["value"]["Err"]["division_by_zero"], "denominator");
        assert_eq!(ratio[2]["value"]["Ok"], 0.0);
    }

    #[test]
    fn overflowing_ratio_is_serialized_as_error() {
        let dataset = Dataset::from_toml(
            r#"
name = "extreme"

[[series]]
name = "big"
keys = [2020, 2021]
values = [1e300, 1.0]

[[series]]
name = "tiny"
keys = [2020, 2021]
values = [1e-300, 2.0]

[[ratio]]
name = "big_over_tiny"
numerator = "big"
denominator = "tiny"
"#,
        )
        .unwrap();
        let report = Analyzer::new(&AnalysisConfig::default(), dataset)
            .report()
            .unwrap();

        let MetricReport::Ratio(ratio) = &report.metrics[2] else {
            panic!("expected ratio report");
        };
        let points = ratio.values.as_ref().unwrap();
        assert_eq!(points[0].value, Err(StatsError::NonFinite));
        assert!((points[1].value.unwrap() - 50.0).abs() < 1e-9);
        assert_eq!(report.metrics[2].issues().len(), 1);

        let json = serde_json::to_value(&report).unwrap();
        let values = &json["metrics"][2]["values"]["Ok"];
        assert_eq!(values[0]["value"]["Err"], "non_finite");
    }
}
