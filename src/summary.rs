//! Plain-text rendering of dataset reports.

use crate::analysis::{AxisReport, CorrelationReport, DatasetReport, DerivedReport, MetricReport, SeriesReport};
use crate::error::Computed;
use crate::stats::SeriesSummary;
use std::fmt::{self, Write};

const RULE_WIDTH: usize = 70;

fn fmt_computed(val: &Computed<f64>, precision: usize, suffix: &str) -> String {
    match val {
        Ok(val) => format!("{val:+.precision$}{suffix}"),
        Err(err) => format!("n/a ({err})"),
    }
}

fn write_summary(out: &mut String, summary: &Computed<SeriesSummary>, unit: &str) -> fmt::Result {
    let summary = match summary {
        Ok(summary) => summary,
        Err(err) => return writeln!(out, "  summary:   n/a ({err})"),
    };
    let desc = &summary.description;

    writeln!(
        out,
        "  period:    {} to {} ({} points)",
        summary.first_period, summary.last_period, summary.len
    )?;
    writeln!(out, "  start:     {:.2}{unit}", desc.start)?;
    writeln!(out, "  end:       {:.2}{unit}", desc.end)?;
    writeln!(out, "  change:    {}", fmt_computed(&summary.change, 2, unit))?;
    writeln!(out, "  growth:    {}", fmt_computed(&summary.growth_rate, 1, "%"))?;
    writeln!(out, "  min:       {:.2}{unit} ({})", desc.min, summary.min_period)?;
    writeln!(out, "  max:       {:.2}{unit} ({})", desc.max, summary.max_period)?;
    writeln!(out, "  mean:      {:.2}{unit}", desc.mean)?;
    match &summary.std_dev {
        Ok(std_dev) => writeln!(out, "  std dev:   {std_dev:.2}")?,
        Err(err) => writeln!(out, "  std dev:   n/a ({err})")?,
    }
    Ok(())
}

fn write_axis(out: &mut String, axis: &Computed<AxisReport>) -> fmt::Result {
    if let Ok(axis) = axis {
        writeln!(
            out,
            "  chart:     {} [{:.2}, {:.2}]",
            axis.sparkline, axis.scale.lo, axis.scale.hi
        )?;
    }
    Ok(())
}

fn write_series(out: &mut String, report: &SeriesReport) -> fmt::Result {
    let unit = report
        .unit
        .as_deref()
        .map(|unit| format!(" {unit}"))
        .unwrap_or_default();

    writeln!(out, "[series {}]", report.name)?;
    write_summary(out, &report.summary, &unit)?;
    write_axis(out, &report.axis)?;

    match &report.cumulative_change {
        Ok(points) => {
            if let Some(last) = points.last() {
                writeln!(
                    out,
                    "  cumulative change to {}: {}",
                    last.period,
                    fmt_computed(&last.value, 1, "%")
                )?;
            }
        }
        Err(err) => writeln!(out, "  cumulative change: n/a ({err})")?,
    }
    if let Some(last) = report.period_change.last() {
        writeln!(
            out,
            "  latest change ({}): {}",
            last.period,
            fmt_computed(&last.value, 2, "%")
        )?;
    }

    if !report.spans.is_empty() {
        writeln!(out, "  spans:")?;
        for span in &report.spans {
            writeln!(
                out,
                "    {:<12} n={:<4} mean {:.2}  min {:.2}  max {:.2}",
                span.label, span.count, span.mean, span.min, span.max
            )?;
        }
    }

    let points = &report.turning_points;
    if !points.peaks.is_empty() {
        let peaks: Vec<_> = points
            .peaks
            .iter()
            .map(|(period, val)| format!("{period} ({val:.2})"))
            .collect();
        writeln!(out, "  peaks:     {}", peaks.join(", "))?;
    }
    if !points.troughs.is_empty() {
        let troughs: Vec<_> = points
            .troughs
            .iter()
            .map(|(period, val)| format!("{period} ({val:.2})"))
            .collect();
        writeln!(out, "  troughs:   {}", troughs.join(", "))?;
    }

    Ok(())
}

fn write_derived(out: &mut String, kind: &str, op: &str, report: &DerivedReport) -> fmt::Result {
    let [lhs, rhs] = &report.operands;
    writeln!(out, "[{kind} {} = {lhs} {op} {rhs}]", report.name)?;
    match &report.values {
        Ok(points) => {
            let n_err = points.iter().filter(|p| p.value.is_err()).count();
            if n_err > 0 {
                writeln!(out, "  {n_err} of {} points not computable", points.len())?;
            }
            write_summary(out, &report.summary, "")?;
            write_axis(out, &report.axis)
        }
        Err(err) => writeln!(out, "  n/a ({err})"),
    }
}

fn write_correlation(out: &mut String, report: &CorrelationReport) -> fmt::Result {
    writeln!(out, "[correlation {} ~ {}]", report.x, report.y)?;
    match &report.correlation {
        Ok(corr) => writeln!(out, "  r = {corr}"),
        Err(err) => writeln!(out, "  r = n/a ({err})"),
    }
}

/// Render a report as a human-readable summary.
pub fn render(report: &DatasetReport) -> String {
    let mut out = String::new();
    // Writing into a `String` cannot fail.
    let _ = write_report(&mut out, report);
    out
}

fn write_report(out: &mut String, report: &DatasetReport) -> fmt::Result {
    let rule = "=".repeat(RULE_WIDTH);
    writeln!(out, "{rule}")?;
    writeln!(out, "{}", report.name)?;
    if !report.description.is_empty() {
        writeln!(out, "{}", report.description)?;
    }
    writeln!(out, "{rule}")?;

    for metric in &report.metrics {
        writeln!(out)?;
        match metric {
            MetricReport::Series(report) => write_series(out, report)?,
            MetricReport::Ratio(report) => write_derived(out, "ratio", "/", report)?,
            MetricReport::Difference(report) => write_derived(out, "difference", "-", report)?,
            MetricReport::Correlation(report) => write_correlation(out, report)?,
        }
    }

    writeln!(out)?;
    writeln!(out, "{rule}")
}
