use crate::error::{Computed, StatsError, finite};
use serde::{Deserialize, Serialize};

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Linear value range of a chart axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisScale {
    pub lo: f64,
    pub hi: f64,
}

impl AxisScale {
    /// Fit a range around `vals`, padded by `margin` times the data range on each side.
    ///
    /// With `include_zero` the range is widened to contain zero, as needed for bars
    /// of signed values. A flat data range is padded by `max(|v| * margin, 1)`.
    pub fn fit(vals: &[f64], margin: f64, include_zero: bool) -> Computed<Self> {
        if vals.is_empty() {
            return Err(StatsError::EmptyInput);
        }
        let min = vals.iter().copied().fold(f64::INFINITY, f64::min);
        let max = vals.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let range = max - min;
        let pad = if range > 0.0 {
            range * margin
        } else {
            (max.abs() * margin).max(1.0)
        };

        let mut lo = min - pad;
        let mut hi = max + pad;
        if include_zero {
            lo = lo.min(0.0);
            hi = hi.max(0.0);
        }

        Ok(Self {
            lo: finite(lo)?,
            hi: finite(hi)?,
        })
    }

    /// `n_ticks + 1` evenly spaced values from `lo` to `hi`.
    pub fn ticks(&self, n_ticks: usize) -> Vec<f64> {
        if n_ticks == 0 {
            return vec![self.lo];
        }
        (0..=n_ticks)
            .map(|i_tick| self.lo + (self.hi - self.lo) * i_tick as f64 / n_ticks as f64)
            .collect()
    }

    /// Map `val` linearly onto `[pixel_lo, pixel_hi]`.
    ///
    /// Pass a reversed interval for screen Y axes, which grow downwards.
    pub fn project(&self, val: f64, pixel_lo: f64, pixel_hi: f64) -> f64 {
        pixel_lo + (val - self.lo) / (self.hi - self.lo) * (pixel_hi - pixel_lo)
    }

    /// One block character per value, its height proportional to the value.
    pub fn sparkline(&self, vals: &[f64]) -> String {
        let top = (BARS.len() - 1) as f64;
        vals.iter()
            .map(|&val| {
                let level = self.project(val, 0.0, top).round().clamp(0.0, top);
                BARS[level as usize]
            })
            .collect()
    }
}
