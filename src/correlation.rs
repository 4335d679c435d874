use crate::error::{Computed, StatsError, ZeroDivisor, finite};
use crate::series::TimeSeries;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Divide every value by the largest magnitude, so squares cannot overflow.
fn normalized(vals: &[f64]) -> Vec<f64> {
    let max_abs = vals.iter().fold(0.0_f64, |acc, val| acc.max(val.abs()));
    if max_abs == 0.0 {
        return vals.to_vec();
    }
    vals.iter().map(|val| val / max_abs).collect()
}

fn is_constant(vals: &[f64]) -> bool {
    vals.iter().all(|&val| val == vals[0])
}

/// Compute the Pearson correlation coefficient of two equal-length sequences.
///
/// The result is clamped into `[-1, 1]`; series without variance are not computable.
pub fn pearson(x: &[f64], y: &[f64]) -> Computed<f64> {
    if x.len() != y.len() {
        return Err(StatsError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    let n_vals = x.len();
    if n_vals < 2 {
        return Err(StatsError::InsufficientData {
            required: 2,
            actual: n_vals,
        });
    }
    if is_constant(x) || is_constant(y) {
        return Err(StatsError::DivisionByZero(ZeroDivisor::ZeroVariance));
    }

    let (x, y) = (normalized(x), normalized(y));
    let mean_x = x.iter().sum::<f64>() / n_vals as f64;
    let mean_y = y.iter().sum::<f64>() / n_vals as f64;

    let mut cov = 0.0;
    let mut diff_2_sum_x = 0.0;
    let mut diff_2_sum_y = 0.0;
    for (&x_val, &y_val) in x.iter().zip(&y) {
        let diff_x = x_val - mean_x;
        let diff_y = y_val - mean_y;
        cov += diff_x * diff_y;
        diff_2_sum_x += diff_x * diff_x;
        diff_2_sum_y += diff_y * diff_y;
    }

    // Squared deviations can still underflow to zero.
    if diff_2_sum_x == 0.0 || diff_2_sum_y == 0.0 {
        return Err(StatsError::DivisionByZero(ZeroDivisor::ZeroVariance));
    }

    let r = finite(cov / (diff_2_sum_x * diff_2_sum_y).sqrt())?;
    Ok(r.clamp(-1.0, 1.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    Strong,
    Moderate,
    Weak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Positive,
    Negative,
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Strong => "strong",
            Self::Moderate => "moderate",
            Self::Weak => "weak",
        })
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
        })
    }
}

/// Bounds on `|r|` separating weak, moderate and strong correlations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub strong: f64,
    pub moderate: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            strong: 0.7,
            moderate: 0.4,
        }
    }
}

impl Thresholds {
    pub fn strength(&self, r: f64) -> Strength {
        let abs_r = r.abs();
        if abs_r > self.strong {
            Strength::Strong
        } else if abs_r > self.moderate {
            Strength::Moderate
        } else {
            Strength::Weak
        }
    }
}

/// Correlation coefficient together with its qualitative label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    pub r: f64,
    pub strength: Strength,
    pub direction: Direction,
}

impl Correlation {
    pub fn label(r: f64, thresholds: &Thresholds) -> Self {
        Self {
            r,
            strength: thresholds.strength(r),
            direction: if r > 0.0 {
                Direction::Positive
            } else {
                Direction::Negative
            },
        }
    }

    /// Correlate two paired series with identical keys.
    pub fn between(x: &TimeSeries, y: &TimeSeries, thresholds: &Thresholds) -> Computed<Self> {
        x.check_paired(y)?;
        let r = pearson(x.values(), y.values())?;
        Ok(Self::label(r, thresholds))
    }
}

impl fmt::Display for Correlation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} ({} {})", self.r, self.strength, self.direction)
    }
}
