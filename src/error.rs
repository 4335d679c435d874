//! Conditions under which a statistic cannot be computed.

use crate::series::Period;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value that turned out to be zero where a divisor was required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroDivisor {
    /// First value of the series, used as the base of a relative change.
    BaseValue,
    /// Value of the preceding (or reference) period.
    PreviousValue,
    /// Denominator of a ratio.
    Denominator,
    /// Sum of squared deviations of a series with no variance.
    ZeroVariance,
}

impl fmt::Display for ZeroDivisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BaseValue => "base value",
            Self::PreviousValue => "previous value",
            Self::Denominator => "denominator",
            Self::ZeroVariance => "zero variance",
        };
        f.write_str(s)
    }
}

/// Local, non-fatal reason why a single statistic is not computable.
///
/// These never abort a batch of computations: the affected field or index
/// carries the error and everything else is still computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum StatsError {
    #[error("input is empty")]
    EmptyInput,

    #[error("paired inputs differ in keys or length ({left} vs {right} points)")]
    LengthMismatch { left: usize, right: usize },

    #[error("division by zero ({0})")]
    DivisionByZero(ZeroDivisor),

    #[error("at least {required} points are required, but {actual} are available")]
    InsufficientData { required: usize, actual: usize },

    #[error("reference period {0} is missing")]
    MissingPeriod(Period),

    #[error("result overflows the range of finite numbers")]
    NonFinite,
}

/// Outcome of a single statistic.
pub type Computed<T> = Result<T, StatsError>;

/// Pass `val` through if it is finite.
pub fn finite(val: f64) -> Computed<f64> {
    if !val.is_finite() {
        return Err(StatsError::NonFinite);
    }
    Ok(val)
}
