//! Skill metrics comparing matched observation and model values.
//!
//! Every function takes two slices of equal length, observations first.
//! Residuals are `model - obs`. Empty input yields `NaN`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CompareError, Result};
use crate::utils::constants::{DEFAULT_HIT_RATIO_THRESHOLD, DEFAULT_METRICS};

fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population standard deviation (N denominator)
fn std_pop(data: &[f64]) -> f64 {
    let m = mean(data);
    (data.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / data.len() as f64).sqrt()
}

fn residuals(obs: &[f64], model: &[f64]) -> Vec<f64> {
    assert_eq!(obs.len(), model.len(), "obs and model must be aligned");
    obs.iter().zip(model).map(|(o, m)| m - o).collect()
}

/// Mean of `model - obs`
pub fn bias(obs: &[f64], model: &[f64]) -> f64 {
    mean(&residuals(obs, model))
}

/// Largest absolute residual
pub fn max_error(obs: &[f64], model: &[f64]) -> f64 {
    let residual = residuals(obs, model);
    if residual.is_empty() {
        return f64::NAN;
    }
    residual.iter().map(|r| r.abs()).fold(0.0, f64::max)
}

/// Mean absolute error
pub fn mae(obs: &[f64], model: &[f64]) -> f64 {
    let abs: Vec<f64> = residuals(obs, model).iter().map(|r| r.abs()).collect();
    mean(&abs)
}

/// Mean absolute percentage error, in percent.
///
/// Undefined (`NaN`) when any observation is zero.
pub fn mape(obs: &[f64], model: &[f64]) -> f64 {
    assert_eq!(obs.len(), model.len(), "obs and model must be aligned");
    if obs.is_empty() || obs.iter().any(|&o| o == 0.0) {
        return f64::NAN;
    }
    let rel: Vec<f64> = obs
        .iter()
        .zip(model)
        .map(|(o, m)| ((o - m) / o).abs())
        .collect();
    mean(&rel) * 100.0
}

/// Root mean squared error
pub fn rmse(obs: &[f64], model: &[f64]) -> f64 {
    let squared: Vec<f64> = residuals(obs, model).iter().map(|r| r * r).collect();
    mean(&squared).sqrt()
}

/// Unbiased RMSE: the RMSE after removing the bias
pub fn urmse(obs: &[f64], model: &[f64]) -> f64 {
    let residual = residuals(obs, model);
    let b = mean(&residual);
    let squared: Vec<f64> = residual.iter().map(|r| (r - b) * (r - b)).collect();
    mean(&squared).sqrt()
}

/// Nash-Sutcliffe efficiency
pub fn nse(obs: &[f64], model: &[f64]) -> f64 {
    let residual = residuals(obs, model);
    if residual.is_empty() {
        return f64::NAN;
    }
    let obs_mean = mean(obs);
    let ss_res: f64 = residual.iter().map(|r| r * r).sum();
    let ss_tot: f64 = obs.iter().map(|o| (o - obs_mean) * (o - obs_mean)).sum();
    1.0 - ss_res / ss_tot
}

/// Coefficient of determination, `1 - SSr/SSt`
pub fn r2(obs: &[f64], model: &[f64]) -> f64 {
    nse(obs, model)
}

/// Model efficiency factor: RMSE relative to the observation spread
pub fn mef(obs: &[f64], model: &[f64]) -> f64 {
    rmse(obs, model) / std_pop(obs)
}

/// Pearson correlation coefficient. Needs at least two points.
pub fn cc(obs: &[f64], model: &[f64]) -> f64 {
    assert_eq!(obs.len(), model.len(), "obs and model must be aligned");
    if obs.len() <= 1 {
        return f64::NAN;
    }

    let mo = mean(obs);
    let mm = mean(model);
    let mut sum_om = 0.0;
    let mut sum_oo = 0.0;
    let mut sum_mm = 0.0;
    for (o, m) in obs.iter().zip(model) {
        let dobs = o - mo;
        let dmod = m - mm;
        sum_om += dobs * dmod;
        sum_oo += dobs * dobs;
        sum_mm += dmod * dmod;
    }

    sum_om / (sum_oo * sum_mm).sqrt()
}

/// Ranks starting at 1, ties get the average of their positions
fn ranks(data: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..data.len()).collect();
    order.sort_by(|&a, &b| data[a].total_cmp(&data[b]));

    let mut ranks = vec![0.0; data.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && data[order[j + 1]] == data[order[i]] {
            j += 1;
        }
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &k in &order[i..=j] {
            ranks[k] = rank;
        }
        i = j + 1;
    }
    ranks
}

/// Spearman rank correlation
pub fn rho(obs: &[f64], model: &[f64]) -> f64 {
    assert_eq!(obs.len(), model.len(), "obs and model must be aligned");
    cc(&ranks(obs), &ranks(model))
}

/// Scatter index: unbiased residual spread relative to the observations
pub fn si(obs: &[f64], model: &[f64]) -> f64 {
    assert_eq!(obs.len(), model.len(), "obs and model must be aligned");
    if obs.is_empty() {
        return f64::NAN;
    }
    let mo = mean(obs);
    let mm = mean(model);
    let numerator: f64 = obs
        .iter()
        .zip(model)
        .map(|(o, m)| ((m - mm) - (o - mo)).powi(2))
        .sum();
    let denominator: f64 = obs.iter().map(|o| o * o).sum();
    (numerator / denominator).sqrt()
}

/// Willmott's index of agreement
pub fn willmott(obs: &[f64], model: &[f64]) -> f64 {
    let residual = residuals(obs, model);
    if residual.is_empty() {
        return f64::NAN;
    }
    let mo = mean(obs);
    let numerator: f64 = residual.iter().map(|r| r * r).sum();
    let denominator: f64 = obs
        .iter()
        .zip(model)
        .map(|(o, m)| ((m - mo).abs() + (o - mo).abs()).powi(2))
        .sum();
    1.0 - numerator / denominator
}

/// Fraction of points where `|model - obs| < threshold`
pub fn hit_ratio(obs: &[f64], model: &[f64], threshold: f64) -> f64 {
    let residual = residuals(obs, model);
    if residual.is_empty() {
        return f64::NAN;
    }
    let hits = residual.iter().filter(|r| r.abs() < threshold).count();
    hits as f64 / residual.len() as f64
}

/// How the regression line behind `lin_slope` is fitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegressionMethod {
    /// Ordinary least squares of model on obs
    #[default]
    Ols,
    /// Orthogonal distance regression
    Odr,
}

impl FromStr for RegressionMethod {
    type Err = CompareError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ols" => Ok(RegressionMethod::Ols),
            "odr" => Ok(RegressionMethod::Odr),
            other => Err(CompareError::Config(format!(
                "Regression method '{}' not implemented, select 'ols' or 'odr'",
                other
            ))),
        }
    }
}

/// Slope and intercept of the line fitting model against obs
pub fn linear_regression(obs: &[f64], model: &[f64], method: RegressionMethod) -> (f64, f64) {
    assert_eq!(obs.len(), model.len(), "obs and model must be aligned");
    if obs.is_empty() {
        return (f64::NAN, f64::NAN);
    }

    let mo = mean(obs);
    let mm = mean(model);
    let mut sxx = 0.0;
    let mut syy = 0.0;
    let mut sxy = 0.0;
    for (o, m) in obs.iter().zip(model) {
        sxx += (o - mo) * (o - mo);
        syy += (m - mm) * (m - mm);
        sxy += (o - mo) * (m - mm);
    }

    let slope = match method {
        RegressionMethod::Ols => sxy / sxx,
        RegressionMethod::Odr => {
            let diff = syy - sxx;
            (diff + (diff * diff + 4.0 * sxy * sxy).sqrt()) / (2.0 * sxy)
        }
    };

    (slope, mm - slope * mo)
}

/// Slope of the regression line of model on obs
pub fn lin_slope(obs: &[f64], model: &[f64], method: RegressionMethod) -> f64 {
    linear_regression(obs, model, method).0
}

/// A named skill metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Metric {
    Bias,
    MaxError,
    Mae,
    Mape,
    Rmse,
    Urmse,
    Nse,
    R2,
    Mef,
    Cc,
    Rho,
    Si,
    Willmott,
    HitRatio,
    LinSlope,
}

impl Metric {
    pub const ALL: [Metric; 15] = [
        Metric::Bias,
        Metric::MaxError,
        Metric::Mae,
        Metric::Mape,
        Metric::Rmse,
        Metric::Urmse,
        Metric::Nse,
        Metric::R2,
        Metric::Mef,
        Metric::Cc,
        Metric::Rho,
        Metric::Si,
        Metric::Willmott,
        Metric::HitRatio,
        Metric::LinSlope,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Bias => "bias",
            Metric::MaxError => "max_error",
            Metric::Mae => "mae",
            Metric::Mape => "mape",
            Metric::Rmse => "rmse",
            Metric::Urmse => "urmse",
            Metric::Nse => "nse",
            Metric::R2 => "r2",
            Metric::Mef => "mef",
            Metric::Cc => "cc",
            Metric::Rho => "rho",
            Metric::Si => "si",
            Metric::Willmott => "willmott",
            Metric::HitRatio => "hit_ratio",
            Metric::LinSlope => "lin_slope",
        }
    }

    pub fn compute(&self, obs: &[f64], model: &[f64]) -> f64 {
        match self {
            Metric::Bias => bias(obs, model),
            Metric::MaxError => max_error(obs, model),
            Metric::Mae => mae(obs, model),
            Metric::Mape => mape(obs, model),
            Metric::Rmse => rmse(obs, model),
            Metric::Urmse => urmse(obs, model),
            Metric::Nse => nse(obs, model),
            Metric::R2 => r2(obs, model),
            Metric::Mef => mef(obs, model),
            Metric::Cc => cc(obs, model),
            Metric::Rho => rho(obs, model),
            Metric::Si => si(obs, model),
            Metric::Willmott => willmott(obs, model),
            Metric::HitRatio => hit_ratio(obs, model, DEFAULT_HIT_RATIO_THRESHOLD),
            Metric::LinSlope => lin_slope(obs, model, RegressionMethod::Ols),
        }
    }

    /// Metrics used when none are requested
    pub fn defaults() -> Vec<Metric> {
        DEFAULT_METRICS
            .iter()
            .filter_map(|name| name.parse().ok())
            .collect()
    }

    /// Parse a list of metric names, failing on the first unknown one
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Result<Vec<Metric>> {
        names.iter().map(|n| n.as_ref().parse()).collect()
    }
}

impl FromStr for Metric {
    type Err = CompareError;

    fn from_str(s: &str) -> Result<Self> {
        let metric = match s.trim().to_lowercase().as_str() {
            "bias" => Metric::Bias,
            "max_error" => Metric::MaxError,
            "mae" | "mean_absolute_error" => Metric::Mae,
            "mape" | "mean_absolute_percentage_error" => Metric::Mape,
            "rmse" | "root_mean_squared_error" => Metric::Rmse,
            "urmse" => Metric::Urmse,
            "nse" | "nash_sutcliffe_efficiency" => Metric::Nse,
            "r2" => Metric::R2,
            "mef" | "model_efficiency_factor" => Metric::Mef,
            "cc" | "corrcoef" => Metric::Cc,
            "rho" | "spearmanr" => Metric::Rho,
            "si" | "scatter_index" => Metric::Si,
            "willmott" => Metric::Willmott,
            "hit_ratio" => Metric::HitRatio,
            "lin_slope" => Metric::LinSlope,
            _ => return Err(CompareError::UnknownMetric(s.to_string())),
        };
        Ok(metric)
    }
}

impl TryFrom<String> for Metric {
    type Error = CompareError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Metric> for String {
    fn from(metric: Metric) -> Self {
        metric.name().to_string()
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
