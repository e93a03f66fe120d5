// src/estimation/estimator.rs
//! Taylor-linearization estimator for totals, means, ratios and proportions.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use statrs::distribution::{ContinuousCDF, Normal, StudentsT};
use tracing::debug;

use super::taylor::{
    degrees_of_freedom, point_estimate_mean, point_estimate_ratio, point_estimate_total, scores_mean,
    scores_ratio, scores_total, srs_variance_mean, srs_variance_ratio, srs_variance_total, taylor_variance,
    SinglePsuPolicy,
};
use crate::design::{ContextOptions, DesignContext, Domain, SurveyDesign};
use crate::error::{Result, SurveyError};

// ============================================================================
// Enums & Config
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Statistic {
    Total,
    Mean,
    Ratio,
    Proportion,
}

impl FromStr for Statistic {
    type Err = SurveyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "total" => Ok(Statistic::Total),
            "mean" => Ok(Statistic::Mean),
            "ratio" => Ok(Statistic::Ratio),
            "proportion" | "prop" => Ok(Statistic::Proportion),
            _ => Err(SurveyError::invalid_option("statistic", s)),
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Statistic::Total => "total",
            Statistic::Mean => "mean",
            Statistic::Ratio => "ratio",
            Statistic::Proportion => "proportion",
        };
        f.write_str(name)
    }
}

/// Scale on which proportion confidence intervals are built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CiMethod {
    /// log(p / (1 - p))
    #[default]
    Logit,
    /// log(-log(1 - p))
    ComplementaryLog,
}

impl FromStr for CiMethod {
    type Err = SurveyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "logit" => Ok(CiMethod::Logit),
            "cloglog" | "complementary-log" | "complementary_log" => Ok(CiMethod::ComplementaryLog),
            _ => Err(SurveyError::invalid_option("confidence interval method", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EstimateOptions {
    /// Fill `Estimate::deff`.
    pub deff: bool,
    /// Fill `Estimate::coef_var`.
    pub coef_variation: bool,
    /// Drop units with a missing value or weight before estimating.
    pub remove_nan: bool,
}

// ============================================================================
// Results
// ============================================================================

/// Category level of a proportion, ordered numerically.
#[derive(Debug, Clone, Copy)]
pub struct Level(f64);

impl Level {
    pub fn new(value: f64) -> Self {
        // folds -0.0 into 0.0
        Level(value + 0.0)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for Level {
    fn from(value: f64) -> Self {
        Level::new(value)
    }
}

impl PartialEq for Level {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Level {}

impl PartialOrd for Level {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Level {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of an [`Estimate`] map: a number, or one number per level.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Levels(BTreeMap<Level, f64>),
}

impl Value {
    pub fn scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            Value::Levels(_) => None,
        }
    }

    pub fn level(&self, level: f64) -> Option<f64> {
        match self {
            Value::Scalar(_) => None,
            Value::Levels(map) => map.get(&Level::new(level)).copied(),
        }
    }

    pub fn levels(&self) -> Option<&BTreeMap<Level, f64>> {
        match self {
            Value::Scalar(_) => None,
            Value::Levels(map) => Some(map),
        }
    }
}

/// Point estimates and their design-based precision, keyed by domain.
#[derive(Debug, Clone)]
pub struct Estimate {
    pub statistic: Statistic,
    pub alpha: f64,
    pub point_est: BTreeMap<Domain, Value>,
    pub variance: BTreeMap<Domain, Value>,
    pub stderror: BTreeMap<Domain, Value>,
    pub lower_ci: BTreeMap<Domain, Value>,
    pub upper_ci: BTreeMap<Domain, Value>,
    /// Empty unless requested.
    pub coef_var: BTreeMap<Domain, Value>,
    /// Empty unless requested.
    pub deff: BTreeMap<Domain, Value>,
    pub degrees_of_freedom: usize,
    pub number_psus: usize,
    pub number_strata: usize,
    /// Units removed because of missing values.
    pub dropped: usize,
}

impl Estimate {
    pub(crate) fn new(
        statistic: Statistic,
        alpha: f64,
        degrees_of_freedom: usize,
        number_psus: usize,
        number_strata: usize,
        dropped: usize,
    ) -> Self {
        Estimate {
            statistic,
            alpha,
            point_est: BTreeMap::new(),
            variance: BTreeMap::new(),
            stderror: BTreeMap::new(),
            lower_ci: BTreeMap::new(),
            upper_ci: BTreeMap::new(),
            coef_var: BTreeMap::new(),
            deff: BTreeMap::new(),
            degrees_of_freedom,
            number_psus,
            number_strata,
            dropped,
        }
    }

    pub fn domains(&self) -> impl Iterator<Item = &Domain> {
        self.point_est.keys()
    }

    pub(crate) fn insert(&mut self, domain: Domain, cells: Cells, options: EstimateOptions) {
        self.variance.insert(domain.clone(), cells.project(|c| c.variance));
        self.stderror.insert(domain.clone(), cells.project(|c| c.stderror));
        self.lower_ci.insert(domain.clone(), cells.project(|c| c.lower));
        self.upper_ci.insert(domain.clone(), cells.project(|c| c.upper));
        if options.coef_variation {
            self.coef_var.insert(domain.clone(), cells.project(|c| c.stderror / c.point));
        }
        if options.deff {
            self.deff.insert(domain.clone(), cells.project(|c| c.deff));
        }
        self.point_est.insert(domain, cells.project(|c| c.point));
    }
}

pub(crate) struct Cell {
    point: f64,
    variance: f64,
    stderror: f64,
    lower: f64,
    upper: f64,
    deff: f64,
}

impl Cell {
    /// `t` is the critical value; `srs_variance` may be NaN when no design
    /// effect is wanted.
    pub(crate) fn new(statistic: Statistic, ci_method: CiMethod, point: f64, variance: f64, srs_variance: f64, t: f64) -> Self {
        let stderror = variance.sqrt();
        let (lower, upper) = confidence_interval(statistic, ci_method, point, stderror, t);
        let deff = if srs_variance > 0.0 { variance / srs_variance } else { f64::NAN };
        Cell { point, variance, stderror, lower, upper, deff }
    }
}

pub(crate) enum Cells {
    Single(Cell),
    ByLevel(Vec<(Level, Cell)>),
}

impl Cells {
    fn project(&self, f: impl Fn(&Cell) -> f64) -> Value {
        match self {
            Cells::Single(c) => Value::Scalar(f(c)),
            Cells::ByLevel(cells) => Value::Levels(cells.iter().map(|(l, c)| (*l, f(c))).collect()),
        }
    }
}

// ============================================================================
// Estimator
// ============================================================================

#[derive(Debug, Clone)]
pub struct TaylorEstimator {
    statistic: Statistic,
    alpha: f64,
    single_psu: SinglePsuPolicy,
    ci_method: CiMethod,
}

impl TaylorEstimator {
    /// `alpha` is one minus the confidence level.
    pub fn new(statistic: Statistic, alpha: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(SurveyError::InvalidParameter(format!("alpha must be in (0, 1), got {}", alpha)));
        }
        Ok(TaylorEstimator { statistic, alpha, single_psu: SinglePsuPolicy::default(), ci_method: CiMethod::default() })
    }

    pub fn with_single_psu(mut self, policy: SinglePsuPolicy) -> Self {
        self.single_psu = policy;
        self
    }

    pub fn with_ci_method(mut self, method: CiMethod) -> Self {
        self.ci_method = method;
        self
    }

    pub fn statistic(&self) -> Statistic {
        self.statistic
    }

    pub fn estimate(&self, design: &SurveyDesign, options: EstimateOptions) -> Result<Estimate> {
        if self.statistic == Statistic::Ratio && design.secondary.is_none() {
            return Err(SurveyError::MissingSecondary);
        }
        let ctx = DesignContext::new(design, ContextOptions { remove_nan: options.remove_nan, require_stratum: false })?;
        self.estimate_context(&ctx, options)
    }

    /// Estimate from an already validated design.
    pub fn estimate_context(&self, ctx: &DesignContext, options: EstimateOptions) -> Result<Estimate> {
        let mut estimate = Estimate::new(
            self.statistic,
            self.alpha,
            degrees_of_freedom(ctx),
            ctx.n_psus(),
            ctx.n_strata(),
            ctx.dropped(),
        );
        let t = critical_value(self.alpha, estimate.degrees_of_freedom)?;
        debug!(
            statistic = %self.statistic,
            df = estimate.degrees_of_freedom,
            psus = estimate.number_psus,
            strata = estimate.number_strata,
            "taylor estimation"
        );

        let levels: BTreeSet<Level> = match self.statistic {
            Statistic::Proportion => ctx.value.iter().filter(|v| !v.is_nan()).map(|&v| Level::new(v)).collect(),
            _ => BTreeSet::new(),
        };

        for (domain, mask) in ctx.domain_masks() {
            let cells = match self.statistic {
                Statistic::Proportion => {
                    let mut cells = Vec::with_capacity(levels.len());
                    for &level in &levels {
                        let indicator: Vec<f64> = ctx
                            .value
                            .iter()
                            .map(|&v| if v.is_nan() { f64::NAN } else if Level::new(v) == level { 1.0 } else { 0.0 })
                            .collect();
                        cells.push((level, self.mean_cell(&indicator, ctx, &mask, t, options)?));
                    }
                    Cells::ByLevel(cells)
                }
                Statistic::Mean => Cells::Single(self.mean_cell(&ctx.value, ctx, &mask, t, options)?),
                Statistic::Total => {
                    let (y, w) = (&ctx.value, &ctx.weight);
                    let point = point_estimate_total(y, w, &mask);
                    let variance = taylor_variance(&scores_total(y, w, &mask), ctx, self.single_psu)?;
                    let srs = if options.deff { srs_variance_total(y, w, &mask) } else { f64::NAN };
                    Cells::Single(self.cell(point, variance, srs, t))
                }
                Statistic::Ratio => {
                    let x = ctx.secondary.as_deref().ok_or(SurveyError::MissingSecondary)?;
                    let (y, w) = (&ctx.value, &ctx.weight);
                    let point = point_estimate_ratio(y, x, w, &mask)?;
                    let variance = taylor_variance(&scores_ratio(y, x, w, &mask)?, ctx, self.single_psu)?;
                    let srs = if options.deff { srs_variance_ratio(y, x, w, &mask) } else { f64::NAN };
                    Cells::Single(self.cell(point, variance, srs, t))
                }
            };
            estimate.insert(domain, cells, options);
        }
        Ok(estimate)
    }

    fn mean_cell(&self, y: &[f64], ctx: &DesignContext, mask: &[bool], t: f64, options: EstimateOptions) -> Result<Cell> {
        let w = &ctx.weight;
        let point = point_estimate_mean(y, w, mask)?;
        let variance = taylor_variance(&scores_mean(y, w, mask)?, ctx, self.single_psu)?;
        let srs = if options.deff { srs_variance_mean(y, w, mask) } else { f64::NAN };
        Ok(self.cell(point, variance, srs, t))
    }

    fn cell(&self, point: f64, variance: f64, srs_variance: f64, t: f64) -> Cell {
        Cell::new(self.statistic, self.ci_method, point, variance, srs_variance, t)
    }

    /// Confidence interval for `point` with critical value `t`.
    pub fn interval(&self, point: f64, stderror: f64, t: f64) -> (f64, f64) {
        confidence_interval(self.statistic, self.ci_method, point, stderror, t)
    }
}

/// Symmetric interval `point ± t * stderror`. Proportions are handled on the
/// transformed scale and back-transformed, so the bounds stay in [0, 1].
pub fn confidence_interval(statistic: Statistic, method: CiMethod, point: f64, stderror: f64, t: f64) -> (f64, f64) {
    if statistic != Statistic::Proportion {
        return (point - t * stderror, point + t * stderror);
    }
    if point <= 0.0 || point >= 1.0 {
        return (point, point);
    }
    match method {
        CiMethod::Logit => {
            let center = (point / (1.0 - point)).ln();
            let half = t * stderror / (point * (1.0 - point));
            (expit(center - half), expit(center + half))
        }
        CiMethod::ComplementaryLog => {
            let log_q = -(1.0 - point).ln();
            let center = log_q.ln();
            let half = t * stderror / ((1.0 - point) * log_q);
            (inv_cloglog(center - half), inv_cloglog(center + half))
        }
    }
}

fn expit(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn inv_cloglog(x: f64) -> f64 {
    1.0 - (-x.exp()).exp()
}

/// Two-sided critical value of Student's t with `df` degrees of freedom,
/// normal when there are none.
pub fn critical_value(alpha: f64, df: usize) -> Result<f64> {
    let q = 1.0 - alpha / 2.0;
    if df == 0 {
        debug!("no degrees of freedom, using the normal quantile");
        let normal = Normal::new(0.0, 1.0).map_err(|e| SurveyError::Distribution(e.to_string()))?;
        return Ok(normal.inverse_cdf(q));
    }
    let t = StudentsT::new(0.0, 1.0, df as f64).map_err(|e| SurveyError::Distribution(e.to_string()))?;
    Ok(t.inverse_cdf(q))
}

// ============================================================================
// Tests
// ============================================================================
