// src/estimation/taylor.rs

use std::collections::HashMap;
use std::str::FromStr;

use tracing::warn;

use crate::design::grouping::sum_by_group;
use crate::design::DesignContext;
use crate::error::{Result, SurveyError};

// ============================================================================
// Enums & Config
// ============================================================================

/// Handling of strata that contain a single PSU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinglePsuPolicy {
    /// Fail with `SurveyError::SinglePsu`.
    #[default]
    Error,
    /// Contribute no variance from that stratum.
    Skip,
    /// Use the SSUs (or the units) of the lone PSU as the first stage.
    Subunit,
}

impl FromStr for SinglePsuPolicy {
    type Err = SurveyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "error" | "fail" => Ok(SinglePsuPolicy::Error),
            "skip" => Ok(SinglePsuPolicy::Skip),
            "subunit" | "ssu" => Ok(SinglePsuPolicy::Subunit),
            _ => Err(SurveyError::invalid_option("single PSU policy", s)),
        }
    }
}

// ============================================================================
// Point Estimates
// ============================================================================

fn masked<'a>(y: &'a [f64], w: &'a [f64], mask: &'a [bool]) -> impl Iterator<Item = (f64, f64)> + 'a {
    y.iter()
        .zip(w.iter())
        .zip(mask.iter())
        .filter_map(|((&yi, &wi), &m)| if m { Some((yi, wi)) } else { None })
}

pub fn point_estimate_total(y: &[f64], weights: &[f64], mask: &[bool]) -> f64 {
    masked(y, weights, mask).map(|(yi, wi)| yi * wi).sum()
}

pub fn point_estimate_mean(y: &[f64], weights: &[f64], mask: &[bool]) -> Result<f64> {
    let sum_w: f64 = masked(y, weights, mask).map(|(_, wi)| wi).sum();
    if sum_w == 0.0 {
        return Err(SurveyError::ZeroWeightSum);
    }
    Ok(point_estimate_total(y, weights, mask) / sum_w)
}

pub fn point_estimate_ratio(y: &[f64], x: &[f64], weights: &[f64], mask: &[bool]) -> Result<f64> {
    let sum_wx = point_estimate_total(x, weights, mask);
    if sum_wx == 0.0 {
        return Err(SurveyError::ZeroWeightSum);
    }
    Ok(point_estimate_total(y, weights, mask) / sum_wx)
}

// ============================================================================
// Linearization Scores
// ============================================================================
//
// Units outside the domain get a zero score but keep their place in the
// stratum/PSU structure.

pub fn scores_total(y: &[f64], weights: &[f64], mask: &[bool]) -> Vec<f64> {
    y.iter()
        .zip(weights.iter())
        .zip(mask.iter())
        .map(|((&yi, &wi), &m)| if m { wi * yi } else { 0.0 })
        .collect()
}

pub fn scores_mean(y: &[f64], weights: &[f64], mask: &[bool]) -> Result<Vec<f64>> {
    let est = point_estimate_mean(y, weights, mask)?;
    let sum_w: f64 = masked(y, weights, mask).map(|(_, wi)| wi).sum();
    Ok(y.iter()
        .zip(weights.iter())
        .zip(mask.iter())
        .map(|((&yi, &wi), &m)| if m { (wi / sum_w) * (yi - est) } else { 0.0 })
        .collect())
}

pub fn scores_ratio(y: &[f64], x: &[f64], weights: &[f64], mask: &[bool]) -> Result<Vec<f64>> {
    let r_hat = point_estimate_ratio(y, x, weights, mask)?;
    let sum_wx = point_estimate_total(x, weights, mask);
    Ok(y.iter()
        .zip(x.iter())
        .zip(weights.iter())
        .zip(mask.iter())
        .map(|(((&yi, &xi), &wi), &m)| if m { (wi / sum_wx) * (yi - r_hat * xi) } else { 0.0 })
        .collect())
}

// ============================================================================
// Taylor Variance
// ============================================================================

/// n/(n-1) * sum (t - mean)^2 over the group totals.
fn between_variance(totals: &[f64]) -> f64 {
    let n = totals.len() as f64;
    if n < 2.0 {
        return 0.0;
    }
    let mean = totals.iter().sum::<f64>() / n;
    let sum_sq_diff: f64 = totals.iter().map(|&t| (t - mean).powi(2)).sum();
    (n / (n - 1.0)) * sum_sq_diff
}

fn reindex_within_subset(raw: &[u32]) -> (Vec<u32>, usize) {
    let mut map: HashMap<u32, u32> = HashMap::new();
    let mut next_idx = 0u32;
    let indices = raw
        .iter()
        .map(|&val| {
            *map.entry(val).or_insert_with(|| {
                let i = next_idx;
                next_idx += 1;
                i
            })
        })
        .collect();
    (indices, next_idx as usize)
}

/// Variance of stratum `h` computed one stage down: SSUs when available,
/// units otherwise.
fn subunit_variance(scores: &[f64], ctx: &DesignContext, h: usize) -> f64 {
    let units: Vec<usize> = (0..scores.len())
        .filter(|&i| ctx.psu_stratum[ctx.psu_ids[i] as usize] as usize == h)
        .collect();
    let raw: Vec<u32> = match &ctx.ssu_ids {
        Some(ssu) => units.iter().map(|&i| ssu[i]).collect(),
        None => units.iter().map(|&i| i as u32).collect(),
    };
    let (sub_ids, n_sub) = reindex_within_subset(&raw);
    if n_sub < 2 {
        warn!(stratum = ctx.stratum_label(h), "single subunit in single-PSU stratum, no variance contribution");
        return 0.0;
    }
    let unit_scores: Vec<f64> = units.iter().map(|&i| scores[i]).collect();
    between_variance(&sum_by_group(&unit_scores, &sub_ids, n_sub))
}

/// Linearized variance of the statistic whose scores are given.
///
/// Scores are totalled by PSU; each stratum contributes
/// `fpc_h * n_h/(n_h-1) * sum (z_hi - mean_h)^2`.
pub fn taylor_variance(scores: &[f64], ctx: &DesignContext, policy: SinglePsuPolicy) -> Result<f64> {
    let psu_totals = sum_by_group(scores, &ctx.psu_ids, ctx.n_psus());

    let mut total_var = 0.0;
    for (h, psus) in ctx.stratum_psus.iter().enumerate() {
        let var_h = match psus.len() {
            0 => continue,
            1 => match policy {
                SinglePsuPolicy::Error => {
                    return Err(SurveyError::SinglePsu { stratum: ctx.stratum_label(h).to_string() });
                }
                SinglePsuPolicy::Skip => {
                    warn!(stratum = ctx.stratum_label(h), "skipping single-PSU stratum");
                    0.0
                }
                SinglePsuPolicy::Subunit => {
                    warn!(stratum = ctx.stratum_label(h), "single-PSU stratum, using subunits");
                    subunit_variance(scores, ctx, h)
                }
            },
            _ => {
                let totals_h: Vec<f64> = psus.iter().map(|&p| psu_totals[p as usize]).collect();
                between_variance(&totals_h)
            }
        };
        total_var += ctx.fpc[h] * var_h;
    }
    Ok(total_var)
}

/// Number of PSUs minus number of strata (minus one when unstratified).
pub fn degrees_of_freedom(ctx: &DesignContext) -> usize {
    ctx.n_psus().saturating_sub(ctx.n_strata())
}

// ============================================================================
// SRS Variance (Simple Random Sampling)
// ============================================================================
//
// Reference variances for the design effect: same estimator under an
// equal-probability, unstratified, unclustered sample of the same size.

fn weighted_s2(y: &[f64], wn: &[f64]) -> f64 {
    let n = y.len() as f64;
    if n <= 1.0 {
        return f64::NAN;
    }
    let mu: f64 = y.iter().zip(wn.iter()).map(|(yi, wi)| wi * yi).sum();
    let ss: f64 = y.iter().zip(wn.iter()).map(|(yi, wi)| wi * (yi - mu).powi(2)).sum();
    (n / (n - 1.0)) * ss
}

fn domain_columns(cols: &[&[f64]], weights: &[f64], mask: &[bool]) -> (Vec<Vec<f64>>, Vec<f64>) {
    let keep: Vec<usize> = (0..weights.len()).filter(|&i| mask[i]).collect();
    let cols = cols.iter().map(|c| keep.iter().map(|&i| c[i]).collect()).collect();
    let w = keep.iter().map(|&i| weights[i]).collect();
    (cols, w)
}

pub fn srs_variance_mean(y: &[f64], weights: &[f64], mask: &[bool]) -> f64 {
    let (cols, wv) = domain_columns(&[y], weights, mask);
    let n = wv.len() as f64;
    let sum_w: f64 = wv.iter().sum();
    if n < 2.0 || sum_w <= 0.0 {
        return f64::NAN;
    }
    let wn: Vec<f64> = wv.iter().map(|w| w / sum_w).collect();
    weighted_s2(&cols[0], &wn) / n
}

pub fn srs_variance_total(y: &[f64], weights: &[f64], mask: &[bool]) -> f64 {
    let (cols, wv) = domain_columns(&[y], weights, mask);
    let n = wv.len() as f64;
    let sum_w: f64 = wv.iter().sum();
    if n < 2.0 || sum_w <= 0.0 {
        return f64::NAN;
    }
    let wn: Vec<f64> = wv.iter().map(|w| w / sum_w).collect();
    (sum_w.powi(2) / n) * weighted_s2(&cols[0], &wn)
}

pub fn srs_variance_ratio(y: &[f64], x: &[f64], weights: &[f64], mask: &[bool]) -> f64 {
    let (cols, wv) = domain_columns(&[y, x], weights, mask);
    let n = wv.len() as f64;
    let sum_w: f64 = wv.iter().sum();
    if n < 2.0 || sum_w <= 0.0 {
        return f64::NAN;
    }
    let wn: Vec<f64> = wv.iter().map(|w| w / sum_w).collect();
    let (yv, xv) = (&cols[0], &cols[1]);
    let ybar: f64 = yv.iter().zip(wn.iter()).map(|(yi, wi)| wi * yi).sum();
    let xbar: f64 = xv.iter().zip(wn.iter()).map(|(xi, wi)| wi * xi).sum();
    if xbar == 0.0 {
        return f64::NAN;
    }
    let rhat = ybar / xbar;
    let ev: Vec<f64> = yv.iter().zip(xv.iter()).map(|(yi, xi)| yi - rhat * xi).collect();
    weighted_s2(&ev, &wn) / (n * xbar.powi(2))
}

// ============================================================================
// Tests
// ============================================================================
