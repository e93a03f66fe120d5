// src/estimation/replication.rs
//! Replication-based variance estimation from a [`ReplicateWeightSet`].

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::str::FromStr;

use ndarray::{Array2, ArrayView1, ArrayView2};
use tracing::debug;

use super::estimator::{critical_value, Cell, Cells, CiMethod, Estimate, EstimateOptions, Level, Statistic};
use crate::design::Domain;
use crate::error::{Result, SurveyError};
use crate::weighting::replication::ReplicateWeightSet;

/// Centering point of the replicate deviations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VarianceCenter {
    /// Full-sample estimate.
    #[default]
    FullSample,
    /// Mean of the replicate estimates.
    ReplicateMean,
}

impl FromStr for VarianceCenter {
    type Err = SurveyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "full_sample" | "fullsample" | "full" | "mse" => Ok(VarianceCenter::FullSample),
            "rep_mean" | "repmean" | "mean" => Ok(VarianceCenter::ReplicateMean),
            _ => Err(SurveyError::invalid_option("variance center", s)),
        }
    }
}

/// sum_g c_g (theta_g - center)^2
pub fn replicate_variance(theta_full: f64, theta_reps: &[f64], rep_coefs: &[f64], center: VarianceCenter) -> f64 {
    if theta_reps.is_empty() {
        return 0.0;
    }
    let center_value = match center {
        VarianceCenter::FullSample => theta_full,
        VarianceCenter::ReplicateMean => theta_reps.iter().sum::<f64>() / theta_reps.len() as f64,
    };
    theta_reps
        .iter()
        .zip(rep_coefs.iter())
        .map(|(&rep, &c)| c * (rep - center_value).powi(2))
        .sum()
}

// ============================================================================
// Matrix-based computation
// ============================================================================

/// Full-sample and replicate totals. `rep_weights` is units x replicates.
pub fn matrix_total_estimates(y: &[f64], full_weights: &[f64], rep_weights: ArrayView2<f64>) -> (f64, Vec<f64>) {
    let theta_full = y.iter().zip(full_weights.iter()).map(|(yi, wi)| yi * wi).sum();
    let theta_reps = rep_weights.t().dot(&ArrayView1::from(y)).to_vec();
    (theta_full, theta_reps)
}

/// Full-sample and replicate ratios of weighted sums of `y` and `x`.
pub fn matrix_ratio_estimates(
    y: &[f64],
    x: &[f64],
    full_weights: &[f64],
    rep_weights: ArrayView2<f64>,
) -> (f64, Vec<f64>) {
    let ratio = |num: f64, den: f64| if den != 0.0 { num / den } else { f64::NAN };
    let (num_full, num_reps) = matrix_total_estimates(y, full_weights, rep_weights);
    let (den_full, den_reps) = matrix_total_estimates(x, full_weights, rep_weights);
    let theta_reps = num_reps.iter().zip(den_reps.iter()).map(|(&n, &d)| ratio(n, d)).collect();
    (ratio(num_full, den_full), theta_reps)
}

/// Means are ratios with a denominator of one.
pub fn matrix_mean_estimates(y: &[f64], full_weights: &[f64], rep_weights: ArrayView2<f64>) -> (f64, Vec<f64>) {
    let ones = vec![1.0; y.len()];
    matrix_ratio_estimates(y, &ones, full_weights, rep_weights)
}

impl ReplicateWeightSet {
    /// Adjusted replicate weights, multiplying raw coefficients by the base weight.
    fn adjusted_weights(&self) -> Cow<'_, Array2<f64>> {
        if !self.raw {
            return Cow::Borrowed(&self.weights);
        }
        let mut weights = self.weights.clone();
        for (mut row, &w) in weights.rows_mut().into_iter().zip(self.base_weight.iter()) {
            row *= w;
        }
        Cow::Owned(weights)
    }

    /// Whole-sample estimate of `statistic` with its replicate variance.
    /// Intervals use Student's t with the set's degrees of freedom.
    pub fn estimate(
        &self,
        statistic: Statistic,
        values: &[f64],
        secondary: Option<&[f64]>,
        center: VarianceCenter,
        alpha: f64,
    ) -> Result<Estimate> {
        let n = self.base_weight.len();
        if values.len() != n {
            return Err(SurveyError::LengthMismatch { field: "value", expected: n, got: values.len() });
        }
        if let Some(x) = secondary {
            if x.len() != n {
                return Err(SurveyError::LengthMismatch { field: "secondary value", expected: n, got: x.len() });
            }
        }
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(SurveyError::InvalidParameter(format!("alpha must be in (0, 1), got {}", alpha)));
        }

        let weights = self.adjusted_weights();
        let reps = weights.view();
        let base = &self.base_weight;
        let t = critical_value(alpha, self.degrees_of_freedom)?;
        let cell = |(full, theta_reps): (f64, Vec<f64>)| {
            let variance = replicate_variance(full, &theta_reps, &self.rep_coefs, center);
            Cell::new(statistic, CiMethod::default(), full, variance, f64::NAN, t)
        };

        let cells = match statistic {
            Statistic::Total => Cells::Single(cell(matrix_total_estimates(values, base, reps))),
            Statistic::Mean => Cells::Single(cell(matrix_mean_estimates(values, base, reps))),
            Statistic::Ratio => {
                let x = secondary.ok_or(SurveyError::MissingSecondary)?;
                Cells::Single(cell(matrix_ratio_estimates(values, x, base, reps)))
            }
            Statistic::Proportion => {
                let levels: BTreeSet<Level> = values.iter().filter(|v| !v.is_nan()).map(|&v| Level::new(v)).collect();
                Cells::ByLevel(
                    levels
                        .into_iter()
                        .map(|level| {
                            let indicator: Vec<f64> = values
                                .iter()
                                .map(|&v| if v.is_nan() { f64::NAN } else if Level::new(v) == level { 1.0 } else { 0.0 })
                                .collect();
                            (level, cell(matrix_mean_estimates(&indicator, base, reps)))
                        })
                        .collect(),
                )
            }
        };
        debug!(statistic = %statistic, method = %self.method, reps = self.number_reps(), "replicate estimation");

        let mut estimate = Estimate::new(
            statistic,
            alpha,
            self.degrees_of_freedom,
            self.psu_keys.len(),
            self.number_strata,
            0,
        );
        estimate.insert(Domain::Whole, cells, EstimateOptions::default());
        Ok(estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{to_labels, SurveyDesign};
    use crate::estimation::estimator::TaylorEstimator;
    use crate::weighting::replication::{RepMethod, ReplicateWeightGenerator};
    use approx::assert_relative_eq;

    const Y: [f64; 8] = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0];
    const W: [f64; 8] = [1.5, 2.0, 1.0, 3.0, 2.5, 1.0, 2.0, 1.5];

    fn taylor_total(stratum: &[i32], psu: &[i32]) -> f64 {
        let design = SurveyDesign::new(Y, W).with_stratum(stratum.iter()).with_psu(psu.iter());
        let est = TaylorEstimator::new(Statistic::Total, 0.05).unwrap();
        let result = est.estimate(&design, EstimateOptions::default()).unwrap();
        result.variance[&Domain::Whole].scalar().unwrap()
    }

    #[test]
    fn test_replicate_variance_centering() {
        let theta_reps = [98.0, 102.0, 99.0, 101.0];
        let coefs = [1.0; 4];
        assert_relative_eq!(replicate_variance(100.0, &theta_reps, &coefs, VarianceCenter::ReplicateMean), 10.0);
        assert_relative_eq!(replicate_variance(105.0, &theta_reps, &coefs, VarianceCenter::FullSample), 110.0);
        assert_eq!(replicate_variance(1.0, &[], &[], VarianceCenter::FullSample), 0.0);
    }

    #[test]
    fn test_jackknife_total_matches_taylor() {
        let stratum = [1, 1, 1, 1, 2, 2, 2, 2];
        let psu = [1, 1, 2, 3, 1, 2, 2, 3];
        let mut generator = ReplicateWeightGenerator::new(RepMethod::Jackknife, 0);
        let set = generator.replicate(&W, &to_labels(&psu), Some(&to_labels(&stratum))).unwrap();
        let result = set.estimate(Statistic::Total, &Y, None, VarianceCenter::FullSample, 0.05).unwrap();

        let expected = taylor_total(&stratum, &psu);
        assert_relative_eq!(result.variance[&Domain::Whole].scalar().unwrap(), expected, max_relative = 1e-10);
        let total: f64 = Y.iter().zip(W.iter()).map(|(y, w)| y * w).sum();
        assert_relative_eq!(result.point_est[&Domain::Whole].scalar().unwrap(), total, epsilon = 1e-12);
        assert_eq!(result.degrees_of_freedom, 4);
    }

    #[test]
    fn test_brr_total_matches_taylor() {
        let stratum = [1, 1, 2, 2, 3, 3, 4, 4];
        let psu = [1, 2, 1, 2, 1, 2, 1, 2];
        let expected = taylor_total(&stratum, &psu);
        for fay in [0.0, 0.3] {
            let mut generator = ReplicateWeightGenerator::new(RepMethod::Brr, 0).with_fay_coef(fay).unwrap();
            let set = generator.replicate(&W, &to_labels(&psu), Some(&to_labels(&stratum))).unwrap();
            let result = set.estimate(Statistic::Total, &Y, None, VarianceCenter::FullSample, 0.05).unwrap();
            assert_relative_eq!(result.variance[&Domain::Whole].scalar().unwrap(), expected, max_relative = 1e-10);
        }
    }

    #[test]
    fn test_raw_coefficients_are_weighted_before_estimating() {
        let psu = to_labels(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let mut generator = ReplicateWeightGenerator::new(RepMethod::Jackknife, 0).with_stratification(false);
        let adjusted = generator.replicate(&W, &psu, None).unwrap();
        let mut generator = generator.with_raw_coefs(true);
        let raw = generator.replicate(&W, &psu, None).unwrap();
        for statistic in [Statistic::Total, Statistic::Mean] {
            let a = adjusted.estimate(statistic, &Y, None, VarianceCenter::FullSample, 0.05).unwrap();
            let b = raw.estimate(statistic, &Y, None, VarianceCenter::FullSample, 0.05).unwrap();
            assert_relative_eq!(
                a.variance[&Domain::Whole].scalar().unwrap(),
                b.variance[&Domain::Whole].scalar().unwrap(),
                max_relative = 1e-12
            );
        }
    }

    #[test]
    fn test_proportion_and_ratio() {
        let y = [1.0, 0.0, 1.0, 1.0, 0.0, 1.0];
        let x = [2.0, 1.0, 3.0, 2.0, 2.0, 1.0];
        let w = [1.0, 2.0, 1.0, 1.0, 2.0, 1.0];
        let psu = to_labels(&[1, 2, 3, 4, 5, 6]);
        let mut generator = ReplicateWeightGenerator::new(RepMethod::Bootstrap, 3)
            .with_stratification(false)
            .with_number_reps(50);
        let set = generator.replicate(&w, &psu, None).unwrap();

        let prop = set.estimate(Statistic::Proportion, &y, None, VarianceCenter::ReplicateMean, 0.05).unwrap();
        let point = &prop.point_est[&Domain::Whole];
        assert_relative_eq!(point.level(1.0).unwrap(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(point.level(0.0).unwrap(), 0.5, epsilon = 1e-12);
        let lo = prop.lower_ci[&Domain::Whole].level(1.0).unwrap();
        assert!(lo > 0.0 && lo < 0.5);

        let ratio = set.estimate(Statistic::Ratio, &y, Some(&x), VarianceCenter::FullSample, 0.05).unwrap();
        assert_relative_eq!(ratio.point_est[&Domain::Whole].scalar().unwrap(), 4.0 / 14.0, epsilon = 1e-12);
        assert!(matches!(
            set.estimate(Statistic::Ratio, &y, None, VarianceCenter::FullSample, 0.05),
            Err(SurveyError::MissingSecondary)
        ));
        assert!(set.estimate(Statistic::Total, &y[..3], None, VarianceCenter::FullSample, 0.05).is_err());
    }

    #[test]
    fn test_missing_values_are_not_a_proportion_level() {
        let y = [1.0, 0.0, f64::NAN, 1.0];
        let w = [1.0; 4];
        let psu = to_labels(&[1, 2, 3, 4]);
        let mut generator = ReplicateWeightGenerator::new(RepMethod::Jackknife, 0).with_stratification(false);
        let set = generator.replicate(&w, &psu, None).unwrap();
        let prop = set.estimate(Statistic::Proportion, &y, None, VarianceCenter::FullSample, 0.05).unwrap();
        let levels: Vec<f64> = prop.point_est[&Domain::Whole].levels().unwrap().keys().map(|l| l.value()).collect();
        assert_eq!(levels, vec![0.0, 1.0]);

        // same level set as the linearized estimator on the same data
        let design = SurveyDesign::new(y, w);
        let taylor = TaylorEstimator::new(Statistic::Proportion, 0.05).unwrap();
        let result = taylor.estimate(&design, EstimateOptions::default()).unwrap();
        let taylor_levels: Vec<f64> =
            result.point_est[&Domain::Whole].levels().unwrap().keys().map(|l| l.value()).collect();
        assert_eq!(levels, taylor_levels);
        assert!(prop.point_est[&Domain::Whole].level(1.0).unwrap().is_nan());
    }

    #[test]
    fn test_center_from_str() {
        assert_eq!("rep_mean".parse::<VarianceCenter>().unwrap(), VarianceCenter::ReplicateMean);
        assert_eq!("MSE".parse::<VarianceCenter>().unwrap(), VarianceCenter::FullSample);
        assert!("median".parse::<VarianceCenter>().is_err());
    }
}
