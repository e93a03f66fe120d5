// src/weighting/replication.rs
//
// Replicate weight creation for variance estimation methods:
// - Jackknife (delete-one-PSU)
// - BRR (Balanced Repeated Replication, optionally with Fay's damping)
// - Bootstrap (rescaled, stratified)

use std::fmt;
use std::str::FromStr;

use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use tracing::{debug, info};

use super::hadamard::{brr_number_reps, hadamard};
use crate::design::{ContextOptions, DesignContext, PsuKey, SurveyDesign};
use crate::estimation::taylor::degrees_of_freedom;
use crate::error::{Result, SurveyError};

pub const DEFAULT_BOOTSTRAP_REPS: usize = 500;

// ============================================================================
// Enums & Config
// ============================================================================

/// Replication method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepMethod {
    Jackknife,
    Brr,
    Bootstrap,
}

impl FromStr for RepMethod {
    type Err = SurveyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "jackknife" | "jk" | "jkn" => Ok(RepMethod::Jackknife),
            "brr" => Ok(RepMethod::Brr),
            "bootstrap" | "boot" | "bs" => Ok(RepMethod::Bootstrap),
            _ => Err(SurveyError::invalid_option("replication method", s)),
        }
    }
}

impl fmt::Display for RepMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RepMethod::Jackknife => "jackknife",
            RepMethod::Brr => "brr",
            RepMethod::Bootstrap => "bootstrap",
        };
        f.write_str(name)
    }
}

/// Builds replicate weight systems from a stratum/PSU structure.
///
/// Bootstrap draws come from the generator's own seeded stream, so two
/// generators with the same seed produce the same replicates, and successive
/// calls on one generator continue the stream.
#[derive(Debug, Clone)]
pub struct ReplicateWeightGenerator {
    method: RepMethod,
    stratification: bool,
    number_reps: Option<usize>,
    fay_coef: f64,
    samp_rate: f64,
    size_gap: usize,
    raw_coefs: bool,
    rng: Xoshiro256PlusPlus,
}

impl ReplicateWeightGenerator {
    pub fn new(method: RepMethod, seed: u64) -> Self {
        ReplicateWeightGenerator {
            method,
            stratification: true,
            number_reps: None,
            fay_coef: 0.0,
            samp_rate: 0.0,
            size_gap: 1,
            raw_coefs: false,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    /// When false, any stratum passed to [`replicate`](Self::replicate) is ignored.
    pub fn with_stratification(mut self, stratification: bool) -> Self {
        self.stratification = stratification;
        self
    }

    /// Bootstrap replicate count, or the minimum BRR replicate count.
    /// Ignored by the jackknife.
    pub fn with_number_reps(mut self, number_reps: usize) -> Self {
        self.number_reps = Some(number_reps);
        self
    }

    pub fn with_fay_coef(mut self, fay_coef: f64) -> Result<Self> {
        if !(0.0..1.0).contains(&fay_coef) {
            return Err(SurveyError::InvalidParameter(format!("fay_coef must be in [0, 1), got {}", fay_coef)));
        }
        self.fay_coef = fay_coef;
        Ok(self)
    }

    /// Sampling rate of PSUs within strata, used by the bootstrap.
    pub fn with_samp_rate(mut self, samp_rate: f64) -> Result<Self> {
        if !(0.0..1.0).contains(&samp_rate) {
            return Err(SurveyError::InvalidParameter(format!("samp_rate must be in [0, 1), got {}", samp_rate)));
        }
        self.samp_rate = samp_rate;
        Ok(self)
    }

    /// Bootstrap resample size is the stratum PSU count minus this gap.
    pub fn with_size_gap(mut self, size_gap: usize) -> Self {
        self.size_gap = size_gap;
        self
    }

    /// Return the adjustment coefficients instead of adjusted weights.
    pub fn with_raw_coefs(mut self, raw_coefs: bool) -> Self {
        self.raw_coefs = raw_coefs;
        self
    }

    pub fn method(&self) -> RepMethod {
        self.method
    }

    pub fn replicate(&mut self, weight: &[f64], psu: &[String], stratum: Option<&[String]>) -> Result<ReplicateWeightSet> {
        let mut design = SurveyDesign::new(vec![0.0; weight.len()], weight).with_psu(psu);
        match stratum {
            Some(s) if self.stratification => design = design.with_stratum(s),
            Some(_) => debug!("stratification disabled, ignoring stratum"),
            None => {}
        }
        let options = ContextOptions { remove_nan: false, require_stratum: self.stratification };
        let ctx = DesignContext::new(&design, options)?;

        let (psu_coefs, rep_coefs) = match self.method {
            RepMethod::Jackknife => jackknife_coefs(&ctx)?,
            RepMethod::Brr => self.brr_coefs(&ctx)?,
            RepMethod::Bootstrap => self.bootstrap_coefs(&ctx)?,
        };
        let weights = unit_weights(&ctx, &psu_coefs, self.raw_coefs);
        info!(
            method = %self.method,
            reps = rep_coefs.len(),
            psus = ctx.n_psus(),
            strata = ctx.n_strata(),
            "created replicate weights"
        );

        Ok(ReplicateWeightSet {
            method: self.method,
            fay_coef: if self.method == RepMethod::Brr { self.fay_coef } else { 0.0 },
            psu_keys: ctx.psu_keys.clone(),
            psu_coefs,
            unit_psu: ctx.psu_ids.clone(),
            base_weight: ctx.weight.clone(),
            weights,
            raw: self.raw_coefs,
            rep_coefs,
            degrees_of_freedom: degrees_of_freedom(&ctx),
            number_strata: ctx.n_strata(),
        })
    }

    // ========================================================================
    // BRR
    // ========================================================================

    fn brr_coefs(&self, ctx: &DesignContext) -> Result<(Array2<f64>, Vec<f64>)> {
        let pairs = brr_pairs(ctx)?;
        let n_reps = brr_number_reps(pairs.len(), self.number_reps.unwrap_or(0));
        let h = hadamard(n_reps)?;
        debug!(pairs = pairs.len(), n_reps, "brr hadamard order");

        let fay = self.fay_coef;
        let mut coefs = Array2::ones((ctx.n_psus(), n_reps));
        for (k, &(first, second)) in pairs.iter().enumerate() {
            for r in 0..n_reps {
                let c = if h[[r, k + 1]] > 0.0 { fay } else { 2.0 - fay };
                coefs[[first, r]] = c;
                coefs[[second, r]] = 2.0 - c;
            }
        }
        let rep_coef = 1.0 / (n_reps as f64 * (1.0 - fay).powi(2));
        Ok((coefs, vec![rep_coef; n_reps]))
    }

    // ========================================================================
    // Bootstrap
    // ========================================================================

    fn bootstrap_coefs(&mut self, ctx: &DesignContext) -> Result<(Array2<f64>, Vec<f64>)> {
        let n_reps = self.number_reps.unwrap_or(DEFAULT_BOOTSTRAP_REPS);
        if n_reps == 0 {
            return Err(SurveyError::InvalidParameter("bootstrap requires at least one replicate".into()));
        }
        let gap = self.size_gap;

        let mut strata = Vec::new();
        for (h, psus) in ctx.stratum_psus.iter().enumerate() {
            let n = psus.len();
            if n == 0 {
                continue;
            }
            if n <= gap {
                return Err(SurveyError::BootstrapSize { stratum: ctx.stratum_label(h).to_string(), psus: n, gap });
            }
            if n == 1 {
                return Err(SurveyError::SinglePsu { stratum: ctx.stratum_label(h).to_string() });
            }
            let m = n - gap;
            let ratio_sqrt = ((1.0 - self.samp_rate) * m as f64 / (n as f64 - 1.0)).sqrt();
            strata.push((psus, m, ratio_sqrt, n as f64 / m as f64));
        }

        let mut coefs = Array2::zeros((ctx.n_psus(), n_reps));
        let mut counts = Vec::new();
        for r in 0..n_reps {
            for &(psus, m, ratio_sqrt, scale) in &strata {
                counts.clear();
                counts.resize(psus.len(), 0usize);
                for _ in 0..m {
                    counts[self.rng.random_range(0..psus.len())] += 1;
                }
                for (&p, &count) in psus.iter().zip(counts.iter()) {
                    coefs[[p as usize, r]] = 1.0 - ratio_sqrt + ratio_sqrt * scale * count as f64;
                }
            }
        }
        Ok((coefs, vec![1.0 / n_reps as f64; n_reps]))
    }
}

// ============================================================================
// Jackknife
// ============================================================================

/// Delete-one-PSU coefficients: one replicate per PSU, in PSU order.
fn jackknife_coefs(ctx: &DesignContext) -> Result<(Array2<f64>, Vec<f64>)> {
    let n_psus = ctx.n_psus();
    let mut coefs = Array2::ones((n_psus, n_psus));
    let mut rep_coefs = vec![0.0; n_psus];
    for (h, psus) in ctx.stratum_psus.iter().enumerate() {
        let n_h = psus.len();
        match n_h {
            0 => continue,
            1 => return Err(SurveyError::SinglePsu { stratum: ctx.stratum_label(h).to_string() }),
            _ => {}
        }
        let adj = n_h as f64 / (n_h as f64 - 1.0);
        for &deleted in psus {
            let r = deleted as usize;
            for &p in psus {
                coefs[[p as usize, r]] = if p == deleted { 0.0 } else { adj };
            }
            rep_coefs[r] = (n_h as f64 - 1.0) / n_h as f64;
        }
    }
    Ok((coefs, rep_coefs))
}

/// PSU index pairs forming the BRR half-samples. Unstratified designs are
/// paired consecutively in order of first appearance.
fn brr_pairs(ctx: &DesignContext) -> Result<Vec<(usize, usize)>> {
    if ctx.is_stratified() {
        return ctx
            .stratum_psus
            .iter()
            .enumerate()
            .filter(|(_, psus)| !psus.is_empty())
            .map(|(h, psus)| match psus.as_slice() {
                &[a, b] => Ok((a as usize, b as usize)),
                _ => Err(SurveyError::BrrPsuCount { stratum: ctx.stratum_label(h).to_string(), count: psus.len() }),
            })
            .collect();
    }

    let mut seen = vec![false; ctx.n_psus()];
    let mut order = Vec::with_capacity(ctx.n_psus());
    for &p in &ctx.psu_ids {
        if !seen[p as usize] {
            seen[p as usize] = true;
            order.push(p as usize);
        }
    }
    if order.len() % 2 != 0 {
        return Err(SurveyError::BrrPsuCount { stratum: ctx.stratum_label(0).to_string(), count: order.len() });
    }
    Ok(order.chunks(2).map(|pair| (pair[0], pair[1])).collect())
}

/// Expand PSU coefficients to units, one column per replicate.
fn unit_weights(ctx: &DesignContext, psu_coefs: &Array2<f64>, raw: bool) -> Array2<f64> {
    let n_obs = ctx.len();
    let n_reps = psu_coefs.ncols();
    let columns: Vec<Array1<f64>> = (0..n_reps)
        .into_par_iter()
        .map(|r| {
            Array1::from_shape_fn(n_obs, |i| {
                let c = psu_coefs[[ctx.psu_ids[i] as usize, r]];
                if raw { c } else { ctx.weight[i] * c }
            })
        })
        .collect();

    let mut result = Array2::zeros((n_obs, n_reps));
    for (r, col) in columns.into_iter().enumerate() {
        result.column_mut(r).assign(&col);
    }
    result
}

// ============================================================================
// Replicate Weight Set
// ============================================================================

/// Replicate adjustment coefficients for every PSU and the matching unit
/// weights.
#[derive(Debug, Clone)]
pub struct ReplicateWeightSet {
    pub(crate) method: RepMethod,
    pub(crate) fay_coef: f64,
    pub(crate) psu_keys: Vec<PsuKey>,
    /// PSUs x replicates
    pub(crate) psu_coefs: Array2<f64>,
    pub(crate) unit_psu: Vec<u32>,
    pub(crate) base_weight: Vec<f64>,
    /// units x replicates; raw coefficients when `raw` is set
    pub(crate) weights: Array2<f64>,
    pub(crate) raw: bool,
    pub(crate) rep_coefs: Vec<f64>,
    pub(crate) degrees_of_freedom: usize,
    pub(crate) number_strata: usize,
}

impl ReplicateWeightSet {
    pub fn method(&self) -> RepMethod {
        self.method
    }

    pub fn number_reps(&self) -> usize {
        self.rep_coefs.len()
    }

    pub fn rep_coefs(&self) -> &[f64] {
        &self.rep_coefs
    }

    pub fn degrees_of_freedom(&self) -> usize {
        self.degrees_of_freedom
    }

    pub fn psu_keys(&self) -> &[PsuKey] {
        &self.psu_keys
    }

    pub fn psu_coefs(&self) -> &Array2<f64> {
        &self.psu_coefs
    }

    /// Replicate weights (or raw coefficients) of each unit.
    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    pub fn is_raw(&self) -> bool {
        self.raw
    }

    pub fn base_weight(&self) -> &[f64] {
        &self.base_weight
    }

    /// PSU index of each unit into [`psu_keys`](Self::psu_keys).
    pub fn unit_psu(&self) -> &[u32] {
        &self.unit_psu
    }

    pub fn default_prefix(&self) -> &'static str {
        match self.method {
            RepMethod::Jackknife => "_jk_wgt_",
            RepMethod::Brr if self.fay_coef > 0.0 => "_fay_wgt_",
            RepMethod::Brr => "_brr_wgt_",
            RepMethod::Bootstrap => "_boot_wgt_",
        }
    }

    /// Replicate column names, numbered from 1.
    pub fn column_names(&self, prefix: Option<&str>) -> Vec<String> {
        let prefix = prefix.unwrap_or_else(|| self.default_prefix());
        (1..=self.number_reps()).map(|r| format!("{}{}", prefix, r)).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::to_labels;
    use crate::error::ErrorKind;
    use approx::assert_relative_eq;

    fn labels<T: ToString>(xs: &[T]) -> Vec<String> {
        to_labels(xs)
    }

    #[test]
    fn test_jackknife_coefficients() {
        let weight = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let psu = labels(&[1, 2, 3, 3, 1, 2, 2]);
        let stratum = labels(&["a", "a", "a", "a", "b", "b", "b"]);
        let mut generator = ReplicateWeightGenerator::new(RepMethod::Jackknife, 1);
        let set = generator.replicate(&weight, &psu, Some(&stratum)).unwrap();

        assert_eq!(set.number_reps(), 5);
        assert_eq!(set.degrees_of_freedom(), 3);
        // replicate 0 deletes PSU a/1
        assert_eq!(set.psu_coefs().column(0).to_vec(), vec![0.0, 1.5, 1.5, 1.0, 1.0]);
        // replicate 3 deletes PSU b/1
        assert_eq!(set.psu_coefs().column(3).to_vec(), vec![1.0, 1.0, 1.0, 0.0, 2.0]);
        assert_relative_eq!(set.rep_coefs()[0], 2.0 / 3.0);
        assert_relative_eq!(set.rep_coefs()[4], 0.5);
        // weights are pre-multiplied
        assert_relative_eq!(set.weights()[[1, 0]], 3.0);
        assert_relative_eq!(set.weights()[[4, 3]], 0.0);
        assert_eq!(set.column_names(None)[0], "_jk_wgt_1");
    }

    #[test]
    fn test_jackknife_single_psu() {
        let mut generator = ReplicateWeightGenerator::new(RepMethod::Jackknife, 1);
        let err = generator
            .replicate(&[1.0, 1.0, 1.0], &labels(&[1, 2, 1]), Some(&labels(&[1, 1, 2])))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SinglePsu);
    }

    #[test]
    fn test_stratification_flag() {
        let weight = [1.0; 4];
        let psu = labels(&[1, 2, 3, 4]);
        let stratum = labels(&[1, 1, 2, 2]);

        let mut generator = ReplicateWeightGenerator::new(RepMethod::Jackknife, 1);
        let err = generator.replicate(&weight, &psu, None).unwrap_err();
        assert!(matches!(err, SurveyError::MissingStratum));

        let mut generator = ReplicateWeightGenerator::new(RepMethod::Jackknife, 1).with_stratification(false);
        let set = generator.replicate(&weight, &psu, Some(&stratum)).unwrap();
        assert_eq!(set.degrees_of_freedom(), 3);
        assert!(set.psu_keys().iter().all(|k| k.stratum.is_none()));
        assert_relative_eq!(set.psu_coefs()[[1, 0]], 4.0 / 3.0);
    }

    #[test]
    fn test_brr_coefficients() {
        let weight = vec![2.0; 6];
        let psu = labels(&[1, 2, 1, 2, 1, 2]);
        let stratum = labels(&[1, 1, 2, 2, 3, 3]);
        let mut generator = ReplicateWeightGenerator::new(RepMethod::Brr, 1);
        let set = generator.replicate(&weight, &psu, Some(&stratum)).unwrap();

        assert_eq!(set.number_reps(), 4);
        assert_eq!(set.degrees_of_freedom(), 3);
        assert!(set.rep_coefs().iter().all(|&c| c == 0.25));
        let coefs = set.psu_coefs();
        for r in 0..4 {
            for h in 0..3 {
                let (a, b) = (coefs[[2 * h, r]], coefs[[2 * h + 1, r]]);
                assert!((a, b) == (0.0, 2.0) || (a, b) == (2.0, 0.0));
            }
        }
        // half-samples are balanced: each PSU is kept in half the replicates
        for p in 0..6 {
            assert_eq!(coefs.row(p).iter().filter(|&&c| c == 2.0).count(), 2);
        }
        assert_eq!(set.column_names(None)[3], "_brr_wgt_4");
        assert_eq!(set.column_names(Some("rw")), vec!["rw1", "rw2", "rw3", "rw4"]);
    }

    #[test]
    fn test_fay_brr() {
        let psu = labels(&[1, 2, 1, 2]);
        let stratum = labels(&[1, 1, 2, 2]);
        let mut generator = ReplicateWeightGenerator::new(RepMethod::Brr, 1).with_fay_coef(0.3).unwrap().with_number_reps(10);
        let set = generator.replicate(&[1.0; 4], &psu, Some(&stratum)).unwrap();
        assert_eq!(set.number_reps(), 12);
        assert!(set.psu_coefs().iter().all(|&c| (c - 0.3).abs() < 1e-12 || (c - 1.7).abs() < 1e-12));
        assert_relative_eq!(set.rep_coefs()[0], 1.0 / (12.0 * 0.49), epsilon = 1e-12);
        assert_eq!(set.default_prefix(), "_fay_wgt_");

        let err = ReplicateWeightGenerator::new(RepMethod::Brr, 1).with_fay_coef(1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_brr_requires_two_psus() {
        let mut generator = ReplicateWeightGenerator::new(RepMethod::Brr, 1);
        let err = generator
            .replicate(&[1.0; 5], &labels(&[1, 2, 3, 1, 2]), Some(&labels(&[1, 1, 1, 2, 2])))
            .unwrap_err();
        assert!(matches!(err, SurveyError::BrrPsuCount { count: 3, .. }));
        assert_eq!(err.kind(), ErrorKind::Structural);
    }

    #[test]
    fn test_unstratified_brr_pairs_in_order_of_appearance() {
        let mut generator = ReplicateWeightGenerator::new(RepMethod::Brr, 1).with_stratification(false);
        let set = generator.replicate(&[1.0; 4], &labels(&["d", "c", "b", "a"]), None).unwrap();
        // PSUs are indexed a, b, c, d; pairs are (d, c) and (b, a)
        let coefs = set.psu_coefs();
        for r in 0..set.number_reps() {
            assert_eq!(coefs[[3, r]] + coefs[[2, r]], 2.0);
            assert_eq!(coefs[[1, r]] + coefs[[0, r]], 2.0);
        }

        let err = generator.replicate(&[1.0; 3], &labels(&[1, 2, 3]), None).unwrap_err();
        assert!(matches!(err, SurveyError::BrrPsuCount { count: 3, .. }));
    }

    #[test]
    fn test_bootstrap_coefficients() {
        let weight = vec![1.0; 8];
        let psu = labels(&[1, 2, 3, 4, 1, 2, 3, 4]);
        let stratum = labels(&[1, 1, 1, 1, 2, 2, 2, 2]);
        let mut generator = ReplicateWeightGenerator::new(RepMethod::Bootstrap, 42).with_number_reps(2000);
        let set = generator.replicate(&weight, &psu, Some(&stratum)).unwrap();

        assert_eq!(set.number_reps(), 2000);
        assert!(set.rep_coefs().iter().all(|&c| c == 1.0 / 2000.0));
        let coefs = set.psu_coefs();
        // resample sums to n - gap, so each stratum's coefficients average to 1
        for r in 0..2000 {
            let s1: f64 = (0..4).map(|p| coefs[[p, r]]).sum();
            assert_relative_eq!(s1, 4.0, epsilon = 1e-12);
        }
        for p in 0..8 {
            let mean = coefs.row(p).mean().unwrap();
            assert_relative_eq!(mean, 1.0, epsilon = 0.1);
        }
    }

    #[test]
    fn test_bootstrap_samp_rate_shrinks_coefficients() {
        let psu = labels(&[1, 2, 3, 4]);
        let mut generator = ReplicateWeightGenerator::new(RepMethod::Bootstrap, 7)
            .with_stratification(false)
            .with_number_reps(50)
            .with_samp_rate(0.5)
            .unwrap();
        let set = generator.replicate(&[1.0; 4], &psu, None).unwrap();
        // ratio_sqrt = sqrt(0.5), multiplicity in 0..=3
        let rs = 0.5f64.sqrt();
        let allowed: Vec<f64> = (0..=3).map(|m| 1.0 - rs + rs * 4.0 / 3.0 * m as f64).collect();
        assert!(set.psu_coefs().iter().all(|c| allowed.iter().any(|a| (a - c).abs() < 1e-12)));
        assert!(ReplicateWeightGenerator::new(RepMethod::Bootstrap, 7).with_samp_rate(1.0).is_err());
    }

    #[test]
    fn test_bootstrap_size() {
        let mut generator = ReplicateWeightGenerator::new(RepMethod::Bootstrap, 1).with_size_gap(2);
        let err = generator
            .replicate(&[1.0; 4], &labels(&[1, 2, 1, 2]), Some(&labels(&[1, 1, 2, 2])))
            .unwrap_err();
        assert!(matches!(err, SurveyError::BootstrapSize { psus: 2, gap: 2, .. }));
        assert_eq!(err.kind(), ErrorKind::Structural);
    }

    #[test]
    fn test_bootstrap_seed_reproducible() {
        let psu = labels(&[1, 2, 3, 4, 5]);
        let run = |seed| {
            let mut generator = ReplicateWeightGenerator::new(RepMethod::Bootstrap, seed)
                .with_stratification(false)
                .with_number_reps(20);
            let first = generator.replicate(&[1.0; 5], &psu, None).unwrap();
            let second = generator.replicate(&[1.0; 5], &psu, None).unwrap();
            (first.psu_coefs().clone(), second.psu_coefs().clone())
        };
        let (a1, a2) = run(11);
        let (b1, b2) = run(11);
        assert_eq!(a1, b1);
        assert_eq!(a2, b2);
        assert_ne!(a1, a2);
    }

    #[test]
    fn test_raw_coefs() {
        let mut generator = ReplicateWeightGenerator::new(RepMethod::Jackknife, 1)
            .with_stratification(false)
            .with_raw_coefs(true);
        let set = generator.replicate(&[5.0, 5.0, 5.0], &labels(&[1, 2, 3]), None).unwrap();
        assert!(set.is_raw());
        assert_eq!(set.weights().row(0).to_vec(), vec![0.0, 1.5, 1.5]);
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("JK".parse::<RepMethod>().unwrap(), RepMethod::Jackknife);
        assert_eq!("bootstrap".parse::<RepMethod>().unwrap(), RepMethod::Bootstrap);
        assert_eq!("sdr".parse::<RepMethod>().unwrap_err().kind(), ErrorKind::Configuration);
    }
}
