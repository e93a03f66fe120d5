// src/design/mod.rs
//! Survey design inputs and their normalized, grouped form.

pub mod grouping;

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, warn};

use crate::error::{Result, SurveyError};
use grouping::{index_labels, index_nested, members_by_parent, Grouping};

/// Label used for the implicit stratum of an unstratified design.
const NO_STRATUM: &str = "(unstratified)";

/// Convert any displayable labels (integers, strings) to owned strings.
pub fn to_labels<T: ToString>(values: &[T]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

/// Estimation domain. `Whole` is the entire sample, never a real label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Domain {
    Whole,
    Label(String),
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Whole => write!(f, "(whole sample)"),
            Domain::Label(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Domain {
    fn from(s: &str) -> Self {
        Domain::Label(s.to_string())
    }
}

/// Finite population correction, expressed as the multiplicative factor
/// applied to a stratum's variance (1 - sampling rate).
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Fpc {
    #[default]
    None,
    Factor(f64),
    ByStratum(HashMap<String, f64>),
}

impl Fpc {
    /// Build per-stratum factors from sampling rates.
    pub fn from_sampling_rates(rates: HashMap<String, f64>) -> Self {
        Fpc::ByStratum(rates.into_iter().map(|(s, f)| (s, 1.0 - f)).collect())
    }
}

/// Raw design inputs: equal-length columns indexed by sample unit.
#[derive(Debug, Clone, Default)]
pub struct SurveyDesign {
    pub(crate) value: Vec<f64>,
    pub(crate) weight: Vec<f64>,
    pub(crate) secondary: Option<Vec<f64>>,
    pub(crate) stratum: Option<Vec<String>>,
    pub(crate) psu: Option<Vec<String>>,
    pub(crate) ssu: Option<Vec<String>>,
    pub(crate) domain: Option<Vec<String>>,
    pub(crate) fpc: Fpc,
}

impl SurveyDesign {
    pub fn new(value: impl Into<Vec<f64>>, weight: impl Into<Vec<f64>>) -> Self {
        SurveyDesign { value: value.into(), weight: weight.into(), ..Default::default() }
    }

    /// Design with every sampling weight equal to one.
    pub fn unweighted(value: impl Into<Vec<f64>>) -> Self {
        let value = value.into();
        let weight = vec![1.0; value.len()];
        SurveyDesign::new(value, weight)
    }

    /// Denominator variable for ratio estimation.
    pub fn with_secondary(mut self, secondary: impl Into<Vec<f64>>) -> Self {
        self.secondary = Some(secondary.into());
        self
    }

    pub fn with_stratum<I, T>(mut self, stratum: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        self.stratum = Some(stratum.into_iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_psu<I, T>(mut self, psu: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        self.psu = Some(psu.into_iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_ssu<I, T>(mut self, ssu: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        self.ssu = Some(ssu.into_iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_domain<I, T>(mut self, domain: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        self.domain = Some(domain.into_iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_fpc(mut self, fpc: Fpc) -> Self {
        self.fpc = fpc;
        self
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ContextOptions {
    /// Drop units whose value, secondary value or weight is NaN.
    pub remove_nan: bool,
    /// Fail when no stratum column is given.
    pub require_stratum: bool,
}

/// Identifies a PSU. PSU labels are only unique within their stratum.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PsuKey {
    pub stratum: Option<String>,
    pub psu: String,
}

/// Validated design with aligned columns and the stratum/PSU/SSU structure
/// used by both the Taylor estimator and the replicate generator.
#[derive(Debug, Clone)]
pub struct DesignContext {
    pub(crate) value: Vec<f64>,
    pub(crate) weight: Vec<f64>,
    pub(crate) secondary: Option<Vec<f64>>,
    pub(crate) domain: Option<Grouping>,
    pub(crate) strata: Grouping,
    pub(crate) stratified: bool,
    /// PSU code of each unit, unique across strata.
    pub(crate) psu_ids: Vec<u32>,
    pub(crate) psu_keys: Vec<PsuKey>,
    pub(crate) psu_stratum: Vec<u32>,
    pub(crate) stratum_psus: Vec<Vec<u32>>,
    /// SSU code of each unit, unique across PSUs.
    pub(crate) ssu_ids: Option<Vec<u32>>,
    pub(crate) fpc: Vec<f64>,
    pub(crate) dropped: usize,
}

impl DesignContext {
    pub fn new(design: &SurveyDesign, options: ContextOptions) -> Result<Self> {
        let n = design.value.len();
        check_len("weight", n, design.weight.len())?;
        if let Some(x) = &design.secondary {
            check_len("secondary value", n, x.len())?;
        }
        for (field, col) in [
            ("stratum", &design.stratum),
            ("psu", &design.psu),
            ("ssu", &design.ssu),
            ("domain", &design.domain),
        ] {
            if let Some(col) = col {
                check_len(field, n, col.len())?;
            }
        }
        if options.require_stratum && design.stratum.is_none() {
            return Err(SurveyError::MissingStratum);
        }
        if matches!(design.fpc, Fpc::ByStratum(_)) && design.stratum.is_none() {
            return Err(SurveyError::MissingStratum);
        }

        let keep: Vec<usize> = if options.remove_nan {
            (0..n)
                .filter(|&i| {
                    !design.value[i].is_nan()
                        && !design.weight[i].is_nan()
                        && !design.secondary.as_ref().is_some_and(|x| x[i].is_nan())
                })
                .collect()
        } else {
            (0..n).collect()
        };
        let dropped = n - keep.len();
        if dropped > 0 {
            debug!(dropped, "removed units with missing value or weight");
        }

        let take_f64 = |col: &[f64]| -> Vec<f64> { keep.iter().map(|&i| col[i]).collect() };
        let take_str = |col: &[String]| -> Vec<String> { keep.iter().map(|&i| col[i].clone()).collect() };

        let value = take_f64(&design.value);
        let weight = take_f64(&design.weight);
        let secondary = design.secondary.as_deref().map(take_f64);
        let domain = design.domain.as_deref().map(|d| index_labels(&take_str(d)));

        let n_kept = keep.len();
        let (strata, stratified) = match design.stratum.as_deref() {
            Some(s) => (index_labels(&take_str(s)), true),
            None => (Grouping::single(n_kept, NO_STRATUM), false),
        };

        // Without a PSU column every unit is its own PSU.
        let (psu_inner, psu_labels): (Vec<u32>, Vec<String>) = match design.psu.as_deref() {
            Some(p) => {
                let g = index_labels(&take_str(p));
                (g.ids, g.labels)
            }
            None => ((0..n_kept as u32).collect(), keep.iter().map(|i| i.to_string()).collect()),
        };
        let (psu_ids, psu_pairs) = index_nested(&strata.ids, &psu_inner);
        let psu_stratum: Vec<u32> = psu_pairs.iter().map(|&(h, _)| h).collect();
        let psu_keys = psu_pairs
            .iter()
            .map(|&(h, p)| PsuKey {
                stratum: stratified.then(|| strata.label(h).to_string()),
                psu: psu_labels[p as usize].clone(),
            })
            .collect();
        let stratum_psus = members_by_parent(&psu_stratum, strata.n_groups());

        let ssu_ids = design.ssu.as_deref().map(|s| {
            let g = index_labels(&take_str(s));
            index_nested(&psu_ids, &g.ids).0
        });

        let fpc = resolve_fpc(&design.fpc, &strata)?;

        Ok(DesignContext {
            value,
            weight,
            secondary,
            domain,
            strata,
            stratified,
            psu_ids,
            psu_keys,
            psu_stratum,
            stratum_psus,
            ssu_ids,
            fpc,
            dropped,
        })
    }

    /// Number of units kept.
    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn n_strata(&self) -> usize {
        self.stratum_psus.iter().filter(|psus| !psus.is_empty()).count()
    }

    pub fn n_psus(&self) -> usize {
        self.psu_keys.len()
    }

    /// Units removed by `remove_nan`.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn is_stratified(&self) -> bool {
        self.stratified
    }

    pub fn psu_keys(&self) -> &[PsuKey] {
        &self.psu_keys
    }

    pub(crate) fn stratum_label(&self, h: usize) -> &str {
        self.strata.label(h as u32)
    }

    /// Domains present in the sample, each with its membership mask.
    pub(crate) fn domain_masks(&self) -> Vec<(Domain, Vec<bool>)> {
        match &self.domain {
            None => vec![(Domain::Whole, vec![true; self.len()])],
            Some(g) => (0..g.n_groups() as u32)
                .map(|d| {
                    let mask = g.ids.iter().map(|&id| id == d).collect();
                    (Domain::Label(g.label(d).to_string()), mask)
                })
                .collect(),
        }
    }
}

fn check_len(field: &'static str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(SurveyError::LengthMismatch { field, expected, got });
    }
    Ok(())
}

fn resolve_fpc(fpc: &Fpc, strata: &Grouping) -> Result<Vec<f64>> {
    let factors = match fpc {
        Fpc::None => vec![1.0; strata.n_groups()],
        Fpc::Factor(f) => vec![*f; strata.n_groups()],
        Fpc::ByStratum(map) => strata
            .labels
            .iter()
            .map(|s| {
                map.get(s).copied().unwrap_or_else(|| {
                    warn!(stratum = %s, "no fpc given for stratum, using 1");
                    1.0
                })
            })
            .collect(),
    };
    if let Some(f) = factors.iter().find(|f| !(0.0..=1.0).contains(*f)) {
        return Err(SurveyError::InvalidParameter(format!("fpc factor {} is outside [0, 1]", f)));
    }
    Ok(factors)
}
