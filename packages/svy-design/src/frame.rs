// src/frame.rs
//! Polars adapters: build designs from data frames and tabulate results.

use std::collections::BTreeMap;

use polars::prelude::*;

use crate::design::{Domain, SurveyDesign};
use crate::error::{Result, SurveyError};
use crate::estimation::estimator::{Estimate, Level, Value};
use crate::weighting::replication::ReplicateWeightSet;

/// Names of the design columns in a data frame. Only `value` is required;
/// without `weight` every unit has weight one.
#[derive(Debug, Clone, Default)]
pub struct FrameColumns<'a> {
    pub value: &'a str,
    pub weight: Option<&'a str>,
    pub secondary: Option<&'a str>,
    pub stratum: Option<&'a str>,
    pub psu: Option<&'a str>,
    pub ssu: Option<&'a str>,
    pub domain: Option<&'a str>,
}

impl<'a> FrameColumns<'a> {
    pub fn new(value: &'a str) -> Self {
        FrameColumns { value, ..Default::default() }
    }
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let col = df.column(name)?.cast(&DataType::Float64)?;
    Ok(col.f64()?.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

fn label_column(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let col = df.column(name)?.cast(&DataType::String)?;
    col.str()?
        .iter()
        .map(|v| {
            v.map(str::to_string)
                .ok_or_else(|| SurveyError::InvalidParameter(format!("column '{}' has missing labels", name)))
        })
        .collect()
}

/// Numeric columns are cast to Float64 with nulls read as NaN; label columns
/// are cast to String and may not contain nulls.
pub fn design_from_frame(df: &DataFrame, columns: &FrameColumns) -> Result<SurveyDesign> {
    let value = float_column(df, columns.value)?;
    let weight = match columns.weight {
        Some(name) => float_column(df, name)?,
        None => vec![1.0; value.len()],
    };
    let mut design = SurveyDesign::new(value, weight);
    if let Some(name) = columns.secondary {
        design = design.with_secondary(float_column(df, name)?);
    }
    if let Some(name) = columns.stratum {
        design = design.with_stratum(label_column(df, name)?);
    }
    if let Some(name) = columns.psu {
        design = design.with_psu(label_column(df, name)?);
    }
    if let Some(name) = columns.ssu {
        design = design.with_ssu(label_column(df, name)?);
    }
    if let Some(name) = columns.domain {
        design = design.with_domain(label_column(df, name)?);
    }
    Ok(design)
}

fn lookup(map: &BTreeMap<Domain, Value>, domain: &Domain, level: Option<Level>) -> f64 {
    match (map.get(domain), level) {
        (Some(Value::Scalar(v)), None) => *v,
        (Some(Value::Levels(levels)), Some(l)) => levels.get(&l).copied().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

impl Estimate {
    /// One row per domain, and per level for proportions.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut keys: Vec<(&Domain, Option<Level>)> = Vec::new();
        for (domain, point) in &self.point_est {
            match point {
                Value::Scalar(_) => keys.push((domain, None)),
                Value::Levels(levels) => keys.extend(levels.keys().map(|&l| (domain, Some(l)))),
            }
        }
        let field = |map: &BTreeMap<Domain, Value>| -> Vec<f64> {
            keys.iter().map(|&(d, l)| lookup(map, d, l)).collect()
        };

        let mut columns: Vec<Column> = vec![Series::new(
            "domain".into(),
            keys.iter().map(|(d, _)| d.to_string()).collect::<Vec<_>>(),
        )
        .into_column()];
        if keys.iter().any(|(_, l)| l.is_some()) {
            let levels: Vec<Option<f64>> = keys.iter().map(|(_, l)| l.map(Level::value)).collect();
            columns.push(Series::new("level".into(), levels).into_column());
        }
        for (name, map) in [
            ("est", &self.point_est),
            ("var", &self.variance),
            ("se", &self.stderror),
            ("lci", &self.lower_ci),
            ("uci", &self.upper_ci),
        ] {
            columns.push(Series::new(name.into(), field(map)).into_column());
        }
        if !self.coef_var.is_empty() {
            columns.push(Series::new("cv".into(), field(&self.coef_var)).into_column());
        }
        if !self.deff.is_empty() {
            columns.push(Series::new("deff".into(), field(&self.deff)).into_column());
        }
        let df_col = vec![self.degrees_of_freedom as u32; keys.len()];
        columns.push(Series::new("df".into(), df_col).into_column());

        Ok(DataFrame::new(columns)?)
    }
}

/// Column names for [`ReplicateWeightSet::to_frame`]. Unset names fall back
/// to `stratum`, `psu`, `weight` and the method's replicate prefix.
#[derive(Debug, Clone, Default)]
pub struct ReplicateFrameNames<'a> {
    pub prefix: Option<&'a str>,
    pub psu: Option<&'a str>,
    pub stratum: Option<&'a str>,
    pub weight: Option<&'a str>,
}

impl ReplicateWeightSet {
    /// Unit-level table: stratum (when stratified), PSU, base weight and one
    /// column per replicate.
    pub fn to_frame(&self, names: &ReplicateFrameNames) -> Result<DataFrame> {
        let keys: Vec<_> = self.unit_psu.iter().map(|&p| &self.psu_keys[p as usize]).collect();
        let mut columns: Vec<Column> = Vec::with_capacity(self.number_reps() + 3);
        if keys.iter().any(|k| k.stratum.is_some()) {
            let stratum: Vec<Option<&str>> = keys.iter().map(|k| k.stratum.as_deref()).collect();
            columns.push(Series::new(names.stratum.unwrap_or("stratum").into(), stratum).into_column());
        }
        let psu: Vec<&str> = keys.iter().map(|k| k.psu.as_str()).collect();
        columns.push(Series::new(names.psu.unwrap_or("psu").into(), psu).into_column());
        columns.push(Series::new(names.weight.unwrap_or("weight").into(), self.base_weight.clone()).into_column());
        for (name, col) in self.column_names(names.prefix).into_iter().zip(self.weights.columns()) {
            columns.push(Series::new(name.into(), col.to_vec()).into_column());
        }
        Ok(DataFrame::new(columns)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimation::estimator::{EstimateOptions, Statistic, TaylorEstimator};
    use crate::weighting::replication::{RepMethod, ReplicateWeightGenerator};
    use approx::assert_relative_eq;

    fn sample() -> DataFrame {
        df![
            "y" => [1i64, 0, 1, 1, 0, 1],
            "w" => [2.0, 1.0, 1.5, 1.0, 2.0, 1.0],
            "stratum" => [1i64, 1, 1, 2, 2, 2],
            "psu" => ["a", "b", "b", "a", "b", "c"],
            "region" => ["n", "s", "n", "s", "n", "s"],
        ]
        .unwrap()
    }

    #[test]
    fn test_design_from_frame() {
        let columns = FrameColumns {
            weight: Some("w"),
            stratum: Some("stratum"),
            psu: Some("psu"),
            ..FrameColumns::new("y")
        };
        let design = design_from_frame(&sample(), &columns).unwrap();
        assert_eq!(design.len(), 6);
        assert_eq!(design.value, vec![1.0, 0.0, 1.0, 1.0, 0.0, 1.0]);
        assert_eq!(design.stratum.as_ref().unwrap()[3], "2");

        let missing = FrameColumns { psu: Some("cluster"), ..FrameColumns::new("y") };
        assert!(matches!(design_from_frame(&sample(), &missing), Err(SurveyError::Polars(_))));
    }

    #[test]
    fn test_null_labels_are_rejected() {
        let df = df![
            "y" => [1.0, 2.0],
            "psu" => [Some("a"), None],
        ]
        .unwrap();
        let columns = FrameColumns { psu: Some("psu"), ..FrameColumns::new("y") };
        assert!(matches!(design_from_frame(&df, &columns), Err(SurveyError::InvalidParameter(_))));
    }

    #[test]
    fn test_estimate_to_frame() {
        let columns = FrameColumns {
            weight: Some("w"),
            stratum: Some("stratum"),
            psu: Some("psu"),
            domain: Some("region"),
            ..FrameColumns::new("y")
        };
        let design = design_from_frame(&sample(), &columns).unwrap();
        let est = TaylorEstimator::new(Statistic::Proportion, 0.05).unwrap();
        let opts = EstimateOptions { deff: true, ..Default::default() };
        let frame = est.estimate(&design, opts).unwrap().to_frame().unwrap();

        // two domains x two levels
        assert_eq!(frame.height(), 4);
        let names: Vec<&str> = frame.get_column_names().iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["domain", "level", "est", "var", "se", "lci", "uci", "deff", "df"]);
        let est_col = frame.column("est").unwrap().f64().unwrap();
        let n_sum = est_col.get(0).unwrap() + est_col.get(1).unwrap();
        assert_relative_eq!(n_sum, 1.0, epsilon = 1e-12);
        assert_eq!(frame.column("df").unwrap().u32().unwrap().get(0), Some(3));
    }

    #[test]
    fn test_replicate_set_to_frame() {
        let design_frame = sample();
        let weight = float_column(&design_frame, "w").unwrap();
        let psu = label_column(&design_frame, "psu").unwrap();
        let stratum = label_column(&design_frame, "stratum").unwrap();
        let mut generator = ReplicateWeightGenerator::new(RepMethod::Jackknife, 0);
        let set = generator.replicate(&weight, &psu, Some(&stratum)).unwrap();
        let frame = set.to_frame(&ReplicateFrameNames::default()).unwrap();

        assert_eq!(frame.height(), 6);
        assert_eq!(frame.width(), 3 + set.number_reps());
        assert!(frame.column("_jk_wgt_1").is_ok());
        let psu_col = frame.column("psu").unwrap().str().unwrap();
        assert_eq!(psu_col.get(5), Some("c"));

        let names = ReplicateFrameNames { prefix: Some("rw"), psu: Some("cluster"), stratum: Some("region"), ..Default::default() };
        let frame = set.to_frame(&names).unwrap();
        let header: Vec<&str> = frame.get_column_names().iter().take(4).map(|s| s.as_str()).collect();
        assert_eq!(header, vec!["region", "cluster", "weight", "rw1"]);
        assert_eq!(frame.column("region").unwrap().str().unwrap().get(3), Some("2"));
    }
}
