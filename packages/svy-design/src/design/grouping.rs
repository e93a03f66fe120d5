// src/design/grouping.rs

use std::collections::BTreeMap;

/// Integer codes for a label column. Codes follow the sorted label order.
#[derive(Debug, Clone, Default)]
pub struct Grouping {
    pub ids: Vec<u32>,
    pub labels: Vec<String>,
}

impl Grouping {
    /// Every unit in one group.
    pub fn single(n: usize, label: &str) -> Self {
        Grouping { ids: vec![0; n], labels: vec![label.to_string()] }
    }

    pub fn n_groups(&self) -> usize {
        self.labels.len()
    }

    pub fn label(&self, id: u32) -> &str {
        &self.labels[id as usize]
    }
}

/// Code a label column to integers 0..K-1 with labels sorted.
pub fn index_labels(labels: &[String]) -> Grouping {
    let mut codes: BTreeMap<&str, u32> = labels.iter().map(|s| (s.as_str(), 0)).collect();
    for (i, code) in codes.values_mut().enumerate() {
        *code = i as u32;
    }
    let ids = labels.iter().map(|s| codes[s.as_str()]).collect();
    let labels = codes.keys().map(|s| s.to_string()).collect();
    Grouping { ids, labels }
}

/// Code the unique (outer, inner) pairs, sorted by outer then inner.
///
/// Returns the pair code of each row and the pairs themselves, so an inner
/// label repeated under two outer groups yields two distinct codes.
pub fn index_nested(outer: &[u32], inner: &[u32]) -> (Vec<u32>, Vec<(u32, u32)>) {
    let mut codes: BTreeMap<(u32, u32), u32> =
        outer.iter().zip(inner.iter()).map(|(&o, &i)| ((o, i), 0)).collect();
    for (k, code) in codes.values_mut().enumerate() {
        *code = k as u32;
    }
    let ids = outer.iter().zip(inner.iter()).map(|(&o, &i)| codes[&(o, i)]).collect();
    let pairs = codes.into_keys().collect();
    (ids, pairs)
}

/// Children listed under their parent, given the parent code of each child.
pub fn members_by_parent(parent_of: &[u32], n_parents: usize) -> Vec<Vec<u32>> {
    let mut members = vec![Vec::new(); n_parents];
    for (child, &parent) in parent_of.iter().enumerate() {
        members[parent as usize].push(child as u32);
    }
    members
}

/// Sum values by group.
pub fn sum_by_group(values: &[f64], ids: &[u32], n_groups: usize) -> Vec<f64> {
    let mut sums = vec![0.0; n_groups];
    for (&v, &g) in values.iter().zip(ids.iter()) {
        sums[g as usize] += v;
    }
    sums
}
