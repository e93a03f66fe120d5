// src/weighting/hadamard.rs
//
// Hadamard matrices for balanced repeated replication.
// - Sylvester doubling for powers of two
// - Paley I for orders q + 1, q prime and q = 3 mod 4 (12, 20, 24)
// - Paley II for orders 2(q + 1), q prime and q = 1 mod 4 (28)

use ndarray::{s, Array2};

use crate::error::{Result, SurveyError};

/// Largest replicate count rounded to a multiple of four rather than a power of two.
const MAX_MULTIPLE_OF_FOUR: usize = 28;

/// Number of BRR replicates for `n_strata` strata.
///
/// At least `n_strata + 1` so that column 0 (all ones) can be skipped, and
/// never less than `requested`. Counts up to 28 are rounded to a multiple of
/// four, larger ones to a power of two.
pub fn brr_number_reps(n_strata: usize, requested: usize) -> usize {
    let r = requested.max(n_strata + 1);
    if r <= MAX_MULTIPLE_OF_FOUR {
        r.div_ceil(4) * 4
    } else {
        r.next_power_of_two()
    }
}

/// Hadamard matrix of the given order, normalized so the first column is +1.
pub fn hadamard(order: usize) -> Result<Array2<f64>> {
    let mut h = build(order).ok_or(SurveyError::NoHadamardMatrix { order })?;
    for mut row in h.rows_mut() {
        if row[0] < 0.0 {
            row.mapv_inplace(|v| -v);
        }
    }
    Ok(h)
}

fn build(order: usize) -> Option<Array2<f64>> {
    if order == 0 {
        return None;
    }
    if order.is_power_of_two() {
        return Some(sylvester(order));
    }
    if order % 4 != 0 {
        return None;
    }
    let q = order - 1;
    if is_prime(q) && q % 4 == 3 {
        return Some(paley_one(q));
    }
    let q = order / 2 - 1;
    if is_prime(q) && q % 4 == 1 {
        return Some(paley_two(q));
    }
    build(order / 2).map(|half| double(&half))
}

/// [[H, H], [H, -H]]
fn double(h: &Array2<f64>) -> Array2<f64> {
    let n = h.nrows();
    let mut out = Array2::zeros((2 * n, 2 * n));
    out.slice_mut(s![..n, ..n]).assign(h);
    out.slice_mut(s![..n, n..]).assign(h);
    out.slice_mut(s![n.., ..n]).assign(h);
    out.slice_mut(s![n.., n..]).assign(&h.mapv(|v| -v));
    out
}

fn sylvester(order: usize) -> Array2<f64> {
    let mut h = Array2::from_elem((1, 1), 1.0);
    while h.nrows() < order {
        h = double(&h);
    }
    h
}

/// Legendre symbol of `a` modulo the prime `q`, as a float (0, 1 or -1).
fn quadratic_characters(q: usize) -> Vec<f64> {
    let mut chi = vec![-1.0; q];
    chi[0] = 0.0;
    for i in 1..q {
        chi[(i * i) % q] = 1.0;
    }
    chi
}

fn paley_one(q: usize) -> Array2<f64> {
    let n = q + 1;
    let chi = quadratic_characters(q);
    let mut h = Array2::ones((n, n));
    // lower-right block: Q - I
    for i in 0..q {
        for j in 0..q {
            h[[i + 1, j + 1]] = if i == j { -1.0 } else { chi[(i + q - j) % q] };
        }
    }
    h
}

fn paley_two(q: usize) -> Array2<f64> {
    let m = q + 1;
    let chi = quadratic_characters(q);
    // conference matrix of order q + 1
    let mut c = Array2::zeros((m, m));
    for k in 1..m {
        c[[0, k]] = 1.0;
        c[[k, 0]] = 1.0;
    }
    for i in 0..q {
        for j in 0..q {
            c[[i + 1, j + 1]] = chi[(i + q - j) % q];
        }
    }

    let mut h = Array2::zeros((2 * m, 2 * m));
    for i in 0..m {
        for j in 0..m {
            let block = if i == j {
                [[1.0, -1.0], [-1.0, -1.0]]
            } else {
                let v = c[[i, j]];
                [[v, v], [v, -v]]
            };
            for (a, row) in block.iter().enumerate() {
                for (b, &v) in row.iter().enumerate() {
                    h[[2 * i + a, 2 * j + b]] = v;
                }
            }
        }
    }
    h
}

fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    (3..).step_by(2).take_while(|i| i * i <= n).all(|i| n % i != 0)
}
