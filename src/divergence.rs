//! Core divergence calculations.
//!
//! Implements the information-theoretic comparisons used across the crate:
//! - KL Divergence (Kullback-Leibler), base 2
//! - Jensen-Shannon Divergence over the union of two key sets
//! - Top-k overlap of the most probable symbols
//!
//! Distributions are compared by key. A symbol missing from one side has
//! probability 0 there and contributes `0.5 · p` to the mixture.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::distribution::ProbabilityDistribution;
use crate::error::{Result, StatsError};

/// Substitute for a zero denominator inside a KL term (avoids log(0)).
///
/// Fixed for reproducibility; the value itself carries no meaning.
pub const EPSILON: f64 = 1e-12;

/// Maximum number of shared symbols surfaced by [`top_k_overlap`].
pub const MAX_EXAMPLE_COMMON: usize = 20;

/// One KL summand p · log2(p / q).
///
/// Zero-probability numerators contribute nothing; a zero denominator is
/// replaced by [`EPSILON`], giving a large but finite penalty.
#[inline]
fn kl_term(p: f64, q: f64) -> f64 {
    if p <= 0.0 {
        return 0.0;
    }
    let q = if q > 0.0 { q } else { EPSILON };
    p * (p / q).log2()
}

/// KL Divergence D_KL(P || Q) = Σ p_i * log2(p_i / q_i)
///
/// Measures information lost when using Q to approximate P.
///
/// Properties:
/// - Non-negative: D_KL(P || Q) >= 0
/// - Zero iff P = Q
/// - Asymmetric: D_KL(P || Q) != D_KL(Q || P)
pub fn kl_divergence(p: &[f64], q: &[f64]) -> Result<f64> {
    if p.len() != q.len() {
        return Err(StatsError::invalid(
            "q",
            format!("dimension mismatch: expected {}, got {}", p.len(), q.len()),
        ));
    }
    Ok(p.iter().zip(q.iter()).map(|(&pi, &qi)| kl_term(pi, qi)).sum())
}

/// Jensen-Shannon Divergence over aligned vectors
///
/// JS(P,Q) = 0.5 * D_KL(P || M) + 0.5 * D_KL(Q || M)
/// where M = 0.5 * (P + Q)
///
/// Properties:
/// - Symmetric: JS(P, Q) = JS(Q, P)
/// - Bounded: 0 <= JS <= 1 (with log base 2)
/// - JS(P, P) = 0
pub fn jensen_shannon(p: &[f64], q: &[f64]) -> Result<f64> {
    if p.len() != q.len() {
        return Err(StatsError::invalid(
            "q",
            format!("dimension mismatch: expected {}, got {}", p.len(), q.len()),
        ));
    }

    let js: f64 = p
        .iter()
        .zip(q.iter())
        .map(|(&pi, &qi)| {
            let mi = 0.5 * (pi + qi);
            0.5 * (kl_term(pi, mi) + kl_term(qi, mi))
        })
        .sum();

    Ok(clamp_unit(js))
}

/// Rounding can push a disjoint-support JSD a hair past 1 bit.
#[inline]
fn clamp_unit(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// Align two keyed distributions over the sorted union of their keys.
///
/// Sorting makes the summation order independent of argument order, so the
/// divergence is bit-for-bit symmetric.
pub fn align(p: &ProbabilityDistribution, q: &ProbabilityDistribution) -> (Vec<f64>, Vec<f64>) {
    let universe: BTreeSet<&str> = p.keys().chain(q.keys()).collect();
    let mut pv = Vec::with_capacity(universe.len());
    let mut qv = Vec::with_capacity(universe.len());
    for key in universe {
        pv.push(p.get(key));
        qv.push(q.get(key));
    }
    (pv, qv)
}

/// Jensen-Shannon divergence between two keyed distributions, in bits.
///
/// Empty distributions are allowed: JSD(∅, ∅) = 0 and JSD(∅, Q) = 0.5.
pub fn jensen_shannon_divergence(p: &ProbabilityDistribution, q: &ProbabilityDistribution) -> f64 {
    let (pv, qv) = align(p, q);
    // Aligned vectors always share a length
    jensen_shannon(&pv, &qv).unwrap_or(0.0)
}

/// Overlap of the `k` most probable symbols of two distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopKOverlap {
    pub k: usize,
    /// |top_k(P) ∩ top_k(Q)| / k, in [0, 1]
    pub fraction: f64,
    /// Shared symbols in P's rank order, at most [`MAX_EXAMPLE_COMMON`]
    pub example_common: Vec<String>,
}

/// Rank both distributions by descending probability (ties in first-seen
/// order), take the top `k` of each and report `|intersection| / k`.
pub fn top_k_overlap(
    p: &ProbabilityDistribution,
    q: &ProbabilityDistribution,
    k: usize,
) -> Result<TopKOverlap> {
    if k == 0 {
        return Err(StatsError::invalid("top_k", "must be at least 1"));
    }

    let top_q: BTreeSet<&str> = q.top_k(k).into_iter().map(|(s, _)| s).collect();
    let common: Vec<String> = p
        .top_k(k)
        .into_iter()
        .filter(|(s, _)| top_q.contains(s))
        .map(|(s, _)| s.to_string())
        .collect();

    Ok(TopKOverlap {
        k,
        fraction: common.len() as f64 / k as f64,
        example_common: common.into_iter().take(MAX_EXAMPLE_COMMON).collect(),
    })
}
