//! Confidence model: 4-dimensional confidence vectors and evidence scoring.
//!
//! Every node carries a [`ConfidenceVector`] over four quality dimensions
//! (empirical support, theoretical basis, methodological rigor, consensus
//! alignment). This module also provides the evidence-accumulation score
//! used when integrating new evidence into hypothesis confidence.

use serde::{Deserialize, Serialize};

/// Default confidence assigned when a response carries no parseable vector.
pub const DEFAULT_CONFIDENCE: [f64; 4] = [0.8, 0.7, 0.9, 0.6];

/// Per-item increment for evidence accumulation (first item contributes this).
const EVIDENCE_INCREMENT: f64 = 0.15;

/// Confidence vector over the four scoring dimensions, each in [0, 1]:
/// empirical support, theoretical basis, methodological rigor and
/// consensus alignment, in that order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceVector(pub [f64; 4]);

impl ConfidenceVector {
    /// Create a vector from raw components, clamping each to [0, 1].
    pub fn new(components: [f64; 4]) -> Self {
        Self(components.map(|c| c.clamp(0.0, 1.0)))
    }

    /// Empirical support dimension.
    pub fn empirical_support(&self) -> f64 {
        self.0[0]
    }

    /// Theoretical basis dimension.
    pub fn theoretical_basis(&self) -> f64 {
        self.0[1]
    }

    /// Methodological rigor dimension.
    pub fn methodological_rigor(&self) -> f64 {
        self.0[2]
    }

    /// Consensus alignment dimension.
    pub fn consensus_alignment(&self) -> f64 {
        self.0[3]
    }

    /// Arithmetic mean of the four dimensions.
    pub fn mean(&self) -> f64 {
        self.0.iter().sum::<f64>() / 4.0
    }

    /// Blend with another vector by per-component arithmetic mean.
    ///
    /// Used when integrating new evidence into a hypothesis: the prior and
    /// the evidence-informed vector contribute equally.
    pub fn blend(&self, other: &ConfidenceVector) -> ConfidenceVector {
        let mut out = [0.0; 4];
        for i in 0..4 {
            out[i] = (self.0[i] + other.0[i]) / 2.0;
        }
        ConfidenceVector::new(out)
    }

    /// Average a non-empty group of vectors component-wise.
    ///
    /// Returns the default vector for an empty slice.
    pub fn mean_of(vectors: &[ConfidenceVector]) -> ConfidenceVector {
        if vectors.is_empty() {
            return ConfidenceVector::default();
        }
        let mut out = [0.0; 4];
        for v in vectors {
            for i in 0..4 {
                out[i] += v.0[i];
            }
        }
        for c in &mut out {
            *c /= vectors.len() as f64;
        }
        ConfidenceVector::new(out)
    }

    /// Shannon entropy of the vector treated as a distribution.
    ///
    /// Components are normalized to sum to 1 first; an all-zero vector has
    /// zero entropy. Result is in bits, bounded by log2(4) = 2.
    pub fn entropy(&self) -> f64 {
        let total: f64 = self.0.iter().sum();
        if total <= f64::EPSILON {
            return 0.0;
        }
        -self
            .0
            .iter()
            .map(|c| c / total)
            .filter(|p| *p > f64::EPSILON)
            .map(|p| p * p.log2())
            .sum::<f64>()
    }
}

impl Default for ConfidenceVector {
    fn default() -> Self {
        Self(DEFAULT_CONFIDENCE)
    }
}

/// Aggregate confidence score from a list of evidence fragments.
///
/// Null-ish items (empty or whitespace-only strings) are filtered before
/// counting. Empty input scores 0.0. The first item contributes 0.15 and
/// each further item adds `0.15 * (1 + current)`, so the score accelerates
/// as evidence accumulates and saturates at 1.0 within five or six items.
pub fn calculate_confidence<S: AsRef<str>>(evidence: &[S]) -> f64 {
    let count = evidence
        .iter()
        .filter(|e| !e.as_ref().trim().is_empty())
        .count();

    let mut score: f64 = 0.0;
    for _ in 0..count {
        score += EVIDENCE_INCREMENT * (1.0 + score);
        if score >= 1.0 {
            return 1.0;
        }
    }
    score
}
