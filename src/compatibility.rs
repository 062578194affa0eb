//! Compatibility distance between genomes, used for speciation.

use serde::{Deserialize, Serialize};

use crate::genome::Genome;

/// Coefficients of the NEAT compatibility distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceConfig {
    /// Weight of excess genes.
    pub excess_coeff: f64,
    /// Weight of disjoint genes.
    pub disjoint_coeff: f64,
    /// Weight of the mean absolute weight difference of matching genes.
    pub weight_coeff: f64,
    /// Genomes with fewer connection genes than this are not size-normalized.
    pub normalization_threshold: usize,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            excess_coeff: 1.0,
            disjoint_coeff: 1.0,
            weight_coeff: 0.4,
            normalization_threshold: 20,
        }
    }
}

/// Compute `c1*E/N + c2*D/N + c3*W` between two genomes.
///
/// Connection genes are aligned by innovation. Unmatched genes inside the
/// other genome's innovation range are disjoint, the rest are excess. `N` is
/// the larger gene count, or 1 when that is below the normalization
/// threshold. The result is symmetric in `a` and `b`.
#[must_use]
pub fn compatibility_distance(a: &Genome, b: &Genome, config: &DistanceConfig) -> f64 {
    let mut genes_a: Vec<_> = a.connections.iter().collect();
    let mut genes_b: Vec<_> = b.connections.iter().collect();
    genes_a.sort_by_key(|c| c.innovation);
    genes_b.sort_by_key(|c| c.innovation);

    let (mut i, mut j) = (0, 0);
    let mut matching = 0usize;
    let mut disjoint = 0usize;
    let mut weight_diff = 0.0;

    while i < genes_a.len() && j < genes_b.len() {
        let (ga, gb) = (genes_a[i], genes_b[j]);
        match ga.innovation.cmp(&gb.innovation) {
            std::cmp::Ordering::Equal => {
                matching += 1;
                weight_diff += (ga.weight - gb.weight).abs();
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => {
                disjoint += 1;
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                disjoint += 1;
                j += 1;
            }
        }
    }
    let excess = (genes_a.len() - i) + (genes_b.len() - j);

    let largest = genes_a.len().max(genes_b.len());
    let n = if largest < config.normalization_threshold {
        1.0
    } else {
        largest as f64
    };
    let avg_weight_diff = if matching > 0 {
        weight_diff / matching as f64
    } else {
        0.0
    };

    config.excess_coeff * excess as f64 / n
        + config.disjoint_coeff * disjoint as f64 / n
        + config.weight_coeff * avg_weight_diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gene::{ConnectionGene, InnovationId, NodeId};

    fn genome(genes: &[(u64, f64)]) -> Genome {
        Genome {
            connections: genes
                .iter()
                .map(|&(innovation, weight)| {
                    ConnectionGene::new(InnovationId(innovation), NodeId(1), NodeId(2), weight)
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_reference_distance() {
        let a = genome(&[(1, 1.0), (2, 1.0), (3, 1.0)]);
        let b = genome(&[(1, 1.0), (2, 2.0), (4, 3.0), (5, 4.0)]);
        // E = 2 (4, 5), D = 1 (3), W = (0 + 1) / 2, N = 1
        let d = compatibility_distance(&a, &b, &DistanceConfig::default());
        assert!((d - 3.2).abs() < 1e-9, "{d}");
    }

    #[test]
    fn test_one_excess_one_disjoint() {
        let a = genome(&[(1, 1.0), (2, 1.0), (3, 1.0)]);
        let b = genome(&[(1, 2.0), (2, 2.0), (4, 2.0)]);
        // E = 1 (4), D = 1 (3), W = 1, N = 1
        let d = compatibility_distance(&a, &b, &DistanceConfig::default());
        assert!((d - 2.4).abs() < 1e-9, "{d}");
    }

    #[test]
    fn test_symmetry() {
        let a = genome(&[(1, 0.5), (4, -1.0), (7, 2.0)]);
        let b = genome(&[(2, 0.1), (4, 1.0), (9, 0.0), (10, 3.0)]);
        let config = DistanceConfig::default();
        let ab = compatibility_distance(&a, &b, &config);
        let ba = compatibility_distance(&b, &a, &config);
        assert!((ab - ba).abs() < 1e-12);
    }

    #[test]
    fn test_identical_is_zero() {
        let a = genome(&[(1, 0.5), (2, -0.5)]);
        assert!(compatibility_distance(&a, &a, &DistanceConfig::default()).abs() < 1e-12);
        let empty = Genome::default();
        assert!(compatibility_distance(&empty, &empty, &DistanceConfig::default()).abs() < 1e-12);
    }

    #[test]
    fn test_normalization_above_threshold() {
        let a = genome(&[(1, 0.0), (2, 0.0), (3, 0.0), (4, 0.0)]);
        let b = genome(&[(1, 0.0)]);
        let config = DistanceConfig {
            normalization_threshold: 4,
            ..Default::default()
        };
        // three excess genes over N = 4
        let d = compatibility_distance(&a, &b, &config);
        assert!((d - 0.75).abs() < 1e-12);
    }
}
