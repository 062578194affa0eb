//! Generational reproduction: offspring allocation, elitism and mating.
//!
//! Each species receives a share of the next generation proportional to its
//! fitness-shared score. Within a species the best members are copied over
//! unchanged, and the rest of its share is bred from the top survivors by
//! crossover or cloning, followed by a full mutation pass.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::crossover::crossover;
use crate::error::{NeatError, Result};
use crate::genome::Genome;
use crate::mutation::MutationConfig;
use crate::population::{Population, Species};
use crate::random::RandomSource;

/// Selection and mating settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReproductionConfig {
    /// Fraction of each species (rounded up) eligible to breed.
    pub survival_threshold: f64,
    /// Best members per species copied unchanged into the next generation.
    pub elitism: usize,
    /// Probability of breeding by crossover rather than cloning.
    pub crossover_prob: f64,
    /// Probability that the second parent comes from another species.
    pub interspecies_mate_prob: f64,
}

impl Default for ReproductionConfig {
    fn default() -> Self {
        Self {
            survival_threshold: 0.2,
            elitism: 1,
            crossover_prob: 0.75,
            interspecies_mate_prob: 0.001,
        }
    }
}

/// Per-species ranking computed at the start of reproduction.
#[derive(Debug)]
struct SpeciesInfo {
    /// Members by fitness descending, ties by genome index.
    ranked: Vec<usize>,
    /// Explicit fitness sharing: mean member fitness, floored at 0.
    adjusted: f64,
}

fn rank_species(genomes: &[Genome], species: &[Species]) -> Vec<SpeciesInfo> {
    species
        .iter()
        .map(|s| {
            let mut ranked = s.members.clone();
            ranked.sort_by(|&a, &b| {
                genomes[b]
                    .fitness
                    .total_cmp(&genomes[a].fitness)
                    .then(a.cmp(&b))
            });
            let size = s.members.len().max(1) as f64;
            let adjusted: f64 = s.members.iter().map(|&i| genomes[i].fitness / size).sum();
            SpeciesInfo {
                ranked,
                adjusted: adjusted.max(0.0),
            }
        })
        .collect()
}

/// Split `total` offspring across species proportionally to `adjusted`.
///
/// Shares are floored and the leftover handed out by largest fractional
/// part, earlier species first on ties, so the counts always sum to `total`.
/// When no species has a positive score every species gets an even share.
pub(crate) fn allocate_offspring(adjusted: &[f64], total: usize) -> Vec<usize> {
    if adjusted.is_empty() {
        return Vec::new();
    }
    let sum: f64 = adjusted.iter().map(|a| a.max(0.0)).sum();
    let raw: Vec<f64> = if sum > 0.0 && sum.is_finite() {
        adjusted
            .iter()
            .map(|a| total as f64 * a.max(0.0) / sum)
            .collect()
    } else {
        vec![total as f64 / adjusted.len() as f64; adjusted.len()]
    };

    let mut counts: Vec<usize> = raw.iter().map(|r| r.floor() as usize).collect();
    let assigned: usize = counts.iter().sum();

    let mut by_remainder: Vec<(usize, f64)> = raw
        .iter()
        .zip(&counts)
        .enumerate()
        .map(|(i, (r, &c))| (i, r - c as f64))
        .collect();
    by_remainder.sort_by(|a, b| b.1.total_cmp(&a.1));
    for &(i, _) in by_remainder.iter().take(total.saturating_sub(assigned)) {
        counts[i] += 1;
    }
    counts
}

/// Top `ceil(len * threshold)` of a ranked member list, never fewer than one.
/// A non-positive threshold keeps only the best.
pub(crate) fn survivor_pool(ranked: &[usize], threshold: f64) -> &[usize] {
    if ranked.is_empty() {
        return ranked;
    }
    if threshold <= 0.0 {
        return &ranked[..1];
    }
    let count = ((ranked.len() as f64 * threshold).ceil() as usize).clamp(1, ranked.len());
    &ranked[..count]
}

/// Fitness-proportionate pick among `indices`, which must not be empty.
///
/// Negative fitness counts as 0; when every weight is 0 the pick is uniform.
pub(crate) fn select_parent<R: RandomSource>(
    rng: &mut R,
    genomes: &[Genome],
    indices: &[usize],
) -> usize {
    let weights: Vec<f64> = indices
        .iter()
        .map(|&i| genomes[i].fitness.max(0.0))
        .collect();
    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return indices[rng.below(indices.len())];
    }

    let target = rng.next_f64() * total;
    let mut acc = 0.0;
    for (&idx, w) in indices.iter().zip(&weights) {
        acc += w;
        if acc > target {
            return idx;
        }
    }
    indices[indices.len() - 1]
}

impl<R: RandomSource> Population<R> {
    /// Replace the current generation with its offspring.
    ///
    /// The population is speciated first; the resulting species are cleared
    /// again afterwards since they index the replaced generation. Every
    /// genome of the new generation has fitness 0.
    ///
    /// # Errors
    ///
    /// Structural errors from crossover or mutation propagate, and
    /// [`NeatError::SizeMismatch`] is returned if the offspring count differs
    /// from the current size. On error the current generation is kept.
    pub fn next_generation(
        &mut self,
        mutation: &MutationConfig,
        reproduction: &ReproductionConfig,
    ) -> Result<()> {
        self.speciate()?;
        self.reproduce_speciated(mutation, reproduction)
    }

    /// [`Population::next_generation`] for a population whose species are
    /// current, i.e. nothing changed since the last `speciate`.
    pub(crate) fn reproduce_speciated(
        &mut self,
        mutation: &MutationConfig,
        reproduction: &ReproductionConfig,
    ) -> Result<()> {
        if self.species.is_empty() {
            return Err(NeatError::invalid("population has not been speciated"));
        }
        let expected = self.genomes.len();
        let infos = rank_species(&self.genomes, &self.species);
        let adjusted: Vec<f64> = infos.iter().map(|info| info.adjusted).collect();
        let counts = allocate_offspring(&adjusted, expected);
        debug!(?counts, "allocated offspring");

        let mut next = Vec::with_capacity(expected);
        for (species_index, (info, &count)) in infos.iter().zip(&counts).enumerate() {
            if count == 0 || info.ranked.is_empty() {
                continue;
            }

            let elites = reproduction.elitism.min(info.ranked.len()).min(count);
            next.extend(
                info.ranked[..elites]
                    .iter()
                    .map(|&i| self.genomes[i].offspring_clone()),
            );

            let survivors = survivor_pool(&info.ranked, reproduction.survival_threshold);
            for _ in elites..count {
                let mut child = self.make_offspring(species_index, survivors, reproduction)?;
                mutation.mutate(&mut child, &mut self.rng, &mut self.tracker)?;
                child.fitness = 0.0;
                next.push(child);
            }
        }

        if next.len() != expected {
            return Err(NeatError::SizeMismatch {
                got: next.len(),
                expected,
            });
        }
        self.genomes = next;
        self.species.clear();
        Ok(())
    }

    fn make_offspring(
        &mut self,
        species_index: usize,
        survivors: &[usize],
        config: &ReproductionConfig,
    ) -> Result<Genome> {
        if self.rng.chance(config.crossover_prob) && survivors.len() > 1 {
            let first = select_parent(&mut self.rng, &self.genomes, survivors);
            let second = self.select_mate(species_index, survivors, config);
            return crossover(&mut self.rng, &self.genomes[first], &self.genomes[second]);
        }
        let parent = select_parent(&mut self.rng, &self.genomes, survivors);
        Ok(self.genomes[parent].offspring_clone())
    }

    fn select_mate(
        &mut self,
        species_index: usize,
        survivors: &[usize],
        config: &ReproductionConfig,
    ) -> usize {
        if self.rng.chance(config.interspecies_mate_prob) && self.species.len() > 1 {
            let mut other = self.rng.below(self.species.len() - 1);
            if other >= species_index {
                other += 1;
            }
            let members = &self.species[other].members;
            if !members.is_empty() {
                return select_parent(&mut self.rng, &self.genomes, members);
            }
        }
        select_parent(&mut self.rng, &self.genomes, survivors)
    }
}
