//! Population state and greedy speciation.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compatibility::{compatibility_distance, DistanceConfig};
use crate::error::{NeatError, Result};
use crate::genome::{Genome, GenomeConfig};
use crate::innovation::InnovationTracker;
use crate::random::RandomSource;

/// Speciation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// Coefficients of the compatibility distance.
    pub distance: DistanceConfig,
    /// Genomes within this distance of a representative join its species.
    pub compatibility_threshold: f64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            distance: DistanceConfig::default(),
            compatibility_threshold: 3.0,
        }
    }
}

/// A group of mutually compatible genomes within one generation.
///
/// Indices refer to [`Population::genomes`] of the generation that was
/// speciated; they are invalidated when the genome list is replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Species {
    /// 1-based id, in creation order.
    pub id: usize,
    /// Index of the genome that founded the species.
    pub representative: usize,
    /// Indices of every member, representative included.
    pub members: Vec<usize>,
}

/// One generation of genomes plus the run-scoped evolution context.
#[derive(Debug)]
pub struct Population<R> {
    /// Speciation settings.
    pub config: PopulationConfig,
    /// The current generation. Fitness values are written by the caller.
    pub genomes: Vec<Genome>,
    pub(crate) rng: R,
    pub(crate) tracker: InnovationTracker,
    pub(crate) species: Vec<Species>,
}

impl<R: RandomSource> Population<R> {
    /// Wrap existing genomes, rebuilding the innovation tracker from them.
    ///
    /// # Errors
    ///
    /// [`NeatError::InvalidArgument`] for an empty genome list, or the first
    /// structural violation or innovation conflict found.
    pub fn new(rng: R, config: PopulationConfig, genomes: Vec<Genome>) -> Result<Self> {
        if genomes.is_empty() {
            return Err(NeatError::invalid("no genomes provided"));
        }
        for genome in &genomes {
            genome.validate()?;
        }
        let tracker = InnovationTracker::from_genomes(&genomes)?;
        Ok(Self {
            config,
            genomes,
            rng,
            tracker,
            species: Vec::new(),
        })
    }

    /// Seed a fresh run with `size` fully-connected genomes.
    ///
    /// # Errors
    ///
    /// [`NeatError::InvalidArgument`] when `size` or a genome dimension is 0.
    pub fn fully_connected(
        mut rng: R,
        config: PopulationConfig,
        genome_config: &GenomeConfig,
        size: usize,
    ) -> Result<Self> {
        if size == 0 {
            return Err(NeatError::invalid("population size must be > 0"));
        }
        let mut tracker = InnovationTracker::new();
        let genomes = (0..size)
            .map(|_| Genome::fully_connected(genome_config, &mut rng, &mut tracker))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            config,
            genomes,
            rng,
            tracker,
            species: Vec::new(),
        })
    }

    /// Partition the genomes into species.
    ///
    /// Each genome, in order, joins the first existing species whose
    /// representative is within the compatibility threshold, or founds a new
    /// one. The result depends on genome order and is fully deterministic.
    ///
    /// # Errors
    ///
    /// [`NeatError::InvalidArgument`] if the population is empty.
    pub fn speciate(&mut self) -> Result<()> {
        if self.genomes.is_empty() {
            return Err(NeatError::invalid("population has no genomes"));
        }
        self.species.clear();
        for (idx, genome) in self.genomes.iter().enumerate() {
            let home = self.species.iter().position(|s| {
                let rep = &self.genomes[s.representative];
                compatibility_distance(genome, rep, &self.config.distance)
                    <= self.config.compatibility_threshold
            });
            match home {
                Some(s) => self.species[s].members.push(idx),
                None => {
                    let id = self.species.len() + 1;
                    self.species.push(Species {
                        id,
                        representative: idx,
                        members: vec![idx],
                    });
                }
            }
        }
        debug!(
            genomes = self.genomes.len(),
            species = self.species.len(),
            "speciated population"
        );
        Ok(())
    }
}

impl<R> Population<R> {
    /// Species of the last [`speciate`](Population::speciate) call. Empty
    /// after a generation change.
    #[must_use]
    pub fn species(&self) -> &[Species] {
        &self.species
    }

    /// The run's innovation tracker.
    #[must_use]
    pub fn tracker(&self) -> &InnovationTracker {
        &self.tracker
    }

    /// Mutable tracker, for callers that mutate genomes themselves.
    pub fn tracker_mut(&mut self) -> &mut InnovationTracker {
        &mut self.tracker
    }

    /// The population's random source.
    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Number of genomes in the current generation.
    #[must_use]
    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    /// Whether the current generation is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }

    /// The genome with the highest fitness; the first one on ties.
    #[must_use]
    pub fn best(&self) -> Option<&Genome> {
        self.genomes
            .iter()
            .reduce(|best, g| if g.fitness > best.fitness { g } else { best })
    }
}
