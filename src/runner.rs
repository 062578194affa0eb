//! The evolution loop: evaluate, report, reproduce.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{BoxError, NeatError, Result};
use crate::genome::Genome;
use crate::mutation::MutationConfig;
use crate::population::{Population, PopulationConfig};
use crate::random::RandomSource;
use crate::reproduction::ReproductionConfig;

/// Scores one genome. Higher is better.
///
/// Implemented for every `FnMut(&Genome) -> Result<f64, BoxError>`, so a
/// closure is usually all a caller needs.
pub trait FitnessFunction {
    /// Fitness of `genome`.
    ///
    /// # Errors
    ///
    /// Any error aborts the current evaluation pass.
    fn evaluate(&mut self, genome: &Genome) -> std::result::Result<f64, BoxError>;
}

impl<F> FitnessFunction for F
where
    F: FnMut(&Genome) -> std::result::Result<f64, BoxError>,
{
    fn evaluate(&mut self, genome: &Genome) -> std::result::Result<f64, BoxError> {
        self(genome)
    }
}

/// Every tunable of a run, loadable from a (partial) JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Speciation settings.
    pub population: PopulationConfig,
    /// Mutation settings.
    pub mutation: MutationConfig,
    /// Selection settings.
    pub reproduction: ReproductionConfig,
}

impl EvolutionConfig {
    /// Parse a JSON config; missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Malformed JSON, or a config rejected by [`EvolutionConfig::validate`].
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no run can use.
    ///
    /// # Errors
    ///
    /// [`NeatError::InvalidArgument`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let reproduction = &self.reproduction;
        let probabilities = self.mutation.probabilities().into_iter().chain([
            ("crossover_prob", reproduction.crossover_prob),
            ("interspecies_mate_prob", reproduction.interspecies_mate_prob),
        ]);
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                return Err(NeatError::invalid(format!(
                    "{name} must be within [0, 1], got {p}"
                )));
            }
        }

        let distance = &self.population.distance;
        let finite = [
            ("excess_coeff", distance.excess_coeff),
            ("disjoint_coeff", distance.disjoint_coeff),
            ("weight_coeff", distance.weight_coeff),
            ("weight_perturb_scale", self.mutation.weight_perturb_scale),
            ("weight_reset_scale", self.mutation.weight_reset_scale),
            ("weight_init_range", self.mutation.weight_init_range),
            ("bias_perturb_scale", self.mutation.bias_perturb_scale),
            ("bias_reset_scale", self.mutation.bias_reset_scale),
            ("survival_threshold", reproduction.survival_threshold),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(NeatError::invalid(format!("{name} must be finite")));
            }
        }

        let threshold = self.population.compatibility_threshold;
        if threshold.is_nan() || threshold < 0.0 {
            return Err(NeatError::invalid(format!(
                "compatibility_threshold must be >= 0, got {threshold}"
            )));
        }
        Ok(())
    }
}

/// Result of [`Runner::run`].
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Best genome of the last evaluated generation.
    pub best: Genome,
    /// 0-based index of that generation.
    pub generation: usize,
}

/// Drives a population through evaluate / reproduce cycles.
pub struct Runner<R, F> {
    /// The evolving population.
    pub population: Population<R>,
    /// Mutation settings used for every offspring.
    pub mutation: MutationConfig,
    /// Selection settings.
    pub reproduction: ReproductionConfig,
    fitness: F,
}

impl<R: RandomSource, F: FitnessFunction> Runner<R, F> {
    /// Assemble a runner.
    pub fn new(
        population: Population<R>,
        mutation: MutationConfig,
        reproduction: ReproductionConfig,
        fitness: F,
    ) -> Self {
        Self {
            population,
            mutation,
            reproduction,
            fitness,
        }
    }

    /// Score every genome and return a copy of the best one.
    ///
    /// Fitness is written into each genome. Ties go to the earliest genome.
    ///
    /// # Errors
    ///
    /// [`NeatError::Fitness`] from the first failing evaluation, or
    /// [`NeatError::InvalidArgument`] for an empty population.
    pub fn evaluate(&mut self) -> Result<Genome> {
        let mut best: Option<usize> = None;
        for i in 0..self.population.genomes.len() {
            let fitness = self
                .fitness
                .evaluate(&self.population.genomes[i])
                .map_err(NeatError::Fitness)?;
            self.population.genomes[i].fitness = fitness;
            if best.is_none_or(|b| fitness > self.population.genomes[b].fitness) {
                best = Some(i);
            }
        }
        best.map(|i| self.population.genomes[i].clone())
            .ok_or_else(|| NeatError::invalid("population has no genomes"))
    }

    /// Replace the population with its next generation.
    ///
    /// # Errors
    ///
    /// See [`Population::next_generation`].
    pub fn step(&mut self) -> Result<()> {
        self.population
            .next_generation(&self.mutation, &self.reproduction)
    }

    /// Evolve until a genome reaches `target` or `max_generations` have been
    /// evaluated.
    ///
    /// # Errors
    ///
    /// [`NeatError::InvalidArgument`] when `max_generations` is 0; otherwise
    /// the first error of an evaluation or reproduction step.
    pub fn run(&mut self, max_generations: usize, target: f64) -> Result<RunOutcome> {
        if max_generations == 0 {
            return Err(NeatError::invalid("max_generations must be > 0"));
        }

        let mut generation = 0;
        loop {
            let best = self.evaluate()?;
            self.population.speciate()?;
            let mean = self.population.genomes.iter().map(|g| g.fitness).sum::<f64>()
                / self.population.len() as f64;
            info!(
                generation,
                best = best.fitness,
                mean,
                species = self.population.species().len(),
                nodes = best.nodes.len(),
                connections = best.num_enabled_connections(),
                "evaluated generation"
            );

            if best.fitness >= target || generation + 1 == max_generations {
                return Ok(RunOutcome { best, generation });
            }
            // species computed above are still current
            self.population
                .reproduce_speciated(&self.mutation, &self.reproduction)?;
            generation += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::GenomeConfig;
    use crate::random::seeded_rng;

    fn population(size: usize) -> Population<rand_chacha::ChaCha8Rng> {
        Population::fully_connected(
            seeded_rng(11),
            PopulationConfig::default(),
            &GenomeConfig::minimal(1, 1),
            size,
        )
        .unwrap()
    }

    #[test]
    fn test_run_stops_at_target() {
        let mut runner = Runner::new(
            population(1),
            MutationConfig::default(),
            ReproductionConfig::default(),
            |_: &Genome| Ok::<_, BoxError>(1.0),
        );
        let outcome = runner.run(5, 1.0).unwrap();
        assert_eq!(outcome.generation, 0);
        assert!((outcome.best.fitness - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_run_exhausts_generations() {
        let mut calls = 0;
        let mut runner = Runner::new(
            population(6),
            MutationConfig::default(),
            ReproductionConfig::default(),
            |g: &Genome| {
                calls += 1;
                Ok::<_, BoxError>(g.connections[0].weight)
            },
        );
        let outcome = runner.run(4, f64::INFINITY).unwrap();
        assert_eq!(outcome.generation, 3);
        drop(runner);
        assert_eq!(calls, 24);
    }

    #[test]
    fn test_run_matches_manual_loop() {
        let score = |g: &Genome| Ok::<_, BoxError>(g.connections.iter().map(|c| c.weight).sum::<f64>());
        let mutation = MutationConfig {
            add_node_prob: 0.3,
            add_connection_prob: 0.3,
            ..MutationConfig::default()
        };

        let mut runner = Runner::new(
            population(8),
            mutation.clone(),
            ReproductionConfig::default(),
            score,
        );
        runner.run(5, f64::INFINITY).unwrap();

        let mut manual = Runner::new(
            population(8),
            mutation,
            ReproductionConfig::default(),
            score,
        );
        for _ in 0..4 {
            manual.evaluate().unwrap();
            manual.step().unwrap();
        }
        manual.evaluate().unwrap();

        assert_eq!(runner.population.genomes, manual.population.genomes);
    }

    #[test]
    fn test_run_rejects_zero_generations() {
        let mut runner = Runner::new(
            population(2),
            MutationConfig::default(),
            ReproductionConfig::default(),
            |_: &Genome| Ok::<_, BoxError>(0.0),
        );
        assert!(matches!(
            runner.run(0, 1.0),
            Err(NeatError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_evaluate_picks_first_best_and_writes_fitness() {
        let scores = [0.5, 2.0, 2.0, 1.0];
        let mut next = 0;
        let mut runner = Runner::new(
            population(4),
            MutationConfig::default(),
            ReproductionConfig::default(),
            move |_: &Genome| {
                let score = scores[next];
                next += 1;
                Ok::<_, BoxError>(score)
            },
        );
        let best = runner.evaluate().unwrap();
        assert!((best.fitness - 2.0).abs() < 1e-12);
        assert_eq!(best, runner.population.genomes[1]);
        let written: Vec<f64> = runner.population.genomes.iter().map(|g| g.fitness).collect();
        assert_eq!(written, scores);
    }

    #[test]
    fn test_evaluate_aborts_on_error() {
        let mut runner = Runner::new(
            population(3),
            MutationConfig::default(),
            ReproductionConfig::default(),
            |_: &Genome| Err::<f64, BoxError>("renderer unavailable".into()),
        );
        let err = runner.evaluate().unwrap_err();
        assert!(matches!(err, NeatError::Fitness(_)));
        assert!(err.to_string().contains("renderer unavailable"));
    }

    #[test]
    fn test_config_from_partial_json() {
        let config = EvolutionConfig::from_json(
            r#"{"mutation": {"add_node_prob": 0.2}, "population": {"compatibility_threshold": 1.5}}"#,
        )
        .unwrap();
        assert!((config.mutation.add_node_prob - 0.2).abs() < 1e-12);
        assert!((config.mutation.add_connection_prob - 0.05).abs() < 1e-12);
        assert!((config.population.compatibility_threshold - 1.5).abs() < 1e-12);
        assert_eq!(config.reproduction, ReproductionConfig::default());
    }

    #[test]
    fn test_config_validation() {
        EvolutionConfig::default().validate().unwrap();

        let mut bad = EvolutionConfig::default();
        bad.mutation.toggle_enable_prob = 1.5;
        assert!(matches!(bad.validate(), Err(NeatError::InvalidArgument(_))));

        let mut bad = EvolutionConfig::default();
        bad.population.compatibility_threshold = -1.0;
        assert!(bad.validate().is_err());

        let mut bad = EvolutionConfig::default();
        bad.population.distance.weight_coeff = f64::NAN;
        assert!(bad.validate().is_err());

        assert!(EvolutionConfig::from_json(r#"{"reproduction": {"crossover_prob": -0.1}}"#).is_err());
    }
}
