//! # CPPN NEAT
//!
//! A deterministic `NeuroEvolution` of Augmenting Topologies (NEAT) engine for
//! evolving Compositional Pattern Producing Networks (CPPNs): small acyclic
//! graphs whose nodes use periodic and symmetric activations and which are
//! queried once per coordinate to generate images and other patterns.
//!
//! ## Features
//!
//! - **Historical markings**: an [`InnovationTracker`] hands out one innovation
//!   id per `(source, destination)` pair for the whole run, so matching
//!   structure lines up during crossover and speciation
//! - **Always acyclic**: mutation never creates a cycle, toggling reverts any
//!   re-enable that would, and crossover repairs cycles before returning
//! - **Compiled plans**: genomes compile into an immutable [`Plan`] that
//!   evaluates with a flat value buffer, without allocation when reused
//! - **Reproducible**: every stochastic decision draws from one
//!   [`RandomSource`]; the same seed replays the same run
//!
//! ## Quick Start
//!
//! ```rust
//! use cppn_neat::{seeded_rng, GenomeConfig, Plan, Population, PopulationConfig};
//!
//! // Ten CPPNs mapping (x, y) to one intensity
//! let population = Population::fully_connected(
//!     seeded_rng(42),
//!     PopulationConfig::default(),
//!     &GenomeConfig::cppn(2, 1),
//!     10,
//! )?;
//!
//! let plan = Plan::from_genome(&population.genomes[0])?;
//! let pixel = plan.eval(&[0.5, -0.5])?;
//! assert_eq!(pixel.len(), 1);
//! assert!((0.0..=1.0).contains(&pixel[0]));
//! # Ok::<(), cppn_neat::NeatError>(())
//! ```
//!
//! ## Running Evolution
//!
//! ```rust
//! use cppn_neat::{
//!     seeded_rng, BoxError, Genome, GenomeConfig, MutationConfig, Plan, Population,
//!     PopulationConfig, ReproductionConfig, Runner,
//! };
//!
//! let population = Population::fully_connected(
//!     seeded_rng(7),
//!     PopulationConfig::default(),
//!     &GenomeConfig::minimal(2, 1),
//!     30,
//! )?;
//!
//! // Reward outputs close to 1 at the origin
//! let fitness = |genome: &Genome| -> Result<f64, BoxError> {
//!     let out = Plan::from_genome(genome)?.eval(&[0.0, 0.0])?;
//!     Ok(1.0 / (1.0 + (1.0 - out[0]).abs()))
//! };
//!
//! let mut runner = Runner::new(
//!     population,
//!     MutationConfig::default(),
//!     ReproductionConfig::default(),
//!     fitness,
//! );
//! let outcome = runner.run(5, 0.99)?;
//! assert!(outcome.generation < 5);
//! # Ok::<(), cppn_neat::NeatError>(())
//! ```
//!
//! ## Architecture
//!
//! ### Genomes
//!
//! A [`Genome`] stores node genes sorted by id and connection genes sorted by
//! innovation. Disabled connections stay in the genome: they still count for
//! compatibility and may be re-enabled later.
//!
//! ### One generation
//!
//! 1. The caller (or [`Runner`]) writes a fitness into every genome
//! 2. [`Population::speciate`] groups genomes by [`compatibility_distance`]
//! 3. [`Population::next_generation`] shares fitness within species, allocates
//!    offspring, keeps elites and breeds the rest with [`crossover`] and
//!    [`MutationConfig::mutate`]

pub mod activation;
pub mod compatibility;
pub mod crossover;
pub mod error;
pub mod gene;
pub mod genome;
pub mod innovation;
pub mod mutation;
pub mod persistence;
pub mod plan;
pub mod population;
pub mod random;
pub mod reproduction;
pub mod runner;
pub mod topology;

// Re-exports for convenience
pub use activation::Activation;
pub use compatibility::{compatibility_distance, DistanceConfig};
pub use crossover::{crossover, DISABLED_INHERIT_PROB};
pub use error::{BoxError, NeatError, NoCandidate, Result, StructuralViolation};
pub use gene::{ConnectionGene, InnovationId, NodeGene, NodeId, NodeKind};
pub use genome::{Genome, GenomeConfig};
pub use innovation::InnovationTracker;
pub use mutation::{
    mutate_activations, mutate_add_connection, mutate_add_node, mutate_biases,
    mutate_toggle_enable, mutate_weights, MutationConfig,
};
pub use persistence::{load_population, save_population};
pub use plan::{CompiledNode, Plan};
pub use population::{Population, PopulationConfig, Species};
pub use random::{seeded_rng, RandomSource};
pub use reproduction::ReproductionConfig;
pub use runner::{EvolutionConfig, FitnessFunction, RunOutcome, Runner};
pub use topology::GraphTopology;
