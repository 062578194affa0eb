//! XOR example using the built-in evolution runner.
//!
//! This example evolves a network for the XOR problem, a classic benchmark
//! for neuroevolution algorithms, and saves the final population as JSON.
//!
//! Run with: `RUST_LOG=info cargo run --example xor`

use std::fs::File;
use std::io::BufWriter;

use cppn_neat::{
    seeded_rng, BoxError, Genome, GenomeConfig, MutationConfig, Plan, Population,
    PopulationConfig, ReproductionConfig, Runner,
};
use tracing_subscriber::EnvFilter;

/// XOR truth table.
const CASES: [([f64; 2], f64); 4] = [
    ([0.0, 0.0], 0.0),
    ([0.0, 1.0], 1.0),
    ([1.0, 0.0], 1.0),
    ([1.0, 1.0], 0.0),
];

/// Maximum fitness is 4.0 (perfect solution).
fn xor_fitness(genome: &Genome) -> Result<f64, BoxError> {
    let plan = Plan::from_genome(genome)?;
    let mut total_error = 0.0;
    for (inputs, expected) in &CASES {
        let output = plan.eval(inputs)?[0];
        total_error += (output - expected).powi(2);
    }
    Ok(4.0 - total_error)
}

fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("NEAT XOR Example");
    println!("================\n");

    let population_size = 150;
    let generations = 100;
    let seed = 42;

    let population = Population::fully_connected(
        seeded_rng(seed),
        PopulationConfig::default(),
        &GenomeConfig::default(),
        population_size,
    )?;
    let mutation = MutationConfig {
        add_connection_prob: 0.3,
        add_node_prob: 0.1,
        ..MutationConfig::default()
    };

    println!("Population: {population_size}");
    println!("Generations: {generations}");
    println!();

    let mut runner = Runner::new(
        population,
        mutation,
        ReproductionConfig::default(),
        xor_fitness,
    );
    // fitness >= 3.9 is close enough
    let outcome = runner.run(generations, 3.9)?;
    let champion = &outcome.best;

    println!("Evolution Complete!");
    println!("==================");
    println!("Generation: {}", outcome.generation);
    println!("Best fitness: {:.4}", champion.fitness);
    println!("Nodes: {}", champion.nodes.len());
    println!("Connections: {}", champion.num_enabled_connections());
    println!("Hidden nodes: {}", champion.hidden_ids().len());

    println!("\nChampion XOR outputs:");
    let plan = Plan::from_genome(champion)?;
    for (inputs, expected) in &CASES {
        let output = plan.eval(inputs)?[0];
        let rounded = if output > 0.5 { 1.0 } else { 0.0 };
        let status = if (rounded - expected).abs() < 0.1 {
            "✓"
        } else {
            "✗"
        };
        println!(
            "  {} XOR {} = {:.4} (expected {}) {}",
            inputs[0], inputs[1], output, expected, status
        );
    }

    println!("\n{champion}");

    let path = std::env::temp_dir().join("xor_population.json");
    runner
        .population
        .save(BufWriter::new(File::create(&path)?))?;
    println!("Final population saved to {}", path.display());
    Ok(())
}
