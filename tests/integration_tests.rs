//! Integration tests for cppn-neat.

use std::collections::HashMap;

use cppn_neat::{
    compatibility_distance, crossover, mutate_add_connection, mutate_add_node, seeded_rng,
    Activation, ConnectionGene, DistanceConfig, Genome, GenomeConfig, InnovationId,
    InnovationTracker, MutationConfig, NodeGene, NodeId, Plan, Population, PopulationConfig,
    ReproductionConfig,
};
use rand_chacha::ChaCha8Rng;

/// Deterministic score: the output of the network at one fixed point.
fn probe(genome: &Genome) -> f64 {
    let plan = Plan::from_genome(genome).unwrap();
    plan.eval(&[0.3, -0.7]).unwrap()[0]
}

fn structural() -> MutationConfig {
    MutationConfig {
        add_node_prob: 0.3,
        add_connection_prob: 0.3,
        ..MutationConfig::cppn()
    }
}

fn evolve(seed: u64, generations: usize) -> Population<ChaCha8Rng> {
    let mut pop = Population::fully_connected(
        seeded_rng(seed),
        PopulationConfig::default(),
        &GenomeConfig::cppn(2, 1),
        20,
    )
    .unwrap();
    for _ in 0..generations {
        for genome in &mut pop.genomes {
            genome.fitness = probe(genome);
        }
        pop.next_generation(&structural(), &ReproductionConfig::default())
            .unwrap();
    }
    pop
}

#[test]
fn test_full_evolution_cycle() {
    let pop = evolve(42, 10);
    assert_eq!(pop.len(), 20);

    // Every genome stays valid and compiles to a working plan
    for genome in &pop.genomes {
        genome.validate().unwrap();
        assert_eq!(genome.fitness, 0.0);
        let out = Plan::from_genome(genome).unwrap().eval(&[0.5, 0.5]).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].is_finite());
    }

    // Structure actually grew somewhere
    assert!(pop.genomes.iter().any(|g| g.nodes.len() > 3));
}

#[test]
fn test_same_seed_replays_same_run() {
    let a = evolve(7, 6);
    let b = evolve(7, 6);
    assert_eq!(a.genomes, b.genomes);

    let c = evolve(8, 6);
    assert_ne!(a.genomes, c.genomes);
}

#[test]
fn test_innovations_consistent_across_population() {
    let pop = evolve(3, 8);

    // One (source, destination) pair maps to one innovation everywhere
    let mut seen: HashMap<(NodeId, NodeId), InnovationId> = HashMap::new();
    for genome in &pop.genomes {
        for conn in &genome.connections {
            let known = *seen
                .entry((conn.input, conn.output))
                .or_insert(conn.innovation);
            assert_eq!(known, conn.innovation, "pair {}->{}", conn.input, conn.output);
        }
    }

    // And the tracker agrees
    for (&(input, output), &innovation) in &seen {
        assert_eq!(pop.tracker().lookup(input, output), Some(innovation));
    }
}

#[test]
fn test_same_new_connection_gets_same_innovation() {
    let mut rng = seeded_rng(42);
    let mut tracker = InnovationTracker::new();
    let config = MutationConfig::default();

    // 1, 2 -> 3, with one input connection split through a hidden node
    let mut base = Genome::fully_connected(&GenomeConfig::minimal(2, 1), &mut rng, &mut tracker)
        .unwrap();
    mutate_add_node(&mut base, &mut rng, &mut tracker, &config).unwrap();
    assert_eq!(base.hidden_ids().len(), 1);

    // The only candidate left is the unsplit input feeding the hidden node
    let mut a = base.clone();
    let mut b = base.clone();
    mutate_add_connection(&mut a, &mut rng, &mut tracker, &config).unwrap();
    mutate_add_connection(&mut b, &mut rng, &mut tracker, &config).unwrap();

    let added = |g: &Genome| -> Vec<ConnectionGene> {
        g.connections
            .iter()
            .filter(|c| base.connection(c.innovation).is_none())
            .cloned()
            .collect()
    };
    let (new_a, new_b) = (added(&a), added(&b));
    assert_eq!(new_a.len(), 1);
    assert_eq!(new_b.len(), 1);
    assert_eq!(new_a[0].innovation, new_b[0].innovation);
    assert_eq!(
        (new_a[0].input, new_a[0].output),
        (new_b[0].input, new_b[0].output)
    );
}

#[test]
fn test_crossover_offspring_always_acyclic() {
    let pop = evolve(11, 6);
    let mut rng = seeded_rng(99);

    for (i, a) in pop.genomes.iter().enumerate() {
        for b in pop.genomes.iter().skip(i + 1) {
            let mut a = a.clone();
            let mut b = b.clone();
            // Equal fitness: genes of both parents are inherited
            a.fitness = 1.0;
            b.fitness = 1.0;
            let child = crossover(&mut rng, &a, &b).unwrap();
            child.validate().unwrap();
            Plan::from_genome(&child).unwrap();
        }
    }
}

#[test]
fn test_hand_built_xor_network() {
    // |x - y| through an Abs hidden node is XOR on binary inputs
    let genome = Genome {
        fitness: 0.0,
        nodes: vec![
            NodeGene::input(NodeId(1)),
            NodeGene::input(NodeId(2)),
            NodeGene::output(NodeId(3), Activation::Linear),
            NodeGene::hidden(NodeId(4), Activation::Abs),
        ],
        connections: vec![
            ConnectionGene::new(InnovationId(1), NodeId(1), NodeId(4), 1.0),
            ConnectionGene::new(InnovationId(2), NodeId(2), NodeId(4), -1.0),
            ConnectionGene::new(InnovationId(3), NodeId(4), NodeId(3), 1.0),
        ],
    };
    genome.validate().unwrap();

    let plan = Plan::from_genome(&genome).unwrap();
    for (inputs, expected) in [
        ([0.0, 0.0], 0.0),
        ([0.0, 1.0], 1.0),
        ([1.0, 0.0], 1.0),
        ([1.0, 1.0], 0.0),
    ] {
        let out = plan.eval(&inputs).unwrap();
        assert!((out[0] - expected).abs() < 1e-12, "{inputs:?} -> {out:?}");
    }
}

#[test]
fn test_persistence_preserves_behavior() {
    let pop = evolve(5, 5);
    let mut buf = Vec::new();
    pop.save(&mut buf).unwrap();
    let restored =
        Population::load(buf.as_slice(), seeded_rng(0), PopulationConfig::default()).unwrap();

    for (original, loaded) in pop.genomes.iter().zip(&restored.genomes) {
        let before = Plan::from_genome(original).unwrap();
        let after = Plan::from_genome(loaded).unwrap();
        for point in [[0.5, -0.3], [-1.0, 1.0], [0.0, 0.0]] {
            assert_eq!(before.eval(&point).unwrap(), after.eval(&point).unwrap());
        }
    }
}

#[test]
fn test_compatibility_distance_properties() {
    let mut rng = seeded_rng(42);
    let mut tracker = InnovationTracker::new();
    let config = DistanceConfig::default();

    let genome1 = Genome::fully_connected(&GenomeConfig::minimal(2, 1), &mut rng, &mut tracker)
        .unwrap();
    let genome2 = genome1.clone();
    let mut genome3 = genome1.clone();
    let grow = MutationConfig {
        add_node_prob: 1.0,
        ..MutationConfig::frozen()
    };
    for _ in 0..3 {
        grow.mutate(&mut genome3, &mut rng, &mut tracker).unwrap();
    }

    assert!(compatibility_distance(&genome1, &genome1, &config).abs() < 1e-12);
    assert!(compatibility_distance(&genome1, &genome2, &config).abs() < 1e-12);

    let d13 = compatibility_distance(&genome1, &genome3, &config);
    let d31 = compatibility_distance(&genome3, &genome1, &config);
    assert!(d13 > 0.0, "grown genome should differ, got {d13}");
    assert!((d13 - d31).abs() < 1e-12, "asymmetric: {d13} vs {d31}");
}

#[test]
fn test_all_activation_functions_work() {
    for activation in Activation::ALL {
        let config = GenomeConfig {
            output_activation: activation,
            ..GenomeConfig::minimal(1, 1)
        };
        let mut rng = seeded_rng(42);
        let mut tracker = InnovationTracker::new();
        let genome = Genome::fully_connected(&config, &mut rng, &mut tracker).unwrap();

        let output = Plan::from_genome(&genome).unwrap().eval(&[0.5]).unwrap();
        assert!(
            output[0].is_finite(),
            "activation {activation:?} produced non-finite output"
        );
    }
}
