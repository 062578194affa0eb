//! NEAT crossover: align connection genes by innovation and merge two parents.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{Result, StructuralViolation};
use crate::gene::{ConnectionGene, NodeId, NodeKind};
use crate::genome::Genome;
use crate::random::RandomSource;
use crate::topology::GraphTopology;

/// Probability that a matching gene disabled in either parent stays disabled.
pub const DISABLED_INHERIT_PROB: f64 = 0.75;

/// Produce one child from two parents.
///
/// The strictly fitter parent is the primary. Matching genes take either
/// parent's value with equal odds. Disjoint and excess genes come from the
/// primary only, unless fitness is tied, in which case every unmatched gene
/// from either side is kept with probability 0.5.
///
/// The child carries every input and output node of both parents plus every
/// endpoint of its connections, and its fitness starts at 0. If merging two
/// lineages closes a loop in the enabled graph, the highest-innovation edge
/// on a cycle is disabled until the graph is acyclic again.
///
/// # Errors
///
/// [`StructuralViolation::MissingNode`] if a connection endpoint is defined by
/// neither parent.
pub fn crossover<R: RandomSource>(rng: &mut R, a: &Genome, b: &Genome) -> Result<Genome> {
    let (primary, secondary, tied) = if b.fitness > a.fitness {
        (b, a, false)
    } else {
        (a, b, a.fitness <= b.fitness)
    };

    let connections = merge_connections(rng, primary, secondary, tied);

    let mut required: BTreeSet<NodeId> = primary
        .nodes
        .iter()
        .chain(&secondary.nodes)
        .filter(|n| n.kind != NodeKind::Hidden)
        .map(|n| n.id)
        .collect();
    for conn in &connections {
        required.insert(conn.input);
        required.insert(conn.output);
    }

    let mut nodes = Vec::with_capacity(required.len());
    for id in required {
        let node = match (primary.node(id), secondary.node(id)) {
            (Some(p), Some(s)) => {
                if !tied || rng.chance(0.5) {
                    p
                } else {
                    s
                }
            }
            (Some(p), None) => p,
            (None, Some(s)) => s,
            (None, None) => return Err(StructuralViolation::MissingNode(id).into()),
        };
        nodes.push(node.clone());
    }

    let mut child = Genome {
        fitness: 0.0,
        nodes,
        connections,
    };
    child.sort_genes();
    break_cycles(&mut child)?;
    Ok(child)
}

fn merge_connections<R: RandomSource>(
    rng: &mut R,
    primary: &Genome,
    secondary: &Genome,
    tied: bool,
) -> Vec<ConnectionGene> {
    let mut genes_p: Vec<&ConnectionGene> = primary.connections.iter().collect();
    let mut genes_s: Vec<&ConnectionGene> = secondary.connections.iter().collect();
    genes_p.sort_by_key(|c| c.innovation);
    genes_s.sort_by_key(|c| c.innovation);

    let mut child = Vec::with_capacity(genes_p.len().max(genes_s.len()));
    let (mut i, mut j) = (0, 0);
    while i < genes_p.len() && j < genes_s.len() {
        let (p, s) = (genes_p[i], genes_s[j]);
        match p.innovation.cmp(&s.innovation) {
            std::cmp::Ordering::Equal => {
                let mut gene = if rng.chance(0.5) { s.clone() } else { p.clone() };
                if !p.enabled || !s.enabled {
                    gene.enabled = !rng.chance(DISABLED_INHERIT_PROB);
                }
                child.push(gene);
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => {
                if !tied || rng.chance(0.5) {
                    child.push(p.clone());
                }
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                if tied && rng.chance(0.5) {
                    child.push(s.clone());
                }
                j += 1;
            }
        }
    }

    for p in &genes_p[i..] {
        if !tied || rng.chance(0.5) {
            child.push((*p).clone());
        }
    }
    if tied {
        for s in &genes_s[j..] {
            if rng.chance(0.5) {
                child.push((*s).clone());
            }
        }
    }
    child
}

/// Disable cycle edges, newest first, until the enabled graph is acyclic.
fn break_cycles(genome: &mut Genome) -> Result<()> {
    loop {
        let topology = GraphTopology::from_genome(genome)?;
        let Some(newest) = topology.cyclic_edges().into_iter().max() else {
            return Ok(());
        };
        if let Some(conn) = genome
            .connections
            .iter_mut()
            .find(|c| c.innovation == newest)
        {
            conn.enabled = false;
        }
        debug!(innovation = %newest, "disabled connection closing a cycle in crossover child");
    }
}
