//! Mutation operators.
//!
//! A full pass ([`MutationConfig::mutate`]) runs the operators in a fixed
//! order: add-connection and add-node (each gated by its probability), then
//! weights, biases, enable toggles and activations. Structural operators ask
//! the [`InnovationTracker`] for ids so the same structural change gets the
//! same innovation in every genome of a run.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::activation::Activation;
use crate::error::{NoCandidate, Result};
use crate::gene::{ConnectionGene, NodeGene, NodeId, NodeKind};
use crate::genome::Genome;
use crate::innovation::InnovationTracker;
use crate::random::RandomSource;

/// Probabilities and scales for every mutation operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    /// Probability of attempting one new connection per pass.
    pub add_connection_prob: f64,
    /// Probability of attempting one node split per pass.
    pub add_node_prob: f64,
    /// Per-connection probability of touching the weight.
    pub weight_mutate_prob: f64,
    /// Given a weight mutation, probability of perturbing rather than resetting.
    pub weight_perturb_prob: f64,
    /// Perturbations are uniform in `[-scale, scale)`.
    pub weight_perturb_scale: f64,
    /// Resets are uniform in `[-scale, scale)`.
    pub weight_reset_scale: f64,
    /// Weight range of connections created by add-connection.
    pub weight_init_range: f64,
    /// Per-node probability of touching the bias.
    pub bias_mutate_prob: f64,
    /// Given a bias mutation, probability of perturbing rather than resetting.
    pub bias_perturb_prob: f64,
    /// Bias perturbation scale.
    pub bias_perturb_scale: f64,
    /// Bias reset scale.
    pub bias_reset_scale: f64,
    /// Per-connection probability of flipping `enabled`.
    pub toggle_enable_prob: f64,
    /// Per-node probability of resampling the activation.
    pub activation_mutate_prob: f64,
    /// Activations that hidden nodes and activation mutation may draw from.
    pub allowed_activations: Vec<Activation>,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            add_connection_prob: 0.05,
            add_node_prob: 0.03,
            weight_mutate_prob: 0.8,
            weight_perturb_prob: 0.9,
            weight_perturb_scale: 0.1,
            weight_reset_scale: 1.0,
            weight_init_range: 1.0,
            bias_mutate_prob: 0.7,
            bias_perturb_prob: 0.9,
            bias_perturb_scale: 0.1,
            bias_reset_scale: 1.0,
            toggle_enable_prob: 0.01,
            activation_mutate_prob: 0.02,
            allowed_activations: vec![
                Activation::Linear,
                Activation::Sigmoid,
                Activation::Tanh,
                Activation::Relu,
                Activation::Sin,
                Activation::Cos,
                Activation::Gaussian,
            ],
        }
    }
}

impl MutationConfig {
    /// Config for CPPN image networks: periodic and symmetric activations,
    /// more aggressive structural growth.
    #[must_use]
    pub fn cppn() -> Self {
        Self {
            add_connection_prob: 0.1,
            add_node_prob: 0.05,
            activation_mutate_prob: 0.1,
            allowed_activations: Activation::CPPN.to_vec(),
            ..Default::default()
        }
    }

    /// Every probability zero. A pass with this config changes nothing.
    #[must_use]
    pub fn frozen() -> Self {
        Self {
            add_connection_prob: 0.0,
            add_node_prob: 0.0,
            weight_mutate_prob: 0.0,
            bias_mutate_prob: 0.0,
            toggle_enable_prob: 0.0,
            activation_mutate_prob: 0.0,
            ..Default::default()
        }
    }

    /// Probability fields by name, for validation.
    pub(crate) fn probabilities(&self) -> [(&'static str, f64); 8] {
        [
            ("add_connection_prob", self.add_connection_prob),
            ("add_node_prob", self.add_node_prob),
            ("weight_mutate_prob", self.weight_mutate_prob),
            ("weight_perturb_prob", self.weight_perturb_prob),
            ("bias_mutate_prob", self.bias_mutate_prob),
            ("bias_perturb_prob", self.bias_perturb_prob),
            ("toggle_enable_prob", self.toggle_enable_prob),
            ("activation_mutate_prob", self.activation_mutate_prob),
        ]
    }

    /// Run one full mutation pass over `genome`.
    ///
    /// A structural operator that finds nothing to act on is skipped
    /// silently.
    ///
    /// # Errors
    ///
    /// Propagates structural errors from a malformed genome.
    pub fn mutate<R: RandomSource>(
        &self,
        genome: &mut Genome,
        rng: &mut R,
        tracker: &mut InnovationTracker,
    ) -> Result<()> {
        if rng.chance(self.add_connection_prob) {
            skip_no_candidate(mutate_add_connection(genome, rng, tracker, self))?;
        }
        if rng.chance(self.add_node_prob) {
            skip_no_candidate(mutate_add_node(genome, rng, tracker, self))?;
        }
        mutate_weights(genome, rng, self);
        mutate_biases(genome, rng, self);
        mutate_toggle_enable(genome, rng, self);
        mutate_activations(genome, rng, self);
        Ok(())
    }
}

fn skip_no_candidate(result: Result<()>) -> Result<()> {
    match result {
        Err(e) if e.is_no_candidate() => {
            trace!(reason = %e, "structural mutation skipped");
            Ok(())
        }
        other => other,
    }
}

/// Add one new forward connection between two unconnected nodes.
///
/// Candidates are pairs whose source is not an output, whose destination is
/// not an input, and whose source comes strictly earlier in the topological
/// order, so the new edge can never close a cycle. Pairs joined by any
/// existing connection, enabled or not, are excluded.
///
/// # Errors
///
/// [`NoCandidate::Connection`] when no pair qualifies, or a structural error
/// if the genome is malformed.
pub fn mutate_add_connection<R: RandomSource>(
    genome: &mut Genome,
    rng: &mut R,
    tracker: &mut InnovationTracker,
    config: &MutationConfig,
) -> Result<()> {
    let order = genome.topological_order()?;
    let position: HashMap<NodeId, usize> =
        order.iter().enumerate().map(|(i, &id)| (id, i)).collect();

    let mut nodes: Vec<&NodeGene> = genome.nodes.iter().collect();
    nodes.sort_by_key(|n| n.id);

    let mut candidates: Vec<(NodeId, NodeId)> = Vec::new();
    for src in &nodes {
        if src.kind == NodeKind::Output {
            continue;
        }
        for dst in &nodes {
            if dst.kind == NodeKind::Input || src.id == dst.id {
                continue;
            }
            if position[&src.id] >= position[&dst.id] {
                continue;
            }
            if genome.has_connection(src.id, dst.id) {
                continue;
            }
            candidates.push((src.id, dst.id));
        }
    }

    let Some(&(input, output)) = rng.pick(&candidates) else {
        return Err(NoCandidate::Connection.into());
    };

    let innovation = tracker.innovation(input, output)?;
    let weight = rng.uniform(-config.weight_init_range, config.weight_init_range);
    genome.insert_connection(ConnectionGene::new(innovation, input, output, weight));
    trace!(%input, %output, %innovation, candidates = candidates.len(), "added connection");
    Ok(())
}

/// Split an enabled connection with a new hidden node.
///
/// The split connection is disabled. The incoming half gets weight 1.0 and
/// the outgoing half inherits the old weight, so the signal through the new
/// node starts close to what it replaced.
///
/// # Errors
///
/// [`NoCandidate::EnabledConnection`] when every connection is disabled.
pub fn mutate_add_node<R: RandomSource>(
    genome: &mut Genome,
    rng: &mut R,
    tracker: &mut InnovationTracker,
    config: &MutationConfig,
) -> Result<()> {
    let enabled: Vec<usize> = genome
        .connections
        .iter()
        .enumerate()
        .filter(|(_, c)| c.enabled)
        .map(|(i, _)| i)
        .collect();
    let Some(&index) = rng.pick(&enabled) else {
        return Err(NoCandidate::EnabledConnection.into());
    };

    let split = &mut genome.connections[index];
    split.enabled = false;
    let (input, output, weight) = (split.input, split.output, split.weight);

    let node_id = tracker.next_node_id()?;
    let activation = rng
        .pick(&config.allowed_activations)
        .copied()
        .unwrap_or(Activation::Sigmoid);
    genome.insert_node(NodeGene::hidden(node_id, activation));

    let in_innovation = tracker.innovation(input, node_id)?;
    let out_innovation = tracker.innovation(node_id, output)?;
    genome.insert_connection(ConnectionGene::new(in_innovation, input, node_id, 1.0));
    genome.insert_connection(ConnectionGene::new(out_innovation, node_id, output, weight));

    trace!(node = %node_id, %input, %output, %activation, "split connection");
    Ok(())
}

/// Perturb or reset connection weights.
pub fn mutate_weights<R: RandomSource>(genome: &mut Genome, rng: &mut R, config: &MutationConfig) {
    let mut touched = 0usize;
    for conn in &mut genome.connections {
        if !rng.chance(config.weight_mutate_prob) {
            continue;
        }
        touched += 1;
        if rng.chance(config.weight_perturb_prob) {
            conn.weight += rng.uniform(-config.weight_perturb_scale, config.weight_perturb_scale);
        } else {
            conn.weight = rng.uniform(-config.weight_reset_scale, config.weight_reset_scale);
        }
    }
    trace!(touched, "mutated weights");
}

/// Perturb or reset the bias of every non-input node.
pub fn mutate_biases<R: RandomSource>(genome: &mut Genome, rng: &mut R, config: &MutationConfig) {
    let mut touched = 0usize;
    for node in genome.nodes.iter_mut().filter(|n| !n.is_input()) {
        if !rng.chance(config.bias_mutate_prob) {
            continue;
        }
        touched += 1;
        if rng.chance(config.bias_perturb_prob) {
            node.bias += rng.uniform(-config.bias_perturb_scale, config.bias_perturb_scale);
        } else {
            node.bias = rng.uniform(-config.bias_reset_scale, config.bias_reset_scale);
        }
    }
    trace!(touched, "mutated biases");
}

/// Flip `enabled` on random connections.
///
/// Re-enabling a connection that would close a cycle is reverted.
pub fn mutate_toggle_enable<R: RandomSource>(
    genome: &mut Genome,
    rng: &mut R,
    config: &MutationConfig,
) {
    for i in 0..genome.connections.len() {
        if !rng.chance(config.toggle_enable_prob) {
            continue;
        }
        if genome.connections[i].enabled {
            genome.connections[i].enabled = false;
            trace!(innovation = %genome.connections[i].innovation, "disabled connection");
            continue;
        }
        genome.connections[i].enabled = true;
        if genome.topological_order().is_err() {
            genome.connections[i].enabled = false;
            trace!(innovation = %genome.connections[i].innovation, "re-enable reverted");
        } else {
            trace!(innovation = %genome.connections[i].innovation, "enabled connection");
        }
    }
}

/// Resample the activation of random non-input nodes.
pub fn mutate_activations<R: RandomSource>(
    genome: &mut Genome,
    rng: &mut R,
    config: &MutationConfig,
) {
    if config.allowed_activations.is_empty() {
        return;
    }
    for node in genome.nodes.iter_mut().filter(|n| !n.is_input()) {
        if !rng.chance(config.activation_mutate_prob) {
            continue;
        }
        if let Some(&activation) = rng.pick(&config.allowed_activations) {
            node.activation = activation;
        }
    }
}
