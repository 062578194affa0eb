//! Compiled execution plans for CPPN genomes.
//!
//! A [`Plan`] is an immutable, topologically ordered program derived from a
//! genome. Every node owns one value slot: inputs take the first slots in the
//! caller's order, the other nodes follow in evaluation order. Incoming edges
//! are stored in CSR form (one flat array of sources and weights plus a range
//! per node) and kept in innovation order, so the floating-point summation
//! order is identical for equivalent genomes.

use std::ops::Range;

use crate::activation::Activation;
use crate::error::{NeatError, Result, StructuralViolation};
use crate::gene::{NodeGene, NodeId, NodeKind};
use crate::genome::Genome;
use crate::topology::GraphTopology;

/// A non-input node scheduled for evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledNode {
    /// Genome id of the node.
    pub id: NodeId,
    /// Value slot the node writes.
    pub slot: usize,
    /// Bias added to the weighted sum.
    pub bias: f64,
    /// Transfer function.
    pub activation: Activation,
    edges: Range<usize>,
}

/// Compiled, acyclic evaluation plan. Evaluation is pure: a plan can be shared
/// across threads and queried any number of times.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    inputs: Vec<NodeId>,
    outputs: Vec<NodeId>,
    nodes: Vec<CompiledNode>,
    /// CSR: source slot of each incoming edge.
    sources: Vec<usize>,
    /// CSR: weight of each incoming edge, parallel to `sources`.
    weights: Vec<f64>,
    output_slots: Vec<usize>,
    slot_count: usize,
}

impl Plan {
    /// Compile with inputs and outputs inferred from node kinds, ascending id.
    ///
    /// # Errors
    ///
    /// See [`Plan::build`].
    pub fn from_genome(genome: &Genome) -> Result<Self> {
        Self::build(genome, &[], &[])
    }

    /// Compile a genome into a plan.
    ///
    /// `inputs` and `outputs` fix the order of values passed to and returned
    /// from [`Plan::eval`]; an empty slice means every node of that kind in
    /// ascending id order.
    ///
    /// # Errors
    ///
    /// - [`NeatError::InvalidArgument`] for a genome without nodes, an id listed
    ///   twice, or an edge reading an input node that is not a plan input
    /// - [`StructuralViolation`] for duplicate node ids, unknown ids, a listed
    ///   node of the wrong kind, a genome without inputs or outputs, an enabled
    ///   connection to an unknown node or into an input, or a cycle
    pub fn build(genome: &Genome, inputs: &[NodeId], outputs: &[NodeId]) -> Result<Self> {
        if genome.nodes.is_empty() {
            return Err(NeatError::invalid("genome has no nodes"));
        }
        let topology = GraphTopology::from_genome(genome)?;

        let inputs = resolve_role(genome, inputs, NodeKind::Input)?;
        let outputs = resolve_role(genome, outputs, NodeKind::Output)?;

        let order = topology.topological_order()?;

        let mut slot_of: Vec<Option<usize>> = vec![None; topology.node_count()];
        let mut assign = |id: NodeId, slot: usize| -> Result<()> {
            let idx = topology
                .node_index(id)
                .ok_or(StructuralViolation::MissingNode(id))?;
            if slot_of[idx].replace(slot).is_some() {
                return Err(NeatError::invalid(format!("node {id} listed twice")));
            }
            Ok(())
        };

        for (slot, &id) in inputs.iter().enumerate() {
            assign(id, slot)?;
        }
        let mut scheduled: Vec<&NodeGene> = Vec::with_capacity(order.len());
        for &id in &order {
            let node = genome.node(id).ok_or(StructuralViolation::MissingNode(id))?;
            if node.is_input() {
                continue;
            }
            assign(id, inputs.len() + scheduled.len())?;
            scheduled.push(node);
        }
        let slot_count = inputs.len() + scheduled.len();
        let slot = |id: NodeId| topology.node_index(id).and_then(|idx| slot_of[idx]);

        let mut enabled: Vec<_> = genome.connections.iter().filter(|c| c.enabled).collect();
        enabled.sort_by_key(|c| c.innovation);

        let mut incoming: Vec<Vec<(usize, f64)>> = vec![Vec::new(); scheduled.len()];
        for conn in enabled {
            if genome.node(conn.output).is_some_and(NodeGene::is_input) {
                return Err(StructuralViolation::TargetsInput {
                    innovation: conn.innovation,
                    node: conn.output,
                }
                .into());
            }
            let src = slot(conn.input).ok_or_else(|| {
                NeatError::invalid(format!(
                    "connection {} reads node {} which is not a plan input",
                    conn.innovation, conn.input
                ))
            })?;
            let dst = slot(conn.output).ok_or(StructuralViolation::MissingNode(conn.output))?;
            incoming[dst - inputs.len()].push((src, conn.weight));
        }

        let mut nodes = Vec::with_capacity(scheduled.len());
        let mut sources = Vec::new();
        let mut weights = Vec::new();
        for (i, (node, edges)) in scheduled.iter().zip(incoming).enumerate() {
            let start = sources.len();
            for (src, weight) in edges {
                sources.push(src);
                weights.push(weight);
            }
            nodes.push(CompiledNode {
                id: node.id,
                slot: inputs.len() + i,
                bias: node.bias,
                activation: node.activation,
                edges: start..sources.len(),
            });
        }

        let output_slots = outputs
            .iter()
            .map(|&id| slot(id).ok_or(StructuralViolation::MissingNode(id)))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            inputs,
            outputs,
            nodes,
            sources,
            weights,
            output_slots,
            slot_count,
        })
    }

    /// Evaluate the plan for one input vector.
    ///
    /// # Errors
    ///
    /// [`NeatError::InvalidArgument`] if `inputs` does not have one value per
    /// plan input.
    pub fn eval(&self, inputs: &[f64]) -> Result<Vec<f64>> {
        let mut scratch = Vec::with_capacity(self.slot_count);
        let mut outputs = vec![0.0; self.output_slots.len()];
        self.eval_into(inputs, &mut scratch, &mut outputs)?;
        Ok(outputs)
    }

    /// Allocation-free evaluation for hot loops such as per-pixel rendering.
    ///
    /// `scratch` is resized to the slot count and may be reused across calls.
    ///
    /// # Errors
    ///
    /// [`NeatError::InvalidArgument`] on an input or output length mismatch.
    pub fn eval_into(
        &self,
        inputs: &[f64],
        scratch: &mut Vec<f64>,
        outputs: &mut [f64],
    ) -> Result<()> {
        if inputs.len() != self.inputs.len() {
            return Err(NeatError::invalid(format!(
                "expected {} inputs, got {}",
                self.inputs.len(),
                inputs.len()
            )));
        }
        if outputs.len() != self.output_slots.len() {
            return Err(NeatError::invalid(format!(
                "expected an output buffer of {}, got {}",
                self.output_slots.len(),
                outputs.len()
            )));
        }

        scratch.clear();
        scratch.resize(self.slot_count, 0.0);
        scratch[..inputs.len()].copy_from_slice(inputs);

        for node in &self.nodes {
            let mut sum = node.bias;
            for e in node.edges.clone() {
                sum += scratch[self.sources[e]] * self.weights[e];
            }
            scratch[node.slot] = node.activation.apply(sum);
        }

        for (out, &slot) in outputs.iter_mut().zip(&self.output_slots) {
            *out = scratch[slot];
        }
        Ok(())
    }

    /// Incoming `(source slot, weight)` pairs of a compiled node, in
    /// innovation order.
    pub fn incoming(&self, node: &CompiledNode) -> impl Iterator<Item = (usize, f64)> + '_ {
        let edges = node.edges.clone();
        self.sources[edges.clone()]
            .iter()
            .copied()
            .zip(self.weights[edges].iter().copied())
    }

    /// Non-input nodes in evaluation order.
    #[must_use]
    pub fn nodes(&self) -> &[CompiledNode] {
        &self.nodes
    }

    /// Input ids in the order `eval` expects their values.
    #[must_use]
    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    /// Output ids in the order `eval` returns their values.
    #[must_use]
    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    /// Get the number of input nodes.
    #[must_use]
    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    /// Get the number of output nodes.
    #[must_use]
    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Size of the value buffer used during evaluation.
    #[must_use]
    pub const fn slot_count(&self) -> usize {
        self.slot_count
    }
}

/// Validate an explicit id list against `kind`, or infer it.
fn resolve_role(genome: &Genome, ids: &[NodeId], kind: NodeKind) -> Result<Vec<NodeId>> {
    let ids = if ids.is_empty() {
        genome.ids_of_kind(kind)
    } else {
        ids.to_vec()
    };
    if ids.is_empty() {
        return Err(StructuralViolation::MissingRole(kind).into());
    }
    for &id in &ids {
        let node = genome.node(id).ok_or(StructuralViolation::MissingNode(id))?;
        if node.kind != kind {
            return Err(StructuralViolation::RoleMismatch { id, expected: kind }.into());
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gene::{ConnectionGene, InnovationId};
    use crate::genome::GenomeConfig;
    use crate::innovation::InnovationTracker;
    use crate::random::seeded_rng;

    fn conn(innovation: u64, input: u64, output: u64, weight: f64) -> ConnectionGene {
        ConnectionGene::new(InnovationId(innovation), NodeId(input), NodeId(output), weight)
    }

    /// in 1, in 2 -> hidden 3 -> out 4, all linear with unit weights
    fn sum_genome() -> Genome {
        Genome {
            fitness: 0.0,
            nodes: vec![
                NodeGene::input(NodeId(1)),
                NodeGene::input(NodeId(2)),
                NodeGene::hidden(NodeId(3), Activation::Linear),
                NodeGene::output(NodeId(4), Activation::Linear),
            ],
            connections: vec![
                conn(1, 1, 3, 1.0),
                conn(2, 2, 3, 1.0),
                conn(3, 3, 4, 1.0),
            ],
        }
    }

    #[test]
    fn test_eval_sum() {
        let plan = Plan::from_genome(&sum_genome()).unwrap();
        assert_eq!(plan.inputs(), &[NodeId(1), NodeId(2)]);
        assert_eq!(plan.outputs(), &[NodeId(4)]);
        assert_eq!(plan.slot_count(), 4);
        let out = plan.eval(&[2.0, 3.0]).unwrap();
        assert_eq!(out.len(), 1);
        assert!((out[0] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_eval_is_repeatable() {
        let mut rng = seeded_rng(42);
        let mut tracker = InnovationTracker::new();
        let genome =
            Genome::fully_connected(&GenomeConfig::cppn(3, 2), &mut rng, &mut tracker).unwrap();
        let plan = Plan::from_genome(&genome).unwrap();
        let a = plan.eval(&[0.5, -0.5, 0.25]).unwrap();
        let b = plan.eval(&[0.5, -0.5, 0.25]).unwrap();
        assert_eq!(a.len(), 2);
        assert_eq!(a[0].to_bits(), b[0].to_bits());
        assert_eq!(a[1].to_bits(), b[1].to_bits());
    }

    #[test]
    fn test_explicit_input_order() {
        let mut genome = sum_genome();
        genome.connections[1].weight = 10.0;
        let plan = Plan::build(&genome, &[NodeId(2), NodeId(1)], &[]).unwrap();
        // node 2 now takes the first value
        let out = plan.eval(&[1.0, 3.0]).unwrap();
        assert!((out[0] - 13.0).abs() < 1e-12);
    }

    #[test]
    fn test_bias_and_activation() {
        let mut genome = sum_genome();
        genome.nodes[2].bias = -5.0;
        genome.nodes[3].activation = Activation::Relu;
        let plan = Plan::from_genome(&genome).unwrap();
        assert!(plan.eval(&[1.0, 1.0]).unwrap()[0].abs() < 1e-12);
        assert!((plan.eval(&[4.0, 3.0]).unwrap()[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_disabled_connection_is_skipped() {
        let mut genome = sum_genome();
        genome.connections[1].enabled = false;
        let plan = Plan::from_genome(&genome).unwrap();
        assert!((plan.eval(&[2.0, 3.0]).unwrap()[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut genome = sum_genome();
        genome.nodes.push(NodeGene::hidden(NodeId(5), Activation::Linear));
        genome.connections.push(conn(4, 3, 5, 1.0));
        genome.connections.push(conn(5, 5, 3, 1.0));
        let err = Plan::from_genome(&genome).unwrap_err();
        assert!(matches!(
            err,
            NeatError::Structural(StructuralViolation::Cycle(NodeId(3)))
        ));

        // the same loop is fine while one edge is disabled
        genome.connections[4].enabled = false;
        Plan::from_genome(&genome).unwrap();
    }

    #[test]
    fn test_structural_errors() {
        assert!(matches!(
            Plan::from_genome(&Genome::default()),
            Err(NeatError::InvalidArgument(_))
        ));

        let genome = sum_genome();
        assert!(matches!(
            Plan::build(&genome, &[NodeId(3)], &[]),
            Err(NeatError::Structural(StructuralViolation::RoleMismatch {
                id: NodeId(3),
                expected: NodeKind::Input
            }))
        ));
        assert!(matches!(
            Plan::build(&genome, &[], &[NodeId(99)]),
            Err(NeatError::Structural(StructuralViolation::MissingNode(NodeId(99))))
        ));

        let mut no_outputs = sum_genome();
        no_outputs.nodes.pop();
        no_outputs.connections.pop();
        assert!(matches!(
            Plan::from_genome(&no_outputs),
            Err(NeatError::Structural(StructuralViolation::MissingRole(
                NodeKind::Output
            )))
        ));

        let mut into_input = sum_genome();
        into_input.connections.push(conn(9, 2, 1, 1.0));
        assert!(matches!(
            Plan::from_genome(&into_input),
            Err(NeatError::Structural(StructuralViolation::TargetsInput { .. }))
        ));
    }

    #[test]
    fn test_unlisted_input_is_rejected() {
        let err = Plan::build(&sum_genome(), &[NodeId(1)], &[]).unwrap_err();
        assert!(matches!(err, NeatError::InvalidArgument(_)));
    }

    #[test]
    fn test_input_length_mismatch() {
        let plan = Plan::from_genome(&sum_genome()).unwrap();
        assert!(matches!(
            plan.eval(&[1.0]),
            Err(NeatError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_eval_into_reuses_scratch() {
        let plan = Plan::from_genome(&sum_genome()).unwrap();
        let mut scratch = Vec::new();
        let mut out = [0.0];
        for (a, b) in [(1.0, 2.0), (-4.0, 0.5), (0.0, 0.0)] {
            plan.eval_into(&[a, b], &mut scratch, &mut out).unwrap();
            assert!((out[0] - (a + b)).abs() < 1e-12);
        }
        assert_eq!(scratch.len(), plan.slot_count());
    }

    #[test]
    fn test_incoming_in_innovation_order() {
        let mut genome = sum_genome();
        genome.connections.reverse();
        let plan = Plan::from_genome(&genome).unwrap();
        let hidden = &plan.nodes()[0];
        assert_eq!(hidden.id, NodeId(3));
        let sources: Vec<usize> = plan.incoming(hidden).map(|(src, _)| src).collect();
        assert_eq!(sources, vec![0, 1]);
    }
}
