//! NEAT genome: node genes, connection genes and a fitness score.
//!
//! Nodes are kept sorted by id and connections by innovation id. Every
//! operator in the crate preserves that ordering with sorted insertion, and
//! readers that must not trust hand-built genomes sort on read instead.

use serde::{Deserialize, Serialize};

use crate::activation::Activation;
use crate::error::{NeatError, Result, StructuralViolation};
use crate::gene::{ConnectionGene, InnovationId, NodeGene, NodeId, NodeKind};
use crate::innovation::InnovationTracker;
use crate::random::RandomSource;
use crate::topology::GraphTopology;

/// Shape of the initial, fully-connected genomes of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenomeConfig {
    /// Number of input nodes.
    pub input_count: usize,
    /// Number of output nodes.
    pub output_count: usize,
    /// Activation assigned to every output node.
    pub output_activation: Activation,
    /// Initial weights are drawn from `[-weight_range, weight_range)`.
    pub weight_range: f64,
}

impl Default for GenomeConfig {
    fn default() -> Self {
        Self {
            input_count: 2,
            output_count: 1,
            output_activation: Activation::Sigmoid,
            weight_range: 1.0,
        }
    }
}

impl GenomeConfig {
    /// Config for CPPN-style image networks.
    #[must_use]
    pub fn cppn(input_count: usize, output_count: usize) -> Self {
        Self {
            input_count,
            output_count,
            output_activation: Activation::Sigmoid,
            weight_range: 2.0,
        }
    }

    /// A minimal linear-output config for testing.
    #[must_use]
    pub fn minimal(input_count: usize, output_count: usize) -> Self {
        Self {
            input_count,
            output_count,
            output_activation: Activation::Linear,
            ..Default::default()
        }
    }
}

/// The genetic encoding of one candidate network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    /// Score assigned by the last evaluation; 0 until evaluated.
    #[serde(default)]
    pub fitness: f64,
    /// Node genes, sorted by id.
    pub nodes: Vec<NodeGene>,
    /// Connection genes, sorted by innovation id.
    #[serde(default)]
    pub connections: Vec<ConnectionGene>,
}

impl Genome {
    /// Create a genome with every input wired to every output.
    ///
    /// Inputs get ids `1..=N`, outputs `N+1..=N+M`. Connection innovations come
    /// from the tracker, so every genome built against the same tracker shares
    /// them, and the tracker is told about the fixed node ids so later hidden
    /// nodes never reuse them.
    ///
    /// # Errors
    ///
    /// Returns [`NeatError::InvalidArgument`] when either count is zero, or
    /// [`StructuralViolation::IdExhausted`] when the tracker runs out of ids.
    pub fn fully_connected<R: RandomSource>(
        config: &GenomeConfig,
        rng: &mut R,
        tracker: &mut InnovationTracker,
    ) -> Result<Self> {
        if config.input_count == 0 {
            return Err(NeatError::invalid("input count must be > 0"));
        }
        if config.output_count == 0 {
            return Err(NeatError::invalid("output count must be > 0"));
        }

        let inputs: Vec<NodeId> = (1..=config.input_count as u64).map(NodeId).collect();
        let outputs: Vec<NodeId> = (1..=config.output_count as u64)
            .map(|i| NodeId(config.input_count as u64 + i))
            .collect();

        let mut nodes = Vec::with_capacity(inputs.len() + outputs.len());
        nodes.extend(inputs.iter().map(|&id| NodeGene::input(id)));
        nodes.extend(
            outputs
                .iter()
                .map(|&id| NodeGene::output(id, config.output_activation)),
        );
        if let Some(last) = outputs.last() {
            tracker.reserve_node_ids(*last)?;
        }

        let mut connections = Vec::with_capacity(inputs.len() * outputs.len());
        for &input in &inputs {
            for &output in &outputs {
                let innovation = tracker.innovation(input, output)?;
                let weight = rng.uniform(-config.weight_range, config.weight_range);
                connections.push(ConnectionGene::new(innovation, input, output, weight));
            }
        }
        connections.sort_by_key(|c| c.innovation);

        Ok(Self {
            fitness: 0.0,
            nodes,
            connections,
        })
    }

    /// Look up a node gene by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&NodeGene> {
        match self.nodes.binary_search_by_key(&id, |n| n.id) {
            Ok(pos) => self.nodes.get(pos),
            Err(_) => self.nodes.iter().find(|n| n.id == id),
        }
    }

    /// Look up a connection gene by innovation id.
    #[must_use]
    pub fn connection(&self, innovation: InnovationId) -> Option<&ConnectionGene> {
        match self
            .connections
            .binary_search_by_key(&innovation, |c| c.innovation)
        {
            Ok(pos) => self.connections.get(pos),
            Err(_) => self.connections.iter().find(|c| c.innovation == innovation),
        }
    }

    /// Whether any connection (enabled or not) already joins `input -> output`.
    #[must_use]
    pub fn has_connection(&self, input: NodeId, output: NodeId) -> bool {
        self.connections
            .iter()
            .any(|c| c.input == input && c.output == output)
    }

    /// Insert a node keeping the collection sorted by id.
    pub fn insert_node(&mut self, node: NodeGene) {
        let pos = self.nodes.partition_point(|n| n.id <= node.id);
        self.nodes.insert(pos, node);
    }

    /// Insert a connection keeping the collection sorted by innovation.
    pub fn insert_connection(&mut self, conn: ConnectionGene) {
        let pos = self
            .connections
            .partition_point(|c| c.innovation <= conn.innovation);
        self.connections.insert(pos, conn);
    }

    /// Re-establish both sort invariants, e.g. on a hand-built genome.
    pub fn sort_genes(&mut self) {
        self.nodes.sort_by_key(|n| n.id);
        self.connections.sort_by_key(|c| c.innovation);
    }

    /// Ids of all nodes of one kind, ascending.
    #[must_use]
    pub fn ids_of_kind(&self, kind: NodeKind) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|n| n.kind == kind)
            .map(|n| n.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Get all hidden node IDs.
    #[must_use]
    pub fn hidden_ids(&self) -> Vec<NodeId> {
        self.ids_of_kind(NodeKind::Hidden)
    }

    /// Get the number of enabled connections.
    #[must_use]
    pub fn num_enabled_connections(&self) -> usize {
        self.connections.iter().filter(|c| c.enabled).count()
    }

    /// Deterministic topological order of the enabled subgraph.
    ///
    /// # Errors
    ///
    /// Fails on duplicate ids, dangling endpoints, or a cycle.
    pub fn topological_order(&self) -> Result<Vec<NodeId>> {
        GraphTopology::from_genome(self)?.topological_order()
    }

    /// Check every structural invariant of the genome.
    ///
    /// # Errors
    ///
    /// Returns the first [`StructuralViolation`] found.
    pub fn validate(&self) -> Result<()> {
        let mut innovations: Vec<InnovationId> =
            self.connections.iter().map(|c| c.innovation).collect();
        innovations.sort_unstable();
        if let Some(pair) = innovations.windows(2).find(|w| w[0] == w[1]) {
            return Err(StructuralViolation::DuplicateConnection(pair[0]).into());
        }

        // Catches duplicate node ids too.
        let topology = GraphTopology::from_genome(self)?;

        for conn in &self.connections {
            for endpoint in [conn.input, conn.output] {
                if topology.node_index(endpoint).is_none() {
                    return Err(StructuralViolation::UnknownNode {
                        innovation: conn.innovation,
                        node: endpoint,
                    }
                    .into());
                }
            }
            if self.node(conn.output).is_some_and(NodeGene::is_input) {
                return Err(StructuralViolation::TargetsInput {
                    innovation: conn.innovation,
                    node: conn.output,
                }
                .into());
            }
        }

        topology.topological_order().map(|_| ())
    }

    /// Copy of this genome with its fitness back at the neutral value.
    #[must_use]
    pub fn offspring_clone(&self) -> Self {
        Self {
            fitness: 0.0,
            ..self.clone()
        }
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Propagates encoder failures as [`NeatError::Serialization`].
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON. Gene order is normalized on read.
    ///
    /// # Errors
    ///
    /// Returns [`NeatError::Serialization`] for malformed input or unknown
    /// activation / kind tags.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut genome: Self = serde_json::from_str(json)?;
        genome.sort_genes();
        Ok(genome)
    }
}

/// Deterministic multi-line summary, sorted by id and innovation.
impl std::fmt::Display for Genome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Genome")?;
        writeln!(f, "Fitness: {:.4}", self.fitness)?;
        writeln!(f, "Nodes: {}", self.nodes.len())?;
        let mut nodes: Vec<&NodeGene> = self.nodes.iter().collect();
        nodes.sort_by_key(|n| n.id);
        for n in nodes {
            writeln!(
                f,
                "  Node {} {} act={} bias={:.4}",
                n.id, n.kind, n.activation, n.bias
            )?;
        }

        writeln!(f, "Connections: {}", self.connections.len())?;
        let mut conns: Vec<&ConnectionGene> = self.connections.iter().collect();
        conns.sort_by_key(|c| c.innovation);
        for c in conns {
            let state = if c.enabled { "on" } else { "off" };
            writeln!(
                f,
                "  Conn {} {}->{} w={:.4} {}",
                c.innovation, c.input, c.output, c.weight, state
            )?;
        }
        Ok(())
    }
}
