//! Gene types for NEAT genomes.
//!
//! This module defines the fundamental building blocks of a network:
//! - [`NodeGene`]: a neuron with a kind, an activation and a bias
//! - [`ConnectionGene`]: a weighted edge carrying a global innovation id

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use crate::activation::Activation;

/// Identity of a node, unique within a genome and stable across a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

/// Historical identity of a connection gene, shared by every genome that
/// carries the same (source, destination) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InnovationId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for InnovationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The role of a node in the network. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Receives an external value; never mutated.
    Input,
    /// Internal node added by mutation.
    Hidden,
    /// Produces a network output.
    Output,
}

impl NodeKind {
    const ALL: [Self; 3] = [Self::Input, Self::Hidden, Self::Output];

    /// Lowercase persisted name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Hidden => "hidden",
            Self::Output => "output",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for NodeKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for NodeKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match NameOrIndex::deserialize(deserializer)? {
            NameOrIndex::Name(name) => Self::ALL
                .into_iter()
                .find(|k| k.name().eq_ignore_ascii_case(&name))
                .ok_or_else(|| de::Error::custom(format!("unknown node kind {name:?}"))),
            NameOrIndex::Index(index) => usize::try_from(index)
                .ok()
                .and_then(|i| Self::ALL.get(i).copied())
                .ok_or_else(|| de::Error::custom(format!("unknown node kind index {index}"))),
        }
    }
}

/// Persisted tag: a lowercase name, or the raw integer older files used.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum NameOrIndex {
    Name(String),
    Index(u64),
}

/// A node gene representing a neuron in the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeGene {
    /// Identity of this node.
    pub id: NodeId,
    /// The role of this node.
    pub kind: NodeKind,
    /// The activation function applied to this node's input sum.
    pub activation: Activation,
    /// Bias added before activation. Always 0 on input nodes.
    #[serde(default)]
    pub bias: f64,
}

impl NodeGene {
    /// Create a new input node.
    #[must_use]
    pub const fn input(id: NodeId) -> Self {
        Self {
            id,
            kind: NodeKind::Input,
            activation: Activation::Linear,
            bias: 0.0,
        }
    }

    /// Create a new output node.
    #[must_use]
    pub const fn output(id: NodeId, activation: Activation) -> Self {
        Self {
            id,
            kind: NodeKind::Output,
            activation,
            bias: 0.0,
        }
    }

    /// Create a new hidden node.
    #[must_use]
    pub const fn hidden(id: NodeId, activation: Activation) -> Self {
        Self {
            id,
            kind: NodeKind::Hidden,
            activation,
            bias: 0.0,
        }
    }

    /// Input nodes never take part in bias or activation mutation.
    #[inline]
    #[must_use]
    pub fn is_input(&self) -> bool {
        self.kind == NodeKind::Input
    }
}

/// A connection gene representing a weighted link between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionGene {
    /// Historical identity used to align genes during crossover.
    pub innovation: InnovationId,
    /// The source node of this connection.
    #[serde(rename = "in")]
    pub input: NodeId,
    /// The target node of this connection.
    #[serde(rename = "out")]
    pub output: NodeId,
    /// The connection weight.
    pub weight: f64,
    /// Disabled connections are skipped during evaluation but kept for crossover.
    pub enabled: bool,
}

impl ConnectionGene {
    /// Create a new enabled connection.
    #[must_use]
    pub const fn new(innovation: InnovationId, input: NodeId, output: NodeId, weight: f64) -> Self {
        Self {
            innovation,
            input,
            output,
            weight,
            enabled: true,
        }
    }
}
