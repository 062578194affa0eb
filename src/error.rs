//! Error types for the NEAT engine.
//!
//! Every fallible operation returns [`Result`], whose error is a [`NeatError`].
//! Only [`NeatError::NoCandidate`] is expected to be swallowed by an internal
//! caller (the per-genome mutation pass); everything else propagates.

use thiserror::Error;

use crate::gene::{InnovationId, NodeId, NodeKind};

/// Boxed error returned by external collaborators such as fitness functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NeatError>;

/// Top-level error for every engine operation.
#[derive(Debug, Error)]
pub enum NeatError {
    /// A required input was empty or out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A structural mutation found nothing to act on. Benign.
    #[error("no candidate: {0}")]
    NoCandidate(NoCandidate),

    /// A genome broke one of its structural invariants.
    #[error("structural violation: {0}")]
    Structural(#[from] StructuralViolation),

    /// Reproduction produced the wrong number of genomes.
    #[error("reproduction produced {got} genomes, expected {expected}")]
    SizeMismatch {
        /// Genomes actually produced.
        got: usize,
        /// Size of the previous generation.
        expected: usize,
    },

    /// A persisted genome or population could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading or writing persisted data failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The external fitness function reported a failure.
    #[error("fitness evaluation failed: {0}")]
    Fitness(#[source] BoxError),
}

impl NeatError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Whether this error is the benign "nothing to mutate" signal.
    #[must_use]
    pub const fn is_no_candidate(&self) -> bool {
        matches!(self, Self::NoCandidate(_))
    }
}

impl From<NoCandidate> for NeatError {
    fn from(value: NoCandidate) -> Self {
        Self::NoCandidate(value)
    }
}

/// Which structural mutation came up empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NoCandidate {
    /// Every legal (source, destination) pair is already connected.
    #[error("no valid connection candidates")]
    Connection,
    /// There is no enabled connection to split.
    #[error("no enabled connections to split")]
    EnabledConnection,
}

/// Broken genome invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralViolation {
    /// Two node genes share an id.
    #[error("duplicate node id {0}")]
    DuplicateNode(NodeId),

    /// Two connection genes share an innovation id.
    #[error("duplicate connection innovation {0}")]
    DuplicateConnection(InnovationId),

    /// A connection endpoint is not a node of the genome.
    #[error("connection {innovation} references unknown node {node}")]
    UnknownNode {
        /// Offending connection.
        innovation: InnovationId,
        /// The missing endpoint.
        node: NodeId,
    },

    /// A connection feeds into an input node.
    #[error("connection {innovation} targets input node {node}")]
    TargetsInput {
        /// Offending connection.
        innovation: InnovationId,
        /// The input node.
        node: NodeId,
    },

    /// The enabled connections contain a cycle.
    #[error("cycle detected at node {0}")]
    Cycle(NodeId),

    /// A node id was requested that the genome (or both parents) lack.
    #[error("node {0} not found")]
    MissingNode(NodeId),

    /// A node was named as an input/output but has a different kind.
    #[error("node {id} is not an {expected} node")]
    RoleMismatch {
        /// The node in question.
        id: NodeId,
        /// The role it was claimed for.
        expected: NodeKind,
    },

    /// The genome has no node of a required kind.
    #[error("genome has no {0} nodes")]
    MissingRole(NodeKind),

    /// Two sources disagree on the innovation of the same node pair.
    #[error("conflicting innovation for connection {input}->{output}: {existing} vs {conflicting}")]
    ConflictingInnovation {
        /// Source node.
        input: NodeId,
        /// Destination node.
        output: NodeId,
        /// Innovation already on record.
        existing: InnovationId,
        /// Innovation that disagreed with it.
        conflicting: InnovationId,
    },

    /// One innovation id was given to two different node pairs.
    #[error("innovation {innovation} reused for {input}->{output}, already {first_input}->{first_output}")]
    ReusedInnovation {
        /// The shared innovation.
        innovation: InnovationId,
        /// Source of the pair on record.
        first_input: NodeId,
        /// Destination of the pair on record.
        first_output: NodeId,
        /// Source of the new pair.
        input: NodeId,
        /// Destination of the new pair.
        output: NodeId,
    },

    /// An id at the top of the `u64` range leaves no room for fresh ids.
    #[error("id {0} is too large to continue numbering after")]
    IdExhausted(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_candidate_is_distinguishable() {
        let err: NeatError = NoCandidate::Connection.into();
        assert!(err.is_no_candidate());

        let err: NeatError = StructuralViolation::Cycle(NodeId(3)).into();
        assert!(!err.is_no_candidate());
    }

    #[test]
    fn test_error_display() {
        let err = NeatError::from(StructuralViolation::TargetsInput {
            innovation: InnovationId(7),
            node: NodeId(1),
        });
        let msg = err.to_string();
        assert!(msg.contains("targets input node 1"), "{msg}");

        let err = NeatError::SizeMismatch {
            got: 9,
            expected: 10,
        };
        assert_eq!(
            err.to_string(),
            "reproduction produced 9 genomes, expected 10"
        );
    }
}
