//! Innovation tracking for NEAT.
//!
//! Connection genes are aligned across genomes by innovation id, so the same
//! (source, destination) pair must receive the same id no matter which genome
//! grows it or when. [`InnovationTracker`] is the single authority for that
//! mapping and for fresh node ids. It is an explicit, run-scoped context:
//! every builder and mutation operator takes it by `&mut`, which also gives
//! the single-writer discipline for free.

use std::collections::HashMap;

use crate::error::{Result, StructuralViolation};
use crate::gene::{InnovationId, NodeId};
use crate::genome::Genome;

/// Run-scoped registry of connection innovations and node ids.
#[derive(Debug, Clone)]
pub struct InnovationTracker {
    next_innovation: u64,
    next_node: u64,
    connections: HashMap<(NodeId, NodeId), InnovationId>,
    pairs: HashMap<InnovationId, (NodeId, NodeId)>,
}

impl Default for InnovationTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl InnovationTracker {
    /// Empty tracker; the first ids handed out are 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_innovation: 1,
            next_node: 1,
            connections: HashMap::new(),
            pairs: HashMap::new(),
        }
    }

    /// Rebuild a tracker from existing genomes, e.g. after loading a saved run.
    ///
    /// # Errors
    ///
    /// Returns [`StructuralViolation::ConflictingInnovation`] if two genomes
    /// assign different innovations to the same node pair,
    /// [`StructuralViolation::ReusedInnovation`] if one innovation names two
    /// different pairs, and [`StructuralViolation::IdExhausted`] for an id of
    /// `u64::MAX`.
    pub fn from_genomes(genomes: &[Genome]) -> Result<Self> {
        let mut tracker = Self::new();
        for genome in genomes {
            for node in &genome.nodes {
                tracker.reserve_node_ids(node.id)?;
            }
            for conn in &genome.connections {
                tracker.seed_connection(conn.input, conn.output, conn.innovation)?;
            }
        }
        Ok(tracker)
    }

    /// Canonical innovation for `input -> output`, allocated on first request.
    ///
    /// # Errors
    ///
    /// [`StructuralViolation::IdExhausted`] once the `u64` range is used up.
    pub fn innovation(&mut self, input: NodeId, output: NodeId) -> Result<InnovationId> {
        if let Some(&innovation) = self.connections.get(&(input, output)) {
            return Ok(innovation);
        }
        let innovation = InnovationId(self.next_innovation);
        self.next_innovation = bump(self.next_innovation)?;
        self.connections.insert((input, output), innovation);
        self.pairs.insert(innovation, (input, output));
        Ok(innovation)
    }

    /// A node id that has never been handed out or observed.
    ///
    /// # Errors
    ///
    /// [`StructuralViolation::IdExhausted`] once the `u64` range is used up.
    pub fn next_node_id(&mut self) -> Result<NodeId> {
        let id = NodeId(self.next_node);
        self.next_node = bump(self.next_node)?;
        Ok(id)
    }

    /// Record an explicit innovation for a node pair.
    ///
    /// # Errors
    ///
    /// Fails if the pair is already mapped to a different innovation, if the
    /// innovation already names another pair, or if no innovation can follow
    /// it.
    pub fn seed_connection(
        &mut self,
        input: NodeId,
        output: NodeId,
        innovation: InnovationId,
    ) -> Result<()> {
        if let Some(&existing) = self.connections.get(&(input, output)) {
            if existing != innovation {
                return Err(StructuralViolation::ConflictingInnovation {
                    input,
                    output,
                    existing,
                    conflicting: innovation,
                }
                .into());
            }
            return Ok(());
        }
        if let Some(&(first_input, first_output)) = self.pairs.get(&innovation) {
            return Err(StructuralViolation::ReusedInnovation {
                innovation,
                first_input,
                first_output,
                input,
                output,
            }
            .into());
        }
        let next = bump(innovation.0)?;
        self.connections.insert((input, output), innovation);
        self.pairs.insert(innovation, (input, output));
        self.next_innovation = self.next_innovation.max(next);
        Ok(())
    }

    /// Make sure ids up to and including `id` are never handed out again.
    ///
    /// # Errors
    ///
    /// [`StructuralViolation::IdExhausted`] when `id` is `u64::MAX`.
    pub fn reserve_node_ids(&mut self, id: NodeId) -> Result<()> {
        let next = bump(id.0)?;
        self.next_node = self.next_node.max(next);
        Ok(())
    }

    /// Recorded innovation for a pair, without allocating.
    #[must_use]
    pub fn lookup(&self, input: NodeId, output: NodeId) -> Option<InnovationId> {
        self.connections.get(&(input, output)).copied()
    }

    /// Number of distinct connection innovations on record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no connection innovation has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

/// The id after `id`; `u64::MAX` has none.
fn bump(id: u64) -> Result<u64> {
    Ok(id
        .checked_add(1)
        .ok_or(StructuralViolation::IdExhausted(id))?)
}
