//! Graph topology analysis using CSR format.
//!
//! [`GraphTopology`] is a snapshot of a genome's *enabled* connections in
//! Compressed Sparse Row form. Nodes get dense indices in ascending id order,
//! so a min-heap over dense indices yields the smallest ready node id first.
//!
//! ## Determinism
//!
//! Edges are sorted by innovation id before CSR construction and the ready
//! set of Kahn's algorithm is always drained smallest-id first. The resulting
//! order depends only on the genome's structure, never on the storage order
//! of its genes, which keeps plans and renders reproducible.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::error::{Result, StructuralViolation};
use crate::gene::{InnovationId, NodeId};
use crate::genome::Genome;

/// CSR-format snapshot of the enabled connection graph.
#[derive(Debug, Clone)]
pub struct GraphTopology {
    /// Dense index -> node id, ascending.
    idx_to_node: Vec<NodeId>,
    /// CSR offsets for forward edges. Length = node_count + 1.
    fwd_offsets: Vec<usize>,
    /// `fwd_targets[fwd_offsets[i]..fwd_offsets[i+1]]` are successors of node i.
    fwd_targets: Vec<usize>,
    /// Innovation of each forward edge, parallel to `fwd_targets`.
    fwd_innovations: Vec<InnovationId>,
    /// Number of enabled incoming edges per node.
    in_degree: Vec<usize>,
}

impl GraphTopology {
    /// Build the topology from a genome's enabled connections.
    ///
    /// # Errors
    ///
    /// Fails with a [`StructuralViolation`] on duplicate node ids or on an
    /// enabled connection whose endpoint is not in the genome.
    pub fn from_genome(genome: &Genome) -> Result<Self> {
        let mut idx_to_node: Vec<NodeId> = genome.nodes.iter().map(|n| n.id).collect();
        idx_to_node.sort_unstable();
        if let Some(pair) = idx_to_node.windows(2).find(|w| w[0] == w[1]) {
            return Err(StructuralViolation::DuplicateNode(pair[0]).into());
        }
        let node_count = idx_to_node.len();

        let mut edges: Vec<(usize, usize, InnovationId)> = Vec::new();
        let mut enabled: Vec<_> = genome.connections.iter().filter(|c| c.enabled).collect();
        enabled.sort_by_key(|c| c.innovation);
        for conn in enabled {
            let lookup = |node: NodeId| {
                idx_to_node
                    .binary_search(&node)
                    .map_err(|_| StructuralViolation::UnknownNode {
                        innovation: conn.innovation,
                        node,
                    })
            };
            edges.push((lookup(conn.input)?, lookup(conn.output)?, conn.innovation));
        }

        let mut fwd_offsets = vec![0usize; node_count + 1];
        let mut in_degree = vec![0usize; node_count];
        for &(from, to, _) in &edges {
            fwd_offsets[from + 1] += 1;
            in_degree[to] += 1;
        }
        for i in 0..node_count {
            fwd_offsets[i + 1] += fwd_offsets[i];
        }

        let mut fwd_targets = vec![0usize; edges.len()];
        let mut fwd_innovations = vec![InnovationId(0); edges.len()];
        let mut write_pos = fwd_offsets[..node_count].to_vec();
        for &(from, to, innovation) in &edges {
            let pos = write_pos[from];
            fwd_targets[pos] = to;
            fwd_innovations[pos] = innovation;
            write_pos[from] += 1;
        }

        Ok(Self {
            idx_to_node,
            fwd_offsets,
            fwd_targets,
            fwd_innovations,
            in_degree,
        })
    }

    /// Number of nodes in the topology.
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.idx_to_node.len()
    }

    /// Dense index of a node id.
    #[inline]
    #[must_use]
    pub fn node_index(&self, id: NodeId) -> Option<usize> {
        self.idx_to_node.binary_search(&id).ok()
    }

    /// Iterate over successors of a node (forward edges).
    #[inline]
    pub fn successors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        let start = self.fwd_offsets[idx];
        let end = self.fwd_offsets[idx + 1];
        self.fwd_targets[start..end].iter().copied()
    }

    /// Kahn's algorithm with a smallest-id-first ready set.
    ///
    /// Returns the processed order and the residual in-degree of every node;
    /// any non-zero residual means the node sits on or behind a cycle.
    fn kahn(&self) -> (Vec<usize>, Vec<usize>) {
        let mut in_degree = self.in_degree.clone();
        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, &deg)| deg == 0)
            .map(|(idx, _)| Reverse(idx))
            .collect();

        let mut order = Vec::with_capacity(self.node_count());
        while let Some(Reverse(u)) = ready.pop() {
            order.push(u);
            for v in self.successors(u) {
                in_degree[v] -= 1;
                if in_degree[v] == 0 {
                    ready.push(Reverse(v));
                }
            }
        }
        (order, in_degree)
    }

    /// Node ids in deterministic topological order.
    ///
    /// # Errors
    ///
    /// Returns [`StructuralViolation::Cycle`] naming the smallest node id left
    /// with a non-zero in-degree.
    pub fn topological_order(&self) -> Result<Vec<NodeId>> {
        let (order, residual) = self.kahn();
        if let Some(idx) = residual.iter().position(|&deg| deg != 0) {
            return Err(StructuralViolation::Cycle(self.idx_to_node[idx]).into());
        }
        Ok(order.into_iter().map(|idx| self.idx_to_node[idx]).collect())
    }

    /// Detect if the enabled graph contains any cycle.
    #[must_use]
    pub fn has_cycle(&self) -> bool {
        let (order, _) = self.kahn();
        order.len() != self.node_count()
    }

    /// Innovations of enabled edges inside the cyclic core of the graph.
    ///
    /// Nodes Kahn's algorithm could not release are peeled once more from the
    /// other side: nodes with no outgoing edge into the remainder only sit
    /// downstream of a cycle. Every edge left joins two nodes that each lie on
    /// or between cycles. Empty when the graph is acyclic.
    #[must_use]
    pub fn cyclic_edges(&self) -> Vec<InnovationId> {
        let (_, residual) = self.kahn();
        let mut alive: Vec<bool> = residual.iter().map(|&deg| deg != 0).collect();

        let mut out_degree = vec![0usize; self.node_count()];
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); self.node_count()];
        for u in (0..self.node_count()).filter(|&u| alive[u]) {
            for v in self.successors(u).filter(|&v| alive[v]) {
                out_degree[u] += 1;
                predecessors[v].push(u);
            }
        }

        let mut sinks: Vec<usize> = (0..self.node_count())
            .filter(|&u| alive[u] && out_degree[u] == 0)
            .collect();
        while let Some(v) = sinks.pop() {
            alive[v] = false;
            for &u in &predecessors[v] {
                if alive[u] {
                    out_degree[u] -= 1;
                    if out_degree[u] == 0 {
                        sinks.push(u);
                    }
                }
            }
        }

        let mut edges = Vec::new();
        for from in (0..self.node_count()).filter(|&u| alive[u]) {
            let start = self.fwd_offsets[from];
            let end = self.fwd_offsets[from + 1];
            for pos in start..end {
                if alive[self.fwd_targets[pos]] {
                    edges.push(self.fwd_innovations[pos]);
                }
            }
        }
        edges
    }
}
