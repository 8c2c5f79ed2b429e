//! Resource dependency graph
//!
//! Edges point from a dependency to its dependent, so a topological order
//! is a valid creation order. The graph is kept acyclic as edges are added.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use stackplan_model::{ConfigError, ResourceId, ResourceKind};

#[derive(Debug, Clone, PartialEq, Eq)]
struct ResourceNode {
    id: ResourceId,
    kind: ResourceKind,
}

/// Directed acyclic graph of planned resources
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    graph: DiGraph<ResourceNode, ()>,
    index: HashMap<ResourceId, NodeIndex>,
}

impl ResourceGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.index.contains_key(id)
    }

    /// Id of an existing resource, derived ids included
    pub fn lookup(&self, raw: &str) -> Option<&ResourceId> {
        self.index.get_key_value(raw).map(|(id, _)| id)
    }

    pub fn kind(&self, id: &ResourceId) -> Option<ResourceKind> {
        self.index.get(id).map(|ix| self.graph[*ix].kind)
    }

    /// Add a resource node
    ///
    /// # Errors
    /// [`ConfigError::DuplicateResourceId`] if the id is already taken by
    /// any resource, whatever its kind.
    pub fn add_resource(&mut self, id: ResourceId, kind: ResourceKind) -> Result<(), ConfigError> {
        if self.index.contains_key(&id) {
            return Err(ConfigError::DuplicateResourceId { id });
        }
        let ix = self.graph.add_node(ResourceNode {
            id: id.clone(),
            kind,
        });
        self.index.insert(id, ix);
        Ok(())
    }

    /// Record that `dependent` must be created after `dependency`
    ///
    /// Adding an existing edge again is a no-op.
    ///
    /// # Errors
    /// - [`ConfigError::UnknownReference`] if either end is not a resource
    /// - [`ConfigError::CycleDetected`] if the edge is a self edge or
    ///   closes a cycle; the graph is left unchanged
    pub fn add_edge(&mut self, dependency: &ResourceId, dependent: &ResourceId) -> Result<(), ConfigError> {
        let from = self.node_index(dependent, dependency)?;
        let to = self.node_index(dependency, dependent)?;

        if from == to {
            return Err(ConfigError::CycleDetected {
                path: vec![dependency.clone()],
            });
        }
        if self.graph.contains_edge(from, to) {
            return Ok(());
        }

        let edge = self.graph.add_edge(from, to, ());
        if let Some(path) = self.cycle() {
            self.graph.remove_edge(edge);
            return Err(ConfigError::CycleDetected { path });
        }
        Ok(())
    }

    fn node_index(&self, from: &ResourceId, to: &ResourceId) -> Result<NodeIndex, ConfigError> {
        self.index
            .get(to)
            .copied()
            .ok_or_else(|| ConfigError::UnknownReference {
                from: from.to_string(),
                to: to.to_string(),
            })
    }

    /// Members of some cycle, sorted, if the graph has one
    fn cycle(&self) -> Option<Vec<ResourceId>> {
        tarjan_scc(&self.graph)
            .into_iter()
            .find(|component| component.len() > 1)
            .map(|component| {
                let mut path: Vec<ResourceId> = component
                    .into_iter()
                    .map(|ix| self.graph[ix].id.clone())
                    .collect();
                path.sort();
                path
            })
    }

    /// Direct dependencies of `id`, sorted
    pub fn dependencies(&self, id: &ResourceId) -> Vec<ResourceId> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Direct dependents of `id`, sorted
    pub fn dependents(&self, id: &ResourceId) -> Vec<ResourceId> {
        self.neighbors(id, Direction::Outgoing)
    }

    fn neighbors(&self, id: &ResourceId, direction: Direction) -> Vec<ResourceId> {
        let Some(ix) = self.index.get(id) else {
            return Vec::new();
        };
        let mut ids: Vec<ResourceId> = self
            .graph
            .neighbors_directed(*ix, direction)
            .map(|n| self.graph[n].id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// All edges as `(dependency, dependent)`, sorted
    pub fn edges(&self) -> Vec<(ResourceId, ResourceId)> {
        let mut edges: Vec<_> = self
            .graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(a, b)| (self.graph[a].id.clone(), self.graph[b].id.clone()))
            .collect();
        edges.sort();
        edges
    }

    /// Deterministic creation order
    ///
    /// Kahn's algorithm; among resources that are ready at the same time
    /// the lower [`ResourceKind::creation_rank`] goes first, then the lower
    /// id. The result does not depend on insertion order.
    ///
    /// # Errors
    /// [`ConfigError::CycleDetected`] if the graph is not acyclic.
    pub fn creation_order(&self) -> Result<Vec<ResourceId>, ConfigError> {
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|ix| self.graph.neighbors_directed(ix, Direction::Incoming).count())
            .collect();

        let mut ready = BinaryHeap::new();
        for ix in self.graph.node_indices() {
            if in_degree[ix.index()] == 0 {
                ready.push(self.ready_key(ix));
            }
        }

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse((_, id, ix))) = ready.pop() {
            order.push(id);
            for next in self.graph.neighbors_directed(ix, Direction::Outgoing) {
                let degree = &mut in_degree[next.index()];
                *degree -= 1;
                if *degree == 0 {
                    ready.push(self.ready_key(next));
                }
            }
        }

        if order.len() != self.graph.node_count() {
            return Err(ConfigError::CycleDetected {
                path: self.cycle().unwrap_or_default(),
            });
        }
        Ok(order)
    }

    fn ready_key(&self, ix: NodeIndex) -> Reverse<(u8, ResourceId, NodeIndex)> {
        let node = &self.graph[ix];
        Reverse((node.kind.creation_rank(), node.id.clone(), ix))
    }
}
