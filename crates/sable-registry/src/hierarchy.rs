//! Inheritance graph.
//!
//! Uses `petgraph::DiGraph` with:
//! - Nodes: type hashes
//! - Edges: `Extends` from a type to its base class, `Implements` to each interface

use petgraph::Direction;
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use rustc_hash::FxHashMap;
use sable_core::TypeHash;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Extends,
    Implements,
}

#[derive(Debug, Default, Clone)]
pub struct Hierarchy {
    graph: DiGraph<TypeHash, Relation>,
    nodes: FxHashMap<TypeHash, NodeIndex>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, hash: TypeHash) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(&hash) {
            return idx;
        }
        let idx = self.graph.add_node(hash);
        self.nodes.insert(hash, idx);
        idx
    }

    pub fn add(&mut self, derived: TypeHash, base: TypeHash, relation: Relation) {
        let from = self.node(derived);
        let to = self.node(base);
        self.graph.update_edge(from, to, relation);
    }

    /// Whether `base` is reachable from `derived` through one or more edges.
    pub fn is_subtype_of(&self, derived: TypeHash, base: TypeHash) -> bool {
        if derived == base {
            return false;
        }
        match (self.nodes.get(&derived), self.nodes.get(&base)) {
            (Some(&from), Some(&to)) => has_path_connecting(&self.graph, from, to, None),
            _ => false,
        }
    }

    /// Direct supertypes of `hash` with the kind of each edge.
    pub fn supertypes(&self, hash: TypeHash) -> Vec<(TypeHash, Relation)> {
        let Some(&idx) = self.nodes.get(&hash) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|edge| (self.graph[edge.target()], *edge.weight()))
            .collect()
    }
}
