//! Dependency graph between configuration variables.
//!
//! This module provides the graph data structure and algorithms the resolver needs:
//! cycle detection with a concrete cycle path, topological ordering, and transitive
//! closure queries in both directions (what a variable reads, what reads it).
//!
//! An edge `from → to` means `from` reads `to`, so `to` must be resolved first.

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::core::{GenError, GenResult};

/// Color states for cycle detection using DFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Node has not been visited.
    White,
    /// Node is currently being visited (in the DFS stack).
    Gray,
    /// Node has been fully visited.
    Black,
}

/// Dependency graph over variable names.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// The underlying directed graph.
    graph: DiGraph<String, ()>,
    /// Map from variable names to their graph indices.
    node_map: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    /// Add a node to the graph if it doesn't already exist.
    ///
    /// Returns the node index in the graph.
    pub fn add_node(&mut self, name: &str) -> NodeIndex {
        if let Some(&index) = self.node_map.get(name) {
            index
        } else {
            let index = self.graph.add_node(name.to_string());
            self.node_map.insert(name.to_string(), index);
            index
        }
    }

    /// Record that `from` reads `to`.
    pub fn add_dependency(&mut self, from: &str, to: &str) {
        let from_idx = self.add_node(from);
        let to_idx = self.add_node(to);

        if !self.graph.contains_edge(from_idx, to_idx) {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    /// True when `name` is a node.
    pub fn contains(&self, name: &str) -> bool {
        self.node_map.contains_key(name)
    }

    /// Detect cycles in the dependency graph using DFS with colors.
    ///
    /// Returns [`GenError::CircularDependency`] naming the nodes of the first cycle found.
    pub fn detect_cycles(&self) -> GenResult<()> {
        match self.find_cycle_within(None) {
            Some(cycle) => {
                let mut unresolved: Vec<String> = cycle.iter().skip(1).cloned().collect();
                unresolved.sort();
                Err(GenError::CircularDependency {
                    unresolved,
                    cycle,
                })
            }
            None => Ok(()),
        }
    }

    /// A cycle among `names` only, first node repeated at the end.
    ///
    /// Edges leaving the subset are ignored, so a stalled evaluation can ask for a
    /// cycle among the variables it could not resolve.
    pub fn find_cycle_among(&self, names: &BTreeSet<String>) -> Option<Vec<String>> {
        self.find_cycle_within(Some(names))
    }

    fn find_cycle_within(&self, subset: Option<&BTreeSet<String>>) -> Option<Vec<String>> {
        let in_subset = |idx: NodeIndex| subset.is_none_or(|s| s.contains(&self.graph[idx]));

        let mut colors: HashMap<NodeIndex, Color> =
            self.graph.node_indices().map(|idx| (idx, Color::White)).collect();
        let mut path: Vec<NodeIndex> = Vec::new();

        for node in self.sorted_indices() {
            if in_subset(node)
                && matches!(colors.get(&node), Some(Color::White))
                && let Some(cycle) = self.dfs_visit(node, &mut colors, &mut path, &in_subset)
            {
                return Some(cycle.into_iter().map(|idx| self.graph[idx].clone()).collect());
            }
        }
        None
    }

    /// DFS visit for cycle detection.
    ///
    /// Returns `Some(cycle_path)` if a cycle is detected, None otherwise.
    fn dfs_visit(
        &self,
        node: NodeIndex,
        colors: &mut HashMap<NodeIndex, Color>,
        path: &mut Vec<NodeIndex>,
        in_subset: &dyn Fn(NodeIndex) -> bool,
    ) -> Option<Vec<NodeIndex>> {
        colors.insert(node, Color::Gray);
        path.push(node);

        for neighbor in self.sorted_neighbors(node, Direction::Outgoing) {
            if !in_subset(neighbor) {
                continue;
            }
            match colors.get(&neighbor) {
                Some(Color::Gray) => {
                    if let Some(start) = path.iter().position(|n| *n == neighbor) {
                        let mut cycle = path[start..].to_vec();
                        cycle.push(neighbor);
                        return Some(cycle);
                    }
                }
                Some(Color::White) => {
                    if let Some(cycle) = self.dfs_visit(neighbor, colors, path, in_subset) {
                        return Some(cycle);
                    }
                }
                _ => {}
            }
        }

        path.pop();
        colors.insert(node, Color::Black);
        None
    }

    /// Get the topological order for evaluation.
    ///
    /// Returns names in an order where all dependencies come before their dependents.
    pub fn topological_order(&self) -> GenResult<Vec<String>> {
        self.detect_cycles()?;

        match toposort(&self.graph, None) {
            Ok(indices) => Ok(indices.into_iter().rev().map(|idx| self.graph[idx].clone()).collect()),
            Err(cycle) => Err(GenError::Internal {
                message: format!(
                    "topological sort found a cycle through '{}' after cycle detection passed",
                    self.graph[cycle.node_id()]
                ),
            }),
        }
    }

    /// Every variable `name` reads, directly or indirectly.
    pub fn transitive_deps(&self, name: &str) -> BTreeSet<String> {
        self.reachable(name, Direction::Outgoing)
    }

    fn reachable(&self, name: &str, direction: Direction) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();

        if let Some(&start) = self.node_map.get(name) {
            queue.push_back(start);
            seen.insert(start);

            while let Some(current) = queue.pop_front() {
                for neighbor in self.graph.neighbors_directed(current, direction) {
                    if seen.insert(neighbor) {
                        found.insert(self.graph[neighbor].clone());
                        queue.push_back(neighbor);
                    }
                }
            }
        }

        found
    }

    /// Direct dependencies of `name`, sorted by name.
    pub fn direct_deps(&self, name: &str) -> Vec<String> {
        match self.node_map.get(name) {
            Some(&idx) => self
                .sorted_neighbors(idx, Direction::Outgoing)
                .into_iter()
                .map(|n| self.graph[n].clone())
                .collect(),
            None => Vec::new(),
        }
    }

    fn sorted_indices(&self) -> Vec<NodeIndex> {
        let mut indices: Vec<NodeIndex> = self.graph.node_indices().collect();
        indices.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
        indices
    }

    fn sorted_neighbors(&self, node: NodeIndex, direction: Direction) -> Vec<NodeIndex> {
        let mut neighbors: Vec<NodeIndex> = self.graph.neighbors_directed(node, direction).collect();
        neighbors.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
        neighbors
    }

    /// Build a human-readable dependency tree representation.
    ///
    /// Returns a string showing what `root` reads, recursively.
    pub fn to_tree_string(&self, root: &str) -> String {
        let mut result = String::new();
        let mut visited = HashSet::new();
        self.build_tree_string(root, &mut result, "", true, &mut visited);
        result
    }

    fn build_tree_string(
        &self,
        node: &str,
        result: &mut String,
        prefix: &str,
        is_last: bool,
        visited: &mut HashSet<String>,
    ) {
        let connector = if is_last {
            "└── "
        } else {
            "├── "
        };
        result.push_str(&format!("{}{}{}\n", prefix, connector, node));

        let child_prefix = if is_last {
            format!("{prefix}    ")
        } else {
            format!("{prefix}│   ")
        };

        let deps = self.direct_deps(node);
        if !visited.insert(node.to_string()) {
            if !deps.is_empty() {
                result.push_str(&format!("{child_prefix}└── (already shown)\n"));
            }
            return;
        }

        for (i, dep) in deps.iter().enumerate() {
            let is_last_child = i == deps.len() - 1;
            self.build_tree_string(dep, result, &child_prefix, is_last_child, visited);
        }
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}
