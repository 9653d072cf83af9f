//! Dependency graphs and cycle detection.
//!
//! Nodes are small integer indices into an arena; adjacency is a list of
//! indices per node. A graph is built transiently for one validation call and
//! then dropped.

use std::collections::{HashMap, HashSet};

/// Visit state for the three-colour depth-first search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Directed graph over string identifiers.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    ids: Vec<String>,
    index: HashMap<String, usize>,
    edges: Vec<Vec<usize>>,
}

impl DependencyGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its index. Adding an existing id returns the
    /// existing index.
    pub fn add_node(&mut self, id: impl Into<String>) -> usize {
        let id = id.into();
        if let Some(&existing) = self.index.get(&id) {
            return existing;
        }
        let idx = self.ids.len();
        self.index.insert(id.clone(), idx);
        self.ids.push(id);
        self.edges.push(Vec::new());
        idx
    }

    /// Add an edge `from -> to` ("from depends on to"). Duplicate edges are
    /// ignored.
    pub fn add_edge(&mut self, from: usize, to: usize) {
        if let Some(targets) = self.edges.get_mut(from) {
            if to < self.ids.len() && !targets.contains(&to) {
                targets.push(to);
            }
        }
    }

    /// Index of a node id.
    pub fn lookup(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Id of a node index.
    pub fn node_id(&self, idx: usize) -> Option<&str> {
        self.ids.get(idx).map(String::as_str)
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    /// Outgoing edges of a node.
    pub fn dependencies(&self, idx: usize) -> &[usize] {
        self.edges.get(idx).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Find cycles with an iterative three-colour depth-first search.
    ///
    /// Roots are tried in insertion order and edges in insertion order, so the
    /// result is deterministic. Each cycle lists its members in traversal
    /// order, starting at the node the back edge points to. A set of members is
    /// reported once even if reachable through several back edges.
    pub fn find_cycles(&self) -> Vec<Vec<usize>> {
        let mut marks = vec![Mark::Unvisited; self.ids.len()];
        let mut cycles = Vec::new();
        let mut seen: HashSet<Vec<usize>> = HashSet::new();

        for root in 0..self.ids.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }

            // (node, position of the next edge to follow)
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
            marks[root] = Mark::InProgress;

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                let Some(&target) = self.edges[node].get(frame.1) else {
                    marks[node] = Mark::Done;
                    stack.pop();
                    continue;
                };
                frame.1 += 1;

                match marks[target] {
                    Mark::Unvisited => {
                        marks[target] = Mark::InProgress;
                        stack.push((target, 0));
                    }
                    Mark::InProgress => {
                        let start = stack
                            .iter()
                            .position(|&(n, _)| n == target)
                            .unwrap_or(0);
                        let cycle: Vec<usize> = stack[start..].iter().map(|&(n, _)| n).collect();
                        let mut key = cycle.clone();
                        key.sort_unstable();
                        if seen.insert(key) {
                            cycles.push(cycle);
                        }
                    }
                    Mark::Done => {}
                }
            }
        }

        cycles
    }

    /// Whether the graph has at least one cycle.
    pub fn has_cycle(&self) -> bool {
        !self.find_cycles().is_empty()
    }

    /// Render a cycle as `a -> b -> c -> a`.
    pub fn describe_cycle(&self, cycle: &[usize]) -> String {
        let mut names: Vec<&str> = cycle.iter().filter_map(|&i| self.node_id(i)).collect();
        if let Some(&first) = names.first() {
            names.push(first);
        }
        names.join(" -> ")
    }
}
