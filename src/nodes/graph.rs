//! Arena graph of shader nodes reachable from one root.

use crate::error::{ExportError, Result};
use crate::scene::{Param, ShaderNode};
use fixedbitset::FixedBitSet;
use std::collections::{HashMap, VecDeque};

/// A link from one node parameter to another node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// Parameter holding the link.
    pub param: String,
    pub target_name: String,
    /// Arena index of the target, `None` if the scene has no such node.
    pub target: Option<usize>,
}

/// Shader nodes reachable from a root, with index-based edges.
#[derive(Debug, Clone)]
pub struct EntityGraph {
    nodes: Vec<ShaderNode>,
    edges: Vec<Vec<Edge>>,
    index: HashMap<String, usize>,
}

impl EntityGraph {
    /// Collect every node reachable from `root` breadth-first.
    ///
    /// Returns `None` when the root itself cannot be found.
    pub fn build<F>(root: &str, mut lookup: F) -> Option<Self>
    where
        F: FnMut(&str) -> Option<ShaderNode>,
    {
        let root_node = lookup(root)?;
        let mut graph = Self {
            nodes: vec![root_node],
            edges: vec![Vec::new()],
            index: HashMap::from([(root.to_string(), 0)]),
        };

        let mut queue = VecDeque::from([0usize]);
        while let Some(current) = queue.pop_front() {
            let links: Vec<(String, String)> = graph.nodes[current]
                .params
                .iter()
                .filter_map(|(param, value)| match value {
                    Param::Link(link) => Some((param.clone(), link.link.clone())),
                    _ => None,
                })
                .collect();

            for (param, target_name) in links {
                let target = match graph.index.get(&target_name) {
                    Some(&i) => Some(i),
                    None => lookup(&target_name).map(|node| {
                        let i = graph.nodes.len();
                        graph.nodes.push(node);
                        graph.edges.push(Vec::new());
                        graph.index.insert(target_name.clone(), i);
                        queue.push_back(i);
                        i
                    }),
                };
                graph.edges[current].push(Edge {
                    param,
                    target_name,
                    target,
                });
            }
        }

        Some(graph)
    }

    pub fn root(&self) -> usize {
        0
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, index: usize) -> &ShaderNode {
        &self.nodes[index]
    }

    pub fn edges(&self, index: usize) -> &[Edge] {
        &self.edges[index]
    }

    /// Dependencies-first order of the nodes reachable from `start`.
    ///
    /// Uses an explicit stack instead of recursion. A node reached again while
    /// it is still on the stack is a cycle and fails with `CyclicReference`.
    pub fn post_order(&self, start: usize) -> Result<Vec<usize>> {
        let mut visited = FixedBitSet::with_capacity(self.nodes.len());
        let mut finished = FixedBitSet::with_capacity(self.nodes.len());
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        visited.insert(start);

        while let Some(top) = stack.len().checked_sub(1) {
            let (node, next_edge) = stack[top];
            match self.edges[node].get(next_edge) {
                Some(edge) => {
                    stack[top].1 += 1;
                    let Some(target) = edge.target else {
                        continue;
                    };
                    if finished.contains(target) {
                        continue;
                    }
                    if visited.contains(target) {
                        let path: Vec<&str> = stack
                            .iter()
                            .map(|(i, _)| self.nodes[*i].name.as_str())
                            .chain(std::iter::once(self.nodes[target].name.as_str()))
                            .collect();
                        return Err(ExportError::CyclicReference(path.join(" -> ")));
                    }
                    visited.insert(target);
                    stack.push((target, 0));
                }
                None => {
                    finished.insert(node);
                    order.push(node);
                    stack.pop();
                }
            }
        }

        Ok(order)
    }
}
