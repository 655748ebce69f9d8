//! Dependency graph over registered activators.
//!
//! Nodes are indices in registration order; an edge `node -> dependency` means the
//! dependency must be initialized first.

use crate::error::ActivationError;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    names: Vec<&'static str>,
    dependencies: Vec<Vec<usize>>,
}

impl DependencyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node and returns its index.
    pub fn add_node(&mut self, name: &'static str) -> usize {
        self.names.push(name);
        self.dependencies.push(Vec::new());
        self.names.len() - 1
    }

    /// Declares that `node` depends on `dependency`. Returns `false` if the edge
    /// already exists or either index is unknown.
    pub fn add_dependency(&mut self, node: usize, dependency: usize) -> bool {
        if dependency >= self.names.len() {
            return false;
        }
        let Some(edges) = self.dependencies.get_mut(node) else {
            return false;
        };
        if edges.contains(&dependency) {
            return false;
        }
        edges.push(dependency);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    #[must_use]
    pub fn name(&self, node: usize) -> Option<&'static str> {
        self.names.get(node).copied()
    }

    #[must_use]
    pub fn dependencies(&self, node: usize) -> &[usize] {
        self.dependencies.get(node).map(Vec::as_slice).unwrap_or_default()
    }

    /// Finds a cycle with a three-color depth-first search, visiting nodes and edges
    /// in declaration order. The path starts and ends with the same node.
    #[must_use]
    pub fn find_cycle(&self) -> Option<Vec<&'static str>> {
        let mut colors = vec![Color::White; self.len()];
        (0..self.len()).find_map(|root| {
            if colors[root] == Color::White { self.visit(root, &mut colors) } else { None }
        })
    }

    /// Iterative walk from `root`; each frame holds a gray node and its next edge.
    fn visit(&self, root: usize, colors: &mut [Color]) -> Option<Vec<&'static str>> {
        let mut frames = vec![(root, 0)];
        colors[root] = Color::Gray;

        while let Some(frame) = frames.last_mut() {
            let (node, edge) = *frame;
            let Some(&dependency) = self.dependencies[node].get(edge) else {
                colors[node] = Color::Black;
                frames.pop();
                continue;
            };
            frame.1 += 1;

            match colors[dependency] {
                Color::Gray => {
                    let start = frames.iter().position(|&(n, _)| n == dependency).unwrap_or_default();
                    let mut path: Vec<_> = frames[start..].iter().map(|&(n, _)| self.names[n]).collect();
                    path.push(self.names[dependency]);
                    return Some(path);
                },
                Color::White => {
                    colors[dependency] = Color::Gray;
                    frames.push((dependency, 0));
                },
                Color::Black => {},
            }
        }
        None
    }

    /// Orders nodes so every dependency comes before its dependents. Among nodes that
    /// are ready at the same time the earliest registered goes first.
    ///
    /// # Errors
    /// [`ActivationError::DependencyCycle`] with the full cycle path.
    pub fn topological_order(&self) -> Result<Vec<usize>, ActivationError> {
        if let Some(path) = self.find_cycle() {
            return Err(ActivationError::DependencyCycle { path, context: None });
        }

        let mut waiting: Vec<usize> = self.dependencies.iter().map(Vec::len).collect();
        let mut dependents = vec![Vec::new(); self.len()];
        for (node, edges) in self.dependencies.iter().enumerate() {
            for &dependency in edges {
                dependents[dependency].push(node);
            }
        }

        let mut ready: BTreeSet<usize> = (0..self.len()).filter(|&node| waiting[node] == 0).collect();
        let mut order = Vec::with_capacity(self.len());

        while let Some(node) = ready.pop_first() {
            order.push(node);
            for &dependent in &dependents[node] {
                waiting[dependent] -= 1;
                if waiting[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        Ok(order)
    }
}
