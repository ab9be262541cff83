//! Task dependency graph and layered scheduler.
//!
//! Nodes are ordered into layers with Kahn's algorithm: every node in a layer
//! has all of its predecessors in earlier layers. Layers run one after
//! another; the nodes of a layer run concurrently on the rayon pool and the
//! whole layer finishes before the next one starts.

use rayon::prelude::*;

/// Errors in graph construction or ordering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("Duplicate task: {0}")]
    DuplicateNode(String),

    #[error("Task '{node}' depends on unknown task '{dependency}'")]
    UnknownDependency { node: String, dependency: String },

    #[error("Dependency cycle between: {}", .0.join(", "))]
    Cycle(Vec<String>),
}

#[derive(Debug)]
struct Node<T> {
    name: String,
    payload: T,
    after: Vec<String>,
}

/// A set of named nodes with "must precede" edges.
#[derive(Debug)]
pub struct TaskGraph<T> {
    nodes: Vec<Node<T>>,
}

impl<T> Default for TaskGraph<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<T> TaskGraph<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node that runs after every node named in `after`.
    pub fn add(&mut self, name: &str, payload: T, after: &[&str]) -> Result<(), GraphError> {
        if self.nodes.iter().any(|n| n.name == name) {
            return Err(GraphError::DuplicateNode(name.to_string()));
        }
        self.nodes.push(Node {
            name: name.to_string(),
            payload,
            after: after.iter().map(|s| s.to_string()).collect(),
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node names grouped into execution layers.
    pub fn layer_names(&self) -> Result<Vec<Vec<&str>>, GraphError> {
        Ok(self
            .layer_indices()?
            .into_iter()
            .map(|layer| layer.into_iter().map(|i| self.nodes[i].name.as_str()).collect())
            .collect())
    }

    /// Payloads grouped into execution layers, in insertion order within a layer.
    pub fn layers(&self) -> Result<Vec<Vec<&T>>, GraphError> {
        Ok(self
            .layer_indices()?
            .into_iter()
            .map(|layer| layer.into_iter().map(|i| &self.nodes[i].payload).collect())
            .collect())
    }

    fn layer_indices(&self) -> Result<Vec<Vec<usize>>, GraphError> {
        let index_of = |name: &str| self.nodes.iter().position(|n| n.name == name);

        let mut in_degree = vec![0usize; self.nodes.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.nodes.len()];

        for (i, node) in self.nodes.iter().enumerate() {
            for dep in &node.after {
                let Some(d) = index_of(dep) else {
                    return Err(GraphError::UnknownDependency {
                        node: node.name.clone(),
                        dependency: dep.clone(),
                    });
                };
                in_degree[i] += 1;
                dependents[d].push(i);
            }
        }

        let mut layers = Vec::new();
        let mut current: Vec<usize> = (0..self.nodes.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut processed = 0;

        while !current.is_empty() {
            processed += current.len();
            let mut next = Vec::new();
            for &i in &current {
                for &d in &dependents[i] {
                    in_degree[d] -= 1;
                    if in_degree[d] == 0 {
                        next.push(d);
                    }
                }
            }
            next.sort_unstable();
            layers.push(current);
            current = next;
        }

        if processed != self.nodes.len() {
            let stuck = (0..self.nodes.len())
                .filter(|&i| in_degree[i] > 0)
                .map(|i| self.nodes[i].name.clone())
                .collect();
            return Err(GraphError::Cycle(stuck));
        }

        Ok(layers)
    }
}

impl<T: Sync> TaskGraph<T> {
    /// Run `f` on every node, layer by layer.
    ///
    /// All nodes of a layer run to completion before the first error of that
    /// layer is returned.
    pub fn run<R, E, F>(&self, f: F) -> Result<Vec<R>, E>
    where
        F: Fn(&T) -> Result<R, E> + Sync,
        R: Send,
        E: Send + From<GraphError>,
    {
        let mut results = Vec::with_capacity(self.nodes.len());

        for layer in self.layers()? {
            let outcomes: Vec<Result<R, E>> = layer.par_iter().map(|payload| f(payload)).collect();
            for outcome in outcomes {
                results.push(outcome?);
            }
        }

        Ok(results)
    }
}
