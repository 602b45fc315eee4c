//! Execution topology selection over a task dependency DAG: parallel,
//! hierarchical, sequential, or hybrid, plus a Kahn's-algorithm execution
//! order that groups ready nodes into parallel batches.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    Parallel,
    Hierarchical,
    Sequential,
    Hybrid,
}

impl Topology {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parallel => "parallel",
            Self::Hierarchical => "hierarchical",
            Self::Sequential => "sequential",
            Self::Hybrid => "hybrid",
        }
    }
}

/// A task dependency graph: node ids, directed `(from, to)` edges, and an
/// optional per-node complexity used only for hierarchical detection.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    pub nodes: Vec<String>,
    pub edges: Vec<(String, String)>,
    pub complexities: HashMap<String, f64>,
}

impl TaskGraph {
    pub fn new(nodes: Vec<String>, edges: Vec<(String, String)>) -> Self {
        Self { nodes, edges, complexities: HashMap::new() }
    }

    pub fn with_complexities(mut self, complexities: HashMap<String, f64>) -> Self {
        self.complexities = complexities;
        self
    }
}

/// One level of the execution order: a single node, or a parallel batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionLevel {
    Node(String),
    Parallel(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct TopologyResult {
    pub topology: Topology,
    pub execution_order: Vec<ExecutionLevel>,
}

fn has_high_complexity_node(graph: &TaskGraph) -> bool {
    graph.complexities.values().any(|&c| c > 0.9)
}

/// A single linear chain of `n` nodes has exactly `n - 1` edges and every
/// node has in-degree and out-degree at most 1.
fn is_linear_chain(graph: &TaskGraph) -> bool {
    if graph.edges.is_empty() {
        return false;
    }
    if graph.edges.len() != graph.nodes.len().saturating_sub(1) {
        return false;
    }

    let mut in_degree: HashMap<&str, u32> = graph.nodes.iter().map(|n| (n.as_str(), 0)).collect();
    let mut out_degree: HashMap<&str, u32> = graph.nodes.iter().map(|n| (n.as_str(), 0)).collect();

    for (from, to) in &graph.edges {
        *out_degree.entry(from.as_str()).or_insert(0) += 1;
        *in_degree.entry(to.as_str()).or_insert(0) += 1;
    }

    graph.nodes.iter().all(|n| in_degree[n.as_str()] <= 1 && out_degree[n.as_str()] <= 1)
}

/// Kahn's algorithm: repeatedly peel off the set of zero-in-degree nodes as
/// one level. A level with a single node stays a bare node; two or more
/// become a parallel batch.
fn topological_sort(graph: &TaskGraph) -> Vec<ExecutionLevel> {
    let mut in_degree: HashMap<&str, u32> = graph.nodes.iter().map(|n| (n.as_str(), 0)).collect();
    let mut children: HashMap<&str, Vec<&str>> = graph.nodes.iter().map(|n| (n.as_str(), Vec::new())).collect();

    for (from, to) in &graph.edges {
        children.entry(from.as_str()).or_default().push(to.as_str());
        *in_degree.entry(to.as_str()).or_insert(0) += 1;
    }

    let mut queue: Vec<&str> =
        graph.nodes.iter().map(String::as_str).filter(|n| in_degree[n] == 0).collect();
    let mut order = Vec::new();

    while !queue.is_empty() {
        if queue.len() == 1 {
            order.push(ExecutionLevel::Node(queue[0].to_string()));
        } else {
            order.push(ExecutionLevel::Parallel(queue.iter().map(|s| (*s).to_string()).collect()));
        }

        let mut next_queue = Vec::new();
        for node in &queue {
            for &child in &children[node] {
                let entry = in_degree.get_mut(child).expect("child present in in_degree map");
                *entry -= 1;
                if *entry == 0 {
                    next_queue.push(child);
                }
            }
        }
        queue = next_queue;
    }

    order
}

/// Select the topology for a task graph and derive its execution order.
///
/// Precedence: no edges → parallel; any node with complexity > 0.9 →
/// hierarchical (checked before the linear-chain test, since a two-node
/// high-complexity chain would otherwise read as sequential); single linear
/// chain → sequential; otherwise hybrid.
pub fn select(graph: &TaskGraph) -> TopologyResult {
    if graph.edges.is_empty() {
        return TopologyResult {
            topology: Topology::Parallel,
            execution_order: vec![ExecutionLevel::Parallel(graph.nodes.clone())],
        };
    }

    if has_high_complexity_node(graph) {
        return TopologyResult { topology: Topology::Hierarchical, execution_order: topological_sort(graph) };
    }

    if is_linear_chain(graph) {
        return TopologyResult { topology: Topology::Sequential, execution_order: topological_sort(graph) };
    }

    TopologyResult { topology: Topology::Hybrid, execution_order: topological_sort(graph) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(n: usize) -> TaskGraph {
        let nodes: Vec<String> = (0..n).map(|i| format!("t{i}")).collect();
        let edges: Vec<(String, String)> =
            (0..n - 1).map(|i| (format!("t{i}"), format!("t{}", i + 1))).collect();
        TaskGraph::new(nodes, edges)
    }

    #[test]
    fn no_edges_is_parallel() {
        let graph = TaskGraph::new(vec!["a".into(), "b".into(), "c".into()], vec![]);
        let result = select(&graph);
        assert_eq!(result.topology, Topology::Parallel);
        assert_eq!(result.execution_order.len(), 1);
    }

    #[test]
    fn linear_chain_is_sequential() {
        let graph = chain(4);
        let result = select(&graph);
        assert_eq!(result.topology, Topology::Sequential);
        assert_eq!(result.execution_order.len(), 4);
    }

    #[test]
    fn high_complexity_node_forces_hierarchical_even_if_chain_shaped() {
        let mut graph = chain(3);
        let mut complexities = HashMap::new();
        complexities.insert("t1".to_string(), 0.95);
        graph.complexities = complexities;
        let result = select(&graph);
        assert_eq!(result.topology, Topology::Hierarchical);
    }

    #[test]
    fn diamond_shape_is_hybrid() {
        let graph = TaskGraph::new(
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            vec![
                ("a".into(), "b".into()),
                ("a".into(), "c".into()),
                ("b".into(), "d".into()),
                ("c".into(), "d".into()),
            ],
        );
        let result = select(&graph);
        assert_eq!(result.topology, Topology::Hybrid);
        assert_eq!(result.execution_order[0], ExecutionLevel::Node("a".to_string()));
        assert_eq!(
            result.execution_order[1],
            ExecutionLevel::Parallel(vec!["b".to_string(), "c".to_string()])
        );
        assert_eq!(result.execution_order[2], ExecutionLevel::Node("d".to_string()));
    }

    #[test]
    fn empty_graph_is_parallel_with_empty_batch() {
        let graph = TaskGraph::new(vec![], vec![]);
        let result = select(&graph);
        assert_eq!(result.topology, Topology::Parallel);
    }
}
