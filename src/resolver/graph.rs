//! Small directed graph over task names.
//!
//! Edges point from a dependency to its dependent. Node order is insertion
//! order and is used as the tie-break everywhere an order is produced.
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use indexmap::IndexMap;

#[derive(Debug, Default, Clone)]
struct Node {
    predecessors: Vec<usize>,
    successors: Vec<usize>,
}

/// Directed graph with insertion-ordered nodes.
#[derive(Debug, Default, Clone)]
pub struct Dag {
    nodes: IndexMap<String, Node>,
}

impl Dag {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `name` if it is not present yet and return its index.
    pub fn add_node(&mut self, name: &str) -> usize {
        if let Some(index) = self.nodes.get_index_of(name) {
            return index;
        }
        self.nodes.insert_full(name.to_string(), Node::default()).0
    }

    /// Add the edge `from → to`, creating missing nodes.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        let from = self.add_node(from);
        let to = self.add_node(to);
        if let Some((_, node)) = self.nodes.get_index_mut(from)
            && !node.successors.contains(&to)
        {
            node.successors.push(to);
        }
        if let Some((_, node)) = self.nodes.get_index_mut(to)
            && !node.predecessors.contains(&from)
        {
            node.predecessors.push(from);
        }
    }

    /// Whether `name` is a node.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn name(&self, index: usize) -> &str {
        self.nodes
            .get_index(index)
            .map_or("", |(name, _)| name.as_str())
    }

    fn successors_of(&self, index: usize) -> &[usize] {
        self.nodes
            .get_index(index)
            .map_or(&[], |(_, node)| node.successors.as_slice())
    }

    fn predecessors_of(&self, index: usize) -> &[usize] {
        self.nodes
            .get_index(index)
            .map_or(&[], |(_, node)| node.predecessors.as_slice())
    }

    /// Direct predecessors (dependencies) of `name`, in edge insertion order.
    #[must_use]
    pub fn predecessors(&self, name: &str) -> Vec<&str> {
        self.nodes
            .get_index_of(name)
            .map(|i| {
                self.predecessors_of(i)
                    .iter()
                    .map(|&p| self.name(p))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every node from which `name` is reachable, in insertion order.
    #[must_use]
    pub fn ancestors(&self, name: &str) -> Vec<&str> {
        let Some(start) = self.nodes.get_index_of(name) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for &pred in self.predecessors_of(current) {
                if pred != start && seen.insert(pred) {
                    queue.push_back(pred);
                }
            }
        }
        let mut found: Vec<usize> = seen.into_iter().collect();
        found.sort_unstable();
        found.into_iter().map(|i| self.name(i)).collect()
    }

    /// Topological order (Kahn), choosing the earliest-inserted ready node
    /// first.
    ///
    /// # Errors
    ///
    /// Returns the graph's cycles, as reported by [`Dag::cycles`], if it is
    /// not acyclic.
    pub fn topological_order(&self) -> Result<Vec<&str>, Vec<Vec<String>>> {
        let mut in_degree: Vec<usize> = self
            .nodes
            .values()
            .map(|node| node.predecessors.len())
            .collect();
        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, &d)| d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();
        let mut order = Vec::with_capacity(self.len());
        while let Some(Reverse(current)) = ready.pop() {
            order.push(self.name(current));
            for &succ in self.successors_of(current) {
                if let Some(degree) = in_degree.get_mut(succ) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse(succ));
                    }
                }
            }
        }
        if order.len() == self.len() {
            Ok(order)
        } else {
            Err(self.cycles())
        }
    }

    /// One simple cycle per strongly connected component that contains a
    /// cycle, each starting at its earliest-inserted member. Components are
    /// ordered by that member.
    #[must_use]
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut tarjan = Tarjan::new(self);
        for v in 0..self.len() {
            if !tarjan.index.contains_key(&v) {
                tarjan.visit(v);
            }
        }
        let mut components: Vec<Vec<usize>> = tarjan
            .components
            .into_iter()
            .filter(|c| c.len() > 1 || c.first().is_some_and(|&v| self.successors_of(v).contains(&v)))
            .map(|mut c| {
                c.sort_unstable();
                c
            })
            .collect();
        components.sort_unstable_by_key(|c| c.first().copied());
        components
            .iter()
            .map(|c| {
                self.cycle_within(c)
                    .into_iter()
                    .map(|i| self.name(i).to_string())
                    .collect()
            })
            .collect()
    }

    /// Shortest cycle through the first member of a strongly connected
    /// component, staying inside the component.
    fn cycle_within(&self, component: &[usize]) -> Vec<usize> {
        let Some(&start) = component.first() else {
            return Vec::new();
        };
        let members: HashSet<usize> = component.iter().copied().collect();
        let mut parent: HashMap<usize, usize> = HashMap::new();
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for &succ in self.successors_of(current) {
                if succ == start {
                    let mut path = vec![current];
                    let mut node = current;
                    while let Some(&p) = parent.get(&node) {
                        path.push(p);
                        node = p;
                    }
                    path.reverse();
                    return path;
                }
                if members.contains(&succ) && !parent.contains_key(&succ) {
                    parent.insert(succ, current);
                    queue.push_back(succ);
                }
            }
        }
        component.to_vec()
    }
}

/// Tarjan's strongly connected components.
struct Tarjan<'a> {
    dag: &'a Dag,
    counter: usize,
    index: HashMap<usize, usize>,
    lowlink: HashMap<usize, usize>,
    stack: Vec<usize>,
    on_stack: HashSet<usize>,
    components: Vec<Vec<usize>>,
}

impl<'a> Tarjan<'a> {
    fn new(dag: &'a Dag) -> Self {
        Self {
            dag,
            counter: 0,
            index: HashMap::new(),
            lowlink: HashMap::new(),
            stack: Vec::new(),
            on_stack: HashSet::new(),
            components: Vec::new(),
        }
    }

    fn low(&self, v: usize) -> usize {
        self.lowlink.get(&v).copied().unwrap_or(usize::MAX)
    }

    fn visit(&mut self, v: usize) {
        self.index.insert(v, self.counter);
        self.lowlink.insert(v, self.counter);
        self.counter += 1;
        self.stack.push(v);
        self.on_stack.insert(v);

        let dag = self.dag;
        for &w in dag.successors_of(v) {
            if !self.index.contains_key(&w) {
                self.visit(w);
                let low = self.low(v).min(self.low(w));
                self.lowlink.insert(v, low);
            } else if self.on_stack.contains(&w) {
                let w_index = self.index.get(&w).copied().unwrap_or(usize::MAX);
                let low = self.low(v).min(w_index);
                self.lowlink.insert(v, low);
            }
        }

        if self.index.get(&v) == self.lowlink.get(&v) {
            let mut component = Vec::new();
            while let Some(w) = self.stack.pop() {
                self.on_stack.remove(&w);
                component.push(w);
                if w == v {
                    break;
                }
            }
            self.components.push(component);
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &str)], nodes: &[&str]) -> Dag {
        let mut dag = Dag::new();
        for node in nodes {
            dag.add_node(node);
        }
        for (from, to) in edges {
            dag.add_edge(from, to);
        }
        dag
    }

    #[test]
    fn empty_graph() {
        let dag = Dag::new();
        assert!(dag.is_empty());
        assert!(dag.topological_order().unwrap().is_empty());
        assert!(dag.cycles().is_empty());
    }

    #[test]
    fn topological_order_respects_edges() {
        let dag = graph(&[("a", "b"), ("b", "c")], &["c", "b", "a"]);
        assert_eq!(dag.topological_order().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn topological_order_breaks_ties_by_insertion() {
        let dag = graph(&[("base", "z"), ("base", "y")], &["x", "base", "z", "y"]);
        assert_eq!(
            dag.topological_order().unwrap(),
            vec!["x", "base", "z", "y"]
        );
    }

    #[test]
    fn diamond_orders_join_last() {
        let dag = graph(
            &[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")],
            &["a", "b", "c", "d"],
        );
        assert_eq!(
            dag.topological_order().unwrap(),
            vec!["a", "b", "c", "d"]
        );
    }

    #[test]
    fn cycle_is_reported_as_path() {
        let dag = graph(&[("a", "b"), ("b", "c"), ("c", "a"), ("c", "d")], &[]);
        let cycles = dag.topological_order().unwrap_err();
        assert_eq!(cycles, vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn separate_cycles_are_all_reported() {
        let dag = graph(
            &[("a", "b"), ("b", "a"), ("x", "y"), ("y", "x"), ("b", "x")],
            &[],
        );
        assert_eq!(
            dag.cycles(),
            vec![vec!["a", "b"], vec!["x", "y"]]
        );
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let dag = graph(&[("a", "a")], &["b"]);
        assert_eq!(dag.cycles(), vec![vec!["a"]]);
        assert!(dag.topological_order().is_err());
    }

    #[test]
    fn ancestors_are_transitive_and_ordered() {
        let dag = graph(
            &[("c", "d"), ("a", "b"), ("b", "d"), ("x", "y")],
            &["a", "b", "c", "d", "x", "y"],
        );
        assert_eq!(dag.ancestors("d"), vec!["a", "b", "c"]);
        assert!(dag.ancestors("a").is_empty());
        assert!(dag.ancestors("missing").is_empty());
    }

    #[test]
    fn predecessors_are_direct_only() {
        let dag = graph(&[("a", "b"), ("b", "c")], &[]);
        assert_eq!(dag.predecessors("c"), vec!["b"]);
        assert!(dag.contains("a"));
        assert_eq!(dag.len(), 3);
    }

    #[test]
    fn duplicate_edges_are_ignored() {
        let dag = graph(&[("a", "b"), ("a", "b")], &[]);
        assert_eq!(dag.predecessors("b"), vec!["a"]);
        assert_eq!(dag.topological_order().unwrap(), vec!["a", "b"]);
    }
}
