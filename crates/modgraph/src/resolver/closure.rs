//! Public-edge graph: cycle detection and transitive closure.

use std::collections::{BTreeMap, BTreeSet};

/// Effective public edges of every manifest in a set.
///
/// Nodes are manifest identifiers. Edge targets may be any name; only
/// targets that are themselves nodes are followed.
#[derive(Debug, Default)]
pub(crate) struct PublicGraph<'a> {
    edges: BTreeMap<&'a str, Vec<&'a str>>,
}

impl<'a> PublicGraph<'a> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_node(&mut self, name: &'a str) {
        self.edges.entry(name).or_default();
    }

    /// Self-edges are ignored; they are reported separately.
    pub(crate) fn add_edge(&mut self, from: &'a str, to: &'a str) {
        if from == to {
            return;
        }
        let targets = self.edges.entry(from).or_default();
        if !targets.contains(&to) {
            targets.push(to);
        }
    }

    fn successors(&self, name: &str) -> &[&'a str] {
        self.edges.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Strongly connected components with more than one member, each
    /// sorted, ordered by first member.
    pub(crate) fn cycles(&self) -> Vec<Vec<String>> {
        let mut tarjan = Tarjan::new(self);
        for &node in self.edges.keys() {
            if !tarjan.index.contains_key(node) {
                tarjan.visit(node);
            }
        }
        let mut cycles: Vec<Vec<String>> = tarjan
            .components
            .into_iter()
            .filter(|c| c.len() > 1)
            .map(|c| {
                let mut members: Vec<String> = c.into_iter().map(str::to_string).collect();
                members.sort();
                members
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Every name reachable from `start` over public edges, excluding
    /// `start`. Non-node targets are leaves.
    pub(crate) fn closure(&self, start: &str) -> BTreeSet<String> {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut stack: Vec<&str> = self.successors(start).iter().rev().copied().collect();
        while let Some(name) = stack.pop() {
            if name == start || !seen.insert(name) {
                continue;
            }
            stack.extend(self.successors(name).iter().rev().copied());
        }
        seen.into_iter().map(str::to_string).collect()
    }
}

struct Tarjan<'g, 'a> {
    graph: &'g PublicGraph<'a>,
    next: usize,
    index: BTreeMap<&'a str, usize>,
    low: BTreeMap<&'a str, usize>,
    stack: Vec<&'a str>,
    on_stack: BTreeSet<&'a str>,
    components: Vec<Vec<&'a str>>,
}

impl<'g, 'a> Tarjan<'g, 'a> {
    fn new(graph: &'g PublicGraph<'a>) -> Self {
        Self {
            graph,
            next: 0,
            index: BTreeMap::new(),
            low: BTreeMap::new(),
            stack: Vec::new(),
            on_stack: BTreeSet::new(),
            components: Vec::new(),
        }
    }

    fn visit(&mut self, node: &'a str) {
        self.index.insert(node, self.next);
        self.low.insert(node, self.next);
        self.next += 1;
        self.stack.push(node);
        self.on_stack.insert(node);

        let graph = self.graph;
        for &succ in graph.successors(node) {
            if !graph.edges.contains_key(succ) {
                continue;
            }
            if !self.index.contains_key(succ) {
                self.visit(succ);
                let low = self.low[node].min(self.low[succ]);
                self.low.insert(node, low);
            } else if self.on_stack.contains(succ) {
                let low = self.low[node].min(self.index[succ]);
                self.low.insert(node, low);
            }
        }

        if self.low[node] == self.index[node] {
            let mut component = Vec::new();
            while let Some(member) = self.stack.pop() {
                self.on_stack.remove(member);
                component.push(member);
                if member == node {
                    break;
                }
            }
            self.components.push(component);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph<'a>(edges: &[(&'a str, &'a str)], nodes: &[&'a str]) -> PublicGraph<'a> {
        let mut g = PublicGraph::new();
        for node in nodes {
            g.add_node(node);
        }
        for (from, to) in edges {
            g.add_edge(from, to);
        }
        g
    }

    #[test]
    fn closure_follows_chain_to_leaves() {
        let g = graph(&[("A", "B"), ("B", "Host1")], &["A", "B"]);
        let closure = g.closure("A");
        assert_eq!(closure.into_iter().collect::<Vec<_>>(), vec!["B", "Host1"]);
    }

    #[test]
    fn closure_visits_diamond_once() {
        let g = graph(
            &[("A", "B"), ("A", "C"), ("B", "D"), ("C", "D"), ("D", "Core")],
            &["A", "B", "C", "D"],
        );
        assert_eq!(g.closure("A").len(), 4);
    }

    #[test]
    fn detects_two_cycle() {
        let g = graph(&[("A", "B"), ("B", "A"), ("C", "A")], &["A", "B", "C"]);
        assert_eq!(g.cycles(), vec![vec!["A".to_string(), "B".to_string()]]);
    }

    #[test]
    fn separate_cycles_are_reported_separately() {
        let g = graph(
            &[("A", "B"), ("B", "A"), ("X", "Y"), ("Y", "Z"), ("Z", "X")],
            &["A", "B", "X", "Y", "Z"],
        );
        let cycles = g.cycles();
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[1], vec!["X", "Y", "Z"]);
    }

    #[test]
    fn self_edges_are_not_cycles() {
        let g = graph(&[("A", "A")], &["A"]);
        assert!(g.cycles().is_empty());
        assert!(g.closure("A").is_empty());
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let g = graph(&[("A", "B"), ("B", "C"), ("A", "C")], &["A", "B", "C"]);
        assert!(g.cycles().is_empty());
    }
}
