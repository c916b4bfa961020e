//! A directed acyclic graph of keys, with topological traversal and
//! longest-path queries.
//!
//! Every precondition violation documented on an operation (missing node,
//! would-be cycle, missing edge) is a programmer error: it panics rather
//! than returning a `Result`, matching the rest of the workspace's
//! tiered error model.

use alloc::collections::{BTreeMap, BTreeSet, VecDeque};
use alloc::vec::Vec;
use core::fmt::Debug;

/// A directed acyclic graph keyed by `T`.
///
/// `next` holds each node's direct successors; `prev` holds its direct
/// predecessors. Both maps always contain an entry (possibly empty) for
/// every node in `nodes`.
#[derive(Clone)]
pub struct DependencyGraph<T: Ord + Clone> {
    nodes: BTreeSet<T>,
    next: BTreeMap<T, BTreeSet<T>>,
    prev: BTreeMap<T, BTreeSet<T>>,
}

impl<T: Ord + Clone + Debug> DependencyGraph<T> {
    pub fn new() -> Self {
        Self {
            nodes: BTreeSet::new(),
            next: BTreeMap::new(),
            prev: BTreeMap::new(),
        }
    }

    fn require(&self, v: &T) {
        if !self.nodes.contains(v) {
            panic!("dependency graph: node {:?} is not present", v);
        }
    }

    pub fn contains(&self, v: &T) -> bool {
        self.nodes.contains(v)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.nodes.iter()
    }

    /// Inserts `v` as an isolated node. No effect if already present.
    pub fn add(&mut self, v: T) {
        if self.nodes.insert(v.clone()) {
            self.next.insert(v.clone(), BTreeSet::new());
            self.prev.insert(v, BTreeSet::new());
        }
    }

    /// Removes `v` and all incident edges. No effect if absent.
    pub fn remove(&mut self, v: &T) {
        if !self.nodes.remove(v) {
            return;
        }
        if let Some(succs) = self.next.remove(v) {
            for s in &succs {
                if let Some(p) = self.prev.get_mut(s) {
                    p.remove(v);
                }
            }
        }
        if let Some(preds) = self.prev.remove(v) {
            for p in &preds {
                if let Some(n) = self.next.get_mut(p) {
                    n.remove(v);
                }
            }
        }
    }

    /// Adds the edge `u -> v`. Requires `u != v`, both present, and that no
    /// path `v ⇝ u` already exists (which would close a cycle).
    pub fn add_edge(&mut self, u: &T, v: &T) {
        assert!(u != v, "dependency graph: self-edge on {:?}", u);
        self.require(u);
        self.require(v);
        if self.is_any_next_of(v, u) {
            panic!(
                "dependency graph: edge {:?} -> {:?} would create a cycle",
                u, v
            );
        }
        self.next.get_mut(u).unwrap().insert(v.clone());
        self.prev.get_mut(v).unwrap().insert(u.clone());
    }

    /// Removes the direct edge `u -> v`. Requires the edge to exist.
    pub fn remove_edge(&mut self, u: &T, v: &T) {
        self.require(u);
        self.require(v);
        let removed = self.next.get_mut(u).unwrap().remove(v);
        if !removed {
            panic!("dependency graph: no direct edge {:?} -> {:?}", u, v);
        }
        self.prev.get_mut(v).unwrap().remove(u);
    }

    pub fn is_start(&self, v: &T) -> bool {
        self.require(v);
        self.prev[v].is_empty()
    }

    pub fn is_end(&self, v: &T) -> bool {
        self.require(v);
        self.next[v].is_empty()
    }

    pub fn has_prev(&self, v: &T) -> bool {
        !self.is_start(v)
    }

    pub fn has_next(&self, v: &T) -> bool {
        !self.is_end(v)
    }

    /// Direct predecessors of `v`.
    pub fn direct_prev_of(&self, v: &T) -> impl Iterator<Item = &T> {
        self.require(v);
        self.prev[v].iter()
    }

    /// Direct successors of `v`.
    pub fn direct_next_of(&self, v: &T) -> impl Iterator<Item = &T> {
        self.require(v);
        self.next[v].iter()
    }

    fn bfs(&self, start: &T, forward: bool) -> BTreeSet<T> {
        self.require(start);
        let edges = if forward { &self.next } else { &self.prev };
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(start.clone());
        while let Some(node) = queue.pop_front() {
            for n in &edges[&node] {
                if seen.insert(n.clone()) {
                    queue.push_back(n.clone());
                }
            }
        }
        seen
    }

    /// Transitive closure of successors of `v`, excluding `v` itself.
    pub fn all_nexts_of(&self, v: &T) -> BTreeSet<T> {
        self.bfs(v, true)
    }

    /// Transitive closure of predecessors of `v`, excluding `v` itself.
    pub fn all_prevs_of(&self, v: &T) -> BTreeSet<T> {
        self.bfs(v, false)
    }

    /// True iff `other` is a direct or indirect predecessor of `base`.
    pub fn is_any_prev_of(&self, base: &T, other: &T) -> bool {
        self.all_prevs_of(base).contains(other)
    }

    /// True iff `other` is a direct or indirect successor of `base`.
    pub fn is_any_next_of(&self, base: &T, other: &T) -> bool {
        self.all_nexts_of(base).contains(other)
    }

    /// True iff `other` is a predecessor of `base` but not a direct one.
    pub fn is_indirect_prev_of(&self, base: &T, other: &T) -> bool {
        self.is_any_prev_of(base, other) && !self.prev[base].contains(other)
    }

    /// True iff `other` is a successor of `base` but not a direct one.
    pub fn is_indirect_next_of(&self, base: &T, other: &T) -> bool {
        self.is_any_next_of(base, other) && !self.next[base].contains(other)
    }

    fn kahn(&self, forward: bool, restrict_to: Option<&BTreeSet<T>>) -> Vec<T> {
        let primary = if forward { &self.prev } else { &self.next };
        let secondary = if forward { &self.next } else { &self.prev };

        let universe: BTreeSet<T> = match restrict_to {
            Some(set) => set.clone(),
            None => self.nodes.clone(),
        };

        let mut indegree: BTreeMap<T, usize> = BTreeMap::new();
        for n in &universe {
            let count = primary[n].iter().filter(|p| universe.contains(*p)).count();
            indegree.insert(n.clone(), count);
        }

        let mut ready: VecDeque<T> = indegree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(n, _)| n.clone())
            .collect();
        // Deterministic order among ties.
        let mut ready_sorted: Vec<T> = ready.drain(..).collect();
        ready_sorted.sort();
        let mut ready: VecDeque<T> = ready_sorted.into();

        let mut order = Vec::with_capacity(universe.len());
        while let Some(n) = ready.pop_front() {
            order.push(n.clone());
            let mut newly_ready = Vec::new();
            for s in secondary[&n].iter().filter(|s| universe.contains(*s)) {
                let deg = indegree.get_mut(s).unwrap();
                *deg -= 1;
                if *deg == 0 {
                    newly_ready.push(s.clone());
                }
            }
            newly_ready.sort();
            for n in newly_ready {
                ready.push_back(n);
            }
        }
        order
    }

    /// Kahn topological order over the whole graph, starts first.
    pub fn all_nodes_start_to_end(&self) -> Vec<T> {
        self.kahn(true, None)
    }

    /// Kahn topological order over the whole graph, ends first.
    pub fn all_nodes_end_to_start(&self) -> Vec<T> {
        self.kahn(false, None)
    }

    /// Topological order restricted to the subgraph reachable forward from
    /// `v`; `v` is first.
    pub fn all_nodes_from_v_to_end(&self, v: &T) -> Vec<T> {
        self.require(v);
        let mut universe = self.all_nexts_of(v);
        universe.insert(v.clone());
        self.kahn(true, Some(&universe))
    }

    /// Topological order restricted to the subgraph reachable backward from
    /// `v`; `v` is first.
    pub fn all_nodes_from_v_to_start(&self, v: &T) -> Vec<T> {
        self.require(v);
        let mut universe = self.all_prevs_of(v);
        universe.insert(v.clone());
        self.kahn(false, Some(&universe))
    }

    /// Length of the longest path ending at `v` when walking from starts;
    /// 0 if `v` is itself a start.
    pub fn max_distance_from_start(&self, v: &T) -> usize {
        self.require(v);
        self.direct_prev_of(v)
            .map(|p| 1 + self.max_distance_from_start(p))
            .max()
            .unwrap_or(0)
    }

    /// Length of the longest path ending at `v` when walking from ends;
    /// 0 if `v` is itself an end.
    pub fn max_distance_from_end(&self, v: &T) -> usize {
        self.require(v);
        self.direct_next_of(v)
            .map(|n| 1 + self.max_distance_from_end(n))
            .max()
            .unwrap_or(0)
    }
}

impl<T: Ord + Clone + Debug> Default for DependencyGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn six_node_graph() -> DependencyGraph<&'static str> {
        // R, P, D, G, S, M with edges:
        // R->D, R->G, P->G, R->S, P->S, G->S, R->M, P->M, G->M, S->M
        let mut g = DependencyGraph::new();
        for n in ["R", "P", "D", "G", "S", "M"] {
            g.add(n);
        }
        for (u, v) in [
            ("R", "D"),
            ("R", "G"),
            ("P", "G"),
            ("R", "S"),
            ("P", "S"),
            ("G", "S"),
            ("R", "M"),
            ("P", "M"),
            ("G", "M"),
            ("S", "M"),
        ] {
            g.add_edge(&u, &v);
        }
        g
    }

    #[test]
    fn add_edge_rejects_cycles() {
        let mut g = DependencyGraph::new();
        g.add("a");
        g.add("b");
        g.add_edge(&"a", &"b");
        let before = g.next.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            g.add_edge(&"b", &"a");
        }));
        assert!(result.is_err());
        assert_eq!(g.next, before, "rejected add_edge must leave the graph untouched");
    }

    #[test]
    fn topological_order_respects_edges() {
        let g = six_node_graph();
        let order = g.all_nodes_start_to_end();
        assert_eq!(order.len(), 6);
        let pos = |n: &str| order.iter().position(|x| *x == n).unwrap();
        assert!(pos("R") < pos("D"));
        assert!(pos("R") < pos("M"));
        assert!(pos("G") < pos("S"));
        assert!(pos("S") < pos("M"));
    }

    #[test]
    fn from_v_to_end_matches_spec_example() {
        let g = six_node_graph();
        let order = g.all_nodes_from_v_to_end(&"P");
        assert_eq!(order, vec!["P", "G", "S", "M"]);
    }

    #[test]
    fn max_distance_from_start() {
        let g = six_node_graph();
        assert_eq!(g.max_distance_from_start(&"R"), 0);
        assert_eq!(g.max_distance_from_start(&"M"), 3);
    }

    #[test]
    #[should_panic]
    fn remove_edge_requires_direct_edge() {
        let mut g = DependencyGraph::new();
        g.add("a");
        g.add("b");
        g.remove_edge(&"a", &"b");
    }
}
