use std::collections::HashMap;

use crate::map::UnitId;

/// An unweighted unit adjacency graph in compressed sparse row format.
/// Nodes are stored in the same identifier order as the unit registry it was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdjacencyGraph {
    ids: Vec<UnitId>,
    index: HashMap<UnitId, u32>,
    offsets: Vec<u32>,
    edges: Vec<u32>,
}

impl AdjacencyGraph {
    /// Construct a graph from node ids and (sorted, deduplicated) adjacency lists.
    pub(crate) fn new(ids: Vec<UnitId>, edges: &[Vec<u32>]) -> Self {
        assert!(edges.len() == ids.len(), "edges.len() must equal ids.len()");

        Self {
            index: ids.iter().enumerate().map(|(i, id)| (id.clone(), i as u32)).collect(),
            ids,
            offsets: std::iter::once(0u32).chain(
                edges.iter()
                    .map(|v| v.len() as u32)
                    .scan(0u32, |acc, len| {*acc += len; Some(*acc)})
            ).collect::<Vec<u32>>(),
            edges: edges.iter().flatten().copied().collect(),
        }
    }

    /// Get the number of nodes (units) in the graph.
    #[inline] pub fn node_count(&self) -> usize { self.ids.len() }

    /// Get the number of directed neighbor entries in the graph.
    #[inline] pub(crate) fn entry_count(&self) -> usize { self.edges.len() }

    /// Get the number of distinct undirected adjacent pairs.
    #[inline] pub fn edge_count(&self) -> usize { self.edges().len() }

    /// Node ids in registry order.
    #[inline] pub fn ids(&self) -> &[UnitId] { &self.ids }

    #[inline] pub(crate) fn id(&self, node: usize) -> &UnitId { &self.ids[node] }

    #[inline] pub(crate) fn node(&self, id: &UnitId) -> Option<usize> { self.index.get(id).map(|&i| i as usize) }

    #[inline] pub fn contains(&self, id: &UnitId) -> bool { self.index.contains_key(id) }

    /// Get the range of edges for a given node.
    #[inline]
    fn range(&self, node: usize) -> std::ops::Range<usize> {
        self.offsets[node] as usize .. self.offsets[node + 1] as usize
    }

    /// Get the degree (number of neighbors) of a given node.
    #[inline] pub(crate) fn node_degree(&self, node: usize) -> usize { self.range(node).len() }

    /// Get an iterator over the neighbors of a given node.
    #[inline]
    pub(crate) fn node_edges(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.range(node).map(move |v| self.edges[v] as usize)
    }

    /// Get the number of neighbors of a unit (0 for unknown units).
    #[inline]
    pub fn degree(&self, id: &UnitId) -> usize {
        self.node(id).map_or(0, |node| self.node_degree(node))
    }

    /// Get the neighbors of a unit, in identifier order. Unknown units have none.
    pub fn neighbors(&self, id: &UnitId) -> impl Iterator<Item = &UnitId> + '_ {
        let range = self.node(id).map_or(0..0, |node| self.range(node));
        range.map(move |v| &self.ids[self.edges[v] as usize])
    }

    /// Check whether `b` is listed as a neighbor of `a`.
    pub fn contains_edge(&self, a: &UnitId, b: &UnitId) -> bool {
        match (self.node(a), self.node(b)) {
            (Some(u), Some(v)) => self.edges[self.range(u)].binary_search(&(v as u32)).is_ok(),
            _ => false,
        }
    }

    /// Distinct undirected adjacent pairs as node indices `(u, v)` with `u < v`.
    /// A pair listed in only one direction is still returned once.
    pub(crate) fn node_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = (0..self.node_count())
            .flat_map(|u| self.node_edges(u).map(move |v| (u.min(v), u.max(v))))
            .collect::<Vec<_>>();
        pairs.sort_unstable();
        pairs.dedup();
        pairs
    }

    /// Neighbor lists with every pair read in both directions, whatever the
    /// graph's symmetry. Cut linkage and contiguity support share this view.
    pub(crate) fn undirected_adjacency(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![Vec::new(); self.node_count()];
        for (u, v) in self.node_pairs() {
            adjacency[u].push(v);
            adjacency[v].push(u);
        }
        adjacency
    }

    /// Distinct undirected adjacent pairs, each ordered by identifier.
    pub fn edges(&self) -> Vec<(UnitId, UnitId)> {
        self.node_pairs().into_iter()
            .map(|(u, v)| (self.ids[u].clone(), self.ids[v].clone()))
            .collect()
    }

    /// Units that appear in no adjacent pair, in either direction.
    pub fn isolated(&self) -> impl Iterator<Item = &UnitId> + '_ {
        let adjacency = self.undirected_adjacency();
        (0..self.node_count())
            .filter(move |&node| adjacency[node].is_empty())
            .map(|node| &self.ids[node])
    }

    /// Pairs `(a, b)` where `b` is a neighbor of `a` but not the other way round.
    pub fn asymmetric_pairs(&self) -> Vec<(UnitId, UnitId)> {
        (0..self.node_count())
            .flat_map(|u| self.node_edges(u).map(move |v| (u, v)))
            .filter(|&(u, v)| self.edges[self.range(v)].binary_search(&(u as u32)).is_err())
            .map(|(u, v)| (self.ids[u].clone(), self.ids[v].clone()))
            .collect()
    }

    /// Check that every neighbor relation is mirrored.
    #[inline] pub fn is_symmetric(&self) -> bool { self.asymmetric_pairs().is_empty() }

    /// Adjacent pairs whose endpoints carry different labels.
    /// Scans the graph itself, so the result never exceeds `edge_count()`.
    pub fn cut_edges<L: PartialEq>(&self, label: impl Fn(&UnitId) -> L) -> Vec<(UnitId, UnitId)> {
        let labels = self.ids.iter().map(label).collect::<Vec<_>>();
        self.node_pairs().into_iter()
            .filter(|&(u, v)| labels[u] != labels[v])
            .map(|(u, v)| (self.ids[u].clone(), self.ids[v].clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<UnitId> {
        names.iter().map(|&n| UnitId::new(n)).collect()
    }

    fn make_test_graph() -> AdjacencyGraph {
        AdjacencyGraph::new(
            ids(&["A", "B", "C", "D"]),
            &[
                vec![1, 2],       // A
                vec![0, 2],       // B
                vec![0, 1, 3],    // C
                vec![2],          // D
            ],
        )
    }

    #[test]
    fn csr_graph_construction() {
        let graph = make_test_graph();

        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.entry_count(), 8);
        assert_eq!(graph.edge_count(), 4);

        // Offsets are cumulative neighbor counts, len = nodes + 1
        assert_eq!(graph.offsets, vec![0, 2, 4, 7, 8]);
        assert_eq!(graph.edges, vec![1, 2, 0, 2, 0, 1, 3, 2]);
        for window in graph.offsets.windows(2) { assert!(window[0] <= window[1]) }
    }

    #[test]
    fn neighbors_by_id() {
        let graph = make_test_graph();
        let c = graph.neighbors(&UnitId::new("C")).map(|id| id.as_str()).collect::<Vec<_>>();
        assert_eq!(c, vec!["A", "B", "D"]);
        assert_eq!(graph.degree(&UnitId::new("D")), 1);
        assert_eq!(graph.degree(&UnitId::new("Z")), 0);
        assert!(graph.neighbors(&UnitId::new("Z")).next().is_none());
    }

    #[test]
    fn contains_edge_checks_direction() {
        let graph = AdjacencyGraph::new(ids(&["A", "B"]), &[vec![1], vec![]]);
        assert!(graph.contains_edge(&UnitId::new("A"), &UnitId::new("B")));
        assert!(!graph.contains_edge(&UnitId::new("B"), &UnitId::new("A")));
        assert!(!graph.is_symmetric());
        assert_eq!(graph.asymmetric_pairs(), vec![(UnitId::new("A"), UnitId::new("B"))]);
        // A one-directional pair is still a single undirected edge.
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn edges_are_canonical_pairs() {
        let graph = make_test_graph();
        let edges = graph.edges().into_iter()
            .map(|(a, b)| format!("{a}-{b}"))
            .collect::<Vec<_>>();
        assert_eq!(edges, vec!["A-B", "A-C", "B-C", "C-D"]);
        assert!(graph.is_symmetric());
    }

    #[test]
    fn isolated_nodes_have_zero_degree() {
        let graph = AdjacencyGraph::new(ids(&["A", "B", "C"]), &[vec![1], vec![0], vec![]]);
        assert_eq!(graph.isolated().collect::<Vec<_>>(), vec![&UnitId::new("C")]);
        assert_eq!(graph.offsets, vec![0, 1, 2, 2]);
    }

    #[test]
    fn one_directional_neighbor_is_not_isolated() {
        // B lists A, A lists nobody.
        let graph = AdjacencyGraph::new(ids(&["A", "B", "C"]), &[vec![], vec![0], vec![]]);
        assert_eq!(graph.node_degree(0), 0);
        assert_eq!(graph.isolated().collect::<Vec<_>>(), vec![&UnitId::new("C")]);
        assert_eq!(graph.undirected_adjacency(), vec![vec![1], vec![0], vec![]]);
    }

    #[test]
    fn empty_graph_is_valid() {
        let graph = AdjacencyGraph::new(vec![], &[]);
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.offsets, vec![0]);
    }

    #[test]
    fn cut_edges_count_label_changes() {
        let graph = make_test_graph();

        let same = graph.cut_edges(|_| 0);
        assert!(same.is_empty());

        let split = graph.cut_edges(|id| if id.as_str() == "D" { 1 } else { 0 });
        assert_eq!(split, vec![(UnitId::new("C"), UnitId::new("D"))]);

        let all = graph.cut_edges(|id| id.clone());
        assert_eq!(all.len(), graph.edge_count());
    }

    #[test]
    #[should_panic(expected = "edges.len() must equal ids.len()")]
    fn new_panics_when_edges_len_mismatch() {
        AdjacencyGraph::new(ids(&["A"]), &[]);
    }
}
