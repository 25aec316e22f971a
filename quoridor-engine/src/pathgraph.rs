//! Incrementally maintained shortest paths from every cell to a set of sinks.
//!
//! [`PathGraph`] answers `distance` and `has_path` in O(1) while the board
//! graph changes underneath it: wall placement removes edges ([`PathGraph::cut`])
//! and undo restores them ([`PathGraph::uncut`]). Both repairs touch only the
//! cells whose shortest-path information actually changed, plus their
//! frontier.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use crate::board::Loc;

/// Distance and next-hop bookkeeping for one cell. `next` is `None` for
/// sinks, which are their own destination.
type Downhill = Option<(usize, Option<Loc>)>;

/// Dynamic single-source-to-sink-set shortest path index.
///
/// The graph is an undirected adjacency mapping owned by this instance.
/// `downhill[u]` holds `(dist, next)` along one shortest path from `u` to the
/// nearest sink, or `None` when `u` is cut off. `uphill[v]` is the exact
/// reverse index `{u : next[u] == v}`.
///
/// Callers must not cut an edge twice without an intervening uncut, nor uncut
/// an edge that was never present; the index does not police this.
#[derive(Debug, Clone)]
pub struct PathGraph {
    graph: HashMap<Loc, HashSet<Loc>>,
    sinks: HashSet<Loc>,
    downhill: HashMap<Loc, Downhill>,
    uphill: HashMap<Loc, HashSet<Loc>>,
}

impl PathGraph {
    /// Build the index over `graph` for the given sink cells. The initial
    /// graph must be connected.
    pub fn new(graph: HashMap<Loc, HashSet<Loc>>, sinks: impl IntoIterator<Item = Loc>) -> Self {
        let sinks: HashSet<Loc> = sinks.into_iter().collect();
        let mut downhill: HashMap<Loc, Downhill> = HashMap::with_capacity(graph.len());
        let mut uphill: HashMap<Loc, HashSet<Loc>> = HashMap::with_capacity(graph.len());
        for &node in graph.keys() {
            let info = if sinks.contains(&node) { Some((0, None)) } else { None };
            downhill.insert(node, info);
            uphill.insert(node, HashSet::new());
        }
        let mut pg = PathGraph { graph, sinks, downhill, uphill };
        let unrouted: HashSet<Loc> = pg
            .graph
            .keys()
            .copied()
            .filter(|node| !pg.sinks.contains(node))
            .collect();
        pg.reconnect(unrouted);
        pg
    }

    /// Steps from `node` to the nearest sink, or `None` when unreachable.
    pub fn distance(&self, node: Loc) -> Option<usize> {
        self.downhill.get(&node).copied().flatten().map(|(dist, _)| dist)
    }

    /// True iff some path from `node` to a sink exists.
    pub fn has_path(&self, node: Loc) -> bool {
        matches!(self.downhill.get(&node), Some(Some(_)))
    }

    /// True iff the edge `{a, b}` is currently present.
    pub fn are_adjacent(&self, a: Loc, b: Loc) -> bool {
        self.graph.get(&a).is_some_and(|set| set.contains(&b))
    }

    /// Current neighbors of `node`.
    pub fn neighbors(&self, node: Loc) -> impl Iterator<Item = Loc> + '_ {
        self.graph.get(&node).into_iter().flatten().copied()
    }

    /// Lazy walk along a shortest path: the successors of `node`, ending at
    /// (and including) a sink. Empty when `node` is a sink or unreachable.
    pub fn path_from(&self, node: Loc) -> PathIter<'_> {
        PathIter { pg: self, at: node }
    }

    /// Remove the given undirected edges. Each removal that lies on a
    /// maintained downhill path severs the upstream subtree and repairs it
    /// with a multi-source Dijkstra from its border.
    pub fn cut(&mut self, pairs: &[(Loc, Loc)]) {
        for &(a, b) in pairs {
            if let Some(set) = self.graph.get_mut(&a) {
                set.remove(&b);
            }
            if let Some(set) = self.graph.get_mut(&b) {
                set.remove(&a);
            }
            if self.next_of(a) == Some(b) {
                if let Some(ups) = self.uphill.get_mut(&b) {
                    ups.remove(&a);
                }
                let severed = self.sever(a);
                self.reconnect(severed);
            } else if self.next_of(b) == Some(a) {
                if let Some(ups) = self.uphill.get_mut(&a) {
                    ups.remove(&b);
                }
                let severed = self.sever(b);
                self.reconnect(severed);
            }
        }
    }

    /// Restore the given undirected edges (exact inverse of [`PathGraph::cut`]).
    pub fn uncut(&mut self, pairs: &[(Loc, Loc)]) {
        for &(a, b) in pairs {
            if let Some(set) = self.graph.get_mut(&a) {
                set.insert(b);
            }
            if let Some(set) = self.graph.get_mut(&b) {
                set.insert(a);
            }

            let info_a = self.downhill.get(&a).copied().flatten();
            let info_b = self.downhill.get(&b).copied().flatten();
            match (info_a, info_b) {
                (None, _) | (_, None) => {
                    // Re-attach a region that had been completely cut off:
                    // flood the unreachable component around the dark
                    // endpoint, then repair it from its (possibly just
                    // reconnected) border.
                    let start = if info_a.is_none() { a } else { b };
                    let mut component = HashSet::from([start]);
                    let mut fringe = VecDeque::from([start]);
                    while let Some(node) = fringe.pop_front() {
                        let neighbors: Vec<Loc> = self.neighbors(node).collect();
                        for n in neighbors {
                            if self.downhill[&n].is_none() && component.insert(n) {
                                fringe.push_back(n);
                            }
                        }
                    }
                    self.reconnect(component);
                }
                (Some((dist_a, _)), Some((dist_b, _))) => {
                    // Both sides reachable. The new edge only matters when it
                    // shortcuts between shells more than one step apart.
                    if dist_a.abs_diff(dist_b) > 1 {
                        let (closer, farther) = if dist_a < dist_b { (a, b) } else { (b, a) };
                        self.reroute(farther, closer);
                    }
                }
            }
        }
    }

    fn next_of(&self, node: Loc) -> Option<Loc> {
        self.downhill.get(&node).copied().flatten().and_then(|(_, next)| next)
    }

    /// Walk the uphill reverse index transitively from `start`, detaching
    /// every visited cell: distance unknown (sinks stay at 0), no next hop,
    /// empty uphill set. Returns the detached cells. Iterative on purpose;
    /// cut chains can run the length of the board.
    fn sever(&mut self, start: Loc) -> HashSet<Loc> {
        let mut severed = HashSet::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if !severed.insert(node) {
                continue;
            }
            if let Some(ups) = self.uphill.get_mut(&node) {
                stack.extend(ups.drain());
            }
            let info = if self.sinks.contains(&node) { Some((0, None)) } else { None };
            self.downhill.insert(node, info);
        }
        severed
    }

    /// Recompute shortest paths for a connected set of detached cells by
    /// running unit-weight Dijkstra from the border of the set (the routed
    /// neighbors just outside it). Cells no border can reach stay detached.
    fn reconnect(&mut self, mut severed: HashSet<Loc>) {
        let mut heap: BinaryHeap<Reverse<(usize, Loc)>> = BinaryHeap::new();
        let mut on_border = HashSet::new();
        for &node in &severed {
            let neighbors: Vec<Loc> = self.neighbors(node).collect();
            for n in neighbors {
                if !severed.contains(&n) && on_border.insert(n) {
                    if let Some(Some((dist, _))) = self.downhill.get(&n) {
                        heap.push(Reverse((*dist, n)));
                    }
                }
            }
        }

        while !severed.is_empty() {
            let Some(Reverse((dist, node))) = heap.pop() else {
                break;
            };
            let neighbors: Vec<Loc> = self.neighbors(node).collect();
            for n in neighbors {
                if severed.remove(&n) {
                    self.downhill.insert(n, Some((dist + 1, Some(node))));
                    if let Some(ups) = self.uphill.get_mut(&node) {
                        ups.insert(n);
                    }
                    heap.push(Reverse((dist + 1, n)));
                }
            }
        }
    }

    /// Route `start` through `via`, then flood outward re-routing every
    /// neighbor whose distance would drop. The flood reaches reversed chain
    /// segments, uphill subtrees, and parallel routes alike; each cell's
    /// distance only ever decreases, so the walk terminates.
    fn reroute(&mut self, start: Loc, via: Loc) {
        self.attach(start, via);
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            let Some(Some((dist, _))) = self.downhill.get(&node).copied() else {
                continue;
            };
            let neighbors: Vec<Loc> = self.neighbors(node).collect();
            for n in neighbors {
                if let Some(Some((n_dist, _))) = self.downhill.get(&n) {
                    if *n_dist > dist + 1 {
                        self.attach(n, node);
                        queue.push_back(n);
                    }
                }
            }
        }
    }

    /// Point `node` one step downhill through `via`, fixing both uphill
    /// sets. `via` must be routed.
    fn attach(&mut self, node: Loc, via: Loc) {
        let Some(Some((via_dist, _))) = self.downhill.get(&via).copied() else {
            return;
        };
        if let Some(old_next) = self.next_of(node) {
            if let Some(ups) = self.uphill.get_mut(&old_next) {
                ups.remove(&node);
            }
        }
        self.downhill.insert(node, Some((via_dist + 1, Some(via))));
        if let Some(ups) = self.uphill.get_mut(&via) {
            ups.insert(node);
        }
    }
}

/// Iterator returned by [`PathGraph::path_from`].
pub struct PathIter<'a> {
    pg: &'a PathGraph,
    at: Loc,
}

impl Iterator for PathIter<'_> {
    type Item = Loc;

    fn next(&mut self) -> Option<Loc> {
        let next = self.pg.next_of(self.at)?;
        self.at = next;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{adjacency, Player, BOARD_SIZE};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::VecDeque;

    fn south_goal_graph() -> PathGraph {
        // Sinks on row 0, matching the southern player's goal.
        PathGraph::new(adjacency(), (0..BOARD_SIZE).map(|c| (0, c)))
    }

    /// Reference distances by plain BFS over the current adjacency.
    fn bfs_distances(pg: &PathGraph, sinks: &[Loc]) -> HashMap<Loc, usize> {
        let mut dist = HashMap::new();
        let mut queue = VecDeque::new();
        for &s in sinks {
            dist.insert(s, 0);
            queue.push_back(s);
        }
        while let Some(node) = queue.pop_front() {
            let d = dist[&node];
            for n in pg.neighbors(node) {
                if !dist.contains_key(&n) {
                    dist.insert(n, d + 1);
                    queue.push_back(n);
                }
            }
        }
        dist
    }

    /// Check every structural invariant of the index against BFS truth.
    fn assert_consistent(pg: &PathGraph) {
        let sinks: Vec<Loc> = pg.sinks.iter().copied().collect();
        let truth = bfs_distances(pg, &sinks);
        for &node in pg.graph.keys() {
            match pg.downhill[&node] {
                Some((dist, next)) => {
                    assert_eq!(Some(&dist), truth.get(&node), "distance wrong at {node:?}");
                    if let Some(next) = next {
                        assert!(pg.are_adjacent(node, next), "next hop not adjacent at {node:?}");
                        assert_eq!(pg.distance(next), Some(dist - 1));
                        assert!(pg.uphill[&next].contains(&node), "uphill missing {node:?}");
                    } else {
                        assert!(pg.sinks.contains(&node));
                        assert_eq!(dist, 0);
                    }
                }
                None => {
                    assert!(!truth.contains_key(&node), "reachable cell marked severed: {node:?}");
                    assert!(pg.uphill[&node].is_empty());
                }
            }
        }
        for (&node, ups) in &pg.uphill {
            for up in ups {
                assert_eq!(pg.next_of(*up), Some(node), "stale uphill entry {up:?} -> {node:?}");
            }
        }
    }

    #[test]
    fn initial_distances_are_row_counts() {
        let pg = south_goal_graph();
        for r in 0..BOARD_SIZE {
            for c in 0..BOARD_SIZE {
                assert_eq!(pg.distance((r, c)), Some(r));
            }
        }
        assert_consistent(&pg);
    }

    #[test]
    fn cut_off_the_path_changes_nothing() {
        let pg0 = south_goal_graph();
        let mut pg = south_goal_graph();
        // A horizontal edge is never on a straight-down shortest path here.
        pg.cut(&[((3, 4), (3, 5))]);
        for &node in pg.graph.keys() {
            assert_eq!(pg.downhill[&node], pg0.downhill[&node]);
        }
        assert_consistent(&pg);
    }

    #[test]
    fn cut_forces_a_sidestep() {
        let mut pg = south_goal_graph();
        let before = pg.distance((4, 4)).unwrap();
        pg.cut(&[((3, 4), (4, 4))]);
        let (_, next) = pg.downhill[&(4, 4)].unwrap();
        assert!(next == Some((4, 3)) || next == Some((4, 5)));
        assert_eq!(pg.distance((4, 4)), Some(before + 1));
        assert_consistent(&pg);
    }

    #[test]
    fn full_cutoff_marks_unreachable() {
        let mut pg = south_goal_graph();
        pg.cut(&[((3, 4), (3, 3))]);
        pg.cut(&[((3, 4), (3, 5))]);
        pg.cut(&[((3, 4), (2, 4))]);
        pg.cut(&[((3, 4), (4, 4))]);
        assert!(!pg.has_path((3, 4)));
        assert_eq!(pg.distance((3, 4)), None);
        assert_consistent(&pg);
    }

    #[test]
    fn cut_within_a_cut_region() {
        let mut pg = south_goal_graph();
        pg.cut(&[((3, 4), (3, 3))]);
        pg.cut(&[((3, 4), (2, 4))]);
        pg.cut(&[((3, 4), (4, 4))]);
        pg.cut(&[((3, 5), (3, 6))]);
        pg.cut(&[((3, 5), (2, 5))]);
        pg.cut(&[((3, 5), (4, 5))]);
        // (3,4) and (3,5) are boxed in together.
        assert!(!pg.has_path((3, 4)));
        assert!(!pg.has_path((3, 5)));
        assert!(pg.uphill[&(3, 4)].is_empty());
        assert!(pg.uphill[&(3, 5)].is_empty());
        // Cutting inside the dark region must not panic or corrupt anything.
        pg.cut(&[((3, 4), (3, 5))]);
        assert_consistent(&pg);
    }

    #[test]
    fn enclosing_a_sink_keeps_it_reachable() {
        let mut pg = south_goal_graph();
        pg.cut(&[((0, 4), (0, 5))]);
        pg.cut(&[((0, 5), (0, 6))]);
        pg.cut(&[((1, 4), (1, 5))]);
        pg.cut(&[((1, 5), (1, 6))]);
        pg.cut(&[((1, 5), (2, 5))]);
        // (1,5) kept only its edge up to the sink (0,5).
        assert_eq!(pg.distance((1, 5)), Some(1));
        assert!(pg.has_path((1, 5)));
        assert_eq!(pg.distance((0, 5)), Some(0));
        assert_consistent(&pg);
    }

    #[test]
    fn uncut_restores_simple_cut() {
        let pg0 = south_goal_graph();
        let mut pg = south_goal_graph();
        let pairs = [((3, 3), (4, 3)), ((3, 4), (4, 4))];
        pg.cut(&pairs);
        pg.uncut(&pairs);
        for &node in pg.graph.keys() {
            assert_eq!(pg.distance(node), pg0.distance(node));
        }
        assert_consistent(&pg);
    }

    #[test]
    fn lifo_uncut_restores_distances_through_an_enclosure() {
        let mut pg = south_goal_graph();
        let pairs = [
            ((3, 3), (3, 4)),
            ((3, 3), (4, 3)),
            ((3, 3), (2, 3)),
            ((3, 3), (3, 2)),
        ];
        let mut snapshots = Vec::new();
        for pair in pairs {
            snapshots.push(pg.downhill.clone());
            pg.cut(&[pair]);
        }
        assert!(!pg.has_path((3, 3)));
        for pair in pairs.iter().rev() {
            pg.uncut(&[*pair]);
            let expected = snapshots.pop().unwrap();
            for (&node, info) in &expected {
                assert_eq!(pg.distance(node), info.map(|(d, _)| d), "at {node:?}");
            }
            assert_consistent(&pg);
        }
    }

    #[test]
    fn uncut_shortens_paths_through_new_edge() {
        let mut pg = south_goal_graph();
        // Wall off a long detour: cut the whole gap under row 2 except col 8.
        let pairs: Vec<(Loc, Loc)> = (0..8).map(|c| ((2, c), (3, c))).collect();
        pg.cut(&pairs);
        assert_consistent(&pg);
        // Around: 8 right along row 3, then 3 up the open column.
        assert_eq!(pg.distance((3, 0)), Some(11));
        // Reopen the leftmost gap; distances on the far side collapse.
        pg.uncut(&[((2, 0), (3, 0))]);
        assert_eq!(pg.distance((3, 0)), Some(3));
        assert_consistent(&pg);
    }

    #[test]
    fn path_iterator_walks_to_a_sink() {
        let pg = south_goal_graph();
        let path: Vec<Loc> = pg.path_from((4, 4)).collect();
        assert_eq!(path.len(), 4);
        assert_eq!(path.last(), Some(&(0, 4)));
        // Restartable: a second walk yields the same cells.
        assert_eq!(pg.path_from((4, 4)).collect::<Vec<_>>(), path);
        // Sinks and unreachable cells yield nothing.
        assert_eq!(pg.path_from((0, 3)).count(), 0);
    }

    #[test]
    fn random_cut_uncut_storm_stays_consistent() {
        // Seeded pseudo-property test: random walls in, LIFO back out, with
        // the index checked against BFS truth at every step.
        let mut rng = StdRng::seed_from_u64(0x51de5);
        for _ in 0..20 {
            let mut pg = PathGraph::new(adjacency(), Player::North.goal_cells());
            let mut stack: Vec<[(Loc, Loc); 2]> = Vec::new();
            for _ in 0..12 {
                let r = rng.gen_range(0..8);
                let c = rng.gen_range(0..8);
                let pairs = if rng.gen_bool(0.5) {
                    [((r, c), (r + 1, c)), ((r, c + 1), (r + 1, c + 1))]
                } else {
                    [((r, c), (r, c + 1)), ((r + 1, c), (r + 1, c + 1))]
                };
                // Skip already-missing edges; double cuts are out of contract.
                if pairs.iter().any(|&(a, b)| !pg.are_adjacent(a, b)) {
                    continue;
                }
                pg.cut(&pairs);
                stack.push(pairs);
                assert_consistent(&pg);
            }
            while let Some(pairs) = stack.pop() {
                pg.uncut(&pairs);
                assert_consistent(&pg);
            }
            let fresh = PathGraph::new(adjacency(), Player::North.goal_cells());
            for &node in fresh.graph.keys() {
                assert_eq!(pg.distance(node), fresh.distance(node));
            }
        }
    }
}
