//! Cover tree for nearest-neighbor queries under an arbitrary metric.
//!
//! Each tree level covers space at radius `base^level`; a node's children
//! all lie within that radius. Insertion descends the cover sets until no
//! level covers the new element, growing the root upward when an element
//! falls outside every existing cover. Queries walk the levels keeping
//! every candidate that could still beat the best distance found so far.

use tracing::trace;

use crate::landmark::Metric;

const DEFAULT_BASE: f64 = 1.2;

struct TreeNode<T> {
    element: T,
    children: Vec<usize>,
}

pub struct CoverTree<T, M> {
    metric: M,
    base: f64,
    nodes: Vec<TreeNode<T>>,
    root: Option<usize>,
    max_level: i32,
    min_level: i32,
    len: usize,
}

impl<T: Clone, M: Metric<T>> CoverTree<T, M> {
    pub fn new(metric: M) -> Self {
        Self {
            metric,
            base: DEFAULT_BASE,
            nodes: Vec::new(),
            root: None,
            max_level: 0,
            min_level: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn radius(&self, level: i32) -> f64 {
        self.base.powi(level)
    }

    fn push_node(&mut self, element: T) -> usize {
        self.nodes.push(TreeNode {
            element,
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    /// Inserts `element`, returning `false` when an element at distance
    /// zero is already present.
    pub fn insert(&mut self, element: T) -> bool {
        let Some(root) = self.root else {
            let at = self.push_node(element);
            self.root = Some(at);
            self.len = 1;
            return true;
        };

        let root_distance = self.metric.distance(&self.nodes[root].element, &element);
        if root_distance == 0.0 {
            return false;
        }
        if root_distance > self.radius(self.max_level + 1) {
            self.insert_at_root(element, root_distance);
            return true;
        }

        // Descend the cover sets. Every node is implicitly its own child on
        // lower levels; distances are cached alongside the indices.
        let mut cover: Vec<(usize, f64)> = vec![(root, root_distance)];
        let mut level = self.max_level;
        let mut parent: Option<usize> = None;
        loop {
            let mut next: Vec<(usize, f64)> = Vec::new();
            for &(at, distance) in &cover {
                if distance < self.radius(level) {
                    next.push((at, distance));
                }
                for &child in &self.nodes[at].children {
                    let child_distance =
                        self.metric.distance(&self.nodes[child].element, &element);
                    if child_distance == 0.0 {
                        return false;
                    }
                    if child_distance < self.radius(level) {
                        next.push((child, child_distance));
                    }
                }
            }
            next.sort_unstable_by_key(|&(at, _)| at);
            next.dedup_by_key(|&mut (at, _)| at);
            let Some(&(closest, _)) = next
                .iter()
                .min_by(|a, b| a.1.total_cmp(&b.1))
            else {
                break;
            };
            // Any member of `next` may cover the element one level down.
            parent = Some(closest);
            level -= 1;
            cover = next;
        }

        match parent {
            Some(at) => {
                if level < self.min_level {
                    self.min_level = level;
                }
                let node = self.push_node(element);
                self.nodes[at].children.push(node);
                self.len += 1;
            }
            None => self.insert_at_root(element, root_distance),
        }
        true
    }

    /// Raises the root level until it covers `element`, then attaches it.
    fn insert_at_root(&mut self, element: T, distance: f64) {
        let mut root = match self.root {
            Some(root) => root,
            None => {
                let at = self.push_node(element);
                self.root = Some(at);
                self.len = 1;
                return;
            }
        };
        while distance > self.radius(self.max_level) {
            let lifted = self.push_node(self.nodes[root].element.clone());
            self.nodes[lifted].children.push(root);
            root = lifted;
            self.root = Some(root);
            self.max_level += 1;
        }
        let node = self.push_node(element);
        self.nodes[root].children.push(node);
        self.len += 1;
        trace!(max_level = self.max_level, "cover tree root raised");
    }

    /// The stored element closest to `needle`, if the tree is non-empty.
    pub fn nearest_neighbor(&self, needle: &T) -> Option<&T> {
        let root = self.root?;
        let mut best = root;
        let mut best_distance = self.metric.distance(&self.nodes[root].element, needle);
        let mut candidates: Vec<(usize, f64)> = vec![(root, best_distance)];

        for level in (self.min_level..=self.max_level).rev() {
            let mut next: Vec<(usize, f64)> = Vec::new();
            for &(at, distance) in &candidates {
                // A node covers itself on every lower level.
                next.push((at, distance));
                for &child in &self.nodes[at].children {
                    let child_distance =
                        self.metric.distance(&self.nodes[child].element, needle);
                    if child_distance < best_distance {
                        best = child;
                        best_distance = child_distance;
                    }
                    next.push((child, child_distance));
                }
            }
            // A candidate's whole subtree lies within the geometric sum of
            // the cover radii below it, not one radius.
            let reach = self.radius(level) * self.base / (self.base - 1.0);
            let bound = best_distance + reach;
            next.retain(|&(_, distance)| distance < bound);
            next.sort_unstable_by_key(|&(at, _)| at);
            next.dedup_by_key(|&mut (at, _)| at);
            candidates = next;
        }
        Some(&self.nodes[best].element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::Metric;
    use crate::timetable::Stop;

    struct CrowFlies;

    impl Metric<Stop> for CrowFlies {
        fn distance(&self, first: &Stop, second: &Stop) -> f64 {
            first.position.distance_m(&second.position)
        }
    }

    /// Plain Euclidean metric over points, for dense randomized checks.
    struct Euclid;

    impl Metric<(f64, f64)> for Euclid {
        fn distance(&self, a: &(f64, f64), b: &(f64, f64)) -> f64 {
            (a.0 - b.0).hypot(a.1 - b.1)
        }
    }

    #[test]
    fn empty_tree_has_no_neighbor() {
        let tree: CoverTree<Stop, CrowFlies> = CoverTree::new(CrowFlies);
        assert!(tree.is_empty());
        assert!(tree.nearest_neighbor(&Stop::new(0, 10.0, 10.0)).is_none());
    }

    #[test]
    fn finds_the_nearer_of_two_stops() {
        let mut tree = CoverTree::new(CrowFlies);
        assert!(tree.insert(Stop::new(1, 10.0, 10.0)));
        assert!(tree.insert(Stop::new(2, 20.0, 20.0)));
        assert_eq!(tree.len(), 2);

        let needle = Stop::new(0, 11.0, 11.0);
        let nearest = tree.nearest_neighbor(&needle).unwrap();
        assert_eq!(nearest.id, 1);

        let other = Stop::new(0, 19.0, 19.5);
        assert_eq!(tree.nearest_neighbor(&other).unwrap().id, 2);
    }

    #[test]
    fn rejects_duplicate_locations() {
        let mut tree = CoverTree::new(CrowFlies);
        assert!(tree.insert(Stop::new(1, 10.0, 10.0)));
        assert!(!tree.insert(Stop::new(2, 10.0, 10.0)));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn matches_linear_scan_on_a_point_cloud() {
        // Deterministic pseudo-random cloud.
        let mut seed = 0x2545_f491_4f6c_dd1d_u64;
        let mut next = || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            (seed >> 11) as f64 / (1_u64 << 53) as f64
        };
        let points: Vec<(f64, f64)> =
            (0..200).map(|_| (next() * 100.0, next() * 100.0)).collect();

        let mut tree = CoverTree::new(Euclid);
        for point in &points {
            tree.insert(*point);
        }

        for _ in 0..20 {
            let needle = (next() * 100.0, next() * 100.0);
            let expected = points
                .iter()
                .map(|p| Euclid.distance(p, &needle))
                .fold(f64::INFINITY, f64::min);
            let found = tree.nearest_neighbor(&needle).unwrap();
            let actual = Euclid.distance(found, &needle);
            assert!(
                (actual - expected).abs() < 1e-9,
                "tree {actual} vs scan {expected}"
            );
        }
    }

    #[test]
    fn handles_far_apart_insertions() {
        let mut tree = CoverTree::new(Euclid);
        assert!(tree.insert((0.0, 0.0)));
        // Forces repeated root raises.
        assert!(tree.insert((10_000.0, 0.0)));
        assert!(tree.insert((1.0, 1.0)));
        assert_eq!(tree.len(), 3);
        let nearest = tree.nearest_neighbor(&(2.0, 2.0)).unwrap();
        assert_eq!(*nearest, (1.0, 1.0));
    }
}
