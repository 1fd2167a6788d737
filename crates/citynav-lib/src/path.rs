//! Route representation.
//!
//! A path is either the empty route from a node to itself, or a non-empty
//! sequence of edge segments. Searches that settle parent pointers build the
//! segment list destination-first; the path remembers that orientation and
//! iterates in travel order either way, so reconstruction never has to
//! reverse a vector.

use serde::{Deserialize, Serialize};

use crate::graph::{Edge, NodeId};

/// One edge of a route together with the cost actually paid for it, which
/// can differ from the edge's base cost when a module adjusted it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    pub edge: Edge,
    pub cost: f64,
}

impl PathSegment {
    pub fn new(edge: Edge, cost: f64) -> Self {
        Self { edge, cost }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Repr {
    Empty {
        node: NodeId,
    },
    Segments {
        /// Non-empty; when `reversed` the last segment is the first hop.
        segments: Vec<PathSegment>,
        reversed: bool,
        total_cost: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    repr: Repr,
}

impl Path {
    /// The zero-cost route from `node` to itself.
    pub fn empty(node: NodeId) -> Self {
        Self {
            repr: Repr::Empty { node },
        }
    }

    /// Builds a path from segments, `None` if the slice is empty. Pass
    /// `reversed` when the segments were collected destination-first.
    pub fn from_segments(segments: Vec<PathSegment>, reversed: bool) -> Option<Self> {
        if segments.is_empty() {
            return None;
        }
        let total_cost = segments.iter().map(|segment| segment.cost).sum();
        Some(Self {
            repr: Repr::Segments {
                segments,
                reversed,
                total_cost,
            },
        })
    }

    pub fn source(&self) -> NodeId {
        match &self.repr {
            Repr::Empty { node } => *node,
            Repr::Segments {
                segments, reversed, ..
            } => {
                let first = if *reversed { segments.len() - 1 } else { 0 };
                segments[first].edge.source
            }
        }
    }

    pub fn destination(&self) -> NodeId {
        match &self.repr {
            Repr::Empty { node } => *node,
            Repr::Segments {
                segments, reversed, ..
            } => {
                let last = if *reversed { 0 } else { segments.len() - 1 };
                segments[last].edge.destination
            }
        }
    }

    pub fn total_cost(&self) -> f64 {
        match &self.repr {
            Repr::Empty { .. } => 0.0,
            Repr::Segments { total_cost, .. } => *total_cost,
        }
    }

    /// Number of edges on the route.
    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Empty { .. } => 0,
            Repr::Segments { segments, .. } => segments.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Segments in travel order, source first.
    pub fn iter(&self) -> PathIter<'_> {
        match &self.repr {
            Repr::Empty { .. } => PathIter::Done,
            Repr::Segments {
                segments, reversed, ..
            } => {
                if *reversed {
                    PathIter::Backward(segments.iter().rev())
                } else {
                    PathIter::Forward(segments.iter())
                }
            }
        }
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a PathSegment;
    type IntoIter = PathIter<'a>;

    fn into_iter(self) -> PathIter<'a> {
        self.iter()
    }
}

pub enum PathIter<'a> {
    Done,
    Forward(std::slice::Iter<'a, PathSegment>),
    Backward(std::iter::Rev<std::slice::Iter<'a, PathSegment>>),
}

impl<'a> Iterator for PathIter<'a> {
    type Item = &'a PathSegment;

    fn next(&mut self) -> Option<&'a PathSegment> {
        match self {
            PathIter::Done => None,
            PathIter::Forward(iter) => iter.next(),
            PathIter::Backward(iter) => iter.next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Edge;
    use approx::assert_relative_eq;

    fn segment(id: usize, source: NodeId, destination: NodeId, cost: f64) -> PathSegment {
        PathSegment::new(Edge::road(id, source, destination, cost), cost)
    }

    #[test]
    fn empty_path_starts_and_ends_at_its_node() {
        let path = Path::empty(7);
        assert_eq!(path.source(), 7);
        assert_eq!(path.destination(), 7);
        assert_eq!(path.len(), 0);
        assert!(path.is_empty());
        assert_relative_eq!(path.total_cost(), 0.0);
        assert!(path.iter().next().is_none());
    }

    #[test]
    fn from_segments_rejects_empty_input() {
        assert!(Path::from_segments(Vec::new(), false).is_none());
    }

    #[test]
    fn forward_path_iterates_in_insertion_order() {
        let path =
            Path::from_segments(vec![segment(0, 1, 2, 2.0), segment(1, 2, 3, 3.0)], false)
                .unwrap();
        assert_eq!(path.source(), 1);
        assert_eq!(path.destination(), 3);
        assert_relative_eq!(path.total_cost(), 5.0);
        let order: Vec<_> = path.iter().map(|s| s.edge.id).collect();
        assert_eq!(order, vec![0, 1]);
    }

    #[test]
    fn reverse_built_path_iterates_in_travel_order() {
        // Collected destination-first, as parent-pointer walks produce.
        let path =
            Path::from_segments(vec![segment(1, 2, 3, 3.0), segment(0, 1, 2, 2.0)], true)
                .unwrap();
        assert_eq!(path.source(), 1);
        assert_eq!(path.destination(), 3);
        assert_relative_eq!(path.total_cost(), 5.0);
        let order: Vec<_> = path.iter().map(|s| s.edge.id).collect();
        assert_eq!(order, vec![0, 1]);
    }
}
