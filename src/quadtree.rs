//! Quadtree spatial index for efficient viewport-range queries
//!
//! Nodes live in an arena `Vec` addressed by integer handles instead of owned
//! recursive boxes, which keeps bulk rebuild-and-swap cheap and avoids deep
//! drop recursion. A node holds points directly until it exceeds
//! `max_points_per_node`, then subdivides into four equal quadrants and
//! redistributes; subdivision is permanent. Depth is capped by `max_depth`:
//! at the cap a node keeps accepting points without subdividing, so fully
//! coincident point sets degrade to a bounded overflow rather than an error.

use crate::Point;
use crate::geom::{rect_contains, rects_intersect};
use geo::{Coord, Rect};

/// Handle into the node arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeId(u32);

const ROOT: NodeId = NodeId(0);

/// Quadtree tuning parameters
#[derive(Debug, Clone)]
pub struct QuadtreeConfig {
    /// Points a node holds before it subdivides
    pub max_points_per_node: usize,
    /// Maximum subdivision depth; nodes at the cap overflow instead
    pub max_depth: u32,
}

impl Default for QuadtreeConfig {
    fn default() -> Self {
        Self {
            max_points_per_node: 64,
            max_depth: 16,
        }
    }
}

/// A single node in the arena
#[derive(Debug, Clone)]
struct QuadNode {
    bounds: Rect<f64>,
    depth: u32,
    points: Vec<Point>,
    /// Child handles in NE, NW, SE, SW order, if subdivided
    children: Option<[NodeId; 4]>,
}

impl QuadNode {
    fn new(bounds: Rect<f64>, depth: u32) -> Self {
        Self {
            bounds,
            depth,
            points: Vec::new(),
            children: None,
        }
    }
}

/// Region quadtree over a fixed root rectangle
///
/// Built fresh per dataset version and never mutated across versions; callers
/// swap in a fully built tree rather than updating one in place.
#[derive(Debug, Clone)]
pub struct Quadtree {
    nodes: Vec<QuadNode>,
    config: QuadtreeConfig,
    len: usize,
}

impl Quadtree {
    /// Create an empty index covering `bounds`
    pub fn new(bounds: Rect<f64>, config: QuadtreeConfig) -> Self {
        Self {
            nodes: vec![QuadNode::new(bounds, 0)],
            config,
            len: 0,
        }
    }

    /// Insert a point
    ///
    /// Returns `false` (without inserting) if the point lies outside the root
    /// bounds. This is an expected occurrence, not an error; the caller
    /// decides whether to rebuild with larger bounds or drop the point.
    pub fn insert(&mut self, point: Point) -> bool {
        if !rect_contains(&self.nodes[ROOT.0 as usize].bounds, point.position) {
            return false;
        }

        let mut id = ROOT;
        loop {
            let node = &self.nodes[id.0 as usize];

            if let Some(children) = node.children {
                id = children[child_index(&node.bounds, point.position)];
                continue;
            }

            if node.points.len() < self.config.max_points_per_node
                || node.depth >= self.config.max_depth
            {
                self.nodes[id.0 as usize].points.push(point);
                self.len += 1;
                return true;
            }

            self.subdivide(id);
        }
    }

    /// Query all points inside `range`
    ///
    /// Recurses into children only when their bounds intersect the range
    /// (branch-and-bound pruning). Result order follows arena traversal order
    /// and is deterministic for a given tree and range.
    pub fn query(&self, range: &Rect<f64>) -> Vec<&Point> {
        let mut results = Vec::new();
        self.collect(ROOT, range, &mut results);
        results
    }

    /// Number of points held by the index
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of arena nodes, for observability
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Root bounds of the index
    #[inline]
    pub fn bounds(&self) -> Rect<f64> {
        self.nodes[ROOT.0 as usize].bounds
    }

    fn collect<'a>(&'a self, id: NodeId, range: &Rect<f64>, results: &mut Vec<&'a Point>) {
        let node = &self.nodes[id.0 as usize];
        if !rects_intersect(&node.bounds, range) {
            return;
        }

        for point in &node.points {
            if rect_contains(range, point.position) {
                results.push(point);
            }
        }

        if let Some(children) = node.children {
            for child in children {
                self.collect(child, range, results);
            }
        }
    }

    /// Split a leaf into four equal quadrants and redistribute its points
    fn subdivide(&mut self, id: NodeId) {
        let (bounds, depth) = {
            let node = &self.nodes[id.0 as usize];
            debug_assert!(node.children.is_none());
            (node.bounds, node.depth)
        };

        let (min, max) = (bounds.min(), bounds.max());
        let mid = Coord {
            x: (min.x + max.x) / 2.0,
            y: (min.y + max.y) / 2.0,
        };
        let child_depth = depth + 1;

        // NE, NW, SE, SW
        let quadrants = [
            Rect::new(mid, max),
            Rect::new(Coord { x: min.x, y: mid.y }, Coord { x: mid.x, y: max.y }),
            Rect::new(Coord { x: mid.x, y: min.y }, Coord { x: max.x, y: mid.y }),
            Rect::new(min, mid),
        ];

        let base = self.nodes.len() as u32;
        for quadrant in quadrants {
            self.nodes.push(QuadNode::new(quadrant, child_depth));
        }
        let children = [
            NodeId(base),
            NodeId(base + 1),
            NodeId(base + 2),
            NodeId(base + 3),
        ];

        let points = std::mem::take(&mut self.nodes[id.0 as usize].points);
        self.nodes[id.0 as usize].children = Some(children);

        for point in points {
            let child = children[child_index(&bounds, point.position)];
            self.nodes[child.0 as usize].points.push(point);
        }
    }
}

/// Map a coordinate to the child quadrant holding it
///
/// Membership is half-open: a point on a quadrant midline belongs to the
/// east/north side (inclusive lower bound, exclusive upper bound), so every
/// coordinate maps to exactly one of NE, NW, SE, SW.
#[inline(always)]
fn child_index(bounds: &Rect<f64>, coord: Coord<f64>) -> usize {
    let (min, max) = (bounds.min(), bounds.max());
    let east = coord.x >= (min.x + max.x) / 2.0;
    let north = coord.y >= (min.y + max.y) / 2.0;
    match (east, north) {
        (true, true) => 0,   // NE
        (false, true) => 1,  // NW
        (true, false) => 2,  // SE
        (false, false) => 3, // SW
    }
}
