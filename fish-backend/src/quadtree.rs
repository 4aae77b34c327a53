//! Capacity-4 quadtree rebuilt from scratch every simulation tick.
//!
//! Not `Sync`: it is built and queried synchronously inside a single
//! ocean tick, never shared across tasks, so there is no locking
//! overhead and no stale-frame hazard. Generic over the stored key so
//! callers can index into their own entity snapshot (players are keyed
//! by string id; a plain `u64`/`usize` key keeps the tree itself `Copy`).
//!
//! Each point also carries its own `radius`; `query_circle` matches a
//! point when its position lies within `radius + point.radius` of the
//! query center, per the stated contract. Each node additionally tracks
//! the largest radius inserted anywhere beneath it, so pruning a subtree
//! during a query bloats the node's bounds check by that same margin
//! instead of only the query radius.

use crate::geometry::{Rect, Vec2};

const CAPACITY: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct QuadPoint<K> {
    pub id: K,
    pub pos: Vec2,
    pub radius: f32,
}

enum Node<K> {
    Leaf(Vec<QuadPoint<K>>),
    Split(Box<[QuadTree<K>; 4]>),
}

pub struct QuadTree<K> {
    bounds: Rect,
    node: Node<K>,
    max_radius: f32,
}

impl<K: Copy> QuadTree<K> {
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            node: Node::Leaf(Vec::new()),
            max_radius: 0.0,
        }
    }

    pub fn insert(&mut self, point: QuadPoint<K>) {
        if !self.bounds.contains(point.pos) {
            return;
        }
        self.max_radius = self.max_radius.max(point.radius);
        match &mut self.node {
            Node::Leaf(points) => {
                if points.len() < CAPACITY {
                    points.push(point);
                } else {
                    self.split_and_insert(point);
                }
            }
            Node::Split(children) => {
                for child in children.iter_mut() {
                    if child.bounds.contains(point.pos) {
                        child.insert(point);
                        return;
                    }
                }
            }
        }
    }

    fn split_and_insert(&mut self, point: QuadPoint<K>) {
        let existing = match std::mem::replace(&mut self.node, Node::Leaf(Vec::new())) {
            Node::Leaf(points) => points,
            Node::Split(_) => unreachable!(),
        };

        let [r0, r1, r2, r3] = self.bounds.quadrants();
        let mut children = Box::new([
            QuadTree::new(r0),
            QuadTree::new(r1),
            QuadTree::new(r2),
            QuadTree::new(r3),
        ]);

        for p in existing.into_iter().chain(std::iter::once(point)) {
            for child in children.iter_mut() {
                if child.bounds.contains(p.pos) {
                    child.insert(p);
                    break;
                }
            }
        }

        self.node = Node::Split(children);
    }

    /// Collect every point whose position lies within `radius +
    /// point.radius` of `center`, pruning subtrees whose bounds don't
    /// intersect the query circle bloated by the subtree's largest
    /// stored radius.
    pub fn query_circle(&self, center: Vec2, radius: f32, out: &mut Vec<QuadPoint<K>>) {
        if !self.bounds.intersects_circle(center, radius + self.max_radius) {
            return;
        }
        match &self.node {
            Node::Leaf(points) => {
                for p in points {
                    let reach = radius + p.radius;
                    if p.pos.distance_sq(center) <= reach * reach {
                        out.push(*p);
                    }
                }
            }
            Node::Split(children) => {
                for child in children.iter() {
                    child.query_circle(center, radius, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> Rect {
        Rect::new(0.0, 0.0, 1000.0, 1000.0)
    }

    #[test]
    fn empty_tree_returns_nothing() {
        let tree: QuadTree<u64> = QuadTree::new(world());
        let mut out = Vec::new();
        tree.query_circle(Vec2::new(500.0, 500.0), 50.0, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn finds_points_within_radius_and_excludes_far_ones() {
        let mut tree = QuadTree::new(world());
        tree.insert(QuadPoint {
            id: 1u64,
            pos: Vec2::new(100.0, 100.0),
            radius: 0.0,
        });
        tree.insert(QuadPoint {
            id: 2u64,
            pos: Vec2::new(900.0, 900.0),
            radius: 0.0,
        });

        let mut out = Vec::new();
        tree.query_circle(Vec2::new(100.0, 100.0), 10.0, &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, 1);
    }

    #[test]
    fn splits_beyond_capacity_and_still_finds_all_matches() {
        let mut tree = QuadTree::new(world());
        for i in 0..20u64 {
            tree.insert(QuadPoint {
                id: i,
                pos: Vec2::new(50.0 + i as f32, 50.0),
                radius: 0.0,
            });
        }
        let mut out = Vec::new();
        tree.query_circle(Vec2::new(55.0, 50.0), 100.0, &mut out);
        assert_eq!(out.len(), 20);
    }

    #[test]
    fn points_outside_bounds_are_dropped() {
        let mut tree = QuadTree::new(world());
        tree.insert(QuadPoint {
            id: 1u64,
            pos: Vec2::new(-10.0, 500.0),
            radius: 0.0,
        });
        let mut out = Vec::new();
        tree.query_circle(Vec2::new(0.0, 500.0), 1000.0, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn point_radius_extends_the_match_beyond_the_query_radius() {
        let mut tree = QuadTree::new(world());
        // Stored 20 units past where a zero-radius query of 10 would reach.
        tree.insert(QuadPoint {
            id: 1u64,
            pos: Vec2::new(130.0, 100.0),
            radius: 20.0,
        });
        let mut out = Vec::new();
        tree.query_circle(Vec2::new(100.0, 100.0), 10.0, &mut out);
        assert_eq!(out.len(), 1);
    }
}
