//! 2D vector math, rectangles, circles, oriented bounding boxes, and the
//! overlap predicates the ocean simulator runs every tick.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn add(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }

    pub fn mul(self, s: f32) -> Vec2 {
        Vec2::new(self.x * s, self.y * s)
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn length_sq(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Zero vectors normalize to zero rather than NaN.
    pub fn normalize(self) -> Vec2 {
        let len = self.length();
        if len < 1e-6 {
            Vec2::ZERO
        } else {
            self.mul(1.0 / len)
        }
    }

    pub fn distance(self, other: Vec2) -> f32 {
        self.sub(other).length()
    }

    pub fn distance_sq(self, other: Vec2) -> f32 {
        self.sub(other).length_sq()
    }
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn lerp_vec2(a: Vec2, b: Vec2, t: f32) -> Vec2 {
    Vec2::new(lerp(a.x, b.x, t), lerp(a.y, b.y, t))
}

pub fn clamp(v: f32, min: f32, max: f32) -> f32 {
    v.max(min).min(max)
}

/// Wraps an angle into `(-pi, pi]`.
pub fn wrap_angle(a: f32) -> f32 {
    use std::f32::consts::PI;
    let two_pi = std::f32::consts::TAU;
    let mut wrapped = a % two_pi;
    if wrapped <= -PI {
        wrapped += two_pi;
    } else if wrapped > PI {
        wrapped -= two_pi;
    }
    wrapped
}

/// Axis-aligned world bounds, e.g. the ocean rectangle [0,W]x[0,H].
#[derive(Debug, Clone, Copy)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x <= self.x + self.w && p.y >= self.y && p.y <= self.y + self.h
    }

    /// Does this rect intersect a circle (used by the quadtree to decide
    /// whether to descend into a quadrant)?
    pub fn intersects_circle(&self, center: Vec2, radius: f32) -> bool {
        let closest_x = clamp(center.x, self.x, self.x + self.w);
        let closest_y = clamp(center.y, self.y, self.y + self.h);
        let dx = center.x - closest_x;
        let dy = center.y - closest_y;
        dx * dx + dy * dy <= radius * radius
    }

    pub fn quadrants(&self) -> [Rect; 4] {
        let hw = self.w / 2.0;
        let hh = self.h / 2.0;
        [
            Rect::new(self.x, self.y, hw, hh),
            Rect::new(self.x + hw, self.y, hw, hh),
            Rect::new(self.x, self.y + hh, hw, hh),
            Rect::new(self.x + hw, self.y + hh, hw, hh),
        ]
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

impl Circle {
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }
}

/// Oriented bounding box: center, half-extents, and rotation in radians.
#[derive(Debug, Clone, Copy)]
pub struct Obb {
    pub center: Vec2,
    pub half_extents: Vec2,
    pub rotation: f32,
}

impl Obb {
    pub fn new(center: Vec2, half_extents: Vec2, rotation: f32) -> Self {
        Self {
            center,
            half_extents,
            rotation,
        }
    }
}

/// Circle-circle overlap: distance^2 < (r1+r2)^2.
pub fn circle_overlaps_circle(a: Circle, b: Circle) -> bool {
    let r = a.radius + b.radius;
    a.center.distance_sq(b.center) < r * r
}

/// Circle-OBB overlap: transform the circle center into the OBB's local
/// frame by rotating by -theta, clamp to the half-extents, and re-measure
/// the distance against the radius.
pub fn circle_overlaps_obb(c: Circle, o: Obb) -> bool {
    let d = c.center.sub(o.center);
    let cos_t = o.rotation.cos();
    let sin_t = o.rotation.sin();
    // rotate by -theta
    let local_x = d.x * cos_t + d.y * sin_t;
    let local_y = -d.x * sin_t + d.y * cos_t;

    let clamped_x = clamp(local_x, -o.half_extents.x, o.half_extents.x);
    let clamped_y = clamp(local_y, -o.half_extents.y, o.half_extents.y);

    let dx = local_x - clamped_x;
    let dy = local_y - clamped_y;
    dx * dx + dy * dy < c.radius * c.radius
}

/// Simplified OBB-OBB overlap (see DESIGN.md for the approximation this
/// follows): treat each box as a circle of radius (w1+w2)/2 centered on
/// its own center. Returns whether they overlap and the unit separation
/// vector pointing from `a` to `b` (arbitrarily (1,0) when the centers
/// coincide).
pub fn obb_overlaps_obb(a: Obb, b: Obb) -> (bool, Vec2) {
    let w1 = a.half_extents.x * 2.0;
    let w2 = b.half_extents.x * 2.0;
    let radius = (w1 + w2) / 2.0;

    let delta = b.center.sub(a.center);
    let dist_sq = delta.length_sq();

    if dist_sq < radius * radius {
        let sep = if dist_sq < 1e-12 {
            Vec2::new(1.0, 0.0)
        } else {
            delta.normalize()
        };
        (true, sep)
    } else {
        (false, Vec2::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn normalize_zero_vector_stays_zero() {
        assert_eq!(Vec2::ZERO.normalize(), Vec2::ZERO);
    }

    #[test]
    fn normalize_unit_length() {
        let v = Vec2::new(3.0, 4.0).normalize();
        assert!((v.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn circle_circle_overlap() {
        let a = Circle::new(Vec2::new(0.0, 0.0), 5.0);
        let b = Circle::new(Vec2::new(8.0, 0.0), 4.0);
        assert!(circle_overlaps_circle(a, b));
        let c = Circle::new(Vec2::new(20.0, 0.0), 4.0);
        assert!(!circle_overlaps_circle(a, c));
    }

    #[test]
    fn circle_obb_overlap_axis_aligned() {
        let obb = Obb::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 5.0), 0.0);
        let inside = Circle::new(Vec2::new(9.0, 4.0), 1.0);
        assert!(circle_overlaps_obb(inside, obb));
        let outside = Circle::new(Vec2::new(50.0, 50.0), 1.0);
        assert!(!circle_overlaps_obb(outside, obb));
    }

    #[test]
    fn circle_obb_overlap_rotated() {
        // A box rotated 90 degrees swaps its effective width/height footprint.
        let obb = Obb::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 2.0), PI / 2.0);
        // In world space this rotated box now extends ~2 along x and ~10 along y.
        let hit = Circle::new(Vec2::new(0.0, 9.0), 1.0);
        assert!(circle_overlaps_obb(hit, obb));
        let miss = Circle::new(Vec2::new(9.0, 0.0), 1.0);
        assert!(!circle_overlaps_obb(miss, obb));
    }

    #[test]
    fn obb_obb_overlap_and_separation() {
        let a = Obb::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 5.0), 0.0);
        let b = Obb::new(Vec2::new(5.0, 0.0), Vec2::new(10.0, 5.0), 0.0);
        let (hit, sep) = obb_overlaps_obb(a, b);
        assert!(hit);
        assert!(sep.x > 0.0);

        let c = Obb::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 5.0), 0.0);
        let same = Obb::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 5.0), 0.0);
        let (hit2, sep2) = obb_overlaps_obb(c, same);
        assert!(hit2);
        assert_eq!(sep2, Vec2::new(1.0, 0.0));
    }
}
