//! Collision detection and response
//!
//! Axis-aligned boxes for the runners and the snake grid, a circle against
//! walls and a paddle for the ball game.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle, `pos` is the top-left corner (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub pos: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(pos: Vec2, size: Vec2) -> Self {
        Self { pos, size }
    }

    pub fn left(&self) -> f32 {
        self.pos.x
    }

    pub fn right(&self) -> f32 {
        self.pos.x + self.size.x
    }

    pub fn top(&self) -> f32 {
        self.pos.y
    }

    pub fn bottom(&self) -> f32 {
        self.pos.y + self.size.y
    }

    /// Shrink by `by` on every side
    pub fn inset(&self, by: f32) -> Rect {
        Rect::new(self.pos + Vec2::splat(by), self.size - Vec2::splat(2.0 * by))
    }

    /// Strict overlap (touching edges do not count)
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }
}

/// Box overlap after shrinking both boxes by `inset` (forgiving hitboxes)
pub fn aabb_overlap_inset(a: Rect, b: Rect, inset: f32) -> bool {
    a.inset(inset).overlaps(&b.inset(inset))
}

/// One contact between a ball and a surface
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionResult {
    /// Contact point on the surface
    pub point: Vec2,
    /// Surface normal, pointing toward the ball centre
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

/// Every wall a ball touches among the top, left and right walls of a
/// `width` wide field
///
/// Each wall is reported on its own so a corner hit corrects both axes in the
/// same frame. The bottom is open: leaving through it is handled by
/// [`ball_out_of_bounds`].
pub fn ball_wall_collisions(
    ball_pos: Vec2,
    ball_radius: f32,
    width: f32,
) -> impl Iterator<Item = CollisionResult> {
    let top = (ball_pos.y - ball_radius <= 0.0).then(|| CollisionResult {
        point: Vec2::new(ball_pos.x, 0.0),
        normal: Vec2::Y,
        penetration: ball_radius - ball_pos.y,
    });
    let left = (ball_pos.x - ball_radius <= 0.0).then(|| CollisionResult {
        point: Vec2::new(0.0, ball_pos.y),
        normal: Vec2::X,
        penetration: ball_radius - ball_pos.x,
    });
    let right = (ball_pos.x + ball_radius >= width).then(|| CollisionResult {
        point: Vec2::new(width, ball_pos.y),
        normal: Vec2::NEG_X,
        penetration: ball_pos.x + ball_radius - width,
    });
    [top, left, right].into_iter().flatten()
}

/// Ball touches the paddle's top band while its centre is over the paddle
pub fn ball_paddle_contact(ball_pos: Vec2, ball_radius: f32, paddle: &Rect) -> bool {
    ball_pos.x >= paddle.left()
        && ball_pos.x <= paddle.right()
        && ball_pos.y + ball_radius >= paddle.top()
        && ball_pos.y - ball_radius <= paddle.bottom()
}

/// Where along the paddle the ball hit, 0.0 = left edge, 1.0 = right edge
pub fn paddle_hit_position(ball_x: f32, paddle: &Rect) -> f32 {
    ((ball_x - paddle.left()) / paddle.size.x).clamp(0.0, 1.0)
}

/// Velocity after bouncing off the paddle
///
/// The outgoing angle from vertical is `(hit_pos - 0.5) * PI / 2`, so the
/// edges send the ball off at 45 degrees and the centre straight up. Speed
/// grows by `speed_step` up to `speed_cap`; vertical speed never drops below
/// `min_dy`.
pub fn paddle_bounce(vel: Vec2, hit_pos: f32, speed_step: f32, speed_cap: f32, min_dy: f32) -> Vec2 {
    let angle = (hit_pos - 0.5) * std::f32::consts::FRAC_PI_2;
    let speed = (vel.length() + speed_step).min(speed_cap);

    let mut out = Vec2::new(speed * angle.sin(), -speed * angle.cos());
    if out.y.abs() < min_dy {
        out.y = if out.y > 0.0 { min_dy } else { -min_dy };
    }
    out
}

/// Reflect velocity off a surface
///
/// Standard reflection: v' = v - 2(v·n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

/// Ball fully below the bottom edge of the field
pub fn ball_out_of_bounds(ball_pos: Vec2, ball_radius: f32, height: f32) -> bool {
    ball_pos.y - ball_radius > height
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inset_overlap_forgives_grazing() {
        let a = Rect::new(Vec2::new(0.0, 0.0), Vec2::new(40.0, 40.0));
        // Overlaps by 6px horizontally: a hit without inset, a miss with 5px inset
        let b = Rect::new(Vec2::new(34.0, 0.0), Vec2::new(30.0, 40.0));
        assert!(a.overlaps(&b));
        assert!(!aabb_overlap_inset(a, b, 5.0));

        let c = Rect::new(Vec2::new(20.0, 10.0), Vec2::new(30.0, 40.0));
        assert!(aabb_overlap_inset(a, c, 5.0));
    }

    #[test]
    fn test_touching_edges_do_not_overlap() {
        let a = Rect::new(Vec2::ZERO, Vec2::new(10.0, 10.0));
        let b = Rect::new(Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0));
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn test_reflect_velocity() {
        // Ball moving right, hits vertical wall (normal pointing left)
        let velocity = Vec2::new(100.0, 0.0);
        let normal = Vec2::new(-1.0, 0.0);

        let reflected = reflect_velocity(velocity, normal);
        assert!((reflected.x - (-100.0)).abs() < 0.001);
        assert!(reflected.y.abs() < 0.001);
    }

    #[test]
    fn test_wall_collisions() {
        assert_eq!(ball_wall_collisions(Vec2::new(400.0, 300.0), 12.0, 800.0).count(), 0);

        let hits: Vec<_> = ball_wall_collisions(Vec2::new(400.0, 10.0), 12.0, 800.0).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].normal, Vec2::Y);
        assert!((hits[0].penetration - 2.0).abs() < 1e-5);

        let hits: Vec<_> = ball_wall_collisions(Vec2::new(795.0, 300.0), 12.0, 800.0).collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].normal, Vec2::NEG_X);
    }

    #[test]
    fn test_corner_reports_both_walls() {
        let normals: Vec<_> = ball_wall_collisions(Vec2::new(5.0, 8.0), 12.0, 800.0)
            .map(|hit| hit.normal)
            .collect();
        assert_eq!(normals, vec![Vec2::Y, Vec2::X]);
    }

    #[test]
    fn test_centre_hit_goes_straight_up() {
        let out = paddle_bounce(Vec2::new(3.0, 5.0), 0.5, 0.2, 12.5, 2.0);
        assert!(out.x.abs() < 1e-5);
        assert!(out.y < 0.0);
        let expected = Vec2::new(3.0, 5.0).length() + 0.2;
        assert!((out.length() - expected).abs() < 1e-4);
    }

    #[test]
    fn test_edge_hits_leave_at_45_degrees() {
        let left = paddle_bounce(Vec2::new(0.0, 5.0), 0.0, 0.0, 12.5, 2.0);
        assert!(left.x < 0.0 && left.y < 0.0);
        assert!((left.x.abs() - left.y.abs()).abs() < 1e-4);

        let right = paddle_bounce(Vec2::new(0.0, 5.0), 1.0, 0.0, 12.5, 2.0);
        assert!(right.x > 0.0 && right.y < 0.0);
    }

    #[test]
    fn test_bounce_speed_is_capped() {
        let out = paddle_bounce(Vec2::new(0.0, 12.4), 0.5, 0.2, 12.5, 2.0);
        assert!((out.length() - 12.5).abs() < 1e-4);
    }

    #[test]
    fn test_paddle_contact_and_out_of_bounds() {
        let paddle = Rect::new(Vec2::new(340.0, 560.0), Vec2::new(120.0, 15.0));
        assert!(ball_paddle_contact(Vec2::new(400.0, 550.0), 12.0, &paddle));
        assert!(!ball_paddle_contact(Vec2::new(300.0, 550.0), 12.0, &paddle));
        assert!((paddle_hit_position(400.0, &paddle) - 0.5).abs() < 1e-6);

        assert!(!ball_out_of_bounds(Vec2::new(400.0, 605.0), 12.0, 600.0));
        assert!(ball_out_of_bounds(Vec2::new(400.0, 613.0), 12.0, 600.0));
    }
}
