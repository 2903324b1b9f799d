use eframe::egui::{Vec2, vec2};

pub const NODE_RADIUS: f32 = 34.0;
pub const ARROW_PADDING: f32 = 12.0;
/// Distance between a link's terminal point and its target's center.
pub const ARROW_PULLBACK: f32 = NODE_RADIUS + ARROW_PADDING;

/// Point where a link toward `target` should end so its arrowhead touches the
/// target outline instead of its center. Falls back to `target` when the two
/// points coincide or are closer than `pullback`.
pub fn arrow_terminal(source: Vec2, target: Vec2, pullback: f32) -> Vec2 {
    let delta = target - source;
    let distance = delta.length();
    if !distance.is_finite() || distance <= pullback || distance <= f32::EPSILON {
        return target;
    }

    target - delta * (pullback / distance)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    /// Bounds over the finite points only; `None` when there are none.
    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Option<Self> {
        let mut min = vec2(f32::INFINITY, f32::INFINITY);
        let mut max = vec2(f32::NEG_INFINITY, f32::NEG_INFINITY);

        for point in points {
            if !point.x.is_finite() || !point.y.is_finite() {
                continue;
            }
            min = min.min(point);
            max = max.max(point);
        }

        if !min.x.is_finite() || !min.y.is_finite() || !max.x.is_finite() || !max.y.is_finite() {
            return None;
        }

        Some(Self { min, max })
    }

    pub fn center(self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn span(self) -> Vec2 {
        vec2(
            (self.max.x - self.min.x).max(1.0),
            (self.max.y - self.min.y).max(1.0),
        )
    }
}

pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

pub fn lerp_vec(from: Vec2, to: Vec2, t: f32) -> Vec2 {
    from + (to - from) * t
}
