use eframe::egui::{Vec2, vec2};
use tracing::trace;

use crate::geometry::{Bounds, ease_in_out_cubic, lerp_vec};

pub(in crate::app) const FIT_PADDING: f32 = 160.0;
pub(in crate::app) const FIT_SCALE_MIN: f32 = 0.35;
pub(in crate::app) const FIT_SCALE_MAX: f32 = 2.6;
pub(in crate::app) const ZOOM_MIN: f32 = 0.35;
pub(in crate::app) const ZOOM_MAX: f32 = 2.75;
const DEFAULT_FIT_DURATION_SECS: f32 = 0.52;

/// Pan/zoom applied to world positions: `screen = world * scale + translate`,
/// relative to the surface's top-left corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct Transform {
    pub translate: Vec2,
    pub scale: f32,
}

impl Transform {
    pub(in crate::app) const IDENTITY: Self = Self {
        translate: Vec2::ZERO,
        scale: 1.0,
    };

    pub(in crate::app) fn apply(self, world: Vec2) -> Vec2 {
        world * self.scale + self.translate
    }

    pub(in crate::app) fn invert(self, screen: Vec2) -> Vec2 {
        (screen - self.translate) / self.scale
    }

    fn lerp(self, to: Self, t: f32) -> Self {
        Self {
            translate: lerp_vec(self.translate, to.translate, t),
            scale: self.scale + (to.scale - self.scale) * t,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(in crate::app) struct FitOptions {
    pub animation: bool,
    /// Seconds; defaults to 0.52 when animating.
    pub duration: Option<f32>,
}

impl FitOptions {
    pub(in crate::app) const INSTANT: Self = Self {
        animation: false,
        duration: None,
    };

    pub(in crate::app) const ANIMATED: Self = Self {
        animation: true,
        duration: None,
    };
}

/// Transform that frames `positions` inside a `viewport`-sized surface, or
/// `None` when no position is finite.
pub(in crate::app) fn compute_fit(
    positions: impl IntoIterator<Item = Vec2>,
    viewport: Vec2,
) -> Option<Transform> {
    let bounds = Bounds::from_points(positions)?;
    let span = bounds.span();

    let scale_x = (viewport.x - FIT_PADDING) / span.x;
    let scale_y = (viewport.y - FIT_PADDING) / span.y;
    let scale = scale_x.min(scale_y);
    let scale = if scale.is_finite() {
        scale.clamp(FIT_SCALE_MIN, FIT_SCALE_MAX)
    } else {
        FIT_SCALE_MIN
    };

    Some(Transform {
        translate: viewport * 0.5 - bounds.center() * scale,
        scale,
    })
}

#[derive(Clone, Copy, Debug)]
struct Transition {
    from: Transform,
    to: Transform,
    started_at: f64,
    duration: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) enum FitDue {
    /// Skips the frame that scheduled it.
    NextFrame,
    At(f64),
}

#[derive(Clone, Copy, Debug)]
struct PendingFit {
    due: FitDue,
    /// Set once a frame has passed over a `NextFrame` fit.
    skipped: bool,
    options: FitOptions,
}

/// Owns the pan/zoom transform of one graph surface. Never touches node
/// positions.
pub(in crate::app) struct ViewportController {
    transform: Transform,
    size: Vec2,
    transition: Option<Transition>,
    pending_fit: Option<PendingFit>,
}

impl ViewportController {
    pub(in crate::app) fn new() -> Self {
        Self {
            transform: Transform::IDENTITY,
            size: Vec2::ZERO,
            transition: None,
            pending_fit: None,
        }
    }

    pub(in crate::app) fn transform(&self) -> Transform {
        self.transform
    }

    pub(in crate::app) fn is_animating(&self) -> bool {
        self.transition.is_some()
    }

    pub(in crate::app) fn has_pending_fit(&self) -> bool {
        self.pending_fit.is_some()
    }

    pub(in crate::app) fn observe_size(&mut self, size: Vec2) -> bool {
        if !size.x.is_finite() || !size.y.is_finite() || size == self.size {
            return false;
        }
        trace!(width = size.x, height = size.y, "surface resized");
        self.size = size;
        true
    }

    pub(in crate::app) fn fit(
        &mut self,
        positions: impl IntoIterator<Item = Vec2>,
        options: FitOptions,
        now: f64,
    ) -> bool {
        let Some(target) = compute_fit(positions, self.size) else {
            return false;
        };

        let duration = options
            .duration
            .unwrap_or(DEFAULT_FIT_DURATION_SECS)
            .max(0.0);
        if options.animation && duration > 0.0 {
            self.transition = Some(Transition {
                from: self.transform,
                to: target,
                started_at: now,
                duration: f64::from(duration),
            });
        } else {
            self.transition = None;
            self.transform = target;
        }
        true
    }

    pub(in crate::app) fn schedule_fit(&mut self, due: FitDue, options: FitOptions) {
        self.pending_fit = Some(PendingFit {
            due,
            skipped: false,
            options,
        });
    }

    /// Hands out the pending fit once it is due. Called once per frame.
    pub(in crate::app) fn take_due_fit(&mut self, now: f64) -> Option<FitOptions> {
        let pending = self.pending_fit.as_mut()?;
        match pending.due {
            FitDue::NextFrame if !pending.skipped => {
                pending.skipped = true;
                return None;
            }
            FitDue::At(due_at) if now < due_at => return None,
            _ => {}
        }
        self.pending_fit.take().map(|pending| pending.options)
    }

    pub(in crate::app) fn seconds_until_due(&self, now: f64) -> Option<f64> {
        self.pending_fit.map(|pending| match pending.due {
            FitDue::NextFrame => 0.0,
            FitDue::At(due_at) => (due_at - now).max(0.0),
        })
    }

    pub(in crate::app) fn advance(&mut self, now: f64) -> bool {
        let Some(transition) = self.transition else {
            return false;
        };

        let progress = ((now - transition.started_at) / transition.duration).clamp(0.0, 1.0);
        let eased = ease_in_out_cubic(progress as f32);
        self.transform = transition.from.lerp(transition.to, eased);

        if progress >= 1.0 {
            self.transform = transition.to;
            self.transition = None;
            return false;
        }
        true
    }

    /// Zooms by `factor` keeping the world point under `anchor` fixed.
    pub(in crate::app) fn zoom_at(&mut self, anchor: Vec2, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        self.transition = None;

        let world = self.transform.invert(anchor);
        let scale = (self.transform.scale * factor).clamp(ZOOM_MIN, ZOOM_MAX);
        self.transform = Transform {
            translate: anchor - world * scale,
            scale,
        };
    }

    pub(in crate::app) fn pan_by(&mut self, delta: Vec2) {
        if !delta.x.is_finite() || !delta.y.is_finite() {
            return;
        }
        self.transition = None;
        self.transform.translate += delta;
    }

    pub(in crate::app) fn clear_pending(&mut self) {
        self.transition = None;
        self.pending_fit = None;
    }

    pub(in crate::app) fn center(&self) -> Vec2 {
        vec2(self.size.x * 0.5, self.size.y * 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(size: Vec2) -> ViewportController {
        let mut controller = ViewportController::new();
        controller.observe_size(size);
        controller
    }

    #[test]
    fn fit_frames_bounding_box_center() {
        let positions = [vec2(0.0, 0.0), vec2(400.0, 200.0)];
        let transform = compute_fit(positions, vec2(960.0, 560.0)).unwrap();

        // (960 - 160) / 400 = 2.0, (560 - 160) / 200 = 2.0
        assert!((transform.scale - 2.0).abs() < 1e-5);
        let center = transform.apply(vec2(200.0, 100.0));
        assert!((center - vec2(480.0, 280.0)).length() < 1e-3);
    }

    #[test]
    fn fit_uses_the_tighter_axis() {
        let positions = [vec2(-500.0, 0.0), vec2(500.0, 10.0)];
        let transform = compute_fit(positions, vec2(1160.0, 900.0)).unwrap();
        assert!((transform.scale - 1.0).abs() < 1e-5);
    }

    #[test]
    fn fit_scale_stays_in_bounds() {
        let viewports = [vec2(1.0, 1.0), vec2(120.0, 4000.0), vec2(3000.0, 2000.0)];
        let layouts = [
            vec![vec2(0.0, 0.0)],
            vec![vec2(0.0, 0.0), vec2(1.0, 1.0)],
            vec![vec2(-90_000.0, 0.0), vec2(90_000.0, 40.0)],
            vec![vec2(10.0, 10.0), vec2(12.0, 600.0), vec2(-300.0, 5.0)],
        ];

        for viewport in viewports {
            for layout in &layouts {
                let transform = compute_fit(layout.iter().copied(), viewport).unwrap();
                assert!(
                    (FIT_SCALE_MIN..=FIT_SCALE_MAX).contains(&transform.scale),
                    "{viewport:?} {layout:?} -> {}",
                    transform.scale
                );
            }
        }
    }

    #[test]
    fn fit_without_finite_positions_is_a_no_op() {
        let mut controller = controller(vec2(800.0, 600.0));
        controller.pan_by(vec2(12.0, -4.0));
        let before = controller.transform();

        assert!(!controller.fit(std::iter::empty::<Vec2>(), FitOptions::INSTANT, 0.0));
        assert!(!controller.fit([vec2(f32::NAN, 1.0)], FitOptions::INSTANT, 0.0));
        assert_eq!(controller.transform(), before);
    }

    #[test]
    fn fit_is_idempotent() {
        let positions = [vec2(30.0, -20.0), vec2(250.0, 410.0), vec2(-75.0, 90.0)];
        let mut controller = controller(vec2(1024.0, 768.0));

        controller.fit(positions, FitOptions::INSTANT, 1.0);
        let first = controller.transform();
        controller.fit(positions, FitOptions::INSTANT, 2.0);

        assert_eq!(controller.transform(), first);
    }

    #[test]
    fn animated_fit_eases_to_target() {
        let positions = [vec2(0.0, 0.0), vec2(400.0, 200.0)];
        let target = compute_fit(positions, vec2(960.0, 560.0)).unwrap();
        let mut controller = controller(vec2(960.0, 560.0));

        controller.fit(positions, FitOptions::ANIMATED, 10.0);
        assert_eq!(controller.transform(), Transform::IDENTITY);
        assert!(controller.is_animating());

        assert!(controller.advance(10.26));
        let halfway = controller.transform();
        assert!(halfway.scale > 1.0 && halfway.scale < target.scale);

        assert!(!controller.advance(10.6));
        assert_eq!(controller.transform(), target);
        assert!(!controller.is_animating());
    }

    #[test]
    fn zoom_is_clamped_and_keeps_anchor() {
        let mut controller = controller(vec2(800.0, 600.0));
        let anchor = vec2(300.0, 200.0);
        let world = controller.transform().invert(anchor);

        controller.zoom_at(anchor, 1.5);
        let after = controller.transform();
        assert!((after.apply(world) - anchor).length() < 1e-3);

        for _ in 0..20 {
            controller.zoom_at(anchor, 1.5);
        }
        assert_eq!(controller.transform().scale, ZOOM_MAX);

        for _ in 0..40 {
            controller.zoom_at(anchor, 0.5);
        }
        assert_eq!(controller.transform().scale, ZOOM_MIN);
    }

    #[test]
    fn pending_fit_waits_until_due() {
        let mut controller = controller(vec2(800.0, 600.0));
        controller.schedule_fit(FitDue::At(5.12), FitOptions::ANIMATED);

        assert_eq!(controller.take_due_fit(5.0), None);
        assert!(controller.has_pending_fit());
        assert_eq!(controller.take_due_fit(5.2), Some(FitOptions::ANIMATED));
        assert!(!controller.has_pending_fit());

    }

    #[test]
    fn next_frame_fit_skips_the_scheduling_frame() {
        let mut controller = controller(vec2(800.0, 600.0));
        controller.schedule_fit(FitDue::NextFrame, FitOptions::INSTANT);

        assert_eq!(controller.seconds_until_due(3.0), Some(0.0));
        assert_eq!(controller.take_due_fit(3.0), None);
        assert!(controller.has_pending_fit());
        assert_eq!(controller.take_due_fit(3.0), Some(FitOptions::INSTANT));
        assert!(!controller.has_pending_fit());
    }

    #[test]
    fn observe_size_reports_changes_only() {
        let mut controller = ViewportController::new();
        assert!(controller.observe_size(vec2(640.0, 480.0)));
        assert!(!controller.observe_size(vec2(640.0, 480.0)));
        assert_eq!(controller.center(), vec2(320.0, 240.0));
    }

    #[test]
    fn manual_interaction_cancels_animation() {
        let mut controller = controller(vec2(800.0, 600.0));
        controller.fit([vec2(0.0, 0.0), vec2(50.0, 50.0)], FitOptions::ANIMATED, 0.0);
        controller.pan_by(vec2(5.0, 5.0));

        assert!(!controller.is_animating());
        assert_eq!(controller.transform().translate, vec2(5.0, 5.0));
    }
}
