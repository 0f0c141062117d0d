use numbrush_shared::{Dimensions, Point};

pub const MIN_SCALE: f32 = 0.5;
pub const MAX_SCALE: f32 = 5.0;
/// Share of the viewport the content occupies after a fit.
pub const FIT_PADDING: f32 = 0.9;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    fn is_usable(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

impl From<Dimensions> for Size {
    fn from(dimensions: Dimensions) -> Self {
        Size::new(dimensions.width as f32, dimensions.height as f32)
    }
}

/// Screen = content * scale + translate.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportTransform {
    scale: f32,
    translate_x: f32,
    translate_y: f32,
}

impl Default for ViewportTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
        }
    }
}

impl ViewportTransform {
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn translation(&self) -> (f32, f32) {
        (self.translate_x, self.translate_y)
    }

    /// Scales the content to 90% of the viewport and centers it. Returns false
    /// (leaving the transform alone) when either size is degenerate.
    pub fn fit_to_bounds(&mut self, viewport: Size, content: Size) -> bool {
        if !viewport.is_usable() || !content.is_usable() {
            tracing::debug!(?viewport, ?content, "skipping fit for degenerate size");
            return false;
        }
        let fitted = (viewport.width / content.width).min(viewport.height / content.height)
            * FIT_PADDING;
        self.scale = fitted.clamp(MIN_SCALE, MAX_SCALE);
        self.translate_x = (viewport.width - content.width * self.scale) / 2.0;
        self.translate_y = (viewport.height - content.height * self.scale) / 2.0;
        true
    }

    pub fn apply_pan(&mut self, dx: f32, dy: f32) -> bool {
        if !dx.is_finite() || !dy.is_finite() {
            return false;
        }
        self.translate_x += dx;
        self.translate_y += dy;
        dx != 0.0 || dy != 0.0
    }

    /// Zooms while keeping the content under `focal` fixed on screen. When the
    /// clamp cuts the gesture short, the translation follows the scale ratio
    /// actually applied.
    pub fn apply_zoom_around_focal(&mut self, factor: f32, focal: Point) -> bool {
        if !factor.is_finite() || factor <= 0.0 || !focal.is_finite() {
            return false;
        }
        let next = (self.scale * factor).clamp(MIN_SCALE, MAX_SCALE);
        let effective = next / self.scale;
        if effective == 1.0 {
            return false;
        }
        self.translate_x = focal.x - (focal.x - self.translate_x) * effective;
        self.translate_y = focal.y - (focal.y - self.translate_y) * effective;
        self.scale = next;
        true
    }

    pub fn to_content(&self, screen: Point) -> Point {
        Point {
            x: (screen.x - self.translate_x) / self.scale,
            y: (screen.y - self.translate_y) / self.scale,
        }
    }

    pub fn to_screen(&self, content: Point) -> Point {
        Point {
            x: content.x * self.scale + self.translate_x,
            y: content.y * self.scale + self.translate_y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn fit_centers_content() {
        let mut viewport = ViewportTransform::default();
        assert!(viewport.fit_to_bounds(Size::new(1000.0, 500.0), Size::new(200.0, 100.0)));
        assert!(close(viewport.scale(), 4.5));
        let (tx, ty) = viewport.translation();
        assert!(close(tx, 50.0));
        assert!(close(ty, 25.0));
    }

    #[test]
    fn fit_clamps_to_zoom_range() {
        let mut viewport = ViewportTransform::default();
        viewport.fit_to_bounds(Size::new(100.0, 100.0), Size::new(1000.0, 1000.0));
        assert_eq!(viewport.scale(), MIN_SCALE);
        let (tx, _) = viewport.translation();
        assert!(close(tx, (100.0 - 1000.0 * MIN_SCALE) / 2.0));
    }

    #[test]
    fn fit_ignores_empty_viewport() {
        let mut viewport = ViewportTransform::default();
        assert!(!viewport.fit_to_bounds(Size::new(0.0, 400.0), Size::new(10.0, 10.0)));
        assert_eq!(viewport, ViewportTransform::default());
    }

    #[test]
    fn zoom_clamps_and_pan_keeps_scale() {
        let mut viewport = ViewportTransform::default();
        viewport.apply_zoom_around_focal(10.0, Point::new(0.0, 0.0));
        assert_eq!(viewport.scale(), 5.0);
        viewport.apply_pan(30.0, -12.0);
        assert_eq!(viewport.scale(), 5.0);
        assert_eq!(viewport.translation(), (30.0, -12.0));
    }

    #[test]
    fn clamped_zoom_keeps_focal_point_fixed() {
        let mut viewport = ViewportTransform::default();
        viewport.apply_pan(40.0, 20.0);
        let focal = Point::new(200.0, 120.0);
        let anchored = viewport.to_content(focal);

        viewport.apply_zoom_around_focal(10.0, focal);

        let after = viewport.to_screen(anchored);
        assert!(close(after.x, focal.x));
        assert!(close(after.y, focal.y));
    }

    #[test]
    fn pinch_sequences_stay_in_range() {
        let mut viewport = ViewportTransform::default();
        let focal = Point::new(50.0, 50.0);
        for factor in [3.0, 3.0, 0.01, 1.7, 0.2, 0.2, 8.0, 1.1, 0.9] {
            viewport.apply_zoom_around_focal(factor, focal);
            assert!((MIN_SCALE..=MAX_SCALE).contains(&viewport.scale()));
        }
    }

    #[test]
    fn zoom_ignores_invalid_factors() {
        let mut viewport = ViewportTransform::default();
        assert!(!viewport.apply_zoom_around_focal(0.0, Point::new(1.0, 1.0)));
        assert!(!viewport.apply_zoom_around_focal(f32::NAN, Point::new(1.0, 1.0)));
        assert!(!viewport.apply_zoom_around_focal(-2.0, Point::new(1.0, 1.0)));
        assert_eq!(viewport, ViewportTransform::default());
    }

    #[test]
    fn screen_and_content_are_inverse() {
        let mut viewport = ViewportTransform::default();
        viewport.fit_to_bounds(Size::new(800.0, 600.0), Size::new(320.0, 240.0));
        viewport.apply_zoom_around_focal(1.8, Point::new(123.0, 77.0));
        viewport.apply_pan(-15.0, 9.0);
        let content = Point::new(101.5, 33.25);
        let back = viewport.to_content(viewport.to_screen(content));
        assert!(close(back.x, content.x));
        assert!(close(back.y, content.y));
    }
}
