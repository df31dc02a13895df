/// Camera pan directions (W/A/S/D)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Maps aperture-centred field units to screen pixels, with a movable
/// camera.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewTransform {
    center: (f32, f32),
    pixels_per_unit: f32,
    aperture_radius: f32,
    /// Camera position in field units
    camera: (f32, f32),
    /// Field units per second
    pub pan_speed: f32,
}

impl ViewTransform {
    /// Fraction of the shorter screen side covered by the aperture radius
    const APERTURE_FILL: f32 = 0.4;

    pub fn new(width: u32, height: u32, aperture_radius: f32) -> Self {
        let mut view = Self {
            center: (0.0, 0.0),
            pixels_per_unit: 1.0,
            aperture_radius,
            camera: (0.0, 0.0),
            pan_speed: 5.0,
        };
        view.resize(width, height);
        view
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.center = (width as f32 / 2.0, height as f32 / 2.0);
        let short_side = width.min(height) as f32;
        self.pixels_per_unit = short_side * Self::APERTURE_FILL / self.aperture_radius;
    }

    pub fn field_to_screen(&self, (x, y): (f32, f32)) -> (f32, f32) {
        (
            self.center.0 + (x - self.camera.0) * self.pixels_per_unit,
            self.center.1 - (y - self.camera.1) * self.pixels_per_unit,
        )
    }

    /// Screen position of the field origin
    pub fn origin(&self) -> (f32, f32) {
        self.field_to_screen((0.0, 0.0))
    }

    pub fn pan(&mut self, direction: PanDirection, dt_secs: f32) {
        let step = self.pan_speed * dt_secs;
        match direction {
            PanDirection::Up => self.camera.1 += step,
            PanDirection::Down => self.camera.1 -= step,
            PanDirection::Left => self.camera.0 -= step,
            PanDirection::Right => self.camera.0 += step,
        }
    }

    pub fn reset(&mut self) {
        self.camera = (0.0, 0.0);
    }

    pub fn camera(&self) -> (f32, f32) {
        self.camera
    }

    pub fn pixels_per_unit(&self) -> f32 {
        self.pixels_per_unit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_maps_to_screen_center() {
        let view = ViewTransform::new(1280, 720, 3.0);
        assert_eq!(view.origin(), (640.0, 360.0));
        assert!((view.pixels_per_unit() - 96.0).abs() < 1e-4);
    }

    #[test]
    fn positive_y_is_up_on_screen() {
        let view = ViewTransform::new(1000, 1000, 4.0);
        let (x, y) = view.field_to_screen((1.0, 1.0));
        assert!(x > 500.0);
        assert!(y < 500.0);
    }

    #[test]
    fn panning_moves_content_opposite_to_camera() {
        let mut view = ViewTransform::new(800, 600, 3.0);
        view.pan(PanDirection::Right, 0.5);
        assert_eq!(view.camera(), (2.5, 0.0));
        assert!(view.origin().0 < 400.0);

        view.pan(PanDirection::Up, 0.2);
        assert!(view.origin().1 > 300.0);

        view.reset();
        assert_eq!(view.origin(), (400.0, 300.0));
    }
}
