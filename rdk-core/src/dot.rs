/// Role of a dot for the current trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DotRole {
    Signal,
    #[default]
    Noise,
}

/// A single dot of the kinematogram, in aperture-centred field units
/// (+x right, +y up).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Dot {
    pub position: (f32, f32),
    pub heading: (f32, f32),
    pub role: DotRole,
}

impl Dot {
    pub fn is_signal(&self) -> bool {
        self.role == DotRole::Signal
    }

    /// Moves the dot along its heading.
    pub fn advance(&mut self, speed: f32, dt_secs: f32) {
        self.position.0 += self.heading.0 * speed * dt_secs;
        self.position.1 += self.heading.1 * speed * dt_secs;
    }
}
