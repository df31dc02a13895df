use std::f32::consts::TAU;

use rand::Rng;
use rdk_core::{Direction, Dot, DotRole, TrialDef};

use crate::config::ExperimentConfig;
use crate::partition::Partition;

/// The moving dot population of the kinematogram.
///
/// Signal dots share the trial direction for the whole visible window.
/// Noise dots each draw an independent random heading, redrawn every
/// refresh interval. All draws come from the single random source passed
/// in, in dot index order.
#[derive(Debug, Clone)]
pub struct DotField {
    dots: Vec<Dot>,
    speed: f32,
    aperture_radius: f32,
    refresh_interval_secs: f64,
    elapsed_secs: f64,
    partition: Partition,
    visible: bool,
}

impl DotField {
    pub fn new(count: usize, speed: f32, aperture_radius: f32, noise_refresh_ms: u64) -> Self {
        Self {
            dots: vec![Dot::default(); count],
            speed,
            aperture_radius,
            refresh_interval_secs: noise_refresh_ms as f64 / 1000.0,
            elapsed_secs: 0.0,
            partition: Partition {
                signal: Vec::new(),
                noise: (0..count).collect(),
            },
            visible: false,
        }
    }

    pub fn from_config(config: &ExperimentConfig) -> Self {
        Self::new(
            config.dot_count,
            config.dot_speed,
            config.aperture_radius,
            config.noise_refresh_ms,
        )
    }

    /// Re-plots every dot inside the aperture, draws a fresh signal/noise
    /// split for the trial and makes the field visible.
    pub fn begin_trial<R>(&mut self, def: &TrialDef, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        for dot in &mut self.dots {
            dot.position = random_in_circle(self.aperture_radius, rng);
        }

        self.partition = Partition::new(self.dots.len(), def.coherence, rng);
        let signal_heading = def.direction.unit_vector();
        for &i in &self.partition.signal {
            self.dots[i].role = DotRole::Signal;
            self.dots[i].heading = signal_heading;
        }
        for &i in &self.partition.noise {
            self.dots[i].role = DotRole::Noise;
        }
        self.refresh_noise(rng);

        self.elapsed_secs = 0.0;
        self.visible = true;
        log::debug!(
            "Dot field: {} signal / {} noise, direction {:?}",
            self.partition.signal.len(),
            self.partition.noise.len(),
            def.direction
        );
    }

    /// Advances the field by one frame. Does nothing while hidden.
    pub fn step<R>(&mut self, dt_secs: f32, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        if !self.visible || dt_secs <= 0.0 {
            return;
        }

        for dot in &mut self.dots {
            dot.advance(self.speed, dt_secs);
        }

        let before = (self.elapsed_secs / self.refresh_interval_secs).floor();
        self.elapsed_secs += dt_secs as f64;
        let after = (self.elapsed_secs / self.refresh_interval_secs).floor();
        if after > before {
            self.refresh_noise(rng);
        }
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn dots(&self) -> &[Dot] {
        &self.dots
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    fn refresh_noise<R>(&mut self, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        for &i in &self.partition.noise {
            self.dots[i].heading = random_unit_vector(rng);
        }
    }
}

fn random_in_circle<R: Rng + ?Sized>(radius: f32, rng: &mut R) -> (f32, f32) {
    let r = radius * rng.random::<f32>().sqrt();
    let theta = rng.random_range(0.0..TAU);
    (r * theta.cos(), r * theta.sin())
}

fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> (f32, f32) {
    let theta = rng.random_range(0.0..TAU);
    (theta.cos(), theta.sin())
}
