use std::path::{Path, PathBuf};

use rdk_core::Direction;
use serde::{Deserialize, Serialize};

use crate::block::check_conditions;
use crate::errors::{ExperimentError, Result};
use crate::trial::TrialDurations;

/// Session parameters. Any field missing from a config file keeps its
/// default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub coherences: Vec<f64>,
    pub directions: Vec<Direction>,
    pub trials_per_condition: usize,

    pub dot_count: usize,
    /// Field units per second
    pub dot_speed: f32,
    /// Radius of the circular aperture dots are plotted in, field units
    pub aperture_radius: f32,

    pub visible_ms: u64,
    pub noise_refresh_ms: u64,
    pub feedback_ms: u64,

    pub output_path: PathBuf,
    pub seed: Option<u64>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            coherences: vec![0.05, 0.1, 0.2, 0.4, 0.5, 1.0],
            directions: vec![Direction::Right, Direction::Left],
            trials_per_condition: 3,
            dot_count: 20,
            dot_speed: 2.0,
            aperture_radius: 3.0,
            visible_ms: 700,
            noise_refresh_ms: 300,
            feedback_ms: 500,
            output_path: PathBuf::from("TrialData.csv"),
            seed: None,
        }
    }
}

impl ExperimentConfig {
    /// Longest accepted stimulus, refresh or feedback interval
    pub const MAX_INTERVAL_MS: u64 = 60_000;

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Loading experiment config from {}", path.display());
        let file = std::fs::File::open(path)?;
        let config: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_conditions(&self.coherences, &self.directions, self.trials_per_condition)?;
        if self.dot_count == 0 {
            return Err(ExperimentError::InvalidConfig(
                "dot_count must be at least 1".into(),
            ));
        }
        if !(self.dot_speed.is_finite() && self.dot_speed >= 0.0) {
            return Err(ExperimentError::InvalidConfig(format!(
                "dot_speed must be a non-negative number, got {}",
                self.dot_speed
            )));
        }
        if !(self.aperture_radius.is_finite() && self.aperture_radius > 0.0) {
            return Err(ExperimentError::InvalidConfig(format!(
                "aperture_radius must be positive, got {}",
                self.aperture_radius
            )));
        }
        if self.visible_ms == 0 || self.noise_refresh_ms == 0 {
            return Err(ExperimentError::InvalidConfig(
                "visible_ms and noise_refresh_ms must be non-zero".into(),
            ));
        }
        for (name, ms) in [
            ("visible_ms", self.visible_ms),
            ("noise_refresh_ms", self.noise_refresh_ms),
            ("feedback_ms", self.feedback_ms),
        ] {
            if ms > Self::MAX_INTERVAL_MS {
                return Err(ExperimentError::InvalidConfig(format!(
                    "{name} must be at most {} ms, got {ms}",
                    Self::MAX_INTERVAL_MS
                )));
            }
        }
        Ok(())
    }

    pub fn total_trials(&self) -> usize {
        self.coherences.len() * self.directions.len() * self.trials_per_condition
    }

    pub fn durations(&self) -> TrialDurations {
        TrialDurations {
            visible_ms: self.visible_ms,
            feedback_ms: self.feedback_ms,
        }
    }

    /// Path of the JSON summary written next to the CSV
    pub fn summary_path(&self) -> PathBuf {
        self.output_path.with_extension("summary.json")
    }
}
