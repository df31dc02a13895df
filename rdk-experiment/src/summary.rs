use std::io::Write;
use std::path::Path;

use rdk_core::TrialRecord;
use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Accuracy and reaction time for one coherence level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSummary {
    pub coherence: f64,
    pub trials: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub mean_reaction_time_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionSummary {
    pub trials: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub mean_reaction_time_ms: Option<f64>,
    /// Sorted by ascending coherence
    pub conditions: Vec<ConditionSummary>,
}

impl SessionSummary {
    pub fn from_records(records: &[TrialRecord]) -> Self {
        if records.is_empty() {
            return SessionSummary::default();
        }

        let mut conditions: Vec<ConditionSummary> = Vec::new();
        for record in records {
            let idx = match conditions
                .iter()
                .position(|c| c.coherence == record.def.coherence)
            {
                Some(idx) => idx,
                None => {
                    conditions.push(ConditionSummary {
                        coherence: record.def.coherence,
                        trials: 0,
                        correct: 0,
                        accuracy: 0.0,
                        mean_reaction_time_ms: 0.0,
                    });
                    conditions.len() - 1
                }
            };
            let condition = &mut conditions[idx];
            condition.trials += 1;
            condition.correct += record.is_correct() as usize;
            // running sum, divided below
            condition.mean_reaction_time_ms += record.reaction_time_ns as f64 / 1e6;
        }

        for condition in &mut conditions {
            condition.accuracy = condition.correct as f64 / condition.trials as f64;
            condition.mean_reaction_time_ms /= condition.trials as f64;
        }
        conditions.sort_by(|a, b| a.coherence.total_cmp(&b.coherence));

        let correct = records.iter().filter(|r| r.is_correct()).count();
        let total_rt_ms: f64 = records
            .iter()
            .map(|r| r.reaction_time_ns as f64 / 1e6)
            .sum();

        SessionSummary {
            trials: records.len(),
            correct,
            accuracy: correct as f64 / records.len() as f64,
            mean_reaction_time_ms: Some(total_rt_ms / records.len() as f64),
            conditions,
        }
    }

    pub fn log(&self) {
        log::info!(
            "Experiment results: {} trials, accuracy {:.1}%",
            self.trials,
            self.accuracy * 100.0
        );
        if let Some(rt) = self.mean_reaction_time_ms {
            log::info!("Mean reaction time {:.1} ms", rt);
        }
        for c in &self.conditions {
            log::info!(
                "  coherence {:>5}: {}/{} correct ({:.1}%), mean RT {:.1} ms",
                c.coherence,
                c.correct,
                c.trials,
                c.accuracy * 100.0,
                c.mean_reaction_time_ms
            );
        }
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        let mut writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        log::info!("Summary saved to {}", path.as_ref().display());
        Ok(())
    }
}
