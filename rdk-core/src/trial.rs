use serde::{Deserialize, Serialize};

use crate::Direction;

/// Session state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialState {
    /// Dots are visible and moving
    AwaitingStimulus,
    /// Dots hidden, waiting for a left/right response
    AwaitingResponse,
    /// Response recorded, feedback cue showing
    Logging,
    /// All trials consumed and results flushed
    Done,
}

/// One condition of the block: how many dots move coherently, and where.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialDef {
    pub coherence: f64,
    pub direction: Direction,
}

impl TrialDef {
    pub fn new(coherence: f64, direction: Direction) -> Self {
        Self {
            coherence,
            direction,
        }
    }
}

/// Row of the results file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    #[serde(rename = "TrialDirection")]
    pub direction: Direction,
    #[serde(rename = "Coherence")]
    pub coherence: f64,
    #[serde(rename = "UserInput")]
    pub response: Direction,
}

impl TrialResult {
    pub fn is_correct(&self) -> bool {
        self.direction == self.response
    }
}

/// Recorded outcome of a trial, kept in memory for the session
#[derive(Debug, Clone, PartialEq)]
pub struct TrialRecord {
    pub trial_index: usize,
    pub def: TrialDef,
    pub response: Direction,
    pub reaction_time_ns: u64,
}

impl TrialRecord {
    pub fn is_correct(&self) -> bool {
        self.def.direction == self.response
    }

    pub fn result(&self) -> TrialResult {
        TrialResult {
            direction: self.def.direction,
            coherence: self.def.coherence,
            response: self.response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_converts_to_csv_row() {
        let record = TrialRecord {
            trial_index: 4,
            def: TrialDef::new(0.2, Direction::Left),
            response: Direction::Right,
            reaction_time_ns: 412_000_000,
        };
        let row = record.result();
        assert_eq!(row.direction, Direction::Left);
        assert_eq!(row.coherence, 0.2);
        assert_eq!(row.response, Direction::Right);
        assert!(!row.is_correct());
        assert!(!record.is_correct());
    }
}
