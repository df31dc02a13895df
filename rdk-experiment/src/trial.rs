use std::time::Duration;

use rdk_core::{TrialDef, TrialState};

/// Everything the session knows about the trial in progress.
#[derive(Debug, Clone)]
pub struct TrialContext {
    pub index: usize,
    pub def: TrialDef,
    pub durations: TrialDurations,
    pub timestamps: TrialTimestamps,
    pub state: TrialState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialDurations {
    pub visible_ms: u64,
    pub feedback_ms: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TrialTimestamps {
    pub stimulus_start: u64,
    pub prompt_start: Option<u64>,
    pub response: Option<u64>,
}

impl TrialContext {
    pub fn new(index: usize, def: TrialDef, durations: TrialDurations, now_ns: u64) -> Self {
        Self {
            index,
            def,
            durations,
            timestamps: TrialTimestamps {
                stimulus_start: now_ns,
                ..TrialTimestamps::default()
            },
            state: TrialState::AwaitingStimulus,
        }
    }

    pub fn stimulus_elapsed(&self, now_ns: u64) -> bool {
        let visible = Duration::from_millis(self.durations.visible_ms);
        since(self.timestamps.stimulus_start, now_ns) >= visible
    }

    pub fn feedback_elapsed(&self, now_ns: u64) -> bool {
        self.timestamps
            .response
            .is_some_and(|r| since(r, now_ns) >= Duration::from_millis(self.durations.feedback_ms))
    }

    pub fn reaction_time_ns(&self) -> Option<u64> {
        let response = self.timestamps.response?;
        let prompt = self.timestamps.prompt_start.unwrap_or(response);
        Some(response.saturating_sub(prompt))
    }
}

fn since(start_ns: u64, now_ns: u64) -> Duration {
    Duration::from_nanos(now_ns.saturating_sub(start_ns))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdk_core::Direction;

    fn context(visible_ms: u64, feedback_ms: u64) -> TrialContext {
        TrialContext::new(
            0,
            TrialDef::new(0.5, Direction::Left),
            TrialDurations {
                visible_ms,
                feedback_ms,
            },
            1_000,
        )
    }

    #[test]
    fn stimulus_window_closes_at_visible_ms() {
        let t = context(700, 500);
        assert!(!t.stimulus_elapsed(1_000 + 699_999_999));
        assert!(t.stimulus_elapsed(1_000 + 700_000_000));
        // clock behind the start never counts as elapsed
        assert!(!t.stimulus_elapsed(0));
    }

    #[test]
    fn huge_durations_never_elapse() {
        let mut t = context(u64::MAX / 1000, u64::MAX);
        assert!(!t.stimulus_elapsed(u64::MAX / 2));

        t.timestamps.response = Some(5_000);
        assert!(!t.feedback_elapsed(u64::MAX));
    }

    #[test]
    fn feedback_waits_for_a_response() {
        let mut t = context(700, 500);
        assert!(!t.feedback_elapsed(u64::MAX));

        t.timestamps.prompt_start = Some(2_000_000);
        t.timestamps.response = Some(352_000_000);
        assert_eq!(t.reaction_time_ns(), Some(350_000_000));
        assert!(!t.feedback_elapsed(851_999_999));
        assert!(t.feedback_elapsed(852_000_000));
    }
}
