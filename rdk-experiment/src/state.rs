use super::block::generate_block;
use super::config::ExperimentConfig;
use super::dots::DotField;
use super::errors::Result;
use super::results::write_results_csv;
use super::summary::SessionSummary;
use super::trial::TrialContext;
use rand::Rng;
use rdk_core::{Direction, Dot, Phase, TrialDef, TrialRecord, TrialResult, TrialState};
use rdk_timing::Timer;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExperimentEvent {
    SpacePressed,
    StimulusElapsed,
    ResponseReceived(Direction),
    FeedbackElapsed,
    Abort,
}

/// Drives a whole session: welcome screen, every trial of the block, and
/// the final flush of the results.
///
/// The owner calls [`update`](Self::update) once per frame and feeds the
/// returned events, together with input events, into
/// [`handle_event`](Self::handle_event). Nothing here blocks.
pub struct ExperimentStateMachine<P, T, R>
where
    P: Phase,
    T: Timer,
    R: Rng,
{
    pub phase: P,
    pub timer: T,
    pub rng: R,
    pub config: ExperimentConfig,
    block: Vec<TrialDef>,
    current: Option<TrialContext>,
    dots: DotField,
    records: Vec<TrialRecord>,
    last_update_ns: u64,
    flushed: bool,
    summary: Option<SessionSummary>,
}

impl<P, T, R> ExperimentStateMachine<P, T, R>
where
    P: Phase + Default,
    T: Timer,
    R: Rng,
{
    pub fn new(config: ExperimentConfig, timer: T, mut rng: R) -> Result<Self> {
        config.validate()?;
        let block = generate_block(
            &config.coherences,
            &config.directions,
            config.trials_per_condition,
            &mut rng,
        )?;
        debug_assert_eq!(block.len(), config.total_trials());
        log::info!(
            "Block ready: {} trials ({} coherences x {} directions x {})",
            config.total_trials(),
            config.coherences.len(),
            config.directions.len(),
            config.trials_per_condition
        );

        let last_update_ns = timer.now();
        Ok(Self {
            phase: P::default(),
            timer,
            rng,
            dots: DotField::from_config(&config),
            config,
            block,
            current: None,
            records: Vec::new(),
            last_update_ns,
            flushed: false,
            summary: None,
        })
    }

    fn advance_phase(&mut self) -> bool {
        if let Some(next) = self.phase.next() {
            log::debug!("Phase {:?} -> {:?}", self.phase, next);
            self.phase = next;
            true
        } else {
            false
        }
    }

    /// Time-driven transitions for the current frame. Also moves the dots.
    pub fn update(&mut self) -> Vec<ExperimentEvent> {
        let mut events = Vec::new();

        let now_ns = self.timer.now();
        let dt_secs = now_ns.saturating_sub(self.last_update_ns) as f32 / 1e9;
        self.last_update_ns = now_ns;

        if !self.phase.is_experiment() {
            return events;
        }

        if let Some(trial) = &self.current {
            match trial.state {
                TrialState::AwaitingStimulus => {
                    self.dots.step(dt_secs, &mut self.rng);
                    if trial.stimulus_elapsed(now_ns) {
                        events.push(ExperimentEvent::StimulusElapsed);
                    }
                }
                TrialState::Logging => {
                    if trial.feedback_elapsed(now_ns) {
                        events.push(ExperimentEvent::FeedbackElapsed);
                    }
                }
                TrialState::AwaitingResponse | TrialState::Done => {}
            }
        }

        events
    }

    /// Applies an event. Returns `false` when the event does not apply to
    /// the current state and was ignored.
    pub fn handle_event(&mut self, event: ExperimentEvent) -> bool {
        let trial_state = self.current.as_ref().map(|t| t.state);
        match (event, trial_state) {
            (ExperimentEvent::SpacePressed, _) if self.phase.is_welcome() => {
                if self.advance_phase() {
                    self.start_next_trial();
                    true
                } else {
                    false
                }
            }

            (ExperimentEvent::StimulusElapsed, Some(TrialState::AwaitingStimulus)) => {
                self.open_response_window();
                true
            }

            (ExperimentEvent::ResponseReceived(response), Some(TrialState::AwaitingResponse)) => {
                self.record_response(response);
                true
            }

            (ExperimentEvent::FeedbackElapsed, Some(TrialState::Logging)) => {
                self.current = None;
                self.start_next_trial();
                true
            }

            (ExperimentEvent::Abort, _) if self.phase.is_experiment() => {
                log::warn!(
                    "Session aborted after {} of {} trials",
                    self.records.len(),
                    self.block.len()
                );
                self.finish();
                true
            }

            _ => false,
        }
    }

    fn start_next_trial(&mut self) {
        let index = self.records.len();
        let Some(def) = self.block.get(index).copied() else {
            self.finish();
            return;
        };

        let now_ns = self.timer.now();
        self.dots.begin_trial(&def, &mut self.rng);
        self.current = Some(TrialContext::new(
            index,
            def,
            self.config.durations(),
            now_ns,
        ));
        self.last_update_ns = now_ns;
        log::info!(
            "Trial {}/{} started: coherence {}, direction {:?}",
            index + 1,
            self.block.len(),
            def.coherence,
            def.direction
        );
    }

    fn open_response_window(&mut self) {
        let now_ns = self.timer.now();
        self.dots.hide();
        if let Some(trial) = &mut self.current {
            trial.state = TrialState::AwaitingResponse;
            trial.timestamps.prompt_start = Some(now_ns);
            log::debug!("Response window opened at {} ns", now_ns);
        }
    }

    /// Records a response for the current trial during the response window
    fn record_response(&mut self, response: Direction) {
        let now_ns = self.timer.now();
        let Some(trial) = &mut self.current else {
            return;
        };
        if trial.state != TrialState::AwaitingResponse {
            return;
        }

        trial.timestamps.response = Some(now_ns);
        trial.state = TrialState::Logging;

        let record = TrialRecord {
            trial_index: trial.index,
            def: trial.def,
            response,
            reaction_time_ns: trial.reaction_time_ns().unwrap_or_default(),
        };
        log::info!(
            "{} (trial {}, response {:?}, RT = {:.3} ms)",
            if record.is_correct() { "Correct!" } else { "Incorrect!" },
            record.trial_index + 1,
            response,
            record.reaction_time_ns as f64 / 1e6
        );
        self.records.push(record);
    }

    fn finish(&mut self) {
        self.current = None;
        self.dots.hide();
        while !self.phase.is_debrief() {
            if !self.advance_phase() {
                break;
            }
        }
        self.flush_results();
    }

    /// Writes the results file and the summary. Runs at most once per
    /// session; failures are logged and otherwise ignored.
    fn flush_results(&mut self) {
        if self.flushed {
            return;
        }
        self.flushed = true;

        let rows: Vec<TrialResult> = self.records.iter().map(TrialRecord::result).collect();
        if let Err(e) = write_results_csv(&self.config.output_path, &rows) {
            log::warn!(
                "Failed to save trial data to {}: {}",
                self.config.output_path.display(),
                e
            );
        }

        let summary = SessionSummary::from_records(&self.records);
        summary.log();
        let summary_path = self.config.summary_path();
        if let Err(e) = summary.write_json(&summary_path) {
            log::warn!("Failed to save summary to {}: {}", summary_path.display(), e);
        }
        self.timer.frame_stats().log("Frame timing");
        self.summary = Some(summary);
    }

    /// Current session state; `None` before the first trial starts.
    pub fn trial_state(&self) -> Option<TrialState> {
        if self.phase.is_debrief() {
            Some(TrialState::Done)
        } else {
            self.current.as_ref().map(|t| t.state)
        }
    }

    pub fn current_trial(&self) -> Option<&TrialContext> {
        self.current.as_ref()
    }

    pub fn current_phase(&self) -> &P {
        &self.phase
    }

    pub fn is_done(&self) -> bool {
        self.trial_state() == Some(TrialState::Done)
    }

    pub fn block(&self) -> &[TrialDef] {
        &self.block
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    /// Dots to draw this frame, empty while the field is hidden
    pub fn visible_dots(&self) -> &[Dot] {
        if self.dots.is_visible() {
            self.dots.dots()
        } else {
            &[]
        }
    }

    /// Whether the last response was correct, while its feedback is showing
    pub fn feedback(&self) -> Option<bool> {
        let trial = self.current.as_ref()?;
        if trial.state != TrialState::Logging {
            return None;
        }
        self.records.last().map(TrialRecord::is_correct)
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    /// (1-based current trial, total trials) during the experiment phase
    pub fn trial_progress(&self) -> Option<(usize, usize)> {
        self.current
            .as_ref()
            .map(|t| (t.index + 1, self.block.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use rdk_core::StandardPhase;
    use rdk_timing::ManualTimer;

    type Machine = ExperimentStateMachine<StandardPhase, ManualTimer, SmallRng>;

    fn machine(dir: &tempfile::TempDir) -> (Machine, ManualTimer) {
        let config = ExperimentConfig {
            coherences: vec![0.5],
            directions: vec![Direction::Left, Direction::Right],
            trials_per_condition: 1,
            output_path: dir.path().join("TrialData.csv"),
            ..ExperimentConfig::default()
        };
        let timer = ManualTimer::new();
        let m = Machine::new(config, timer.clone(), SmallRng::seed_from_u64(8)).unwrap();
        (m, timer)
    }

    fn pump(m: &mut Machine) {
        for event in m.update() {
            m.handle_event(event);
        }
    }

    #[test]
    fn waits_on_welcome_until_space() {
        let dir = tempfile::tempdir().unwrap();
        let (mut m, timer) = machine(&dir);
        timer.advance_ms(5_000);
        pump(&mut m);
        assert!(m.current_phase().is_welcome());
        assert_eq!(m.trial_state(), None);

        assert!(m.handle_event(ExperimentEvent::SpacePressed));
        assert!(m.current_phase().is_experiment());
        assert_eq!(m.trial_state(), Some(TrialState::AwaitingStimulus));
        assert_eq!(m.visible_dots().len(), 20);
        assert_eq!(m.trial_progress(), Some((1, 2)));
    }

    #[test]
    fn stimulus_hides_after_visible_window() {
        let dir = tempfile::tempdir().unwrap();
        let (mut m, timer) = machine(&dir);
        m.handle_event(ExperimentEvent::SpacePressed);

        timer.advance_ms(699);
        pump(&mut m);
        assert_eq!(m.trial_state(), Some(TrialState::AwaitingStimulus));

        timer.advance_ms(1);
        pump(&mut m);
        assert_eq!(m.trial_state(), Some(TrialState::AwaitingResponse));
        assert!(m.visible_dots().is_empty());
    }

    #[test]
    fn ignores_responses_outside_the_window() {
        let dir = tempfile::tempdir().unwrap();
        let (mut m, timer) = machine(&dir);
        assert!(!m.handle_event(ExperimentEvent::ResponseReceived(Direction::Left)));

        m.handle_event(ExperimentEvent::SpacePressed);
        timer.advance_ms(100);
        assert!(!m.handle_event(ExperimentEvent::ResponseReceived(Direction::Left)));
        assert!(m.records().is_empty());
    }

    #[test]
    fn response_is_logged_with_reaction_time_and_feedback() {
        let dir = tempfile::tempdir().unwrap();
        let (mut m, timer) = machine(&dir);
        m.handle_event(ExperimentEvent::SpacePressed);
        timer.advance_ms(700);
        pump(&mut m);

        let truth = m.current_trial().unwrap().def.direction;
        timer.advance_ms(350);
        assert!(m.handle_event(ExperimentEvent::ResponseReceived(truth)));

        assert_eq!(m.trial_state(), Some(TrialState::Logging));
        assert_eq!(m.feedback(), Some(true));
        let record = &m.records()[0];
        assert_eq!(record.response, truth);
        assert_eq!(record.reaction_time_ns, 350_000_000);

        // a second key press during feedback is ignored
        assert!(!m.handle_event(ExperimentEvent::ResponseReceived(truth.opposite())));
        assert_eq!(m.records().len(), 1);
    }

    #[test]
    fn abort_flushes_recorded_trials_once() {
        let dir = tempfile::tempdir().unwrap();
        let (mut m, timer) = machine(&dir);
        m.handle_event(ExperimentEvent::SpacePressed);
        timer.advance_ms(700);
        pump(&mut m);
        m.handle_event(ExperimentEvent::ResponseReceived(Direction::Right));

        assert!(m.handle_event(ExperimentEvent::Abort));
        assert!(m.is_done());
        let rows = crate::read_results_csv(&m.config.output_path).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(m.summary().is_some());

        assert!(!m.handle_event(ExperimentEvent::Abort));
    }

    #[test]
    fn abort_on_welcome_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (mut m, _timer) = machine(&dir);
        assert!(!m.handle_event(ExperimentEvent::Abort));
        assert!(!m.config.output_path.exists());
    }

    #[test]
    fn save_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let (mut m, timer) = machine(&dir);
        // a directory where the file should go makes the write fail
        std::fs::create_dir_all(&m.config.output_path).unwrap();

        m.handle_event(ExperimentEvent::SpacePressed);
        for _ in 0..2 {
            timer.advance_ms(700);
            pump(&mut m);
            m.handle_event(ExperimentEvent::ResponseReceived(Direction::Left));
            timer.advance_ms(500);
            pump(&mut m);
        }
        assert!(m.is_done());
        assert_eq!(m.summary().map(|s| s.trials), Some(2));
    }
}
