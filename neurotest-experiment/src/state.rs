use chrono::Utc;
use neurotest_core::{
    Phase, ResponseButton, RunResult, RunnerState, Scene, StimulusType, TestVariant,
    TrialDefinition, TrialRecord,
};
use neurotest_timing::Timer;
use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::config::VariantTimings;
use crate::error::RunnerError;
use crate::sink::ResultsSink;
use crate::summary::RunSummary;
use crate::trial::{ActiveTrial, DualStage, TrialDurations};

const NS_PER_MS: u64 = 1_000_000;

#[derive(Debug, Clone, PartialEq)]
pub enum RunnerEvent {
    RunStarted,
    FixationStarted {
        index: usize,
    },
    StimulusShown {
        index: usize,
    },
    ResponseWindowOpened {
        index: usize,
    },
    RecallPrompted {
        index: usize,
    },
    ResponseCaptured {
        index: usize,
        button: ResponseButton,
        reaction_time_ms: Option<u64>,
    },
    TrialScored {
        index: usize,
        correct: bool,
    },
    Completed {
        submitted: bool,
    },
    Aborted,
}

/// Outcome of handing the finished run to the results sink.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmissionStatus {
    #[default]
    Pending,
    Submitted,
    Failed(String),
}

enum Capture {
    /// Latched, but the trial keeps running until its window closes.
    Latched,
    Reflex,
    Final,
}

/// Drives one run of one test variant.
///
/// The runner is polled: call [`TrialRunner::update`] once per frame and feed
/// input through [`TrialRunner::handle_response`]. Every state arms at most one
/// deadline, which is replaced or cleared on each transition.
pub struct TrialRunner<T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    variant: TestVariant,
    subject_id: String,
    timings: VariantTimings,
    pub timer: T,
    rng: R,
    trials: Vec<TrialDefinition>,
    next_index: usize,
    state: RunnerState,
    started: bool,
    current: Option<ActiveTrial<u64>>,
    records: Vec<TrialRecord>,
    deadline_ns: Option<u64>,
    pending: Vec<RunnerEvent>,
    result: Option<RunResult>,
    submission: SubmissionStatus,
    sink: Box<dyn ResultsSink>,
}

impl<T, R> TrialRunner<T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    pub fn new(
        subject_id: impl Into<String>,
        variant: TestVariant,
        trials: Vec<TrialDefinition>,
        timer: T,
        rng: R,
        sink: Box<dyn ResultsSink>,
    ) -> Result<Self, RunnerError> {
        if trials.is_empty() {
            return Err(RunnerError::EmptyTrialSet { variant });
        }
        if let Some(odd) = trials.iter().find(|t| t.variant() != variant) {
            return Err(RunnerError::MixedTrialSet {
                id: odd.id,
                expected: variant,
                found: odd.variant(),
            });
        }

        Ok(Self {
            variant,
            subject_id: subject_id.into(),
            timings: VariantTimings::for_variant(variant),
            timer,
            rng,
            trials,
            next_index: 0,
            state: RunnerState::Idle,
            started: false,
            current: None,
            records: Vec::new(),
            deadline_ns: None,
            pending: Vec::new(),
            result: None,
            submission: SubmissionStatus::Pending,
            sink,
        })
    }

    pub fn with_timings(mut self, timings: VariantTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Arms the lead-in and processes anything already due.
    pub fn start(&mut self) -> Vec<RunnerEvent> {
        if self.started {
            return Vec::new();
        }
        self.started = true;
        let now = self.timer.now();
        self.deadline_ns = Some(now + self.timings.lead_in_ms * NS_PER_MS);
        info!(
            test = self.variant.test_name(),
            subject = %self.subject_id,
            trials = self.trials.len(),
            lead_in_ms = self.timings.lead_in_ms,
            "run started"
        );
        self.pending.push(RunnerEvent::RunStarted);
        self.update()
    }

    /// Fires every transition whose deadline has passed.
    pub fn update(&mut self) -> Vec<RunnerEvent> {
        if self.started && !self.state.is_terminal() {
            let now = self.timer.now();
            while self.step(now) {}
        }
        std::mem::take(&mut self.pending)
    }

    fn step(&mut self, now: u64) -> bool {
        let due = self.deadline_ns.is_some_and(|d| now >= d);
        match self.state {
            RunnerState::Idle if due => self.begin_next_trial(now),
            RunnerState::Fixation if due => self.show_stimulus(now),
            RunnerState::StimulusVisible if due => self.open_response_window(now),
            RunnerState::AwaitingResponse if due => self.on_window_elapsed(),
            RunnerState::Scoring => {
                self.score();
                self.advance(now);
            }
            _ => return false,
        }
        true
    }

    fn begin_next_trial(&mut self, now: u64) {
        let Some(definition) = self.trials.get(self.next_index).cloned() else {
            self.complete();
            return;
        };
        let index = self.next_index;
        self.next_index += 1;

        let secondary_delay_ms = match &self.timings.dual {
            Some(dual) => {
                let (lo, hi) = dual.secondary_delay_ms;
                Some(self.rng.random_range(lo.min(hi)..=lo.max(hi)))
            }
            None => None,
        };
        let durations = TrialDurations {
            fixation_ms: self.timings.fixation_ms,
            exposure_ms: self.timings.exposure_ms,
            response_window_ms: self.timings.response_window_ms,
            secondary_delay_ms,
        };

        debug!(index, trial_id = definition.id, stimulus = ?definition.stimulus, "trial started");
        self.deadline_ns = Some(now + durations.fixation_ms * NS_PER_MS);
        self.current = Some(ActiveTrial::new(index, definition, durations, now));
        self.state = RunnerState::Fixation;
        self.pending.push(RunnerEvent::FixationStarted { index });
    }

    fn show_stimulus(&mut self, now: u64) {
        let Some(trial) = self.current.as_mut() else {
            self.advance(now);
            return;
        };
        let index = trial.index;
        trial.timestamps.stimulus_start = Some(now);
        self.pending.push(RunnerEvent::StimulusShown { index });
        debug!(index, at_ns = now, "stimulus onset");

        if let Some(delay) = trial.durations.secondary_delay_ms {
            let number_ms = self.timings.dual.as_ref().map_or(0, |d| d.number_ms);
            self.state = RunnerState::StimulusVisible;
            self.deadline_ns = Some(now + (number_ms + delay) * NS_PER_MS);
        } else if let Some(exposure) = trial.durations.exposure_ms {
            trial.timestamps.window_start = Some(now);
            self.state = RunnerState::StimulusVisible;
            self.deadline_ns = Some(now + exposure * NS_PER_MS);
        } else {
            trial.timestamps.window_start = Some(now);
            self.state = RunnerState::AwaitingResponse;
            self.deadline_ns = trial
                .durations
                .response_window_ms
                .map(|w| now + w * NS_PER_MS);
            self.pending.push(RunnerEvent::ResponseWindowOpened { index });
        }
    }

    fn open_response_window(&mut self, now: u64) {
        let Some(trial) = self.current.as_mut() else {
            self.advance(now);
            return;
        };
        let index = trial.index;
        if self.variant.is_compound() {
            // Reaction time counts from the red flash.
            trial.timestamps.window_start = Some(now);
            trial.dual_stage = Some(DualStage::Reflex);
            self.deadline_ns = self
                .timings
                .dual
                .as_ref()
                .and_then(|d| d.reflex_window_ms)
                .map(|w| now + w * NS_PER_MS);
        } else {
            let onset = trial.timestamps.stimulus_start.unwrap_or(now);
            self.deadline_ns = trial
                .durations
                .response_window_ms
                .map(|w| onset + w * NS_PER_MS);
        }
        self.state = RunnerState::AwaitingResponse;
        self.pending.push(RunnerEvent::ResponseWindowOpened { index });
    }

    fn on_window_elapsed(&mut self) {
        let stage = self.current.as_ref().and_then(|t| t.dual_stage);
        if stage == Some(DualStage::Reflex) {
            debug!("reflex window elapsed without a press");
            self.enter_recall();
        } else {
            self.state = RunnerState::Scoring;
            self.deadline_ns = None;
        }
    }

    fn enter_recall(&mut self) {
        if let Some(trial) = self.current.as_mut() {
            trial.dual_stage = Some(DualStage::Recall);
            self.pending
                .push(RunnerEvent::RecallPrompted { index: trial.index });
        }
        self.deadline_ns = None;
    }

    fn advance(&mut self, now: u64) {
        if self.next_index < self.trials.len() {
            self.begin_next_trial(now);
        } else {
            self.complete();
        }
    }

    /// Feeds one logical button press. Returns whether it was accepted.
    ///
    /// Buttons outside the variant's response space, presses while no window
    /// is open, and anything after the trial's first answer are ignored.
    pub fn handle_response(&mut self, button: ResponseButton) -> bool {
        if !self.variant.accepts(button) || !self.state.allows_input() {
            return false;
        }
        let now = self.timer.now();
        let Some(trial) = self.current.as_mut() else {
            return false;
        };

        let capture = if self.variant.is_compound() {
            if self.state != RunnerState::AwaitingResponse {
                return false;
            }
            match (trial.dual_stage, button) {
                (Some(DualStage::Reflex), ResponseButton::Press) => {
                    trial.timestamps.response = Some(now);
                    Capture::Reflex
                }
                (Some(DualStage::Recall), b) if b.is_recall() => {
                    trial.response = Some(b);
                    Capture::Final
                }
                _ => return false,
            }
        } else {
            if trial.response.is_some() {
                return false;
            }
            trial.response = Some(button);
            trial.timestamps.response = Some(now);
            if self.timings.ends_on_response {
                Capture::Final
            } else {
                Capture::Latched
            }
        };

        let index = trial.index;
        let reaction_time_ms = trial.reaction_time_ms();
        debug!(index, button = button.label(), ?reaction_time_ms, "response captured");
        self.pending.push(RunnerEvent::ResponseCaptured {
            index,
            button,
            reaction_time_ms,
        });

        match capture {
            Capture::Latched => {}
            Capture::Reflex => self.enter_recall(),
            Capture::Final => {
                self.state = RunnerState::Scoring;
                self.deadline_ns = None;
            }
        }
        true
    }

    /// Scores the trial waiting in `Scoring`. Calling it again for the same
    /// trial appends nothing and returns false.
    pub fn score(&mut self) -> bool {
        if self.state != RunnerState::Scoring {
            return false;
        }
        let Some(trial) = self.current.as_mut() else {
            return false;
        };
        if trial.scored {
            return false;
        }
        trial.scored = true;

        let record = TrialRecord::new(
            trial.definition.clone(),
            trial.index,
            trial.reaction_time_ms(),
            trial.response,
        );
        debug!(
            index = record.presentation_index,
            correct = record.is_correct,
            reaction_time_ms = ?record.reaction_time_ms,
            "trial scored"
        );
        self.pending.push(RunnerEvent::TrialScored {
            index: record.presentation_index,
            correct: record.is_correct,
        });
        self.records.push(record);
        true
    }

    fn complete(&mut self) {
        self.state = RunnerState::Completed;
        self.deadline_ns = None;
        self.current = None;

        let run = RunResult::new(
            self.subject_id.clone(),
            self.variant,
            Utc::now(),
            self.records.clone(),
        );
        let summary = RunSummary::from_records(&run.records);
        info!(
            test = self.variant.test_name(),
            trials = summary.trials,
            correct = summary.correct,
            mean_rt_ms = ?summary.mean_rt_ms,
            "run completed"
        );

        self.submission = match self.sink.submit(&run) {
            Ok(()) => {
                info!(sink = %self.sink.describe(), "results submitted");
                SubmissionStatus::Submitted
            }
            Err(e) => {
                error!(sink = %self.sink.describe(), error = %e, "results submission failed");
                SubmissionStatus::Failed(e.to_string())
            }
        };
        self.pending.push(RunnerEvent::Completed {
            submitted: self.submission == SubmissionStatus::Submitted,
        });
        self.result = Some(run);
    }

    /// Ends the run without submitting anything.
    pub fn abort(&mut self) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        warn!(
            test = self.variant.test_name(),
            scored = self.records.len(),
            "run aborted"
        );
        self.state = RunnerState::Aborted;
        self.deadline_ns = None;
        self.current = None;
        self.pending.push(RunnerEvent::Aborted);
        true
    }

    /// What the renderer should draw at the current instant.
    pub fn scene(&self) -> Scene<'_> {
        match self.state {
            RunnerState::Idle | RunnerState::Scoring => Scene::Blank,
            RunnerState::Fixation => Scene::Fixation,
            RunnerState::Completed | RunnerState::Aborted => Scene::Done,
            RunnerState::StimulusVisible | RunnerState::AwaitingResponse => {
                let Some(trial) = &self.current else {
                    return Scene::Blank;
                };
                let now = self.timer.now();
                match &trial.definition.stimulus {
                    StimulusType::NumberFlash { number, flash_side } => match trial.dual_stage {
                        // The number stays up through the delay before the flash.
                        None => Scene::DualNumber(*number),
                        Some(DualStage::Reflex) => {
                            let flash_ms = self.timings.dual.as_ref().map_or(0, |d| d.flash_ms);
                            let onset = trial.timestamps.window_start.unwrap_or(now);
                            Scene::ReflexCue {
                                side: *flash_side,
                                flash_visible: now < onset + flash_ms * NS_PER_MS,
                            }
                        }
                        Some(DualStage::Recall) => Scene::RecallPrompt,
                    },
                    stimulus => {
                        let exposed = self.state == RunnerState::StimulusVisible
                            || trial.durations.exposure_ms.is_none();
                        if exposed {
                            Scene::Stimulus(stimulus)
                        } else {
                            Scene::Blank
                        }
                    }
                }
            }
        }
    }

    /// (1-based position of the current trial, total trials).
    pub fn trial_progress(&self) -> (usize, usize) {
        let position = match &self.current {
            Some(t) => t.index + 1,
            None => self.next_index,
        };
        (position, self.trials.len())
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn variant(&self) -> TestVariant {
        self.variant
    }

    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    pub fn timings(&self) -> &VariantTimings {
        &self.timings
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::from_records(&self.records)
    }

    /// Present once the run has completed; aborted runs never build one.
    pub fn result(&self) -> Option<&RunResult> {
        self.result.as_ref()
    }

    pub fn submission(&self) -> &SubmissionStatus {
        &self.submission
    }

    pub fn current_trial(&self) -> Option<&ActiveTrial<u64>> {
        self.current.as_ref()
    }

    pub fn dual_stage(&self) -> Option<DualStage> {
        self.current.as_ref().and_then(|t| t.dual_stage)
    }

    /// The one armed deadline, in timer nanoseconds.
    pub fn deadline_ns(&self) -> Option<u64> {
        self.deadline_ns
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }
}
