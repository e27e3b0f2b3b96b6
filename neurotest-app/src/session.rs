use neurotest_core::{SessionPhase, TestVariant};
use neurotest_experiment::{RunSummary, RunnerEvent, SubmissionStatus, TrialRunner};
use neurotest_render::FrameContent;
use neurotest_timing::Timer;
use rand::Rng;
use tracing::info;

use crate::keymap::KeyAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionControl {
    Continue,
    Exit,
}

/// Welcome, run and debrief screens around one [`TrialRunner`].
pub struct Session<T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    phase: SessionPhase,
    runner: TrialRunner<T, R>,
    debrief: Vec<String>,
}

/// Debrief lines for a finished run.
pub fn summary_lines(summary: &RunSummary) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Correct: {}/{} ({}%)",
            summary.correct,
            summary.trials,
            summary.accuracy_percent()
        ),
        format!("Responses: {}/{}", summary.responses, summary.trials),
    ];
    match (summary.mean_rt_ms, summary.min_rt_ms, summary.max_rt_ms) {
        (Some(mean), Some(min), Some(max)) => {
            lines.push(format!("Mean reaction time: {mean:.0} ms"));
            lines.push(format!("Fastest {min} ms, slowest {max} ms"));
        }
        _ => lines.push("No reaction times recorded".to_string()),
    }
    lines
}

impl<T, R> Session<T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    pub fn new(runner: TrialRunner<T, R>) -> Self {
        Self {
            phase: SessionPhase::Welcome,
            runner,
            debrief: Vec::new(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn variant(&self) -> TestVariant {
        self.runner.variant()
    }

    pub fn runner(&self) -> &TrialRunner<T, R> {
        &self.runner
    }

    /// Polls the runner; call once per frame.
    pub fn tick(&mut self) {
        if self.phase.is_running() {
            let events = self.runner.update();
            self.absorb(events);
        }
    }

    pub fn handle_key(&mut self, action: KeyAction) -> SessionControl {
        match action {
            KeyAction::Quit => {
                self.abort();
                return SessionControl::Exit;
            }
            KeyAction::Begin if self.phase.is_welcome() => {
                self.phase = SessionPhase::Running;
                let events = self.runner.start();
                self.absorb(events);
            }
            KeyAction::Respond(button) if self.phase.is_running() => {
                self.runner.handle_response(button);
            }
            _ => {}
        }
        SessionControl::Continue
    }

    /// Drops an unfinished run without submitting it.
    pub fn abort(&mut self) -> bool {
        let aborted = self.runner.abort();
        if aborted {
            info!("session cancelled by the operator");
        }
        aborted
    }

    fn absorb(&mut self, events: Vec<RunnerEvent>) {
        for event in events {
            if let RunnerEvent::Completed { .. } = event {
                self.debrief = summary_lines(&self.runner.summary());
                self.phase = SessionPhase::Debrief;
            }
        }
    }

    pub fn frame_content(&self) -> FrameContent<'_> {
        FrameContent {
            session: self.phase,
            scene: self.runner.scene(),
            progress: self
                .phase
                .is_running()
                .then(|| self.runner.trial_progress()),
            debrief: &self.debrief,
            submission_failed: matches!(self.runner.submission(), SubmissionStatus::Failed(_)),
        }
    }
}
