//! Scripted participant for running a test without a window.

use std::time::Duration;

use anyhow::bail;
use neurotest_core::{ResponseButton, TrialDefinition};
use neurotest_experiment::{RunSummary, RunnerEvent, TrialRunner};
use neurotest_timing::Timer;
use rand::Rng;
use rand::seq::IndexedRandom;
use tracing::{debug, info};

const POLL: Duration = Duration::from_millis(1);
const NS_PER_MS: u64 = 1_000_000;

/// Answers every trial after a fixed latency, wrong with probability `error_rate`.
pub struct SimulatedParticipant<R> {
    latency_ms: u64,
    error_rate: f64,
    rng: R,
}

impl<R: Rng> SimulatedParticipant<R> {
    pub fn new(latency_ms: u64, error_rate: f64, rng: R) -> Self {
        Self {
            latency_ms,
            error_rate: error_rate.clamp(0.0, 1.0),
            rng,
        }
    }

    /// `None` withholds the response. Withholding is only picked as a mistake
    /// when `can_withhold` is set, since otherwise the trial would never end.
    pub fn answer(&mut self, trial: &TrialDefinition, can_withhold: bool) -> Option<ResponseButton> {
        let expected = trial.expected_response();
        if !self.rng.random_bool(self.error_rate) {
            return expected;
        }

        let variant = trial.variant();
        let mut options: Vec<Option<ResponseButton>> = ResponseButton::ALL
            .into_iter()
            .filter(|&b| variant.accepts(b))
            .filter(|&b| !variant.is_compound() || b.is_recall())
            .map(Some)
            .collect();
        if can_withhold && !variant.is_compound() {
            options.push(None);
        }
        options.retain(|&o| o != expected);
        options.choose(&mut self.rng).copied().unwrap_or(expected)
    }
}

/// Drives `runner` to the end, feeding it the participant's answers.
pub fn run_headless<T, R, P>(
    runner: &mut TrialRunner<T, R>,
    participant: &mut SimulatedParticipant<P>,
) -> anyhow::Result<RunSummary>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
    P: Rng,
{
    let variant = runner.variant();
    let can_withhold = runner.timings().response_window_ms.is_some();
    let mut scheduled: Option<(u64, ResponseButton)> = None;

    let mut events = runner.start();
    loop {
        for event in events.drain(..) {
            let at = runner.timer.now() + participant.latency_ms * NS_PER_MS;
            match event {
                RunnerEvent::StimulusShown { .. } if !variant.is_compound() => {
                    scheduled = runner
                        .current_trial()
                        .and_then(|t| participant.answer(&t.definition, can_withhold))
                        .map(|b| (at, b));
                }
                RunnerEvent::ResponseWindowOpened { .. } if variant.is_compound() => {
                    scheduled = Some((at, ResponseButton::Press));
                }
                RunnerEvent::RecallPrompted { .. } => {
                    scheduled = runner
                        .current_trial()
                        .and_then(|t| participant.answer(&t.definition, false))
                        .map(|b| (at, b));
                }
                RunnerEvent::TrialScored { index, correct } => {
                    debug!(index, correct, "simulated trial scored");
                }
                _ => {}
            }
        }

        if runner.is_finished() {
            break;
        }
        if scheduled.is_none() && runner.deadline_ns().is_none() {
            bail!("{} run stalled waiting for input", variant.test_name());
        }

        runner.timer.sleep(POLL);
        if let Some((due, button)) = scheduled {
            if runner.timer.now() >= due {
                scheduled = None;
                runner.handle_response(button);
            }
        }
        events = runner.update();
    }

    let summary = runner.summary();
    info!(
        test = variant.test_name(),
        correct = summary.correct,
        trials = summary.trials,
        "headless run finished"
    );
    Ok(summary)
}
