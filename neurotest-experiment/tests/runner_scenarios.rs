use neurotest_core::{
    ArrowDirection, ResponseButton, RunResult, RunnerState, ScreenSide, StimulusType,
    TestVariant, TrialDefinition,
};
use neurotest_experiment::{
    DualStage, MemorySink, ResultsSink, RunnerError, RunnerEvent, SinkError, SubmissionStatus,
    TrialRunner, TrialSetProvider, VariantTimings,
};
use neurotest_timing::ManualTimer;
use rand::SeedableRng;
use rand::rngs::StdRng;

type Runner = TrialRunner<ManualTimer, StdRng>;

fn build(
    variant: TestVariant,
    stimuli: Vec<StimulusType>,
    sink: Box<dyn ResultsSink>,
) -> (Runner, ManualTimer) {
    let trials = stimuli
        .into_iter()
        .enumerate()
        .map(|(id, s)| TrialDefinition::new(id, s))
        .collect();
    let timer = ManualTimer::new();
    let runner = TrialRunner::new(
        "subject-1",
        variant,
        trials,
        timer.clone(),
        StdRng::seed_from_u64(42),
        sink,
    )
    .unwrap()
    .with_timings(VariantTimings::for_variant(variant).with_lead_in(0));
    (runner, timer)
}

fn tick(runner: &mut Runner, timer: &ManualTimer, ms: u64) -> Vec<RunnerEvent> {
    timer.advance_ms(ms);
    runner.update()
}

fn arrow(direction: ArrowDirection) -> StimulusType {
    StimulusType::Arrow { direction }
}

/// Presses 250 ms after onset on every trial flagged in `press`.
fn play_go_no_go(directions: &[ArrowDirection], press: &[bool]) -> (Runner, MemorySink) {
    let sink = MemorySink::new();
    let stimuli = directions.iter().copied().map(arrow).collect();
    let (mut runner, timer) = build(TestVariant::GoNoGo, stimuli, Box::new(sink.clone()));
    runner.start();
    for &pressed in press {
        tick(&mut runner, &timer, 1000);
        timer.advance_ms(250);
        if pressed {
            assert!(runner.handle_response(ResponseButton::Press));
        }
        runner.update();
        tick(&mut runner, &timer, 750);
    }
    (runner, sink)
}

#[test]
fn go_no_go_presses_on_go_trials_are_all_correct() {
    use ArrowDirection::{Down, Up};
    let (runner, sink) = play_go_no_go(&[Up, Down, Up], &[true, false, true]);

    assert_eq!(runner.state(), RunnerState::Completed);
    assert_eq!(runner.submission(), &SubmissionStatus::Submitted);
    let runs = sink.runs();
    assert_eq!(runs.len(), 1);
    let run = &runs[0];
    assert_eq!(run.test_name, "GoNoGo");
    assert_eq!(run.subject_id, "subject-1");
    assert_eq!(run.records.len(), 3);
    assert!(run.records.iter().all(|r| r.is_correct));
    assert_eq!(run.records[0].reaction_time_ms, Some(250));
    assert_eq!(run.records[1].reaction_time_ms, None);
    assert_eq!(run.records[1].user_response, None);
}

#[test]
fn pressing_on_the_no_go_trial_is_incorrect() {
    use ArrowDirection::{Down, Up};
    let (runner, _sink) = play_go_no_go(&[Up, Down, Up], &[true, true, true]);
    let correct: Vec<bool> = runner.records().iter().map(|r| r.is_correct).collect();
    assert_eq!(correct, vec![true, false, true]);
}

#[test]
fn missing_a_go_trial_is_a_scored_non_response() {
    let (runner, _sink) = play_go_no_go(&[ArrowDirection::Up], &[false]);
    let record = &runner.records()[0];
    assert!(!record.is_correct);
    assert_eq!(record.reaction_time_ms, None);
}

#[test]
fn go_no_go_trial_runs_its_full_window_after_a_press() {
    let (mut runner, timer) = build(
        TestVariant::GoNoGo,
        vec![arrow(ArrowDirection::Up), arrow(ArrowDirection::Up)],
        Box::new(MemorySink::new()),
    );
    runner.start();
    tick(&mut runner, &timer, 1000);
    timer.advance_ms(100);
    assert!(runner.handle_response(ResponseButton::Press));
    runner.update();
    assert_eq!(runner.trial_progress(), (1, 2));
    tick(&mut runner, &timer, 800);
    assert_eq!(runner.state(), RunnerState::AwaitingResponse);
    let events = tick(&mut runner, &timer, 100);
    assert!(events.contains(&RunnerEvent::TrialScored {
        index: 0,
        correct: true
    }));
    assert_eq!(runner.state(), RunnerState::Fixation);
}

#[test]
fn scoring_twice_appends_one_record() {
    let (mut runner, timer) = build(
        TestVariant::DigitStroop,
        vec![StimulusType::DigitPair {
            num1: 4,
            num2: 1,
            size1: 24.0,
            size2: 48.0,
        }],
        Box::new(MemorySink::new()),
    );
    runner.start();
    tick(&mut runner, &timer, 1000);
    assert!(runner.handle_response(ResponseButton::Greater));
    assert_eq!(runner.state(), RunnerState::Scoring);

    assert!(runner.score());
    assert!(!runner.score());
    assert_eq!(runner.records().len(), 1);

    runner.update();
    assert_eq!(runner.state(), RunnerState::Completed);
    assert_eq!(runner.result().map(|r| r.records.len()), Some(1));
}

fn stroop_once(num1: u8, num2: u8, answer: ResponseButton) -> bool {
    let (mut runner, timer) = build(
        TestVariant::DigitStroop,
        vec![StimulusType::DigitPair {
            num1,
            num2,
            size1: 36.0,
            size2: 36.0,
        }],
        Box::new(MemorySink::new()),
    );
    runner.start();
    tick(&mut runner, &timer, 1000);
    timer.advance_ms(640);
    assert!(runner.handle_response(answer));
    runner.update();
    let record = &runner.records()[0];
    assert_eq!(record.reaction_time_ms, Some(640));
    record.is_correct
}

#[test]
fn digit_stroop_compares_values_not_sizes() {
    assert!(stroop_once(4, 1, ResponseButton::Greater));
    assert!(!stroop_once(4, 1, ResponseButton::Less));
    assert!(!stroop_once(4, 1, ResponseButton::Equal));
    assert!(stroop_once(3, 3, ResponseButton::Equal));
    assert!(!stroop_once(3, 3, ResponseButton::Greater));
}

#[test]
fn stroop_waits_for_an_answer_and_keeps_the_first() {
    let (mut runner, timer) = build(
        TestVariant::DigitStroop,
        vec![StimulusType::DigitPair {
            num1: 1,
            num2: 2,
            size1: 48.0,
            size2: 24.0,
        }],
        Box::new(MemorySink::new()),
    );
    runner.start();
    tick(&mut runner, &timer, 1000);
    tick(&mut runner, &timer, 60_000);
    assert_eq!(runner.state(), RunnerState::AwaitingResponse);
    assert_eq!(runner.deadline_ns(), None);
    assert!(runner.handle_response(ResponseButton::Less));
    assert!(!runner.handle_response(ResponseButton::Greater));
    runner.update();
    assert_eq!(
        runner.records()[0].user_response,
        Some(ResponseButton::Less)
    );
}

#[test]
fn flanker_scores_the_central_arrow_only() {
    let (mut runner, timer) = build(
        TestVariant::FlankerTask,
        vec![
            StimulusType::FlankerRow {
                target: ArrowDirection::Left,
                flanker: ArrowDirection::Right,
            },
            StimulusType::FlankerRow {
                target: ArrowDirection::Left,
                flanker: ArrowDirection::Left,
            },
        ],
        Box::new(MemorySink::new()),
    );
    runner.start();
    tick(&mut runner, &timer, 1000);
    assert!(runner.handle_response(ResponseButton::Left));
    runner.update();
    tick(&mut runner, &timer, 1000);
    assert!(runner.handle_response(ResponseButton::Right));
    runner.update();

    let correct: Vec<bool> = runner.records().iter().map(|r| r.is_correct).collect();
    assert_eq!(correct, vec![true, false]);
}

#[test]
fn dual_task_combines_reflex_and_recall() {
    let (mut runner, timer) = build(
        TestVariant::DualTask,
        vec![StimulusType::NumberFlash {
            number: Some(2),
            flash_side: ScreenSide::Left,
        }],
        Box::new(MemorySink::new()),
    );
    runner.start();
    tick(&mut runner, &timer, 1000);
    assert_eq!(runner.state(), RunnerState::StimulusVisible);
    // No reflex press before the flash.
    assert!(!runner.handle_response(ResponseButton::Press));

    // Number for 1000 ms, then at most 500 ms of delay.
    let events = tick(&mut runner, &timer, 1500);
    assert!(events.contains(&RunnerEvent::ResponseWindowOpened { index: 0 }));
    assert_eq!(runner.dual_stage(), Some(DualStage::Reflex));
    assert!(!runner.handle_response(ResponseButton::Two));

    timer.advance_ms(180);
    assert!(runner.handle_response(ResponseButton::Press));
    assert_eq!(runner.dual_stage(), Some(DualStage::Recall));
    assert!(!runner.handle_response(ResponseButton::Press));
    assert!(runner.handle_response(ResponseButton::Two));
    runner.update();

    assert_eq!(runner.state(), RunnerState::Completed);
    let record = &runner.records()[0];
    assert_eq!(record.reaction_time_ms, Some(180));
    assert_eq!(record.user_response, Some(ResponseButton::Two));
    assert!(record.is_correct);
}

#[test]
fn dual_task_reflex_window_expires_into_recall() {
    let mut timings = VariantTimings::for_variant(TestVariant::DualTask);
    if let Some(dual) = timings.dual.as_mut() {
        dual.reflex_window_ms = Some(1000);
    }
    let (runner, timer) = build(
        TestVariant::DualTask,
        vec![StimulusType::NumberFlash {
            number: None,
            flash_side: ScreenSide::Right,
        }],
        Box::new(MemorySink::new()),
    );
    let mut runner = runner.with_timings(timings);
    runner.start();
    tick(&mut runner, &timer, 1000);
    tick(&mut runner, &timer, 1500);
    let events = tick(&mut runner, &timer, 1000);
    assert!(events.contains(&RunnerEvent::RecallPrompted { index: 0 }));
    assert!(runner.handle_response(ResponseButton::NoNumber));
    runner.update();

    let record = &runner.records()[0];
    assert_eq!(record.reaction_time_ms, None);
    assert!(record.is_correct);
}

#[test]
fn abort_submits_nothing() {
    let sink = MemorySink::new();
    let trials = TrialSetProvider::new()
        .with_seed(Some(3))
        .get_trials(TestVariant::SimonEffect);
    let timer = ManualTimer::new();
    let mut runner = TrialRunner::new(
        "subject-2",
        TestVariant::SimonEffect,
        trials,
        timer.clone(),
        StdRng::seed_from_u64(0),
        Box::new(sink.clone()),
    )
    .unwrap();
    runner.start();
    tick(&mut runner, &timer, 2000);
    tick(&mut runner, &timer, 1000);
    assert!(runner.handle_response(ResponseButton::Red));
    runner.update();

    assert!(runner.abort());
    assert!(!runner.abort());
    let events = runner.update();
    assert_eq!(events, vec![RunnerEvent::Aborted]);
    assert_eq!(runner.state(), RunnerState::Aborted);
    assert_eq!(runner.deadline_ns(), None);
    assert!(runner.result().is_none());
    assert!(sink.is_empty());
    assert!(!runner.handle_response(ResponseButton::Blue));
}

struct OfflineSink;

impl ResultsSink for OfflineSink {
    fn submit(&mut self, _run: &RunResult) -> Result<(), SinkError> {
        Err(SinkError::Rejected("service unavailable".into()))
    }

    fn describe(&self) -> String {
        "offline".into()
    }
}

#[test]
fn failed_submission_is_reported_not_retried() {
    let (mut runner, timer) = build(
        TestVariant::FlankerTask,
        vec![StimulusType::FlankerRow {
            target: ArrowDirection::Right,
            flanker: ArrowDirection::Right,
        }],
        Box::new(OfflineSink),
    );
    runner.start();
    tick(&mut runner, &timer, 1000);
    runner.handle_response(ResponseButton::Right);
    let events = runner.update();

    assert!(events.contains(&RunnerEvent::Completed { submitted: false }));
    assert!(matches!(runner.submission(), SubmissionStatus::Failed(msg) if msg.contains("service unavailable")));
    assert!(runner.result().is_some());
    assert!(runner.update().is_empty());
}

#[test]
fn empty_trial_set_is_rejected() {
    let result = TrialRunner::new(
        "nobody",
        TestVariant::GoNoGo,
        Vec::new(),
        ManualTimer::new(),
        StdRng::seed_from_u64(0),
        Box::new(MemorySink::new()),
    );
    assert!(matches!(
        result,
        Err(RunnerError::EmptyTrialSet {
            variant: TestVariant::GoNoGo
        })
    ));
}

#[test]
fn trials_from_another_variant_are_rejected() {
    let result = TrialRunner::new(
        "nobody",
        TestVariant::GoNoGo,
        TrialSetProvider::new().get_trials(TestVariant::SimonEffect),
        ManualTimer::new(),
        StdRng::seed_from_u64(0),
        Box::new(MemorySink::new()),
    );
    assert!(matches!(result, Err(RunnerError::MixedTrialSet { .. })));
}

#[test]
fn default_lead_in_delays_first_fixation() {
    let timer = ManualTimer::new();
    let mut runner = TrialRunner::new(
        "s",
        TestVariant::SimonEffect,
        TrialSetProvider::new().get_trials(TestVariant::SimonEffect),
        timer.clone(),
        StdRng::seed_from_u64(0),
        Box::new(MemorySink::new()),
    )
    .unwrap();
    assert_eq!(runner.start(), vec![RunnerEvent::RunStarted]);
    assert!(tick(&mut runner, &timer, 1999).is_empty());
    assert_eq!(
        tick(&mut runner, &timer, 1),
        vec![RunnerEvent::FixationStarted { index: 0 }]
    );
}
