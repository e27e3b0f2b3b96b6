use std::fs;

use chrono::{TimeZone, Utc};
use neurotest_core::{
    ResponseButton, RunResult, ScreenSide, StimulusColor, StimulusType, TestVariant,
    TrialDefinition, TrialRecord,
};
use neurotest_experiment::sink::read_run;
use neurotest_experiment::{JsonFileSink, ResultsSink, SinkError};
use tempfile::tempdir;

fn sample_run() -> RunResult {
    let trial = TrialDefinition::new(
        2,
        StimulusType::ColorPatch {
            color: StimulusColor::Red,
            side: ScreenSide::Left,
        },
    );
    let completed_at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
    RunResult::new(
        "Ada Lovelace",
        TestVariant::SimonEffect,
        completed_at,
        vec![TrialRecord::new(trial, 0, Some(412), Some(ResponseButton::Red))],
    )
}

#[test]
fn run_is_written_as_one_json_document() {
    let dir = tempdir().unwrap();
    let mut sink = JsonFileSink::new(dir.path().join("results"));
    let run = sample_run();
    sink.submit(&run).unwrap();

    let path = sink.path_for(&run);
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("Ada_Lovelace_simon-effect_20250314T092653"));
    assert!(name.ends_with(".json"));

    let raw = fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["name"], "Ada Lovelace");
    assert_eq!(value["test"], "SimonEffect");
    assert!(value["completionDate"].is_string());
    let response = &value["responses"][0];
    assert_eq!(response["reactionTime"], 412);
    assert_eq!(response["userResponse"], "red");
    assert_eq!(response["isCorrect"], true);
    assert_eq!(response["condition"], "congruent");

    assert_eq!(read_run(&path).unwrap(), run);
}

#[test]
fn unreadable_document_is_a_json_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(read_run(&path), Err(SinkError::Json(_))));
}

#[test]
fn missing_document_is_an_io_error() {
    let dir = tempdir().unwrap();
    let err = read_run(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, SinkError::Io { .. }));
    assert!(err.to_string().contains("absent.json"));
}

#[test]
fn unwritable_directory_fails_submission() {
    let dir = tempdir().unwrap();
    let blocker = dir.path().join("file");
    fs::write(&blocker, b"").unwrap();
    let mut sink = JsonFileSink::new(blocker.join("nested"));
    assert!(matches!(sink.submit(&sample_run()), Err(SinkError::Io { .. })));
}
