use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use neurotest_core::{Condition, RunResult, StimulusType, TrialRecord};
use neurotest_experiment::RunSummary;
use neurotest_experiment::sink::read_run;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Reads every saved run in `dir`, oldest first. Files that do not parse are
/// skipped with a warning.
pub fn load_runs(dir: &Path, subject: Option<&str>) -> anyhow::Result<Vec<RunResult>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("reading results from {}", dir.display()))?;

    let mut runs = Vec::new();
    for path in json_files(dir, entries.map(|entry| entry.map(|e| e.path()))) {
        match read_run(&path) {
            Ok(run) if subject.is_none_or(|s| s == run.subject_id) => runs.push(run),
            Ok(_) => debug!(path = %path.display(), "skipping other subject"),
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable results file"),
        }
    }
    runs.sort_by_key(|r| r.completed_at);
    Ok(runs)
}

/// `.json` paths among `entries`; entries that fail to read are skipped.
fn json_files(dir: &Path, entries: impl Iterator<Item = io::Result<PathBuf>>) -> Vec<PathBuf> {
    entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "skipping unreadable directory entry");
                None
            }
        })
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect()
}

pub fn format_row(run: &RunResult) -> String {
    let summary = RunSummary::from_records(&run.records);
    let mean = summary
        .mean_rt_ms
        .map_or_else(|| "-".to_string(), |m| format!("{m:.0} ms"));
    format!(
        "{:<16} {:<14} {} {:>3}/{:<3} {:>4}% {:>8}",
        run.subject_id,
        run.test_name,
        run.completed_at.format("%Y-%m-%d %H:%M"),
        summary.correct,
        summary.trials,
        summary.accuracy_percent(),
        mean
    )
}

pub fn print_report(runs: &[RunResult]) {
    if runs.is_empty() {
        println!("no results found");
        return;
    }
    println!(
        "{:<16} {:<14} {:<16} {:>7} {:>5} {:>8}",
        "subject", "test", "completed", "correct", "acc", "mean rt"
    );
    for run in runs {
        println!("{}", format_row(run));
    }
}

/// One exported trial; field order is the CSV column order.
#[derive(Debug, Serialize)]
pub struct TrialRow<'a> {
    pub subject: &'a str,
    pub test: &'a str,
    pub completed: String,
    /// 1-based presentation position.
    pub trial: usize,
    pub stimulus: String,
    pub condition: Option<Condition>,
    pub reaction_time_ms: Option<u64>,
    pub response: Option<&'static str>,
    pub correct: bool,
}

impl<'a> TrialRow<'a> {
    pub fn new(run: &'a RunResult, record: &TrialRecord) -> Self {
        Self {
            subject: &run.subject_id,
            test: &run.test_name,
            completed: run.completed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            trial: record.presentation_index + 1,
            stimulus: describe_stimulus(&record.trial.stimulus),
            condition: record.condition,
            reaction_time_ms: record.reaction_time_ms,
            response: record.user_response.map(|b| b.label()),
            correct: record.is_correct,
        }
    }
}

pub fn describe_stimulus(stimulus: &StimulusType) -> String {
    match stimulus {
        StimulusType::DigitPair {
            num1,
            num2,
            size1,
            size2,
        } => format!("{num1} vs {num2} ({size1}/{size2})"),
        StimulusType::Arrow { direction } => direction.name().to_string(),
        StimulusType::ColorPatch { color, side } => format!("{} {}", color.name(), side.name()),
        StimulusType::FlankerRow { .. } => stimulus.label().unwrap_or_default(),
        StimulusType::NumberFlash { number, flash_side } => match number {
            Some(n) => format!("{n}, flash {}", flash_side.name()),
            None => format!("no number, flash {}", flash_side.name()),
        },
    }
}

fn format_trial(row: &TrialRow<'_>) -> String {
    let rt = row
        .reaction_time_ms
        .map_or_else(|| "-".to_string(), |ms| format!("{ms} ms"));
    let condition = match row.condition {
        Some(Condition::Congruent) => "congruent",
        Some(Condition::Incongruent) => "incongruent",
        None => "",
    };
    format!(
        "  #{:<3} {:<24} {:<10} {:>8} {:<9} {}",
        row.trial,
        row.stimulus,
        row.response.unwrap_or("-"),
        rt,
        if row.correct { "correct" } else { "wrong" },
        condition
    )
    .trim_end()
    .to_string()
}

/// Summary line of each run followed by one line per trial.
pub fn print_details(runs: &[RunResult]) {
    for run in runs {
        println!("{}", format_row(run));
        for record in &run.records {
            println!("{}", format_trial(&TrialRow::new(run, record)));
        }
    }
}

/// Writes one CSV row per trial of every run. Returns the number of rows.
pub fn write_csv(runs: &[RunResult], path: &Path) -> anyhow::Result<usize> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    let mut rows = 0;
    for run in runs {
        for record in &run.records {
            writer.serialize(TrialRow::new(run, record))?;
            rows += 1;
        }
    }
    writer
        .flush()
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), rows, "trials exported");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use neurotest_core::{ArrowDirection, ResponseButton, ScreenSide, StimulusColor, TestVariant};
    use neurotest_core::TrialDefinition;
    use neurotest_experiment::{JsonFileSink, ResultsSink};
    use tempfile::tempdir;

    fn run(subject: &str, minute: u32) -> RunResult {
        let def = TrialDefinition::new(
            0,
            StimulusType::ColorPatch {
                color: StimulusColor::Red,
                side: ScreenSide::Left,
            },
        );
        let records = vec![
            TrialRecord::new(def.clone(), 0, Some(420), Some(ResponseButton::Red)),
            TrialRecord::new(def, 1, Some(380), Some(ResponseButton::Blue)),
        ];
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, minute, 0).unwrap();
        RunResult::new(subject, TestVariant::SimonEffect, at, records)
    }

    #[test]
    fn loads_sorted_and_filtered_runs() {
        let dir = tempdir().unwrap();
        let mut sink = JsonFileSink::new(dir.path());
        sink.submit(&run("bob", 30)).unwrap();
        sink.submit(&run("alice", 10)).unwrap();
        sink.submit(&run("alice", 5)).unwrap();
        fs::write(dir.path().join("broken.json"), "{").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let all = load_runs(dir.path(), None).unwrap();
        let minutes: Vec<String> = all
            .iter()
            .map(|r| r.completed_at.format("%M").to_string())
            .collect();
        assert_eq!(minutes, ["05", "10", "30"]);

        let alice = load_runs(dir.path(), Some("alice")).unwrap();
        assert_eq!(alice.len(), 2);
        assert!(alice.iter().all(|r| r.subject_id == "alice"));
    }

    #[test]
    fn details_list_every_trial() {
        let r = run("alice", 5);
        let lines: Vec<String> = r
            .records
            .iter()
            .map(|rec| format_trial(&TrialRow::new(&r, rec)))
            .collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("  #1"));
        assert!(lines[0].contains("red left"));
        assert!(lines[0].contains("420 ms"));
        assert!(lines[0].contains("correct"));
        assert!(lines[0].ends_with("congruent"));
        assert!(lines[1].contains("blue"));
        assert!(lines[1].contains("wrong"));
    }

    #[test]
    fn stimulus_descriptions() {
        let flanker = StimulusType::FlankerRow {
            target: ArrowDirection::Left,
            flanker: ArrowDirection::Right,
        };
        assert_eq!(describe_stimulus(&flanker), ">><>>");
        let dual = StimulusType::NumberFlash {
            number: None,
            flash_side: ScreenSide::Right,
        };
        assert_eq!(describe_stimulus(&dual), "no number, flash right");
    }

    #[test]
    fn csv_has_one_row_per_trial() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("alice.csv");
        let runs = vec![run("alice", 5), run("alice", 10)];
        assert_eq!(write_csv(&runs, &path).unwrap(), 4);

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader
            .headers()
            .unwrap()
            .iter()
            .map(str::to_string)
            .collect();
        assert_eq!(
            headers,
            [
                "subject",
                "test",
                "completed",
                "trial",
                "stimulus",
                "condition",
                "reaction_time_ms",
                "response",
                "correct"
            ]
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 4);
        assert_eq!(
            rows[1].iter().collect::<Vec<_>>(),
            [
                "alice",
                "SimonEffect",
                "2025-03-14 09:05:00",
                "2",
                "red left",
                "congruent",
                "380",
                "blue",
                "false"
            ]
        );
    }

    #[test]
    fn csv_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nope").join("out.csv");
        assert!(write_csv(&[run("alice", 5)], &path).is_err());
    }

    #[test]
    fn bad_directory_entries_are_skipped() {
        let entries = vec![
            Ok(PathBuf::from("r/a.json")),
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied")),
            Ok(PathBuf::from("r/notes.txt")),
            Ok(PathBuf::from("r/b.json")),
        ];
        assert_eq!(
            json_files(Path::new("r"), entries.into_iter()),
            [PathBuf::from("r/a.json"), PathBuf::from("r/b.json")]
        );
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(load_runs(&dir.path().join("nope"), None).is_err());
    }

    #[test]
    fn row_shows_accuracy_and_mean() {
        let row = format_row(&run("alice", 5));
        assert!(row.starts_with("alice"));
        assert!(row.contains("SimonEffect"));
        assert!(row.contains("2025-03-14 09:05"));
        assert!(row.contains("1/2"));
        assert!(row.contains("50%"));
        assert!(row.contains("400 ms"));
    }
}
