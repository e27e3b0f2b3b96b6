use neurotest_core::TrialRecord;
use serde::Serialize;

/// Aggregate figures for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub trials: usize,
    /// Trials with a captured reaction time.
    pub responses: usize,
    pub correct: usize,
    pub mean_rt_ms: Option<f64>,
    pub min_rt_ms: Option<u64>,
    pub max_rt_ms: Option<u64>,
}

impl RunSummary {
    pub fn from_records(records: &[TrialRecord]) -> Self {
        let times: Vec<u64> = records.iter().filter_map(|r| r.reaction_time_ms).collect();
        let mean_rt_ms =
            (!times.is_empty()).then(|| times.iter().sum::<u64>() as f64 / times.len() as f64);
        Self {
            trials: records.len(),
            responses: times.len(),
            correct: records.iter().filter(|r| r.is_correct).count(),
            mean_rt_ms,
            min_rt_ms: times.iter().copied().min(),
            max_rt_ms: times.iter().copied().max(),
        }
    }

    pub fn accuracy(&self) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            self.correct as f64 / self.trials as f64
        }
    }

    pub fn response_rate(&self) -> f64 {
        if self.trials == 0 {
            0.0
        } else {
            self.responses as f64 / self.trials as f64
        }
    }

    pub fn accuracy_percent(&self) -> u32 {
        (self.accuracy() * 100.0).round() as u32
    }
}
