use neurotest_core::{ResponseButton, TrialDefinition};

/// Which half of a dual-task trial is waiting for input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DualStage {
    Reflex,
    Recall,
}

/// The trial currently on screen, with its latch and timestamps.
#[derive(Debug, Clone)]
pub struct ActiveTrial<T> {
    /// Presentation position within the run.
    pub index: usize,
    pub definition: TrialDefinition,
    pub durations: TrialDurations,
    pub timestamps: TrialTimestamps<T>,
    /// First qualifying answer; once set, later inputs are ignored.
    pub response: Option<ResponseButton>,
    pub dual_stage: Option<DualStage>,
    pub scored: bool,
}

#[derive(Debug, Clone)]
pub struct TrialDurations {
    pub fixation_ms: u64,
    pub exposure_ms: Option<u64>,
    pub response_window_ms: Option<u64>,
    /// Randomized pause before the dual-task flash.
    pub secondary_delay_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct TrialTimestamps<T> {
    pub fixation_start: T,
    pub stimulus_start: Option<T>,
    /// Onset that reaction time is measured from: the stimulus itself, or the
    /// red flash in the dual task.
    pub window_start: Option<T>,
    pub response: Option<T>,
}

impl ActiveTrial<u64> {
    pub fn new(
        index: usize,
        definition: TrialDefinition,
        durations: TrialDurations,
        now_ns: u64,
    ) -> Self {
        Self {
            index,
            definition,
            durations,
            timestamps: TrialTimestamps {
                fixation_start: now_ns,
                stimulus_start: None,
                window_start: None,
                response: None,
            },
            response: None,
            dual_stage: None,
            scored: false,
        }
    }

    pub fn reaction_time_ms(&self) -> Option<u64> {
        let onset = self.timestamps.window_start?;
        let at = self.timestamps.response?;
        Some(at.saturating_sub(onset) / 1_000_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurotest_core::{ArrowDirection, StimulusType};

    fn trial() -> ActiveTrial<u64> {
        ActiveTrial::new(
            0,
            TrialDefinition::new(
                0,
                StimulusType::Arrow {
                    direction: ArrowDirection::Up,
                },
            ),
            TrialDurations {
                fixation_ms: 1000,
                exposure_ms: Some(200),
                response_window_ms: Some(1000),
                secondary_delay_ms: None,
            },
            0,
        )
    }

    #[test]
    fn reaction_time_truncates_to_whole_ms() {
        let mut t = trial();
        t.timestamps.window_start = Some(1_000_000_000);
        t.timestamps.response = Some(1_345_999_999);
        assert_eq!(t.reaction_time_ms(), Some(345));
    }

    #[test]
    fn no_response_means_no_reaction_time() {
        let mut t = trial();
        t.timestamps.window_start = Some(5);
        assert_eq!(t.reaction_time_ms(), None);
    }
}
