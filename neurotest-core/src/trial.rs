use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ResponseButton, ScreenSide, StimulusColor, StimulusType, TestVariant, scoring};

/// Congruent/incongruent condition for the interference tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Congruent,
    Incongruent,
}

/// Immutable description of one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialDefinition {
    /// Position in the compiled-in list, before any shuffle.
    pub id: usize,
    pub stimulus: StimulusType,
}

impl TrialDefinition {
    pub fn new(id: usize, stimulus: StimulusType) -> Self {
        Self { id, stimulus }
    }

    pub fn variant(&self) -> TestVariant {
        self.stimulus.variant()
    }

    pub fn expected_response(&self) -> Option<ResponseButton> {
        scoring::expected_response(&self.stimulus)
    }

    pub fn score(&self, response: Option<ResponseButton>) -> bool {
        scoring::is_correct(&self.stimulus, response)
    }

    pub fn condition(&self) -> Option<Condition> {
        let congruent = match &self.stimulus {
            // Red is answered with the left button, blue with the right one.
            StimulusType::ColorPatch { color, side } => matches!(
                (color, side),
                (StimulusColor::Red, ScreenSide::Left) | (StimulusColor::Blue, ScreenSide::Right)
            ),
            StimulusType::FlankerRow { target, flanker } => target == flanker,
            _ => return None,
        };
        Some(if congruent {
            Condition::Congruent
        } else {
            Condition::Incongruent
        })
    }
}

/// Outcome of one executed trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialRecord {
    pub trial: TrialDefinition,
    pub presentation_index: usize,
    /// `None` when nothing was captured within the response window.
    #[serde(rename = "reactionTime")]
    pub reaction_time_ms: Option<u64>,
    pub user_response: Option<ResponseButton>,
    pub is_correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl TrialRecord {
    pub fn new(
        trial: TrialDefinition,
        presentation_index: usize,
        reaction_time_ms: Option<u64>,
        user_response: Option<ResponseButton>,
    ) -> Self {
        let is_correct = trial.score(user_response);
        let condition = trial.condition();
        Self {
            trial,
            presentation_index,
            reaction_time_ms,
            user_response,
            is_correct,
            condition,
        }
    }
}

/// A finished run, ready for the results sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    #[serde(rename = "name")]
    pub subject_id: String,
    #[serde(rename = "test")]
    pub test_name: String,
    #[serde(rename = "completionDate")]
    pub completed_at: DateTime<Utc>,
    #[serde(rename = "responses")]
    pub records: Vec<TrialRecord>,
}

impl RunResult {
    pub fn new(
        subject_id: impl Into<String>,
        variant: TestVariant,
        completed_at: DateTime<Utc>,
        records: Vec<TrialRecord>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            test_name: variant.test_name().to_string(),
            completed_at,
            records,
        }
    }

    pub fn variant(&self) -> Option<TestVariant> {
        TestVariant::from_test_name(&self.test_name)
    }
}
