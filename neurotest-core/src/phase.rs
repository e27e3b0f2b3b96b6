/// Ordered states with a nominal successor.
pub trait Phase: Copy + Clone + PartialEq + Send + Sync + std::fmt::Debug + Default {
    fn allows_input(&self) -> bool;
    fn next(&self) -> Option<Self>;

    fn is_terminal(&self) -> bool {
        self.next().is_none()
    }
}

/// States of the trial runner.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum RunnerState {
    #[default]
    Idle,
    Fixation,
    StimulusVisible,
    AwaitingResponse,
    Scoring,
    Completed,
    Aborted,
}

impl Phase for RunnerState {
    fn allows_input(&self) -> bool {
        matches!(self, Self::StimulusVisible | Self::AwaitingResponse)
    }

    /// `Scoring` nominally loops back to `Fixation`; the runner switches to
    /// `Completed` after the last trial.
    fn next(&self) -> Option<Self> {
        use RunnerState::*;
        Some(match self {
            Idle => Fixation,
            Fixation => StimulusVisible,
            StimulusVisible => AwaitingResponse,
            AwaitingResponse => Scoring,
            Scoring => Fixation,
            Completed | Aborted => return None,
        })
    }
}

/// Screens wrapped around a run in the windowed app.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Welcome,
    Running,
    Debrief,
}

impl Phase for SessionPhase {
    fn allows_input(&self) -> bool {
        true
    }

    fn next(&self) -> Option<Self> {
        use SessionPhase::*;
        Some(match self {
            Welcome => Running,
            Running => Debrief,
            Debrief => return None,
        })
    }
}

impl SessionPhase {
    pub fn is_welcome(&self) -> bool {
        matches!(self, SessionPhase::Welcome)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, SessionPhase::Running)
    }
}
