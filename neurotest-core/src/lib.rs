pub mod phase;
pub mod response;
pub mod scene;
pub mod scoring;
pub mod stimulus;
pub mod trial;
pub mod variant;

pub use phase::{Phase, RunnerState, SessionPhase};
pub use response::ResponseButton;
pub use scene::Scene;
pub use stimulus::{ArrowDirection, FLANKER_WIDTH, ScreenSide, StimulusColor, StimulusType};
pub use trial::{Condition, RunResult, TrialDefinition, TrialRecord};
pub use variant::{ParseVariantError, TestVariant};
