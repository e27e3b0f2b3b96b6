pub mod catalog;
pub mod config;
pub mod error;
pub mod sink;
pub mod state;
pub mod summary;
pub mod trial;

pub use catalog::TrialSetProvider;
pub use config::{DualTimings, VariantTimings};
pub use error::{RunnerError, SinkError};
pub use sink::{JsonFileSink, MemorySink, ResultsSink};
pub use state::{RunnerEvent, SubmissionStatus, TrialRunner};
pub use summary::RunSummary;
pub use trial::{ActiveTrial, DualStage, TrialDurations, TrialTimestamps};
