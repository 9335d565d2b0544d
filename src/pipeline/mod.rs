pub mod adapters;
pub mod breaker;
pub mod context;
pub mod executor;
pub mod metrics;
pub mod outcome;
pub mod record;
pub mod runner;
pub mod stages;
pub mod types;

pub use breaker::CircuitBreaker;
pub use context::PipelineContext;
pub use outcome::{PipelineRun, RunState};
pub use record::{Artifacts, Fields, WorkRecord, is_populated};
pub use runner::PipelineRunner;
pub use stages::StageSpec;
pub use types::StageKind;
