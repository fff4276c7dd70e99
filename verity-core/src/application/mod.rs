// verity-core/src/application/mod.rs

pub mod engine;
pub mod materialization;
pub mod planner;
pub mod ports;

pub mod pipeline;
pub mod validation;

// --- RE-EXPORTS ---
// Lets the CLI do `use verity_core::application::{run_pipeline, Planner};`
// without knowing the internal file layout.

pub use engine::execute_query;
pub use materialization::Materializer;
pub use planner::Planner;
pub use pipeline::{run_pipeline, RunOptions, RunResult};
pub use validation::run_tests;
