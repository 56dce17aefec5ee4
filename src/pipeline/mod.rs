/*!
 * Resumable document pipeline.
 *
 * - `steps`: the ten steps and the step mask
 * - `state`: versioned checkpoint and its file store
 * - `paths`: conventional file locations for one document
 * - `source`: recovery of outputs for disabled steps
 * - `orchestrator`: runs the steps and checkpoints after each one
 */

pub mod orchestrator;
pub mod paths;
pub mod source;
pub mod state;
pub mod steps;

pub use self::orchestrator::{Orchestrator, PipelineSettings, RunOptions, RunReport};
pub use self::paths::DocumentPaths;
pub use self::source::{Recovery, StateSource};
pub use self::state::{PipelineState, STATE_VERSION, StateStore, StepOutput};
pub use self::steps::{PRESETS, PipelineStep, StepMask};
