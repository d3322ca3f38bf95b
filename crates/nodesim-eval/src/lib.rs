//! Lazy evaluation of node trees with cached simulation zones.
//!
//! Node bodies pull their inputs through [`LazyEvaluationParams`] and may
//! suspend until upstream nodes have run. The [`Evaluator`] drives that
//! protocol over a [`nodesim_core::NodeTree`], descending into group and
//! repeat nodes under child compute contexts.
//!
//! A simulation zone is a `SimulationInput` paired with a
//! `SimulationOutput`. The output commits one frame per evaluated time into
//! the session's frame caches; the input replays the most recent committed
//! frame at or before the current frame instead of pulling its live input.
//!
//! # Usage
//!
//! ```ignore
//! let session = EvaluationSession::new("Cube");
//! let root = session.root_context();
//! for frame in 1..=10 {
//!     let time = SceneTime::at_frame(frame);
//!     let mut evaluator = Evaluator::for_session(&session, &time, EvaluatorConfig::default());
//!     let outputs = evaluator.evaluate(&tree, &root, &[(output, socket::GEOMETRY)])?;
//! }
//! ```

pub mod error;
pub mod nodes;
pub mod params;
pub mod scene;
pub mod session;
pub mod state;
pub mod trace;

pub use error::EvalError;
pub use nodes::simulation_input::{SimulationInputState, UNDEFINED_DELTA_TIME};
pub use nodes::simulation_output::SimulationOutputState;
pub use nodes::{GroupInputs, NodeExecContext};
pub use params::{ExecOutcome, ExecParams, InputStatus, LazyEvaluationParams};
pub use scene::{SceneTime, TimeSource};
pub use session::EvaluationSession;
pub use state::{EvaluatedOutputs, Evaluator, EvaluatorConfig, SocketRef};
pub use trace::{TraceEntry, TraceOutcome};
