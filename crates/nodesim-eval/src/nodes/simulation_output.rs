//! The simulation output node: end of a time-stepped subgraph and the only
//! writer of its frame cache.
//!
//! A frame already committed at exactly the current time is replayed
//! without pulling the input. Otherwise the live Geometry is pulled,
//! committed to the cache bucket of this node's call path, and published.
//! A commit the cache rejects (scrubbing backwards into a gap) is logged and
//! the live result is still published.

use nodesim_core::socket;
use tracing::{debug, trace, warn};

use super::NodeExecContext;
use crate::error::EvalError;
use crate::params::LazyEvaluationParams;

/// Which branch a visit took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationOutputState {
    /// Published the frame already cached at the current time.
    Replayed,
    /// Waiting for the live Geometry input.
    WaitingForInput,
    /// Stored the live result as a new frame.
    Committed,
    /// The cache refused the frame; the live result was published uncached.
    Rejected,
}

pub fn execute<P>(params: &mut P, ctx: &NodeExecContext<'_>) -> Result<SimulationOutputState, EvalError>
where
    P: LazyEvaluationParams + ?Sized,
{
    let current_time = ctx.time.current_simulation_time();
    let hash = ctx.compute_context.simulation(ctx.node).hash();

    let committed = ctx
        .cache
        .lookup_context(hash)
        .and_then(|cache| cache.value_at_time(current_time));
    if let Some(frame) = committed {
        trace!(node = %ctx.node, current_time, "frame already committed");
        if params.lazy_output_is_required(socket::GEOMETRY) {
            params.set_output(socket::GEOMETRY, frame.payload.into());
        }
        return Ok(SimulationOutputState::Replayed);
    }

    if params.lazy_require_input(socket::GEOMETRY).is_pending() {
        return Ok(SimulationOutputState::WaitingForInput);
    }
    let geometry = params.extract_geometry(socket::GEOMETRY)?;

    let state = match ctx.cache.get_or_create(hash).insert(current_time, geometry.clone()) {
        Ok(()) => {
            debug!(node = %ctx.node, context = ?hash, current_time, "committed simulation frame");
            SimulationOutputState::Committed
        }
        Err(error) => {
            warn!(node = %ctx.node, context = ?hash, %error, "simulation frame not cached");
            SimulationOutputState::Rejected
        }
    };
    params.set_output(socket::GEOMETRY, geometry.into());
    Ok(state)
}
