//! Group and repeat nodes: nested trees evaluated under a child context.
//!
//! Each call site gets its own [`ComputeContext`] level, and each repeat
//! iteration another one below that. A simulation inside the nested tree
//! therefore keeps separate history per call site and per iteration.
//!
//! [`ComputeContext`]: nodesim_core::ComputeContext

use nodesim_core::{socket, ComputeContext, NodeId, NodeTree};

use super::GroupInputs;
use crate::error::EvalError;
use crate::params::LazyEvaluationParams;
use crate::state::Evaluator;

pub fn execute_group<P>(
    evaluator: &mut Evaluator<'_>,
    node: NodeId,
    tree: &NodeTree,
    params: &mut P,
    context: &ComputeContext<'_>,
    depth: usize,
) -> Result<(), EvalError>
where
    P: LazyEvaluationParams + ?Sized,
{
    if !params.lazy_output_is_required(socket::GEOMETRY) {
        return Ok(());
    }
    if params.lazy_require_input(socket::GEOMETRY).is_pending() {
        return Ok(());
    }
    let geometry = params.extract_geometry(socket::GEOMETRY)?;

    let inner = context.group(node);
    let inputs = GroupInputs {
        geometry,
        iteration: 0,
    };
    let result = evaluator.evaluate_nested(node, tree, &inner, &inputs, depth + 1)?;
    params.set_output(socket::GEOMETRY, result.into());
    Ok(())
}

/// Runs the nested tree `iterations` times, feeding each result into the
/// next iteration. Zero iterations pass the input through.
pub fn execute_repeat<P>(
    evaluator: &mut Evaluator<'_>,
    node: NodeId,
    iterations: u32,
    tree: &NodeTree,
    params: &mut P,
    context: &ComputeContext<'_>,
    depth: usize,
) -> Result<(), EvalError>
where
    P: LazyEvaluationParams + ?Sized,
{
    if !params.lazy_output_is_required(socket::GEOMETRY) {
        return Ok(());
    }
    if params.lazy_require_input(socket::GEOMETRY).is_pending() {
        return Ok(());
    }
    let mut geometry = params.extract_geometry(socket::GEOMETRY)?;

    for iteration in 0..iterations {
        let inner = context.repeat_iteration(node, iteration);
        let inputs = GroupInputs {
            geometry,
            iteration,
        };
        geometry = evaluator.evaluate_nested(node, tree, &inner, &inputs, depth + 1)?;
    }
    params.set_output(socket::GEOMETRY, geometry.into());
    Ok(())
}
