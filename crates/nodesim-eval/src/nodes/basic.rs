//! Stateless bodies: constants, group boundaries and geometry edits.

use nodesim_core::{socket, GeometrySet, NodeKind, SocketValue};

use super::GroupInputs;
use crate::error::EvalError;
use crate::params::LazyEvaluationParams;

/// Runs the body of a node kind that needs neither caches nor nesting.
pub fn execute<P>(kind: &NodeKind, params: &mut P, group_inputs: &GroupInputs) -> Result<(), EvalError>
where
    P: LazyEvaluationParams + ?Sized,
{
    match kind {
        NodeKind::GroupInput => {
            if params.lazy_output_is_required(socket::GEOMETRY) {
                params.set_output(socket::GEOMETRY, group_inputs.geometry.clone().into());
            }
            if params.lazy_output_is_required(socket::ITERATION) {
                params.set_output(socket::ITERATION, SocketValue::Float(group_inputs.iteration as f32));
            }
        }
        // Read by the enclosing evaluation through its input link.
        NodeKind::GroupOutput => {}
        NodeKind::Points { points } => {
            if params.lazy_output_is_required(socket::GEOMETRY) {
                let geometry = GeometrySet::from_points(points.clone());
                params.set_output(socket::GEOMETRY, geometry.into());
            }
        }
        NodeKind::Float { value } => {
            if params.lazy_output_is_required(socket::VALUE) {
                params.set_output(socket::VALUE, SocketValue::Float(*value));
            }
        }
        NodeKind::Translate { direction } => translate(*direction, params)?,
        other => {
            return Err(EvalError::UnhandledKind {
                node: params.node(),
                kind: other.label(),
            });
        }
    }
    Ok(())
}

fn translate<P>(direction: [f32; 3], params: &mut P) -> Result<(), EvalError>
where
    P: LazyEvaluationParams + ?Sized,
{
    if !params.lazy_output_is_required(socket::GEOMETRY) {
        return Ok(());
    }
    // Ask for both before returning so upstream work is scheduled together.
    let geometry = params.lazy_require_input(socket::GEOMETRY);
    let offset = params.lazy_require_input(socket::OFFSET);
    if geometry.is_pending() || offset.is_pending() {
        return Ok(());
    }
    let geometry = params.extract_geometry(socket::GEOMETRY)?;
    let offset = params.extract_float(socket::OFFSET)?;
    let moved = geometry.translated([
        direction[0] * offset,
        direction[1] * offset,
        direction[2] * offset,
    ]);
    params.set_output(socket::GEOMETRY, moved.into());
    Ok(())
}
