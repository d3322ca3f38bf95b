//! The simulation input node: start of a time-stepped subgraph.
//!
//! On every visit the node works out which state it is in and acts on it:
//!
//! | State              | Condition                                  | Behavior                         |
//! |--------------------|--------------------------------------------|----------------------------------|
//! | `NoBoundOutput`    | no paired output node                      | pass Geometry through            |
//! | `NoCacheYet`       | no frame cache for this instance           | pass Geometry through            |
//! | `HistoryAvailable` | a frame at or before the current frame     | replay it, never pull live input |
//! | `NoHistoryYet`     | cache exists, nothing at or before frame   | pull live input, sentinel timing |
//!
//! The cache bucket is the current compute context extended with the paired
//! output node's identifier, which is the key the output node writes under.

use nodesim_core::{socket, SimulationInputConfig, SocketValue};
use tracing::{debug, trace};

use super::NodeExecContext;
use crate::error::EvalError;
use crate::params::LazyEvaluationParams;

/// Delta Time published when there is no earlier frame to measure from.
pub const UNDEFINED_DELTA_TIME: f32 = -1.0;

/// Which branch a visit took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationInputState {
    NoBoundOutput,
    NoCacheYet,
    HistoryAvailable,
    NoHistoryYet,
}

/// Runs one visit of a simulation input node.
///
/// A visit in `NoBoundOutput`, `NoCacheYet` or `NoHistoryYet` may end
/// suspended on the Geometry input; the returned state is the one the visit
/// was in when it returned.
pub fn execute<P>(
    config: &SimulationInputConfig,
    params: &mut P,
    ctx: &NodeExecContext<'_>,
) -> Result<SimulationInputState, EvalError>
where
    P: LazyEvaluationParams + ?Sized,
{
    let Some(output_node) = config.output_node_id else {
        pass_through(params)?;
        debug!(node = %ctx.node, "simulation input is unbound; passing geometry through");
        return Ok(SimulationInputState::NoBoundOutput);
    };

    let current_time = ctx.time.current_simulation_time();
    let current_frame = ctx.time.current_frame_index();

    let cache_context = ctx.compute_context.simulation(output_node);
    let Some(cache) = ctx.cache.lookup_context(cache_context.hash()) else {
        pass_through(params)?;
        debug!(node = %ctx.node, context = ?cache_context.hash(), "no simulation cache yet");
        return Ok(SimulationInputState::NoCacheYet);
    };

    if let Some(cached) = cache.value_before_time(current_frame as f32) {
        trace!(node = %ctx.node, cached_time = cached.time, current_time, "replaying cached frame");
        if params.lazy_output_is_required(socket::GEOMETRY) {
            params.set_output(socket::GEOMETRY, cached.payload.into());
        }
        if params.lazy_output_is_required(socket::DELTA_TIME) {
            params.set_output(socket::DELTA_TIME, SocketValue::Float(current_time - cached.time));
        }
        if params.lazy_output_is_required(socket::ELAPSED_TIME) {
            let start = cache.first().map_or(cached.time, |first| first.time);
            params.set_output(socket::ELAPSED_TIME, SocketValue::Float(current_time - start));
        }
        return Ok(SimulationInputState::HistoryAvailable);
    }

    if params.lazy_require_input(socket::GEOMETRY).is_pending() {
        return Ok(SimulationInputState::NoHistoryYet);
    }
    let geometry = params.extract_geometry(socket::GEOMETRY)?;

    if params.lazy_output_is_required(socket::DELTA_TIME) {
        params.set_output(socket::DELTA_TIME, SocketValue::Float(UNDEFINED_DELTA_TIME));
    }
    if params.lazy_output_is_required(socket::ELAPSED_TIME) {
        let elapsed = cache.first().map_or(0.0, |first| current_time - first.time);
        params.set_output(socket::ELAPSED_TIME, SocketValue::Float(elapsed));
    }
    if params.lazy_output_is_required(socket::GEOMETRY) {
        params.set_output(socket::GEOMETRY, geometry.into());
    }
    debug!(node = %ctx.node, current_time, "no cached frame before current frame; using live input");
    Ok(SimulationInputState::NoHistoryYet)
}

/// Forwards the live Geometry input when it is required. Timing outputs are
/// left alone.
fn pass_through<P>(params: &mut P) -> Result<(), EvalError>
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
    params.set_output(socket::GEOMETRY, geometry.into());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use nodesim_cache::{CacheStore, ComputeCacheRegistry};
    use nodesim_core::{ComputeContext, GeometrySet, NodeId};

    use super::*;
    use crate::nodes::GroupInputs;
    use crate::params::ExecParams;
    use crate::scene::SceneTime;

    const ALL_OUTPUTS: [&str; 3] = [socket::DELTA_TIME, socket::ELAPSED_TIME, socket::GEOMETRY];

    struct Fixture {
        root: ComputeContext<'static>,
        caches: ComputeCacheRegistry<GeometrySet>,
        group_inputs: GroupInputs,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                root: ComputeContext::root("fixture"),
                caches: ComputeCacheRegistry::new(),
                group_inputs: GroupInputs::default(),
            }
        }

        fn output_id() -> NodeId {
            NodeId::new(20).unwrap()
        }

        fn bound() -> SimulationInputConfig {
            SimulationInputConfig::bound_to(Self::output_id())
        }

        fn seed(&self, times: &[f32]) -> GeometrySet {
            let cache = self
                .caches
                .get_or_create(self.root.simulation(Self::output_id()).hash());
            let mut last = GeometrySet::default();
            for &t in times {
                last = GeometrySet::from_points(vec![[t, 0.0, 0.0]]);
                cache.insert(t, last.clone()).unwrap();
            }
            last
        }

        fn run(
            &self,
            config: &SimulationInputConfig,
            time: f32,
            params: &mut ExecParams,
        ) -> SimulationInputState {
            let time = SceneTime::new(time);
            let ctx = NodeExecContext {
                node: NodeId::new(10).unwrap(),
                compute_context: &self.root,
                cache: &self.caches,
                time: &time,
                group_inputs: &self.group_inputs,
            };
            execute(config, params, &ctx).unwrap()
        }
    }

    fn params(required: &[&str]) -> ExecParams {
        ExecParams::new(NodeId::new(10).unwrap(), HashMap::new(), required.iter().copied())
    }

    fn live_geometry() -> GeometrySet {
        GeometrySet::from_points(vec![[9.0, 9.0, 9.0]])
    }

    #[test]
    fn history_replay_skips_live_input() {
        let fx = Fixture::new();
        let cached = fx.seed(&[5.0]);
        let mut p = params(&ALL_OUTPUTS);

        let state = fx.run(&Fixture::bound(), 7.0, &mut p);

        assert_eq!(state, SimulationInputState::HistoryAvailable);
        assert_eq!(p.output(socket::DELTA_TIME), Some(&SocketValue::Float(2.0)));
        assert_eq!(p.output(socket::ELAPSED_TIME), Some(&SocketValue::Float(2.0)));
        let geometry = p.output(socket::GEOMETRY).and_then(SocketValue::as_geometry).unwrap();
        assert!(geometry.ptr_eq(&cached));
        assert!(p.requested_inputs().is_empty());
    }

    #[test]
    fn elapsed_time_counts_from_first_frame() {
        let fx = Fixture::new();
        fx.seed(&[1.0, 2.0, 3.0]);
        let mut p = params(&ALL_OUTPUTS);
        fx.run(&Fixture::bound(), 4.5, &mut p);
        assert_eq!(p.output(socket::DELTA_TIME), Some(&SocketValue::Float(1.5)));
        assert_eq!(p.output(socket::ELAPSED_TIME), Some(&SocketValue::Float(3.5)));
    }

    #[test]
    fn lookup_uses_truncated_frame_index() {
        let fx = Fixture::new();
        fx.seed(&[3.0, 3.5]);
        let mut p = params(&[socket::DELTA_TIME]);
        fx.run(&Fixture::bound(), 3.75, &mut p);
        // Frame 3 sees the frame committed at 3.0, not the one at 3.5.
        assert_eq!(p.output(socket::DELTA_TIME), Some(&SocketValue::Float(0.75)));
    }

    #[test]
    fn cold_start_without_cache_passes_through() {
        let fx = Fixture::new();
        let mut p = params(&ALL_OUTPUTS).with_input(socket::GEOMETRY, live_geometry());

        let state = fx.run(&Fixture::bound(), 3.0, &mut p);

        assert_eq!(state, SimulationInputState::NoCacheYet);
        assert_eq!(
            p.output(socket::GEOMETRY),
            Some(&SocketValue::Geometry(live_geometry()))
        );
        assert!(p.output(socket::DELTA_TIME).is_none());
        assert!(p.output(socket::ELAPSED_TIME).is_none());
    }

    #[test]
    fn cold_start_with_empty_cache_uses_sentinels() {
        let fx = Fixture::new();
        fx.seed(&[]);
        let mut p = params(&ALL_OUTPUTS).with_input(socket::GEOMETRY, live_geometry());

        let state = fx.run(&Fixture::bound(), 3.0, &mut p);

        assert_eq!(state, SimulationInputState::NoHistoryYet);
        assert_eq!(p.output(socket::DELTA_TIME), Some(&SocketValue::Float(-1.0)));
        assert_eq!(p.output(socket::ELAPSED_TIME), Some(&SocketValue::Float(0.0)));
        assert_eq!(
            p.output(socket::GEOMETRY),
            Some(&SocketValue::Geometry(live_geometry()))
        );
    }

    #[test]
    fn scrubbing_before_history_pulls_live_input() {
        let fx = Fixture::new();
        fx.seed(&[10.0, 11.0]);
        let mut p = params(&ALL_OUTPUTS).with_input(socket::GEOMETRY, live_geometry());

        let state = fx.run(&Fixture::bound(), 4.0, &mut p);

        assert_eq!(state, SimulationInputState::NoHistoryYet);
        assert_eq!(p.output(socket::DELTA_TIME), Some(&SocketValue::Float(-1.0)));
        assert_eq!(p.output(socket::ELAPSED_TIME), Some(&SocketValue::Float(-6.0)));
    }

    #[test]
    fn no_history_suspends_without_publishing() {
        let fx = Fixture::new();
        fx.seed(&[10.0]);
        let mut p = params(&ALL_OUTPUTS);

        let state = fx.run(&Fixture::bound(), 2.0, &mut p);

        assert_eq!(state, SimulationInputState::NoHistoryYet);
        assert!(p.is_suspended());
        assert_eq!(p.published().count(), 0);
    }

    #[test]
    fn unbound_forwards_geometry_only() {
        let fx = Fixture::new();
        fx.seed(&[1.0]);
        let mut p = params(&ALL_OUTPUTS).with_input(socket::GEOMETRY, live_geometry());

        let state = fx.run(&SimulationInputConfig::default(), 5.0, &mut p);

        assert_eq!(state, SimulationInputState::NoBoundOutput);
        assert_eq!(p.published().collect::<Vec<_>>(), vec![socket::GEOMETRY]);
        assert_eq!(
            p.output(socket::GEOMETRY),
            Some(&SocketValue::Geometry(live_geometry()))
        );
    }

    #[test]
    fn unbound_suspends_until_geometry_arrives() {
        let fx = Fixture::new();
        let mut p = params(&[socket::GEOMETRY]);
        fx.run(&SimulationInputConfig::default(), 1.0, &mut p);
        assert!(p.is_suspended());
        assert_eq!(p.published().count(), 0);
    }

    #[test]
    fn only_requested_outputs_are_published() {
        let fx = Fixture::new();
        fx.seed(&[5.0]);
        let mut p = params(&[socket::GEOMETRY]);

        fx.run(&Fixture::bound(), 7.0, &mut p);

        assert_eq!(p.published().collect::<Vec<_>>(), vec![socket::GEOMETRY]);
        assert!(p.requested_inputs().is_empty());
    }

    #[test]
    fn timing_only_request_in_no_history_still_needs_input() {
        let fx = Fixture::new();
        fx.seed(&[]);
        let mut p = params(&[socket::DELTA_TIME]).with_input(socket::GEOMETRY, live_geometry());

        fx.run(&Fixture::bound(), 1.0, &mut p);

        assert_eq!(p.published().collect::<Vec<_>>(), vec![socket::DELTA_TIME]);
    }

    #[test]
    fn separate_call_paths_do_not_share_history() {
        let fx = Fixture::new();
        fx.seed(&[5.0]);
        let group = fx.root.group(NodeId::new(3).unwrap());
        let time = SceneTime::new(7.0);
        let ctx = NodeExecContext {
            node: NodeId::new(10).unwrap(),
            compute_context: &group,
            cache: &fx.caches,
            time: &time,
            group_inputs: &fx.group_inputs,
        };
        let mut p = params(&[socket::GEOMETRY]).with_input(socket::GEOMETRY, live_geometry());
        let state = execute(&Fixture::bound(), &mut p, &ctx).unwrap();
        assert_eq!(state, SimulationInputState::NoCacheYet);
    }
}
