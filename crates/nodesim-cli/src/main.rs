//! nodesim command-line driver.
//!
//! Provides the `nodesim` binary for playing back a node tree stored as
//! JSON over a frame range. `simulate` evaluates one output socket per
//! step and prints a JSON line per step; `bind` prints how simulation
//! inputs are paired with outputs.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use serde_json::json;

use nodesim_core::{socket, NodeId, NodeKind, NodeTree};
use nodesim_eval::{EvaluationSession, Evaluator, EvaluatorConfig, SceneTime};

/// Node tree simulation tools.
#[derive(Parser)]
#[command(name = "nodesim", about = "Node tree simulation tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Evaluate a tree frame by frame, reusing simulation caches.
    Simulate {
        /// Path to the node tree JSON file.
        #[arg(short, long)]
        tree: PathBuf,

        /// First frame.
        #[arg(short, long, default_value_t = 1)]
        start: i32,

        /// Last frame, inclusive.
        #[arg(short, long, default_value_t = 10)]
        end: i32,

        /// Evaluation steps inserted between consecutive frames.
        #[arg(long, default_value_t = 0)]
        subframes: u32,

        /// Node to evaluate (default: the only simulation output).
        #[arg(short, long)]
        node: Option<u32>,

        /// Output socket to evaluate.
        #[arg(long, default_value = socket::GEOMETRY)]
        socket: String,

        /// Include per-invocation traces in the output.
        #[arg(long)]
        trace: bool,
    },
    /// Print the simulation input/output pairing of a tree.
    Bind {
        /// Path to the node tree JSON file.
        #[arg(short, long)]
        tree: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Simulate {
            tree,
            start,
            end,
            subframes,
            node,
            socket,
            trace,
        } => run_simulate(&tree, start, end, subframes, node, &socket, trace),
        Commands::Bind { tree } => run_bind(&tree),
    };
    process::exit(exit_code);
}

/// Reads and parses a tree file. Errors are reported to stderr.
fn load_tree(path: &Path) -> Result<NodeTree, i32> {
    let text = fs::read_to_string(path).map_err(|e| {
        eprintln!("Error: failed to read '{}': {}", path.display(), e);
        3
    })?;
    serde_json::from_str(&text).map_err(|e| {
        eprintln!("Error: failed to parse '{}': {}", path.display(), e);
        3
    })
}

/// Scene times from `start` to `end` with `subframes` extra steps per frame.
///
/// Returns `None` when the step count per frame does not fit in a `u32`.
fn step_times(start: i32, end: i32, subframes: u32) -> Option<Vec<f32>> {
    let steps = subframes.checked_add(1)?;
    let mut times = Vec::new();
    for frame in start..=end {
        let substeps = if frame == end { 1 } else { steps };
        for sub in 0..substeps {
            times.push(frame as f32 + sub as f32 / steps as f32);
        }
    }
    Some(times)
}

fn default_node(tree: &NodeTree) -> Option<NodeId> {
    let mut outputs = tree
        .nodes()
        .filter(|node| matches!(node.kind, NodeKind::SimulationOutput))
        .map(|node| node.id);
    match (outputs.next(), outputs.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

/// Execute the simulate subcommand.
///
/// Returns exit code: 0 = success, 1 = evaluation error, 3 = I/O or parse error.
fn run_simulate(
    tree_path: &Path,
    start: i32,
    end: i32,
    subframes: u32,
    node: Option<u32>,
    socket_name: &str,
    trace: bool,
) -> i32 {
    let tree = match load_tree(tree_path) {
        Ok(tree) => tree,
        Err(code) => return code,
    };

    let node = match node {
        Some(raw) => match NodeId::new(raw) {
            Some(id) => id,
            None => {
                eprintln!("Error: node id must be non-zero");
                return 1;
            }
        },
        None => match default_node(&tree) {
            Some(id) => id,
            None => {
                eprintln!("Error: tree does not have exactly one simulation output; pass --node");
                return 1;
            }
        },
    };

    let Some(times) = step_times(start, end, subframes) else {
        eprintln!("Error: --subframes {} is too large", subframes);
        return 1;
    };

    let label = tree_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tree".to_string());
    let session = EvaluationSession::new(label);
    let root = session.root_context();
    let config = EvaluatorConfig {
        trace_enabled: trace,
        ..EvaluatorConfig::default()
    };
    tracing::info!(session = %session.label(), start, end, subframes, %node, "simulating");

    for time in times {
        let scene_time = SceneTime::new(time);
        let mut evaluator = Evaluator::for_session(&session, &scene_time, config.clone());
        let outputs = match evaluator.evaluate(&tree, &root, &[(node, socket_name)]) {
            Ok(outputs) => outputs,
            Err(e) => {
                eprintln!("Error: evaluation failed at time {}: {}", time, e);
                return 1;
            }
        };
        let value = outputs.into_values().next();
        let mut line = json!({ "time": time, "node": node, "socket": socket_name, "value": value });
        if trace {
            line["trace"] = json!(evaluator.take_trace());
        }
        println!("{}", line);
    }

    let buckets: Vec<_> = session
        .caches()
        .stats()
        .into_iter()
        .map(|bucket| {
            json!({
                "context": bucket.hash.to_hex(),
                "frames": bucket.frames,
                "first_time": bucket.first_time,
                "last_time": bucket.last_time,
            })
        })
        .collect();
    tracing::info!(buckets = buckets.len(), "simulation finished");
    eprintln!("{}", json!({ "caches": buckets }));
    0
}

/// Execute the bind subcommand.
fn run_bind(tree_path: &Path) -> i32 {
    let tree = match load_tree(tree_path) {
        Ok(tree) => tree,
        Err(code) => return code,
    };
    let bindings: Vec<_> = tree
        .simulation_bindings()
        .into_iter()
        .map(|(input, output)| json!({ "input": input, "output": output }))
        .collect();
    let text = serde_json::to_string_pretty(&bindings)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize bindings: {}\"}}", e));
    println!("{}", text);
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_times_without_subframes() {
        assert_eq!(step_times(1, 3, 0), Some(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn step_times_with_subframes() {
        assert_eq!(step_times(1, 2, 1), Some(vec![1.0, 1.5, 2.0]));
        assert_eq!(step_times(5, 5, 3), Some(vec![5.0]));
    }

    #[test]
    fn step_times_rejects_overflowing_subframes() {
        assert_eq!(step_times(1, 2, u32::MAX), None);
    }

    #[test]
    fn simulate_reports_overflowing_subframes() {
        let path = std::env::temp_dir().join(format!("nodesim-subframes-{}.json", process::id()));
        let mut tree = NodeTree::new();
        tree.add_node(NodeKind::SimulationOutput);
        fs::write(&path, serde_json::to_string(&tree).unwrap()).unwrap();

        let code = run_simulate(&path, 1, 2, u32::MAX, None, socket::GEOMETRY, false);
        fs::remove_file(&path).unwrap();
        assert_eq!(code, 1);
    }

    #[test]
    fn default_node_needs_a_single_output() {
        let mut tree = NodeTree::new();
        assert_eq!(default_node(&tree), None);
        let out = tree.add_node(NodeKind::SimulationOutput);
        assert_eq!(default_node(&tree), Some(out));
        tree.add_node(NodeKind::SimulationOutput);
        assert_eq!(default_node(&tree), None);
    }
}
