//! Run engine: the detective runner, the run ledger and the backends that
//! drive goals through them.

pub mod backend;
#[cfg(feature = "graph-engine")]
pub mod graph;
pub mod ledger;
pub mod orchestrator;
pub mod runner;

pub use backend::{run_goal_pipeline, select_backend, DirectBackend, OrchestrationBackend, RunContext};
#[cfg(feature = "graph-engine")]
pub use graph::{CompiledGraph, GraphEngineBackend, StateGraph};
pub use ledger::{RunLedger, RunPhase};
pub use orchestrator::{persist, AuditOutcome, Orchestrator};
pub use runner::{run_detectives, DetectiveRunner, RunnerOutcome};
