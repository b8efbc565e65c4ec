//! In-process state-graph engine.
//!
//! A run's graph is `START -> <collector nodes> -> EvidenceAggregator -> END`.
//! [`StateGraph::compile`] rejects malformed topologies up front so a build
//! fault surfaces before any goal starts, and keeps what execution needs:
//! the fan-out layer (START's successors, in edge order) and the join node.
//! [`CompiledGraph::invoke`] walks that plan for one goal: every fan-out node
//! runs concurrently, the join node merges their outcome, then END.
//! [`GraphEngineBackend`] runs all goals concurrently, each merge taken under
//! the ledger lock.

use async_trait::async_trait;
use auditor_evidence::{BackendKind, GoalId};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

use super::backend::{merge_outcome, OrchestrationBackend, RunContext};
use super::ledger::RunLedger;
use super::runner::run_detectives;
use crate::collectors::Collector;
use crate::errors::BackendError;

pub const START: &str = "__start__";
pub const END: &str = "__end__";
pub const AGGREGATOR_NODE: &str = "EvidenceAggregator";

enum Node {
    Collector(Arc<dyn Collector>),
    Aggregator,
}

#[derive(Default)]
pub struct StateGraph {
    nodes: BTreeMap<String, Node>,
    edges: Vec<(String, String)>,
}

impl StateGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard fan-out / fan-in topology over `collectors`.
    pub fn for_collectors(collectors: &[Arc<dyn Collector>]) -> Self {
        let mut graph = Self::new();
        graph.add_aggregator(AGGREGATOR_NODE);
        for c in collectors {
            graph.add_collector(Arc::clone(c));
            graph.add_edge(START, c.name());
            graph.add_edge(c.name(), AGGREGATOR_NODE);
        }
        graph.add_edge(AGGREGATOR_NODE, END);
        graph
    }

    pub fn add_collector(&mut self, collector: Arc<dyn Collector>) -> &mut Self {
        self.nodes
            .insert(collector.name().to_string(), Node::Collector(collector));
        self
    }

    pub fn add_aggregator(&mut self, name: &str) -> &mut Self {
        self.nodes.insert(name.to_string(), Node::Aggregator);
        self
    }

    pub fn add_edge(&mut self, from: &str, to: &str) -> &mut Self {
        self.edges.push((from.to_string(), to.to_string()));
        self
    }

    pub fn compile(self, collector_timeout: Duration) -> Result<CompiledGraph, BackendError> {
        let build = |msg: String| Err(BackendError::Build(msg));

        for (from, to) in &self.edges {
            if from == END {
                return build(format!("edge leaves {END}: {from} -> {to}"));
            }
            if to == START {
                return build(format!("edge enters {START}: {from} -> {to}"));
            }
            for endpoint in [from, to] {
                if endpoint != START && endpoint != END && !self.nodes.contains_key(endpoint) {
                    return build(format!("edge references unknown node {endpoint}"));
                }
            }
        }

        let successors = |node: &str| -> Vec<&str> {
            self.edges
                .iter()
                .filter(|(f, _)| f == node)
                .map(|(_, t)| t.as_str())
                .collect()
        };

        if successors(START).is_empty() {
            return build(format!("no edge leaves {START}"));
        }

        // Kahn's algorithm over START, END and every node.
        let mut indegree: BTreeMap<&str, usize> = self
            .nodes
            .keys()
            .map(String::as_str)
            .chain([START, END])
            .map(|n| (n, 0))
            .collect();
        for (_, to) in &self.edges {
            if let Some(d) = indegree.get_mut(to.as_str()) {
                *d += 1;
            }
        }
        let mut ready: VecDeque<&str> = indegree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(n, _)| *n)
            .collect();
        let mut visited = 0;
        while let Some(node) = ready.pop_front() {
            visited += 1;
            for next in successors(node) {
                if let Some(d) = indegree.get_mut(next) {
                    *d -= 1;
                    if *d == 0 {
                        ready.push_back(next);
                    }
                }
            }
        }
        if visited != indegree.len() {
            return build("graph contains a cycle".into());
        }

        let mut reachable = BTreeSet::new();
        let mut frontier = vec![START];
        while let Some(node) = frontier.pop() {
            if reachable.insert(node) {
                frontier.extend(successors(node));
            }
        }
        if !reachable.contains(END) {
            return build(format!("{END} is unreachable from {START}"));
        }
        if let Some(orphan) = self.nodes.keys().find(|n| !reachable.contains(n.as_str())) {
            return build(format!("node {orphan} is unreachable from {START}"));
        }

        let aggregators: Vec<&str> = self
            .nodes
            .iter()
            .filter(|(_, n)| matches!(n, Node::Aggregator))
            .map(|(name, _)| name.as_str())
            .collect();
        let aggregator = match aggregators.as_slice() {
            [only] => *only,
            other => {
                return build(format!(
                    "expected exactly one aggregator node, found {}",
                    other.len()
                ))
            }
        };
        if successors(aggregator) != [END] {
            return build(format!("aggregator {aggregator} must lead only to {END}"));
        }

        for (name, node) in &self.nodes {
            if matches!(node, Node::Collector(_)) && successors(name.as_str()) != [aggregator] {
                return build(format!("collector node {name} must lead only to {aggregator}"));
            }
        }

        let mut fan_out: Vec<(String, Arc<dyn Collector>)> = Vec::new();
        for name in successors(START) {
            match self.nodes.get(name) {
                Some(Node::Collector(c)) => {
                    if !fan_out.iter().any(|(n, _)| n == name) {
                        fan_out.push((name.to_string(), Arc::clone(c)));
                    }
                }
                _ => return build(format!("{START} must fan out to collector nodes only")),
            }
        }

        Ok(CompiledGraph {
            fan_out,
            join: aggregator.to_string(),
            collector_timeout,
        })
    }
}

/// Validated execution plan: one fan-out layer joined by one aggregator.
#[derive(Clone)]
pub struct CompiledGraph {
    fan_out: Vec<(String, Arc<dyn Collector>)>,
    join: String,
    collector_timeout: Duration,
}

impl CompiledGraph {
    pub fn collector_count(&self) -> usize {
        self.fan_out.len()
    }

    /// Nodes entered from START, in edge order.
    pub fn fan_out_nodes(&self) -> Vec<&str> {
        self.fan_out.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn join_node(&self) -> &str {
        &self.join
    }

    /// Run one goal through the graph: START, the fan-out layer, the join, END.
    pub async fn invoke(
        &self,
        ctx: &RunContext,
        goal: &str,
        ledger: &RunLedger,
    ) -> Result<(), BackendError> {
        ledger.fan_out(goal)?;
        tracing::debug!(goal, nodes = ?self.fan_out_nodes(), "entering fan-out layer");
        let layer: Vec<Arc<dyn Collector>> =
            self.fan_out.iter().map(|(_, c)| Arc::clone(c)).collect();
        let outcome = run_detectives(goal, &ctx.sources, &layer, self.collector_timeout).await;

        ledger.fan_in(goal)?;
        tracing::debug!(goal, node = %self.join, "join node merging");
        merge_outcome(goal, outcome, ledger)?;
        tracing::debug!(goal, "reached {END}");
        Ok(())
    }
}

type Topology = dyn Fn(&[Arc<dyn Collector>]) -> StateGraph + Send + Sync;

pub struct GraphEngineBackend {
    topology: Box<Topology>,
}

impl Default for GraphEngineBackend {
    fn default() -> Self {
        Self {
            topology: Box::new(StateGraph::for_collectors),
        }
    }
}

impl GraphEngineBackend {
    /// Build graphs with a custom topology instead of the standard one.
    pub fn with_topology<F>(topology: F) -> Self
    where
        F: Fn(&[Arc<dyn Collector>]) -> StateGraph + Send + Sync + 'static,
    {
        Self {
            topology: Box::new(topology),
        }
    }
}

#[async_trait]
impl OrchestrationBackend for GraphEngineBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::GraphEngine
    }

    async fn execute(
        &self,
        ctx: &RunContext,
        goals: &[GoalId],
        ledger: &Arc<RunLedger>,
    ) -> Result<(), BackendError> {
        let graph = (self.topology)(ctx.runner.collectors())
            .compile(ctx.runner.collector_timeout())?;
        tracing::debug!(
            run_id = %ctx.run_id,
            collectors = graph.collector_count(),
            "state graph compiled"
        );

        let mut join_set = JoinSet::new();
        for goal in ledger.remaining(goals) {
            let graph = graph.clone();
            let ctx = ctx.clone();
            let ledger = Arc::clone(ledger);
            join_set.spawn(async move { graph.invoke(&ctx, &goal, &ledger).await });
        }

        // Drain every task so goals that did finish stay merged.
        let mut first_error = None;
        while let Some(res) = join_set.join_next().await {
            let err = match res {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(e) => BackendError::Execution(format!("goal task failed: {e}")),
            };
            tracing::warn!(error = %err, "graph goal failed");
            first_error.get_or_insert(err);
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
