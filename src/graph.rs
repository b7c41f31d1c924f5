// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Schedule graph with petgraph backing for ordering and cycle checks

use crate::types::{ActivityStatus, ScheduleActivity};
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Dependency graph over the leaf activities of a schedule
pub struct ScheduleGraph {
    /// Nodes are activity IDs, edges carry the lag in days
    graph: DiGraph<String, u32>,
    /// Map from activity ID to node index
    node_indices: HashMap<String, NodeIndex>,
    /// The schedule rows, summary rows included
    activities: Vec<ScheduleActivity>,
}

/// Headline numbers for the KPI view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleSummary {
    /// Rows in the schedule
    pub total_rows: usize,
    /// Leaf activities
    pub leaf_count: usize,
    /// Summary/group header rows
    pub summary_count: usize,
    /// Leaf activities per status
    pub by_status: BTreeMap<ActivityStatus, usize>,
    /// Leaf activities with recorded actuals
    pub frozen_count: usize,
    /// Dependency edges between known activities
    pub dependency_count: usize,
    /// Distinct voyages
    pub voyages: Vec<String>,
    /// Distinct transformer units
    pub tr_units: Vec<String>,
    /// Earliest planned start
    pub first_start: Option<String>,
    /// Latest planned finish
    pub last_finish: Option<String>,
}

impl ScheduleGraph {
    /// Build the graph for a schedule snapshot
    #[must_use]
    pub fn new(activities: Vec<ScheduleActivity>) -> Self {
        let mut schedule = Self {
            graph: DiGraph::new(),
            node_indices: HashMap::new(),
            activities,
        };
        schedule.rebuild_graph();
        schedule
    }

    fn rebuild_graph(&mut self) {
        self.graph.clear();
        self.node_indices.clear();

        for activity in &self.activities {
            if let Some(id) = activity.id() {
                if !self.node_indices.contains_key(id) {
                    let idx = self.graph.add_node(id.to_string());
                    self.node_indices.insert(id.to_string(), idx);
                }
            }
        }

        for activity in &self.activities {
            let Some(to_idx) = activity.id().and_then(|id| self.node_indices.get(id)) else {
                continue;
            };
            for link in &activity.depends_on {
                if let Some(from_idx) = self.node_indices.get(&link.predecessor_id) {
                    self.graph.add_edge(*from_idx, *to_idx, link.lag_days);
                }
            }
        }
    }

    /// Get a leaf activity by ID
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ScheduleActivity> {
        self.activities.iter().find(|a| a.id() == Some(id))
    }

    fn neighbours(&self, id: &str, direction: Direction) -> Vec<&ScheduleActivity> {
        let Some(&idx) = self.node_indices.get(id) else {
            return vec![];
        };
        let mut found: Vec<&ScheduleActivity> = self
            .graph
            .neighbors_directed(idx, direction)
            .filter_map(|n| self.get(&self.graph[n]))
            .collect();
        found.sort_by_key(|a| (a.planned_start_at(), a.activity_id.clone()));
        found.dedup_by(|a, b| a.activity_id == b.activity_id);
        found
    }

    /// Activities that must finish before `id` starts
    #[must_use]
    pub fn predecessors(&self, id: &str) -> Vec<&ScheduleActivity> {
        self.neighbours(id, Direction::Incoming)
    }

    /// Activities waiting on `id`
    #[must_use]
    pub fn successors(&self, id: &str) -> Vec<&ScheduleActivity> {
        self.neighbours(id, Direction::Outgoing)
    }

    /// Links whose predecessor is not in the schedule, as `(successor, predecessor)`
    #[must_use]
    pub fn dangling_links(&self) -> Vec<(String, String)> {
        self.activities
            .iter()
            .filter_map(|a| a.id().map(|id| (id, a)))
            .flat_map(|(id, a)| {
                a.depends_on
                    .iter()
                    .filter(|l| !self.node_indices.contains_key(&l.predecessor_id))
                    .map(move |l| (id.to_string(), l.predecessor_id.clone()))
            })
            .collect()
    }

    /// Activity IDs in dependency order.
    ///
    /// On a cycle, returns the IDs of the strongly-connected component that
    /// contains it, sorted.
    pub fn topological_order(&self) -> Result<Vec<String>, Vec<String>> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order.into_iter().map(|n| self.graph[n].clone()).collect()),
            Err(cycle) => {
                let culprit = cycle.node_id();
                let members = tarjan_scc(&self.graph)
                    .into_iter()
                    .find(|scc| scc.contains(&culprit))
                    .unwrap_or_else(|| vec![culprit]);
                let mut ids: Vec<String> = members.into_iter().map(|n| self.graph[n].clone()).collect();
                ids.sort();
                Err(ids)
            }
        }
    }

    /// Every dependency cycle, each as a sorted list of activity IDs
    #[must_use]
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut cycles: Vec<Vec<String>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut ids: Vec<String> = scc.into_iter().map(|n| self.graph[n].clone()).collect();
                ids.sort();
                ids
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Get node count
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get edge count
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Check if the schedule has no leaf activities
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.node_indices.is_empty()
    }

    /// Headline numbers for the KPI view
    #[must_use]
    pub fn summary(&self) -> ScheduleSummary {
        let leaves: Vec<&ScheduleActivity> = self.activities.iter().filter(|a| !a.is_summary()).collect();

        let mut by_status = BTreeMap::new();
        for leaf in &leaves {
            *by_status.entry(leaf.status).or_insert(0) += 1;
        }

        let voyages: BTreeSet<String> = leaves.iter().filter_map(|a| a.voyage_id.clone()).collect();
        let tr_units: BTreeSet<String> = leaves.iter().filter_map(|a| a.tr_unit_id.clone()).collect();

        let first_start = leaves
            .iter()
            .filter_map(|a| a.planned_start_at().map(|at| (at, &a.planned_start)))
            .min()
            .map(|(_, raw)| raw.clone());
        let last_finish = leaves
            .iter()
            .filter_map(|a| a.planned_finish_at().map(|at| (at, &a.planned_finish)))
            .max()
            .map(|(_, raw)| raw.clone());

        ScheduleSummary {
            total_rows: self.activities.len(),
            leaf_count: leaves.len(),
            summary_count: self.activities.len() - leaves.len(),
            by_status,
            frozen_count: leaves.iter().filter(|a| a.is_frozen()).count(),
            dependency_count: self.edge_count(),
            voyages: voyages.into_iter().collect(),
            tr_units: tr_units.into_iter().collect(),
            first_start,
            last_finish,
        }
    }

    /// Export to DOT format for Graphviz, clustered by phase
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph schedule {\n");
        dot.push_str("  rankdir=LR;\n");
        dot.push_str("  node [shape=box, style=rounded];\n");

        let mut phases: BTreeMap<&str, Vec<&ScheduleActivity>> = BTreeMap::new();
        for activity in self.activities.iter().filter(|a| !a.is_summary()) {
            phases.entry(activity.level1.as_str()).or_default().push(activity);
        }

        for (phase, members) in &phases {
            dot.push_str(&format!("\n  subgraph \"cluster_{}\" {{\n", escape(phase)));
            dot.push_str(&format!("    label=\"{}\";\n", escape(phase)));
            dot.push_str("    style=dashed;\n");
            for activity in members {
                let id = activity.id().unwrap_or_default();
                let style = if activity.is_frozen() { ", style=\"rounded,filled\"" } else { "" };
                dot.push_str(&format!(
                    "    \"{}\" [label=\"{}\\n{}\"{}];\n",
                    escape(id),
                    escape(id),
                    escape(&activity.activity_name),
                    style
                ));
            }
            dot.push_str("  }\n");
        }

        dot.push('\n');
        for edge in self.graph.edge_indices() {
            if let Some((from, to)) = self.graph.edge_endpoints(edge) {
                let lag = self.graph[edge];
                let label = if lag > 0 { format!(" [label=\"+{lag}d\"]") } else { String::new() };
                dot.push_str(&format!(
                    "  \"{}\" -> \"{}\"{};\n",
                    escape(&self.graph[from]),
                    escape(&self.graph[to]),
                    label
                ));
            }
        }

        dot.push_str("}\n");
        dot
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DependencyLink;

    fn make_activity(id: &str, start: &str, finish: &str, preds: &[&str]) -> ScheduleActivity {
        ScheduleActivity {
            activity_id: Some(id.into()),
            activity_name: format!("Task {id}"),
            level1: "SEA".into(),
            level2: Some("V1".into()),
            duration: 1.0,
            planned_start: start.into(),
            planned_finish: finish.into(),
            actual_start: None,
            actual_finish: None,
            status: ActivityStatus::Planned,
            tr_unit_id: Some("TR-1".into()),
            anchor_type: None,
            resource_tags: vec![],
            voyage_id: Some("V1".into()),
            constraint: None,
            depends_on: preds.iter().map(|p| DependencyLink::finish_to_start(*p)).collect(),
            evidence_requirements: vec![],
        }
    }

    #[test]
    fn test_predecessors_and_successors() {
        let graph = ScheduleGraph::new(vec![
            make_activity("A", "2026-01-01", "2026-01-02", &[]),
            make_activity("B", "2026-01-03", "2026-01-04", &["A"]),
            make_activity("C", "2026-01-03", "2026-01-05", &["A"]),
        ]);

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.predecessors("B")[0].id(), Some("A"));
        let succ: Vec<_> = graph.successors("A").iter().filter_map(|a| a.id()).collect();
        assert_eq!(succ, vec!["B", "C"]);
    }

    #[test]
    fn test_topological_order() {
        let graph = ScheduleGraph::new(vec![
            make_activity("C", "2026-01-05", "2026-01-06", &["B"]),
            make_activity("B", "2026-01-03", "2026-01-04", &["A"]),
            make_activity("A", "2026-01-01", "2026-01-02", &[]),
        ]);

        let order = graph.topological_order().unwrap();
        let pos = |id: &str| order.iter().position(|x| x == id).unwrap();
        assert!(pos("A") < pos("B"));
        assert!(pos("B") < pos("C"));
    }

    #[test]
    fn test_cycle_detection() {
        let graph = ScheduleGraph::new(vec![
            make_activity("A", "2026-01-01", "2026-01-02", &["B"]),
            make_activity("B", "2026-01-03", "2026-01-04", &["A"]),
            make_activity("C", "2026-01-05", "2026-01-06", &["C"]),
        ]);

        assert_eq!(graph.cycles(), vec![vec!["A".to_string(), "B".to_string()], vec!["C".to_string()]]);
        assert!(graph.topological_order().is_err());
    }

    #[test]
    fn test_dangling_links() {
        let graph = ScheduleGraph::new(vec![make_activity("B", "2026-01-03", "2026-01-04", &["ZZ"])]);
        assert_eq!(graph.dangling_links(), vec![("B".to_string(), "ZZ".to_string())]);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_summary_counts() {
        let mut done = make_activity("A", "2026-01-01", "2026-01-02", &[]);
        done.status = ActivityStatus::Done;
        done.actual_finish = Some("2026-01-02".into());
        let graph = ScheduleGraph::new(vec![done, make_activity("B", "2026-01-03", "2026-01-09", &["A"])]);

        let summary = graph.summary();

        assert_eq!(summary.leaf_count, 2);
        assert_eq!(summary.frozen_count, 1);
        assert_eq!(summary.dependency_count, 1);
        assert_eq!(summary.by_status.get(&ActivityStatus::Done), Some(&1));
        assert_eq!(summary.voyages, vec!["V1".to_string()]);
        assert_eq!(summary.first_start.as_deref(), Some("2026-01-01"));
        assert_eq!(summary.last_finish.as_deref(), Some("2026-01-09"));
    }

    #[test]
    fn test_to_dot() {
        let graph = ScheduleGraph::new(vec![
            make_activity("A", "2026-01-01", "2026-01-02", &[]),
            make_activity("B", "2026-01-03", "2026-01-04", &["A"]),
        ]);

        let dot = graph.to_dot();

        assert!(dot.contains("digraph schedule"));
        assert!(dot.contains("\"A\" -> \"B\""));
        assert!(dot.contains("cluster_SEA"));
    }
}
