// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Schedule view - activities, links, dependency order and KPIs

use super::{Output, Workspace};
use crate::config::AppConfig;
use crate::conflicts::{conflicts_for, detect_conflicts};
use crate::evidence::validate_evidence_gate;
use crate::graph::ScheduleGraph;
use crate::types::ScheduleActivity;
use anyhow::{bail, Result};
use serde_json::json;

/// Run the schedule command
pub fn run(config: AppConfig, out: Output, action: &str, id: Option<String>) -> Result<()> {
    let ws = Workspace::open(config)?;
    let graph = ScheduleGraph::new(ws.document.activities.clone());

    match action {
        "list" | "ls" => list(&ws, out),
        "show" => {
            let id = id.ok_or_else(|| anyhow::anyhow!("Activity ID is required"))?;
            show(&ws, &graph, out, &id)
        }
        "deps" => {
            let id = id.ok_or_else(|| anyhow::anyhow!("Activity ID is required"))?;
            deps(&ws, &graph, out, &id)
        }
        "order" => order(&graph, out),
        "summary" => {
            let summary = graph.summary();
            let dangling = graph.dangling_links();
            if out.json {
                let mut value = serde_json::to_value(&summary)?;
                value["dangling_links"] = json!(dangling);
                return out.print_json(&value);
            }
            println!("Schedule: {}", ws.source.display());
            println!("  rows:         {} ({} activities, {} summary)", summary.total_rows, summary.leaf_count, summary.summary_count);
            for (status, count) in &summary.by_status {
                println!("  {} {}", out.paint_status(*status, &format!("{:<13}", format!("{status}:"))), count);
            }
            println!("  frozen:       {}", summary.frozen_count);
            println!("  dependencies: {}", summary.dependency_count);
            println!("  voyages:      {}", summary.voyages.join(", "));
            println!("  TR units:     {}", summary.tr_units.join(", "));
            if let (Some(first), Some(last)) = (&summary.first_start, &summary.last_finish) {
                println!("  window:       {first} .. {last}");
            }
            for (successor, predecessor) in &dangling {
                println!("  {}", out.verdict(false, &format!("{successor} depends on unknown {predecessor}")));
            }
            Ok(())
        }
        "dot" => {
            print!("{}", graph.to_dot());
            Ok(())
        }
        _ => bail!("Unknown action: {}. Use list, show, deps, order, summary, or dot", action),
    }
}

fn line(out: Output, activity: &ScheduleActivity) -> String {
    format!(
        "{:<10} {} {} .. {}  {}",
        activity.id().unwrap_or_default(),
        out.status_cell(activity.status, 12),
        activity.planned_start,
        activity.planned_finish,
        activity.activity_name
    )
}

fn list(ws: &Workspace, out: Output) -> Result<()> {
    if out.json {
        return out.print_json(&ws.document.activities);
    }
    if ws.document.activities.is_empty() {
        println!("No activities in {}", ws.source.display());
        return Ok(());
    }
    for activity in &ws.document.activities {
        if activity.is_summary() {
            println!("\n== {} / {} ==", activity.level1, activity.activity_name);
        } else {
            println!("{}", line(out, activity));
        }
    }
    Ok(())
}

fn show(ws: &Workspace, graph: &ScheduleGraph, out: Output, id: &str) -> Result<()> {
    let activity = ws.activity(id)?;
    let evidence = ws.evidence_for(id);
    let validation = validate_evidence_gate(activity, &evidence);
    let conflicts = detect_conflicts(&ws.document.activities);
    let related: Vec<_> = conflicts_for(&conflicts, id).collect();

    if out.json {
        return out.print_json(&json!({
            "activity": activity,
            "predecessors": graph.predecessors(id).iter().filter_map(|a| a.id()).collect::<Vec<_>>(),
            "successors": graph.successors(id).iter().filter_map(|a| a.id()).collect::<Vec<_>>(),
            "evidence": evidence,
            "missing_evidence": validation.missing,
            "conflicts": related,
        }));
    }

    println!("{} - {}", id, activity.activity_name);
    println!("  phase:    {} / {}", activity.level1, activity.level2.as_deref().unwrap_or("-"));
    println!("  status:   {}", out.status(activity.status));
    println!("  planned:  {} .. {} ({} d)", activity.planned_start, activity.planned_finish, activity.duration);
    if activity.is_frozen() {
        println!(
            "  actual:   {} .. {}",
            activity.actual_start.as_deref().unwrap_or("-"),
            activity.actual_finish.as_deref().unwrap_or("-")
        );
    }
    if let Some(tr) = &activity.tr_unit_id {
        println!("  unit:     {tr}");
    }
    if let Some(voyage) = &activity.voyage_id {
        println!("  voyage:   {voyage}");
    }
    if !activity.resource_tags.is_empty() {
        println!("  uses:     {}", activity.resource_tags.join(", "));
    }
    for link in &activity.depends_on {
        println!("  after:    {} ({} +{}d)", link.predecessor_id, link.relation, link.lag_days);
    }
    println!("  evidence: {} attached", evidence.len());
    if !validation.missing.is_empty() {
        let missing: Vec<&str> = validation.missing.iter().map(|t| t.as_str()).collect();
        println!("  missing:  {}", out.verdict(false, &missing.join(", ")));
    }
    for conflict in related {
        println!("  [{}] {}", out.severity(conflict.severity), conflict.message);
    }
    Ok(())
}

fn deps(ws: &Workspace, graph: &ScheduleGraph, out: Output, id: &str) -> Result<()> {
    ws.activity(id)?;
    let predecessors = graph.predecessors(id);
    let successors = graph.successors(id);

    if out.json {
        return out.print_json(&json!({
            "activity_id": id,
            "predecessors": predecessors,
            "successors": successors,
        }));
    }

    println!("Predecessors of {id}:");
    if predecessors.is_empty() {
        println!("  (none)");
    }
    for p in predecessors {
        println!("  {}", line(out, p));
    }
    println!("Successors of {id}:");
    if successors.is_empty() {
        println!("  (none)");
    }
    for s in successors {
        println!("  {}", line(out, s));
    }
    Ok(())
}

fn order(graph: &ScheduleGraph, out: Output) -> Result<()> {
    match graph.topological_order() {
        Ok(order) => {
            if out.json {
                return out.print_json(&order);
            }
            for (i, id) in order.iter().enumerate() {
                println!("{:>4}. {}", i + 1, id);
            }
            Ok(())
        }
        Err(cycle) => bail!("Dependency cycle between: {}", cycle.join(", ")),
    }
}
