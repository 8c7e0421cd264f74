//! Walk report output - JSON document and plain-text edge table

use anyhow::Result;
use chrono::{DateTime, Utc};
use netwalk_core::report::{attached, inventory, stack_expansion, stacks};
use netwalk_core::{AttachedDevice, Category, InventoryRow, TopologyEdge};
use netwalk_discovery::FailedDevice;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Everything one walk produced, with every report view precomputed
#[derive(Debug, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub seeds: Vec<String>,
    pub visited: Vec<String>,
    pub failed: Vec<FailedDevice>,
    pub edges: Vec<TopologyEdge>,
    pub inventory: Vec<InventoryRow>,
    pub stacks: Vec<InventoryRow>,
    pub chassis: Vec<InventoryRow>,
    pub access_points: Vec<AttachedDevice>,
    pub video_endpoints: Vec<AttachedDevice>,
    pub phones: Vec<AttachedDevice>,
}

impl Report {
    pub fn build(
        seeds: Vec<String>,
        visited: Vec<String>,
        failed: Vec<FailedDevice>,
        edges: Vec<TopologyEdge>,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            seeds,
            visited,
            failed,
            inventory: inventory(&edges),
            stacks: stacks(&edges),
            chassis: stack_expansion(&edges),
            access_points: attached(&edges, Category::AccessPoint),
            video_endpoints: attached(&edges, Category::VideoEndpoint),
            phones: attached(&edges, Category::Phone),
            edges,
        }
    }

    /// Write the report as pretty-printed JSON
    pub fn write(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!(
            path = %path.display(),
            edges = self.edges.len(),
            devices = self.inventory.len(),
            "Report written"
        );
        Ok(())
    }
}

const EDGE_HEADERS: [&str; 9] = [
    "Device",
    "Device IP",
    "Neighbor",
    "Neighbor IP",
    "Local Interface",
    "Neighbor Interface",
    "Platform",
    "Category",
    "Status",
];

/// Render edges as an aligned text table
pub fn edge_table(edges: &[TopologyEdge]) -> String {
    let rows: Vec<[String; 9]> = edges
        .iter()
        .map(|edge| {
            [
                edge.source_name.clone(),
                edge.source_ip.clone(),
                edge.neighbor.name.clone(),
                edge.neighbor.ip.clone(),
                edge.neighbor.local_interface.clone(),
                edge.neighbor.neighbor_interface.clone(),
                edge.neighbor.platform.clone(),
                edge.category.to_string(),
                edge.status.to_string(),
            ]
        })
        .collect();

    let mut widths = EDGE_HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &EDGE_HEADERS, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, &rule, &widths);
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row<S: AsRef<str>>(out: &mut String, cells: &[S], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell.as_ref(), width = *width))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}
