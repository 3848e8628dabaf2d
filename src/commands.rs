//! CLI command implementations

use std::path::Path;
use std::sync::Arc;

use anyhow::bail;
use trellis_canvas::{FsDocumentStore, GraphMutationCoordinator, InsertOutcome, PositionUpdate};
use trellis_cards::card::text_title;
use trellis_cards::{apply_query, load_canvas_cards, scan_vault, CardKind, CardQuery};
use trellis_core::{CanvasNode, NodeContent, Point, RelationshipAnalyzer, Topology};

use crate::config::TrellisConfig;

fn coordinator(root: &Path, config: &TrellisConfig) -> GraphMutationCoordinator {
    let store = Arc::new(FsDocumentStore::new(root));
    GraphMutationCoordinator::new(store, config.layout.clone())
}

/// Parse `x,y`.
pub fn parse_point(s: &str) -> Result<Point, String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got `{s}`"))?;
    let x: f64 = x.trim().parse().map_err(|e| format!("bad x in `{s}`: {e}"))?;
    let y: f64 = y.trim().parse().map_err(|e| format!("bad y in `{s}`: {e}"))?;
    if !x.is_finite() || !y.is_finite() {
        return Err(format!("coordinates must be finite: `{s}`"));
    }
    Ok(Point::new(x, y))
}

/// Parse `id=x,y`.
pub fn parse_move(s: &str) -> Result<PositionUpdate, String> {
    let (id, point) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected id=x,y but got `{s}`"))?;
    if id.is_empty() {
        return Err(format!("missing node id in `{s}`"));
    }
    let point = parse_point(point)?;
    Ok(PositionUpdate::new(id, point.x, point.y))
}

fn label(node: &CanvasNode) -> String {
    match &node.content {
        NodeContent::Text { text } => format!("\"{}\"", text_title(text)),
        NodeContent::File { path } => format!("[{}]", path),
    }
}

pub async fn tree(root: &Path, config: &TrellisConfig, canvas: &str) -> anyhow::Result<()> {
    let graph = coordinator(root, config).snapshot(canvas).await?;
    let analyzer = RelationshipAnalyzer::new(&graph);
    let hierarchy = analyzer.build_hierarchy_tree();

    for (id, level) in hierarchy.depth_first() {
        let Some(node) = graph.node(id.as_str()) else {
            continue;
        };
        println!("{}{} {}", "  ".repeat(level), id, label(node));
    }

    let topology = Topology::from_graph(&graph);
    for cycle in topology.cycles() {
        let ids: Vec<&str> = cycle.iter().map(|id| id.as_str()).collect();
        println!("warning: cycle between {}", ids.join(", "));
    }
    for id in topology.multi_parent_nodes() {
        let parent = analyzer
            .parent_node(id.as_str())
            .map(|p| p.id.to_string())
            .unwrap_or_default();
        println!("warning: {} has several parents, using {}", id, parent);
    }
    let unreachable = hierarchy.unreachable();
    if !unreachable.is_empty() {
        let ids: Vec<&str> = unreachable.iter().map(|id| id.as_str()).collect();
        println!("warning: not reachable from any root: {}", ids.join(", "));
    }

    tracing::info!(
        "{}: {} nodes, {} edges, {} roots",
        canvas,
        graph.node_count(),
        graph.edge_count(),
        hierarchy.roots.len()
    );
    Ok(())
}

fn report_insert(outcome: &InsertOutcome) {
    match &outcome.edge_id {
        Some(edge) => println!("added {} (edge {})", outcome.node_id, edge),
        None => println!("added {}", outcome.node_id),
    }
    if !outcome.repositioned.is_empty() {
        let ids: Vec<&str> = outcome.repositioned.iter().map(|id| id.as_str()).collect();
        println!("moved {}", ids.join(", "));
    }
    tracing::debug!(mode = ?outcome.mode, "insert finished");
}

pub async fn add_child(
    root: &Path,
    config: &TrellisConfig,
    canvas: &str,
    parent: &str,
    at: Option<Point>,
) -> anyhow::Result<()> {
    let outcome = coordinator(root, config)
        .insert_child(canvas, parent, at.unwrap_or_default())
        .await?;
    report_insert(&outcome);
    Ok(())
}

pub async fn add_sibling(
    root: &Path,
    config: &TrellisConfig,
    canvas: &str,
    node: &str,
    at: Option<Point>,
) -> anyhow::Result<()> {
    let outcome = coordinator(root, config)
        .insert_sibling(canvas, node, at.unwrap_or_default())
        .await?;
    report_insert(&outcome);
    Ok(())
}

pub async fn add_node(
    root: &Path,
    config: &TrellisConfig,
    canvas: &str,
    at: Point,
) -> anyhow::Result<()> {
    let outcome = coordinator(root, config).insert_independent(canvas, at).await?;
    report_insert(&outcome);
    Ok(())
}

pub async fn move_nodes(
    root: &Path,
    config: &TrellisConfig,
    canvas: &str,
    moves: &[PositionUpdate],
) -> anyhow::Result<()> {
    let report = coordinator(root, config)
        .batch_update_positions(canvas, moves)
        .await?;

    for id in &report.updated_nodes {
        println!("moved {}", id);
    }
    if !report.success {
        let ids: Vec<&str> = report.failed_nodes.iter().map(|id| id.as_str()).collect();
        bail!("nodes not found: {}", ids.join(", "));
    }
    Ok(())
}

pub async fn preview(
    root: &Path,
    config: &TrellisConfig,
    canvas: &str,
    parent: &str,
) -> anyhow::Result<()> {
    let result = coordinator(root, config)
        .preview_child_layout(canvas, parent)
        .await?;

    for position in &result.positions {
        let mut flags = Vec::new();
        if position.is_symmetric {
            flags.push("symmetric");
        }
        if position.avoidance_applied {
            flags.push("avoided");
        }
        println!(
            "{}: x={} y={} {}",
            position.index,
            position.x,
            position.y,
            flags.join(" ")
        );
    }
    println!(
        "height={} width={} center_y={}",
        result.total_height, result.total_width, result.center_y
    );
    for warning in &result.warnings {
        println!("warning: {}", warning);
    }
    Ok(())
}

pub fn cards(
    root: &Path,
    config: &TrellisConfig,
    canvas: Option<&str>,
    folder: Option<&str>,
    query: &CardQuery,
    json: bool,
) -> anyhow::Result<()> {
    let cards = match canvas {
        Some(canvas) => load_canvas_cards(root, canvas, &config.cards)?,
        None => scan_vault(root, folder, &config.cards)?,
    };
    let view = apply_query(cards, query, &config.cards);

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    for card in &view.cards {
        let kind = match &card.kind {
            CardKind::File { .. } => "file",
            CardKind::Native { .. } => "text",
        };
        if card.tags.is_empty() {
            println!("{}\t{}", kind, card.title);
        } else {
            println!("{}\t{}\t{}", kind, card.title, card.tags.join(" "));
        }
    }
    println!(
        "{} of {} cards{}",
        view.cards.len(),
        view.stats.filtered,
        if view.truncated { " (truncated)" } else { "" }
    );
    Ok(())
}
