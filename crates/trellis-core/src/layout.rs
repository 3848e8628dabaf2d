//! Symmetric child placement with collision avoidance
//!
//! Children of a parent are stacked in a single column to the parent's right, spaced
//! `vertical_spacing` apart (center to center), so that the column's vertical center
//! lines up with the parent's. Computed positions are then checked against a corpus of
//! existing nodes and pushed below the first one they collide with.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ValidationError;
use crate::model::{CanvasNode, Rect};

/// Tunables for child placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Gap between the parent's right edge and the child column.
    pub horizontal_spacing: f64,
    /// Pitch between successive child centers.
    pub vertical_spacing: f64,
    /// Column height above which a warning is emitted.
    pub max_vertical_spread: f64,
    pub collision_detection: bool,
    pub avoidance_margin: f64,
    pub default_node_width: f64,
    pub default_node_height: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            horizontal_spacing: 100.0,
            vertical_spacing: 80.0,
            max_vertical_spread: 800.0,
            collision_detection: true,
            avoidance_margin: 20.0,
            default_node_width: 250.0,
            default_node_height: 60.0,
        }
    }
}

impl LayoutConfig {
    /// Node sizes must be finite and positive, spacings and limits finite, and the
    /// avoidance margin finite and non-negative. Nodes created from an invalid config
    /// could not be read back.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let checks: [(&'static str, f64, fn(f64) -> bool); 6] = [
            ("horizontal_spacing", self.horizontal_spacing, f64::is_finite),
            ("vertical_spacing", self.vertical_spacing, f64::is_finite),
            ("max_vertical_spread", self.max_vertical_spread, f64::is_finite),
            ("avoidance_margin", self.avoidance_margin, |v| v.is_finite() && v >= 0.0),
            ("default_node_width", self.default_node_width, |v| v.is_finite() && v > 0.0),
            ("default_node_height", self.default_node_height, |v| v.is_finite() && v > 0.0),
        ];
        for (field, value, valid) in checks {
            if !valid(value) {
                return Err(ValidationError::InvalidLayoutConfig { field, value });
            }
        }
        Ok(())
    }
}

/// Partial update for [`LayoutConfig`]. `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfigPatch {
    pub horizontal_spacing: Option<f64>,
    pub vertical_spacing: Option<f64>,
    pub max_vertical_spread: Option<f64>,
    pub collision_detection: Option<bool>,
    pub avoidance_margin: Option<f64>,
    pub default_node_width: Option<f64>,
    pub default_node_height: Option<f64>,
}

impl LayoutConfigPatch {
    pub fn merged_into(&self, base: &LayoutConfig) -> LayoutConfig {
        LayoutConfig {
            horizontal_spacing: self.horizontal_spacing.unwrap_or(base.horizontal_spacing),
            vertical_spacing: self.vertical_spacing.unwrap_or(base.vertical_spacing),
            max_vertical_spread: self.max_vertical_spread.unwrap_or(base.max_vertical_spread),
            collision_detection: self.collision_detection.unwrap_or(base.collision_detection),
            avoidance_margin: self.avoidance_margin.unwrap_or(base.avoidance_margin),
            default_node_width: self.default_node_width.unwrap_or(base.default_node_width),
            default_node_height: self.default_node_height.unwrap_or(base.default_node_height),
        }
    }
}

/// Target top-left coordinate for one child.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChildPosition {
    pub x: f64,
    pub y: f64,
    /// Slot in the child column, top to bottom.
    pub index: usize,
    /// Depth relative to the parent; placement is always one level down.
    pub level: usize,
    pub is_symmetric: bool,
    pub avoidance_applied: bool,
}

/// Advisory notes about a computed layout.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LayoutWarning {
    SpreadExceeded { total_height: f64, limit: f64 },
    AvoidanceApplied { count: usize },
}

impl fmt::Display for LayoutWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutWarning::SpreadExceeded { total_height, limit } => write!(
                f,
                "layout height ({total_height}px) exceeds the maximum vertical spread ({limit}px)"
            ),
            LayoutWarning::AvoidanceApplied { count } => {
                write!(f, "collision avoidance moved {count} node(s)")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutResult {
    pub positions: Vec<ChildPosition>,
    pub total_height: f64,
    pub total_width: f64,
    pub center_y: f64,
    pub warnings: Vec<LayoutWarning>,
}

/// Shape of a parent's current child column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExistingLayout {
    /// Children centered on the parent within [`SYMMETRY_TOLERANCE`].
    pub is_symmetric: bool,
    pub center_y: f64,
    /// Average pitch between child centers.
    pub spacing: f64,
}

pub const SYMMETRY_TOLERANCE: f64 = 10.0;

/// Computes child columns. Holds the config and the collision corpus; everything else
/// is a function of the arguments.
#[derive(Debug, Clone, Default)]
pub struct SymmetricLayoutCalculator {
    config: LayoutConfig,
    existing_nodes: Vec<CanvasNode>,
}

impl SymmetricLayoutCalculator {
    pub fn new(config: LayoutConfig) -> Self {
        SymmetricLayoutCalculator {
            config,
            existing_nodes: Vec::new(),
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Replace the config with `patch` merged over the current one. An invalid result is
    /// rejected and the current config kept.
    pub fn update_config(&mut self, patch: &LayoutConfigPatch) -> Result<(), ValidationError> {
        let merged = patch.merged_into(&self.config);
        merged.validate()?;
        self.config = merged;
        Ok(())
    }

    /// Replace the collision corpus. Call with the live snapshot before every calculation
    /// that should avoid it.
    pub fn set_existing_nodes(&mut self, nodes: Vec<CanvasNode>) {
        self.existing_nodes = nodes;
    }

    pub fn existing_nodes(&self) -> &[CanvasNode] {
        &self.existing_nodes
    }

    /// Full pipeline for adding one child: re-flow `existing_children.len() + 1` slots,
    /// avoid collisions, summarize.
    pub fn calculate_child_layout(
        &self,
        parent: &CanvasNode,
        existing_children: &[&CanvasNode],
        new_child_index: Option<usize>,
    ) -> LayoutResult {
        let existing = self.analyze_existing_layout(parent, existing_children);
        debug!(
            parent = %parent.id,
            symmetric = existing.is_symmetric,
            spacing = existing.spacing,
            "existing child layout"
        );

        let total = existing_children.len() + 1;
        let insert_index = new_child_index.unwrap_or(existing_children.len());
        let positions = self.calculate_symmetric_positions(parent, total, insert_index);
        let positions = self.apply_collision_avoidance(positions);
        self.generate_layout_result(positions)
    }

    pub fn analyze_existing_layout(&self, parent: &CanvasNode, children: &[&CanvasNode]) -> ExistingLayout {
        if children.is_empty() {
            return ExistingLayout {
                is_symmetric: true,
                center_y: parent.center_y(),
                spacing: self.config.vertical_spacing,
            };
        }

        let centers = children.iter().map(|c| c.center_y());
        let min = centers.clone().fold(f64::INFINITY, f64::min);
        let max = centers.fold(f64::NEG_INFINITY, f64::max);
        let center_y = (min + max) / 2.0;

        let spacing = if children.len() > 1 {
            (max - min) / (children.len() - 1) as f64
        } else {
            self.config.vertical_spacing
        };

        ExistingLayout {
            is_symmetric: (center_y - parent.center_y()).abs() < SYMMETRY_TOLERANCE,
            center_y,
            spacing,
        }
    }

    /// `total` slots centered on the parent. `_insert_index` does not influence the
    /// result: every slot is recomputed.
    pub fn calculate_symmetric_positions(
        &self,
        parent: &CanvasNode,
        total: usize,
        _insert_index: usize,
    ) -> Vec<ChildPosition> {
        if total == 0 {
            return Vec::new();
        }

        let pitch = self.config.vertical_spacing;
        let span = (total - 1) as f64 * pitch;
        let first_center = parent.center_y() - span / 2.0;
        let start_y = first_center - self.config.default_node_height / 2.0;
        let x = parent.x + parent.width + self.config.horizontal_spacing;

        let positions: Vec<ChildPosition> = (0..total)
            .map(|index| ChildPosition {
                x,
                y: start_y + index as f64 * pitch,
                index,
                level: 1,
                is_symmetric: true,
                avoidance_applied: false,
            })
            .collect();

        debug!(
            parent = %parent.id,
            parent_center_y = parent.center_y(),
            total,
            span,
            "symmetric positions computed"
        );
        positions
    }

    /// One pass: each position is pushed below the first existing node it overlaps.
    /// A pushed position is not re-checked.
    pub fn apply_collision_avoidance(&self, positions: Vec<ChildPosition>) -> Vec<ChildPosition> {
        if !self.config.collision_detection {
            return positions;
        }

        positions
            .into_iter()
            .map(|position| match self.detect_collision(&self.slot_rect(&position)) {
                Some(collider) => {
                    let y = collider.y + collider.height + self.config.avoidance_margin;
                    debug!(index = position.index, collider = %collider.id, from = position.y, to = y, "avoiding collision");
                    ChildPosition {
                        y,
                        avoidance_applied: true,
                        ..position
                    }
                }
                None => position,
            })
            .collect()
    }

    pub fn generate_layout_result(&self, positions: Vec<ChildPosition>) -> LayoutResult {
        if positions.is_empty() {
            return LayoutResult {
                positions,
                total_height: 0.0,
                total_width: 0.0,
                center_y: 0.0,
                warnings: Vec::new(),
            };
        }

        let min_y = positions.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_y = positions.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
        let total_height = max_y - min_y + self.config.default_node_height;
        let total_width = self.config.horizontal_spacing + self.config.default_node_width;

        let mut warnings = Vec::new();
        if total_height > self.config.max_vertical_spread {
            warnings.push(LayoutWarning::SpreadExceeded {
                total_height,
                limit: self.config.max_vertical_spread,
            });
        }
        let avoided = positions.iter().filter(|p| p.avoidance_applied).count();
        if avoided > 0 {
            warnings.push(LayoutWarning::AvoidanceApplied { count: avoided });
        }

        LayoutResult {
            positions,
            total_height,
            total_width,
            center_y: (min_y + max_y) / 2.0,
            warnings,
        }
    }

    fn slot_rect(&self, position: &ChildPosition) -> Rect {
        Rect::new(
            position.x,
            position.y,
            self.config.default_node_width,
            self.config.default_node_height,
        )
    }

    fn detect_collision(&self, rect: &Rect) -> Option<&CanvasNode> {
        self.existing_nodes
            .iter()
            .find(|node| rect.overlaps(&node.rect(), self.config.avoidance_margin))
    }
}
