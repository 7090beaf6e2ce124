//! Deterministic node placement for structure diagrams.
//!
//! Entities are placed on rows by containment depth, in a stable total order:
//! depth ascending, then kind (module < class < function), then id
//! lexicographically. Two identical graphs always produce identical layouts.
//! When the entity count exceeds the capacity threshold, node boxes, fonts and
//! spacing shrink proportionally; nodes are never dropped.

use std::collections::HashMap;

use crate::config::DiagramSettings;
use crate::constants::diagram;
use crate::types::{CodeEntity, DiagramGraph, EntityKind};

/// One positioned node. Coordinates are the box's top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedNode {
    pub id: String,
    pub kind: EntityKind,
    pub label: String,
    pub external: bool,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PlacedNode {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn top(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y)
    }

    pub fn bottom(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height)
    }
}

/// Complete placement result for one graph.
#[derive(Debug, Clone)]
pub struct Layout {
    nodes: Vec<PlacedNode>,
    index: HashMap<String, usize>,
    pub width: u32,
    pub height: u32,
    /// Uniform shrink factor applied to boxes, fonts and spacing (<= 1.0).
    pub scale: f64,
}

impl Layout {
    pub fn nodes(&self) -> &[PlacedNode] {
        &self.nodes
    }

    pub fn get(&self, id: &str) -> Option<&PlacedNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn font_size(&self) -> f64 {
        diagram::FONT_SIZE * self.scale
    }
}

/// Sort entities into the stable layout order.
fn stable_order<'a>(graph: &'a DiagramGraph) -> Vec<(&'a CodeEntity, usize)> {
    let mut ordered: Vec<(&CodeEntity, usize)> = graph
        .entities()
        .iter()
        .map(|e| (e, graph.depth(&e.id)))
        .collect();
    ordered.sort_by(|(a, da), (b, db)| {
        da.cmp(db)
            .then(a.kind.cmp(&b.kind))
            .then(a.id.cmp(&b.id))
    });
    ordered
}

/// Place every entity of `graph` on the canvas described by `settings`.
///
/// An empty graph yields a layout with no nodes but the full canvas size, so
/// rendering it still produces a valid image.
pub fn place(graph: &DiagramGraph, settings: &DiagramSettings) -> Layout {
    let width = settings.canvas_width;
    let height = settings.canvas_height;

    let ordered = stable_order(graph);
    if ordered.is_empty() {
        return Layout {
            nodes: Vec::new(),
            index: HashMap::new(),
            width,
            height,
            scale: 1.0,
        };
    }

    // Group into rows by depth, preserving the stable order within each row.
    let mut rows: Vec<(usize, Vec<&CodeEntity>)> = Vec::new();
    for (entity, depth) in ordered {
        match rows.last_mut() {
            Some((d, row)) if *d == depth => row.push(entity),
            _ => rows.push((depth, vec![entity])),
        }
    }

    let scale = compute_scale(graph.len(), &rows, width, height, settings);
    let node_w = diagram::NODE_WIDTH * scale;
    let node_h = diagram::NODE_HEIGHT * scale;
    let h_spacing = diagram::H_SPACING * scale;
    let row_h = diagram::ROW_HEIGHT * scale;

    let mut nodes = Vec::with_capacity(graph.len());
    let mut index = HashMap::with_capacity(graph.len());
    for (row_idx, (_, row)) in rows.iter().enumerate() {
        let y = diagram::MARGIN + row_h * row_idx as f64 + (row_h - node_h) / 2.0;
        let span = h_spacing * (row.len() - 1) as f64;
        let first_center = f64::from(width) / 2.0 - span / 2.0;
        for (col, entity) in row.iter().enumerate() {
            let cx = first_center + h_spacing * col as f64;
            index.insert(entity.id.clone(), nodes.len());
            nodes.push(PlacedNode {
                id: entity.id.clone(),
                kind: entity.kind,
                label: truncate_label(entity.label()),
                external: entity.is_external(),
                x: cx - node_w / 2.0,
                y,
                width: node_w,
                height: node_h,
            });
        }
    }

    Layout {
        nodes,
        index,
        width,
        height,
        scale,
    }
}

/// Uniform shrink factor keeping every node on the canvas.
///
/// Three constraints, the tightest wins: the configured capacity threshold,
/// the widest row fitting between the horizontal margins, and the row stack
/// fitting between the vertical margins.
fn compute_scale(
    count: usize,
    rows: &[(usize, Vec<&CodeEntity>)],
    width: u32,
    height: u32,
    settings: &DiagramSettings,
) -> f64 {
    let mut scale: f64 = 1.0;

    if settings.capacity_threshold > 0 && count > settings.capacity_threshold {
        scale = scale.min(settings.capacity_threshold as f64 / count as f64);
    }

    let widest = rows.iter().map(|(_, r)| r.len()).max().unwrap_or(0);
    let row_span = (widest.saturating_sub(1)) as f64 * diagram::H_SPACING + diagram::NODE_WIDTH;
    let avail_w = f64::from(width) - 2.0 * diagram::MARGIN;
    if row_span > avail_w && row_span > 0.0 {
        scale = scale.min(avail_w / row_span);
    }

    let stack = rows.len() as f64 * diagram::ROW_HEIGHT;
    let avail_h = f64::from(height) - 2.0 * diagram::MARGIN;
    if stack > avail_h && stack > 0.0 {
        scale = scale.min(avail_h / stack);
    }

    scale
}

/// Truncate a label to the display limit, appending an ellipsis.
fn truncate_label(label: &str) -> String {
    let chars: Vec<char> = label.chars().collect();
    if chars.len() <= diagram::MAX_LABEL_CHARS {
        return label.to_string();
    }
    let keep: String = chars[..diagram::MAX_LABEL_CHARS - 3].iter().collect();
    format!("{}...", keep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CodeEntity;

    fn graph_with(names: &[(&str, EntityKind, Option<&str>)]) -> DiagramGraph {
        let mut graph = DiagramGraph::new();
        for (id, kind, parent) in names {
            graph.insert_entity(CodeEntity::new(
                *id,
                *kind,
                parent.map(|p| p.to_string()),
            ));
        }
        graph
    }

    fn sample() -> DiagramGraph {
        graph_with(&[
            ("module", EntityKind::Module, None),
            ("module.Greeter", EntityKind::Class, Some("module")),
            ("module.helper", EntityKind::Function, Some("module")),
            ("module.Greeter.greet", EntityKind::Function, Some("module.Greeter")),
        ])
    }

    #[test]
    fn test_empty_graph_keeps_canvas_size() {
        let layout = place(&DiagramGraph::new(), &DiagramSettings::default());
        assert!(layout.nodes().is_empty());
        assert_eq!(layout.width, crate::constants::diagram::CANVAS_WIDTH);
        assert_eq!(layout.height, crate::constants::diagram::CANVAS_HEIGHT);
    }

    #[test]
    fn test_every_entity_is_placed() {
        let graph = sample();
        let layout = place(&graph, &DiagramSettings::default());
        assert_eq!(layout.nodes().len(), graph.len());
        for entity in graph.entities() {
            assert!(layout.get(&entity.id).is_some(), "missing {}", entity.id);
        }
    }

    #[test]
    fn test_rows_follow_depth() {
        let graph = sample();
        let layout = place(&graph, &DiagramSettings::default());
        let module_y = layout.get("module").map(|n| n.y);
        let class_y = layout.get("module.Greeter").map(|n| n.y);
        let method_y = layout.get("module.Greeter.greet").map(|n| n.y);
        assert!(module_y < class_y);
        assert!(class_y < method_y);
        // Same depth shares a row.
        assert_eq!(class_y, layout.get("module.helper").map(|n| n.y));
    }

    #[test]
    fn test_order_breaks_ties_by_kind_then_id() {
        // Class and functions at the same depth: class column comes first,
        // then functions sorted by id.
        let graph = graph_with(&[
            ("module", EntityKind::Module, None),
            ("module.zeta", EntityKind::Function, Some("module")),
            ("module.alpha", EntityKind::Function, Some("module")),
            ("module.Widget", EntityKind::Class, Some("module")),
        ]);
        let layout = place(&graph, &DiagramSettings::default());
        let x = |id: &str| layout.get(id).map(|n| n.x).unwrap();
        assert!(x("module.Widget") < x("module.alpha"));
        assert!(x("module.alpha") < x("module.zeta"));
    }

    #[test]
    fn test_identical_graphs_place_identically() {
        let settings = DiagramSettings::default();
        let a = place(&sample(), &settings);
        let b = place(&sample(), &settings);
        assert_eq!(a.nodes(), b.nodes());
    }

    #[test]
    fn test_insertion_order_does_not_change_placement() {
        let forward = sample();
        let reversed = graph_with(&[
            ("module.Greeter.greet", EntityKind::Function, Some("module.Greeter")),
            ("module.helper", EntityKind::Function, Some("module")),
            ("module.Greeter", EntityKind::Class, Some("module")),
            ("module", EntityKind::Module, None),
        ]);
        let settings = DiagramSettings::default();
        let a = place(&forward, &settings);
        let b = place(&reversed, &settings);
        for node in a.nodes() {
            assert_eq!(Some(node), b.get(&node.id));
        }
    }

    #[test]
    fn test_capacity_overflow_shrinks_instead_of_dropping() {
        let mut graph = DiagramGraph::new();
        graph.insert_entity(CodeEntity::new("module", EntityKind::Module, None));
        for i in 0..80 {
            graph.insert_entity(CodeEntity::new(
                format!("module.f{:03}", i),
                EntityKind::Function,
                Some("module".to_string()),
            ));
        }
        let layout = place(&graph, &DiagramSettings::default());
        assert_eq!(layout.nodes().len(), graph.len());
        assert!(layout.scale < 1.0);

        let avail = f64::from(layout.width) - crate::constants::diagram::MARGIN;
        for node in layout.nodes() {
            assert!(node.x >= 0.0, "{} off-canvas left", node.id);
            assert!(node.x + node.width <= avail + 1.0, "{} off-canvas right", node.id);
        }
    }

    #[test]
    fn test_label_truncation() {
        assert_eq!(truncate_label("short"), "short");
        let long = "a_really_long_function_name_exceeding_the_limit";
        let truncated = truncate_label(long);
        assert_eq!(truncated.chars().count(), crate::constants::diagram::MAX_LABEL_CHARS);
        assert!(truncated.ends_with("..."));
    }
}
