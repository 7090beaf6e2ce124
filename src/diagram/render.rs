//! SVG rendering of placed structure diagrams.
//!
//! The output is plain SVG text so two identical graphs render byte-identical
//! images. Containment edges are drawn as solid lines, call edges as arrows;
//! synthetic external nodes get a dashed outline.

use svg::node::element as svg_element;
use svg::Document;

use crate::config::DiagramSettings;
use crate::types::{DiagramGraph, EntityKind};

use super::layout::{self, Layout, PlacedNode};

const FONT_FAMILY: &str = "Helvetica, Arial, sans-serif";
const ARROW_SIZE: f64 = 6.0;

const CALL_EDGE_COLOR: &str = "#616161";
const CONTAIN_EDGE_COLOR: &str = "#9e9e9e";
const EXTERN_FILL: &str = "#fafafa";
const EXTERN_STROKE: &str = "#9e9e9e";

/// Finished diagram: encoded image bytes plus pixel dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl RenderedImage {
    pub fn as_svg(&self) -> &str {
        // Bytes are produced from a String in `render`, so this cannot fail.
        std::str::from_utf8(&self.bytes).unwrap_or_default()
    }
}

fn fill_color(node: &PlacedNode) -> &'static str {
    if node.external {
        return EXTERN_FILL;
    }
    match node.kind {
        EntityKind::Module => "#f5f5f5",
        EntityKind::Class => "#e3f2fd",
        EntityKind::Function => "#e1f5e1",
    }
}

fn stroke_color(node: &PlacedNode) -> &'static str {
    if node.external {
        return EXTERN_STROKE;
    }
    match node.kind {
        EntityKind::Module => "#333333",
        EntityKind::Class => "#2196F3",
        EntityKind::Function => "#4CAF50",
    }
}

/// Place and render `graph` in one step.
pub fn render(graph: &DiagramGraph, settings: &DiagramSettings) -> RenderedImage {
    let placed = layout::place(graph, settings);
    render_layout(graph, &placed)
}

/// Render an already computed layout.
pub fn render_layout(graph: &DiagramGraph, layout: &Layout) -> RenderedImage {
    let mut doc = Document::new()
        .set("viewBox", format!("0 0 {} {}", layout.width, layout.height))
        .set("width", layout.width)
        .set("height", layout.height);

    doc = doc.add(
        svg_element::Rectangle::new()
            .set("x", 0)
            .set("y", 0)
            .set("width", layout.width)
            .set("height", layout.height)
            .set("fill", "#ffffff"),
    );

    // Edges first so node boxes overlap the line ends.
    let mut edges = svg_element::Group::new().set("id", "edges");
    for (parent, child) in graph.containment_edges() {
        if let (Some(from), Some(to)) = (layout.get(parent), layout.get(child)) {
            edges = edges.add(containment_line(from, to));
        }
    }
    for edge in graph.calls() {
        if let (Some(from), Some(to)) = (layout.get(&edge.caller_id), layout.get(&edge.callee_id)) {
            edges = edges.add(call_arrow(from, to, layout.scale));
        }
    }
    doc = doc.add(edges);

    let mut boxes = svg_element::Group::new().set("id", "nodes");
    for node in layout.nodes() {
        boxes = boxes.add(node_group(node, layout.font_size()));
    }
    doc = doc.add(boxes);

    RenderedImage {
        bytes: doc.to_string().into_bytes(),
        width: layout.width,
        height: layout.height,
    }
}

fn node_group(node: &PlacedNode, font_size: f64) -> svg_element::Group {
    let mut rect = svg_element::Rectangle::new()
        .set("x", fmt(node.x))
        .set("y", fmt(node.y))
        .set("width", fmt(node.width))
        .set("height", fmt(node.height))
        .set("rx", fmt(4.0 * node.height / 44.0))
        .set("fill", fill_color(node))
        .set("stroke", stroke_color(node))
        .set("stroke-width", 1.5);
    if node.external {
        rect = rect.set("stroke-dasharray", "4 3");
    }

    let (cx, cy) = node.center();
    let text = svg_element::Text::new(node.label.clone())
        .set("x", fmt(cx))
        .set("y", fmt(cy))
        .set("text-anchor", "middle")
        .set("dominant-baseline", "central")
        .set("font-family", FONT_FAMILY)
        .set("font-size", fmt(font_size))
        .set("fill", "#212121");

    svg_element::Group::new()
        .set("data-entity", node.id.clone())
        .add(rect)
        .add(text)
}

fn containment_line(from: &PlacedNode, to: &PlacedNode) -> svg_element::Line {
    let (x1, y1) = from.bottom();
    let (x2, y2) = to.top();
    svg_element::Line::new()
        .set("x1", fmt(x1))
        .set("y1", fmt(y1))
        .set("x2", fmt(x2))
        .set("y2", fmt(y2))
        .set("stroke", CONTAIN_EDGE_COLOR)
        .set("stroke-width", 1.0)
}

/// Call edge: a line from the caller's center toward the callee's center,
/// ending on the callee's box edge, with a triangular arrowhead. A recursive
/// call becomes a small loop beside the node instead.
fn call_arrow(from: &PlacedNode, to: &PlacedNode, scale: f64) -> svg_element::Group {
    let mut group = svg_element::Group::new();
    if from.id == to.id {
        return group.add(self_loop(from, scale));
    }

    let (x1, y1) = from.center();
    let (cx, cy) = to.center();
    let (dx, dy) = (cx - x1, cy - y1);
    let len = (dx * dx + dy * dy).sqrt();
    if len < f64::EPSILON {
        return group;
    }
    let (ux, uy) = (dx / len, dy / len);

    // Pull the tip back to the callee's box boundary.
    let half_w = to.width / 2.0;
    let half_h = to.height / 2.0;
    let edge_t = (half_w / ux.abs().max(f64::EPSILON))
        .min(half_h / uy.abs().max(f64::EPSILON));
    let tip_x = cx - ux * edge_t;
    let tip_y = cy - uy * edge_t;

    let size = ARROW_SIZE * scale.max(0.4);
    let base_x = tip_x - ux * size * 2.0;
    let base_y = tip_y - uy * size * 2.0;
    // Perpendicular for the arrowhead wings.
    let (px, py) = (-uy, ux);

    group = group.add(
        svg_element::Line::new()
            .set("x1", fmt(x1))
            .set("y1", fmt(y1))
            .set("x2", fmt(base_x))
            .set("y2", fmt(base_y))
            .set("stroke", CALL_EDGE_COLOR)
            .set("stroke-width", 1.2),
    );
    group.add(
        svg_element::Polygon::new()
            .set(
                "points",
                format!(
                    "{},{} {},{} {},{}",
                    fmt(tip_x),
                    fmt(tip_y),
                    fmt(base_x + px * size),
                    fmt(base_y + py * size),
                    fmt(base_x - px * size),
                    fmt(base_y - py * size),
                ),
            )
            .set("fill", CALL_EDGE_COLOR),
    )
}

fn self_loop(node: &PlacedNode, scale: f64) -> svg_element::Path {
    let r = 12.0 * scale.max(0.4);
    let (x, y) = (node.x + node.width, node.y + node.height / 4.0);
    let d = format!(
        "M {} {} C {} {} {} {} {} {}",
        fmt(x),
        fmt(y),
        fmt(x + r * 2.0),
        fmt(y - r),
        fmt(x + r * 2.0),
        fmt(y + r * 2.0),
        fmt(x),
        fmt(y + r),
    );
    svg_element::Path::new()
        .set("d", d)
        .set("fill", "none")
        .set("stroke", CALL_EDGE_COLOR)
        .set("stroke-width", 1.2)
}

/// Fixed-precision coordinate formatting keeps output byte-stable across
/// platforms.
fn fmt(value: f64) -> String {
    format!("{:.2}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CodeEntity;

    fn sample() -> DiagramGraph {
        let mut graph = DiagramGraph::new();
        graph.insert_entity(CodeEntity::new("module", EntityKind::Module, None));
        graph.insert_entity(CodeEntity::new(
            "module.Greeter",
            EntityKind::Class,
            Some("module".to_string()),
        ));
        graph.insert_entity(CodeEntity::new(
            "module.Greeter.greet",
            EntityKind::Function,
            Some("module.Greeter".to_string()),
        ));
        graph.insert_entity(CodeEntity::external("print"));
        graph.add_call("module.Greeter.greet", "extern:print");
        graph
    }

    #[test]
    fn test_empty_graph_renders_valid_canvas() {
        let image = render(&DiagramGraph::new(), &DiagramSettings::default());
        let text = image.as_svg();
        assert!(text.starts_with("<svg"));
        assert!(text.contains("viewBox=\"0 0 1200 800\""));
        assert_eq!(image.width, 1200);
        assert_eq!(image.height, 800);
    }

    #[test]
    fn test_every_node_appears_in_output() {
        let graph = sample();
        let image = render(&graph, &DiagramSettings::default());
        let text = image.as_svg();
        for entity in graph.entities() {
            assert!(
                text.contains(&format!("data-entity=\"{}\"", entity.id)),
                "missing {}",
                entity.id
            );
        }
        // One arrowhead per call edge.
        assert_eq!(text.matches("<polygon").count(), graph.calls().len());
    }

    #[test]
    fn test_identical_graphs_render_identical_bytes() {
        let settings = DiagramSettings::default();
        let a = render(&sample(), &settings);
        let b = render(&sample(), &settings);
        assert_eq!(a.bytes, b.bytes);
    }

    #[test]
    fn test_external_nodes_are_dashed() {
        let image = render(&sample(), &DiagramSettings::default());
        assert!(image.as_svg().contains("stroke-dasharray"));
    }

    #[test]
    fn test_recursive_call_draws_loop() {
        let mut graph = DiagramGraph::new();
        graph.insert_entity(CodeEntity::new("module", EntityKind::Module, None));
        graph.insert_entity(CodeEntity::new(
            "module.fib",
            EntityKind::Function,
            Some("module".to_string()),
        ));
        graph.add_call("module.fib", "module.fib");
        let image = render(&graph, &DiagramSettings::default());
        assert!(image.as_svg().contains("<path"));
    }

    #[test]
    fn test_coordinate_formatting_is_fixed_precision() {
        assert_eq!(fmt(1.0), "1.00");
        assert_eq!(fmt(0.1 + 0.2), "0.30");
    }
}
