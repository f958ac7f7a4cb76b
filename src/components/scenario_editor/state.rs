use std::collections::HashSet;
use std::fmt;

use super::types::{
	Connection, Node, NodeId, NodeKind, NodeProperties, ScenarioDocument, Vec2, Viewport,
};

/// Fixed node extent; nodes are not user-resizable.
pub const NODE_WIDTH: f64 = 120.0;
pub const NODE_HEIGHT: f64 = 80.0;

pub const PORT_RADIUS: f64 = 6.0;
// Slightly larger than the drawn marker so the connect gesture is forgiving.
pub const PORT_HIT_RADIUS: f64 = 10.0;

/// Background grid spacing in graph units.
pub const GRID_STEP: f64 = 20.0;

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub node: Option<NodeId>,
	// Pointer-to-node-origin offset in graph space, captured at drag start.
	pub offset: Vec2,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start: Vec2,
	pub pan_start: Vec2,
}

#[derive(Clone, Debug, Default)]
pub struct PinchState {
	/// Last two-finger distance in screen space; 0 when no pinch is active.
	pub distance: f64,
}

/// An in-progress drag from an output port; resolves to a connection on
/// release over another node.
#[derive(Clone, Debug, Default)]
pub struct LinkState {
	pub from: Option<NodeId>,
	pub cursor: Vec2,
}

/// A structural finding from [`EditorState::validate`]. Advisory only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationIssue {
	MissingStart,
	MissingEnd,
	IsolatedNode { id: NodeId, title: String },
}

impl fmt::Display for ValidationIssue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::MissingStart => write!(f, "missing start node"),
			Self::MissingEnd => write!(f, "missing end node"),
			Self::IsolatedNode { title, .. } => write!(f, "isolated node: {title}"),
		}
	}
}

/// Mutable editor session: the node/connection graph, the viewport and the
/// transient interaction states. All coordinates handed to mutation methods
/// are in graph space unless a method name says otherwise.
pub struct EditorState {
	pub nodes: Vec<Node>,
	pub connections: Vec<Connection>,
	pub viewport: Viewport,
	pub selected: Option<NodeId>,
	pub drag: DragState,
	pub pan: PanState,
	pub pinch: PinchState,
	pub link: LinkState,
	pub name: String,
	pub description: String,
	pub width: f64,
	pub height: f64,
	next_id: NodeId,
}

impl EditorState {
	pub fn new(width: f64, height: f64) -> Self {
		Self {
			nodes: Vec::new(),
			connections: Vec::new(),
			viewport: Viewport::default(),
			selected: None,
			drag: DragState::default(),
			pan: PanState::default(),
			pinch: PinchState::default(),
			link: LinkState::default(),
			name: String::new(),
			description: String::new(),
			width,
			height,
			next_id: 1,
		}
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> Vec2 {
		self.viewport.screen_to_graph(sx, sy)
	}

	pub fn node(&self, id: NodeId) -> Option<&Node> {
		self.nodes.iter().find(|n| n.id == id)
	}

	fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
		self.nodes.iter_mut().find(|n| n.id == id)
	}

	/// Insert a node of `kind` at graph position `(x, y)`. Always succeeds.
	pub fn add_node(&mut self, kind: NodeKind, x: f64, y: f64) -> NodeId {
		let id = self.next_id;
		self.next_id += 1;
		self.nodes.push(Node {
			id,
			kind,
			position: Vec2::new(x, y),
			size: Vec2::new(NODE_WIDTH, NODE_HEIGHT),
			title: kind.default_title().to_string(),
			properties: NodeProperties::new(kind),
		});
		id
	}

	/// Rename a node's display label. No-op for unknown ids.
	pub fn set_title(&mut self, id: NodeId, title: String) {
		if let Some(node) = self.node_mut(id) {
			node.title = title;
		}
	}

	/// Topmost node whose bounding box contains `p`; last-inserted wins on
	/// overlap, matching draw order.
	pub fn hit_test(&self, p: Vec2) -> Option<NodeId> {
		self.nodes.iter().rev().find(|n| n.contains(p)).map(|n| n.id)
	}

	/// Topmost node whose output port marker is within grab distance of `p`.
	pub fn output_port_at(&self, p: Vec2) -> Option<NodeId> {
		self.nodes
			.iter()
			.rev()
			.find(|n| {
				let port = n.output_port();
				let (dx, dy) = (port.x - p.x, port.y - p.y);
				dx * dx + dy * dy <= PORT_HIT_RADIUS * PORT_HIT_RADIUS
			})
			.map(|n| n.id)
	}

	pub fn begin_drag(&mut self, id: NodeId, p: Vec2) {
		if let Some(node) = self.node(id) {
			self.drag.offset = p - node.position;
			self.drag.node = Some(id);
		}
	}

	/// Live repositioning, no snapping. No-op when no drag is active.
	pub fn drag_to(&mut self, p: Vec2) {
		let offset = self.drag.offset;
		if let Some(id) = self.drag.node {
			if let Some(node) = self.node_mut(id) {
				node.position = p - offset;
			}
		}
	}

	pub fn end_drag(&mut self) {
		self.drag.node = None;
	}

	pub fn begin_pan(&mut self, sx: f64, sy: f64) {
		self.pan.active = true;
		self.pan.start = Vec2::new(sx, sy);
		self.pan.pan_start = self.viewport.pan;
	}

	pub fn pan_to(&mut self, sx: f64, sy: f64) {
		if self.pan.active {
			self.viewport.pan = self.pan.pan_start + (Vec2::new(sx, sy) - self.pan.start);
		}
	}

	pub fn end_pan(&mut self) {
		self.pan.active = false;
	}

	pub fn zoom_at(&mut self, factor: f64, anchor_x: f64, anchor_y: f64) {
		self.viewport.zoom_at(factor, anchor_x, anchor_y);
	}

	/// Remove the node and every connection referencing it, as one step.
	pub fn delete_node(&mut self, id: NodeId) {
		self.nodes.retain(|n| n.id != id);
		self.connections.retain(|c| c.from != id && c.to != id);
		if self.selected == Some(id) {
			self.selected = None;
		}
		if self.drag.node == Some(id) {
			self.drag.node = None;
		}
		if self.link.from == Some(id) {
			self.link.from = None;
		}
	}

	/// Delete the current selection. Returns false when nothing was selected.
	pub fn delete_selected(&mut self) -> bool {
		match self.selected {
			Some(id) => {
				self.delete_node(id);
				true
			}
			None => false,
		}
	}

	/// Append a directed connection. Self-links, unknown endpoints and
	/// duplicate from/to pairs are ignored.
	pub fn connect(&mut self, from: NodeId, to: NodeId) -> bool {
		if from == to || self.node(to).is_none() {
			return false;
		}
		if self.connections.iter().any(|c| c.from == from && c.to == to) {
			return false;
		}
		let Some(source) = self.node(from) else {
			return false;
		};
		let color = source.kind.color().to_string();
		self.connections.push(Connection {
			from,
			to,
			color,
			dashed: false,
		});
		true
	}

	pub fn begin_link(&mut self, from: NodeId, cursor: Vec2) {
		self.link.from = Some(from);
		self.link.cursor = cursor;
	}

	pub fn update_link(&mut self, cursor: Vec2) {
		if self.link.from.is_some() {
			self.link.cursor = cursor;
		}
	}

	/// Resolve a pending port drag: connect to the node under `p`, if any.
	pub fn complete_link(&mut self, p: Vec2) -> bool {
		match self.link.from.take() {
			Some(from) => match self.hit_test(p) {
				Some(to) => self.connect(from, to),
				None => false,
			},
			None => false,
		}
	}

	pub fn cancel_link(&mut self) {
		self.link.from = None;
	}

	/// Structural checks: start/end presence and isolated non-terminal nodes.
	/// Advisory output, never a gate on save or run.
	pub fn validate(&self) -> Vec<ValidationIssue> {
		let mut issues = Vec::new();
		if !self.nodes.iter().any(|n| n.kind == NodeKind::Start) {
			issues.push(ValidationIssue::MissingStart);
		}
		if !self.nodes.iter().any(|n| n.kind == NodeKind::End) {
			issues.push(ValidationIssue::MissingEnd);
		}

		let linked: HashSet<NodeId> = self
			.connections
			.iter()
			.flat_map(|c| [c.from, c.to])
			.collect();
		for node in &self.nodes {
			if !node.kind.is_terminal() && !linked.contains(&node.id) {
				issues.push(ValidationIssue::IsolatedNode {
					id: node.id,
					title: node.title.clone(),
				});
			}
		}
		issues
	}

	/// Align the node bounding-box center (or the graph origin when empty)
	/// with the canvas center at the current scale.
	pub fn center_view(&mut self) {
		let canvas_center = Vec2::new(self.width / 2.0, self.height / 2.0);
		let target = match self.bounding_box() {
			Some((min, max)) => Vec2::new((min.x + max.x) / 2.0, (min.y + max.y) / 2.0),
			None => Vec2::default(),
		};
		self.viewport.pan = Vec2::new(
			canvas_center.x - target.x * self.viewport.scale,
			canvas_center.y - target.y * self.viewport.scale,
		);
	}

	fn bounding_box(&self) -> Option<(Vec2, Vec2)> {
		let first = self.nodes.first()?;
		let mut min = first.position;
		let mut max = first.position + first.size;
		for node in &self.nodes[1..] {
			min.x = min.x.min(node.position.x);
			min.y = min.y.min(node.position.y);
			max.x = max.x.max(node.position.x + node.size.x);
			max.y = max.y.max(node.position.y + node.size.y);
		}
		Some((min, max))
	}

	/// Empty both sets. Confirmation is the caller's concern.
	pub fn clear(&mut self) {
		self.nodes.clear();
		self.connections.clear();
		self.selected = None;
		self.drag = DragState::default();
		self.link = LinkState::default();
	}

	/// Snapshot the full graph and viewport in the persisted shape.
	pub fn document(&self) -> ScenarioDocument {
		ScenarioDocument {
			name: self.name.clone(),
			description: self.description.clone(),
			nodes: self.nodes.clone(),
			connections: self.connections.clone(),
			viewport: self.viewport,
		}
	}

	/// Replace the whole session with a loaded document. Dangling
	/// connections are dropped on the way in; the id counter restarts past
	/// the highest loaded id.
	pub fn load(&mut self, doc: ScenarioDocument) {
		let live: HashSet<NodeId> = doc.nodes.iter().map(|n| n.id).collect();
		self.next_id = doc.nodes.iter().map(|n| n.id).max().unwrap_or(0) + 1;
		self.nodes = doc.nodes;
		self.connections = doc
			.connections
			.into_iter()
			.filter(|c| live.contains(&c.from) && live.contains(&c.to))
			.collect();
		self.viewport = doc.viewport;
		self.name = doc.name;
		self.description = doc.description;
		self.selected = None;
		self.drag = DragState::default();
		self.pan = PanState::default();
		self.pinch = PinchState::default();
		self.link = LinkState::default();
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn state() -> EditorState {
		EditorState::new(800.0, 600.0)
	}

	#[test]
	fn ids_are_unique_and_monotonic() {
		let mut s = state();
		let a = s.add_node(NodeKind::Start, 0.0, 0.0);
		let b = s.add_node(NodeKind::State, 0.0, 0.0);
		let c = s.add_node(NodeKind::End, 0.0, 0.0);
		assert!(a < b && b < c);
	}

	#[test]
	fn delete_removes_referencing_connections() {
		let mut s = state();
		let a = s.add_node(NodeKind::Start, 0.0, 0.0);
		let b = s.add_node(NodeKind::State, 200.0, 0.0);
		let c = s.add_node(NodeKind::End, 400.0, 0.0);
		assert!(s.connect(a, b));
		assert!(s.connect(b, c));
		assert!(s.connect(a, c));

		s.delete_node(b);

		assert!(s.node(b).is_none());
		assert_eq!(s.connections.len(), 1);
		assert!(s.connections.iter().all(|x| x.from != b && x.to != b));
	}

	#[test]
	fn delete_clears_selection_and_drag() {
		let mut s = state();
		let a = s.add_node(NodeKind::State, 0.0, 0.0);
		s.selected = Some(a);
		s.begin_drag(a, Vec2::new(10.0, 10.0));
		s.delete_node(a);
		assert_eq!(s.selected, None);
		assert_eq!(s.drag.node, None);
	}

	#[test]
	fn delete_selected_is_noop_without_selection() {
		let mut s = state();
		s.add_node(NodeKind::State, 0.0, 0.0);
		assert!(!s.delete_selected());
		assert_eq!(s.nodes.len(), 1);
	}

	#[test]
	fn hit_test_prefers_last_inserted() {
		let mut s = state();
		let under = s.add_node(NodeKind::State, 100.0, 100.0);
		let over = s.add_node(NodeKind::Action, 150.0, 120.0);

		// Overlap region contains both boxes.
		assert_eq!(s.hit_test(Vec2::new(160.0, 130.0)), Some(over));
		// Only the first box.
		assert_eq!(s.hit_test(Vec2::new(105.0, 105.0)), Some(under));
		assert_eq!(s.hit_test(Vec2::new(500.0, 500.0)), None);
	}

	#[test]
	fn drag_preserves_grab_offset() {
		let mut s = state();
		let a = s.add_node(NodeKind::State, 100.0, 100.0);
		s.begin_drag(a, Vec2::new(150.0, 120.0));
		s.drag_to(Vec2::new(200.0, 200.0));
		assert_eq!(s.node(a).unwrap().position, Vec2::new(150.0, 180.0));
		s.end_drag();
		s.drag_to(Vec2::new(0.0, 0.0));
		assert_eq!(s.node(a).unwrap().position, Vec2::new(150.0, 180.0));
	}

	#[test]
	fn pan_follows_pointer_delta() {
		let mut s = state();
		s.viewport.pan = Vec2::new(10.0, 20.0);
		s.begin_pan(100.0, 100.0);
		s.pan_to(130.0, 90.0);
		assert_eq!(s.viewport.pan, Vec2::new(40.0, 10.0));
		s.end_pan();
		s.pan_to(0.0, 0.0);
		assert_eq!(s.viewport.pan, Vec2::new(40.0, 10.0));
	}

	#[test]
	fn zoom_is_anchor_invariant() {
		let mut s = state();
		s.viewport.pan = Vec2::new(37.0, -12.0);
		let (ax, ay) = (200.0, 150.0);
		let before = s.screen_to_graph(ax, ay);
		s.zoom_at(1.3, ax, ay);
		let after = s.screen_to_graph(ax, ay);
		assert!((before.x - after.x).abs() < 1e-9);
		assert!((before.y - after.y).abs() < 1e-9);
	}

	#[test]
	fn scale_stays_clamped() {
		let mut s = state();
		for _ in 0..100 {
			s.zoom_at(1.5, 400.0, 300.0);
		}
		assert_eq!(s.viewport.scale, 5.0);
		for _ in 0..200 {
			s.zoom_at(0.5, 400.0, 300.0);
		}
		assert!((s.viewport.scale - 0.1).abs() < 1e-12);
	}

	#[test]
	fn ten_wheel_notches_compound_unclamped() {
		let mut s = state();
		for _ in 0..10 {
			s.zoom_at(1.1, 0.0, 0.0);
		}
		assert!((s.viewport.scale - 1.1f64.powi(10)).abs() < 1e-9);
	}

	#[test]
	fn connect_rejects_self_duplicate_and_unknown() {
		let mut s = state();
		let a = s.add_node(NodeKind::Start, 0.0, 0.0);
		let b = s.add_node(NodeKind::State, 200.0, 0.0);
		assert!(!s.connect(a, a));
		assert!(s.connect(a, b));
		assert!(!s.connect(a, b));
		assert!(!s.connect(a, 999));
		assert!(!s.connect(999, b));
		assert_eq!(s.connections.len(), 1);
	}

	#[test]
	fn connection_inherits_source_color() {
		let mut s = state();
		let a = s.add_node(NodeKind::Condition, 0.0, 0.0);
		let b = s.add_node(NodeKind::State, 200.0, 0.0);
		s.connect(a, b);
		assert_eq!(s.connections[0].color, NodeKind::Condition.color());
	}

	#[test]
	fn port_drag_produces_connection() {
		let mut s = state();
		let a = s.add_node(NodeKind::Start, 0.0, 0.0);
		let b = s.add_node(NodeKind::State, 300.0, 0.0);

		let port = s.node(a).unwrap().output_port();
		assert_eq!(s.output_port_at(port), Some(a));
		assert_eq!(s.output_port_at(Vec2::new(port.x, port.y + 50.0)), None);

		s.begin_link(a, port);
		s.update_link(Vec2::new(250.0, 30.0));
		assert!(s.complete_link(Vec2::new(310.0, 30.0)));
		assert_eq!(s.connections.len(), 1);
		assert_eq!((s.connections[0].from, s.connections[0].to), (a, b));
		assert_eq!(s.link.from, None);
	}

	#[test]
	fn port_drag_over_empty_space_is_dropped() {
		let mut s = state();
		let a = s.add_node(NodeKind::Start, 0.0, 0.0);
		s.begin_link(a, s.node(a).unwrap().output_port());
		assert!(!s.complete_link(Vec2::new(900.0, 900.0)));
		assert!(s.connections.is_empty());
		assert_eq!(s.link.from, None);
	}

	#[test]
	fn validate_reports_missing_terminals() {
		let mut s = state();
		let a = s.add_node(NodeKind::Start, 100.0, 100.0);
		let b = s.add_node(NodeKind::State, 300.0, 100.0);
		s.connect(a, b);
		let issues = s.validate();
		assert!(!issues.contains(&ValidationIssue::MissingStart));
		assert!(issues.contains(&ValidationIssue::MissingEnd));
		assert!(
			!issues
				.iter()
				.any(|i| matches!(i, ValidationIssue::IsolatedNode { .. }))
		);
	}

	#[test]
	fn validate_flags_exactly_one_isolated_node() {
		let mut s = state();
		let start = s.add_node(NodeKind::Start, 0.0, 0.0);
		let end = s.add_node(NodeKind::End, 400.0, 0.0);
		let lone = s.add_node(NodeKind::Action, 200.0, 200.0);
		s.connect(start, end);

		let issues = s.validate();
		assert!(!issues.contains(&ValidationIssue::MissingStart));
		assert!(!issues.contains(&ValidationIssue::MissingEnd));
		let isolated: Vec<_> = issues
			.iter()
			.filter_map(|i| match i {
				ValidationIssue::IsolatedNode { id, .. } => Some(*id),
				_ => None,
			})
			.collect();
		assert_eq!(isolated, vec![lone]);
	}

	#[test]
	fn validate_exempts_unconnected_terminals() {
		let mut s = state();
		s.add_node(NodeKind::Start, 0.0, 0.0);
		s.add_node(NodeKind::End, 400.0, 0.0);
		assert!(s.validate().is_empty());
	}

	#[test]
	fn issues_render_as_plain_text() {
		assert_eq!(ValidationIssue::MissingStart.to_string(), "missing start node");
		assert_eq!(
			ValidationIssue::IsolatedNode {
				id: 7,
				title: "Grab".to_string()
			}
			.to_string(),
			"isolated node: Grab"
		);
	}

	#[test]
	fn clear_empties_both_sets() {
		let mut s = state();
		let ids: Vec<_> = (0..5)
			.map(|i| s.add_node(NodeKind::State, 100.0 * i as f64, 0.0))
			.collect();
		for pair in ids.windows(2) {
			s.connect(pair[0], pair[1]);
		}
		assert_eq!((s.nodes.len(), s.connections.len()), (5, 4));
		s.clear();
		assert!(s.nodes.is_empty());
		assert!(s.connections.is_empty());
		assert_eq!(s.selected, None);
	}

	#[test]
	fn center_view_on_empty_graph_targets_origin() {
		let mut s = state();
		s.center_view();
		assert_eq!(s.viewport.pan, Vec2::new(400.0, 300.0));
	}

	#[test]
	fn center_view_aligns_bounding_box_center() {
		let mut s = state();
		s.add_node(NodeKind::Start, 100.0, 100.0);
		s.center_view();
		// Box center is (160, 140); canvas center is (400, 300) at scale 1.
		assert_eq!(s.viewport.pan, Vec2::new(240.0, 160.0));

		s.viewport.scale = 2.0;
		s.center_view();
		assert_eq!(s.viewport.pan, Vec2::new(80.0, 20.0));
		// The box center now maps exactly to the canvas center.
		assert_eq!(s.screen_to_graph(400.0, 300.0), Vec2::new(160.0, 140.0));
	}

	#[test]
	fn set_title_renames_node_and_findings() {
		let mut s = state();
		let a = s.add_node(NodeKind::Action, 0.0, 0.0);
		s.set_title(a, "Grab crate".to_string());
		assert_eq!(s.node(a).unwrap().title, "Grab crate");
		// Unknown id is a no-op.
		s.set_title(999, "ghost".to_string());

		let issues = s.validate();
		assert!(issues.contains(&ValidationIssue::IsolatedNode {
			id: a,
			title: "Grab crate".to_string()
		}));
	}

	#[test]
	fn snapshot_preserves_loaded_metadata() {
		let mut s = state();
		s.load(ScenarioDocument {
			name: "demo".to_string(),
			description: "pick-and-place walkthrough".to_string(),
			..ScenarioDocument::default()
		});
		let out = s.document();
		assert_eq!(out.name, "demo");
		assert_eq!(out.description, "pick-and-place walkthrough");
	}

	#[test]
	fn document_load_round_trips() {
		let mut s = state();
		s.name = "demo".to_string();
		s.description = "two-node happy path".to_string();
		let a = s.add_node(NodeKind::Start, 10.0, 20.0);
		let b = s.add_node(NodeKind::End, 400.0, 20.0);
		s.connect(a, b);
		s.viewport.scale = 1.5;
		s.viewport.pan = Vec2::new(-5.0, 8.0);
		let doc = s.document();

		let mut fresh = state();
		fresh.load(doc.clone());
		assert_eq!(fresh.document(), doc);
	}

	#[test]
	fn load_drops_dangling_connections_and_resumes_ids() {
		let mut s = state();
		let mut doc = ScenarioDocument::default();
		let mut donor = state();
		let a = donor.add_node(NodeKind::Start, 0.0, 0.0);
		doc.nodes = donor.nodes.clone();
		doc.connections = vec![Connection {
			from: a,
			to: 42,
			color: "#fff".to_string(),
			dashed: false,
		}];

		s.load(doc);
		assert!(s.connections.is_empty());
		let next = s.add_node(NodeKind::End, 0.0, 0.0);
		assert!(next > a);
	}
}
